//! JVM bytecode opcodes, plus the private synthetic range used internally
//! by the long-branch resolution pass.
//!
//! Built from one declarative macro list into a `#[repr(u8)]` enum plus a
//! `Debug` impl. JVM opcodes with operands read their operand bytes from
//! the surrounding instruction stream rather than carrying a typed payload
//! in the enum itself.

macro_rules! opcodes {
	($($(#[$doc:meta])* $name:ident = $value:literal),* $(,)?) => {
		#[repr(u8)]
		#[allow(non_camel_case_types)]
		#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, classfile_derive::FromRepr)]
		pub enum Opcode {
			$($(#[$doc])* $name = $value),*
		}

		impl Opcode {
			/// Thin wrapper over the derived `from_repr`, kept so call sites
			/// don't need to know the opcode set derives its lookup table
			/// rather than hand-matching it.
			pub fn from_u8(value: u8) -> Option<Opcode> {
				Self::from_repr(value)
			}
		}
	};
}

opcodes! {
	NOP = 0x00, ACONST_NULL = 0x01,
	ICONST_M1 = 0x02, ICONST_0 = 0x03, ICONST_1 = 0x04, ICONST_2 = 0x05,
	ICONST_3 = 0x06, ICONST_4 = 0x07, ICONST_5 = 0x08,
	LCONST_0 = 0x09, LCONST_1 = 0x0A,
	FCONST_0 = 0x0B, FCONST_1 = 0x0C, FCONST_2 = 0x0D,
	DCONST_0 = 0x0E, DCONST_1 = 0x0F,
	BIPUSH = 0x10, SIPUSH = 0x11, LDC = 0x12, LDC_W = 0x13, LDC2_W = 0x14,
	ILOAD = 0x15, LLOAD = 0x16, FLOAD = 0x17, DLOAD = 0x18, ALOAD = 0x19,
	ILOAD_0 = 0x1A, ILOAD_1 = 0x1B, ILOAD_2 = 0x1C, ILOAD_3 = 0x1D,
	LLOAD_0 = 0x1E, LLOAD_1 = 0x1F, LLOAD_2 = 0x20, LLOAD_3 = 0x21,
	FLOAD_0 = 0x22, FLOAD_1 = 0x23, FLOAD_2 = 0x24, FLOAD_3 = 0x25,
	DLOAD_0 = 0x26, DLOAD_1 = 0x27, DLOAD_2 = 0x28, DLOAD_3 = 0x29,
	ALOAD_0 = 0x2A, ALOAD_1 = 0x2B, ALOAD_2 = 0x2C, ALOAD_3 = 0x2D,
	IALOAD = 0x2E, LALOAD = 0x2F, FALOAD = 0x30, DALOAD = 0x31,
	AALOAD = 0x32, BALOAD = 0x33, CALOAD = 0x34, SALOAD = 0x35,
	ISTORE = 0x36, LSTORE = 0x37, FSTORE = 0x38, DSTORE = 0x39, ASTORE = 0x3A,
	ISTORE_0 = 0x3B, ISTORE_1 = 0x3C, ISTORE_2 = 0x3D, ISTORE_3 = 0x3E,
	LSTORE_0 = 0x3F, LSTORE_1 = 0x40, LSTORE_2 = 0x41, LSTORE_3 = 0x42,
	FSTORE_0 = 0x43, FSTORE_1 = 0x44, FSTORE_2 = 0x45, FSTORE_3 = 0x46,
	DSTORE_0 = 0x47, DSTORE_1 = 0x48, DSTORE_2 = 0x49, DSTORE_3 = 0x4A,
	ASTORE_0 = 0x4B, ASTORE_1 = 0x4C, ASTORE_2 = 0x4D, ASTORE_3 = 0x4E,
	IASTORE = 0x4F, LASTORE = 0x50, FASTORE = 0x51, DASTORE = 0x52,
	AASTORE = 0x53, BASTORE = 0x54, CASTORE = 0x55, SASTORE = 0x56,
	POP = 0x57, POP2 = 0x58, DUP = 0x59, DUP_X1 = 0x5A, DUP_X2 = 0x5B,
	DUP2 = 0x5C, DUP2_X1 = 0x5D, DUP2_X2 = 0x5E, SWAP = 0x5F,
	IADD = 0x60, LADD = 0x61, FADD = 0x62, DADD = 0x63,
	ISUB = 0x64, LSUB = 0x65, FSUB = 0x66, DSUB = 0x67,
	IMUL = 0x68, LMUL = 0x69, FMUL = 0x6A, DMUL = 0x6B,
	IDIV = 0x6C, LDIV = 0x6D, FDIV = 0x6E, DDIV = 0x6F,
	IREM = 0x70, LREM = 0x71, FREM = 0x72, DREM = 0x73,
	INEG = 0x74, LNEG = 0x75, FNEG = 0x76, DNEG = 0x77,
	ISHL = 0x78, LSHL = 0x79, ISHR = 0x7A, LSHR = 0x7B,
	IUSHR = 0x7C, LUSHR = 0x7D, IAND = 0x7E, LAND = 0x7F,
	IOR = 0x80, LOR = 0x81, IXOR = 0x82, LXOR = 0x83,
	IINC = 0x84,
	I2L = 0x85, I2F = 0x86, I2D = 0x87, L2I = 0x88, L2F = 0x89, L2D = 0x8A,
	F2I = 0x8B, F2L = 0x8C, F2D = 0x8D, D2I = 0x8E, D2L = 0x8F, D2F = 0x90,
	I2B = 0x91, I2C = 0x92, I2S = 0x93,
	LCMP = 0x94, FCMPL = 0x95, FCMPG = 0x96, DCMPL = 0x97, DCMPG = 0x98,
	IFEQ = 0x99, IFNE = 0x9A, IFLT = 0x9B, IFGE = 0x9C, IFGT = 0x9D, IFLE = 0x9E,
	IF_ICMPEQ = 0x9F, IF_ICMPNE = 0xA0, IF_ICMPLT = 0xA1, IF_ICMPGE = 0xA2,
	IF_ICMPGT = 0xA3, IF_ICMPLE = 0xA4, IF_ACMPEQ = 0xA5, IF_ACMPNE = 0xA6,
	GOTO = 0xA7, JSR = 0xA8, RET = 0xA9,
	TABLESWITCH = 0xAA, LOOKUPSWITCH = 0xAB,
	IRETURN = 0xAC, LRETURN = 0xAD, FRETURN = 0xAE, DRETURN = 0xAF,
	ARETURN = 0xB0, RETURN = 0xB1,
	GETSTATIC = 0xB2, PUTSTATIC = 0xB3, GETFIELD = 0xB4, PUTFIELD = 0xB5,
	INVOKEVIRTUAL = 0xB6, INVOKESPECIAL = 0xB7, INVOKESTATIC = 0xB8,
	INVOKEINTERFACE = 0xB9, INVOKEDYNAMIC = 0xBA,
	NEW = 0xBB, NEWARRAY = 0xBC, ANEWARRAY = 0xBD, ARRAYLENGTH = 0xBE,
	ATHROW = 0xBF, CHECKCAST = 0xC0, INSTANCEOF = 0xC1,
	MONITORENTER = 0xC2, MONITOREXIT = 0xC3,
	WIDE = 0xC4, MULTIANEWARRAY = 0xC5,
	IFNULL = 0xC6, IFNONNULL = 0xC7,
	GOTO_W = 0xC8, JSR_W = 0xC9,
}

/// Private opcode range disjoint from any valid JVM opcode (which tops out
/// at `0xC9`), used internally by `MethodWriter`'s long-branch resolution
/// pass. These never leak into an emitted class file: the
/// resolution pass inlines them before emit, or a reader pass with
/// `EXPAND_ASM_INSNS` rewrites them back into a canonical `GOTO_W`/`JSR_W`
/// sequence wrapped in `F_INSERT` frame markers.
pub mod synthetic {
	/// Marks a `GOTO_W` inserted by the inverted-branch trampoline so a
	/// subsequent reader pass knows to re-verify frame consistency at this
	/// point and insert an `F_INSERT` marker.
	pub const ASM_GOTO_W: u8 = 0xCA;
	/// Marks a `JSR_W` inserted for the same reason as `ASM_GOTO_W`.
	pub const ASM_JSR_W: u8 = 0xCB;
	/// Marks an inverted short-form conditional branch (`IF<!cond>`) that
	/// was rewritten as part of the trampoline; distinguishes "this IFEQ is
	/// original" from "this IFEQ is the inverted half of a trampoline" when
	/// a second round-trip needs to collapse the trampoline back down.
	pub const ASM_IFEQ: u8 = 0xCC;
	pub const ASM_IFNE: u8 = 0xCD;
	pub const ASM_IFLT: u8 = 0xCE;
	pub const ASM_IFGE: u8 = 0xCF;
	pub const ASM_IFGT: u8 = 0xD0;
	pub const ASM_IFLE: u8 = 0xD1;
	pub const ASM_IF_ICMPEQ: u8 = 0xD2;
	pub const ASM_IF_ICMPNE: u8 = 0xD3;
	pub const ASM_IF_ICMPLT: u8 = 0xD4;
	pub const ASM_IF_ICMPGE: u8 = 0xD5;
	pub const ASM_IF_ICMPGT: u8 = 0xD6;
	pub const ASM_IF_ICMPLE: u8 = 0xD7;
	pub const ASM_IF_ACMPEQ: u8 = 0xD8;
	pub const ASM_IF_ACMPNE: u8 = 0xD9;
	pub const ASM_GOTO: u8 = 0xDA;
	pub const ASM_JSR: u8 = 0xDB;
	pub const ASM_IFNULL: u8 = 0xDC;
	pub const ASM_IFNONNULL: u8 = 0xDD;

	pub fn is_synthetic(opcode: u8) -> bool {
		(ASM_GOTO_W..=ASM_IFNONNULL).contains(&opcode)
	}
}

impl Opcode {
	/// Net change in operand-stack *words* (not slots: a `long`/`double`
	/// counts 2) this opcode causes, for the instructions whose effect does
	/// not depend on an operand (field/method descriptor, array dimension
	/// count, constant width). Grounded in ASM's `Frame.SIZE` table
	/// (JVMS §2.11.1, per-instruction stack map in chapter 6); instructions
	/// whose delta depends on an operand return `None` and are sized by the
	/// caller from the resolved descriptor/constant instead.
	pub fn stack_delta(self) -> Option<i32> {
		use Opcode::*;
		Some(match self {
			NOP => 0,
			ACONST_NULL | ICONST_M1 | ICONST_0 | ICONST_1 | ICONST_2 | ICONST_3 | ICONST_4 | ICONST_5 => 1,
			LCONST_0 | LCONST_1 | DCONST_0 | DCONST_1 => 2,
			FCONST_0 | FCONST_1 | FCONST_2 => 1,
			IALOAD | FALOAD | AALOAD | BALOAD | CALOAD | SALOAD => -1,
			LALOAD | DALOAD => 0,
			IASTORE | FASTORE | AASTORE | BASTORE | CASTORE | SASTORE => -3,
			LASTORE | DASTORE => -4,
			POP => -1,
			POP2 => -2,
			DUP | DUP_X1 | DUP_X2 => 1,
			DUP2 | DUP2_X1 | DUP2_X2 => 2,
			SWAP => 0,
			IADD | FADD | ISUB | FSUB | IMUL | FMUL | IDIV | FDIV | IREM | FREM => -1,
			LADD | DADD | LSUB | DSUB | LMUL | DMUL | LDIV | DDIV | LREM | DREM => -2,
			INEG | LNEG | FNEG | DNEG => 0,
			ISHL | ISHR | IUSHR | LSHL | LSHR | LUSHR => -1,
			IAND | IOR | IXOR => -1,
			LAND | LOR | LXOR => -2,
			I2L | I2D | F2L | F2D => 1,
			I2F | L2D | D2L => 0,
			L2I | L2F | D2F => -1,
			F2I => 0,
			D2I => -1,
			I2B | I2C | I2S => 0,
			LCMP | DCMPL | DCMPG => -3,
			FCMPL | FCMPG => -1,
			IRETURN | FRETURN | ARETURN => -1,
			LRETURN | DRETURN => -2,
			RETURN => 0,
			ARRAYLENGTH => 0,
			ATHROW => -1,
			MONITORENTER | MONITOREXIT => -1,
			IINC => 0,
			_ => return None,
		})
	}

	/// `true` for the family of conditional/unconditional jump and `jsr`
	/// instructions that carry a 2-byte label offset.
	pub fn is_jump(self) -> bool {
		matches!(
			self,
			Opcode::IFEQ | Opcode::IFNE | Opcode::IFLT | Opcode::IFGE | Opcode::IFGT | Opcode::IFLE
				| Opcode::IF_ICMPEQ | Opcode::IF_ICMPNE | Opcode::IF_ICMPLT | Opcode::IF_ICMPGE
				| Opcode::IF_ICMPGT | Opcode::IF_ICMPLE | Opcode::IF_ACMPEQ | Opcode::IF_ACMPNE
				| Opcode::GOTO | Opcode::JSR | Opcode::IFNULL | Opcode::IFNONNULL
		)
	}

	/// The opcode of the logically-inverted condition, used when building
	/// the inverted-branch trampoline. Only meaningful for
	/// conditional jumps (not `GOTO`/`JSR`).
	pub fn inverted(self) -> Option<Opcode> {
		use Opcode::*;
		Some(match self {
			IFEQ => IFNE, IFNE => IFEQ,
			IFLT => IFGE, IFGE => IFLT,
			IFGT => IFLE, IFLE => IFGT,
			IF_ICMPEQ => IF_ICMPNE, IF_ICMPNE => IF_ICMPEQ,
			IF_ICMPLT => IF_ICMPGE, IF_ICMPGE => IF_ICMPLT,
			IF_ICMPGT => IF_ICMPLE, IF_ICMPLE => IF_ICMPGT,
			IF_ACMPEQ => IF_ACMPNE, IF_ACMPNE => IF_ACMPEQ,
			IFNULL => IFNONNULL, IFNONNULL => IFNULL,
			_ => return None,
		})
	}
}
