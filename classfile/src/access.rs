//! Access-flag bitsets.

use bitflags::bitflags;

bitflags! {
	/// The 16-bit JVMS access-flag set plus the two core-internal high bits
	/// that must be stripped before serialisation. Shared across
	/// class, field, method, inner-class and module-requires contexts; not
	/// every flag is legal in every context, but the JVM spec reuses bit
	/// positions across them, so one bitset backs all of them.
	#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
	pub struct AccessFlags: u32 {
		const PUBLIC = 0x0001;
		const PRIVATE = 0x0002;
		const PROTECTED = 0x0004;
		const STATIC = 0x0008;
		const FINAL = 0x0010;
		const SUPER = 0x0020;
		const SYNCHRONIZED = 0x0020;
		const OPEN = 0x0020;
		const TRANSITIVE = 0x0020;
		const VOLATILE = 0x0040;
		const BRIDGE = 0x0040;
		const STATIC_PHASE = 0x0040;
		const VARARGS = 0x0080;
		const TRANSIENT = 0x0080;
		const NATIVE = 0x0100;
		const INTERFACE = 0x0200;
		const ABSTRACT = 0x0400;
		const STRICT = 0x0800;
		const SYNTHETIC = 0x1000;
		const ANNOTATION = 0x2000;
		const ENUM = 0x4000;
		const MANDATED = 0x8000;
		const MODULE = 0x8000;

		/// Core-internal: set on classes compiled as records. Stripped
		/// before serialisation.
		const RECORD = 0x1_0000;
		/// Core-internal: carried on the event stream for elements the
		/// source marked `@Deprecated` so the writer can emit a
		/// `Deprecated` attribute without re-parsing annotations. Stripped
		/// before serialisation.
		const DEPRECATED = 0x2_0000;
	}
}

/// The two core-internal high bits, not part of the JVMS-defined 16-bit
/// range and therefore masked off whenever flags are serialized.
const CORE_INTERNAL_MASK: u32 = AccessFlags::RECORD.bits() | AccessFlags::DEPRECATED.bits();

impl AccessFlags {
	/// The JVMS-legal 16-bit subset, as written to a `access_flags` field.
	pub fn to_jvms_bits(self) -> u16 {
		(self.bits() & !CORE_INTERNAL_MASK) as u16
	}

	pub fn from_jvms_bits(bits: u16) -> Self {
		AccessFlags::from_bits_truncate(bits as u32)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn internal_bits_are_stripped_on_serialize() {
		let flags = AccessFlags::PUBLIC | AccessFlags::RECORD | AccessFlags::DEPRECATED;
		assert_eq!(flags.to_jvms_bits(), AccessFlags::PUBLIC.bits() as u16);
	}
}
