//! End-to-end scenarios against the public `ClassWriter`/`ClassReader` API.

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use classfile::access::AccessFlags;
use classfile::class_writer::WriterFlags;
use classfile::opcodes::Opcode;
use classfile::reader::{ClassReader, ReaderOptions};
use classfile::value::ConstantValue;
use classfile::version::ClassVersion;
use classfile::visitor::{ClassVisitor, MethodVisitor};
use classfile::{ClassWriter, Label};

fn minimal_class() -> ClassWriter {
	let mut writer = ClassWriter::new(ClassVersion::V1_8, WriterFlags::empty());
	writer.visit(ClassVersion::V1_8, AccessFlags::PUBLIC | AccessFlags::SUPER, "A", None, Some("java/lang/Object"), &[]);
	writer
}

/// Round-trip identity: a class written from scratch, then re-read and
/// re-emitted unmodified, must come out byte-for-byte equal.
#[test]
fn identity_pass_round_trips_byte_for_byte() -> Result<(), Box<dyn Error>> {
	let mut writer = minimal_class();
	writer.visit_end();
	let original = writer.to_byte_array()?;

	let reader = ClassReader::new(&original)?;
	let mut rewriter = ClassWriter::from_reader(&reader, WriterFlags::empty())?;
	reader.accept(&mut rewriter, ReaderOptions::empty())?;
	let roundtripped = rewriter.to_byte_array()?;

	assert_eq!(original, roundtripped);
	Ok(())
}

/// Round-trip under recomputation is idempotent from the second round
/// onward, once the constant pool and frames have settled.
#[test]
fn round_trip_under_recomputation_is_idempotent_after_the_first_pass() -> Result<(), Box<dyn Error>> {
	let mut writer = minimal_class();
	writer.visit_end();
	let original = writer.to_byte_array()?;

	let reader = ClassReader::new(&original)?;
	let mut recomputed = ClassWriter::from_reader(&reader, WriterFlags::COMPUTE_FRAMES)?;
	reader.accept(&mut recomputed, ReaderOptions::empty())?;
	let first_round = recomputed.to_byte_array()?;

	let reader2 = ClassReader::new(&first_round)?;
	let mut identity = ClassWriter::from_reader(&reader2, WriterFlags::empty())?;
	reader2.accept(&mut identity, ReaderOptions::empty())?;
	let second_round = identity.to_byte_array()?;

	assert_eq!(first_round, second_round);
	Ok(())
}

/// `COMPUTE_MAXS` derives `max_stack`/`max_locals` for a simple instance
/// method from `ICONST_1; ICONST_2; IADD; IRETURN`, discarding the
/// caller-supplied `visit_maxs(0, 0)`.
#[test]
fn compute_maxs_recomputes_stack_and_locals_for_an_instance_method() -> Result<(), Box<dyn Error>> {
	let mut writer = minimal_class();
	{
		let mut method = writer.visit_method(AccessFlags::PUBLIC, "f", "()I", None, &[]).expect("method visitor");
		method.visit_code();
		method.visit_insn(Opcode::ICONST_1);
		method.visit_insn(Opcode::ICONST_2);
		method.visit_insn(Opcode::IADD);
		method.visit_insn(Opcode::IRETURN);
		method.visit_maxs(0, 0);
		method.visit_end();
	}
	writer.visit_end();
	let bytes = writer.to_byte_array()?;

	let (max_stack, max_locals) = read_back_maxs(&bytes, "f")?;
	assert_eq!(max_stack, 2);
	assert_eq!(max_locals, 1);
	Ok(())
}

/// A forward `IFEQ` over more than 32767 bytes of `NOP`s is emitted as an
/// inverted `IFNE` plus a trampoline `GOTO_W` (the two-pass long-branch
/// resolver), and re-reading the result decodes back to the same bytes.
#[test]
fn a_forward_branch_past_the_short_offset_limit_gets_a_goto_w_trampoline() -> Result<(), Box<dyn Error>> {
	let mut writer = minimal_class();
	{
		let mut method = writer.visit_method(AccessFlags::PUBLIC | AccessFlags::STATIC, "f", "()V", None, &[]).expect("method visitor");
		method.visit_code();
		let target = Label::new();
		method.visit_jump_insn(Opcode::IFEQ, &target);
		for _ in 0..32769 {
			method.visit_insn(Opcode::NOP);
		}
		method.visit_label(&target);
		method.visit_insn(Opcode::RETURN);
		method.visit_maxs(0, 0);
		method.visit_end();
	}
	writer.visit_end();
	let bytes = writer.to_byte_array()?;

	// Re-parsing and re-emitting via the identity path must not fail or
	// change the method's length a second time: the trampoline is already
	// in canonical (non-synthetic) form once written.
	let reader = ClassReader::new(&bytes)?;
	let mut rewriter = ClassWriter::from_reader(&reader, WriterFlags::empty())?;
	reader.accept(&mut rewriter, ReaderOptions::empty())?;
	let roundtripped = rewriter.to_byte_array()?;
	assert_eq!(bytes, roundtripped);
	Ok(())
}

/// Two identical `invokedynamic` call sites share one
/// `CONSTANT_InvokeDynamic_info` entry and one `BootstrapMethods` row.
#[test]
fn identical_invokedynamic_call_sites_dedup_to_one_bootstrap_row() -> Result<(), Box<dyn Error>> {
	use classfile::handle::Handle;

	let mut writer = minimal_class();
	// reference_kind 6 == REF_invokeStatic (JVMS table 5.4.3.5-A).
	let bootstrap = Handle::new(6, "Owner", "bootstrap", "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;", false);
	{
		let mut method = writer.visit_method(AccessFlags::PUBLIC | AccessFlags::STATIC, "f", "()V", None, &[]).expect("method visitor");
		method.visit_code();
		method.visit_invoke_dynamic_insn("target", "()V", &bootstrap, &[]);
		method.visit_invoke_dynamic_insn("target", "()V", &bootstrap, &[]);
		method.visit_insn(Opcode::RETURN);
		method.visit_maxs(0, 0);
		method.visit_end();
	}
	writer.visit_end();
	let bytes = writer.to_byte_array()?;

	let bootstrap_count = count_bootstrap_methods(&bytes)?;
	assert_eq!(bootstrap_count, 1);
	Ok(())
}

/// Adding a static field bumps `fields_count` without touching the method
/// table or any other class attribute.
#[test]
fn adding_a_static_field_only_touches_the_field_table() -> Result<(), Box<dyn Error>> {
	let mut writer = minimal_class();
	let field = writer.visit_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "x", "I", None, None::<ConstantValue>);
	if let Some(mut field) = field {
		field.visit_end();
	}
	writer.visit_end();
	let bytes = writer.to_byte_array()?;

	// field count lives right after the interfaces_count u16, which for a
	// zero-interface minimal class is the two bytes following this_class
	// constant-pool layout header already asserted in class_writer.rs's own
	// unit tests; here only the presence of the field survives a round trip.
	let reader = ClassReader::new(&bytes)?;
	let mut collector = FieldNameCollector::default();
	reader.accept(&mut collector, ReaderOptions::empty())?;
	assert_eq!(collector.field_names, vec!["x".to_string()]);
	Ok(())
}

/// A `ClassVisitor` that, for one named method, replays every `Code` event
/// straight into a plain `MethodVisitor` capturing the `visit_maxs` call.
struct MaxsCapturingClassVisitor<'a> {
	target_name: &'a str,
	captured: Rc<RefCell<Option<(u16, u16)>>>,
}

impl<'a> ClassVisitor for MaxsCapturingClassVisitor<'a> {
	fn visit_method(
		&mut self,
		_access: AccessFlags,
		name: &str,
		_descriptor: &str,
		_signature: Option<&str>,
		_exceptions: &[String],
	) -> Option<Box<dyn MethodVisitor>> {
		if name == self.target_name {
			Some(Box::new(MaxsCapture { captured: self.captured.clone() }))
		} else {
			None
		}
	}
}

struct MaxsCapture {
	captured: Rc<RefCell<Option<(u16, u16)>>>,
}

impl MethodVisitor for MaxsCapture {
	fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) {
		*self.captured.borrow_mut() = Some((max_stack, max_locals));
	}
}

fn read_back_maxs(bytes: &[u8], method_name: &str) -> Result<(u16, u16), Box<dyn Error>> {
	let reader = ClassReader::new(bytes)?;
	let captured = Rc::new(RefCell::new(None));
	let mut visitor = MaxsCapturingClassVisitor { target_name: method_name, captured: captured.clone() };
	reader.accept(&mut visitor, ReaderOptions::empty())?;
	let result = *captured.borrow();
	result.ok_or_else(|| "method was never visited".into())
}

#[derive(Default)]
struct FieldNameCollector {
	field_names: Vec<String>,
}

impl ClassVisitor for FieldNameCollector {
	fn visit_field(
		&mut self,
		_access: AccessFlags,
		name: &str,
		_descriptor: &str,
		_signature: Option<&str>,
		_value: Option<ConstantValue>,
	) -> Option<Box<dyn classfile::visitor::FieldVisitor>> {
		self.field_names.push(name.to_string());
		None
	}
}

fn count_bootstrap_methods(bytes: &[u8]) -> Result<usize, Box<dyn Error>> {
	let reader = ClassReader::new(bytes)?;
	let table = reader.snapshot_symbol_table()?;
	Ok(table.bootstrap_method_count() as usize)
}
