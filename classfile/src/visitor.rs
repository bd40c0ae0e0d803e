//! The visitor surface: the polymorphic event interfaces the reader drives and the
//! writer implements, with arbitrary user transforms composable in between.
//!
//! Every trait follows the same "default delegate" shape: a method's
//! default body forwards to `next()` if the implementor chooses to chain
//! to one, so a transforming visitor overrides only the handful of
//! `visit*` methods it cares about and inherits pass-through behaviour for
//! the rest — matching ASM's `ClassVisitor(api, ClassVisitor cv)`
//! constructor idiom without requiring Rust's trait objects to carry a
//! constructor argument. A leaf visitor (one with nothing downstream, e.g.
//! `ClassWriter`) simply never overrides `next()` and the default no-op
//! forwarding is never reached for the methods it *does* override.
//!
//! `visit_field`/`visit_method`/etc. return `Option<Box<dyn...>>`: `None`
//! means "skip this subtree": each visitor family is selected by a
//! `visit*` method returning the next visitor, or `None` to skip it.

use crate::access::AccessFlags;
use crate::label::Label;
use crate::value::ConstantValue;
use crate::version::ClassVersion;

// ---------------------------------------------------------------------
// Shared verification-type payload for visitFrame.
// ---------------------------------------------------------------------

/// The public, label-addressed counterpart of `frame::AbstractType`
///: what a `visitFrame` caller supplies or receives. Unlike the
/// internal packed representation, this is not indexed into a type table —
/// it carries its own strings/labels so user visitors need no access to a
/// `SymbolTable`.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationType {
	Top,
	Integer,
	Float,
	Double,
	Long,
	Null,
	UninitializedThis,
	Object(String),
	/// `ITEM_Uninitialized`: the label at the `new` instruction that
	/// produced this value.
	Uninitialized(Label),
}

/// The six `StackMapTable` compression forms, as a `visitFrame` selector.
/// `New` always carries the fully expanded locals/stack (as when the
/// reader runs under `EXPAND_FRAMES`);
/// the other four variants are deltas against the previously emitted frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameType {
	New,
	Full,
	Append,
	Chop,
	Same,
	Same1,
}

// ---------------------------------------------------------------------
// AnnotationVisitor
// ---------------------------------------------------------------------

pub trait AnnotationVisitor {
	fn next(&mut self) -> Option<&mut dyn AnnotationVisitor> {
		None
	}

	fn visit(&mut self, name: Option<&str>, value: ConstantValue) {
		if let Some(next) = self.next() {
			next.visit(name, value);
		}
	}

	fn visit_enum(&mut self, name: Option<&str>, descriptor: &str, value: &str) {
		if let Some(next) = self.next() {
			next.visit_enum(name, descriptor, value);
		}
	}

	fn visit_annotation(&mut self, name: Option<&str>, descriptor: &str) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_annotation(name, descriptor))
	}

	fn visit_array(&mut self, name: Option<&str>) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_array(name))
	}

	fn visit_end(&mut self) {
		if let Some(next) = self.next() {
			next.visit_end();
		}
	}
}

// ---------------------------------------------------------------------
// RecordComponentVisitor
// ---------------------------------------------------------------------

pub trait RecordComponentVisitor {
	fn next(&mut self) -> Option<&mut dyn RecordComponentVisitor> {
		None
	}

	fn visit_annotation(&mut self, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_annotation(descriptor, visible))
	}

	fn visit_type_annotation(&mut self, type_ref: u32, type_path: &str, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_type_annotation(type_ref, type_path, descriptor, visible))
	}

	fn visit_attribute(&mut self, attribute: crate::attribute::Attribute) {
		if let Some(next) = self.next() {
			next.visit_attribute(attribute);
		}
	}

	fn visit_end(&mut self) {
		if let Some(next) = self.next() {
			next.visit_end();
		}
	}
}

// ---------------------------------------------------------------------
// FieldVisitor
// ---------------------------------------------------------------------

pub trait FieldVisitor {
	fn next(&mut self) -> Option<&mut dyn FieldVisitor> {
		None
	}

	fn visit_annotation(&mut self, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_annotation(descriptor, visible))
	}

	fn visit_type_annotation(&mut self, type_ref: u32, type_path: &str, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_type_annotation(type_ref, type_path, descriptor, visible))
	}

	fn visit_attribute(&mut self, attribute: crate::attribute::Attribute) {
		if let Some(next) = self.next() {
			next.visit_attribute(attribute);
		}
	}

	fn visit_end(&mut self) {
		if let Some(next) = self.next() {
			next.visit_end();
		}
	}
}

// ---------------------------------------------------------------------
// ModuleVisitor
// ---------------------------------------------------------------------

pub trait ModuleVisitor {
	fn next(&mut self) -> Option<&mut dyn ModuleVisitor> {
		None
	}

	fn visit_main_class(&mut self, main_class: &str) {
		if let Some(next) = self.next() {
			next.visit_main_class(main_class);
		}
	}

	fn visit_package(&mut self, package_name: &str) {
		if let Some(next) = self.next() {
			next.visit_package(package_name);
		}
	}

	fn visit_require(&mut self, module: &str, access: AccessFlags, version: Option<&str>) {
		if let Some(next) = self.next() {
			next.visit_require(module, access, version);
		}
	}

	fn visit_export(&mut self, package_name: &str, access: AccessFlags, modules: &[String]) {
		if let Some(next) = self.next() {
			next.visit_export(package_name, access, modules);
		}
	}

	fn visit_open(&mut self, package_name: &str, access: AccessFlags, modules: &[String]) {
		if let Some(next) = self.next() {
			next.visit_open(package_name, access, modules);
		}
	}

	fn visit_use(&mut self, service: &str) {
		if let Some(next) = self.next() {
			next.visit_use(service);
		}
	}

	fn visit_provide(&mut self, service: &str, providers: &[String]) {
		if let Some(next) = self.next() {
			next.visit_provide(service, providers);
		}
	}

	fn visit_end(&mut self) {
		if let Some(next) = self.next() {
			next.visit_end();
		}
	}
}

// ---------------------------------------------------------------------
// MethodVisitor
// ---------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub trait MethodVisitor {
	fn next(&mut self) -> Option<&mut dyn MethodVisitor> {
		None
	}

	/// Escape hatch for the writer's copy-through fast path: a reader
	/// positioned on an untransformed method needs to tell whether the
	/// visitor it's about to replay events into is actually a
	/// `MethodWriter` sharing its constant pool, or some transform in
	/// between. Overridden by `MethodWriter` to return `Some(self)`; any
	/// other visitor's default `None` disables the fast path for it.
	fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
		None
	}

	fn visit_parameter(&mut self, name: Option<&str>, access: AccessFlags) {
		if let Some(next) = self.next() {
			next.visit_parameter(name, access);
		}
	}

	fn visit_annotation_default(&mut self) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_annotation_default())
	}

	fn visit_annotation(&mut self, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_annotation(descriptor, visible))
	}

	fn visit_type_annotation(&mut self, type_ref: u32, type_path: &str, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_type_annotation(type_ref, type_path, descriptor, visible))
	}

	fn visit_parameter_annotation(&mut self, parameter: u16, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_parameter_annotation(parameter, descriptor, visible))
	}

	fn visit_attribute(&mut self, attribute: crate::attribute::Attribute) {
		if let Some(next) = self.next() {
			next.visit_attribute(attribute);
		}
	}

	fn visit_code(&mut self) {
		if let Some(next) = self.next() {
			next.visit_code();
		}
	}

	/// Offers the whole `Code` attribute body verbatim, before any of it is
	/// decoded into individual `visit_*` calls. Returning `true` tells the
	/// reader this visitor has consumed the bytes itself and the normal
	/// decode-and-replay should be skipped entirely.
	/// Only a `MethodWriter` seeded from the same constant pool the bytes
	/// were read out of can safely accept this, since label offsets,
	/// constant-pool indices and bootstrap-method indices inside the raw
	/// bytes are meaningless once renumbered.
	fn visit_code_raw(&mut self, code_attribute_bytes: &[u8]) -> bool {
		match self.next() {
			Some(next) => next.visit_code_raw(code_attribute_bytes),
			None => false,
		}
	}

	fn visit_frame(&mut self, frame_type: FrameType, locals: &[VerificationType], stack: &[VerificationType]) {
		if let Some(next) = self.next() {
			next.visit_frame(frame_type, locals, stack);
		}
	}

	fn visit_insn(&mut self, opcode: crate::opcodes::Opcode) {
		if let Some(next) = self.next() {
			next.visit_insn(opcode);
		}
	}

	/// `BIPUSH`/`SIPUSH`/`NEWARRAY`: an instruction with one immediate
	/// integer operand.
	fn visit_int_insn(&mut self, opcode: crate::opcodes::Opcode, operand: i32) {
		if let Some(next) = self.next() {
			next.visit_int_insn(opcode, operand);
		}
	}

	fn visit_var_insn(&mut self, opcode: crate::opcodes::Opcode, var: u16) {
		if let Some(next) = self.next() {
			next.visit_var_insn(opcode, var);
		}
	}

	fn visit_type_insn(&mut self, opcode: crate::opcodes::Opcode, type_name: &str) {
		if let Some(next) = self.next() {
			next.visit_type_insn(opcode, type_name);
		}
	}

	fn visit_field_insn(&mut self, opcode: crate::opcodes::Opcode, owner: &str, name: &str, descriptor: &str) {
		if let Some(next) = self.next() {
			next.visit_field_insn(opcode, owner, name, descriptor);
		}
	}

	fn visit_method_insn(&mut self, opcode: crate::opcodes::Opcode, owner: &str, name: &str, descriptor: &str, is_interface: bool) {
		if let Some(next) = self.next() {
			next.visit_method_insn(opcode, owner, name, descriptor, is_interface);
		}
	}

	fn visit_invoke_dynamic_insn(
		&mut self,
		name: &str,
		descriptor: &str,
		bootstrap_method: &crate::handle::Handle,
		bootstrap_method_arguments: &[ConstantValue],
	) {
		if let Some(next) = self.next() {
			next.visit_invoke_dynamic_insn(name, descriptor, bootstrap_method, bootstrap_method_arguments);
		}
	}

	fn visit_jump_insn(&mut self, opcode: crate::opcodes::Opcode, label: &Label) {
		if let Some(next) = self.next() {
			next.visit_jump_insn(opcode, label);
		}
	}

	fn visit_label(&mut self, label: &Label) {
		if let Some(next) = self.next() {
			next.visit_label(label);
		}
	}

	fn visit_ldc_insn(&mut self, value: ConstantValue) {
		if let Some(next) = self.next() {
			next.visit_ldc_insn(value);
		}
	}

	fn visit_iinc_insn(&mut self, var: u16, increment: i32) {
		if let Some(next) = self.next() {
			next.visit_iinc_insn(var, increment);
		}
	}

	fn visit_table_switch_insn(&mut self, min: i32, max: i32, default: &Label, labels: &[Label]) {
		if let Some(next) = self.next() {
			next.visit_table_switch_insn(min, max, default, labels);
		}
	}

	fn visit_lookup_switch_insn(&mut self, default: &Label, keys: &[i32], labels: &[Label]) {
		if let Some(next) = self.next() {
			next.visit_lookup_switch_insn(default, keys, labels);
		}
	}

	fn visit_multi_a_new_array_insn(&mut self, descriptor: &str, num_dimensions: u8) {
		if let Some(next) = self.next() {
			next.visit_multi_a_new_array_insn(descriptor, num_dimensions);
		}
	}

	fn visit_insn_annotation(&mut self, type_ref: u32, type_path: &str, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_insn_annotation(type_ref, type_path, descriptor, visible))
	}

	fn visit_try_catch_block(&mut self, start: &Label, end: &Label, handler: &Label, type_name: Option<&str>) {
		if let Some(next) = self.next() {
			next.visit_try_catch_block(start, end, handler, type_name);
		}
	}

	fn visit_try_catch_annotation(&mut self, type_ref: u32, type_path: &str, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_try_catch_annotation(type_ref, type_path, descriptor, visible))
	}

	fn visit_local_variable(&mut self, name: &str, descriptor: &str, signature: Option<&str>, start: &Label, end: &Label, index: u16) {
		if let Some(next) = self.next() {
			next.visit_local_variable(name, descriptor, signature, start, end, index);
		}
	}

	fn visit_local_variable_annotation(
		&mut self,
		type_ref: u32,
		type_path: &str,
		start: &[Label],
		end: &[Label],
		index: &[u16],
		descriptor: &str,
		visible: bool,
	) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_local_variable_annotation(type_ref, type_path, start, end, index, descriptor, visible))
	}

	fn visit_line_number(&mut self, line: u16, start: &Label) {
		if let Some(next) = self.next() {
			next.visit_line_number(line, start);
		}
	}

	fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) {
		if let Some(next) = self.next() {
			next.visit_maxs(max_stack, max_locals);
		}
	}

	fn visit_end(&mut self) {
		if let Some(next) = self.next() {
			next.visit_end();
		}
	}
}

// ---------------------------------------------------------------------
// ClassVisitor
// ---------------------------------------------------------------------

pub trait ClassVisitor {
	fn next(&mut self) -> Option<&mut dyn ClassVisitor> {
		None
	}

	#[allow(clippy::too_many_arguments)]
	fn visit(
		&mut self,
		version: ClassVersion,
		access: AccessFlags,
		name: &str,
		signature: Option<&str>,
		super_name: Option<&str>,
		interfaces: &[String],
	) {
		if let Some(next) = self.next() {
			next.visit(version, access, name, signature, super_name, interfaces);
		}
	}

	fn visit_source(&mut self, source: Option<&str>, debug: Option<&str>) {
		if let Some(next) = self.next() {
			next.visit_source(source, debug);
		}
	}

	fn visit_module(&mut self, name: &str, access: AccessFlags, version: Option<&str>) -> Option<Box<dyn ModuleVisitor>> {
		self.next().and_then(|n| n.visit_module(name, access, version))
	}

	fn visit_nest_host(&mut self, nest_host: &str) {
		if let Some(next) = self.next() {
			next.visit_nest_host(nest_host);
		}
	}

	fn visit_outer_class(&mut self, owner: &str, name: Option<&str>, descriptor: Option<&str>) {
		if let Some(next) = self.next() {
			next.visit_outer_class(owner, name, descriptor);
		}
	}

	fn visit_annotation(&mut self, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_annotation(descriptor, visible))
	}

	fn visit_type_annotation(&mut self, type_ref: u32, type_path: &str, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		self.next().and_then(|n| n.visit_type_annotation(type_ref, type_path, descriptor, visible))
	}

	fn visit_attribute(&mut self, attribute: crate::attribute::Attribute) {
		if let Some(next) = self.next() {
			next.visit_attribute(attribute);
		}
	}

	fn visit_nest_member(&mut self, nest_member: &str) {
		if let Some(next) = self.next() {
			next.visit_nest_member(nest_member);
		}
	}

	fn visit_permitted_subclass(&mut self, permitted_subclass: &str) {
		if let Some(next) = self.next() {
			next.visit_permitted_subclass(permitted_subclass);
		}
	}

	fn visit_inner_class(&mut self, name: &str, outer_name: Option<&str>, inner_name: Option<&str>, access: AccessFlags) {
		if let Some(next) = self.next() {
			next.visit_inner_class(name, outer_name, inner_name, access);
		}
	}

	fn visit_record_component(&mut self, name: &str, descriptor: &str, signature: Option<&str>) -> Option<Box<dyn RecordComponentVisitor>> {
		self.next().and_then(|n| n.visit_record_component(name, descriptor, signature))
	}

	fn visit_field(
		&mut self,
		access: AccessFlags,
		name: &str,
		descriptor: &str,
		signature: Option<&str>,
		value: Option<ConstantValue>,
	) -> Option<Box<dyn FieldVisitor>> {
		self.next().and_then(|n| n.visit_field(access, name, descriptor, signature, value))
	}

	fn visit_method(
		&mut self,
		access: AccessFlags,
		name: &str,
		descriptor: &str,
		signature: Option<&str>,
		exceptions: &[String],
	) -> Option<Box<dyn MethodVisitor>> {
		self.next().and_then(|n| n.visit_method(access, name, descriptor, signature, exceptions))
	}

	fn visit_end(&mut self) {
		if let Some(next) = self.next() {
			next.visit_end();
		}
	}
}

/// A no-op terminal visitor, used by a transformer that wants to drop a
/// subtree's events entirely while still satisfying the "return `Some`
/// to keep visiting children" contract (e.g. a method-stripping transform
/// returns `None` instead, but an annotation-stripping transform that must
/// still balance nested `visit_annotation`/`visit_array` calls can delegate
/// to this).
pub struct NoopClassVisitor;
impl ClassVisitor for NoopClassVisitor {}

pub struct NoopFieldVisitor;
impl FieldVisitor for NoopFieldVisitor {}

pub struct NoopMethodVisitor;
impl MethodVisitor for NoopMethodVisitor {}

pub struct NoopAnnotationVisitor;
impl AnnotationVisitor for NoopAnnotationVisitor {}

pub struct NoopRecordComponentVisitor;
impl RecordComponentVisitor for NoopRecordComponentVisitor {}

pub struct NoopModuleVisitor;
impl ModuleVisitor for NoopModuleVisitor {}
