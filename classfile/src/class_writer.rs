//! `ClassWriter`: the `ClassVisitor` implementation that materialises a
//! `ClassFile` structure back into bytes. Owns the
//! `SymbolTable` (C2) and hands a borrow of it, via [`SharedSymbolTable`],
//! to every per-element sub-writer it spawns: `FieldWriter`, `MethodWriter`,
//! `RecordComponentWriter`, `ModuleWriter`.
//!
//! Two independent choices shape how a method's `max_stack`/`max_locals`
//! and `StackMapTable` get produced: `COMPUTE_MAXS` (classic
//! stack-delta bookkeeping) and `COMPUTE_FRAMES` (full abstract
//! reinterpretation, which implies `COMPUTE_MAXS`). Both are plumbed
//! straight through to every `MethodWriter` this class spawns; `MethodWriter`
//! itself picks which algorithm runs (see its module doc).

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::access::AccessFlags;
use crate::annotation_writer::{write_annotations_attribute, write_type_annotations_attribute, CollectedAnnotation, CollectedKeyedAnnotation, TypeAnnotationKey};
use crate::attribute::Attribute;
use crate::bytevector::ByteVector;
use crate::common_super::{ClassHierarchy, TrivialClassHierarchy};
use crate::error::{ErrorSink, Result};
use crate::field_writer::{encode_simple_target_prefix, write_attribute_header, FieldWriter};
use crate::method_writer::MethodWriter;
use crate::module_writer::{ModuleAttributes, ModuleWriter};
use crate::reader::ClassReader;
use crate::record_writer::RecordComponentWriter;
use crate::symbol_table::SharedSymbolTable;
use crate::value::ConstantValue;
use crate::version::ClassVersion;
use crate::visitor::{AnnotationVisitor, ClassVisitor, FieldVisitor, MethodVisitor, ModuleVisitor, RecordComponentVisitor};

bitflags! {
	/// The writer's two configuration bits. Neither flag
	/// affects anything but method bodies — field/record/module/annotation
	/// writers behave identically either way.
	#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
	pub struct WriterFlags: u32 {
		/// Ignore any user-supplied `max_stack`/`max_locals` and compute
		/// them from the bytecode.
		const COMPUTE_MAXS = 0x01;
		/// Ignore user-supplied frames (and `max_stack`/`max_locals`) and
		/// recompute everything via abstract interpretation. Implies
		/// `COMPUTE_MAXS`.
		const COMPUTE_FRAMES = 0x02;
	}
}

struct OuterClass {
	owner_index: u16,
	method_index: u16,
}

struct InnerClassEntry {
	name: String,
	name_index: u16,
	outer_index: u16,
	inner_name_index: u16,
	access: AccessFlags,
}

/// Emits a `ClassFile` structure from the stream of `ClassVisitor` events
/// it receives. Construct with [`ClassWriter::new`] for a
/// from-scratch class, or [`ClassWriter::from_reader`] to seed the
/// constant pool from an existing one and enable the copy-through fast
/// path for untransformed methods (the constant-pool mostly-add fast
/// path and method copy-through).
pub struct ClassWriter {
	table: SharedSymbolTable,
	errors: ErrorSink,
	flags: WriterFlags,
	hierarchy: Rc<dyn ClassHierarchy>,
	/// `true` when this writer's `SymbolTable` was seeded verbatim from a
	/// `ClassReader`, the precondition for the method
	/// copy-through fast path.
	can_copy_through: bool,

	version: ClassVersion,
	access: AccessFlags,
	this_class_name: String,
	this_class_index: u16,
	super_class_index: u16,
	interface_indices: Vec<u16>,

	source_file_index: Option<u16>,
	source_debug_extension: Option<Vec<u8>>,
	signature_index: Option<u16>,

	module_out: ModuleAttributes,
	module_started: bool,

	nest_host_index: Option<u16>,
	outer_class: Option<OuterClass>,

	visible_annotations: Rc<RefCell<Vec<Vec<u8>>>>,
	invisible_annotations: Rc<RefCell<Vec<Vec<u8>>>>,
	visible_type_annotations: Rc<RefCell<Vec<(TypeAnnotationKey, Vec<u8>)>>>,
	invisible_type_annotations: Rc<RefCell<Vec<(TypeAnnotationKey, Vec<u8>)>>>,
	synthetic_attributes: Vec<Attribute>,

	nest_members: Vec<u16>,
	permitted_subclasses: Vec<u16>,
	/// Deduplicated by class name: a second `visit_inner_class` for an already-recorded
	/// name is a no-op.
	inner_classes: Vec<InnerClassEntry>,

	record_components: Vec<RecordComponentWriter>,
	fields: Vec<FieldWriter>,
	methods: Vec<MethodWriter>,
}

impl ClassWriter {
	/// A fresh writer with an empty `SymbolTable`, targeting `version`.
	pub fn new(version: ClassVersion, flags: WriterFlags) -> Self {
		Self::new_with_table(SharedSymbolTable::new(), version, flags, false, Rc::new(TrivialClassHierarchy))
	}

	/// Seeds the writer's `SymbolTable` from `reader`'s already-parsed
	/// constant pool: a class copied through unmodified reproduces its
	/// input byte-for-byte, and any method whose immediate downstream
	/// visitor is this writer's own `MethodWriter` is eligible for the
	/// copy-through optimisation.
	pub fn from_reader(reader: &ClassReader, flags: WriterFlags) -> Result<Self> {
		let table = SharedSymbolTable::from_table(reader.snapshot_symbol_table()?);
		Ok(Self::new_with_table(table, reader.class_version(), flags, true, Rc::new(TrivialClassHierarchy)))
	}

	fn new_with_table(table: SharedSymbolTable, version: ClassVersion, flags: WriterFlags, can_copy_through: bool, hierarchy: Rc<dyn ClassHierarchy>) -> Self {
		Self {
			table,
			errors: ErrorSink::new(),
			flags,
			hierarchy,
			can_copy_through,
			version,
			access: AccessFlags::empty(),
			this_class_name: String::new(),
			this_class_index: 0,
			super_class_index: 0,
			interface_indices: Vec::new(),
			source_file_index: None,
			source_debug_extension: None,
			signature_index: None,
			module_out: Rc::default(),
			module_started: false,
			nest_host_index: None,
			outer_class: None,
			visible_annotations: Rc::default(),
			invisible_annotations: Rc::default(),
			visible_type_annotations: Rc::default(),
			invisible_type_annotations: Rc::default(),
			synthetic_attributes: Vec::new(),
			nest_members: Vec::new(),
			permitted_subclasses: Vec::new(),
			inner_classes: Vec::new(),
			record_components: Vec::new(),
			fields: Vec::new(),
			methods: Vec::new(),
		}
	}

	/// Supplies the common-super-type oracle frame synthesis consults when
	/// merging two reference types (JVMS §4.10.1.3). Defaults to
	/// [`TrivialClassHierarchy`], which only ever resolves to
	/// `java/lang/Object` for non-identical types — adequate when no
	/// classpath is available, but a real compiler pipeline should supply
	/// a classloader- or index-backed oracle before relying on
	/// `COMPUTE_FRAMES` for anything beyond trivial merges.
	pub fn with_hierarchy(mut self, hierarchy: Rc<dyn ClassHierarchy>) -> Self {
		self.hierarchy = hierarchy;
		self
	}

	fn compute_maxs(&self) -> bool {
		self.flags.intersects(WriterFlags::COMPUTE_MAXS | WriterFlags::COMPUTE_FRAMES)
	}

	fn compute_frames(&self) -> bool {
		self.flags.contains(WriterFlags::COMPUTE_FRAMES)
	}

	/// Assembles and returns the complete `ClassFile` binary, assembling
	/// attributes via the symbol table and emitting the final bytes.
	/// Validates the class-wide size limit before returning; per-method
	/// size failures surface through the same error sink as every other
	/// fallible `visit*` call.
	#[cfg_attr(feature = "tracing", tracing::instrument(skip(self), fields(mode = ?self.flags, method_count = self.methods.len())))]
	pub fn to_byte_array(&self) -> Result<Vec<u8>> {
		self.errors.check()?;

		let mut out = ByteVector::with_capacity(1024);
		out.put_u32(crate::version::MAGIC);
		out.put_u16(self.version.minor());
		out.put_u16(self.version.major());

		{
			let table = self.table.borrow();
			table.put_constant_pool(&mut out)?;
		}

		out.put_u16(self.access.to_jvms_bits());
		out.put_u16(self.this_class_index);
		out.put_u16(self.super_class_index);

		out.put_u16(self.interface_indices.len() as u16);
		for index in &self.interface_indices {
			out.put_u16(*index);
		}

		out.put_u16(self.fields.len() as u16);
		for field in &self.fields {
			field.write(&mut out);
		}

		out.put_u16(self.methods.len() as u16);
		for method in &self.methods {
			method.write(&mut out);
		}

		self.write_class_attributes(&mut out)?;

		self.errors.check()?;
		Ok(out.into_bytes())
	}

	/// Class attribute table, ordered per JVMS §4.7.
	fn write_class_attributes(&self, out: &mut ByteVector) -> Result<()> {
		let mut count = 0u16;
		let mut body = ByteVector::new();

		if let Some(index) = self.source_file_index {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "SourceFile", |b| b.put_u16(index));
		}
		if let Some(bytes) = &self.source_debug_extension {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "SourceDebugExtension", |b| b.put_bytes(bytes));
		}
		for (name, attribute_body) in self.module_out.borrow().iter() {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, name, |b| b.put_bytes(attribute_body));
		}
		if let Some(index) = self.nest_host_index {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "NestHost", |b| b.put_u16(index));
		}
		if !self.nest_members.is_empty() {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "NestMembers", |b| {
				b.put_u16(self.nest_members.len() as u16);
				for index in &self.nest_members {
					b.put_u16(*index);
				}
			});
		}
		if !self.permitted_subclasses.is_empty() {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "PermittedSubclasses", |b| {
				b.put_u16(self.permitted_subclasses.len() as u16);
				for index in &self.permitted_subclasses {
					b.put_u16(*index);
				}
			});
		}
		if let Some(outer) = &self.outer_class {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "EnclosingMethod", |b| {
				b.put_u16(outer.owner_index);
				b.put_u16(outer.method_index);
			});
		}
		if self.access.contains(AccessFlags::SYNTHETIC) {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "Synthetic", |_| {});
		}
		if self.access.contains(AccessFlags::DEPRECATED) {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "Deprecated", |_| {});
		}
		if let Some(index) = self.signature_index {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "Signature", |b| b.put_u16(index));
		}
		if !self.record_components.is_empty() {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "Record", |b| {
				b.put_u16(self.record_components.len() as u16);
				for component in &self.record_components {
					component.write(b);
				}
			});
		}
		if !self.inner_classes.is_empty() {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "InnerClasses", |b| {
				b.put_u16(self.inner_classes.len() as u16);
				for entry in &self.inner_classes {
					b.put_u16(entry.name_index);
					b.put_u16(entry.outer_index);
					b.put_u16(entry.inner_name_index);
					b.put_u16(entry.access.to_jvms_bits());
				}
			});
		}
		let visible = self.visible_annotations.borrow();
		if !visible.is_empty() {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "RuntimeVisibleAnnotations", |b| write_annotations_attribute(b, &visible));
		}
		let invisible = self.invisible_annotations.borrow();
		if !invisible.is_empty() {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "RuntimeInvisibleAnnotations", |b| write_annotations_attribute(b, &invisible));
		}
		let visible_type = self.visible_type_annotations.borrow();
		if !visible_type.is_empty() {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "RuntimeVisibleTypeAnnotations", |b| {
				write_type_annotations_attribute(b, &visible_type);
			});
		}
		let invisible_type = self.invisible_type_annotations.borrow();
		if !invisible_type.is_empty() {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "RuntimeInvisibleTypeAnnotations", |b| {
				write_type_annotations_attribute(b, &invisible_type);
			});
		}
		for attribute in &self.synthetic_attributes {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, &attribute.name, |b| b.put_bytes(&attribute.content));
		}
		// BootstrapMethods comes last: emitting every other attribute and
		// every field/method first means any constant they intern (and
		// therefore any bootstrap method they reference) is already
		// present in the table by the time this reads it.
		if self.table.borrow().bootstrap_method_count() > 0 {
			count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "BootstrapMethods", |b| {
				self.table.borrow().put_bootstrap_methods(b);
			});
		}

		out.put_u16(count);
		out.put_bytes(body.as_bytes());
		Ok(())
	}
}

impl ClassVisitor for ClassWriter {
	fn visit(&mut self, version: ClassVersion, access: AccessFlags, name: &str, signature: Option<&str>, super_name: Option<&str>, interfaces: &[String]) {
		self.version = version;
		self.access = access;
		self.this_class_name = name.to_string();
		let mut table = self.table.borrow_mut();
		self.this_class_index = self.errors.record(table.add_class(name)).map(|s| s.index as u16).unwrap_or(0);
		self.super_class_index = match super_name {
			Some(super_name) => self.errors.record(table.add_class(super_name)).map(|s| s.index as u16).unwrap_or(0),
			None => 0,
		};
		self.interface_indices = interfaces.iter().filter_map(|i| self.errors.record(table.add_class(i)).map(|s| s.index as u16)).collect();
		self.signature_index = signature.and_then(|s| self.errors.record(table.add_utf8(s))).map(|s| s.index as u16);
	}

	fn visit_source(&mut self, source: Option<&str>, debug: Option<&str>) {
		if let Some(source) = source {
			self.source_file_index = self.errors.record(self.table.borrow_mut().add_utf8(source)).map(|s| s.index as u16);
		}
		if let Some(debug) = debug {
			// JSR-45 debug_extension bytes are plain UTF-8, not Modified
			// UTF-8 (JVMS §4.7.11) — unlike every other string in the
			// class file, this one is not routed through the constant
			// pool's MUTF-8 encoder at all.
			self.source_debug_extension = Some(debug.as_bytes().to_vec());
		}
	}

	fn visit_module(&mut self, name: &str, access: AccessFlags, version: Option<&str>) -> Option<Box<dyn ModuleVisitor>> {
		self.module_started = true;
		Some(Box::new(ModuleWriter::new(self.table.clone(), self.errors.clone(), self.module_out.clone(), name, access, version)))
	}

	fn visit_nest_host(&mut self, nest_host: &str) {
		self.nest_host_index = self.errors.record(self.table.borrow_mut().add_class(nest_host)).map(|s| s.index as u16);
	}

	fn visit_outer_class(&mut self, owner: &str, name: Option<&str>, descriptor: Option<&str>) {
		let mut table = self.table.borrow_mut();
		let Some(owner_index) = self.errors.record(table.add_class(owner)) else { return };
		let method_index = match (name, descriptor) {
			(Some(name), Some(descriptor)) => self.errors.record(table.add_name_and_type(name, descriptor)).map(|s| s.index as u16).unwrap_or(0),
			_ => 0,
		};
		self.outer_class = Some(OuterClass { owner_index: owner_index.index as u16, method_index });
	}

	fn visit_annotation(&mut self, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		let target = if visible { &self.visible_annotations } else { &self.invisible_annotations };
		Some(CollectedAnnotation::start(self.table.clone(), self.errors.clone(), descriptor, target.clone()))
	}

	fn visit_type_annotation(&mut self, type_ref: u32, type_path: &str, descriptor: &str, visible: bool) -> Option<Box<dyn AnnotationVisitor>> {
		let target_prefix = encode_simple_target_prefix(type_ref, type_path);
		let target = if visible { &self.visible_type_annotations } else { &self.invisible_type_annotations };
		Some(CollectedKeyedAnnotation::start(
			self.table.clone(),
			self.errors.clone(),
			descriptor,
			TypeAnnotationKey { target_prefix },
			target.clone(),
		))
	}

	fn visit_attribute(&mut self, attribute: Attribute) {
		self.synthetic_attributes.push(attribute);
	}

	fn visit_nest_member(&mut self, nest_member: &str) {
		if let Some(index) = self.errors.record(self.table.borrow_mut().add_class(nest_member)) {
			self.nest_members.push(index.index as u16);
		}
	}

	fn visit_permitted_subclass(&mut self, permitted_subclass: &str) {
		if let Some(index) = self.errors.record(self.table.borrow_mut().add_class(permitted_subclass)) {
			self.permitted_subclasses.push(index.index as u16);
		}
	}

	/// Deduplicates by class name: re-visiting an already-recorded name is a no-op, so
	/// a transform that walks the same class twice (or a reader that
	/// re-synthesises an `InnerClasses` entry it already saw) never emits
	/// two rows for the same class.
	fn visit_inner_class(&mut self, name: &str, outer_name: Option<&str>, inner_name: Option<&str>, access: AccessFlags) {
		if self.inner_classes.iter().any(|e| e.name == name) {
			return;
		}
		let mut table = self.table.borrow_mut();
		let Some(name_sym) = self.errors.record(table.add_class(name)) else { return };
		let outer_index = match outer_name {
			Some(outer_name) => self.errors.record(table.add_class(outer_name)).map(|s| s.index as u16).unwrap_or(0),
			None => 0,
		};
		let inner_name_index = match inner_name {
			Some(inner_name) => self.errors.record(table.add_utf8(inner_name)).map(|s| s.index as u16).unwrap_or(0),
			None => 0,
		};
		self.inner_classes.push(InnerClassEntry {
			name: name.to_string(),
			name_index: name_sym.index as u16,
			outer_index,
			inner_name_index,
			access,
		});
	}

	fn visit_record_component(&mut self, name: &str, descriptor: &str, signature: Option<&str>) -> Option<Box<dyn RecordComponentVisitor>> {
		let writer = RecordComponentWriter::new(self.table.clone(), self.errors.clone(), name, descriptor, signature);
		self.record_components.push(writer);
		// The real writer stays in `self.record_components` so
		// `write_class_attributes` can serialize it later; the caller gets
		// a proxy that forwards every event to it by index.
		let index = self.record_components.len() - 1;
		Some(Box::new(RecordComponentProxy { components: SelfPtr(self as *mut Self), index }))
	}

	fn visit_field(
		&mut self,
		access: AccessFlags,
		name: &str,
		descriptor: &str,
		signature: Option<&str>,
		value: Option<ConstantValue>,
	) -> Option<Box<dyn FieldVisitor>> {
		let writer = FieldWriter::new(self.table.clone(), self.errors.clone(), access, name, descriptor, signature, value);
		self.fields.push(writer);
		let index = self.fields.len() - 1;
		Some(Box::new(FieldProxy { owner: SelfPtr(self as *mut Self), index }))
	}

	fn visit_method(
		&mut self,
		access: AccessFlags,
		name: &str,
		descriptor: &str,
		signature: Option<&str>,
		exceptions: &[String],
	) -> Option<Box<dyn MethodVisitor>> {
		let writer = MethodWriter::new(
			self.table.clone(),
			self.errors.clone(),
			&self.this_class_name,
			access,
			name,
			descriptor,
			signature,
			exceptions,
			self.compute_maxs(),
			self.compute_frames(),
			self.can_copy_through,
			self.hierarchy.clone(),
		);
		self.methods.push(writer);
		let index = self.methods.len() - 1;
		Some(Box::new(MethodProxy { owner: SelfPtr(self as *mut Self), index }))
	}

	fn visit_end(&mut self) {}
}

/// A raw, non-owning pointer back to the `ClassWriter` that spawned a
/// proxy, wrapped so it can be stored in a `Box<dyn Trait>` without `self`
/// being generic over a lifetime (`visit_field`/`visit_method` return
/// an owned `Box`, not a borrow). Sound because every proxy's
/// lifetime is bounded by a single `accept` call: the `ClassWriter` that
/// created it outlives every event the caller sends to the proxy, exactly
/// as a `&mut` borrow would, and only one proxy is ever driven at a time
/// (the visitor contract is single-threaded and synchronous).
struct SelfPtr<T>(*mut T);

impl<T> SelfPtr<T> {
	fn get(&self) -> &mut T {
		// SAFETY: see `SelfPtr`'s doc comment.
		unsafe { &mut *self.0 }
	}
}

struct FieldProxy {
	owner: SelfPtr<ClassWriter>,
	index: usize,
}

impl FieldVisitor for FieldProxy {
	fn next(&mut self) -> Option<&mut dyn FieldVisitor> {
		Some(&mut self.owner.get().fields[self.index])
	}
}

struct MethodProxy {
	owner: SelfPtr<ClassWriter>,
	index: usize,
}

impl MethodVisitor for MethodProxy {
	fn next(&mut self) -> Option<&mut dyn MethodVisitor> {
		Some(&mut self.owner.get().methods[self.index])
	}

	fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
		self.owner.get().methods[self.index].as_any_mut()
	}

	fn visit_code_raw(&mut self, code_attribute_bytes: &[u8]) -> bool {
		self.owner.get().methods[self.index].visit_code_raw(code_attribute_bytes)
	}
}

struct RecordComponentProxy {
	components: SelfPtr<ClassWriter>,
	index: usize,
}

impl RecordComponentVisitor for RecordComponentProxy {
	fn next(&mut self) -> Option<&mut dyn RecordComponentVisitor> {
		Some(&mut self.components.get().record_components[self.index])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reader::{ClassReader, ReaderOptions};

	fn minimal_class_bytes(writer: &mut ClassWriter) {
		writer.visit(ClassVersion::V1_8, AccessFlags::PUBLIC | AccessFlags::SUPER, "A", None, Some("java/lang/Object"), &[]);
		writer.visit_end();
	}

	#[test]
	fn a_minimal_class_matches_the_jvms_fixed_layout() {
		// `ClassFile` fixed-size fields (magic, version, the five trailing
		// counts) total 24 bytes; the pool holds Utf8("A")+Class(#1) and
		// Utf8("java/lang/Object")+Class(#3) = 4+3+19+3 = 29 bytes, for a
		// deterministic 53-byte total (no fields, methods, interfaces or
		// attributes).
		let mut writer = ClassWriter::new(ClassVersion::V1_8, WriterFlags::empty());
		minimal_class_bytes(&mut writer);
		let bytes = writer.to_byte_array().unwrap();
		assert_eq!(bytes.len(), 53);
		assert_eq!(&bytes[0..8], &[0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34]);
	}

	#[test]
	fn adding_a_static_field_bumps_fields_count() {
		let mut writer = ClassWriter::new(ClassVersion::V1_8, WriterFlags::empty());
		writer.visit(ClassVersion::V1_8, AccessFlags::PUBLIC | AccessFlags::SUPER, "A", None, Some("java/lang/Object"), &[]);
		let field = writer.visit_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "x", "I", None, None);
		if let Some(mut field) = field {
			field.visit_end();
		}
		writer.visit_end();
		let bytes = writer.to_byte_array().unwrap();
		assert!(bytes.len() > 53);
	}

	#[test]
	fn round_trip_of_an_untransformed_minimal_class_is_copy_through() {
		let mut original = ClassWriter::new(ClassVersion::V1_8, WriterFlags::empty());
		minimal_class_bytes(&mut original);
		let bytes = original.to_byte_array().unwrap();

		let reader = ClassReader::new(&bytes).unwrap();
		let mut rewriter = ClassWriter::from_reader(&reader, WriterFlags::empty()).unwrap();
		reader.accept(&mut rewriter, ReaderOptions::empty()).unwrap();
		let roundtripped = rewriter.to_byte_array().unwrap();
		assert_eq!(bytes, roundtripped);
	}

	#[test]
	fn inner_class_revisit_with_the_same_name_is_a_no_op() {
		let mut writer = ClassWriter::new(ClassVersion::V1_8, WriterFlags::empty());
		writer.visit(ClassVersion::V1_8, AccessFlags::PUBLIC, "A$B", None, Some("java/lang/Object"), &[]);
		writer.visit_inner_class("A$B", Some("A"), Some("B"), AccessFlags::PUBLIC | AccessFlags::STATIC);
		writer.visit_inner_class("A$B", Some("A"), Some("B"), AccessFlags::PUBLIC | AccessFlags::STATIC);
		assert_eq!(writer.inner_classes.len(), 1);
	}
}
