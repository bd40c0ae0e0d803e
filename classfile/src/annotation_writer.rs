//! `AnnotationWriter`: the single `AnnotationVisitor` implementation shared
//! by every writer that can carry annotations.
//!
//! A nested annotation/array value is written directly into the *same*
//! shared byte buffer as its parent, at the position the parent has already
//! reached — matching the depth-first, single-pass shape `element_value`
//! nesting actually has in the class file (JVMS §4.7.16.1): there is never a
//! need to assemble a child's bytes separately and splice them in later, only
//! to patch the child's own `num_element_value_pairs`/`num_values` count
//! once its members are known: write the count placeholder first, then
//! patch it once the nested values are all written.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bytevector::ByteVector;
use crate::error::{ErrorSink, Result};
use crate::symbol_table::SharedSymbolTable;
use crate::value::ConstantValue;
use crate::visitor::AnnotationVisitor;

pub struct AnnotationWriter {
	table: SharedSymbolTable,
	errors: ErrorSink,
	buffer: Rc<RefCell<ByteVector>>,
	num_values: u16,
	num_values_offset: usize,
}

impl AnnotationWriter {
	/// Starts a brand-new top-level annotation (one that will become the
	/// content of a `RuntimeVisible/InvisibleAnnotations` entry, an
	/// `AnnotationDefault`, or a parameter/type-annotation slot): writes
	/// `type_index` and reserves the `num_element_value_pairs` slot.
	pub fn new_top_level(table: SharedSymbolTable, errors: ErrorSink, descriptor: &str) -> Self {
		let buffer = Rc::new(RefCell::new(ByteVector::new()));
		if let Some(type_index) = errors.record(table.borrow_mut().add_utf8(descriptor)) {
			buffer.borrow_mut().put_u16(type_index.index as u16);
		}
		Self::nested(table, errors, buffer)
	}

	/// Continues into a nested `annotation`/`array_value` sharing the
	/// parent's live buffer.
	pub(crate) fn nested(table: SharedSymbolTable, errors: ErrorSink, buffer: Rc<RefCell<ByteVector>>) -> Self {
		let offset = buffer.borrow().len();
		buffer.borrow_mut().put_u16(0);
		Self { table, errors, buffer, num_values: 0, num_values_offset: offset }
	}

	/// Consumes the writer once its `visit_end` has been called, returning
	/// the fully assembled bytes (for a top-level annotation: `type_index`,
	/// `num_element_value_pairs`, then every pair).
	pub fn into_bytes(self) -> Vec<u8> {
		match Rc::try_unwrap(self.buffer) {
			Ok(cell) => cell.into_inner().into_bytes(),
			Err(shared) => shared.borrow().as_bytes().to_vec(),
		}
	}

	fn bump(&mut self) {
		self.num_values += 1;
		self.buffer.borrow_mut().put_u16_at(self.num_values_offset, self.num_values);
	}

	fn write_name(&self, name: Option<&str>) -> Result<()> {
		if let Some(name) = name {
			let index = self.table.borrow_mut().add_utf8(name)?;
			self.buffer.borrow_mut().put_u16(index.index as u16);
		}
		Ok(())
	}

	fn write_const(&self, value: &ConstantValue) -> Result<()> {
		let mut table = self.table.borrow_mut();
		let mut buf = self.buffer.borrow_mut();
		write_element_value_const(&mut table, &mut buf, value)
	}
}

/// Writes a bare `I`/`J`/`F`/`D`/`s`/`c`-tagged `const_value_index` pair —
/// the body of `write_const` above, lifted out so `AnnotationDefault`'s
/// single bare `element_value` (JVMS §4.7.22) can reuse it without going
/// through a whole `AnnotationWriter`.
pub(crate) fn write_element_value_const(table: &mut crate::symbol_table::SymbolTable, buf: &mut ByteVector, value: &ConstantValue) -> Result<()> {
	match value {
		// `B`/`C`/`I`/`S`/`Z`-tagged element values all carry an Integer
		// constant; the originating primitive kind is not preserved past
		// parsing, so every integer
		// value is re-emitted under the `I` tag. Verifiers accept this:
		// only the language-level annotation interface determines the
		// expected boxed type, not the class-file tag (DESIGN.md).
		ConstantValue::Int(v) => {
			let sym = table.add_integer(*v)?;
			buf.put_u8(b'I');
			buf.put_u16(sym.index as u16);
		},
		ConstantValue::Long(v) => {
			let sym = table.add_long(*v)?;
			buf.put_u8(b'J');
			buf.put_u16(sym.index as u16);
		},
		ConstantValue::Float(v) => {
			let sym = table.add_float(*v)?;
			buf.put_u8(b'F');
			buf.put_u16(sym.index as u16);
		},
		ConstantValue::Double(v) => {
			let sym = table.add_double(*v)?;
			buf.put_u8(b'D');
			buf.put_u16(sym.index as u16);
		},
		ConstantValue::String(v) => {
			let sym = table.add_utf8(v)?;
			buf.put_u8(b's');
			buf.put_u16(sym.index as u16);
		},
		ConstantValue::Type(ty) => {
			let sym = table.add_utf8(&ty.descriptor())?;
			buf.put_u8(b'c');
			buf.put_u16(sym.index as u16);
		},
		ConstantValue::Handle(_) | ConstantValue::ConstantDynamic(_) => {
			return Err(crate::error::Error::InvalidArgument("a Handle/ConstantDynamic is not a legal annotation element value".into()));
		},
	}
	Ok(())
}

impl AnnotationVisitor for AnnotationWriter {
	fn visit(&mut self, name: Option<&str>, value: ConstantValue) {
		if self.errors.record(self.write_name(name)).is_none() {
			return;
		}
		if let Some(()) = self.errors.record(self.write_const(&value)) {
			self.bump();
		}
	}

	fn visit_enum(&mut self, name: Option<&str>, descriptor: &str, value: &str) {
		if self.errors.record(self.write_name(name)).is_none() {
			return;
		}
		let mut table = self.table.borrow_mut();
		let Some(descriptor_sym) = self.errors.record(table.add_utf8(descriptor)) else { return };
		let Some(value_sym) = self.errors.record(table.add_utf8(value)) else { return };
		drop(table);
		let mut buf = self.buffer.borrow_mut();
		buf.put_u8(b'e');
		buf.put_u16(descriptor_sym.index as u16);
		buf.put_u16(value_sym.index as u16);
		drop(buf);
		self.bump();
	}

	fn visit_annotation(&mut self, name: Option<&str>, descriptor: &str) -> Option<Box<dyn AnnotationVisitor>> {
		if self.errors.record(self.write_name(name)).is_none() {
			return None;
		}
		let type_index = self.errors.record(self.table.borrow_mut().add_utf8(descriptor))?;
		let mut buf = self.buffer.borrow_mut();
		buf.put_u8(b'@');
		buf.put_u16(type_index.index as u16);
		drop(buf);
		self.bump();
		Some(Box::new(Self::nested(self.table.clone(), self.errors.clone(), self.buffer.clone())))
	}

	fn visit_array(&mut self, name: Option<&str>) -> Option<Box<dyn AnnotationVisitor>> {
		self.write_name(name).ok()?;
		self.buffer.borrow_mut().put_u8(b'[');
		self.bump();
		Some(Box::new(Self::nested(self.table.clone(), self.errors.clone(), self.buffer.clone())))
	}

	fn visit_end(&mut self) {}
}

/// Adapts a fresh top-level [`AnnotationWriter`] so that, once its
/// `visit_end` fires, the finished bytes are appended to a shared list —
/// `visible`/`invisible` on whichever owning writer started it. Every
/// default method on [`AnnotationVisitor`] forwards to `next()`, so
/// overriding only `next` and `visit_end` is enough to delegate the entire
/// nested grammar.
pub struct CollectedAnnotation {
	writer: Option<AnnotationWriter>,
	target: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl CollectedAnnotation {
	pub fn start(table: SharedSymbolTable, errors: ErrorSink, descriptor: &str, target: Rc<RefCell<Vec<Vec<u8>>>>) -> Box<dyn AnnotationVisitor> {
		Box::new(Self { writer: Some(AnnotationWriter::new_top_level(table, errors, descriptor)), target })
	}
}

impl AnnotationVisitor for CollectedAnnotation {
	fn next(&mut self) -> Option<&mut dyn AnnotationVisitor> {
		self.writer.as_mut().map(|w| w as &mut dyn AnnotationVisitor)
	}

	fn visit_end(&mut self) {
		if let Some(writer) = self.writer.take() {
			self.target.borrow_mut().push(writer.into_bytes());
		}
	}
}

/// As [`CollectedAnnotation`], but the finished bytes are pushed alongside a
/// caller-chosen key — a parameter index, or a `(type_ref, type_path)` pair
/// for a type annotation.
pub struct CollectedKeyedAnnotation<K: 'static> {
	writer: Option<AnnotationWriter>,
	key: K,
	target: Rc<RefCell<Vec<(K, Vec<u8>)>>>,
}

impl<K: Clone + 'static> CollectedKeyedAnnotation<K> {
	pub fn start(
		table: SharedSymbolTable,
		errors: ErrorSink,
		descriptor: &str,
		key: K,
		target: Rc<RefCell<Vec<(K, Vec<u8>)>>>,
	) -> Box<dyn AnnotationVisitor> {
		Box::new(Self { writer: Some(AnnotationWriter::new_top_level(table, errors, descriptor)), key, target })
	}
}

impl<K: Clone + 'static> AnnotationVisitor for CollectedKeyedAnnotation<K> {
	fn next(&mut self) -> Option<&mut dyn AnnotationVisitor> {
		self.writer.as_mut().map(|w| w as &mut dyn AnnotationVisitor)
	}

	fn visit_end(&mut self) {
		if let Some(writer) = self.writer.take() {
			self.target.borrow_mut().push((self.key.clone(), writer.into_bytes()));
		}
	}
}

/// The `target_type` + `target_info` + `target_path` prefix a `type_annotation`
/// entry carries ahead of its `annotation` body (JVMS §4.7.20), pre-encoded
/// by whichever writer registers the annotation since only it knows the
/// target kind.
#[derive(Clone)]
pub struct TypeAnnotationKey {
	pub target_prefix: Vec<u8>,
}

/// Writes one `RuntimeVisible/InvisibleAnnotations`-style attribute body
/// (`num_annotations` followed by each annotation's bytes) into `out`.
pub fn write_annotations_attribute(out: &mut ByteVector, annotations: &[Vec<u8>]) {
	out.put_u16(annotations.len() as u16);
	for annotation in annotations {
		out.put_bytes(annotation);
	}
}

/// Writes one `RuntimeVisible/InvisibleTypeAnnotations`-style attribute body
///: `num_annotations` followed by, per entry, the pre-encoded
/// `target_type`/`target_info`/`target_path` prefix then the annotation body.
pub fn write_type_annotations_attribute(out: &mut ByteVector, annotations: &[(TypeAnnotationKey, Vec<u8>)]) {
	out.put_u16(annotations.len() as u16);
	for (key, bytes) in annotations {
		out.put_bytes(&key.target_prefix);
		out.put_bytes(bytes);
	}
}
