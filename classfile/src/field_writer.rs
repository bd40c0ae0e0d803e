//! `FieldWriter`: the `FieldVisitor` implementation a `ClassWriter` hands
//! back from `visit_field`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::access::AccessFlags;
use crate::annotation_writer::{CollectedAnnotation, CollectedKeyedAnnotation, TypeAnnotationKey};
use crate::attribute::Attribute;
use crate::bytevector::ByteVector;
use crate::error::ErrorSink;
use crate::symbol_table::SharedSymbolTable;
use crate::value::ConstantValue;
use crate::visitor::{AnnotationVisitor, FieldVisitor};

pub struct FieldWriter {
	table: SharedSymbolTable,
	errors: ErrorSink,

	access: AccessFlags,
	name_index: u16,
	descriptor_index: u16,
	signature_index: Option<u16>,
	constant_value_index: Option<u16>,

	visible_annotations: Rc<RefCell<Vec<Vec<u8>>>>,
	invisible_annotations: Rc<RefCell<Vec<Vec<u8>>>>,
	visible_type_annotations: Rc<RefCell<Vec<(TypeAnnotationKey, Vec<u8>)>>>,
	invisible_type_annotations: Rc<RefCell<Vec<(TypeAnnotationKey, Vec<u8>)>>>,
	synthetic_attributes: Vec<Attribute>,
}

impl FieldWriter {
	pub fn new(
		table: SharedSymbolTable,
		errors: ErrorSink,
		access: AccessFlags,
		name: &str,
		descriptor: &str,
		signature: Option<&str>,
		value: Option<ConstantValue>,
	) -> Self {
		let mut t = table.borrow_mut();
		let name_index = errors.record(t.add_utf8(name)).map(|s| s.index as u16).unwrap_or(0);
		let descriptor_index = errors.record(t.add_utf8(descriptor)).map(|s| s.index as u16).unwrap_or(0);
		let signature_index = signature.and_then(|s| errors.record(t.add_utf8(s))).map(|s| s.index as u16);
		let constant_value_index = value.and_then(|v| errors.record(add_constant(&mut t, v))).map(|s| s.index as u16);
		drop(t);
		Self {
			table,
			errors,
			access,
			name_index,
			descriptor_index,
			signature_index,
			constant_value_index,
			visible_annotations: Rc::default(),
			invisible_annotations: Rc::default(),
			visible_type_annotations: Rc::default(),
			invisible_type_annotations: Rc::default(),
			synthetic_attributes: Vec::new(),
		}
	}

	/// Assembles the `field_info` structure (JVMS §4.5): access flags, name
	/// and descriptor indices, then every attribute this writer accumulated.
	pub fn write(&self, out: &mut ByteVector) {
		out.put_u16(self.access.to_jvms_bits());
		out.put_u16(self.name_index);
		out.put_u16(self.descriptor_index);

		let mut attribute_count = 0u16;
		let mut body = ByteVector::new();
		if let Some(index) = self.constant_value_index {
			attribute_count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "ConstantValue", |b| {
				b.put_u16(index);
			});
		}
		if self.access.contains(AccessFlags::SYNTHETIC) {
			attribute_count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "Synthetic", |_| {});
		}
		if self.access.contains(AccessFlags::DEPRECATED) {
			attribute_count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "Deprecated", |_| {});
		}
		if let Some(index) = self.signature_index {
			attribute_count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "Signature", |b| {
				b.put_u16(index);
			});
		}
		let visible = self.visible_annotations.borrow();
		if !visible.is_empty() {
			attribute_count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "RuntimeVisibleAnnotations", |b| {
				crate::annotation_writer::write_annotations_attribute(b, &visible);
			});
		}
		let invisible = self.invisible_annotations.borrow();
		if !invisible.is_empty() {
			attribute_count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "RuntimeInvisibleAnnotations", |b| {
				crate::annotation_writer::write_annotations_attribute(b, &invisible);
			});
		}
		let visible_type = self.visible_type_annotations.borrow();
		if !visible_type.is_empty() {
			attribute_count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "RuntimeVisibleTypeAnnotations", |b| {
				crate::annotation_writer::write_type_annotations_attribute(b, &visible_type);
			});
		}
		let invisible_type = self.invisible_type_annotations.borrow();
		if !invisible_type.is_empty() {
			attribute_count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "RuntimeInvisibleTypeAnnotations", |b| {
				crate::annotation_writer::write_type_annotations_attribute(b, &invisible_type);
			});
		}
		for attribute in &self.synthetic_attributes {
			attribute_count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, &attribute.name, |b| {
				b.put_bytes(&attribute.content);
			});
		}

		out.put_u16(attribute_count);
		out.put_bytes(body.as_bytes());
	}
}

/// Writes `attribute_name_index`, `attribute_length`, then whatever `write`
/// appends, patching the length in afterwards.
pub(crate) fn write_attribute_header(out: &mut ByteVector, table: &SharedSymbolTable, errors: &ErrorSink, name: &str, write: impl FnOnce(&mut ByteVector)) {
	let Some(name_index) = errors.record(table.borrow_mut().add_utf8(name)) else { return };
	out.put_u16(name_index.index as u16);
	let length_offset = out.len();
	out.put_u32(0);
	let body_start = out.len();
	write(out);
	let length = (out.len() - body_start) as u32;
	out.put_u32_at(length_offset, length);
}

pub(crate) fn add_constant(table: &mut crate::symbol_table::SymbolTable, value: ConstantValue) -> crate::error::Result<crate::symbol::Symbol> {
	match value {
		ConstantValue::Int(v) => table.add_integer(v),
		ConstantValue::Long(v) => table.add_long(v),
		ConstantValue::Float(v) => table.add_float(v),
		ConstantValue::Double(v) => table.add_double(v),
		ConstantValue::String(v) => table.add_string(&v),
		ConstantValue::Type(ty) => table.add_class(ty.internal_name().unwrap_or_default()),
		ConstantValue::Handle(h) => table.add_method_handle(h.reference_kind, &h.owner, &h.name, &h.descriptor, h.is_interface),
		ConstantValue::ConstantDynamic(cd) => {
			let handle = table.add_method_handle(
				cd.bootstrap_method.reference_kind,
				&cd.bootstrap_method.owner,
				&cd.bootstrap_method.name,
				&cd.bootstrap_method.descriptor,
				cd.bootstrap_method.is_interface,
			)?;
			let mut args = Vec::with_capacity(cd.bootstrap_method_arguments.len());
			for arg in cd.bootstrap_method_arguments {
				args.push(add_constant(table, arg)?);
			}
			let bsm = table.add_bootstrap_method(&handle, &args)?;
			table.add_constant_dynamic(&bsm, &cd.name, &cd.descriptor)
		},
	}
}

impl FieldVisitor for FieldWriter {
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

	fn visit_end(&mut self) {}
}

/// Encodes a `target_type` byte (the low byte of `type_ref`, matching ASM's
/// packed `int typeRef`) followed by an empty `target_path`, for the field
/// context where `target_info` is always empty.
pub(crate) fn encode_simple_target_prefix(type_ref: u32, type_path: &str) -> Vec<u8> {
	let mut out = vec![(type_ref >> 24) as u8];
	let path = crate::type_annotation::TypePath::parse(type_path).unwrap_or_default();
	out.extend(path.to_bytes());
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn constant_value_attribute_is_emitted_for_a_final_static_int() {
		let table = SharedSymbolTable::new();
		let errors = ErrorSink::new();
		let writer = FieldWriter::new(
			table,
			errors.clone(),
			AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL,
			"MAX",
			"I",
			None,
			Some(ConstantValue::Int(42)),
		);
		let mut out = ByteVector::new();
		writer.write(&mut out);
		errors.check().unwrap();
		assert!(out.len() > 8);
	}
}
