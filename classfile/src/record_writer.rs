//! `RecordComponentWriter`: the `RecordComponentVisitor` implementation a
//! `ClassWriter` hands back from `visit_record_component`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::annotation_writer::{CollectedAnnotation, CollectedKeyedAnnotation, TypeAnnotationKey};
use crate::attribute::Attribute;
use crate::bytevector::ByteVector;
use crate::error::ErrorSink;
use crate::field_writer::{encode_simple_target_prefix, write_attribute_header};
use crate::symbol_table::SharedSymbolTable;
use crate::visitor::{AnnotationVisitor, RecordComponentVisitor};

pub struct RecordComponentWriter {
	table: SharedSymbolTable,
	errors: ErrorSink,
	name_index: u16,
	descriptor_index: u16,
	signature_index: Option<u16>,
	visible_annotations: Rc<RefCell<Vec<Vec<u8>>>>,
	invisible_annotations: Rc<RefCell<Vec<Vec<u8>>>>,
	visible_type_annotations: Rc<RefCell<Vec<(TypeAnnotationKey, Vec<u8>)>>>,
	invisible_type_annotations: Rc<RefCell<Vec<(TypeAnnotationKey, Vec<u8>)>>>,
	synthetic_attributes: Vec<Attribute>,
}

impl RecordComponentWriter {
	pub fn new(table: SharedSymbolTable, errors: ErrorSink, name: &str, descriptor: &str, signature: Option<&str>) -> Self {
		let mut t = table.borrow_mut();
		let name_index = errors.record(t.add_utf8(name)).map(|s| s.index as u16).unwrap_or(0);
		let descriptor_index = errors.record(t.add_utf8(descriptor)).map(|s| s.index as u16).unwrap_or(0);
		let signature_index = signature.and_then(|s| errors.record(t.add_utf8(s))).map(|s| s.index as u16);
		drop(t);
		Self {
			table,
			errors,
			name_index,
			descriptor_index,
			signature_index,
			visible_annotations: Rc::default(),
			invisible_annotations: Rc::default(),
			visible_type_annotations: Rc::default(),
			invisible_type_annotations: Rc::default(),
			synthetic_attributes: Vec::new(),
		}
	}

	pub fn write(&self, out: &mut ByteVector) {
		out.put_u16(self.name_index);
		out.put_u16(self.descriptor_index);

		let mut attribute_count = 0u16;
		let mut body = ByteVector::new();
		if let Some(index) = self.signature_index {
			attribute_count += 1;
			write_attribute_header(&mut body, &self.table, &self.errors, "Signature", |b| b.put_u16(index));
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
			write_attribute_header(&mut body, &self.table, &self.errors, &attribute.name, |b| b.put_bytes(&attribute.content));
		}

		out.put_u16(attribute_count);
		out.put_bytes(body.as_bytes());
	}
}

impl RecordComponentVisitor for RecordComponentWriter {
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
