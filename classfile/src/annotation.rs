//! Shared annotation parsing: both class-level and code-level annotation
//! attributes (`RuntimeVisible/InvisibleAnnotations`,
//! `RuntimeVisible/InvisibleParameterAnnotations`,
//! `RuntimeVisible/InvisibleTypeAnnotations`, `AnnotationDefault`) share
//! the same `element_value` grammar (JVMS §4.7.16.1), so the parse and
//! the visitor replay live in one place rather than duplicated per call
//! site.

use crate::descriptor::Type;
use crate::error::Result;
use crate::reader::ClassReader;
use crate::value::ConstantValue;
use crate::visitor::AnnotationVisitor;

/// One `element_value` (JVMS Table 4.7.16.1-A), fully materialised so it
/// can be replayed onto an [`AnnotationVisitor`] without re-touching the
/// class bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
	Const(ConstantValue),
	Enum { descriptor: String, const_name: String },
	Class(Type),
	Annotation(Box<ParsedAnnotation>),
	Array(Vec<ElementValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnnotation {
	pub descriptor: String,
	pub elements: Vec<(String, ElementValue)>,
}

impl<'a> ClassReader<'a> {
	/// Parses one `annotation` structure starting at `offset`, returning
	/// the parsed value and the offset just past it.
	pub(crate) fn parse_annotation(&self, offset: usize) -> Result<(ParsedAnnotation, usize)> {
		let type_index = self.u16_pub(offset)?;
		let descriptor = self.utf8_pub(type_index)?.to_string();
		let pair_count = self.u16_pub(offset + 2)? as usize;
		let mut cursor = offset + 4;
		let mut elements = Vec::with_capacity(pair_count);
		for _ in 0..pair_count {
			let name_index = self.u16_pub(cursor)?;
			let name = self.utf8_pub(name_index)?.to_string();
			let (value, next) = self.parse_element_value(cursor + 2)?;
			elements.push((name, value));
			cursor = next;
		}
		Ok((ParsedAnnotation { descriptor, elements }, cursor))
	}

	pub(crate) fn parse_element_value_pub(&self, offset: usize) -> Result<(ElementValue, usize)> {
		self.parse_element_value(offset)
	}

	fn parse_element_value(&self, offset: usize) -> Result<(ElementValue, usize)> {
		let tag = self.u8_pub(offset)?;
		let body = offset + 1;
		Ok(match tag {
			b'B' => (ElementValue::Const(ConstantValue::Int(self.const_int(body)?)), body + 2),
			b'C' => (ElementValue::Const(ConstantValue::Int(self.const_int(body)?)), body + 2),
			b'D' => (ElementValue::Const(self.const_value_pub(self.u16_pub(body)?)?), body + 2),
			b'F' => (ElementValue::Const(self.const_value_pub(self.u16_pub(body)?)?), body + 2),
			b'I' => (ElementValue::Const(ConstantValue::Int(self.const_int(body)?)), body + 2),
			b'J' => (ElementValue::Const(self.const_value_pub(self.u16_pub(body)?)?), body + 2),
			b'S' => (ElementValue::Const(ConstantValue::Int(self.const_int(body)?)), body + 2),
			b'Z' => (ElementValue::Const(ConstantValue::Int(self.const_int(body)?)), body + 2),
			b's' => {
				let index = self.u16_pub(body)?;
				(ElementValue::Const(ConstantValue::String(self.utf8_pub(index)?.to_string())), body + 2)
			},
			b'e' => {
				let type_index = self.u16_pub(body)?;
				let const_index = self.u16_pub(body + 2)?;
				(
					ElementValue::Enum { descriptor: self.utf8_pub(type_index)?.to_string(), const_name: self.utf8_pub(const_index)?.to_string() },
					body + 4,
				)
			},
			b'c' => {
				let index = self.u16_pub(body)?;
				let descriptor = self.utf8_pub(index)?;
				(ElementValue::Class(Type::get_type(&descriptor)?), body + 2)
			},
			b'@' => {
				let (annotation, next) = self.parse_annotation(body)?;
				(ElementValue::Annotation(Box::new(annotation)), next)
			},
			b'[' => {
				let count = self.u16_pub(body)? as usize;
				let mut cursor = body + 2;
				let mut values = Vec::with_capacity(count);
				for _ in 0..count {
					let (value, next) = self.parse_element_value(cursor)?;
					values.push(value);
					cursor = next;
				}
				(ElementValue::Array(values), cursor)
			},
			other => return Err(crate::error::Error::MalformedClass(format!("invalid element_value tag '{}'", other as char))),
		})
	}

	fn const_int(&self, const_value_index_offset: usize) -> Result<i32> {
		let index = self.u16_pub(const_value_index_offset)?;
		match self.const_value_pub(index)? {
			ConstantValue::Int(value) => Ok(value),
			other => Err(crate::error::Error::MalformedClass(format!("expected an Integer constant, found {other:?}"))),
		}
	}
}

/// Replays a parsed annotation onto a live [`AnnotationVisitor`], in the
/// same recursive shape ASM's `Annotation.accept` uses.
pub fn replay_annotation(visitor: &mut dyn AnnotationVisitor, annotation: &ParsedAnnotation) {
	for (name, value) in &annotation.elements {
		replay_element_value(visitor, Some(name), value);
	}
	visitor.visit_end();
}

/// Replays the single bare `element_value` an `AnnotationDefault`
/// attribute carries (JVMS §4.7.22) onto the visitor `visit_annotation_default`
/// hands back.
pub fn replay_annotation_default(visitor: &mut dyn AnnotationVisitor, value: &ElementValue) {
	replay_element_value(visitor, None, value);
	visitor.visit_end();
}

fn replay_element_value(visitor: &mut dyn AnnotationVisitor, name: Option<&str>, value: &ElementValue) {
	match value {
		ElementValue::Const(constant) => visitor.visit(name, constant.clone()),
		ElementValue::Enum { descriptor, const_name } => visitor.visit_enum(name, descriptor, const_name),
		ElementValue::Class(ty) => visitor.visit(name, ConstantValue::Type(ty.clone())),
		ElementValue::Annotation(nested) => {
			if let Some(mut child) = visitor.visit_annotation(name, &nested.descriptor) {
				replay_annotation(&mut *child, nested);
			}
		},
		ElementValue::Array(values) => {
			if let Some(mut child) = visitor.visit_array(name) {
				for value in values {
					replay_element_value(&mut *child, None, value);
				}
				child.visit_end();
			}
		},
	}
}
