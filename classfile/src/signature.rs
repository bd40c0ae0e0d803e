//! Generic-type signatures.

use std::cell::RefCell;
use std::rc::Rc;

/// A wildcard marker for a type argument.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Wildcard {
	/// `+Bound` — an upper-bounded (`? extends Bound`) argument.
	Extends,
	/// `-Bound` — a lower-bounded (`? super Bound`) argument.
	Super,
	/// An unbounded, exact type argument.
	Instanceof,
}

/// The event interface a `SignatureReader` drives and a `SignatureWriter`
/// implements. Every method has a default no-op body so a
/// transforming visitor overrides only what it cares about, matching the
/// "default delegate" pattern every visitor family in this crate follows.
pub trait SignatureVisitor {
	fn visit_formal_type_parameter(&mut self, _name: &str) {}
	fn visit_class_bound(&mut self) -> Box<dyn SignatureVisitor> {
		Box::new(NoopSignatureVisitor)
	}
	fn visit_interface_bound(&mut self) -> Box<dyn SignatureVisitor> {
		Box::new(NoopSignatureVisitor)
	}
	fn visit_superclass(&mut self) -> Box<dyn SignatureVisitor> {
		Box::new(NoopSignatureVisitor)
	}
	fn visit_interface(&mut self) -> Box<dyn SignatureVisitor> {
		Box::new(NoopSignatureVisitor)
	}
	fn visit_parameter_type(&mut self) -> Box<dyn SignatureVisitor> {
		Box::new(NoopSignatureVisitor)
	}
	fn visit_return_type(&mut self) -> Box<dyn SignatureVisitor> {
		Box::new(NoopSignatureVisitor)
	}
	fn visit_exception_type(&mut self) -> Box<dyn SignatureVisitor> {
		Box::new(NoopSignatureVisitor)
	}
	fn visit_base_type(&mut self, _descriptor: char) {}
	fn visit_type_variable(&mut self, _name: &str) {}
	fn visit_array_type(&mut self) -> Box<dyn SignatureVisitor> {
		Box::new(NoopSignatureVisitor)
	}
	fn visit_class_type(&mut self, _internal_name: &str) {}
	fn visit_inner_class_type(&mut self, _name: &str) {}
	fn visit_type_argument(&mut self) {}
	fn visit_type_argument_wildcard(&mut self, _wildcard: Wildcard) -> Box<dyn SignatureVisitor> {
		Box::new(NoopSignatureVisitor)
	}
	fn visit_end(&mut self) {}
}

pub struct NoopSignatureVisitor;
impl SignatureVisitor for NoopSignatureVisitor {}

/// The mutable state behind every handle a [`SignatureWriter`] hands out.
/// Every nested position (a class bound, a parameter type, an array
/// element, a wildcard's bound, ...) writes into the same buffer — there is
/// exactly one signature under construction — so sharing this struct via
/// `Rc<RefCell<_>>` rather than giving each nested visitor its own buffer
/// means nothing ever needs to be copied back into a parent.
#[derive(Default)]
struct Inner {
	buffer: String,
	has_formals: bool,
	has_parameters: bool,
	/// Bit-stack tracking, per open `ClassTypeSignature` nesting level,
	/// whether its `<...>` type-argument list has been opened yet. Bit 0 is
	/// the innermost level; `visit_class_type`/`visit_inner_class_type`
	/// push a fresh (unopened) level, `visit_type_argument`/
	/// `visit_type_argument_wildcard` set the current level's bit on first
	/// use, and `end_arguments` (called from `visit_inner_class_type` and
	/// `visit_end`) closes it and pops the level.
	argument_stack: u32,
}

/// Builds a generic-type signature string by accumulating the events a
/// `SignatureVisitor` receives, mirroring ASM's `SignatureWriter`.
///
/// Every `visit_*` method that hands back a child visitor (a class bound,
/// a parameter/return/exception type, an array element, a wildcard's
/// bound, ...) returns a clone of `self`: cloning only bumps the `Rc`'s
/// refcount, so the child writes into the exact same `buffer` the parent
/// will read back from `into_signature`.
#[derive(Clone, Default)]
pub struct SignatureWriter {
	inner: Rc<RefCell<Inner>>,
}

impl SignatureWriter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn into_signature(self) -> String {
		match Rc::try_unwrap(self.inner) {
			Ok(cell) => cell.into_inner().buffer,
			Err(shared) => shared.borrow().buffer.clone(),
		}
	}

	fn end_formals(&self) {
		let mut inner = self.inner.borrow_mut();
		if inner.has_formals {
			inner.has_formals = false;
			inner.buffer.push('>');
		}
	}

	fn end_arguments(&self) {
		let mut inner = self.inner.borrow_mut();
		if inner.argument_stack & 1 != 0 {
			inner.buffer.push('>');
		}
		inner.argument_stack >>= 1;
	}
}

impl SignatureVisitor for SignatureWriter {
	fn visit_formal_type_parameter(&mut self, name: &str) {
		let mut inner = self.inner.borrow_mut();
		if !inner.has_formals {
			inner.has_formals = true;
			inner.buffer.push('<');
		}
		inner.buffer.push_str(name);
		inner.buffer.push(':');
	}

	fn visit_class_bound(&mut self) -> Box<dyn SignatureVisitor> {
		Box::new(self.clone())
	}

	fn visit_interface_bound(&mut self) -> Box<dyn SignatureVisitor> {
		self.inner.borrow_mut().buffer.push(':');
		Box::new(self.clone())
	}

	fn visit_superclass(&mut self) -> Box<dyn SignatureVisitor> {
		self.end_formals();
		Box::new(self.clone())
	}

	fn visit_interface(&mut self) -> Box<dyn SignatureVisitor> {
		Box::new(self.clone())
	}

	fn visit_parameter_type(&mut self) -> Box<dyn SignatureVisitor> {
		self.end_formals();
		let mut inner = self.inner.borrow_mut();
		if !inner.has_parameters {
			inner.has_parameters = true;
			inner.buffer.push('(');
		}
		drop(inner);
		Box::new(self.clone())
	}

	fn visit_return_type(&mut self) -> Box<dyn SignatureVisitor> {
		self.end_formals();
		let mut inner = self.inner.borrow_mut();
		if !inner.has_parameters {
			inner.buffer.push('(');
		}
		inner.buffer.push(')');
		drop(inner);
		Box::new(self.clone())
	}

	fn visit_exception_type(&mut self) -> Box<dyn SignatureVisitor> {
		self.inner.borrow_mut().buffer.push('^');
		Box::new(self.clone())
	}

	fn visit_base_type(&mut self, descriptor: char) {
		self.inner.borrow_mut().buffer.push(descriptor);
	}

	fn visit_type_variable(&mut self, name: &str) {
		let mut inner = self.inner.borrow_mut();
		inner.buffer.push('T');
		inner.buffer.push_str(name);
		inner.buffer.push(';');
	}

	fn visit_array_type(&mut self) -> Box<dyn SignatureVisitor> {
		self.inner.borrow_mut().buffer.push('[');
		Box::new(self.clone())
	}

	fn visit_class_type(&mut self, internal_name: &str) {
		let mut inner = self.inner.borrow_mut();
		inner.buffer.push('L');
		inner.buffer.push_str(internal_name);
		inner.argument_stack <<= 1;
	}

	fn visit_inner_class_type(&mut self, name: &str) {
		self.end_arguments();
		let mut inner = self.inner.borrow_mut();
		inner.buffer.push('.');
		inner.buffer.push_str(name);
		inner.argument_stack <<= 1;
	}

	fn visit_type_argument(&mut self) {
		let mut inner = self.inner.borrow_mut();
		if inner.argument_stack & 1 == 0 {
			inner.argument_stack |= 1;
			inner.buffer.push('<');
		}
		inner.buffer.push('*');
	}

	fn visit_type_argument_wildcard(&mut self, wildcard: Wildcard) -> Box<dyn SignatureVisitor> {
		let mut inner = self.inner.borrow_mut();
		if inner.argument_stack & 1 == 0 {
			inner.argument_stack |= 1;
			inner.buffer.push('<');
		}
		match wildcard {
			Wildcard::Extends => inner.buffer.push('+'),
			Wildcard::Super => inner.buffer.push('-'),
			Wildcard::Instanceof => {},
		}
		drop(inner);
		Box::new(self.clone())
	}

	fn visit_end(&mut self) {
		self.end_arguments();
		self.inner.borrow_mut().buffer.push(';');
	}
}

/// Parses an existing signature string and drives a [`SignatureVisitor`]
/// through it, the inverse of [`SignatureWriter`] (used by the reader when
/// re-emitting a `Signature` attribute's contents through a transforming
/// visitor chain).
pub struct SignatureReader<'a> {
	signature: &'a str,
}

impl<'a> SignatureReader<'a> {
	pub fn new(signature: &'a str) -> Self {
		Self { signature }
	}

	pub fn accept_type(&self, visitor: &mut dyn SignatureVisitor) -> crate::error::Result<()> {
		let mut chars = self.signature.chars().peekable();
		parse_type(&mut chars, visitor)?;
		Ok(())
	}

	pub fn accept(&self, visitor: &mut dyn SignatureVisitor) -> crate::error::Result<()> {
		let mut chars = self.signature.chars().peekable();
		if chars.peek() == Some(&'<') {
			chars.next();
			while chars.peek() != Some(&'>') {
				let name: String = take_until(&mut chars, ':');
				visitor.visit_formal_type_parameter(&name);
				chars.next(); // consume ':'
				// A second ':' immediately here means the class bound is
				// absent (e.g. "T::Ljava/lang/Runnable;") — leave it for the
				// interface-bound loop below to consume, rather than eating
				// it and silently dropping that bound's type.
				if chars.peek() != Some(&':') {
					let mut bound = visitor.visit_class_bound();
					parse_type(&mut chars, bound.as_mut())?;
				}
				while chars.peek() == Some(&':') {
					chars.next();
					let mut bound = visitor.visit_interface_bound();
					parse_type(&mut chars, bound.as_mut())?;
				}
			}
			chars.next(); // consume '>'
		}
		if chars.peek() == Some(&'(') {
			chars.next();
			while chars.peek() != Some(&')') {
				let mut p = visitor.visit_parameter_type();
				parse_type(&mut chars, p.as_mut())?;
			}
			chars.next();
			let mut ret = visitor.visit_return_type();
			parse_type(&mut chars, ret.as_mut())?;
			while chars.peek() == Some(&'^') {
				chars.next();
				let mut exc = visitor.visit_exception_type();
				parse_type(&mut chars, exc.as_mut())?;
			}
		} else {
			let mut sup = visitor.visit_superclass();
			parse_type(&mut chars, sup.as_mut())?;
			while chars.peek().is_some() {
				let mut iface = visitor.visit_interface();
				parse_type(&mut chars, iface.as_mut())?;
			}
		}
		Ok(())
	}
}

fn take_until(chars: &mut std::iter::Peekable<std::str::Chars>, stop: char) -> String {
	let mut out = String::new();
	while let Some(&c) = chars.peek() {
		if c == stop {
			break;
		}
		out.push(c);
		chars.next();
	}
	out
}

fn parse_type(chars: &mut std::iter::Peekable<std::str::Chars>, visitor: &mut dyn SignatureVisitor) -> crate::error::Result<()> {
	match chars.next() {
		Some(c @ ('V' | 'Z' | 'C' | 'B' | 'S' | 'I' | 'F' | 'J' | 'D')) => {
			visitor.visit_base_type(c);
			Ok(())
		},
		Some('[') => {
			let mut array = visitor.visit_array_type();
			parse_type(chars, array.as_mut())
		},
		Some('T') => {
			let name = take_until(chars, ';');
			chars.next();
			visitor.visit_type_variable(&name);
			Ok(())
		},
		Some('L') => {
			let mut name = String::new();
			loop {
				match chars.peek() {
					Some('<') | Some(';') | Some('.') | None => break,
					Some(&c) => {
						name.push(c);
						chars.next();
					},
				}
			}
			visitor.visit_class_type(&name);
			if chars.peek() == Some(&'<') {
				chars.next();
				while chars.peek() != Some(&'>') {
					parse_type_argument(chars, visitor)?;
				}
				chars.next();
			}
			while chars.peek() == Some(&'.') {
				chars.next();
				let inner = take_until(chars, ';').chars().take_while(|c| *c != '<').collect::<String>();
				visitor.visit_inner_class_type(&inner);
			}
			if chars.peek() == Some(&';') {
				chars.next();
			}
			visitor.visit_end();
			Ok(())
		},
		other => Err(crate::error::Error::MalformedClass(format!("unexpected signature character {other:?}"))),
	}
}

fn parse_type_argument(chars: &mut std::iter::Peekable<std::str::Chars>, visitor: &mut dyn SignatureVisitor) -> crate::error::Result<()> {
	match chars.peek() {
		Some('*') => {
			chars.next();
			visitor.visit_type_argument();
			Ok(())
		},
		Some('+') => {
			chars.next();
			let mut inner = visitor.visit_type_argument_wildcard(Wildcard::Extends);
			parse_type(chars, inner.as_mut())
		},
		Some('-') => {
			chars.next();
			let mut inner = visitor.visit_type_argument_wildcard(Wildcard::Super);
			parse_type(chars, inner.as_mut())
		},
		_ => {
			let mut inner = visitor.visit_type_argument_wildcard(Wildcard::Instanceof);
			parse_type(chars, inner.as_mut())
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reader_drives_writer_for_simple_method_signature() {
		let signature = "(TT;)V";
		let reader = SignatureReader::new(signature);
		let mut writer = SignatureWriter::new();
		reader.accept(&mut writer).unwrap();
		assert_eq!(writer.into_signature(), "(TT;)V");
	}

	#[test]
	fn round_trips_a_bounded_generic_method_with_a_throws_clause() {
		let signature = "<T::Ljava/lang/Runnable;>(TT;)V^Ljava/lang/Exception;";
		let reader = SignatureReader::new(signature);
		let mut writer = SignatureWriter::new();
		reader.accept(&mut writer).unwrap();
		assert_eq!(writer.into_signature(), signature);
	}

	#[test]
	fn round_trips_a_class_signature_with_superclass_and_interfaces() {
		let signature = "Ljava/lang/Object;Ljava/lang/Comparable<TT;>;Ljava/io/Serializable;";
		let reader = SignatureReader::new(signature);
		let mut writer = SignatureWriter::new();
		reader.accept(&mut writer).unwrap();
		assert_eq!(writer.into_signature(), signature);
	}

	#[test]
	fn round_trips_wildcard_type_arguments_and_arrays() {
		let signature = "(Ljava/util/List<+Ljava/lang/Number;>;[Ljava/util/List<-Ljava/lang/Number;>;)Ljava/util/List<*>;";
		let reader = SignatureReader::new(signature);
		let mut writer = SignatureWriter::new();
		reader.accept(&mut writer).unwrap();
		assert_eq!(writer.into_signature(), signature);
	}

	#[test]
	fn round_trips_an_inner_class_type_with_type_arguments() {
		let signature = "Ljava/util/Map<TK;TV;>.Entry;";
		let reader = SignatureReader::new(signature);
		let mut writer = SignatureWriter::new();
		reader.accept(&mut writer).unwrap();
		assert_eq!(writer.into_signature(), signature);
	}
}
