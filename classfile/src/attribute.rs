//! Non-standard (user/unknown) attributes.

use std::rc::Rc;

use crate::label::Label;

/// A non-standard user attribute: opaque on read unless a matching
/// [`AttributeReader`] is registered, and always re-emitted byte-for-byte
/// on write.
#[derive(Debug, Clone)]
pub struct Attribute {
	pub name: String,
	pub content: Rc<[u8]>,
}

impl Attribute {
	pub fn new(name: impl Into<String>, content: impl Into<Rc<[u8]>>) -> Self {
		Self { name: name.into(), content: content.into() }
	}
}

/// What a custom attribute's `read` hook reconstructs: either an opaque
/// blob (the default for attributes with no registered reader) or a value
/// that pre-creates labels for any bytecode offsets it embeds
///.
pub enum AttributeContent {
	Opaque(Rc<[u8]>),
	/// A decoded form the attribute's own reader produced; stored as an
	/// opaque `Rc<dyn Any>` so the registry stays attribute-agnostic.
	Decoded(Rc<dyn std::any::Any>),
}

/// Registered per non-standard attribute *name*; invoked by the reader
/// whenever it encounters an attribute of that name. Attributes
/// that do not need label resolution can ignore `labels` entirely; the
/// default registry entry (used for any unregistered name) always returns
/// `AttributeContent::Opaque`.
pub trait AttributeReader {
	/// `true` if this attribute type embeds bytecode offsets/label
	/// references and therefore needs `labels` pre-populated before
	/// `read` is invoked.
	fn references_labels(&self) -> bool {
		false
	}

	fn read(
		&self,
		bytes: &[u8],
		offset: usize,
		length: usize,
		code_offset: Option<u32>,
		labels: &mut dyn FnMut(u32) -> Label,
	) -> AttributeContent;
}

/// The default reader used for any attribute name with no registered
/// custom handler: preserves the raw bytes unmodified.
pub struct OpaqueAttributeReader;

impl AttributeReader for OpaqueAttributeReader {
	fn read(
		&self,
		bytes: &[u8],
		offset: usize,
		length: usize,
		_code_offset: Option<u32>,
		_labels: &mut dyn FnMut(u32) -> Label,
	) -> AttributeContent {
		AttributeContent::Opaque(Rc::from(&bytes[offset..offset + length]))
	}
}

/// A name -> reader registry, consulted by the `Reader` for every
/// non-standard attribute it encounters.
#[derive(Default)]
pub struct AttributeRegistry {
	readers: std::collections::HashMap<String, Box<dyn AttributeReader>>,
}

impl AttributeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, name: impl Into<String>, reader: Box<dyn AttributeReader>) {
		self.readers.insert(name.into(), reader);
	}

	pub fn get(&self, name: &str) -> Option<&dyn AttributeReader> {
		self.readers.get(name).map(|b| b.as_ref())
	}
}
