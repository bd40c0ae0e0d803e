//! `Symbol`, the tagged record behind every constant-pool, bootstrap-method,
//! and type-table entry: an interned payload paired with the tag
//! identifying which of the seventeen constant-pool kinds (plus two
//! internal bookkeeping kinds) it holds. Symbol value-equality deliberately
//! ignores the memoised `info` field, via `derivative::Derivative`'s
//! field-skipping attributes.

use derivative::Derivative;

/// The closed set of tags a [`Symbol`] may carry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Tag {
	Utf8,
	Integer,
	Float,
	Long,
	Double,
	Class,
	String,
	Fieldref,
	Methodref,
	InterfaceMethodref,
	NameAndType,
	MethodHandle,
	MethodType,
	Dynamic,
	InvokeDynamic,
	Module,
	Package,
	/// Bootstrap-method-table entry; not a constant-pool tag but shares the
	/// `Symbol` record shape.
	BootstrapMethod,
	/// ASM-internal type-table entry, never serialized.
	Type,
	UninitializedType,
	MergedType,
}

impl Tag {
	/// `CONSTANT_*_info` tag byte, for the seventeen real constant-pool kinds.
	pub fn cp_tag_byte(self) -> Option<u8> {
		Some(match self {
			Tag::Utf8 => 1,
			Tag::Integer => 3,
			Tag::Float => 4,
			Tag::Long => 5,
			Tag::Double => 6,
			Tag::Class => 7,
			Tag::String => 8,
			Tag::Fieldref => 9,
			Tag::Methodref => 10,
			Tag::InterfaceMethodref => 11,
			Tag::NameAndType => 12,
			Tag::MethodHandle => 15,
			Tag::MethodType => 16,
			Tag::Dynamic => 17,
			Tag::InvokeDynamic => 18,
			Tag::Module => 19,
			Tag::Package => 20,
			Tag::BootstrapMethod | Tag::Type | Tag::UninitializedType | Tag::MergedType => return None,
		})
	}

	pub fn from_cp_tag_byte(byte: u8) -> Option<Tag> {
		Some(match byte {
			1 => Tag::Utf8,
			3 => Tag::Integer,
			4 => Tag::Float,
			5 => Tag::Long,
			6 => Tag::Double,
			7 => Tag::Class,
			8 => Tag::String,
			9 => Tag::Fieldref,
			10 => Tag::Methodref,
			11 => Tag::InterfaceMethodref,
			12 => Tag::NameAndType,
			15 => Tag::MethodHandle,
			16 => Tag::MethodType,
			17 => Tag::Dynamic,
			18 => Tag::InvokeDynamic,
			19 => Tag::Module,
			20 => Tag::Package,
			_ => return None,
		})
	}

	/// Long/Double occupy two constant-pool slots; the second is unusable
	///.
	pub fn pool_slot_width(self) -> u16 {
		match self {
			Tag::Long | Tag::Double => 2,
			_ => 1,
		}
	}
}

/// A tagged record identifying one constant-pool, bootstrap-method, or
/// type-table entry. Value-compared by `(tag, owner, name, value,
/// data)`; `info` (a memoised payload, e.g. a pre-rendered `Handle` summary
/// or a cached resolved supertype) is excluded from equality and hashing so
/// that two structurally-identical symbols dedup even if one was populated
/// from a fresh `add` and the other copied from a seeded reader.
#[derive(Derivative, Debug, Clone)]
#[derivative(PartialEq, Eq, Hash)]
pub struct Symbol {
	/// 1-based for constant-pool entries, 0-based for bootstrap-method and
	/// type-table entries.
	pub index: u32,
	pub tag: Tag,
	pub owner: Option<String>,
	pub name: Option<String>,
	pub value: Option<String>,
	pub data: u64,
	/// Memoised rendering, e.g. the serialized bootstrap-method row used for
	/// structural dedup, or a cached `info`-field index the writer uses to
	/// suppress duplicate `InnerClasses` entries. Excluded from
	/// equality.
	#[derivative(PartialEq = "ignore", Hash = "ignore")]
	pub info: i64,
}

impl Symbol {
	pub fn new(index: u32, tag: Tag) -> Self {
		Self { index, tag, owner: None, name: None, value: None, data: 0, info: -1 }
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
		self.owner = Some(owner.into());
		self
	}

	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}

	pub fn with_data(mut self, data: u64) -> Self {
		self.data = data;
		self
	}

	/// 64-bit identifying hash over `(tag, owner, name, value, data)`, used
	/// by `SymbolTable`'s open-addressed hash table. Computed with `fxhash`.
	pub fn identity_hash(&self) -> u64 {
		use std::hash::{Hash, Hasher};
		let mut hasher = fxhash::FxHasher64::default();
		self.hash(&mut hasher);
		hasher.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn equality_ignores_info_field() {
		let a = Symbol::new(1, Tag::Class).with_name("A").with_data(0);
		let mut b = a.clone();
		b.info = 42;
		assert_eq!(a, b);
		assert_eq!(a.identity_hash(), b.identity_hash());
	}

	#[test]
	fn different_names_hash_differently() {
		let a = Symbol::new(1, Tag::Class).with_name("A");
		let b = Symbol::new(1, Tag::Class).with_name("B");
		assert_ne!(a, b);
	}
}
