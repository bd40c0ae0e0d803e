//! The append-only constant pool, bootstrap-method table, and internal
//! type table.
//!
//! The open-addressed hash table with chaining is a bespoke structure
//! because no JVMS indexing invariant (stable 1-based indices, append-only
//! growth, long/double two-slot entries) survives a plain
//! `std::collections::HashMap`. An explicit bucket + chain table computes
//! the 64-bit identity hash once and reuses it both for bucketing and for
//! future rehashes.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use crate::bytevector::ByteVector;
use crate::error::{Error, Result};
use crate::symbol::{Symbol, Tag};

const INITIAL_CAPACITY: usize = 256;
const LOAD_FACTOR_THRESHOLD: f64 = 0.75;

struct Entry {
	symbol: Symbol,
	hash: u64,
	next: Option<u32>,
}

/// Append-only mapping from `(tag,...)` to [`Symbol`], backing the
/// constant pool, the bootstrap-method table, and the ASM-internal type
/// table.
pub struct SymbolTable {
	buckets: Vec<Option<u32>>,
	entries: Vec<Entry>,

	/// 1-based; the next constant-pool slot that would be allocated. Starts
	/// at 1 because index 0 is unused in the JVM constant pool.
	next_cp_index: u32,
	constant_pool: ByteVector,

	bootstrap_methods: Vec<Symbol>,
	bootstrap_buffer: ByteVector,
	bootstrap_dedup: HashMap<Vec<u8>, u32>,

	type_table: Vec<Symbol>,
}

impl SymbolTable {
	pub fn new() -> Self {
		Self {
			buckets: vec![None; INITIAL_CAPACITY],
			entries: Vec::new(),
			next_cp_index: 1,
			constant_pool: ByteVector::new(),
			bootstrap_methods: Vec::new(),
			bootstrap_buffer: ByteVector::new(),
			bootstrap_dedup: HashMap::new(),
			type_table: Vec::new(),
		}
	}

	/// "Mostly-add" fast path: seed a fresh table from a reader's
	/// already-parsed constant pool, preserving every index — including
	/// unused Long/Double second slots — and the raw pool bytes verbatim so
	/// that a subsequent `put_constant_pool` reproduces them byte-for-byte
	/// unless new entries are appended.
	pub fn from_reader_pool(symbols: Vec<Symbol>, raw_pool_bytes: Vec<u8>, next_cp_index: u32) -> Self {
		let mut table = Self::new();
		table.constant_pool = ByteVector::new();
		table.constant_pool.put_bytes(&raw_pool_bytes);
		table.next_cp_index = next_cp_index;
		for symbol in symbols {
			table.index_existing(symbol);
		}
		table
	}

	fn index_existing(&mut self, symbol: Symbol) {
		let hash = symbol.identity_hash();
		self.insert_entry(symbol, hash);
	}

	pub fn constant_pool_count(&self) -> u32 {
		self.next_cp_index
	}

	pub fn bootstrap_method_count(&self) -> u32 {
		self.bootstrap_methods.len() as u32
	}

	// -- hash table machinery --------------------------------------------

	fn find(&self, candidate: &Symbol, hash: u64) -> Option<&Symbol> {
		let bucket = (hash as usize) % self.buckets.len();
		let mut cursor = self.buckets[bucket];
		while let Some(idx) = cursor {
			let entry = &self.entries[idx as usize];
			if entry.hash == hash && &entry.symbol == candidate {
				return Some(&entry.symbol);
			}
			cursor = entry.next;
		}
		None
	}

	fn insert_entry(&mut self, symbol: Symbol, hash: u64) -> u32 {
		let bucket = (hash as usize) % self.buckets.len();
		let entry_idx = self.entries.len() as u32;
		let head = self.buckets[bucket];
		self.entries.push(Entry { symbol, hash, next: head });
		self.buckets[bucket] = Some(entry_idx);

		if self.entries.len() as f64 / self.buckets.len() as f64 > LOAD_FACTOR_THRESHOLD {
			self.rehash();
		}
		entry_idx
	}

	fn rehash(&mut self) {
		let new_capacity = self.buckets.len() * 2;
		self.buckets = vec![None; new_capacity];
		for idx in 0..self.entries.len() {
			let bucket = (self.entries[idx].hash as usize) % new_capacity;
			self.entries[idx].next = self.buckets[bucket];
			self.buckets[bucket] = Some(idx as u32);
		}
	}

	/// Looks up or inserts `candidate`, writing its `cp_info` bytes via
	/// `write` only on first insertion. Returns the canonical `Symbol`
	/// (the pre-existing one on a dedup hit).
	fn get_or_add_cp_symbol(
		&mut self,
		mut candidate: Symbol,
		write: impl FnOnce(&mut ByteVector) -> Result<()>,
	) -> Result<Symbol> {
		let hash = candidate.identity_hash();
		if let Some(existing) = self.find(&candidate, hash) {
			return Ok(existing.clone());
		}

		let width = candidate.tag.pool_slot_width() as u32;
		if self.next_cp_index as u64 + width as u64 - 1 > u16::MAX as u64 {
			return Err(Error::ClassTooLarge { entry_count: self.next_cp_index + width });
		}

		candidate.index = self.next_cp_index;
		write(&mut self.constant_pool)?;
		self.next_cp_index += width;

		let stored = candidate.clone();
		self.insert_entry(candidate, hash);
		Ok(stored)
	}

	// -- the seventeen constant-pool kinds --------------------------------

	pub fn add_utf8(&mut self, value: &str) -> Result<Symbol> {
		let candidate = Symbol::new(0, Tag::Utf8).with_value(value);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::Utf8.cp_tag_byte().unwrap());
			buf.put_utf8(value)?;
			Ok(())
		})
	}

	pub fn add_integer(&mut self, value: i32) -> Result<Symbol> {
		let candidate = Symbol::new(0, Tag::Integer).with_data(value as u32 as u64);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::Integer.cp_tag_byte().unwrap());
			buf.put_i32(value);
			Ok(())
		})
	}

	pub fn add_float(&mut self, value: f32) -> Result<Symbol> {
		let candidate = Symbol::new(0, Tag::Float).with_data(value.to_bits() as u64);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::Float.cp_tag_byte().unwrap());
			buf.put_f32(value);
			Ok(())
		})
	}

	pub fn add_long(&mut self, value: i64) -> Result<Symbol> {
		let candidate = Symbol::new(0, Tag::Long).with_data(value as u64);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::Long.cp_tag_byte().unwrap());
			buf.put_u64(value as u64);
			Ok(())
		})
	}

	pub fn add_double(&mut self, value: f64) -> Result<Symbol> {
		let candidate = Symbol::new(0, Tag::Double).with_data(value.to_bits());
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::Double.cp_tag_byte().unwrap());
			buf.put_u64(value.to_bits());
			Ok(())
		})
	}

	pub fn add_class(&mut self, internal_name: &str) -> Result<Symbol> {
		let name = self.add_utf8(internal_name)?;
		let candidate = Symbol::new(0, Tag::Class).with_name(internal_name);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::Class.cp_tag_byte().unwrap());
			buf.put_u16(name.index as u16);
			Ok(())
		})
	}

	pub fn add_string(&mut self, value: &str) -> Result<Symbol> {
		let utf8 = self.add_utf8(value)?;
		let candidate = Symbol::new(0, Tag::String).with_value(value);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::String.cp_tag_byte().unwrap());
			buf.put_u16(utf8.index as u16);
			Ok(())
		})
	}

	pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<Symbol> {
		let name_sym = self.add_utf8(name)?;
		let descriptor_sym = self.add_utf8(descriptor)?;
		let candidate = Symbol::new(0, Tag::NameAndType).with_name(name).with_value(descriptor);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::NameAndType.cp_tag_byte().unwrap());
			buf.put_u16(name_sym.index as u16);
			buf.put_u16(descriptor_sym.index as u16);
			Ok(())
		})
	}

	fn add_ref(&mut self, tag: Tag, owner: &str, name: &str, descriptor: &str) -> Result<Symbol> {
		let class = self.add_class(owner)?;
		let nat = self.add_name_and_type(name, descriptor)?;
		let candidate = Symbol::new(0, tag).with_owner(owner).with_name(name).with_value(descriptor);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(tag.cp_tag_byte().unwrap());
			buf.put_u16(class.index as u16);
			buf.put_u16(nat.index as u16);
			Ok(())
		})
	}

	pub fn add_field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<Symbol> {
		self.add_ref(Tag::Fieldref, owner, name, descriptor)
	}

	pub fn add_method_ref(&mut self, owner: &str, name: &str, descriptor: &str, is_interface: bool) -> Result<Symbol> {
		let tag = if is_interface { Tag::InterfaceMethodref } else { Tag::Methodref };
		self.add_ref(tag, owner, name, descriptor)
	}

	/// `reference_kind` is the 1–9 JVMS `MethodHandleInfo` kind. Kinds 1-4
	/// resolve through a `Fieldref`; 5-8 (and 9, for interface methods)
	/// resolve through a `Methodref`/`InterfaceMethodref`.
	pub fn add_method_handle(
		&mut self,
		reference_kind: u8,
		owner: &str,
		name: &str,
		descriptor: &str,
		is_interface: bool,
	) -> Result<Symbol> {
		let reference = if (1..=4).contains(&reference_kind) {
			self.add_field_ref(owner, name, descriptor)?
		} else {
			self.add_method_ref(owner, name, descriptor, is_interface)?
		};
		let candidate = Symbol::new(0, Tag::MethodHandle)
			.with_owner(owner)
			.with_name(name)
			.with_value(descriptor)
			.with_data(reference_kind as u64);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::MethodHandle.cp_tag_byte().unwrap());
			buf.put_u8(reference_kind);
			buf.put_u16(reference.index as u16);
			Ok(())
		})
	}

	pub fn add_method_type(&mut self, descriptor: &str) -> Result<Symbol> {
		let utf8 = self.add_utf8(descriptor)?;
		let candidate = Symbol::new(0, Tag::MethodType).with_value(descriptor);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::MethodType.cp_tag_byte().unwrap());
			buf.put_u16(utf8.index as u16);
			Ok(())
		})
	}

	fn add_dynamic(&mut self, tag: Tag, bootstrap_method: &Symbol, name: &str, descriptor: &str) -> Result<Symbol> {
		let nat = self.add_name_and_type(name, descriptor)?;
		let candidate = Symbol::new(0, tag)
			.with_name(name)
			.with_value(descriptor)
			.with_data(bootstrap_method.index as u64);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(tag.cp_tag_byte().unwrap());
			buf.put_u16(bootstrap_method.index as u16);
			buf.put_u16(nat.index as u16);
			Ok(())
		})
	}

	pub fn add_constant_dynamic(&mut self, bootstrap_method: &Symbol, name: &str, descriptor: &str) -> Result<Symbol> {
		self.add_dynamic(Tag::Dynamic, bootstrap_method, name, descriptor)
	}

	pub fn add_invoke_dynamic(&mut self, bootstrap_method: &Symbol, name: &str, descriptor: &str) -> Result<Symbol> {
		self.add_dynamic(Tag::InvokeDynamic, bootstrap_method, name, descriptor)
	}

	pub fn add_module(&mut self, name: &str) -> Result<Symbol> {
		let utf8 = self.add_utf8(name)?;
		let candidate = Symbol::new(0, Tag::Module).with_name(name);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::Module.cp_tag_byte().unwrap());
			buf.put_u16(utf8.index as u16);
			Ok(())
		})
	}

	pub fn add_package(&mut self, name: &str) -> Result<Symbol> {
		let utf8 = self.add_utf8(name)?;
		let candidate = Symbol::new(0, Tag::Package).with_name(name);
		self.get_or_add_cp_symbol(candidate, |buf| {
			buf.put_u8(Tag::Package.cp_tag_byte().unwrap());
			buf.put_u16(utf8.index as u16);
			Ok(())
		})
	}

	// -- bootstrap methods -------------------------------------------------

	/// Dedups by the *serialized byte form* of `(handle, args)`, because
	/// bootstrap arguments may themselves be `ConstantDynamic` entries that
	/// recursively reference other bootstrap methods, so pointer/index
	/// equality on the arguments is not enough.
	pub fn add_bootstrap_method(&mut self, handle: &Symbol, args: &[Symbol]) -> Result<Symbol> {
		let mut serialized = ByteVector::new();
		serialized.put_u16(handle.index as u16);
		serialized.put_u16(args.len() as u16);
		for arg in args {
			serialized.put_u16(arg.index as u16);
		}
		let key = serialized.as_bytes().to_vec();

		if let Some(&index) = self.bootstrap_dedup.get(&key) {
			return Ok(self.bootstrap_methods[index as usize].clone());
		}

		let index = self.bootstrap_methods.len() as u32;
		let offset = self.bootstrap_buffer.len() as u64;
		self.bootstrap_buffer.put_bytes(&key);
		let symbol = Symbol::new(index, Tag::BootstrapMethod).with_data(offset);
		self.bootstrap_methods.push(symbol.clone());
		self.bootstrap_dedup.insert(key, index);
		Ok(symbol)
	}

	// -- ASM-internal type table, never serialized ------------

	pub fn add_type(&mut self, internal_name: &str) -> u32 {
		let candidate = Symbol::new(0, Tag::Type).with_value(internal_name);
		self.add_type_table_entry(candidate)
	}

	pub fn add_uninitialized_type(&mut self, internal_name: &str, new_insn_offset: u32) -> u32 {
		let candidate = Symbol::new(0, Tag::UninitializedType)
			.with_value(internal_name)
			.with_data(new_insn_offset as u64);
		self.add_type_table_entry(candidate)
	}

	pub fn add_merged_type(&mut self, type_table_index_1: u32, type_table_index_2: u32) -> u32 {
		let (lo, hi) = (type_table_index_1.min(type_table_index_2), type_table_index_1.max(type_table_index_2));
		let data = ((hi as u64) << 32) | lo as u64;
		let candidate = Symbol::new(0, Tag::MergedType).with_data(data);
		self.add_type_table_entry(candidate)
	}

	fn add_type_table_entry(&mut self, mut candidate: Symbol) -> u32 {
		if let Some(existing) = self.type_table.iter().find(|s| **s == candidate) {
			return existing.index;
		}
		candidate.index = self.type_table.len() as u32;
		let index = candidate.index;
		self.type_table.push(candidate);
		index
	}

	pub fn type_table_entry(&self, index: u32) -> Option<&Symbol> {
		self.type_table.get(index as usize)
	}

	// -- emission -----------------------------------------------------------

	/// Writes `constant_pool_count` followed by the constant-pool bytes
	/// accumulated incrementally by every `add_*` call.
	pub fn put_constant_pool(&self, out: &mut ByteVector) -> Result<()> {
		if self.next_cp_index > u16::MAX as u32 + 1 {
			return Err(Error::ClassTooLarge { entry_count: self.next_cp_index });
		}
		out.put_u16(self.next_cp_index as u16);
		out.put_bytes(self.constant_pool.as_bytes());
		Ok(())
	}

	pub fn put_bootstrap_methods(&self, out: &mut ByteVector) {
		out.put_u16(self.bootstrap_methods.len() as u16);
		out.put_bytes(self.bootstrap_buffer.as_bytes());
	}
}

impl Default for SymbolTable {
	fn default() -> Self {
		Self::new()
	}
}

/// A shared handle to one [`SymbolTable`], borrowed mutably by
/// `ClassWriter` and every per-element sub-writer it spawns
/// (`FieldWriter`, `MethodWriter`, `RecordComponentWriter`,
/// `ModuleWriter`, `AnnotationWriter`). The visitor trait signatures
/// are fixed and carry no `&mut SymbolTable` parameter, so
/// rather than threading one through every `visit*` call this follows
/// a message-passing wrapper instead:
/// every add returns only the allocated `Symbol`, never a borrow into the
/// pool's internals.
#[derive(Clone)]
pub struct SharedSymbolTable(Rc<RefCell<SymbolTable>>);

impl SharedSymbolTable {
	pub fn new() -> Self {
		Self(Rc::new(RefCell::new(SymbolTable::new())))
	}

	pub fn from_table(table: SymbolTable) -> Self {
		Self(Rc::new(RefCell::new(table)))
	}

	pub fn borrow(&self) -> Ref<'_, SymbolTable> {
		self.0.borrow()
	}

	pub fn borrow_mut(&self) -> RefMut<'_, SymbolTable> {
		self.0.borrow_mut()
	}
}

impl Default for SharedSymbolTable {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn add_constant_xxx_dedups_and_extends_only_once() {
		let mut table = SymbolTable::new();
		let a = table.add_class("java/lang/Object").unwrap();
		let count_after_first = table.constant_pool_count();
		let b = table.add_class("java/lang/Object").unwrap();
		assert_eq!(a, b);
		assert_eq!(table.constant_pool_count(), count_after_first);
	}

	#[test]
	fn long_and_double_occupy_two_slots() {
		let mut table = SymbolTable::new();
		let before = table.constant_pool_count();
		table.add_long(42).unwrap();
		assert_eq!(table.constant_pool_count(), before + 2);
	}

	#[test]
	fn bootstrap_methods_dedup_by_serialized_form() {
		let mut table = SymbolTable::new();
		let handle = table.add_method_handle(6, "Owner", "bootstrap", "()V", false).unwrap();
		let arg = table.add_integer(1).unwrap();
		let first = table.add_bootstrap_method(&handle, &[arg.clone()]).unwrap();
		let second = table.add_bootstrap_method(&handle, &[arg]).unwrap();
		assert_eq!(first.index, second.index);
		assert_eq!(table.bootstrap_method_count(), 1);
	}

	#[test]
	fn invoke_dynamic_with_identical_shape_dedups() {
		let mut table = SymbolTable::new();
		let handle = table.add_method_handle(6, "Owner", "bootstrap", "()V", false).unwrap();
		let bsm = table.add_bootstrap_method(&handle, &[]).unwrap();
		let a = table.add_invoke_dynamic(&bsm, "foo", "()V").unwrap();
		let b = table.add_invoke_dynamic(&bsm, "foo", "()V").unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn class_too_large_once_the_pool_would_exceed_65535_entries() {
		// Each add_class allocates a Utf8 slot plus a Class slot, so the
		// pool overflows well before 65535 distinct classes are added.
		let mut table = SymbolTable::new();
		let mut saw_overflow = false;
		for i in 0..40000u32 {
			match table.add_class(&format!("C{i}")) {
				Ok(_) => {},
				Err(Error::ClassTooLarge {.. }) => {
					saw_overflow = true;
					break;
				},
				Err(other) => panic!("unexpected error: {other}"),
			}
		}
		assert!(saw_overflow);
	}

	#[test]
	fn type_table_entries_are_not_reflected_in_constant_pool_count() {
		let mut table = SymbolTable::new();
		let before = table.constant_pool_count();
		table.add_type("java/lang/String");
		assert_eq!(table.constant_pool_count(), before);
	}
}
