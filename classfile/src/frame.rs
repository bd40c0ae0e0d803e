//! `Frame`, the abstract locals/stack state at a basic-block entry, and the
//! verification-type lattice used to merge them.

use crate::common_super::ClassHierarchy;
use crate::symbol_table::SymbolTable;

/// The 4-bit kind tag of an [`AbstractType`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Kind {
	Top = 0,
	Integer = 1,
	Float = 2,
	Double = 3,
	Long = 4,
	Null = 5,
	UninitializedThis = 6,
	/// `value` indexes the ASM-internal type table for the object's
	/// internal name.
	Object = 7,
	/// `value` indexes the type table for an `UninitializedType(offset)`
	/// entry.
	Uninitialized = 8,
	/// Symbolic placeholder meaning "whatever arrives in local slot
	/// `value`", used only during the per-block symbolic pass
	///.
	Local = 9,
	/// Symbolic placeholder meaning "whatever arrives at stack depth
	/// `value`", used only during the per-block symbolic pass.
	Stack = 10,
}

/// An abstract type, packed as `kind(4 bits) | dimensions(8 bits) |
/// value(20 bits)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AbstractType(u32);

const KIND_SHIFT: u32 = 28;
const DIM_SHIFT: u32 = 20;
const VALUE_MASK: u32 = 0x000F_FFFF;

impl AbstractType {
	fn pack(kind: Kind, dimensions: u8, value: u32) -> Self {
		debug_assert!(value <= VALUE_MASK);
		Self(((kind as u32) << KIND_SHIFT) | ((dimensions as u32) << DIM_SHIFT) | (value & VALUE_MASK))
	}

	pub const TOP: AbstractType = AbstractType(0);
	pub const INTEGER: AbstractType = AbstractType((Kind::Integer as u32) << KIND_SHIFT);
	pub const FLOAT: AbstractType = AbstractType((Kind::Float as u32) << KIND_SHIFT);
	pub const DOUBLE: AbstractType = AbstractType((Kind::Double as u32) << KIND_SHIFT);
	pub const LONG: AbstractType = AbstractType((Kind::Long as u32) << KIND_SHIFT);
	pub const NULL: AbstractType = AbstractType((Kind::Null as u32) << KIND_SHIFT);
	pub const UNINITIALIZED_THIS: AbstractType = AbstractType((Kind::UninitializedThis as u32) << KIND_SHIFT);

	pub fn object(type_table_index: u32) -> Self {
		Self::pack(Kind::Object, 0, type_table_index)
	}

	pub fn array(dimensions: u8, element_type_table_index: u32) -> Self {
		Self::pack(Kind::Object, dimensions, element_type_table_index)
	}

	pub fn uninitialized(type_table_index: u32) -> Self {
		Self::pack(Kind::Uninitialized, 0, type_table_index)
	}

	pub fn local(index: u32) -> Self {
		Self::pack(Kind::Local, 0, index)
	}

	pub fn stack(index: u32) -> Self {
		Self::pack(Kind::Stack, 0, index)
	}

	pub fn kind(self) -> Kind {
		match (self.0 >> KIND_SHIFT) & 0xF {
			0 => Kind::Top,
			1 => Kind::Integer,
			2 => Kind::Float,
			3 => Kind::Double,
			4 => Kind::Long,
			5 => Kind::Null,
			6 => Kind::UninitializedThis,
			7 => Kind::Object,
			8 => Kind::Uninitialized,
			9 => Kind::Local,
			10 => Kind::Stack,
			_ => unreachable!("only 11 kinds are ever packed"),
		}
	}

	pub fn dimensions(self) -> u8 {
		((self.0 >> DIM_SHIFT) & 0xFF) as u8
	}

	pub fn value(self) -> u32 {
		self.0 & VALUE_MASK
	}

	pub fn is_reference(self) -> bool {
		matches!(self.kind(), Kind::Object | Kind::Null | Kind::Uninitialized | Kind::UninitializedThis)
	}

	/// Slots occupied on the stack/in locals: 2 for long/double, 1 for
	/// everything else, matching the "long/double each occupy one array
	/// slot plus a following TOP slot" invariant.
	pub fn width(self) -> u8 {
		match self.kind() {
			Kind::Long | Kind::Double => 2,
			_ => 1,
		}
	}
}

/// The abstract state of locals and operand stack at a basic-block entry
///.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame {
	pub locals: Vec<AbstractType>,
	pub stack: Vec<AbstractType>,
}

impl Frame {
	pub fn new() -> Self {
		Self { locals: Vec::new(), stack: Vec::new() }
	}

	/// The input frame for a method's entry block: `this` (unless static;
	/// `UNINITIALIZED_THIS` inside a constructor) followed by the
	/// descriptor's parameter types, with long/double padded by a following
	/// `TOP`.
	pub fn for_method_entry(
		table: &mut SymbolTable,
		owner_internal_name: &str,
		descriptor: &str,
		is_static: bool,
		is_constructor: bool,
	) -> crate::error::Result<Self> {
		let mut locals = Vec::new();
		if !is_static {
			if is_constructor {
				locals.push(AbstractType::UNINITIALIZED_THIS);
			} else {
				let idx = table.add_type(owner_internal_name);
				locals.push(AbstractType::object(idx));
			}
		}
		let crate::descriptor::Type::Method { parameters,.. } = crate::descriptor::Type::get_method_type(descriptor)? else {
			unreachable!()
		};
		for param in &parameters {
			push_type(table, &mut locals, param);
		}
		Ok(Frame { locals, stack: Vec::new() })
	}

	/// Element-wise least-upper-bound merge into `self` from `incoming`,
	/// used when a work-list propagates concrete frames along edges
	///. Returns `true` if `self` changed (drives fixpoint
	/// termination).
	pub fn merge_from(&mut self, incoming: &Frame, hierarchy: &dyn ClassHierarchy, table: &mut SymbolTable) -> bool {
		let mut changed = false;
		let len = self.locals.len().min(incoming.locals.len());
		self.locals.truncate(len);
		for i in 0..len {
			let merged = merge_type(self.locals[i], incoming.locals[i], hierarchy, table);
			if merged != self.locals[i] {
				self.locals[i] = merged;
				changed = true;
			}
		}
		debug_assert_eq!(
			self.stack.len(),
			incoming.stack.len(),
			"operand stack shape must be identical on every path reaching a basic block"
		);
		for i in 0..self.stack.len().min(incoming.stack.len()) {
			let merged = merge_type(self.stack[i], incoming.stack[i], hierarchy, table);
			if merged != self.stack[i] {
				self.stack[i] = merged;
				changed = true;
			}
		}
		changed
	}
}

impl Default for Frame {
	fn default() -> Self {
		Self::new()
	}
}

fn push_type(table: &mut SymbolTable, locals: &mut Vec<AbstractType>, ty: &crate::descriptor::Type) {
	use crate::descriptor::Sort;
	match ty.sort() {
		Sort::Boolean | Sort::Char | Sort::Byte | Sort::Short | Sort::Int => locals.push(AbstractType::INTEGER),
		Sort::Float => locals.push(AbstractType::FLOAT),
		Sort::Long => {
			locals.push(AbstractType::LONG);
			locals.push(AbstractType::TOP);
		},
		Sort::Double => {
			locals.push(AbstractType::DOUBLE);
			locals.push(AbstractType::TOP);
		},
		Sort::Array => {
			let (dims, element) = array_shape(ty);
			let idx = table.add_type(element);
			locals.push(AbstractType::array(dims, idx));
		},
		Sort::Object => {
			let idx = table.add_type(ty.internal_name().unwrap());
			locals.push(AbstractType::object(idx));
		},
		Sort::Void | Sort::Method => unreachable!("not a local/stack slot type"),
	}
}

fn array_shape(ty: &crate::descriptor::Type) -> (u8, &str) {
	match ty {
		crate::descriptor::Type::Array { dimensions, element } => {
			let name = element.internal_name().unwrap_or("java/lang/Object");
			(*dimensions, name)
		},
		_ => (0, "java/lang/Object"),
	}
}

/// The least-upper-bound of two abstract types.
pub fn merge_type(a: AbstractType, b: AbstractType, hierarchy: &dyn ClassHierarchy, table: &mut SymbolTable) -> AbstractType {
	if a == b {
		return a;
	}
	if a == AbstractType::NULL && b.is_reference() {
		return b;
	}
	if b == AbstractType::NULL && a.is_reference() {
		return a;
	}
	if !a.is_reference() || !b.is_reference() {
		// Reference-vs-primitive, or two distinct non-reference kinds
		// (e.g. Integer vs Float): merges to TOP.
		return AbstractType::TOP;
	}
	if matches!(a.kind(), Kind::Uninitialized | Kind::UninitializedThis)
		|| matches!(b.kind(), Kind::Uninitialized | Kind::UninitializedThis)
	{
		// Two different uninitialized markers never unify; treat as TOP so
		// the frame that would require it is flagged rather than silently
		// accepted as initialized.
		return AbstractType::TOP;
	}

	let a_dims = a.dimensions();
	let b_dims = b.dimensions();
	if a_dims != b_dims {
		// Dimension mismatch demotes to plain Object.
		let object_idx = table.add_type("java/lang/Object");
		return AbstractType::object(object_idx);
	}

	let a_name = table.type_table_entry(a.value()).and_then(|s| s.value.clone()).unwrap_or_default();
	let b_name = table.type_table_entry(b.value()).and_then(|s| s.value.clone()).unwrap_or_default();
	let merged_name = hierarchy.common_super_class(&a_name, &b_name);
	let idx = table.add_type(&merged_name);
	if a_dims == 0 {
		AbstractType::object(idx)
	} else {
		AbstractType::array(a_dims, idx)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::common_super::TrivialClassHierarchy;

	#[test]
	fn null_merges_to_the_other_reference_type() {
		let mut table = SymbolTable::new();
		let idx = table.add_type("java/lang/String");
		let string_ty = AbstractType::object(idx);
		let merged = merge_type(AbstractType::NULL, string_ty, &TrivialClassHierarchy, &mut table);
		assert_eq!(merged, string_ty);
	}

	#[test]
	fn reference_and_primitive_merge_to_top() {
		let mut table = SymbolTable::new();
		let idx = table.add_type("java/lang/String");
		let merged = merge_type(AbstractType::INTEGER, AbstractType::object(idx), &TrivialClassHierarchy, &mut table);
		assert_eq!(merged, AbstractType::TOP);
	}

	#[test]
	fn array_dimension_mismatch_demotes_to_object() {
		let mut table = SymbolTable::new();
		let elem = table.add_type("java/lang/String");
		let a = AbstractType::array(2, elem);
		let b = AbstractType::array(1, elem);
		let merged = merge_type(a, b, &TrivialClassHierarchy, &mut table);
		assert_eq!(merged.dimensions(), 0);
		assert_eq!(merged.kind(), Kind::Object);
	}

	#[test]
	fn long_and_double_occupy_two_slots() {
		assert_eq!(AbstractType::LONG.width(), 2);
		assert_eq!(AbstractType::DOUBLE.width(), 2);
		assert_eq!(AbstractType::INTEGER.width(), 1);
	}
}
