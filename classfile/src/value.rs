//! `ConstantValue`: the runtime-typed payload behind `ldc`, annotation
//! element values, and bootstrap-method arguments.

use crate::descriptor::Type;
use crate::handle::{ConstantDynamic, Handle};

/// A value that can appear as an `ldc`/`ldc_w`/`ldc2_w` operand, an
/// annotation element value, or a bootstrap-method argument. Dispatches
/// `SymbolTable::add_constant` to the matching `add_constant_xxx` call
///.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
	Int(i32),
	Long(i64),
	Float(f32),
	Double(f64),
	String(String),
	Type(Type),
	Handle(Handle),
	ConstantDynamic(ConstantDynamic),
}

impl From<i32> for ConstantValue {
	fn from(value: i32) -> Self {
		ConstantValue::Int(value)
	}
}

impl From<i64> for ConstantValue {
	fn from(value: i64) -> Self {
		ConstantValue::Long(value)
	}
}

impl From<f32> for ConstantValue {
	fn from(value: f32) -> Self {
		ConstantValue::Float(value)
	}
}

impl From<f64> for ConstantValue {
	fn from(value: f64) -> Self {
		ConstantValue::Double(value)
	}
}

impl From<Handle> for ConstantValue {
	fn from(value: Handle) -> Self {
		ConstantValue::Handle(value)
	}
}

impl From<ConstantDynamic> for ConstantValue {
	fn from(value: ConstantDynamic) -> Self {
		ConstantValue::ConstantDynamic(value)
	}
}
