//! `Handle` and `ConstantDynamic`: the payload types a `CONSTANT_MethodHandle_info`
//! / `CONSTANT_Dynamic_info` / `CONSTANT_InvokeDynamic_info` carries, exposed
//! to the visitor surface.

use crate::value::ConstantValue;

/// A method handle: a `reference_kind` (1-9, JVMS `MethodHandleInfo`) plus
/// the owner/name/descriptor of the field or method it resolves through,
/// and whether that owner is an interface.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Handle {
	pub reference_kind: u8,
	pub owner: String,
	pub name: String,
	pub descriptor: String,
	pub is_interface: bool,
}

impl Handle {
	pub fn new(reference_kind: u8, owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>, is_interface: bool) -> Self {
		Self { reference_kind, owner: owner.into(), name: name.into(), descriptor: descriptor.into(), is_interface }
	}
}

/// `CONSTANT_Dynamic_info`: a name/descriptor pair resolved via a bootstrap
/// method plus its constant arguments.
/// Bootstrap arguments may themselves recursively contain a
/// `ConstantDynamic`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDynamic {
	pub name: String,
	pub descriptor: String,
	pub bootstrap_method: Handle,
	pub bootstrap_method_arguments: Vec<ConstantValue>,
}

impl ConstantDynamic {
	pub fn new(
		name: impl Into<String>,
		descriptor: impl Into<String>,
		bootstrap_method: Handle,
		bootstrap_method_arguments: Vec<ConstantValue>,
	) -> Self {
		Self { name: name.into(), descriptor: descriptor.into(), bootstrap_method, bootstrap_method_arguments }
	}
}
