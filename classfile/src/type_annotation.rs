//! Type annotations: `target_info`/`target_path` (JSR-308), parsed
//! incrementally so labels embedded in a target can be resolved in the
//! same pass as the rest of the method body.

use crate::error::{Error, Result};
use crate::label::Label;

/// The `target_type` byte plus its associated `target_info` union, reduced
/// to the fields the JVMS actually defines per target kind.
/// LOCAL_VARIABLE, RESOURCE_VARIABLE and EXCEPTION_PARAMETER are the kinds
/// whose `target_info` embeds a bytecode label; the remaining kinds carry
/// no label and are represented with their raw index/offset fields for
/// completeness.
#[derive(Debug, Clone)]
pub enum TypeReference {
	ClassTypeParameter { index: u8 },
	MethodTypeParameter { index: u8 },
	ClassExtends { supertype_index: u16 },
	ClassTypeParameterBound { type_parameter_index: u8, bound_index: u8 },
	MethodTypeParameterBound { type_parameter_index: u8, bound_index: u8 },
	Field,
	MethodReturn,
	MethodReceiver,
	MethodFormalParameter { index: u8 },
	Throws { throws_type_index: u16 },
	/// `target_info` is a table of `(start_pc, length, index)` triples,
	/// one per live range; each range's `start_pc`/`start_pc+length` is
	/// represented as a pair of `Label`s so the engine can resolve them
	/// the same way it resolves any other bytecode position.
	LocalVariable { entries: Vec<(Label, Label, u16)> },
	ResourceVariable { entries: Vec<(Label, Label, u16)> },
	ExceptionParameter { exception_table_index: u16 },
	Instanceof { offset: Label },
	New { offset: Label },
	ConstructorReference { offset: Label },
	MethodReference { offset: Label },
	Cast { offset: Label, type_argument_index: u8 },
	ConstructorInvocationTypeArgument { offset: Label, type_argument_index: u8 },
	MethodInvocationTypeArgument { offset: Label, type_argument_index: u8 },
	ConstructorReferenceTypeArgument { offset: Label, type_argument_index: u8 },
	MethodReferenceTypeArgument { offset: Label, type_argument_index: u8 },
}

impl TypeReference {
	/// The JVMS `target_type` byte (Table 4.7.20-A/B).
	pub fn sort(&self) -> u8 {
		match self {
			TypeReference::ClassTypeParameter {.. } => 0x00,
			TypeReference::MethodTypeParameter {.. } => 0x01,
			TypeReference::ClassExtends {.. } => 0x10,
			TypeReference::ClassTypeParameterBound {.. } => 0x11,
			TypeReference::MethodTypeParameterBound {.. } => 0x12,
			TypeReference::Field => 0x13,
			TypeReference::MethodReturn => 0x14,
			TypeReference::MethodReceiver => 0x15,
			TypeReference::MethodFormalParameter {.. } => 0x16,
			TypeReference::Throws {.. } => 0x17,
			TypeReference::LocalVariable {.. } => 0x40,
			TypeReference::ResourceVariable {.. } => 0x41,
			TypeReference::ExceptionParameter {.. } => 0x42,
			TypeReference::Instanceof {.. } => 0x43,
			TypeReference::New {.. } => 0x44,
			TypeReference::ConstructorReference {.. } => 0x45,
			TypeReference::MethodReference {.. } => 0x46,
			TypeReference::Cast {.. } => 0x47,
			TypeReference::ConstructorInvocationTypeArgument {.. } => 0x48,
			TypeReference::MethodInvocationTypeArgument {.. } => 0x49,
			TypeReference::ConstructorReferenceTypeArgument {.. } => 0x4A,
			TypeReference::MethodReferenceTypeArgument {.. } => 0x4B,
		}
	}

	/// `true` for the three kinds (LOCAL_VARIABLE, RESOURCE_VARIABLE,
	/// EXCEPTION_PARAMETER) whose `target_info` carries label references
	/// that must be pre-created before this target is decoded.
	pub fn references_labels(target_type: u8) -> bool {
		matches!(target_type, 0x40 | 0x41 | 0x42)
	}
}

/// One step of a `type_path` (JVMS §4.7.20.2): either "go one level
/// deeper into an array element / nested type / wildcard bound" or "go to
/// the `n`-th type argument of a parameterized type".
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TypePathStep {
	ArrayElement,
	InnerType,
	WildcardBound,
	TypeArgument(u8),
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TypePath {
	pub steps: Vec<TypePathStep>,
}

impl TypePath {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses the `{path_length, (type_path_kind, type_argument_index)*}`
	/// encoding directly out of a byte slice (used by both the
	/// `StackMapTable`/annotation decoders and the writer's size/emit pair).
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		let mut steps = Vec::with_capacity(bytes.first().copied().unwrap_or(0) as usize);
		let count = *bytes.first().ok_or_else(|| Error::MalformedClass("empty type_path".into()))? as usize;
		for i in 0..count {
			let kind = *bytes.get(1 + i * 2).ok_or_else(|| Error::MalformedClass("truncated type_path".into()))?;
			let arg = *bytes.get(2 + i * 2).ok_or_else(|| Error::MalformedClass("truncated type_path".into()))?;
			steps.push(match kind {
				0 => TypePathStep::ArrayElement,
				1 => TypePathStep::InnerType,
				2 => TypePathStep::WildcardBound,
				3 => TypePathStep::TypeArgument(arg),
				other => return Err(Error::MalformedClass(format!("invalid type_path_kind {other}"))),
			});
		}
		Ok(Self { steps })
	}

	/// Parses the compact textual form `visit_type_annotation`'s `type_path`
	/// parameter carries (e.g. `"[.[*"`, `"0;"`), the inverse of the
	/// reader's `type_path_to_string`.
	pub fn parse(text: &str) -> Result<Self> {
		let mut steps = Vec::new();
		let mut chars = text.chars().peekable();
		while let Some(c) = chars.next() {
			steps.push(match c {
				'[' => TypePathStep::ArrayElement,
				'.' => TypePathStep::InnerType,
				'*' => TypePathStep::WildcardBound,
				digit if digit.is_ascii_digit() => {
					let mut number = String::from(digit);
					while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
						number.push(chars.next().unwrap());
					}
					if chars.next() != Some(';') {
						return Err(Error::MalformedClass(format!("malformed type_path `{text}`: expected `;` after type argument index")));
					}
					TypePathStep::TypeArgument(number.parse().map_err(|_| Error::MalformedClass(format!("type argument index out of range in `{text}`")))?)
				},
				other => return Err(Error::MalformedClass(format!("invalid type_path character `{other}` in `{text}`"))),
			});
		}
		Ok(Self { steps })
	}

	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(1 + self.steps.len() * 2);
		out.push(self.steps.len() as u8);
		for step in &self.steps {
			let (kind, arg) = match step {
				TypePathStep::ArrayElement => (0, 0),
				TypePathStep::InnerType => (1, 0),
				TypePathStep::WildcardBound => (2, 0),
				TypePathStep::TypeArgument(n) => (3, *n),
			};
			out.push(kind);
			out.push(arg);
		}
		out
	}
}

/// Rebuilds the `target_info` bytes for the "simple" (non-label) kinds —
/// 0x00/0x01 type-parameter declarations and 0x10-0x17 class/method-level
/// kinds — from the packed `type_ref` a `visit_type_annotation` caller
/// hands in, mirroring `ClassReader::parse_class_type_annotation`'s packing
/// in reverse. The label-bearing kinds (0x40-0x4B) are built elsewhere, from
/// the label offsets each writer tracks rather than from `type_ref` alone.
pub fn encode_simple_target_info(type_ref: u32) -> Vec<u8> {
	let target_type = (type_ref >> 24) as u8;
	match target_type {
		0x00 | 0x01 | 0x16 => vec![((type_ref >> 16) & 0xFF) as u8],
		0x10 => ((type_ref & 0xFFFF) as u16).to_be_bytes().to_vec(),
		0x11 | 0x12 => vec![((type_ref >> 16) & 0xFF) as u8, ((type_ref >> 8) & 0xFF) as u8],
		0x17 => ((type_ref & 0xFFFF) as u16).to_be_bytes().to_vec(),
		0x42 => ((type_ref & 0xFFFF) as u16).to_be_bytes().to_vec(),
		_ => Vec::new(),
	}
}

/// `target_type` byte, `target_info` (via [`encode_simple_target_info`]) and
/// `target_path` for a class- or method-level type annotation — the
/// counterpart to [`crate::field_writer::encode_simple_target_prefix`] for
/// kinds whose `target_info` isn't always empty.
pub fn encode_simple_target_prefix(type_ref: u32, type_path: &str) -> Vec<u8> {
	let mut out = vec![(type_ref >> 24) as u8];
	out.extend(encode_simple_target_info(type_ref));
	let path = TypePath::parse(type_path).unwrap_or_default();
	out.extend(path.to_bytes());
	out
}
