//! Error kinds for the core read/transform/write pipeline.

use std::fmt::{Display, Formatter};

/// Every failure the core can raise. All variants are fatal to the current
/// class-file operation; none are recovered locally.
#[derive(Debug)]
pub enum Error {
	/// The input is not a valid class file: bad magic, unknown constant-pool
	/// tag, an attribute whose declared length runs past the buffer, or an
	/// invalid type-annotation `target_type`.
	MalformedClass(String),
	/// The class's major version is outside the codec's supported range.
	UnsupportedVersion { major: u16, max_supported: u16 },
	/// The constant pool would need more than 65535 entries to serialize.
	ClassTooLarge { entry_count: u32 },
	/// A method's `Code` attribute would exceed 65535 bytes on emit.
	MethodTooLarge { owner: String, name: String, length: u32 },
	/// A Modified-UTF-8 encoding would exceed 65535 bytes.
	StringTooLong { byte_length: usize },
	/// The caller invoked an API gated behind a higher minimum supported
	/// version than the one currently configured.
	UnsupportedOperation(&'static str),
	/// A documented precondition was violated by the caller.
	InvalidArgument(String),
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::MalformedClass(msg) => write!(f, "malformed class file: {msg}"),
			Error::UnsupportedVersion { major, max_supported } => write!(
				f,
				"unsupported class version {major} (this codec supports up to {max_supported})"
			),
			Error::ClassTooLarge { entry_count } => {
				write!(f, "constant pool has {entry_count} entries, exceeding the 65535 limit")
			},
			Error::MethodTooLarge { owner, name, length } => {
				write!(f, "method {owner}.{name} has a {length}-byte Code attribute, exceeding the 65535 limit")
			},
			Error::StringTooLong { byte_length } => {
				write!(f, "string encodes to {byte_length} Modified-UTF-8 bytes, exceeding the 65535 limit")
			},
			Error::UnsupportedOperation(what) => write!(f, "unsupported operation: {what}"),
			Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
		}
	}
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
	fn from(value: std::io::Error) -> Self {
		Error::MalformedClass(value.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;

/// A deferred-error cell shared by a `ClassWriter` and every sub-writer it
/// spawns. The visitor trait methods return no `Result`, so a
/// fallible operation performed inside one (interning a too-long string,
/// overflowing the constant pool) records its error here instead of
/// propagating it immediately; `ClassWriter::to_byte_array` checks it before
/// assembling any output.
#[derive(Clone, Default)]
pub struct ErrorSink(std::rc::Rc<std::cell::RefCell<Option<Error>>>);

impl ErrorSink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs `result`, recording its error (if any, and if none is already
	/// recorded) and returning `Some`/`None` in its place so callers can
	/// short-circuit the rest of the current `visit*` call.
	pub fn record<T>(&self, result: Result<T>) -> Option<T> {
		match result {
			Ok(value) => Some(value),
			Err(err) => {
				let mut slot = self.0.borrow_mut();
				if slot.is_none() {
					*slot = Some(err);
				}
				None
			},
		}
	}

	pub fn check(&self) -> Result<()> {
		match self.0.borrow_mut().take() {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}
