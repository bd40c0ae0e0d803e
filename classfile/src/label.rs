//! `Label` and `Edge`.
//!
//! Labels are created independently by user code before a `MethodWriter`
//! ever sees them, so
//! unlike the constant pool (owned end-to-end by one `SymbolTable`) a
//! label's identity can't be a bare index into a structure the user never
//! holds a handle to. `Label` is therefore a cheap, clonable handle over a
//! shared mutable cell — the closest Rust equivalent of the aliased mutable
//! object ASM's own `Label` class is — rather than the literal
//! bump-arena-index scheme an arena-indexed design would use; that
//! alternative is recorded as a considered-and-rejected option in
//! DESIGN.md. Basic-block edges avoid reference cycles (a loop's back-edge
//! would otherwise leak) by holding a `Weak` pointer to their target and
//! relying on the owning `MethodWriter`'s `labels: Vec<Label>` to keep every
//! label in the method alive for the duration of the write.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bitflags::bitflags;

use crate::frame::Frame;

bitflags! {
	#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
	pub struct LabelFlags: u8 {
		/// The label's bytecode offset has been determined.
		const RESOLVED = 0x01;
		/// At least one basic block predecessor can reach this label
		/// (versus dead code following an unconditional jump/return).
		const REACHABLE = 0x02;
		/// At least one jump instruction targets this label.
		const JUMP_TARGET = 0x04;
		/// Created only to anchor debug info (line numbers, local variable
		/// ranges) and never targeted by a jump.
		const DEBUG_ONLY = 0x08;
		/// This label is the resume point of a `jsr` subroutine call.
		const SUBROUTINE_CALLER = 0x10;
	}
}

/// Which width (and therefore patch semantics) a pending branch reference
/// needs once its target label resolves.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ForwardReferenceKind {
	/// A 2-byte relative offset, as every short-form branch carries.
	Branch2,
	/// A 4-byte relative offset, as `GOTO_W`/`JSR_W` carry.
	Branch4,
	/// An absolute bytecode offset recorded in a non-Code structure (e.g. a
	/// `LineNumberTable`/`LocalVariableTable` `start_pc`), rather than a
	/// relative branch displacement.
	AbsoluteU16,
}

#[derive(Debug, Copy, Clone)]
pub struct ForwardReference {
	/// Byte offset, within the method's in-progress code buffer, of the
	/// placeholder that must be overwritten once this label resolves.
	pub source_offset: u32,
	pub kind: ForwardReferenceKind,
}

/// The arc between two basic blocks.
#[derive(Clone)]
pub struct Edge {
	pub target: Weak<RefCell<LabelData>>,
	pub payload: EdgePayload,
}

#[derive(Debug, Copy, Clone)]
pub enum EdgePayload {
	/// The operand-stack size at the point of the jump, used when only
	/// `max_stack` is being computed (the classic stack-delta bookkeeping
	/// path).
	StackSize(u16),
	/// A `visitTryCatchBlock` handler edge, carrying the caught exception
	/// type's constant-pool index (0 for a `finally`/catch-all handler).
	ExceptionHandler(u16),
}

pub struct LabelData {
	pub offset: i32,
	pub flags: LabelFlags,
	pub forward_references: Vec<ForwardReference>,
	pub edges: Vec<Edge>,
	pub frame: Option<Frame>,
	pub successor: Option<Weak<RefCell<LabelData>>>,
}

impl Default for LabelData {
	fn default() -> Self {
		Self {
			offset: -1,
			flags: LabelFlags::empty(),
			forward_references: Vec::new(),
			edges: Vec::new(),
			frame: None,
			successor: None,
		}
	}
}

/// A placeholder for a bytecode position. Cloning a
/// `Label` yields another handle to the same underlying cell, matching the
/// "user code typically only stores them" sharing model.
#[derive(Clone)]
pub struct Label(Rc<RefCell<LabelData>>);

impl Label {
	pub fn new() -> Self {
		Self(Rc::new(RefCell::new(LabelData::default())))
	}

	pub fn is_resolved(&self) -> bool {
		self.0.borrow().flags.contains(LabelFlags::RESOLVED)
	}

	pub fn offset(&self) -> Option<u32> {
		let data = self.0.borrow();
		data.flags.contains(LabelFlags::RESOLVED).then_some(data.offset as u32)
	}

	/// Mutates this label's resolved offset and flags. Called exclusively
	/// by the `MethodWriter` that owns it; takes the list of pending forward references so
	/// the caller can patch its output buffer, and clears the list.
	pub fn resolve(&self, offset: u32) -> Vec<ForwardReference> {
		let mut data = self.0.borrow_mut();
		data.offset = offset as i32;
		data.flags.insert(LabelFlags::RESOLVED);
		std::mem::take(&mut data.forward_references)
	}

	pub fn add_forward_reference(&self, source_offset: u32, kind: ForwardReferenceKind) {
		self.0.borrow_mut().forward_references.push(ForwardReference { source_offset, kind });
	}

	pub fn mark(&self, flags: LabelFlags) {
		self.0.borrow_mut().flags.insert(flags);
	}

	pub fn flags(&self) -> LabelFlags {
		self.0.borrow().flags
	}

	pub fn add_edge(&self, target: &Label, payload: EdgePayload) {
		self.0.borrow_mut().edges.push(Edge { target: Rc::downgrade(&target.0), payload });
	}

	pub fn edges(&self) -> Vec<Edge> {
		self.0.borrow().edges.clone()
	}

	pub fn set_successor(&self, successor: &Label) {
		self.0.borrow_mut().successor = Some(Rc::downgrade(&successor.0));
	}

	pub fn successor(&self) -> Option<Label> {
		self.0.borrow().successor.as_ref().and_then(Weak::upgrade).map(Label)
	}

	pub fn set_frame(&self, frame: Frame) {
		self.0.borrow_mut().frame = Some(frame);
	}

	pub fn frame(&self) -> Option<Frame> {
		self.0.borrow().frame.clone()
	}

	pub fn take_frame(&self) -> Option<Frame> {
		self.0.borrow_mut().frame.take()
	}

	/// Identity comparison: two `Label` handles refer to the same block iff
	/// they share the same backing cell.
	pub fn ptr_eq(&self, other: &Label) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// A stable identity key for this label's backing cell, for use as a
	/// `HashMap` key where `Label` itself (aliased, interior-mutable) has no
	/// `Eq`/`Hash` impl.
	pub fn as_ptr_key(&self) -> usize {
		Rc::as_ptr(&self.0) as usize
	}
}

impl Clone for Edge {
	fn clone(&self) -> Self {
		Edge { target: self.target.clone(), payload: self.payload }
	}
}

impl Default for Label {
	fn default() -> Self {
		Self::new()
	}
}

impl Edge {
	pub fn target(&self) -> Option<Label> {
		self.target.upgrade().map(Label)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn forward_reference_is_consumed_on_resolve() {
		let label = Label::new();
		label.add_forward_reference(10, ForwardReferenceKind::Branch2);
		assert!(!label.is_resolved());
		let refs = label.resolve(100);
		assert_eq!(refs.len(), 1);
		assert!(label.is_resolved());
		assert_eq!(label.offset(), Some(100));
	}

	#[test]
	fn cloned_handles_share_state() {
		let a = Label::new();
		let b = a.clone();
		a.resolve(5);
		assert_eq!(b.offset(), Some(5));
		assert!(a.ptr_eq(&b));
	}

	#[test]
	fn loop_back_edge_does_not_prevent_drop() {
		let a = Label::new();
		let b = Label::new();
		a.add_edge(&b, EdgePayload::StackSize(0));
		b.add_edge(&a, EdgePayload::StackSize(0));
		// Only local strong references; dropping both must not leak or panic.
		drop(a);
		drop(b);
	}
}
