//! Two-pass `Code` attribute parsing.
//!
//! Pass 1 (`scan_branch_targets`) walks the raw bytecode once just to
//! discover every offset a branch, switch, exception handler, line-number
//! entry, local-variable range, or stack-map frame refers to, and creates
//! a [`Label`] for each. Pass 2 (`decode_instructions`) walks the bytecode
//! again, this time producing a flat, ordered [`CodeEvent`] list that
//! [`crate::reader::ClassReader::accept`] replays onto the live
//! `MethodVisitor`. Splitting the walk this way means a backward branch's
//! target label already exists (and is already resolved) by the time the
//! emit pass reaches the instruction that targets it — the same ordering
//! problem `MethodWriter` solves on the way out.

use std::collections::HashMap;

use crate::annotation::{replay_annotation, ParsedAnnotation};
use crate::attribute::AttributeRegistry;
use crate::descriptor::Type;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::label::Label;
use crate::opcodes::Opcode;
use crate::reader::{ClassReader, ReaderOptions};
use crate::value::ConstantValue;
use crate::visitor::{FrameType, MethodVisitor, VerificationType};

pub struct CodeAttributeEvents {
	pub events: Vec<CodeEvent>,
	pub max_stack: u16,
	pub max_locals: u16,
}

/// One replayable `MethodVisitor` call, materialised ahead of time so the
/// class-level parse can drive an arbitrary visitor without re-touching
/// the underlying bytes.
pub enum CodeEvent {
	TryCatchBlock { start: Label, end: Label, handler: Label, catch_type: Option<String> },
	TryCatchAnnotation { type_ref: u32, type_path: String, annotation: ParsedAnnotation, visible: bool },
	Label(Label),
	Frame { frame_type: FrameType, locals: Vec<VerificationType>, stack: Vec<VerificationType> },
	LineNumber { line: u16, start: Label },
	LocalVariable { name: String, descriptor: String, signature: Option<String>, start: Label, end: Label, index: u16 },
	LocalVariableAnnotation { type_ref: u32, type_path: String, start: Vec<Label>, end: Vec<Label>, index: Vec<u16>, annotation: ParsedAnnotation, visible: bool },
	InsnAnnotation { type_ref: u32, type_path: String, annotation: ParsedAnnotation, visible: bool },
	Insn(Opcode),
	IntInsn { opcode: Opcode, operand: i32 },
	VarInsn { opcode: Opcode, var: u16 },
	TypeInsn { opcode: Opcode, type_name: String },
	FieldInsn { opcode: Opcode, owner: String, name: String, descriptor: String },
	MethodInsn { opcode: Opcode, owner: String, name: String, descriptor: String, is_interface: bool },
	InvokeDynamicInsn { name: String, descriptor: String, bootstrap_method: Handle, bootstrap_method_arguments: Vec<ConstantValue> },
	JumpInsn { opcode: Opcode, label: Label },
	LdcInsn(ConstantValue),
	IincInsn { var: u16, increment: i32 },
	TableSwitchInsn { min: i32, max: i32, default: Label, labels: Vec<Label> },
	LookupSwitchInsn { default: Label, keys: Vec<i32>, labels: Vec<Label> },
	MultiANewArrayInsn { descriptor: String, num_dimensions: u8 },
}

impl CodeEvent {
	pub fn replay(self, visitor: &mut dyn MethodVisitor) {
		match self {
			CodeEvent::TryCatchBlock { start, end, handler, catch_type } => visitor.visit_try_catch_block(&start, &end, &handler, catch_type.as_deref()),
			CodeEvent::TryCatchAnnotation { type_ref, type_path, annotation, visible } => {
				if let Some(mut child) = visitor.visit_try_catch_annotation(type_ref, &type_path, &annotation.descriptor, visible) {
					replay_annotation(&mut *child, &annotation);
				}
			},
			CodeEvent::Label(label) => visitor.visit_label(&label),
			CodeEvent::Frame { frame_type, locals, stack } => visitor.visit_frame(frame_type, &locals, &stack),
			CodeEvent::LineNumber { line, start } => visitor.visit_line_number(line, &start),
			CodeEvent::LocalVariable { name, descriptor, signature, start, end, index } => {
				visitor.visit_local_variable(&name, &descriptor, signature.as_deref(), &start, &end, index)
			},
			CodeEvent::LocalVariableAnnotation { type_ref, type_path, start, end, index, annotation, visible } => {
				if let Some(mut child) = visitor.visit_local_variable_annotation(type_ref, &type_path, &start, &end, &index, &annotation.descriptor, visible) {
					replay_annotation(&mut *child, &annotation);
				}
			},
			CodeEvent::InsnAnnotation { type_ref, type_path, annotation, visible } => {
				if let Some(mut child) = visitor.visit_insn_annotation(type_ref, &type_path, &annotation.descriptor, visible) {
					replay_annotation(&mut *child, &annotation);
				}
			},
			CodeEvent::Insn(opcode) => visitor.visit_insn(opcode),
			CodeEvent::IntInsn { opcode, operand } => visitor.visit_int_insn(opcode, operand),
			CodeEvent::VarInsn { opcode, var } => visitor.visit_var_insn(opcode, var),
			CodeEvent::TypeInsn { opcode, type_name } => visitor.visit_type_insn(opcode, &type_name),
			CodeEvent::FieldInsn { opcode, owner, name, descriptor } => visitor.visit_field_insn(opcode, &owner, &name, &descriptor),
			CodeEvent::MethodInsn { opcode, owner, name, descriptor, is_interface } => visitor.visit_method_insn(opcode, &owner, &name, &descriptor, is_interface),
			CodeEvent::InvokeDynamicInsn { name, descriptor, bootstrap_method, bootstrap_method_arguments } => {
				visitor.visit_invoke_dynamic_insn(&name, &descriptor, &bootstrap_method, &bootstrap_method_arguments)
			},
			CodeEvent::JumpInsn { opcode, label } => visitor.visit_jump_insn(opcode, &label),
			CodeEvent::LdcInsn(value) => visitor.visit_ldc_insn(value),
			CodeEvent::IincInsn { var, increment } => visitor.visit_iinc_insn(var, increment),
			CodeEvent::TableSwitchInsn { min, max, default, labels } => visitor.visit_table_switch_insn(min, max, &default, &labels),
			CodeEvent::LookupSwitchInsn { default, keys, labels } => visitor.visit_lookup_switch_insn(&default, &keys, &labels),
			CodeEvent::MultiANewArrayInsn { descriptor, num_dimensions } => visitor.visit_multi_a_new_array_insn(&descriptor, num_dimensions),
		}
	}
}

pub fn parse_code_attribute(reader: &ClassReader, body: usize, _length: usize, options: ReaderOptions, registry: &AttributeRegistry) -> Result<CodeAttributeEvents> {
	let _ = registry;
	let max_stack = reader.u16_pub(body)?;
	let max_locals = reader.u16_pub(body + 2)?;
	let code_length = reader.u32_pub(body + 4)? as usize;
	let code_start = body + 8;
	let code = &reader.bytes()[code_start..code_start + code_length];

	let mut labels: HashMap<u32, Label> = HashMap::new();
	let get_label = |labels: &mut HashMap<u32, Label>, offset: u32| -> Label { labels.entry(offset).or_insert_with(Label::new).clone() };

	scan_branch_targets(code, &mut labels)?;

	let exception_table_offset = code_start + code_length;
	let exception_count = reader.u16_pub(exception_table_offset)? as usize;
	let mut exception_entries = Vec::with_capacity(exception_count);
	let mut cursor = exception_table_offset + 2;
	for _ in 0..exception_count {
		let start_pc = reader.u16_pub(cursor)? as u32;
		let end_pc = reader.u16_pub(cursor + 2)? as u32;
		let handler_pc = reader.u16_pub(cursor + 4)? as u32;
		let catch_type_index = reader.u16_pub(cursor + 6)?;
		get_label(&mut labels, start_pc);
		get_label(&mut labels, end_pc);
		get_label(&mut labels, handler_pc);
		exception_entries.push((start_pc, end_pc, handler_pc, catch_type_index));
		cursor += 8;
	}

	let attributes_count = reader.u16_pub(cursor)?;
	cursor += 2;

	let mut line_numbers: Vec<(u32, u16)> = Vec::new();
	let mut local_variables: Vec<(u32, u32, u16, u16, u16)> = Vec::new();
	let mut local_variable_types: Vec<(u32, u32, u16, u16, u16)> = Vec::new();
	let mut stack_map_table_offset: Option<usize> = None;
	let mut code_type_annotations: Vec<(usize, bool)> = Vec::new();

	for _ in 0..attributes_count {
		let name_index = reader.u16_pub(cursor)?;
		let length = reader.u32_pub(cursor + 2)? as usize;
		let attr_body = cursor + 6;
		match &*reader.utf8_pub(name_index)? {
			"LineNumberTable" if !options.contains(ReaderOptions::SKIP_DEBUG) => {
				let count = reader.u16_pub(attr_body)? as usize;
				let mut p = attr_body + 2;
				for _ in 0..count {
					let start_pc = reader.u16_pub(p)? as u32;
					let line = reader.u16_pub(p + 2)?;
					get_label(&mut labels, start_pc);
					line_numbers.push((start_pc, line));
					p += 4;
				}
			},
			"LocalVariableTable" if !options.contains(ReaderOptions::SKIP_DEBUG) => {
				let count = reader.u16_pub(attr_body)? as usize;
				let mut p = attr_body + 2;
				for _ in 0..count {
					let start_pc = reader.u16_pub(p)? as u32;
					let length_pc = reader.u16_pub(p + 2)? as u32;
					let name_idx = reader.u16_pub(p + 4)?;
					let desc_idx = reader.u16_pub(p + 6)?;
					let index = reader.u16_pub(p + 8)?;
					get_label(&mut labels, start_pc);
					get_label(&mut labels, start_pc + length_pc);
					local_variables.push((start_pc, start_pc + length_pc, name_idx, desc_idx, index));
					p += 10;
				}
			},
			"LocalVariableTypeTable" if !options.contains(ReaderOptions::SKIP_DEBUG) => {
				let count = reader.u16_pub(attr_body)? as usize;
				let mut p = attr_body + 2;
				for _ in 0..count {
					let start_pc = reader.u16_pub(p)? as u32;
					let length_pc = reader.u16_pub(p + 2)? as u32;
					let name_idx = reader.u16_pub(p + 4)?;
					let sig_idx = reader.u16_pub(p + 6)?;
					let index = reader.u16_pub(p + 8)?;
					local_variable_types.push((start_pc, start_pc + length_pc, name_idx, sig_idx, index));
					p += 10;
				}
			},
			"StackMapTable" if !options.contains(ReaderOptions::SKIP_FRAMES) => stack_map_table_offset = Some(attr_body),
			"RuntimeVisibleTypeAnnotations" => code_type_annotations.push((attr_body, true)),
			"RuntimeInvisibleTypeAnnotations" => code_type_annotations.push((attr_body, false)),
			_ => {},
		}
		cursor = attr_body + length;
	}

	let mut events = Vec::new();

	for (start_pc, end_pc, handler_pc, catch_type_index) in &exception_entries {
		let catch_type = if *catch_type_index == 0 { None } else { Some(reader.class_internal_name_pub(*catch_type_index)?.to_string()) };
		events.push(CodeEvent::TryCatchBlock {
			start: labels[start_pc].clone(),
			end: labels[end_pc].clone(),
			handler: labels[handler_pc].clone(),
			catch_type,
		});
	}

	let decoded = decode_instructions(reader, code, code_start, &mut labels, options)?;

	let mut line_number_events: HashMap<u32, Vec<CodeEvent>> = HashMap::new();
	for (start_pc, line) in line_numbers {
		line_number_events.entry(start_pc).or_default().push(CodeEvent::LineNumber { line, start: labels[&start_pc].clone() });
	}

	let mut frame_events: HashMap<u32, CodeEvent> = HashMap::new();
	if let Some(smt_offset) = stack_map_table_offset {
		decode_stack_map_table(reader, smt_offset, &labels, &mut frame_events)?;
	}

	for instruction in decoded {
		let offset = instruction.offset;
		if let Some(frame_event) = frame_events.remove(&offset) {
			events.push(frame_event);
		}
		if let Some(label) = labels.get(&offset) {
			if !label.is_resolved() {
				label.resolve(offset);
			}
			events.push(CodeEvent::Label(label.clone()));
		}
		if let Some(lines) = line_number_events.remove(&offset) {
			events.extend(lines);
		}
		events.push(instruction.event);
	}

	for (start_pc, end_pc, name_idx, desc_idx, index) in &local_variables {
		let name = reader.utf8_pub(*name_idx)?.to_string();
		let descriptor = reader.utf8_pub(*desc_idx)?.to_string();
		let signature = local_variable_types
			.iter()
			.find(|(s, _, n, _, i)| s == start_pc && i == index && *n == *name_idx)
			.map(|(_, _, _, sig_idx, _)| reader.utf8_pub(*sig_idx).map(|s| s.to_string()))
			.transpose()?;
		events.push(CodeEvent::LocalVariable {
			name,
			descriptor,
			signature,
			start: labels[start_pc].clone(),
			end: labels[end_pc].clone(),
			index: *index,
		});
	}

	for (body, visible) in code_type_annotations {
		decode_code_type_annotations(reader, body, visible, &mut labels, &exception_entries, &mut events)?;
	}

	Ok(CodeAttributeEvents { events, max_stack, max_locals })
}

struct DecodedInsn {
	offset: u32,
	event: CodeEvent,
}

/// Pass 1: finds every offset that a branch, `tableswitch`/`lookupswitch`
/// target, or `tableswitch`/`lookupswitch` default refers to, without
/// resolving any constant-pool references.
fn scan_branch_targets(code: &[u8], labels: &mut HashMap<u32, Label>) -> Result<()> {
	let mut offset = 0u32;
	while (offset as usize) < code.len() {
		let opcode_byte = code[offset as usize];
		let (length, targets) = instruction_length_and_targets(code, offset)?;
		for target in targets {
			labels.entry(target).or_insert_with(Label::new);
		}
		let _ = opcode_byte;
		offset += length as u32;
	}
	Ok(())
}

fn instruction_length_and_targets(code: &[u8], offset: u32) -> Result<(usize, Vec<u32>)> {
	let pos = offset as usize;
	let opcode_byte = *code.get(pos).ok_or_else(|| Error::MalformedClass("truncated bytecode".into()))?;

	if opcode_byte == 0xC4 {
		// wide
		let modified = *code.get(pos + 1).ok_or_else(|| Error::MalformedClass("truncated wide instruction".into()))?;
		return Ok((if modified == Opcode::IINC as u8 { 6 } else { 4 }, Vec::new()));
	}

	if opcode_byte == Opcode::TABLESWITCH as u8 {
		let mut p = pos + 1;
		p += (4 - (p % 4)) % 4;
		let default = i32::from_be_bytes(code[p..p + 4].try_into().unwrap());
		let low = i32::from_be_bytes(code[p + 4..p + 8].try_into().unwrap());
		let high = i32::from_be_bytes(code[p + 8..p + 12].try_into().unwrap());
		let count = (high - low + 1).max(0) as usize;
		let mut targets = vec![(offset as i32 + default) as u32];
		let mut q = p + 12;
		for _ in 0..count {
			let jump = i32::from_be_bytes(code[q..q + 4].try_into().unwrap());
			targets.push((offset as i32 + jump) as u32);
			q += 4;
		}
		return Ok((q - pos, targets));
	}

	if opcode_byte == Opcode::LOOKUPSWITCH as u8 {
		let mut p = pos + 1;
		p += (4 - (p % 4)) % 4;
		let default = i32::from_be_bytes(code[p..p + 4].try_into().unwrap());
		let npairs = i32::from_be_bytes(code[p + 4..p + 8].try_into().unwrap()) as usize;
		let mut targets = vec![(offset as i32 + default) as u32];
		let mut q = p + 8;
		for _ in 0..npairs {
			let jump = i32::from_be_bytes(code[q + 4..q + 8].try_into().unwrap());
			targets.push((offset as i32 + jump) as u32);
			q += 8;
		}
		return Ok((q - pos, targets));
	}

	let opcode = Opcode::from_u8(opcode_byte);
	if let Some(opcode) = opcode {
		if opcode.is_jump() {
			let rel = i16::from_be_bytes(code[pos + 1..pos + 3].try_into().unwrap()) as i32;
			return Ok((3, vec![(offset as i32 + rel) as u32]));
		}
	}
	if opcode_byte == 0xC8 || opcode_byte == 0xC9 {
		// goto_w / jsr_w
		let rel = i32::from_be_bytes(code[pos + 1..pos + 5].try_into().unwrap());
		return Ok((5, vec![(offset as i32 + rel) as u32]));
	}

	Ok((standard_instruction_length(code, pos)?, Vec::new()))
}

fn standard_instruction_length(code: &[u8], pos: usize) -> Result<usize> {
	let opcode_byte = code[pos];
	Ok(match opcode_byte {
		0x10 | 0x12 | 0xBC => 2,                                      // bipush, ldc, newarray
		0x11 | 0x13 | 0x14 => 3,                                      // sipush, ldc_w, ldc2_w
		0x15..=0x19 | 0x36..=0x3A | 0xA9 => 2,                        // *load/*store slow form, ret
		0x84 => 3,                                                    // iinc
		0xB2..=0xB5 | 0xB6..=0xB8 | 0xBB | 0xBD | 0xC0 | 0xC1 | 0xC6 | 0xC7 => 3,
		0xB9 | 0xBA => 5,                                             // invokeinterface, invokedynamic
		0xC5 => 4,                                                    // multianewarray
		_ if code.get(pos).is_some() => 1,
		_ => return Err(Error::MalformedClass("truncated bytecode".into())),
	})
}

fn decode_instructions(reader: &ClassReader, code: &[u8], code_start: usize, labels: &mut HashMap<u32, Label>, options: ReaderOptions) -> Result<Vec<DecodedInsn>> {
	let mut out = Vec::new();
	let mut offset = 0u32;
	let mut get_label = |labels: &mut HashMap<u32, Label>, target: u32| -> Label { labels.entry(target).or_insert_with(Label::new).clone() };

	while (offset as usize) < code.len() {
		let pos = offset as usize;
		let opcode_byte = code[pos];

		if opcode_byte == 0xC4 {
			let modified_byte = code[pos + 1];
			let modified = Opcode::from_u8(modified_byte).ok_or_else(|| Error::MalformedClass("invalid opcode under wide prefix".into()))?;
			let event = if modified == Opcode::IINC {
				let var = u16::from_be_bytes(code[pos + 2..pos + 4].try_into().unwrap());
				let increment = i16::from_be_bytes(code[pos + 4..pos + 6].try_into().unwrap()) as i32;
				CodeEvent::IincInsn { var, increment }
			} else {
				let var = u16::from_be_bytes(code[pos + 2..pos + 4].try_into().unwrap());
				CodeEvent::VarInsn { opcode: modified, var }
			};
			out.push(DecodedInsn { offset, event });
			offset += if modified == Opcode::IINC { 6 } else { 4 };
			continue;
		}

		if opcode_byte == Opcode::TABLESWITCH as u8 {
			let mut p = pos + 1;
			p += (4 - (p % 4)) % 4;
			let default = i32::from_be_bytes(code[p..p + 4].try_into().unwrap());
			let low = i32::from_be_bytes(code[p + 4..p + 8].try_into().unwrap());
			let high = i32::from_be_bytes(code[p + 8..p + 12].try_into().unwrap());
			let count = (high - low + 1).max(0) as usize;
			let default_label = get_label(labels, (offset as i32 + default) as u32);
			let mut switch_labels = Vec::with_capacity(count);
			let mut q = p + 12;
			for _ in 0..count {
				let jump = i32::from_be_bytes(code[q..q + 4].try_into().unwrap());
				switch_labels.push(get_label(labels, (offset as i32 + jump) as u32));
				q += 4;
			}
			out.push(DecodedInsn { offset, event: CodeEvent::TableSwitchInsn { min: low, max: high, default: default_label, labels: switch_labels } });
			offset = (q - pos) as u32 + offset;
			continue;
		}

		if opcode_byte == Opcode::LOOKUPSWITCH as u8 {
			let mut p = pos + 1;
			p += (4 - (p % 4)) % 4;
			let default = i32::from_be_bytes(code[p..p + 4].try_into().unwrap());
			let npairs = i32::from_be_bytes(code[p + 4..p + 8].try_into().unwrap()) as usize;
			let default_label = get_label(labels, (offset as i32 + default) as u32);
			let mut keys = Vec::with_capacity(npairs);
			let mut switch_labels = Vec::with_capacity(npairs);
			let mut q = p + 8;
			for _ in 0..npairs {
				let key = i32::from_be_bytes(code[q..q + 4].try_into().unwrap());
				let jump = i32::from_be_bytes(code[q + 4..q + 8].try_into().unwrap());
				keys.push(key);
				switch_labels.push(get_label(labels, (offset as i32 + jump) as u32));
				q += 8;
			}
			out.push(DecodedInsn { offset, event: CodeEvent::LookupSwitchInsn { default: default_label, keys, labels: switch_labels } });
			offset = (q - pos) as u32 + offset;
			continue;
		}

		let opcode = Opcode::from_u8(opcode_byte).ok_or_else(|| Error::MalformedClass(format!("invalid opcode 0x{opcode_byte:02x}")))?;

		if opcode.is_jump() {
			let rel = i16::from_be_bytes(code[pos + 1..pos + 3].try_into().unwrap()) as i32;
			let target = get_label(labels, (offset as i32 + rel) as u32);
			out.push(DecodedInsn { offset, event: CodeEvent::JumpInsn { opcode, label: target } });
			offset += 3;
			continue;
		}
		if opcode_byte == 0xC8 || opcode_byte == 0xC9 {
			let real_opcode = if opcode_byte == 0xC8 { Opcode::GOTO } else { Opcode::JSR };
			let rel = i32::from_be_bytes(code[pos + 1..pos + 5].try_into().unwrap());
			let target = get_label(labels, (offset as i32 + rel) as u32);
			let event = if options.contains(ReaderOptions::EXPAND_ASM_INSNS) {
				CodeEvent::JumpInsn { opcode: real_opcode, label: target }
			} else {
				CodeEvent::JumpInsn { opcode: real_opcode, label: target }
			};
			out.push(DecodedInsn { offset, event });
			offset += 5;
			continue;
		}

		let (length, event) = decode_simple_instruction(reader, code, pos, opcode, opcode_byte)?;
		out.push(DecodedInsn { offset, event });
		offset += length as u32;
	}

	Ok(out)
}

fn decode_simple_instruction(reader: &ClassReader, code: &[u8], pos: usize, opcode: Opcode, opcode_byte: u8) -> Result<(usize, CodeEvent)> {
	Ok(match opcode_byte {
		0x10 => (2, CodeEvent::IntInsn { opcode, operand: code[pos + 1] as i8 as i32 }),
		0x11 => (3, CodeEvent::IntInsn { opcode, operand: i16::from_be_bytes(code[pos + 1..pos + 3].try_into().unwrap()) as i32 }),
		0xBC => (2, CodeEvent::IntInsn { opcode, operand: code[pos + 1] as i32 }),
		0x12 => {
			let index = code[pos + 1] as u16;
			(2, CodeEvent::LdcInsn(reader.const_value_pub(index)?))
		},
		0x13 | 0x14 => {
			let index = u16::from_be_bytes(code[pos + 1..pos + 3].try_into().unwrap());
			(3, CodeEvent::LdcInsn(reader.const_value_pub(index)?))
		},
		0x15..=0x19 | 0x36..=0x3A => (2, CodeEvent::VarInsn { opcode, var: code[pos + 1] as u16 }),
		0x84 => (3, CodeEvent::IincInsn { var: code[pos + 1] as u16, increment: code[pos + 2] as i8 as i32 }),
		0xB2 | 0xB3 | 0xB4 | 0xB5 => {
			let index = u16::from_be_bytes(code[pos + 1..pos + 3].try_into().unwrap());
			let (owner, name, descriptor) = reader.member_ref_pub(index)?;
			(3, CodeEvent::FieldInsn { opcode, owner: owner.to_string(), name: name.to_string(), descriptor: descriptor.to_string() })
		},
		0xB6 | 0xB7 | 0xB8 => {
			let index = u16::from_be_bytes(code[pos + 1..pos + 3].try_into().unwrap());
			let (owner, name, descriptor) = reader.member_ref_pub(index)?;
			(3, CodeEvent::MethodInsn { opcode, owner: owner.to_string(), name: name.to_string(), descriptor: descriptor.to_string(), is_interface: false })
		},
		0xB9 => {
			let index = u16::from_be_bytes(code[pos + 1..pos + 3].try_into().unwrap());
			let (owner, name, descriptor) = reader.member_ref_pub(index)?;
			(5, CodeEvent::MethodInsn { opcode, owner: owner.to_string(), name: name.to_string(), descriptor: descriptor.to_string(), is_interface: true })
		},
		0xBA => {
			let index = u16::from_be_bytes(code[pos + 1..pos + 3].try_into().unwrap());
			let dynamic = reader.constant_dynamic(index)?;
			(
				5,
				CodeEvent::InvokeDynamicInsn {
					name: dynamic.name,
					descriptor: dynamic.descriptor,
					bootstrap_method: dynamic.bootstrap_method,
					bootstrap_method_arguments: dynamic.bootstrap_method_arguments,
				},
			)
		},
		0xBB | 0xBD | 0xC0 | 0xC1 => {
			let index = u16::from_be_bytes(code[pos + 1..pos + 3].try_into().unwrap());
			(3, CodeEvent::TypeInsn { opcode, type_name: reader.class_internal_name_pub(index)?.to_string() })
		},
		0xC5 => {
			let index = u16::from_be_bytes(code[pos + 1..pos + 3].try_into().unwrap());
			let dims = code[pos + 3];
			(4, CodeEvent::MultiANewArrayInsn { descriptor: reader.class_internal_name_pub(index)?.to_string(), num_dimensions: dims })
		},
		_ => (1, CodeEvent::Insn(opcode)),
	})
}

/// Decodes a `StackMapTable` attribute into per-offset [`CodeEvent::Frame`]
/// events. All six compression forms collapse to
/// the same `(locals, stack)` pair; `frame_type` is kept only so a later
/// writer pass can choose to re-compress identically.
fn decode_stack_map_table(reader: &ClassReader, offset: usize, labels: &HashMap<u32, Label>, out: &mut HashMap<u32, CodeEvent>) -> Result<()> {
	let count = reader.u16_pub(offset)? as usize;
	let mut cursor = offset + 2;
	let mut current_offset: i32 = -1;
	let mut locals: Vec<VerificationType> = Vec::new();

	for _ in 0..count {
		let frame_type_byte = reader.u8_pub(cursor)?;
		cursor += 1;
		let (kind, offset_delta, new_locals, stack): (FrameType, u32, Option<Vec<VerificationType>>, Vec<VerificationType>) = if frame_type_byte <= 63 {
			(FrameType::Same, frame_type_byte as u32, None, Vec::new())
		} else if frame_type_byte <= 127 {
			let (vt, next) = decode_verification_type(reader, cursor, labels)?;
			cursor = next;
			(FrameType::Same1, (frame_type_byte - 64) as u32, None, vec![vt])
		} else if frame_type_byte == 247 {
			let delta = reader.u16_pub(cursor)? as u32;
			cursor += 2;
			let (vt, next) = decode_verification_type(reader, cursor, labels)?;
			cursor = next;
			(FrameType::Same1, delta, None, vec![vt])
		} else if (248..=250).contains(&frame_type_byte) {
			let delta = reader.u16_pub(cursor)? as u32;
			cursor += 2;
			let chop = (251 - frame_type_byte) as usize;
			let new_len = locals.len().saturating_sub(chop);
			(FrameType::Chop, delta, Some(locals[..new_len].to_vec()), Vec::new())
		} else if frame_type_byte == 251 {
			let delta = reader.u16_pub(cursor)? as u32;
			cursor += 2;
			(FrameType::Same, delta, None, Vec::new())
		} else if (252..=254).contains(&frame_type_byte) {
			let delta = reader.u16_pub(cursor)? as u32;
			cursor += 2;
			let append_count = (frame_type_byte - 251) as usize;
			let mut new_locals = locals.clone();
			for _ in 0..append_count {
				let (vt, next) = decode_verification_type(reader, cursor, labels)?;
				cursor = next;
				new_locals.push(vt);
			}
			(FrameType::Append, delta, Some(new_locals), Vec::new())
		} else {
			let delta = reader.u16_pub(cursor)? as u32;
			cursor += 2;
			let locals_count = reader.u16_pub(cursor)? as usize;
			cursor += 2;
			let mut new_locals = Vec::with_capacity(locals_count);
			for _ in 0..locals_count {
				let (vt, next) = decode_verification_type(reader, cursor, labels)?;
				cursor = next;
				new_locals.push(vt);
			}
			let stack_count = reader.u16_pub(cursor)? as usize;
			cursor += 2;
			let mut stack = Vec::with_capacity(stack_count);
			for _ in 0..stack_count {
				let (vt, next) = decode_verification_type(reader, cursor, labels)?;
				cursor = next;
				stack.push(vt);
			}
			(FrameType::Full, delta, Some(new_locals), stack)
		};

		let absolute_offset = if current_offset < 0 { offset_delta as i32 } else { current_offset + offset_delta as i32 + 1 };
		current_offset = absolute_offset;
		if let Some(new_locals) = new_locals {
			locals = new_locals;
		}
		out.insert(absolute_offset as u32, CodeEvent::Frame { frame_type: kind, locals: locals.clone(), stack });
	}
	Ok(())
}

fn decode_verification_type(reader: &ClassReader, offset: usize, labels: &HashMap<u32, Label>) -> Result<(VerificationType, usize)> {
	let tag = reader.u8_pub(offset)?;
	Ok(match tag {
		0 => (VerificationType::Top, offset + 1),
		1 => (VerificationType::Integer, offset + 1),
		2 => (VerificationType::Float, offset + 1),
		3 => (VerificationType::Double, offset + 1),
		4 => (VerificationType::Long, offset + 1),
		5 => (VerificationType::Null, offset + 1),
		6 => (VerificationType::UninitializedThis, offset + 1),
		7 => {
			let index = reader.u16_pub(offset + 1)?;
			(VerificationType::Object(reader.class_internal_name_pub(index)?.to_string()), offset + 3)
		},
		8 => {
			let new_offset = reader.u16_pub(offset + 1)? as u32;
			let label = labels.get(&new_offset).cloned().unwrap_or_else(Label::new);
			(VerificationType::Uninitialized(label), offset + 3)
		},
		other => return Err(Error::MalformedClass(format!("invalid verification_type_info tag {other}"))),
	})
}

#[allow(clippy::too_many_arguments)]
fn decode_code_type_annotations(
	reader: &ClassReader,
	body: usize,
	visible: bool,
	labels: &mut HashMap<u32, Label>,
	exception_entries: &[(u32, u32, u32, u16)],
	events: &mut Vec<CodeEvent>,
) -> Result<()> {
	let count = reader.u16_pub(body)?;
	let mut cursor = body + 2;
	for _ in 0..count {
		let target_type = reader.u8_pub(cursor)?;
		let next = match target_type {
			0x40 | 0x41 => {
				let table_count = reader.u16_pub(cursor + 1)? as usize;
				let mut p = cursor + 3;
				let mut start = Vec::with_capacity(table_count);
				let mut end = Vec::with_capacity(table_count);
				let mut index = Vec::with_capacity(table_count);
				for _ in 0..table_count {
					let start_pc = reader.u16_pub(p)? as u32;
					let length = reader.u16_pub(p + 2)? as u32;
					let var_index = reader.u16_pub(p + 4)?;
					start.push(labels.entry(start_pc).or_insert_with(Label::new).clone());
					end.push(labels.entry(start_pc + length).or_insert_with(Label::new).clone());
					index.push(var_index);
					p += 6;
				}
				let (path_string, after_path) = parse_type_path(reader, p)?;
				let (parsed, after_annotation) = reader.parse_annotation(after_path)?;
				events.push(CodeEvent::LocalVariableAnnotation {
					type_ref: (target_type as u32) << 24,
					type_path: path_string,
					start,
					end,
					index,
					annotation: parsed,
					visible,
				});
				after_annotation
			},
			0x42 => {
				let exception_table_index = reader.u16_pub(cursor + 1)?;
				let p = cursor + 3;
				let (path_string, after_path) = parse_type_path(reader, p)?;
				let (parsed, after_annotation) = reader.parse_annotation(after_path)?;
				let _ = exception_entries;
				events.push(CodeEvent::TryCatchAnnotation {
					type_ref: ((target_type as u32) << 24) | exception_table_index as u32,
					type_path: path_string,
					annotation: parsed,
					visible,
				});
				after_annotation
			},
			0x43..=0x4B => {
				let bytecode_offset = reader.u16_pub(cursor + 1)? as u32;
				let mut p = cursor + 3;
				let type_argument_index = if matches!(target_type, 0x47..=0x4B) {
					let idx = reader.u8_pub(p)?;
					p += 1;
					Some(idx)
				} else {
					None
				};
				let base = (target_type as u32) << 24;
				let packed = match type_argument_index {
					Some(idx) => base | ((bytecode_offset & 0xFFFF) << 8) | idx as u32,
					None => base | ((bytecode_offset & 0xFFFF) << 8),
				};
				let (path_string, after_path) = parse_type_path(reader, p)?;
				let (parsed, after_annotation) = reader.parse_annotation(after_path)?;
				labels.entry(bytecode_offset).or_insert_with(Label::new);
				events.push(CodeEvent::InsnAnnotation { type_ref: packed, type_path: path_string, annotation: parsed, visible });
				after_annotation
			},
			other => return Err(Error::MalformedClass(format!("target_type 0x{other:02x} is not valid in a Code attribute"))),
		};
		cursor = next;
	}
	Ok(())
}

fn parse_type_path(reader: &ClassReader, offset: usize) -> Result<(String, usize)> {
	let path_length = reader.u8_pub(offset)? as usize;
	let span = 1 + path_length * 2;
	let bytes = &reader.bytes()[offset..offset + span];
	let type_path = crate::type_annotation::TypePath::from_bytes(bytes)?;
	let mut out = String::with_capacity(type_path.steps.len() * 2);
	for step in &type_path.steps {
		match step {
			crate::type_annotation::TypePathStep::ArrayElement => out.push('['),
			crate::type_annotation::TypePathStep::InnerType => out.push('.'),
			crate::type_annotation::TypePathStep::WildcardBound => out.push('*'),
			crate::type_annotation::TypePathStep::TypeArgument(n) => {
				out.push_str(&n.to_string());
				out.push(';');
			},
		}
	}
	Ok((out, offset + span))
}

#[allow(dead_code)]
fn verification_type_for(ty: &Type) -> VerificationType {
	match ty {
		Type::Primitive { descriptor,.. } => match descriptor {
			'J' => VerificationType::Long,
			'D' => VerificationType::Double,
			'F' => VerificationType::Float,
			_ => VerificationType::Integer,
		},
		Type::Array {.. } => VerificationType::Object(ty.descriptor()),
		Type::Object { internal_name } => VerificationType::Object(internal_name.clone()),
		Type::Method {.. } => VerificationType::Top,
	}
}
