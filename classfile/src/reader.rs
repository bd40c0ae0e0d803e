//! The class-file reader.
//!
//! A single forward walk over a byte slice that reads a magic number, a
//! version pair, and then a table of variable-width records. The constant
//! pool is the one table resolved lazily: the initial walk only records
//! each entry's *offset* (`cp_info_offsets`), and entries are decoded into
//! owned strings on demand as the class-level and method-body passes
//! request them.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::access::AccessFlags;
use crate::attribute::{Attribute, AttributeRegistry};
use crate::bytevector::decode_modified_utf8;
use crate::error::{Error, Result};
use crate::handle::{ConstantDynamic, Handle};
use crate::label::Label;
use crate::reader_code::{parse_code_attribute, CodeAttributeEvents};
use crate::symbol::Tag;
use crate::value::ConstantValue;
use crate::version::{ClassVersion, MAGIC, MAX_SUPPORTED_MAJOR, MIN_SUPPORTED_MAJOR};
use crate::visitor::ClassVisitor;

bitflags! {
	/// Flags OR'd into [`ClassReader::accept`]'s `options` parameter
	///.
	#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
	pub struct ReaderOptions: u32 {
		/// Do not parse method bodies.
		const SKIP_CODE = 0x01;
		/// Skip `LineNumberTable`, `LocalVariableTable`,
		/// `LocalVariableTypeTable`, `MethodParameters`, `SourceFile`,
		/// `SourceDebugExtension`.
		const SKIP_DEBUG = 0x02;
		/// Skip `StackMapTable`.
		const SKIP_FRAMES = 0x04;
		/// Always present frames in uncompressed (full locals+stack) form.
		const EXPAND_FRAMES = 0x08;
		/// Internal: convert synthetic long-branch pseudo-opcodes back to
		/// standard JVM opcodes when emitting events.
		const EXPAND_ASM_INSNS = 0x10;
	}
}

/// One entry of the initial constant-pool walk: just enough to validate
/// structure and to let later lazy reads jump straight to payload bytes
///.
#[derive(Debug, Copy, Clone)]
struct CpEntry {
	tag: u8,
	/// Offset of the payload, i.e. one past the tag byte.
	offset: u32,
}

/// A single-pass reader over a `ClassFile` byte array.
pub struct ClassReader<'a> {
	bytes: &'a [u8],
	cp_entries: Vec<CpEntry>,
	/// Byte offset where the header (`access_flags`) begins, right after
	/// the constant pool.
	header_offset: usize,
	max_string_length: usize,
	/// Populated only if a `CONSTANT_Dynamic`/`CONSTANT_InvokeDynamic`
	/// entry is present and a `BootstrapMethods` attribute was located
	/// during initialisation.
	bootstrap_method_offsets: Vec<u32>,
	utf8_cache: RefCell<Vec<Option<Rc<str>>>>,
}

impl<'a> ClassReader<'a> {
	/// Parses the magic number, version, and constant-pool offset table
	///. Does not yet visit any class-level
	/// element; call [`ClassReader::accept`] for that.
	pub fn new(bytes: &'a [u8]) -> Result<Self> {
		if bytes.len() < 10 {
			return Err(Error::MalformedClass("truncated class file header".into()));
		}
		if u32::from_be_bytes(bytes[0..4].try_into().unwrap()) != MAGIC {
			return Err(Error::MalformedClass("bad magic number".into()));
		}

		let cp_count = u16::from_be_bytes(bytes[8..10].try_into().unwrap()) as u32;
		let mut cp_entries = Vec::with_capacity(cp_count as usize);
		// Index 0 is unused in the JVM constant pool.
		cp_entries.push(CpEntry { tag: 0, offset: 0 });

		let mut offset = 10usize;
		let mut max_string_length = 0usize;
		let mut has_dynamic = false;

		let mut index = 1u32;
		while index < cp_count {
			let tag = *bytes.get(offset).ok_or_else(|| Error::MalformedClass("constant pool ran past end of file".into()))?;
			let payload_offset = offset + 1;
			cp_entries.push(CpEntry { tag, offset: payload_offset as u32 });

			let (width, slots) = cp_entry_size(bytes, tag, payload_offset, &mut max_string_length)?;
			if tag == Tag::Dynamic.cp_tag_byte().unwrap() || tag == Tag::InvokeDynamic.cp_tag_byte().unwrap() {
				has_dynamic = true;
			}
			offset = payload_offset + width;

			// Long/Double occupy two constant-pool slots; push a dummy
			// placeholder for the unusable second slot.
			for _ in 1..slots {
				cp_entries.push(CpEntry { tag: 0, offset: 0 });
			}
			index += slots;
		}

		let header_offset = offset;
		if bytes.len() < header_offset + 8 {
			return Err(Error::MalformedClass("truncated class file header".into()));
		}

		let mut reader = Self {
			bytes,
			cp_entries,
			header_offset,
			max_string_length,
			bootstrap_method_offsets: Vec::new(),
			utf8_cache: RefCell::new(Vec::new()),
		};
		reader.utf8_cache.borrow_mut().resize(reader.cp_entries.len(), None);

		if has_dynamic {
			reader.bootstrap_method_offsets = reader.locate_bootstrap_methods()?;
		}

		Ok(reader)
	}

	pub fn major_version(&self) -> u16 {
		u16::from_be_bytes(self.bytes[6..8].try_into().unwrap())
	}

	pub fn minor_version(&self) -> u16 {
		u16::from_be_bytes(self.bytes[4..6].try_into().unwrap())
	}

	pub fn class_version(&self) -> ClassVersion {
		ClassVersion::new(self.major_version(), self.minor_version())
	}

	/// Underlying bytes, exposed so the writer's copy-through optimisation
	/// can slice out untransformed method bodies directly.
	pub fn bytes(&self) -> &'a [u8] {
		self.bytes
	}

	fn u8_at(&self, offset: usize) -> Result<u8> {
		self.bytes.get(offset).copied().ok_or_else(|| Error::MalformedClass("read past end of class file".into()))
	}

	fn u16_at(&self, offset: usize) -> Result<u16> {
		let slice = self.bytes.get(offset..offset + 2).ok_or_else(|| Error::MalformedClass("read past end of class file".into()))?;
		Ok(u16::from_be_bytes(slice.try_into().unwrap()))
	}

	fn u32_at(&self, offset: usize) -> Result<u32> {
		let slice = self.bytes.get(offset..offset + 4).ok_or_else(|| Error::MalformedClass("read past end of class file".into()))?;
		Ok(u32::from_be_bytes(slice.try_into().unwrap()))
	}

	// -- lazy constant-pool resolution ------------------------

	fn cp_tag(&self, index: u16) -> Result<u8> {
		self.cp_entries.get(index as usize).map(|e| e.tag).ok_or_else(|| Error::MalformedClass(format!("constant pool index {index} out of range")))
	}

	fn cp_offset(&self, index: u16) -> Result<u32> {
		self.cp_entries.get(index as usize).map(|e| e.offset).ok_or_else(|| Error::MalformedClass(format!("constant pool index {index} out of range")))
	}

	pub fn utf8(&self, index: u16) -> Result<Rc<str>> {
		if let Some(cached) = self.utf8_cache.borrow().get(index as usize).and_then(|c| c.clone()) {
			return Ok(cached);
		}
		let offset = self.cp_offset(index)? as usize;
		let length = self.u16_at(offset)? as usize;
		let bytes = self.bytes.get(offset + 2..offset + 2 + length).ok_or_else(|| Error::MalformedClass("truncated Utf8 entry".into()))?;
		let decoded: Rc<str> = Rc::from(decode_modified_utf8(bytes)?);
		self.utf8_cache.borrow_mut()[index as usize] = Some(decoded.clone());
		Ok(decoded)
	}

	fn class_internal_name(&self, index: u16) -> Result<Rc<str>> {
		let offset = self.cp_offset(index)? as usize;
		let name_index = self.u16_at(offset)?;
		self.utf8(name_index)
	}

	fn name_and_type(&self, index: u16) -> Result<(Rc<str>, Rc<str>)> {
		let offset = self.cp_offset(index)? as usize;
		let name_index = self.u16_at(offset)?;
		let descriptor_index = self.u16_at(offset + 2)?;
		Ok((self.utf8(name_index)?, self.utf8(descriptor_index)?))
	}

	fn member_ref(&self, index: u16) -> Result<(Rc<str>, Rc<str>, Rc<str>)> {
		let offset = self.cp_offset(index)? as usize;
		let class_index = self.u16_at(offset)?;
		let nat_index = self.u16_at(offset + 2)?;
		let owner = self.class_internal_name(class_index)?;
		let (name, descriptor) = self.name_and_type(nat_index)?;
		Ok((owner, name, descriptor))
	}

	pub fn handle(&self, index: u16) -> Result<Handle> {
		let offset = self.cp_offset(index)? as usize;
		let reference_kind = self.u8_at(offset)?;
		let reference_index = self.u16_at(offset + 1)?;
		let is_field = (1..=4).contains(&reference_kind);
		let ref_tag = self.cp_tag(reference_index)?;
		let is_interface = ref_tag == Tag::InterfaceMethodref.cp_tag_byte().unwrap();
		let (owner, name, descriptor) = if is_field { self.member_ref(reference_index)? } else { self.member_ref(reference_index)? };
		Ok(Handle::new(reference_kind, owner.to_string(), name.to_string(), descriptor.to_string(), is_interface))
	}

	fn bootstrap_method_argument_count_and_offset(&self, bsm_index: u16) -> Result<(u16, u16, usize)> {
		let bsm_table_offset = *self.bootstrap_method_offsets.get(bsm_index as usize).ok_or_else(|| Error::MalformedClass("bootstrap method index out of range".into()))? as usize;
		let handle_index = self.u16_at(bsm_table_offset)?;
		let arg_count = self.u16_at(bsm_table_offset + 2)?;
		Ok((handle_index, arg_count, bsm_table_offset + 4))
	}

	pub fn constant_dynamic(&self, index: u16) -> Result<ConstantDynamic> {
		let offset = self.cp_offset(index)? as usize;
		let bsm_index = self.u16_at(offset)?;
		let nat_index = self.u16_at(offset + 2)?;
		let (name, descriptor) = self.name_and_type(nat_index)?;
		let (handle_index, arg_count, mut arg_offset) = self.bootstrap_method_argument_count_and_offset(bsm_index)?;
		let bootstrap_method = self.handle(handle_index)?;
		let mut args = Vec::with_capacity(arg_count as usize);
		for _ in 0..arg_count {
			let arg_index = self.u16_at(arg_offset)?;
			args.push(self.constant_value(arg_index)?);
			arg_offset += 2;
		}
		Ok(ConstantDynamic::new(name.to_string(), descriptor.to_string(), bootstrap_method, args))
	}

	/// Resolves any `ldc`-eligible constant-pool entry.
	pub fn constant_value(&self, index: u16) -> Result<ConstantValue> {
		let tag = self.cp_tag(index)?;
		let offset = self.cp_offset(index)? as usize;
		if tag == Tag::Integer.cp_tag_byte().unwrap() {
			Ok(ConstantValue::Int(self.u32_at(offset)? as i32))
		} else if tag == Tag::Float.cp_tag_byte().unwrap() {
			Ok(ConstantValue::Float(f32::from_bits(self.u32_at(offset)?)))
		} else if tag == Tag::Long.cp_tag_byte().unwrap() {
			let hi = self.u32_at(offset)? as u64;
			let lo = self.u32_at(offset + 4)? as u64;
			Ok(ConstantValue::Long(((hi << 32) | lo) as i64))
		} else if tag == Tag::Double.cp_tag_byte().unwrap() {
			let hi = self.u32_at(offset)? as u64;
			let lo = self.u32_at(offset + 4)? as u64;
			Ok(ConstantValue::Double(f64::from_bits((hi << 32) | lo)))
		} else if tag == Tag::String.cp_tag_byte().unwrap() {
			let utf8_index = self.u16_at(offset)?;
			Ok(ConstantValue::String(self.utf8(utf8_index)?.to_string()))
		} else if tag == Tag::Class.cp_tag_byte().unwrap() {
			Ok(ConstantValue::Type(crate::descriptor::Type::get_object(self.class_internal_name(self.u16_at(offset - 1 + 1)? as u16)?.to_string())))
		} else if tag == Tag::MethodType.cp_tag_byte().unwrap() {
			let utf8_index = self.u16_at(offset)?;
			Ok(ConstantValue::Type(crate::descriptor::Type::get_method_type(&self.utf8(utf8_index)?)?))
		} else if tag == Tag::MethodHandle.cp_tag_byte().unwrap() {
			Ok(ConstantValue::Handle(self.handle(index)?))
		} else if tag == Tag::Dynamic.cp_tag_byte().unwrap() {
			Ok(ConstantValue::ConstantDynamic(self.constant_dynamic(index)?))
		} else {
			Err(Error::MalformedClass(format!("constant pool index {index} (tag {tag}) is not a valid ldc operand")))
		}
	}

	/// Three-byte scan for the `BootstrapMethods` attribute among the
	/// class's top-level attributes, done once during initialisation only
	/// if a `Dynamic`/`InvokeDynamic` entry was observed.
	fn locate_bootstrap_methods(&self) -> Result<Vec<u32>> {
		// access_flags(2) this_class(2) super_class(2) interfaces_count(2)
		let mut offset = self.header_offset + 2 + 2 + 2;
		let interfaces_count = self.u16_at(offset)? as usize;
		offset += 2 + interfaces_count * 2;

		let fields_count = self.u16_at(offset)? as usize;
		offset += 2;
		for _ in 0..fields_count {
			offset = self.skip_member(offset)?;
		}

		let methods_count = self.u16_at(offset)? as usize;
		offset += 2;
		for _ in 0..methods_count {
			offset = self.skip_member(offset)?;
		}

		let attributes_count = self.u16_at(offset)?;
		offset += 2;
		for _ in 0..attributes_count {
			let name_index = self.u16_at(offset)?;
			let length = self.u32_at(offset + 2)? as usize;
			let body_offset = offset + 6;
			if &*self.utf8(name_index)? == "BootstrapMethods" {
				return self.bootstrap_method_table_offsets(body_offset);
			}
			offset = body_offset + length;
		}
		Ok(Vec::new())
	}

	fn bootstrap_method_table_offsets(&self, body_offset: usize) -> Result<Vec<u32>> {
		let count = self.u16_at(body_offset)? as usize;
		let mut offsets = Vec::with_capacity(count);
		let mut cursor = body_offset + 2;
		for _ in 0..count {
			offsets.push(cursor as u32);
			let arg_count = self.u16_at(cursor + 2)? as usize;
			cursor += 4 + arg_count * 2;
		}
		Ok(offsets)
	}

	fn skip_member(&self, offset: usize) -> Result<usize> {
		// access_flags(2) name_index(2) descriptor_index(2) attributes_count(2)
		let attributes_count = self.u16_at(offset + 6)?;
		let mut cursor = offset + 8;
		for _ in 0..attributes_count {
			let length = self.u32_at(cursor + 2)? as usize;
			cursor += 6 + length;
		}
		Ok(cursor)
	}

	// -- class-level parse ----------------

	/// Parses the whole class file and drives `visitor` through every
	/// declarative element, in JVMS §4.7 order.
	pub fn accept(&self, visitor: &mut dyn ClassVisitor, options: ReaderOptions) -> Result<()> {
		self.accept_with_registry(visitor, options, &AttributeRegistry::new())
	}

	pub fn accept_with_registry(&self, visitor: &mut dyn ClassVisitor, options: ReaderOptions, registry: &AttributeRegistry) -> Result<()> {
		let version = self.class_version();
		if !version.is_supported() {
			return Err(Error::UnsupportedVersion { major: version.major(), max_supported: MAX_SUPPORTED_MAJOR });
		}
		if version.major() < MIN_SUPPORTED_MAJOR {
			return Err(Error::UnsupportedVersion { major: version.major(), max_supported: MAX_SUPPORTED_MAJOR });
		}

		let mut offset = self.header_offset;
		let access_flags = AccessFlags::from_jvms_bits(self.u16_at(offset)?);
		offset += 2;
		let this_class_index = self.u16_at(offset)?;
		offset += 2;
		let super_class_index = self.u16_at(offset)?;
		offset += 2;
		let this_class = self.class_internal_name(this_class_index)?;
		let super_class = if super_class_index == 0 { None } else { Some(self.class_internal_name(super_class_index)?) };

		let interfaces_count = self.u16_at(offset)? as usize;
		offset += 2;
		let mut interfaces = Vec::with_capacity(interfaces_count);
		for _ in 0..interfaces_count {
			let iface_index = self.u16_at(offset)?;
			offset += 2;
			interfaces.push(self.class_internal_name(iface_index)?.to_string());
		}

		let mut signature: Option<Rc<str>> = None;
		let mut source_file: Option<Rc<str>> = None;
		let mut source_debug: Option<String> = None;
		let mut module_attr_offset: Option<usize> = None;
		let mut module_packages: Vec<u16> = Vec::new();
		let mut module_main_class: Option<u16> = None;
		let mut outer_class: Option<usize> = None;
		let mut nest_host: Option<Rc<str>> = None;
		let mut nest_members: Vec<u16> = Vec::new();
		let mut permitted_subclasses: Vec<u16> = Vec::new();
		let mut inner_classes: Vec<(u16, u16, u16, u16)> = Vec::new();
		let mut record_components: Vec<(u16, u16, usize)> = Vec::new();
		let mut class_annotations: Vec<(u16, usize, bool)> = Vec::new();
		let mut class_type_annotations: Vec<(usize, bool)> = Vec::new();
		let mut unknown_attributes: Vec<(u16, usize, usize)> = Vec::new();

		let fields_count = self.u16_at(offset)? as usize;
		offset += 2;
		let fields_start = offset;
		for _ in 0..fields_count {
			offset = self.skip_member(offset)?;
		}
		let methods_count_offset = offset;
		let methods_count = self.u16_at(offset)? as usize;
		offset += 2;
		let methods_start = offset;
		for _ in 0..methods_count {
			offset = self.skip_member(offset)?;
		}
		let _ = methods_count_offset;

		let class_attributes_count = self.u16_at(offset)?;
		offset += 2;
		for _ in 0..class_attributes_count {
			let name_index = self.u16_at(offset)?;
			let length = self.u32_at(offset + 2)? as usize;
			let body = offset + 6;
			let name = self.utf8(name_index)?;
			match &*name {
				"Signature" => signature = Some(self.utf8(self.u16_at(body)?)?),
				"SourceFile" => source_file = Some(self.utf8(self.u16_at(body)?)?),
				"SourceDebugExtension" if !options.contains(ReaderOptions::SKIP_DEBUG) => {
					source_debug = Some(String::from_utf8_lossy(&self.bytes[body..body + length]).to_string());
				},
				"Module" => module_attr_offset = Some(body),
				"ModulePackages" => {
					let count = self.u16_at(body)? as usize;
					let mut cursor = body + 2;
					for _ in 0..count {
						module_packages.push(self.u16_at(cursor)?);
						cursor += 2;
					}
				},
				"ModuleMainClass" => module_main_class = Some(self.u16_at(body)?),
				"EnclosingMethod" => outer_class = Some(body),
				"NestHost" => nest_host = Some(self.class_internal_name(self.u16_at(body)?)?),
				"NestMembers" => {
					let count = self.u16_at(body)? as usize;
					let mut cursor = body + 2;
					for _ in 0..count {
						nest_members.push(self.u16_at(cursor)?);
						cursor += 2;
					}
				},
				"PermittedSubclasses" => {
					let count = self.u16_at(body)? as usize;
					let mut cursor = body + 2;
					for _ in 0..count {
						permitted_subclasses.push(self.u16_at(cursor)?);
						cursor += 2;
					}
				},
				"InnerClasses" => {
					let count = self.u16_at(body)? as usize;
					let mut cursor = body + 2;
					for _ in 0..count {
						let inner = self.u16_at(cursor)?;
						let outer = self.u16_at(cursor + 2)?;
						let inner_name = self.u16_at(cursor + 4)?;
						let flags = self.u16_at(cursor + 6)?;
						inner_classes.push((inner, outer, inner_name, flags));
						cursor += 8;
					}
				},
				"Record" => {
					let count = self.u16_at(body)? as usize;
					let mut cursor = body + 2;
					for _ in 0..count {
						let name_idx = self.u16_at(cursor)?;
						let desc_idx = self.u16_at(cursor + 2)?;
						let attr_count = self.u16_at(cursor + 4)? as usize;
						let attrs_offset = cursor + 6;
						record_components.push((name_idx, desc_idx, attrs_offset));
						let mut attr_cursor = attrs_offset;
						for _ in 0..attr_count {
							let len = self.u32_at(attr_cursor + 2)? as usize;
							attr_cursor += 6 + len;
						}
						cursor = attr_cursor;
					}
				},
				"RuntimeVisibleAnnotations" => class_annotations.push((0, body, true)),
				"RuntimeInvisibleAnnotations" => class_annotations.push((0, body, false)),
				"RuntimeVisibleTypeAnnotations" => class_type_annotations.push((body, true)),
				"RuntimeInvisibleTypeAnnotations" => class_type_annotations.push((body, false)),
				"Deprecated" | "Synthetic" | "BootstrapMethods" => {},
				_ => unknown_attributes.push((name_index, body, length)),
			}
			offset = body + length;
		}

		visitor.visit(version, access_flags, &this_class, signature.as_deref(), super_class.as_deref(), &interfaces);
		visitor.visit_source(source_file.as_deref(), source_debug.as_deref());

		if let Some(body) = module_attr_offset {
			self.visit_module(visitor, body, &module_packages, module_main_class)?;
		}
		if let Some(nest_host) = &nest_host {
			visitor.visit_nest_host(nest_host);
		}
		self.visit_outer_class(visitor, outer_class)?;

		for (_, body, visible) in &class_annotations {
			let count = self.u16_at(*body)?;
			let mut cursor = *body + 2;
			for _ in 0..count {
				let (parsed, next) = self.parse_annotation(cursor)?;
				if let Some(mut child) = visitor.visit_annotation(&parsed.descriptor, *visible) {
					crate::annotation::replay_annotation(&mut *child, &parsed);
				}
				cursor = next;
			}
		}
		for (body, visible) in &class_type_annotations {
			let count = self.u16_at(*body)?;
			let mut cursor = *body + 2;
			for _ in 0..count {
				let (type_ref, type_path, after_path) = self.parse_class_type_annotation(cursor)?;
				let (parsed, next) = self.parse_annotation(after_path)?;
				let path_string = type_path_to_string(&type_path);
				if let Some(mut child) = visitor.visit_type_annotation(type_ref, &path_string, &parsed.descriptor, *visible) {
					crate::annotation::replay_annotation(&mut *child, &parsed);
				}
				cursor = next;
			}
		}
		for (name_index, body, length) in &unknown_attributes {
			visitor.visit_attribute(Attribute::new(self.utf8(*name_index)?.to_string(), self.bytes[*body..*body + *length].to_vec()));
		}

		for member in &nest_members {
			visitor.visit_nest_member(&self.utf8(*member)?);
		}
		for permitted in &permitted_subclasses {
			visitor.visit_permitted_subclass(&self.utf8(*permitted)?);
		}
		for (inner, outer, inner_name, flags) in &inner_classes {
			let inner_str = self.class_internal_name(*inner)?;
			let outer_str = if *outer == 0 { None } else { Some(self.class_internal_name(*outer)?) };
			let name_str = if *inner_name == 0 { None } else { Some(self.utf8(*inner_name)?) };
			visitor.visit_inner_class(&inner_str, outer_str.as_deref(), name_str.as_deref(), AccessFlags::from_jvms_bits(*flags));
		}

		for (name_idx, desc_idx, attrs_offset) in &record_components {
			self.visit_record_component(visitor, *name_idx, *desc_idx, *attrs_offset, options, registry)?;
		}

		let mut field_offset = fields_start;
		for _ in 0..fields_count {
			field_offset = self.visit_field(visitor, field_offset, options)?;
		}

		let mut method_offset = methods_start;
		for _ in 0..methods_count {
			method_offset = self.visit_method(visitor, method_offset, options, registry)?;
		}

		visitor.visit_end();
		Ok(())
	}

	fn visit_module(&self, visitor: &mut dyn ClassVisitor, body: usize, packages: &[u16], main_class: Option<u16>) -> Result<()> {
		let name_index = self.u16_at(body)?;
		let flags = self.u16_at(body + 2)?;
		let version_index = self.u16_at(body + 4)?;
		let module_name = self.class_internal_name(name_index).or_else(|_| self.utf8(name_index))?;
		let version = if version_index == 0 { None } else { Some(self.utf8(version_index)?) };
		let Some(mut module_visitor) = visitor.visit_module(&module_name, AccessFlags::from_jvms_bits(flags), version.as_deref()) else {
			return Ok(());
		};

		let mut cursor = body + 6;
		let requires_count = self.u16_at(cursor)? as usize;
		cursor += 2;
		for _ in 0..requires_count {
			let req_index = self.u16_at(cursor)?;
			let req_flags = self.u16_at(cursor + 2)?;
			let req_version_index = self.u16_at(cursor + 4)?;
			let req_name = self.class_internal_name(req_index).or_else(|_| self.utf8(req_index))?;
			let req_version = if req_version_index == 0 { None } else { Some(self.utf8(req_version_index)?) };
			module_visitor.visit_require(&req_name, AccessFlags::from_jvms_bits(req_flags), req_version.as_deref());
			cursor += 6;
		}

		let exports_count = self.u16_at(cursor)? as usize;
		cursor += 2;
		for _ in 0..exports_count {
			let pkg_index = self.u16_at(cursor)?;
			let exp_flags = self.u16_at(cursor + 2)?;
			let to_count = self.u16_at(cursor + 4)? as usize;
			cursor += 6;
			let mut to = Vec::with_capacity(to_count);
			for _ in 0..to_count {
				let m_index = self.u16_at(cursor)?;
				to.push(self.class_internal_name(m_index).or_else(|_| self.utf8(m_index))?.to_string());
				cursor += 2;
			}
			let pkg = self.class_internal_name(pkg_index).or_else(|_| self.utf8(pkg_index))?;
			module_visitor.visit_export(&pkg, AccessFlags::from_jvms_bits(exp_flags), &to);
		}

		let opens_count = self.u16_at(cursor)? as usize;
		cursor += 2;
		for _ in 0..opens_count {
			let pkg_index = self.u16_at(cursor)?;
			let open_flags = self.u16_at(cursor + 2)?;
			let to_count = self.u16_at(cursor + 4)? as usize;
			cursor += 6;
			let mut to = Vec::with_capacity(to_count);
			for _ in 0..to_count {
				let m_index = self.u16_at(cursor)?;
				to.push(self.class_internal_name(m_index).or_else(|_| self.utf8(m_index))?.to_string());
				cursor += 2;
			}
			let pkg = self.class_internal_name(pkg_index).or_else(|_| self.utf8(pkg_index))?;
			module_visitor.visit_open(&pkg, AccessFlags::from_jvms_bits(open_flags), &to);
		}

		let uses_count = self.u16_at(cursor)? as usize;
		cursor += 2;
		for _ in 0..uses_count {
			let use_index = self.u16_at(cursor)?;
			module_visitor.visit_use(&self.class_internal_name(use_index)?);
			cursor += 2;
		}

		let provides_count = self.u16_at(cursor)? as usize;
		cursor += 2;
		for _ in 0..provides_count {
			let service_index = self.u16_at(cursor)?;
			let with_count = self.u16_at(cursor + 2)? as usize;
			cursor += 4;
			let mut providers = Vec::with_capacity(with_count);
			for _ in 0..with_count {
				let provider_index = self.u16_at(cursor)?;
				providers.push(self.class_internal_name(provider_index)?.to_string());
				cursor += 2;
			}
			module_visitor.visit_provide(&self.class_internal_name(service_index)?, &providers);
		}

		for package_index in packages {
			module_visitor.visit_package(&self.class_internal_name(*package_index).or_else(|_| self.utf8(*package_index))?);
		}
		if let Some(main_class_index) = main_class {
			module_visitor.visit_main_class(&self.class_internal_name(main_class_index)?);
		}
		module_visitor.visit_end();
		Ok(())
	}

	fn visit_outer_class(&self, visitor: &mut dyn ClassVisitor, outer_class: Option<usize>) -> Result<()> {
		let Some(body) = outer_class else { return Ok(()) };
		let owner_index = self.u16_at(body)?;
		let nat_index = self.u16_at(body + 2)?;
		let owner = self.class_internal_name(owner_index)?;
		if nat_index == 0 {
			visitor.visit_outer_class(&owner, None, None);
		} else {
			let (name, descriptor) = self.name_and_type(nat_index)?;
			visitor.visit_outer_class(&owner, Some(&name), Some(&descriptor));
		}
		Ok(())
	}

	/// Parses one `type_annotation`'s `target_type` + `target_info` +
	/// `type_path` prefix for the class/field/method-level target kinds
	/// (JVMS §4.7.20). Code-level kinds (offsets, local variable ranges)
	/// are handled separately in `reader_code.rs`, which has the label
	/// table needed to represent them.
	fn parse_class_type_annotation(&self, offset: usize) -> Result<(u32, crate::type_annotation::TypePath, usize)> {
		let target_type = self.u8_at(offset)?;
		let mut cursor = offset + 1;
		let type_ref: u32 = match target_type {
			0x00 | 0x01 | 0x16 => {
				let index = self.u8_at(cursor)?;
				cursor += 1;
				((target_type as u32) << 24) | ((index as u32) << 16)
			},
			0x10 => {
				let supertype_index = self.u16_at(cursor)?;
				cursor += 2;
				((target_type as u32) << 24) | supertype_index as u32
			},
			0x11 | 0x12 => {
				let type_parameter_index = self.u8_at(cursor)?;
				let bound_index = self.u8_at(cursor + 1)?;
				cursor += 2;
				((target_type as u32) << 24) | ((type_parameter_index as u32) << 16) | ((bound_index as u32) << 8)
			},
			0x13 | 0x14 | 0x15 => (target_type as u32) << 24,
			0x17 => {
				let throws_index = self.u16_at(cursor)?;
				cursor += 2;
				((target_type as u32) << 24) | throws_index as u32
			},
			other => return Err(Error::MalformedClass(format!("target_type 0x{other:02x} is not valid at class/field/method level"))),
		};
		let path_length = self.u8_at(cursor)? as usize;
		let path_span = 1 + path_length * 2;
		let type_path = crate::type_annotation::TypePath::from_bytes(&self.bytes[cursor..cursor + path_span])?;
		cursor += path_span;
		Ok((type_ref, type_path, cursor))
	}

	fn visit_record_component(
		&self,
		visitor: &mut dyn ClassVisitor,
		name_idx: u16,
		desc_idx: u16,
		attrs_offset: usize,
		options: ReaderOptions,
		_registry: &AttributeRegistry,
	) -> Result<()> {
		let name = self.utf8(name_idx)?;
		let descriptor = self.utf8(desc_idx)?;
		let attr_count = self.u16_at(attrs_offset)?;
		let mut cursor = attrs_offset + 2;
		let mut signature = None;
		let mut unknown = Vec::new();
		let mut annotations: Vec<(usize, bool)> = Vec::new();
		let mut type_annotations: Vec<(usize, bool)> = Vec::new();
		for _ in 0..attr_count {
			let name_index = self.u16_at(cursor)?;
			let length = self.u32_at(cursor + 2)? as usize;
			let body = cursor + 6;
			match &*self.utf8(name_index)? {
				"Signature" => signature = Some(self.utf8(self.u16_at(body)?)?),
				"Synthetic" | "Deprecated" => {},
				"RuntimeVisibleAnnotations" => annotations.push((body, true)),
				"RuntimeInvisibleAnnotations" => annotations.push((body, false)),
				"RuntimeVisibleTypeAnnotations" => type_annotations.push((body, true)),
				"RuntimeInvisibleTypeAnnotations" => type_annotations.push((body, false)),
				_ if options.contains(ReaderOptions::SKIP_DEBUG) => {},
				_ => unknown.push((name_index, body, length)),
			}
			cursor = body + length;
		}
		if let Some(mut rc_visitor) = visitor.visit_record_component(&name, &descriptor, signature.as_deref()) {
			for (body, visible) in annotations {
				let count = self.u16_at(body)?;
				let mut cursor = body + 2;
				for _ in 0..count {
					let (parsed, next) = self.parse_annotation(cursor)?;
					if let Some(mut child) = rc_visitor.visit_annotation(&parsed.descriptor, visible) {
						crate::annotation::replay_annotation(&mut *child, &parsed);
					}
					cursor = next;
				}
			}
			for (body, visible) in type_annotations {
				let count = self.u16_at(body)?;
				let mut cursor = body + 2;
				for _ in 0..count {
					let (type_ref, type_path, after_path) = self.parse_class_type_annotation(cursor)?;
					let (parsed, next) = self.parse_annotation(after_path)?;
					let path_string = type_path_to_string(&type_path);
					if let Some(mut child) = rc_visitor.visit_type_annotation(type_ref, &path_string, &parsed.descriptor, visible) {
						crate::annotation::replay_annotation(&mut *child, &parsed);
					}
					cursor = next;
				}
			}
			for (name_index, body, length) in unknown {
				rc_visitor.visit_attribute(Attribute::new(self.utf8(name_index)?.to_string(), self.bytes[body..body + length].to_vec()));
			}
			rc_visitor.visit_end();
		}
		Ok(())
	}

	fn visit_field(&self, visitor: &mut dyn ClassVisitor, offset: usize, options: ReaderOptions) -> Result<usize> {
		let access = AccessFlags::from_jvms_bits(self.u16_at(offset)?);
		let name = self.utf8(self.u16_at(offset + 2)?)?;
		let descriptor = self.utf8(self.u16_at(offset + 4)?)?;
		let attr_count = self.u16_at(offset + 6)?;
		let mut cursor = offset + 8;
		let mut signature = None;
		let mut constant_value = None;
		let mut unknown = Vec::new();
		let mut annotations: Vec<(usize, bool)> = Vec::new();
		let mut type_annotations: Vec<(usize, bool)> = Vec::new();
		for _ in 0..attr_count {
			let name_index = self.u16_at(cursor)?;
			let length = self.u32_at(cursor + 2)? as usize;
			let body = cursor + 6;
			match &*self.utf8(name_index)? {
				"ConstantValue" => constant_value = Some(self.constant_value(self.u16_at(body)?)?),
				"Signature" => signature = Some(self.utf8(self.u16_at(body)?)?),
				"Synthetic" | "Deprecated" => {},
				"RuntimeVisibleAnnotations" => annotations.push((body, true)),
				"RuntimeInvisibleAnnotations" => annotations.push((body, false)),
				"RuntimeVisibleTypeAnnotations" => type_annotations.push((body, true)),
				"RuntimeInvisibleTypeAnnotations" => type_annotations.push((body, false)),
				_ if options.contains(ReaderOptions::SKIP_DEBUG) => {},
				_ => unknown.push((name_index, body, length)),
			}
			cursor = body + length;
		}
		if let Some(mut field_visitor) = visitor.visit_field(access, &name, &descriptor, signature.as_deref(), constant_value) {
			for (body, visible) in annotations {
				let count = self.u16_at(body)?;
				let mut cursor = body + 2;
				for _ in 0..count {
					let (parsed, next) = self.parse_annotation(cursor)?;
					if let Some(mut child) = field_visitor.visit_annotation(&parsed.descriptor, visible) {
						crate::annotation::replay_annotation(&mut *child, &parsed);
					}
					cursor = next;
				}
			}
			for (body, visible) in type_annotations {
				let count = self.u16_at(body)?;
				let mut cursor = body + 2;
				for _ in 0..count {
					let (type_ref, type_path, after_path) = self.parse_class_type_annotation(cursor)?;
					let (parsed, next) = self.parse_annotation(after_path)?;
					let path_string = type_path_to_string(&type_path);
					if let Some(mut child) = field_visitor.visit_type_annotation(type_ref, &path_string, &parsed.descriptor, visible) {
						crate::annotation::replay_annotation(&mut *child, &parsed);
					}
					cursor = next;
				}
			}
			for (name_index, body, length) in unknown {
				field_visitor.visit_attribute(Attribute::new(self.utf8(name_index)?.to_string(), self.bytes[body..body + length].to_vec()));
			}
			field_visitor.visit_end();
		}
		Ok(cursor)
	}

	fn visit_method(&self, visitor: &mut dyn ClassVisitor, offset: usize, options: ReaderOptions, registry: &AttributeRegistry) -> Result<usize> {
		let access = AccessFlags::from_jvms_bits(self.u16_at(offset)?);
		let name = self.utf8(self.u16_at(offset + 2)?)?;
		let descriptor = self.utf8(self.u16_at(offset + 4)?)?;
		let attr_count = self.u16_at(offset + 6)?;
		let mut cursor = offset + 8;

		let mut signature = None;
		let mut exceptions: Vec<String> = Vec::new();
		let mut code_body: Option<(usize, usize)> = None;
		let mut unknown = Vec::new();
		let mut method_parameters: Vec<(u16, u16)> = Vec::new();
		let mut annotation_default: Option<usize> = None;
		let mut annotations: Vec<(usize, bool)> = Vec::new();
		let mut parameter_annotations: Vec<(usize, bool)> = Vec::new();
		let mut type_annotations: Vec<(usize, bool)> = Vec::new();

		for _ in 0..attr_count {
			let name_index = self.u16_at(cursor)?;
			let length = self.u32_at(cursor + 2)? as usize;
			let body = cursor + 6;
			match &*self.utf8(name_index)? {
				"Code" if !options.contains(ReaderOptions::SKIP_CODE) => code_body = Some((body, length)),
				"Code" => {},
				"Exceptions" => {
					let count = self.u16_at(body)? as usize;
					let mut p = body + 2;
					for _ in 0..count {
						exceptions.push(self.class_internal_name(self.u16_at(p)?)?.to_string());
						p += 2;
					}
				},
				"Signature" => signature = Some(self.utf8(self.u16_at(body)?)?),
				"MethodParameters" if !options.contains(ReaderOptions::SKIP_DEBUG) => {
					let count = self.u8_at(body)? as usize;
					let mut p = body + 1;
					for _ in 0..count {
						method_parameters.push((self.u16_at(p)?, self.u16_at(p + 2)?));
						p += 4;
					}
				},
				"AnnotationDefault" => annotation_default = Some(body),
				"Synthetic" | "Deprecated" => {},
				"RuntimeVisibleAnnotations" => annotations.push((body, true)),
				"RuntimeInvisibleAnnotations" => annotations.push((body, false)),
				"RuntimeVisibleParameterAnnotations" => parameter_annotations.push((body, true)),
				"RuntimeInvisibleParameterAnnotations" => parameter_annotations.push((body, false)),
				"RuntimeVisibleTypeAnnotations" => type_annotations.push((body, true)),
				"RuntimeInvisibleTypeAnnotations" => type_annotations.push((body, false)),
				_ => unknown.push((name_index, body, length)),
			}
			cursor = body + length;
		}

		let Some(mut method_visitor) = visitor.visit_method(access, &name, &descriptor, signature.as_deref(), &exceptions) else {
			return Ok(cursor);
		};

		for (name_index, access_flags) in &method_parameters {
			let param_name = if *name_index == 0 { None } else { Some(self.utf8(*name_index)?) };
			method_visitor.visit_parameter(param_name.as_deref(), AccessFlags::from_jvms_bits(*access_flags));
		}

		if let Some(body) = annotation_default {
			if let Some(mut child) = method_visitor.visit_annotation_default() {
				let (value, _) = self.parse_element_value_pub(body)?;
				crate::annotation::replay_annotation_default(&mut *child, &value);
			}
		}
		for (body, visible) in annotations {
			let count = self.u16_at(body)?;
			let mut cursor = body + 2;
			for _ in 0..count {
				let (parsed, next) = self.parse_annotation(cursor)?;
				if let Some(mut child) = method_visitor.visit_annotation(&parsed.descriptor, visible) {
					crate::annotation::replay_annotation(&mut *child, &parsed);
				}
				cursor = next;
			}
		}
		for (body, visible) in parameter_annotations {
			let param_count = self.u8_at(body)? as usize;
			let mut cursor = body + 1;
			for parameter in 0..param_count {
				let count = self.u16_at(cursor)?;
				cursor += 2;
				for _ in 0..count {
					let (parsed, next) = self.parse_annotation(cursor)?;
					if let Some(mut child) = method_visitor.visit_parameter_annotation(parameter as u16, &parsed.descriptor, visible) {
						crate::annotation::replay_annotation(&mut *child, &parsed);
					}
					cursor = next;
				}
			}
		}
		for (body, visible) in type_annotations {
			let count = self.u16_at(body)?;
			let mut cursor = body + 2;
			for _ in 0..count {
				let (type_ref, type_path, after_path) = self.parse_class_type_annotation(cursor)?;
				let (parsed, next) = self.parse_annotation(after_path)?;
				let path_string = type_path_to_string(&type_path);
				if let Some(mut child) = method_visitor.visit_type_annotation(type_ref, &path_string, &parsed.descriptor, visible) {
					crate::annotation::replay_annotation(&mut *child, &parsed);
				}
				cursor = next;
			}
		}

		if let Some((body, length)) = code_body {
			if !method_visitor.visit_code_raw(&self.bytes[body..body + length]) {
				method_visitor.visit_code();
				let events = parse_code_attribute(self, body, length, options, registry)?;
				replay_code_events(&mut *method_visitor, events);
			}
		}

		for (name_index, body, length) in unknown {
			method_visitor.visit_attribute(Attribute::new(self.utf8(name_index)?.to_string(), self.bytes[body..body + length].to_vec()));
		}
		method_visitor.visit_end();
		Ok(cursor)
	}

	pub fn max_string_length(&self) -> usize {
		self.max_string_length
	}

	/// Builds a [`crate::symbol_table::SymbolTable`] from this reader's
	/// already-parsed constant pool, preserving every index (including the
	/// unusable second slot of a Long/Double entry) and the raw pool bytes
	/// verbatim, so a writer seeded from it reproduces an untransformed
	/// class byte-for-byte.
	pub fn snapshot_symbol_table(&self) -> Result<crate::symbol_table::SymbolTable> {
		let mut symbols = Vec::with_capacity(self.cp_entries.len());
		let mut index = 1u32;
		while (index as usize) < self.cp_entries.len() {
			let tag_byte = self.cp_entries[index as usize].tag;
			let tag = Tag::from_cp_tag_byte(tag_byte)
				.ok_or_else(|| Error::MalformedClass(format!("unknown constant pool tag {tag_byte} at index {index}")))?;
			let symbol = self.snapshot_symbol(index as u16, tag)?;
			index += tag.pool_slot_width() as u32;
			symbols.push(symbol);
		}
		let raw_pool_bytes = self.bytes[10..self.header_offset].to_vec();
		Ok(crate::symbol_table::SymbolTable::from_reader_pool(symbols, raw_pool_bytes, self.cp_entries.len() as u32))
	}

	fn snapshot_symbol(&self, index: u16, tag: Tag) -> Result<crate::symbol::Symbol> {
		use crate::symbol::Symbol;
		let base = Symbol::new(index as u32, tag);
		Ok(match tag {
			Tag::Utf8 => base.with_value(self.utf8(index)?.to_string()),
			Tag::Integer => base.with_data(match self.constant_value(index)? {
				ConstantValue::Int(v) => v as u32 as u64,
				_ => unreachable!(),
			}),
			Tag::Float => base.with_data(match self.constant_value(index)? {
				ConstantValue::Float(v) => v.to_bits() as u64,
				_ => unreachable!(),
			}),
			Tag::Long => base.with_data(match self.constant_value(index)? {
				ConstantValue::Long(v) => v as u64,
				_ => unreachable!(),
			}),
			Tag::Double => base.with_data(match self.constant_value(index)? {
				ConstantValue::Double(v) => v.to_bits(),
				_ => unreachable!(),
			}),
			Tag::Class => base.with_name(self.class_internal_name(index)?.to_string()),
			Tag::String => {
				let offset = self.cp_offset(index)? as usize;
				let utf8_index = self.u16_at(offset)?;
				base.with_value(self.utf8(utf8_index)?.to_string())
			},
			Tag::NameAndType => {
				let (name, descriptor) = self.name_and_type(index)?;
				base.with_name(name.to_string()).with_value(descriptor.to_string())
			},
			Tag::Fieldref | Tag::Methodref | Tag::InterfaceMethodref => {
				let (owner, name, descriptor) = self.member_ref(index)?;
				base.with_owner(owner.to_string()).with_name(name.to_string()).with_value(descriptor.to_string())
			},
			Tag::MethodHandle => {
				let offset = self.cp_offset(index)? as usize;
				let reference_kind = self.u8_at(offset)?;
				let reference_index = self.u16_at(offset + 1)?;
				let (owner, name, descriptor) = self.member_ref(reference_index)?;
				base.with_owner(owner.to_string()).with_name(name.to_string()).with_value(descriptor.to_string()).with_data(reference_kind as u64)
			},
			Tag::MethodType => {
				let offset = self.cp_offset(index)? as usize;
				let utf8_index = self.u16_at(offset)?;
				base.with_value(self.utf8(utf8_index)?.to_string())
			},
			Tag::Dynamic | Tag::InvokeDynamic => {
				let offset = self.cp_offset(index)? as usize;
				let bsm_index = self.u16_at(offset)?;
				let nat_index = self.u16_at(offset + 2)?;
				let (name, descriptor) = self.name_and_type(nat_index)?;
				base.with_name(name.to_string()).with_value(descriptor.to_string()).with_data(bsm_index as u64)
			},
			Tag::Module | Tag::Package => {
				let offset = self.cp_offset(index)? as usize;
				let utf8_index = self.u16_at(offset)?;
				base.with_name(self.utf8(utf8_index)?.to_string())
			},
			Tag::BootstrapMethod | Tag::Type | Tag::UninitializedType | Tag::MergedType => {
				unreachable!("not a constant-pool tag")
			},
		})
	}

	// -- narrow crate-internal accessors for reader_code.rs / annotation.rs --

	pub(crate) fn u8_pub(&self, offset: usize) -> Result<u8> {
		self.u8_at(offset)
	}

	pub(crate) fn u16_pub(&self, offset: usize) -> Result<u16> {
		self.u16_at(offset)
	}

	pub(crate) fn u32_pub(&self, offset: usize) -> Result<u32> {
		self.u32_at(offset)
	}

	pub(crate) fn utf8_pub(&self, index: u16) -> Result<Rc<str>> {
		self.utf8(index)
	}

	pub(crate) fn const_value_pub(&self, index: u16) -> Result<ConstantValue> {
		self.constant_value(index)
	}

	pub(crate) fn class_internal_name_pub(&self, index: u16) -> Result<Rc<str>> {
		self.class_internal_name(index)
	}

	pub(crate) fn member_ref_pub(&self, index: u16) -> Result<(Rc<str>, Rc<str>, Rc<str>)> {
		self.member_ref(index)
	}
}

/// Renders a [`TypePath`](crate::type_annotation::TypePath) back into the
/// compact string form `visit_type_annotation` takes (e.g. `"[.[*"`),
/// ASM's own textual convention for a type path.
fn type_path_to_string(path: &crate::type_annotation::TypePath) -> String {
	let mut out = String::with_capacity(path.steps.len() * 2);
	for step in &path.steps {
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
	out
}

/// Replays the flat event list produced by [`parse_code_attribute`] onto a
/// `MethodVisitor`, in bytecode-offset order.
fn replay_code_events(visitor: &mut dyn crate::visitor::MethodVisitor, events: CodeAttributeEvents) {
	for event in events.events {
		event.replay(visitor);
	}
	visitor.visit_maxs(events.max_stack, events.max_locals);
}

/// Computes the byte width of one constant-pool entry's payload (excluding
/// the tag byte already consumed) and the number of pool slots it
/// occupies (2 for Long/Double). Also feeds the running
/// `max_string_length` used to pre-size char buffers.
fn cp_entry_size(bytes: &[u8], tag: u8, payload_offset: usize, max_string_length: &mut usize) -> Result<(usize, u32)> {
	let u16_at = |o: usize| -> Result<u16> {
		bytes.get(o..o + 2).map(|s| u16::from_be_bytes(s.try_into().unwrap())).ok_or_else(|| Error::MalformedClass("truncated constant pool entry".into()))
	};
	Ok(match Tag::from_cp_tag_byte(tag) {
		Some(Tag::Utf8) => {
			let length = u16_at(payload_offset)? as usize;
			*max_string_length = (*max_string_length).max(length);
			(2 + length, 1)
		},
		Some(Tag::Integer) | Some(Tag::Float) => (4, 1),
		Some(Tag::Long) | Some(Tag::Double) => (8, 2),
		Some(Tag::Class) | Some(Tag::String) | Some(Tag::MethodType) | Some(Tag::Module) | Some(Tag::Package) => (2, 1),
		Some(Tag::Fieldref) | Some(Tag::Methodref) | Some(Tag::InterfaceMethodref) | Some(Tag::NameAndType) | Some(Tag::Dynamic) | Some(Tag::InvokeDynamic) => (4, 1),
		Some(Tag::MethodHandle) => (3, 1),
		_ => return Err(Error::MalformedClass(format!("unknown constant pool tag {tag}"))),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn minimal_class_bytes() -> Vec<u8> {
		// CAFEBABE, minor=0, major=52 (V1_8), cp_count=2, cp[1]=Utf8("A"),
		// access=PUBLIC, this_class=0 (invalid but fine for header-only test)
		let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34, 0x00, 0x02];
		bytes.push(1); // Utf8 tag
		bytes.extend_from_slice(&1u16.to_be_bytes());
		bytes.push(b'A');
		bytes
	}

	#[test]
	fn parses_magic_and_version() {
		let bytes = minimal_class_bytes();
		// not enough bytes to reach the header; this test only exercises
		// the constant-pool walk succeeding without panicking up to EOF.
		let result = ClassReader::new(&bytes);
		assert!(result.is_err());
	}
}
