//! `ModuleWriter`: the `ModuleVisitor` implementation a `ClassWriter` hands
//! back from `visit_module` (JVMS §4.7.25 `Module`, §4.7.26
//! `ModulePackages`, §4.7.27 `ModuleMainClass`).
//!
//! `Module`, `ModulePackages` and `ModuleMainClass` are three independent
//! top-level class attributes, not one attribute nested inside another, so
//! this writer can't just hand a finished byte blob back to its caller the
//! way `RecordComponentWriter`/`FieldWriter` do for their own single
//! attribute. Instead it pushes each finished `(name, body)` pair into a
//! list shared with the owning `ClassWriter`, which later runs each entry
//! through the same `write_attribute_header` every other attribute goes
//! through when it assembles the class's attribute table.

use std::cell::RefCell;
use std::rc::Rc;

use crate::access::AccessFlags;
use crate::bytevector::ByteVector;
use crate::error::ErrorSink;
use crate::symbol_table::SharedSymbolTable;
use crate::visitor::ModuleVisitor;

/// The attribute bodies a `ModuleWriter` accumulates, keyed by class
/// attribute name, destined for `ClassWriter::to_byte_array`'s top-level
/// attribute table.
pub type ModuleAttributes = Rc<RefCell<Vec<(String, Vec<u8>)>>>;

pub struct ModuleWriter {
	table: SharedSymbolTable,
	errors: ErrorSink,
	out: ModuleAttributes,

	module_name_index: u16,
	module_flags: AccessFlags,
	module_version_index: Option<u16>,
	requires: ByteVector,
	require_count: u16,
	exports: ByteVector,
	export_count: u16,
	opens: ByteVector,
	open_count: u16,
	uses: ByteVector,
	use_count: u16,
	provides: ByteVector,
	provide_count: u16,

	packages: Vec<u16>,
	main_class_index: Option<u16>,
}

impl ModuleWriter {
	pub fn new(table: SharedSymbolTable, errors: ErrorSink, out: ModuleAttributes, name: &str, access: AccessFlags, version: Option<&str>) -> Self {
		let mut t = table.borrow_mut();
		let module_name_index = errors.record(t.add_module(name)).map(|s| s.index as u16).unwrap_or(0);
		let module_version_index = version.and_then(|v| errors.record(t.add_utf8(v))).map(|s| s.index as u16);
		drop(t);
		Self {
			table,
			errors,
			out,
			module_name_index,
			module_flags: access,
			module_version_index,
			requires: ByteVector::new(),
			require_count: 0,
			exports: ByteVector::new(),
			export_count: 0,
			opens: ByteVector::new(),
			open_count: 0,
			uses: ByteVector::new(),
			use_count: 0,
			provides: ByteVector::new(),
			provide_count: 0,
			packages: Vec::new(),
			main_class_index: None,
		}
	}

	fn write_package_export_list(buf: &mut ByteVector, table: &SharedSymbolTable, errors: &ErrorSink, package_name: &str, access: AccessFlags, modules: &[String]) -> Option<()> {
		let package_index = errors.record(table.borrow_mut().add_package(package_name))?;
		buf.put_u16(package_index.index as u16);
		buf.put_u16(access.to_jvms_bits());
		buf.put_u16(modules.len() as u16);
		for module in modules {
			let module_index = errors.record(table.borrow_mut().add_module(module))?;
			buf.put_u16(module_index.index as u16);
		}
		Some(())
	}

	fn write_module_attribute(&self) -> Vec<u8> {
		let mut body = ByteVector::new();
		body.put_u16(self.module_name_index);
		body.put_u16(self.module_flags.to_jvms_bits());
		body.put_u16(self.module_version_index.unwrap_or(0));

		body.put_u16(self.require_count);
		body.put_bytes(self.requires.as_bytes());
		body.put_u16(self.export_count);
		body.put_bytes(self.exports.as_bytes());
		body.put_u16(self.open_count);
		body.put_bytes(self.opens.as_bytes());
		body.put_u16(self.use_count);
		body.put_bytes(self.uses.as_bytes());
		body.put_u16(self.provide_count);
		body.put_bytes(self.provides.as_bytes());
		body.into_bytes()
	}
}

impl ModuleVisitor for ModuleWriter {
	fn visit_require(&mut self, module: &str, access: AccessFlags, version: Option<&str>) {
		let Some(module_index) = self.errors.record(self.table.borrow_mut().add_module(module)) else { return };
		let version_index = version.and_then(|v| self.errors.record(self.table.borrow_mut().add_utf8(v)));
		self.requires.put_u16(module_index.index as u16);
		self.requires.put_u16(access.to_jvms_bits());
		self.requires.put_u16(version_index.map(|s| s.index as u16).unwrap_or(0));
		self.require_count += 1;
	}

	fn visit_export(&mut self, package_name: &str, access: AccessFlags, modules: &[String]) {
		if Self::write_package_export_list(&mut self.exports, &self.table, &self.errors, package_name, access, modules).is_some() {
			self.export_count += 1;
		}
	}

	fn visit_open(&mut self, package_name: &str, access: AccessFlags, modules: &[String]) {
		if Self::write_package_export_list(&mut self.opens, &self.table, &self.errors, package_name, access, modules).is_some() {
			self.open_count += 1;
		}
	}

	fn visit_use(&mut self, service: &str) {
		let Some(class_index) = self.errors.record(self.table.borrow_mut().add_class(service)) else { return };
		self.uses.put_u16(class_index.index as u16);
		self.use_count += 1;
	}

	fn visit_provide(&mut self, service: &str, providers: &[String]) {
		let Some(service_index) = self.errors.record(self.table.borrow_mut().add_class(service)) else { return };
		self.provides.put_u16(service_index.index as u16);
		self.provides.put_u16(providers.len() as u16);
		for provider in providers {
			let Some(provider_index) = self.errors.record(self.table.borrow_mut().add_class(provider)) else { return };
			self.provides.put_u16(provider_index.index as u16);
		}
		self.provide_count += 1;
	}

	fn visit_package(&mut self, package_name: &str) {
		if let Some(index) = self.errors.record(self.table.borrow_mut().add_package(package_name)) {
			self.packages.push(index.index as u16);
		}
	}

	fn visit_main_class(&mut self, main_class: &str) {
		self.main_class_index = self.errors.record(self.table.borrow_mut().add_class(main_class)).map(|s| s.index as u16);
	}

	fn visit_end(&mut self) {
		self.out.borrow_mut().push(("Module".to_string(), self.write_module_attribute()));
		if !self.packages.is_empty() {
			let mut body = ByteVector::new();
			body.put_u16(self.packages.len() as u16);
			for package in &self.packages {
				body.put_u16(*package);
			}
			self.out.borrow_mut().push(("ModulePackages".to_string(), body.into_bytes()));
		}
		if let Some(index) = self.main_class_index {
			let mut body = ByteVector::new();
			body.put_u16(index);
			self.out.borrow_mut().push(("ModuleMainClass".to_string(), body.into_bytes()));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn visit_end_emits_module_attribute_and_packages() {
		let table = SharedSymbolTable::new();
		let errors = ErrorSink::new();
		let out: ModuleAttributes = Rc::default();
		let mut writer = ModuleWriter::new(table, errors.clone(), out.clone(), "my.module", AccessFlags::OPEN, Some("1.0"));
		writer.visit_require("java.base", AccessFlags::MANDATED, None);
		writer.visit_export("com.example", AccessFlags::empty(), &[]);
		writer.visit_package("com.example.internal");
		writer.visit_main_class("com/example/Main");
		writer.visit_end();
		errors.check().unwrap();

		let names: Vec<&str> = out.borrow().iter().map(|(name, _)| name.as_str()).collect();
		assert_eq!(names, vec!["Module", "ModulePackages", "ModuleMainClass"]);
	}
}
