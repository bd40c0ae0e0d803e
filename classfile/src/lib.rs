//! A visitor-driven codec for the JVM `ClassFile` format (JVMS chapter 4):
//! a streaming `ClassReader` that walks a class file and calls out to a
//! `ClassVisitor`, and a `ClassWriter` that is itself a `ClassVisitor`,
//! so transforms compose as a chain of visitors sitting between the two.
//!
//! Binary support modules (`bytevector`, `symbol_table`, `label`, `frame`)
//! are the low-level machinery; `reader`/`reader_code` parse, `class_writer`/
//! `method_writer`/`field_writer`/`record_writer`/`module_writer`/
//! `annotation_writer` emit. `visitor` is the trait family both sides
//! implement.

pub mod access;
pub mod annotation;
pub mod annotation_writer;
pub mod attribute;
pub mod bytevector;
pub mod class_writer;
pub mod common_super;
pub mod descriptor;
pub mod error;
pub mod field_writer;
pub mod frame;
pub mod handle;
pub mod label;
pub mod method_writer;
pub mod module_writer;
pub mod opcodes;
pub mod reader;
pub mod reader_code;
pub mod record_writer;
pub mod signature;
pub mod symbol;
pub mod symbol_table;
pub mod type_annotation;
pub mod value;
pub mod version;
pub mod visitor;

pub use access::AccessFlags;
pub use attribute::{Attribute, AttributeContent, AttributeReader, AttributeRegistry};
pub use class_writer::{ClassWriter, WriterFlags};
pub use common_super::{ClassHierarchy, TrivialClassHierarchy};
pub use descriptor::{Sort, Type};
pub use error::{Error, ErrorSink, Result};
pub use handle::{ConstantDynamic, Handle};
pub use label::Label;
pub use reader::{ClassReader, ReaderOptions};
pub use symbol::{Symbol, Tag};
pub use symbol_table::{SharedSymbolTable, SymbolTable};
pub use value::ConstantValue;
pub use version::ClassVersion;
pub use visitor::{
	AnnotationVisitor, ClassVisitor, FieldVisitor, MethodVisitor, ModuleVisitor, NoopAnnotationVisitor, NoopClassVisitor, NoopFieldVisitor,
	NoopMethodVisitor, NoopModuleVisitor, NoopRecordComponentVisitor, RecordComponentVisitor,
};
