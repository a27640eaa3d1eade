//! Class-file reading and writing.
//!
//! This crate knows the binary format and nothing about javelin's semantic
//! model: the lowerer produces a [`ClassFile`] and the writer serialises it
//! bit-exactly; the reader parses compiled class files back into the same
//! shape, skipping method bodies and debug attributes.

pub mod class;
pub mod descriptor;
pub mod error;
pub mod pool;
pub mod reader;
pub mod signature;
pub mod writer;

pub use class::{
    AnnotationItem, ClassFile, ElemConst, ElementValue, FieldItem, InnerClassItem, MethodItem,
    ModuleItem, RecordComponentItem, TargetInfo, TypeAnnotationItem, TypePathStep,
};
pub use descriptor::{FieldType, MethodDescriptor};
pub use error::ClassFileError;
pub use pool::ConstPool;
pub use reader::read_class;
pub use signature::{
    ClassSignature, MethodSignature, SigTypeParam, TypeArgSig, TypeSig, parse_class_signature,
    parse_method_signature, parse_type_signature,
};
pub use writer::write_class;

/// Class-file major version for Java 21, the default target.
pub const DEFAULT_MAJOR_VERSION: u16 = 65;
pub const MAGIC: u32 = 0xCAFE_BABE;
