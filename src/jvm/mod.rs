//! Read (and, for building test fixtures, write) JVM class files
//!
//! Only the parts of the class file format that matter for symbolic linkage are modelled in any
//! detail: the constant pool, access flags, the declared fields and methods, and the `Code`
//! attribute of methods. Everything else is kept around as opaque [`class_file::Attribute`]s.
//!
//! ```
//! use refguard::jvm::class_file::ClassFile;
//! use refguard::jvm::*;
//!
//! # fn build() -> Result<(), Error> {
//! let name = BinaryName::from_string(String::from("me/alec/Point")).unwrap();
//! let super_class = BinaryName::OBJECT;
//! let mut builder = ClassBuilder::new(ClassAccessFlags::PUBLIC, &name, Some(&super_class))?;
//! builder.add_field(FieldAccessFlags::PUBLIC | FieldAccessFlags::FINAL, "x", "I")?;
//! let bytes = builder.to_bytes()?;
//!
//! let class_file = ClassFile::parse(&bytes)?;
//! assert_eq!(class_file.this_class_name()?, "me/alec/Point");
//! # Ok(())
//! # }
//! ```

mod access_flags;
mod class_builder;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
mod names;

pub use access_flags::*;
pub use class_builder::*;
pub use class_file::{
    ClassConstantIndex, Constant, ConstantIndex, ConstantPool, HandleKind, MemberRef, MemberRefKind,
    NameAndTypeConstantIndex, Utf8ConstantIndex,
};
pub use descriptors::*;
pub use errors::*;
pub use names::*;
