//! Symbolic references from instrumentation code into library code

mod collector;
mod manifest;
mod module;

pub use collector::*;
pub use manifest::*;
pub use module::*;

use crate::jvm::{
    BinaryName, FieldType, MethodDescriptor, Name, RenderDescriptor, UnqualifiedName, Visibility,
};
use std::fmt;

/// Reference to a class
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassRef {
    pub name: BinaryName,

    /// `Visibility::Private` is used for references that only need the class to exist (eg. when
    /// the class only shows up in a descriptor)
    pub minimum_visibility: Visibility,
}

/// Reference to a method, as made by one of the `invoke*` instructions
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
    pub minimum_visibility: Visibility,
    pub is_static: bool,

    /// Was the method referenced through an interface (`InterfaceMethodref`)?
    pub is_interface: bool,
}

/// Reference to a field, as made by one of the `get*`/`put*` instructions
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
    pub minimum_visibility: Visibility,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reference {
    Class(ClassRef),
    Method(MethodRef),
    Field(FieldRef),
}

impl Reference {
    /// Stable textual key identifying what is referenced (but not how demandingly)
    ///
    /// Keys are `owner` for classes, `owner#name(descriptor)return` for methods, and
    /// `owner#name:type` for fields.
    pub fn key(&self) -> String {
        match self {
            Reference::Class(class) => class.name.as_str().to_owned(),
            Reference::Method(method) => format!(
                "{}#{}{}",
                method.owner.as_str(),
                method.name.as_str(),
                method.descriptor.render()
            ),
            Reference::Field(field) => format!(
                "{}#{}:{}",
                field.owner.as_str(),
                field.name.as_str(),
                field.descriptor.render()
            ),
        }
    }

    /// Class that needs to be resolved first
    pub fn owner(&self) -> &BinaryName {
        match self {
            Reference::Class(class) => &class.name,
            Reference::Method(method) => &method.owner,
            Reference::Field(field) => &field.owner,
        }
    }

    pub fn minimum_visibility(&self) -> Visibility {
        match self {
            Reference::Class(class) => class.minimum_visibility,
            Reference::Method(method) => method.minimum_visibility,
            Reference::Field(field) => field.minimum_visibility,
        }
    }

    /// Fold another reference with the same key into this one, keeping the more demanding
    /// requirements of the two
    pub(crate) fn merge(&mut self, other: &Reference) {
        let visibility = self.minimum_visibility().max(other.minimum_visibility());
        match (self, other) {
            (Reference::Class(class), _) => class.minimum_visibility = visibility,
            (Reference::Method(method), Reference::Method(other)) => {
                method.minimum_visibility = visibility;
                method.is_interface |= other.is_interface;
            }
            (Reference::Method(method), _) => method.minimum_visibility = visibility,
            (Reference::Field(field), _) => field.minimum_visibility = visibility,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Class(class) => write!(f, "class {}", class.name),
            Reference::Method(method) => write!(
                f,
                "{}method {}#{}{}",
                if method.is_static { "static " } else { "" },
                method.owner,
                method.name,
                method.descriptor.render()
            ),
            Reference::Field(field) => write!(
                f,
                "{}field {}#{}:{}",
                if field.is_static { "static " } else { "" },
                field.owner,
                field.name,
                field.descriptor.render()
            ),
        }
    }
}
