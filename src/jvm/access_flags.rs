use crate::jvm::class_file::{Deserialize, Serialize};
use crate::jvm::Error;
use bitflags::bitflags;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fmt;

bitflags! {
    /// Access flags on classes
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.1-200-E.1
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// Access flags on methods
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// Access flags on fields
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.5-200-A.1
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

/// Java access levels, ordered from most restrictive to most permissive
///
/// A member "satisfies" a required visibility when its own visibility is greater than or equal
/// to it, so `Visibility::Private` as a requirement means any member will do.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum Visibility {
    Private,
    PackagePrivate,
    Protected,
    Public,
}

impl Visibility {
    /// Does something declared with this visibility satisfy the required visibility?
    pub fn satisfies(self, required: Visibility) -> bool {
        self >= required
    }

    fn from_bits(bits: u16) -> Visibility {
        if bits & 0x0001 != 0 {
            Visibility::Public
        } else if bits & 0x0004 != 0 {
            Visibility::Protected
        } else if bits & 0x0002 != 0 {
            Visibility::Private
        } else {
            Visibility::PackagePrivate
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Private => "private",
            Visibility::PackagePrivate => "package-private",
            Visibility::Protected => "protected",
            Visibility::Public => "public",
        })
    }
}

impl ClassAccessFlags {
    /// Top-level classes are either public or package-private
    pub fn visibility(&self) -> Visibility {
        if self.contains(ClassAccessFlags::PUBLIC) {
            Visibility::Public
        } else {
            Visibility::PackagePrivate
        }
    }
}

impl MethodAccessFlags {
    pub fn visibility(&self) -> Visibility {
        Visibility::from_bits(self.bits())
    }
}

impl FieldAccessFlags {
    pub fn visibility(&self) -> Visibility {
        Visibility::from_bits(self.bits())
    }
}

impl Serialize for ClassAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for MethodAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for FieldAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.bits().serialize(writer)
    }
}

// Unknown bits are dropped rather than rejected: newer class file versions keep adding flags.
impl Deserialize for ClassAccessFlags {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Self::from_bits_truncate(u16::deserialize(reader)?))
    }
}

impl Deserialize for MethodAccessFlags {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Self::from_bits_truncate(u16::deserialize(reader)?))
    }
}

impl Deserialize for FieldAccessFlags {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Self::from_bits_truncate(u16::deserialize(reader)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn visibility_ordering() {
        assert!(Visibility::Public.satisfies(Visibility::Protected));
        assert!(Visibility::Protected.satisfies(Visibility::PackagePrivate));
        assert!(Visibility::PackagePrivate.satisfies(Visibility::Private));
        assert!(!Visibility::PackagePrivate.satisfies(Visibility::Protected));
        assert!(!Visibility::Private.satisfies(Visibility::PackagePrivate));
    }

    #[test]
    fn visibility_from_flags() {
        let flags = MethodAccessFlags::PROTECTED | MethodAccessFlags::STATIC;
        assert_eq!(flags.visibility(), Visibility::Protected);
        assert_eq!(FieldAccessFlags::FINAL.visibility(), Visibility::PackagePrivate);
        assert_eq!(FieldAccessFlags::PRIVATE.visibility(), Visibility::Private);
        assert_eq!(ClassAccessFlags::SUPER.visibility(), Visibility::PackagePrivate);
        assert_eq!(
            (ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL).visibility(),
            Visibility::Public
        );
    }
}
