use super::{Constant, ConstantIndex};
use std::fmt;

/// Ways reading (or writing) a class file can go wrong
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// Class files must start with `0xCAFEBABE`
    BadMagic([u8; 4]),

    /// Constant pool tag that doesn't correspond to any constant kind
    UnknownConstantTag { tag: u8, index: ConstantIndex },

    /// Index points outside the pool, into the unusable half of a wide constant, or at a
    /// constant of the wrong kind
    BadConstantIndex {
        index: ConstantIndex,
        expected: &'static str,
    },

    /// Bytes in a `CONSTANT_Utf8` that are not valid modified UTF-8
    BadModifiedUtf8(ConstantIndex),

    /// Method handle kind outside of `1..=9`
    BadHandleKind(u8),

    MalformedName(String),
    MalformedDescriptor(String),

    /// Opcode that isn't defined by the JVM specification
    UnknownOpcode { opcode: u8, offset: usize },

    /// Instruction operands run past the end of the code array
    TruncatedCode { offset: usize },

    /// Too many constants to fit in a pool (only when building classes)
    ConstantPoolOverflow { constant: Constant, offset: u16 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::BadMagic(magic) => write!(f, "bad class file magic {:02X?}", magic),
            Error::UnknownConstantTag { tag, index } => {
                write!(f, "unknown constant tag {} at #{}", tag, index.0)
            }
            Error::BadConstantIndex { index, expected } => {
                write!(f, "constant #{} is not a valid {}", index.0, expected)
            }
            Error::BadModifiedUtf8(index) => {
                write!(f, "constant #{} is not valid modified UTF-8", index.0)
            }
            Error::BadHandleKind(kind) => write!(f, "unknown method handle kind {}", kind),
            Error::MalformedName(msg) => write!(f, "malformed name: {}", msg),
            Error::MalformedDescriptor(msg) => write!(f, "malformed descriptor: {}", msg),
            Error::UnknownOpcode { opcode, offset } => {
                write!(f, "unknown opcode 0x{:02x} at code offset {}", opcode, offset)
            }
            Error::TruncatedCode { offset } => {
                write!(f, "instruction at code offset {} is truncated", offset)
            }
            Error::ConstantPoolOverflow { offset, .. } => {
                write!(f, "constant pool overflowed at #{}", offset)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
