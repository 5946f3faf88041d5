//! Just enough of a bytecode decoder to find symbolic references
//!
//! The representation is much coarser than the usual presentation of the [instruction set][0]:
//! only instructions that carry a constant pool index are broken out into their own variants.
//! Everything else gets lumped into [`Instruction::Other`], with its operand bytes left
//! undecoded. The length of every instruction still has to be known exactly, since the code array
//! has no separators between instructions:
//!
//!   - most instructions have a fixed number of operand bytes
//!   - `tableswitch` and `lookupswitch` are padded so that their jump tables are 4-byte aligned
//!     (relative to the start of the code array) and then have a variable-length table
//!   - `wide` widens the local variable index of the next instruction (and the increment, for
//!     `iinc`)
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-6.html#jvms-6.5

use crate::jvm::class_file::Serialize;
use crate::jvm::{ClassConstantIndex, ConstantIndex, Error};
use byteorder::WriteBytesExt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,

    /// Argument count (including the receiver) is redundantly stored on `invokeinterface`
    Interface(u8),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    GetStatic(ConstantIndex),
    PutStatic(ConstantIndex),
    GetField(ConstantIndex),
    PutField(ConstantIndex),
    Invoke(InvokeType, ConstantIndex),
    InvokeDynamic(ConstantIndex),
    New(ClassConstantIndex),
    ANewArray(ClassConstantIndex),
    CheckCast(ClassConstantIndex),
    InstanceOf(ClassConstantIndex),
    MultiANewArray(ClassConstantIndex, u8),

    /// Covers both `ldc` and `ldc_w`
    Ldc(ConstantIndex),
    Ldc2W(ConstantIndex),

    /// Any other instruction, along with its raw operand bytes (including switch padding)
    Other { opcode: u8, operands: Vec<u8> },
}

impl Instruction {
    pub const ACONST_NULL: Instruction = Instruction::other(0x01);
    pub const ALOAD_0: Instruction = Instruction::other(0x2a);
    pub const POP: Instruction = Instruction::other(0x57);
    pub const DUP: Instruction = Instruction::other(0x59);
    pub const IRETURN: Instruction = Instruction::other(0xac);
    pub const ARETURN: Instruction = Instruction::other(0xb0);
    pub const RETURN: Instruction = Instruction::other(0xb1);
    pub const ATHROW: Instruction = Instruction::other(0xbf);

    const fn other(opcode: u8) -> Instruction {
        Instruction::Other {
            opcode,
            operands: Vec::new(),
        }
    }
}

impl Serialize for Instruction {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Instruction::GetStatic(idx) => {
                0xb2u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::PutStatic(idx) => {
                0xb3u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::GetField(idx) => {
                0xb4u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::PutField(idx) => {
                0xb5u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Invoke(InvokeType::Virtual, idx) => {
                0xb6u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Invoke(InvokeType::Special, idx) => {
                0xb7u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Invoke(InvokeType::Static, idx) => {
                0xb8u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Invoke(InvokeType::Interface(cnt), idx) => {
                0xb9u8.serialize(writer)?;
                idx.serialize(writer)?;
                cnt.serialize(writer)?;
                0u8.serialize(writer)?;
            }
            Instruction::InvokeDynamic(idx) => {
                0xbau8.serialize(writer)?;
                idx.serialize(writer)?;
                0u16.serialize(writer)?;
            }
            Instruction::New(idx) => {
                0xbbu8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::ANewArray(idx) => {
                0xbdu8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::CheckCast(idx) => {
                0xc0u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::InstanceOf(idx) => {
                0xc1u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::MultiANewArray(idx, dimensions) => {
                0xc5u8.serialize(writer)?;
                idx.serialize(writer)?;
                dimensions.serialize(writer)?;
            }
            Instruction::Ldc(idx) => match u8::try_from(idx.0) {
                Ok(narrow) => {
                    0x12u8.serialize(writer)?;
                    narrow.serialize(writer)?;
                }
                Err(_) => {
                    0x13u8.serialize(writer)?;
                    idx.serialize(writer)?;
                }
            },
            Instruction::Ldc2W(idx) => {
                0x14u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Other { opcode, operands } => {
                opcode.serialize(writer)?;
                writer.write_all(operands)?;
            }
        }
        Ok(())
    }
}

/// Encode a straight sequence of instructions into a code array
pub fn encode(instructions: &[Instruction]) -> Result<Vec<u8>, Error> {
    let mut code_array = vec![];
    for instruction in instructions {
        instruction.serialize(&mut code_array)?;
    }
    Ok(code_array)
}

/// Iterator over the instructions in a code array, along with their offsets
///
/// The first malformed instruction produces an error and ends the iteration.
pub struct Instructions<'a> {
    code_array: &'a [u8],
    offset: usize,
}

impl<'a> Instructions<'a> {
    pub fn new(code_array: &'a [u8]) -> Instructions<'a> {
        Instructions {
            code_array,
            offset: 0,
        }
    }

    fn u8_at(&self, at: usize) -> Result<u8, Error> {
        self.code_array
            .get(at)
            .copied()
            .ok_or(Error::TruncatedCode {
                offset: self.offset,
            })
    }

    fn u16_at(&self, at: usize) -> Result<u16, Error> {
        Ok(u16::from_be_bytes([self.u8_at(at)?, self.u8_at(at + 1)?]))
    }

    fn i32_at(&self, at: usize) -> Result<i32, Error> {
        Ok(i32::from_be_bytes([
            self.u8_at(at)?,
            self.u8_at(at + 1)?,
            self.u8_at(at + 2)?,
            self.u8_at(at + 3)?,
        ]))
    }

    /// Number of operand bytes following the opcode at the current offset
    fn operand_len(&self, opcode: u8) -> Result<usize, Error> {
        let len = match opcode {
            0x00..=0x0f => 0,
            0x10 => 1,
            0x11 => 2,
            0x12 => 1,
            0x13 | 0x14 => 2,
            0x15..=0x19 => 1,
            0x1a..=0x35 => 0,
            0x36..=0x3a => 1,
            0x3b..=0x83 => 0,
            0x84 => 2,
            0x85..=0x98 => 0,
            0x99..=0xa8 => 2,
            0xa9 => 1,
            0xaa => {
                let padding = Self::switch_padding(self.offset);
                let table_start = self.offset + 1 + padding;
                let low = self.i32_at(table_start + 4)?;
                let high = self.i32_at(table_start + 8)?;
                let entries = (high as i64) - (low as i64) + 1;
                if entries < 0 {
                    return Err(Error::TruncatedCode {
                        offset: self.offset,
                    });
                }
                padding + 12 + 4 * entries as usize
            }
            0xab => {
                let padding = Self::switch_padding(self.offset);
                let table_start = self.offset + 1 + padding;
                let pairs = self.i32_at(table_start + 4)?;
                if pairs < 0 {
                    return Err(Error::TruncatedCode {
                        offset: self.offset,
                    });
                }
                padding + 8 + 8 * pairs as usize
            }
            0xac..=0xb1 => 0,
            0xb2..=0xb8 => 2,
            0xb9 | 0xba => 4,
            0xbb => 2,
            0xbc => 1,
            0xbd => 2,
            0xbe | 0xbf => 0,
            0xc0 | 0xc1 => 2,
            0xc2 | 0xc3 => 0,
            0xc4 => {
                if self.u8_at(self.offset + 1)? == 0x84 {
                    5
                } else {
                    3
                }
            }
            0xc5 => 3,
            0xc6 | 0xc7 => 2,
            0xc8 | 0xc9 => 4,
            opcode => {
                return Err(Error::UnknownOpcode {
                    opcode,
                    offset: self.offset,
                })
            }
        };
        Ok(len)
    }

    /// Switch tables start at the next multiple of 4 after the opcode
    fn switch_padding(opcode_offset: usize) -> usize {
        (4 - (opcode_offset + 1) % 4) % 4
    }

    fn decode(&self) -> Result<(Instruction, usize), Error> {
        let at = self.offset;
        let opcode = self.u8_at(at)?;
        let operand_len = self.operand_len(opcode)?;
        if at + operand_len >= self.code_array.len() {
            return Err(Error::TruncatedCode { offset: at });
        }

        let index = || self.u16_at(at + 1).map(ConstantIndex);
        let class = || index().map(ClassConstantIndex);
        let instruction = match opcode {
            0x12 => Instruction::Ldc(ConstantIndex(self.u8_at(at + 1)? as u16)),
            0x13 => Instruction::Ldc(index()?),
            0x14 => Instruction::Ldc2W(index()?),
            0xb2 => Instruction::GetStatic(index()?),
            0xb3 => Instruction::PutStatic(index()?),
            0xb4 => Instruction::GetField(index()?),
            0xb5 => Instruction::PutField(index()?),
            0xb6 => Instruction::Invoke(InvokeType::Virtual, index()?),
            0xb7 => Instruction::Invoke(InvokeType::Special, index()?),
            0xb8 => Instruction::Invoke(InvokeType::Static, index()?),
            0xb9 => Instruction::Invoke(InvokeType::Interface(self.u8_at(at + 3)?), index()?),
            0xba => Instruction::InvokeDynamic(index()?),
            0xbb => Instruction::New(class()?),
            0xbd => Instruction::ANewArray(class()?),
            0xc0 => Instruction::CheckCast(class()?),
            0xc1 => Instruction::InstanceOf(class()?),
            0xc5 => Instruction::MultiANewArray(class()?, self.u8_at(at + 3)?),
            _ => Instruction::Other {
                opcode,
                operands: self.code_array[at + 1..at + 1 + operand_len].to_vec(),
            },
        };
        Ok((instruction, 1 + operand_len))
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<(usize, Instruction), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.code_array.len() {
            return None;
        }
        let at = self.offset;
        match self.decode() {
            Ok((instruction, len)) => {
                self.offset += len;
                Some(Ok((at, instruction)))
            }
            Err(err) => {
                self.offset = self.code_array.len();
                Some(Err(err))
            }
        }
    }
}
