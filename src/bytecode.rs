//! brainiac's bytecode format.
//!
//! A program is a flat sequence of instructions, each one opcode byte
//! followed by zero, one or two operand bytes; 16-bit operands are little
//! endian. It always ends with [`Opcode::Hlt`].
//!
//! Loops are encoded as a pair of branches around the loop body. Both carry
//! the same displacement, measured from the end of the branch instruction:
//! `Brz` jumps forward past the body and the matching `Bnz`, and `Bnz` jumps
//! back to just after the matching `Brz`.

use std::fmt;

use static_assertions::const_assert;

/// Operand encoding of an opcode
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    None,
    U8,
    U16,
}

impl Operand {
    /// Number of bytes the operand takes
    pub fn size(self) -> usize {
        match self {
            Operand::None => 0,
            Operand::U8 => 1,
            Operand::U16 => 2,
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    /// Halt execution
    Hlt = 0,
    /// Move the pointer right by 1
    Rgt,
    /// Move the pointer right by a u8 operand
    RgtU8,
    /// Move the pointer right by a u16 operand
    RgtU16,
    /// Move the pointer left by 1
    Lft,
    /// Move the pointer left by a u8 operand
    LftU8,
    /// Move the pointer left by a u16 operand
    LftU16,
    /// Increment the current cell
    Inc,
    /// Add a u8 operand to the current cell
    IncU8,
    /// Decrement the current cell
    Dec,
    /// Subtract a u8 operand from the current cell
    DecU8,
    /// Write the current cell
    Out,
    /// Read into the current cell
    Inp,
    /// Branch forward by a u8 operand if the current cell is zero
    BrzU8,
    /// Branch forward by a u16 operand if the current cell is zero
    BrzU16,
    /// Branch backward by a u8 operand if the current cell is not zero
    BnzU8,
    /// Branch backward by a u16 operand if the current cell is not zero
    BnzU16,
    /// Set the current cell to 0
    Set0,
    /// Set the current cell to 1
    Set1,
    /// Set the current cell to a u8 operand
    SetU8,
}

use Opcode::*;

const OPCODES: [Opcode; 20] = [
    Hlt, Rgt, RgtU8, RgtU16, Lft, LftU8, LftU16, Inc, IncU8, Dec, DecU8, Out, Inp, BrzU8, BrzU16,
    BnzU8, BnzU16, Set0, Set1, SetU8,
];

const_assert!(opcode_table_size; OPCODES.len() == SetU8 as usize + 1);

impl Opcode {
    /// Decodes an opcode byte
    pub fn from_u8(byte: u8) -> Option<Self> {
        OPCODES.get(byte as usize).copied()
    }

    pub fn operand(self) -> Operand {
        match self {
            RgtU8 | LftU8 | IncU8 | DecU8 | BrzU8 | BnzU8 | SetU8 => Operand::U8,
            RgtU16 | LftU16 | BrzU16 | BnzU16 => Operand::U16,
            Hlt | Rgt | Lft | Inc | Dec | Out | Inp | Set0 | Set1 => Operand::None,
        }
    }

    /// Size of the whole instruction, opcode included
    pub fn size(self) -> usize {
        1 + self.operand().size()
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Hlt => "hlt",
            Rgt => "rgt",
            RgtU8 => "rgt.u8",
            RgtU16 => "rgt.u16",
            Lft => "lft",
            LftU8 => "lft.u8",
            LftU16 => "lft.u16",
            Inc => "inc",
            IncU8 => "inc.u8",
            Dec => "dec",
            DecU8 => "dec.u8",
            Out => "out",
            Inp => "inp",
            BrzU8 => "brz.u8",
            BrzU16 => "brz.u16",
            BnzU8 => "bnz.u8",
            BnzU16 => "bnz.u16",
            Set0 => "set.0",
            Set1 => "set.1",
            SetU8 => "set.u8",
        }
    }
}

/// A decoded instruction
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Operand value; 0 for opcodes without one
    pub operand: u16,
}

impl Instruction {
    pub fn size(&self) -> usize {
        self.opcode.size()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.opcode.operand() {
            Operand::None => write!(f, "{}", self.opcode.mnemonic()),
            _ => write!(f, "{} {}", self.opcode.mnemonic(), self.operand),
        }
    }
}

/// Compiled program, as produced by [`crate::generate`]
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Bytecode(Vec<u8>);

impl Bytecode {
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        Bytecode(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes the instructions with their byte offsets
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            bytes: &self.0,
            offset: 0,
        }
    }
}

impl AsRef<[u8]> for Bytecode {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Disassembly listing, one instruction per line. Branches show the offset
/// they jump to.
impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (offset, instruction) in self.instructions() {
            let next = offset + instruction.size();
            let operand = instruction.operand as usize;
            match instruction.opcode {
                BrzU8 | BrzU16 => writeln!(
                    f,
                    "{:06x}  {:<12} ; -> {:06x}",
                    offset,
                    instruction.to_string(),
                    next + operand
                )?,
                BnzU8 | BnzU16 => writeln!(
                    f,
                    "{:06x}  {:<12} ; -> {:06x}",
                    offset,
                    instruction.to_string(),
                    next.wrapping_sub(operand)
                )?,
                _ => writeln!(f, "{:06x}  {}", offset, instruction)?,
            }
        }
        Ok(())
    }
}

/// Iterator over `(offset, instruction)` pairs of a [`Bytecode`]. Stops
/// early at an unknown opcode or a truncated operand.
pub struct Instructions<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = (usize, Instruction);

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset;
        let opcode = Opcode::from_u8(*self.bytes.get(offset)?)?;
        let operand = match opcode.operand() {
            Operand::None => 0,
            Operand::U8 => *self.bytes.get(offset + 1)? as u16,
            Operand::U16 => {
                let low = *self.bytes.get(offset + 1)?;
                let high = *self.bytes.get(offset + 2)?;
                u16::from_le_bytes([low, high])
            }
        };
        self.offset += opcode.size();
        Some((offset, Instruction { opcode, operand }))
    }
}
