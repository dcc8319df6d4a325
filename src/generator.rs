use thiserror::Error;
use tracing::debug;

use crate::bytecode::{Bytecode, Opcode, Operand};
use crate::ir::{Node, Program};

/// Largest loop body, in bytes, whose branches can still be encoded
pub const MAX_LOOP_BODY: usize = u16::MAX as usize - 3;

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum GenerateError {
    #[error("loop body is too large ({size} bytes, at most {max} allowed)", max = MAX_LOOP_BODY)]
    LoopTooLarge { size: usize },
    #[error("could not allocate bytecode")]
    OutOfMemory,
}

/// Generates bytecode for a program
pub fn generate(program: &Program) -> Result<Bytecode, GenerateError> {
    let mut emitter = Emitter::new();
    emitter.nodes(&program.nodes)?;
    emitter.op(Opcode::Hlt)?;

    debug!(bytes = emitter.bytes.len(), "generated bytecode");
    Ok(Bytecode::from_vec(emitter.bytes))
}

/// Chooses the branch width for a loop with a body of `body_size` bytes.
/// Returns the operand width and the displacement both branches carry.
///
/// Branch displacements count from the end of the branch instruction. The
/// forward branch has to skip the body and the backward branch; the
/// backward branch has to go back over itself and the body to land right
/// after the forward branch. Either way that is the body size plus the size
/// of one branch instruction, which depends on the operand width chosen.
pub fn branch_displacement(body_size: usize) -> Result<(Operand, u16), GenerateError> {
    let short = body_size + Opcode::BnzU8.size();
    if short <= u8::MAX as usize {
        return Ok((Operand::U8, short as u16));
    }

    let long = body_size + Opcode::BnzU16.size();
    if long <= u16::MAX as usize {
        Ok((Operand::U16, long as u16))
    } else {
        Err(GenerateError::LoopTooLarge { size: body_size })
    }
}

struct Emitter {
    bytes: Vec<u8>,
}

impl Emitter {
    fn new() -> Self {
        Emitter { bytes: Vec::new() }
    }

    fn reserve(&mut self, additional: usize) -> Result<(), GenerateError> {
        self.bytes
            .try_reserve(additional)
            .map_err(|_| GenerateError::OutOfMemory)
    }

    fn op(&mut self, opcode: Opcode) -> Result<(), GenerateError> {
        self.reserve(1)?;
        self.bytes.push(opcode as u8);
        Ok(())
    }

    fn op_u8(&mut self, opcode: Opcode, operand: u8) -> Result<(), GenerateError> {
        self.reserve(2)?;
        self.bytes.push(opcode as u8);
        self.bytes.push(operand);
        Ok(())
    }

    fn op_u16(&mut self, opcode: Opcode, operand: u16) -> Result<(), GenerateError> {
        self.reserve(3)?;
        self.bytes.push(opcode as u8);
        self.bytes.extend_from_slice(&operand.to_le_bytes());
        Ok(())
    }

    fn nodes(&mut self, nodes: &[Node]) -> Result<(), GenerateError> {
        for node in nodes {
            self.node(node)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &Node) -> Result<(), GenerateError> {
        match *node {
            Node::Loop(ref body) => self.looped(body),
            Node::Move(count) => self.shift(count),
            Node::Add(count) => self.add(count),
            Node::Set(0) => self.op(Opcode::Set0),
            Node::Set(1) => self.op(Opcode::Set1),
            Node::Set(value) => self.op_u8(Opcode::SetU8, value),
            Node::Output => self.op(Opcode::Out),
            Node::Input => self.op(Opcode::Inp),
        }
    }

    fn shift(&mut self, count: i32) -> Result<(), GenerateError> {
        use Opcode::*;

        // Truncation keeps the distance modulo the tape size
        let (magnitude, [unit, byte, word]) = if count >= 0 {
            (count as u16, [Rgt, RgtU8, RgtU16])
        } else {
            (count.wrapping_neg() as u16, [Lft, LftU8, LftU16])
        };

        match magnitude {
            0 => Ok(()),
            1 => self.op(unit),
            2..=255 => self.op_u8(byte, magnitude as u8),
            _ => self.op_u16(word, magnitude),
        }
    }

    fn add(&mut self, count: i32) -> Result<(), GenerateError> {
        use Opcode::*;

        let (magnitude, [unit, byte]) = if count >= 0 {
            (count as u8, [Inc, IncU8])
        } else {
            (count.wrapping_neg() as u8, [Dec, DecU8])
        };

        match magnitude {
            0 => Ok(()),
            1 => self.op(unit),
            _ => self.op_u8(byte, magnitude),
        }
    }

    fn looped(&mut self, body: &[Node]) -> Result<(), GenerateError> {
        let mut inner = Emitter::new();
        inner.nodes(body)?;

        let (width, displacement) = branch_displacement(inner.bytes.len())?;
        let (brz, bnz) = match width {
            Operand::U8 => (Opcode::BrzU8, Opcode::BnzU8),
            _ => (Opcode::BrzU16, Opcode::BnzU16),
        };

        self.branch(brz, width, displacement)?;
        self.reserve(inner.bytes.len())?;
        self.bytes.extend_from_slice(&inner.bytes);
        self.branch(bnz, width, displacement)
    }

    fn branch(
        &mut self,
        opcode: Opcode,
        width: Operand,
        displacement: u16,
    ) -> Result<(), GenerateError> {
        match width {
            Operand::U8 => self.op_u8(opcode, displacement as u8),
            _ => self.op_u16(opcode, displacement),
        }
    }
}
