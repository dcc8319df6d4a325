use std::io::{self, Read, Write};

use static_assertions::const_assert;
use thiserror::Error;
use tracing::debug;

use crate::bytecode::{Bytecode, Opcode};

/// Number of cells on the tape
pub const TAPE_LEN: usize = 1 << 16;

// A u16 pointer reaches every cell, and wraps exactly at the tape's end
const_assert!(tape_len_assert; TAPE_LEN == u16::MAX as usize + 1);

#[derive(Debug, Error)]
pub enum VmError {
    #[error("could not allocate memory tape of {} cells", TAPE_LEN)]
    TapeAllocation,
    #[error("malformed bytecode at offset {offset}")]
    Malformed { offset: usize },
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Memory tape and data pointer of a running program
pub struct Machine {
    tape: Box<[u8]>,
    pointer: u16,
}

impl Machine {
    /// Creates a machine with a zeroed tape, and the pointer on cell 0
    pub fn new() -> Result<Self, VmError> {
        let mut tape = Vec::new();
        tape.try_reserve_exact(TAPE_LEN)
            .map_err(|_| VmError::TapeAllocation)?;
        tape.resize(TAPE_LEN, 0);

        Ok(Machine {
            tape: tape.into_boxed_slice(),
            pointer: 0,
        })
    }

    pub fn pointer(&self) -> u16 {
        self.pointer
    }

    /// Value of the cell under the pointer
    pub fn cell(&self) -> u8 {
        self.tape[self.pointer as usize]
    }

    pub fn tape(&self) -> &[u8] {
        &self.tape
    }

    /// Runs `code` until it halts, reading from `input` and writing to
    /// `output`. Reads past the end of `input` give 0.
    pub fn run<R: Read, W: Write>(
        &mut self,
        code: &Bytecode,
        mut input: R,
        mut output: W,
    ) -> Result<(), VmError> {
        use Opcode::*;

        let code = code.as_bytes();
        let mut ip = 0;

        loop {
            let offset = ip;
            let opcode = Opcode::from_u8(fetch_u8(code, &mut ip)?)
                .ok_or(VmError::Malformed { offset })?;
            let cell = self.pointer as usize;

            match opcode {
                Hlt => {
                    output.flush()?;
                    debug!(pointer = self.pointer, "halted");
                    return Ok(());
                }
                Rgt => self.pointer = self.pointer.wrapping_add(1),
                RgtU8 => self.pointer = self.pointer.wrapping_add(fetch_u8(code, &mut ip)? as u16),
                RgtU16 => self.pointer = self.pointer.wrapping_add(fetch_u16(code, &mut ip)?),
                Lft => self.pointer = self.pointer.wrapping_sub(1),
                LftU8 => self.pointer = self.pointer.wrapping_sub(fetch_u8(code, &mut ip)? as u16),
                LftU16 => self.pointer = self.pointer.wrapping_sub(fetch_u16(code, &mut ip)?),
                Inc => self.tape[cell] = self.tape[cell].wrapping_add(1),
                IncU8 => self.tape[cell] = self.tape[cell].wrapping_add(fetch_u8(code, &mut ip)?),
                Dec => self.tape[cell] = self.tape[cell].wrapping_sub(1),
                DecU8 => self.tape[cell] = self.tape[cell].wrapping_sub(fetch_u8(code, &mut ip)?),
                Set0 => self.tape[cell] = 0,
                Set1 => self.tape[cell] = 1,
                SetU8 => self.tape[cell] = fetch_u8(code, &mut ip)?,
                Out => output.write_all(&[self.tape[cell]])?,
                Inp => {
                    // Prompts should be visible before blocking on input
                    output.flush()?;
                    self.tape[cell] = read_byte(&mut input)?.unwrap_or(0);
                }
                BrzU8 | BrzU16 => {
                    let displacement = fetch_branch(opcode == BrzU16, code, &mut ip)?;
                    if self.tape[cell] == 0 {
                        ip += displacement;
                    }
                }
                BnzU8 | BnzU16 => {
                    let displacement = fetch_branch(opcode == BnzU16, code, &mut ip)?;
                    if self.tape[cell] != 0 {
                        ip = ip
                            .checked_sub(displacement)
                            .ok_or(VmError::Malformed { offset })?;
                    }
                }
            }
        }
    }
}

/// Runs `code` on a fresh machine
pub fn execute<R: Read, W: Write>(code: &Bytecode, input: R, output: W) -> Result<(), VmError> {
    Machine::new()?.run(code, input, output)
}

fn fetch_u8(code: &[u8], ip: &mut usize) -> Result<u8, VmError> {
    let byte = *code.get(*ip).ok_or(VmError::Malformed { offset: *ip })?;
    *ip += 1;
    Ok(byte)
}

fn fetch_u16(code: &[u8], ip: &mut usize) -> Result<u16, VmError> {
    let low = fetch_u8(code, ip)?;
    let high = fetch_u8(code, ip)?;
    Ok(u16::from_le_bytes([low, high]))
}

fn fetch_branch(wide: bool, code: &[u8], ip: &mut usize) -> Result<usize, VmError> {
    if wide {
        Ok(fetch_u16(code, ip)? as usize)
    } else {
        Ok(fetch_u8(code, ip)? as usize)
    }
}

/// Reads one byte, or `None` at end of input
fn read_byte<R: Read>(input: &mut R) -> io::Result<Option<u8>> {
    let mut buffer = [0; 1];
    loop {
        match input.read(&mut buffer) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buffer[0])),
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Opcode::*;
    use pretty_assertions::assert_eq;

    fn run(code: Vec<u8>, input: &[u8]) -> (Machine, Vec<u8>) {
        let mut machine = Machine::new().unwrap();
        let mut output = Vec::new();
        machine
            .run(&Bytecode::from_vec(code), input, &mut output)
            .unwrap();
        (machine, output)
    }

    #[test]
    fn fresh_machine() {
        let machine = Machine::new().unwrap();
        assert_eq!(machine.pointer(), 0);
        assert_eq!(machine.tape().len(), TAPE_LEN);
        assert!(machine.tape().iter().all(|&cell| cell == 0));
    }

    #[test]
    fn halt() {
        let (machine, output) = run(vec![Hlt as u8], b"");
        assert_eq!(machine.pointer(), 0);
        assert_eq!(output, b"");
    }

    #[test]
    fn arithmetic_and_output() {
        let (_, output) = run(
            vec![
                IncU8 as u8, 3, Out as u8, Dec as u8, Out as u8, Inc as u8, Inc as u8, DecU8 as u8,
                4, Out as u8, Hlt as u8,
            ],
            b"",
        );
        assert_eq!(output, vec![3, 2, 0]);
    }

    #[test]
    fn cells_wrap() {
        let (machine, _) = run(vec![Dec as u8, Hlt as u8], b"");
        assert_eq!(machine.cell(), 255);
        let (machine, _) = run(vec![IncU8 as u8, 255, Inc as u8, Hlt as u8], b"");
        assert_eq!(machine.cell(), 0);
    }

    #[test]
    fn pointer_wraps() {
        let (machine, _) = run(vec![Lft as u8, Hlt as u8], b"");
        assert_eq!(machine.pointer(), 65535);
        let (machine, _) = run(vec![RgtU16 as u8, 0xff, 0xff, Rgt as u8, Hlt as u8], b"");
        assert_eq!(machine.pointer(), 0);
        let (machine, _) = run(vec![LftU8 as u8, 2, RgtU16 as u8, 0x02, 0x01, Hlt as u8], b"");
        assert_eq!(machine.pointer(), 256);
    }

    #[test]
    fn cells_are_independent() {
        let (machine, _) = run(
            vec![Inc as u8, Rgt as u8, IncU8 as u8, 7, Lft as u8, Hlt as u8],
            b"",
        );
        assert_eq!(&machine.tape()[..3], &[1, 7, 0]);
        assert_eq!(machine.cell(), 1);
    }

    #[test]
    fn sets() {
        let (machine, _) = run(
            vec![
                IncU8 as u8, 9, Set0 as u8, Rgt as u8, Set1 as u8, Rgt as u8, SetU8 as u8, 42,
                Hlt as u8,
            ],
            b"",
        );
        assert_eq!(&machine.tape()[..3], &[0, 1, 42]);
    }

    #[test]
    fn input() {
        let (_, output) = run(vec![Inp as u8, Out as u8, Inp as u8, Out as u8, Hlt as u8], b"A");
        assert_eq!(output, vec![65, 0]);
    }

    #[test]
    fn input_at_end_overwrites_cell() {
        let (machine, _) = run(vec![IncU8 as u8, 5, Inp as u8, Hlt as u8], b"");
        assert_eq!(machine.cell(), 0);
    }

    #[test]
    fn skipped_loop_lands_after_exit_branch() {
        let (_, output) = run(
            vec![BrzU8 as u8, 3, Out as u8, BnzU8 as u8, 3, Inc as u8, Out as u8, Hlt as u8],
            b"",
        );
        assert_eq!(output, vec![1]);
    }

    #[test]
    fn repeated_loop_lands_after_entry_branch() {
        let (machine, output) = run(
            vec![IncU8 as u8, 3, BrzU8 as u8, 4, Out as u8, Dec as u8, BnzU8 as u8, 4, Hlt as u8],
            b"",
        );
        assert_eq!(output, vec![3, 2, 1]);
        assert_eq!(machine.cell(), 0);
    }

    #[test]
    fn wide_branches() {
        let (_, output) = run(
            vec![
                IncU8 as u8, 2, BrzU16 as u8, 5, 0, Out as u8, Dec as u8, BnzU16 as u8, 5, 0,
                BrzU16 as u8, 4, 0, Out as u8, BnzU16 as u8, 4, 0, Hlt as u8,
            ],
            b"",
        );
        assert_eq!(output, vec![2, 1]);
    }

    #[test]
    fn malformed() {
        let mut output = Vec::new();
        for code in vec![vec![], vec![0xff], vec![IncU8 as u8], vec![Inc as u8, BnzU8 as u8, 9]] {
            let result = execute(&Bytecode::from_vec(code), &b""[..], &mut output);
            assert!(matches!(result, Err(VmError::Malformed { .. })));
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn output_errors_are_reported() {
        let code = Bytecode::from_vec(vec![Out as u8, Hlt as u8]);
        let result = execute(&code, &b""[..], Broken);
        assert!(matches!(result, Err(VmError::Io(_))));
    }
}
