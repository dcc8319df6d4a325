//! Compiler from brainfuck source to a compact bytecode, and a virtual
//! machine to run it.
//!
//! ```
//! let code = brainiac::compile(b"++++++++[>++++++++<-]>+.").unwrap();
//! let mut output = Vec::new();
//! brainiac::execute(&code, &b""[..], &mut output).unwrap();
//! assert_eq!(output, b"A");
//! ```

use tracing::{debug, info};

pub mod bytecode;
mod error;
mod generator;
mod ir;
pub mod optimizer;
mod options;
mod parser;
mod scanner;
mod token;
mod vm;

pub use bytecode::{Bytecode, Instruction, Opcode, Operand};
pub use error::CompileError;
pub use generator::{branch_displacement, generate, GenerateError, MAX_LOOP_BODY};
pub use ir::{Node, Program};
pub use optimizer::{optimize, Convergence};
pub use options::{CompileOptions, DEFAULT_MAX_LOOP_DEPTH, DEFAULT_MAX_OPTIMIZER_ITERATIONS};
pub use parser::{parse, parse_scanner, ParseError, ParseErrorKind, ParseErrors};
pub use scanner::{Position, Scanner};
pub use token::Token;
pub use vm::{execute, Machine, VmError, TAPE_LEN};

/// Compiles source code with the default options
pub fn compile(code: &[u8]) -> Result<Bytecode, CompileError> {
    compile_with(Scanner::new(code), &CompileOptions::default())
}

/// Compiles the source read by `scanner`
pub fn compile_with<I>(
    scanner: Scanner<I>,
    options: &CompileOptions,
) -> Result<Bytecode, CompileError>
where
    I: Iterator<Item = u8>,
{
    let program = compile_program(scanner, options)?;
    info!("Compiling...");
    Ok(generate(&program)?)
}

/// Parses the source read by `scanner`, and optimizes it if `options` ask
/// for it
pub fn compile_program<I>(
    scanner: Scanner<I>,
    options: &CompileOptions,
) -> Result<Program, CompileError>
where
    I: Iterator<Item = u8>,
{
    let mut program = parse_scanner(scanner, options.max_loop_depth)?;
    if options.optimize {
        let convergence = optimize(&mut program, options.max_optimizer_iterations);
        debug!(?convergence, "optimized");
    }
    Ok(program)
}
