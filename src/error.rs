use thiserror::Error;

use crate::generator::GenerateError;
use crate::parser::ParseErrors;

/// Failure of any stage of compilation
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum CompileError {
    #[error("{0}")]
    Parse(#[from] ParseErrors),
    #[error("{0}")]
    Generate(#[from] GenerateError),
}
