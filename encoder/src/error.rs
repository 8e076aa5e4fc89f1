use thiserror::Error;

use crate::backend::Var;

/// Violations of the SAT backend contract.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("solver returned neither SAT nor UNSAT: {0}")]
    Indeterminate(String),
    #[error("no model value for SAT variable {0}")]
    MissingValue(Var),
    #[error("solver failure: {0}")]
    Solver(String),
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("maximum bound must be at least 1")]
    InvalidBound,
    #[error(transparent)]
    Backend(#[from] BackendError),
}
