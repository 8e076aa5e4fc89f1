//! Incremental SAT encoding of normalized interval temporal logic formulas
//! and the bounded search over word lengths.

mod backend;
mod certificate;
mod checker;
mod error;
mod variables;
mod varisat_backend;
#[cfg(feature = "z3")]
mod z3_backend;

pub use backend::{Lit, SatBackend, SolveOutcome, Var};
pub use certificate::Certificate;
pub use checker::{Outcome, SatisfiabilityChecker, Stats};
pub use error::{BackendError, CheckError};
pub use variables::VariableTable;
pub use varisat_backend::VarisatBackend;
#[cfg(feature = "z3")]
pub use z3_backend::Z3Backend;
