//! Three-valued structural evaluation of normalized formulas over the
//! intervals of a word of fixed length.

mod checker;
mod truth;

pub use checker::AbstractChecker;
pub use truth::Truth;
