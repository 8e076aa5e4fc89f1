//! Hash-consed interval temporal logic formulas and the rewriting passes that
//! prepare them for SAT encoding.

mod error;
mod normalize;
mod operator;
mod store;

pub use error::FormulaError;
pub use normalize::{
    add_encoding_helpers, encode_derived_operators, normalize, remove_unreachable_subformulas,
    to_positive_normal_form, NormalizedFormula,
};
pub use operator::{Operator, Relation, RELATIONS};
pub use store::{FormulaDisplay, FormulaStore, Handle, Node, NodeId, Operands, PropId};
