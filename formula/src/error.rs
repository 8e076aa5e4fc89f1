use thiserror::Error;

use crate::operator::Operator;
use crate::store::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("node {node} ({operator}) has {found} operands where exactly one is expected")]
    Arity {
        node: NodeId,
        operator: Operator,
        found: usize,
    },

    #[error("unknown temporal operator {0}")]
    UnknownRelation(String),
}
