use std::fmt;
use std::ops::Not;

use crate::error::BackendError;

/// A SAT variable. Numbered densely from zero in allocation order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

impl Var {
    pub fn from_index(index: usize) -> Var {
        Var(u32::try_from(index).expect("SAT variable index exceeds u32::MAX"))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn positive(self) -> Lit {
        Lit { var: self, positive: true }
    }

    pub fn negative(self) -> Lit {
        Lit { var: self, positive: false }
    }
}

impl fmt::Display for Var {
    // DIMACS numbering
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 + 1)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Lit {
    var: Var,
    positive: bool,
}

impl Lit {
    pub fn var(self) -> Var {
        self.var
    }

    pub fn is_positive(self) -> bool {
        self.positive
    }

    /// The signed, one-based DIMACS form of the literal.
    pub fn to_dimacs(self) -> i64 {
        let number = self.var.index() as i64 + 1;
        if self.positive {
            number
        } else {
            -number
        }
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit {
            var: self.var,
            positive: !self.positive,
        }
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolveOutcome {
    Satisfiable,
    Unsatisfiable,
}

/// An incremental SAT solver.
///
/// Clauses are permanent. Assumptions hold for the next call to
/// [`SatBackend::solve`] only and are dropped afterwards. Model values are
/// only defined after a satisfiable answer. The solver is released on drop.
pub trait SatBackend {
    fn name(&self) -> &'static str;

    fn new_var(&mut self) -> Var;

    /// Appends a literal to the clause under construction.
    fn add_literal(&mut self, lit: Lit);

    /// Closes the clause under construction and adds it permanently.
    fn end_clause(&mut self);

    fn add_clause(&mut self, lits: &[Lit]) {
        for &lit in lits {
            self.add_literal(lit);
        }
        self.end_clause();
    }

    fn assume(&mut self, lit: Lit);

    fn solve(&mut self) -> Result<SolveOutcome, BackendError>;

    fn value(&self, var: Var) -> Result<bool, BackendError>;
}
