use log::trace;
use varisat::{ExtendFormula, Solver};

use crate::backend::{Lit, SatBackend, SolveOutcome, Var};
use crate::error::BackendError;

fn to_varisat(lit: Lit) -> varisat::Lit {
    varisat::Lit::from_var(varisat::Var::from_index(lit.var().index()), lit.is_positive())
}

/// The default backend: varisat, a pure Rust CDCL solver.
pub struct VarisatBackend {
    solver: Solver<'static>,
    clause: Vec<varisat::Lit>,
    assumptions: Vec<varisat::Lit>,
    model: Option<Vec<bool>>,
    variables: usize,
}

impl VarisatBackend {
    pub fn new() -> Self {
        VarisatBackend {
            solver: Solver::new(),
            clause: Vec::new(),
            assumptions: Vec::new(),
            model: None,
            variables: 0,
        }
    }
}

impl Default for VarisatBackend {
    fn default() -> Self {
        VarisatBackend::new()
    }
}

impl SatBackend for VarisatBackend {
    fn name(&self) -> &'static str {
        "varisat"
    }

    fn new_var(&mut self) -> Var {
        self.variables += 1;
        Var::from_index(self.solver.new_var().index())
    }

    fn add_literal(&mut self, lit: Lit) {
        self.clause.push(to_varisat(lit));
    }

    fn end_clause(&mut self) {
        self.solver.add_clause(&self.clause);
        self.clause.clear();
    }

    fn assume(&mut self, lit: Lit) {
        self.assumptions.push(to_varisat(lit));
    }

    fn solve(&mut self) -> Result<SolveOutcome, BackendError> {
        // varisat keeps assumptions until replaced, so hand over and forget ours
        self.solver.assume(&self.assumptions);
        trace!("varisat: solving under {} assumptions", self.assumptions.len());
        self.assumptions.clear();
        self.model = None;
        match self.solver.solve() {
            Ok(true) => {
                let model = self
                    .solver
                    .model()
                    .ok_or_else(|| BackendError::Indeterminate("SAT without a model".to_owned()))?;
                // variables no clause mentions are don't-cares
                let mut values = vec![false; self.variables];
                for lit in model {
                    let index = lit.var().index();
                    if values.len() <= index {
                        values.resize(index + 1, false);
                    }
                    values[index] = lit.is_positive();
                }
                self.model = Some(values);
                Ok(SolveOutcome::Satisfiable)
            }
            Ok(false) => Ok(SolveOutcome::Unsatisfiable),
            Err(err) => Err(BackendError::Solver(err.to_string())),
        }
    }

    fn value(&self, var: Var) -> Result<bool, BackendError> {
        self.model
            .as_ref()
            .and_then(|model| model.get(var.index()).copied())
            .ok_or(BackendError::MissingValue(var))
    }
}
