use log::trace;
use z3::ast::Bool;
use z3::{Context, Model, SatResult, Solver};

use crate::backend::{Lit, SatBackend, SolveOutcome, Var};
use crate::error::BackendError;

/// Backend on the z3 solver, one boolean constant per SAT variable.
pub struct Z3Backend<'ctx> {
    ctx: &'ctx Context,
    solver: Solver<'ctx>,
    vars: Vec<Bool<'ctx>>,
    clause: Vec<Bool<'ctx>>,
    assumptions: Vec<Bool<'ctx>>,
    model: Option<Model<'ctx>>,
}

impl<'ctx> Z3Backend<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        Z3Backend {
            ctx,
            solver: Solver::new(ctx),
            vars: Vec::new(),
            clause: Vec::new(),
            assumptions: Vec::new(),
            model: None,
        }
    }

    fn literal(&self, lit: Lit) -> Bool<'ctx> {
        let var = &self.vars[lit.var().index()];
        if lit.is_positive() {
            var.clone()
        } else {
            var.not()
        }
    }
}

impl<'ctx> SatBackend for Z3Backend<'ctx> {
    fn name(&self) -> &'static str {
        "z3"
    }

    fn new_var(&mut self) -> Var {
        let var = Var::from_index(self.vars.len());
        self.vars.push(Bool::new_const(self.ctx, format!("v{var}")));
        var
    }

    fn add_literal(&mut self, lit: Lit) {
        let literal = self.literal(lit);
        self.clause.push(literal);
    }

    fn end_clause(&mut self) {
        let literals: Vec<&Bool<'ctx>> = self.clause.iter().collect();
        self.solver.assert(&Bool::or(self.ctx, &literals));
        self.clause.clear();
    }

    fn assume(&mut self, lit: Lit) {
        let literal = self.literal(lit);
        self.assumptions.push(literal);
    }

    fn solve(&mut self) -> Result<SolveOutcome, BackendError> {
        trace!("z3: solving under {} assumptions", self.assumptions.len());
        let result = self.solver.check_assumptions(&self.assumptions);
        self.assumptions.clear();
        self.model = None;
        match result {
            SatResult::Sat => {
                self.model = Some(
                    self.solver
                        .get_model()
                        .ok_or_else(|| BackendError::Indeterminate("SAT without a model".to_owned()))?,
                );
                Ok(SolveOutcome::Satisfiable)
            }
            SatResult::Unsat => Ok(SolveOutcome::Unsatisfiable),
            SatResult::Unknown => Err(BackendError::Indeterminate(
                self.solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "unknown".to_owned()),
            )),
        }
    }

    fn value(&self, var: Var) -> Result<bool, BackendError> {
        let model = self.model.as_ref().ok_or(BackendError::MissingValue(var))?;
        let constant = self.vars.get(var.index()).ok_or(BackendError::MissingValue(var))?;
        model
            .eval(constant, true)
            .and_then(|value| value.as_bool())
            .ok_or(BackendError::MissingValue(var))
    }
}
