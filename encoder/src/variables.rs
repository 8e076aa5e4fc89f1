use formula::Handle;
use indexmap::IndexMap;
use log::debug;

use crate::backend::{SatBackend, Var};

/// Maps `(handle, from, to)` triples to SAT variables.
///
/// Append-only for the whole run: a triple keeps the variable it was first
/// given, and new variables only appear for intervals ending beyond the
/// previously allocated length.
#[derive(Debug, Default)]
pub struct VariableTable {
    variables: IndexMap<(Handle, usize, usize), Var>,
    // boundary[k] holds iff the word has a position k
    boundary: Vec<Var>,
    allocated: Option<usize>,
}

impl VariableTable {
    pub fn new() -> Self {
        VariableTable::default()
    }

    /// Allocates variables for every interval `[i,j]` with `i <= j <= length`
    /// that has none yet, and boundary variables up to position `length`.
    /// Returns the number of new variables.
    pub fn extend<B: SatBackend>(&mut self, handles: &[Handle], length: usize, backend: &mut B) -> usize {
        let before = self.len();
        for &handle in handles {
            for from in 0..=length {
                for to in from..=length {
                    if self.allocated.map_or(true, |previous| to > previous) {
                        let var = backend.new_var();
                        let fresh = self.variables.insert((handle, from, to), var).is_none();
                        debug_assert!(fresh, "variable for {handle:?} on [{from},{to}] allocated twice");
                    }
                }
            }
        }
        while self.boundary.len() < length + 1 {
            self.boundary.push(backend.new_var());
        }
        self.allocated = Some(self.allocated.map_or(length, |previous| previous.max(length)));
        let added = self.len() - before;
        debug!("allocated {added} SAT variables for length {length}");
        added
    }

    pub fn get(&self, handle: Handle, from: usize, to: usize) -> Option<Var> {
        self.variables.get(&(handle, from, to)).copied()
    }

    /// Like [`VariableTable::get`], for triples the encoding relies on.
    pub fn var(&self, handle: Handle, from: usize, to: usize) -> Var {
        self.get(handle, from, to)
            .unwrap_or_else(|| panic!("no SAT variable for {handle:?} on [{from},{to}]"))
    }

    pub fn boundary(&self, position: usize) -> Var {
        *self
            .boundary
            .get(position)
            .unwrap_or_else(|| panic!("no boundary variable for position {position}"))
    }

    /// Largest length variables were allocated for.
    pub fn allocated(&self) -> Option<usize> {
        self.allocated
    }

    pub fn iter(&self) -> impl Iterator<Item = ((Handle, usize, usize), Var)> + '_ {
        self.variables.iter().map(|(&key, &var)| (key, var))
    }

    /// Number of variables, boundary variables included.
    pub fn len(&self) -> usize {
        self.variables.len() + self.boundary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
