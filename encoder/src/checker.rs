use std::fmt;

use abstraction::{AbstractChecker, Truth};
use formula::{FormulaStore, Handle, NodeId, NormalizedFormula, Operator, Relation};
use log::{debug, info};
use logging::Logger;

use crate::backend::{Lit, SatBackend, SolveOutcome};
use crate::certificate::Certificate;
use crate::error::CheckError;
use crate::variables::VariableTable;

/// Size of the SAT instance built so far.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub variables: usize,
    pub clauses: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} SAT variables and {} clauses", self.variables, self.clauses)
    }
}

#[derive(Clone, Debug)]
pub enum Outcome {
    Satisfiable {
        length: usize,
        certificate: Certificate,
        stats: Stats,
    },
    /// No model up to `bound`. This is not a proof of unsatisfiability.
    BoundExhausted { bound: usize, stats: Stats },
}

/// Bounded satisfiability search over growing word lengths.
///
/// One SAT instance is kept for the whole run. Each new length only adds
/// variables and clauses; everything that must not outlive the length
/// (the end of the word, the abstraction facts) goes in as assumptions.
pub struct SatisfiabilityChecker<B> {
    formula: NormalizedFormula,
    // propositions first, then compound nodes
    handles: Vec<Handle>,
    backend: B,
    variables: VariableTable,
    assumptions: Vec<Lit>,
    encoded: Option<usize>,
    clauses: usize,
    logger: Logger,
}

impl<B: SatBackend> SatisfiabilityChecker<B> {
    pub fn new(formula: NormalizedFormula, backend: B) -> Self {
        let store = formula.store();
        let mut handles: Vec<Handle> = store
            .propositions()
            .into_iter()
            .map(|(id, _)| Handle::Proposition(id))
            .collect();
        handles.extend(store.nodes().map(|(id, _)| Handle::Compound(id)));
        SatisfiabilityChecker {
            formula,
            handles,
            backend,
            variables: VariableTable::new(),
            assumptions: Vec::new(),
            encoded: None,
            clauses: 0,
            logger: Logger::default(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn formula(&self) -> &NormalizedFormula {
        &self.formula
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// The longest word length encoded so far.
    pub fn encoded_length(&self) -> Option<usize> {
        self.encoded
    }

    pub fn stats(&self) -> Stats {
        Stats {
            variables: self.variables.len(),
            clauses: self.clauses,
        }
    }

    /// Tries lengths `1, 2, …` until the formula is satisfiable or the length
    /// would exceed `max_bound`. `None` searches without a bound.
    pub fn run(&mut self, max_bound: Option<usize>) -> Result<Outcome, CheckError> {
        if max_bound == Some(0) {
            return Err(CheckError::InvalidBound);
        }
        info!("searching with backend {}", self.backend.name());
        loop {
            let length = self.encoded.map_or(1, |previous| previous + 1);
            if let Some(bound) = max_bound {
                if length > bound {
                    return Ok(Outcome::BoundExhausted {
                        bound,
                        stats: self.stats(),
                    });
                }
            }
            self.logger.info(&format!("Trying a word of length {length}"));
            self.extend_word_length_bound(length);
            if self.solve()? == SolveOutcome::Satisfiable {
                let certificate = self.certificate()?;
                return Ok(Outcome::Satisfiable {
                    length,
                    certificate,
                    stats: self.stats(),
                });
            }
        }
    }

    /// Adds the variables and clauses for words of length `length` and
    /// prepares the assumptions that cut the word off at that length.
    pub fn extend_word_length_bound(&mut self, length: usize) {
        assert!(
            length >= 1 && self.encoded.map_or(true, |previous| length > previous),
            "word lengths must grow, got {length} after {:?}",
            self.encoded
        );
        let previous = self.encoded;
        self.variables.extend(&self.handles, length, &mut self.backend);

        let store = self.formula.store();
        let root = self.formula.root();
        let mut emitter = ClauseEmitter {
            store,
            variables: &self.variables,
            backend: &mut self.backend,
            emitted: 0,
        };
        // intervals ending at the previous length were cut off by assumptions so far
        for to in previous.unwrap_or(0)..length {
            for from in 0..=to {
                for (id, _) in store.nodes() {
                    emitter.encode(id, from, to);
                }
            }
        }
        if previous.is_none() {
            let root = emitter.lit(root, 0, 0);
            emitter.clause(&[root]);
        }
        for position in previous.unwrap_or(0)..length {
            let exists = self.variables.boundary(position).positive();
            emitter.clause(&[exists]);
        }
        let emitted = emitter.emitted;
        self.clauses += emitted;

        self.assumptions.clear();
        for &handle in &self.handles {
            for from in 0..=length {
                self.assumptions.push(self.variables.var(handle, from, length).negative());
            }
        }
        self.assumptions.push(self.variables.boundary(length).negative());

        let abstraction = AbstractChecker::new(store, root, length);
        let mut fixed = 0;
        for (id, _) in store.nodes() {
            for from in 0..length {
                for to in from..length {
                    let var = self.variables.var(Handle::Compound(id), from, to);
                    let lit = match abstraction.value(id, from, to) {
                        None | Some(Truth::False) => var.negative(),
                        Some(Truth::True) => var.positive(),
                        Some(Truth::Unknown) => continue,
                    };
                    self.assumptions.push(lit);
                    fixed += 1;
                }
            }
        }
        debug!(
            "length {length}: {emitted} new clauses, {} assumptions, {fixed} fixed by abstraction",
            self.assumptions.len()
        );
        self.encoded = Some(length);
    }

    /// Solves under the assumptions of the current length.
    pub fn solve(&mut self) -> Result<SolveOutcome, CheckError> {
        for &lit in &self.assumptions {
            self.backend.assume(lit);
        }
        let outcome = self.backend.solve()?;
        debug!("length {:?}: {:?} ({})", self.encoded, outcome, self.stats());
        Ok(outcome)
    }

    /// Reads the propositions off the model of the last satisfiable solve.
    pub fn certificate(&self) -> Result<Certificate, CheckError> {
        let length = self.encoded.unwrap_or(0);
        let store = self.formula.store();
        let mut propositions = Vec::new();
        for (id, name) in store.propositions() {
            let handle = Handle::Proposition(id);
            let mut intervals = Vec::new();
            for from in 0..length {
                for to in from..length {
                    if self.backend.value(self.variables.var(handle, from, to))? {
                        intervals.push((from, to));
                    }
                }
            }
            propositions.push((name.to_owned(), intervals));
        }
        Ok(Certificate::new(length, propositions))
    }
}

/// Emits the defining clauses of one node on one interval.
struct ClauseEmitter<'a, B> {
    store: &'a FormulaStore,
    variables: &'a VariableTable,
    backend: &'a mut B,
    emitted: usize,
}

impl<B: SatBackend> ClauseEmitter<'_, B> {
    fn lit(&self, handle: Handle, from: usize, to: usize) -> Lit {
        self.variables.var(handle, from, to).positive()
    }

    fn clause(&mut self, lits: &[Lit]) {
        self.backend.add_clause(lits);
        self.emitted += 1;
    }

    fn implies_any(&mut self, premise: Lit, targets: &[Lit]) {
        let mut clause = Vec::with_capacity(targets.len() + 1);
        clause.push(!premise);
        clause.extend_from_slice(targets);
        self.clause(&clause);
    }

    fn implies_each(&mut self, premise: Lit, targets: &[Lit]) {
        for &target in targets {
            self.clause(&[!premise, target]);
        }
    }

    fn operand(&self, id: NodeId) -> Handle {
        self.store
            .operand_of(id)
            .unwrap_or_else(|err| panic!("malformed formula: {err}"))
    }

    fn encode(&mut self, id: NodeId, from: usize, to: usize) {
        let store = self.store;
        let node = store.node(id);
        let this = Handle::Compound(id);
        let v = self.lit(this, from, to);
        match node.operator {
            Operator::And => {
                let children: Vec<Lit> = node.operands.iter().map(|&o| self.lit(o, from, to)).collect();
                self.implies_each(v, &children);
            }
            Operator::Or => {
                let children: Vec<Lit> = node.operands.iter().map(|&o| self.lit(o, from, to)).collect();
                self.implies_any(v, &children);
            }
            Operator::Not => {
                let negated = match node.single_operand() {
                    Some(p @ Handle::Proposition(_)) => self.lit(p, from, to),
                    _ => panic!(
                        "NOT (operator code {}) applied to a non-atomic operand in node {id}",
                        node.operator.code()
                    ),
                };
                self.clause(&[v, negated]);
                self.clause(&[!v, !negated]);
            }
            Operator::Diamond(Relation::A) | Operator::Box(Relation::A) => {
                let companion = match node.operator {
                    Operator::Diamond(_) => Operator::Diamond(Relation::BBar),
                    _ => Operator::Box(Relation::BBar),
                };
                let companion = store
                    .lookup(companion, node.operands.iter().copied())
                    .unwrap_or_else(|| panic!("missing {companion} companion for {} node {id}", node.operator));
                let target = self.lit(companion, to, to);
                self.clause(&[!v, target]);
            }
            Operator::Diamond(Relation::B) | Operator::Box(Relation::B) => {
                let op = self.operand(id);
                let targets: Vec<Lit> = (from..to).rev().map(|k| self.lit(op, from, k)).collect();
                self.modal(node.operator, v, &targets);
            }
            Operator::Diamond(Relation::E) | Operator::Box(Relation::E) => {
                let op = self.operand(id);
                let targets: Vec<Lit> = (from + 1..=to).map(|k| self.lit(op, k, to)).collect();
                self.modal(node.operator, v, &targets);
            }
            Operator::Diamond(Relation::ABar) | Operator::Box(Relation::ABar) => {
                let op = self.operand(id);
                let targets: Vec<Lit> = (0..from).map(|k| self.lit(op, k, from)).collect();
                self.modal(node.operator, v, &targets);
            }
            Operator::Diamond(Relation::EBar) | Operator::Box(Relation::EBar) => {
                let op = self.operand(id);
                let targets: Vec<Lit> = (0..from).rev().map(|k| self.lit(op, k, to)).collect();
                self.modal(node.operator, v, &targets);
            }
            Operator::Diamond(Relation::BBar) => {
                let op = self.operand(id);
                let extended = self.lit(this, from, to + 1);
                let operand = self.lit(op, from, to + 1);
                self.clause(&[!v, extended, operand]);
            }
            // only binding while the word reaches position to+1
            Operator::Box(Relation::BBar) => {
                let op = self.operand(id);
                let extended = self.lit(this, from, to + 1);
                let operand = self.lit(op, from, to + 1);
                let longer = self.variables.boundary(to + 1).positive();
                self.clause(&[!v, extended, !longer]);
                self.clause(&[!v, !longer, operand]);
            }
            derived => panic!(
                "operator {derived} (code {}) cannot be encoded, it must be expanded first",
                derived.code()
            ),
        }
    }

    fn modal(&mut self, operator: Operator, v: Lit, targets: &[Lit]) {
        match operator {
            Operator::Diamond(_) => self.implies_any(v, targets),
            _ => self.implies_each(v, targets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Var;
    use crate::error::BackendError;
    use crate::VarisatBackend;
    use formula::normalize;

    fn normalized(source: &str) -> NormalizedFormula {
        let (store, root) = parser::parse(source).unwrap();
        normalize(store, root).unwrap()
    }

    fn check(source: &str, bound: Option<usize>) -> Outcome {
        SatisfiabilityChecker::new(normalized(source), VarisatBackend::new())
            .with_logger(Logger::quiet())
            .run(bound)
            .unwrap()
    }

    fn satisfiable(outcome: Outcome) -> (usize, Certificate) {
        match outcome {
            Outcome::Satisfiable {
                length, certificate, ..
            } => (length, certificate),
            other => panic!("expected a model, got {other:?}"),
        }
    }

    #[test]
    fn single_proposition_holds_on_the_only_interval() {
        let (length, certificate) = satisfiable(check("p", None));
        assert_eq!(length, 1);
        assert_eq!(certificate.intervals("p"), Some(&[(0, 0)][..]));
    }

    #[test]
    fn contradiction_exhausts_the_bound() {
        match check("p & ~p", Some(3)) {
            Outcome::BoundExhausted { bound, stats } => {
                assert_eq!(bound, 3);
                assert!(stats.clauses > 0);
            }
            other => panic!("expected bound exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn after_needs_a_word_of_length_two() {
        let (length, certificate) = satisfiable(check("<A> p", Some(4)));
        assert_eq!(length, 2);
        assert!(certificate.holds("p", 0, 1));
    }

    #[test]
    fn box_begins_is_vacuous_on_a_point() {
        let (length, _) = satisfiable(check("[B] p", None));
        assert_eq!(length, 1);
    }

    #[test]
    fn during_is_encoded_the_same_either_way() {
        let plain = normalized("<A><D> p");

        let mut store = formula::FormulaStore::new();
        let p = store.proposition("p");
        store.diamond(Relation::E, p);
        let root = parser::parse_into(&mut store, "<A><D> p").unwrap();
        let shared = normalize(store, root).unwrap();
        assert_ne!(plain.store().table(), shared.store().table());

        for formula in [plain, shared] {
            let outcome = SatisfiabilityChecker::new(formula, VarisatBackend::new())
                .with_logger(Logger::quiet())
                .run(Some(5))
                .unwrap();
            let (length, certificate) = satisfiable(outcome);
            assert_eq!(length, 3);
            assert!(certificate.holds("p", 1, 1));
        }
    }

    #[test]
    fn later_needs_a_gap() {
        let (length, _) = satisfiable(check("<L> p", None));
        assert_eq!(length, 3);
    }

    #[test]
    fn nothing_lies_before_the_first_position() {
        assert!(matches!(
            check("<A'> p | <E'> p", Some(2)),
            Outcome::BoundExhausted { bound: 2, .. }
        ));
    }

    #[test]
    fn extensions_must_agree_with_their_universal_dual() {
        assert!(matches!(
            check("<B'> p & [B'] ~p", Some(3)),
            Outcome::BoundExhausted { .. }
        ));
        let (length, certificate) = satisfiable(check("<B'> p & [B'] p & ~p", None));
        assert_eq!(length, 2);
        assert!(certificate.holds("p", 0, 1));
        assert!(!certificate.holds("p", 0, 0));
    }

    #[test]
    fn box_after_constrains_every_later_interval() {
        let (length, certificate) = satisfiable(check("[A] p & <A> q & ~p", None));
        assert_eq!(length, 2);
        assert!(certificate.holds("p", 0, 1));
        assert!(certificate.holds("q", 0, 1));
    }

    #[test]
    fn zero_bound_is_rejected() {
        let mut checker = SatisfiabilityChecker::new(normalized("p"), VarisatBackend::new());
        assert!(matches!(checker.run(Some(0)), Err(CheckError::InvalidBound)));
    }

    #[derive(Default)]
    struct Recording {
        inner: VarisatBackend,
        clauses: Vec<Vec<Lit>>,
        current: Vec<Lit>,
    }

    impl SatBackend for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn new_var(&mut self) -> Var {
            self.inner.new_var()
        }

        fn add_literal(&mut self, lit: Lit) {
            self.current.push(lit);
            self.inner.add_literal(lit);
        }

        fn end_clause(&mut self) {
            self.clauses.push(std::mem::take(&mut self.current));
            self.inner.end_clause();
        }

        fn assume(&mut self, lit: Lit) {
            self.inner.assume(lit);
        }

        fn solve(&mut self) -> Result<SolveOutcome, BackendError> {
            self.inner.solve()
        }

        fn value(&self, var: Var) -> Result<bool, BackendError> {
            self.inner.value(var)
        }
    }

    #[test]
    fn longer_words_only_add_variables_and_clauses() {
        let formula = normalized("<A>(p | <B> q) & [E] ~p & <D'> q");
        let mut checker = SatisfiabilityChecker::new(formula, Recording::default()).with_logger(Logger::quiet());
        let mut clauses: Vec<Vec<Lit>> = Vec::new();
        let mut variables = Vec::new();
        for length in 1..=4 {
            checker.extend_word_length_bound(length);
            checker.solve().unwrap();
            let now = &checker.backend().clauses;
            assert!(now.len() > clauses.len());
            assert_eq!(&now[..clauses.len()], &clauses[..]);
            for &((handle, from, to), var) in &variables {
                assert_eq!(checker.variables().get(handle, from, to), Some(var));
            }
            assert_eq!(checker.stats().clauses, now.len());
            clauses = now.clone();
            variables = checker.variables().iter().collect();
        }
    }
}
