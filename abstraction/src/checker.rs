use std::collections::HashMap;

use formula::{FormulaStore, Handle, Node, NodeId, Operator, Relation};
use log::debug;

use crate::truth::Truth;

const RED_ZONE: usize = 32 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

/// Memoized three-valued evaluation of a normalized formula on the intervals
/// of a word of one fixed length.
///
/// Built fresh for every candidate length: the boundary rules make values
/// length-dependent, so a checker never outlives its iteration. Only the
/// triples reachable from the root at `[0,0]` are evaluated; everything else
/// is reported as unreached.
pub struct AbstractChecker<'a> {
    store: &'a FormulaStore,
    word_length: usize,
    cache: HashMap<(NodeId, usize, usize), Truth>,
    root_value: Truth,
}

impl<'a> AbstractChecker<'a> {
    pub fn new(store: &'a FormulaStore, root: Handle, word_length: usize) -> Self {
        assert!(word_length >= 1, "words have at least one position");
        let mut checker = AbstractChecker {
            store,
            word_length,
            cache: HashMap::new(),
            root_value: Truth::Unknown,
        };
        checker.root_value = checker.evaluate(root, 0, 0);
        debug!(
            "abstraction at length {}: {} triples, {} fixed, root {}",
            word_length,
            checker.cache.len(),
            checker.fixed().count(),
            checker.root_value
        );
        checker
    }

    pub fn word_length(&self) -> usize {
        self.word_length
    }

    /// Value of the root formula on `[0,0]`.
    pub fn root_value(&self) -> Truth {
        self.root_value
    }

    /// `None` if the triple was never reached from the root.
    pub fn value(&self, node: NodeId, from: usize, to: usize) -> Option<Truth> {
        self.cache.get(&(node, from, to)).copied()
    }

    /// All reached triples whose value does not depend on the valuation.
    pub fn fixed(&self) -> impl Iterator<Item = (NodeId, usize, usize, bool)> + '_ {
        self.cache
            .iter()
            .filter_map(|(&(node, from, to), value)| value.as_bool().map(|b| (node, from, to, b)))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn evaluate(&mut self, handle: Handle, from: usize, to: usize) -> Truth {
        let id = match handle {
            Handle::Proposition(_) => return Truth::Unknown,
            Handle::Compound(id) => id,
        };
        assert!(
            from <= to && to < self.word_length,
            "interval [{from},{to}] outside a word of length {}",
            self.word_length
        );
        if let Some(&known) = self.cache.get(&(id, from, to)) {
            return known;
        }
        let result = stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.compute(id, from, to));
        self.cache.insert((id, from, to), result);
        result
    }

    fn compute(&mut self, id: NodeId, from: usize, to: usize) -> Truth {
        let store = self.store;
        let node = store.node(id);
        let n = self.word_length;
        match node.operator {
            Operator::And => {
                if is_contradiction(store, node) {
                    return Truth::False;
                }
                let mut result = Truth::True;
                for &operand in &node.operands {
                    result &= self.evaluate(operand, from, to);
                }
                result
            }
            Operator::Or => {
                let mut result = Truth::False;
                for &operand in &node.operands {
                    result |= self.evaluate(operand, from, to);
                }
                result
            }
            Operator::Not => match node.single_operand() {
                Some(Handle::Proposition(_)) => Truth::Unknown,
                _ => panic!(
                    "NOT (operator code {}) applied to a non-atomic operand in node {id}",
                    node.operator.code()
                ),
            },
            Operator::Diamond(Relation::A) | Operator::Box(Relation::A) => {
                let companion = match node.operator {
                    Operator::Diamond(_) => Operator::Diamond(Relation::BBar),
                    _ => Operator::Box(Relation::BBar),
                };
                let companion = store
                    .lookup(companion, node.operands.iter().copied())
                    .unwrap_or_else(|| panic!("missing {companion} companion for {} node {id}", node.operator));
                self.evaluate(companion, to, to)
            }
            Operator::Diamond(Relation::B) => {
                let operand = self.operand(id);
                let mut result = Truth::False;
                for k in (from..to).rev() {
                    result |= self.evaluate(operand, from, k);
                }
                result
            }
            Operator::Box(Relation::B) => {
                let operand = self.operand(id);
                let mut result = Truth::True;
                for k in (from..to).rev() {
                    result &= self.evaluate(operand, from, k);
                }
                result
            }
            Operator::Diamond(Relation::E) => {
                let operand = self.operand(id);
                let mut result = Truth::False;
                for k in from + 1..=to {
                    result |= self.evaluate(operand, k, to);
                }
                result
            }
            Operator::Box(Relation::E) => {
                let operand = self.operand(id);
                let mut result = Truth::True;
                for k in from + 1..=to {
                    result &= self.evaluate(operand, k, to);
                }
                result
            }
            Operator::Diamond(Relation::ABar) => {
                let operand = self.operand(id);
                let mut result = Truth::False;
                for k in 0..from {
                    result |= self.evaluate(operand, k, from);
                }
                result
            }
            Operator::Box(Relation::ABar) => {
                let operand = self.operand(id);
                let mut result = Truth::True;
                for k in 0..from {
                    result &= self.evaluate(operand, k, from);
                }
                result
            }
            Operator::Diamond(Relation::EBar) => {
                let operand = self.operand(id);
                let mut result = Truth::False;
                for k in (0..from).rev() {
                    result |= self.evaluate(operand, k, to);
                }
                result
            }
            Operator::Box(Relation::EBar) => {
                let operand = self.operand(id);
                let mut result = Truth::True;
                for k in (0..from).rev() {
                    result &= self.evaluate(operand, k, to);
                }
                result
            }
            // The word cannot be extended past its last position.
            Operator::Diamond(Relation::BBar) => {
                if to + 1 >= n {
                    return Truth::False;
                }
                let operand = self.operand(id);
                let extended = self.evaluate(Handle::Compound(id), from, to + 1);
                extended | self.evaluate(operand, from, to + 1)
            }
            Operator::Box(Relation::BBar) => {
                if to + 1 >= n {
                    return Truth::True;
                }
                let operand = self.operand(id);
                let extended = self.evaluate(Handle::Compound(id), from, to + 1);
                extended & self.evaluate(operand, from, to + 1)
            }
            derived => panic!(
                "operator {derived} (code {}) must be expanded before abstraction",
                derived.code()
            ),
        }
    }

    fn operand(&self, id: NodeId) -> Handle {
        self.store.operand_of(id).unwrap_or_else(|err| panic!("malformed formula: {err}"))
    }
}

/// `p & ~p` on the same proposition.
fn is_contradiction(store: &FormulaStore, node: &Node) -> bool {
    if node.operands.len() != 2 {
        return false;
    }
    let mut positive = None;
    let mut negative = None;
    for &operand in &node.operands {
        match operand {
            Handle::Proposition(p) => positive = Some(p),
            Handle::Compound(c) => {
                let inner = store.node(c);
                if let (Operator::Not, Some(Handle::Proposition(p))) = (inner.operator, inner.single_operand()) {
                    negative = Some(p);
                }
            }
        }
    }
    matches!((positive, negative), (Some(p), Some(q)) if p == q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula::{normalize, NormalizedFormula, RELATIONS};
    use proptest::prelude::*;

    fn normalized(source: &str) -> NormalizedFormula {
        let (store, root) = parser::parse(source).unwrap();
        normalize(store, root).unwrap()
    }

    fn find(store: &FormulaStore, rendered: &str) -> NodeId {
        store
            .nodes()
            .map(|(id, _)| id)
            .find(|&id| store.display(Handle::Compound(id)).to_string() == rendered)
            .unwrap_or_else(|| panic!("no node renders as {rendered}"))
    }

    #[test]
    fn propositions_are_unknown_and_not_cached() {
        let formula = normalized("p");
        let checker = AbstractChecker::new(formula.store(), formula.root(), 3);
        assert_eq!(checker.root_value(), Truth::Unknown);
        assert!(checker.is_empty());
    }

    #[test]
    fn self_contradiction_is_false_at_every_length() {
        let formula = normalized("p & ~p");
        for n in 1..=4 {
            let checker = AbstractChecker::new(formula.store(), formula.root(), n);
            assert_eq!(checker.root_value(), Truth::False);
            // the operands are never visited
            assert_eq!(checker.len(), 1);
        }
    }

    #[test]
    fn contradiction_needs_the_same_proposition() {
        let formula = normalized("p & ~q");
        let checker = AbstractChecker::new(formula.store(), formula.root(), 2);
        assert_eq!(checker.root_value(), Truth::Unknown);
    }

    #[test]
    fn box_begins_is_vacuously_true_on_a_point() {
        let formula = normalized("[B] p");
        let checker = AbstractChecker::new(formula.store(), formula.root(), 1);
        assert_eq!(checker.root_value(), Truth::True);
    }

    #[test]
    fn diamond_begins_is_false_on_a_point() {
        let formula = normalized("<B> p | <E> p | <A'> p | <E'> p");
        let checker = AbstractChecker::new(formula.store(), formula.root(), 3);
        assert_eq!(checker.root_value(), Truth::False);
    }

    #[test]
    fn after_needs_a_second_position() {
        let formula = normalized("<A> p");
        let short = AbstractChecker::new(formula.store(), formula.root(), 1);
        assert_eq!(short.root_value(), Truth::False);
        let long = AbstractChecker::new(formula.store(), formula.root(), 2);
        assert_eq!(long.root_value(), Truth::Unknown);
        let companion = find(formula.store(), "<B'>p");
        assert_eq!(long.value(companion, 0, 0), Some(Truth::Unknown));
        assert_eq!(long.value(companion, 0, 1), Some(Truth::False));
    }

    #[test]
    fn box_after_is_true_at_the_end_of_the_word() {
        let formula = normalized("[A] (p & ~p)");
        let checker = AbstractChecker::new(formula.store(), formula.root(), 1);
        assert_eq!(checker.root_value(), Truth::True);
        let checker = AbstractChecker::new(formula.store(), formula.root(), 2);
        assert_eq!(checker.root_value(), Truth::False);
    }

    #[test]
    fn nested_box_begins_checks_proper_prefixes() {
        let formula = normalized("<B'>[B][B](p & ~p)");
        let checker = AbstractChecker::new(formula.store(), formula.root(), 2);
        let nested = find(formula.store(), "[B][B](p & ~p)");
        assert_eq!(checker.value(nested, 0, 1), Some(Truth::True));
        assert_eq!(checker.root_value(), Truth::True);
    }

    #[test]
    fn unreached_triples_are_reported_as_such() {
        let formula = normalized("<A> p");
        let checker = AbstractChecker::new(formula.store(), formula.root(), 3);
        let root = formula.root().as_compound().unwrap();
        assert!(checker.value(root, 0, 0).is_some());
        assert_eq!(checker.value(root, 1, 2), None);
    }

    #[test]
    #[should_panic(expected = "non-atomic operand")]
    fn negated_compound_is_an_invariant_violation() {
        let mut store = FormulaStore::new();
        let p = store.proposition("p");
        let q = store.proposition("q");
        let both = store.and(p, q);
        let root = store.not(both);
        AbstractChecker::new(&store, root, 1);
    }

    #[test]
    #[should_panic(expected = "must be expanded")]
    fn derived_operator_is_an_invariant_violation() {
        let mut store = FormulaStore::new();
        let p = store.proposition("p");
        let root = store.diamond(Relation::L, p);
        AbstractChecker::new(&store, root, 2);
    }

    /// Reference semantics on one concrete valuation.
    struct Word<'a> {
        store: &'a FormulaStore,
        length: usize,
        // bit per (proposition, interval)
        valuation: u32,
        memo: Vec<Option<bool>>,
    }

    impl<'a> Word<'a> {
        fn new(store: &'a FormulaStore, length: usize, valuation: u32) -> Self {
            let intervals = length * (length + 1) / 2;
            Word {
                store,
                length,
                valuation,
                memo: vec![None; store.len() * intervals],
            }
        }

        fn intervals(&self) -> usize {
            self.length * (self.length + 1) / 2
        }

        fn interval_index(&self, from: usize, to: usize) -> usize {
            // row by row: [0,0] [0,1] .. [1,1] ..
            (0..from).map(|i| self.length - i).sum::<usize>() + (to - from)
        }

        fn holds(&mut self, handle: Handle, from: usize, to: usize) -> bool {
            let slot = self.interval_index(from, to);
            let id = match handle {
                Handle::Proposition(p) => {
                    let bit = p.index() * self.intervals() + slot;
                    return self.valuation >> bit & 1 == 1;
                }
                Handle::Compound(id) => id,
            };
            let key = id.index() * self.intervals() + slot;
            if let Some(known) = self.memo[key] {
                return known;
            }
            let n = self.length;
            let store = self.store;
            let node = store.node(id);
            let sub = || node.single_operand().unwrap();
            let result = match node.operator {
                Operator::And => node.operands.iter().all(|&o| self.holds(o, from, to)),
                Operator::Or => node.operands.iter().any(|&o| self.holds(o, from, to)),
                Operator::Not => !self.holds(sub(), from, to),
                Operator::Diamond(Relation::A) => (to + 1..n).any(|m| self.holds(sub(), to, m)),
                Operator::Box(Relation::A) => (to + 1..n).all(|m| self.holds(sub(), to, m)),
                Operator::Diamond(Relation::B) => (from..to).any(|k| self.holds(sub(), from, k)),
                Operator::Box(Relation::B) => (from..to).all(|k| self.holds(sub(), from, k)),
                Operator::Diamond(Relation::E) => (from + 1..=to).any(|k| self.holds(sub(), k, to)),
                Operator::Box(Relation::E) => (from + 1..=to).all(|k| self.holds(sub(), k, to)),
                Operator::Diamond(Relation::ABar) => (0..from).any(|k| self.holds(sub(), k, from)),
                Operator::Box(Relation::ABar) => (0..from).all(|k| self.holds(sub(), k, from)),
                Operator::Diamond(Relation::BBar) => (to + 1..n).any(|m| self.holds(sub(), from, m)),
                Operator::Box(Relation::BBar) => (to + 1..n).all(|m| self.holds(sub(), from, m)),
                Operator::Diamond(Relation::EBar) => (0..from).any(|k| self.holds(sub(), k, to)),
                Operator::Box(Relation::EBar) => (0..from).all(|k| self.holds(sub(), k, to)),
                other => panic!("derived operator {other} in a normalized formula"),
            };
            self.memo[key] = Some(result);
            result
        }
    }

    fn formula_text() -> impl Strategy<Value = String> {
        prop_oneof![Just("p".to_owned()), Just("q".to_owned())].prop_recursive(4, 16, 2, |inner| {
            prop_oneof![
                inner.clone().prop_map(|f| format!("~{f}")),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} & {b})")),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} | {b})")),
                (0..12usize, inner.clone()).prop_map(|(r, f)| format!("<{}>{f}", RELATIONS[r].symbol())),
                (0..12usize, inner).prop_map(|(r, f)| format!("[{}]{f}", RELATIONS[r].symbol())),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn fixed_values_hold_under_every_valuation(text in formula_text(), length in 1usize..=3) {
            let formula = normalized(&text);
            let store = formula.store();
            let checker = AbstractChecker::new(store, formula.root(), length);
            let fixed: Vec<_> = checker.fixed().collect();
            let bits = store.proposition_count() * length * (length + 1) / 2;
            for valuation in 0..(1u32 << bits) {
                let mut word = Word::new(store, length, valuation);
                for &(node, from, to, expected) in &fixed {
                    prop_assert_eq!(
                        word.holds(Handle::Compound(node), from, to),
                        expected,
                        "{} on [{},{}] of length {}",
                        store.display(Handle::Compound(node)),
                        from,
                        to,
                        length
                    );
                }
            }
        }
    }
}
