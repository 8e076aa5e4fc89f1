use std::collections::HashMap;

use log::{debug, info};

use crate::error::FormulaError;
use crate::operator::{Operator, Relation};
use crate::store::{FormulaStore, Handle, Operands};

const RED_ZONE: usize = 32 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

/// A formula that went through the whole pipeline: positive normal form,
/// primitive operators only, compacted, with the companion nodes the encoder
/// needs. The encoder only accepts this type.
#[derive(Clone, Debug)]
pub struct NormalizedFormula {
    store: FormulaStore,
    root: Handle,
    expanded_size: usize,
}

impl NormalizedFormula {
    pub fn store(&self) -> &FormulaStore {
        &self.store
    }

    pub fn root(&self) -> Handle {
        self.root
    }

    /// Node count after derived-operator expansion, before compaction.
    pub fn expanded_size(&self) -> usize {
        self.expanded_size
    }

    /// Node count of the final, compacted store.
    pub fn size(&self) -> usize {
        self.store.len()
    }

    pub fn into_parts(self) -> (FormulaStore, Handle) {
        (self.store, self.root)
    }
}

/// Runs the passes in their required order: positive normal form, derived
/// operator expansion, compaction, encoding helpers.
pub fn normalize(mut store: FormulaStore, root: Handle) -> Result<NormalizedFormula, FormulaError> {
    let root = to_positive_normal_form(&mut store, root, false)?;
    let root = encode_derived_operators(&mut store, root);
    let expanded_size = store.len();
    let root = remove_unreachable_subformulas(&mut store, root);
    add_encoding_helpers(&mut store);
    info!(
        "normalized formula: {} nodes after expansion, {} after pruning",
        expanded_size,
        store.len()
    );
    debug!("formula table:\n{}", store.table());
    Ok(NormalizedFormula {
        store,
        root,
        expanded_size,
    })
}

/// Pushes negations inward until they only sit directly above propositions.
pub fn to_positive_normal_form(
    store: &mut FormulaStore,
    handle: Handle,
    negated: bool,
) -> Result<Handle, FormulaError> {
    let mut memo = HashMap::new();
    positive_normal_form(store, handle, negated, &mut memo)
}

fn positive_normal_form(
    store: &mut FormulaStore,
    handle: Handle,
    negated: bool,
    memo: &mut HashMap<(Handle, bool), Handle>,
) -> Result<Handle, FormulaError> {
    let id = match handle {
        Handle::Proposition(_) if negated => return Ok(store.not(handle)),
        Handle::Proposition(_) => return Ok(handle),
        Handle::Compound(id) => id,
    };
    if let Some(&done) = memo.get(&(handle, negated)) {
        return Ok(done);
    }

    let node = store.node(id).clone();
    let result = if node.operator == Operator::Not {
        let operand = store.operand_of(id)?;
        match operand {
            Handle::Proposition(_) if negated => operand,
            Handle::Proposition(_) => handle,
            Handle::Compound(_) => stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || {
                positive_normal_form(store, operand, !negated, memo)
            })?,
        }
    } else {
        let mut operands = Operands::new();
        for &operand in &node.operands {
            operands.insert(stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || {
                positive_normal_form(store, operand, negated, memo)
            })?);
        }
        let operator = match negated {
            true => node
                .operator
                .dual()
                .unwrap_or_else(|| unreachable!("only NOT lacks a dual")),
            false => node.operator,
        };
        store.intern(operator, operands)
    };
    memo.insert((handle, negated), result);
    Ok(result)
}

/// Rewrites `L`, `D`, `O` and their converses into compositions of `A`, `B`,
/// `E` and their converses.
pub fn encode_derived_operators(store: &mut FormulaStore, handle: Handle) -> Handle {
    let mut memo = HashMap::new();
    expand_derived(store, handle, &mut memo)
}

fn expand_derived(store: &mut FormulaStore, handle: Handle, memo: &mut HashMap<Handle, Handle>) -> Handle {
    let Handle::Compound(id) = handle else {
        return handle;
    };
    if let Some(&done) = memo.get(&handle) {
        return done;
    }

    let node = store.node(id).clone();
    let operands: Operands = node
        .operands
        .iter()
        .map(|&operand| stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || expand_derived(store, operand, memo)))
        .collect();
    let result = match node.operator.relation() {
        Some(relation) if relation.is_derived() => expand(store, node.operator, relation, operands),
        _ => store.intern(node.operator, operands),
    };
    memo.insert(handle, result);
    result
}

fn expand(store: &mut FormulaStore, operator: Operator, relation: Relation, operands: Operands) -> Handle {
    let modal = |r: Relation| match operator {
        Operator::Diamond(_) => Operator::Diamond(r),
        _ => Operator::Box(r),
    };
    let (inner, outer) = match relation {
        Relation::L => (Relation::A, Relation::A),
        Relation::LBar => (Relation::ABar, Relation::ABar),
        Relation::O => (Relation::BBar, Relation::E),
        Relation::OBar => (Relation::EBar, Relation::B),
        // D has two equivalent encodings; reuse whichever half already exists.
        Relation::D | Relation::DBar => {
            let (prefix, suffix) = match relation {
                Relation::D => (Relation::B, Relation::E),
                _ => (Relation::BBar, Relation::EBar),
            };
            if let Some(existing) = store.lookup(modal(suffix), operands.iter().copied()) {
                return store.intern(modal(prefix), [existing]);
            }
            (prefix, suffix)
        }
        primitive => unreachable!("{primitive:?} is not a derived relation"),
    };
    let inner = store.intern(modal(inner), operands);
    store.intern(modal(outer), [inner])
}

/// Prunes the store down to what `root` needs; returns the remapped root.
pub fn remove_unreachable_subformulas(store: &mut FormulaStore, root: Handle) -> Handle {
    store.compact(root)
}

/// `<A>φ` and `[A]φ` are evaluated through `<B'>φ` and `[B']φ` at the point
/// `[to,to]`, so those companions must exist. They are not reachable from the
/// root, so this runs after compaction.
pub fn add_encoding_helpers(store: &mut FormulaStore) {
    let needed: Vec<(Operator, Operands)> = store
        .nodes()
        .filter_map(|(_, node)| match node.operator {
            Operator::Diamond(Relation::A) => Some((Operator::Diamond(Relation::BBar), node.operands.clone())),
            Operator::Box(Relation::A) => Some((Operator::Box(Relation::BBar), node.operands.clone())),
            _ => None,
        })
        .collect();
    let before = store.len();
    for (operator, operands) in needed {
        store.intern(operator, operands);
    }
    debug!("added {} encoding helper nodes", store.len() - before);
}
