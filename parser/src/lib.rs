use formula::{FormulaStore, Handle, Relation};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct FormulaParser;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("syntax error:\n{0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("unknown temporal operator '{0}' (expected one of A B E L D O, optionally primed)")]
    UnknownOperator(String),
}

/// Parses a textual formula into a fresh store and returns the store together
/// with the root handle.
pub fn parse(source: &str) -> Result<(FormulaStore, Handle), ParseError> {
    let mut store = FormulaStore::new();
    let root = parse_into(&mut store, source)?;
    Ok((store, root))
}

/// Parses a formula into an existing store, sharing its nodes.
pub fn parse_into(store: &mut FormulaStore, source: &str) -> Result<Handle, ParseError> {
    let mut pairs = FormulaParser::parse(Rule::formula, source).map_err(Box::new)?;
    // formula := SOI iff EOI
    let body = pairs
        .next()
        .and_then(|formula| formula.into_inner().next())
        .unwrap_or_else(|| unreachable!("grammar guarantees a formula body"));
    build_from_pair(store, body)
}

fn build_from_pair(store: &mut FormulaStore, pair: Pair<Rule>) -> Result<Handle, ParseError> {
    match pair.as_rule() {
        Rule::iff => build_iff(store, pair),
        Rule::implication => build_implication(store, pair),
        Rule::disjunction => fold_binary(store, pair, FormulaStore::or),
        Rule::conjunction => fold_binary(store, pair, FormulaStore::and),
        Rule::unary => build_unary(store, pair),
        rule => unreachable!("unexpected rule {rule:?}"),
    }
}

fn build_iff(store: &mut FormulaStore, pair: Pair<Rule>) -> Result<Handle, ParseError> {
    let mut operands = pair.into_inner();
    let first = next_child(&mut operands);
    let mut lhs = build_from_pair(store, first)?;
    for next in operands {
        let rhs = build_from_pair(store, next)?;
        let forward = implies(store, lhs, rhs);
        let backward = implies(store, rhs, lhs);
        lhs = store.and(forward, backward);
    }
    Ok(lhs)
}

// Right-associative: a -> b -> c is a -> (b -> c)
fn build_implication(store: &mut FormulaStore, pair: Pair<Rule>) -> Result<Handle, ParseError> {
    let mut operands = pair.into_inner();
    let first = next_child(&mut operands);
    let lhs = build_from_pair(store, first)?;
    match operands.next() {
        Some(rest) => {
            let rhs = build_from_pair(store, rest)?;
            Ok(implies(store, lhs, rhs))
        }
        None => Ok(lhs),
    }
}

fn fold_binary(
    store: &mut FormulaStore,
    pair: Pair<Rule>,
    combine: fn(&mut FormulaStore, Handle, Handle) -> Handle,
) -> Result<Handle, ParseError> {
    let mut operands = pair.into_inner();
    let first = next_child(&mut operands);
    let mut acc = build_from_pair(store, first)?;
    for next in operands {
        let rhs = build_from_pair(store, next)?;
        acc = combine(store, acc, rhs);
    }
    Ok(acc)
}

fn build_unary(store: &mut FormulaStore, pair: Pair<Rule>) -> Result<Handle, ParseError> {
    let inner = next_child(&mut pair.into_inner());
    match inner.as_rule() {
        Rule::proposition => Ok(store.proposition(inner.as_str())),
        Rule::iff => build_iff(store, inner),
        Rule::negation => {
            let operand = next_child(&mut inner.into_inner());
            let operand = build_unary(store, operand)?;
            Ok(store.not(operand))
        }
        Rule::diamond | Rule::boxed => {
            let is_diamond = inner.as_rule() == Rule::diamond;
            let mut parts = inner.into_inner();
            let symbol = next_child(&mut parts).as_str();
            let relation =
                Relation::from_symbol(symbol).ok_or_else(|| ParseError::UnknownOperator(symbol.to_owned()))?;
            let operand = build_unary(store, next_child(&mut parts))?;
            Ok(match is_diamond {
                true => store.diamond(relation, operand),
                false => store.boxed(relation, operand),
            })
        }
        rule => unreachable!("unexpected rule {rule:?} below unary"),
    }
}

fn implies(store: &mut FormulaStore, lhs: Handle, rhs: Handle) -> Handle {
    let not_lhs = store.not(lhs);
    store.or(not_lhs, rhs)
}

fn next_child<'i>(pairs: &mut pest::iterators::Pairs<'i, Rule>) -> Pair<'i, Rule> {
    pairs
        .next()
        .unwrap_or_else(|| unreachable!("grammar guarantees a child here"))
}
