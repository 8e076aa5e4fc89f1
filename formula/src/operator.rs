use std::fmt;

/// The twelve interval relations that modal operators quantify over.
///
/// `A`, `B`, `E` and their converses are primitive; `L`, `D`, `O` and their
/// converses are derived and get rewritten into the primitive ones before
/// encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    A,
    B,
    E,
    ABar,
    BBar,
    EBar,
    L,
    D,
    O,
    LBar,
    DBar,
    OBar,
}

pub const RELATIONS: [Relation; 12] = [
    Relation::A,
    Relation::B,
    Relation::E,
    Relation::ABar,
    Relation::BBar,
    Relation::EBar,
    Relation::L,
    Relation::D,
    Relation::O,
    Relation::LBar,
    Relation::DBar,
    Relation::OBar,
];

impl Relation {
    /// Parses `a`, `B`, `e'`, `O'`, ... (case-insensitive).
    pub fn from_symbol(symbol: &str) -> Option<Relation> {
        let relation = match symbol.to_ascii_lowercase().as_str() {
            "a" => Relation::A,
            "b" => Relation::B,
            "e" => Relation::E,
            "l" => Relation::L,
            "d" => Relation::D,
            "o" => Relation::O,
            "a'" => Relation::ABar,
            "b'" => Relation::BBar,
            "e'" => Relation::EBar,
            "l'" => Relation::LBar,
            "d'" => Relation::DBar,
            "o'" => Relation::OBar,
            _ => return None,
        };
        Some(relation)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Relation::A => "A",
            Relation::B => "B",
            Relation::E => "E",
            Relation::ABar => "A'",
            Relation::BBar => "B'",
            Relation::EBar => "E'",
            Relation::L => "L",
            Relation::D => "D",
            Relation::O => "O",
            Relation::LBar => "L'",
            Relation::DBar => "D'",
            Relation::OBar => "O'",
        }
    }

    pub fn is_derived(self) -> bool {
        matches!(
            self,
            Relation::L | Relation::D | Relation::O | Relation::LBar | Relation::DBar | Relation::OBar
        )
    }

    fn index(self) -> u16 {
        self as u16
    }
}

/// Node operators. Every relation comes in a diamond (existential) and a box
/// (universal) polarity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    And,
    Or,
    Not,
    Diamond(Relation),
    Box(Relation),
}

impl Operator {
    /// The operator obtained when a negation is pushed through this one.
    /// `Not` has no dual; positive normal form removes it instead.
    pub fn dual(self) -> Option<Operator> {
        match self {
            Operator::And => Some(Operator::Or),
            Operator::Or => Some(Operator::And),
            Operator::Not => None,
            Operator::Diamond(r) => Some(Operator::Box(r)),
            Operator::Box(r) => Some(Operator::Diamond(r)),
        }
    }

    /// Numeric operator code used in diagnostics.
    pub fn code(self) -> u16 {
        match self {
            Operator::And => 0,
            Operator::Or => 1,
            Operator::Not => 2,
            Operator::Diamond(r) => 3 + r.index(),
            Operator::Box(r) => 100 + r.index(),
        }
    }

    pub fn is_unary(self) -> bool {
        !matches!(self, Operator::And | Operator::Or)
    }

    pub fn relation(self) -> Option<Relation> {
        match self {
            Operator::Diamond(r) | Operator::Box(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => f.write_str("AND"),
            Operator::Or => f.write_str("OR"),
            Operator::Not => f.write_str("NOT"),
            Operator::Diamond(r) => write!(f, "<{}>", r.symbol()),
            Operator::Box(r) => write!(f, "[{}]", r.symbol()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip_in_both_cases() {
        for relation in RELATIONS {
            let symbol = relation.symbol();
            assert_eq!(Relation::from_symbol(symbol), Some(relation));
            assert_eq!(Relation::from_symbol(&symbol.to_lowercase()), Some(relation));
        }
        assert_eq!(Relation::from_symbol("x"), None);
        assert_eq!(Relation::from_symbol("a''"), None);
    }

    #[test]
    fn dual_is_an_involution() {
        for relation in RELATIONS {
            for op in [Operator::Diamond(relation), Operator::Box(relation)] {
                assert_eq!(op.dual().and_then(Operator::dual), Some(op));
                assert_ne!(op.dual(), Some(op));
            }
        }
        assert_eq!(Operator::And.dual(), Some(Operator::Or));
        assert_eq!(Operator::Not.dual(), None);
    }

    #[test]
    fn codes_are_distinct() {
        let mut codes: Vec<u16> = RELATIONS
            .iter()
            .flat_map(|&r| [Operator::Diamond(r).code(), Operator::Box(r).code()])
            .chain([Operator::And.code(), Operator::Or.code(), Operator::Not.code()])
            .collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 27);
        assert_eq!(Operator::Box(Relation::A).code(), 100);
        assert_eq!(Operator::Diamond(Relation::OBar).code(), 14);
    }

    #[test]
    fn display_uses_modal_brackets() {
        assert_eq!(Operator::Diamond(Relation::BBar).to_string(), "<B'>");
        assert_eq!(Operator::Box(Relation::D).to_string(), "[D]");
        assert_eq!(Operator::Not.to_string(), "NOT");
    }
}
