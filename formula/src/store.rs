use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use indexmap::IndexSet;
use log::debug;

use crate::error::FormulaError;
use crate::operator::{Operator, Relation};

/// Dense index of an atomic proposition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropId(u32);

/// Dense index of a compound formula node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl PropId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn from_index(index: usize) -> NodeId {
        NodeId(u32::try_from(index).expect("formula store exceeds u32::MAX nodes"))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to either an atomic proposition or a compound node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Handle {
    Proposition(PropId),
    Compound(NodeId),
}

impl Handle {
    pub fn as_compound(self) -> Option<NodeId> {
        match self {
            Handle::Compound(id) => Some(id),
            Handle::Proposition(_) => None,
        }
    }

    pub fn is_proposition(self) -> bool {
        matches!(self, Handle::Proposition(_))
    }
}

/// Operand sets are unordered and deduplicated.
pub type Operands = BTreeSet<Handle>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Node {
    pub operator: Operator,
    pub operands: Operands,
}

impl Node {
    /// The operand of a unary node, `None` if the node does not have exactly one.
    pub fn single_operand(&self) -> Option<Handle> {
        match self.operands.len() {
            1 => self.operands.iter().next().copied(),
            _ => None,
        }
    }
}

/// Hash-consed formula DAG.
///
/// For every `(operator, operands)` pair at most one node exists; [`FormulaStore::intern`]
/// is the only way to create one. Proposition names are deduplicated the same way.
#[derive(Clone, Debug, Default)]
pub struct FormulaStore {
    propositions: IndexSet<String>,
    nodes: IndexSet<Node>,
}

impl FormulaStore {
    pub fn new() -> Self {
        FormulaStore::default()
    }

    /// Looks up or creates the atomic proposition called `name`.
    pub fn proposition(&mut self, name: &str) -> Handle {
        let index = match self.propositions.get_index_of(name) {
            Some(index) => index,
            None => self.propositions.insert_full(name.to_owned()).0,
        };
        Handle::Proposition(PropId(index as u32))
    }

    /// Looks up or creates the node `(operator, operands)`.
    pub fn intern(&mut self, operator: Operator, operands: impl IntoIterator<Item = Handle>) -> Handle {
        let node = Node {
            operator,
            operands: operands.into_iter().collect(),
        };
        debug_assert!(
            !operator.is_unary() || node.operands.len() == 1,
            "{operator} interned with {} operands",
            node.operands.len()
        );
        let (index, _) = self.nodes.insert_full(node);
        Handle::Compound(NodeId::from_index(index))
    }

    /// Finds the node `(operator, operands)` without creating it.
    pub fn lookup(&self, operator: Operator, operands: impl IntoIterator<Item = Handle>) -> Option<Handle> {
        let node = Node {
            operator,
            operands: operands.into_iter().collect(),
        };
        self.nodes
            .get_index_of(&node)
            .map(|index| Handle::Compound(NodeId::from_index(index)))
    }

    pub fn and(&mut self, a: Handle, b: Handle) -> Handle {
        self.intern(Operator::And, [a, b])
    }

    pub fn or(&mut self, a: Handle, b: Handle) -> Handle {
        self.intern(Operator::Or, [a, b])
    }

    pub fn not(&mut self, a: Handle) -> Handle {
        self.intern(Operator::Not, [a])
    }

    pub fn diamond(&mut self, relation: Relation, a: Handle) -> Handle {
        self.intern(Operator::Diamond(relation), [a])
    }

    pub fn boxed(&mut self, relation: Relation, a: Handle) -> Handle {
        self.intern(Operator::Box(relation), [a])
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes
            .get_index(id.index())
            .unwrap_or_else(|| panic!("dangling formula handle {id}"))
    }

    pub fn operator(&self, id: NodeId) -> Operator {
        self.node(id).operator
    }

    /// The single operand of a unary or temporal node.
    pub fn operand_of(&self, id: NodeId) -> Result<Handle, FormulaError> {
        let node = self.node(id);
        node.single_operand().ok_or(FormulaError::Arity {
            node: id,
            operator: node.operator,
            found: node.operands.len(),
        })
    }

    /// Number of compound nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn proposition_count(&self) -> usize {
        self.propositions.len()
    }

    pub fn proposition_name(&self, id: PropId) -> &str {
        self.propositions
            .get_index(id.index())
            .map(String::as_str)
            .unwrap_or_else(|| panic!("dangling proposition handle {}", id.index()))
    }

    /// All propositions, sorted by name.
    pub fn propositions(&self) -> Vec<(PropId, &str)> {
        let mut all: Vec<(PropId, &str)> = self
            .propositions
            .iter()
            .enumerate()
            .map(|(index, name)| (PropId(index as u32), name.as_str()))
            .collect();
        all.sort_by(|a, b| a.1.cmp(b.1));
        all
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId::from_index(index), node))
    }

    /// Compound nodes reachable from `root`, in breadth-first visitation order.
    pub fn reachable_from(&self, root: Handle) -> Vec<NodeId> {
        let Some(start) = root.as_compound() else {
            return Vec::new();
        };
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);
        seen[start.index()] = true;
        while let Some(current) = queue.pop_front() {
            order.push(current);
            for operand in &self.node(current).operands {
                if let Handle::Compound(next) = *operand {
                    if !seen[next.index()] {
                        seen[next.index()] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        order
    }

    /// Drops every node not reachable from `root` and renumbers the rest densely
    /// in visitation order. Propositions keep their handles.
    pub fn compact(&mut self, root: Handle) -> Handle {
        let order = self.reachable_from(root);
        let mapping: HashMap<NodeId, NodeId> = order
            .iter()
            .enumerate()
            .map(|(new, &old)| (old, NodeId::from_index(new)))
            .collect();
        let remap = |handle: Handle| match handle {
            Handle::Compound(id) => Handle::Compound(mapping[&id]),
            proposition => proposition,
        };

        let mut nodes = IndexSet::with_capacity(order.len());
        for old in &order {
            let node = self.node(*old);
            let (_, inserted) = nodes.insert_full(Node {
                operator: node.operator,
                operands: node.operands.iter().copied().map(remap).collect(),
            });
            debug_assert!(inserted, "compaction merged two distinct nodes");
        }
        debug!("compaction kept {} of {} nodes", nodes.len(), self.nodes.len());
        self.nodes = nodes;
        remap(root)
    }

    pub fn display(&self, handle: Handle) -> FormulaDisplay<'_> {
        FormulaDisplay { store: self, handle }
    }

    /// The formula table, one node per line.
    pub fn table(&self) -> String {
        let mut out = String::new();
        for (id, node) in self.nodes() {
            let operands: Vec<String> = node
                .operands
                .iter()
                .map(|operand| match operand {
                    Handle::Proposition(p) => self.proposition_name(*p).to_owned(),
                    Handle::Compound(c) => c.to_string(),
                })
                .collect();
            out.push_str(&format!("{id}\t{}\t{{{}}}\n", node.operator, operands.join(" ")));
        }
        out
    }
}

/// Infix rendering of a formula.
pub struct FormulaDisplay<'a> {
    store: &'a FormulaStore,
    handle: Handle,
}

impl fmt::Display for FormulaDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self.handle {
            Handle::Proposition(p) => return f.write_str(self.store.proposition_name(p)),
            Handle::Compound(id) => id,
        };
        let node = self.store.node(id);
        let sub = |handle: Handle| self.store.display(handle);
        match node.operator {
            Operator::And | Operator::Or => {
                let glue = if node.operator == Operator::And { " & " } else { " | " };
                f.write_str("(")?;
                for (index, operand) in node.operands.iter().enumerate() {
                    if index > 0 {
                        f.write_str(glue)?;
                    }
                    write!(f, "{}", sub(*operand))?;
                }
                f.write_str(")")
            }
            Operator::Not => match node.single_operand() {
                Some(operand) => write!(f, "~{}", sub(operand)),
                None => f.write_str("~?"),
            },
            op => match node.single_operand() {
                Some(operand) => write!(f, "{op}{}", sub(operand)),
                None => write!(f, "{op}?"),
            },
        }
    }
}
