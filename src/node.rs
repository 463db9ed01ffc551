//! Node / arc model (§3, §4.4 "C1")
//!
//! A node is either an internal node — one son per value of its variable's
//! domain — or a terminal node carrying a codomain value (or the special
//! `Undefined` value used by extended DPLD). Nodes never reference a
//! variable by level, only by index; the manager owns the index↔level
//! bijection separately (`Manager`'s `index_to_level`/`level_to_index`).

/// Index into the node pool. Stable for the life of the slot: once issued,
/// a `NodeId` is never reused by the pool until its slot has actually been
/// pushed onto the free list.
pub type NodeId = usize;

/// Variable identity, independent of its current position in the order.
pub type VarIndex = usize;

/// Position of a variable on the root-to-terminal path. The terminal level
/// equals the variable count.
pub type Level = usize;

/// A terminal's codomain value, or the reserved `Undefined` marker used by
/// extended DPLD (§3 "Undefined is a distinguished codomain value").
///
/// Kept as its own variant rather than a sentinel integer so ordinary
/// terminal lookup by value stays a direct index into `Manager::terminals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// An ordinary codomain value in `0..codomain_size`.
    Val(u32),
    /// The don't-care leaf produced by extended DPLD.
    Undefined,
}

impl Value {
    /// The underlying integer, if this is not `Undefined`.
    pub fn as_u32(self) -> Option<u32> {
        match self {
            Value::Val(v) => Some(v),
            Value::Undefined => None,
        }
    }
}

/// The two shapes a node can take (§3 "Node").
#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    /// A terminal leaf.
    Terminal(Value),
    /// An internal node: one son per value of `0..sons.len()`.
    Internal {
        index: VarIndex,
        sons: Box<[NodeId]>,
    },
}

impl NodeData {
    pub(crate) fn is_terminal(&self) -> bool {
        matches!(self, NodeData::Terminal(_))
    }

    pub(crate) fn index(&self) -> Option<VarIndex> {
        match self {
            NodeData::Internal { index, .. } => Some(*index),
            NodeData::Terminal(_) => None,
        }
    }

    pub(crate) fn sons(&self) -> &[NodeId] {
        match self {
            NodeData::Internal { sons, .. } => sons,
            NodeData::Terminal(_) => &[],
        }
    }
}

/// A live (or recyclable) slot in the node pool.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) data: NodeData,
    /// `#handle-roots + #internal-parents` naming this node as a son (I4).
    pub(crate) refcount: u32,
    /// XOR-toggle mark used by the traversal discipline (I6) and as the
    /// transient root guard during `make_internal`/`make_terminal` (§4.4.1).
    pub(crate) mark: bool,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Node {
            data,
            refcount: 0,
            mark: false,
        }
    }
}
