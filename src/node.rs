use crate::reference::Ref;

/// A KFDD node as stored in the manager's arena.
///
/// The node's meaning depends on the decomposition type of its variable,
/// see [`DecompositionType`][crate::types::DecompositionType].
/// The low edge of a linked node is never complemented.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Node {
    /// Variable label, 0 for the terminal and for reclaimed slots.
    pub variable: u32,
    pub low: Ref,
    pub high: Ref,
    /// Identity number. Fresh for every (re)use of the slot, 0 once reclaimed.
    pub id: u64,
    pub ref_count: u32,
    /// Next node in the same unique-table chain.
    pub next: u32,
    /// Parity of complement switches applied to this node.
    pub switched: bool,
    pub in_recycler: bool,
}

impl Node {
    /// Sentinel for "end of chain".
    pub const NO_NEXT: u32 = u32::MAX;

    pub fn new(variable: u32, low: Ref, high: Ref, id: u64) -> Self {
        Self {
            variable,
            low,
            high,
            id,
            ref_count: 1,
            next: Self::NO_NEXT,
            switched: false,
            in_recycler: false,
        }
    }

    /// The terminal node: constant one.
    pub fn terminal() -> Self {
        Self {
            variable: 0,
            low: Ref::ONE,
            high: Ref::ONE,
            id: 0,
            ref_count: 0,
            next: Self::NO_NEXT,
            switched: false,
            in_recycler: false,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.variable != 0
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::terminal()
    }
}
