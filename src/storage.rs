//! Node arena, unique tables, variable order and recycler.
//!
//! [`Storage`] owns every node of a manager. Nodes live in a plain
//! `Vec<Node>` indexed by slot. Slot 0 is the terminal. Reclaimed slots go on
//! a free list and are reused with a fresh identity number.
//!
//! Reference counts track incoming edges from linked nodes plus handles owned
//! by callers. A count of zero means the node is dead and parked in the
//! [`Recycler`]. It keeps its edges (and thus its children's counts) until
//! the ring evicts it or [`Storage::free_all_cached`] drains the ring.
//! The terminal sits at count zero forever and is never collected.

use log::{debug, warn};

use crate::config::KfddConfig;
use crate::node::Node;
use crate::recycler::Recycler;
use crate::reference::Ref;
use crate::subtable::Subtable;
use crate::types::{DecompositionType, Var};

/// Position ↔ label permutation. Position 0 is the top.
#[derive(Debug, Clone, Default)]
pub struct Order {
    label_at: Vec<Var>,
    position_of: Vec<usize>,
}

impl Order {
    pub fn len(&self) -> usize {
        self.label_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.label_at.is_empty()
    }

    /// Append a new variable at the bottom.
    pub fn push(&mut self, var: Var) {
        debug_assert_eq!(var.slot(), self.position_of.len());
        self.position_of.push(self.label_at.len());
        self.label_at.push(var);
    }

    pub fn var_at(&self, position: usize) -> Var {
        self.label_at[position]
    }

    pub fn position_of(&self, var: Var) -> usize {
        self.position_of[var.slot()]
    }

    /// Swap the variables at `position` and `position + 1`.
    pub fn swap_adjacent(&mut self, position: usize) {
        self.label_at.swap(position, position + 1);
        let upper = self.label_at[position];
        let lower = self.label_at[position + 1];
        self.position_of[upper.slot()] = position;
        self.position_of[lower.slot()] = position + 1;
    }

    pub fn as_slice(&self) -> &[Var] {
        &self.label_at
    }
}

pub struct Storage {
    pub(crate) nodes: Vec<Node>,
    free_slots: Vec<u32>,
    pub(crate) subtables: Vec<Subtable>,
    pub(crate) order: Order,
    recycler: Recycler,
    next_id: u64,
    live: usize,
    peak: usize,
    node_limit: usize,
    overflow: bool,
    explode_factor: f64,
    implode_factor: f64,
    prime_index: usize,
}

impl Storage {
    pub fn new(config: &KfddConfig) -> Self {
        Self {
            nodes: vec![Node::terminal()],
            free_slots: Vec::new(),
            subtables: Vec::new(),
            order: Order::default(),
            recycler: Recycler::new(config.rc_cachesize),
            next_id: 1,
            live: 0,
            peak: 0,
            node_limit: config.node_limit,
            overflow: false,
            explode_factor: config.explode_factor,
            implode_factor: config.implode_factor,
            prime_index: config.ut_hashsize,
        }
    }

    /// Register a new variable at the bottom of the order.
    pub fn add_variable(&mut self, decomposition: DecompositionType) -> Var {
        let var = Var::new(self.subtables.len() as u32 + 1);
        self.subtables
            .push(Subtable::new(var, decomposition, self.prime_index));
        self.order.push(var);
        var
    }

    pub fn num_vars(&self) -> usize {
        self.subtables.len()
    }

    pub fn node(&self, index: u32) -> &Node {
        &self.nodes[index as usize]
    }

    pub fn subtable(&self, var: Var) -> &Subtable {
        &self.subtables[var.slot()]
    }

    pub fn decomposition(&self, var: Var) -> DecompositionType {
        self.subtables[var.slot()].decomposition
    }

    /// Label of the node behind `r`, `None` for the terminal.
    pub fn variable_of(&self, r: Ref) -> Option<Var> {
        let v = self.nodes[r.index() as usize].variable;
        if v == 0 {
            None
        } else {
            Some(Var::new(v))
        }
    }

    /// Position of the node's variable, `usize::MAX` for the terminal.
    pub fn level_of_ref(&self, r: Ref) -> usize {
        match self.variable_of(r) {
            Some(var) => self.order.position_of(var),
            None => usize::MAX,
        }
    }

    /// True for the terminal and for every node still linked in a unique table.
    pub fn is_live(&self, r: Ref) -> bool {
        r.is_terminal()
            || self
                .nodes
                .get(r.index() as usize)
                .is_some_and(|n| n.is_linked())
    }

    /// Children of `r` as seen through its complement bit.
    ///
    /// Complementing a Shannon node complements both children, complementing
    /// a Davio node only complements the low child.
    pub fn cofactors(&self, r: Ref) -> (Ref, Ref) {
        let node = &self.nodes[r.index() as usize];
        let dtl = self.subtables[node.variable as usize - 1].decomposition;
        let n = r.is_negated();
        if dtl.is_davio() {
            (node.low.negate_if(n), node.high)
        } else {
            (node.low.negate_if(n), node.high.negate_if(n))
        }
    }

    pub fn inc_ref(&mut self, r: Ref) {
        if !r.is_terminal() {
            self.nodes[r.index() as usize].ref_count += 1;
        }
    }

    pub(crate) fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Find or create the node `(var, low, high)` and return an owned reference.
    ///
    /// Applies the reduction rule of the variable's decomposition type and
    /// moves a complement on `low` up to the returned edge.
    pub fn find_or_create(&mut self, var: Var, low: Ref, high: Ref) -> Ref {
        let dtl = self.decomposition(var);
        let redundant = if dtl.is_davio() {
            high == Ref::ZERO
        } else {
            low == high
        };
        if redundant {
            self.inc_ref(low);
            return low;
        }

        let negated = low.is_negated();
        let (low, high) = if negated {
            (-low, if dtl.is_davio() { high } else { -high })
        } else {
            (low, high)
        };

        if let Some(index) = self.subtables[var.slot()].find(low, high, &self.nodes) {
            self.inc_ref(Ref::positive(index));
            return Ref::new(index, negated);
        }

        let id = self.fresh_id();
        let index = self.alloc(Node::new(var.id(), low, high, id));
        self.inc_ref(low);
        self.inc_ref(high);
        self.link(index);
        Ref::new(index, negated)
    }

    fn alloc(&mut self, node: Node) -> u32 {
        let index = match self.free_slots.pop() {
            Some(index) => {
                self.nodes[index as usize] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() as u32 - 1
            }
        };
        self.live += 1;
        self.peak = self.peak.max(self.live);
        if self.live > self.node_limit && !self.overflow {
            warn!("node limit {} exceeded, sizes are no longer reliable", self.node_limit);
            self.overflow = true;
        }
        index
    }

    /// Insert the node into the unique table of its variable.
    pub(crate) fn link(&mut self, index: u32) {
        let slot = self.nodes[index as usize].variable as usize - 1;
        let subtable = &mut self.subtables[slot];
        subtable.insert(index, &mut self.nodes);
        if subtable.should_explode(self.explode_factor) {
            subtable.explode(&mut self.nodes);
        }
    }

    /// Remove the node from the unique table of its variable.
    pub(crate) fn unlink(&mut self, index: u32) {
        let slot = self.nodes[index as usize].variable as usize - 1;
        let subtable = &mut self.subtables[slot];
        let removed = subtable.remove(index, &mut self.nodes);
        debug_assert!(removed, "node @{} is not in its unique table", index);
        if subtable.should_implode(self.implode_factor) {
            subtable.implode(&mut self.nodes);
        }
    }

    /// Drop one reference to `r`.
    pub fn free(&mut self, r: Ref) {
        if r.is_terminal() {
            return;
        }
        let mut stack = vec![r.index()];
        self.release(&mut stack, false);
    }

    /// Decrement every node on the stack. Nodes that die are parked in the
    /// ring, or reclaimed on the spot when `direct` is set.
    fn release(&mut self, stack: &mut Vec<u32>, direct: bool) {
        while let Some(index) = stack.pop() {
            let node = &mut self.nodes[index as usize];
            if node.ref_count == 0 {
                continue;
            }
            node.ref_count -= 1;
            if node.ref_count > 0 {
                continue;
            }
            if direct {
                self.reclaim(index, stack);
                continue;
            }
            if node.in_recycler {
                continue;
            }
            node.in_recycler = true;
            if let Some(evicted) = self.recycler.push(index) {
                let e = &mut self.nodes[evicted as usize];
                e.in_recycler = false;
                if e.ref_count == 0 {
                    self.reclaim(evicted, stack);
                }
            }
        }
    }

    /// Unlink a dead node, queue its children for release and free the slot.
    fn reclaim(&mut self, index: u32, stack: &mut Vec<u32>) {
        let node = self.nodes[index as usize];
        self.unlink(index);
        stack.push(node.low.index());
        stack.push(node.high.index());
        self.nodes[index as usize] = Node {
            variable: 0,
            ..Node::terminal()
        };
        self.free_slots.push(index);
        self.live -= 1;
    }

    /// Reclaim every dead node parked in the ring, and everything that dies with it.
    pub fn free_all_cached(&mut self) {
        let parked = self.recycler.drain();
        if parked.is_empty() {
            return;
        }
        debug!("free_all_cached: {} parked nodes", parked.len());
        for &index in &parked {
            self.nodes[index as usize].in_recycler = false;
        }
        let mut stack = Vec::new();
        for index in parked {
            let node = &self.nodes[index as usize];
            if node.ref_count == 0 && node.is_linked() {
                self.reclaim(index, &mut stack);
                self.release(&mut stack, true);
            }
        }
    }

    /// Number of nodes linked in all unique tables (dead parked nodes included).
    pub fn size_all(&self) -> usize {
        self.subtables.iter().map(Subtable::len).sum()
    }

    pub fn level_size(&self, var: Var) -> usize {
        self.subtables[var.slot()].len()
    }

    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn overflow(&self) -> bool {
        self.overflow
    }

    pub fn parked(&self) -> usize {
        self.recycler.len()
    }

    /// Indices of all linked nodes labelled `var`.
    pub fn level_nodes(&self, var: Var) -> Vec<u32> {
        self.subtables[var.slot()].indices(&self.nodes)
    }
}
