//! Computed table: bounded memoization of binary synthesis operations.
//!
//! Each bucket holds at most `search_len` entries, newest first. Entries
//! remember the identity numbers of their operand and result nodes, so a
//! recycled slot can never produce a stale hit. They also remember the
//! complement-switch parity of those nodes. A hit on a node that has been
//! switched since insertion is turned back into the node's current polarity.

use std::cell::Cell;

use crate::node::Node;
use crate::reference::Ref;
use crate::utils::MyHash;

/// Operations memoized by the computed table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CachedOp {
    And,
    Xor,
}

impl CachedOp {
    fn code(self) -> u32 {
        match self {
            CachedOp::And => 8,
            CachedOp::Xor => 6,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Entry {
    op: CachedOp,
    f: Ref,
    g: Ref,
    result: Ref,
    ids: [u64; 3],
    switched: [bool; 3],
}

/// Snapshot of the identity and switch parity of the node behind `r`.
fn stamp(r: Ref, nodes: &[Node]) -> (u64, bool) {
    let node = &nodes[r.index() as usize];
    (node.id, node.switched)
}

pub struct ComputedTable {
    buckets: Vec<Vec<Entry>>,
    search_len: usize,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl ComputedTable {
    pub fn new(size: usize, search_len: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); size.max(1)],
            search_len: search_len.max(1),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.get()
    }
    pub fn misses(&self) -> usize {
        self.misses.get()
    }
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    // Node indices only: switching a node flips complement bits, never the index.
    fn bucket_index(&self, op: CachedOp, f: Ref, g: Ref) -> usize {
        let (a, b) = if f.index() <= g.index() {
            (f.index(), g.index())
        } else {
            (g.index(), f.index())
        };
        (MyHash::hash(&(op.code(), a, b)) % self.buckets.len() as u64) as usize
    }

    /// Look up `op(f, g)`. Both cached operations are commutative.
    pub fn lookup(&self, op: CachedOp, f: Ref, g: Ref, nodes: &[Node]) -> Option<Ref> {
        let bucket = &self.buckets[self.bucket_index(op, f, g)];
        for entry in bucket.iter().filter(|e| e.op == op) {
            let refs = [entry.f, entry.g, entry.result];
            let mut current = [Ref::ONE; 3];
            let mut valid = true;
            for k in 0..3 {
                let (id, switched) = stamp(refs[k], nodes);
                if id != entry.ids[k] {
                    valid = false;
                    break;
                }
                current[k] = refs[k].negate_if(switched != entry.switched[k]);
            }
            if !valid {
                continue;
            }
            let [ef, eg, result] = current;
            let hit = match op {
                CachedOp::And => {
                    if (ef, eg) == (f, g) || (eg, ef) == (f, g) {
                        Some(result)
                    } else {
                        None
                    }
                }
                CachedOp::Xor => {
                    let same = (ef.regular(), eg.regular()) == (f.regular(), g.regular())
                        || (eg.regular(), ef.regular()) == (f.regular(), g.regular());
                    if same {
                        let parity = ef.is_negated() ^ eg.is_negated() ^ f.is_negated() ^ g.is_negated();
                        Some(result.negate_if(parity))
                    } else {
                        None
                    }
                }
            };
            if hit.is_some() {
                self.hits.set(self.hits.get() + 1);
                return hit;
            }
        }
        self.misses.set(self.misses.get() + 1);
        None
    }

    /// Remember `op(f, g) = result`, evicting the bucket's oldest entry when full.
    pub fn insert(&mut self, op: CachedOp, f: Ref, g: Ref, result: Ref, nodes: &[Node]) {
        let (fi, fs) = stamp(f, nodes);
        let (gi, gs) = stamp(g, nodes);
        let (ri, rs) = stamp(result, nodes);
        let entry = Entry {
            op,
            f,
            g,
            result,
            ids: [fi, gi, ri],
            switched: [fs, gs, rs],
        };
        let index = self.bucket_index(op, f, g);
        let search_len = self.search_len;
        let bucket = &mut self.buckets[index];
        bucket.insert(0, entry);
        bucket.truncate(search_len);
    }
}
