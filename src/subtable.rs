//! Per-variable unique table with intrusive hashing.
//!
//! Every variable owns one subtable. All nodes of a subtable carry the same
//! label, so the key is just the `(low, high)` pair of child references.
//!
//! ```text
//! Subtable for x3 (7 buckets):
//! ┌─────────────────────────────────────────────────┐
//! │ buckets: [u32; 7]                               │
//! │   [0] ─────► Node@5 ──► Node@12 ──► ∅           │
//! │   [1] ─────► ∅                                  │
//! │   [2] ─────► Node@3 ──► ∅                       │
//! │   ...                                           │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Collision chains live in the `Node.next` field of the arena.
//! The bucket count is always one of [`PRIMES`]. The table grows to the next
//! prime once the average chain gets longer than the explode factor, and
//! shrinks back (never below the initial prime) once it drops under the
//! implode factor.

use log::debug;

use crate::node::Node;
use crate::reference::Ref;
use crate::types::{DecompositionType, Var};
use crate::utils::{MyHash, PRIMES};

/// Unique table of one variable.
#[derive(Debug, Clone)]
pub struct Subtable {
    pub variable: Var,
    pub decomposition: DecompositionType,

    /// Heads of the collision chains, [`Node::NO_NEXT`] for an empty bucket.
    buckets: Vec<u32>,
    prime_index: usize,
    min_prime_index: usize,

    /// Number of linked nodes.
    count: usize,
}

impl Subtable {
    pub fn new(variable: Var, decomposition: DecompositionType, prime_index: usize) -> Self {
        let prime_index = prime_index.min(PRIMES.len() - 1);
        Self {
            variable,
            decomposition,
            buckets: vec![Node::NO_NEXT; PRIMES[prime_index]],
            prime_index,
            min_prime_index: prime_index,
            count: 0,
        }
    }

    #[inline]
    fn bucket_index(&self, low: Ref, high: Ref) -> usize {
        (MyHash::hash(&(low, high)) % self.buckets.len() as u64) as usize
    }

    /// Look up a node by its children.
    pub fn find(&self, low: Ref, high: Ref, nodes: &[Node]) -> Option<u32> {
        ChainIter::new(self.buckets[self.bucket_index(low, high)], nodes)
            .find(|&id| nodes[id as usize].low == low && nodes[id as usize].high == high)
    }

    /// Prepend the node to its chain. The key is read from the arena.
    pub fn insert(&mut self, id: u32, nodes: &mut [Node]) {
        let node = &nodes[id as usize];
        let b = self.bucket_index(node.low, node.high);
        nodes[id as usize].next = self.buckets[b];
        self.buckets[b] = id;
        self.count += 1;
    }

    /// Unlink the node from its chain.
    ///
    /// Must be called while the node still carries the children it was
    /// inserted with. Returns false if the node was not in this table.
    pub fn remove(&mut self, id: u32, nodes: &mut [Node]) -> bool {
        let node = nodes[id as usize];
        let b = self.bucket_index(node.low, node.high);
        let mut prev = Node::NO_NEXT;
        let mut current = self.buckets[b];

        while current != Node::NO_NEXT {
            if current == id {
                if prev == Node::NO_NEXT {
                    self.buckets[b] = node.next;
                } else {
                    nodes[prev as usize].next = node.next;
                }
                nodes[id as usize].next = Node::NO_NEXT;
                self.count -= 1;
                return true;
            }
            prev = current;
            current = nodes[current as usize].next;
        }

        false
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// All node indices of this table, chain by chain.
    pub fn indices(&self, nodes: &[Node]) -> Vec<u32> {
        let mut result = Vec::with_capacity(self.count);
        for &head in &self.buckets {
            result.extend(ChainIter::new(head, nodes));
        }
        result
    }

    /// Unlink every node and return their indices.
    pub fn take_all(&mut self, nodes: &mut [Node]) -> Vec<u32> {
        let all = self.indices(nodes);
        for &id in &all {
            nodes[id as usize].next = Node::NO_NEXT;
        }
        self.buckets.fill(Node::NO_NEXT);
        self.count = 0;
        all
    }

    pub fn should_explode(&self, factor: f64) -> bool {
        self.prime_index + 1 < PRIMES.len() && self.count as f64 > self.buckets.len() as f64 * factor
    }

    pub fn should_implode(&self, factor: f64) -> bool {
        self.prime_index > self.min_prime_index && (self.count as f64) < self.buckets.len() as f64 * factor
    }

    /// Grow to the next prime and rehash.
    pub fn explode(&mut self, nodes: &mut [Node]) {
        self.rehash(self.prime_index + 1, nodes);
    }

    /// Shrink to the previous prime and rehash.
    pub fn implode(&mut self, nodes: &mut [Node]) {
        self.rehash(self.prime_index - 1, nodes);
    }

    fn rehash(&mut self, prime_index: usize, nodes: &mut [Node]) {
        debug!(
            "rehash(var = {}): {} -> {} buckets for {} nodes",
            self.variable, PRIMES[self.prime_index], PRIMES[prime_index], self.count
        );
        let all = self.take_all(nodes);
        self.prime_index = prime_index;
        self.buckets = vec![Node::NO_NEXT; PRIMES[prime_index]];
        for id in all {
            self.insert(id, nodes);
        }
    }
}

/// Iterator over a collision chain.
struct ChainIter<'a> {
    current: u32,
    nodes: &'a [Node],
}

impl<'a> ChainIter<'a> {
    fn new(head: u32, nodes: &'a [Node]) -> Self {
        Self { current: head, nodes }
    }
}

impl Iterator for ChainIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == Node::NO_NEXT {
            return None;
        }
        let id = self.current;
        self.current = self.nodes[id as usize].next;
        Some(id)
    }
}
