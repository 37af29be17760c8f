//! The KFDD manager.
//!
//! All operations go through [`Kfdd`]. It owns the node storage, the
//! computed table and the primary name tables, each behind a `RefCell`, so
//! every method takes `&self`. Borrows are never held across calls into
//! other manager methods.
//!
//! # Ownership of references
//!
//! Every function that returns a [`Ref`] built by the manager (`mk_var`,
//! `mk_node`, `synthesize`, ...) returns an *owned* reference: the node's
//! count includes it. Drop it with [`Kfdd::free`] when done, or keep it with
//! [`Kfdd::retain`] to hand out a second copy. Operands are only borrowed.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt::Debug;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cache::ComputedTable;
use crate::config::KfddConfig;
use crate::error::{KfddError, Result};
use crate::names::Primaries;
use crate::reference::Ref;
use crate::storage::Storage;
use crate::types::{DecompositionType, Level, Var};

/// Manager status, see [`Kfdd::status`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Status {
    Ok,
    /// More nodes than the configured budget have been allocated.
    Overflow,
}

/// Snapshot of manager statistics.
#[derive(Debug, Clone, Default)]
pub struct KfddStats {
    pub vars: usize,
    pub nodes: usize,
    pub peak_nodes: usize,
    pub unique_buckets: usize,
    pub parked: usize,
    pub cache_entries: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub overflow: bool,
}

/// A node whose stored reference count disagrees with the structure.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RefMismatch {
    pub index: u32,
    pub expected: u32,
    pub actual: u32,
}

pub struct Kfdd {
    pub(crate) storage: RefCell<Storage>,
    pub(crate) cache: RefCell<ComputedTable>,
    pub(crate) names: RefCell<Primaries>,
    pub(crate) rng: RefCell<StdRng>,
    config: KfddConfig,
}

impl Kfdd {
    pub fn new(config: KfddConfig) -> Self {
        Self {
            storage: RefCell::new(Storage::new(&config)),
            cache: RefCell::new(ComputedTable::new(config.ct_hashsize, config.ct_searchlen)),
            names: RefCell::new(Primaries::new(config.pi_limit, config.name_limit)),
            rng: RefCell::new(StdRng::seed_from_u64(config.seed)),
            config,
        }
    }

    pub fn config(&self) -> &KfddConfig {
        &self.config
    }

    /// Restart the random sifting order from `seed`.
    pub fn reseed(&self, seed: u64) {
        *self.rng.borrow_mut() = StdRng::seed_from_u64(seed);
    }
}

impl Default for Kfdd {
    fn default() -> Self {
        Kfdd::new(KfddConfig::default())
    }
}

impl Debug for Kfdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Kfdd")
            .field("vars", &storage.num_vars())
            .field("nodes", &storage.size_all())
            .field("parked", &storage.parked())
            .field("overflow", &storage.overflow())
            .finish()
    }
}

// Variables and primaries.
impl Kfdd {
    pub fn num_vars(&self) -> usize {
        self.storage.borrow().num_vars()
    }

    /// Add an unnamed variable at the bottom of the order.
    pub fn add_var(&self, decomposition: DecompositionType) -> Var {
        let var = self.storage.borrow_mut().add_variable(decomposition);
        debug!("add_var() -> {} ({})", var, decomposition);
        var
    }

    /// Add `n` unnamed variables with the default decomposition type.
    pub fn add_vars(&self, n: usize) -> Vec<Var> {
        (0..n)
            .map(|_| self.add_var(self.config.default_decomposition))
            .collect()
    }

    /// Register a primary input with the default decomposition type.
    pub fn add_input(&self, name: &str) -> Result<Var> {
        self.add_input_with(name, self.config.default_decomposition)
    }

    /// Register a primary input. The new label goes to the bottom of the order.
    pub fn add_input_with(&self, name: &str, decomposition: DecompositionType) -> Result<Var> {
        self.names.borrow().check_new(name)?;
        let var = self.add_var(decomposition);
        self.names.borrow_mut().add_input(name, var)?;
        Ok(var)
    }

    /// Register a primary output. The table takes its own reference on `root`.
    pub fn add_output(&self, name: &str, root: Ref) -> Result<()> {
        self.validate(root)?;
        self.names.borrow_mut().add_output(name, root)?;
        self.storage.borrow_mut().inc_ref(root);
        Ok(())
    }

    /// Unregister a primary output and drop the table's reference.
    pub fn remove_output(&self, name: &str) -> Result<()> {
        let root = self.names.borrow_mut().remove_output(name)?;
        self.free(root);
        Ok(())
    }

    pub fn input_label(&self, name: &str) -> Option<Var> {
        self.names.borrow().input(name)
    }

    pub fn output_root(&self, name: &str) -> Option<Ref> {
        self.names.borrow().output(name)
    }

    /// Registered name of the variable, `x<label>` for unnamed ones.
    pub fn input_name(&self, var: Var) -> String {
        match self.names.borrow().input_name(var) {
            Some(name) => name.to_string(),
            None => var.to_string(),
        }
    }

    /// All registered outputs in registration order.
    pub fn outputs(&self) -> Vec<(String, Ref)> {
        self.names.borrow().outputs().to_vec()
    }

    pub fn decomposition(&self, var: Var) -> DecompositionType {
        self.storage.borrow().decomposition(var)
    }

    pub fn level_of(&self, var: Var) -> Level {
        Level::new(self.storage.borrow().order.position_of(var))
    }

    pub fn var_at(&self, level: Level) -> Var {
        self.storage.borrow().order.var_at(level.index())
    }

    /// Variables from top to bottom.
    pub fn order(&self) -> Vec<Var> {
        self.storage.borrow().order.as_slice().to_vec()
    }

    /// Decomposition types from top to bottom.
    pub fn dtl(&self) -> Vec<DecompositionType> {
        let storage = self.storage.borrow();
        storage
            .order
            .as_slice()
            .iter()
            .map(|&v| storage.decomposition(v))
            .collect()
    }
}

// Nodes.
impl Kfdd {
    pub fn is_zero(&self, r: Ref) -> bool {
        r == Ref::ZERO
    }
    pub fn is_one(&self, r: Ref) -> bool {
        r == Ref::ONE
    }
    pub fn is_terminal(&self, r: Ref) -> bool {
        r.is_terminal()
    }

    /// Label of the top node, `None` for constants.
    pub fn variable(&self, r: Ref) -> Option<Var> {
        self.storage.borrow().variable_of(r)
    }

    /// Low child of `r`, complemented as seen through `r`.
    pub fn low(&self, r: Ref) -> Ref {
        self.storage.borrow().cofactors(r).0
    }

    /// High child of `r`, complemented as seen through `r`.
    pub fn high(&self, r: Ref) -> Ref {
        self.storage.borrow().cofactors(r).1
    }

    pub fn ref_count(&self, r: Ref) -> u32 {
        self.storage.borrow().node(r.index()).ref_count
    }

    /// Fail with [`KfddError::NullOperand`] unless `r` points at a live node.
    pub fn validate(&self, r: Ref) -> Result<()> {
        if self.storage.borrow().is_live(r) {
            Ok(())
        } else {
            Err(KfddError::NullOperand(r))
        }
    }

    /// Find or create the node `(var, low, high)`. Returns an owned reference.
    ///
    /// Both children must be live and labelled strictly below `var`.
    pub fn mk_node(&self, var: Var, low: Ref, high: Ref) -> Result<Ref> {
        debug!("mk(v = {}, low = {}, high = {})", var, low, high);
        if var.id() as usize > self.num_vars() {
            return Err(KfddError::UnknownLabel(var.id()));
        }
        let level = self.level_of(var);
        for child in [low, high] {
            self.validate(child)?;
            if let Some(v) = self.variable(child) {
                if self.level_of(v) <= level {
                    return Err(KfddError::OrderViolation { var, child });
                }
            }
        }
        Ok(self.storage.borrow_mut().find_or_create(var, low, high))
    }

    /// The projection function of `var`. Returns an owned reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use kfdd_rs::kfdd::Kfdd;
    /// use kfdd_rs::types::DecompositionType;
    ///
    /// let kfdd = Kfdd::default();
    /// let v = kfdd.add_var(DecompositionType::NegativeDavio);
    /// let x = kfdd.mk_var(v);
    /// assert!(kfdd.evaluate(x, &[true]).unwrap());
    /// assert!(!kfdd.evaluate(x, &[false]).unwrap());
    /// ```
    pub fn mk_var(&self, var: Var) -> Ref {
        match self.decomposition(var) {
            // ~x·0 ⊕ x·1 and 0 ⊕ x·1
            DecompositionType::Shannon | DecompositionType::PositiveDavio => {
                self.storage.borrow_mut().find_or_create(var, Ref::ZERO, Ref::ONE)
            }
            // 1 ⊕ ~x·1
            DecompositionType::NegativeDavio => self.storage.borrow_mut().find_or_create(var, Ref::ONE, Ref::ONE),
        }
    }

    /// Take an additional reference on `r` and return it.
    pub fn retain(&self, r: Ref) -> Ref {
        self.storage.borrow_mut().inc_ref(r);
        r
    }

    /// Drop one reference on `r`.
    pub fn free(&self, r: Ref) {
        self.storage.borrow_mut().free(r);
    }

    /// Drop every reference in `refs`.
    pub fn free_all(&self, refs: impl IntoIterator<Item = Ref>) {
        let mut storage = self.storage.borrow_mut();
        for r in refs {
            storage.free(r);
        }
    }

    /// Reclaim all dead nodes parked in the recycler.
    pub fn free_all_cached(&self) {
        self.storage.borrow_mut().free_all_cached();
    }
}

// Sizes and diagnostics.
impl Kfdd {
    /// Number of distinct non-terminal nodes reachable from `roots`.
    pub fn size(&self, roots: &[Ref]) -> usize {
        let storage = self.storage.borrow();
        let mut visited = HashSet::new();
        let mut stack: Vec<u32> = roots.iter().map(|r| r.index()).collect();
        while let Some(index) = stack.pop() {
            if index == 0 || !visited.insert(index) {
                continue;
            }
            let node = storage.node(index);
            stack.push(node.low.index());
            stack.push(node.high.index());
        }
        visited.len()
    }

    /// Number of nodes in all unique tables, after reclaiming parked nodes.
    pub fn size_all(&self) -> usize {
        let mut storage = self.storage.borrow_mut();
        storage.free_all_cached();
        storage.size_all()
    }

    /// Number of nodes labelled `var`.
    pub fn level_size(&self, var: Var) -> usize {
        self.storage.borrow().level_size(var)
    }

    pub fn status(&self) -> Status {
        if self.storage.borrow().overflow() {
            Status::Overflow
        } else {
            Status::Ok
        }
    }

    pub fn stats(&self) -> KfddStats {
        let storage = self.storage.borrow();
        let cache = self.cache.borrow();
        KfddStats {
            vars: storage.num_vars(),
            nodes: storage.size_all(),
            peak_nodes: storage.peak(),
            unique_buckets: storage.subtables.iter().map(|s| s.num_buckets()).sum(),
            parked: storage.parked(),
            cache_entries: cache.len(),
            cache_hits: cache.hits(),
            cache_misses: cache.misses(),
            overflow: storage.overflow(),
        }
    }

    /// Compare every stored reference count with the structure.
    ///
    /// The expected count of a node is its number of incoming edges from
    /// linked nodes, plus its occurrences in `roots`, plus the registered
    /// outputs pointing at it. `roots` must list every handle the caller owns.
    pub fn check_refs(&self, roots: &[Ref]) -> Vec<RefMismatch> {
        let storage = self.storage.borrow();
        let mut expected = vec![0u32; storage.nodes.len()];
        let mut linked = Vec::new();
        for subtable in &storage.subtables {
            for index in subtable.indices(&storage.nodes) {
                let node = storage.node(index);
                expected[node.low.index() as usize] += 1;
                expected[node.high.index() as usize] += 1;
                linked.push(index);
            }
        }
        for r in roots {
            expected[r.index() as usize] += 1;
        }
        for (_, r) in self.names.borrow().outputs() {
            expected[r.index() as usize] += 1;
        }
        let mut mismatches: Vec<RefMismatch> = linked
            .into_iter()
            .filter_map(|index| {
                let actual = storage.node(index).ref_count;
                let expected = expected[index as usize];
                (actual != expected).then_some(RefMismatch {
                    index,
                    expected,
                    actual,
                })
            })
            .collect();
        mismatches.sort_by_key(|m| m.index);
        mismatches
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var() {
        let kfdd = Kfdd::default();
        let v = kfdd.add_var(DecompositionType::Shannon);
        let x = kfdd.mk_var(v);

        assert_eq!(kfdd.variable(x), Some(v));
        assert_eq!(kfdd.high(x), Ref::ONE);
        assert_eq!(kfdd.low(x), Ref::ZERO);
        assert_eq!(kfdd.low(-x), Ref::ONE);
        assert_eq!(kfdd.high(-x), Ref::ZERO);
    }

    #[test]
    fn test_var_davio() {
        let kfdd = Kfdd::default();
        let p = kfdd.add_var(DecompositionType::PositiveDavio);
        let n = kfdd.add_var(DecompositionType::NegativeDavio);

        let xp = kfdd.mk_var(p);
        assert!(xp.is_negated());
        assert_eq!((kfdd.low(xp), kfdd.high(xp)), (Ref::ZERO, Ref::ONE));

        let xn = kfdd.mk_var(n);
        assert!(!xn.is_negated());
        assert_eq!((kfdd.low(xn), kfdd.high(xn)), (Ref::ONE, Ref::ONE));
    }

    #[test]
    fn test_hash_consing_is_idempotent() {
        let kfdd = Kfdd::default();
        let vars = kfdd.add_vars(2);
        let y = kfdd.mk_var(vars[1]);

        let a = kfdd.mk_node(vars[0], y, Ref::ONE).unwrap();
        let b = kfdd.mk_node(vars[0], y, Ref::ONE).unwrap();
        assert_eq!(a, b);
        assert_eq!(kfdd.size(&[a]), 2);
        assert_eq!(kfdd.ref_count(a), 2);

        kfdd.free_all([a, b]);
        assert!(kfdd.check_refs(&[y]).is_empty());
        kfdd.free(y);
        assert_eq!(kfdd.size_all(), 0);
    }

    #[test]
    fn test_mk_node_rejects_bad_children() {
        let kfdd = Kfdd::default();
        let vars = kfdd.add_vars(2);
        let x = kfdd.mk_var(vars[0]);
        let y = kfdd.mk_var(vars[1]);

        // x1 is above x2.
        assert!(matches!(
            kfdd.mk_node(vars[1], Ref::ZERO, x),
            Err(KfddError::OrderViolation { child, .. }) if child == x
        ));
        assert!(matches!(
            kfdd.mk_node(vars[0], y, -x),
            Err(KfddError::OrderViolation { .. })
        ));
        assert!(matches!(
            kfdd.mk_node(Var::new(3), Ref::ZERO, Ref::ONE),
            Err(KfddError::UnknownLabel(3))
        ));

        kfdd.free(y);
        kfdd.free_all_cached();
        assert!(matches!(
            kfdd.mk_node(vars[0], y, Ref::ONE),
            Err(KfddError::NullOperand(_))
        ));
        assert_eq!(kfdd.size_all(), 1);
        kfdd.free(x);
    }

    #[test]
    fn test_check_refs_detects_leak() {
        let kfdd = Kfdd::default();
        let v = kfdd.add_vars(1)[0];
        let x = kfdd.mk_var(v);
        let _ = kfdd.retain(x);
        let mismatches = kfdd.check_refs(&[x]);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].expected, 1);
        assert_eq!(mismatches[0].actual, 2);
    }

    #[test]
    fn test_primaries() {
        let kfdd = Kfdd::new(KfddConfig::default().with_pi_limit(3));
        let a = kfdd.add_input("a").unwrap();
        let b = kfdd.add_input_with("b", DecompositionType::PositiveDavio).unwrap();
        assert_eq!(kfdd.input_label("a"), Some(a));
        assert_eq!(kfdd.decomposition(b), DecompositionType::PositiveDavio);
        assert_eq!(kfdd.input_name(b), "b");
        assert!(matches!(kfdd.add_input("a"), Err(KfddError::PrimaryExists(_))));
        assert_eq!(kfdd.num_vars(), 2);

        let x = kfdd.mk_var(a);
        kfdd.add_output("f", x).unwrap();
        kfdd.free(x);
        assert_eq!(kfdd.ref_count(x), 1);
        assert!(kfdd.check_refs(&[]).is_empty());
        assert!(matches!(kfdd.add_input("c"), Err(KfddError::PrimaryLimit(3))));

        kfdd.remove_output("f").unwrap();
        assert_eq!(kfdd.size_all(), 0);
    }

    #[test]
    fn test_validate() {
        let kfdd = Kfdd::default();
        assert!(kfdd.validate(Ref::ZERO).is_ok());
        assert!(matches!(kfdd.validate(Ref::positive(7)), Err(KfddError::NullOperand(_))));
    }

    #[test]
    fn test_overflow_status() {
        let kfdd = Kfdd::new(KfddConfig::default().with_node_limit(1));
        let vars = kfdd.add_vars(2);
        let x = kfdd.mk_var(vars[0]);
        assert_eq!(kfdd.status(), Status::Ok);
        let y = kfdd.mk_var(vars[1]);
        assert_eq!(kfdd.status(), Status::Overflow);
        assert!(kfdd.stats().overflow);
        kfdd.free_all([x, y]);
    }
}
