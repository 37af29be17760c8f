//! Variable reordering by adjacent level exchange.
//!
//! # Level exchange
//!
//! Swapping the variables `u` (at level `i`) and `w` (at level `i + 1`) only
//! touches the `u`-nodes with at least one child labelled `w`. Write such a
//! node through its four grandchildren, where `f_ij` is the `w`-coefficient
//! `j` of the `u`-coefficient `i`:
//!
//! ```text
//! f = Σ_i Σ_j  b_u,i(u) · b_w,j(w) · f_ij
//! ```
//!
//! with the basis functions `(~x, x)` for Shannon, `(1, x)` for positive
//! Davio and `(1, ~x)` for negative Davio, summed by XOR. The double sum
//! commutes, so the node becomes a `w`-node with
//! `low = mk(u, f00, f10)` and `high = mk(u, f01, f11)` for all nine pairs
//! of decomposition types. A child that skips the `w`-level is expanded as
//! `(c, c)` under Shannon and as `(c, 0)` under Davio.
//!
//! The rewritten node keeps its slot, identity and function, so outside
//! handles and computed-table entries stay valid. A `w`-child referenced only
//! by the rewritten node is turned into the new `u`-node in place.
//!
//! # Heuristics
//!
//! Sifting, permutation and exact minimization are built on top of the
//! exchange, see [`sifting`][crate::sifting] and
//! [`permutation`][crate::permutation].
//!
//! # References
//!
//! - R. Rudell. "Dynamic variable ordering for ordered binary decision diagrams."
//!   ICCAD 1993. DOI: 10.1109/ICCAD.1993.580054
//!
//! - R. Drechsler, B. Becker. "Ordered Kronecker functional decision diagrams:
//!   a data structure for representation and manipulation of Boolean functions."
//!   IEEE TCAD, 1998.

use log::{debug, info};

use crate::kfdd::Kfdd;
use crate::reference::Ref;
use crate::storage::Storage;
use crate::types::{Level, Var};

/// Statistics collected during reordering.
#[derive(Debug, Clone, Default)]
pub struct ReorderStats {
    /// Number of level exchanges performed
    pub swaps: usize,
    /// Cost before reordering
    pub initial_size: usize,
    /// Cost after reordering
    pub final_size: usize,
    /// Best cost seen during reordering
    pub best_size: usize,
    /// Number of variables processed
    pub variables_processed: usize,
}

impl ReorderStats {
    pub fn reduction_ratio(&self) -> f64 {
        if self.initial_size == 0 {
            return 0.0;
        }
        1.0 - (self.final_size as f64 / self.initial_size as f64)
    }

    pub fn reduction_percent(&self) -> f64 {
        self.reduction_ratio() * 100.0
    }
}

/// State of one level exchange.
struct Exchange<'a> {
    storage: &'a mut Storage,
    /// Moves down.
    upper: Var,
    /// Moves up.
    lower: Var,
    /// Edges released by in-place rewrites, dropped once the current node is done.
    deferred: Vec<Ref>,
}

impl Exchange<'_> {
    fn run(mut self, position: usize) -> usize {
        let storage = &mut *self.storage;
        let lower = self.lower;
        let pending: Vec<u32> = storage
            .level_nodes(self.upper)
            .into_iter()
            .filter(|&i| {
                let node = storage.node(i);
                storage.variable_of(node.low) == Some(lower) || storage.variable_of(node.high) == Some(lower)
            })
            .collect();
        for &i in &pending {
            storage.unlink(i);
        }
        for &i in &pending {
            self.rewrite(i);
        }
        self.storage.order.swap_adjacent(position);
        pending.len()
    }

    /// Coefficients of `c` with respect to the lower variable.
    fn split(&self, c: Ref) -> (Ref, Ref) {
        if self.storage.variable_of(c) == Some(self.lower) {
            self.storage.cofactors(c)
        } else if self.storage.decomposition(self.lower).is_davio() {
            (c, Ref::ZERO)
        } else {
            (c, c)
        }
    }

    fn rewrite(&mut self, index: u32) {
        let node = *self.storage.node(index);
        let (f00, f01) = self.split(node.low);
        let (f10, f11) = self.split(node.high);

        let low = self.build(f00, f10, node.low);
        let high = self.build(f01, f11, node.high);
        debug_assert!(!low.is_negated(), "low edge of @{} became complemented", index);

        let slot = &mut self.storage.nodes[index as usize];
        slot.variable = self.lower.id();
        slot.low = low;
        slot.high = high;
        self.storage.link(index);

        self.storage.free(node.low);
        self.storage.free(node.high);
        for r in self.deferred.drain(..) {
            self.storage.free(r);
        }
    }

    /// `mk(upper, low, high)`, reusing the slot of `old` when nothing else points at it.
    fn build(&mut self, low: Ref, high: Ref, old: Ref) -> Ref {
        let storage = &mut *self.storage;
        let reusable = storage.variable_of(old) == Some(self.lower)
            && storage.node(old.index()).ref_count == 1;
        if !reusable {
            return storage.find_or_create(self.upper, low, high);
        }

        let dtl = storage.decomposition(self.upper);
        let redundant = if dtl.is_davio() { high == Ref::ZERO } else { low == high };
        if redundant {
            storage.inc_ref(low);
            return low;
        }
        let negated = low.is_negated();
        let (low, high) = if negated {
            (-low, if dtl.is_davio() { high } else { -high })
        } else {
            (low, high)
        };
        if let Some(i) = storage.subtables[self.upper.slot()].find(low, high, &storage.nodes) {
            storage.inc_ref(Ref::positive(i));
            return Ref::new(i, negated);
        }

        let index = old.index();
        let previous = *storage.node(index);
        storage.unlink(index);
        storage.inc_ref(low);
        storage.inc_ref(high);
        let id = storage.fresh_id();
        let slot = &mut storage.nodes[index as usize];
        slot.variable = self.upper.id();
        slot.low = low;
        slot.high = high;
        slot.id = id;
        slot.switched = false;
        // One count for the new edge; the old edge is dropped by the caller.
        slot.ref_count += 1;
        storage.link(index);
        self.deferred.push(previous.low);
        self.deferred.push(previous.high);
        Ref::new(index, negated)
    }
}

impl Kfdd {
    /// Swap the variables at `level` and `level + 1`.
    ///
    /// Every function keeps its handle. Returns the number of rewritten nodes.
    pub fn level_exchange(&self, level: Level) -> usize {
        let position = level.index();
        let mut storage = self.storage.borrow_mut();
        if position + 1 >= storage.num_vars() {
            return 0;
        }
        let upper = storage.order.var_at(position);
        let lower = storage.order.var_at(position + 1);
        debug!("level_exchange({}: {} <-> {})", level, upper, lower);
        storage.free_all_cached();
        let exchange = Exchange {
            storage: &mut storage,
            upper,
            lower,
            deferred: Vec::new(),
        };
        let rewritten = exchange.run(position);
        storage.free_all_cached();
        rewritten
    }

    /// Move `var` to `target` by adjacent exchanges. Returns the number of exchanges.
    pub fn move_var(&self, var: Var, target: Level) -> usize {
        let mut current = self.level_of(var).index();
        let target = target.index().min(self.num_vars().saturating_sub(1));
        let mut swaps = 0;
        while current > target {
            self.level_exchange(Level::new(current - 1));
            current -= 1;
            swaps += 1;
        }
        while current < target {
            self.level_exchange(Level::new(current));
            current += 1;
            swaps += 1;
        }
        swaps
    }

    /// Bring the variables into `order`, top to bottom. Returns the number of exchanges.
    ///
    /// Variables missing from `order` keep their relative order below the listed ones.
    pub fn establish_order(&self, order: &[Var]) -> usize {
        let mut swaps = 0;
        for (position, &var) in order.iter().enumerate().take(self.num_vars()) {
            swaps += self.move_var(var, Level::new(position));
        }
        swaps
    }

    /// Reverse the order of the levels `start..=stop`.
    pub fn inversion(&self, start: Level, stop: Level) -> ReorderStats {
        let initial_size = self.size_all();
        let mut order = self.order();
        if order.is_empty() {
            return ReorderStats {
                initial_size,
                final_size: initial_size,
                best_size: initial_size,
                ..Default::default()
            };
        }
        let stop = stop.index().min(order.len() - 1);
        let start = start.index().min(stop);
        order[start..=stop].reverse();
        let swaps = self.establish_order(&order);
        let final_size = self.size_all();
        info!(
            "inversion({}..={}): size {} -> {}, {} swaps",
            start, stop, initial_size, final_size, swaps
        );
        ReorderStats {
            swaps,
            initial_size,
            final_size,
            best_size: initial_size.min(final_size),
            variables_processed: stop + 1 - start,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_log::test;

    use super::*;
    use crate::apply::Op;
    use crate::types::DecompositionType;

    /// Random functions over the given decomposition types, with their truth tables.
    fn random_functions(kfdd: &Kfdd, rng: &mut StdRng, count: usize) -> (Vec<Ref>, Vec<Vec<bool>>) {
        let xs: Vec<Ref> = (1..=kfdd.num_vars() as u32).map(|v| kfdd.mk_var(Var::new(v))).collect();
        let mut pool: Vec<Ref> = xs.iter().map(|&x| kfdd.retain(x)).collect();
        for _ in 0..count {
            let f = pool[rng.gen_range(0..pool.len())];
            let g = pool[rng.gen_range(0..pool.len())];
            let op = Op::ALL[rng.gen_range(0..Op::ALL.len())];
            pool.push(kfdd.synthesize(op, f, g).unwrap());
        }
        kfdd.free_all(xs);
        let tables = pool.iter().map(|&r| kfdd.truth_table(r).unwrap()).collect();
        (pool, tables)
    }

    fn random_manager(rng: &mut StdRng, n: usize) -> Kfdd {
        let kfdd = Kfdd::default();
        for _ in 0..n {
            kfdd.add_var(DecompositionType::ALL[rng.gen_range(0..3)]);
        }
        kfdd
    }

    #[test]
    fn test_exchange_shannon() {
        let kfdd = Kfdd::default();
        let vars = kfdd.add_vars(3);
        let x: Vec<Ref> = vars.iter().map(|&v| kfdd.mk_var(v)).collect();
        // f = x1·x2 + x3
        let t = kfdd.apply_and(x[0], x[1]);
        let f = kfdd.apply_or(t, x[2]);
        let table = kfdd.truth_table(f).unwrap();

        kfdd.level_exchange(Level::new(0));
        assert_eq!(kfdd.order(), vec![vars[1], vars[0], vars[2]]);
        assert_eq!(kfdd.truth_table(f).unwrap(), table);
        assert_eq!(kfdd.level_of(vars[1]), Level::new(0));

        kfdd.level_exchange(Level::new(1));
        assert_eq!(kfdd.order(), vec![vars[1], vars[2], vars[0]]);
        assert_eq!(kfdd.truth_table(f).unwrap(), table);

        let mut handles = x.clone();
        handles.extend([t, f]);
        assert!(kfdd.check_refs(&handles).is_empty());
    }

    #[test]
    fn test_exchange_bottom_is_noop() {
        let kfdd = Kfdd::default();
        kfdd.add_vars(2);
        assert_eq!(kfdd.level_exchange(Level::new(1)), 0);
    }

    #[test]
    fn test_exchange_preserves_semantics() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let kfdd = random_manager(&mut rng, 5);
            let (roots, tables) = random_functions(&kfdd, &mut rng, 12);
            for _ in 0..15 {
                kfdd.level_exchange(Level::new(rng.gen_range(0..4)));
                for (&r, table) in roots.iter().zip(&tables) {
                    assert_eq!(&kfdd.truth_table(r).unwrap(), table);
                }
            }
            assert!(kfdd.check_refs(&roots).is_empty());
            kfdd.free_all(roots);
            assert_eq!(kfdd.size_all(), 0);
        }
    }

    #[test]
    fn test_exchange_is_canonical() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..20 {
            let kfdd = random_manager(&mut rng, 4);
            let a = kfdd.mk_var(Var::new(1));
            let b = kfdd.mk_var(Var::new(2));
            let c = kfdd.mk_var(Var::new(3));
            let d = kfdd.mk_var(Var::new(4));
            let ab = kfdd.apply_and(a, b);
            let cd = kfdd.apply_xor(c, -d);
            let f = kfdd.apply_or(ab, cd);
            kfdd.free_all([ab, cd]);
            let size = kfdd.size(&[f]);

            kfdd.level_exchange(Level::new(1));
            kfdd.level_exchange(Level::new(0));

            // Building the function again in the new order finds the same node.
            let ab = kfdd.apply_and(a, b);
            let cd = kfdd.apply_xor(c, -d);
            let g = kfdd.apply_or(ab, cd);
            assert_eq!(g, f);

            // Exchanging back restores the size.
            kfdd.level_exchange(Level::new(0));
            kfdd.level_exchange(Level::new(1));
            assert_eq!(kfdd.size(&[f]), size);
            kfdd.free_all([ab, cd, g]);
        }
    }

    #[test]
    fn test_in_place_rewrite_keeps_counts() {
        let kfdd = Kfdd::default();
        let vars = kfdd.add_vars(3);
        let x: Vec<Ref> = vars.iter().map(|&v| kfdd.mk_var(v)).collect();
        let t = kfdd.apply_xor(x[1], x[2]);
        let f = kfdd.apply_and(x[0], t);
        // The x2-child of f is only referenced by f itself.
        kfdd.free_all([x[1], x[2], t]);
        let table = kfdd.truth_table(f).unwrap();

        kfdd.level_exchange(Level::new(0));
        assert_eq!(kfdd.truth_table(f).unwrap(), table);
        assert!(kfdd.check_refs(&[x[0], f]).is_empty());
    }

    #[test]
    fn test_establish_order_and_inversion() {
        let kfdd = Kfdd::default();
        let vars = kfdd.add_vars(4);
        let x: Vec<Ref> = vars.iter().map(|&v| kfdd.mk_var(v)).collect();
        let f = kfdd.apply_many(Op::And, Ref::ONE, x.iter().copied()).unwrap();
        let table = kfdd.truth_table(f).unwrap();

        let target = vec![vars[2], vars[0], vars[3], vars[1]];
        kfdd.establish_order(&target);
        assert_eq!(kfdd.order(), target);

        let stats = kfdd.inversion(Level::new(0), Level::new(3));
        assert_eq!(kfdd.order(), vec![vars[1], vars[3], vars[0], vars[2]]);
        assert_eq!(stats.variables_processed, 4);
        assert_eq!(kfdd.truth_table(f).unwrap(), table);
    }

    #[test]
    fn test_reorder_stats() {
        let stats = ReorderStats {
            swaps: 10,
            initial_size: 100,
            final_size: 80,
            best_size: 75,
            variables_processed: 5,
        };

        assert!((stats.reduction_ratio() - 0.2).abs() < 1e-10);
        assert!((stats.reduction_percent() - 20.0).abs() < 1e-8);
    }
}
