//! Changing the decomposition type of a variable in place.
//!
//! Every node of the level is rewritten through its Shannon cofactors:
//!
//! | from | c0      | c1      |    | to | low | high     |
//! |------|---------|---------|----|----|-----|----------|
//! | S    | l       | h       |    | S  | c0  | c1       |
//! | pD   | l       | l ⊕ h   |    | pD | c0  | c0 ⊕ c1  |
//! | nD   | l ⊕ h   | l       |    | nD | c1  | c0 ⊕ c1  |
//!
//! A rewritten node whose new low edge is complemented cannot keep both its
//! function and a regular low edge. It is *switched*: it now stores the
//! complement of its function, and every edge pointing at it is flipped.
//! Flipping an edge may in turn switch the parent, so the pass walks up the
//! order level by level.

use std::collections::HashSet;

use log::debug;

use crate::kfdd::Kfdd;
use crate::reference::Ref;
use crate::storage::Storage;
use crate::types::{DecompositionType, Var};

/// Move a complement off the low edge. Returns the new children and whether the node switched.
fn normalize(dtl: DecompositionType, low: Ref, high: Ref) -> (Ref, Ref, bool) {
    if low.is_negated() {
        let high = if dtl.is_davio() { high } else { -high };
        (-low, high, true)
    } else {
        (low, high, false)
    }
}

impl Storage {
    /// Flip edges into `switched` nodes on every level above `position`.
    ///
    /// Parents that end up with a complemented low edge switch as well and
    /// are added to the set.
    fn propagate_switch(&mut self, position: usize, switched: &mut HashSet<u32>) {
        for level in (0..position).rev() {
            if switched.is_empty() {
                return;
            }
            let var = self.order.var_at(level);
            let dtl = self.decomposition(var);
            let affected: Vec<u32> = self
                .level_nodes(var)
                .into_iter()
                .filter(|&i| {
                    let node = self.node(i);
                    switched.contains(&node.low.index()) || switched.contains(&node.high.index())
                })
                .collect();
            for &i in &affected {
                self.unlink(i);
            }
            let mut newly = Vec::new();
            for &i in &affected {
                let node = &mut self.nodes[i as usize];
                let low = node.low.negate_if(switched.contains(&node.low.index()));
                let high = node.high.negate_if(switched.contains(&node.high.index()));
                let (low, high, switch) = normalize(dtl, low, high);
                node.low = low;
                node.high = high;
                if switch {
                    node.switched = !node.switched;
                    newly.push(i);
                }
            }
            for &i in &affected {
                self.link(i);
            }
            switched.extend(newly);
        }
    }
}

impl Kfdd {
    /// Change the decomposition type of `var`, keeping every function intact.
    ///
    /// Handles in `roots` and the registered outputs are updated when their
    /// node gets switched. Other handles into the levels above `var` may
    /// change sign.
    pub fn change_decomposition(&self, var: Var, dtl: DecompositionType, roots: &mut [Ref]) {
        let old = self.decomposition(var);
        if old == dtl {
            return;
        }
        debug!("change_decomposition(var = {}, {} -> {})", var, old, dtl);
        self.free_all_cached();

        let pending = {
            let mut storage = self.storage.borrow_mut();
            let storage = &mut *storage;
            storage.subtables[var.slot()].take_all(&mut storage.nodes)
        };

        // New children of every node, computed while the level is unlinked.
        // Operations on the children only create nodes below this level.
        let mut rebuilt = Vec::with_capacity(pending.len());
        for index in pending {
            let node = *self.storage.borrow().node(index);
            let (l, h) = (node.low, node.high);
            let (c0, c1) = match old {
                DecompositionType::Shannon => (self.retain(l), self.retain(h)),
                DecompositionType::PositiveDavio => (self.retain(l), self.apply_xor(l, h)),
                DecompositionType::NegativeDavio => (self.apply_xor(l, h), self.retain(l)),
            };
            let (low, high) = match dtl {
                DecompositionType::Shannon => (self.retain(c0), self.retain(c1)),
                DecompositionType::PositiveDavio => (self.retain(c0), self.apply_xor(c0, c1)),
                DecompositionType::NegativeDavio => (self.retain(c1), self.apply_xor(c0, c1)),
            };
            self.free_all([c0, c1]);
            rebuilt.push((index, low, high));
        }

        let mut switched = HashSet::new();
        {
            let mut storage = self.storage.borrow_mut();
            storage.subtables[var.slot()].decomposition = dtl;
            for (index, low, high) in rebuilt {
                let (low, high, switch) = normalize(dtl, low, high);
                debug_assert!(if dtl.is_davio() { high != Ref::ZERO } else { low != high });
                let node = &mut storage.nodes[index as usize];
                let (old_low, old_high) = (node.low, node.high);
                node.low = low;
                node.high = high;
                if switch {
                    node.switched = !node.switched;
                    switched.insert(index);
                }
                storage.link(index);
                storage.free(old_low);
                storage.free(old_high);
            }
            let position = storage.order.position_of(var);
            storage.propagate_switch(position, &mut switched);
        }

        let flip = |r: Ref| r.negate_if(switched.contains(&r.index()));
        for r in roots.iter_mut() {
            *r = flip(*r);
        }
        self.names.borrow_mut().update_outputs(flip);
        debug!("change_decomposition: {} nodes switched", switched.len());
        self.free_all_cached();
    }

    /// Set the decomposition type of every level, top to bottom.
    pub fn set_dtl(&self, dtl: &[DecompositionType], roots: &mut [Ref]) {
        for (level, &d) in dtl.iter().enumerate().take(self.num_vars()) {
            let var = self.order()[level];
            self.change_decomposition(var, d, roots);
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

    /// Builds `(x1 · x2) ⊕ (x3 + ~x4) ⊕ (x2 · x4)` and returns every owned handle, root last.
    fn build(kfdd: &Kfdd, vars: &[Var]) -> Vec<Ref> {
        let xs: Vec<Ref> = vars.iter().map(|&v| kfdd.mk_var(v)).collect();
        let a = kfdd.apply_and(xs[0], xs[1]);
        let b = kfdd.apply_or(xs[2], -xs[3]);
        let c = kfdd.apply_and(xs[1], xs[3]);
        let t = kfdd.apply_xor(a, b);
        let f = kfdd.apply_xor(t, c);
        kfdd.free_all([a, b, c, t]);
        let mut handles = xs;
        handles.push(f);
        handles
    }

    #[test]
    fn test_change_preserves_functions() {
        let kfdd = Kfdd::default();
        let vars = kfdd.add_vars(4);
        let mut handles = build(&kfdd, &vars);
        let tables: Vec<Vec<bool>> = handles.iter().map(|&r| kfdd.truth_table(r).unwrap()).collect();

        for (&v, d) in vars.iter().zip([
            DecompositionType::PositiveDavio,
            DecompositionType::NegativeDavio,
            DecompositionType::PositiveDavio,
            DecompositionType::NegativeDavio,
        ]) {
            kfdd.change_decomposition(v, d, &mut handles);
            for (r, table) in handles.iter().zip(&tables) {
                assert_eq!(&kfdd.truth_table(*r).unwrap(), table);
            }
            assert!(kfdd.check_refs(&handles).is_empty());
        }
    }

    #[test]
    fn test_change_is_canonical() {
        use DecompositionType::*;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let kfdd = Kfdd::default();
            let vars = kfdd.add_vars(4);
            let mut handles = build(&kfdd, &vars);
            let v = vars[rng.gen_range(0..4)];
            let d = [Shannon, PositiveDavio, NegativeDavio][rng.gen_range(0..3)];
            kfdd.change_decomposition(v, d, &mut handles);

            // Rebuilding from scratch under the new types gives the same handle.
            let fresh = build(&kfdd, &vars);
            assert_eq!(fresh, handles);
            kfdd.free_all(fresh);
        }
    }

    #[test]
    fn test_switch_updates_outputs() {
        let kfdd = Kfdd::default();
        let x = kfdd.add_input("x").unwrap();
        let y = kfdd.add_input("y").unwrap();
        let fx = kfdd.mk_var(x);
        let fy = kfdd.mk_var(y);
        let f = kfdd.synthesize(Op::Or, fx, fy).unwrap();
        kfdd.add_output("f", f).unwrap();
        kfdd.free_all([fx, fy, f]);
        let table = kfdd.truth_table(kfdd.output_root("f").unwrap()).unwrap();

        kfdd.change_decomposition(y, DecompositionType::NegativeDavio, &mut []);
        kfdd.change_decomposition(x, DecompositionType::PositiveDavio, &mut []);
        let root = kfdd.output_root("f").unwrap();
        assert_eq!(kfdd.truth_table(root).unwrap(), table);
        assert!(kfdd.check_refs(&[]).is_empty());
    }

    #[test]
    fn test_set_dtl() {
        use DecompositionType::*;
        let kfdd = Kfdd::default();
        let vars = kfdd.add_vars(4);
        let mut handles = build(&kfdd, &vars);
        let root = *handles.last().unwrap();
        let table = kfdd.truth_table(root).unwrap();
        kfdd.set_dtl(&[NegativeDavio, Shannon, PositiveDavio, PositiveDavio], &mut handles);
        assert_eq!(kfdd.dtl(), vec![NegativeDavio, Shannon, PositiveDavio, PositiveDavio]);
        assert_eq!(kfdd.truth_table(*handles.last().unwrap()).unwrap(), table);
    }
}
