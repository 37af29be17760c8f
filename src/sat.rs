use std::collections::HashMap;

use num_bigint::BigUint;

use crate::kfdd::Kfdd;
use crate::reference::Ref;
use crate::types::Var;

impl Kfdd {
    /// Number of satisfying assignments of `f` over `num_vars` variables.
    ///
    /// Counts are first taken over all registered labels and then scaled, so
    /// `num_vars` should not be smaller than the number of labels `f`
    /// depends on.
    pub fn sat_count(&self, f: Ref, num_vars: usize) -> BigUint {
        let n = self.num_vars();
        let max = BigUint::from(1u32) << n;

        // Counts of regular nodes, by index.
        let mut memo: HashMap<u32, BigUint> = HashMap::new();
        memo.insert(0, max.clone());
        // Davio nodes count through the Shannon cofactors `l` and `l ⊕ h`.
        let mut xor_of: HashMap<u32, Ref> = HashMap::new();

        let mut stack = vec![(f.index(), false)];
        while let Some((index, expanded)) = stack.pop() {
            if memo.contains_key(&index) {
                continue;
            }
            let node = *self.storage.borrow().node(index);
            let dtl = self.decomposition(Var::new(node.variable));
            let second = if dtl.is_davio() {
                *xor_of
                    .entry(index)
                    .or_insert_with(|| self.apply_xor(node.low, node.high))
            } else {
                node.high
            };
            if !expanded {
                stack.push((index, true));
                stack.push((second.index(), false));
                stack.push((node.low.index(), false));
                continue;
            }
            let count_of = |r: Ref| {
                let c = &memo[&r.index()];
                if r.is_negated() {
                    &max - c
                } else {
                    c.clone()
                }
            };
            let count = (count_of(node.low) + count_of(second)) >> 1;
            memo.insert(index, count);
        }

        let count = if f.is_negated() {
            &max - &memo[&f.index()]
        } else {
            memo[&f.index()].clone()
        };
        self.free_all(xor_of.into_values());

        if num_vars >= n {
            count << (num_vars - n)
        } else {
            count >> (n - num_vars)
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::DecompositionType;

    #[test]
    fn test_sat_count_constants() {
        let kfdd = Kfdd::default();
        kfdd.add_vars(2);
        assert_eq!(kfdd.sat_count(Ref::ONE, 3), BigUint::from(8u32));
        assert_eq!(kfdd.sat_count(Ref::ZERO, 3), BigUint::ZERO);
    }

    #[test]
    fn test_sat_count_and() {
        let kfdd = Kfdd::default();
        let vars = kfdd.add_vars(2);
        let x1 = kfdd.mk_var(vars[0]);
        let x2 = kfdd.mk_var(vars[1]);
        let f = kfdd.apply_and(x1, x2);
        assert_eq!(kfdd.sat_count(f, 2), BigUint::from(1u32));
        assert_eq!(kfdd.sat_count(f, 3), BigUint::from(2u32));
        assert_eq!(kfdd.sat_count(-f, 2), BigUint::from(3u32));
    }

    #[test]
    fn test_sat_count_matches_truth_table() {
        use DecompositionType::*;
        for dtl in [[PositiveDavio, NegativeDavio, Shannon], [NegativeDavio, PositiveDavio, PositiveDavio]] {
            let kfdd = Kfdd::default();
            let xs: Vec<Ref> = dtl.iter().map(|&d| kfdd.mk_var(kfdd.add_var(d))).collect();
            let t = kfdd.apply_or(xs[0], xs[1]);
            let f = kfdd.apply_and(t, -xs[2]);
            let g = kfdd.apply_eq(xs[0], t);
            for h in [f, g, -f] {
                let ones = kfdd.truth_table(h).unwrap().iter().filter(|&&b| b).count();
                assert_eq!(kfdd.sat_count(h, 3), BigUint::from(ones));
            }
            kfdd.free_all([t, f, g]);
            // Temporaries are released again.
            assert!(kfdd.check_refs(&xs).is_empty());
        }
    }
}
