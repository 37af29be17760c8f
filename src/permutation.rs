//! Exhaustive and exact reordering of a window of levels.
//!
//! Permutation walks through every order of the window with one adjacent
//! exchange per step (plain changes), and DTL permutation additionally
//! walks through every decomposition assignment with one type change per
//! step (a reflected ternary Gray code).
//!
//! Friedman's method finds the optimal order without visiting all of them.
//! The number of nodes labelled `v` only depends on the set of variables
//! above `v`, so with `cost[S]` the smallest total width of the window
//! variables in `S` placed on top of the window,
//!
//! ```text
//! cost[S] = min over v in S of cost[S \ {v}] + width(v below S \ {v})
//! ```
//!
//! # References
//!
//! - S. J. Friedman, K. J. Supowit. "Finding the optimal variable ordering
//!   for binary decision diagrams." IEEE Trans. Computers, 1990.
//!   DOI: 10.1109/12.54841
//!
//! - R. Drechsler, N. Drechsler, W. Günther. "Fast exact minimization of BDDs."
//!   DAC 1998.

use log::{debug, info};

use crate::kfdd::Kfdd;
use crate::reorder::ReorderStats;
use crate::types::{DecompositionType, Level, Var};

/// Exchange positions that walk through all `k!` orders of `k` elements.
///
/// Position `i` exchanges the elements at `i` and `i + 1`.
pub fn plain_changes(k: usize) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..k).collect();
    // true: the element looks to its left.
    let mut left = vec![true; k];
    let mut steps = Vec::new();
    loop {
        let mobile = (0..k)
            .filter(|&i| {
                let e = perm[i];
                if left[e] {
                    i > 0 && perm[i - 1] < e
                } else {
                    i + 1 < k && perm[i + 1] < e
                }
            })
            .max_by_key(|&i| perm[i]);
        let Some(i) = mobile else {
            break;
        };
        let e = perm[i];
        let j = if left[e] { i - 1 } else { i + 1 };
        perm.swap(i, j);
        steps.push(i.min(j));
        for (x, l) in left.iter_mut().enumerate() {
            if x > e {
                *l = !*l;
            }
        }
    }
    steps
}

/// Digit changes that walk through all `3^k` ternary words, one digit per step.
///
/// Each step is `(digit, new value)`.
pub fn ternary_gray(k: usize) -> Vec<(usize, usize)> {
    let mut word = vec![0i32; k];
    let mut direction = vec![1i32; k];
    let mut steps = Vec::new();
    loop {
        let mut i = 0;
        while i < k && !(0..3).contains(&(word[i] + direction[i])) {
            direction[i] = -direction[i];
            i += 1;
        }
        if i == k {
            return steps;
        }
        word[i] += direction[i];
        steps.push((i, word[i] as usize));
    }
}

/// Current window bounds, clamped to the order.
fn clamp(kfdd: &Kfdd, start: Level, stop: Level) -> Option<(usize, usize)> {
    let n = kfdd.num_vars();
    if n == 0 {
        return None;
    }
    let stop = stop.index().min(n - 1);
    Some((start.index().min(stop), stop))
}

impl Kfdd {
    /// Decomposition types of `vars`, step by step through all assignments.
    ///
    /// `visit` is called once per assignment, starting with the current one.
    fn for_each_dtl(&self, vars: &[Var], mut visit: impl FnMut(&Kfdd)) {
        // Digit value 0 is the current type of each variable.
        let choices: Vec<[DecompositionType; 3]> = vars
            .iter()
            .map(|&v| {
                let d = self.decomposition(v).index();
                [0, 1, 2].map(|k| DecompositionType::ALL[(d + k) % 3])
            })
            .collect();
        visit(self);
        for (digit, value) in ternary_gray(vars.len()) {
            self.change_decomposition(vars[digit], choices[digit][value], &mut []);
            visit(self);
        }
    }

    fn apply_dtl(&self, vars: &[Var], dtl: &[DecompositionType]) {
        for (&v, &d) in vars.iter().zip(dtl) {
            self.change_decomposition(v, d, &mut []);
        }
    }

    /// Try every order of the levels `start..=stop` and keep the smallest diagram.
    pub fn permutation(&self, start: Level, stop: Level) -> ReorderStats {
        self.permute(start, stop, false)
    }

    /// Try every order and every decomposition assignment of the levels `start..=stop`.
    ///
    /// Only the registered outputs are kept up to date.
    pub fn dtl_permutation(&self, start: Level, stop: Level) -> ReorderStats {
        self.permute(start, stop, true)
    }

    fn permute(&self, start: Level, stop: Level, with_dtl: bool) -> ReorderStats {
        let initial = self.size_all();
        let mut stats = ReorderStats {
            initial_size: initial,
            best_size: initial,
            final_size: initial,
            ..Default::default()
        };
        let Some((start, stop)) = clamp(self, start, stop) else {
            return stats;
        };
        let window: Vec<Var> = self.order()[start..=stop].to_vec();
        let mut best = (initial, self.order(), self.dtl_of(&window));

        let record = |kfdd: &Kfdd, best: &mut (usize, Vec<Var>, Vec<DecompositionType>)| {
            let size = kfdd.size_all();
            if size < best.0 {
                *best = (size, kfdd.order(), kfdd.dtl_of(&window));
            }
        };

        let steps = plain_changes(window.len());
        for i in 0..=steps.len() {
            if i > 0 {
                self.level_exchange(Level::new(start + steps[i - 1]));
                stats.swaps += 1;
            }
            if with_dtl {
                self.for_each_dtl(&window, |kfdd| record(kfdd, &mut best));
            } else {
                record(self, &mut best);
            }
        }

        stats.swaps += self.establish_order(&best.1);
        if with_dtl {
            self.apply_dtl(&window, &best.2);
        }
        stats.best_size = best.0;
        stats.final_size = self.size_all();
        stats.variables_processed = window.len();
        info!(
            "{}permutation({}..={}): size {} -> {}, {} swaps",
            if with_dtl { "DTL " } else { "" },
            start,
            stop,
            stats.initial_size,
            stats.final_size,
            stats.swaps
        );
        stats
    }

    /// Run [`permutation`][Kfdd::permutation] on every window of `size` consecutive
    /// levels inside `start..=stop`, top to bottom.
    pub fn window_permutation(&self, start: Level, stop: Level, size: usize) -> ReorderStats {
        let initial = self.size_all();
        let mut stats = ReorderStats {
            initial_size: initial,
            best_size: initial,
            final_size: initial,
            ..Default::default()
        };
        let Some((start, stop)) = clamp(self, start, stop) else {
            return stats;
        };
        let size = size.clamp(1, stop - start + 1);
        for first in start..=stop + 1 - size {
            let s = self.permutation(Level::new(first), Level::new(first + size - 1));
            stats.swaps += s.swaps;
            stats.best_size = stats.best_size.min(s.best_size);
        }
        stats.final_size = self.size_all();
        stats.variables_processed = stop - start + 1;
        stats
    }

    fn dtl_of(&self, vars: &[Var]) -> Vec<DecompositionType> {
        vars.iter().map(|&v| self.decomposition(v)).collect()
    }

    /// Number of nodes labelled `var` once the recycler is drained.
    fn width(&self, var: Var) -> usize {
        self.free_all_cached();
        self.level_size(var)
    }

    /// Optimal order of `window` below `above` with the current decomposition types.
    ///
    /// Leaves the diagram in that order and returns the swaps spent.
    fn friedman_order(&self, above: &[Var], window: &[Var], below: &[Var]) -> usize {
        let k = window.len();
        let full = (1usize << k) - 1;
        let mut cost = vec![usize::MAX; 1 << k];
        // Window variable placed last in the best order of each subset.
        let mut last = vec![0usize; 1 << k];
        cost[0] = 0;
        let mut swaps = 0;

        // Best order of `mask`, walking back through `last`.
        let order_of = |mask: usize, last: &[usize]| {
            let mut vars = Vec::new();
            let mut m = mask;
            while m != 0 {
                let v = last[m];
                vars.push(window[v]);
                m &= !(1 << v);
            }
            vars.reverse();
            vars
        };

        let mut masks: Vec<usize> = (1..=full).collect();
        masks.sort_by_key(|m| m.count_ones());
        for mask in masks {
            for v in (0..k).filter(|&v| mask & (1 << v) != 0) {
                let prev = mask & !(1 << v);
                let mut order = above.to_vec();
                order.extend(order_of(prev, &last));
                order.push(window[v]);
                order.extend((0..k).filter(|&u| mask & (1 << u) == 0).map(|u| window[u]));
                order.extend_from_slice(below);
                swaps += self.establish_order(&order);
                let c = cost[prev] + self.width(window[v]);
                if c < cost[mask] {
                    cost[mask] = c;
                    last[mask] = v;
                }
            }
        }

        let mut order = above.to_vec();
        order.extend(order_of(full, &last));
        order.extend_from_slice(below);
        swaps += self.establish_order(&order);
        debug!("friedman_order: window width {}", cost[full]);
        swaps
    }

    /// Exact minimization of the node count over all orders of the levels `start..=stop`.
    pub fn friedman(&self, start: Level, stop: Level) -> ReorderStats {
        self.exact(start, stop, false)
    }

    /// Exact minimization over all orders and decomposition assignments of the
    /// levels `start..=stop`.
    ///
    /// Only the registered outputs are kept up to date.
    pub fn dtl_friedman(&self, start: Level, stop: Level) -> ReorderStats {
        self.exact(start, stop, true)
    }

    fn exact(&self, start: Level, stop: Level, with_dtl: bool) -> ReorderStats {
        let initial = self.size_all();
        let mut stats = ReorderStats {
            initial_size: initial,
            best_size: initial,
            final_size: initial,
            ..Default::default()
        };
        let Some((start, stop)) = clamp(self, start, stop) else {
            return stats;
        };
        let order = self.order();
        let (above, rest) = order.split_at(start);
        let (window, below) = rest.split_at(stop - start + 1);
        let (above, window, below) = (above.to_vec(), window.to_vec(), below.to_vec());

        if with_dtl {
            let mut best = (initial, order.clone(), self.dtl_of(&window));
            let mut swaps = 0;
            self.for_each_dtl(&window, |kfdd| {
                swaps += kfdd.friedman_order(&above, &window, &below);
                let size = kfdd.size_all();
                if size < best.0 {
                    best = (size, kfdd.order(), kfdd.dtl_of(&window));
                }
            });
            stats.swaps = swaps + self.establish_order(&best.1);
            self.apply_dtl(&window, &best.2);
        } else {
            stats.swaps = self.friedman_order(&above, &window, &below);
        }

        stats.final_size = self.size_all();
        stats.best_size = stats.final_size.min(initial);
        stats.variables_processed = window.len();
        info!(
            "{}friedman({}..={}): size {} -> {}, {} swaps",
            if with_dtl { "DTL " } else { "" },
            start,
            stop,
            stats.initial_size,
            stats.final_size,
            stats.swaps
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_log::test;

    use super::*;
    use crate::apply::Op;
    use crate::reference::Ref;

    #[test]
    fn test_plain_changes_visits_all_orders() {
        for k in 0..=5 {
            let steps = plain_changes(k);
            let mut perm: Vec<usize> = (0..k).collect();
            let mut seen = HashSet::new();
            seen.insert(perm.clone());
            for &i in &steps {
                perm.swap(i, i + 1);
                seen.insert(perm.clone());
            }
            let factorial: usize = (1..=k).product();
            assert_eq!(seen.len(), factorial);
            assert_eq!(steps.len(), factorial - 1);
        }
    }

    #[test]
    fn test_ternary_gray_visits_all_words() {
        for k in 0..=4 {
            let mut word = vec![0; k];
            let mut seen = HashSet::new();
            seen.insert(word.clone());
            for (digit, value) in ternary_gray(k) {
                assert_eq!((word[digit] as i32 - value as i32).abs(), 1);
                word[digit] = value;
                seen.insert(word.clone());
            }
            assert_eq!(seen.len(), 3usize.pow(k as u32));
        }
    }

    /// `x1·x4 + x2·x5 + x3·x6`, registered as output `f`.
    fn interleaved(kfdd: &Kfdd) -> Vec<bool> {
        let vars = kfdd.add_vars(6);
        let xs: Vec<Ref> = vars.iter().map(|&v| kfdd.mk_var(v)).collect();
        let terms: Vec<Ref> = (0..3).map(|i| kfdd.apply_and(xs[i], xs[i + 3])).collect();
        let f = kfdd.apply_many(Op::Or, Ref::ZERO, terms.iter().copied()).unwrap();
        kfdd.add_output("f", f).unwrap();
        kfdd.free_all(xs);
        kfdd.free_all(terms);
        kfdd.free(f);
        kfdd.truth_table(kfdd.output_root("f").unwrap()).unwrap()
    }

    #[test]
    fn test_permutation_finds_pairing() {
        let kfdd = Kfdd::default();
        let table = interleaved(&kfdd);
        let stats = kfdd.permutation(Level::new(0), Level::new(5));
        assert_eq!(stats.final_size, 6);
        assert_eq!(kfdd.size_all(), 6);
        assert_eq!(stats.variables_processed, 6);
        assert_eq!(kfdd.truth_table(kfdd.output_root("f").unwrap()).unwrap(), table);
    }

    #[test]
    fn test_friedman_finds_pairing() {
        let kfdd = Kfdd::default();
        let table = interleaved(&kfdd);
        let stats = kfdd.friedman(Level::new(0), Level::new(5));
        assert_eq!(stats.final_size, 6);
        assert_eq!(kfdd.truth_table(kfdd.output_root("f").unwrap()).unwrap(), table);
        assert!(kfdd.check_refs(&[]).is_empty());
    }

    #[test]
    fn test_window_permutation() {
        let kfdd = Kfdd::default();
        let table = interleaved(&kfdd);
        let order = kfdd.order();
        let stats = kfdd.window_permutation(Level::new(1), Level::new(4), 2);
        assert!(stats.final_size <= stats.initial_size);
        assert_eq!(kfdd.order()[0], order[0]);
        assert_eq!(kfdd.order()[5], order[5]);
        assert_eq!(kfdd.truth_table(kfdd.output_root("f").unwrap()).unwrap(), table);
    }

    /// Random outputs over `n` variables with random decomposition types.
    fn random_outputs(rng: &mut StdRng, n: usize) -> (Kfdd, Vec<Vec<bool>>) {
        let kfdd = Kfdd::default();
        for _ in 0..n {
            kfdd.add_var(DecompositionType::ALL[rng.gen_range(0..3)]);
        }
        let mut pool: Vec<Ref> = (1..=n as u32).map(|v| kfdd.mk_var(Var::new(v))).collect();
        for _ in 0..6 {
            let f = pool[rng.gen_range(0..pool.len())];
            let g = pool[rng.gen_range(0..pool.len())];
            let op = Op::ALL[rng.gen_range(0..Op::ALL.len())];
            pool.push(kfdd.synthesize(op, f, g).unwrap());
        }
        for (i, &r) in pool[pool.len() - 2..].iter().enumerate() {
            kfdd.add_output(&format!("f{}", i), r).unwrap();
        }
        kfdd.free_all(pool);
        let tables = kfdd.outputs().iter().map(|(_, r)| kfdd.truth_table(*r).unwrap()).collect();
        (kfdd, tables)
    }

    fn assert_outputs(kfdd: &Kfdd, tables: &[Vec<bool>]) {
        for ((_, r), table) in kfdd.outputs().iter().zip(tables) {
            assert_eq!(&kfdd.truth_table(*r).unwrap(), table);
        }
        assert!(kfdd.check_refs(&[]).is_empty());
    }

    #[test]
    fn test_friedman_matches_permutation() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..10 {
            let (kfdd, tables) = random_outputs(&mut rng, 4);
            let exact = kfdd.friedman(Level::new(0), Level::new(3)).final_size;
            assert_outputs(&kfdd, &tables);
            let exhaustive = kfdd.permutation(Level::new(0), Level::new(3)).final_size;
            assert_outputs(&kfdd, &tables);
            assert_eq!(exact, exhaustive);
        }
    }

    #[test]
    fn test_dtl_friedman_matches_dtl_permutation() {
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..5 {
            let (kfdd, tables) = random_outputs(&mut rng, 3);
            let plain = kfdd.size_all();
            let exact = kfdd.dtl_friedman(Level::new(0), Level::new(2)).final_size;
            assert!(exact <= plain);
            assert_outputs(&kfdd, &tables);
            let exhaustive = kfdd.dtl_permutation(Level::new(0), Level::new(2)).final_size;
            assert_outputs(&kfdd, &tables);
            assert_eq!(exact, exhaustive);
        }
    }
}
