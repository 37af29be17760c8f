//! Sifting: move one variable at a time to its locally best level.
//!
//! A sifted variable first walks toward the closer end of the window,
//! then to the other end, and finally back to the best level seen. A walk
//! in one direction stops early once the cost exceeds
//! `factor × reference`, where the reference is fixed for the whole run
//! ([`GrowthLimit::Absolute`]) or refreshed after every variable
//! ([`GrowthLimit::Relative`]).
//!
//! DTL sifting additionally tries all three decomposition types once a
//! variable has settled, and keeps the cheapest one. Changing a
//! decomposition type may complement handles into the levels above, so
//! only the registered outputs are kept up to date.

use std::collections::HashMap;

use log::{debug, info};
use rand::seq::SliceRandom;

use crate::cost::Objective;
use crate::kfdd::Kfdd;
use crate::reorder::ReorderStats;
use crate::types::{DecompositionType, Level, Var};

/// How the growth bound of a sifting run is computed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum GrowthLimit {
    /// Factor times the cost at the start of the whole run.
    #[default]
    Absolute,
    /// Factor times the cost after the last repositioned variable.
    Relative,
}

impl GrowthLimit {
    pub fn code(self) -> char {
        match self {
            GrowthLimit::Absolute => 'a',
            GrowthLimit::Relative => 'r',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'a' => Some(GrowthLimit::Absolute),
            'r' => Some(GrowthLimit::Relative),
            _ => None,
        }
    }
}

/// Order in which the variables of the window are sifted.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SiftingMethod {
    /// The order at the start of the run.
    Initial,
    /// Largest level first.
    Greatest,
    /// The level that grew least during the previous move first.
    LoserFirst,
    /// A random order drawn from the manager's generator.
    Random,
    /// The variable whose one-step move eliminates the most nodes first.
    #[default]
    Verify,
}

impl SiftingMethod {
    pub fn code(self) -> char {
        match self {
            SiftingMethod::Initial => 'i',
            SiftingMethod::Greatest => 'g',
            SiftingMethod::LoserFirst => 'l',
            SiftingMethod::Random => 'r',
            SiftingMethod::Verify => 'v',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'i' => Some(SiftingMethod::Initial),
            'g' => Some(SiftingMethod::Greatest),
            'l' => Some(SiftingMethod::LoserFirst),
            'r' => Some(SiftingMethod::Random),
            'v' => Some(SiftingMethod::Verify),
            _ => None,
        }
    }
}

struct Sifter<'a> {
    kfdd: &'a Kfdd,
    objective: Objective,
    start: usize,
    stop: usize,
    /// `None` for an unbounded walk.
    factor: Option<f64>,
    growth: GrowthLimit,
    dtl: bool,
    cost: usize,
    stats: ReorderStats,
}

impl Sifter<'_> {
    fn exchange(&mut self, position: usize) {
        self.kfdd.level_exchange(Level::new(position));
        self.stats.swaps += 1;
        self.cost = self.kfdd.measure(self.objective);
        self.stats.best_size = self.stats.best_size.min(self.cost);
    }

    /// Sift `var` and return the number of exchanges spent on it.
    fn sift_variable(&mut self, var: Var, reference: usize) -> usize {
        let swaps = self.stats.swaps;
        let limit = self.factor.map(|f| (reference as f64 * f) as usize);
        let within = |cost: usize| limit.map_or(true, |l| cost <= l);

        let mut position = self.kfdd.level_of(var).index();
        let mut best = (position, self.cost);
        debug!("Sifting variable {} (initially at level {}, cost {})", var, position, self.cost);

        let up_first = position - self.start < self.stop - position;
        for up in [up_first, !up_first] {
            loop {
                if up && position > self.start {
                    self.exchange(position - 1);
                    position -= 1;
                } else if !up && position < self.stop {
                    self.exchange(position);
                    position += 1;
                } else {
                    break;
                }
                if self.cost < best.1 {
                    best = (position, self.cost);
                }
                if !within(self.cost) {
                    break;
                }
            }
        }

        while position > best.0 {
            self.exchange(position - 1);
            position -= 1;
        }
        while position < best.0 {
            self.exchange(position);
            position += 1;
        }
        debug!("  Best position: level {} with cost {}", best.0, best.1);

        if self.dtl {
            self.choose_decomposition(var);
        }
        self.stats.swaps - swaps
    }

    fn choose_decomposition(&mut self, var: Var) {
        let mut best = (self.kfdd.decomposition(var), self.cost);
        for dtl in DecompositionType::ALL {
            if dtl == self.kfdd.decomposition(var) {
                continue;
            }
            self.kfdd.change_decomposition(var, dtl, &mut []);
            self.cost = self.kfdd.measure(self.objective);
            self.stats.best_size = self.stats.best_size.min(self.cost);
            if self.cost < best.1 {
                best = (dtl, self.cost);
            }
        }
        self.kfdd.change_decomposition(var, best.0, &mut []);
        self.cost = best.1;
        debug!("  Best decomposition of {}: {} with cost {}", var, best.0, best.1);
    }

    /// Nodes saved by the better one-step move of `var`, the move undone.
    fn eliminations(&mut self, var: Var) -> i64 {
        let position = self.kfdd.level_of(var).index();
        let base = self.cost as i64;
        let mut best = 0;
        if position > self.start {
            self.exchange(position - 1);
            best = best.max(base - self.cost as i64);
            self.exchange(position - 1);
        }
        if position < self.stop {
            self.exchange(position);
            best = best.max(base - self.cost as i64);
            self.exchange(position);
        }
        best
    }

    fn level_sizes(&self) -> HashMap<Var, usize> {
        self.kfdd
            .order()
            .into_iter()
            .map(|v| (v, self.kfdd.level_size(v)))
            .collect()
    }

    fn next_candidate(&mut self, method: SiftingMethod, pending: &[Var], growth: &HashMap<Var, i64>) -> usize {
        let kfdd = self.kfdd;
        let size = |v: &Var| kfdd.level_size(*v);
        match method {
            SiftingMethod::Initial | SiftingMethod::Random => 0,
            SiftingMethod::LoserFirst if !growth.is_empty() => (0..pending.len())
                .min_by_key(|&i| {
                    let v = pending[i];
                    (growth.get(&v).copied().unwrap_or(0), std::cmp::Reverse(size(&v)))
                })
                .unwrap_or(0),
            SiftingMethod::Greatest | SiftingMethod::LoserFirst => {
                (0..pending.len()).max_by_key(|&i| (size(&pending[i]), std::cmp::Reverse(i))).unwrap_or(0)
            }
            SiftingMethod::Verify => {
                let mut best = (0, i64::MIN);
                for (i, &v) in pending.iter().enumerate() {
                    let saved = self.eliminations(v);
                    if saved > best.1 {
                        best = (i, saved);
                    }
                }
                best.0
            }
        }
    }

    fn run(mut self, method: SiftingMethod) -> ReorderStats {
        let order = self.kfdd.order();
        let mut pending: Vec<Var> = order[self.start..=self.stop].to_vec();
        if method == SiftingMethod::Random {
            pending.shuffle(&mut *self.kfdd.rng.borrow_mut());
        }
        let mut reference = self.cost;
        let mut growth: HashMap<Var, i64> = HashMap::new();

        while !pending.is_empty() {
            let i = self.next_candidate(method, &pending, &growth);
            let var = pending.remove(i);
            let before = self.level_sizes();
            self.sift_variable(var, reference);
            self.stats.variables_processed += 1;
            if self.growth == GrowthLimit::Relative {
                reference = self.cost;
            }
            if method == SiftingMethod::LoserFirst {
                growth = self
                    .level_sizes()
                    .into_iter()
                    .map(|(v, s)| (v, s as i64 - before.get(&v).copied().unwrap_or(0) as i64))
                    .collect();
            }
        }

        self.stats.final_size = self.cost;
        self.stats
    }
}

impl Kfdd {
    #[allow(clippy::too_many_arguments)]
    fn sift_window(
        &self,
        objective: Objective,
        start: Level,
        stop: Level,
        factor: Option<f64>,
        growth: GrowthLimit,
        method: SiftingMethod,
        dtl: bool,
    ) -> ReorderStats {
        let n = self.num_vars();
        let initial = self.measure(objective);
        if n == 0 {
            return ReorderStats {
                initial_size: initial,
                final_size: initial,
                best_size: initial,
                ..Default::default()
            };
        }
        let stop = stop.index().min(n - 1);
        let start = start.index().min(stop);
        let sifter = Sifter {
            kfdd: self,
            objective,
            start,
            stop,
            factor,
            growth,
            dtl,
            cost: initial,
            stats: ReorderStats {
                initial_size: initial,
                best_size: initial,
                ..Default::default()
            },
        };
        let stats = sifter.run(method);
        info!(
            "{}sifting({}..={}, {:?}, {:?}): cost {} -> {} ({:.1}% reduction), {} swaps, {} variables",
            if dtl { "DTL " } else { "" },
            start,
            stop,
            objective,
            method,
            stats.initial_size,
            stats.final_size,
            stats.reduction_percent(),
            stats.swaps,
            stats.variables_processed
        );
        stats
    }

    /// Sift every variable of the levels `start..=stop` to minimize the node count.
    pub fn sifting(
        &self,
        start: Level,
        stop: Level,
        factor: f64,
        growth: GrowthLimit,
        method: SiftingMethod,
    ) -> ReorderStats {
        self.sifting_with(Objective::Nodes, start, stop, factor, growth, method)
    }

    /// Sifting with an arbitrary objective.
    pub fn sifting_with(
        &self,
        objective: Objective,
        start: Level,
        stop: Level,
        factor: f64,
        growth: GrowthLimit,
        method: SiftingMethod,
    ) -> ReorderStats {
        self.sift_window(objective, start, stop, Some(factor), growth, method, false)
    }

    /// Sifting without a growth bound: every variable visits every level of the window.
    pub fn siftlight(&self, start: Level, stop: Level, method: SiftingMethod) -> ReorderStats {
        self.sift_window(Objective::Nodes, start, stop, None, GrowthLimit::Absolute, method, false)
    }

    /// Sifting that also picks the decomposition type of every settled variable.
    pub fn dtl_sifting(
        &self,
        start: Level,
        stop: Level,
        factor: f64,
        growth: GrowthLimit,
        method: SiftingMethod,
    ) -> ReorderStats {
        self.dtl_sifting_with(Objective::Nodes, start, stop, factor, growth, method)
    }

    pub fn dtl_sifting_with(
        &self,
        objective: Objective,
        start: Level,
        stop: Level,
        factor: f64,
        growth: GrowthLimit,
        method: SiftingMethod,
    ) -> ReorderStats {
        self.sift_window(objective, start, stop, Some(factor), growth, method, true)
    }
}
