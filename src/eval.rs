//! Evaluation under a full assignment.

use std::collections::HashMap;

use log::debug;

use crate::error::{KfddError, Result};
use crate::kfdd::Kfdd;
use crate::reference::Ref;
use crate::types::DecompositionType;

impl Kfdd {
    /// Value of `f` under `assignment`, where `assignment[v - 1]` is the value of label `v`.
    ///
    /// Davio nodes depend on both children, so this walks every reachable
    /// node bottom-up instead of following a single path.
    pub fn evaluate(&self, f: Ref, assignment: &[bool]) -> Result<bool> {
        debug!("evaluate(f = {}, assignment = {:?})", f, assignment);
        let n = self.num_vars();
        if assignment.len() < n {
            return Err(KfddError::Evaluation {
                expected: n,
                got: assignment.len(),
            });
        }
        self.validate(f)?;

        let storage = self.storage.borrow();
        // Values of regular (uncomplemented) nodes, by index.
        let mut memo: HashMap<u32, bool> = HashMap::new();
        memo.insert(0, true);
        let mut stack = vec![(f.index(), false)];
        while let Some((index, expanded)) = stack.pop() {
            if memo.contains_key(&index) {
                continue;
            }
            let node = storage.node(index);
            if !expanded {
                stack.push((index, true));
                stack.push((node.high.index(), false));
                stack.push((node.low.index(), false));
                continue;
            }
            let value_of = |r: Ref| memo[&r.index()] ^ r.is_negated();
            let low = value_of(node.low);
            let high = value_of(node.high);
            let x = assignment[node.variable as usize - 1];
            let value = match storage.subtables[node.variable as usize - 1].decomposition {
                DecompositionType::Shannon => {
                    if x {
                        high
                    } else {
                        low
                    }
                }
                DecompositionType::PositiveDavio => low ^ (x && high),
                DecompositionType::NegativeDavio => low ^ (!x && high),
            };
            memo.insert(index, value);
        }
        Ok(memo[&f.index()] ^ f.is_negated())
    }

    /// Values of `f` for all `2^n` assignments over the registered labels.
    ///
    /// Entry `k` holds the value where label `v` is bit `v - 1` of `k`.
    pub fn truth_table(&self, f: Ref) -> Result<Vec<bool>> {
        let n = self.num_vars();
        (0..1usize << n)
            .map(|k| {
                let assignment: Vec<bool> = (0..n).map(|i| (k >> i) & 1 == 1).collect();
                self.evaluate(f, &assignment)
            })
            .collect()
    }
}
