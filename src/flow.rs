//! Reorder-then-synthesize flow driven by [`SynthesisSettings`].

use std::time::{Duration, Instant};

use log::info;

use crate::circuit::Circuit;
use crate::config::{KfddConfig, SynthesisSettings};
use crate::cost::Objective;
use crate::error::Result;
use crate::kfdd::Kfdd;
use crate::reference::Ref;
use crate::reorder::ReorderStats;
use crate::synthesis::synthesize_circuit;
use crate::types::Level;

/// Reordering applied before synthesis, by its numeric code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ReorderMethod {
    #[default]
    None,
    DtlFriedman,
    DtlPermutation,
    DtlSifting,
    Friedman,
    Permutation,
    Sifting,
    /// Sifting, then DTL sifting.
    SiftingDtl,
    Inversion,
    /// Sifting, DTL sifting, then DTL sifting on the line count.
    SiftingDtlLines,
    /// Sifting, DTL sifting, then DTL sifting on the quantum cost.
    SiftingDtlQuantum,
}

impl ReorderMethod {
    pub const ALL: [ReorderMethod; 11] = [
        ReorderMethod::None,
        ReorderMethod::DtlFriedman,
        ReorderMethod::DtlPermutation,
        ReorderMethod::DtlSifting,
        ReorderMethod::Friedman,
        ReorderMethod::Permutation,
        ReorderMethod::Sifting,
        ReorderMethod::SiftingDtl,
        ReorderMethod::Inversion,
        ReorderMethod::SiftingDtlLines,
        ReorderMethod::SiftingDtlQuantum,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// Result of [`run`].
#[derive(Debug)]
pub struct SynthesisOutcome {
    pub circuit: Circuit,
    /// Live nodes after reordering.
    pub node_count: usize,
    pub runtime: Duration,
    /// Node counts before and after reordering, swaps summed over all stages.
    pub stats: ReorderStats,
}

/// A manager whose new inputs get the decomposition type and seed of `settings`.
pub fn new_manager(settings: &SynthesisSettings) -> Kfdd {
    Kfdd::new(
        KfddConfig::default()
            .with_default_decomposition(settings.default_decomposition)
            .with_seed(settings.seed),
    )
}

impl Kfdd {
    /// Run `method` over all levels, with the sifting parameters of `settings`.
    pub fn reorder(&self, method: ReorderMethod, settings: &SynthesisSettings) -> ReorderStats {
        let initial = self.size_all();
        let n = self.num_vars();
        if n == 0 {
            return ReorderStats {
                initial_size: initial,
                final_size: initial,
                best_size: initial,
                ..Default::default()
            };
        }
        let (start, stop) = (Level::new(0), Level::new(n - 1));
        let (factor, growth, sifting) = (settings.sift_factor, settings.growth_limit, settings.sifting_method);
        let sift = || self.sifting(start, stop, factor, growth, sifting);
        let dtl_sift = |objective| self.dtl_sifting_with(objective, start, stop, factor, growth, sifting);

        let stages: Vec<(Objective, ReorderStats)> = match method {
            ReorderMethod::None => vec![],
            ReorderMethod::DtlFriedman => vec![(Objective::Nodes, self.dtl_friedman(start, stop))],
            ReorderMethod::DtlPermutation => vec![(Objective::Nodes, self.dtl_permutation(start, stop))],
            ReorderMethod::DtlSifting => vec![(Objective::Nodes, dtl_sift(Objective::Nodes))],
            ReorderMethod::Friedman => vec![(Objective::Nodes, self.friedman(start, stop))],
            ReorderMethod::Permutation => vec![(Objective::Nodes, self.permutation(start, stop))],
            ReorderMethod::Sifting => vec![(Objective::Nodes, sift())],
            ReorderMethod::SiftingDtl => vec![
                (Objective::Nodes, sift()),
                (Objective::Nodes, dtl_sift(Objective::Nodes)),
            ],
            ReorderMethod::Inversion => vec![(Objective::Nodes, self.inversion(start, stop))],
            ReorderMethod::SiftingDtlLines => vec![
                (Objective::Nodes, sift()),
                (Objective::Nodes, dtl_sift(Objective::Nodes)),
                (Objective::Lines, dtl_sift(Objective::Lines)),
            ],
            ReorderMethod::SiftingDtlQuantum => vec![
                (Objective::Nodes, sift()),
                (Objective::Nodes, dtl_sift(Objective::Nodes)),
                (Objective::Quantum, dtl_sift(Objective::Quantum)),
            ],
        };

        let final_size = self.size_all();
        let best_size = stages
            .iter()
            .filter(|(objective, _)| *objective == Objective::Nodes)
            .map(|(_, s)| s.best_size)
            .chain([initial, final_size])
            .min()
            .unwrap_or(final_size);
        ReorderStats {
            swaps: stages.iter().map(|(_, s)| s.swaps).sum(),
            initial_size: initial,
            final_size,
            best_size,
            variables_processed: stages.iter().map(|(_, s)| s.variables_processed).sum(),
        }
    }
}

/// Bring the registered outputs of `kfdd` into shape and synthesize them.
///
/// The order file, when given, is established first. Then the random
/// generator is reseeded and the reordering runs. The final order is dumped
/// when requested. Every input label gets a circuit line.
///
/// # Examples
///
/// ```
/// use kfdd_rs::config::SynthesisSettings;
/// use kfdd_rs::flow::{self, ReorderMethod};
///
/// let settings = SynthesisSettings {
///     reordering: ReorderMethod::Sifting,
///     ..Default::default()
/// };
/// let kfdd = flow::new_manager(&settings);
/// let a = kfdd.add_input("a").unwrap();
/// let b = kfdd.add_input("b").unwrap();
/// let (fa, fb) = (kfdd.mk_var(a), kfdd.mk_var(b));
/// let carry = kfdd.apply_and(fa, fb);
/// kfdd.add_output("carry", carry).unwrap();
/// kfdd.free_all([fa, fb, carry]);
///
/// let outcome = flow::run(&kfdd, &settings).unwrap();
/// let line = outcome.circuit.output_line("carry").unwrap();
/// assert!(outcome.circuit.simulate(&[true, true])[line]);
/// assert!(!outcome.circuit.simulate(&[true, false])[line]);
/// ```
pub fn run(kfdd: &Kfdd, settings: &SynthesisSettings) -> Result<SynthesisOutcome> {
    let start = Instant::now();
    if let Some(path) = &settings.order_file {
        kfdd.read_order_from_path(path, &mut [])?;
    }
    kfdd.reseed(settings.seed);
    let stats = kfdd.reorder(settings.reordering, settings);
    let node_count = kfdd.size_all();
    if let Some(path) = &settings.order_dump {
        kfdd.dump_order_to_path(path)?;
    }

    let roots: Vec<Ref> = kfdd.outputs().into_iter().map(|(_, r)| r).collect();
    let circuit = synthesize_circuit(kfdd, &roots, kfdd.num_vars(), settings)?;
    let runtime = start.elapsed();
    info!(
        "flow({:?}): {} -> {} nodes, {} lines, {} gates in {:?}",
        settings.reordering,
        stats.initial_size,
        node_count,
        circuit.lines,
        circuit.num_gates(),
        runtime
    );
    Ok(SynthesisOutcome {
        circuit,
        node_count,
        runtime,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::DecompositionType;

    /// `bits`-bit ripple-carry adder with inputs `a0.. b0..` (all `a` first)
    /// and outputs `s0..` plus `c`.
    fn adder(kfdd: &Kfdd, bits: usize) {
        let a: Vec<Ref> = (0..bits)
            .map(|i| kfdd.mk_var(kfdd.add_input(&format!("a{}", i)).unwrap()))
            .collect();
        let b: Vec<Ref> = (0..bits)
            .map(|i| kfdd.mk_var(kfdd.add_input(&format!("b{}", i)).unwrap()))
            .collect();
        let mut carry = Ref::ZERO;
        for i in 0..bits {
            let half = kfdd.apply_xor(a[i], b[i]);
            let sum = kfdd.apply_xor(half, carry);
            kfdd.add_output(&format!("s{}", i), sum).unwrap();
            let both = kfdd.apply_and(a[i], b[i]);
            let propagate = kfdd.apply_and(half, carry);
            let next = kfdd.apply_or(both, propagate);
            kfdd.free_all([half, sum, both, propagate, carry]);
            carry = next;
        }
        kfdd.add_output("c", carry).unwrap();
        kfdd.free(carry);
        kfdd.free_all(a);
        kfdd.free_all(b);
    }

    fn check_adder(outcome: &SynthesisOutcome, bits: usize) {
        let circuit = &outcome.circuit;
        let lines: Vec<usize> = (0..bits)
            .map(|i| format!("s{}", i))
            .chain(["c".to_string()])
            .map(|name| circuit.output_line(&name).unwrap())
            .collect();
        for k in 0..1usize << (2 * bits) {
            let values: Vec<bool> = (0..2 * bits).map(|i| (k >> i) & 1 == 1).collect();
            let (x, y) = (k & ((1 << bits) - 1), k >> bits);
            let sum = x + y;
            let state = circuit.simulate(&values);
            for (i, &line) in lines.iter().enumerate() {
                assert_eq!(state[line], (sum >> i) & 1 == 1, "output {} at {}", i, k);
            }
        }
    }

    #[test]
    fn test_codes() {
        for (code, method) in ReorderMethod::ALL.into_iter().enumerate() {
            assert_eq!(method.code(), code as u32);
            assert_eq!(ReorderMethod::from_code(code as u32), Some(method));
        }
        assert_eq!(ReorderMethod::from_code(11), None);
        assert_eq!(ReorderMethod::from_code(8), Some(ReorderMethod::Inversion));
    }

    #[test]
    fn test_every_method_synthesizes_adder() {
        for method in ReorderMethod::ALL {
            for complemented_edges in [true, false] {
                let settings = SynthesisSettings {
                    reordering: method,
                    complemented_edges,
                    ..Default::default()
                };
                let kfdd = new_manager(&settings);
                adder(&kfdd, 2);
                let outcome = run(&kfdd, &settings).unwrap();
                check_adder(&outcome, 2);
                assert_eq!(outcome.circuit.primary_lines(), vec![0, 1, 2, 3]);
                assert_eq!(outcome.node_count, kfdd.size_all());
                assert_eq!(outcome.stats.final_size, outcome.node_count);
                assert!(outcome.stats.best_size <= outcome.stats.initial_size);
                assert!(kfdd.check_refs(&[]).is_empty());
            }
        }
    }

    #[test]
    fn test_exact_methods_agree() {
        let size = |method| {
            let settings = SynthesisSettings {
                reordering: method,
                ..Default::default()
            };
            let kfdd = new_manager(&settings);
            adder(&kfdd, 2);
            run(&kfdd, &settings).unwrap().node_count
        };
        let initial = size(ReorderMethod::None);
        let friedman = size(ReorderMethod::Friedman);
        assert_eq!(friedman, size(ReorderMethod::Permutation));
        assert!(friedman <= initial);
        assert!(friedman <= size(ReorderMethod::Sifting));

        let dtl_friedman = size(ReorderMethod::DtlFriedman);
        assert_eq!(dtl_friedman, size(ReorderMethod::DtlPermutation));
        assert!(dtl_friedman <= friedman);
    }

    #[test]
    fn test_default_decomposition() {
        let settings = SynthesisSettings {
            default_decomposition: DecompositionType::PositiveDavio,
            ..Default::default()
        };
        let kfdd = new_manager(&settings);
        adder(&kfdd, 2);
        assert!(kfdd.dtl().iter().all(|&d| d == DecompositionType::PositiveDavio));
        check_adder(&run(&kfdd, &settings).unwrap(), 2);
    }

    #[test]
    fn test_order_dump_and_file() {
        let path = std::env::temp_dir().join(format!("kfdd-rs-flow-{}.order", std::process::id()));
        let settings = SynthesisSettings {
            reordering: ReorderMethod::SiftingDtl,
            order_dump: Some(path.clone()),
            ..Default::default()
        };
        let kfdd = new_manager(&settings);
        adder(&kfdd, 3);
        let first = run(&kfdd, &settings).unwrap();

        let replay = SynthesisSettings {
            order_file: Some(path.clone()),
            ..Default::default()
        };
        let other = new_manager(&replay);
        adder(&other, 3);
        let second = run(&other, &replay).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(other.order(), kfdd.order());
        assert_eq!(other.dtl(), kfdd.dtl());
        assert_eq!(second.node_count, first.node_count);
        check_adder(&second, 3);
    }

    #[test]
    fn test_missing_order_file() {
        let settings = SynthesisSettings {
            order_file: Some(std::env::temp_dir().join("kfdd-rs-flow-missing.order")),
            ..Default::default()
        };
        let kfdd = new_manager(&settings);
        adder(&kfdd, 1);
        assert!(run(&kfdd, &settings).is_err());
    }

    #[test]
    fn test_random_sifting_is_reproducible() {
        let order = |seed| {
            let settings = SynthesisSettings {
                reordering: ReorderMethod::Sifting,
                sifting_method: crate::sifting::SiftingMethod::Random,
                seed,
                ..Default::default()
            };
            let kfdd = new_manager(&settings);
            adder(&kfdd, 3);
            run(&kfdd, &settings).unwrap();
            kfdd.order()
        };
        assert_eq!(order(7), order(7));
    }
}
