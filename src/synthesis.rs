//! Reversible circuit synthesis from a decision diagram.
//!
//! Each vertex of the diagram becomes a short gate sequence that computes
//! its function on a circuit line from the lines of its children and the
//! input line of its variable:
//!
//! ```text
//! Shannon:         f = ~x·l ⊕ x·h
//! Positive Davio:  f = l ⊕ x·h
//! Negative Davio:  f = l ⊕ ~x·h
//! ```
//!
//! A child line whose last consumer is the current vertex may be
//! overwritten in place. Otherwise the result goes to a fresh ancilla
//! initialized to a constant.
//!
//! # References
//!
//! - R. Wille, R. Drechsler. "BDD-based synthesis of reversible logic for
//!   large functions." DAC 2009. DOI: 10.1145/1629911.1630016
//!
//! - M. Soeken, R. Wille, C. Hilken, N. Przigoda, R. Drechsler. "Synthesis of
//!   reversible circuits with minimal lines for large functions." ASP-DAC 2012.

use std::collections::HashSet;

use log::{debug, info};

use crate::circuit::{Circuit, Gate};
use crate::config::SynthesisSettings;
use crate::dd_graph::{DdGraph, Edge, Target};
use crate::error::{KfddError, Result};
use crate::kfdd::Kfdd;
use crate::reference::Ref;
use crate::types::{DecompositionType, Var};

/// A child edge as seen by the gate dispatch.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Child {
    One,
    Zero,
    Line { line: usize, complemented: bool },
}

struct Synthesizer<'a> {
    graph: &'a DdGraph,
    circuit: Circuit,
    num_inputs: usize,
    /// Line computing each vertex.
    line_of: Vec<usize>,
    /// Remaining consumers per line. `None` pins the line.
    needed: Vec<Option<u32>>,
}

impl<'a> Synthesizer<'a> {
    fn new(graph: &'a DdGraph, input_names: &[String]) -> Self {
        let mut circuit = Circuit::new();
        for name in input_names {
            circuit.add_line(name.clone(), None);
        }
        Synthesizer {
            graph,
            circuit,
            num_inputs: input_names.len(),
            line_of: Vec::with_capacity(graph.len()),
            needed: vec![None; input_names.len()],
        }
    }

    fn fresh(&mut self, value: bool) -> usize {
        let name = if value { "1" } else { "0" };
        self.needed.push(None);
        self.circuit.add_line(name, Some(value))
    }

    fn not(&mut self, target: usize) {
        self.circuit.push(Gate::not(target));
    }

    fn cnot(&mut self, control: usize, target: usize) {
        self.circuit.push(Gate::cnot(control, target));
    }

    fn tof(&mut self, a: usize, b: usize, target: usize) {
        self.circuit.push(Gate::toffoli(a, b, target));
    }

    fn is_free(&self, line: usize) -> bool {
        self.needed[line] == Some(0)
    }

    fn child(&mut self, edge: Edge) -> Child {
        match edge.target {
            Target::Constant(true) => Child::One,
            Target::Constant(false) => Child::Zero,
            Target::Vertex(j) => {
                let line = self.line_of[j];
                if let Some(n) = self.needed[line].as_mut() {
                    *n = n.saturating_sub(1);
                }
                Child::Line {
                    line,
                    complemented: edge.complemented,
                }
            }
        }
    }

    fn run(mut self, roots: &[Edge], root_names: &[String]) -> Result<Circuit> {
        let graph = self.graph;
        for vertex in &graph.vertices {
            let slot = vertex.var.id() as usize - 1;
            if slot >= self.num_inputs {
                return Err(KfddError::UnknownLabel(vertex.var.id()));
            }
            let (dtl, in_degree) = (vertex.decomposition, vertex.in_degree);
            let high = self.child(vertex.high);
            let low = self.child(vertex.low);
            let line = self.place(dtl, slot, low, high)?;
            if line >= self.num_inputs {
                self.needed[line] = Some(in_degree as u32);
            }
            self.line_of.push(line);
        }
        self.finish(roots, root_names);
        Ok(self.circuit)
    }

    /// Emit the gates of one vertex and return the line holding its function.
    fn place(&mut self, dtl: DecompositionType, x: usize, low: Child, high: Child) -> Result<usize> {
        use Child::*;
        use DecompositionType::*;

        let unsupported = || KfddError::UnsupportedCase {
            decomposition: dtl,
            description: format!("low child {:?} and high child {:?}", low, high),
        };

        let line = match (low, high) {
            (
                Line {
                    line: l,
                    complemented: lc,
                },
                Line {
                    line: h,
                    complemented: hc,
                },
            ) if l == h => self.place_shared(dtl, x, l, lc, hc).ok_or_else(unsupported)?,
            (
                Line {
                    line: l,
                    complemented: lc,
                },
                Line {
                    line: h,
                    complemented: hc,
                },
            ) => self.place_pair(dtl, x, l, lc, h, hc).ok_or_else(unsupported)?,

            (One, Line { line: h, complemented: hc }) => {
                let (init, flip_h, flip_x) = match (dtl, hc) {
                    (Shannon, true) => (true, false, false),
                    (Shannon, false) => (true, false, true),
                    (PositiveDavio, true) => (true, false, true),
                    (PositiveDavio, false) => (true, false, false),
                    (NegativeDavio, true) => (false, true, true),
                    (NegativeDavio, false) => (true, true, false),
                };
                let t = self.fresh(init);
                self.tof(x, h, t);
                if flip_h {
                    self.cnot(h, t);
                }
                if flip_x {
                    self.cnot(x, t);
                }
                t
            }
            (Zero, Line { line: h, complemented: false }) => {
                let t = self.fresh(false);
                self.tof(x, h, t);
                if dtl == NegativeDavio {
                    self.cnot(h, t);
                }
                t
            }
            (Line { line: l, complemented: lc }, One) => match (dtl, lc) {
                (Shannon, true) => {
                    let t = self.fresh(true);
                    self.tof(l, x, t);
                    self.cnot(l, t);
                    t
                }
                (Shannon, false) => {
                    let t = self.fresh(false);
                    self.cnot(x, t);
                    self.tof(l, x, t);
                    self.cnot(l, t);
                    t
                }
                (PositiveDavio | NegativeDavio, false) => {
                    let t = self.fresh(dtl == NegativeDavio);
                    self.cnot(l, t);
                    self.cnot(x, t);
                    t
                }
                _ => return Err(unsupported()),
            },
            (Line { line: l, complemented: lc }, Zero) if dtl == Shannon => {
                let t = self.fresh(lc);
                if lc {
                    self.cnot(x, t);
                }
                self.tof(l, x, t);
                self.cnot(l, t);
                t
            }
            (One, One) if dtl == PositiveDavio => {
                let t = self.fresh(true);
                self.cnot(x, t);
                t
            }
            (One, One) if dtl == NegativeDavio => x,
            (One, Zero) if dtl == Shannon => {
                let t = self.fresh(true);
                self.cnot(x, t);
                t
            }
            (Zero, One) if dtl == NegativeDavio => {
                let t = self.fresh(true);
                self.cnot(x, t);
                t
            }
            (Zero, One) => x,
            _ => return Err(unsupported()),
        };
        Ok(line)
    }

    /// Both edges lead to the same line `l`.
    fn place_shared(&mut self, dtl: DecompositionType, x: usize, l: usize, lc: bool, hc: bool) -> Option<usize> {
        use DecompositionType::*;
        let line = match (dtl, lc, hc) {
            (Shannon, false, true) | (Shannon, true, false) if self.is_free(l) => {
                self.cnot(x, l);
                if lc {
                    self.not(l);
                }
                l
            }
            (Shannon, false, true) | (Shannon, true, false) => {
                let t = self.fresh(lc);
                self.cnot(x, t);
                self.cnot(l, t);
                t
            }
            (PositiveDavio, false, hc) => {
                let t = self.fresh(false);
                self.tof(x, l, t);
                if hc {
                    self.cnot(x, t);
                }
                self.cnot(l, t);
                t
            }
            (NegativeDavio, false, hc) => {
                let t = self.fresh(hc);
                self.tof(x, l, t);
                if hc {
                    self.cnot(x, t);
                }
                t
            }
            _ => return None,
        };
        Some(line)
    }

    /// Two distinct child lines `l` and `h`.
    fn place_pair(
        &mut self,
        dtl: DecompositionType,
        x: usize,
        l: usize,
        lc: bool,
        h: usize,
        hc: bool,
    ) -> Option<usize> {
        use DecompositionType::*;
        if lc && (hc || dtl.is_davio()) {
            return None;
        }
        if self.is_free(l) && self.is_free(h) {
            let line = match (dtl, lc, hc) {
                (Shannon, false, true) => {
                    self.tof(x, l, h);
                    self.cnot(x, l);
                    self.tof(h, x, l);
                    l
                }
                (Shannon, true, _) => {
                    self.not(l);
                    self.tof(l, x, h);
                    self.tof(h, x, l);
                    l
                }
                (Shannon, false, false) => {
                    self.cnot(l, h);
                    self.tof(h, x, l);
                    l
                }
                (PositiveDavio, _, hc) => {
                    self.tof(x, h, l);
                    if hc {
                        self.cnot(x, l);
                    }
                    l
                }
                (NegativeDavio, _, hc) => {
                    if hc {
                        self.not(h);
                    }
                    self.tof(x, h, l);
                    self.cnot(l, h);
                    h
                }
            };
            return Some(line);
        }

        let t = match (dtl, lc, hc) {
            (Shannon, _, _) => {
                let t = self.fresh(lc);
                if lc || hc {
                    self.cnot(x, t);
                }
                self.cnot(l, t);
                self.tof(x, h, t);
                self.tof(x, l, t);
                t
            }
            (PositiveDavio, _, hc) => {
                let t = self.fresh(false);
                self.tof(x, h, t);
                self.cnot(l, t);
                if hc {
                    self.cnot(x, t);
                }
                t
            }
            (NegativeDavio, _, hc) => {
                let t = self.fresh(hc);
                self.tof(x, h, t);
                self.cnot(l, t);
                self.cnot(h, t);
                if hc {
                    self.cnot(x, t);
                }
                t
            }
        };
        Some(t)
    }

    /// Attach output names, copying shared roots and complementing where needed.
    fn finish(&mut self, roots: &[Edge], root_names: &[String]) {
        let mut claimed = HashSet::new();
        let mut complemented = Vec::new();
        for (edge, name) in roots.iter().zip(root_names) {
            let line = match edge.target {
                Target::Constant(value) => self.fresh(value),
                Target::Vertex(j) => {
                    let line = self.line_of[j];
                    if claimed.insert(line) {
                        line
                    } else {
                        let copy = self.fresh(false);
                        self.cnot(line, copy);
                        copy
                    }
                }
            };
            claimed.insert(line);
            self.circuit.set_output(line, name.clone());
            if edge.complemented {
                complemented.push(line);
            }
        }
        for line in complemented {
            self.not(line);
        }
    }
}

/// Synthesize a circuit from a prepared graph.
///
/// Line `i` is the input line of label `i + 1` and is named `input_names[i]`.
pub fn synthesize_graph(graph: &DdGraph, input_names: &[String]) -> Result<Circuit> {
    let circuit = Synthesizer::new(graph, input_names).run(&graph.roots, &graph.root_names)?;
    debug!(
        "synthesize_graph({} vertices) -> {} lines, {} gates",
        graph.len(),
        circuit.lines,
        circuit.num_gates()
    );
    Ok(circuit)
}

/// Synthesize a circuit computing every function in `roots`.
///
/// The first `n_inputs` lines carry the labels `1..=n_inputs`, named after
/// the registered inputs. Outputs are named after the registered outputs,
/// and `f<i>` for unregistered roots.
///
/// # Examples
///
/// ```
/// use kfdd_rs::config::SynthesisSettings;
/// use kfdd_rs::kfdd::Kfdd;
/// use kfdd_rs::synthesis::synthesize_circuit;
///
/// let kfdd = Kfdd::default();
/// let a = kfdd.add_input("a").unwrap();
/// let b = kfdd.add_input("b").unwrap();
/// let (fa, fb) = (kfdd.mk_var(a), kfdd.mk_var(b));
/// let f = kfdd.apply_xor(fa, fb);
///
/// let circuit = synthesize_circuit(&kfdd, &[f], 2, &SynthesisSettings::default()).unwrap();
/// let out = circuit.output_line("f0").unwrap();
/// for k in 0..4 {
///     let (x, y) = (k & 1 == 1, k & 2 == 2);
///     assert_eq!(circuit.simulate(&[x, y])[out], x ^ y);
/// }
/// ```
pub fn synthesize_circuit(
    kfdd: &Kfdd,
    roots: &[Ref],
    n_inputs: usize,
    settings: &SynthesisSettings,
) -> Result<Circuit> {
    for &r in roots {
        kfdd.validate(r)?;
    }
    let graph = kfdd.dd_graph(roots, settings.complemented_edges);
    let names: Vec<String> = (1..=n_inputs as u32).map(|v| kfdd.input_name(Var::new(v))).collect();
    let circuit = synthesize_graph(&graph, &names)?;
    info!(
        "synthesized {} outputs: {} lines, {} gates, quantum cost {}",
        roots.len(),
        circuit.lines,
        circuit.num_gates(),
        circuit.quantum_cost()
    );
    Ok(circuit)
}
