//! Line and quantum cost of the circuit a diagram synthesizes into.
//!
//! The cost is read off the circuit that [`synthesize_graph`] builds from the
//! complemented snapshot of the diagram. Ancilla reuse, shared roots and root
//! complements are therefore counted exactly as in the final circuit.

use log::{debug, warn};

use crate::circuit::Circuit;
use crate::dd_graph::DdGraph;
use crate::error::Result;
use crate::kfdd::Kfdd;
use crate::reference::Ref;
use crate::synthesis::synthesize_graph;

/// What a reordering heuristic minimizes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Objective {
    /// Live nodes in the unique tables.
    #[default]
    Nodes,
    /// Lines of the synthesized circuit.
    Lines,
    /// Quantum cost of the synthesized circuit.
    Quantum,
}

/// Lines and quantum cost of a whole circuit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct CircuitCost {
    pub lines: usize,
    pub quantum: usize,
}

impl CircuitCost {
    pub fn of(circuit: &Circuit) -> Self {
        CircuitCost {
            lines: circuit.lines,
            quantum: circuit.quantum_cost(),
        }
    }
}

impl DdGraph {
    /// Cost of the circuit synthesized from this graph over `num_inputs` input lines.
    pub fn cost(&self, num_inputs: usize) -> Result<CircuitCost> {
        let names = vec![String::new(); num_inputs];
        let circuit = synthesize_graph(self, &names)?;
        Ok(CircuitCost::of(&circuit))
    }
}

impl Kfdd {
    /// Cost of synthesizing `roots` with complement edges.
    pub fn circuit_cost(&self, roots: &[Ref]) -> Result<CircuitCost> {
        for &r in roots {
            self.validate(r)?;
        }
        self.dd_graph(roots, true).cost(self.num_vars())
    }

    /// Current value of `objective`. Circuit objectives are taken over the registered outputs.
    ///
    /// A diagram the synthesizer rejects measures as `usize::MAX`.
    pub fn measure(&self, objective: Objective) -> usize {
        let value = match objective {
            Objective::Nodes => self.size_all(),
            Objective::Lines | Objective::Quantum => {
                let roots: Vec<Ref> = self.outputs().into_iter().map(|(_, r)| r).collect();
                match self.circuit_cost(&roots) {
                    Ok(cost) if objective == Objective::Lines => cost.lines,
                    Ok(cost) => cost.quantum,
                    Err(e) => {
                        warn!("measure({:?}): {}", objective, e);
                        usize::MAX
                    }
                }
            }
        };
        debug!("measure({:?}) -> {}", objective, value);
        value
    }
}
