//! A read-only snapshot of the diagram below a set of roots.
//!
//! The circuit synthesizer and the cost estimator both walk the diagram
//! bottom-up and need every vertex's in-degree up front. [`DdGraph`] lists
//! the reachable vertices in post-order (high child first), so children
//! always precede their parents.

use std::collections::HashMap;

use log::debug;

use crate::kfdd::Kfdd;
use crate::reference::Ref;
use crate::types::{DecompositionType, Var};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Target {
    Constant(bool),
    Vertex(usize),
}

/// An edge of the snapshot. Edges into constants are never complemented.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Edge {
    pub target: Target,
    pub complemented: bool,
}

impl Edge {
    pub fn constant(value: bool) -> Self {
        Edge {
            target: Target::Constant(value),
            complemented: false,
        }
    }

    pub fn vertex(index: usize, complemented: bool) -> Self {
        Edge {
            target: Target::Vertex(index),
            complemented,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub var: Var,
    pub decomposition: DecompositionType,
    pub low: Edge,
    pub high: Edge,
    /// Parent edges plus root references.
    pub in_degree: usize,
}

/// Vertices in post-order together with the root edges.
#[derive(Debug, Clone, Default)]
pub struct DdGraph {
    pub vertices: Vec<Vertex>,
    pub roots: Vec<Edge>,
    pub root_names: Vec<String>,
}

impl DdGraph {
    /// Build a graph by hand. Computes the in-degrees.
    ///
    /// Every vertex edge must point at an earlier vertex.
    pub fn from_parts(vertices: Vec<Vertex>, roots: Vec<(String, Edge)>) -> Self {
        let (root_names, roots) = roots.into_iter().unzip();
        let mut graph = DdGraph {
            vertices,
            roots,
            root_names,
        };
        graph.count_in_degrees();
        graph
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    fn count_in_degrees(&mut self) {
        let mut degrees = vec![0; self.vertices.len()];
        let edges = self
            .vertices
            .iter()
            .flat_map(|v| [v.low, v.high])
            .chain(self.roots.iter().copied());
        for edge in edges {
            if let Target::Vertex(i) = edge.target {
                degrees[i] += 1;
            }
        }
        for (vertex, d) in self.vertices.iter_mut().zip(degrees) {
            vertex.in_degree = d;
        }
    }
}

impl Kfdd {
    /// Snapshot the diagram below `roots`.
    ///
    /// With `complemented_edges`, a vertex is a stored node and edges carry
    /// the complement bit. Otherwise a vertex is a node seen with a given
    /// polarity, so `f` and `~f` become distinct vertices and no edge is
    /// complemented.
    ///
    /// Roots are named after the registered output with the same handle,
    /// and `f<i>` otherwise.
    pub fn dd_graph(&self, roots: &[Ref], complemented_edges: bool) -> DdGraph {
        let storage = self.storage.borrow();
        // Vertex key: the node index, or the whole handle without complement edges.
        let key = |r: Ref| if complemented_edges { r.regular() } else { r };
        let edge = |r: Ref, map: &HashMap<Ref, usize>| {
            if r.is_terminal() {
                Edge::constant(r == Ref::ONE)
            } else if complemented_edges {
                Edge::vertex(map[&r.regular()], r.is_negated())
            } else {
                Edge::vertex(map[&r], false)
            }
        };
        let children = |r: Ref| {
            if complemented_edges {
                let node = storage.node(r.index());
                (node.low, node.high)
            } else {
                storage.cofactors(r)
            }
        };

        let mut map: HashMap<Ref, usize> = HashMap::new();
        let mut vertices = Vec::new();
        for &root in roots {
            let mut stack = vec![(key(root), false)];
            while let Some((r, expanded)) = stack.pop() {
                if r.is_terminal() || map.contains_key(&r) {
                    continue;
                }
                let (low, high) = children(r);
                if !expanded {
                    stack.push((r, true));
                    stack.push((key(low), false));
                    stack.push((key(high), false));
                    continue;
                }
                let var = Var::new(storage.node(r.index()).variable);
                vertices.push(Vertex {
                    var,
                    decomposition: storage.decomposition(var),
                    low: edge(low, &map),
                    high: edge(high, &map),
                    in_degree: 0,
                });
                map.insert(r, vertices.len() - 1);
            }
        }

        let outputs = self.names.borrow().outputs().to_vec();
        let mut taken = vec![false; outputs.len()];
        let named: Vec<(String, Edge)> = roots
            .iter()
            .enumerate()
            .map(|(i, &r)| {
                let name = match outputs.iter().enumerate().position(|(j, (_, o))| !taken[j] && *o == r) {
                    Some(j) => {
                        taken[j] = true;
                        outputs[j].0.clone()
                    }
                    None => format!("f{}", i),
                };
                (name, edge(r, &map))
            })
            .collect();
        drop(storage);

        let graph = DdGraph::from_parts(vertices, named);
        debug!(
            "dd_graph(roots = {}, complemented = {}) -> {} vertices",
            roots.len(),
            complemented_edges,
            graph.len()
        );
        graph
    }
}
