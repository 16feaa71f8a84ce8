//! Radius-limited single-source vertex Dijkstra.
//!
//! Used to precompute route tables: every vertex within `radius` of the
//! source is settled with its distance and the edge it was entered by.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;

use super::frontier_order;
use crate::traits::Cost;

/// How a bounded search ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Every reachable vertex was settled within the radius.
    Exhausted,
    /// The search stopped at the first vertex beyond the radius.
    OutOfRadius,
}

/// Shortest-path tree of one bounded search.
#[derive(Clone, Debug)]
pub struct SearchTree {
    pub source: NodeIndex,
    /// Vertices in settle order, source first.
    pub order: Vec<NodeIndex>,
    /// Settled vertex -> (distance, edge it was entered by).
    pub reached: FxHashMap<NodeIndex, (f64, Option<EdgeIndex>)>,
    pub outcome: Outcome,
}

impl SearchTree {
    pub fn distance(&self, vertex: NodeIndex) -> Option<f64> {
        self.reached.get(&vertex).map(|&(d, _)| d)
    }

    /// Edges from the source to `vertex`, in travel order. `tail` maps an
    /// edge to the vertex it leaves.
    pub fn edges_to(
        &self,
        vertex: NodeIndex,
        tail: impl Fn(EdgeIndex) -> Option<NodeIndex>,
    ) -> Option<Vec<EdgeIndex>> {
        let mut edges = Vec::new();
        let mut cursor = vertex;
        loop {
            let &(_, via) = self.reached.get(&cursor)?;
            match via {
                Some(edge) => {
                    edges.push(edge);
                    cursor = tail(edge)?;
                }
                None => break,
            }
        }
        edges.reverse();
        Some(edges)
    }
}

#[derive(Clone, Copy, Debug)]
struct VertexMark {
    vertex: NodeIndex,
    via: Option<EdgeIndex>,
    cost: f64,
    seq: u64,
}

impl PartialEq for VertexMark {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VertexMark {}

impl PartialOrd for VertexMark {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VertexMark {
    fn cmp(&self, other: &Self) -> Ordering {
        frontier_order((self.cost, self.seq), (other.cost, other.seq))
    }
}

/// Search stopped by a vertex beyond the radius.
struct OutOfRadius;

/// Settle every vertex whose distance from `source` is at most `radius`.
pub fn search<N, E, C>(graph: &DiGraph<N, E>, cost: &C, source: NodeIndex, radius: f64) -> SearchTree
where
    C: Cost<E> + ?Sized,
{
    let mut tree = SearchTree {
        source,
        order: Vec::new(),
        reached: FxHashMap::default(),
        outcome: Outcome::Exhausted,
    };
    if graph.node_weight(source).is_none() {
        return tree;
    }
    if expand(graph, cost, radius, &mut tree).is_err() {
        tree.outcome = Outcome::OutOfRadius;
    }
    tree
}

fn expand<N, E, C>(
    graph: &DiGraph<N, E>,
    cost: &C,
    radius: f64,
    tree: &mut SearchTree,
) -> Result<(), OutOfRadius>
where
    C: Cost<E> + ?Sized,
{
    let mut heap = BinaryHeap::new();
    let mut tentative: FxHashMap<NodeIndex, f64> = FxHashMap::default();
    let mut seq = 0u64;

    heap.push(VertexMark {
        vertex: tree.source,
        via: None,
        cost: 0.0,
        seq,
    });
    tentative.insert(tree.source, 0.0);

    while let Some(mark) = heap.pop() {
        if tree.reached.contains_key(&mark.vertex) {
            continue;
        }
        if mark.cost > radius {
            return Err(OutOfRadius);
        }
        tree.reached.insert(mark.vertex, (mark.cost, mark.via));
        tree.order.push(mark.vertex);

        for edge in graph.edges_directed(mark.vertex, Direction::Outgoing) {
            let next = edge.target();
            if tree.reached.contains_key(&next) {
                continue;
            }
            let distance = mark.cost + cost.cost(edge.weight());
            let better = tentative.get(&next).map_or(true, |&known| distance < known);
            if better {
                tentative.insert(next, distance);
                seq += 1;
                heap.push(VertexMark {
                    vertex: next,
                    via: Some(edge.id()),
                    cost: distance,
                    seq,
                });
            }
        }
    }
    Ok(())
}
