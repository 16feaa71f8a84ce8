//! Shortest-path routing between points on a directed road graph.
//!
//! Two interchangeable [`Router`] implementations:
//! - [`dijkstra::DijkstraRouter`] : exact multi-source multi-target search per
//!   query, optionally pruned by a bounding cost.
//! - [`table::PrecomputedRouter`] : answers from a [`table::RouteTable`] built
//!   once with [`bounded`] searches from every vertex; O(path length) per query
//!   within the precomputed radius.
//!
//! The road graph is a `petgraph` [`DiGraph`](petgraph::graph::DiGraph); edge
//! weights are interpreted only through [`Cost`](crate::traits::Cost)
//! functions. Costs must be non-negative.

use std::cmp::Ordering;

use petgraph::graph::EdgeIndex;

pub mod bounded;
pub mod dijkstra;
pub mod table;

/// A position on an edge: `fraction` 0 is the edge's source vertex, 1 its
/// target vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoutePoint {
    pub edge: EdgeIndex,
    pub fraction: f64,
}

impl RoutePoint {
    /// # Panics
    /// Panics if `fraction` is not within `[0, 1]`.
    pub fn new(edge: EdgeIndex, fraction: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&fraction),
            "fraction must lie within [0, 1], got {fraction}"
        );
        Self { edge, fraction }
    }

    pub fn start(edge: EdgeIndex) -> Self {
        Self::new(edge, 0.0)
    }

    pub fn end(edge: EdgeIndex) -> Self {
        Self::new(edge, 1.0)
    }
}

/// A route from one of the query's sources to a target.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    /// Index into the query's `sources`.
    pub source: usize,
    /// Edges from the source's edge to the target's edge, both included.
    pub edges: Vec<EdgeIndex>,
    /// Cost between the two points, counting partial first and last edges.
    pub cost: f64,
}

/// Common routing contract.
pub trait Router {
    /// Cheapest route to every target from any source; index `i` of the
    /// result answers `targets[i]`, `None` when unreachable (or outside the
    /// router's search bounds).
    fn route(&self, sources: &[RoutePoint], targets: &[RoutePoint]) -> Vec<Option<Route>>;

    fn route_one(&self, source: RoutePoint, target: RoutePoint) -> Option<Route> {
        self.route(&[source], &[target]).pop().flatten()
    }
}

/// Priority-queue entry of the edge-based search.
///
/// A mark on `edge` with `target == None` stands for having traversed the
/// whole edge; with `target == Some(t)` it stands for having reached target
/// `t` on that edge.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RouteMark {
    pub edge: EdgeIndex,
    pub predecessor: Option<EdgeIndex>,
    pub cost: f64,
    pub bound: f64,
    pub source: usize,
    pub target: Option<usize>,
    pub seq: u64,
}

/// Min-heap order for `BinaryHeap`: lower cost first, then earlier insertion.
#[inline]
pub(crate) fn frontier_order(a: (f64, u64), b: (f64, u64)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| b.1.cmp(&a.1))
}

impl PartialEq for RouteMark {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RouteMark {}

impl PartialOrd for RouteMark {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RouteMark {
    fn cmp(&self, other: &Self) -> Ordering {
        frontier_order((self.cost, self.seq), (other.cost, other.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn mark(cost: f64, seq: u64) -> RouteMark {
        RouteMark {
            edge: EdgeIndex::new(0),
            predecessor: None,
            cost,
            bound: 0.0,
            source: 0,
            target: None,
            seq,
        }
    }

    #[test]
    fn heap_pops_cheapest_then_oldest() {
        let mut heap = BinaryHeap::new();
        heap.push(mark(2.0, 0));
        heap.push(mark(1.0, 2));
        heap.push(mark(1.0, 1));
        heap.push(mark(0.5, 3));
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop()).map(|m| m.seq).collect();
        assert_eq!(order, vec![3, 1, 2, 0]);
    }

    #[test]
    #[should_panic(expected = "fraction must lie within")]
    fn fraction_outside_edge_panics() {
        RoutePoint::new(EdgeIndex::new(0), 1.5);
    }
}
