//! Exact multi-source multi-target routing.
//!
//! The search runs over edges rather than vertices so that sources and
//! targets may sit anywhere along an edge. Every edge is settled at most once,
//! with the cost of reaching its end; targets are finalized when their own
//! mark leaves the queue, so the first route reported for a target is the
//! cheapest one from any source.
//!
//! An optional bounding cost limits locality without changing which route
//! is optimal: edges whose accumulated bound exceeds `max` are settled but
//! not expanded.

use std::collections::BinaryHeap;

use petgraph::graph::{DiGraph, EdgeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;

use super::{Route, RouteMark, RoutePoint, Router};
use crate::traits::Cost;

/// Queue wrapper handing out insertion sequence numbers.
struct Frontier {
    heap: BinaryHeap<RouteMark>,
    seq: u64,
}

impl Frontier {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    fn push(&mut self, mut mark: RouteMark) {
        mark.seq = self.seq;
        self.seq += 1;
        self.heap.push(mark);
    }

    fn pop(&mut self) -> Option<RouteMark> {
        self.heap.pop()
    }
}

/// Cheapest routes from `sources` to every target.
///
/// `bound` is an optional `(bounding cost, max)` pair. Result index `i`
/// answers `targets[i]`.
pub fn route<N, E, C>(
    graph: &DiGraph<N, E>,
    sources: &[RoutePoint],
    targets: &[RoutePoint],
    cost: &C,
    bound: Option<(&dyn Cost<E>, f64)>,
) -> Vec<Option<Route>>
where
    C: Cost<E> + ?Sized,
{
    #[cfg(feature = "tracing")]
    let span = tracing::trace_span!("route", sources = sources.len(), targets = targets.len());
    #[cfg(feature = "tracing")]
    let _enter = span.enter();

    let mut results: Vec<Option<Route>> = targets.iter().map(|_| None).collect();
    if sources.is_empty() || targets.is_empty() {
        return results;
    }

    let edge_cost = |edge: EdgeIndex| graph.edge_weight(edge).map(|w| cost.cost(w));
    let edge_bound = |edge: EdgeIndex| match bound {
        Some((b, _)) => graph.edge_weight(edge).map_or(0.0, |w| b.cost(w)),
        None => 0.0,
    };
    let max = bound.map(|(_, max)| max);

    let mut on_edge: FxHashMap<EdgeIndex, Vec<usize>> = FxHashMap::default();
    for (idx, target) in targets.iter().enumerate() {
        on_edge.entry(target.edge).or_default().push(idx);
    }

    let mut frontier = Frontier::new();
    for (idx, source) in sources.iter().enumerate() {
        let Some(full) = edge_cost(source.edge) else {
            continue;
        };
        let remaining = full * (1.0 - source.fraction);

        for &t in on_edge.get(&source.edge).into_iter().flatten() {
            let target = &targets[t];
            if target.fraction >= source.fraction {
                frontier.push(RouteMark {
                    edge: source.edge,
                    predecessor: None,
                    cost: full * (target.fraction - source.fraction),
                    bound: 0.0,
                    source: idx,
                    target: Some(t),
                    seq: 0,
                });
            }
        }

        frontier.push(RouteMark {
            edge: source.edge,
            predecessor: None,
            cost: remaining,
            bound: edge_bound(source.edge) * (1.0 - source.fraction),
            source: idx,
            target: None,
            seq: 0,
        });

        // Targets on an adjacent edge need no search.
        let Some((_, vertex)) = graph.edge_endpoints(source.edge) else {
            continue;
        };
        for next in graph.edges_directed(vertex, Direction::Outgoing) {
            for &t in on_edge.get(&next.id()).into_iter().flatten() {
                frontier.push(RouteMark {
                    edge: next.id(),
                    predecessor: Some(source.edge),
                    cost: remaining + cost.cost(next.weight()) * targets[t].fraction,
                    bound: 0.0,
                    source: idx,
                    target: Some(t),
                    seq: 0,
                });
            }
        }
    }

    // edge -> (predecessor edge, source index)
    let mut settled: FxHashMap<EdgeIndex, (Option<EdgeIndex>, usize)> = FxHashMap::default();
    let mut open = targets.len();

    while let Some(mark) = frontier.pop() {
        if let Some(t) = mark.target {
            if results[t].is_some() {
                continue;
            }
            let (source, mut edges) = match mark.predecessor {
                Some(predecessor) => unwind(&settled, predecessor, mark.source),
                None => (mark.source, Vec::new()),
            };
            edges.push(mark.edge);
            results[t] = Some(Route {
                source,
                edges,
                cost: mark.cost,
            });
            open -= 1;
            if open == 0 {
                break;
            }
            continue;
        }

        if settled.contains_key(&mark.edge) {
            continue;
        }
        settled.insert(mark.edge, (mark.predecessor, mark.source));
        if max.is_some_and(|max| mark.bound > max) {
            continue;
        }

        let Some((_, vertex)) = graph.edge_endpoints(mark.edge) else {
            continue;
        };
        for next in graph.edges_directed(vertex, Direction::Outgoing) {
            let step = cost.cost(next.weight());
            for &t in on_edge.get(&next.id()).into_iter().flatten() {
                if results[t].is_none() {
                    frontier.push(RouteMark {
                        edge: next.id(),
                        predecessor: Some(mark.edge),
                        cost: mark.cost + step * targets[t].fraction,
                        bound: mark.bound,
                        source: mark.source,
                        target: Some(t),
                        seq: 0,
                    });
                }
            }
            if !settled.contains_key(&next.id()) {
                frontier.push(RouteMark {
                    edge: next.id(),
                    predecessor: Some(mark.edge),
                    cost: mark.cost + step,
                    bound: mark.bound + edge_bound(next.id()),
                    source: mark.source,
                    target: None,
                    seq: 0,
                });
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(settled = settled.len(), unreached = open, "route finished");
    results
}

/// Edge chain ending in `last`, oldest first, and the source it started at.
fn unwind(
    settled: &FxHashMap<EdgeIndex, (Option<EdgeIndex>, usize)>,
    last: EdgeIndex,
    fallback_source: usize,
) -> (usize, Vec<EdgeIndex>) {
    let mut edges = Vec::new();
    let mut source = fallback_source;
    let mut cursor = Some(last);
    while let Some(edge) = cursor {
        edges.push(edge);
        match settled.get(&edge) {
            Some(&(predecessor, origin)) => {
                source = origin;
                cursor = predecessor;
            }
            None => break,
        }
    }
    edges.reverse();
    (source, edges)
}

/// [`Router`] running [`route`] on every query.
pub struct DijkstraRouter<'g, N, E, C, B = fn(&E) -> f64> {
    graph: &'g DiGraph<N, E>,
    cost: C,
    bound: Option<(B, f64)>,
}

impl<'g, N, E, C> DijkstraRouter<'g, N, E, C> {
    pub fn new(graph: &'g DiGraph<N, E>, cost: C) -> Self {
        Self {
            graph,
            cost,
            bound: None,
        }
    }
}

impl<'g, N, E, C, B> DijkstraRouter<'g, N, E, C, B> {
    /// Stop expanding edges once their accumulated `bound` cost exceeds `max`.
    pub fn with_bound<B2>(self, bound: B2, max: f64) -> DijkstraRouter<'g, N, E, C, B2> {
        DijkstraRouter {
            graph: self.graph,
            cost: self.cost,
            bound: Some((bound, max)),
        }
    }

    pub fn graph(&self) -> &'g DiGraph<N, E> {
        self.graph
    }
}

impl<'g, N, E, C, B> Router for DijkstraRouter<'g, N, E, C, B>
where
    C: Cost<E>,
    B: Cost<E>,
{
    fn route(&self, sources: &[RoutePoint], targets: &[RoutePoint]) -> Vec<Option<Route>> {
        let bound = self
            .bound
            .as_ref()
            .map(|(b, max)| (b as &dyn Cost<E>, *max));
        route(self.graph, sources, targets, &self.cost, bound)
    }
}
