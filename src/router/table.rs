//! Precomputed next-hop routing.
//!
//! [`RouteTable::build`] runs a [`bounded`](super::bounded) search from every
//! vertex and keeps, for each vertex pair within the radius, the first edge of
//! a shortest path and its total distance. Routes are recovered by chaining
//! rows, so a query costs time proportional to the route length.

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use rustc_hash::FxHashMap;

use super::bounded;
use super::{Route, RoutePoint, Router};
use crate::traits::Cost;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// First hop and total distance of a shortest path between two vertices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteRow {
    pub edge: EdgeIndex,
    pub next: NodeIndex,
    pub distance: f64,
}

/// All vertex pairs within `radius`, keyed `(from, to)`.
#[derive(Clone, Debug)]
pub struct RouteTable {
    rows: FxHashMap<(NodeIndex, NodeIndex), RouteRow>,
    radius: f64,
}

/// Rows of a single source vertex.
fn rows_from<N, E, C>(
    graph: &DiGraph<N, E>,
    cost: &C,
    source: NodeIndex,
    radius: f64,
) -> Vec<((NodeIndex, NodeIndex), RouteRow)>
where
    C: Cost<E> + ?Sized,
{
    let tree = bounded::search(graph, cost, source, radius);
    let mut first: FxHashMap<NodeIndex, EdgeIndex> = FxHashMap::default();
    let mut rows = Vec::with_capacity(tree.order.len().saturating_sub(1));

    // Parents settle before children, so `first` is always filled in time.
    for &vertex in &tree.order {
        let Some(&(distance, Some(via))) = tree.reached.get(&vertex) else {
            continue;
        };
        let Some((parent, _)) = graph.edge_endpoints(via) else {
            continue;
        };
        let edge = if parent == source {
            via
        } else {
            match first.get(&parent) {
                Some(&edge) => edge,
                None => continue,
            }
        };
        first.insert(vertex, edge);
        let Some((_, next)) = graph.edge_endpoints(edge) else {
            continue;
        };
        rows.push((
            (source, vertex),
            RouteRow {
                edge,
                next,
                distance,
            },
        ));
    }

    #[cfg(feature = "tracing")]
    if tree.outcome == bounded::Outcome::OutOfRadius {
        tracing::trace!(source = source.index(), rows = rows.len(), "search hit radius");
    }
    rows
}

#[cfg(feature = "parallel")]
impl RouteTable {
    /// Build the table with one bounded search per vertex, fanned out over
    /// the rayon thread pool.
    ///
    /// # Panics
    /// Panics if `radius` is negative or NaN.
    pub fn build<N, E, C>(graph: &DiGraph<N, E>, cost: &C, radius: f64) -> Self
    where
        N: Sync,
        E: Sync,
        C: Cost<E> + Sync + ?Sized,
    {
        assert!(radius >= 0.0, "radius must be non-negative, got {radius}");
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!("route_table_build", vertices = graph.node_count());
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let sources: Vec<NodeIndex> = graph.node_indices().collect();
        let per_source: Vec<_> = sources
            .par_iter()
            .map(|&source| rows_from(graph, cost, source, radius))
            .collect();
        Self::assemble(per_source, radius)
    }
}

#[cfg(not(feature = "parallel"))]
impl RouteTable {
    /// Build the table with one bounded search per vertex.
    ///
    /// # Panics
    /// Panics if `radius` is negative or NaN.
    pub fn build<N, E, C>(graph: &DiGraph<N, E>, cost: &C, radius: f64) -> Self
    where
        C: Cost<E> + ?Sized,
    {
        assert!(radius >= 0.0, "radius must be non-negative, got {radius}");
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!("route_table_build", vertices = graph.node_count());
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let per_source: Vec<_> = graph
            .node_indices()
            .map(|source| rows_from(graph, cost, source, radius))
            .collect();
        Self::assemble(per_source, radius)
    }
}

impl RouteTable {
    fn assemble(
        per_source: Vec<Vec<((NodeIndex, NodeIndex), RouteRow)>>,
        radius: f64,
    ) -> Self {
        let total = per_source.iter().map(Vec::len).sum();
        let mut rows = FxHashMap::with_capacity_and_hasher(total, Default::default());
        rows.extend(per_source.into_iter().flatten());
        #[cfg(feature = "tracing")]
        tracing::debug!(rows = rows.len(), radius, "route table built");
        Self { rows, radius }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn row(&self, from: NodeIndex, to: NodeIndex) -> Option<&RouteRow> {
        self.rows.get(&(from, to))
    }

    /// Shortest distance from `from` to `to`; zero for `from == to`.
    pub fn distance(&self, from: NodeIndex, to: NodeIndex) -> Option<f64> {
        if from == to {
            return Some(0.0);
        }
        self.row(from, to).map(|row| row.distance)
    }

    /// Edges of a shortest path from `from` to `to`; empty for `from == to`.
    pub fn path(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<EdgeIndex>> {
        let mut edges = Vec::new();
        let mut cursor = from;
        while cursor != to {
            // Zero-cost cycles could otherwise chain forever.
            if edges.len() > self.rows.len() {
                return None;
            }
            let row = self.row(cursor, to)?;
            edges.push(row.edge);
            cursor = row.next;
        }
        Some(edges)
    }
}

/// [`Router`] answering from a [`RouteTable`].
///
/// Routes longer than the table's radius are reported as unreachable. With
/// [`with_bound`](Self::with_bound), a route is also unreachable when the
/// accumulated bounding cost up to its last full edge exceeds `max`, which
/// is where [`DijkstraRouter`](super::dijkstra::DijkstraRouter) stops
/// expanding.
pub struct PrecomputedRouter<'g, N, E, C, B = fn(&E) -> f64> {
    graph: &'g DiGraph<N, E>,
    table: RouteTable,
    cost: C,
    bound: Option<(B, f64)>,
}

impl<'g, N, E, C: Cost<E>> PrecomputedRouter<'g, N, E, C> {
    /// `cost` must be the function `table` was built with.
    pub fn new(graph: &'g DiGraph<N, E>, table: RouteTable, cost: C) -> Self {
        Self {
            graph,
            table,
            cost,
            bound: None,
        }
    }
}

impl<'g, N, E, C, B> PrecomputedRouter<'g, N, E, C, B> {
    /// Reject routes whose accumulated `bound` cost exceeds `max` before the
    /// target edge.
    pub fn with_bound<B2>(self, bound: B2, max: f64) -> PrecomputedRouter<'g, N, E, C, B2> {
        PrecomputedRouter {
            graph: self.graph,
            table: self.table,
            cost: self.cost,
            bound: Some((bound, max)),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}

impl<'g, N, E, C: Cost<E>, B: Cost<E>> PrecomputedRouter<'g, N, E, C, B> {
    fn edge_cost(&self, edge: EdgeIndex) -> Option<f64> {
        self.graph.edge_weight(edge).map(|w| self.cost.cost(w))
    }

    /// Whether the bounding cost stays within `max` through the source's
    /// remainder and every `middle` edge.
    fn within_bound(&self, source: &RoutePoint, middle: &[EdgeIndex]) -> bool {
        let Some((bound, max)) = &self.bound else {
            return true;
        };
        let weight = |edge: EdgeIndex| self.graph.edge_weight(edge).map_or(0.0, |w| bound.cost(w));
        let mut total = weight(source.edge) * (1.0 - source.fraction);
        for &edge in middle {
            total += weight(edge);
        }
        total <= *max
    }

    fn between(&self, source: &RoutePoint, target: &RoutePoint) -> Option<(f64, Vec<EdgeIndex>)> {
        let first = self.edge_cost(source.edge)?;
        if source.edge == target.edge && target.fraction >= source.fraction {
            return Some((first * (target.fraction - source.fraction), vec![source.edge]));
        }
        let last = self.edge_cost(target.edge)?;
        let (_, head) = self.graph.edge_endpoints(source.edge)?;
        let (tail, _) = self.graph.edge_endpoints(target.edge)?;

        let middle = self.table.distance(head, tail)?;
        let path = self.table.path(head, tail)?;
        // Adjacent targets are reached without expanding anything.
        if !path.is_empty() && !self.within_bound(source, &path) {
            return None;
        }
        let mut edges = Vec::with_capacity(path.len() + 2);
        edges.push(source.edge);
        edges.extend(path);
        edges.push(target.edge);
        let cost = first * (1.0 - source.fraction) + middle + last * target.fraction;
        Some((cost, edges))
    }
}

impl<'g, N, E, C, B> Router for PrecomputedRouter<'g, N, E, C, B>
where
    C: Cost<E>,
    B: Cost<E>,
{
    fn route(&self, sources: &[RoutePoint], targets: &[RoutePoint]) -> Vec<Option<Route>> {
        targets
            .iter()
            .map(|target| {
                let mut best: Option<Route> = None;
                for (idx, source) in sources.iter().enumerate() {
                    let Some((cost, edges)) = self.between(source, target) else {
                        continue;
                    };
                    if best.as_ref().map_or(true, |b| cost < b.cost) {
                        best = Some(Route {
                            source: idx,
                            edges,
                            cost,
                        });
                    }
                }
                best
            })
            .collect()
    }
}
