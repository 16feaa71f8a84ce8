//! End-to-end: candidate projection, routed transitions, filter and lattice on
//! a small two-way road network.

use kstate_match::router::dijkstra::DijkstraRouter;
use kstate_match::{
    CandidateSource, Filter, Hypothesis, KState, KStateBuilder, Route, RoutePoint, Router, Sample,
    TransitionSource,
};
use petgraph::graph::{DiGraph, EdgeIndex};

type Point = (f64, f64);

#[derive(Clone, Copy, Debug)]
struct Fix {
    time: u64,
    at: Point,
}

impl Sample for Fix {
    fn time(&self) -> u64 {
        self.time
    }
}

fn length(w: &f64) -> f64 {
    *w
}

/// South road at y = 0 and north road at y = 40, x from 0 to 300, joined at
/// both ends. Every road is two-way.
fn network() -> DiGraph<Point, f64> {
    let mut g = DiGraph::new();
    let south: Vec<_> = (0..4).map(|i| g.add_node((100.0 * i as f64, 0.0))).collect();
    let north: Vec<_> = (0..4).map(|i| g.add_node((100.0 * i as f64, 40.0))).collect();
    let both = |g: &mut DiGraph<Point, f64>, a, b, w| {
        g.add_edge(a, b, w);
        g.add_edge(b, a, w);
    };
    for i in 0..3 {
        both(&mut g, south[i], south[i + 1], 100.0);
        both(&mut g, north[i], north[i + 1], 100.0);
    }
    both(&mut g, south[0], north[0], 40.0);
    both(&mut g, south[3], north[3], 40.0);
    g
}

struct Projection<'g> {
    graph: &'g DiGraph<Point, f64>,
    radius: f64,
    sigma: f64,
}

impl CandidateSource<RoutePoint, Route, Fix> for Projection<'_> {
    fn candidates(&self, _: &[Hypothesis<RoutePoint, Route>], fix: &Fix) -> Vec<(RoutePoint, f64)> {
        let mut out = Vec::new();
        for edge in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            let (pa, pb) = (self.graph[a], self.graph[b]);
            let (dx, dy) = (pb.0 - pa.0, pb.1 - pa.1);
            let along = ((fix.at.0 - pa.0) * dx + (fix.at.1 - pa.1) * dy) / (dx * dx + dy * dy);
            let fraction = along.clamp(0.0, 1.0);
            let foot = (pa.0 + fraction * dx, pa.1 + fraction * dy);
            let distance = (fix.at.0 - foot.0).hypot(fix.at.1 - foot.1);
            if distance <= self.radius {
                let emission = (-0.5 * (distance / self.sigma).powi(2)).exp();
                out.push((RoutePoint::new(edge, fraction), emission));
            }
        }
        out
    }
}

struct Routed<'g> {
    router: DijkstraRouter<'g, Point, f64, fn(&f64) -> f64>,
    beta: f64,
}

impl Routed<'_> {
    fn probability(&self, route: &Route, previous: &Fix, sample: &Fix) -> f64 {
        let straight = (sample.at.0 - previous.at.0).hypot(sample.at.1 - previous.at.1);
        (-(route.cost - straight).abs() / self.beta).exp()
    }
}

impl TransitionSource<RoutePoint, Route, Fix> for Routed<'_> {
    fn transition(
        &self,
        predecessor: (&Fix, &Hypothesis<RoutePoint, Route>),
        candidate: (&Fix, &RoutePoint),
    ) -> Option<(Route, f64)> {
        let route = self.router.route_one(predecessor.1.state, *candidate.1)?;
        let p = self.probability(&route, predecessor.0, candidate.0);
        Some((route, p))
    }

    fn transitions(
        &self,
        predecessors: (&Fix, &[Hypothesis<RoutePoint, Route>]),
        candidates: (&Fix, &[RoutePoint]),
    ) -> Vec<Vec<Option<(Route, f64)>>> {
        let (previous, predecessors) = predecessors;
        let (sample, states) = candidates;
        predecessors
            .iter()
            .map(|predecessor| {
                self.router
                    .route(&[predecessor.state], states)
                    .into_iter()
                    .map(|route| {
                        route.map(|route| {
                            let p = self.probability(&route, previous, sample);
                            (route, p)
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

fn fixes(points: &[Point]) -> Vec<Fix> {
    points
        .iter()
        .enumerate()
        .map(|(i, &at)| Fix {
            time: 10 * i as u64,
            at,
        })
        .collect()
}

fn is_south_eastbound(g: &DiGraph<Point, f64>, edge: EdgeIndex) -> bool {
    let Some((a, b)) = g.edge_endpoints(edge) else {
        return false;
    };
    g[a].1 == 0.0 && g[b].1 == 0.0 && g[a].0 < g[b].0
}

fn filter(g: &DiGraph<Point, f64>) -> Filter<Projection<'_>, Routed<'_>> {
    Filter::new(
        Projection {
            graph: g,
            radius: 30.0,
            sigma: 10.0,
        },
        Routed {
            router: DijkstraRouter::new(g, length as fn(&f64) -> f64),
            beta: 10.0,
        },
    )
}

fn matched(
    filter: &Filter<Projection<'_>, Routed<'_>>,
    lattice: &mut KState<RoutePoint, Route, Fix>,
    trace: &[Fix],
) {
    for fix in trace {
        let vector = filter
            .execute(lattice.vector(), lattice.sample(), fix)
            .unwrap();
        lattice.update(vector, *fix).unwrap();
        lattice.check_invariants().unwrap();
    }
}

#[test]
fn trace_along_south_road_matches_eastbound_edges() {
    let g = network();
    let trace = fixes(&[
        (10.0, 5.0),
        (60.0, 5.0),
        (120.0, 5.0),
        (170.0, 5.0),
        (230.0, 5.0),
        (280.0, 5.0),
    ]);
    let mut lattice = KState::new();
    matched(&filter(&g), &mut lattice, &trace);

    let sequence = lattice.sequence();
    assert_eq!(sequence.len(), trace.len());
    for h in &sequence {
        assert!(is_south_eastbound(&g, h.state.edge), "{:?}", h.state);
    }
    for pair in sequence.windows(2) {
        let route = pair[1].transition.as_ref().unwrap();
        assert_eq!(route.edges.first(), Some(&pair[0].state.edge));
        assert_eq!(route.edges.last(), Some(&pair[1].state.edge));
        assert!((route.cost - 50.0).abs() < 1e-9 || (route.cost - 60.0).abs() < 1e-9);
    }
    assert!(is_south_eastbound(&g, lattice.estimate().unwrap().state.edge));
}

#[test]
fn single_outlier_is_smoothed_by_sequence() {
    let g = network();
    let trace = fixes(&[
        (10.0, 5.0),
        (60.0, 5.0),
        (120.0, 22.0),
        (170.0, 5.0),
        (230.0, 5.0),
    ]);
    let filter = filter(&g);
    let mut lattice = KState::new();
    matched(&filter, &mut lattice, &trace[..3]);

    // The outlier lies closer to the north road.
    let emissions = filter.candidates().candidates(&[], &trace[2]);
    let north = emissions
        .iter()
        .filter(|(p, _)| g[g.edge_endpoints(p.edge).unwrap().0].1 == 40.0)
        .map(|&(_, e)| e)
        .fold(0.0, f64::max);
    let south = emissions
        .iter()
        .filter(|(p, _)| is_south_eastbound(&g, p.edge))
        .map(|&(_, e)| e)
        .fold(0.0, f64::max);
    assert!(north > south);

    matched(&filter, &mut lattice, &trace[3..]);
    for h in lattice.sequence() {
        assert!(is_south_eastbound(&g, h.state.edge), "{:?}", h.state);
    }
}

#[test]
fn bounded_matching_keeps_memory_flat() {
    let g = network();
    let points: Vec<Point> = (0..29).map(|i| (5.0 + 10.0 * i as f64, 3.0)).collect();
    let trace = fixes(&points);
    let mut lattice: KState<RoutePoint, Route, Fix> = KStateBuilder::new()
        .with_max_steps(3)
        .with_max_age(25)
        .build();
    let filter = filter(&g);

    let mut peak = 0;
    for fix in &trace {
        let vector = filter
            .execute(lattice.vector(), lattice.sample(), fix)
            .unwrap();
        lattice.update(vector, *fix).unwrap();
        lattice.check_invariants().unwrap();
        peak = peak.max(lattice.count());
        assert!(lattice.len() <= 3);
    }
    assert!(peak < 40);
    assert_eq!(lattice.sample().map(|f| f.time), Some(280));
    for h in lattice.sequence() {
        assert!(is_south_eastbound(&g, h.state.edge));
    }
}
