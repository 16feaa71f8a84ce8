//! Capabilities the core consumes from the matching model.
//!
//! The filter never computes probabilities itself. Candidate generation and
//! transition scoring are injected through [`CandidateSource`] and
//! [`TransitionSource`]; routing is parameterized by [`Cost`] functions.
//! Implementations are free to hold spatial indexes, routers or caches, as
//! long as they answer the questions below for one sample at a time.

use crate::hypothesis::Hypothesis;

/// A measurement with a monotonic timestamp.
///
/// The unit is up to the caller; the lattice's age bound is expressed in the
/// same unit.
pub trait Sample {
    fn time(&self) -> u64;
}

impl Sample for u64 {
    #[inline]
    fn time(&self) -> u64 {
        *self
    }
}

/// Proposes candidate states for a sample together with their emission
/// probabilities.
///
/// The current hypothesis set is passed so that implementations may widen or
/// narrow their search around it. Candidates with emission probability `0`
/// are discarded by the filter.
pub trait CandidateSource<S, P, X> {
    fn candidates(&self, predecessors: &[Hypothesis<S, P>], sample: &X) -> Vec<(S, f64)>;
}

/// Scores transitions between hypotheses of consecutive samples.
pub trait TransitionSource<S, P, X> {
    /// Transition payload and probability from `predecessor` (observed at the
    /// previous sample) to `candidate` (observed at the current sample), or
    /// `None` when no transition exists.
    fn transition(
        &self,
        predecessor: (&X, &Hypothesis<S, P>),
        candidate: (&X, &S),
    ) -> Option<(P, f64)>;

    /// All transitions at once, indexed `[predecessor][candidate]`.
    ///
    /// The default asks [`transition`](Self::transition) for every pair.
    /// Override it when one bulk query is cheaper, e.g. a single
    /// multi-target route per predecessor.
    fn transitions(
        &self,
        predecessors: (&X, &[Hypothesis<S, P>]),
        candidates: (&X, &[S]),
    ) -> Vec<Vec<Option<(P, f64)>>> {
        let (previous, predecessors) = predecessors;
        let (sample, states) = candidates;
        predecessors
            .iter()
            .map(|predecessor| {
                states
                    .iter()
                    .map(|state| self.transition((previous, predecessor), (sample, state)))
                    .collect()
            })
            .collect()
    }
}

/// Non-negative cost of traversing an edge, e.g. length or travel time.
pub trait Cost<E> {
    fn cost(&self, edge: &E) -> f64;
}

impl<E, F> Cost<E> for F
where
    F: Fn(&E) -> f64,
{
    #[inline]
    fn cost(&self, edge: &E) -> f64 {
        self(edge)
    }
}
