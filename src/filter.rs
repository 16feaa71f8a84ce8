//! One step of the online HMM filter.
//!
//! Given the hypotheses of the previous sample, the filter asks the injected
//! [`CandidateSource`] for new candidates and the [`TransitionSource`] for the
//! transition probabilities, then computes for every candidate
//!
//! - the filter probability (forward algorithm, normalized per step), and
//! - the sequence probability (Viterbi, log10) with its most likely
//!   predecessor.
//!
//! When no candidate can be reached from any predecessor the chain is broken;
//! the step is then seeded from emission probabilities alone, exactly as the
//! first sample of a stream is.

use crate::error::{Error, Result};
use crate::hypothesis::Hypothesis;
use crate::traits::{CandidateSource, TransitionSource};
use crate::utils::normalize;

/// Online filter over injected candidate and transition models.
pub struct Filter<C, T> {
    candidates: C,
    transitions: T,
}

impl<C, T> Filter<C, T> {
    pub fn new(candidates: C, transitions: T) -> Self {
        Self {
            candidates,
            transitions,
        }
    }

    pub fn candidates(&self) -> &C {
        &self.candidates
    }

    pub fn transitions(&self) -> &T {
        &self.transitions
    }

    /// Compute the hypothesis set of `sample` from `predecessors`.
    ///
    /// `previous` is the sample `predecessors` were computed for; it is
    /// required whenever `predecessors` is non-empty. The returned
    /// hypotheses store predecessor indices into `predecessors`.
    ///
    /// An empty result means no candidate had a positive emission
    /// probability; [`KState::update`](crate::kstate::KState::update) ignores
    /// such a set.
    pub fn execute<S, P, X>(
        &self,
        predecessors: &[Hypothesis<S, P>],
        previous: Option<&X>,
        sample: &X,
    ) -> Result<Vec<Hypothesis<S, P>>>
    where
        C: CandidateSource<S, P, X>,
        T: TransitionSource<S, P, X>,
    {
        #[cfg(feature = "tracing")]
        let span = tracing::trace_span!("filter_execute", predecessors = predecessors.len());
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let (states, emissions): (Vec<S>, Vec<f64>) = self
            .candidates
            .candidates(predecessors, sample)
            .into_iter()
            .filter(|(_, emission)| emission.is_finite() && *emission > 0.0)
            .unzip();

        if predecessors.is_empty() {
            return Ok(seed(states, &emissions));
        }
        let previous = previous.ok_or(Error::MissingPreviousSample)?;
        if states.is_empty() {
            return Ok(Vec::new());
        }

        let matrix = self
            .transitions
            .transitions((previous, predecessors), (sample, states.as_slice()));
        debug_assert_eq!(matrix.len(), predecessors.len());

        let linked = link(predecessors, &states, &emissions, matrix);
        if linked.iter().all(Option::is_none) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                candidates = states.len(),
                predecessors = predecessors.len(),
                "hmm_break: no transition from any predecessor, reseeding"
            );
            return Ok(seed(states, &emissions));
        }

        let mut out: Vec<Hypothesis<S, P>> = states
            .into_iter()
            .zip(linked)
            .filter_map(|(state, link)| {
                link.map(|link| Hypothesis {
                    state,
                    filtprob: link.filtprob,
                    seqprob: link.seqprob,
                    predecessor: Some(link.predecessor),
                    transition: Some(link.transition),
                })
            })
            .collect();
        normalize_filtprob(&mut out);
        Ok(out)
    }
}

/// Forward/Viterbi result for one candidate before normalization.
struct Link<P> {
    filtprob: f64,
    seqprob: f64,
    predecessor: usize,
    transition: P,
}

/// Combine predecessors and transition matrix into one `Link` per candidate,
/// `None` where the candidate is unreachable.
fn link<S, P>(
    predecessors: &[Hypothesis<S, P>],
    states: &[S],
    emissions: &[f64],
    matrix: Vec<Vec<Option<(P, f64)>>>,
) -> Vec<Option<Link<P>>> {
    let mut links: Vec<Option<Link<P>>> = (0..states.len()).map(|_| None).collect();
    let mut filtprobs = vec![0.0f64; states.len()];

    for (p_idx, (predecessor, row)) in predecessors.iter().zip(matrix).enumerate() {
        for (c_idx, entry) in row.into_iter().enumerate().take(states.len()) {
            let Some((transition, probability)) = entry else {
                continue;
            };
            if !probability.is_finite() || probability <= 0.0 {
                continue;
            }
            filtprobs[c_idx] += probability * predecessor.filtprob;
            let seqprob =
                predecessor.seqprob + probability.log10() + emissions[c_idx].log10();
            let better = match &links[c_idx] {
                None => true,
                Some(current) => seqprob > current.seqprob,
            };
            if better {
                links[c_idx] = Some(Link {
                    filtprob: 0.0,
                    seqprob,
                    predecessor: p_idx,
                    transition,
                });
            }
        }
    }

    links
        .into_iter()
        .zip(filtprobs)
        .zip(emissions)
        .map(|((link, forward), &emission)| {
            let filtprob = forward * emission;
            link.filter(|_| filtprob > 0.0).map(|mut link| {
                link.filtprob = filtprob;
                link
            })
        })
        .collect()
}

/// Emission-only hypotheses: first sample of a stream or after a break.
fn seed<S, P>(states: Vec<S>, emissions: &[f64]) -> Vec<Hypothesis<S, P>> {
    let mut out: Vec<Hypothesis<S, P>> = states
        .into_iter()
        .zip(emissions)
        .map(|(state, &emission)| Hypothesis::root(state, emission, emission.log10()))
        .collect();
    normalize_filtprob(&mut out);
    out
}

fn normalize_filtprob<S, P>(hypotheses: &mut [Hypothesis<S, P>]) {
    let mut probs: Vec<f64> = hypotheses.iter().map(|h| h.filtprob).collect();
    normalize(&mut probs);
    for (hyp, prob) in hypotheses.iter_mut().zip(probs) {
        hyp.filtprob = prob;
    }
}
