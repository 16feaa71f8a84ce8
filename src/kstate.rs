//! Bounded-memory lattice of hypothesis sets ("k-state").
//!
//! The lattice keeps one [`Step`] per processed sample. Hypotheses point back
//! to their most likely predecessor by index, and every step stores how many
//! successors reference each of its hypotheses. When a new step arrives:
//!
//! 1. the predecessors it names gain a reference,
//! 2. hypotheses of the previous step that nobody references are deleted,
//!    which may cascade further back in time,
//! 3. the oldest steps are evicted while the configured bounds (`k` steps,
//!    `t` time units) are exceeded; the new oldest step becomes a set of roots.
//!
//! What remains is exactly the set of hypotheses that may still lie on a
//! future most likely sequence, so [`KState::sequence`] is a plain walk along
//! predecessor indices.
//!
//! ```
//! use kstate_match::{Hypothesis, KState};
//!
//! let mut lattice: KState<char, (), u64> = KState::new();
//! lattice
//!     .update(vec![Hypothesis::root('a', 0.6, -0.2), Hypothesis::root('b', 0.4, -0.4)], 0)
//!     .unwrap();
//! lattice
//!     .update(vec![Hypothesis::linked('c', 1.0, -0.5, 1, None)], 1)
//!     .unwrap();
//! let states: String = lattice.sequence().iter().map(|h| h.state).collect();
//! assert_eq!(states, "bc");
//! assert_eq!(lattice.count(), 2);
//! ```

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::hypothesis::{argmax_by, Hypothesis};
use crate::step::Step;
use crate::traits::Sample;

/// Deletion marks of one step during a pruning cascade.
struct Doomed {
    flags: Vec<bool>,
    alive: usize,
}

/// Hypothesis history with reference-counted pruning and optional retention
/// bounds.
#[derive(Debug, Clone)]
pub struct KState<S, P, X> {
    steps: VecDeque<Step<S, P, X>>,
    max_steps: Option<usize>,
    max_age: Option<u64>,
}

impl<S, P, X> Default for KState<S, P, X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, P, X> KState<S, P, X> {
    /// Unbounded lattice: history is only ever reduced by pruning.
    pub fn new() -> Self {
        Self::bounded(None, None)
    }

    /// Lattice retaining at most `k + 1` steps and/or steps at most `t` time
    /// units older than the newest sample.
    pub fn bounded(k: Option<usize>, t: Option<u64>) -> Self {
        Self {
            steps: VecDeque::new(),
            max_steps: k,
            max_age: t,
        }
    }

    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    pub fn max_age(&self) -> Option<u64> {
        self.max_age
    }

    /// Number of retained steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of retained hypotheses over all steps.
    pub fn count(&self) -> usize {
        self.steps.iter().map(Step::len).sum()
    }

    /// Retained steps, oldest first.
    pub fn steps(&self) -> impl Iterator<Item = &Step<S, P, X>> + '_ {
        self.steps.iter()
    }

    /// Retained samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &X> + '_ {
        self.steps.iter().map(Step::sample)
    }

    /// Hypothesis set of the newest step; empty before the first update.
    ///
    /// Pass this as `predecessors` to the next
    /// [`Filter::execute`](crate::filter::Filter::execute).
    pub fn vector(&self) -> &[Hypothesis<S, P>] {
        self.steps.back().map_or(&[], |step| step.hypotheses())
    }

    /// Newest sample, if any.
    pub fn sample(&self) -> Option<&X> {
        self.steps.back().map(Step::sample)
    }

    /// Hypothesis of the newest step with the highest filter probability.
    pub fn estimate(&self) -> Option<&Hypothesis<S, P>> {
        let vector = self.vector();
        argmax_by(vector, |h| h.filtprob).map(|idx| &vector[idx])
    }

    /// Most likely sequence, one hypothesis per retained step, oldest first.
    ///
    /// Starts at the best-sequence hypothesis of the newest step and follows
    /// predecessors. Where a chain starts (after a break), the walk continues
    /// from the best-sequence hypothesis recorded for the earlier step.
    pub fn sequence(&self) -> Vec<&Hypothesis<S, P>> {
        self.sequence_with_samples()
            .into_iter()
            .map(|(_, hyp)| hyp)
            .collect()
    }

    /// Like [`sequence`](Self::sequence), paired with each step's sample.
    pub fn sequence_with_samples(&self) -> Vec<(&X, &Hypothesis<S, P>)> {
        let mut out = Vec::with_capacity(self.steps.len());
        let mut cursor: Option<usize> = None;
        for step in self.steps.iter().rev() {
            let hyp = match cursor {
                Some(idx) => &step.hypotheses[idx],
                None => step.best(),
            };
            out.push((step.sample(), hyp));
            cursor = hyp.predecessor;
        }
        out.reverse();
        out
    }
}

impl<S, P, X: Sample> KState<S, P, X> {
    /// Append the hypothesis set of `sample`.
    ///
    /// Predecessor indices of `vector` refer to [`vector()`](Self::vector) as
    /// it was before this call. An empty `vector` is ignored. Updates must be
    /// time ordered; a rejected update leaves the lattice unchanged.
    pub fn update(&mut self, vector: Vec<Hypothesis<S, P>>, sample: X) -> Result<()> {
        #[cfg(feature = "tracing")]
        let span = tracing::trace_span!("kstate_update", hypotheses = vector.len());
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        if vector.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::trace!("empty hypothesis set ignored");
            return Ok(());
        }

        let previous_len = match self.steps.back() {
            Some(last) => {
                let (last_time, given) = (last.sample().time(), sample.time());
                if given < last_time {
                    return Err(Error::OutOfOrder {
                        last: last_time,
                        given,
                    });
                }
                last.len()
            }
            None => 0,
        };
        for (index, hyp) in vector.iter().enumerate() {
            if let Some(predecessor) = hyp.predecessor {
                if predecessor >= previous_len {
                    return Err(Error::InconsistentPredecessor { index, predecessor });
                }
            }
        }

        if let Some(last) = self.steps.back_mut() {
            for predecessor in vector.iter().filter_map(|h| h.predecessor) {
                last.counts[predecessor] += 1;
            }
        }
        self.steps.push_back(Step::new(vector, sample));

        if self.steps.len() > 1 {
            let previous = self.steps.len() - 2;
            let step = &self.steps[previous];
            let orphans: Vec<usize> = (0..step.len()).filter(|&i| step.counts[i] == 0).collect();
            let doomed = if orphans.len() == step.len() {
                let best = step.best;
                orphans.into_iter().filter(|&i| i != best).collect()
            } else {
                orphans
            };
            let _pruned = self.prune(previous, doomed);
            #[cfg(feature = "tracing")]
            tracing::trace!(pruned = _pruned, "pruned unreachable hypotheses");
        }

        let _evicted = self.enforce_bounds();
        #[cfg(feature = "tracing")]
        if _evicted > 0 {
            tracing::trace!(evicted = _evicted, "evicted steps beyond retention bound");
        }
        Ok(())
    }

    /// Delete `doomed` hypotheses of step `from` and everything that becomes
    /// unreferenced as a consequence. The last survivor of a step is never
    /// deleted. Returns the number of deleted hypotheses.
    fn prune(&mut self, from: usize, doomed: Vec<usize>) -> usize {
        if doomed.is_empty() {
            return 0;
        }

        // Only the steps the cascade reaches are tracked.
        let mut touched: FxHashMap<usize, Doomed> = FxHashMap::default();
        let mut work: Vec<(usize, usize)> = doomed.into_iter().map(|idx| (from, idx)).collect();
        let mut removed = 0usize;

        while let Some((j, idx)) = work.pop() {
            let len = self.steps[j].len();
            let entry = touched.entry(j).or_insert_with(|| Doomed {
                flags: vec![false; len],
                alive: len,
            });
            if entry.flags[idx] || entry.alive <= 1 {
                continue;
            }
            entry.flags[idx] = true;
            entry.alive -= 1;
            removed += 1;

            if j == 0 {
                continue;
            }
            if let Some(p) = self.steps[j].hypotheses[idx].predecessor {
                let count = &mut self.steps[j - 1].counts[p];
                *count -= 1;
                if *count == 0 {
                    work.push((j - 1, p));
                }
            }
        }

        let mut touched: Vec<(usize, Doomed)> = touched.into_iter().collect();
        touched.sort_unstable_by_key(|(j, _)| *j);
        for (j, doomed) in touched {
            if doomed.alive == self.steps[j].len() {
                continue;
            }
            let remap = self.steps[j].compact(&doomed.flags);
            self.steps[j + 1].relink(&remap);
        }
        removed
    }

    fn over_bounds(&self) -> bool {
        let (Some(front), Some(back)) = (self.steps.front(), self.steps.back()) else {
            return false;
        };
        let too_many = self.max_steps.is_some_and(|k| self.steps.len() > k + 1);
        let too_old = self.max_age.is_some_and(|t| {
            back.sample().time().saturating_sub(front.sample().time()) > t
        });
        too_many || too_old
    }

    fn enforce_bounds(&mut self) -> usize {
        let mut evicted = 0;
        while self.steps.len() > 1 && self.over_bounds() {
            self.steps.pop_front();
            if let Some(front) = self.steps.front_mut() {
                front.sever();
            }
            evicted += 1;
        }
        evicted
    }

    /// Audit every structural invariant of the lattice.
    ///
    /// Checks that reference counts match the retained successors, that
    /// predecessors stay within the previous step, that interior steps hold no
    /// unreferenced hypothesis other than their best-sequence one, and that
    /// retention bounds and time order hold.
    pub fn check_invariants(&self) -> Result<()> {
        let corrupted = |msg: String| Err(Error::Corrupted(msg));
        let last = self.steps.len().saturating_sub(1);

        for (j, step) in self.steps.iter().enumerate() {
            if step.is_empty() {
                return corrupted(format!("step {j} is empty"));
            }
            if step.counts.len() != step.len() || step.best >= step.len() {
                return corrupted(format!("step {j} bookkeeping out of sync"));
            }

            let mut expected = vec![0usize; step.len()];
            if let Some(next) = self.steps.get(j + 1) {
                for hyp in next.hypotheses() {
                    match hyp.predecessor {
                        Some(p) if p < step.len() => expected[p] += 1,
                        Some(p) => {
                            return corrupted(format!(
                                "step {} names predecessor {p} beyond step {j}",
                                j + 1
                            ))
                        }
                        None => {}
                    }
                }
            }
            if expected != step.counts {
                return corrupted(format!(
                    "step {j} reference counts {:?}, expected {expected:?}",
                    step.counts
                ));
            }

            if j == 0 && step.hypotheses().iter().any(|h| !h.is_root()) {
                return corrupted("oldest step has predecessors".to_string());
            }
            if j < last {
                let stray = (0..step.len()).find(|&i| step.counts[i] == 0 && i != step.best);
                if let Some(i) = stray {
                    return corrupted(format!("step {j} retains unreferenced hypothesis {i}"));
                }
            }
            if j > 0 && step.sample().time() < self.steps[j - 1].sample().time() {
                return corrupted(format!("step {j} is out of time order"));
            }
        }

        if let Some(k) = self.max_steps {
            if self.steps.len() > k + 1 {
                return corrupted(format!("{} steps retained, bound is {}", self.steps.len(), k + 1));
            }
        }
        if let (Some(t), Some(front), Some(back)) =
            (self.max_age, self.steps.front(), self.steps.back())
        {
            let span = back.sample().time().saturating_sub(front.sample().time());
            if span > t && self.steps.len() > 1 {
                return corrupted(format!("retained span {span} exceeds {t}"));
            }
        }
        Ok(())
    }
}
