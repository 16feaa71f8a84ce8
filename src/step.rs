//! Time-step records retained by the lattice.
//!
//! Each `Step` owns the hypothesis set of one sample together with the
//! reference count of every hypothesis (how many hypotheses of the next step
//! name it as predecessor) and the index of its best-sequence hypothesis.

use crate::hypothesis::{argmax_by, Hypothesis};

#[derive(Debug, Clone)]
pub struct Step<S, P, X> {
    pub(crate) hypotheses: Vec<Hypothesis<S, P>>,
    pub(crate) counts: Vec<usize>,
    pub(crate) sample: X,
    pub(crate) best: usize,
}

impl<S, P, X> Step<S, P, X> {
    /// New step with zeroed reference counts.
    ///
    /// `hypotheses` must be non-empty.
    pub(crate) fn new(hypotheses: Vec<Hypothesis<S, P>>, sample: X) -> Self {
        let best = argmax_by(&hypotheses, |h| h.seqprob).unwrap_or(0);
        let counts = vec![0; hypotheses.len()];
        Self {
            hypotheses,
            counts,
            sample,
            best,
        }
    }

    #[inline]
    pub fn hypotheses(&self) -> &[Hypothesis<S, P>] {
        &self.hypotheses
    }

    #[inline]
    pub fn sample(&self) -> &X {
        &self.sample
    }

    /// Hypothesis with the highest sequence probability of this step.
    #[inline]
    pub fn best(&self) -> &Hypothesis<S, P> {
        &self.hypotheses[self.best]
    }

    /// Number of successors naming hypothesis `idx` as predecessor.
    #[inline]
    pub fn references(&self, idx: usize) -> usize {
        self.counts[idx]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    /// Drop every hypothesis flagged in `dead` and return the old-to-new
    /// index map. The best index follows its hypothesis; if that one was
    /// dropped the best is recomputed among the survivors.
    pub(crate) fn compact(&mut self, dead: &[bool]) -> Vec<Option<usize>> {
        debug_assert_eq!(dead.len(), self.hypotheses.len());
        let mut remap = Vec::with_capacity(dead.len());
        let mut next = 0usize;
        for &gone in dead {
            if gone {
                remap.push(None);
            } else {
                remap.push(Some(next));
                next += 1;
            }
        }

        let hypotheses = std::mem::take(&mut self.hypotheses);
        let counts = std::mem::take(&mut self.counts);
        for ((hyp, count), &gone) in hypotheses.into_iter().zip(counts).zip(dead) {
            if !gone {
                self.hypotheses.push(hyp);
                self.counts.push(count);
            }
        }

        self.best = match remap[self.best] {
            Some(idx) => idx,
            None => argmax_by(&self.hypotheses, |h| h.seqprob).unwrap_or(0),
        };
        remap
    }

    /// Rewrite predecessor indices after the previous step was compacted.
    pub(crate) fn relink(&mut self, remap: &[Option<usize>]) {
        for hyp in &mut self.hypotheses {
            hyp.predecessor = hyp.predecessor.and_then(|p| remap[p]);
        }
    }

    /// Turn every hypothesis into a chain root.
    pub(crate) fn sever(&mut self) {
        for hyp in &mut self.hypotheses {
            hyp.predecessor = None;
        }
    }
}
