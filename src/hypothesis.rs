//! State hypotheses produced by the filter and retained by the lattice.

/// One state estimate at one time step.
///
/// `predecessor` is an index into the hypothesis set of the immediately
/// preceding time step: the `predecessors` slice handed to
/// [`Filter::execute`](crate::filter::Filter::execute), which is exactly
/// [`KState::vector`](crate::kstate::KState::vector) of the lattice.
#[derive(Clone, Debug, PartialEq)]
pub struct Hypothesis<S, P> {
    /// Caller supplied position (or any other state payload).
    pub state: S,
    /// Filter probability, normalized across the hypotheses of one step.
    pub filtprob: f64,
    /// log10 probability of the best sequence ending in this hypothesis.
    pub seqprob: f64,
    /// Index of the most likely predecessor in the previous step.
    pub predecessor: Option<usize>,
    /// How this hypothesis was reached from its predecessor (e.g. a route).
    pub transition: Option<P>,
}

impl<S, P> Hypothesis<S, P> {
    /// A chain root: no predecessor and no transition.
    pub fn root(state: S, filtprob: f64, seqprob: f64) -> Self {
        Self {
            state,
            filtprob,
            seqprob,
            predecessor: None,
            transition: None,
        }
    }

    /// A hypothesis reached from `predecessor` of the previous step.
    pub fn linked(
        state: S,
        filtprob: f64,
        seqprob: f64,
        predecessor: usize,
        transition: Option<P>,
    ) -> Self {
        Self {
            state,
            filtprob,
            seqprob,
            predecessor: Some(predecessor),
            transition,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.predecessor.is_none()
    }
}

/// Index of the first hypothesis with maximal `key`, or `None` for an empty set.
///
/// NaN keys never win against a finite key.
pub(crate) fn argmax_by<S, P>(
    hypotheses: &[Hypothesis<S, P>],
    key: impl Fn(&Hypothesis<S, P>) -> f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, hyp) in hypotheses.iter().enumerate() {
        let value = key(hyp);
        let better = match best {
            None => true,
            Some((_, current)) => value > current || (current.is_nan() && !value.is_nan()),
        };
        if better {
            best = Some((idx, value));
        }
    }
    best.map(|(idx, _)| idx)
}
