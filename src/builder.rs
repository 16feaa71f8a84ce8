use crate::KState;

/// Configures the retention bounds of a [`KState`].
///
/// ```
/// use kstate_match::KStateBuilder;
///
/// let lattice = KStateBuilder::new().with_max_steps(10).with_max_age(60_000).build::<u32, (), u64>();
/// assert_eq!(lattice.max_steps(), Some(10));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KStateBuilder {
    max_steps: Option<usize>,
    max_age: Option<u64>,
}

impl KStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain at most `k + 1` steps.
    pub fn with_max_steps(mut self, k: usize) -> Self {
        self.max_steps = Some(k);
        self
    }

    /// Retain only steps at most `t` time units older than the newest sample.
    pub fn with_max_age(mut self, t: u64) -> Self {
        self.max_age = Some(t);
        self
    }

    pub fn build<S, P, X>(self) -> KState<S, P, X> {
        KState::bounded(self.max_steps, self.max_age)
    }
}
