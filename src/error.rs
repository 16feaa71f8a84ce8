//! Error type shared by the filter and the lattice.
//!
//! Only contract violations are errors. A broken Markov chain is handled by
//! the filter itself and an unreachable routing target is a `None` entry.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Predecessors were supplied without the sample they were observed at.
    #[error("predecessor set given without its previous sample")]
    MissingPreviousSample,

    /// A sample is older than the newest retained sample.
    #[error("out-of-order update: sample time {given} precedes last retained time {last}")]
    OutOfOrder { last: u64, given: u64 },

    /// A hypothesis names a predecessor outside the newest retained step.
    #[error("inconsistent update: hypothesis {index} names predecessor {predecessor} outside the previous step")]
    InconsistentPredecessor { index: usize, predecessor: usize },

    /// An internal audit found the lattice in a state its invariants forbid.
    #[error("lattice invariant violated: {0}")]
    Corrupted(String),
}

pub type Result<T> = std::result::Result<T, Error>;
