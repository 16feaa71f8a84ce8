//! Online HMM map matching with bounded memory
//!
//! This crate provides the core of an online map matcher: each incoming
//! measurement is turned into a set of weighted hypotheses about the true
//! state (typically a position on a road network), linked to the hypotheses
//! of the previous measurement, and stored in a lattice that forgets whatever
//! can no longer be part of the most likely sequence.
//!
//! ## Core idea
//! 1. Implement [`CandidateSource`] and [`TransitionSource`] for your model
//!    (spatial candidate search, emission and transition probabilities).
//! 2. Feed each sample through [`Filter::execute`] with the previous
//!    hypothesis set.
//! 3. Store the result with [`KState::update`]; ask it for the current
//!    [`estimate`](KState::estimate) or the most likely
//!    [`sequence`](KState::sequence) at any time.
//!
//! Routing between candidates on a road graph is covered by the [`router`]
//! module: an exact multi-target Dijkstra and a precomputed next-hop table
//! behind the same [`Router`] trait.
//!
//! ## Quick start
//! ```
//! use kstate_match::{CandidateSource, Filter, Hypothesis, KState, TransitionSource};
//!
//! // Two hidden states, observations are the states themselves with some noise.
//! struct Noisy;
//! impl CandidateSource<u8, (), u64> for Noisy {
//!     fn candidates(&self, _: &[Hypothesis<u8, ()>], _: &u64) -> Vec<(u8, f64)> {
//!         vec![(0, 0.8), (1, 0.2)]
//!     }
//! }
//! struct Sticky;
//! impl TransitionSource<u8, (), u64> for Sticky {
//!     fn transition(&self, from: (&u64, &Hypothesis<u8, ()>), to: (&u64, &u8)) -> Option<((), f64)> {
//!         Some(((), if from.1.state == *to.1 { 0.9 } else { 0.1 }))
//!     }
//! }
//!
//! let filter = Filter::new(Noisy, Sticky);
//! let mut lattice: KState<u8, (), u64> = KState::bounded(Some(10), None);
//! for time in 0..5u64 {
//!     let vector = filter.execute(lattice.vector(), lattice.sample(), &time).unwrap();
//!     lattice.update(vector, time).unwrap();
//! }
//! assert_eq!(lattice.estimate().map(|h| h.state), Some(0));
//! assert_eq!(lattice.sequence().len(), 5);
//! ```

pub mod builder;
pub mod error;
pub mod filter;
pub mod hypothesis;
pub mod kstate;
pub mod router;
pub mod step;
pub mod traits;
pub mod utils;

pub use crate::builder::KStateBuilder;
pub use crate::error::{Error, Result};
pub use crate::filter::Filter;
pub use crate::hypothesis::Hypothesis;
pub use crate::kstate::KState;
pub use crate::router::{Route, RoutePoint, Router};
pub use crate::traits::{CandidateSource, Cost, Sample, TransitionSource};
