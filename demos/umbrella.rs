//! Umbrella world: infer rain from whether the director brings an umbrella.
//!
//! Run with `cargo run --example umbrella`.

use kstate_match::{
    CandidateSource, Filter, Hypothesis, KState, KStateBuilder, Sample, TransitionSource,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Weather {
    Rain,
    Sun,
}

#[derive(Clone, Copy, Debug)]
struct Day {
    number: u64,
    umbrella: bool,
}

impl Sample for Day {
    fn time(&self) -> u64 {
        self.number
    }
}

struct Umbrella;

impl CandidateSource<Weather, (), Day> for Umbrella {
    fn candidates(&self, _: &[Hypothesis<Weather, ()>], day: &Day) -> Vec<(Weather, f64)> {
        if day.umbrella {
            vec![(Weather::Rain, 0.9), (Weather::Sun, 0.2)]
        } else {
            vec![(Weather::Rain, 0.1), (Weather::Sun, 0.8)]
        }
    }
}

struct Persistence;

impl TransitionSource<Weather, (), Day> for Persistence {
    fn transition(
        &self,
        from: (&Day, &Hypothesis<Weather, ()>),
        to: (&Day, &Weather),
    ) -> Option<((), f64)> {
        Some(((), if from.1.state == *to.1 { 0.7 } else { 0.3 }))
    }
}

fn main() -> kstate_match::Result<()> {
    let filter = Filter::new(Umbrella, Persistence);
    let mut lattice: KState<Weather, (), Day> = KStateBuilder::new().with_max_steps(7).build();

    let observed = [true, true, false, true, true, false, false, true, true, true];
    for (number, &umbrella) in observed.iter().enumerate() {
        let day = Day {
            number: number as u64,
            umbrella,
        };
        let vector = filter.execute(lattice.vector(), lattice.sample(), &day)?;
        lattice.update(vector, day)?;
        if let Some(estimate) = lattice.estimate() {
            println!(
                "day {number}: umbrella={umbrella:<5} estimate={:?} ({:.3})",
                estimate.state, estimate.filtprob
            );
        }
    }

    let sequence: Vec<String> = lattice
        .sequence_with_samples()
        .iter()
        .map(|(day, h)| format!("{}:{:?}", day.number, h.state))
        .collect();
    println!(
        "most likely sequence of the last {} days: {}",
        sequence.len(),
        sequence.join(" ")
    );
    Ok(())
}
