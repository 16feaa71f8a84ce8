use kstate_match::{Hypothesis, KState, KStateBuilder};
use proptest::prelude::*;

type Hyp = Hypothesis<u32, ()>;

/// One generated update: whether it starts a new chain, and per hypothesis a
/// predecessor selector plus a sequence probability.
type Update = (bool, Vec<(usize, f64)>);

fn updates() -> impl Strategy<Value = Vec<Update>> {
    prop::collection::vec(
        (
            prop::bool::weighted(0.1),
            prop::collection::vec((0usize..16, -20.0f64..0.0), 1..6),
        ),
        1..40,
    )
}

fn vector(step: usize, update: &Update, previous_len: usize) -> Vec<Hyp> {
    let (restart, entries) = update;
    let share = 1.0 / entries.len() as f64;
    entries
        .iter()
        .enumerate()
        .map(|(i, &(sel, seqprob))| {
            let state = (step * 100 + i) as u32;
            if *restart || previous_len == 0 {
                Hyp::root(state, share, seqprob)
            } else {
                Hyp::linked(state, share, seqprob, sel % previous_len, None)
            }
        })
        .collect()
}

fn first_argmax(vector: &[Hyp]) -> usize {
    let mut best = 0;
    for (i, h) in vector.iter().enumerate() {
        if h.seqprob > vector[best].seqprob {
            best = i;
        }
    }
    best
}

/// Most likely sequence over the complete, never pruned history.
fn reference_sequence(history: &[Vec<Hyp>]) -> Vec<u32> {
    let mut out = Vec::new();
    let mut cursor: Option<usize> = None;
    for vector in history.iter().rev() {
        let idx = cursor.unwrap_or_else(|| first_argmax(vector));
        out.push(vector[idx].state);
        cursor = vector[idx].predecessor;
    }
    out.reverse();
    out
}

#[test]
fn pruning_scenario_from_three_to_four_hypotheses() {
    let mut lattice: KState<u32, (), u64> = KState::new();
    lattice
        .update(
            vec![
                Hyp::root(0, 0.3, -0.5),
                Hyp::root(1, 0.2, -0.7),
                Hyp::root(2, 0.5, -0.3),
            ],
            0,
        )
        .unwrap();
    lattice
        .update(
            vec![
                Hyp::linked(10, 0.1, -2.0, 0, None),
                Hyp::linked(11, 0.2, -1.5, 2, None),
                Hyp::linked(12, 0.4, -1.0, 2, None),
                Hyp::linked(13, 0.3, -1.2, 0, None),
            ],
            1,
        )
        .unwrap();
    lattice.check_invariants().unwrap();

    assert_eq!(lattice.count(), 6);
    assert_eq!(lattice.estimate().unwrap().state, 12);
    let states: Vec<u32> = lattice.sequence().iter().map(|h| h.state).collect();
    assert_eq!(states, vec![2, 12]);

    let oldest: Vec<u32> = lattice
        .steps()
        .next()
        .unwrap()
        .hypotheses()
        .iter()
        .map(|h| h.state)
        .collect();
    assert_eq!(oldest, vec![0, 2]);
}

#[test]
fn builder_bounds_apply_on_update() {
    let mut lattice = KStateBuilder::new().with_max_steps(1).build::<u32, (), u64>();
    for t in 0..5u64 {
        let vector = if lattice.is_empty() {
            vec![Hyp::root(t as u32, 1.0, 0.0)]
        } else {
            vec![Hyp::linked(t as u32, 1.0, 0.0, 0, None)]
        };
        lattice.update(vector, t).unwrap();
    }
    assert_eq!(lattice.len(), 2);
    assert!(lattice.steps().next().unwrap().hypotheses()[0].is_root());
    lattice.check_invariants().unwrap();
}

proptest! {
    #[test]
    fn unbounded_lattice_preserves_most_likely_sequence(updates in updates()) {
        let mut lattice: KState<u32, (), u64> = KState::new();
        let mut history: Vec<Vec<Hyp>> = Vec::new();

        for (step, update) in updates.iter().enumerate() {
            let v = vector(step, update, lattice.vector().len());
            history.push(v.clone());
            lattice.update(v, step as u64).unwrap();

            prop_assert!(lattice.check_invariants().is_ok(), "{:?}", lattice.check_invariants());
            prop_assert_eq!(lattice.len(), step + 1);

            let newest: Vec<u32> = lattice.vector().iter().map(|h| h.state).collect();
            let expected: Vec<u32> = history[step].iter().map(|h| h.state).collect();
            prop_assert_eq!(newest, expected);

            let states: Vec<u32> = lattice.sequence().iter().map(|h| h.state).collect();
            prop_assert_eq!(states, reference_sequence(&history));
        }
    }

    #[test]
    fn empty_update_changes_nothing(updates in updates()) {
        let mut lattice: KState<u32, (), u64> = KState::new();
        for (step, update) in updates.iter().enumerate() {
            let v = vector(step, update, lattice.vector().len());
            lattice.update(v, step as u64).unwrap();
        }
        let before = (lattice.len(), lattice.count(), lattice.sample().copied());
        lattice.update(Vec::new(), 0).unwrap();
        prop_assert_eq!(before, (lattice.len(), lattice.count(), lattice.sample().copied()));
    }

    #[test]
    fn step_bound_holds(updates in updates(), k in 0usize..6) {
        let mut lattice: KState<u32, (), u64> = KState::bounded(Some(k), None);
        for (step, update) in updates.iter().enumerate() {
            let v = vector(step, update, lattice.vector().len());
            lattice.update(v, step as u64).unwrap();
            prop_assert!(lattice.check_invariants().is_ok());
            prop_assert_eq!(lattice.len(), (step + 1).min(k + 1));
            prop_assert_eq!(lattice.sample().copied(), Some(step as u64));
            prop_assert_eq!(lattice.sequence().len(), lattice.len());
        }
    }

    #[test]
    fn age_bound_holds(updates in updates(), gaps in prop::collection::vec(0u64..5, 40), t in 0u64..12) {
        let mut lattice: KState<u32, (), u64> = KState::bounded(None, Some(t));
        let mut time = 0u64;
        for (step, update) in updates.iter().enumerate() {
            time += gaps[step];
            let v = vector(step, update, lattice.vector().len());
            lattice.update(v, time).unwrap();
            prop_assert!(lattice.check_invariants().is_ok());

            let oldest = *lattice.samples().next().unwrap();
            prop_assert!(time - oldest <= t || lattice.len() == 1);
            prop_assert!(lattice.vector().iter().all(|h| h.state / 100 == step as u32));
        }
    }

    #[test]
    fn rejected_update_leaves_lattice_untouched(updates in updates(), bad in 0usize..16) {
        let mut lattice: KState<u32, (), u64> = KState::new();
        for (step, update) in updates.iter().enumerate() {
            let v = vector(step, update, lattice.vector().len());
            lattice.update(v, step as u64 + 10).unwrap();
        }
        let count = lattice.count();
        let len = lattice.vector().len();
        let foreign = vec![Hyp::linked(9_999, 1.0, 0.0, len + bad, None)];
        prop_assert!(lattice.update(foreign, 1_000).is_err());
        let late = vec![Hyp::root(9_998, 1.0, 0.0)];
        prop_assert!(lattice.update(late, 0).is_err());
        prop_assert_eq!(lattice.count(), count);
        prop_assert!(lattice.check_invariants().is_ok());
    }
}
