//! Explicit SSP given by transition tables.
//!
//! States are `0..num_states`. Actions are global indices into the action
//! table, each belonging to exactly one state.

use crate::error::{Result, SolverError};
use crate::prob_dist::ProbDist;
use crate::ssp::Ssp;
use approx::relative_eq;
use rand::seq::{index, SliceRandom};
use rand::{Rng, RngCore};

#[derive(Debug, Clone, PartialEq)]
struct TabularAction {
    state: usize,
    cost: f64,
    outcomes: Vec<(usize, f64)>,
}

/// An SSP stored as explicit tables.
#[derive(Debug, Clone)]
pub struct TabularSsp {
    name: String,
    s0: usize,
    goals: Vec<bool>,
    terminal_costs: Vec<f64>,
    actions: Vec<TabularAction>,
    by_state: Vec<Vec<usize>>,
}

/// Builder for [`TabularSsp`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct TabularSspBuilder {
    name: String,
    num_states: usize,
    s0: usize,
    goals: Vec<usize>,
    terminal_costs: Vec<(usize, f64)>,
    actions: Vec<TabularAction>,
}

impl TabularSspBuilder {
    pub fn new(num_states: usize) -> Self {
        Self {
            name: "tabular".to_string(),
            num_states,
            s0: 0,
            goals: Vec::new(),
            terminal_costs: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn s0(mut self, s0: usize) -> Self {
        self.s0 = s0;
        self
    }

    pub fn goal(mut self, s: usize) -> Self {
        self.goals.push(s);
        self
    }

    /// Terminal cost of goal `s`. Goals default to zero.
    pub fn terminal_cost(mut self, s: usize, cost: f64) -> Self {
        self.terminal_costs.push((s, cost));
        self
    }

    /// Adds an action applicable in `state` with the given outcomes.
    pub fn action(mut self, state: usize, cost: f64, outcomes: &[(usize, f64)]) -> Self {
        self.actions.push(TabularAction {
            state,
            cost,
            outcomes: outcomes.to_vec(),
        });
        self
    }

    /// Validates the tables and builds the SSP.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidModel`] when an index is out of range,
    /// a cost is not strictly positive, a terminal cost is negative, or the
    /// outcome probabilities of an action do not sum to one.
    pub fn build(self) -> Result<TabularSsp> {
        let n = self.num_states;
        let in_range = |s: usize, what: &str| {
            if s < n {
                Ok(())
            } else {
                Err(SolverError::invalid_model(format!(
                    "{} {} out of range (num_states = {})",
                    what, s, n
                )))
            }
        };

        in_range(self.s0, "initial state")?;
        let mut goals = vec![false; n];
        for &g in &self.goals {
            in_range(g, "goal")?;
            goals[g] = true;
        }
        let mut terminal_costs = vec![0.0; n];
        for &(s, c) in &self.terminal_costs {
            in_range(s, "terminal cost state")?;
            if !(c >= 0.0 && c.is_finite()) {
                return Err(SolverError::invalid_model(format!(
                    "terminal cost of {} must be non-negative, got {}",
                    s, c
                )));
            }
            terminal_costs[s] = c;
        }

        let mut by_state = vec![Vec::new(); n];
        for (id, a) in self.actions.iter().enumerate() {
            in_range(a.state, "action state")?;
            if !(a.cost > 0.0 && a.cost.is_finite()) {
                return Err(SolverError::invalid_model(format!(
                    "action {} has non-positive cost {}",
                    id, a.cost
                )));
            }
            let mut total = 0.0;
            for &(succ, p) in &a.outcomes {
                in_range(succ, "successor")?;
                if !(0.0..=1.0).contains(&p) {
                    return Err(SolverError::invalid_model(format!(
                        "action {} has probability {} outside [0, 1]",
                        id, p
                    )));
                }
                total += p;
            }
            if !relative_eq!(total, 1.0, epsilon = 1e-9, max_relative = 1e-9) {
                return Err(SolverError::invalid_model(format!(
                    "outcomes of action {} sum to {}",
                    id, total
                )));
            }
            by_state[a.state].push(id);
        }

        Ok(TabularSsp {
            name: self.name,
            s0: self.s0,
            goals,
            terminal_costs,
            actions: self.actions,
            by_state,
        })
    }
}

impl TabularSsp {
    pub fn num_states(&self) -> usize {
        self.goals.len()
    }

    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    /// Shuffles the applicable-action order of every state.
    pub fn shuffle_actions(&mut self, rng: &mut dyn RngCore) {
        for acts in &mut self.by_state {
            acts.shuffle(rng);
        }
    }

    /// Generates a random SSP whose last state is the only goal.
    ///
    /// Every non-goal state gets between 1 and `max_actions` actions, each with
    /// between 1 and `max_outcomes` distinct successors, and costs in `[1, 2)`.
    /// States may be dead ends (no path to the goal), never action-less.
    ///
    /// # Panics
    ///
    /// Panics if `num_states < 2` or a maximum is zero.
    pub fn random(
        num_states: usize,
        max_actions: usize,
        max_outcomes: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        assert!(num_states >= 2, "need at least a start and a goal");
        assert!(max_actions > 0 && max_outcomes > 0);

        let goal = num_states - 1;
        let mut builder = TabularSspBuilder::new(num_states).name("random").goal(goal);
        for s in 0..goal {
            for _ in 0..rng.gen_range(1..=max_actions) {
                let k = rng.gen_range(1..=max_outcomes.min(num_states));
                let succs = index::sample(rng, num_states, k);
                let weights: Vec<f64> = (0..k).map(|_| rng.gen_range(0.05..1.0)).collect();
                let total: f64 = weights.iter().sum();
                let mut outcomes: Vec<(usize, f64)> = succs
                    .iter()
                    .zip(&weights)
                    .map(|(succ, w)| (succ, w / total))
                    .collect();
                // Absorb rounding into the last outcome.
                let head: f64 = outcomes[..k - 1].iter().map(|(_, p)| p).sum();
                outcomes[k - 1].1 = (1.0 - head).max(0.0);
                let cost = rng.gen_range(1.0..2.0);
                builder = builder.action(s, cost, &outcomes);
            }
        }
        builder.build()
    }
}

impl Ssp for TabularSsp {
    type State = usize;
    type Action = usize;

    fn name(&self) -> &str {
        &self.name
    }

    fn s0(&self) -> usize {
        self.s0
    }

    fn is_goal(&self, s: &usize) -> bool {
        self.goals[*s]
    }

    fn has_applicable_actions(&self, s: &usize) -> bool {
        !self.by_state[*s].is_empty()
    }

    fn is_applicable(&self, s: &usize, a: &usize) -> bool {
        self.actions.get(*a).is_some_and(|act| act.state == *s)
    }

    fn applicable_actions<'a>(&'a self, s: &'a usize) -> Box<dyn Iterator<Item = usize> + 'a> {
        Box::new(self.by_state[*s].iter().copied())
    }

    fn expand(&self, a: &usize, s: &usize, out: &mut dyn ProbDist<usize>) {
        let act = &self.actions[*a];
        assert_eq!(act.state, *s, "action {} is not applicable in state {}", a, s);
        out.clear();
        for &(succ, p) in &act.outcomes {
            out.insert(succ, p);
        }
    }

    fn cost(&self, _s: &usize, a: &usize) -> f64 {
        self.actions[*a].cost
    }

    fn terminal_cost(&self, s: &usize) -> f64 {
        self.terminal_costs[*s]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prob_dist::VecDist;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_rejects_bad_probabilities() {
        let err = TabularSspBuilder::new(2)
            .goal(1)
            .action(0, 1.0, &[(1, 0.6), (0, 0.6)])
            .build()
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidModel(_)));
    }

    #[test]
    fn test_rejects_non_positive_cost() {
        let err = TabularSspBuilder::new(2)
            .goal(1)
            .action(0, 0.0, &[(1, 1.0)])
            .build()
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidModel(_)));
    }

    #[test]
    fn test_rejects_out_of_range_successor() {
        assert!(TabularSspBuilder::new(2)
            .action(0, 1.0, &[(5, 1.0)])
            .build()
            .is_err());
    }

    #[test]
    fn test_expand_fills_distribution() {
        let ssp = TabularSspBuilder::new(3)
            .goal(2)
            .action(0, 1.0, &[(1, 0.9), (2, 0.1)])
            .build()
            .unwrap();
        let mut d = VecDist::new();
        d.insert(0, 1.0);
        ssp.expand(&0, &0, &mut d);
        let got: Vec<(usize, f64)> = d.iter().map(|(s, p)| (*s, p)).collect();
        assert_eq!(got, vec![(1, 0.9), (2, 0.1)]);
    }

    #[test]
    fn test_shuffle_keeps_action_sets() {
        let mut ssp = TabularSspBuilder::new(2)
            .goal(1)
            .action(0, 1.0, &[(1, 1.0)])
            .action(0, 2.0, &[(1, 1.0)])
            .action(0, 3.0, &[(1, 1.0)])
            .action(0, 4.0, &[(1, 1.0)])
            .build()
            .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        ssp.shuffle_actions(&mut rng);
        let mut acts: Vec<usize> = ssp.applicable_actions(&0).collect();
        acts.sort();
        assert_eq!(acts, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_random_models_are_valid() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        for _ in 0..20 {
            let ssp = TabularSsp::random(8, 3, 3, &mut rng).unwrap();
            assert_eq!(ssp.num_states(), 8);
            assert!(ssp.is_goal(&7));
            for s in 0..7 {
                assert!(ssp.has_applicable_actions(&s));
            }
        }
    }
}
