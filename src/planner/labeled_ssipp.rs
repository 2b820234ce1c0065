//! SSiPP with solved labels.
//!
//! Labeled SSiPP runs SSiPP on a view of the base problem in which every
//! solved state is an extra goal priced at its current value. Visited states
//! are recorded during a round and, when it ends, labeled with
//! [`check_solved`] from the last visited backwards, stopping at the first
//! failure. Rounds from `s0` are repeated until `s0` is solved.
//!
//! By default a decision first solves the current state, so the returned
//! action is greedy over solved successors only. As a replanner it instead
//! forwards unsolved states to SSiPP and leaves labeling to the end of the
//! round.

use std::rc::Rc;
use std::time::Duration;

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::lrtdp::check_solved;
use super::simulator;
use super::ssipp::{EmbeddedKind, Ssipp};
use super::{is_solved, HeuristicPlanner, OptimalPlanner, Planner, SolvedSet};
use crate::bellman;
use crate::config::SolverConfig;
use crate::deadline;
use crate::error::Result;
use crate::short_sighted::S4pStrategy;
use crate::ssp::{Ssp, SspAdapter, SspAdapterBuilder};
use crate::value_table::ValueTable;

pub struct LabeledSsipp<P: Ssp + Clone + 'static> {
    base: P,
    table: Rc<ValueTable<P::State>>,
    solved: SolvedSet<P::State>,
    ssipp: Ssipp<SspAdapter<P>>,
    visited: Vec<P::State>,
    epsilon: f64,
    max_turns: usize,
    rng: ChaCha20Rng,
    rounds: usize,
    replanner: bool,
}

impl<P: Ssp + Clone + 'static> LabeledSsipp<P> {
    pub fn new(
        base: P,
        table: Rc<ValueTable<P::State>>,
        strategy: S4pStrategy,
        config: &SolverConfig,
    ) -> Self {
        let solved = SolvedSet::new();
        let labels = solved.clone();
        let values = Rc::clone(&table);
        let goals = base.clone();
        let labeled = SspAdapterBuilder::new(base.clone())
            .with_name(format!("{} with solved goals", base.name()))
            .with_extra_goals(move |s| labels.contains(s))
            .with_terminal_cost_override(move |s| {
                if goals.is_goal(s) {
                    None
                } else {
                    Some(values.peek(s))
                }
            })
            .build();
        let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
        let inner_config = config.clone().with_seed(rng.gen());
        Self {
            ssipp: Ssipp::new(labeled, Rc::clone(&table), strategy, &inner_config),
            base,
            table,
            solved,
            visited: Vec::new(),
            epsilon: config.epsilon,
            max_turns: config.max_turns_per_round,
            rng,
            rounds: 0,
            replanner: false,
        }
    }

    pub fn with_embedded(mut self, kind: EmbeddedKind) -> Self {
        self.ssipp = self.ssipp.with_embedded(kind);
        self
    }

    pub fn with_short_sighted_epsilon(mut self, epsilon: f64) -> Self {
        self.ssipp = self.ssipp.with_short_sighted_epsilon(epsilon);
        self
    }

    /// Acts as a replanner: unsolved states are forwarded to SSiPP instead of
    /// being solved before each decision.
    pub fn with_replanner(mut self, replanner: bool) -> Self {
        self.replanner = replanner;
        self
    }

    pub fn is_replanner(&self) -> bool {
        self.replanner
    }

    pub fn base(&self) -> &P {
        &self.base
    }

    pub fn table(&self) -> &Rc<ValueTable<P::State>> {
        &self.table
    }

    pub fn solved(&self) -> &SolvedSet<P::State> {
        &self.solved
    }

    pub fn is_solved(&self, s: &P::State) -> bool {
        is_solved(&self.base, &self.solved, s)
    }

    /// Rounds simulated so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Simulates rounds from `s0` until it is solved.
    pub fn solve(&mut self) -> Result<()> {
        let s0 = self.base.s0();
        self.solve_from(&s0)
    }

    /// Simulates rounds from `s` until it is solved.
    ///
    /// Rounds always run in replanner mode; the configured mode is restored
    /// afterwards, also on error.
    pub fn solve_from(&mut self, s: &P::State) -> Result<()> {
        let replanner = std::mem::replace(&mut self.replanner, true);
        let res = self.run_rounds(s);
        self.replanner = replanner;
        res
    }

    fn run_rounds(&mut self, s: &P::State) -> Result<()> {
        let base = self.base.clone();
        let max_turns = self.max_turns;
        let mut rng = ChaCha20Rng::seed_from_u64(self.rng.gen());
        while !self.is_solved(s) {
            deadline::check()?;
            let summary = simulator::simulate_round_from(&base, self, s, max_turns, &mut rng)?;
            self.rounds += 1;
            debug!(
                "labeled ssipp round {}: {:?} after {} turns, {} solved states",
                self.rounds,
                summary.status,
                summary.turns,
                self.solved.len()
            );
        }
        Ok(())
    }
}

impl<P: Ssp + Clone + 'static> Planner for LabeledSsipp<P> {
    type State = P::State;
    type Action = P::Action;

    fn decide_action(&mut self, s: &P::State) -> Result<Option<P::Action>> {
        if self.base.is_goal(s) {
            return Ok(None);
        }
        if self.replanner && !self.solved.contains(s) {
            self.visited.push(s.clone());
            return self.ssipp.decide_action(s);
        }
        if !self.solved.contains(s) {
            self.solve_from(s)?;
        }
        bellman::const_greedy_action(&self.base, &self.table, s, |t| self.is_solved(t))
    }

    fn evaluate_action(&self, s: &P::State) -> Result<Option<P::Action>> {
        bellman::const_greedy_action(&self.base, &self.table, s, |_| true)
    }

    fn train_for(&mut self, budget: Duration) -> Result<bool> {
        let done = deadline::run_for(budget, || self.solve())?;
        info!(
            "labeled ssipp trained on {}: {} rounds, {} solved states, root solved: {}",
            self.base.name(),
            self.rounds,
            self.solved.len(),
            done
        );
        Ok(done)
    }

    fn init_round(&mut self) {
        self.visited.clear();
        self.ssipp.init_round();
    }

    fn end_round(&mut self) -> Result<()> {
        while let Some(s) = self.visited.pop() {
            if !check_solved(self.ssipp.base(), &self.table, &self.solved, &s, self.epsilon)? {
                break;
            }
        }
        self.visited.clear();
        Ok(())
    }
}

impl<P: Ssp + Clone + 'static> HeuristicPlanner for LabeledSsipp<P> {
    fn value(&self, s: &P::State) -> f64 {
        self.table.value(s)
    }
}

impl<P: Ssp + Clone + 'static> OptimalPlanner for LabeledSsipp<P> {
    fn optimal_solution(&mut self) -> Result<f64> {
        self.solve()?;
        let s0 = self.base.s0();
        if self.base.is_goal(&s0) {
            Ok(self.base.terminal_cost(&s0))
        } else {
            Ok(self.table.get(&s0))
        }
    }
}
