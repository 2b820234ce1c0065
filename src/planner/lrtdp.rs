//! Labeled real-time dynamic programming.
//!
//! Trials walk greedily from a state, backing up every visited state, and
//! [`check_solved`] labels the states whose greedy envelope is
//! epsilon-consistent. A state is solved once it and everything its greedy
//! policy can reach are labeled.

use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use log::{info, trace};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use super::{is_solved, HeuristicPlanner, OptimalPlanner, Planner, SolvedSet};
use crate::bellman;
use crate::config::SolverConfig;
use crate::deadline::{self, Ticker};
use crate::error::Result;
use crate::prob_dist::{ProbDist, VecDist};
use crate::ssp::Ssp;
use crate::value_table::ValueTable;

/// How [`Lrtdp::decide_action`](Planner::decide_action) plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LrtdpMode {
    /// Solve the state before acting.
    #[default]
    Optimal,
    /// Run a single trial before acting greedily.
    Replanner,
    /// Act greedily; only training plans.
    Greedy,
}

/// Checks whether the greedy envelope of `s` is epsilon-consistent.
///
/// Explores, without recursion, the unsolved states reachable from `s`
/// through greedy actions. If every residual is at most `epsilon` all of them
/// are labeled solved; otherwise every explored state is backed up and the
/// check fails. States without a greedy action are labeled at once.
///
/// # Errors
///
/// Returns [`SolverError::DeadlineReached`](crate::error::SolverError) if the
/// armed deadline expires mid-check. Labels are only added on success.
pub fn check_solved<P>(
    ssp: &P,
    table: &ValueTable<P::State>,
    solved: &SolvedSet<P::State>,
    s: &P::State,
    epsilon: f64,
) -> Result<bool>
where
    P: Ssp + ?Sized,
{
    let mut ticker = Ticker::default();
    let mut consistent = true;
    let mut open = VecDeque::new();
    let mut closed = Vec::new();
    let mut seen = HashSet::new();
    let mut dist = VecDist::new();

    if !is_solved(ssp, solved, s) {
        seen.insert(s.clone());
        open.push_back(s.clone());
    }
    while let Some(cur) = open.pop_front() {
        ticker.tick()?;
        // `get` stores the node, so every label has a table entry.
        let v = table.get(&cur);
        let (a, q) = bellman::greedy_action_and_min_q(ssp, table, &cur);
        let residual = (v - q).abs();
        match a {
            None => {
                if residual > epsilon {
                    consistent = false;
                    table.update(&cur, q);
                }
                solved.insert(cur.clone());
            }
            Some(a) => {
                if residual > epsilon {
                    consistent = false;
                } else {
                    ssp.expand(&a, &cur, &mut dist);
                    for (succ, _) in dist.iter() {
                        if !is_solved(ssp, solved, succ) && seen.insert(succ.clone()) {
                            open.push_front(succ.clone());
                        }
                    }
                }
            }
        }
        closed.push(cur);
    }

    trace!(
        "check_solved({:?}): {} nodes, consistent: {}",
        s,
        closed.len(),
        consistent
    );
    if consistent {
        for t in closed {
            solved.insert(t);
        }
    } else {
        for t in &closed {
            bellman::update(ssp, table, t);
        }
    }
    Ok(consistent)
}

/// LRTDP planner.
pub struct Lrtdp<P: Ssp> {
    ssp: P,
    table: Rc<ValueTable<P::State>>,
    solved: SolvedSet<P::State>,
    epsilon: f64,
    max_trace_len: usize,
    mode: LrtdpMode,
    rng: ChaCha20Rng,
    ticker: Ticker,
    trials: usize,
}

impl<P: Ssp> Lrtdp<P> {
    pub fn new(ssp: P, table: Rc<ValueTable<P::State>>, config: &SolverConfig) -> Self {
        Self {
            ssp,
            table,
            solved: SolvedSet::new(),
            epsilon: config.epsilon,
            max_trace_len: config.max_trace_len,
            mode: LrtdpMode::default(),
            rng: ChaCha20Rng::seed_from_u64(config.seed),
            ticker: Ticker::default(),
            trials: 0,
        }
    }

    pub fn with_mode(mut self, mode: LrtdpMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn ssp(&self) -> &P {
        &self.ssp
    }

    pub fn table(&self) -> &Rc<ValueTable<P::State>> {
        &self.table
    }

    pub fn solved(&self) -> &SolvedSet<P::State> {
        &self.solved
    }

    pub fn mode(&self) -> LrtdpMode {
        self.mode
    }

    /// Trials run so far.
    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn is_solved(&self, s: &P::State) -> bool {
        is_solved(&self.ssp, &self.solved, s)
    }

    /// Runs trials from `s` until it is solved.
    pub fn solve(&mut self, s: &P::State) -> Result<()> {
        while !self.is_solved(s) {
            self.trial(s)?;
        }
        Ok(())
    }

    /// One greedy walk from `s` followed by labeling of the visited states,
    /// last visited first.
    pub fn trial(&mut self, s: &P::State) -> Result<()> {
        self.trials += 1;
        let dead_end = self.table.dead_end_value();
        let mut visited: Vec<P::State> = Vec::new();
        let mut dist = VecDist::new();
        let mut cur = s.clone();

        loop {
            self.ticker.tick()?;
            if self.ssp.is_goal(&cur) {
                break;
            }
            if self.table.get(&cur) >= dead_end {
                self.solved.insert(cur);
                break;
            }
            if self.solved.contains(&cur) {
                break;
            }
            if visited.len() > self.max_trace_len {
                trace!("trial from {:?} hit the trace cap", s);
                break;
            }
            visited.push(cur.clone());
            let a = match bellman::update(&self.ssp, &self.table, &cur).0 {
                Some(a) => a,
                None => {
                    self.solved.insert(cur);
                    break;
                }
            };
            self.ssp.expand(&a, &cur, &mut dist);
            let nc = dist.normalizing_constant();
            match dist.sample(&mut self.rng, nc) {
                Some(next) => cur = next.clone(),
                None => break,
            }
        }

        trace!("trial from {:?} visited {} states", s, visited.len());
        while let Some(v) = visited.pop() {
            if !check_solved(&self.ssp, &self.table, &self.solved, &v, self.epsilon)? {
                break;
            }
        }
        Ok(())
    }

    fn solved_greedy_action(&self, s: &P::State) -> Result<Option<P::Action>> {
        bellman::const_greedy_action(&self.ssp, &self.table, s, |t| self.is_solved(t))
    }
}

impl<P: Ssp> Planner for Lrtdp<P> {
    type State = P::State;
    type Action = P::Action;

    fn decide_action(&mut self, s: &P::State) -> Result<Option<P::Action>> {
        match self.mode {
            LrtdpMode::Optimal => {
                self.solve(s)?;
                self.solved_greedy_action(s)
            }
            LrtdpMode::Replanner => {
                if !self.is_solved(s) {
                    self.trial(s)?;
                }
                Ok(bellman::greedy_action(&self.ssp, &self.table, s))
            }
            LrtdpMode::Greedy => Ok(bellman::greedy_action(&self.ssp, &self.table, s)),
        }
    }

    fn evaluate_action(&self, s: &P::State) -> Result<Option<P::Action>> {
        bellman::const_greedy_action(&self.ssp, &self.table, s, |_| true)
    }

    fn train_for(&mut self, budget: Duration) -> Result<bool> {
        let s0 = self.ssp.s0();
        let done = deadline::run_for(budget, || self.solve(&s0))?;
        info!(
            "lrtdp trained on {}: {} trials, {} solved states, V(s0) = {}",
            self.ssp.name(),
            self.trials,
            self.solved.len(),
            self.table.value(&s0)
        );
        Ok(done)
    }
}

impl<P: Ssp> HeuristicPlanner for Lrtdp<P> {
    fn value(&self, s: &P::State) -> f64 {
        self.table.value(s)
    }
}

impl<P: Ssp> OptimalPlanner for Lrtdp<P> {
    fn optimal_solution(&mut self) -> Result<f64> {
        let s0 = self.ssp.s0();
        self.solve(&s0)?;
        if self.ssp.is_goal(&s0) {
            Ok(self.ssp.terminal_cost(&s0))
        } else {
            Ok(self.table.get(&s0))
        }
    }
}
