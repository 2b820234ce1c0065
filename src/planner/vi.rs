//! Value iteration.
//!
//! Enumerates the states reachable from `s0` once and sweeps Bellman backups
//! over them in place until the largest residual of a sweep is at most
//! epsilon. Every reachable state is solved, not only those the optimal
//! policy visits.

use std::rc::Rc;
use std::time::Duration;

use log::{debug, info};

use super::{HeuristicPlanner, OptimalPlanner, Planner};
use crate::bellman;
use crate::config::SolverConfig;
use crate::deadline::{self, Ticker};
use crate::error::Result;
use crate::ssp::Ssp;
use crate::value_table::ValueTable;

/// Value iteration over the states reachable from `s0`.
///
/// Each sweep backs up every non-goal reachable state in a fixed order and
/// tracks the largest residual; iteration stops once that residual is at most
/// epsilon. The state enumeration is computed once and reused.
pub struct ValueIteration<P: Ssp> {
    ssp: P,
    table: Rc<ValueTable<P::State>>,
    epsilon: f64,
    states: Option<Vec<P::State>>,
    converged: bool,
    sweeps: usize,
}

impl<P: Ssp> ValueIteration<P> {
    pub fn new(ssp: P, table: Rc<ValueTable<P::State>>, config: &SolverConfig) -> Self {
        Self {
            ssp,
            table,
            epsilon: config.epsilon,
            states: None,
            converged: false,
            sweeps: 0,
        }
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

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Sweeps run so far.
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// Runs sweeps until the maximum residual is at most epsilon.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DeadlineReached`](crate::error::SolverError)
    /// if the armed deadline expires; completed sweeps are kept.
    pub fn solve(&mut self) -> Result<()> {
        if self.converged {
            return Ok(());
        }
        let states = match self.states.take() {
            Some(states) => states,
            None => self.ssp.reachable_states().collect(),
        };
        let result = self.sweep_until_converged(&states);
        self.states = Some(states);
        result
    }

    fn sweep_until_converged(&mut self, states: &[P::State]) -> Result<()> {
        let mut ticker = Ticker::default();
        loop {
            let mut max_residual = 0.0_f64;
            for s in states {
                ticker.tick()?;
                if self.ssp.is_goal(s) {
                    continue;
                }
                max_residual = max_residual.max(bellman::residual(&self.ssp, &self.table, s, true));
            }
            self.sweeps += 1;
            if max_residual <= self.epsilon {
                break;
            }
        }
        self.converged = true;
        debug!(
            "value iteration on {} converged after {} sweeps over {} states",
            self.ssp.name(),
            self.sweeps,
            states.len()
        );
        Ok(())
    }
}

impl<P: Ssp> Planner for ValueIteration<P> {
    type State = P::State;
    type Action = P::Action;

    fn decide_action(&mut self, s: &P::State) -> Result<Option<P::Action>> {
        self.solve()?;
        Ok(bellman::greedy_action(&self.ssp, &self.table, s))
    }

    fn evaluate_action(&self, s: &P::State) -> Result<Option<P::Action>> {
        bellman::const_greedy_action(&self.ssp, &self.table, s, |_| true)
    }

    fn train_for(&mut self, budget: Duration) -> Result<bool> {
        let done = deadline::run_for(budget, || self.solve())?;
        info!(
            "value iteration trained on {}: {} sweeps, converged: {}",
            self.ssp.name(),
            self.sweeps,
            done
        );
        Ok(done)
    }
}

impl<P: Ssp> HeuristicPlanner for ValueIteration<P> {
    fn value(&self, s: &P::State) -> f64 {
        self.table.value(s)
    }
}

impl<P: Ssp> OptimalPlanner for ValueIteration<P> {
    fn optimal_solution(&mut self) -> Result<f64> {
        self.solve()?;
        let s0 = self.ssp.s0();
        if self.ssp.is_goal(&s0) {
            Ok(self.ssp.terminal_cost(&s0))
        } else {
            Ok(self.table.get(&s0))
        }
    }
}
