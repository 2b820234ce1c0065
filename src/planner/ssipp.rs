//! Short-sighted probabilistic planning.
//!
//! SSiPP never solves the whole problem at once. To act in `s` it builds a
//! short-sighted SSP rooted at `s`, solves it to epsilon-consistency with an
//! embedded optimal planner sharing its value table, and follows the
//! resulting policy until it reaches a fringe state of that sub-problem.
//! Fringe states are priced by the shared table, so every re-solve starts
//! from better estimates.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::lrtdp::Lrtdp;
use super::simulator::{self, EndOfRoundStatus};
use super::vi::ValueIteration;
use super::{HeuristicPlanner, Planner};
use crate::bellman;
use crate::config::SolverConfig;
use crate::deadline;
use crate::error::{Result, SolverError};
use crate::short_sighted::{BuildBudget, S4pStrategy, ShortSightedSsp, StateKind};
use crate::ssp::Ssp;
use crate::value_table::ValueTable;

/// Optimal planner used inside short-sighted SSPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedKind {
    Lrtdp,
    Vi,
}

impl Default for EmbeddedKind {
    fn default() -> Self {
        EmbeddedKind::Lrtdp
    }
}

impl FromStr for EmbeddedKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lrtdp" => Ok(EmbeddedKind::Lrtdp),
            "vi" => Ok(EmbeddedKind::Vi),
            other => Err(SolverError::invalid_config(format!(
                "unknown embedded planner '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for EmbeddedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddedKind::Lrtdp => write!(f, "lrtdp"),
            EmbeddedKind::Vi => write!(f, "vi"),
        }
    }
}

enum Embedded<Q: Ssp> {
    Lrtdp(Lrtdp<Q>),
    Vi(ValueIteration<Q>),
}

impl<Q: Ssp> Embedded<Q> {
    fn ssp(&self) -> &Q {
        match self {
            Embedded::Lrtdp(p) => p.ssp(),
            Embedded::Vi(p) => p.ssp(),
        }
    }

    fn decide_action(&mut self, s: &Q::State) -> Result<Option<Q::Action>> {
        match self {
            Embedded::Lrtdp(p) => p.decide_action(s),
            Embedded::Vi(p) => p.decide_action(s),
        }
    }

    fn evaluate_action(&self, s: &Q::State) -> Result<Option<Q::Action>> {
        match self {
            Embedded::Lrtdp(p) => p.evaluate_action(s),
            Embedded::Vi(p) => p.evaluate_action(s),
        }
    }
}

/// The SSiPP planner over a base SSP `P`.
///
/// `P` is cloned into every short-sighted SSP, so it should be cheap to clone
/// (a reference or an `Rc`).
pub struct Ssipp<P: Ssp + Clone> {
    base: P,
    table: Rc<ValueTable<P::State>>,
    strategy: S4pStrategy,
    embedded_kind: EmbeddedKind,
    short_sighted_epsilon: f64,
    budget: BuildBudget,
    config: SolverConfig,
    rng: ChaCha20Rng,
    current: Option<Embedded<ShortSightedSsp<P>>>,
    rebuilds: usize,
}

impl<P: Ssp + Clone> Ssipp<P> {
    pub fn new(
        base: P,
        table: Rc<ValueTable<P::State>>,
        strategy: S4pStrategy,
        config: &SolverConfig,
    ) -> Self {
        Self {
            base,
            table,
            strategy,
            embedded_kind: EmbeddedKind::default(),
            short_sighted_epsilon: config.epsilon,
            budget: config.short_sighted_budget,
            config: config.clone(),
            rng: ChaCha20Rng::seed_from_u64(config.seed),
            current: None,
            rebuilds: 0,
        }
    }

    pub fn with_embedded(mut self, kind: EmbeddedKind) -> Self {
        self.embedded_kind = kind;
        self
    }

    /// Tolerance used when solving short-sighted SSPs.
    pub fn with_short_sighted_epsilon(mut self, epsilon: f64) -> Self {
        self.short_sighted_epsilon = epsilon;
        self
    }

    pub fn with_budget(mut self, budget: BuildBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn base(&self) -> &P {
        &self.base
    }

    pub fn table(&self) -> &Rc<ValueTable<P::State>> {
        &self.table
    }

    pub fn strategy(&self) -> S4pStrategy {
        self.strategy
    }

    /// The cached short-sighted SSP, if any.
    pub fn current_short_sighted(&self) -> Option<&ShortSightedSsp<P>> {
        self.current.as_ref().map(|e| e.ssp())
    }

    /// Short-sighted SSPs built so far.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    fn is_dead_end(&self, s: &P::State) -> bool {
        !self.base.has_applicable_actions(s)
    }

    fn needs_rebuild(&self, s: &P::State) -> bool {
        match self.current_short_sighted() {
            Some(s4p) => s4p.kind(s) != Some(StateKind::Internal),
            None => true,
        }
    }

    fn rebuild(&mut self, s: &P::State) -> Result<()> {
        let s4p = self.strategy.build(
            self.base.clone(),
            s.clone(),
            Rc::clone(&self.table),
            &self.budget,
            &mut self.rng,
        )?;
        debug!("rebuilt {}", s4p.name());
        let config = self
            .config
            .clone()
            .with_epsilon(self.short_sighted_epsilon)
            .with_seed(self.rng.gen());
        let table = Rc::clone(&self.table);
        self.current = Some(match self.embedded_kind {
            EmbeddedKind::Lrtdp => Embedded::Lrtdp(Lrtdp::new(s4p, table, &config)),
            EmbeddedKind::Vi => Embedded::Vi(ValueIteration::new(s4p, table, &config)),
        });
        self.rebuilds += 1;
        Ok(())
    }

    /// Simulates rounds from `s0` until enough consecutive rounds reach a goal
    /// and the value of `s0` has settled.
    fn train(&mut self) -> Result<()> {
        let base = self.base.clone();
        let s0 = base.s0();
        let mut rng = ChaCha20Rng::seed_from_u64(self.rng.gen());
        let max_turns = self.config.max_turns_per_round;
        let mut streak = 0;
        let mut rounds = 0;
        let mut last = self.table.value(&s0);
        loop {
            deadline::check()?;
            let summary = simulator::simulate_round_from(&base, self, &s0, max_turns, &mut rng)?;
            rounds += 1;
            if summary.status == EndOfRoundStatus::Goal {
                streak += 1;
            } else {
                streak = 0;
            }
            let v = self.table.value(&s0);
            let delta = (v - last).abs();
            last = v;
            if streak >= self.config.goal_streak && delta < self.config.epsilon {
                info!(
                    "ssipp converged on {} after {} rounds, V(s0) = {}",
                    base.name(),
                    rounds,
                    v
                );
                return Ok(());
            }
        }
    }
}

impl<P: Ssp + Clone> Planner for Ssipp<P> {
    type State = P::State;
    type Action = P::Action;

    fn decide_action(&mut self, s: &P::State) -> Result<Option<P::Action>> {
        if self.base.is_goal(s) || self.is_dead_end(s) {
            return Ok(None);
        }
        if self.needs_rebuild(s) {
            self.rebuild(s)?;
        }
        match self.current.as_mut() {
            Some(embedded) => embedded.decide_action(s),
            None => Ok(None),
        }
    }

    fn evaluate_action(&self, s: &P::State) -> Result<Option<P::Action>> {
        if self.base.is_goal(s) || self.is_dead_end(s) {
            return Ok(None);
        }
        match &self.current {
            Some(embedded) if embedded.ssp().kind(s) == Some(StateKind::Internal) => {
                embedded.evaluate_action(s)
            }
            _ => bellman::const_greedy_action(&self.base, &self.table, s, |_| true),
        }
    }

    fn train_for(&mut self, budget: Duration) -> Result<bool> {
        let done = deadline::run_for(budget, || self.train())?;
        info!(
            "ssipp trained on {}: {} short-sighted SSPs, {} table entries",
            self.base.name(),
            self.rebuilds,
            self.table.len()
        );
        Ok(done)
    }

    fn init_round(&mut self) {
        self.current = None;
    }
}

impl<P: Ssp + Clone> HeuristicPlanner for Ssipp<P> {
    fn value(&self, s: &P::State) -> f64 {
        self.table.value(s)
    }
}
