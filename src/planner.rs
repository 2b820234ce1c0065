//! Planners choosing actions for an SSP.
//!
//! Every planner decides actions through [`Planner::decide_action`], which may
//! plan further and update the shared value table, and through
//! [`Planner::evaluate_action`], which only reads what was already learned.
//! Catchable conditions surface as [`SolverError`](crate::error::SolverError)
//! values: an expired deadline aborts the current call, and a planner asked
//! about a state it knows nothing about in evaluation mode gives up.

use std::cell::RefCell;
use std::collections::HashSet;
use std::hash::Hash;
use std::rc::Rc;
use std::time::Duration;

use crate::error::Result;
use crate::ssp::Ssp;

pub mod factory;
pub mod greedy;
pub mod labeled_ssipp;
pub mod lrtdp;
pub mod random;
pub mod simulator;
pub mod ssipp;
pub mod vi;

pub use factory::create_planner;
pub use greedy::GreedyPlanner;
pub use labeled_ssipp::LabeledSsipp;
pub use lrtdp::{Lrtdp, LrtdpMode};
pub use random::RandomPlanner;
pub use simulator::{EndOfRoundStatus, RoundSummary};
pub use ssipp::{EmbeddedKind, Ssipp};
pub use vi::ValueIteration;

/// An action-selection policy for an SSP.
pub trait Planner {
    type State;
    type Action;

    /// Chooses an action for `s`, planning further if needed.
    ///
    /// Returns `Ok(None)` for goals and dead ends.
    fn decide_action(&mut self, s: &Self::State) -> Result<Option<Self::Action>>;

    /// Chooses an action for `s` from what was already learned, without
    /// planning or touching the value table.
    fn evaluate_action(&self, s: &Self::State) -> Result<Option<Self::Action>>;

    /// Trains for at most `budget`.
    ///
    /// Returns `Ok(true)` if training completed within the budget and
    /// `Ok(false)` if the budget expired first; what was learned so far is
    /// kept either way.
    ///
    /// # Panics
    ///
    /// Implementations arm the thread's deadline, so calling this while a
    /// deadline is already armed panics.
    fn train_for(&mut self, _budget: Duration) -> Result<bool> {
        Ok(true)
    }

    /// Called before a simulated round starts.
    fn init_round(&mut self) {}

    /// Called after a simulated round ends.
    fn end_round(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A planner backed by a value function.
pub trait HeuristicPlanner: Planner {
    /// Current estimate of the cost to reach a goal from `s`.
    fn value(&self, s: &Self::State) -> f64;
}

/// A planner that can solve its problem to epsilon-consistency.
pub trait OptimalPlanner: HeuristicPlanner {
    /// Solves from the initial state and returns its value.
    fn optimal_solution(&mut self) -> Result<f64>;
}

/// States whose value is known to be epsilon-consistent.
///
/// Cloning shares the underlying set, so a planner and an SSP adapter that
/// treats solved states as goals see the same labels.
#[derive(Debug)]
pub struct SolvedSet<S> {
    states: Rc<RefCell<HashSet<S>>>,
}

impl<S> Clone for SolvedSet<S> {
    fn clone(&self) -> Self {
        Self {
            states: Rc::clone(&self.states),
        }
    }
}

impl<S: Hash + Eq> Default for SolvedSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Hash + Eq> SolvedSet<S> {
    pub fn new() -> Self {
        Self {
            states: Rc::new(RefCell::new(HashSet::new())),
        }
    }

    pub fn contains(&self, s: &S) -> bool {
        self.states.borrow().contains(s)
    }

    /// Labels `s`; returns whether it was not labeled before.
    pub fn insert(&self, s: S) -> bool {
        self.states.borrow_mut().insert(s)
    }

    pub fn len(&self) -> usize {
        self.states.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.states.borrow_mut().clear()
    }
}

/// Goals are solved by definition.
pub(crate) fn is_solved<P>(ssp: &P, solved: &SolvedSet<P::State>, s: &P::State) -> bool
where
    P: Ssp + ?Sized,
{
    ssp.is_goal(s) || solved.contains(s)
}

#[cfg(test)]
mod tests;
