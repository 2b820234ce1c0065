//! Simulated rounds: execute a planner's actions on an SSP until a goal.

use log::{trace, warn};
use rand::RngCore;

use super::Planner;
use crate::error::{Result, SolverError};
use crate::prob_dist::{ProbDist, VecDist};
use crate::ssp::Ssp;

/// How a simulated round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndOfRoundStatus {
    /// A goal was reached.
    Goal,
    /// The turn limit was hit first.
    MaxTurns,
    /// The planner had no action for a non-goal state.
    DeadEnd,
    /// The planner gave up on a state it knows nothing about.
    GaveUp,
}

/// Outcome of one simulated round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub status: EndOfRoundStatus,
    /// Accumulated action costs, plus the terminal cost if a goal was reached.
    pub cost: f64,
    /// Actions executed.
    pub turns: usize,
}

/// Runs one round from `s` with [`Planner::decide_action`].
///
/// The planner's `init_round` and `end_round` hooks bracket the round, and
/// successors are sampled with `rng`.
///
/// # Errors
///
/// Propagates the planner's errors except [`SolverError::PlannerGaveUp`],
/// which ends the round with [`EndOfRoundStatus::GaveUp`].
pub fn simulate_round_from<P, L>(
    ssp: &P,
    planner: &mut L,
    s: &P::State,
    max_turns: usize,
    rng: &mut dyn RngCore,
) -> Result<RoundSummary>
where
    P: Ssp + ?Sized,
    L: Planner<State = P::State, Action = P::Action> + ?Sized,
{
    planner.init_round();
    let summary = run(ssp, s, max_turns, rng, |state| planner.decide_action(state))?;
    planner.end_round()?;
    Ok(summary)
}

/// Runs one round from `s` with [`Planner::evaluate_action`], leaving the
/// planner untouched.
pub fn evaluate_round_from<P, L>(
    ssp: &P,
    planner: &L,
    s: &P::State,
    max_turns: usize,
    rng: &mut dyn RngCore,
) -> Result<RoundSummary>
where
    P: Ssp + ?Sized,
    L: Planner<State = P::State, Action = P::Action> + ?Sized,
{
    run(ssp, s, max_turns, rng, |state| planner.evaluate_action(state))
}

fn run<P, F>(
    ssp: &P,
    s: &P::State,
    max_turns: usize,
    rng: &mut dyn RngCore,
    mut act: F,
) -> Result<RoundSummary>
where
    P: Ssp + ?Sized,
    F: FnMut(&P::State) -> Result<Option<P::Action>>,
{
    let mut dist = VecDist::new();
    let mut cur = s.clone();
    let mut cost = 0.0;
    let mut turns = 0;

    let status = loop {
        if ssp.is_goal(&cur) {
            cost += ssp.terminal_cost(&cur);
            break EndOfRoundStatus::Goal;
        }
        if turns >= max_turns {
            warn!("round on {} hit the limit of {} turns", ssp.name(), max_turns);
            break EndOfRoundStatus::MaxTurns;
        }
        let a = match act(&cur) {
            Ok(Some(a)) => a,
            Ok(None) => break EndOfRoundStatus::DeadEnd,
            Err(SolverError::PlannerGaveUp(reason)) => {
                trace!("planner gave up in {:?}: {}", cur, reason);
                break EndOfRoundStatus::GaveUp;
            }
            Err(e) => return Err(e),
        };
        cost += ssp.cost(&cur, &a);
        turns += 1;
        ssp.expand(&a, &cur, &mut dist);
        let nc = dist.normalizing_constant();
        match dist.sample(rng, nc) {
            Some(next) => cur = next.clone(),
            None => break EndOfRoundStatus::DeadEnd,
        }
    };
    trace!("round on {} ended with {:?} after {} turns", ssp.name(), status, turns);
    Ok(RoundSummary {
        status,
        cost,
        turns,
    })
}
