//! Bellman operators over an SSP and a value table.
//!
//! `Q(s, a) = min(C(s, a) + sum_{s'} P(s' | s, a) V(s'), dead_end)` where
//! `V(s')` is the terminal cost of `s'` if it is a goal and the table value
//! otherwise. The dead-end value is finite, so every comparison stays total.
//!
//! Two families are provided:
//!
//! - mutating operators ([`q_value`], [`greedy_action_and_min_q`],
//!   [`update`], [`residual`]) read through [`ValueTable::value`], which may
//!   memoize heuristic estimates, and [`update`] writes the backup;
//! - `const_` operators never write to the table and take a successor
//!   acceptance predicate: any action reaching a rejected successor is
//!   priced at the dead-end value.
//!
//! Greedy selection iterates the applicable actions in the SSP's fixed order
//! and keeps the first action reaching the minimum, so ties are broken
//! deterministically.

use crate::error::{Result, SolverError};
use crate::prob_dist::{ProbDist, VecDist};
use crate::ssp::Ssp;
use crate::value_table::ValueTable;

fn backup<P>(ssp: &P, table: &ValueTable<P::State>, s: &P::State, a: &P::Action) -> f64
where
    P: Ssp + ?Sized,
{
    let mut dist = VecDist::new();
    ssp.expand(a, s, &mut dist);
    let mut q = ssp.cost(s, a);
    for (succ, p) in dist.iter() {
        let v = if ssp.is_goal(succ) {
            ssp.terminal_cost(succ)
        } else {
            table.value(succ)
        };
        q += p * v;
    }
    q.min(table.dead_end_value())
}

fn const_backup<P, F>(
    ssp: &P,
    table: &ValueTable<P::State>,
    s: &P::State,
    a: &P::Action,
    accept: &F,
) -> f64
where
    P: Ssp + ?Sized,
    F: Fn(&P::State) -> bool,
{
    let dead_end = table.dead_end_value();
    let mut dist = VecDist::new();
    ssp.expand(a, s, &mut dist);
    let mut q = ssp.cost(s, a);
    for (succ, p) in dist.iter() {
        if !accept(succ) {
            return dead_end;
        }
        let v = if ssp.is_goal(succ) {
            ssp.terminal_cost(succ)
        } else {
            table.peek(succ)
        };
        q += p * v;
    }
    q.min(dead_end)
}

/// `Q(s, a)`, capped at the dead-end value.
///
/// # Panics
///
/// Panics if `a` is not applicable in `s`.
///
/// # Examples
///
/// ```
/// use ssipp::bellman;
/// use ssipp::heuristic::ConstantHeuristic;
/// use ssipp::ssp::TabularSspBuilder;
/// use ssipp::value_table::ValueTable;
///
/// let ssp = TabularSspBuilder::new(3)
///     .goal(2)
///     .action(0, 1.0, &[(1, 0.5), (2, 0.5)])
///     .build()
///     .unwrap();
/// let table = ValueTable::new(ConstantHeuristic(4.0));
/// // 1 + 0.5 * 4 + 0.5 * 0
/// assert_eq!(bellman::q_value(&ssp, &table, &0, &0), 3.0);
/// ```
pub fn q_value<P>(ssp: &P, table: &ValueTable<P::State>, s: &P::State, a: &P::Action) -> f64
where
    P: Ssp + ?Sized,
{
    assert!(
        ssp.is_applicable(s, a),
        "action {:?} is not applicable in state {:?}",
        a,
        s
    );
    backup(ssp, table, s, a)
}

/// First action of minimum Q-value and that minimum.
///
/// Goals yield `(None, terminal_cost(s))`. States without applicable actions,
/// or whose actions all cost at least the dead-end value, yield
/// `(None, dead_end)`.
pub fn greedy_action_and_min_q<P>(
    ssp: &P,
    table: &ValueTable<P::State>,
    s: &P::State,
) -> (Option<P::Action>, f64)
where
    P: Ssp + ?Sized,
{
    if ssp.is_goal(s) {
        return (None, ssp.terminal_cost(s));
    }
    let mut best = (None, table.dead_end_value());
    for a in ssp.applicable_actions(s) {
        let q = backup(ssp, table, s, &a);
        if q < best.1 {
            best = (Some(a), q);
        }
    }
    best
}

/// Action minimizing the Q-value of `s`, or `None` if no action beats the
/// dead-end value.
pub fn greedy_action<P>(ssp: &P, table: &ValueTable<P::State>, s: &P::State) -> Option<P::Action>
where
    P: Ssp + ?Sized,
{
    greedy_action_and_min_q(ssp, table, s).0
}

/// Minimum Q-value of `s`, capped at the dead-end value.
pub fn min_q_value<P>(ssp: &P, table: &ValueTable<P::State>, s: &P::State) -> f64
where
    P: Ssp + ?Sized,
{
    greedy_action_and_min_q(ssp, table, s).1
}

/// Bellman backup: stores the minimum Q-value of `s` and returns the greedy
/// pair.
pub fn update<P>(
    ssp: &P,
    table: &ValueTable<P::State>,
    s: &P::State,
) -> (Option<P::Action>, f64)
where
    P: Ssp + ?Sized,
{
    let (a, q) = greedy_action_and_min_q(ssp, table, s);
    table.update(s, q);
    (a, q)
}

/// `|V(s) - min_a Q(s, a)|`, also performing the backup when `apply_update`.
pub fn residual<P>(ssp: &P, table: &ValueTable<P::State>, s: &P::State, apply_update: bool) -> f64
where
    P: Ssp + ?Sized,
{
    let old = table.value(s);
    let q = if apply_update {
        update(ssp, table, s).1
    } else {
        min_q_value(ssp, table, s)
    };
    (old - q).abs()
}

/// Non-mutating `Q(s, a)`: dead-end value if a successor is rejected.
///
/// # Panics
///
/// Panics if `a` is not applicable in `s`.
pub fn const_q_value<P, F>(
    ssp: &P,
    table: &ValueTable<P::State>,
    s: &P::State,
    a: &P::Action,
    accept: F,
) -> f64
where
    P: Ssp + ?Sized,
    F: Fn(&P::State) -> bool,
{
    assert!(
        ssp.is_applicable(s, a),
        "action {:?} is not applicable in state {:?}",
        a,
        s
    );
    const_backup(ssp, table, s, a, &accept)
}

/// Non-mutating counterpart of [`greedy_action_and_min_q`].
pub fn const_greedy_action_and_min_q<P, F>(
    ssp: &P,
    table: &ValueTable<P::State>,
    s: &P::State,
    accept: F,
) -> (Option<P::Action>, f64)
where
    P: Ssp + ?Sized,
    F: Fn(&P::State) -> bool,
{
    if ssp.is_goal(s) {
        return (None, ssp.terminal_cost(s));
    }
    let mut best = (None, table.dead_end_value());
    for a in ssp.applicable_actions(s) {
        let q = const_backup(ssp, table, s, &a, &accept);
        if q < best.1 {
            best = (Some(a), q);
        }
    }
    best
}

/// [`min_q_value`] without table writes, reading only accepted successors.
pub fn const_min_q_value<P, F>(ssp: &P, table: &ValueTable<P::State>, s: &P::State, accept: F) -> f64
where
    P: Ssp + ?Sized,
    F: Fn(&P::State) -> bool,
{
    const_greedy_action_and_min_q(ssp, table, s, accept).1
}

/// Greedy action of a fixed policy, for evaluation without planning.
///
/// Returns `Ok(None)` for goals and states without applicable actions.
///
/// # Errors
///
/// Returns [`SolverError::PlannerGaveUp`] if `s` was never stored in the
/// table, i.e. the policy knows nothing about it.
pub fn const_greedy_action<P, F>(
    ssp: &P,
    table: &ValueTable<P::State>,
    s: &P::State,
    accept: F,
) -> Result<Option<P::Action>>
where
    P: Ssp + ?Sized,
    F: Fn(&P::State) -> bool,
{
    if ssp.is_goal(s) || !ssp.has_applicable_actions(s) {
        return Ok(None);
    }
    if !table.contains(s) {
        return Err(SolverError::gave_up(format!("no value for state {:?}", s)));
    }
    Ok(const_greedy_action_and_min_q(ssp, table, s, accept).0)
}

/// Non-mutating residual `|V(s) - min_a Q(s, a)|`.
pub fn const_residual<P, F>(ssp: &P, table: &ValueTable<P::State>, s: &P::State, accept: F) -> f64
where
    P: Ssp + ?Sized,
    F: Fn(&P::State) -> bool,
{
    (table.peek(s) - const_min_q_value(ssp, table, s, accept)).abs()
}
