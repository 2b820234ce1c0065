//! Read-through adapter over a base SSP.
//!
//! [`SspAdapter`] never copies the base problem. Each customization is an
//! optional closure consulted before delegating to the base:
//!
//! - extra goals are OR-ed with the base goal test,
//! - the action filter is AND-ed with base applicability,
//! - cost overrides fall back to the base cost when they return `None`,
//! - terminal cost overrides follow the same pattern,
//! - a precomputed reachable set replaces the default traversal.

use crate::prob_dist::ProbDist;
use crate::ssp::Ssp;
use std::fmt;
use std::rc::Rc;

type StatePredicate<S> = Rc<dyn Fn(&S) -> bool>;
type ActionPredicate<S, A> = Rc<dyn Fn(&S, &A) -> bool>;
type CostOverride<S, A> = Rc<dyn Fn(&S, &A) -> Option<f64>>;
type TerminalCostOverride<S> = Rc<dyn Fn(&S) -> Option<f64>>;

/// An SSP that customizes a base SSP without copying it.
pub struct SspAdapter<P: Ssp> {
    base: P,
    name: Option<String>,
    s0: Option<P::State>,
    extra_goals: Option<StatePredicate<P::State>>,
    action_filter: Option<ActionPredicate<P::State, P::Action>>,
    cost_override: Option<CostOverride<P::State, P::Action>>,
    terminal_cost_override: Option<TerminalCostOverride<P::State>>,
    reachable: Option<Rc<Vec<P::State>>>,
}

/// Builder for [`SspAdapter`].
///
/// # Examples
///
/// ```
/// use ssipp::ssp::{Ssp, SspAdapterBuilder, TabularSspBuilder};
///
/// let base = TabularSspBuilder::new(3)
///     .goal(2)
///     .action(0, 1.0, &[(1, 1.0)])
///     .action(1, 1.0, &[(2, 1.0)])
///     .build()
///     .unwrap();
/// let adapted = SspAdapterBuilder::new(&base)
///     .with_extra_goals(|s: &usize| *s == 1)
///     .with_terminal_cost_override(|s: &usize| if *s == 1 { Some(7.0) } else { None })
///     .build();
/// assert!(adapted.is_goal(&1));
/// assert!(adapted.is_goal(&2));
/// assert_eq!(adapted.terminal_cost(&1), 7.0);
/// ```
pub struct SspAdapterBuilder<P: Ssp> {
    adapter: SspAdapter<P>,
}

impl<P: Ssp> SspAdapterBuilder<P> {
    pub fn new(base: P) -> Self {
        Self {
            adapter: SspAdapter {
                base,
                name: None,
                s0: None,
                extra_goals: None,
                action_filter: None,
                cost_override: None,
                terminal_cost_override: None,
                reachable: None,
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.adapter.name = Some(name.into());
        self
    }

    /// Re-roots the problem at `s0`.
    pub fn with_s0(mut self, s0: P::State) -> Self {
        self.adapter.s0 = Some(s0);
        self
    }

    /// Marks every state accepted by `f` as a goal, in addition to the base goals.
    pub fn with_extra_goals<F>(mut self, f: F) -> Self
    where
        F: Fn(&P::State) -> bool + 'static,
    {
        self.adapter.extra_goals = Some(Rc::new(f));
        self
    }

    /// Keeps only base-applicable actions also accepted by `f`.
    pub fn with_action_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&P::State, &P::Action) -> bool + 'static,
    {
        self.adapter.action_filter = Some(Rc::new(f));
        self
    }

    /// Replaces the cost of `(s, a)` whenever `f` returns a positive value.
    pub fn with_cost_override<F>(mut self, f: F) -> Self
    where
        F: Fn(&P::State, &P::Action) -> Option<f64> + 'static,
    {
        self.adapter.cost_override = Some(Rc::new(f));
        self
    }

    /// Replaces the terminal cost of `s` whenever `f` returns a non-negative value.
    pub fn with_terminal_cost_override<F>(mut self, f: F) -> Self
    where
        F: Fn(&P::State) -> Option<f64> + 'static,
    {
        self.adapter.terminal_cost_override = Some(Rc::new(f));
        self
    }

    /// Supplies the reachable states instead of traversing the adapted problem.
    pub fn with_reachable_states(mut self, states: Vec<P::State>) -> Self {
        self.adapter.reachable = Some(Rc::new(states));
        self
    }

    pub fn build(self) -> SspAdapter<P> {
        self.adapter
    }
}

impl<P: Ssp> SspAdapter<P> {
    pub fn base(&self) -> &P {
        &self.base
    }

    /// Whether `s` is a goal only because of the extra goal predicate.
    pub fn is_extra_goal(&self, s: &P::State) -> bool {
        !self.base.is_goal(s) && self.extra_goals.as_ref().is_some_and(|f| f(s))
    }
}

impl<P: Ssp + Clone> Clone for SspAdapter<P> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            name: self.name.clone(),
            s0: self.s0.clone(),
            extra_goals: self.extra_goals.clone(),
            action_filter: self.action_filter.clone(),
            cost_override: self.cost_override.clone(),
            terminal_cost_override: self.terminal_cost_override.clone(),
            reachable: self.reachable.clone(),
        }
    }
}

impl<P: Ssp> fmt::Debug for SspAdapter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SspAdapter")
            .field("name", &self.name())
            .field("s0", &self.s0())
            .field("extra_goals", &self.extra_goals.is_some())
            .field("action_filter", &self.action_filter.is_some())
            .field("cost_override", &self.cost_override.is_some())
            .field("terminal_cost_override", &self.terminal_cost_override.is_some())
            .finish()
    }
}

impl<P: Ssp> Ssp for SspAdapter<P> {
    type State = P::State;
    type Action = P::Action;

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.base.name())
    }

    fn s0(&self) -> P::State {
        self.s0.clone().unwrap_or_else(|| self.base.s0())
    }

    fn is_goal(&self, s: &P::State) -> bool {
        self.extra_goals.as_ref().is_some_and(|f| f(s)) || self.base.is_goal(s)
    }

    fn is_applicable(&self, s: &P::State, a: &P::Action) -> bool {
        self.action_filter.as_ref().map_or(true, |f| f(s, a)) && self.base.is_applicable(s, a)
    }

    fn applicable_actions<'a>(
        &'a self,
        s: &'a P::State,
    ) -> Box<dyn Iterator<Item = P::Action> + 'a> {
        match &self.action_filter {
            Some(f) => Box::new(self.base.applicable_actions(s).filter(move |a| f(s, a))),
            None => self.base.applicable_actions(s),
        }
    }

    fn expand(&self, a: &P::Action, s: &P::State, out: &mut dyn ProbDist<P::State>) {
        self.base.expand(a, s, out)
    }

    fn cost(&self, s: &P::State, a: &P::Action) -> f64 {
        self.cost_override
            .as_ref()
            .and_then(|f| f(s, a))
            .filter(|c| *c > 0.0)
            .unwrap_or_else(|| self.base.cost(s, a))
    }

    fn terminal_cost(&self, s: &P::State) -> f64 {
        self.terminal_cost_override
            .as_ref()
            .and_then(|f| f(s))
            .filter(|c| *c >= 0.0)
            .unwrap_or_else(|| self.base.terminal_cost(s))
    }

    fn reachable_states<'a>(&'a self) -> Box<dyn Iterator<Item = P::State> + 'a> {
        match &self.reachable {
            Some(states) => Box::new(states.iter().cloned()),
            None => Box::new(crate::ssp::reachable_states_from(self, &self.s0()).into_iter()),
        }
    }
}
