//! Short-sighted SSPs (S4Ps).
//!
//! A short-sighted SSP truncates a (possibly huge) SSP into a finite
//! sub-problem rooted at a state. Its states are split into *internal* states,
//! which keep the base dynamics, and *fringe* states, which act as goals whose
//! terminal cost is the current value-table estimate (or the true terminal
//! cost for original goals).
//!
//! Every construction strategy guarantees three completeness conditions:
//!
//! 1. every original goal in the S4P is a fringe state,
//! 2. the root is a fringe state only if it is an original goal,
//! 3. every successor of every internal state is in the S4P.
//!
//! [`ShortSightedSsp::completeness_violations`] checks them explicitly.
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//! use ssipp::heuristic::ZeroHeuristic;
//! use ssipp::short_sighted::{BuildBudget, ShortSightedSsp, StateKind};
//! use ssipp::ssp::{Ssp, TabularSspBuilder};
//! use ssipp::value_table::ValueTable;
//!
//! let ssp = TabularSspBuilder::new(3)
//!     .goal(2)
//!     .action(0, 1.0, &[(1, 1.0)])
//!     .action(1, 1.0, &[(2, 1.0)])
//!     .build()
//!     .unwrap();
//! let table = Rc::new(ValueTable::new(ZeroHeuristic));
//! let s4p = ShortSightedSsp::max_depth(&ssp, 0, table, 1, &BuildBudget::default()).unwrap();
//! assert_eq!(s4p.kind(&0), Some(StateKind::Internal));
//! assert_eq!(s4p.kind(&1), Some(StateKind::Fringe));
//! assert!(s4p.is_goal(&1));
//! assert!(s4p.satisfies_completeness());
//! ```

use crate::prob_dist::{ProbDist, VecDist};
use crate::ssp::Ssp;
use crate::value_table::ValueTable;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

mod build;
pub mod strategy;

pub use strategy::S4pStrategy;

/// Membership status of a state in a short-sighted SSP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Internal,
    Fringe,
}

/// Optional bounds on the construction of a short-sighted SSP.
///
/// When a bound interrupts construction, every pending state is closed as a
/// fringe state. The root is always expanded, so a bounded S4P is never
/// smaller than the root and its successors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BuildBudget {
    /// Soft maximum number of states.
    pub max_states: Option<usize>,
    /// Maximum wall-clock construction time.
    pub max_time: Option<Duration>,
}

impl BuildBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = Some(max_states);
        self
    }

    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }
}

/// A broken completeness condition.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletenessViolation<S, A> {
    /// An original goal is an internal state.
    OriginalGoalNotFringe(S),
    /// The root is a fringe state without being an original goal.
    RootIsArtificialGoal(S),
    /// A successor of an internal state is missing.
    MissingSuccessor { state: S, action: A, successor: S },
}

/// A finite truncation of a base SSP.
pub struct ShortSightedSsp<P: Ssp> {
    base: P,
    root: P::State,
    table: Rc<ValueTable<P::State>>,
    members: HashMap<P::State, StateKind>,
    name: String,
    truncated: bool,
}

impl<P: Ssp> ShortSightedSsp<P> {
    fn empty(base: P, root: P::State, table: Rc<ValueTable<P::State>>, label: &str) -> Self {
        let name = format!("{} ({} rooted at {:?})", base.name(), label, root);
        Self {
            base,
            root,
            table,
            members: HashMap::new(),
            name,
            truncated: false,
        }
    }

    pub fn base(&self) -> &P {
        &self.base
    }

    pub fn root(&self) -> &P::State {
        &self.root
    }

    pub fn table(&self) -> &Rc<ValueTable<P::State>> {
        &self.table
    }

    /// Status of `s`, `None` if `s` is not in the S4P.
    pub fn kind(&self, s: &P::State) -> Option<StateKind> {
        self.members.get(s).copied()
    }

    pub fn contains(&self, s: &P::State) -> bool {
        self.members.contains_key(s)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether a budget interrupted the construction.
    pub fn was_truncated(&self) -> bool {
        self.truncated
    }

    pub fn internal_states(&self) -> impl Iterator<Item = &P::State> + '_ {
        self.members_of(StateKind::Internal)
    }

    pub fn fringe_states(&self) -> impl Iterator<Item = &P::State> + '_ {
        self.members_of(StateKind::Fringe)
    }

    fn members_of(&self, kind: StateKind) -> impl Iterator<Item = &P::State> + '_ {
        self.members
            .iter()
            .filter(move |(_, k)| **k == kind)
            .map(|(s, _)| s)
    }

    /// Lists every broken completeness condition; empty when all hold.
    pub fn completeness_violations(&self) -> Vec<CompletenessViolation<P::State, P::Action>> {
        let mut violations = Vec::new();
        for (s, kind) in &self.members {
            if self.base.is_goal(s) && *kind != StateKind::Fringe {
                violations.push(CompletenessViolation::OriginalGoalNotFringe(s.clone()));
            }
        }
        if self.kind(&self.root) == Some(StateKind::Fringe) && !self.base.is_goal(&self.root) {
            violations.push(CompletenessViolation::RootIsArtificialGoal(self.root.clone()));
        }
        let mut dist = VecDist::new();
        for s in self.internal_states() {
            for a in self.base.applicable_actions(s) {
                self.base.expand(&a, s, &mut dist);
                for (succ, _) in dist.iter() {
                    if !self.members.contains_key(succ) {
                        violations.push(CompletenessViolation::MissingSuccessor {
                            state: s.clone(),
                            action: a.clone(),
                            successor: succ.clone(),
                        });
                    }
                }
            }
        }
        violations
    }

    pub fn satisfies_completeness(&self) -> bool {
        self.completeness_violations().is_empty()
    }
}

impl<P: Ssp> Ssp for ShortSightedSsp<P> {
    type State = P::State;
    type Action = P::Action;

    fn name(&self) -> &str {
        &self.name
    }

    fn s0(&self) -> P::State {
        self.root.clone()
    }

    /// # Panics
    ///
    /// Panics if `s` is not in the short-sighted SSP.
    fn is_goal(&self, s: &P::State) -> bool {
        match self.members.get(s) {
            Some(kind) => *kind == StateKind::Fringe,
            None => panic!("state {:?} is not in {}", s, self.name),
        }
    }

    fn has_applicable_actions(&self, s: &P::State) -> bool {
        self.base.has_applicable_actions(s)
    }

    fn is_applicable(&self, s: &P::State, a: &P::Action) -> bool {
        self.base.is_applicable(s, a)
    }

    fn applicable_actions<'a>(
        &'a self,
        s: &'a P::State,
    ) -> Box<dyn Iterator<Item = P::Action> + 'a> {
        self.base.applicable_actions(s)
    }

    fn expand(&self, a: &P::Action, s: &P::State, out: &mut dyn ProbDist<P::State>) {
        self.base.expand(a, s, out)
    }

    fn cost(&self, s: &P::State, a: &P::Action) -> f64 {
        self.base.cost(s, a)
    }

    /// True terminal cost for original goals, current value estimate for
    /// every other fringe state.
    fn terminal_cost(&self, s: &P::State) -> f64 {
        if self.base.is_goal(s) {
            self.base.terminal_cost(s)
        } else {
            self.table.value(s)
        }
    }

    fn reachable_states<'a>(&'a self) -> Box<dyn Iterator<Item = P::State> + 'a> {
        Box::new(self.members.keys().cloned())
    }
}

impl<P: Ssp> fmt::Display for ShortSightedSsp<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} internal, {} fringe{}",
            self.name,
            self.internal_states().count(),
            self.fringe_states().count(),
            if self.truncated { " (truncated)" } else { "" }
        )?;
        for (s, kind) in &self.members {
            writeln!(f, "  {:?} {:?}", s, kind)?;
        }
        Ok(())
    }
}

impl<P: Ssp> fmt::Debug for ShortSightedSsp<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortSightedSsp")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("len", &self.members.len())
            .field("truncated", &self.truncated)
            .finish()
    }
}
