//! Greedy policy over a value table.

use std::rc::Rc;

use super::{HeuristicPlanner, Planner};
use crate::bellman;
use crate::error::Result;
use crate::ssp::Ssp;
use crate::value_table::ValueTable;

/// Acts greedily on a value table without ever planning.
///
/// Seeded by a heuristic alone this is the classic greedy heuristic policy;
/// sharing the table of a trained planner it replays that planner's policy.
pub struct GreedyPlanner<P: Ssp> {
    ssp: P,
    table: Rc<ValueTable<P::State>>,
}

impl<P: Ssp> GreedyPlanner<P> {
    pub fn new(ssp: P, table: Rc<ValueTable<P::State>>) -> Self {
        Self { ssp, table }
    }

    pub fn table(&self) -> &Rc<ValueTable<P::State>> {
        &self.table
    }
}

impl<P: Ssp> Planner for GreedyPlanner<P> {
    type State = P::State;
    type Action = P::Action;

    fn decide_action(&mut self, s: &P::State) -> Result<Option<P::Action>> {
        Ok(bellman::greedy_action(&self.ssp, &self.table, s))
    }

    fn evaluate_action(&self, s: &P::State) -> Result<Option<P::Action>> {
        Ok(bellman::const_greedy_action_and_min_q(&self.ssp, &self.table, s, |_| true).0)
    }
}

impl<P: Ssp> HeuristicPlanner for GreedyPlanner<P> {
    fn value(&self, s: &P::State) -> f64 {
        self.table.value(s)
    }
}
