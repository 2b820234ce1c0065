//! Uniformly random policy, the usual baseline.

use std::cell::RefCell;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use super::Planner;
use crate::error::Result;
use crate::ssp::{self, Ssp};

/// Picks a uniformly random applicable action.
pub struct RandomPlanner<P: Ssp> {
    ssp: P,
    rng: RefCell<ChaCha20Rng>,
}

impl<P: Ssp> RandomPlanner<P> {
    pub fn new(ssp: P, seed: u64) -> Self {
        Self {
            ssp,
            rng: RefCell::new(ChaCha20Rng::seed_from_u64(seed)),
        }
    }
}

impl<P: Ssp> Planner for RandomPlanner<P> {
    type State = P::State;
    type Action = P::Action;

    fn decide_action(&mut self, s: &P::State) -> Result<Option<P::Action>> {
        if self.ssp.is_goal(s) {
            return Ok(None);
        }
        Ok(ssp::random_action(&self.ssp, s, self.rng.get_mut()))
    }

    fn evaluate_action(&self, s: &P::State) -> Result<Option<P::Action>> {
        if self.ssp.is_goal(s) {
            return Ok(None);
        }
        Ok(ssp::random_action(&self.ssp, s, &mut *self.rng.borrow_mut()))
    }
}
