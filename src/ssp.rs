//! The stochastic shortest path (SSP) contract consumed by every solver.
//!
//! An SSP exposes an initial state, a goal test, the applicable actions of a
//! state, a transition function that fills a [`ProbDist`] with successors, a
//! strictly positive action cost and a non-negative terminal cost for goals.
//! States and actions are plain values: they are cloned into value tables,
//! distributions and frontiers.

use crate::prob_dist::{ProbDist, VecDist};
use rand::{Rng, RngCore};
use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

pub mod adapter;
pub mod grid;
pub mod tabular;

pub use adapter::{SspAdapter, SspAdapterBuilder};
pub use grid::{GridAction, GridWorld};
pub use tabular::{TabularSsp, TabularSspBuilder};

/// A stochastic shortest path problem.
pub trait Ssp {
    type State: Clone + Eq + Hash + Debug;
    type Action: Clone + Eq + Hash + Debug;

    fn name(&self) -> &str;

    fn s0(&self) -> Self::State;

    fn is_goal(&self, s: &Self::State) -> bool;

    fn has_applicable_actions(&self, s: &Self::State) -> bool {
        self.applicable_actions(s).next().is_some()
    }

    fn is_applicable(&self, s: &Self::State, a: &Self::Action) -> bool;

    /// Applicable actions of `s`, in a fixed order.
    fn applicable_actions<'a>(
        &'a self,
        s: &'a Self::State,
    ) -> Box<dyn Iterator<Item = Self::Action> + 'a>;

    /// Clears `out` and fills it with `P(. | s, a)`.
    fn expand(&self, a: &Self::Action, s: &Self::State, out: &mut dyn ProbDist<Self::State>);

    /// Cost of applying `a` in `s`, strictly positive.
    fn cost(&self, s: &Self::State, a: &Self::Action) -> f64;

    /// Cost of terminating in goal `s`, non-negative.
    fn terminal_cost(&self, s: &Self::State) -> f64;

    /// States reachable from `s0`. Defaults to a breadth-first traversal.
    fn reachable_states<'a>(&'a self) -> Box<dyn Iterator<Item = Self::State> + 'a> {
        Box::new(reachable_states_from(self, &self.s0()).into_iter())
    }
}

/// Breadth-first enumeration of the states reachable from `from`.
///
/// Goals are returned but not expanded. The order is the discovery order.
pub fn reachable_states_from<P>(ssp: &P, from: &P::State) -> Vec<P::State>
where
    P: Ssp + ?Sized,
{
    let mut seen: HashSet<P::State> = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    let mut dist = VecDist::new();

    seen.insert(from.clone());
    queue.push_back(from.clone());
    while let Some(s) = queue.pop_front() {
        if !ssp.is_goal(&s) {
            for a in ssp.applicable_actions(&s) {
                ssp.expand(&a, &s, &mut dist);
                for (succ, _) in dist.iter() {
                    if seen.insert(succ.clone()) {
                        queue.push_back(succ.clone());
                    }
                }
            }
        }
        order.push(s);
    }
    order
}

/// Uniformly random applicable action of `s`, `None` if there is none.
pub fn random_action<P>(ssp: &P, s: &P::State, rng: &mut dyn RngCore) -> Option<P::Action>
where
    P: Ssp + ?Sized,
{
    // Reservoir sampling keeps this a single pass over the lazy sequence.
    let mut chosen = None;
    for (seen, a) in ssp.applicable_actions(s).enumerate() {
        if rng.gen_range(0..=seen) == 0 {
            chosen = Some(a);
        }
    }
    chosen
}

macro_rules! forward_ssp {
    ($ptr:ty) => {
        impl<P: Ssp + ?Sized> Ssp for $ptr {
            type State = P::State;
            type Action = P::Action;

            fn name(&self) -> &str {
                (**self).name()
            }

            fn s0(&self) -> Self::State {
                (**self).s0()
            }

            fn is_goal(&self, s: &Self::State) -> bool {
                (**self).is_goal(s)
            }

            fn has_applicable_actions(&self, s: &Self::State) -> bool {
                (**self).has_applicable_actions(s)
            }

            fn is_applicable(&self, s: &Self::State, a: &Self::Action) -> bool {
                (**self).is_applicable(s, a)
            }

            fn applicable_actions<'a>(
                &'a self,
                s: &'a Self::State,
            ) -> Box<dyn Iterator<Item = Self::Action> + 'a> {
                (**self).applicable_actions(s)
            }

            fn expand(
                &self,
                a: &Self::Action,
                s: &Self::State,
                out: &mut dyn ProbDist<Self::State>,
            ) {
                (**self).expand(a, s, out)
            }

            fn cost(&self, s: &Self::State, a: &Self::Action) -> f64 {
                (**self).cost(s, a)
            }

            fn terminal_cost(&self, s: &Self::State) -> f64 {
                (**self).terminal_cost(s)
            }

            fn reachable_states<'a>(&'a self) -> Box<dyn Iterator<Item = Self::State> + 'a> {
                (**self).reachable_states()
            }
        }
    };
}

forward_ssp!(&P);
forward_ssp!(Rc<P>);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn chain() -> TabularSsp {
        // 0 -> 1 -> 2(goal), plus 3 unreachable
        TabularSspBuilder::new(4)
            .goal(2)
            .action(0, 1.0, &[(1, 1.0)])
            .action(1, 1.0, &[(2, 1.0)])
            .action(3, 1.0, &[(0, 1.0)])
            .build()
            .unwrap()
    }

    #[test]
    fn test_reachable_states_skip_unreachable() {
        let ssp = chain();
        let states: Vec<usize> = ssp.reachable_states().collect();
        assert_eq!(states, vec![0, 1, 2]);
    }

    #[test]
    fn test_reachable_states_do_not_expand_goals() {
        let ssp = TabularSspBuilder::new(3)
            .goal(1)
            .action(0, 1.0, &[(1, 1.0)])
            .action(1, 1.0, &[(2, 1.0)])
            .build()
            .unwrap();
        assert_eq!(reachable_states_from(&ssp, &0), vec![0, 1]);
    }

    #[test]
    fn test_pointer_forwarding() {
        let ssp = Rc::new(chain());
        let by_ref = &*ssp;
        assert_eq!(Ssp::s0(&ssp), 0);
        assert!(Ssp::is_goal(&by_ref, &2));
        assert!(ssp.has_applicable_actions(&0));
        assert!(!ssp.has_applicable_actions(&2));
    }

    #[test]
    fn test_random_action_is_applicable() {
        let ssp = TabularSspBuilder::new(2)
            .goal(1)
            .action(0, 1.0, &[(1, 1.0)])
            .action(0, 2.0, &[(1, 1.0)])
            .action(0, 3.0, &[(0, 1.0)])
            .build()
            .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let a = random_action(&ssp, &0, &mut rng).unwrap();
            assert!(ssp.is_applicable(&0, &a));
            seen.insert(a);
        }
        assert_eq!(seen.len(), 3);
        assert!(random_action(&ssp, &1, &mut rng).is_none());
    }
}
