//! Planner construction from textual descriptions such as
//! `labeledssipp:lrtdp:max_depth:2`.

use std::rc::Rc;

use super::{
    GreedyPlanner, LabeledSsipp, Lrtdp, LrtdpMode, Planner, RandomPlanner, Ssipp, ValueIteration,
};
use crate::config::{PlannerSpec, SolverConfig};
use crate::error::Result;
use crate::heuristic::Heuristic;
use crate::ssp::Ssp;
use crate::value_table::ValueTableBuilder;

/// A planner for any SSP state and action types.
pub type BoxedPlanner<S, A> = Box<dyn Planner<State = S, Action = A>>;

/// Builds the planner described by `spec` on `ssp`.
///
/// The planner gets a fresh value table seeded by `heuristic` and configured
/// from `config`.
///
/// # Errors
///
/// Returns [`SolverError::InvalidConfig`](crate::error::SolverError) if
/// `config` does not validate.
///
/// # Examples
///
/// ```
/// use ssipp::config::SolverConfig;
/// use ssipp::heuristic::ZeroHeuristic;
/// use ssipp::planner::create_planner;
/// use ssipp::ssp::TabularSspBuilder;
/// use std::rc::Rc;
///
/// let ssp = Rc::new(
///     TabularSspBuilder::new(2)
///         .goal(1)
///         .action(0, 1.0, &[(1, 1.0)])
///         .build()
///         .unwrap(),
/// );
/// let spec = "ssipp:lrtdp:max_depth:2".parse().unwrap();
/// let mut planner = create_planner(ssp, &spec, ZeroHeuristic, &SolverConfig::default()).unwrap();
/// assert_eq!(planner.decide_action(&0).unwrap(), Some(0));
/// ```
pub fn create_planner<P, E>(
    ssp: P,
    spec: &PlannerSpec,
    heuristic: E,
    config: &SolverConfig,
) -> Result<BoxedPlanner<P::State, P::Action>>
where
    P: Ssp + Clone + 'static,
    E: Heuristic<P::State> + 'static,
{
    config.validate()?;
    let table = Rc::new(ValueTableBuilder::from_config(config).build(heuristic));
    let planner: BoxedPlanner<P::State, P::Action> = match spec {
        PlannerSpec::Random => Box::new(RandomPlanner::new(ssp, config.seed)),
        PlannerSpec::Greedy => Box::new(GreedyPlanner::new(ssp, table)),
        PlannerSpec::Vi => Box::new(ValueIteration::new(ssp, table, config)),
        PlannerSpec::Lrtdp => Box::new(Lrtdp::new(ssp, table, config)),
        PlannerSpec::GreedyLrtdp => {
            Box::new(Lrtdp::new(ssp, table, config).with_mode(LrtdpMode::Greedy))
        }
        PlannerSpec::Ssipp(s) => {
            let mut planner = Ssipp::new(ssp, table, s.strategy, config).with_embedded(s.embedded);
            if let Some(eps) = s.short_sighted_epsilon {
                planner = planner.with_short_sighted_epsilon(eps);
            }
            Box::new(planner)
        }
        PlannerSpec::LabeledSsipp(s) => {
            let mut planner =
                LabeledSsipp::new(ssp, table, s.strategy, config).with_embedded(s.embedded);
            if let Some(eps) = s.short_sighted_epsilon {
                planner = planner.with_short_sighted_epsilon(eps);
            }
            Box::new(planner)
        }
    };
    Ok(planner)
}
