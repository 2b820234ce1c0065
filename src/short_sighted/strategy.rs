//! Selection of a short-sighted SSP construction strategy.

use super::{BuildBudget, ShortSightedSsp};
use crate::error::{Result, SolverError};
use crate::ssp::Ssp;
use crate::value_table::ValueTable;
use rand::{Rng, RngCore};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// How short-sighted SSPs are built.
///
/// Parsed from `max_depth:N`, `random_max_depth:LO,HI` (or
/// `max_depth_random:LO,HI`), `min_prob_traj:P` (or `min_trace_p:P`,
/// `traj_based:P`) and `greedy:N`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum S4pStrategy {
    MaxDepth(usize),
    /// Max-depth with the depth drawn uniformly from `min..=max` per build.
    RandomMaxDepth { min: usize, max: usize },
    TrajectoryProbability(f64),
    Greedy(usize),
}

impl Default for S4pStrategy {
    fn default() -> Self {
        S4pStrategy::MaxDepth(3)
    }
}

impl S4pStrategy {
    /// Builds a short-sighted SSP of `base` rooted at `root`.
    ///
    /// `rng` is only used by [`S4pStrategy::RandomMaxDepth`].
    pub fn build<P: Ssp>(
        &self,
        base: P,
        root: P::State,
        table: Rc<ValueTable<P::State>>,
        budget: &BuildBudget,
        rng: &mut dyn RngCore,
    ) -> Result<ShortSightedSsp<P>> {
        match *self {
            S4pStrategy::MaxDepth(t) => ShortSightedSsp::max_depth(base, root, table, t, budget),
            S4pStrategy::RandomMaxDepth { min, max } => {
                let t = rng.gen_range(min..=max);
                ShortSightedSsp::max_depth(base, root, table, t, budget)
            }
            S4pStrategy::TrajectoryProbability(p) => {
                ShortSightedSsp::trajectory_based(base, root, table, p, budget)
            }
            S4pStrategy::Greedy(n) => ShortSightedSsp::greedy(base, root, table, n, budget),
        }
    }
}

fn parse_positive(arg: &str, what: &str) -> Result<usize> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(SolverError::invalid_config(format!(
            "{} must be a positive integer, got '{}'",
            what, arg
        ))),
    }
}

impl FromStr for S4pStrategy {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        let (method, arg) = s.split_once(':').ok_or_else(|| {
            SolverError::invalid_config(format!("expected <method>:<argument>, got '{}'", s))
        })?;
        match method.trim().to_ascii_lowercase().as_str() {
            "max_depth" => Ok(S4pStrategy::MaxDepth(parse_positive(arg, "max depth")?)),
            "random_max_depth" | "max_depth_random" => {
                let (lo, hi) = arg.split_once(',').ok_or_else(|| {
                    SolverError::invalid_config(format!("expected LO,HI, got '{}'", arg))
                })?;
                let min = parse_positive(lo, "minimum depth")?;
                let max = parse_positive(hi, "maximum depth")?;
                if min > max {
                    return Err(SolverError::invalid_config(format!(
                        "empty depth range {}..={}",
                        min, max
                    )));
                }
                Ok(S4pStrategy::RandomMaxDepth { min, max })
            }
            "min_prob_traj" | "min_trace_p" | "traj_based" => match arg.trim().parse::<f64>() {
                Ok(p) if p > 0.0 && p <= 1.0 => Ok(S4pStrategy::TrajectoryProbability(p)),
                _ => Err(SolverError::invalid_config(format!(
                    "minimum trajectory probability must be in (0, 1], got '{}'",
                    arg
                ))),
            },
            "greedy" => Ok(S4pStrategy::Greedy(parse_positive(arg, "max states")?)),
            other => Err(SolverError::invalid_config(format!(
                "unknown short-sighted method '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for S4pStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            S4pStrategy::MaxDepth(t) => write!(f, "max_depth:{}", t),
            S4pStrategy::RandomMaxDepth { min, max } => {
                write!(f, "random_max_depth:{},{}", min, max)
            }
            S4pStrategy::TrajectoryProbability(p) => write!(f, "min_prob_traj:{}", p),
            S4pStrategy::Greedy(n) => write!(f, "greedy:{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        for s in ["min_prob_traj:0.5", "min_trace_p:0.5", "traj_based:0.5"] {
            assert_eq!(
                s.parse::<S4pStrategy>().unwrap(),
                S4pStrategy::TrajectoryProbability(0.5)
            );
        }
        assert_eq!(
            "max_depth_random:1,3".parse::<S4pStrategy>().unwrap(),
            S4pStrategy::RandomMaxDepth { min: 1, max: 3 }
        );
        assert_eq!("greedy:64".parse::<S4pStrategy>().unwrap(), S4pStrategy::Greedy(64));
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        for s in [
            "max_depth",
            "max_depth:-2",
            "random_max_depth:5,2",
            "random_max_depth:3",
            "min_prob_traj:0",
            "greedy:many",
        ] {
            assert!(s.parse::<S4pStrategy>().is_err(), "{} should not parse", s);
        }
    }

    #[test]
    fn test_display_parses_back() {
        let all = [
            S4pStrategy::MaxDepth(2),
            S4pStrategy::RandomMaxDepth { min: 1, max: 4 },
            S4pStrategy::TrajectoryProbability(0.125),
            S4pStrategy::Greedy(10),
        ];
        for strategy in all {
            assert_eq!(strategy.to_string().parse::<S4pStrategy>().unwrap(), strategy);
        }
    }
}
