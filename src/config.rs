//! Solver configuration and planner descriptions.
//!
//! [`SolverConfig`] gathers the knobs shared by every planner. A
//! [`PlannerSpec`] is parsed from the compact planner descriptions used on
//! command lines, for example `lrtdp`, `ssipp:0.01:vi:max_depth:4` or
//! `labeledssipp:lrtdp:min_prob_traj:0.25`.

use crate::error::{Result, SolverError};
use crate::planner::ssipp::EmbeddedKind;
use crate::short_sighted::{BuildBudget, S4pStrategy};
use crate::value_table::{DEFAULT_DEAD_END_VALUE, DEFAULT_TABLE_CAPACITY};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_EPSILON: f64 = 1e-4;
pub const DEFAULT_MAX_TRACE_LEN: usize = 1_000_000;
pub const DEFAULT_MAX_TURNS: usize = 1_000;
/// Consecutive goal-reaching rounds required before SSiPP training stops.
pub const DEFAULT_GOAL_STREAK: usize = 50;

/// Settings shared by every planner.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Convergence tolerance on Bellman residuals.
    pub epsilon: f64,
    /// Finite value standing for "practically unsolvable".
    pub dead_end_value: f64,
    /// Whether value-table reads store heuristic estimates on a miss.
    pub memoize_reads: bool,
    /// Initial capacity of value tables.
    pub table_capacity: usize,
    /// Seed of every planner-owned random generator.
    pub seed: u64,
    /// Maximum number of states visited by one LRTDP trial.
    pub max_trace_len: usize,
    /// Maximum number of actions executed in one simulated round.
    pub max_turns_per_round: usize,
    /// Goal-reaching rounds in a row required by SSiPP training.
    pub goal_streak: usize,
    /// Bounds applied when building short-sighted SSPs.
    pub short_sighted_budget: BuildBudget,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            dead_end_value: DEFAULT_DEAD_END_VALUE,
            memoize_reads: true,
            table_capacity: DEFAULT_TABLE_CAPACITY,
            seed: 0,
            max_trace_len: DEFAULT_MAX_TRACE_LEN,
            max_turns_per_round: DEFAULT_MAX_TURNS,
            goal_streak: DEFAULT_GOAL_STREAK,
            short_sighted_budget: BuildBudget::default(),
        }
    }
}

impl SolverConfig {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_dead_end_value(mut self, value: f64) -> Self {
        self.dead_end_value = value;
        self
    }

    pub fn with_memoize_reads(mut self, memoize: bool) -> Self {
        self.memoize_reads = memoize;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_turns(mut self, turns: usize) -> Self {
        self.max_turns_per_round = turns;
        self
    }

    pub fn with_short_sighted_budget(mut self, budget: BuildBudget) -> Self {
        self.short_sighted_budget = budget;
        self
    }

    /// Checks the numeric fields.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidConfig`] for a non-positive epsilon, a
    /// non-finite or non-positive dead-end value, or a zero turn limit.
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(SolverError::invalid_config(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if !(self.dead_end_value > 0.0 && self.dead_end_value.is_finite()) {
            return Err(SolverError::invalid_config(format!(
                "dead-end value must be finite and positive, got {}",
                self.dead_end_value
            )));
        }
        if self.max_turns_per_round == 0 {
            return Err(SolverError::invalid_config("max turns per round must be > 0"));
        }
        Ok(())
    }
}

/// Parameters of an SSiPP-style planner description.
#[derive(Debug, Clone, PartialEq)]
pub struct SsippSpec {
    /// Tolerance used inside short-sighted SSPs, the global one when `None`.
    pub short_sighted_epsilon: Option<f64>,
    pub embedded: EmbeddedKind,
    pub strategy: S4pStrategy,
}

impl FromStr for SsippSpec {
    type Err = SolverError;

    /// Parses `[epsilon:][lrtdp|vi:]<method>:<argument>`.
    fn from_str(flags: &str) -> Result<Self> {
        let mut tokens: Vec<&str> = flags.split(':').collect();
        let mut short_sighted_epsilon = None;
        if let Some(eps) = tokens.first().and_then(|t| t.parse::<f64>().ok()) {
            if !(eps > 0.0) {
                return Err(SolverError::invalid_config(format!(
                    "short-sighted epsilon must be positive, got {}",
                    eps
                )));
            }
            short_sighted_epsilon = Some(eps);
            tokens.remove(0);
        }
        let mut embedded = EmbeddedKind::Lrtdp;
        if let Some(kind) = tokens.first().and_then(|t| t.parse::<EmbeddedKind>().ok()) {
            embedded = kind;
            tokens.remove(0);
        }
        if tokens.len() != 2 {
            return Err(SolverError::invalid_config(format!(
                "expected <method>:<argument>, got '{}'",
                tokens.join(":")
            )));
        }
        let strategy = tokens.join(":").parse()?;
        Ok(Self {
            short_sighted_epsilon,
            embedded,
            strategy,
        })
    }
}

/// A planner and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerSpec {
    /// Uniformly random applicable actions.
    Random,
    /// Greedy actions on the current value table, no planning.
    Greedy,
    Vi,
    Lrtdp,
    /// LRTDP that only plans while training and acts greedily afterwards.
    GreedyLrtdp,
    Ssipp(SsippSpec),
    LabeledSsipp(SsippSpec),
}

impl FromStr for PlannerSpec {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let (name, rest) = match lower.split_once(':') {
            Some((name, rest)) => (name, Some(rest)),
            None => (lower.as_str(), None),
        };
        match (name, rest) {
            ("random", None) => Ok(PlannerSpec::Random),
            ("greedy", None) => Ok(PlannerSpec::Greedy),
            ("vi", None) => Ok(PlannerSpec::Vi),
            ("lrtdp", None) => Ok(PlannerSpec::Lrtdp),
            ("glrtdp", None) => Ok(PlannerSpec::GreedyLrtdp),
            ("ssipp", Some(flags)) => Ok(PlannerSpec::Ssipp(flags.parse()?)),
            ("labeledssipp", Some(flags)) => Ok(PlannerSpec::LabeledSsipp(flags.parse()?)),
            _ => Err(SolverError::invalid_config(format!("no planner named '{}'", s))),
        }
    }
}

impl fmt::Display for PlannerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_ssipp = |f: &mut fmt::Formatter<'_>, name: &str, spec: &SsippSpec| {
            write!(f, "{}", name)?;
            if let Some(eps) = spec.short_sighted_epsilon {
                write!(f, ":{}", eps)?;
            }
            write!(f, ":{}:{}", spec.embedded, spec.strategy)
        };
        match self {
            PlannerSpec::Random => write!(f, "random"),
            PlannerSpec::Greedy => write!(f, "greedy"),
            PlannerSpec::Vi => write!(f, "vi"),
            PlannerSpec::Lrtdp => write!(f, "lrtdp"),
            PlannerSpec::GreedyLrtdp => write!(f, "glrtdp"),
            PlannerSpec::Ssipp(spec) => write_ssipp(f, "ssipp", spec),
            PlannerSpec::LabeledSsipp(spec) => write_ssipp(f, "labeledssipp", spec),
        }
    }
}
