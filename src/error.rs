//! Error types shared by every solver in the crate.
//!
//! Only recoverable conditions are represented here. Broken model contracts
//! (querying an inapplicable action, overflowing a bounded distribution,
//! arming a second deadline) are bugs and panic instead.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SolverError>;

/// Recoverable failures raised while planning.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolverError {
    /// The armed deadline expired while a planning call was in progress.
    #[error("deadline reached")]
    DeadlineReached,

    /// A non-mutating policy has no action for the requested state. The
    /// caller is expected to replan.
    #[error("planner gave up: {0}")]
    PlannerGaveUp(String),

    /// A planner description or configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An explicitly described model failed validation.
    #[error("invalid model: {0}")]
    InvalidModel(String),
}

impl SolverError {
    pub fn gave_up(msg: impl Into<String>) -> Self {
        Self::PlannerGaveUp(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn invalid_model(msg: impl Into<String>) -> Self {
        Self::InvalidModel(msg.into())
    }

    /// True for the deadline signal, which callers usually absorb as
    /// "best effort so far".
    pub fn is_deadline(&self) -> bool {
        matches!(self, Self::DeadlineReached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(SolverError::DeadlineReached.to_string(), "deadline reached");
        assert_eq!(
            SolverError::invalid_config("max_depth:x").to_string(),
            "invalid configuration: max_depth:x"
        );
        assert!(SolverError::DeadlineReached.is_deadline());
        assert!(!SolverError::gave_up("s").is_deadline());
    }
}
