pub mod bellman;
pub mod config;
pub mod deadline;
pub mod error;
pub mod heuristic;
pub mod planner;
pub mod prob_dist;
pub mod short_sighted;
pub mod ssp;
pub mod value_table;

pub use config::{PlannerSpec, SolverConfig};
pub use error::{Result, SolverError};
pub use planner::{HeuristicPlanner, OptimalPlanner, Planner};
pub use ssp::Ssp;
pub use value_table::ValueTable;
