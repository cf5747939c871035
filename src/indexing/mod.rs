//! Index recommendation
//!
//! Proposes indexes for a finished table schema from its keys, constraints and
//! column selectivity.

mod advisor;

pub use advisor::{AdvisorConfig, IndexAdvisor};
