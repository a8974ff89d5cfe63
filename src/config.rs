//! Run configuration for a query search.
//!
//! A [`SearchConfig`] can be built in code, or layered from an optional file
//! and `QBS_SEARCH_*` environment variables, e.g.
//! `QBS_SEARCH_NUM_QUERIES=250` or `QBS_SEARCH_POLICY__USE_OPERATOR_IN=false`.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Toggles for the branches of query synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntaxPolicy {
    /// Collapse every synthesized value onto the target's own value.
    pub use_target_user_values: bool,
    pub use_operator_in: bool,
    pub use_operator_between: bool,
    /// Allow NOT-IN, expressed as two inequalities on the same column.
    pub use_neq_multiple_times: bool,
    /// Emit tri-state vectors instead of textual queries.
    pub use_limited_syntax_fast_qbs: bool,
}

impl Default for SyntaxPolicy {
    fn default() -> Self {
        Self {
            use_target_user_values: false,
            use_operator_in: true,
            use_operator_between: true,
            use_neq_multiple_times: false,
            use_limited_syntax_fast_qbs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Size of the initial workload, also the chunk size for bulk evaluation.
    pub num_queries: usize,
    pub num_iterations: usize,
    pub change_k_queries_at_each_iteration: usize,
    /// Worker threads used for the bulk evaluation of the candidate pool.
    pub num_procs: usize,
    pub seed: u64,
    pub policy: SyntaxPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_queries: 100,
            num_iterations: 1000,
            change_k_queries_at_each_iteration: 1,
            num_procs: 1,
            seed: 0,
            policy: SyntaxPolicy::default(),
        }
    }
}

impl SearchConfig {
    /// Reads `path` (if it exists) and then the environment, later sources winning.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("QBS_SEARCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let loaded: SearchConfig = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.num_queries, "num_queries"),
            (self.num_iterations, "num_iterations"),
            (self.change_k_queries_at_each_iteration, "change_k_queries_at_each_iteration"),
            (self.num_procs, "num_procs"),
        ];
        for (value, name) in checks {
            if value == 0 {
                return Err(SearchError::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    /// Number of candidates the whole run consumes, warm-start included.
    pub fn required_candidates(&self) -> usize {
        self.num_queries + self.change_k_queries_at_each_iteration * self.num_iterations
    }
}
