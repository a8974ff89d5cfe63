//! Top-level entry point tying synthesis, evaluation and search together.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::answers::{Accuracy, AnswerCache, Evaluator};
use crate::config::SearchConfig;
use crate::encoder::QueryEncoder;
use crate::error::{Result, SearchError};
use crate::pool::QueuePool;
use crate::query::Query;
use crate::schema::{Schema, TargetRecord};
use crate::search::SearchLoop;

/// Queries and answers carried over from an earlier run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarmStart {
    pub queries: Vec<Query>,
    pub answers: AnswerCache,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub accuracies: Vec<Accuracy>,
    pub best_index: usize,
    /// The final workload, in the order it was assembled.
    pub best_solution: Vec<Query>,
    /// Positions of `best_solution` in the candidate pool.
    pub solution_indices: Vec<usize>,
    /// Answers restricted to the queries of `best_solution`.
    pub answers: AnswerCache,
    /// Lower component of the best iteration's score.
    pub best_score: f64,
}

pub struct QuerySearcher;

impl QuerySearcher {
    /// Builds the candidate pool behind `warm_start`, answers all of it up
    /// front on the shadow systems, then runs the search seeded with the
    /// first `num_queries` candidates.
    pub fn search_for_this_syntax<E: Evaluator>(
        config: &SearchConfig,
        schema: &Schema,
        target: &TargetRecord,
        shadows: &[E::Shadow],
        evaluator: &E,
        warm_start: WarmStart,
    ) -> Result<SearchOutcome> {
        config.validate()?;

        let encoder = QueryEncoder::new(schema, target, config.policy);
        let WarmStart { queries, answers: warm_answers } = warm_start;
        let pool = QueuePool::build(config, &encoder, queries)?;
        info!(candidates = pool.len(), warm_start = pool.warm_start_len(), seed = config.seed, "searching");

        let mut cache = AnswerCache::new();
        cache.extend(warm_answers);
        cache.evaluate(pool.queries(), shadows, evaluator, config.num_queries, config.num_procs)?;

        let initial: Vec<usize> = (0..config.num_queries.min(pool.len())).collect();
        let trace = SearchLoop::new(&pool, shadows, evaluator, config).run(initial, &mut cache)?;

        let best_solution = trace
            .solution
            .iter()
            .map(|&i| {
                pool.get(i)
                    .cloned()
                    .ok_or_else(|| SearchError::Invariant(format!("solution index {i} outside the pool")))
            })
            .collect::<Result<Vec<Query>>>()?;
        cache.retain_only(best_solution.iter());
        let best_score = trace.accuracies[trace.best_index].worst();

        Ok(SearchOutcome {
            accuracies: trace.accuracies,
            best_index: trace.best_index,
            best_solution,
            solution_indices: trace.solution,
            answers: cache,
            best_score,
        })
    }
}
