//! The rotate-and-append search over the candidate pool.
//!
//! Every iteration appends the next `change_k` candidates of the pool to the
//! working solution, evaluates them, and records the score of the grown
//! workload. Candidates are not compared before insertion; the search relies
//! on many iterations and picks the best-scoring one afterwards.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::answers::{Accuracy, AnswerCache, Evaluator};
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::pool::QueuePool;
use crate::query::Query;

/// What a finished search loop reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTrace {
    /// One entry per iteration, the score after its last sub-step.
    pub accuracies: Vec<Accuracy>,
    /// First iteration with the lowest primary score.
    pub best_index: usize,
    /// Indexes into the pool, as reached when the loop terminated.
    pub solution: Vec<usize>,
}

pub struct SearchLoop<'a, E: Evaluator> {
    pool: &'a QueuePool,
    shadows: &'a [E::Shadow],
    evaluator: &'a E,
    num_iterations: usize,
    change_k: usize,
    start_pointer: usize,
}

impl<'a, E: Evaluator> SearchLoop<'a, E> {
    pub fn new(pool: &'a QueuePool, shadows: &'a [E::Shadow], evaluator: &'a E, config: &SearchConfig) -> Self {
        Self {
            pool,
            shadows,
            evaluator,
            num_iterations: config.num_iterations,
            change_k: config.change_k_queries_at_each_iteration,
            start_pointer: config.num_queries,
        }
    }

    pub fn run(&self, initial_solution: Vec<usize>, cache: &mut AnswerCache) -> Result<SearchTrace> {
        if self.pool.is_empty() {
            return Err(SearchError::Config("cannot search an empty candidate pool".into()));
        }
        if self.change_k == 0 || self.num_iterations == 0 {
            return Err(SearchError::Config(
                "a search needs at least one iteration and one query per iteration".into(),
            ));
        }

        let mut solution = initial_solution;
        let mut pointer = self.start_pointer % self.pool.len();
        let mut accuracies = Vec::with_capacity(self.num_iterations);

        for iteration in 0..self.num_iterations {
            let mut latest = None;
            // every sub-step reads the same position; the pointer moves once per iteration
            for _ in 0..self.change_k {
                let Some((index, query)) = self.pool.cyclic(pointer) else {
                    return Err(SearchError::Invariant("candidate pool emptied during search".into()));
                };
                solution.push(index);
                cache.evaluate_one(query, self.shadows, self.evaluator)?;
                latest = Some(self.score(&solution, cache)?);
            }
            let accuracy = latest.ok_or_else(|| SearchError::Invariant("iteration without sub-steps".into()))?;
            debug!(iteration, train = accuracy.train, validation = accuracy.validation, workload = solution.len(), "iteration scored");
            accuracies.push(accuracy);
            pointer = (pointer + self.change_k % self.pool.len()) % self.pool.len();
        }

        let best_index = best_iteration(&accuracies)
            .ok_or_else(|| SearchError::Invariant("search recorded no iterations".into()))?;
        info!(best_index, best = accuracies[best_index].train, workload = solution.len(), "search finished");
        Ok(SearchTrace { accuracies, best_index, solution })
    }

    fn score(&self, solution: &[usize], cache: &AnswerCache) -> Result<Accuracy> {
        let workload = solution
            .iter()
            .map(|&i| {
                self.pool
                    .get(i)
                    .ok_or_else(|| SearchError::Invariant(format!("solution index {i} outside the pool")))
            })
            .collect::<Result<Vec<&Query>>>()?;
        self.evaluator.accuracy(&workload, cache)
    }
}

/// Stable argmin of the primary score: the first of equal minima wins.
/// A NaN score counts as the minimum, so the first NaN wins over any number.
pub fn best_iteration(accuracies: &[Accuracy]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, accuracy) in accuracies.iter().enumerate() {
        let improves = match best {
            None => true,
            Some((_, value)) if value.is_nan() => false,
            Some((_, value)) => accuracy.train.is_nan() || accuracy.train < value,
        };
        if improves {
            best = Some((i, accuracy.train));
        }
    }
    best.map(|(i, _)| i)
}
