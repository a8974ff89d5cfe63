#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use qbs_search::answers::{Accuracy, Answer, AnswerCache, Evaluator};
use qbs_search::query::Query;
use qbs_search::schema::{Column, ColumnKind, Schema, TargetRecord, ValueDistribution};
use qbs_search::{Result, SearchError};

/// Answers with the shadow id and the length of the rendered query, and scores
/// a workload from a table keyed by workload length (1.0 when absent).
#[derive(Default)]
pub struct CountingEvaluator {
    pub calls: AtomicUsize,
    pub scores: HashMap<usize, f64>,
    pub fail_on: Option<Query>,
}

impl CountingEvaluator {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_scores(scores: &[(usize, f64)]) -> Self {
        Self { scores: scores.iter().copied().collect(), ..Self::default() }
    }
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Evaluator for CountingEvaluator {
    type Shadow = usize;

    fn answer(&self, query: &Query, shadow: &usize) -> Result<Answer> {
        if self.fail_on.as_ref() == Some(query) {
            return Err(SearchError::Oracle(format!("shadow {shadow} refused {query}")));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![*shadow as f64, query.to_string().len() as f64])
    }

    fn accuracy(&self, workload: &[&Query], answers: &AnswerCache) -> Result<Accuracy> {
        for q in workload {
            if !answers.contains(q) {
                return Err(SearchError::Oracle(format!("unanswered query {q}")));
            }
        }
        let train = self.scores.get(&workload.len()).copied().unwrap_or(1.0);
        Ok(Accuracy::new(train, train + 0.5))
    }
}

pub fn people_schema() -> Schema {
    Schema::new(vec![
        Column::new("age", ColumnKind::Continuous)
            .with_distribution(ValueDistribution::new(vec![(30.0, 0.2), (42.0, 0.5), (55.0, 0.3)])),
        Column::new("zip", ColumnKind::Discrete)
            .with_distribution(ValueDistribution::new(vec![(1000.0, 0.5), (2000.0, 0.3), (3000.0, 0.2)])),
        Column::new("sens", ColumnKind::Discrete)
            .with_distribution(ValueDistribution::new(vec![(0.0, 0.6), (1.0, 0.4)])),
    ])
}

pub fn people_target() -> TargetRecord {
    TargetRecord::new().with("age", 42.0).with("zip", 2000.0).with("sens", 0.0)
}
