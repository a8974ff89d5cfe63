mod common;

use qbs_search::SearchError;
use qbs_search::answers::AnswerCache;
use qbs_search::query::{Comparison, Condition, Query};

use common::CountingEvaluator;

fn probe(value: f64) -> Query {
    Query::Select {
        projection: vec!["id".into()],
        comparisons: vec![Comparison::new("age", Condition::Eq(value.into()))],
    }
}

#[test]
fn repeated_queries_are_answered_once() {
    let evaluator = CountingEvaluator::new();
    let shadows = [0usize, 1, 2];
    let queries = vec![probe(1.0), probe(2.0), probe(1.0), probe(3.0)];
    let mut cache = AnswerCache::new();

    let evaluated = cache.evaluate(&queries, &shadows, &evaluator, 2, 1).expect("evaluate");
    assert_eq!(evaluated, 3);
    assert_eq!(cache.len(), 3);
    assert_eq!(evaluator.calls(), 3 * shadows.len());
    let first = cache.get(&probe(2.0)).expect("kept").to_vec();

    let evaluated = cache.evaluate(&queries, &shadows, &evaluator, 2, 1).expect("evaluate");
    assert_eq!(evaluated, 0);
    assert_eq!(evaluator.calls(), 3 * shadows.len());
    assert!(cache.evaluate_one(&probe(2.0), &shadows, &evaluator).expect("evaluate"));
    assert_eq!(cache.get(&probe(2.0)).expect("kept"), first.as_slice());
    assert_eq!(cache.evaluations(), 3);
}

#[test]
fn answers_hold_one_entry_per_shadow() {
    let evaluator = CountingEvaluator::new();
    let shadows = [10usize, 20];
    let mut cache = AnswerCache::new();
    assert!(!cache.evaluate_one(&probe(5.0), &shadows, &evaluator).expect("evaluate"));
    let answers = cache.get(&probe(5.0)).expect("kept");
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0][0], 10.0);
    assert_eq!(answers[1][0], 20.0);
}

#[test]
fn parallel_and_sequential_evaluation_agree() {
    let shadows = [0usize, 1];
    let queries: Vec<Query> = (0..40).map(|i| probe(i as f64)).collect();

    let sequential_evaluator = CountingEvaluator::new();
    let mut sequential = AnswerCache::new();
    sequential.evaluate(&queries, &shadows, &sequential_evaluator, 3, 1).expect("evaluate");

    let parallel_evaluator = CountingEvaluator::new();
    let mut parallel = AnswerCache::new();
    parallel.evaluate(&queries, &shadows, &parallel_evaluator, 3, 4).expect("evaluate");

    assert_eq!(sequential_evaluator.calls(), parallel_evaluator.calls());
    assert_eq!(sequential.len(), parallel.len());
    for q in &queries {
        assert_eq!(sequential.get(q), parallel.get(q));
    }
}

#[test]
fn oracle_failure_aborts_the_batch() {
    let evaluator = CountingEvaluator { fail_on: Some(probe(7.0)), ..CountingEvaluator::new() };
    let shadows = [0usize];
    let queries: Vec<Query> = (0..10).map(|i| probe(i as f64)).collect();
    let mut cache = AnswerCache::new();
    let err = cache.evaluate(&queries, &shadows, &evaluator, 4, 2).unwrap_err();
    assert!(matches!(err, SearchError::Oracle(_)));
    assert!(cache.is_empty(), "no partial results are merged");
}

#[test]
fn pruning_keeps_only_listed_queries() {
    let mut cache = AnswerCache::new();
    for i in 0..5 {
        cache.keep(probe(i as f64), vec![vec![i as f64]]);
    }
    let kept = [probe(1.0), probe(3.0)];
    cache.retain_only(kept.iter());
    assert_eq!(cache.len(), 2);
    assert!(cache.contains(&probe(1.0)) && cache.contains(&probe(3.0)));
}

#[test]
fn keep_never_overwrites() {
    let mut cache = AnswerCache::new();
    assert!(!cache.keep(probe(1.0), vec![vec![1.0]]));
    assert!(cache.keep(probe(1.0), vec![vec![2.0]]));
    assert_eq!(cache.get(&probe(1.0)).expect("kept")[0], vec![1.0]);

    let mut other = AnswerCache::new();
    other.keep(probe(1.0), vec![vec![9.0]]);
    other.keep(probe(2.0), vec![vec![2.0]]);
    cache.extend(other);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&probe(1.0)).expect("kept")[0], vec![1.0]);
    assert_eq!(cache.evaluations(), 0);
}

#[test]
fn cache_serializes_as_entries() {
    let mut cache = AnswerCache::new();
    cache.keep(probe(2.0), vec![vec![0.5]]);
    let json = serde_json::to_string(&cache).expect("serialize");
    let back: AnswerCache = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.get(&probe(2.0)).expect("kept")[0], vec![0.5]);
}
