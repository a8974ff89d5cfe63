//! Answers of candidate queries on the shadow query-based systems.
//!
//! The [`Evaluator`] is the only place that knows what a query-based system
//! is; everything here treats it as an oracle. The [`AnswerCache`] keeps one
//! answer vector per query and never evaluates a query twice.

// the cache uses the same fast hasher for its keys and the dedup set
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::query::Query;

pub type QueryHasher = BuildHasherDefault<SeaHasher>;

/// The answer of one query on one shadow system.
pub type Answer = Vec<f64>;

/// Scores of a workload on the training and validation shadow systems.
/// Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Accuracy {
    pub train: f64,
    pub validation: f64,
}

impl Accuracy {
    pub fn new(train: f64, validation: f64) -> Self {
        Self { train, validation }
    }
    /// The lower of the two components.
    pub fn worst(&self) -> f64 {
        self.train.min(self.validation)
    }
}

/// The external oracle standing in for the attacked system.
///
/// Anything the oracle needs beyond the query and the shadow system, such as
/// the record indexes the shadow datasets were drawn with, is carried by the
/// implementor itself; the search passes it through untouched.
pub trait Evaluator: Sync {
    /// A locally controlled replica of the attacked system.
    type Shadow: Sync;

    /// Answers `query` on a single shadow system.
    fn answer(&self, query: &Query, shadow: &Self::Shadow) -> Result<Answer>;

    /// Scores `workload` from the answers already kept in `answers`.
    fn accuracy(&self, workload: &[&Query], answers: &AnswerCache) -> Result<Accuracy>;
}

#[derive(Debug, Clone, Default)]
pub struct AnswerCache {
    kept: HashMap<Query, Vec<Answer>, QueryHasher>,
    evaluations: usize,
}

impl AnswerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `answers` for `query` unless the query is already kept.
    /// Returns whether it was previously kept.
    pub fn keep(&mut self, query: Query, answers: Vec<Answer>) -> bool {
        match self.kept.entry(query) {
            Entry::Vacant(e) => {
                e.insert(answers);
                false
            }
            Entry::Occupied(_) => true,
        }
    }
    pub fn get(&self, query: &Query) -> Option<&[Answer]> {
        self.kept.get(query).map(|a| a.as_slice())
    }
    pub fn contains(&self, query: &Query) -> bool {
        self.kept.contains_key(query)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&Query, &Vec<Answer>)> {
        self.kept.iter()
    }
    /// How many entries were computed by an evaluator rather than merged in.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Merges another cache; entries already kept here win.
    pub fn extend(&mut self, other: AnswerCache) {
        for (query, answers) in other.kept {
            self.keep(query, answers);
        }
    }

    /// Drops every entry whose query is not among `queries`.
    pub fn retain_only<'q>(&mut self, queries: impl IntoIterator<Item = &'q Query>) {
        let keep: HashSet<&Query, QueryHasher> = queries.into_iter().collect();
        self.kept.retain(|query, _| keep.contains(query));
    }

    /// Evaluates every query not yet kept, in chunks of `chunk_size` spread over
    /// `num_procs` worker threads. Chunks return their own answers, which are
    /// merged only after all of them finished; any failure aborts the batch.
    /// Returns the number of queries sent to the evaluator.
    pub fn evaluate<E: Evaluator>(
        &mut self,
        queries: &[Query],
        shadows: &[E::Shadow],
        evaluator: &E,
        chunk_size: usize,
        num_procs: usize,
    ) -> Result<usize> {
        let mut seen: HashSet<&Query, QueryHasher> = HashSet::default();
        let pending: Vec<&Query> = queries
            .iter()
            .filter(|q| !self.contains(q) && seen.insert(*q))
            .collect();
        let hits = queries.len() - pending.len();
        if pending.is_empty() {
            debug!(hits, "every candidate already answered");
            return Ok(0);
        }
        let chunk_size = chunk_size.max(1);

        let slices: Vec<Vec<(Query, Vec<Answer>)>> = match num_procs {
            0 | 1 => pending
                .chunks(chunk_size)
                .map(|chunk| answer_chunk(chunk, shadows, evaluator))
                .collect::<Result<_>>()?,
            n => {
                let pool = ThreadPoolBuilder::new().num_threads(n).build()?;
                pool.install(|| {
                    pending
                        .par_chunks(chunk_size)
                        .map(|chunk| answer_chunk(chunk, shadows, evaluator))
                        .collect::<Result<_>>()
                })?
            }
        };

        let evaluated = pending.len();
        for (query, answers) in slices.into_iter().flatten() {
            self.store(query, answers);
        }
        info!(evaluated, hits, shadows = shadows.len(), workers = num_procs, "candidate answers computed");
        Ok(evaluated)
    }

    /// Evaluates a single query on the calling thread. Returns `true` on a cache hit.
    pub fn evaluate_one<E: Evaluator>(&mut self, query: &Query, shadows: &[E::Shadow], evaluator: &E) -> Result<bool> {
        if self.contains(query) {
            return Ok(true);
        }
        let (query, answers) = answer_query(query, shadows, evaluator)?;
        self.store(query, answers);
        Ok(false)
    }

    fn store(&mut self, query: Query, answers: Vec<Answer>) {
        if !self.keep(query, answers) {
            self.evaluations += 1;
        }
    }
}

fn answer_query<E: Evaluator>(query: &Query, shadows: &[E::Shadow], evaluator: &E) -> Result<(Query, Vec<Answer>)> {
    let answers = shadows
        .iter()
        .map(|shadow| evaluator.answer(query, shadow))
        .collect::<Result<Vec<_>>>()?;
    Ok((query.clone(), answers))
}

fn answer_chunk<E: Evaluator>(
    chunk: &[&Query],
    shadows: &[E::Shadow],
    evaluator: &E,
) -> Result<Vec<(Query, Vec<Answer>)>> {
    chunk.iter().map(|q| answer_query(q, shadows, evaluator)).collect()
}

// serialized as a list of entries, since queries are not string keys
impl Serialize for AnswerCache {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut entries: Vec<(&Query, &Vec<Answer>)> = self.kept.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        serializer.collect_seq(entries)
    }
}

impl<'de> Deserialize<'de> for AnswerCache {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = Vec::<(Query, Vec<Answer>)>::deserialize(deserializer)?;
        let mut cache = AnswerCache::new();
        for (query, answers) in entries {
            cache.keep(query, answers);
        }
        Ok(cache)
    }
}
