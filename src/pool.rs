//! The ordered queue of candidate queries a search consumes.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::encoder::QueryEncoder;
use crate::error::{Result, SearchError};
use crate::query::{Encoding, Query};

/// Candidates in consumption order: the warm-start queue first, then freshly
/// synthesized queries. Duplicates are allowed. Frozen once built.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuePool {
    queries: Vec<Query>,
    warm_start_len: usize,
}

impl QueuePool {
    /// Number of fresh queries to synthesize on top of a warm start of `warm_start_len`.
    /// Negative when the warm start already covers the run; `build` then generates none.
    pub fn target_size(config: &SearchConfig, warm_start_len: usize) -> isize {
        config.required_candidates() as isize - warm_start_len as isize
    }

    pub fn build(config: &SearchConfig, encoder: &QueryEncoder, warm_start: Vec<Query>) -> Result<Self> {
        let expected = if encoder.policy().use_limited_syntax_fast_qbs {
            Encoding::TriState
        } else {
            Encoding::Textual
        };
        if let Some(q) = warm_start.iter().find(|q| q.encoding() != expected) {
            return Err(SearchError::Encoding(format!(
                "warm-start query '{q}' is not {expected:?} like the rest of the run"
            )));
        }

        let target = Self::target_size(config, warm_start.len());
        if target < 0 {
            warn!(
                warm_start = warm_start.len(),
                consumed = config.required_candidates(),
                "warm-start queue is longer than the run consumes; nothing new is generated"
            );
        }
        let target = target.max(0);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
        let warm_start_len = warm_start.len();
        let mut queries = warm_start;
        queries.reserve(target as usize);
        for _ in 0..target {
            queries.push(encoder.encode(&mut rng)?);
        }
        debug!(warm_start = warm_start_len, generated = target, "candidate pool built");
        Ok(Self { queries, warm_start_len })
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<&Query> {
        self.queries.get(index)
    }
    /// The query at `index` wrapped around the pool length.
    pub fn cyclic(&self, index: usize) -> Option<(usize, &Query)> {
        if self.queries.is_empty() {
            return None;
        }
        let i = index % self.queries.len();
        Some((i, &self.queries[i]))
    }
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }
    pub fn warm_start_len(&self) -> usize {
        self.warm_start_len
    }
}
