//! qbs_search – search for query workloads that expose a target record.
//!
//! A query-based system (QBS) answers aggregate queries over a hidden dataset.
//! This crate looks for a small set of queries whose answers, computed on
//! locally controlled *shadow* systems, best reveal whether a target record is
//! present in the hidden dataset or what its attributes are.
//!
//! ## Modules
//! * [`query`] – Structured queries ([`query::Query`]) used as cache keys, with
//!   their canonical SQL or tri-state rendering.
//! * [`schema`] – Columns, value distributions and the [`schema::TargetRecord`].
//! * [`encoder`] – Randomized synthesis of one query near the target record.
//! * [`pool`] – The seeded, ordered [`pool::QueuePool`] of candidates, with an
//!   optional warm-start prefix.
//! * [`answers`] – The [`answers::Evaluator`] oracle and the write-once
//!   [`answers::AnswerCache`], filled in parallel.
//! * [`search`] – The rotate-and-append [`search::SearchLoop`].
//! * [`searcher`] – [`searcher::QuerySearcher::search_for_this_syntax`], the entry point.
//! * [`config`] – [`config::SearchConfig`], loadable from a file and the environment.
//! * [`logging`] – Tracing subscriber setup.
//!
//! ## Determinism
//! Query synthesis consumes a single generator seeded from
//! [`config::SearchConfig::seed`] and runs on one thread. Only the evaluation
//! of the candidate pool is parallel, and its results are merged into the
//! cache after every worker finished, so runs with equal seeds and
//! deterministic evaluators produce equal outcomes regardless of `num_procs`.

pub mod answers;
pub mod config;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod pool;
pub mod query;
pub mod schema;
pub mod search;
pub mod searcher;

pub use error::{Result, SearchError};
