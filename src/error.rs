use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Oracle failure: {0}")]
    Oracle(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;

// Helper conversions
impl From<config::ConfigError> for SearchError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<rayon::ThreadPoolBuildError> for SearchError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self { Self::ThreadPool(e.to_string()) }
}
