use thiserror::Error;

/// Failure of the mock upstream data source. Zero matches from a valid query
/// is never an error; it is an ordinary empty result.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("upstream data unavailable: {0}")]
    Unavailable(String),
}

/// Malformed filter/sort/page input. Returned, never thrown: the pipeline is
/// invoked synchronously on every query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
