#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("job not found: {0}")]
    NotFound(String),
    /// The row existed but was not in the state the transition requires,
    /// e.g. recording a failure against a job nobody holds in `Processing`.
    #[error("conflicting state: {0}")]
    Conflict(String),
}
