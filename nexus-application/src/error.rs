use nexus_domain::error::DomainError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("authorization: {0}")]
    Authorization(String),

    #[error("aggregate not found: {0}")]
    AggregateNotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type AppResult<T> = Result<T, AppError>;
