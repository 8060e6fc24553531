use socops_core::ports::{StoreError, UpstreamError};
use socops_core::{CoreError, PostStatus};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The batch was cancelled before this unit of work completed.
    #[error("cancelled")]
    Cancelled,

    #[error("post {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: PostStatus,
        to: PostStatus,
    },
}

impl From<CoreError> for PipelineError {
    fn from(err: CoreError) -> Self {
        PipelineError::InvalidInput(err.to_string())
    }
}

impl PipelineError {
    pub(crate) fn post_not_found(id: Uuid) -> Self {
        PipelineError::NotFound {
            entity: "post",
            id: id.to_string(),
        }
    }
}
