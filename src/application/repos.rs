//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{PostId, PostRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error("{message}")]
    Remote { status: u16, message: String },
    #[error("data store unreachable: {0}")]
    Transport(String),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Full replacement of the mutable post columns.
///
/// `image_url` and `video_url` are always written, `None` clears them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePostParams {
    pub id: PostId,
    pub board_id: String,
    pub movie_name: String,
    pub content: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_post(&self, id: &PostId) -> Result<Option<PostRecord>, RepoError>;

    async fn list_posts(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError>;

    /// Update by id. Matching no row is not an error.
    async fn update_post(&self, params: UpdatePostParams) -> Result<(), RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}
