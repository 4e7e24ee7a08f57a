mod health;
mod media;
mod middleware;
mod posts;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    response::Redirect,
    routing::get,
};

use crate::application::error::HttpError;
use crate::application::post_edit::{POSTS_LISTING_PATH, PostEditService};
use crate::application::repos::RepoError;
use crate::infra::uploads::FilesystemMediaStorage;

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostEditService>,
    /// Present only when media lives on the local filesystem.
    pub media_files: Option<Arc<FilesystemMediaStorage>>,
    pub upload_limit_bytes: u64,
}

pub fn build_router(state: HttpState) -> Router {
    let upload_body_limit = usize::try_from(state.upload_limit_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(root_redirect))
        .route("/posts", get(posts::post_list))
        .route(
            "/posts/{id}/edit",
            get(posts::post_edit)
                .post(posts::post_update)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/media/{*key}", get(media::serve_media))
        .route("/_health", get(health::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn root_redirect() -> Redirect {
    Redirect::to(POSTS_LISTING_PATH)
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Integrity { message } => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            message,
        ),
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Database timeout",
            "Database timeout",
        ),
        RepoError::Transport(message) => HttpError::new(
            source,
            StatusCode::BAD_GATEWAY,
            "Data store unreachable",
            message,
        ),
        RepoError::Remote { status, message } => HttpError::new(
            source,
            StatusCode::BAD_GATEWAY,
            "Data store rejected the request",
            format!("remote status {status}: {message}"),
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    }
}
