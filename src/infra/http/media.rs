use axum::{
    extract::{Path, State},
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};

use crate::application::{error::HttpError, storage::StorageError};

use super::HttpState;

const SOURCE: &str = "infra::http::serve_media";

/// Serve an object written by the filesystem backend. Keys are timestamped and never rewritten.
pub(super) async fn serve_media(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Response {
    let Some(storage) = state.media_files.as_ref() else {
        return HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Not found",
            "media is not served by this backend",
        )
        .into_response();
    };

    match storage.read(&key).await {
        Ok(bytes) => {
            let content_type = mime_guess::from_path(&key).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (CONTENT_TYPE, content_type.essence_str().to_string()),
                    (
                        CACHE_CONTROL,
                        "public, max-age=31536000, immutable".to_string(),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(StorageError::InvalidKey) => HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid media path",
            format!("rejected media key `{key}`"),
        )
        .into_response(),
        Err(StorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Not found",
                format!("media `{key}` does not exist"),
            )
            .into_response()
        }
        Err(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not read media",
            &err,
        )
        .into_response(),
    }
}
