//! Multipart parsing for the edit form.

use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use axum_extra::extract::multipart::MultipartError;
use tracing::error;

use crate::domain::entities::PostFields;
use crate::domain::media::MediaUpload;

const SOURCE: &str = "infra::http::post_edit_multipart";

pub(super) struct EditPayload {
    pub(super) fields: PostFields,
    pub(super) return_to: Option<String>,
    pub(super) upload: Option<MediaUpload>,
}

#[derive(Debug)]
pub(super) enum EditPayloadError {
    PayloadTooLarge,
    InvalidFormData,
    Read { detail: String },
}

impl From<MultipartError> for EditPayloadError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        error!(
            target = SOURCE,
            status = status.as_u16(),
            error = %err,
            "failed to read multipart payload"
        );
        match status {
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge,
            StatusCode::BAD_REQUEST => Self::InvalidFormData,
            _ => Self::Read {
                detail: err.to_string(),
            },
        }
    }
}

pub(super) async fn read_edit_payload(
    multipart: &mut Multipart,
) -> Result<EditPayload, EditPayloadError> {
    let mut fields = PostFields::default();
    let mut return_to = None;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("board_id") => fields.board_id = field.text().await?,
            Some("movie_name") => fields.movie_name = field.text().await?,
            Some("content") => fields.content = field.text().await?,
            Some("return_to") => {
                let value = field.text().await?;
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return_to = Some(trimmed.to_string());
                }
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(|value| value.trim().to_string())
                    .unwrap_or_default();
                let declared_type = field.content_type().map(|mime| mime.to_string());
                let bytes = field.bytes().await?;

                // An untouched file input still submits an empty, unnamed part.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }

                let content_type = declared_type
                    .filter(|value| !value.is_empty() && value != "application/octet-stream")
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&file_name)
                            .first_or_octet_stream()
                            .essence_str()
                            .to_string()
                    });

                upload = Some(MediaUpload::new(file_name, content_type, bytes));
            }
            _ => continue,
        }
    }

    Ok(EditPayload {
        fields,
        return_to,
        upload,
    })
}
