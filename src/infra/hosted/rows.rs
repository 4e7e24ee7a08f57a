//! Wire shapes exchanged with the hosted service.

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use crate::application::repos::UpdatePostParams;
use crate::domain::entities::{PostId, PostRecord};

#[derive(Debug, Deserialize)]
pub(super) struct HostedPostRow {
    #[serde(deserialize_with = "lenient_text")]
    id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    board_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    movie_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    content: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
}

impl From<HostedPostRow> for PostRecord {
    fn from(row: HostedPostRow) -> Self {
        Self {
            id: PostId::new(row.id),
            board_id: row.board_id,
            movie_name: row.movie_name,
            content: row.content,
            image_url: row.image_url,
            video_url: row.video_url,
        }
    }
}

/// Columns may be numeric or null depending on the remote schema; the form only deals in text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected text or number, found {other}"
        ))),
    }
}

/// PATCH body. Attachment columns serialize as `null` when absent.
#[derive(Debug, Serialize)]
pub(super) struct HostedPostUpdate<'a> {
    board_id: &'a str,
    movie_name: &'a str,
    content: &'a str,
    image_url: Option<&'a str>,
    video_url: Option<&'a str>,
}

impl<'a> From<&'a UpdatePostParams> for HostedPostUpdate<'a> {
    fn from(params: &'a UpdatePostParams) -> Self {
        Self {
            board_id: &params.board_id,
            movie_name: &params.movie_name,
            content: &params.content,
            image_url: params.image_url.as_deref(),
            video_url: params.video_url.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RemoteErrorBody {
    message: Option<String>,
    error: Option<String>,
    msg: Option<String>,
}

impl RemoteErrorBody {
    pub(super) fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error)
            .filter(|message| !message.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_accepts_numeric_ids_and_null_text() {
        let row: HostedPostRow = serde_json::from_value(json!({
            "id": 42,
            "board_id": "movies",
            "movie_name": "Dune",
            "content": null,
            "image_url": null,
            "created_at": "2024-03-01T12:00:00+00:00"
        }))
        .unwrap();

        let record = PostRecord::from(row);
        assert_eq!(record.id, PostId::new("42"));
        assert_eq!(record.board_id, "movies");
        assert_eq!(record.content, "");
        assert_eq!(record.image_url, None);
        assert_eq!(record.video_url, None);
    }

    #[test]
    fn update_body_writes_explicit_nulls() {
        let params = UpdatePostParams {
            id: PostId::new("42"),
            board_id: "movies".into(),
            movie_name: "Dune".into(),
            content: "great".into(),
            image_url: None,
            video_url: None,
        };

        let body = serde_json::to_value(HostedPostUpdate::from(&params)).unwrap();
        assert_eq!(
            body,
            json!({
                "board_id": "movies",
                "movie_name": "Dune",
                "content": "great",
                "image_url": null,
                "video_url": null
            })
        );
    }

    #[test]
    fn error_body_prefers_message() {
        let body: RemoteErrorBody = serde_json::from_value(json!({
            "statusCode": "409",
            "error": "Duplicate",
            "message": "The resource already exists"
        }))
        .unwrap();
        assert_eq!(
            body.into_message().as_deref(),
            Some("The resource already exists")
        );
    }
}
