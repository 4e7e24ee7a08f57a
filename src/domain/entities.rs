use std::fmt;

/// Opaque post identifier as supplied by the route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostId(String);

impl PostId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: PostId,
    pub board_id: String,
    pub movie_name: String,
    pub content: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

/// The user-editable text fields of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFields {
    pub board_id: String,
    pub movie_name: String,
    pub content: String,
}

impl From<&PostRecord> for PostFields {
    fn from(record: &PostRecord) -> Self {
        Self {
            board_id: record.board_id.clone(),
            movie_name: record.movie_name.clone(),
            content: record.content.clone(),
        }
    }
}
