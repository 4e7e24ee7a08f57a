use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;

use crate::application::error::HttpError;
use crate::application::post_edit::{POSTS_LISTING_PATH, PostEditForm};
use crate::domain::entities::{PostId, PostRecord};

const SUBMIT_LABEL: &str = "Save post";
const BUSY_LABEL: &str = "Saving post…";
const EXCERPT_CHARS: usize = 120;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|error| {
        TemplateRenderError {
            source: "presentation::views::render_template",
            public_message: "Template rendering failed",
            error,
        }
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Everything but unreserved characters is encoded, `/` included.
const ID_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Path of the edit page for `id`, with the id percent-encoded as one segment.
pub fn edit_href(id: &PostId) -> String {
    let segment = utf8_percent_encode(id.as_str(), ID_SEGMENT);
    format!("{POSTS_LISTING_PATH}/{segment}/edit")
}

#[derive(Clone)]
pub struct PostEditView {
    pub action: String,
    pub board_id: String,
    pub movie_name: String,
    pub content: String,
    pub has_error: bool,
    pub error: String,
    pub busy: bool,
    pub submit_label: &'static str,
    pub busy_label: &'static str,
    pub cancel_href: String,
}

impl PostEditView {
    pub fn from_form(form: &PostEditForm, cancel_href: String) -> Self {
        let fields = form.fields();
        let busy = form.is_busy();
        Self {
            action: edit_href(form.post_id()),
            board_id: fields.board_id.clone(),
            movie_name: fields.movie_name.clone(),
            content: fields.content.clone(),
            has_error: form.error().is_some(),
            error: form.error().unwrap_or_default().to_string(),
            busy,
            submit_label: if busy { BUSY_LABEL } else { SUBMIT_LABEL },
            busy_label: BUSY_LABEL,
            cancel_href,
        }
    }
}

#[derive(Template)]
#[template(path = "posts/edit.html")]
pub struct PostEditTemplate {
    pub view: PostEditView,
}

#[derive(Clone)]
pub struct PostRowView {
    pub board_id: String,
    pub movie_name: String,
    pub excerpt: String,
    pub media_label: &'static str,
    pub edit_href: String,
}

impl From<&PostRecord> for PostRowView {
    fn from(record: &PostRecord) -> Self {
        let media_label = match (&record.image_url, &record.video_url) {
            (Some(_), _) => "Image",
            (None, Some(_)) => "Video",
            (None, None) => "",
        };

        Self {
            board_id: record.board_id.clone(),
            movie_name: record.movie_name.clone(),
            excerpt: excerpt(&record.content),
            media_label,
            edit_href: edit_href(&record.id),
        }
    }
}

fn excerpt(content: &str) -> String {
    let trimmed = content.trim();
    match trimmed.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[derive(Clone)]
pub struct PostListView {
    pub posts: Vec<PostRowView>,
}

impl PostListView {
    pub fn from_records(records: &[PostRecord]) -> Self {
        Self {
            posts: records.iter().map(PostRowView::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

#[derive(Template)]
#[template(path = "posts/list.html")]
pub struct PostListTemplate {
    pub view: PostListView,
}
