//! Handlers for the post listing and the post edit form.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::REFERER},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Multipart;
use url::Url;

use crate::{
    application::{
        error::HttpError,
        post_edit::{Navigation, POSTS_LISTING_PATH, PostEditForm},
    },
    domain::entities::PostId,
    infra::http::{HttpState, repo_error_to_http},
    presentation::views::{
        PostEditTemplate, PostEditView, PostListTemplate, PostListView, render_template_response,
    },
};

use super::multipart::{EditPayloadError, read_edit_payload};

const LISTING_LIMIT: u32 = 50;

pub(crate) async fn post_list(State(state): State<HttpState>) -> Response {
    let records = match state.posts.list_recent(LISTING_LIMIT).await {
        Ok(records) => records,
        Err(err) => return repo_error_to_http("infra::http::post_list", err).into_response(),
    };

    let view = PostListView::from_records(&records);
    render_template_response(PostListTemplate { view }, StatusCode::OK)
}

pub(crate) async fn post_edit(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut form = PostEditForm::new(PostId::new(id));
    form.load(&state.posts).await;

    let cancel_href = headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(safe_return_target)
        .unwrap_or_else(|| POSTS_LISTING_PATH.to_string());

    render_edit_form(&form, cancel_href)
}

pub(crate) async fn post_update(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let payload = match read_edit_payload(&mut multipart).await {
        Ok(payload) => payload,
        Err(err) => return payload_error(err, state.upload_limit_bytes).into_response(),
    };

    let cancel_href = payload
        .return_to
        .as_deref()
        .and_then(safe_return_target)
        .unwrap_or_else(|| POSTS_LISTING_PATH.to_string());

    let mut form = PostEditForm::new(PostId::new(id));
    form.apply(payload.fields);

    match form.submit(&state.posts, payload.upload).await {
        Some(Navigation::To(path)) => Redirect::to(&path).into_response(),
        _ => render_edit_form(&form, cancel_href),
    }
}

fn render_edit_form(form: &PostEditForm, cancel_href: String) -> Response {
    let view = PostEditView::from_form(form, cancel_href);
    render_template_response(PostEditTemplate { view }, StatusCode::OK)
}

/// Accept site-relative paths and absolute http(s) URLs as the cancel target.
///
/// Browsers read `\` as `/` and drop tabs and newlines, so a relative path
/// carrying either could turn into a scheme-relative link to another host.
fn safe_return_target(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.contains('\\') || raw.chars().any(char::is_control) {
        return None;
    }
    if raw.starts_with('/') && !raw.starts_with("//") {
        return Some(raw.to_string());
    }

    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn payload_error(err: EditPayloadError, limit_bytes: u64) -> HttpError {
    const SOURCE: &str = "infra::http::post_update";
    match err {
        EditPayloadError::PayloadTooLarge => {
            let limit_mib = limit_bytes.div_ceil(1_048_576);
            HttpError::new(
                SOURCE,
                StatusCode::PAYLOAD_TOO_LARGE,
                "Attachment is too large",
                format!("request exceeded the {limit_mib} MiB upload limit"),
            )
        }
        EditPayloadError::InvalidFormData => HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Form data was invalid",
            "multipart body could not be parsed",
        ),
        EditPayloadError::Read { detail } => HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Form data could not be read",
            detail,
        ),
    }
}
