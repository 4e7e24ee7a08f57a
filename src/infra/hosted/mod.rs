//! Adapter for a hosted database-and-storage service speaking the PostgREST
//! table protocol (`/rest/v1/<table>`) and the companion object API
//! (`/storage/v1/object/<bucket>/<key>`).

mod rows;

use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Response,
    header::{CONTENT_TYPE, HeaderValue},
};
use tracing::warn;
use url::Url;

use crate::application::repos::{PostsRepo, RepoError, UpdatePostParams};
use crate::application::storage::{MediaStorage, StorageError, StoredObject};
use crate::domain::entities::{PostId, PostRecord};
use crate::domain::media::MediaUpload;
use crate::infra::error::InfraError;

use rows::{HostedPostRow, HostedPostUpdate, RemoteErrorBody};

const SOURCE: &str = "cineboard::infra::hosted";

#[derive(Debug, Clone)]
pub struct HostedBackend {
    client: Client,
    base: Url,
    api_key: String,
    table: String,
    bucket: String,
}

impl HostedBackend {
    pub fn new(
        base: Url,
        api_key: impl Into<String>,
        table: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Result<Self, InfraError> {
        if base.cannot_be_a_base() {
            return Err(InfraError::hosted(format!(
                "service url `{base}` cannot carry a path"
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("cineboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::hosted(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            base,
            api_key: api_key.into(),
            table: table.into(),
            bucket: bucket.into(),
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn table_url(&self) -> Url {
        self.endpoint(["rest", "v1", self.table.as_str()])
    }

    fn object_url(&self, key: &str) -> Url {
        self.endpoint(
            ["storage", "v1", "object", self.bucket.as_str()]
                .into_iter()
                .chain(key.split('/')),
        )
    }

    fn public_object_url(&self, key: &str) -> Url {
        self.endpoint(
            ["storage", "v1", "object", "public", self.bucket.as_str()]
                .into_iter()
                .chain(key.split('/')),
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&self.api_key)
    }

    async fn fetch_rows(&self, url: Url) -> Result<Vec<HostedPostRow>, RepoError> {
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|err| RepoError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let (status, message) = remote_error(response).await;
            return Err(RepoError::Remote { status, message });
        }

        response
            .json::<Vec<HostedPostRow>>()
            .await
            .map_err(RepoError::from_persistence)
    }
}

#[async_trait]
impl PostsRepo for HostedBackend {
    async fn find_post(&self, id: &PostId) -> Result<Option<PostRecord>, RepoError> {
        let mut url = self.table_url();
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("id", &format!("eq.{id}"));

        let rows = self.fetch_rows(url).await?;
        if rows.len() > 1 {
            warn!(
                target = SOURCE,
                post_id = %id,
                rows = rows.len(),
                "id filter matched more than one post"
            );
        }
        Ok(rows.into_iter().next().map(PostRecord::from))
    }

    async fn list_posts(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let mut url = self.table_url();
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "id.desc")
            .append_pair("limit", &limit.clamp(1, 200).to_string());

        let rows = self.fetch_rows(url).await?;
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<(), RepoError> {
        let mut url = self.table_url();
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", params.id));

        let body = HostedPostUpdate::from(&params);
        let response = self
            .authorize(self.client.patch(url))
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await
            .map_err(|err| RepoError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let (status, message) = remote_error(response).await;
            return Err(RepoError::Remote { status, message });
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        let mut url = self.table_url();
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("limit", "1");
        self.fetch_rows(url).await.map(|_| ())
    }
}

#[async_trait]
impl MediaStorage for HostedBackend {
    async fn upload(&self, key: &str, upload: &MediaUpload) -> Result<StoredObject, StorageError> {
        let content_type = HeaderValue::from_str(&upload.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

        let response = self
            .authorize(self.client.post(self.object_url(key)))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(upload.bytes.clone())
            .send()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let (status, message) = remote_error(response).await;
            return Err(StorageError::Remote { status, message });
        }

        Ok(StoredObject {
            key: key.to_string(),
            size_bytes: upload.bytes.len() as u64,
        })
    }

    fn public_url(&self, key: &str) -> String {
        self.public_object_url(key).to_string()
    }
}

/// Extract the service's error message, falling back to the raw body or the status reason.
async fn remote_error(response: Response) -> (u16, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<RemoteErrorBody>(&body)
        .ok()
        .and_then(RemoteErrorBody::into_message)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    (status.as_u16(), message)
}
