//! Post edit workflow: load one post into an editable form, then persist the
//! edited fields together with an optional replacement attachment.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::application::repos::{PostsRepo, RepoError, UpdatePostParams};
use crate::application::storage::{MediaStorage, StorageError};
use crate::domain::entities::{PostFields, PostId, PostRecord};
use crate::domain::media::{MediaKind, MediaUpload, object_key};

/// Where a successful save sends the user.
pub const POSTS_LISTING_PATH: &str = "/posts";

const SOURCE: &str = "cineboard::application::post_edit";

pub type Clock = fn() -> OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    To(String),
    Back,
}

#[derive(Debug, Error)]
pub enum PostEditError {
    #[error("post `{0}` was not found")]
    NotFound(PostId),
    #[error("could not load post: {0}")]
    Fetch(#[source] RepoError),
    #[error("could not upload media: {0}")]
    Upload(#[source] StorageError),
    #[error("could not update post: {0}")]
    Update(#[source] RepoError),
}

impl PostEditError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::Fetch(_) => "fetch",
            Self::Upload(_) => "upload",
            Self::Update(_) => "update",
        }
    }
}

/// Attachment URLs written by one save. At most one is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaUrls {
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Clone)]
pub struct PostEditService {
    posts: Arc<dyn PostsRepo>,
    media: Arc<dyn MediaStorage>,
    clock: Clock,
}

impl PostEditService {
    pub fn new(posts: Arc<dyn PostsRepo>, media: Arc<dyn MediaStorage>) -> Self {
        Self {
            posts,
            media,
            clock: OffsetDateTime::now_utc,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn load_post(&self, id: &PostId) -> Result<PostRecord, PostEditError> {
        self.posts
            .find_post(id)
            .await
            .map_err(PostEditError::Fetch)?
            .ok_or_else(|| PostEditError::NotFound(id.clone()))
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        self.posts.list_posts(limit).await
    }

    pub async fn health_check(&self) -> Result<(), RepoError> {
        self.posts.health_check().await
    }

    /// Upload `upload` and resolve its public URL.
    ///
    /// Files that are neither images nor videos are skipped and yield no URLs.
    pub async fn attach_media(&self, upload: &MediaUpload) -> Result<MediaUrls, PostEditError> {
        let Some(kind) = upload.kind() else {
            warn!(
                target = SOURCE,
                file_name = %upload.file_name,
                content_type = %upload.content_type,
                "ignoring attachment with unsupported content type"
            );
            return Ok(MediaUrls::default());
        };

        let key = object_key(kind, (self.clock)(), &upload.file_name);
        let stored = self
            .media
            .upload(&key, upload)
            .await
            .map_err(PostEditError::Upload)?;
        counter!("cineboard_media_upload_total", "kind" => kind.as_str()).increment(1);

        let public_url = self.media.public_url(&stored.key);
        info!(
            target = SOURCE,
            key = %stored.key,
            size_bytes = stored.size_bytes,
            kind = kind.as_str(),
            "stored post attachment"
        );

        Ok(match kind {
            MediaKind::Image => MediaUrls {
                image_url: Some(public_url),
                video_url: None,
            },
            MediaKind::Video => MediaUrls {
                image_url: None,
                video_url: Some(public_url),
            },
        })
    }

    /// Persist `fields` for `id`. Both attachment URLs are overwritten on every
    /// save, so saving without a file clears any previous attachment.
    pub async fn save(
        &self,
        id: &PostId,
        fields: &PostFields,
        upload: Option<&MediaUpload>,
    ) -> Result<(), PostEditError> {
        let urls = match upload {
            Some(upload) => self.attach_media(upload).await?,
            None => MediaUrls::default(),
        };

        let params = UpdatePostParams {
            id: id.clone(),
            board_id: fields.board_id.clone(),
            movie_name: fields.movie_name.clone(),
            content: fields.content.clone(),
            image_url: urls.image_url,
            video_url: urls.video_url,
        };

        self.posts
            .update_post(params)
            .await
            .map_err(PostEditError::Update)?;
        counter!("cineboard_post_update_total").increment(1);
        debug!(target = SOURCE, post_id = %id, "post updated");
        Ok(())
    }
}

/// Transient editing state for one post.
#[derive(Debug, Clone)]
pub struct PostEditForm {
    post_id: PostId,
    fields: PostFields,
    busy: bool,
    error: Option<String>,
    loaded: bool,
}

impl PostEditForm {
    pub fn new(post_id: PostId) -> Self {
        Self {
            post_id,
            fields: PostFields::default(),
            busy: false,
            error: None,
            loaded: false,
        }
    }

    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }

    pub fn fields(&self) -> &PostFields {
        &self.fields
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_board_id(&mut self, value: impl Into<String>) {
        self.fields.board_id = value.into();
    }

    pub fn set_movie_name(&mut self, value: impl Into<String>) {
        self.fields.movie_name = value.into();
    }

    pub fn set_content(&mut self, value: impl Into<String>) {
        self.fields.content = value.into();
    }

    /// Replace all editable fields at once, as a submitted form does.
    pub fn apply(&mut self, fields: PostFields) {
        self.fields = fields;
    }

    /// Fetch the post and copy its fields into the form. Runs at most once per form.
    pub async fn load(&mut self, service: &PostEditService) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        match service.load_post(&self.post_id).await {
            Ok(record) => self.fields = PostFields::from(&record),
            Err(err) => {
                warn!(
                    target = SOURCE,
                    post_id = %self.post_id,
                    error = %err,
                    "failed to load post for editing"
                );
                counter!("cineboard_post_edit_failure_total", "stage" => err.stage()).increment(1);
                self.error = Some(err.to_string());
            }
        }
    }

    /// Save the current fields. Returns where to navigate on success; on
    /// failure the message is kept in [`PostEditForm::error`] and `None` is returned.
    pub async fn submit(
        &mut self,
        service: &PostEditService,
        upload: Option<MediaUpload>,
    ) -> Option<Navigation> {
        self.busy = true;
        let result = service
            .save(&self.post_id, &self.fields, upload.as_ref())
            .await;
        self.busy = false;

        match result {
            Ok(()) => Some(Navigation::To(POSTS_LISTING_PATH.to_string())),
            Err(err) => {
                warn!(
                    target = SOURCE,
                    post_id = %self.post_id,
                    stage = err.stage(),
                    error = %err,
                    "post edit submission failed"
                );
                counter!("cineboard_post_edit_failure_total", "stage" => err.stage()).increment(1);
                self.error = Some(err.to_string());
                None
            }
        }
    }

    /// Abandon the edit without saving.
    pub fn cancel(self) -> Navigation {
        Navigation::Back
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;
    use time::macros::datetime;

    use crate::application::storage::StoredObject;

    #[derive(Default)]
    struct StubPostsRepo {
        record: Option<PostRecord>,
        find_error: Option<String>,
        update_error: Option<String>,
        finds: Mutex<u32>,
        updates: Mutex<Vec<UpdatePostParams>>,
    }

    #[async_trait]
    impl PostsRepo for StubPostsRepo {
        async fn find_post(&self, id: &PostId) -> Result<Option<PostRecord>, RepoError> {
            *self.finds.lock().unwrap() += 1;
            if let Some(message) = &self.find_error {
                return Err(RepoError::Remote {
                    status: 500,
                    message: message.clone(),
                });
            }
            Ok(self.record.clone().filter(|record| &record.id == id))
        }

        async fn list_posts(&self, _limit: u32) -> Result<Vec<PostRecord>, RepoError> {
            Ok(self.record.clone().into_iter().collect())
        }

        async fn update_post(&self, params: UpdatePostParams) -> Result<(), RepoError> {
            if let Some(message) = &self.update_error {
                return Err(RepoError::Integrity {
                    message: message.clone(),
                });
            }
            self.updates.lock().unwrap().push(params);
            Ok(())
        }

        async fn health_check(&self) -> Result<(), RepoError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingStorage {
        error: Option<String>,
        uploads: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MediaStorage for RecordingStorage {
        async fn upload(
            &self,
            key: &str,
            upload: &MediaUpload,
        ) -> Result<StoredObject, StorageError> {
            if let Some(message) = &self.error {
                return Err(StorageError::Remote {
                    status: 400,
                    message: message.clone(),
                });
            }
            self.uploads
                .lock()
                .unwrap()
                .push((key.to_string(), upload.content_type.clone()));
            Ok(StoredObject {
                key: key.to_string(),
                size_bytes: upload.bytes.len() as u64,
            })
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://cdn.test/media/{key}")
        }
    }

    fn fixed_clock() -> OffsetDateTime {
        datetime!(2024-03-01 12:00:00.123 UTC)
    }

    fn dune() -> PostRecord {
        PostRecord {
            id: PostId::new("42"),
            board_id: "movies".into(),
            movie_name: "Dune".into(),
            content: "great".into(),
            image_url: Some("https://cdn.test/media/images/1_old.png".into()),
            video_url: None,
        }
    }

    fn service(
        repo: Arc<StubPostsRepo>,
        storage: Arc<RecordingStorage>,
    ) -> PostEditService {
        PostEditService::new(repo, storage).with_clock(fixed_clock)
    }

    fn upload(name: &str, content_type: &str) -> MediaUpload {
        MediaUpload::new(name, content_type, Bytes::from_static(b"payload"))
    }

    async fn loaded_form(service: &PostEditService) -> PostEditForm {
        let mut form = PostEditForm::new(PostId::new("42"));
        form.load(service).await;
        form
    }

    #[tokio::test]
    async fn load_populates_fields_from_record() {
        let repo = Arc::new(StubPostsRepo {
            record: Some(dune()),
            ..Default::default()
        });
        let service = service(repo, Arc::default());

        let form = loaded_form(&service).await;

        assert_eq!(form.fields().board_id, "movies");
        assert_eq!(form.fields().movie_name, "Dune");
        assert_eq!(form.fields().content, "great");
        assert_eq!(form.error(), None);
        assert!(!form.is_busy());
    }

    #[tokio::test]
    async fn load_missing_record_leaves_fields_empty_and_reports_error() {
        let service = service(Arc::default(), Arc::default());

        let form = loaded_form(&service).await;

        assert_eq!(form.fields(), &PostFields::default());
        assert_eq!(form.error(), Some("post `42` was not found"));
    }

    #[tokio::test]
    async fn load_failure_surfaces_store_message() {
        let repo = Arc::new(StubPostsRepo {
            record: Some(dune()),
            find_error: Some("JWT expired".into()),
            ..Default::default()
        });
        let service = service(repo, Arc::default());

        let form = loaded_form(&service).await;

        assert_eq!(form.fields(), &PostFields::default());
        assert_eq!(form.error(), Some("could not load post: JWT expired"));
    }

    #[tokio::test]
    async fn load_runs_once_per_form() {
        let repo = Arc::new(StubPostsRepo {
            record: Some(dune()),
            ..Default::default()
        });
        let service = service(repo.clone(), Arc::default());

        let mut form = loaded_form(&service).await;
        form.set_content("edited");
        form.load(&service).await;

        assert_eq!(*repo.finds.lock().unwrap(), 1);
        assert_eq!(form.fields().content, "edited");
    }

    #[tokio::test]
    async fn submit_without_file_clears_both_urls() {
        let repo = Arc::new(StubPostsRepo {
            record: Some(dune()),
            ..Default::default()
        });
        let storage = Arc::new(RecordingStorage::default());
        let service = service(repo.clone(), storage.clone());

        let mut form = loaded_form(&service).await;
        let navigation = form.submit(&service, None).await;

        assert_eq!(navigation, Some(Navigation::To("/posts".into())));
        assert!(storage.uploads.lock().unwrap().is_empty());
        assert_eq!(
            repo.updates.lock().unwrap().as_slice(),
            &[UpdatePostParams {
                id: PostId::new("42"),
                board_id: "movies".into(),
                movie_name: "Dune".into(),
                content: "great".into(),
                image_url: None,
                video_url: None,
            }]
        );
    }

    #[tokio::test]
    async fn submit_with_image_sets_image_url_only() {
        let repo = Arc::new(StubPostsRepo {
            record: Some(dune()),
            ..Default::default()
        });
        let storage = Arc::new(RecordingStorage::default());
        let service = service(repo.clone(), storage.clone());

        let mut form = loaded_form(&service).await;
        form.set_movie_name("Dune: Part Two");
        let navigation = form
            .submit(&service, Some(upload("poster.png", "image/png")))
            .await;

        assert_eq!(navigation, Some(Navigation::To("/posts".into())));
        assert_eq!(
            storage.uploads.lock().unwrap().as_slice(),
            &[(
                "images/1709294400123_poster.png".to_string(),
                "image/png".to_string()
            )]
        );
        let updates = repo.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].movie_name, "Dune: Part Two");
        assert_eq!(
            updates[0].image_url.as_deref(),
            Some("https://cdn.test/media/images/1709294400123_poster.png")
        );
        assert_eq!(updates[0].video_url, None);
    }

    #[tokio::test]
    async fn submit_with_video_sets_video_url_only() {
        let repo = Arc::new(StubPostsRepo {
            record: Some(dune()),
            ..Default::default()
        });
        let service = service(repo.clone(), Arc::default());

        let mut form = loaded_form(&service).await;
        form.submit(&service, Some(upload("trailer.mp4", "video/mp4")))
            .await;

        let updates = repo.updates.lock().unwrap();
        assert_eq!(updates[0].image_url, None);
        assert_eq!(
            updates[0].video_url.as_deref(),
            Some("https://cdn.test/media/videos/1709294400123_trailer.mp4")
        );
    }

    #[tokio::test]
    async fn submit_with_unsupported_file_skips_upload() {
        let repo = Arc::new(StubPostsRepo {
            record: Some(dune()),
            ..Default::default()
        });
        let storage = Arc::new(RecordingStorage::default());
        let service = service(repo.clone(), storage.clone());

        let mut form = loaded_form(&service).await;
        let navigation = form
            .submit(&service, Some(upload("notes.pdf", "application/pdf")))
            .await;

        assert!(navigation.is_some());
        assert!(storage.uploads.lock().unwrap().is_empty());
        let updates = repo.updates.lock().unwrap();
        assert_eq!(updates[0].image_url, None);
        assert_eq!(updates[0].video_url, None);
    }

    #[tokio::test]
    async fn failed_upload_prevents_update() {
        let repo = Arc::new(StubPostsRepo {
            record: Some(dune()),
            ..Default::default()
        });
        let storage = Arc::new(RecordingStorage {
            error: Some("The resource already exists".into()),
            ..Default::default()
        });
        let service = service(repo.clone(), storage);

        let mut form = loaded_form(&service).await;
        let navigation = form
            .submit(&service, Some(upload("poster.png", "image/png")))
            .await;

        assert_eq!(navigation, None);
        assert!(repo.updates.lock().unwrap().is_empty());
        assert_eq!(
            form.error(),
            Some("could not upload media: The resource already exists")
        );
        assert!(!form.is_busy());
    }

    #[tokio::test]
    async fn failed_update_does_not_navigate() {
        let repo = Arc::new(StubPostsRepo {
            record: Some(dune()),
            update_error: Some("value too long".into()),
            ..Default::default()
        });
        let service = service(repo, Arc::default());

        let mut form = loaded_form(&service).await;
        let navigation = form.submit(&service, None).await;

        assert_eq!(navigation, None);
        assert_eq!(
            form.error(),
            Some("could not update post: integrity error: value too long")
        );
        assert!(!form.is_busy());
        assert_eq!(form.fields().movie_name, "Dune");
    }

    #[test]
    fn cancel_navigates_back() {
        let mut form = PostEditForm::new(PostId::new("42"));
        form.set_board_id("unsaved");
        assert_eq!(form.cancel(), Navigation::Back);
    }
}
