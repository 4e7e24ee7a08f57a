//! Postgres-backed repository implementations.

use async_trait::async_trait;
use sqlx::{
    FromRow,
    postgres::{PgPool, PgPoolOptions},
    query,
};
use tracing::warn;

use crate::application::repos::{PostsRepo, RepoError, UpdatePostParams};
use crate::domain::entities::{PostId, PostRecord};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct PostRow {
    id: String,
    board_id: String,
    movie_name: String,
    content: String,
    image_url: Option<String>,
    video_url: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
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

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn find_post(&self, id: &PostId) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, board_id, movie_name, content, image_url, video_url
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn list_posts(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, board_id, movie_name, content, image_url, video_url
            FROM posts
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit.clamp(1, 200)))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<(), RepoError> {
        let UpdatePostParams {
            id,
            board_id,
            movie_name,
            content,
            image_url,
            video_url,
        } = params;

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET board_id = $2,
                movie_name = $3,
                content = $4,
                image_url = $5,
                video_url = $6,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(board_id)
        .bind(movie_name)
        .bind(content)
        .bind(image_url)
        .bind(video_url)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            warn!(
                target = "cineboard::infra::db",
                post_id = %id,
                "update matched no post"
            );
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db)
            if db.message().contains("invalid input syntax")
                || db.message().contains("value too long") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("violates") => RepoError::Integrity {
            message: db.message().to_string(),
        },
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}
