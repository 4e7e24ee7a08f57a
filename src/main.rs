use std::{process, sync::Arc, time::Duration};

use cineboard::{
    application::{
        error::AppError,
        post_edit::PostEditService,
        repos::PostsRepo,
        storage::MediaStorage,
    },
    config::{self, BackendKind},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        hosted::HostedBackend,
        http::{self, HttpState},
        telemetry,
        uploads::FilesystemMediaStorage,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = match settings.backend {
        BackendKind::Postgres => postgres_state(&settings).await?,
        BackendKind::Hosted => hosted_state(&settings)?,
    };

    info!(
        target = "cineboard::main",
        backend = ?settings.backend,
        addr = %settings.server.addr,
        "starting http server"
    );
    serve_http(&settings, state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    connect_postgres(&settings).await?;
    info!(target = "cineboard::main", "database migrations applied");
    Ok(())
}

async fn connect_postgres(settings: &config::Settings) -> Result<PostgresRepositories, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(PostgresRepositories::new(pool))
}

async fn postgres_state(settings: &config::Settings) -> Result<HttpState, AppError> {
    let repositories = Arc::new(connect_postgres(settings).await?);
    let storage = Arc::new(
        FilesystemMediaStorage::new(
            settings.uploads.directory.clone(),
            settings.server.public_base_url.clone(),
        )
        .map_err(|err| AppError::from(InfraError::from(err)))?,
    );

    let posts: Arc<dyn PostsRepo> = repositories;
    let media: Arc<dyn MediaStorage> = storage.clone();

    Ok(HttpState {
        posts: Arc::new(PostEditService::new(posts, media)),
        media_files: Some(storage),
        upload_limit_bytes: settings.uploads.max_request_bytes.get(),
    })
}

fn hosted_state(settings: &config::Settings) -> Result<HttpState, AppError> {
    let hosted = &settings.hosted;
    let url = hosted
        .url
        .clone()
        .ok_or_else(|| InfraError::configuration("hosted url is not configured"))?;
    let api_key = hosted
        .api_key
        .clone()
        .ok_or_else(|| InfraError::configuration("hosted api key is not configured"))?;

    let backend = Arc::new(HostedBackend::new(
        url,
        api_key,
        hosted.table.clone(),
        hosted.bucket.clone(),
    )?);

    let posts: Arc<dyn PostsRepo> = backend.clone();
    let media: Arc<dyn MediaStorage> = backend;

    Ok(HttpState {
        posts: Arc::new(PostEditService::new(posts, media)),
        media_files: None,
        upload_limit_bytes: settings.uploads.max_request_bytes.get(),
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "cineboard::main", "http server stopped");
    Ok(())
}

/// Resolves on ctrl-c. In-flight requests then get `grace` to finish before
/// the process exits regardless.
async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "cineboard::main", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    info!(
        target = "cineboard::main",
        grace_seconds = grace.as_secs(),
        "shutdown requested, draining connections"
    );

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target = "cineboard::main", "graceful shutdown timed out");
        process::exit(1);
    });
}
