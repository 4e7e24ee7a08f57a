use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_select_postgres_backend() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.backend, BackendKind::Postgres);
    assert_eq!(settings.hosted.table, "posts");
    assert_eq!(settings.hosted.bucket, "media");
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
}

#[test]
fn public_base_url_defaults_to_listener_address() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    assert_eq!(
        settings.server.public_base_url.as_str(),
        "http://127.0.0.1:3000/"
    );
}

#[test]
fn public_base_url_rejects_non_http_scheme() {
    let mut raw = RawSettings::default();
    raw.server.public_base_url = Some("ftp://files.example".to_string());

    let err = Settings::from_raw(raw).expect_err("scheme must be rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "server.public_base_url",
            ..
        }
    ));
}

#[test]
fn hosted_backend_requires_url_and_key() {
    let mut raw = RawSettings::default();
    raw.backend.kind = Some(BackendKind::Hosted);
    raw.hosted.url = Some("https://project.example".to_string());

    let err = Settings::from_raw(raw).expect_err("api key must be required");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "hosted.api_key",
            ..
        }
    ));
}

#[test]
fn hosted_backend_accepts_complete_settings() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        backend: Some(BackendKind::Hosted),
        hosted_url: Some("https://project.example".to_string()),
        hosted_api_key: Some("anon-key".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.backend, BackendKind::Hosted);
    assert_eq!(
        settings.hosted.url.as_ref().map(Url::as_str),
        Some("https://project.example/")
    );
    assert_eq!(settings.hosted.api_key.as_deref(), Some("anon-key"));
}

#[test]
fn blank_database_url_is_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn zero_upload_limit_is_rejected() {
    let mut raw = RawSettings::default();
    raw.uploads.max_request_bytes = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero limit must be rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "uploads.max_request_bytes",
            ..
        }
    ));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["cineboard"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "cineboard",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--backend",
        "hosted",
        "--hosted-url",
        "https://project.example",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.backend, Some(BackendKind::Hosted));
            assert_eq!(
                serve.overrides.hosted_url.as_deref(),
                Some("https://project.example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from([
        "cineboard",
        "migrate",
        "--database-url",
        "postgres://example",
    ]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => {
            assert_eq!(
                migrate.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
