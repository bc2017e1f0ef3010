//! Shared harness for the API integration tests: a router over a temporary
//! SQLite file, filesystem object stores in temp dirs and scripted media
//! tools.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;
use vidvault_api::AppState;
use vidvault_api::config::ApiConfig;
use vidvault_core::ingest::{ConflictPolicy, IngestConfig, IngestionOrchestrator};
use vidvault_core::media::{MediaError, MediaInspector, MediaStager, ProbeReport, StagedFile};
use vidvault_core::storage::FsObjectStore;

pub const TOKEN_SECRET: &str = "integration-test-secret";
pub const ASSETS_URL: &str = "http://localhost:8091/assets";
pub const VIDEOS_URL: &str = "http://videos.test";
pub const MAX_VIDEO_BYTES: u64 = 4096;
pub const MAX_THUMBNAIL_BYTES: u64 = 1024;

/// Reports a fixed display aspect ratio.
pub struct ScriptedInspector(pub Option<&'static str>);

#[async_trait]
impl MediaInspector for ScriptedInspector {
    async fn probe(&self, _path: &Path) -> Result<ProbeReport, MediaError> {
        Ok(ProbeReport {
            display_aspect_ratio: self.0.map(str::to_string),
        })
    }
}

/// "Remuxes" by copying the input into a new staged file.
pub struct CopyStager;

#[async_trait]
impl MediaStager for CopyStager {
    async fn remux(&self, input: &StagedFile) -> Result<StagedFile, MediaError> {
        let dir = input
            .path()
            .parent()
            .ok_or_else(|| std::io::Error::other("no parent"))?;
        let mut output = StagedFile::reserve(dir, input.media_type())?;
        tokio::fs::copy(input.path(), output.path()).await?;
        output.refresh_len().await?;
        Ok(output)
    }
}

/// Always fails like a non-zero ffmpeg exit.
pub struct FailingStager;

#[async_trait]
impl MediaStager for FailingStager {
    async fn remux(&self, _input: &StagedFile) -> Result<StagedFile, MediaError> {
        Err(MediaError::Tool {
            tool: "ffmpeg",
            detail: "moov atom not found".into(),
        })
    }
}

pub struct Options {
    pub platform: &'static str,
    pub policy: ConflictPolicy,
    pub aspect_ratio: Option<&'static str>,
    pub remux_fails: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            platform: "dev",
            policy: ConflictPolicy::LastWriteWins,
            aspect_ratio: Some("16:9"),
            remux_fails: false,
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub db_dir: TempDir,
    pub app_dir: TempDir,
    pub assets_dir: TempDir,
    pub videos_dir: TempDir,
    pub staging_dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Options::default()).await
}

pub async fn spawn_app_with(options: Options) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("warn")
        .try_init();

    let db_dir = tempfile::tempdir().expect("db dir");
    let app_dir = tempfile::tempdir().expect("app dir");
    let assets_dir = tempfile::tempdir().expect("assets dir");
    let videos_dir = tempfile::tempdir().expect("videos dir");
    let staging_dir = tempfile::tempdir().expect("staging dir");

    let pool = vidvault_core::db::connect(&db_dir.path().join("vidvault.db"), 5)
        .await
        .expect("connect");
    vidvault_api::migrate(&pool).await.expect("migrate");

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        platform: options.platform.into(),
        token_secret: TOKEN_SECRET.into(),
        app_dir: app_dir.path().to_path_buf(),
        assets_dir: assets_dir.path().to_path_buf(),
        signed_url_ttl: Duration::from_secs(300),
    };

    let video_store = Arc::new(FsObjectStore::new(videos_dir.path(), VIDEOS_URL));
    let thumbnail_store = Arc::new(FsObjectStore::new(assets_dir.path(), ASSETS_URL));
    let stager: Arc<dyn MediaStager> = if options.remux_fails {
        Arc::new(FailingStager)
    } else {
        Arc::new(CopyStager)
    };

    let ingest = IngestionOrchestrator::new(
        pool.clone(),
        &IngestConfig {
            staging_dir: staging_dir.path().to_path_buf(),
            max_video_bytes: MAX_VIDEO_BYTES,
            max_thumbnail_bytes: MAX_THUMBNAIL_BYTES,
            policy: options.policy,
        },
        Arc::new(ScriptedInspector(options.aspect_ratio)),
        stager,
        video_store.clone(),
        thumbnail_store,
    );

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config),
        ingest: Arc::new(ingest),
        video_store,
    };

    TestApp {
        router: vidvault_api::router(state),
        pool,
        db_dir,
        app_dir,
        assets_dir,
        videos_dir,
        staging_dir,
    }
}

impl TestApp {
    /// Send a request; returns the status and the JSON body (`Null` if empty).
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Register and log in; returns `(user_id, access_token, refresh_token)`.
    pub async fn login_new_user(&self, email: &str) -> (String, String, String) {
        let creds = serde_json::json!({"email": email, "password": "hunter22"});
        let (status, _) = self
            .send(json_request(Method::POST, "/api/users", None, &creds))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .send(json_request(Method::POST, "/api/login", None, &creds))
            .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["user"]["id"].as_str().expect("user id").to_string(),
            body["token"].as_str().expect("token").to_string(),
            body["refresh_token"].as_str().expect("refresh token").to_string(),
        )
    }

    /// Create a video as the holder of `token`; returns its ID.
    pub async fn create_video(&self, token: &str, title: &str) -> String {
        let (status, body) = self
            .send(json_request(
                Method::POST,
                "/api/videos",
                Some(token),
                &serde_json::json!({"title": title, "description": "test clip"}),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().expect("video id").to_string()
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).expect("encode")))
        .expect("request")
}

pub fn bare_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

const BOUNDARY: &str = "vidvault-test-boundary";

/// A single-part `multipart/form-data` request.
pub fn multipart_request(
    method: Method,
    uri: &str,
    token: &str,
    field: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .expect("request")
}

/// Count regular files below `dir`, recursively.
pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            let path = entry.expect("entry").path();
            if path.is_dir() { count_files(&path) } else { 1 }
        })
        .sum()
}
