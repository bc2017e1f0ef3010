//! vidvault HTTP server binary.
//!
//! Every setting comes from a CLI flag or its environment variable; a `.env`
//! file in the working directory is loaded first if present.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::config::Region;
use clap::Parser;
use tracing::{info, warn};
use vidvault_api::config::ApiConfig;
use vidvault_core::ingest::{ConflictPolicy, IngestConfig, IngestionOrchestrator};
use vidvault_core::media::{FfmpegStager, FfprobeInspector};
use vidvault_core::storage::{FsObjectStore, ObjectStore, S3ObjectStore};

/// CLI arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "vidvault_server", about = "vidvault video hosting server")]
struct Args {
    /// SQLite database file (created if missing).
    #[arg(long, env = "DB_PATH")]
    db_path: PathBuf,

    /// Deployment environment tag; `dev` enables `/admin/reset`.
    #[arg(long, env = "PLATFORM")]
    platform: String,

    /// Access token signing secret.
    #[arg(long, env = "TOKEN_SECRET", hide_env_values = true)]
    token_secret: String,

    /// Port to listen on.
    #[arg(long, env = "PORT")]
    port: u16,

    /// Interface to bind.
    #[arg(long, env = "BIND_HOST", default_value = "127.0.0.1")]
    bind_host: String,

    /// Web application bundle served under `/app`.
    #[arg(long, env = "APP_DIR_PATH")]
    app_dir_path: PathBuf,

    /// Uploaded assets (thumbnails), served under `/assets`.
    #[arg(long, env = "ASSETS_DIR_PATH")]
    assets_dir_path: PathBuf,

    /// Public base URL of the assets directory, e.g. `http://localhost:8091/assets`.
    #[arg(long, env = "ASSETS_BROWSER_URL")]
    assets_browser_url: String,

    /// Bucket holding video objects.
    #[arg(long, env = "S3_BUCKET_NAME")]
    s3_bucket_name: String,

    #[arg(long, env = "S3_BUCKET_REGION")]
    s3_bucket_region: String,

    /// Custom endpoint for S3-compatible stores.
    #[arg(long, env = "S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    /// Lifetime of signed video URLs, in seconds.
    #[arg(long, env = "S3_URL_EXPIRY_SECS")]
    s3_url_expiry_secs: u64,

    /// Directory for in-flight uploads (defaults to the OS temp dir).
    #[arg(long, env = "STAGING_DIR")]
    staging_dir: Option<PathBuf>,

    #[arg(long, env = "MAX_VIDEO_BYTES", default_value_t = 1 << 30)]
    max_video_bytes: u64,

    #[arg(long, env = "MAX_THUMBNAIL_BYTES", default_value_t = 10 << 20)]
    max_thumbnail_bytes: u64,

    #[arg(long, env = "FFPROBE_BIN", default_value = "ffprobe")]
    ffprobe_bin: PathBuf,

    #[arg(long, env = "FFMPEG_BIN", default_value = "ffmpeg")]
    ffmpeg_bin: PathBuf,

    /// Upper bound on a single probe or remux run, in seconds.
    #[arg(long, env = "MEDIA_TOOL_TIMEOUT_SECS", default_value_t = 300)]
    media_tool_timeout_secs: u64,

    /// `last-write-wins` or `reject` for concurrent uploads to one video.
    #[arg(long, env = "UPLOAD_CONFLICT_POLICY", default_value = "last-write-wins")]
    upload_conflict_policy: ConflictPolicy,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    db_max_connections: u32,
}

async fn s3_client(region: &str, endpoint: Option<&str>) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(region.to_string()));
    if let Some(endpoint) = endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let shared = loader.load().await;

    // Custom endpoints are addressed path-style.
    let config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(endpoint.is_some())
        .build();
    aws_sdk_s3::Client::from_conf(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,vidvault_api=debug,vidvault_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        bind_addr: format!("{}:{}", args.bind_host, args.port),
        platform: args.platform,
        token_secret: args.token_secret,
        app_dir: args.app_dir_path,
        assets_dir: args.assets_dir_path,
        signed_url_ttl: Duration::from_secs(args.s3_url_expiry_secs),
    };
    config.validate()?;
    info!(?config, "starting vidvault_server");

    let pool = vidvault_core::db::connect(&args.db_path, args.db_max_connections).await?;

    info!("running database migrations");
    vidvault_api::migrate(&pool).await?;

    tokio::fs::create_dir_all(&config.assets_dir).await?;
    let staging_dir = args.staging_dir.unwrap_or_else(std::env::temp_dir);
    tokio::fs::create_dir_all(&staging_dir).await?;

    let client = s3_client(&args.s3_bucket_region, args.s3_endpoint.as_deref()).await;
    let video_store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(
        client,
        args.s3_bucket_name,
        args.s3_bucket_region,
    ));
    let thumbnail_store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(
        config.assets_dir.clone(),
        args.assets_browser_url,
    ));

    let tool_timeout = Duration::from_secs(args.media_tool_timeout_secs);
    let ingest_config = IngestConfig {
        staging_dir,
        max_video_bytes: args.max_video_bytes,
        max_thumbnail_bytes: args.max_thumbnail_bytes,
        policy: args.upload_conflict_policy,
    };
    info!(?ingest_config, "configuring ingestion");

    let ingest = IngestionOrchestrator::new(
        pool.clone(),
        &ingest_config,
        Arc::new(FfprobeInspector::new(args.ffprobe_bin, tool_timeout)),
        Arc::new(FfmpegStager::new(args.ffmpeg_bin, tool_timeout)),
        video_store.clone(),
        thumbnail_store,
    );

    let config = Arc::new(config);
    let state = vidvault_api::AppState {
        pool: pool.clone(),
        config: config.clone(),
        ingest: Arc::new(ingest),
        video_store,
    };
    let app = vidvault_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("server stopped");
    Ok(())
}
