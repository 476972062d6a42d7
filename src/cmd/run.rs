//! `checkpoint run`: start the server.
//!
//! Loads and validates the configuration file, builds the pipeline
//! stages from it and serves the handlers until SIGTERM or Ctrl+C.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::cli::RunArgs;
use crate::config::sources::file_source::FileSource;
use crate::error::CheckpointError;
use crate::events::TracingSink;
use crate::logging;
use crate::pipeline::Pipeline;
use crate::server::{self, AppState, LoadedConfig};

const CANDIDATES: [&str; 4] = [
    "checkpoint.yaml",
    "checkpoint.yml",
    "checkpoint.json",
    "checkpoint.toml",
];

pub async fn execute(args: RunArgs) -> Result<(), CheckpointError> {
    logging::init(
        &args.log_level,
        logging::resolve_format(args.pretty, args.json),
    );

    let source = resolve_file_source(args.config.as_deref())
        .await?
        .ok_or_else(|| CheckpointError::NoConfigSource {
            hint: "Provide --config <file> or set CONFIG_FILE.\n  \
                   Run 'checkpoint init' to create a config file."
                .into(),
        })?;
    let (config, version) = source.load().await?;

    let pipeline = Pipeline::from_config(&config, Arc::new(TracingSink));
    let info = pipeline.info();

    let state = Arc::new(AppState {
        config: LoadedConfig {
            config: Arc::new(config),
            version,
            source_name: source.name().to_string(),
            loaded_at: Instant::now(),
        },
        pipeline: info.clone(),
        start_time: Instant::now(),
    });

    let router = server::build_router(state, &pipeline, args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        handlers = info.handlers,
        gate = info.gate,
        capture = info.capture,
        advice = info.advice_group.as_deref().unwrap_or("off"),
        "checkpoint started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("checkpoint stopped");
    Ok(())
}

async fn resolve_file_source(explicit: Option<&Path>) -> Result<Option<FileSource>, CheckpointError> {
    if let Some(path) = explicit {
        return create_file_source(path).map(Some);
    }

    for name in &CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return create_file_source(&path).map(Some);
        }
    }

    Ok(None)
}

fn create_file_source(path: &Path) -> Result<FileSource, CheckpointError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Ok(FileSource::yaml(path.to_path_buf())),

        #[cfg(feature = "json")]
        "json" => Ok(FileSource::json(path.to_path_buf())),

        #[cfg(feature = "toml")]
        "toml" => Ok(FileSource::toml(path.to_path_buf())),

        other => Err(CheckpointError::UnsupportedFormat(other.to_string())),
    }
}
