use anyhow::Context;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use melody_core::{generate_melody, GenerateOptions, Mode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
enum GenerateResponse {
    Ok { path: PathBuf },
    Error { message: String },
}

#[derive(Debug, Serialize)]
struct ModeInfo {
    name: &'static str,
    offsets: &'static [u8],
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("MELODY_API_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed binding {addr}"))?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, app()).await?;
    Ok(())
}

fn app() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/modes", get(modes))
        .route("/generate", post(generate))
}

async fn modes() -> Json<Vec<ModeInfo>> {
    Json(
        Mode::ALL
            .into_iter()
            .map(|m| ModeInfo { name: m.name(), offsets: m.pattern() })
            .collect(),
    )
}

/// Generation is synchronous and CPU-bound, so it runs on the blocking pool.
async fn generate(Json(opts): Json<GenerateOptions>) -> (StatusCode, Json<GenerateResponse>) {
    tracing::info!(key = %opts.key, mode = %opts.mode.label(), measures = opts.measures, "generate request");

    let result = tokio::task::spawn_blocking(move || generate_melody(&opts)).await;
    match result {
        Ok(Ok(path)) => {
            tracing::info!(path = %path.display(), "melody generated");
            (StatusCode::OK, Json(GenerateResponse::Ok { path }))
        }
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "generation failed");
            let status = match err {
                melody_core::Error::Write { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, Json(GenerateResponse::Error { message: err.to_string() }))
        }
        Err(join) => {
            tracing::error!(error = %join, "generation task panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GenerateResponse::Error { message: join.to_string() }),
            )
        }
    }
}
