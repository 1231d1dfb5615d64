mod gemini;
mod models;
mod routes;
mod wizard;

use axum::{Router, routing::{post, get}};
use routes::{advance_step, asset_image, back_step, create_photoshoot, export_shoot, finish_shoot, generate_shoot, get_photoshoot, goto_step, replace_uploads, select_casting, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};
use std::sync::Arc;
use tower_http::cors::{CorsLayer, Any};

use crate::gemini::GeminiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| "DEMO_KEY".into());
    tracing::info!("Using API key: {}...", &api_key[..std::cmp::min(10, api_key.len())]);
    let state = AppState {
        store: Arc::default(),
        renderer: Arc::new(GeminiClient::new(api_key)),
    };

    let app = Router::new()
        .route("/api/photoshoots", post(create_photoshoot))
        .route("/api/photoshoots/:id", get(get_photoshoot))
        .route("/api/photoshoots/:id/uploads", post(replace_uploads))
        .route("/api/photoshoots/:id/uploads/:batch/:index", get(asset_image))
        .route("/api/photoshoots/:id/selection", post(select_casting))
        .route("/api/photoshoots/:id/generate", post(generate_shoot))
        .route("/api/photoshoots/:id/advance", post(advance_step))
        .route("/api/photoshoots/:id/back", post(back_step))
        .route("/api/photoshoots/:id/goto", post(goto_step))
        .route("/api/photoshoots/:id/export", post(export_shoot))
        .route("/api/photoshoots/:id/finish", post(finish_shoot))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state);

    let port: u16 = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0,0,0,0], port));
    tracing::info!(%addr, "Starting server");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
