mod config;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt::init();
    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "loaded .env");
    }

    let config = config::Config::from_env().expect("invalid configuration");

    let state = match &config.snapshot_dir {
        Some(dir) => {
            let (store, record) = services::persistence::open_snapshot(dir);
            let state = state::AppState::with_record(record);
            let _snapshot = services::persistence::spawn_snapshot_task(state.clone(), store, config.snapshot_flush_ms);
            state
        }
        None => {
            tracing::warn!("WALL_STATE_DIR not set; wall state will not survive restarts");
            state::AppState::new()
        }
    };

    let app = routes::app(state, config.max_body_bytes);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "wallsync listening");
    axum::serve(listener, app).await.expect("server failed");
}
