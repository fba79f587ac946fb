mod accounts;
mod app;
mod config;
mod error;
mod state;
mod ui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "accountbase=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;
    let store = state.store.clone();

    let app = app::build_app(state);
    app::serve(app).await?;

    // Drained by graceful shutdown; release pool connections last.
    store.close().await;
    tracing::info!("account store closed");

    Ok(())
}
