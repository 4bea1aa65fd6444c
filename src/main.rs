use goal_calendar::{load_scores, models::ScoreData, router, AppState, GoalDocument, Settings};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let settings = Settings::from_env();
    let goals = GoalDocument::load(&settings.goals_path).await;

    let overlay_path = settings.overlay_path();
    let scores = match &overlay_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            load_scores(path).await
        }
        None => {
            warn!("score persistence disabled; clicks last until the server stops");
            ScoreData::default()
        }
    };

    let app = router(AppState::new(goals, overlay_path, scores));
    let addr = settings.addr();

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
