use crate::handlers;
use crate::state::AppState;
use axum::{routing::{delete, get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/goals", get(handlers::list_goals))
        .route("/api/goals/:id", get(handlers::get_goal))
        .route("/api/goals/:id/stats", get(handlers::get_stats))
        .route("/api/goals/:id/scores", delete(handlers::reset_scores))
        .route("/api/goals/:id/days/:date", put(handlers::set_day))
        .route("/api/goals/:id/days/:date/cycle", post(handlers::cycle_day))
        .with_state(state)
}
