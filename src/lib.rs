pub mod app;
pub mod calendar;
pub mod config;
pub mod errors;
pub mod goals;
pub mod handlers;
pub mod models;
pub mod stats;
pub mod storage;
pub mod ui;
pub mod state;

pub use app::router;
pub use config::Settings;
pub use goals::GoalDocument;
pub use state::AppState;
pub use storage::load_scores;
