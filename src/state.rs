use crate::errors::AppError;
use crate::goals::{Goal, GoalDocument};
use crate::models::ScoreData;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub goals: Arc<GoalDocument>,
    /// `None` keeps the overlay in memory only.
    pub data_path: Option<PathBuf>,
    pub scores: Arc<Mutex<ScoreData>>,
}

impl AppState {
    pub fn new(goals: GoalDocument, data_path: Option<PathBuf>, scores: ScoreData) -> Self {
        Self {
            goals: Arc::new(goals),
            data_path,
            scores: Arc::new(Mutex::new(scores)),
        }
    }

    pub fn goals(&self) -> Result<&[Goal], AppError> {
        match self.goals.as_ref() {
            GoalDocument::Loaded(goals) => Ok(goals),
            GoalDocument::Failed(message) => Err(AppError::unavailable(message.clone())),
        }
    }

    pub fn goal(&self, id: usize) -> Result<&Goal, AppError> {
        self.goals()?
            .get(id)
            .ok_or_else(|| AppError::not_found(format!("no goal with id {id}")))
    }
}
