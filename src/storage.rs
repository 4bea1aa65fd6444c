use crate::errors::AppError;
use crate::models::ScoreData;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, info};

pub async fn load_scores(path: &Path) -> ScoreData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<ScoreData>(&bytes) {
            Ok(data) => {
                let days: usize = data.goals.values().map(|scores| scores.len()).sum();
                info!(path = %path.display(), goals = data.goals.len(), days, "loaded score overlay");
                data
            }
            Err(err) => {
                error!(path = %path.display(), "failed to parse score file, starting empty: {err}");
                ScoreData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no score file yet");
            ScoreData::default()
        }
        Err(err) => {
            error!(path = %path.display(), "failed to read score file, starting empty: {err}");
            ScoreData::default()
        }
    }
}

pub async fn persist_scores(path: &Path, data: &ScoreData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    debug!(path = %path.display(), "score overlay written");
    Ok(())
}
