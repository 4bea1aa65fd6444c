use crate::calendar::parse_date_key;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{error, info};

pub const DEFAULT_SCORE: u8 = 2;
pub const MAX_SCORE: u8 = 10;

/// A day score, always within `0..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub fn new(value: u8) -> Option<Self> {
        (value <= MAX_SCORE).then_some(Self(value))
    }

    /// Accepts only whole numbers in range; fractional or out-of-range values are rejected.
    pub fn from_number(value: f64) -> Option<Self> {
        if value.fract() != 0.0 || !(0.0..=f64::from(MAX_SCORE)).contains(&value) {
            return None;
        }
        Some(Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Next score in the click cycle, wrapping from 10 back to 0.
    pub fn cycled(self) -> Self {
        Self((self.0 + 1) % (MAX_SCORE + 1))
    }
}

impl Default for Score {
    fn default() -> Self {
        Self(DEFAULT_SCORE)
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("score {value} is above {MAX_SCORE}"))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum GoalError {
    #[error("failed to read goal document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("goal document is not a valid JSON array of goals: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("goal #{index} has an empty title")]
    EmptyTitle { index: usize },
    #[error("goal title {title:?} appears more than once")]
    DuplicateTitle { title: String },
    #[error("goal {title:?}: {field} {value:?} is not a YYYY-MM-DD date")]
    InvalidDate {
        title: String,
        field: &'static str,
        value: String,
    },
    #[error("goal {title:?}: start date {start} is after end date {end}")]
    StartAfterEnd {
        title: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("goal {title:?}: {field} {value} is not a whole number between 0 and 10")]
    InvalidScore {
        title: String,
        field: String,
        value: String,
    },
    #[error("goal {title:?}: passedColor {value:?} is not a hex or named CSS color")]
    InvalidColor { title: String, value: String },
    #[error("goal {title:?}: passedIntensity {value} must be between 0 and 1")]
    InvalidIntensity { title: String, value: f64 },
}

/// One goal as written in the goal document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRecord {
    pub title: String,
    #[serde(default)]
    pub start_date: Option<String>,
    pub end_date: String,
    #[serde(default)]
    pub default_score: Option<serde_json::Value>,
    #[serde(default)]
    pub scores: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub passed_color: Option<String>,
    #[serde(default)]
    pub passed_intensity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub default_score: Score,
    pub scores: BTreeMap<NaiveDate, Score>,
    pub passed_color: Option<String>,
    pub passed_intensity: Option<f64>,
}

impl Goal {
    /// True when `date` lies within the goal's start and end dates, inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

impl GoalRecord {
    pub fn validate(self, index: usize) -> Result<Goal, GoalError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(GoalError::EmptyTitle { index });
        }

        let end_date = parse_field(&title, "endDate", &self.end_date)?;
        let start_date = match self.start_date.as_deref() {
            Some(raw) => parse_field(&title, "startDate", raw)?,
            None => default_start(end_date),
        };
        if start_date > end_date {
            return Err(GoalError::StartAfterEnd {
                title,
                start: start_date,
                end: end_date,
            });
        }

        let default_score = match &self.default_score {
            None | Some(serde_json::Value::Null) => Score::default(),
            Some(value) => score_value(&title, "defaultScore".to_string(), value)?,
        };

        let mut scores = BTreeMap::new();
        for (key, value) in &self.scores {
            if value.is_null() {
                continue;
            }
            let date = parse_field(&title, "scores key", key)?;
            let score = score_value(&title, format!("score for {key}"), value)?;
            scores.insert(date, score);
        }

        if let Some(color) = &self.passed_color {
            if !is_css_color(color) {
                return Err(GoalError::InvalidColor {
                    title,
                    value: color.clone(),
                });
            }
        }

        if let Some(intensity) = self.passed_intensity {
            if !(0.0..=1.0).contains(&intensity) {
                return Err(GoalError::InvalidIntensity {
                    title,
                    value: intensity,
                });
            }
        }

        Ok(Goal {
            title,
            start_date,
            end_date,
            default_score,
            scores,
            passed_color: self.passed_color,
            passed_intensity: self.passed_intensity,
        })
    }
}

/// Goals without a start date begin on January 1 of their end date's year.
pub fn default_start(end_date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(end_date.year(), 1, 1).unwrap_or(end_date)
}

pub fn parse_goals(json: &str) -> Result<Vec<Goal>, GoalError> {
    let records: Vec<GoalRecord> = serde_json::from_str(json)?;
    let mut seen = HashSet::new();
    let mut goals = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let goal = record.validate(index)?;
        if !seen.insert(goal.title.clone()) {
            return Err(GoalError::DuplicateTitle { title: goal.title });
        }
        goals.push(goal);
    }

    Ok(goals)
}

pub async fn load_goals(path: &Path) -> Result<Vec<Goal>, GoalError> {
    let json = fs::read_to_string(path).await.map_err(|source| GoalError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_goals(&json)
}

/// The goal document as seen by the server: either validated goals or the
/// reason loading failed, which the page shows instead of the cards.
#[derive(Debug, Clone)]
pub enum GoalDocument {
    Loaded(Vec<Goal>),
    Failed(String),
}

impl GoalDocument {
    pub async fn load(path: &Path) -> Self {
        match load_goals(path).await {
            Ok(goals) => {
                info!(count = goals.len(), path = %path.display(), "loaded goal document");
                Self::Loaded(goals)
            }
            Err(err) => {
                error!("failed to load goal document: {err}");
                Self::Failed(err.to_string())
            }
        }
    }
}

fn parse_field(title: &str, field: &'static str, value: &str) -> Result<NaiveDate, GoalError> {
    parse_date_key(value).ok_or_else(|| GoalError::InvalidDate {
        title: title.to_string(),
        field,
        value: value.to_string(),
    })
}

fn score_value(title: &str, field: String, value: &serde_json::Value) -> Result<Score, GoalError> {
    value
        .as_f64()
        .and_then(Score::from_number)
        .ok_or_else(|| GoalError::InvalidScore {
            title: title.to_string(),
            field,
            value: value.to_string(),
        })
}

fn is_css_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic()),
    }
}
