use crate::calendar::{Average, Calendar, DayTile, MonthPill, Week};
use crate::goals::{Goal, Score};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ISO date key to score, for one goal.
pub type DayScores = BTreeMap<String, Score>;

/// Persisted score overlay, keyed by goal title.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoreData {
    pub goals: BTreeMap<String, DayScores>,
}

impl ScoreData {
    pub fn scores_for(&self, title: &str) -> Option<&DayScores> {
        self.goals.get(title)
    }

    pub fn record(&mut self, title: &str, tile: &DayTile) {
        if let Some(score) = tile.score {
            self.goals
                .entry(title.to_string())
                .or_default()
                .insert(tile.key.clone(), score);
        }
    }

    /// Drops every stored score for a goal and returns how many were removed.
    pub fn clear(&mut self, title: &str) -> usize {
        self.goals.remove(title).map(|scores| scores.len()).unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct SetScoreRequest {
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct TileResponse {
    pub date: String,
    pub score: Option<u8>,
    pub state: &'static str,
    pub is_default: bool,
    pub in_range: bool,
    pub is_past: bool,
    pub clickable: bool,
}

impl From<&DayTile> for TileResponse {
    fn from(tile: &DayTile) -> Self {
        Self {
            date: tile.key.clone(),
            score: tile.score.map(Score::value),
            state: tile.state().as_str(),
            is_default: tile.is_default,
            in_range: tile.in_range,
            is_past: tile.is_past,
            clickable: tile.is_clickable(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WeekResponse {
    pub start_date: String,
    pub average: Option<f64>,
    pub average_label: String,
    pub days: Vec<TileResponse>,
}

impl From<&Week> for WeekResponse {
    fn from(week: &Week) -> Self {
        let average = week.average();
        Self {
            start_date: week.start.to_string(),
            average: average.rounded(),
            average_label: average.to_string(),
            days: week.days.iter().map(TileResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MonthPillResponse {
    pub label: String,
    pub weeks: usize,
    pub width: u32,
}

impl From<&MonthPill> for MonthPillResponse {
    fn from(pill: &MonthPill) -> Self {
        Self {
            label: pill.label.clone(),
            weeks: pill.weeks,
            width: pill.width(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub passed_days: u32,
    pub days_left: u32,
    pub scored_days: u32,
    pub average: Option<f64>,
    pub countdown: String,
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub id: usize,
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub display_start: String,
    pub display_end: String,
    pub default_score: u8,
    pub passed_color: Option<String>,
    pub passed_intensity: Option<f64>,
    pub months: Vec<MonthPillResponse>,
    pub weeks: Vec<WeekResponse>,
    pub stats: StatsResponse,
}

impl CalendarResponse {
    pub fn new(id: usize, goal: &Goal, calendar: &Calendar, stats: StatsResponse) -> Self {
        Self {
            id,
            title: goal.title.clone(),
            start_date: goal.start_date.to_string(),
            end_date: goal.end_date.to_string(),
            display_start: calendar.range.start.to_string(),
            display_end: calendar.range.end.to_string(),
            default_score: goal.default_score.value(),
            passed_color: goal.passed_color.clone(),
            passed_intensity: goal.passed_intensity,
            months: calendar.months.iter().map(MonthPillResponse::from).collect(),
            weeks: calendar.weeks.iter().map(WeekResponse::from).collect(),
            stats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TileUpdateResponse {
    pub tile: TileResponse,
    pub color: Option<String>,
    pub tip: String,
    pub week_index: usize,
    pub week_average: Option<f64>,
    pub week_average_label: String,
    pub stats: StatsResponse,
}

impl TileUpdateResponse {
    pub fn new(tile: &DayTile, week_index: usize, week_average: Average, stats: StatsResponse) -> Self {
        Self {
            tile: TileResponse::from(tile),
            color: tile.score.map(crate::ui::score_color),
            tip: crate::ui::tile_tip(tile),
            week_index,
            week_average: week_average.rounded(),
            week_average_label: week_average.to_string(),
            stats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub title: String,
    pub removed: usize,
}
