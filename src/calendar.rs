//! Calendar model for a single goal.
//!
//! A goal's calendar covers whole Sunday-to-Saturday weeks: the window starts
//! on the Sunday on or before the goal's start date and ends on the Saturday
//! on or after its end date. Tiles inside the window but outside the goal's
//! range are spacers.

use crate::goals::{Goal, Score};
use crate::models::DayScores;
use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;
use thiserror::Error;

/// Tile edge in pixels.
pub const TILE_SIZE: u32 = 14;
/// Gap between tiles and between week columns, in pixels.
pub const TILE_GAP: u32 = 3;
pub const AVERAGE_PLACEHOLDER: &str = "--";

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), "%Y-%m-%d").ok()
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Duration::days(6)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DisplayRange {
    pub fn for_goal(goal: &Goal) -> Self {
        Self {
            start: week_start(goal.start_date),
            end: week_end(goal.end_date),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn day_count(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |date| *date <= end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// Explicit score from the overlay or the goal document.
    Scored,
    /// Implicit `defaultScore`, not saved anywhere.
    Default,
    Future,
    /// Spacer outside the goal's date range.
    OutOfRange,
}

impl TileState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scored => "scored",
            Self::Default => "default",
            Self::Future => "future",
            Self::OutOfRange => "out_of_range",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayTile {
    pub date: NaiveDate,
    pub key: String,
    pub score: Option<Score>,
    pub is_default: bool,
    pub in_range: bool,
    /// On or before today.
    pub is_past: bool,
}

impl DayTile {
    pub fn is_clickable(&self) -> bool {
        self.in_range && self.is_past
    }

    pub fn state(&self) -> TileState {
        if !self.in_range {
            TileState::OutOfRange
        } else if !self.is_past {
            TileState::Future
        } else if self.is_default || self.score.is_none() {
            TileState::Default
        } else {
            TileState::Scored
        }
    }

    fn with_score(&self, score: Score) -> Self {
        Self {
            score: Some(score),
            is_default: false,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
    #[error("{0} is outside the goal's date range")]
    OutOfRange(NaiveDate),
    #[error("{0} is in the future")]
    Future(NaiveDate),
}

fn ensure_clickable(tile: &DayTile) -> Result<(), TileError> {
    if !tile.in_range {
        return Err(TileError::OutOfRange(tile.date));
    }
    if !tile.is_past {
        return Err(TileError::Future(tile.date));
    }
    Ok(())
}

/// Returns the tile after one click: a saved score advances by one and
/// wraps from 10 to 0, while an unset or implicit default tile is saved as
/// `default_score` itself.
pub fn cycle_tile(tile: &DayTile, default_score: Score) -> Result<DayTile, TileError> {
    ensure_clickable(tile)?;
    let next = match tile.score.filter(|_| !tile.is_default) {
        Some(score) => score.cycled(),
        None => default_score,
    };
    Ok(tile.with_score(next))
}

pub fn set_tile(tile: &DayTile, score: Score) -> Result<DayTile, TileError> {
    ensure_clickable(tile)?;
    Ok(tile.with_score(score))
}

/// Scores a single day. Overlay scores win over the goal document, which
/// wins over the implicit default. Future and out-of-range days stay unset.
pub fn build_tile(goal: &Goal, overlay: Option<&DayScores>, today: NaiveDate, date: NaiveDate) -> DayTile {
    let key = date_key(date);
    let in_range = goal.contains(date);
    let is_past = date <= today;

    let (score, is_default) = if in_range && is_past {
        let stored = overlay
            .and_then(|scores| scores.get(&key).copied())
            .or_else(|| goal.scores.get(&date).copied());
        match stored {
            Some(score) => (Some(score), false),
            None => (Some(goal.default_score), true),
        }
    } else {
        (None, false)
    };

    DayTile {
        date,
        key,
        score,
        is_default,
        in_range,
        is_past,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Average(Option<f64>);

impl Average {
    pub fn of<'a>(tiles: impl IntoIterator<Item = &'a DayTile>) -> Self {
        let (sum, count) = tiles
            .into_iter()
            .filter_map(|tile| tile.score)
            .fold((0u32, 0u32), |(sum, count), score| {
                (sum + u32::from(score.value()), count + 1)
            });
        if count == 0 {
            Self(None)
        } else {
            Self(Some(f64::from(sum) / f64::from(count)))
        }
    }

    pub fn value(self) -> Option<f64> {
        self.0
    }

    /// Mean rounded to one decimal place.
    pub fn rounded(self) -> Option<f64> {
        self.0.map(|value| (value * 10.0).round() / 10.0)
    }
}

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rounded() {
            Some(value) => write!(f, "{value:.1}"),
            None => f.write_str(AVERAGE_PLACEHOLDER),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Week {
    pub start: NaiveDate,
    /// Sunday first.
    pub days: Vec<DayTile>,
}

impl Week {
    pub fn average(&self) -> Average {
        Average::of(&self.days)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthPill {
    pub label: String,
    pub weeks: usize,
}

impl MonthPill {
    pub fn width(&self) -> u32 {
        let weeks = self.weeks as u32;
        weeks * TILE_SIZE + weeks.saturating_sub(1) * TILE_GAP
    }
}

/// Groups consecutive weeks whose first day falls in the same month.
pub fn month_pills(weeks: &[Week]) -> Vec<MonthPill> {
    let mut pills: Vec<MonthPill> = Vec::new();
    let mut current: Option<(i32, u32)> = None;

    for week in weeks {
        let month = (week.start.year(), week.start.month());
        if current == Some(month) {
            if let Some(pill) = pills.last_mut() {
                pill.weeks += 1;
            }
            continue;
        }
        let label = if pills.is_empty() || month.1 == 1 {
            week.start.format("%b %Y").to_string()
        } else {
            week.start.format("%b").to_string()
        };
        pills.push(MonthPill { label, weeks: 1 });
        current = Some(month);
    }

    pills
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calendar {
    pub range: DisplayRange,
    pub weeks: Vec<Week>,
    pub months: Vec<MonthPill>,
}

impl Calendar {
    pub fn tiles(&self) -> impl Iterator<Item = &DayTile> {
        self.weeks.iter().flat_map(|week| week.days.iter())
    }

    pub fn week_index(&self, date: NaiveDate) -> Option<usize> {
        self.range
            .contains(date)
            .then(|| (date - self.range.start).num_days() as usize / 7)
    }

    pub fn tile(&self, date: NaiveDate) -> Option<&DayTile> {
        let week = self.weeks.get(self.week_index(date)?)?;
        week.days.get(date.weekday().num_days_from_sunday() as usize)
    }
}

pub fn build_calendar(goal: &Goal, overlay: Option<&DayScores>, today: NaiveDate) -> Calendar {
    let range = DisplayRange::for_goal(goal);
    let tiles: Vec<DayTile> = range
        .days()
        .map(|date| build_tile(goal, overlay, today, date))
        .collect();

    let weeks: Vec<Week> = tiles
        .chunks(7)
        .map(|days| Week {
            start: days[0].date,
            days: days.to_vec(),
        })
        .collect();
    let months = month_pills(&weeks);

    Calendar { range, weeks, months }
}
