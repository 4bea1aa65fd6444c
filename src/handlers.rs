use crate::calendar::{build_calendar, build_tile, cycle_tile, parse_date_key, set_tile, DayTile, TileError};
use crate::errors::AppError;
use crate::goals::{Goal, GoalDocument, Score};
use crate::models::{
    CalendarResponse, ResetResponse, ScoreData, SetScoreRequest, StatsResponse, TileUpdateResponse,
};
use crate::state::AppState;
use crate::stats::build_stats;
use crate::storage::persist_scores;
use crate::ui::{render_error, render_index, GoalCard, RenderContext};
use axum::{
    extract::{Path, State},
    response::Html,
    Json,
};
use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let ctx = RenderContext::at(now());
    let goals = match state.goals.as_ref() {
        GoalDocument::Loaded(goals) => goals,
        GoalDocument::Failed(message) => return Html(render_error(&ctx, message)),
    };

    let scores = state.scores.lock().await;
    let cards: Vec<GoalCard> = goals
        .iter()
        .enumerate()
        .map(|(id, goal)| {
            let calendar = build_calendar(goal, scores.scores_for(&goal.title), ctx.today);
            let stats = build_stats(goal, &calendar, ctx.now);
            GoalCard {
                id,
                goal,
                calendar,
                stats,
            }
        })
        .collect();

    Html(render_index(&ctx, &cards))
}

pub async fn list_goals(State(state): State<AppState>) -> Result<Json<Vec<CalendarResponse>>, AppError> {
    let now = now();
    let scores = state.scores.lock().await;
    let calendars = state
        .goals()?
        .iter()
        .enumerate()
        .map(|(id, goal)| calendar_response(id, goal, &scores, now))
        .collect();
    Ok(Json(calendars))
}

pub async fn get_goal(
    State(state): State<AppState>,
    Path(id): Path<usize>,
) -> Result<Json<CalendarResponse>, AppError> {
    let goal = state.goal(id)?;
    let scores = state.scores.lock().await;
    Ok(Json(calendar_response(id, goal, &scores, now())))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Path(id): Path<usize>,
) -> Result<Json<StatsResponse>, AppError> {
    let goal = state.goal(id)?;
    let now = now();
    let scores = state.scores.lock().await;
    let calendar = build_calendar(goal, scores.scores_for(&goal.title), now.date());
    Ok(Json(build_stats(goal, &calendar, now)))
}

pub async fn cycle_day(
    State(state): State<AppState>,
    Path((id, date)): Path<(usize, String)>,
) -> Result<Json<TileUpdateResponse>, AppError> {
    update_tile(&state, id, &date, cycle_tile).await
}

pub async fn set_day(
    State(state): State<AppState>,
    Path((id, date)): Path<(usize, String)>,
    Json(payload): Json<SetScoreRequest>,
) -> Result<Json<TileUpdateResponse>, AppError> {
    let score = Score::from_number(payload.score).ok_or_else(|| {
        AppError::bad_request(format!(
            "score {} must be a whole number between 0 and 10",
            payload.score
        ))
    })?;
    update_tile(&state, id, &date, |tile, _| set_tile(tile, score)).await
}

pub async fn reset_scores(
    State(state): State<AppState>,
    Path(id): Path<usize>,
) -> Result<Json<ResetResponse>, AppError> {
    let goal = state.goal(id)?;
    let mut scores = state.scores.lock().await;
    let mut next = scores.clone();
    let removed = next.clear(&goal.title);
    save(&state, &next).await?;
    *scores = next;

    info!(goal = %goal.title, removed, "score overlay cleared");
    Ok(Json(ResetResponse {
        title: goal.title.clone(),
        removed,
    }))
}

async fn update_tile<F>(state: &AppState, id: usize, raw_date: &str, apply: F) -> Result<Json<TileUpdateResponse>, AppError>
where
    F: FnOnce(&DayTile, Score) -> Result<DayTile, TileError>,
{
    let goal = state.goal(id)?;
    let date = parse_date_key(raw_date)
        .ok_or_else(|| AppError::bad_request(format!("{raw_date:?} is not a YYYY-MM-DD date")))?;
    let now = now();
    let today = now.date();

    let mut scores = state.scores.lock().await;
    let current = build_tile(goal, scores.scores_for(&goal.title), today, date);
    let updated = apply(&current, goal.default_score).inspect_err(|err| {
        warn!(goal = %goal.title, date = %current.key, "rejected tile update: {err}");
    })?;
    let mut next = scores.clone();
    next.record(&goal.title, &updated);
    save(state, &next).await?;
    *scores = next;

    let calendar = build_calendar(goal, scores.scores_for(&goal.title), today);
    let week_index = calendar
        .week_index(date)
        .ok_or_else(|| AppError::not_found(format!("{date} is outside the calendar")))?;
    let week_average = calendar.weeks[week_index].average();
    let stats = build_stats(goal, &calendar, now);

    info!(
        goal = %goal.title,
        date = %updated.key,
        score = ?updated.score.map(Score::value),
        "tile updated"
    );
    Ok(Json(TileUpdateResponse::new(&updated, week_index, week_average, stats)))
}

async fn save(state: &AppState, scores: &ScoreData) -> Result<(), AppError> {
    match &state.data_path {
        Some(path) => persist_scores(path, scores).await,
        None => Ok(()),
    }
}

fn calendar_response(id: usize, goal: &Goal, scores: &ScoreData, now: NaiveDateTime) -> CalendarResponse {
    let calendar = build_calendar(goal, scores.scores_for(&goal.title), now.date());
    let stats = build_stats(goal, &calendar, now);
    CalendarResponse::new(id, goal, &calendar, stats)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
