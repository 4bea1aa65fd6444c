use crate::calendar::{Calendar, DayTile, MonthPill, TileState, Week, TILE_GAP, TILE_SIZE};
use crate::goals::{Goal, Score};
use crate::models::StatsResponse;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write;

pub const TOOLTIP_ID: &str = "tooltip";
/// How often the page refreshes each card's countdown and counters.
pub const REFRESH_INTERVAL_MS: u32 = 60_000;

/// Everything a card needs from its surroundings; passed to each card
/// instead of being looked up globally.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub now: NaiveDateTime,
    pub today: NaiveDate,
    pub tooltip_id: &'static str,
    pub refresh_ms: u32,
}

impl RenderContext {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now,
            today: now.date(),
            tooltip_id: TOOLTIP_ID,
            refresh_ms: REFRESH_INTERVAL_MS,
        }
    }
}

pub struct GoalCard<'a> {
    pub id: usize,
    pub goal: &'a Goal,
    pub calendar: Calendar,
    pub stats: StatsResponse,
}

pub fn render_index(ctx: &RenderContext, cards: &[GoalCard<'_>]) -> String {
    let body = if cards.is_empty() {
        r#"<section class="notice">No goals in the goal document yet.</section>"#.to_string()
    } else {
        cards.iter().map(render_card).collect::<String>()
    };
    render_page(ctx, &body)
}

/// Page shown when the goal document could not be loaded.
pub fn render_error(ctx: &RenderContext, message: &str) -> String {
    let body = format!(
        r#"<section class="notice error" role="alert"><h2>Goals could not be loaded</h2><p>{}</p></section>"#,
        escape_html(message)
    );
    render_page(ctx, &body)
}

fn render_page(ctx: &RenderContext, body: &str) -> String {
    INDEX_HTML
        .replace("{{TILE}}", &TILE_SIZE.to_string())
        .replace("{{GAP}}", &TILE_GAP.to_string())
        .replace("{{TODAY}}", &ctx.today.format("%A, %B %-d, %Y").to_string())
        .replace("{{TOOLTIP_ID}}", ctx.tooltip_id)
        .replace("{{REFRESH_MS}}", &ctx.refresh_ms.to_string())
        .replace("{{CARDS}}", body)
}

fn render_card(card: &GoalCard<'_>) -> String {
    let goal = card.goal;
    let stats = &card.stats;
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<article class="card" data-goal="{id}">
      <header class="card-head">
        <div>
          <h2>{title}</h2>
          <p class="range">{start} &rarr; {end}</p>
        </div>
        <div class="countdown" data-role="countdown">{countdown}</div>
      </header>
      <div class="counters">
        <span class="counter passed"{passed_style}><b data-role="passed">{passed}</b> passed</span>
        <span class="counter"><b data-role="left">{left}</b> left</span>
        <span class="counter"><b data-role="average">{average}</b> avg</span>
      </div>
      <div class="calendar">
        <div class="months">"#,
        id = card.id,
        title = escape_html(&goal.title),
        start = goal.start_date,
        end = goal.end_date,
        countdown = stats.countdown,
        passed_style = passed_style(goal),
        passed = stats.passed_days,
        left = stats.days_left,
        average = average_label(stats.average),
    );

    for pill in &card.calendar.months {
        html.push_str(&render_month(pill));
    }
    html.push_str(r#"</div><div class="weeks">"#);
    for (index, week) in card.calendar.weeks.iter().enumerate() {
        html.push_str(&render_week(index, week));
    }
    html.push_str(
        r#"</div>
      </div>
      <p class="status" data-role="status"></p>
    </article>"#,
    );

    html
}

fn render_month(pill: &MonthPill) -> String {
    format!(
        r#"<span class="month" style="width:{}px">{}</span>"#,
        pill.width(),
        escape_html(&pill.label)
    )
}

fn render_week(index: usize, week: &Week) -> String {
    let average = week.average();
    let tiles: String = week.days.iter().map(render_tile).collect();
    format!(
        r#"<div class="week" data-week="{index}" data-week-start="{start}">{tiles}<span class="avg" data-role="week-average" data-tip="Week of {start}: avg {average}">{average}</span></div>"#,
        start = week.start,
    )
}

fn render_tile(tile: &DayTile) -> String {
    let state = tile.state();
    let tip = escape_html(&tile_tip(tile));
    match (state, tile.score) {
        (TileState::Scored | TileState::Default, Some(score)) => format!(
            r#"<button type="button" class="tile {}" data-date="{}" data-score="{}" data-tip="{}" style="background:{}"></button>"#,
            state.as_str(),
            tile.key,
            score,
            tip,
            score_color(score)
        ),
        (TileState::OutOfRange, _) => r#"<span class="tile spacer"></span>"#.to_string(),
        _ => format!(
            r#"<span class="tile {}" data-date="{}" data-tip="{}"></span>"#,
            state.as_str(),
            tile.key,
            tip
        ),
    }
}

/// Red at 0 through green at 10.
pub fn score_color(score: Score) -> String {
    format!("hsl({}, 62%, 50%)", u32::from(score.value()) * 12)
}

pub fn tile_tip(tile: &DayTile) -> String {
    match (tile.state(), tile.score) {
        (TileState::Scored, Some(score)) => format!("{} · {score}", tile.key),
        (TileState::Default, Some(score)) => format!("{} · {score} (default)", tile.key),
        (TileState::Future, _) => format!("{} · upcoming", tile.key),
        (TileState::OutOfRange, _) => format!("{} · outside goal", tile.key),
        (_, None) => tile.key.clone(),
    }
}

fn passed_style(goal: &Goal) -> String {
    let mut style = String::new();
    if let Some(color) = &goal.passed_color {
        let _ = write!(style, "color:{color};");
    }
    if let Some(intensity) = goal.passed_intensity {
        let _ = write!(style, "opacity:{intensity};");
    }
    if style.is_empty() {
        style
    } else {
        format!(r#" style="{style}""#)
    }
}

fn average_label(average: Option<f64>) -> String {
    average
        .map(|value| format!("{value:.1}"))
        .unwrap_or_else(|| crate::calendar::AVERAGE_PLACEHOLDER.to_string())
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Goal Calendar</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --muted: #8b857d;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
      --tile: {{TILE}}px;
      --gap: {{GAP}}px;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1100px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 24px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(2rem, 4vw, 2.8rem);
      margin: 0;
    }

    .subtitle {
      margin: 6px 0 0;
      color: #5f5c57;
    }

    .card,
    .notice {
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 24px;
      box-shadow: var(--shadow);
      padding: 28px;
      display: grid;
      gap: 16px;
      overflow-x: auto;
    }

    .notice.error {
      color: #c63b2b;
    }

    .card-head {
      display: flex;
      flex-wrap: wrap;
      justify-content: space-between;
      align-items: flex-start;
      gap: 12px;
    }

    .card-head h2 {
      margin: 0;
      font-size: 1.4rem;
    }

    .range {
      margin: 4px 0 0;
      color: var(--muted);
      font-size: 0.9rem;
    }

    .countdown {
      font-size: 1.3rem;
      font-weight: 600;
      color: var(--accent-2);
      font-variant-numeric: tabular-nums;
    }

    .counters {
      display: flex;
      flex-wrap: wrap;
      gap: 18px;
      color: var(--muted);
      font-size: 0.9rem;
    }

    .counter b {
      color: var(--accent-2);
      font-size: 1.1rem;
    }

    .counter.passed {
      color: var(--accent);
    }

    .calendar {
      display: grid;
      gap: 6px;
      width: max-content;
    }

    .months,
    .weeks {
      display: flex;
      gap: var(--gap);
    }

    .month {
      flex: none;
      overflow: hidden;
      white-space: nowrap;
      font-size: 0.7rem;
      padding: 2px 6px;
      border-radius: 999px;
      background: rgba(47, 72, 88, 0.08);
      color: var(--accent-2);
    }

    .week {
      display: flex;
      flex-direction: column;
      gap: var(--gap);
      width: var(--tile);
    }

    .tile {
      display: block;
      width: var(--tile);
      height: var(--tile);
      padding: 0;
      border: none;
      border-radius: 3px;
      background: rgba(47, 72, 88, 0.06);
    }

    button.tile {
      cursor: pointer;
      transition: transform 120ms ease;
    }

    button.tile:hover {
      transform: scale(1.25);
    }

    .tile.default {
      opacity: 0.55;
      outline: 1px dashed rgba(47, 72, 88, 0.35);
      outline-offset: -1px;
    }

    .tile.future {
      background: rgba(47, 72, 88, 0.14);
    }

    .tile.spacer {
      background: transparent;
    }

    .avg {
      font-size: 0.55rem;
      text-align: center;
      color: var(--muted);
      white-space: nowrap;
    }

    .status {
      margin: 0;
      min-height: 1.2em;
      font-size: 0.9rem;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    #{{TOOLTIP_ID}} {
      position: absolute;
      transform: translate(-50%, -100%);
      pointer-events: none;
      background: var(--accent-2);
      color: white;
      font-size: 0.75rem;
      padding: 4px 8px;
      border-radius: 6px;
      white-space: nowrap;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Goal Calendar</h1>
      <p class="subtitle">{{TODAY}}. Click a past day to cycle its score from 0 to 10.</p>
    </header>
    {{CARDS}}
  </main>
  <div id="{{TOOLTIP_ID}}" hidden></div>

  <script>
    const ctx = {
      tooltip: document.getElementById('{{TOOLTIP_ID}}'),
      refreshMs: {{REFRESH_MS}}
    };

    const showTip = (ctx, target) => {
      const rect = target.getBoundingClientRect();
      ctx.tooltip.textContent = target.dataset.tip;
      ctx.tooltip.style.left = `${rect.left + rect.width / 2 + window.scrollX}px`;
      ctx.tooltip.style.top = `${rect.top + window.scrollY - 6}px`;
      ctx.tooltip.hidden = false;
    };

    const hideTip = (ctx) => {
      ctx.tooltip.hidden = true;
    };

    const setStatus = (card, message, type) => {
      const statusEl = card.querySelector('[data-role="status"]');
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const formatAverage = (value) => (value === null ? '--' : value.toFixed(1));

    const applyStats = (card, stats) => {
      card.querySelector('[data-role="countdown"]').textContent = stats.countdown;
      card.querySelector('[data-role="passed"]').textContent = stats.passed_days;
      card.querySelector('[data-role="left"]').textContent = stats.days_left;
      card.querySelector('[data-role="average"]').textContent = formatAverage(stats.average);
    };

    const applyUpdate = (ctx, card, tile, update) => {
      tile.className = `tile ${update.tile.state}`;
      tile.dataset.score = update.tile.score;
      tile.dataset.tip = update.tip;
      if (update.color) {
        tile.style.background = update.color;
      }

      const week = card.querySelector(`[data-week="${update.week_index}"]`);
      const avg = week.querySelector('[data-role="week-average"]');
      avg.textContent = update.week_average_label;
      avg.dataset.tip = `Week of ${week.dataset.weekStart}: avg ${update.week_average_label}`;

      applyStats(card, update.stats);
      if (!ctx.tooltip.hidden) {
        showTip(ctx, tile);
      }
    };

    const mountCard = (ctx, card) => {
      const id = card.dataset.goal;

      card.addEventListener('mouseover', (event) => {
        const target = event.target.closest('[data-tip]');
        if (target) {
          showTip(ctx, target);
        }
      });
      card.addEventListener('mouseleave', () => hideTip(ctx));

      card.addEventListener('click', async (event) => {
        const tile = event.target.closest('button.tile');
        if (!tile) {
          return;
        }
        try {
          const res = await fetch(`/api/goals/${id}/days/${tile.dataset.date}/cycle`, { method: 'POST' });
          if (!res.ok) {
            throw new Error((await res.text()) || 'Request failed');
          }
          applyUpdate(ctx, card, tile, await res.json());
          setStatus(card, '', '');
        } catch (err) {
          setStatus(card, err.message, 'error');
        }
      });

      const refresh = async () => {
        const res = await fetch(`/api/goals/${id}/stats`);
        if (!res.ok) {
          throw new Error('Unable to refresh countdown');
        }
        applyStats(card, await res.json());
      };

      setInterval(() => refresh().catch((err) => setStatus(card, err.message, 'error')), ctx.refreshMs);
    };

    document.querySelectorAll('.card[data-goal]').forEach((card) => mountCard(ctx, card));
  </script>
</body>
</html>
"#;
