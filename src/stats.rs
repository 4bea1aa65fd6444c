use crate::calendar::{Average, Calendar};
use crate::goals::Goal;
use crate::models::StatsResponse;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const MINUTES_PER_DAY: i64 = 24 * 60;

pub fn build_stats(goal: &Goal, calendar: &Calendar, now: NaiveDateTime) -> StatsResponse {
    let today = now.date();
    let in_range = calendar.tiles().filter(|tile| tile.in_range);

    StatsResponse {
        passed_days: passed_days(goal, today),
        days_left: days_left(goal, today),
        scored_days: calendar
            .tiles()
            .filter(|tile| tile.in_range && tile.score.is_some() && !tile.is_default)
            .count() as u32,
        average: Average::of(in_range).rounded(),
        countdown: format_countdown(now, countdown_target(goal)),
    }
}

/// In-range days on or before today. Days showing the implicit default count too.
pub fn passed_days(goal: &Goal, today: NaiveDate) -> u32 {
    if today < goal.start_date {
        return 0;
    }
    let last = today.min(goal.end_date);
    (last - goal.start_date).num_days() as u32 + 1
}

pub fn days_left(goal: &Goal, today: NaiveDate) -> u32 {
    (goal.end_date - today).num_days().max(0) as u32
}

/// The moment the goal's last day ends.
pub fn countdown_target(goal: &Goal) -> NaiveDateTime {
    goal.end_date
        .succ_opt()
        .unwrap_or(goal.end_date)
        .and_time(NaiveTime::MIN)
}

pub fn format_countdown(now: NaiveDateTime, target: NaiveDateTime) -> String {
    let minutes = (target - now).num_minutes().max(0);
    format!(
        "{}d {}h {}m",
        minutes / MINUTES_PER_DAY,
        minutes % MINUTES_PER_DAY / 60,
        minutes % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::build_calendar;
    use crate::goals::parse_goals;
    use chrono::Duration;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn goal(json: &str) -> Goal {
        parse_goals(json).unwrap().remove(0)
    }

    #[test]
    fn countdown_formats_days_hours_minutes() {
        let now = at(2025, 12, 1, 8, 0);
        let target = now + Duration::days(2) + Duration::hours(3) + Duration::minutes(15);
        assert_eq!(format_countdown(now, target), "2d 3h 15m");
        assert_eq!(
            format_countdown(now, target + Duration::seconds(59)),
            "2d 3h 15m"
        );
    }

    #[test]
    fn countdown_floors_at_zero() {
        let now = at(2025, 12, 1, 8, 0);
        assert_eq!(format_countdown(now, now - Duration::hours(5)), "0d 0h 0m");
        assert_eq!(format_countdown(now, now), "0d 0h 0m");
    }

    #[test]
    fn countdown_targets_end_of_last_day() {
        let goal = goal(r#"[{"title":"X","endDate":"2025-12-31"}]"#);
        assert_eq!(countdown_target(&goal), at(2026, 1, 1, 0, 0));
        assert_eq!(
            format_countdown(at(2025, 12, 30, 20, 45), countdown_target(&goal)),
            "1d 3h 15m"
        );
    }

    #[test]
    fn passed_and_left_days() {
        let goal = goal(r#"[{"title":"X","startDate":"2025-12-01","endDate":"2025-12-31"}]"#);
        let day = |d| NaiveDate::from_ymd_opt(2025, 12, d).unwrap();

        assert_eq!(passed_days(&goal, day(1)), 1);
        assert_eq!(passed_days(&goal, day(10)), 10);
        assert_eq!(passed_days(&goal, NaiveDate::from_ymd_opt(2025, 11, 30).unwrap()), 0);
        assert_eq!(passed_days(&goal, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()), 31);

        assert_eq!(days_left(&goal, day(1)), 30);
        assert_eq!(days_left(&goal, day(31)), 0);
        assert_eq!(days_left(&goal, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()), 0);
    }

    #[test]
    fn stats_count_explicit_scores_and_average() {
        let goal = goal(
            r#"[{"title":"X","startDate":"2025-12-01","endDate":"2025-12-31",
                "defaultScore":3,"scores":{"2025-12-01":9}}]"#,
        );
        let now = at(2025, 12, 3, 12, 0);
        let calendar = build_calendar(&goal, None, now.date());
        let stats = build_stats(&goal, &calendar, now);

        assert_eq!(stats.passed_days, 3);
        assert_eq!(stats.days_left, 28);
        assert_eq!(stats.scored_days, 1);
        // 9, 3, 3
        assert_eq!(stats.average, Some(5.0));
        assert_eq!(stats.countdown, "28d 12h 0m");
    }
}
