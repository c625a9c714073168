use crate::records::Notification;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

pub const UPCOMING_LIMIT: usize = 5;

/// Monday 00:00 of the week containing `now` (local time).
pub fn week_start(now: NaiveDateTime) -> NaiveDateTime {
    let from_sunday = now.weekday().num_days_from_sunday() as i64;
    let back = (from_sunday + 6) % 7;
    (now.date() - Duration::days(back)).and_time(NaiveTime::default())
}

pub fn week_end(start: NaiveDateTime) -> NaiveDateTime {
    start + Duration::days(7)
}

/// Accepts `YYYY-MM-DD` (local midnight), RFC 3339 timestamps (converted to
/// local time) and naive `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_when(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_time(NaiveTime::default()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()
}

pub fn in_week(when: NaiveDateTime, start: NaiveDateTime) -> bool {
    when >= start && when < week_end(start)
}

/// Reminders dated inside the current Monday-based week, in input order.
pub fn this_week(items: &[Notification], now: NaiveDateTime) -> Vec<&Notification> {
    let start = week_start(now);
    items
        .iter()
        .filter(|n| parse_when(&n.when).is_some_and(|w| in_week(w, start)))
        .collect()
}

/// First `limit` reminders by ascending date. Undated entries sort last.
pub fn upcoming(items: &[Notification], limit: usize) -> Vec<&Notification> {
    let mut sorted: Vec<(Option<NaiveDateTime>, &Notification)> =
        items.iter().map(|n| (parse_when(&n.when), n)).collect();
    sorted.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    sorted.into_iter().take(limit).map(|(_, n)| n).collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyView {
    pub week_start: String,
    pub week_end: String,
    pub this_week: Vec<Notification>,
    /// Filled only when nothing falls in the current week.
    pub upcoming: Vec<Notification>,
}

pub fn weekly_view(items: &[Notification], now: NaiveDateTime) -> WeeklyView {
    let start = week_start(now);
    let current: Vec<Notification> = this_week(items, now).into_iter().cloned().collect();
    let fallback = if current.is_empty() {
        upcoming(items, UPCOMING_LIMIT).into_iter().cloned().collect()
    } else {
        Vec::new()
    };
    WeeklyView {
        week_start: start.format("%Y-%m-%d").to_string(),
        week_end: week_end(start).format("%Y-%m-%d").to_string(),
        this_week: current,
        upcoming: fallback,
    }
}
