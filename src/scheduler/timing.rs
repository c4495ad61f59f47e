//! Next-run arithmetic for interval, daily and weekly schedules.
//!
//! All functions take the "from" instant explicitly so scheduling math is
//! testable without a clock. Malformed "HH:MM" anchors fall back to a
//! per-caller default rather than failing - a bad config must never crash
//! the dispatch loop.

use chrono::{
    DateTime, Datelike, Days, Duration, DurationRound, Local, NaiveDate, TimeZone, Weekday,
};

/// Parse an "HH:MM" anchor. Returns `None` when malformed or out of range.
pub fn parse_hhmm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.split_once(':')?;
    let hour: u32 = h.trim().parse().ok()?;
    let minute: u32 = m.trim().parse().ok()?;
    if hour >= 24 || minute >= 60 {
        return None;
    }
    Some((hour, minute))
}

/// Resolve a local wall-clock time on a given date.
///
/// `None` only when the combination does not exist locally (DST gap).
pub fn local_at(date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Local>> {
    Local
        .from_local_datetime(&date.and_hms_opt(hour, minute, 0)?)
        .earliest()
}

/// Next run of an interval task: `truncate(from, minute) + interval`,
/// advanced by whole intervals until strictly after `from`.
///
/// Aligning to minute boundaries makes successive runs land on
/// predictable clock minutes instead of drifting by execution latency.
pub fn next_interval_run(from: DateTime<Local>, interval_minutes: u32) -> DateTime<Local> {
    let interval = Duration::minutes(i64::from(interval_minutes.max(1)));
    let base = from.duration_trunc(Duration::minutes(1)).unwrap_or(from);
    let mut next = base + interval;
    while next <= from {
        next += interval;
    }
    next
}

/// Next run of a daily task anchored at `anchor` ("HH:MM", default 00:00).
///
/// If `from` is at or after today's anchor the next run is tomorrow's
/// anchor; equality counts as already past so a run exactly at the anchor
/// never fires again in the same tick.
pub fn next_daily_run(from: DateTime<Local>, anchor: &str) -> DateTime<Local> {
    let (hour, minute) = parse_hhmm(anchor).unwrap_or((0, 0));
    let mut date = from.date_naive();
    // A couple of extra days covers DST gaps at the anchor time.
    for _ in 0..4 {
        if let Some(t) = local_at(date, hour, minute) {
            if t > from {
                return t;
            }
        }
        match date.succ_opt() {
            Some(d) => date = d,
            None => break,
        }
    }
    from + Duration::days(1)
}

/// Next run of a weekly task on `weekday` at `anchor` ("HH:MM", default
/// 09:00). If today is the target weekday but the anchor has passed, the
/// run moves to next week.
pub fn next_weekly_run(from: DateTime<Local>, weekday: Weekday, anchor: &str) -> DateTime<Local> {
    let (hour, minute) = parse_hhmm(anchor).unwrap_or((9, 0));
    let days_ahead =
        i64::from(weekday.number_from_monday()) - i64::from(from.weekday().number_from_monday());
    let days_ahead = days_ahead.rem_euclid(7) as u64;

    let candidate = from
        .date_naive()
        .checked_add_days(Days::new(days_ahead))
        .and_then(|d| local_at(d, hour, minute));
    if let Some(t) = candidate {
        if t > from {
            return t;
        }
    }

    from.date_naive()
        .checked_add_days(Days::new(days_ahead + 7))
        .and_then(|d| local_at(d, hour, minute))
        .unwrap_or(from + Duration::days(7))
}

/// Map a 1..=7 weekday number (1=Monday .. 7=Sunday) to a [`Weekday`].
/// Out-of-range values fall back to Monday.
pub fn weekday_from_number(n: u8) -> Weekday {
    match n {
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        7 => Weekday::Sun,
        _ => Weekday::Mon,
    }
}

/// ISO week key for a timestamp, e.g. "2026-W23".
pub fn iso_week_key(t: DateTime<Local>) -> String {
    let week = t.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}
