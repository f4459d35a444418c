//! Daily cache cutover boundary math.
//!
//! Every cached GitHub response expires at the next 18:00 local time rather
//! than a fixed duration after its write, so all analytics reset together
//! once per day. These are pure functions of a supplied instant; the no-arg
//! forms sample `Local::now()` once so TTL and absolute boundary stay
//! consistent with each other.

use chrono::{DateTime, Days, Local, LocalResult, NaiveDate, NaiveTime, TimeZone};

/// Local wall-clock hour at which all cache entries expire.
pub const CUTOVER_HOUR: u32 = 18;

/// Seconds (ceiling-rounded, always >= 1) until the next 18:00 local.
pub fn ttl_until_cutover() -> u64 {
    ttl_until_cutover_at(Local::now())
}

/// Seconds until the next cutover strictly after `now`.
pub fn ttl_until_cutover_at(now: DateTime<Local>) -> u64 {
    let delta = next_cutover_at(now) - now;
    let whole = delta.num_seconds();
    let secs = if delta.subsec_nanos() > 0 {
        whole + 1
    } else {
        whole
    };
    secs.max(1) as u64
}

/// The next 18:00 local instant strictly after now.
pub fn next_cutover() -> DateTime<Local> {
    next_cutover_at(Local::now())
}

/// The next 18:00 local instant strictly after `now`. An instant exactly at
/// 18:00:00.000 rolls over to tomorrow's boundary.
pub fn next_cutover_at(now: DateTime<Local>) -> DateTime<Local> {
    let today = cutover_on(now.date_naive());
    if now < today {
        today
    } else {
        cutover_on(now.date_naive() + Days::new(1))
    }
}

/// Whether local time is at or past 18:00 today.
pub fn is_past_cutover() -> bool {
    is_past_cutover_at(Local::now())
}

/// Whether `now` is at or past its own day's 18:00.
pub fn is_past_cutover_at(now: DateTime<Local>) -> bool {
    now >= cutover_on(now.date_naive())
}

/// Resolve `date` 18:00 to a local instant.
///
/// DST rule: an ambiguous 18:00 (clocks rolled back) maps to the earliest
/// occurrence; a nonexistent 18:00 (clocks rolled forward across it, which no
/// current zone does at 6 PM) is interpreted against UTC as a last resort.
fn cutover_on(date: NaiveDate) -> DateTime<Local> {
    let wall = NaiveTime::from_hms_opt(CUTOVER_HOUR, 0, 0).expect("18:00:00 is a valid time");
    match Local.from_local_datetime(&date.and_time(wall)) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => Local.from_utc_datetime(&date.and_time(wall)),
    }
}
