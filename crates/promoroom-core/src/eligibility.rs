//! Rolling-window rate limiting for ad serving.

use crate::config::ONE_HOUR_SECONDS;

/// Count the history entries younger than `window_secs` and check the count
/// stays within `allowed`. Timestamps in the future are not counted.
pub fn respects_rolling_time_constraint(
    shown_history: &[u64],
    now: u64,
    window_secs: u64,
    allowed: u64,
) -> bool {
    let recent = shown_history
        .iter()
        .filter(|&&shown| now.checked_sub(shown).is_some_and(|age| age < window_secs))
        .count() as u64;

    recent <= allowed
}

/// Whether the serving history permits showing another ad right now.
///
/// Three constraints, all of which must hold:
/// 1. at most `ads_per_hour` ads in the last hour,
/// 2. at most `ads_per_day` ads in the day window (which is evaluated over
///    the same one-hour span as the hourly cap),
/// 3. no ad at all in the last `ONE_HOUR_SECONDS / ads_per_hour` seconds,
///    enforcing a minimum spacing between consecutive ads.
///
/// An hourly cap of zero disables serving outright.
pub fn is_allowed_to_show_ads(
    shown_history: &[u64],
    now: u64,
    ads_per_hour: u64,
    ads_per_day: u64,
) -> bool {
    let hour_window = ONE_HOUR_SECONDS;
    let respects_hour_limit =
        respects_rolling_time_constraint(shown_history, now, hour_window, ads_per_hour);

    let day_window = ONE_HOUR_SECONDS;
    let respects_day_limit =
        respects_rolling_time_constraint(shown_history, now, day_window, ads_per_day);

    let minimum_wait_time = match hour_window.checked_div(ads_per_hour) {
        Some(window) => window,
        None => return false,
    };
    let respects_minimum_wait_time =
        respects_rolling_time_constraint(shown_history, now, minimum_wait_time, 0);

    respects_hour_limit && respects_day_limit && respects_minimum_wait_time
}
