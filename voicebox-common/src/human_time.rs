//! Human-readable time formatting
//!
//! Media durations are shown the way users read them in a chat embed:
//! `M:SS` is never used, everything is `H:MM:SS`, and anything a day or longer
//! gets a day prefix.

const SECONDS_PER_DAY: u64 = 86_400;

/// Format whole seconds as `H:MM:SS`, or `Nd, H:MM:SS` past one day.
///
/// # Examples
///
/// ```
/// use voicebox_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0), "0:00:00");
/// assert_eq!(format_clock(215), "0:03:35");
/// assert_eq!(format_clock(21600), "6:00:00");
/// assert_eq!(format_clock(90061), "1d, 1:01:01");
/// ```
pub fn format_clock(seconds: u64) -> String {
    let days = seconds / SECONDS_PER_DAY;
    let rem = seconds % SECONDS_PER_DAY;
    let hours = rem / 3600;
    let mins = (rem % 3600) / 60;
    let secs = rem % 60;

    if days > 0 {
        format!("{}d, {}:{:02}:{:02}", days, hours, mins, secs)
    } else {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}
