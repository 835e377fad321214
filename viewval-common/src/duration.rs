//! Broadcast duration parsing
//!
//! The platform reports VOD lengths as compact tokens such as `"3h8m33s"`,
//! `"45m"` or `"12s"`. Each component is an integer immediately followed by
//! its unit letter; any component may be missing and the parser does not rely
//! on their order.
//!
//! Parsing never fails. A token that matches nothing is worth `0.0` hours so
//! that one malformed record cannot abort a batch aggregation.

use once_cell::sync::Lazy;
use regex::Regex;

static HOURS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)h").expect("valid hours pattern"));
static MINUTES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)m").expect("valid minutes pattern"));
static SECONDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)s").expect("valid seconds pattern"));

/// Convert a duration token to fractional hours
///
/// `hours + minutes / 60 + seconds / 3600`; only the first occurrence of each
/// unit counts.
///
/// # Examples
///
/// ```
/// use viewval_common::duration::parse_duration_hours;
///
/// assert_eq!(parse_duration_hours("2h"), 2.0);
/// assert_eq!(parse_duration_hours("90m"), 1.5);
/// assert_eq!(parse_duration_hours("1h30m"), 1.5);
/// assert_eq!(parse_duration_hours("garbage"), 0.0);
/// ```
pub fn parse_duration_hours(token: &str) -> f64 {
    if token.is_empty() {
        return 0.0;
    }

    let hours = component(&HOURS_RE, token);
    let minutes = component(&MINUTES_RE, token);
    let seconds = component(&SECONDS_RE, token);

    hours + minutes / 60.0 + seconds / 3600.0
}

/// Same as [`parse_duration_hours`], absent tokens count as zero
pub fn parse_duration_hours_opt(token: Option<&str>) -> f64 {
    token.map(parse_duration_hours).unwrap_or(0.0)
}

fn component(re: &Regex, token: &str) -> f64 {
    re.captures(token)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}
