/// Utility functions
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Compass points in bearing order, 45 degrees apart
pub const COMPASS_POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Extract number from JSON value
pub fn num(v: &Value) -> Option<f64> {
    if let Some(x) = v.as_f64() {
        return Some(x);
    }
    if let Some(s) = v.as_str() {
        return s.trim().parse::<f64>().ok();
    }
    None
}

/// Coerce a JSON value into a latitude, rejecting anything off the globe
pub fn latitude(v: &Value) -> Option<f64> {
    num(v).filter(|x| x.is_finite() && (-90.0..=90.0).contains(x))
}

/// Coerce a JSON value into a longitude, rejecting anything off the globe
pub fn longitude(v: &Value) -> Option<f64> {
    num(v).filter(|x| x.is_finite() && (-180.0..=180.0).contains(x))
}

/// Coerce a JSON value into display text; numbers are printed, blanks dropped
pub fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// URL-safe identifier derived from a display name.
///
/// Accents are folded to their base letter, every run of characters outside
/// `[a-z0-9]` collapses to one hyphen, and edge hyphens are trimmed.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Compass label for a bearing in degrees. Any finite bearing resolves,
/// including negative values and values past a full turn.
pub fn direction_label(degrees: f64) -> &'static str {
    // floor(x + 0.5) keeps halves rounding upwards for negative bearings too
    let index = (degrees / 45.0 + 0.5).floor() as i64;
    COMPASS_POINTS[index.rem_euclid(8) as usize]
}

/// Parse an upstream timestamp (RFC 3339 or naive `YYYY-MM-DD HH:MM:SS` in UTC)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    None
}
