use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::GeoPoint;

// Wrapped point notation carries longitude first, per WKT.
static WKT_POINT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)point\s*\(\s*(-?\d+(?:\.\d+)?)\s+(-?\d+(?:\.\d+)?)\s*\)").unwrap()
});

// A "lat,lon" or "lat lon" pair anywhere in the surrounding text.
static PAIR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*(?:,\s*|\s+)(-?\d+(?:\.\d+)?)").unwrap());

/// Attempts to extract a coordinate pair from the composite
/// `Georeferenciado` text.
///
/// Recognizes `"lat,lon"`, whitespace-separated `"lat lon"`, and WKT-style
/// `POINT (lon lat)`, in arbitrary surrounding text. Returns `None` when no
/// pair is present or the candidate falls outside valid coordinate bounds;
/// absence is a normal state, not an error.
pub fn extract(text: &str) -> Option<GeoPoint> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = WKT_POINT_REGEX.captures(text) {
        let lon: f64 = caps[1].parse().ok()?;
        let lat: f64 = caps[2].parse().ok()?;
        return GeoPoint::new(lat, lon).ok();
    }

    let caps = PAIR_REGEX.captures(text)?;
    let lat: f64 = caps[1].parse().ok()?;
    let lon: f64 = caps[2].parse().ok()?;
    GeoPoint::new(lat, lon).ok()
}
