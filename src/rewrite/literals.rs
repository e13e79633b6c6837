//! Literal normalisation: percentages and heights

use std::sync::OnceLock;

use regex::Regex;

static HEIGHT_RE: OnceLock<Regex> = OnceLock::new();

fn height_regex() -> &'static Regex {
    HEIGHT_RE.get_or_init(|| {
        Regex::new(r"^\s*([4-7])\s*[-']\s*(\d{1,2})\s*\x22?\s*$").expect("valid height regex")
    })
}

/// `45%` becomes `0.45`
pub fn percentage(value: f64) -> f64 {
    value / 100.0
}

/// Canonical zero-padded height string: `6-07`
pub fn canonical_height(feet: u8, inches: u8) -> String {
    format!("{}-{:02}", feet, inches)
}

/// Parses `6-7`, `6-07` or `6'7"` into feet and inches
pub fn parse_height(text: &str) -> Option<(u8, u8)> {
    let caps = height_regex().captures(text)?;
    let feet: u8 = caps.get(1)?.as_str().parse().ok()?;
    let inches: u8 = caps.get(2)?.as_str().parse().ok()?;
    if inches > 11 {
        return None;
    }
    Some((feet, inches))
}

/// Canonical form of a height string, if it is one
pub fn normalize_height(text: &str) -> Option<String> {
    parse_height(text).map(|(feet, inches)| canonical_height(feet, inches))
}

/// Total inches of a height string
pub fn height_inches(text: &str) -> Option<f64> {
    parse_height(text).map(|(feet, inches)| f64::from(feet) * 12.0 + f64::from(inches))
}
