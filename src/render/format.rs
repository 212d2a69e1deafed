//! Number formatting for odds figures.

/// Odds at or above this render as a certainty.
const CERTAIN: f64 = 99.995;
/// Odds at or below this render as impossible.
const IMPOSSIBLE: f64 = 0.001;

/// Up to two fractional digits, trailing zeros dropped. Ties round away
/// from zero.
fn two_digits(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let fixed = format!("{rounded:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Format a playoff percentage: `58.35%`, `100% ✓`, `0% ×`.
pub fn format_odds(value: f64) -> String {
    if value >= CERTAIN {
        "100% ✓".to_string()
    } else if value <= IMPOSSIBLE {
        "0% ×".to_string()
    } else {
        format!("{}%", two_digits(value))
    }
}

/// Format the magnitude of a change between two figures, without the
/// certainty markers.
pub fn format_delta(change: f64) -> String {
    format!("{}%", two_digits(change.abs()))
}
