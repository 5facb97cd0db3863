//! Time formatting for the remaining-time label.

/// Label text shown while no duration is known.
pub const PLACEHOLDER: &str = "--:--";

/// Render seconds as `M:SS`.
///
/// Non-finite input (NaN before metadata loads, infinity for unbounded streams) maps to
/// [`PLACEHOLDER`]. Fractions are floored and negative values clamp to zero.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return PLACEHOLDER.to_string();
    }
    let total = seconds.floor().max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format the time left when `position` seconds of `duration` have played.
pub fn format_remaining(duration: f64, position: f64) -> String {
    format_time(duration - position)
}
