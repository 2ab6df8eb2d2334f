use crate::error::{Result, StoryframeError};

/// Format seconds as `MM:SS`, `HH:MM:SS` past the hour, with an optional `.mmm` suffix.
///
/// Rounds to the nearest millisecond rather than flooring, so `59.9996` reads
/// `01:00.000`, not `00:59.999`.
pub fn format_time(seconds: f64, include_ms: bool) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return if include_ms { "00:00.000" } else { "00:00" }.to_string();
    }

    // Work in whole milliseconds so 3.25 never renders as 3.249.
    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let mins = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    let mut out = if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    };

    if include_ms {
        out.push_str(&format!(".{:03}", ms));
    }

    out
}

/// Parse `SS(.mmm)`, `MM:SS(.mmm)` or `HH:MM:SS(.mmm)` into seconds.
pub fn parse_timestamp(input: &str) -> Result<f64> {
    let unparsable = || StoryframeError::UnparsableTimestamp {
        input: input.to_string(),
    };

    let parts: Vec<&str> = input.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(unparsable());
    }

    let (whole, last) = parts.split_at(parts.len() - 1);
    let seconds: f64 = last[0].parse().map_err(|_| unparsable())?;
    if !whole.is_empty() && !(0.0..60.0).contains(&seconds) {
        return Err(unparsable());
    }

    let mut total = 0.0;
    for (i, part) in whole.iter().enumerate() {
        let value: u32 = part.parse().map_err(|_| unparsable())?;
        // minutes are bounded only when hours are present
        if i > 0 && value >= 60 {
            return Err(unparsable());
        }
        total = total * 60.0 + value as f64;
    }

    let total = total * 60.0 + seconds;
    if !total.is_finite() || total < 0.0 {
        return Err(StoryframeError::InvalidTimestamp(total));
    }
    Ok(total)
}
