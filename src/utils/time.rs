use std::time::Duration;

/// Parses Consul style durations: `10m`, `30s`, `1.5h`, `250ms`.
///
/// A bare number is read as seconds. Returns `None` for blank input, unknown
/// units or negative values.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(secs) = trimmed.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let split_idx = trimmed
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_digit() || *ch == '.'))
        .map(|(idx, _)| idx)?;
    let (number, unit) = trimmed.split_at(split_idx);
    let value: f64 = number.parse().ok()?;
    let millis_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        _ => return None,
    };
    let millis = value * millis_per_unit;
    if !millis.is_finite() || millis < 0.0 {
        return None;
    }
    Some(Duration::from_millis(millis.round() as u64))
}

/// Formats `duration` in a notation Consul's `wait` parameter accepts
///
/// Whole seconds as `600s`, anything finer as `250ms`.
pub fn format_consul_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{millis}ms")
    }
}
