// src/config/duration.rs

use std::time::Duration;

/// Parse a simple duration string like `"5s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => seconds(value, 60, s).map(Duration::from_secs),
        "h" => seconds(value, 60 * 60, s).map(Duration::from_secs),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

fn seconds(value: u64, per_unit: u64, raw: &str) -> Result<u64, String> {
    value
        .checked_mul(per_unit)
        .ok_or_else(|| format!("invalid duration '{}': too large", raw))
}
