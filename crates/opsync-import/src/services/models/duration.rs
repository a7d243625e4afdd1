//! ISO 8601 duration parsing
//!
//! The tracking service reports estimated and spent time as ISO 8601
//! durations ("PT2H", "PT30M", "P1DT4H"). Local entities store fractional
//! hours.

/// Parse an ISO 8601 duration into hours. Returns `None` for malformed
/// input and for calendar units (years, months) whose length is ambiguous.
pub fn parse_duration_hours(input: &str) -> Option<f64> {
    let rest = input.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };

    let mut hours = 0.0;
    for (value, unit) in components(date_part)? {
        match unit {
            'W' => hours += value * 7.0 * 24.0,
            'D' => hours += value * 24.0,
            _ => return None,
        }
    }
    for (value, unit) in components(time_part)? {
        match unit {
            'H' => hours += value,
            'M' => hours += value / 60.0,
            'S' => hours += value / 3600.0,
            _ => return None,
        }
    }

    Some(hours)
}

/// Split "1D", "2H30M" style runs into (value, designator) pairs.
fn components(part: &str) -> Option<Vec<(f64, char)>> {
    let mut out = Vec::new();
    let mut number = String::new();

    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
        } else if c.is_ascii_alphabetic() {
            let value: f64 = number.parse().ok()?;
            out.push((value, c));
            number.clear();
        } else {
            return None;
        }
    }

    // Trailing digits without a designator
    if !number.is_empty() {
        return None;
    }

    Some(out)
}
