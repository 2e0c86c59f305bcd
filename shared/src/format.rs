//! Display policy for region metrics.

/// Shown in place of a missing or non-finite value.
pub const PLACEHOLDER: &str = "—";

/// Scores and sub-scores: 3 decimal places.
pub fn format_score(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.3}"),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Population: rounded to the nearest integer with thousands grouping.
pub fn format_population(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => group_thousands(v.round() as i64),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Tooltip body for a hovered region.
pub fn tooltip_lines(name: Option<&str>, score: f64) -> (String, String) {
    (
        name.unwrap_or("Unknown").to_string(),
        format!("H: {score:.3}"),
    )
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
