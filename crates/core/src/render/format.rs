//! Number and class formatting shared by the template helpers.

/// Below 1000: integers as-is, otherwise 3 decimals. From 1000 up: thousands
/// separators and at most 2 decimals.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return String::new();
    }
    if n.abs() < 1000.0 {
        if n.fract() == 0.0 {
            format!("{}", n as i64)
        } else {
            format!("{n:.3}")
        }
    } else {
        group_thousands(n, 2)
    }
}

/// `+1,234.5` / `-0.250`. Zero renders unsigned.
pub fn format_change(v: f64) -> String {
    let body = format_number(v.abs());
    if v > 0.0 {
        format!("+{body}")
    } else if v < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}

pub fn format_change_percent(v: f64) -> String {
    if !v.is_finite() {
        return String::new();
    }
    if v > 0.0 {
        format!("+{v}%")
    } else {
        format!("{v}%")
    }
}

pub fn change_class(v: Option<f64>) -> &'static str {
    match v {
        Some(v) if v > 0.0 => "positive",
        Some(v) if v < 0.0 => "negative",
        _ => "neutral",
    }
}

/// Inline CSS for the classes the helpers emit.
pub fn class_style(class: &str) -> &'static str {
    match class {
        "positive" => "color:#d32f2f;",
        "negative" => "color:#1565c0;",
        "neutral" => "color:#555555;",
        "star-filled" => "color:#f5a623;",
        "star-empty" => "color:#dddddd;",
        _ => "",
    }
}

/// Three star spans, the first `importance` filled. Out-of-range values clamp.
pub fn importance_stars(importance: Option<f64>) -> String {
    let filled = importance
        .filter(|n| n.is_finite() && *n >= 1.0)
        .map(|n| n as usize)
        .unwrap_or(1);
    (0..3)
        .map(|i| {
            let class = if i < filled { "star-filled" } else { "star-empty" };
            format!(
                "<span class=\"{class}\" style=\"{}\">★</span>",
                class_style(class)
            )
        })
        .collect()
}

/// `1.30T`, `4.20B`, `7.00M`, else grouped.
pub fn format_large_number(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    if v >= 1e12 {
        format!("{:.2}T", v / 1e12)
    } else if v >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if v >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else {
        group_thousands(v, 3)
    }
}

/// Compares two human-formatted numbers ("3.3%", "1,234K"). Empty input gives
/// no class.
pub fn value_class(value: &str, previous: &str) -> &'static str {
    if value.is_empty() || previous.is_empty() {
        return "";
    }
    match (loose_number(value), loose_number(previous)) {
        (Some(v), Some(p)) if v > p => "positive",
        (Some(v), Some(p)) if v < p => "negative",
        _ => "neutral",
    }
}

fn loose_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().ok()
}

fn group_thousands(n: f64, max_frac: usize) -> String {
    let fixed = format!("{:.*}", max_frac, n.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac.trim_end_matches('0');

    let mut out = String::with_capacity(fixed.len() + int.len() / 3 + 1);
    if n < 0.0 {
        out.push('-');
    }
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}
