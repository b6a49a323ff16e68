use chrono::{DateTime, Utc};

/// USD currency string with grouped thousands and exactly two fraction digits.
pub fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${grouped}.{frac:02}")
    } else {
        format!("${grouped}.{frac:02}")
    }
}

/// Signed percentage with two decimals; positive values get an explicit `+`.
pub fn format_percent(value: f64) -> String {
    if value >= 0.0 {
        format!("+{value:.2}%")
    } else {
        format!("{value:.2}%")
    }
}

/// Unsigned percentage with one decimal, used for win rates.
pub fn format_win_rate(value: f64) -> String {
    format!("{value:.1}%")
}

/// Signed currency, `+$1.20` / `-$0.50`, for PnL cells.
pub fn format_signed_currency(value: f64) -> String {
    if value >= 0.0 {
        format!("+{}", format_currency(value))
    } else {
        format_currency(value)
    }
}

/// Wall-clock elapsed time since `opened_at`, as `{h}h {m}m` or `{m}m`.
///
/// Recomputed at render time on each poll tick; never live-ticking.
pub fn format_elapsed(opened_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - opened_at).num_minutes().max(0);
    format_minutes(minutes)
}

/// A minute count as `{h}h {m}m` when at least an hour, else `{m}m`.
pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}
