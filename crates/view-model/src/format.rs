//! Text formatting for amounts, percentages and quantities.
//!
//! Every function here is total: non-finite or missing input renders a
//! placeholder instead of failing.

use chrono::{DateTime, Local, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, RoundingStrategy};
use rust_decimal::Decimal;

pub const PLACEHOLDER: &str = "-";

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Rounds to the nearest integer with ties going toward positive infinity.
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Inserts a comma every three digits of a plain digit string.
fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn grouped_integer(value: f64) -> String {
    let rounded = round_half_up(value);
    let digits = format!("{:.0}", rounded.abs());
    if rounded < 0.0 {
        format!("-{}", group_digits(&digits))
    } else {
        group_digits(&digits)
    }
}

/// Two fraction digits, ties away from zero, thousands-grouped.
fn grouped_fixed2(value: f64) -> String {
    let (negative, int_part, frac_part) = match Decimal::from_f64(value) {
        Some(decimal) => {
            let rounded = decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            let negative = rounded.is_sign_negative() && !rounded.is_zero();
            let text = rounded.abs().to_string();
            let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
            (negative, int_part.to_string(), frac_part.to_string())
        }
        // Beyond the decimal range; binary rounding is as good as anything there.
        None => {
            let text = format!("{:.2}", value.abs());
            let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
            let negative = value < 0.0 && text.chars().any(|c| c.is_ascii_digit() && c != '0');
            (negative, int_part.to_string(), frac_part.to_string())
        }
    };

    let mut frac = frac_part;
    while frac.len() < 2 {
        frac.push('0');
    }
    let sign = if negative { "-" } else { "" };
    format!("{sign}{}.{frac}", group_digits(&int_part))
}

/// A number as plain text: integral values without a fraction, no grouping.
pub fn plain_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

/// `"KRW 1,234"`, or `"KRW -"` when the amount is unknown.
pub fn format_krw(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("KRW {}", grouped_integer(v)),
        None => format!("KRW {PLACEHOLDER}"),
    }
}

/// `"+KRW 1,234"` for gains, `"KRW -1,234"` for losses.
pub fn format_signed_krw(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => {
            let sign = if v > 0.0 { "+" } else { "" };
            format!("{sign}KRW {}", grouped_integer(v))
        }
        None => PLACEHOLDER.to_string(),
    }
}

/// `"+1.23%"`; the sign is explicit for positive values only.
pub fn format_pct(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => {
            let sign = if v > 0.0 { "+" } else { "" };
            format!("{sign}{}%", grouped_fixed2(v))
        }
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_pct_unsigned(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("{}%", grouped_fixed2(v)),
        None => PLACEHOLDER.to_string(),
    }
}

/// Up to eight fraction digits with trailing zeros removed.
pub fn format_qty(value: Option<f64>) -> String {
    let Some(v) = finite(value) else {
        return PLACEHOLDER.to_string();
    };
    let fixed = format!("{v:.8}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// A price rounded to a whole unit and thousands-grouped, without currency.
pub fn format_grouped(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => grouped_integer(v),
        None => PLACEHOLDER.to_string(),
    }
}

/// Renders a fill timestamp as `YYYY-MM-DD HH:MM:SS` in local time.
///
/// Offset-less timestamps are shown as they are; anything unparseable is
/// returned verbatim.
pub fn format_executed_at(raw: &str) -> String {
    const OUTPUT: &str = "%Y-%m-%d %H:%M:%S";
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Local).format(OUTPUT).to_string();
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return ts.format(OUTPUT).to_string();
    }
    raw.to_string()
}

/// Direction of a signed value. At most one of `up`/`down` is ever active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    pub fn of(value: Option<f64>) -> Self {
        match finite(value) {
            Some(v) if v > 0.0 => Trend::Up,
            Some(v) if v < 0.0 => Trend::Down,
            _ => Trend::Neutral,
        }
    }

    pub fn css_class(&self) -> Option<&'static str> {
        match self {
            Trend::Up => Some("up"),
            Trend::Down => Some("down"),
            Trend::Neutral => None,
        }
    }
}

/// Text paired with the trend colour it is rendered in.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendText {
    pub text: String,
    pub trend: Trend,
}

impl TrendText {
    pub fn signed_krw(value: Option<f64>) -> Self {
        Self {
            text: format_signed_krw(value),
            trend: Trend::of(value),
        }
    }

    pub fn pct(value: Option<f64>) -> Self {
        Self {
            text: format_pct(value),
            trend: Trend::of(value),
        }
    }
}
