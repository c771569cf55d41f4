//! Money arithmetic on integer minor units.
//!
//! Amounts are `i64` cents and rates are `i64` basis points (1 bp = 0.01 %),
//! so `10_000` bp is 100 %. Nothing in this module uses floating point.

use crate::errors::CoreError;

/// Basis points in one whole (100 %).
pub const BPS_SCALE: i64 = 10_000;

/// Compute the return credited to `amount_cents` at `rate_bps`.
///
/// The product is taken in `i128` and rounded half away from zero to the
/// nearest cent, so a negative rate debits symmetrically.
#[must_use]
pub fn compute_return(amount_cents: i64, rate_bps: i64) -> i64 {
    let product = i128::from(amount_cents) * i128::from(rate_bps);
    let scale = i128::from(BPS_SCALE);
    let quotient = product / scale;
    let remainder = product % scale;

    let rounded = if remainder.abs() * 2 >= scale {
        quotient + product.signum()
    } else {
        quotient
    };

    // Saturate for rates outside [-100 %, 100 %].
    i64::try_from(rounded).unwrap_or(if rounded.is_negative() { i64::MIN } else { i64::MAX })
}

/// Format cents as a decimal string with thousands separators (`"12,345.67"`).
#[must_use]
pub fn format_cents(cents: i64) -> String {
    let negative = cents < 0;
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let frac = abs % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{grouped}.{frac:02}")
    } else {
        format!("{grouped}.{frac:02}")
    }
}

/// Format a basis-point rate as a percentage string (`250` → `"2.50%"`).
#[must_use]
pub fn format_rate(rate_bps: i64) -> String {
    let sign = if rate_bps < 0 { "-" } else { "" };
    let abs = rate_bps.unsigned_abs();
    format!("{sign}{}.{:02}%", abs / 100, abs % 100)
}

/// Parse a percentage with at most two decimals into basis points.
///
/// `"2.5"` → `250`, `"-0.75"` → `-75`, `"3"` → `300`. A trailing `%` is allowed.
///
/// # Errors
///
/// Returns `CoreError::Validation` for empty input, non-digits, or more than
/// two decimal places.
pub fn parse_rate_percent(input: &str) -> Result<i64, CoreError> {
    let trimmed = input.trim().trim_end_matches('%').trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(CoreError::Validation(format!("invalid rate '{input}'")));
    }
    if frac.len() > 2 {
        return Err(CoreError::Validation(format!(
            "rate '{input}' has more than two decimal places"
        )));
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(CoreError::Validation(format!("invalid rate '{input}'")));
    }

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| CoreError::Validation(format!("rate '{input}' is out of range")))?
    };
    let frac_value: i64 = match frac.len() {
        0 => 0,
        1 => i64::from(frac.as_bytes()[0] - b'0') * 10,
        _ => frac
            .parse()
            .map_err(|_| CoreError::Validation(format!("invalid rate '{input}'")))?,
    };

    let bps = whole_value
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| CoreError::Validation(format!("rate '{input}' is out of range")))?;

    Ok(if negative { -bps } else { bps })
}
