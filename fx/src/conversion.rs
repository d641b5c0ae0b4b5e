//! Currency conversion and amount formatting.
//!
//! Conversion always goes through the pivot: the cached table only holds
//! pivot-relative rates, so `from -> pivot -> to` is the only path. All
//! arithmetic is `f64` with no intermediate rounding, which means
//! `pivot -> X -> pivot` is close to, but not always bit-identical with,
//! the starting amount.

use finmate_common::{Currency, CurrencyCode, Grouping, RateSnapshot};
use rust_decimal::prelude::*;

/// Rate of `code` in `snapshot`: the pivot is `1`, unknown codes are `1`.
///
/// Defaulting unknown codes to `1` silently mis-converts currencies the
/// feed omitted. Callers that care can check `snapshot.table.contains`.
pub fn rate(code: &str, snapshot: &RateSnapshot) -> f64 {
    snapshot.rate(code)
}

/// Convert `amount` of `from` into `to`.
pub fn convert(amount: f64, from: &str, snapshot: &RateSnapshot, to: &str) -> f64 {
    let from = CurrencyCode::new(from);
    let to = CurrencyCode::new(to);
    if from == to {
        return amount;
    }

    let amount_in_pivot = if from == *snapshot.pivot() {
        amount
    } else {
        amount / rate(from.as_str(), snapshot)
    };

    amount_in_pivot * rate(to.as_str(), snapshot)
}

/// Render `amount` as `[-]{symbol}{grouped integer}.{two digits}`.
///
/// Cents are rounded half away from zero on the exact binary value, so
/// `1.125` shows as `1.13`. Values that round to zero are printed unsigned.
pub fn format(amount: f64, currency: &Currency, grouping: Grouping) -> String {
    if amount.is_nan() {
        return format!("{}NaN", currency.symbol);
    }
    if amount.is_infinite() {
        let sign = if amount < 0.0 { "-" } else { "" };
        return format!("{}{}∞", sign, currency.symbol);
    }

    let fixed = fixed_two_places(amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let rounds_to_zero = int_part.bytes().all(|b| b == b'0') && frac_part.bytes().all(|b| b == b'0');
    let sign = if amount < 0.0 && !rounds_to_zero { "-" } else { "" };

    format!(
        "{}{}{}.{}",
        sign,
        currency.symbol,
        grouping.group_digits(int_part),
        frac_part
    )
}

fn fixed_two_places(value: f64) -> String {
    match Decimal::from_f64_retain(value) {
        Some(exact) => format!(
            "{:.2}",
            exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        ),
        // Beyond the decimal range cents are always zero.
        None => format!("{:.2}", value),
    }
}
