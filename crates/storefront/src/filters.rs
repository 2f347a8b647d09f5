//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use rust_decimal::Decimal;

use civil_materials_core::{Currency, Price};

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Render a decimal string as `$X.XX`; unparseable input passes through.
///
/// View types call this when shaping display data, so templates receive
/// prices already formatted.
pub(crate) fn format_money(raw: &str) -> String {
    raw.parse::<Decimal>().map_or_else(
        |_| format!("${raw}"),
        |d| Price::new(d, Currency::USD).display(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money_two_places() {
        assert_eq!(format_money("12.5"), "$12.50");
        assert_eq!(format_money("0"), "$0.00");
        assert_eq!(format_money("137.50"), "$137.50");
    }

    #[test]
    fn test_format_money_passes_through_unparseable() {
        assert_eq!(format_money("n/a"), "$n/a");
    }
}
