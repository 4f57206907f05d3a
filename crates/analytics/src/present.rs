use crate::compare::Comparison;
use core_types::{DisplayRecord, DisplayValue};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";
pub const DEFAULT_COMPARISON_PHRASE: &str = "from last quarter";

/// How the value cell of a card is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// Whole number, sent as a JSON integer.
    Count,
    /// Two-decimal number, sent as a JSON number.
    Number,
    /// `"$123.45"`
    Currency,
    /// `"45.50%"`
    Percent,
}

/// Unit of the change cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeUnit {
    /// `"+10.00% from last quarter"`
    Percent,
    /// `"+2 from last quarter"`
    Units,
}

/// Rendering hints of one card. `icon` and `color` are passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayHints {
    pub format: ValueFormat,
    pub change_unit: ChangeUnit,
    pub icon: &'static str,
    pub color: &'static str,
}

/// Turns metric values and comparisons into dashboard cards.
#[derive(Debug, Clone)]
pub struct Presenter {
    currency_symbol: String,
    comparison_phrase: String,
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY_SYMBOL, DEFAULT_COMPARISON_PHRASE)
    }
}

impl Presenter {
    pub fn new(currency_symbol: impl Into<String>, comparison_phrase: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
            comparison_phrase: comparison_phrase.into(),
        }
    }

    pub fn present(&self, title: &str, comparison: &Comparison, hints: &DisplayHints) -> DisplayRecord {
        DisplayRecord {
            title: title.to_string(),
            value: self.format_value(comparison.current, hints.format),
            change: self.format_change(comparison.delta, hints.change_unit),
            trend: comparison.trend,
            icon: hints.icon.to_string(),
            color: hints.color.to_string(),
        }
    }

    pub fn format_value(&self, value: Decimal, format: ValueFormat) -> DisplayValue {
        match format {
            ValueFormat::Count => DisplayValue::Count(value.round().to_i64().unwrap_or_default()),
            ValueFormat::Number => DisplayValue::Number(round2(value)),
            ValueFormat::Currency => DisplayValue::Text(self.format_money(value)),
            ValueFormat::Percent => DisplayValue::Text(format!("{:.2}%", round2(value))),
        }
    }

    pub fn format_money(&self, value: Decimal) -> String {
        format!("{}{:.2}", self.currency_symbol, round2(value))
    }

    /// Sign-prefixed, rounded delta followed by the comparison phrase. Only
    /// positive deltas get a `+`; negative ones carry their own `-`.
    pub fn format_change(&self, delta: Decimal, unit: ChangeUnit) -> String {
        let rounded = round2(delta);
        let sign = if rounded > Decimal::ZERO { "+" } else { "" };
        match unit {
            ChangeUnit::Percent => format!("{sign}{rounded:.2}% {}", self.comparison_phrase),
            ChangeUnit::Units => format!("{sign}{} {}", rounded.normalize(), self.comparison_phrase),
        }
    }
}

/// Two-decimal rounding, half away from zero, that never yields a negative zero.
pub(crate) fn round2(value: Decimal) -> Decimal {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() { Decimal::ZERO } else { rounded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{compare, compare_absolute};
    use core_types::Trend;
    use rust_decimal_macros::dec;

    const CURRENCY: DisplayHints = DisplayHints {
        format: ValueFormat::Currency,
        change_unit: ChangeUnit::Percent,
        icon: "DollarSign",
        color: "yellow",
    };

    #[test]
    fn currency_card() {
        let record = Presenter::default().present("Average Order Value", &compare(dec!(110), dec!(100)).unwrap(), &CURRENCY);

        assert_eq!(record.value, DisplayValue::Text("$110.00".into()));
        assert_eq!(record.change, "+10.00% from last quarter");
        assert_eq!(record.trend, Trend::Up);
        assert_eq!(record.icon, "DollarSign");
        assert_eq!(record.color, "yellow");
    }

    #[test]
    fn change_text_and_trend_agree_on_tiny_deltas() {
        let presenter = Presenter::default();
        for (current, prior) in [(dec!(100.001), dec!(100)), (dec!(99.999), dec!(100))] {
            let record = presenter.present("Average Order Value", &compare(current, prior).unwrap(), &CURRENCY);
            assert_eq!(record.change, "0.00% from last quarter");
            assert_eq!(record.trend, Trend::Neutral);
        }

        let record = presenter.present("Average Order Value", &compare(dec!(100.005), dec!(100)).unwrap(), &CURRENCY);
        assert_eq!(record.change, "+0.01% from last quarter");
        assert_eq!(record.trend, Trend::Up);
    }

    #[test]
    fn negative_change_has_no_plus() {
        let presenter = Presenter::default();
        assert_eq!(presenter.format_change(dec!(-12.345), ChangeUnit::Percent), "-12.35% from last quarter");
        assert_eq!(presenter.format_change(dec!(0), ChangeUnit::Percent), "0.00% from last quarter");
        assert_eq!(presenter.format_change(dec!(-0.001), ChangeUnit::Percent), "0.00% from last quarter");
    }

    #[test]
    fn unit_changes_have_no_percent_marker() {
        let presenter = Presenter::default();
        assert_eq!(presenter.format_change(dec!(2), ChangeUnit::Units), "+2 from last quarter");
        assert_eq!(presenter.format_change(dec!(-3), ChangeUnit::Units), "-3 from last quarter");
        assert_eq!(presenter.format_change(dec!(0), ChangeUnit::Units), "0 from last quarter");
    }

    #[test]
    fn value_formats() {
        let presenter = Presenter::new("€", "vs previous quarter");
        assert_eq!(presenter.format_value(dec!(12), ValueFormat::Count), DisplayValue::Count(12));
        assert_eq!(presenter.format_value(dec!(33.3333), ValueFormat::Number), DisplayValue::Number(dec!(33.33)));
        assert_eq!(presenter.format_value(dec!(5), ValueFormat::Currency), DisplayValue::Text("€5.00".into()));
        assert_eq!(presenter.format_value(dec!(45.5), ValueFormat::Percent), DisplayValue::Text("45.50%".into()));
        assert_eq!(
            presenter.format_change(compare_absolute(dec!(40), dec!(42.5)).unwrap().delta, ChangeUnit::Percent),
            "-2.50% vs previous quarter"
        );
    }
}
