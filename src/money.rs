//! Locale-aware monetary formatting.
//!
//! Amounts are truncated toward zero and then printed with the locale's
//! digit grouping and a fixed `.00` fraction, which is how the report
//! tables have always shown money: `1234.99` becomes `1,234.00`.

use crate::models::{Currency, CurrencyPosition};

/// How integer digits are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grouping {
    /// Groups of three: `1,234,567`.
    Thousands,
    /// Last three digits, then groups of two: `12,34,567`.
    Lakh,
}

/// Number symbols and grouping rules of one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NumberLocale {
    /// Separator between digit groups.
    group: &'static str,
    /// Decimal separator.
    decimal: &'static str,
    /// Grouping style.
    grouping: Grouping,
    /// Digits required in the leading group before grouping applies.
    min_grouping_digits: usize,
}

impl NumberLocale {
    /// Locale with thousands grouping.
    const fn thousands(group: &'static str, decimal: &'static str) -> Self {
        Self {
            group,
            decimal,
            grouping: Grouping::Thousands,
            min_grouping_digits: 1,
        }
    }
}

/// `1,234.56`
const EN: NumberLocale = NumberLocale::thousands(",", ".");
/// `1.234,56`
const CONTINENTAL: NumberLocale = NumberLocale::thousands(".", ",");
/// `1 234,56` with a no-break space.
const SPACED: NumberLocale = NumberLocale::thousands("\u{a0}", ",");
/// `1 234,56` with a narrow no-break space.
const FR: NumberLocale = NumberLocale::thousands("\u{202f}", ",");
/// `1’234.56`
const DE_CH: NumberLocale = NumberLocale::thousands("\u{2019}", ".");
/// `12,34,567.89`
const EN_IN: NumberLocale = NumberLocale {
    group: ",",
    decimal: ".",
    grouping: Grouping::Lakh,
    min_grouping_digits: 1,
};
/// `1234,56` but `12.345,67`.
const ES: NumberLocale = NumberLocale {
    group: ".",
    decimal: ",",
    grouping: Grouping::Thousands,
    min_grouping_digits: 2,
};
/// `1234,56` but `12 345,67`.
const PL: NumberLocale = NumberLocale {
    group: "\u{a0}",
    decimal: ",",
    grouping: Grouping::Thousands,
    min_grouping_digits: 2,
};

/// Resolves a BCP 47 tag: full tag first, then the language, then
/// `en-US`.
fn resolve(locale: &str) -> NumberLocale {
    let tag = locale.trim().replace('_', "-").to_ascii_lowercase();
    let by_tag = match tag.as_str() {
        "en-in" => Some(EN_IN),
        "de-ch" | "fr-ch" | "it-ch" => Some(DE_CH),
        "pt-br" => Some(CONTINENTAL),
        _ => None,
    };
    if let Some(found) = by_tag {
        return found;
    }
    let language = tag.split('-').next().unwrap_or_default();
    match language {
        "de" | "it" | "nl" | "id" | "tr" | "da" | "el" | "ro" | "hr" | "sl" | "vi" => CONTINENTAL,
        "es" => ES,
        "pl" => PL,
        "fr" => FR,
        "ru" | "uk" | "cs" | "sk" | "sv" | "fi" | "nb" | "no" | "bg" | "hu" | "pt" | "lt"
        | "lv" | "et" => SPACED,
        "en" | "ja" | "zh" | "ko" | "he" | "th" | "ms" => EN,
        other => {
            if !other.is_empty() {
                tracing::debug!(locale = %locale, "unknown locale, using en-US");
            }
            EN
        }
    }
}

/// Inserts group separators into a run of ASCII digits.
fn group_digits(digits: &str, locale: NumberLocale) -> String {
    let count = digits.len();
    if count < 3 + locale.min_grouping_digits {
        return digits.to_owned();
    }
    let mut out = String::with_capacity(count + count * locale.group.len());
    for (index, digit) in digits.chars().enumerate() {
        let remaining = count - index;
        let boundary = index > 0
            && match locale.grouping {
                Grouping::Thousands => remaining % 3 == 0,
                Grouping::Lakh => remaining == 3 || (remaining > 3 && (remaining - 3) % 2 == 0),
            };
        if boundary {
            out.push_str(locale.group);
        }
        out.push(digit);
    }
    out
}

/// Formats `value` for `locale`: truncated toward zero, grouped, with a
/// `00` fraction.
///
/// Non-finite values print as `NaN`, `∞` or `-∞`.
///
/// # Examples
///
/// ```
/// use dynamic_reports::money::format_amount;
///
/// assert_eq!(format_amount(1000.0, "en-US"), "1,000.00");
/// assert_eq!(format_amount(1234.99, "en-US"), "1,234.00");
/// ```
#[inline]
#[must_use]
pub fn format_amount(value: f64, locale: &str) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() { "-\u{221e}" } else { "\u{221e}" }.to_owned();
    }
    let number = resolve(locale);
    let truncated = value.trunc();
    let digits = format!("{:.0}", truncated.abs());
    // Negative fractions keep their sign: -0.5 renders as -0.00.
    let sign = if value < 0.0 { "-" } else { "" };
    format!(
        "{sign}{}{}00",
        group_digits(&digits, number),
        number.decimal
    )
}

/// Formats `value` with the currency's locale and symbol, e.g. `$ 1,000.00`
/// or `1.000,00 €`.
#[inline]
#[must_use]
pub fn format_money(value: f64, currency: &Currency) -> String {
    let amount = format_amount(value, &currency.locale);
    match currency.position {
        CurrencyPosition::Before => format!("{} {amount}", currency.symbol),
        CurrencyPosition::After => format!("{amount} {}", currency.symbol),
    }
}
