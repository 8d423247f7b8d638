// quantity.rs - Numeric view over opaque offer quantities

//! Offers carry their time and budget as free-form strings such as
//! `"1500 eur"` or `"3 weeks"`. [`Quantity`] extracts a leading number and a
//! unit so that limits can be checked. Anything that does not parse, or whose
//! units cannot be reconciled, stays opaque and is never adjusted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which dimension of an offer a quantity describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityKind {
    Budget,
    Time,
}

/// Direction of a role's limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    /// Offered value must not exceed the limit
    Ceiling,
    /// Offered value must not fall below the limit
    Floor,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuantityError {
    #[error("No numeric amount in {0:?}")]
    MissingAmount(String),

    #[error("Invalid amount in {0:?}")]
    InvalidAmount(String),
}

/// Amount plus unit, e.g. `1500 eur`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub amount: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(amount: f64, unit: impl Into<String>) -> Self {
        Self {
            amount,
            unit: unit.into(),
        }
    }

    /// Scale the amount, keeping the unit
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            amount: self.amount * factor,
            unit: self.unit.clone(),
        }
    }

    /// Same quantity rounded to a whole amount
    pub fn rounded(&self) -> Self {
        Self {
            amount: self.amount.round(),
            unit: self.unit.clone(),
        }
    }

    /// Amount and unit in a form comparable across spellings.
    ///
    /// Times with a known unit are converted to days.
    pub fn normalized(&self, kind: QuantityKind) -> (f64, String) {
        let unit = self.unit.to_lowercase();
        match kind {
            QuantityKind::Time => match days_per_unit(&unit) {
                Some(days) => (self.amount * days, "day".to_string()),
                None => (self.amount, unit),
            },
            QuantityKind::Budget => match currency_code(&unit) {
                Some(code) => (self.amount, code.to_string()),
                None => (self.amount, unit),
            },
        }
    }

    /// Compare two quantities of the same kind, `None` when units differ
    pub fn compare(&self, other: &Quantity, kind: QuantityKind) -> Option<std::cmp::Ordering> {
        let (a, unit_a) = self.normalized(kind);
        let (b, unit_b) = other.normalized(kind);
        if unit_a != unit_b {
            return None;
        }
        a.partial_cmp(&b)
    }
}

fn days_per_unit(unit: &str) -> Option<f64> {
    match unit {
        "day" | "days" | "dia" | "dias" | "día" | "días" | "d" => Some(1.0),
        "week" | "weeks" | "semana" | "semanas" | "w" => Some(7.0),
        "month" | "months" | "mes" | "meses" => Some(30.0),
        _ => None,
    }
}

/// Currency symbols accepted in front of the amount: `€1800`
const CURRENCY_SYMBOLS: [&str; 3] = ["€", "$", "£"];

fn currency_code(unit: &str) -> Option<&'static str> {
    match unit {
        "eur" | "euro" | "euros" | "€" => Some("eur"),
        "usd" | "dollar" | "dollars" | "dólar" | "dólares" | "$" => Some("usd"),
        "gbp" | "pound" | "pounds" | "£" => Some("gbp"),
        _ => None,
    }
}

/// `1.800` or `12,500,000`: first group of one to three digits, the rest of exactly three
fn is_grouped(number: &str, separator: char) -> bool {
    let mut groups = number.split(separator);
    let Some(first) = groups.next() else {
        return false;
    };
    if first.is_empty() || first.len() > 3 || first.starts_with('0') {
        return false;
    }
    let mut rest = 0;
    for group in groups {
        if group.len() != 3 {
            return false;
        }
        rest += 1;
    }
    rest > 0 && number.chars().all(|c| c.is_ascii_digit() || c == separator)
}

/// Read an amount written with either `.` or `,` as the thousands separator.
///
/// When both appear, the last one is the decimal point. A single kind of
/// separator followed by three-digit groups is read as thousands, so
/// `1.800` is 1800 and `1.5` is 1.5.
fn parse_amount(number: &str) -> Option<f64> {
    let (thousands, decimal) = match (number.rfind('.'), number.rfind(',')) {
        (None, None) => return number.parse().ok(),
        (Some(dot), Some(comma)) if dot > comma => (',', Some('.')),
        (Some(_), Some(_)) => ('.', Some(',')),
        (Some(_), None) if is_grouped(number, '.') => ('.', None),
        (Some(_), None) => (',', Some('.')),
        (None, Some(_)) if is_grouped(number, ',') => (',', None),
        (None, Some(_)) => ('.', Some(',')),
    };

    let (integer, fraction) = match decimal.and_then(|d| number.rfind(d)) {
        Some(i) => (&number[..i], &number[i + 1..]),
        None => (number, ""),
    };
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if integer.contains(thousands) && !is_grouped(integer, thousands) {
        return None;
    }
    if !integer.chars().all(|c| c.is_ascii_digit() || c == thousands) {
        return None;
    }

    let mut canonical: String = integer.chars().filter(|c| *c != thousands).collect();
    if canonical.is_empty() && fraction.is_empty() {
        return None;
    }
    if canonical.is_empty() {
        canonical.push('0');
    }
    if !fraction.is_empty() {
        canonical.push('.');
        canonical.push_str(fraction);
    }
    canonical.parse().ok()
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (symbol, body) = CURRENCY_SYMBOLS
            .iter()
            .find_map(|sym| trimmed.strip_prefix(sym).map(|rest| (Some(*sym), rest.trim_start())))
            .unwrap_or((None, trimmed));

        let number_len = body
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == ','))
            .map(|(i, _)| i)
            .unwrap_or(body.len());

        if number_len == 0 {
            return Err(QuantityError::MissingAmount(s.to_string()));
        }

        let amount = parse_amount(&body[..number_len])
            .ok_or_else(|| QuantityError::InvalidAmount(s.to_string()))?;

        let unit = body[number_len..].trim();
        let unit = match (unit.is_empty(), symbol) {
            (true, Some(symbol)) => symbol,
            _ => unit,
        };

        Ok(Self {
            amount,
            unit: unit.to_string(),
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.amount.fract() == 0.0 {
            write!(f, "{}", self.amount as i64)?;
        } else {
            write!(f, "{:.2}", self.amount)?;
        }
        if !self.unit.is_empty() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}

/// Result of holding an offered value to a limit
#[derive(Debug, Clone, PartialEq)]
pub enum Clamp {
    /// Value already respects the limit
    Within,
    /// Value crossed the limit and was replaced by it
    Adjusted(String),
    /// Value or limit could not be interpreted numerically
    Incomparable,
}

/// Hold `offered` on the permitted side of `limit`
pub fn clamp_to_limit(offered: &str, limit: &str, kind: QuantityKind, bound: Bound) -> Clamp {
    let (Ok(value), Ok(limit_q)) = (offered.parse::<Quantity>(), limit.parse::<Quantity>()) else {
        return Clamp::Incomparable;
    };

    match (value.compare(&limit_q, kind), bound) {
        (None, _) => Clamp::Incomparable,
        (Some(std::cmp::Ordering::Greater), Bound::Ceiling)
        | (Some(std::cmp::Ordering::Less), Bound::Floor) => Clamp::Adjusted(limit.trim().to_string()),
        _ => Clamp::Within,
    }
}

/// Whether `offered` respects `limit`, `None` when incomparable
pub fn satisfies_limit(offered: &str, limit: &str, kind: QuantityKind, bound: Bound) -> Option<bool> {
    match clamp_to_limit(offered, limit, kind, bound) {
        Clamp::Within => Some(true),
        Clamp::Adjusted(_) => Some(false),
        Clamp::Incomparable => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_amount_and_unit() {
        let q: Quantity = "1500 eur".parse().unwrap();
        assert_eq!(q, Quantity::new(1500.0, "eur"));

        let q: Quantity = "1,200.5 EUR".parse().unwrap();
        assert_eq!(q.amount, 1200.5);
        assert_eq!(q.unit, "EUR");

        let q: Quantity = "  3 weeks ".parse().unwrap();
        assert_eq!(q, Quantity::new(3.0, "weeks"));
    }

    #[test]
    fn test_parse_rejects_missing_amount() {
        assert!(matches!(
            "about a month".parse::<Quantity>(),
            Err(QuantityError::MissingAmount(_))
        ));
        assert!(matches!(
            "1.2.3 eur".parse::<Quantity>(),
            Err(QuantityError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_parse_thousands_separators() {
        let amount = |s: &str| s.parse::<Quantity>().unwrap().amount;

        assert_eq!(amount("1.800 eur"), 1800.0);
        assert_eq!(amount("1,800 euros"), 1800.0);
        assert_eq!(amount("1.800,50 eur"), 1800.5);
        assert_eq!(amount("12.500.000 eur"), 12_500_000.0);
        assert_eq!(amount("1.5 meses"), 1.5);
        assert_eq!(amount("1,5 semanas"), 1.5);
        assert_eq!(amount("0.500 eur"), 0.5);
        assert!(matches!(
            "1,80.0 eur".parse::<Quantity>(),
            Err(QuantityError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_parse_leading_currency_symbol() {
        let q: Quantity = "€1800".parse().unwrap();
        assert_eq!(q, Quantity::new(1800.0, "€"));

        let q: Quantity = "$ 2,000 usd".parse().unwrap();
        assert_eq!(q, Quantity::new(2000.0, "usd"));

        assert!(matches!(
            "€ soon".parse::<Quantity>(),
            Err(QuantityError::MissingAmount(_))
        ));
    }

    #[test]
    fn test_currency_spellings_compare() {
        let limit: Quantity = "1500 eur".parse().unwrap();
        for spelling in ["1800 EUR", "1800 euros", "€1800", "1800 €"] {
            let offered: Quantity = spelling.parse().unwrap();
            assert_eq!(
                offered.compare(&limit, QuantityKind::Budget),
                Some(std::cmp::Ordering::Greater),
                "{spelling}"
            );
        }
    }

    #[test]
    fn test_ceiling_holds_for_locale_spellings() {
        for offered in ["1.800 eur", "1,800 euros", "€1800"] {
            assert_eq!(
                clamp_to_limit(offered, "1500 eur", QuantityKind::Budget, Bound::Ceiling),
                Clamp::Adjusted("1500 eur".into()),
                "{offered}"
            );
        }
        assert_eq!(
            satisfies_limit("1.300 eur", "1200 eur", QuantityKind::Budget, Bound::Floor),
            Some(true)
        );
    }

    #[test]
    fn test_time_units_normalize_across_languages() {
        let month: Quantity = "1 mes".parse().unwrap();
        let weeks: Quantity = "3 weeks".parse().unwrap();
        assert_eq!(
            month.compare(&weeks, QuantityKind::Time),
            Some(std::cmp::Ordering::Greater)
        );
    }

    #[test]
    fn test_budget_units_must_match() {
        let eur: Quantity = "1500 eur".parse().unwrap();
        let usd: Quantity = "1000 usd".parse().unwrap();
        assert_eq!(eur.compare(&usd, QuantityKind::Budget), None);

        let upper: Quantity = "1000 EUR".parse().unwrap();
        assert_eq!(
            eur.compare(&upper, QuantityKind::Budget),
            Some(std::cmp::Ordering::Greater)
        );
    }

    #[test]
    fn test_clamp_ceiling_and_floor() {
        assert_eq!(
            clamp_to_limit("1700 eur", "1500 eur", QuantityKind::Budget, Bound::Ceiling),
            Clamp::Adjusted("1500 eur".into())
        );
        assert_eq!(
            clamp_to_limit("1400 eur", "1500 eur", QuantityKind::Budget, Bound::Ceiling),
            Clamp::Within
        );
        assert_eq!(
            clamp_to_limit("1000 eur", "1200 eur", QuantityKind::Budget, Bound::Floor),
            Clamp::Adjusted("1200 eur".into())
        );
        assert_eq!(
            clamp_to_limit("2 weeks", "3 weeks", QuantityKind::Time, Bound::Floor),
            Clamp::Adjusted("3 weeks".into())
        );
        assert_eq!(
            clamp_to_limit("soon", "3 weeks", QuantityKind::Time, Bound::Floor),
            Clamp::Incomparable
        );
    }

    #[test]
    fn test_display_trims_whole_amounts() {
        assert_eq!(Quantity::new(900.0, "eur").to_string(), "900 eur");
        assert_eq!(Quantity::new(22.5, "days").to_string(), "22.50 days");
        assert_eq!(Quantity::new(1200.0, "").to_string(), "1200");
        assert_eq!(Quantity::new(1.5, "eur").scaled(2.0).rounded().to_string(), "3 eur");
    }

    proptest! {
        #[test]
        fn prop_ceiling_clamp_never_exceeds_limit(offered in 0u32..100_000, limit in 1u32..100_000) {
            let offered_s = format!("{} eur", offered);
            let limit_s = format!("{} eur", limit);
            let result = match clamp_to_limit(&offered_s, &limit_s, QuantityKind::Budget, Bound::Ceiling) {
                Clamp::Adjusted(v) => v,
                Clamp::Within => offered_s.clone(),
                Clamp::Incomparable => unreachable!("same units always compare"),
            };
            let q: Quantity = result.parse().unwrap();
            prop_assert!(q.amount <= limit as f64);
        }

        #[test]
        fn prop_floor_clamp_never_below_limit(offered in 0u32..100_000, limit in 1u32..100_000) {
            let offered_s = format!("{} eur", offered);
            let limit_s = format!("{} eur", limit);
            let result = match clamp_to_limit(&offered_s, &limit_s, QuantityKind::Budget, Bound::Floor) {
                Clamp::Adjusted(v) => v,
                Clamp::Within => offered_s.clone(),
                Clamp::Incomparable => unreachable!("same units always compare"),
            };
            let q: Quantity = result.parse().unwrap();
            prop_assert!(q.amount >= limit as f64);
        }
    }
}
