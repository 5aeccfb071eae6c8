use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::NormalizationError;

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the pipeline (candidate
/// amounts, ledger amounts, dedup keys) to avoid floating-point drift.
///
/// The sign convention follows the ledger: expenses are recorded positive.
///
/// # Examples
///
/// ```rust
/// use importer::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing accepts what statement extractors actually produce: currency
/// symbols and codes, thousands separators, `.` or `,` decimals:
///
/// ```rust
/// use importer::MoneyCents;
///
/// assert_eq!("$1,234.56".parse::<MoneyCents>().unwrap().cents(), 123_456);
/// assert_eq!("1.234,56 €".parse::<MoneyCents>().unwrap().cents(), 123_456);
/// assert!("n/a".parse::<MoneyCents>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

impl FromStr for MoneyCents {
    type Err = NormalizationError;

    /// Parses an amount as it appears in extracted statement text.
    ///
    /// Accepted around the number: currency symbols/codes and whitespace
    /// (`$12.50`, `12.50 EUR`), a leading `-` or accounting parentheses for
    /// negatives.
    ///
    /// Separator rules:
    /// - both `.` and `,` present: the last one is the decimal separator,
    ///   the other is grouping (`1,234.56` and `1.234,56` both parse)
    /// - a single separator followed by exactly 3 digits is grouping
    ///   (`1,234` is 1234.00)
    /// - a single separator followed by 1-2 digits is the decimal separator
    /// - more than 2 decimal digits is rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparsable = || NormalizationError::UnparsableAmount(s.trim().to_string());

        let mut raw = s.trim();
        if raw.is_empty() {
            return Err(unparsable());
        }

        let mut negative = false;
        if let Some(inner) = raw.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            negative = true;
            raw = inner.trim();
        }

        let first = raw.find(|c: char| c.is_ascii_digit()).ok_or_else(unparsable)?;
        let last = raw.rfind(|c: char| c.is_ascii_digit()).ok_or_else(unparsable)?;
        if raw[..first].contains('-') {
            negative = true;
        }

        // The run between the first and last digit must be purely numeric;
        // anything outside it is a currency marker and is ignored.
        let core = &raw[first..=last];
        if !core
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',' || c == ' ')
        {
            return Err(unparsable());
        }
        let core: String = core.chars().filter(|c| *c != ' ').collect();

        let dots = core.matches('.').count();
        let commas = core.matches(',').count();
        let decimal_pos = if dots > 0 && commas > 0 {
            // Last separator wins; the other kind is grouping.
            core.rfind(['.', ','])
        } else if dots + commas == 1 {
            let pos = core.rfind(['.', ',']).ok_or_else(unparsable)?;
            // A single separator with exactly 3 trailing digits is grouping
            // (`1,234`), anything else is the decimal separator.
            (core.len() - pos - 1 != 3).then_some(pos)
        } else {
            // Zero separators, or repeated same-kind separators: all grouping.
            None
        };

        let (units_raw, frac_str) = match decimal_pos {
            Some(pos) => (&core[..pos], &core[pos + 1..]),
            None => (core.as_str(), ""),
        };
        if frac_str.len() > 2 || !frac_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(unparsable());
        }

        // Strip grouping separators from the integer part, rejecting runs
        // that cannot be thousands groups.
        let groups: Vec<&str> = units_raw.split(['.', ',']).collect();
        if groups.len() > 1 {
            if groups[0].is_empty() || groups[0].len() > 3 || groups[0].starts_with('0') {
                return Err(unparsable());
            }
            if groups[1..].iter().any(|g| g.len() != 3) {
                return Err(unparsable());
            }
        }
        let units_str = groups.concat();

        if units_str.is_empty() && frac_str.is_empty() {
            return Err(unparsable());
        }

        let units: i64 = if units_str.is_empty() {
            0
        } else {
            units_str.parse().map_err(|_| unparsable())?
        };

        let cents: i64 = match frac_str.len() {
            0 => 0,
            1 => frac_str.parse::<i64>().map_err(|_| unparsable())? * 10,
            2 => frac_str.parse().map_err(|_| unparsable())?,
            _ => return Err(unparsable()),
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(unparsable)?;

        let signed = if negative {
            total.checked_neg().ok_or_else(unparsable)?
        } else {
            total
        };

        Ok(MoneyCents(signed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_plain_decimal() {
        assert_eq!(MoneyCents::new(0).to_string(), "0.00");
        assert_eq!(MoneyCents::new(1).to_string(), "0.01");
        assert_eq!(MoneyCents::new(1050).to_string(), "10.50");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma_decimals() {
        assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
        assert_eq!("10.5".parse::<MoneyCents>().unwrap().cents(), 1050);
        assert_eq!("10,50".parse::<MoneyCents>().unwrap().cents(), 1050);
        assert_eq!("  2.30 ".parse::<MoneyCents>().unwrap().cents(), 230);
    }

    #[test]
    fn parse_strips_currency_markers() {
        assert_eq!("$5.50".parse::<MoneyCents>().unwrap().cents(), 550);
        assert_eq!("5.50 €".parse::<MoneyCents>().unwrap().cents(), 550);
        assert_eq!("EUR 5.50".parse::<MoneyCents>().unwrap().cents(), 550);
        assert_eq!("£1,234.56".parse::<MoneyCents>().unwrap().cents(), 123_456);
    }

    #[test]
    fn parse_resolves_grouping_separators() {
        assert_eq!("1,234.56".parse::<MoneyCents>().unwrap().cents(), 123_456);
        assert_eq!("1.234,56".parse::<MoneyCents>().unwrap().cents(), 123_456);
        assert_eq!("1,234".parse::<MoneyCents>().unwrap().cents(), 123_400);
        assert_eq!("1 234,56".parse::<MoneyCents>().unwrap().cents(), 123_456);
        assert_eq!("12.345".parse::<MoneyCents>().unwrap().cents(), 1_234_500);
        assert_eq!(
            "1.234.567".parse::<MoneyCents>().unwrap().cents(),
            123_456_700
        );
    }

    #[test]
    fn parse_handles_negatives() {
        assert_eq!("-0.01".parse::<MoneyCents>().unwrap().cents(), -1);
        assert_eq!("(12.50)".parse::<MoneyCents>().unwrap().cents(), -1250);
        assert_eq!("-$3.00".parse::<MoneyCents>().unwrap().cents(), -300);
    }

    #[test]
    fn parse_rejects_non_numeric_remainder() {
        assert!("".parse::<MoneyCents>().is_err());
        assert!("n/a".parse::<MoneyCents>().is_err());
        assert!("12a34".parse::<MoneyCents>().is_err());
        assert!("12.3456".parse::<MoneyCents>().is_err());
        assert!("0.001".parse::<MoneyCents>().is_err());
        assert!("1.2.3,4".parse::<MoneyCents>().is_err());
    }
}
