use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::EngineError;

/// Money amount represented as **integer minor units** (cents).
///
/// Use this type for **all** monetary values in the engine (expense amounts,
/// aggregated totals) to avoid floating-point drift. A single expense never
/// exceeds [`Money::MAX_AMOUNT`]; totals are sums of such amounts.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals, signs and anything above the maximum):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
/// assert!("12.345".parse::<Money>().is_err());
/// assert!("-3".parse::<Money>().is_err());
/// assert!("1000000000".parse::<Money>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest amount of one expense: `999999999.99`.
    pub const MAX_AMOUNT: Money = Money(99_999_999_999);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` for `0 < amount <= MAX_AMOUNT`.
    #[must_use]
    pub const fn is_valid_expense_amount(self) -> bool {
        self.0 > 0 && self.0 <= Self::MAX_AMOUNT.0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

// Saturating: an aggregate never panics or wraps. With expenses capped at
// MAX_AMOUNT a total stays exact for more than 92 million expenses.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

fn invalid_amount(reason: &str) -> EngineError {
    EngineError::InvalidAmount(reason.to_string())
}

/// Minor units of a fractional part with at most two digits (`"5"` is 50).
fn parse_cents(frac: &str) -> Result<i64, EngineError> {
    let mut digits = frac.bytes();
    let cents = match (digits.next(), digits.next(), digits.next()) {
        (None, _, _) => 0,
        (Some(tens), None, _) => i64::from(tens - b'0') * 10,
        (Some(tens), Some(ones), None) => i64::from(tens - b'0') * 10 + i64::from(ones - b'0'),
        _ => return Err(invalid_amount("too many decimals")),
    };
    Ok(cents)
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses an expense amount such as `"12.50"`, `"12,5"` or `"12"`.
    ///
    /// Rejects signs, more than two decimals and values above
    /// [`Money::MAX_AMOUNT`]. Zero parses; positivity is checked where an
    /// expense is written.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid_amount("empty amount"));
        }
        if trimmed.starts_with('-') {
            return Err(invalid_amount("amount must be > 0"));
        }

        let (units, frac) = match trimmed.split_once(['.', ',']) {
            Some((units, frac)) => (units, frac),
            None => (trimmed, ""),
        };
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if units.is_empty() || !is_digits(units) || !is_digits(frac) {
            return Err(invalid_amount("invalid amount"));
        }

        let too_large = || invalid_amount("amount exceeds 999999999.99");
        let cents = parse_cents(frac)?;
        let minor = units
            .parse::<i64>()
            .ok()
            .and_then(|units| units.checked_mul(100))
            .and_then(|minor| minor.checked_add(cents))
            .ok_or_else(too_large)?;
        if minor > Self::MAX_AMOUNT.0 {
            return Err(too_large());
        }

        Ok(Money(minor))
    }
}

// Amounts travel as decimal strings ("12.50") so clients never see floats.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
