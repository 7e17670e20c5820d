// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, fixed-point amounts, outcomes, fee rates, timestamps. each is a newtype so the
// compiler catches mixups between a raw i128 and a scaled amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub u64);

// Yes pays out one unit if the event happens, No pays out one unit if it doesn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    pub fn opposite(&self) -> Self {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Yes => "YES",
            Outcome::No => "NO",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 1.1: fixed-point amount scaled by 10^18. one unit is Fixed::ONE.
// every party must derive identical integers, so there is no float anywhere in the math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed(i128);

impl Fixed {
    pub const SCALE: i128 = 1_000_000_000_000_000_000;
    pub const DECIMALS: u32 = 18;

    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(Self::SCALE);
    pub const HALF: Fixed = Fixed(Self::SCALE / 2);

    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> i128 {
        self.0
    }

    // whole units, e.g. from_units(100) == 100.0
    pub const fn from_units(units: i64) -> Self {
        Self(units as i128 * Self::SCALE)
    }

    // num / den truncated toward zero. None if den is zero or the result overflows.
    pub fn from_ratio(num: i64, den: i64) -> Option<Self> {
        if den == 0 {
            return None;
        }
        (num as i128)
            .checked_mul(Self::SCALE)
            .map(|scaled| Self(scaled / den as i128))
    }

    // digits past the 18th decimal are truncated
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let mantissa = value.mantissa();
        let scale = value.scale();
        if scale <= Self::DECIMALS {
            let factor = 10i128.checked_pow(Self::DECIMALS - scale)?;
            mantissa.checked_mul(factor).map(Self)
        } else {
            let divisor = 10i128.checked_pow(scale - Self::DECIMALS)?;
            Some(Self(mantissa / divisor))
        }
    }

    // lossless for anything under 96 bits of mantissa; bigger values drop trailing digits.
    pub fn to_decimal(&self) -> Decimal {
        let mut raw = self.0;
        let mut scale = Self::DECIMALS;
        loop {
            match Decimal::try_from_i128_with_scale(raw, scale) {
                Ok(value) => return value.normalize(),
                Err(_) if scale > 0 => {
                    raw /= 10;
                    scale -= 1;
                }
                Err(_) => return if raw < 0 { Decimal::MIN } else { Decimal::MAX },
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn checked_add(&self, other: Fixed) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Fixed) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Fixed) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Sum for Fixed {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc.saturating_add(x))
    }
}

impl<'a> Sum<&'a Fixed> for Fixed {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc.saturating_add(*x))
    }
}

// config files and events carry amounts as decimal strings ("100", "0.05"), not raw integers
impl Serialize for Fixed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Fixed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Fixed::from_decimal(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{value} out of fixed-point range")))
    }
}

// 1.2: outstanding quantity issued per outcome. only grows, there is no sell path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketQuantities {
    pub q_yes: Fixed,
    pub q_no: Fixed,
}

impl MarketQuantities {
    pub fn new(q_yes: Fixed, q_no: Fixed) -> Self {
        Self { q_yes, q_no }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.q_yes.is_zero() && self.q_no.is_zero()
    }

    pub fn get(&self, outcome: Outcome) -> Fixed {
        match outcome {
            Outcome::Yes => self.q_yes,
            Outcome::No => self.q_no,
        }
    }

    // quantities after issuing `shares` of `outcome`
    pub fn with_added(&self, outcome: Outcome, shares: Fixed) -> Option<Self> {
        let mut next = *self;
        match outcome {
            Outcome::Yes => next.q_yes = self.q_yes.checked_add(shares)?,
            Outcome::No => next.q_no = self.q_no.checked_add(shares)?,
        }
        Some(next)
    }
}

// 1.3: basis points. 100 bps = 1%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bps(u32);

impl Bps {
    pub const MAX: u32 = 10_000;

    pub fn new(bps: u32) -> Self {
        Self(bps)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }

    // amount * bps / 10_000, truncated
    pub fn apply(&self, amount: Fixed) -> Option<Fixed> {
        amount
            .raw()
            .checked_mul(self.0 as i128)
            .map(|x| Fixed::from_raw(x / Self::MAX as i128))
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

// 1.4: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}
