// 1.0: all the primitives live here. nothing in the router works without these types.
// assets, venues, pools, accounts, prices, leverage, timestamps. each id is a newtype so
// the compiler catches an asset passed where a venue was expected.

use crate::error::RoutingError;
use crate::math::{mul_div, Rounding};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// raw base units of an asset. 10^24 fits with room to spare.
pub type Amount = u128;

pub const ADDRESS_LEN: usize = 20;
pub const POOL_ID_LEN: usize = 32;

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "0x")?;
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

fn low_u64_bytes<const N: usize>(n: u64) -> [u8; N] {
    let mut out = [0u8; N];
    out[N - 8..].copy_from_slice(&n.to_be_bytes());
    out
}

// 1.1: fungible value identifier. NATIVE is the pseudo-asset for the chain's native value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Asset(pub [u8; ADDRESS_LEN]);

impl Asset {
    pub const NATIVE: Asset = Asset([0xee; ADDRESS_LEN]);

    pub fn from_low_u64(n: u64) -> Self {
        Self(low_u64_bytes(n))
    }

    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            return write!(f, "Asset(native)");
        }
        write!(f, "Asset(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

// 1.2: address of an external venue (router, vault, aggregator entry point).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VenueId(pub [u8; ADDRESS_LEN]);

impl VenueId {
    pub fn from_low_u64(n: u64) -> Self {
        Self(low_u64_bytes(n))
    }
}

impl fmt::Debug for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VenueId(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

// 1.3: pool identifier for curve and weighted venues. all zeroes means "no hint".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(pub [u8; POOL_ID_LEN]);

impl PoolId {
    pub const NONE: PoolId = PoolId([0u8; POOL_ID_LEN]);

    pub fn from_low_u64(n: u64) -> Self {
        Self(low_u64_bytes(n))
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Debug for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolId(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

// 1.4: ledger holder. payers, recipients, pool reserve accounts, the router itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub u64);

// 1.5: price in quote units per unit of base. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.6: leverage multiplier. must be >= 1x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leverage(Decimal);

impl Leverage {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ONE {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Leverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

// 1.7: basis points. 100 bps = 1%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bps(u32);

impl Bps {
    pub const DENOMINATOR: u128 = 10_000;

    pub fn new(bps: u32) -> Self {
        Self(bps)
    }

    /// Fee charged on `amount`, rounded up.
    pub fn fee_on(&self, amount: Amount) -> Result<Amount, RoutingError> {
        mul_div(amount, u128::from(self.0), Self::DENOMINATOR, Rounding::Up)
    }

    /// Smallest gross amount that still leaves `net` once the fee is taken.
    pub fn gross_up(&self, net: Amount) -> Result<Amount, RoutingError> {
        let kept = Self::DENOMINATOR.saturating_sub(u128::from(self.0)).max(1);
        mul_div(net, Self::DENOMINATOR, kept, Rounding::Up)
    }
}

// 1.8: millisecond timestamp. deadlines are absolute timestamps of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const MAX: Timestamp = Timestamp(i64::MAX);

    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn plus_millis(&self, ms: i64) -> Self {
        Self(self.0.saturating_add(ms))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn native_asset_is_distinguished() {
        assert!(Asset::NATIVE.is_native());
        assert!(!Asset::from_low_u64(1).is_native());
        assert_ne!(Asset::from_low_u64(1), Asset::from_low_u64(2));
    }

    #[test]
    fn low_u64_lands_in_trailing_bytes() {
        let asset = Asset::from_low_u64(0x0102);
        assert_eq!(asset.0[18], 0x01);
        assert_eq!(asset.0[19], 0x02);
        assert!(asset.0[..12].iter().all(|b| *b == 0));

        let pool = PoolId::from_low_u64(7);
        assert_eq!(pool.0[31], 7);
        assert!(!pool.is_none());
        assert!(PoolId::NONE.is_none());
    }

    #[test]
    fn bps_fee_rounds_against_the_trader() {
        assert_eq!(Bps::new(30).fee_on(10_000).unwrap(), 30);
        assert_eq!(Bps::new(30).fee_on(1).unwrap(), 1);
        assert_eq!(Bps::new(0).fee_on(1_000).unwrap(), 0);
        // 10_031 * 0.997 = 10_000.9
        assert_eq!(Bps::new(30).gross_up(10_000).unwrap(), 10_031);
    }

    #[test]
    fn leverage_must_be_at_least_one() {
        assert!(Leverage::new(dec!(0.5)).is_none());
        assert_eq!(Leverage::new(dec!(3)).unwrap().value(), dec!(3));
    }

    #[test]
    fn timestamp_arithmetic() {
        let t = Timestamp::from_millis(1_000);
        assert_eq!(t.plus_millis(500).as_millis(), 1_500);
        assert_eq!(Timestamp::MAX.plus_millis(1), Timestamp::MAX);
    }
}
