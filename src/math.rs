//! Integer and fixed-point helpers shared by the codecs, adapters and route splitter.
//!
//! Every division takes an explicit [`Rounding`]. Outputs round down, required inputs
//! and fees round up, so rounding never works in the caller's favour.
//! [`mul_div`] keeps a full 256-bit intermediate so `amount * share / total` stays exact
//! for amounts far beyond 10^24.

use alloy_primitives::U256;
use crate::error::RoutingError;
use crate::types::Amount;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rounding {
    Up,
    Down,
}

pub fn div_round(numerator: u128, denominator: u128, rounding: Rounding) -> Result<u128, RoutingError> {
    if denominator == 0 {
        return Err(RoutingError::DivisionByZero);
    }
    let q = numerator / denominator;
    match rounding {
        Rounding::Up if numerator % denominator != 0 => Ok(q + 1),
        _ => Ok(q),
    }
}

/// `a * b / denominator` with a 256-bit intermediate and explicit rounding.
///
/// Fails with `DivisionByZero` or with `ArithmeticOverflow` when the quotient
/// does not fit in 128 bits.
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> Result<u128, RoutingError> {
    if denominator == 0 {
        return Err(RoutingError::DivisionByZero);
    }
    // a u128 by u128 product always fits in 256 bits
    let product = U256::from(a) * U256::from(b);
    let (quotient, remainder) = product.div_rem(U256::from(denominator));
    let quotient = match rounding {
        Rounding::Up if !remainder.is_zero() => quotient + U256::from(1u8),
        _ => quotient,
    };
    u128::try_from(quotient).map_err(|_| RoutingError::ArithmeticOverflow("mul_div quotient exceeds 128 bits"))
}

pub fn pow10(exp: u32) -> Result<u128, RoutingError> {
    10u128
        .checked_pow(exp)
        .ok_or(RoutingError::ArithmeticOverflow("10^exp exceeds 128 bits"))
}

pub fn to_decimal(amount: Amount) -> Result<Decimal, RoutingError> {
    Decimal::from_u128(amount).ok_or(RoutingError::ArithmeticOverflow("amount exceeds decimal range"))
}

/// Converts a non-negative decimal back to raw units with explicit rounding.
pub fn from_decimal(value: Decimal, rounding: Rounding) -> Result<Amount, RoutingError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(RoutingError::ArithmeticOverflow("negative amount"));
    }
    let strategy = match rounding {
        Rounding::Up => RoundingStrategy::AwayFromZero,
        Rounding::Down => RoundingStrategy::ToZero,
    };
    value
        .round_dp_with_strategy(0, strategy)
        .to_u128()
        .ok_or(RoutingError::ArithmeticOverflow("decimal exceeds amount range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn div_round_directions() {
        assert_eq!(div_round(10, 3, Rounding::Down).unwrap(), 3);
        assert_eq!(div_round(10, 3, Rounding::Up).unwrap(), 4);
        assert_eq!(div_round(9, 3, Rounding::Up).unwrap(), 3);
        assert_eq!(div_round(1, 0, Rounding::Down), Err(RoutingError::DivisionByZero));
    }

    #[test]
    fn mul_div_small_values() {
        assert_eq!(mul_div(7, 3, 2, Rounding::Down).unwrap(), 10);
        assert_eq!(mul_div(7, 3, 2, Rounding::Up).unwrap(), 11);
        assert_eq!(mul_div(0, 3, 2, Rounding::Up).unwrap(), 0);
    }

    #[test]
    fn mul_div_wide_intermediate() {
        // 10^24 * 10^24 / 10^24 needs 160 bits in the middle
        let big = 10u128.pow(24);
        assert_eq!(mul_div(big, big, big, Rounding::Down).unwrap(), big);

        // u128::MAX * u128::MAX / u128::MAX
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX, Rounding::Down).unwrap(), u128::MAX);

        // (2^127 * 6) / 2 = 3 * 2^127 overflows, (2^127 * 6) / 8 fits
        let half = 1u128 << 127;
        assert!(mul_div(half, 6, 2, Rounding::Down).is_err());
        assert_eq!(mul_div(half, 6, 8, Rounding::Down).unwrap(), 3 * (1u128 << 125));
    }

    #[test]
    fn mul_div_rounding_with_remainder_in_wide_path() {
        let big = 10u128.pow(30);
        let scale = 10u128.pow(10);
        // big * 7e10 overflows 128 bits and does not divide evenly by 3e10
        let down = mul_div(big, 7 * scale, 3 * scale, Rounding::Down).unwrap();
        let up = mul_div(big, 7 * scale, 3 * scale, Rounding::Up).unwrap();
        assert_eq!(up, down + 1);
        assert_eq!(down, big * 7 / 3);
    }

    #[test]
    fn decimal_conversions() {
        assert_eq!(to_decimal(12_345).unwrap(), dec!(12345));
        assert_eq!(from_decimal(dec!(10.2), Rounding::Down).unwrap(), 10);
        assert_eq!(from_decimal(dec!(10.2), Rounding::Up).unwrap(), 11);
        assert!(from_decimal(dec!(-1), Rounding::Down).is_err());
    }
}
