//! Liquidation prices for leveraged positions.
//!
//! A position holds `position_amount` of an allowed bucket asset against
//! `borrowed` units of the bucket's borrowed asset. Its liquidation price is the
//! price, in borrowed asset per position asset, at which closing it no longer
//! covers the debt after every safety haircut:
//!
//! ```text
//! price = fee_buffer * borrowed
//!       / ((1 - security_buffer)(1 - oracle_tolerable_limit)(1 - pair_price_drop)(1 - close_fee_rate) * position)
//! ```
//!
//! Both amounts are normalised to whole units first. Raw results are in the
//! borrowed asset's decimals, rounded down.

use crate::error::RoutingError;
use crate::math::{from_decimal, pow10, to_decimal, Rounding};
use crate::types::{Amount, Asset, Leverage, Price, VenueId, ADDRESS_LEN};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedAsset {
    pub decimals: u32,
    /// Worst expected drop of this asset against the borrowed asset, as a fraction.
    pub pair_price_drop: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSnapshot {
    pub borrowed_asset: Asset,
    pub borrowed_decimals: u32,
    /// Debt growth allowance, at least one.
    pub fee_buffer: Decimal,
    pub allowed_assets: HashMap<Asset, AllowedAsset>,
}

impl BucketSnapshot {
    pub fn new(borrowed_asset: Asset, borrowed_decimals: u32, fee_buffer: Decimal) -> Self {
        Self {
            borrowed_asset,
            borrowed_decimals,
            fee_buffer,
            allowed_assets: HashMap::new(),
        }
    }

    pub fn with_asset(mut self, asset: Asset, decimals: u32, pair_price_drop: Decimal) -> Self {
        self.allowed_assets.insert(asset, AllowedAsset { decimals, pair_price_drop });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyBuffers {
    pub security_buffer: Decimal,
    pub oracle_tolerable_limit: Decimal,
    pub close_fee_rate: Decimal,
}

impl Default for SafetyBuffers {
    fn default() -> Self {
        Self {
            security_buffer: Decimal::new(5, 2),          // 5%
            oracle_tolerable_limit: Decimal::new(1, 2),   // 1%
            close_fee_rate: Decimal::new(5, 4),           // 5 bps
        }
    }
}

fn complement(value: Decimal, name: &'static str) -> Result<Decimal, RoutingError> {
    if value < Decimal::ZERO || value >= Decimal::ONE {
        return Err(RoutingError::RiskParameterOutOfRange(name));
    }
    Ok(Decimal::ONE - value)
}

fn normalize(amount: Amount, decimals: u32) -> Result<Decimal, RoutingError> {
    to_decimal(amount)?
        .checked_div(to_decimal(pow10(decimals)?)?)
        .ok_or(RoutingError::ArithmeticOverflow("normalize amount"))
}

fn to_raw(price: Decimal, decimals: u32) -> Result<Amount, RoutingError> {
    let scaled = price
        .checked_mul(to_decimal(pow10(decimals)?)?)
        .ok_or(RoutingError::ArithmeticOverflow("liquidation price scale"))?;
    from_decimal(scaled, Rounding::Down)
}

fn allowed(bucket: &BucketSnapshot, position_asset: Option<Asset>) -> Result<AllowedAsset, RoutingError> {
    // an unset position asset is the zero address
    let asset = position_asset.ok_or(RoutingError::AddressNotSupported(VenueId([0; ADDRESS_LEN])))?;
    bucket
        .allowed_assets
        .get(&asset)
        .copied()
        .ok_or(RoutingError::TokenNotSupported(asset))
}

// (1 - sb)(1 - otl)(1 - ppd)
fn common_haircut(buffers: &SafetyBuffers, asset: &AllowedAsset) -> Result<Decimal, RoutingError> {
    Ok(complement(buffers.security_buffer, "security_buffer")?
        * complement(buffers.oracle_tolerable_limit, "oracle_tolerable_limit")?
        * complement(asset.pair_price_drop, "pair_price_drop")?)
}

fn check_fee_buffer(bucket: &BucketSnapshot) -> Result<(), RoutingError> {
    if bucket.fee_buffer < Decimal::ONE {
        return Err(RoutingError::RiskParameterOutOfRange("fee_buffer"));
    }
    Ok(())
}

/// Liquidation price as a plain fraction (whole borrowed units per whole position unit).
pub fn liquidation_price_fraction(
    bucket: &BucketSnapshot,
    position_asset: Option<Asset>,
    position_amount: Amount,
    borrowed: Amount,
    buffers: &SafetyBuffers,
) -> Result<Decimal, RoutingError> {
    let asset = allowed(bucket, position_asset)?;
    check_fee_buffer(bucket)?;
    if position_amount == 0 {
        return Err(RoutingError::RiskParameterOutOfRange("position_amount"));
    }
    let haircut = common_haircut(buffers, &asset)? * complement(buffers.close_fee_rate, "close_fee_rate")?;

    let debt = normalize(borrowed, bucket.borrowed_decimals)?
        .checked_mul(bucket.fee_buffer)
        .ok_or(RoutingError::ArithmeticOverflow("debt"))?;
    let collateral = normalize(position_amount, asset.decimals)?
        .checked_mul(haircut)
        .ok_or(RoutingError::ArithmeticOverflow("collateral"))?;
    debt.checked_div(collateral).ok_or(RoutingError::DivisionByZero)
}

/// Liquidation price in raw borrowed-asset units, rounded down.
pub fn liquidation_price(
    bucket: &BucketSnapshot,
    position_asset: Option<Asset>,
    position_amount: Amount,
    borrowed: Amount,
    buffers: &SafetyBuffers,
) -> Result<Amount, RoutingError> {
    let price = liquidation_price_fraction(bucket, position_asset, position_amount, borrowed, buffers)?;
    to_raw(price, bucket.borrowed_decimals)
}

/// Liquidation price of a position that a limit order would open at `limit_price`
/// with `leverage`:
/// `limit_price * fee_buffer * (leverage - 1) / ((1 - sb)(1 - otl)(1 - ppd) * leverage)`.
pub fn liquidation_price_by_order_fraction(
    bucket: &BucketSnapshot,
    position_asset: Option<Asset>,
    limit_price: Price,
    leverage: Leverage,
    buffers: &SafetyBuffers,
) -> Result<Decimal, RoutingError> {
    let asset = allowed(bucket, position_asset)?;
    check_fee_buffer(bucket)?;
    let haircut = common_haircut(buffers, &asset)?;
    let leverage = leverage.value();

    let numerator = limit_price
        .value()
        .checked_mul(bucket.fee_buffer)
        .and_then(|v| v.checked_mul(leverage - Decimal::ONE))
        .ok_or(RoutingError::ArithmeticOverflow("order numerator"))?;
    let denominator = haircut
        .checked_mul(leverage)
        .ok_or(RoutingError::ArithmeticOverflow("order denominator"))?;
    numerator.checked_div(denominator).ok_or(RoutingError::DivisionByZero)
}

pub fn liquidation_price_by_order(
    bucket: &BucketSnapshot,
    position_asset: Option<Asset>,
    limit_price: Price,
    leverage: Leverage,
    buffers: &SafetyBuffers,
) -> Result<Amount, RoutingError> {
    let price = liquidation_price_by_order_fraction(bucket, position_asset, limit_price, leverage, buffers)?;
    to_raw(price, bucket.borrowed_decimals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usdc() -> Asset {
        Asset::from_low_u64(1)
    }

    fn weth() -> Asset {
        Asset::from_low_u64(2)
    }

    fn bucket() -> BucketSnapshot {
        BucketSnapshot::new(usdc(), 6, dec!(1)).with_asset(weth(), 18, Decimal::ZERO)
    }

    fn no_buffers() -> SafetyBuffers {
        SafetyBuffers {
            security_buffer: Decimal::ZERO,
            oracle_tolerable_limit: Decimal::ZERO,
            close_fee_rate: Decimal::ZERO,
        }
    }

    const ONE_WETH: Amount = 1_000_000_000_000_000_000;

    #[test]
    fn liquidation_price_without_buffers_is_debt_per_unit() {
        // 1000 USDC against 1 WETH
        let price = liquidation_price(&bucket(), Some(weth()), ONE_WETH, 1_000_000_000, &no_buffers()).unwrap();
        assert_eq!(price, 1_000_000_000);
    }

    #[test]
    fn buffers_raise_liquidation_price() {
        let buffers = SafetyBuffers {
            security_buffer: dec!(0.2),
            ..no_buffers()
        };
        // 1000 / 0.8 = 1250 USDC
        let price = liquidation_price(&bucket(), Some(weth()), ONE_WETH, 1_000_000_000, &buffers).unwrap();
        assert_eq!(price, 1_250_000_000);
    }

    #[test]
    fn result_rounds_down() {
        let buffers = SafetyBuffers {
            security_buffer: dec!(0.3),
            ..no_buffers()
        };
        // 1 / 0.7 = 1.428571... -> 1.428571 USDC
        let price = liquidation_price(&bucket(), Some(weth()), ONE_WETH, 1_000_000, &buffers).unwrap();
        assert_eq!(price, 1_428_571);
    }

    #[test]
    fn by_order_formula() {
        let buffers = SafetyBuffers {
            security_buffer: dec!(0.5),
            ..no_buffers()
        };
        // 2000 * (3 - 1) / (0.5 * 3) = 2666.666666
        let price = liquidation_price_by_order(
            &bucket(),
            Some(weth()),
            Price::new(dec!(2000)).unwrap(),
            Leverage::new(dec!(3)).unwrap(),
            &buffers,
        )
        .unwrap();
        assert_eq!(price, 2_666_666_666);

        // no leverage, no debt, nothing to liquidate
        let flat = liquidation_price_by_order(
            &bucket(),
            Some(weth()),
            Price::new(dec!(2000)).unwrap(),
            Leverage::new(dec!(1)).unwrap(),
            &buffers,
        )
        .unwrap();
        assert_eq!(flat, 0);
    }

    #[test]
    fn rejects_bad_inputs() {
        let b = bucket();
        assert!(matches!(
            liquidation_price(&b, None, ONE_WETH, 1, &no_buffers()),
            Err(RoutingError::AddressNotSupported(_))
        ));
        assert_eq!(
            liquidation_price(&b, Some(usdc()), ONE_WETH, 1, &no_buffers()),
            Err(RoutingError::TokenNotSupported(usdc()))
        );
        assert_eq!(
            liquidation_price(&b, Some(weth()), 0, 1, &no_buffers()),
            Err(RoutingError::RiskParameterOutOfRange("position_amount"))
        );
        let broken = SafetyBuffers {
            close_fee_rate: dec!(1),
            ..no_buffers()
        };
        assert_eq!(
            liquidation_price(&b, Some(weth()), ONE_WETH, 1, &broken),
            Err(RoutingError::RiskParameterOutOfRange("close_fee_rate"))
        );
    }
}
