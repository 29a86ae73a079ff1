// 4.1 constant_product.rs: x*y=k pools keyed by (venue, unordered pair).
// reserves are the pool account's ledger balances.

use super::{quote_hops_in, quote_hops_out, settle_hops, HopQuote, SwapRequest, VenueAdapter};
use crate::error::RoutingError;
use crate::ledger::Ledger;
use crate::math::{mul_div, Rounding};
use crate::path::Path;
use crate::types::{AccountId, Amount, Asset, Bps, VenueId};
use crate::venue::VenueType;
use std::collections::HashMap;

/// Output of an exact-input swap on a constant product curve.
///
/// The fee is taken from the input and rounded up, the output is rounded down:
/// `out = R_out * net / (R_in + net)`. `fee_denominator` is 10_000 for basis
/// points and 1_000_000 for hundredths of a bip.
pub fn amount_out_for(
    reserve_in: Amount,
    reserve_out: Amount,
    amount_in: Amount,
    fee: u32,
    fee_denominator: u128,
) -> Result<Amount, RoutingError> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(RoutingError::InsufficientLiquidity);
    }
    let fee_amount = mul_div(amount_in, u128::from(fee), fee_denominator, Rounding::Up)?;
    let net = amount_in
        .checked_sub(fee_amount)
        .ok_or(RoutingError::ArithmeticOverflow("fee exceeds input"))?;
    let denominator = reserve_in
        .checked_add(net)
        .ok_or(RoutingError::ArithmeticOverflow("reserve_in + net"))?;
    mul_div(reserve_out, net, denominator, Rounding::Down)
}

/// Input required to receive exactly `amount_out`, rounded up at every step.
pub fn amount_in_for(
    reserve_in: Amount,
    reserve_out: Amount,
    amount_out: Amount,
    fee: u32,
    fee_denominator: u128,
) -> Result<Amount, RoutingError> {
    if reserve_in == 0 || amount_out >= reserve_out {
        return Err(RoutingError::InsufficientLiquidity);
    }
    let fee = u128::from(fee);
    if fee >= fee_denominator {
        return Err(RoutingError::DivisionByZero);
    }
    let net = mul_div(reserve_in, amount_out, reserve_out - amount_out, Rounding::Up)?;
    // floor(gross * (D - fee) / D) >= net holds exactly at the ceiling
    mul_div(net, fee_denominator, fee_denominator - fee, Rounding::Up)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pool {
    account: AccountId,
    fee_bps: u32,
}

fn pair_key(a: Asset, b: Asset) -> (Asset, Asset) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstantProductAdapter {
    pools: HashMap<(VenueId, Asset, Asset), Pool>,
}

impl ConstantProductAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pool(&mut self, venue: VenueId, a: Asset, b: Asset, account: AccountId, fee_bps: u32) {
        let (x, y) = pair_key(a, b);
        self.pools.insert((venue, x, y), Pool { account, fee_bps });
    }

    fn pool(&self, venue: VenueId, asset_in: Asset, asset_out: Asset) -> Result<Pool, RoutingError> {
        let (x, y) = pair_key(asset_in, asset_out);
        self.pools
            .get(&(venue, x, y))
            .copied()
            .ok_or(RoutingError::PoolNotFound {
                venue,
                asset_in,
                asset_out,
            })
    }

    fn hop_out(&self, ledger: &Ledger, venue: VenueId, asset_in: Asset, asset_out: Asset, amount_in: Amount) -> Result<HopQuote, RoutingError> {
        let pool = self.pool(venue, asset_in, asset_out)?;
        let amount = amount_out_for(
            ledger.balance(pool.account, asset_in),
            ledger.balance(pool.account, asset_out),
            amount_in,
            pool.fee_bps,
            Bps::DENOMINATOR,
        )?;
        Ok(HopQuote { pool: pool.account, amount })
    }

    fn hop_in(&self, ledger: &Ledger, venue: VenueId, asset_in: Asset, asset_out: Asset, amount_out: Amount) -> Result<HopQuote, RoutingError> {
        let pool = self.pool(venue, asset_in, asset_out)?;
        let amount = amount_in_for(
            ledger.balance(pool.account, asset_in),
            ledger.balance(pool.account, asset_out),
            amount_out,
            pool.fee_bps,
            Bps::DENOMINATOR,
        )?;
        Ok(HopQuote { pool: pool.account, amount })
    }
}

impl VenueAdapter for ConstantProductAdapter {
    fn venue_type(&self) -> VenueType {
        VenueType::SimpleConstantProduct
    }

    fn quote_out(&self, ledger: &Ledger, venue: VenueId, path: &Path, amount_in: Amount) -> Result<Vec<Amount>, RoutingError> {
        quote_hops_out(path, amount_in, |_, a, b, amount| self.hop_out(ledger, venue, a, b, amount))
    }

    fn quote_in(&self, ledger: &Ledger, venue: VenueId, path: &Path, amount_out: Amount) -> Result<Vec<Amount>, RoutingError> {
        quote_hops_in(path, amount_out, |_, a, b, amount| self.hop_in(ledger, venue, a, b, amount))
    }

    fn settle(&self, ledger: &mut Ledger, request: &SwapRequest, path: &Path) -> Result<Amount, RoutingError> {
        settle_hops(ledger, request, path, |l, _, a, b, amount| {
            self.hop_out(l, request.venue, a, b, amount)
        })
    }
}
