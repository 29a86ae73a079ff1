//! Curve-style StableSwap venue.
//!
//! Two-coin pools with amplification `A`. The invariant `D` and the post-trade
//! balance `y` are solved by Newton iteration, so the venue has no closed-form
//! inverse: `quote_in` only returns an estimate and reports `is_invertible() == false`.
//!
//! Each hop names its pool. The all-zero pool id asks the adapter to pick the
//! registered pool with the best output for the pair.

use super::{quote_hops_in, quote_hops_out, settle_hops, HopQuote, SwapRequest, VenueAdapter};
use crate::error::RoutingError;
use crate::ledger::Ledger;
use crate::math::{div_round, mul_div, Rounding};
use crate::path::{HopData, Path};
use crate::types::{AccountId, Amount, Asset, Bps, PoolId, VenueId};
use crate::venue::VenueType;
use std::collections::BTreeMap;

const N_COINS: u128 = 2;
const MAX_ITERATIONS: u32 = 256;
const CONVERGENCE_THRESHOLD: u128 = 1;

/// `D` for balances `x`, `y`: `A·n·S + D = A·D·n + D³ / (n^n · x · y)`.
fn compute_d(x: u128, y: u128, amp: u128) -> Result<u128, RoutingError> {
    let s = x
        .checked_add(y)
        .ok_or(RoutingError::ArithmeticOverflow("D: x + y"))?;
    if s == 0 {
        return Ok(0);
    }
    if x == 0 || y == 0 {
        return Err(RoutingError::InsufficientLiquidity);
    }
    let ann = amp
        .checked_mul(N_COINS)
        .ok_or(RoutingError::ArithmeticOverflow("D: A·n"))?;

    let mut d = s;
    for _ in 0..MAX_ITERATIONS {
        let d_p = mul_div(d, d, N_COINS * x, Rounding::Down)?;
        let d_p = mul_div(d_p, d, N_COINS * y, Rounding::Down)?;
        let previous = d;

        let numerator = ann
            .checked_mul(s)
            .and_then(|v| v.checked_add(N_COINS.checked_mul(d_p)?))
            .ok_or(RoutingError::ArithmeticOverflow("D: numerator"))?;
        let denominator = ann
            .saturating_sub(1)
            .checked_mul(d)
            .and_then(|v| v.checked_add((N_COINS + 1).checked_mul(d_p)?))
            .ok_or(RoutingError::ArithmeticOverflow("D: denominator"))?;
        d = mul_div(numerator, d, denominator, Rounding::Down)?;

        if d.abs_diff(previous) <= CONVERGENCE_THRESHOLD {
            return Ok(d);
        }
    }
    Err(RoutingError::ArithmeticOverflow("D did not converge"))
}

/// Balance of the other coin that keeps `D` fixed once this coin's balance is `x_new`.
fn compute_y(x_new: u128, d: u128, amp: u128) -> Result<u128, RoutingError> {
    if x_new == 0 {
        return Err(RoutingError::DivisionByZero);
    }
    let ann = amp
        .checked_mul(N_COINS)
        .ok_or(RoutingError::ArithmeticOverflow("y: A·n"))?;
    if ann == 0 {
        return Err(RoutingError::DivisionByZero);
    }

    // y² + (b − D)·y = c
    let c = mul_div(d, d, N_COINS * x_new, Rounding::Down)?;
    let c = mul_div(c, d, N_COINS * ann, Rounding::Down)?;
    let b = x_new
        .checked_add(d / ann)
        .ok_or(RoutingError::ArithmeticOverflow("y: b"))?;

    let mut y = d;
    for _ in 0..MAX_ITERATIONS {
        let previous = y;
        let denominator = y
            .checked_mul(2)
            .and_then(|v| v.checked_add(b))
            .ok_or(RoutingError::ArithmeticOverflow("y: denominator"))?
            .saturating_sub(d);
        if denominator == 0 {
            return Err(RoutingError::DivisionByZero);
        }
        // (y² + c) / denominator, split so y² never needs to fit in 128 bits
        y = mul_div(y, y, denominator, Rounding::Down)?
            .checked_add(div_round(c, denominator, Rounding::Down)?)
            .ok_or(RoutingError::ArithmeticOverflow("y: next"))?;

        if y.abs_diff(previous) <= CONVERGENCE_THRESHOLD {
            return Ok(y);
        }
    }
    Err(RoutingError::ArithmeticOverflow("y did not converge"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurvePool {
    pub venue: VenueId,
    pub account: AccountId,
    pub coins: [Asset; 2],
    pub amplification: u128,
    pub fee_bps: u32,
}

impl CurvePool {
    fn trades(&self, asset_in: Asset, asset_out: Asset) -> bool {
        asset_in != asset_out && self.coins.contains(&asset_in) && self.coins.contains(&asset_out)
    }

    /// Exact-input output: fee off the input (rounded up), Newton solve for the new
    /// output balance, output rounded down by one unit of solver slack.
    pub fn amount_out(&self, ledger: &Ledger, asset_in: Asset, asset_out: Asset, amount_in: Amount) -> Result<Amount, RoutingError> {
        let x = ledger.balance(self.account, asset_in);
        let y = ledger.balance(self.account, asset_out);
        let d = compute_d(x, y, self.amplification)?;

        let fee = Bps::new(self.fee_bps).fee_on(amount_in)?;
        let net = amount_in
            .checked_sub(fee)
            .ok_or(RoutingError::ArithmeticOverflow("curve fee exceeds input"))?;
        if net == 0 {
            return Ok(0);
        }
        let x_new = x
            .checked_add(net)
            .ok_or(RoutingError::ArithmeticOverflow("curve x + net"))?;
        let y_new = compute_y(x_new, d, self.amplification)?;
        Ok(y.saturating_sub(y_new).saturating_sub(1))
    }

    // near the peg a stable pool trades ~1:1, so gross up for the fee and add slack
    fn estimate_in(&self, ledger: &Ledger, asset_out: Asset, amount_out: Amount) -> Result<Amount, RoutingError> {
        if amount_out >= ledger.balance(self.account, asset_out) {
            return Err(RoutingError::InsufficientLiquidity);
        }
        let gross = Bps::new(self.fee_bps).gross_up(amount_out)?;
        Ok(gross.saturating_add(1))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurveAdapter {
    pools: BTreeMap<PoolId, CurvePool>,
}

impl CurveAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pool(&mut self, id: PoolId, pool: CurvePool) {
        self.pools.insert(id, pool);
    }

    fn pool_hint(path: &Path, hop: usize) -> Result<PoolId, RoutingError> {
        match &path.hops {
            HopData::Pools(pools) => pools.get(hop).copied().ok_or(RoutingError::ParamsLengthMismatch {
                expected: path.hop_count(),
                actual: pools.len(),
            }),
            _ => Err(RoutingError::MalformedPayload {
                venue_type: VenueType::CurveStyleInvariant,
                reason: "missing pool ids",
            }),
        }
    }

    fn explicit_pool(&self, id: PoolId, venue: VenueId, asset_in: Asset, asset_out: Asset) -> Result<&CurvePool, RoutingError> {
        let pool = self.pools.get(&id).ok_or(RoutingError::UnknownPool(id))?;
        if pool.venue != venue || !pool.trades(asset_in, asset_out) {
            return Err(RoutingError::PoolNotFound {
                venue,
                asset_in,
                asset_out,
            });
        }
        Ok(pool)
    }

    /// Highest-output pool on `venue` for the pair. Pools that cannot quote the
    /// amount are skipped; ties keep the lowest pool id.
    fn best_pool(&self, ledger: &Ledger, venue: VenueId, asset_in: Asset, asset_out: Asset, amount_in: Amount) -> Result<(&CurvePool, Amount), RoutingError> {
        let mut best: Option<(&CurvePool, Amount)> = None;
        for pool in self.pools.values().filter(|p| p.venue == venue && p.trades(asset_in, asset_out)) {
            let Ok(out) = pool.amount_out(ledger, asset_in, asset_out, amount_in) else {
                continue;
            };
            if best.map_or(true, |(_, current)| out > current) {
                best = Some((pool, out));
            }
        }
        best.ok_or(RoutingError::PoolNotFound {
            venue,
            asset_in,
            asset_out,
        })
    }

    fn hop_out(&self, ledger: &Ledger, venue: VenueId, path: &Path, index: usize, asset_in: Asset, asset_out: Asset, amount_in: Amount) -> Result<HopQuote, RoutingError> {
        let hint = Self::pool_hint(path, index)?;
        let (pool, amount) = if hint.is_none() {
            self.best_pool(ledger, venue, asset_in, asset_out, amount_in)?
        } else {
            let pool = self.explicit_pool(hint, venue, asset_in, asset_out)?;
            (pool, pool.amount_out(ledger, asset_in, asset_out, amount_in)?)
        };
        tracing::debug!(%venue, account = pool.account.0, %amount_in, %amount, "curve hop priced");
        Ok(HopQuote {
            pool: pool.account,
            amount,
        })
    }

    fn hop_in(&self, ledger: &Ledger, venue: VenueId, path: &Path, index: usize, asset_in: Asset, asset_out: Asset, amount_out: Amount) -> Result<HopQuote, RoutingError> {
        let hint = Self::pool_hint(path, index)?;
        let pool = if hint.is_none() {
            self.pools
                .values()
                .find(|p| p.venue == venue && p.trades(asset_in, asset_out))
                .ok_or(RoutingError::PoolNotFound {
                    venue,
                    asset_in,
                    asset_out,
                })?
        } else {
            self.explicit_pool(hint, venue, asset_in, asset_out)?
        };
        Ok(HopQuote {
            pool: pool.account,
            amount: pool.estimate_in(ledger, asset_out, amount_out)?,
        })
    }
}

impl VenueAdapter for CurveAdapter {
    fn venue_type(&self) -> VenueType {
        VenueType::CurveStyleInvariant
    }

    fn is_invertible(&self) -> bool {
        false
    }

    fn quote_out(&self, ledger: &Ledger, venue: VenueId, path: &Path, amount_in: Amount) -> Result<Vec<Amount>, RoutingError> {
        quote_hops_out(path, amount_in, |i, a, b, amount| self.hop_out(ledger, venue, path, i, a, b, amount))
    }

    fn quote_in(&self, ledger: &Ledger, venue: VenueId, path: &Path, amount_out: Amount) -> Result<Vec<Amount>, RoutingError> {
        quote_hops_in(path, amount_out, |i, a, b, amount| self.hop_in(ledger, venue, path, i, a, b, amount))
    }

    fn settle(&self, ledger: &mut Ledger, request: &SwapRequest, path: &Path) -> Result<Amount, RoutingError> {
        settle_hops(ledger, request, path, |l, i, a, b, amount| {
            self.hop_out(l, request.venue, path, i, a, b, amount)
        })
    }
}
