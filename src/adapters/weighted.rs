// 4.4 weighted.rs: weighted pools behind one vault venue. pools are addressed by
// PoolId per hop; limits travel with the path and limits[last] < 0 is a floor on
// what the vault may pay out.

use super::{quote_hops_in, quote_hops_out, settle_hops, HopQuote, SwapRequest, VenueAdapter};
use crate::error::RoutingError;
use crate::ledger::Ledger;
use crate::math::{from_decimal, to_decimal, Rounding};
use crate::path::{HopData, Path};
use crate::types::{AccountId, Amount, Asset, Bps, PoolId, VenueId};
use crate::venue::VenueType;
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPool {
    pub venue: VenueId,
    pub account: AccountId,
    /// Normalised weights, one per token. Need not sum to one; only ratios matter.
    pub weights: Vec<(Asset, Decimal)>,
    pub fee_bps: u32,
}

impl WeightedPool {
    fn weight(&self, asset: Asset) -> Option<Decimal> {
        self.weights.iter().find(|(a, _)| *a == asset).map(|(_, w)| *w)
    }

    fn weights_for(&self, asset_in: Asset, asset_out: Asset) -> Option<(Decimal, Decimal)> {
        let wi = self.weight(asset_in)?;
        let wo = self.weight(asset_out)?;
        (asset_in != asset_out && wi > Decimal::ZERO && wo > Decimal::ZERO).then_some((wi, wo))
    }

    /// `out = Bo · (1 − (Bi / (Bi + Ai))^(wi/wo))` with the fee taken from `Ai` first.
    pub fn amount_out(&self, ledger: &Ledger, asset_in: Asset, asset_out: Asset, amount_in: Amount) -> Result<Amount, RoutingError> {
        let (wi, wo) = self.weights_for(asset_in, asset_out).ok_or(RoutingError::TokenNotSupported(asset_out))?;
        let bi = ledger.balance(self.account, asset_in);
        let bo = ledger.balance(self.account, asset_out);
        if bi == 0 || bo == 0 {
            return Err(RoutingError::InsufficientLiquidity);
        }
        let fee = Bps::new(self.fee_bps).fee_on(amount_in)?;
        let net = amount_in - fee.min(amount_in);

        let bi_d = to_decimal(bi)?;
        let grown = bi_d
            .checked_add(to_decimal(net)?)
            .ok_or(overflow("weighted Bi + Ai"))?;
        let ratio = bi_d.checked_div(grown).ok_or(RoutingError::DivisionByZero)?;
        let factor = ratio
            .checked_powd(exponent(wi, wo)?)
            .and_then(|p| Decimal::ONE.checked_sub(p))
            .ok_or(overflow("weighted power"))?;
        let out = to_decimal(bo)?
            .checked_mul(factor)
            .ok_or(overflow("weighted Bo * factor"))?;
        Ok(from_decimal(out, Rounding::Down)?.min(bo.saturating_sub(1)))
    }

    /// Smallest input whose [`amount_out`](Self::amount_out) reaches `amount_out`.
    ///
    /// `in = Bi · ((Bo / (Bo − Ao))^(wo/wi) − 1)`, grossed up for the fee, seeds
    /// the search. `powd` is approximate, so the answer is bracketed around the
    /// seed on the forward curve and then narrowed to the unit.
    pub fn amount_in(&self, ledger: &Ledger, asset_in: Asset, asset_out: Asset, amount_out: Amount) -> Result<Amount, RoutingError> {
        let (wi, wo) = self.weights_for(asset_in, asset_out).ok_or(RoutingError::TokenNotSupported(asset_out))?;
        let bi = ledger.balance(self.account, asset_in);
        let bo = ledger.balance(self.account, asset_out);
        if bi == 0 || amount_out >= bo {
            return Err(RoutingError::InsufficientLiquidity);
        }
        if amount_out == 0 {
            return Ok(0);
        }
        let bo_d = to_decimal(bo)?;
        let remaining = bo_d
            .checked_sub(to_decimal(amount_out)?)
            .ok_or(overflow("weighted Bo - Ao"))?;
        let ratio = bo_d.checked_div(remaining).ok_or(RoutingError::DivisionByZero)?;
        let net = ratio
            .checked_powd(exponent(wo, wi)?)
            .and_then(|p| p.checked_sub(Decimal::ONE))
            .and_then(|growth| to_decimal(bi).ok()?.checked_mul(growth))
            .ok_or(overflow("weighted inverse power"))?;
        let seed = Bps::new(self.fee_bps).gross_up(from_decimal(net, Rounding::Up)?)?.max(1);

        let clears = |candidate: Amount| -> Result<bool, RoutingError> {
            Ok(self.amount_out(ledger, asset_in, asset_out, candidate)? >= amount_out)
        };

        // bracket: `lo` falls short, `hi` clears
        let (mut lo, mut hi) = if clears(seed)? {
            let mut hi = seed;
            let mut step: Amount = 1;
            loop {
                let below = hi.saturating_sub(step);
                if below == 0 || !clears(below)? {
                    break (below, hi);
                }
                hi = below;
                step = step.saturating_mul(2);
            }
        } else {
            let mut lo = seed;
            let mut step: Amount = 1;
            loop {
                let above = lo.checked_add(step).ok_or(RoutingError::InsufficientLiquidity)?;
                if clears(above)? {
                    break (lo, above);
                }
                lo = above;
                step = step.checked_mul(2).ok_or(RoutingError::InsufficientLiquidity)?;
            }
        };

        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if clears(mid)? {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        Ok(hi)
    }
}

fn overflow(what: &'static str) -> RoutingError {
    RoutingError::ArithmeticOverflow(what)
}

fn exponent(numerator: Decimal, denominator: Decimal) -> Result<Decimal, RoutingError> {
    numerator.checked_div(denominator).ok_or(RoutingError::DivisionByZero)
}

#[derive(Debug, Clone, Default)]
pub struct WeightedAdapter {
    pools: HashMap<PoolId, WeightedPool>,
}

impl WeightedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pool(&mut self, id: PoolId, pool: WeightedPool) {
        self.pools.insert(id, pool);
    }

    fn pool(&self, venue: VenueId, path: &Path, hop: usize) -> Result<&WeightedPool, RoutingError> {
        let HopData::Weighted { pool_ids, .. } = &path.hops else {
            return Err(RoutingError::MalformedPayload {
                venue_type: VenueType::WeightedPoolStyle,
                reason: "missing pool ids",
            });
        };
        let id = pool_ids.get(hop).copied().ok_or(RoutingError::ParamsLengthMismatch {
            expected: path.hop_count(),
            actual: pool_ids.len(),
        })?;
        let pool = self.pools.get(&id).ok_or(RoutingError::UnknownPool(id))?;
        if pool.venue != venue {
            return Err(RoutingError::UnknownPool(id));
        }
        Ok(pool)
    }

    fn hop(&self, ledger: &Ledger, venue: VenueId, path: &Path, index: usize, pair: (Asset, Asset), amount: Amount, exact_out: bool) -> Result<HopQuote, RoutingError> {
        let pool = self.pool(venue, path, index)?;
        let amount = if exact_out {
            pool.amount_in(ledger, pair.0, pair.1, amount)?
        } else {
            pool.amount_out(ledger, pair.0, pair.1, amount)?
        };
        Ok(HopQuote {
            pool: pool.account,
            amount,
        })
    }
}

// negative limit on the final asset = minimum the vault must pay out
fn output_floor(path: &Path) -> Amount {
    match &path.hops {
        HopData::Weighted { limits, .. } => match limits.last() {
            Some(limit) if *limit < 0 => limit.unsigned_abs(),
            _ => 0,
        },
        _ => 0,
    }
}

impl VenueAdapter for WeightedAdapter {
    fn venue_type(&self) -> VenueType {
        VenueType::WeightedPoolStyle
    }

    fn quote_out(&self, ledger: &Ledger, venue: VenueId, path: &Path, amount_in: Amount) -> Result<Vec<Amount>, RoutingError> {
        quote_hops_out(path, amount_in, |i, a, b, amount| self.hop(ledger, venue, path, i, (a, b), amount, false))
    }

    fn quote_in(&self, ledger: &Ledger, venue: VenueId, path: &Path, amount_out: Amount) -> Result<Vec<Amount>, RoutingError> {
        quote_hops_in(path, amount_out, |i, a, b, amount| self.hop(ledger, venue, path, i, (a, b), amount, true))
    }

    fn settle(&self, ledger: &mut Ledger, request: &SwapRequest, path: &Path) -> Result<Amount, RoutingError> {
        let out = settle_hops(ledger, request, path, |l, i, a, b, amount| {
            self.hop(l, request.venue, path, i, (a, b), amount, false)
        })?;
        let floor = output_floor(path);
        if out < floor {
            return Err(RoutingError::SlippageToleranceExceeded { min_out: floor, actual: out });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bal() -> Asset {
        Asset::from_low_u64(1)
    }

    fn weth() -> Asset {
        Asset::from_low_u64(2)
    }

    fn venue() -> VenueId {
        VenueId::from_low_u64(5)
    }

    fn pool(wi: Decimal, wo: Decimal) -> WeightedPool {
        WeightedPool {
            venue: venue(),
            account: AccountId(30),
            weights: vec![(bal(), wi), (weth(), wo)],
            fee_bps: 0,
        }
    }

    fn ledger() -> Ledger {
        Ledger::new()
            .with_balance(AccountId(30), bal(), 1_000_000)
            .and_then(|l| l.with_balance(AccountId(30), weth(), 1_000_000))
            .unwrap()
    }

    #[test]
    fn equal_weights_match_constant_product() {
        // (1 - 1e6/(1e6+1e5)) * 1e6 = 90909.09
        let out = pool(dec!(0.5), dec!(0.5)).amount_out(&ledger(), bal(), weth(), 100_000).unwrap();
        assert!(out.abs_diff(90_909) <= 1, "out = {out}");
    }

    #[test]
    fn heavier_input_weight_gives_more_output() {
        let even = pool(dec!(0.5), dec!(0.5)).amount_out(&ledger(), bal(), weth(), 100_000).unwrap();
        let heavy = pool(dec!(0.8), dec!(0.2)).amount_out(&ledger(), bal(), weth(), 100_000).unwrap();
        assert!(heavy > even);
    }

    #[test]
    fn amount_in_clears_target() {
        let p = WeightedPool {
            fee_bps: 30,
            ..pool(dec!(0.8), dec!(0.2))
        };
        let needed = p.amount_in(&ledger(), bal(), weth(), 50_000).unwrap();
        assert!(p.amount_out(&ledger(), bal(), weth(), needed).unwrap() >= 50_000);
        assert!(p.amount_out(&ledger(), bal(), weth(), needed - 1).unwrap() < 50_000);
    }

    #[test]
    fn amount_in_is_minimal_on_deep_pools() {
        let p = WeightedPool {
            venue: venue(),
            account: AccountId(31),
            weights: vec![(bal(), dec!(0.8)), (weth(), dec!(0.2))],
            fee_bps: 0,
        };
        let deep = 10u128.pow(24);
        let ledger = Ledger::new()
            .with_balance(AccountId(31), bal(), deep)
            .and_then(|l| l.with_balance(AccountId(31), weth(), deep))
            .unwrap();
        let target = 123_456_789_012_345_678_901;
        let needed = p.amount_in(&ledger, bal(), weth(), target).unwrap();
        assert!(p.amount_out(&ledger, bal(), weth(), needed).unwrap() >= target);
        assert!(p.amount_out(&ledger, bal(), weth(), needed - 1).unwrap() < target);
    }

    #[test]
    fn decimal_overflow_is_an_error() {
        let p = WeightedPool {
            venue: venue(),
            account: AccountId(32),
            weights: vec![(bal(), dec!(0.2)), (weth(), dec!(0.8))],
            fee_bps: 0,
        };
        let ledger = Ledger::new()
            .with_balance(AccountId(32), bal(), 10u128.pow(20))
            .and_then(|l| l.with_balance(AccountId(32), weth(), 1_000_000))
            .unwrap();
        assert!(matches!(
            p.amount_in(&ledger, bal(), weth(), 999_990),
            Err(RoutingError::ArithmeticOverflow(_))
        ));
    }

    #[test]
    fn unknown_pool_rejected() {
        let mut adapter = WeightedAdapter::new();
        adapter.register_pool(PoolId::from_low_u64(1), pool(dec!(0.5), dec!(0.5)));
        let path = Path::weighted(vec![bal(), weth()], vec![PoolId::from_low_u64(2)]);
        assert_eq!(
            adapter.quote_out(&ledger(), venue(), &path, 1_000),
            Err(RoutingError::UnknownPool(PoolId::from_low_u64(2)))
        );
    }
}
