// 4.2 concentrated.rs: concentrated liquidity venues, both call conventions.
// one pool per (venue, pair, fee tier). the simulated pool trades inside its
// active range, so it prices on its own balances like a constant product pool.

use super::constant_product::{amount_in_for, amount_out_for};
use super::{quote_hops_in, quote_hops_out, settle_hops, HopQuote, SwapRequest, VenueAdapter};
use crate::error::RoutingError;
use crate::ledger::Ledger;
use crate::path::{HopData, Path};
use crate::types::{AccountId, Amount, Asset, VenueId};
use crate::venue::VenueType;
use std::collections::HashMap;

// fee tiers are in hundredths of a bip: 3000 = 0.3%
pub const FEE_TIER_DENOMINATOR: u128 = 1_000_000;

type PoolKey = (VenueId, Asset, Asset, u32);

#[derive(Debug, Clone)]
pub struct ConcentratedAdapter {
    venue_type: VenueType,
    pools: HashMap<PoolKey, AccountId>,
}

impl ConcentratedAdapter {
    /// `venue_type` picks the call convention (variant A or B).
    pub fn new(venue_type: VenueType) -> Self {
        debug_assert!(venue_type.is_concentrated());
        Self {
            venue_type,
            pools: HashMap::new(),
        }
    }

    pub fn register_pool(&mut self, venue: VenueId, a: Asset, b: Asset, fee_tier: u32, account: AccountId) {
        let (x, y) = if a <= b { (a, b) } else { (b, a) };
        self.pools.insert((venue, x, y, fee_tier), account);
    }

    fn fee_tier(&self, path: &Path, hop: usize) -> Result<u32, RoutingError> {
        match &path.hops {
            HopData::FeeTiers(tiers) => tiers.get(hop).copied().ok_or(RoutingError::ParamsLengthMismatch {
                expected: path.hop_count(),
                actual: tiers.len(),
            }),
            _ => Err(RoutingError::MalformedPayload {
                venue_type: self.venue_type,
                reason: "missing fee tiers",
            }),
        }
    }

    fn pool(&self, venue: VenueId, asset_in: Asset, asset_out: Asset, fee_tier: u32) -> Result<AccountId, RoutingError> {
        let (x, y) = if asset_in <= asset_out { (asset_in, asset_out) } else { (asset_out, asset_in) };
        self.pools
            .get(&(venue, x, y, fee_tier))
            .copied()
            .ok_or(RoutingError::PoolNotFound {
                venue,
                asset_in,
                asset_out,
            })
    }

    fn hop(
        &self,
        ledger: &Ledger,
        venue: VenueId,
        path: &Path,
        index: usize,
        (asset_in, asset_out): (Asset, Asset),
        amount: Amount,
        exact_out: bool,
    ) -> Result<HopQuote, RoutingError> {
        let fee = self.fee_tier(path, index)?;
        let pool = self.pool(venue, asset_in, asset_out, fee)?;
        let reserve_in = ledger.balance(pool, asset_in);
        let reserve_out = ledger.balance(pool, asset_out);
        let amount = if exact_out {
            amount_in_for(reserve_in, reserve_out, amount, fee, FEE_TIER_DENOMINATOR)?
        } else {
            amount_out_for(reserve_in, reserve_out, amount, fee, FEE_TIER_DENOMINATOR)?
        };
        Ok(HopQuote { pool, amount })
    }
}

impl VenueAdapter for ConcentratedAdapter {
    fn venue_type(&self) -> VenueType {
        self.venue_type
    }

    fn quote_out(&self, ledger: &Ledger, venue: VenueId, path: &Path, amount_in: Amount) -> Result<Vec<Amount>, RoutingError> {
        quote_hops_out(path, amount_in, |i, a, b, amount| self.hop(ledger, venue, path, i, (a, b), amount, false))
    }

    fn quote_in(&self, ledger: &Ledger, venue: VenueId, path: &Path, amount_out: Amount) -> Result<Vec<Amount>, RoutingError> {
        quote_hops_in(path, amount_out, |i, a, b, amount| self.hop(ledger, venue, path, i, (a, b), amount, true))
    }

    fn settle(&self, ledger: &mut Ledger, request: &SwapRequest, path: &Path) -> Result<Amount, RoutingError> {
        settle_hops(ledger, request, path, |l, i, a, b, amount| {
            self.hop(l, request.venue, path, i, (a, b), amount, false)
        })
    }
}
