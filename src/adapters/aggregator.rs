// 4.5 aggregator.rs: peer aggregator venues. the adapter trusts the payload and
// hands the whole path to a backend, then checks the backend's receipt against
// what actually landed in the recipient's account.

use super::{SwapRequest, VenueAdapter};
use crate::error::RoutingError;
use crate::ledger::Ledger;
use crate::math::{from_decimal, to_decimal, Rounding};
use crate::path::Path;
use crate::types::{AccountId, Amount, Asset, VenueId};
use crate::venue::VenueType;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorCall<'a> {
    pub venue: VenueId,
    pub path: &'a Path,
    pub amount_in: Amount,
    pub payer: AccountId,
    pub recipient: AccountId,
}

/// What the backend says it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorReceipt {
    pub recipient: AccountId,
    pub asset: Asset,
    pub amount_out: Amount,
}

pub trait AggregatorBackend: Send + Sync {
    fn quote_out(&self, venue: VenueId, path: &Path, amount_in: Amount) -> Result<Vec<Amount>, RoutingError>;

    fn quote_in(&self, venue: VenueId, path: &Path, amount_out: Amount) -> Result<Vec<Amount>, RoutingError>;

    fn execute(&self, ledger: &mut Ledger, call: AggregatorCall<'_>) -> Result<AggregatorReceipt, RoutingError>;
}

pub struct AggregatorAdapter {
    backend: Box<dyn AggregatorBackend>,
}

impl AggregatorAdapter {
    pub fn new(backend: Box<dyn AggregatorBackend>) -> Self {
        Self { backend }
    }
}

impl std::fmt::Debug for AggregatorAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatorAdapter").finish_non_exhaustive()
    }
}

impl VenueAdapter for AggregatorAdapter {
    fn venue_type(&self) -> VenueType {
        VenueType::PeerAggregatorPayload
    }

    fn quote_out(&self, _ledger: &Ledger, venue: VenueId, path: &Path, amount_in: Amount) -> Result<Vec<Amount>, RoutingError> {
        self.backend.quote_out(venue, path, amount_in)
    }

    fn quote_in(&self, _ledger: &Ledger, venue: VenueId, path: &Path, amount_out: Amount) -> Result<Vec<Amount>, RoutingError> {
        self.backend.quote_in(venue, path, amount_out)
    }

    fn settle(&self, ledger: &mut Ledger, request: &SwapRequest, path: &Path) -> Result<Amount, RoutingError> {
        let before = ledger.balance(request.recipient, request.token_out);
        let receipt = self.backend.execute(
            ledger,
            AggregatorCall {
                venue: request.venue,
                path,
                amount_in: request.amount_in,
                payer: request.payer,
                recipient: request.recipient,
            },
        )?;
        let grew_by = ledger
            .balance(request.recipient, request.token_out)
            .saturating_sub(before);

        if receipt.recipient != request.recipient || receipt.asset != request.token_out || grew_by != receipt.amount_out {
            tracing::warn!(
                venue = %request.venue,
                expected = request.recipient.0,
                reported = receipt.recipient.0,
                %grew_by,
                amount_out = %receipt.amount_out,
                "aggregator receipt does not match delivery"
            );
            return Err(RoutingError::UnexpectedRecipient);
        }
        Ok(receipt.amount_out)
    }
}

/// Aggregator backend that fills from its own treasury at fixed per-pair rates.
/// `payout_override` redirects deliveries to another account to model a venue
/// that pays the wrong party.
#[derive(Debug, Clone)]
pub struct SimulatedAggregator {
    treasury: AccountId,
    rates: HashMap<(Asset, Asset), Decimal>,
    payout_override: Option<AccountId>,
}

impl SimulatedAggregator {
    pub fn new(treasury: AccountId) -> Self {
        Self {
            treasury,
            rates: HashMap::new(),
            payout_override: None,
        }
    }

    /// Units of `to` paid per unit of `from`, raw amounts on both sides.
    pub fn with_rate(mut self, from: Asset, to: Asset, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }

    pub fn with_payout_override(mut self, account: AccountId) -> Self {
        self.payout_override = Some(account);
        self
    }

    fn rate(&self, venue: VenueId, from: Asset, to: Asset) -> Result<Decimal, RoutingError> {
        self.rates
            .get(&(from, to))
            .copied()
            .filter(|r| *r > Decimal::ZERO)
            .ok_or(RoutingError::PoolNotFound {
                venue,
                asset_in: from,
                asset_out: to,
            })
    }
}

impl AggregatorBackend for SimulatedAggregator {
    fn quote_out(&self, venue: VenueId, path: &Path, amount_in: Amount) -> Result<Vec<Amount>, RoutingError> {
        let mut amounts = vec![amount_in];
        let mut amount = amount_in;
        for (from, to) in path.hops_iter() {
            let rate = self.rate(venue, from, to)?;
            let scaled = to_decimal(amount)?
                .checked_mul(rate)
                .ok_or(RoutingError::ArithmeticOverflow("aggregator amount * rate"))?;
            amount = from_decimal(scaled, Rounding::Down)?;
            amounts.push(amount);
        }
        Ok(amounts)
    }

    fn quote_in(&self, venue: VenueId, path: &Path, amount_out: Amount) -> Result<Vec<Amount>, RoutingError> {
        let pairs: Vec<(Asset, Asset)> = path.hops_iter().collect();
        let mut amounts = vec![0; pairs.len() + 1];
        amounts[pairs.len()] = amount_out;
        let mut amount = amount_out;
        for (i, (from, to)) in pairs.iter().enumerate().rev() {
            let rate = self.rate(venue, *from, *to)?;
            let scaled = to_decimal(amount)?
                .checked_div(rate)
                .ok_or(RoutingError::ArithmeticOverflow("aggregator amount / rate"))?;
            amount = from_decimal(scaled, Rounding::Up)?;
            amounts[i] = amount;
        }
        Ok(amounts)
    }

    fn execute(&self, ledger: &mut Ledger, call: AggregatorCall<'_>) -> Result<AggregatorReceipt, RoutingError> {
        let amounts = self.quote_out(call.venue, call.path, call.amount_in)?;
        let (Some(asset_in), Some(asset_out), Some(amount_out)) = (call.path.first(), call.path.last(), amounts.last().copied()) else {
            return Err(RoutingError::SwapDidNotOccur);
        };
        let paid_to = self.payout_override.unwrap_or(call.recipient);
        ledger.safe_transfer(call.payer, self.treasury, asset_in, call.amount_in)?;
        ledger.safe_transfer(self.treasury, paid_to, asset_out, amount_out)?;
        Ok(AggregatorReceipt {
            recipient: paid_to,
            asset: asset_out,
            amount_out,
        })
    }
}
