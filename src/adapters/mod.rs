// 4.0: venue adapters. one per venue family, all behind the same trait.
// quotes never mutate the ledger. swap_exact wraps every adapter's settlement in
// the same pre and post checks, so a misbehaving venue cannot slip past them.

mod aggregator;
mod concentrated;
mod constant_product;
mod curve;
mod direct;
mod weighted;

pub use aggregator::{AggregatorAdapter, AggregatorBackend, AggregatorCall, AggregatorReceipt, SimulatedAggregator};
pub use concentrated::{ConcentratedAdapter, FEE_TIER_DENOMINATOR};
pub use constant_product::{amount_in_for, amount_out_for, ConstantProductAdapter};
pub use curve::{CurveAdapter, CurvePool};
pub use direct::DirectTransferAdapter;
pub use weighted::{WeightedAdapter, WeightedPool};

use crate::codec::CodecRegistry;
use crate::error::RoutingError;
use crate::ledger::Ledger;
use crate::path::Path;
use crate::types::{AccountId, Amount, Asset, Timestamp, VenueId};
use crate::venue::{check_capability, Capability, VenueRegistry, VenueType};
use std::collections::HashMap;

/// Everything a venue needs to settle one exact-input swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub venue: VenueId,
    pub token_in: Asset,
    pub token_out: Asset,
    pub amount_in: Amount,
    pub min_out: Amount,
    pub payer: AccountId,
    pub recipient: AccountId,
    pub deadline: Timestamp,
    pub now: Timestamp,
    /// Native value sent along with the call. Must cover `amount_in` when
    /// `token_in` is native; anything above that is refunded.
    pub attached_value: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapOutcome {
    pub consumed_in: Amount,
    pub produced_out: Amount,
    pub value_refund: Amount,
}

// one hop priced against a specific reserve account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HopQuote {
    pub pool: AccountId,
    pub amount: Amount,
}

pub trait VenueAdapter: Send + Sync {
    fn venue_type(&self) -> VenueType;

    /// Whether `quote_in` is exact. Non-invertible venues return an estimate
    /// and the executor refines it by bisection.
    fn is_invertible(&self) -> bool {
        true
    }

    /// Per-hop amounts `[amount_in, hop1_out, ..., amount_out]`.
    fn quote_out(&self, ledger: &Ledger, venue: VenueId, path: &Path, amount_in: Amount) -> Result<Vec<Amount>, RoutingError>;

    /// Per-hop amounts `[amount_in, ..., amount_out]` needed to receive `amount_out`.
    fn quote_in(&self, ledger: &Ledger, venue: VenueId, path: &Path, amount_out: Amount) -> Result<Vec<Amount>, RoutingError>;

    /// Moves funds for an already validated request and returns the output the
    /// venue claims to have delivered to `request.recipient`.
    fn settle(&self, ledger: &mut Ledger, request: &SwapRequest, path: &Path) -> Result<Amount, RoutingError>;

    fn swap_exact(&self, ledger: &mut Ledger, request: &SwapRequest, path: &Path) -> Result<SwapOutcome, RoutingError> {
        if request.now > request.deadline {
            return Err(RoutingError::Expired {
                deadline: request.deadline,
                now: request.now,
            });
        }
        path.check_endpoints(request.token_in, request.token_out)?;
        if request.amount_in == 0 {
            return Err(RoutingError::SwapDidNotOccur);
        }

        let value_refund = if request.token_in.is_native() {
            request
                .attached_value
                .checked_sub(request.amount_in)
                .ok_or(RoutingError::InsufficientValue {
                    required: request.amount_in,
                    attached: request.attached_value,
                })?
        } else {
            request.attached_value
        };

        let before = ledger.balance(request.recipient, request.token_out);
        let reported = self.settle(ledger, request, path)?;
        let mut after = ledger.balance(request.recipient, request.token_out);
        // a payer that is also the recipient of the same asset saw its input leave
        if request.recipient == request.payer && request.token_in == request.token_out {
            after = after.saturating_add(request.amount_in);
        }
        let observed = after.saturating_sub(before);

        if reported == 0 || observed == 0 {
            return Err(RoutingError::SwapDidNotOccur);
        }
        if observed != reported {
            return Err(RoutingError::TransferAmountMismatch { reported, observed });
        }
        if reported < request.min_out {
            return Err(RoutingError::SlippageToleranceExceeded {
                min_out: request.min_out,
                actual: reported,
            });
        }

        Ok(SwapOutcome {
            consumed_in: request.amount_in,
            produced_out: reported,
            value_refund,
        })
    }
}

// walks the path forward, pricing each hop on current reserves
pub(crate) fn quote_hops_out<F>(path: &Path, amount_in: Amount, mut hop: F) -> Result<Vec<Amount>, RoutingError>
where
    F: FnMut(usize, Asset, Asset, Amount) -> Result<HopQuote, RoutingError>,
{
    let mut amounts = Vec::with_capacity(path.assets.len());
    amounts.push(amount_in);
    let mut amount = amount_in;
    for (i, (asset_in, asset_out)) in path.hops_iter().enumerate() {
        amount = hop(i, asset_in, asset_out, amount)?.amount;
        amounts.push(amount);
    }
    Ok(amounts)
}

// walks the path backwards from the desired output
pub(crate) fn quote_hops_in<F>(path: &Path, amount_out: Amount, mut hop: F) -> Result<Vec<Amount>, RoutingError>
where
    F: FnMut(usize, Asset, Asset, Amount) -> Result<HopQuote, RoutingError>,
{
    let pairs: Vec<(Asset, Asset)> = path.hops_iter().collect();
    let mut amounts = vec![0; pairs.len() + 1];
    amounts[pairs.len()] = amount_out;
    let mut amount = amount_out;
    for (i, (asset_in, asset_out)) in pairs.iter().enumerate().rev() {
        amount = hop(i, *asset_in, *asset_out, amount)?.amount;
        amounts[i] = amount;
    }
    Ok(amounts)
}

/// Hop-by-hop settlement against pool reserve accounts. Each hop is priced on the
/// reserves as they stand after the previous hop, so a path that revisits a pool
/// settles at the right price. Intermediate assets pass through the payer.
pub(crate) fn settle_hops<F>(ledger: &mut Ledger, request: &SwapRequest, path: &Path, hop: F) -> Result<Amount, RoutingError>
where
    F: Fn(&Ledger, usize, Asset, Asset, Amount) -> Result<HopQuote, RoutingError>,
{
    let last = path.hop_count().saturating_sub(1);
    let mut amount = request.amount_in;
    for (i, (asset_in, asset_out)) in path.hops_iter().enumerate() {
        let quote = hop(ledger, i, asset_in, asset_out, amount)?;
        ledger.safe_transfer(request.payer, quote.pool, asset_in, amount)?;
        let to = if i == last { request.recipient } else { request.payer };
        ledger.safe_transfer(quote.pool, to, asset_out, quote.amount)?;
        amount = quote.amount;
    }
    Ok(amount)
}

/// Payload-level facade: resolves the venue through the registry, decodes the
/// payload with the venue type's codec and dispatches to that type's adapter.
pub struct AdapterSet {
    registry: Box<dyn VenueRegistry>,
    codecs: CodecRegistry,
    adapters: HashMap<VenueType, Box<dyn VenueAdapter>>,
}

impl AdapterSet {
    pub fn new(registry: Box<dyn VenueRegistry>, codecs: CodecRegistry) -> Self {
        Self {
            registry,
            codecs,
            adapters: HashMap::new(),
        }
    }

    pub fn with_adapter(mut self, adapter: Box<dyn VenueAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn register(&mut self, adapter: Box<dyn VenueAdapter>) {
        self.adapters.insert(adapter.venue_type(), adapter);
    }

    pub fn registry(&self) -> &dyn VenueRegistry {
        self.registry.as_ref()
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn adapter(&self, venue_type: VenueType) -> Result<&dyn VenueAdapter, RoutingError> {
        self.adapters
            .get(&venue_type)
            .map(|a| a.as_ref())
            .ok_or(RoutingError::UnknownVenueType(venue_type))
    }

    /// Checks `venue` for `capability` and decodes its payload.
    pub fn resolve(&self, venue: VenueId, capability: Capability, payload: &[u8]) -> Result<(&dyn VenueAdapter, Path), RoutingError> {
        let venue_type = check_capability(self.registry.as_ref(), venue, capability)?;
        let adapter = self.adapter(venue_type)?;
        let path = self.codecs.decode(payload, venue_type)?;
        Ok((adapter, path))
    }

    /// Like [`resolve`](Self::resolve), and the decoded path must run from
    /// `pair.0` to `pair.1`.
    pub fn resolve_leg(&self, venue: VenueId, capability: Capability, payload: &[u8], pair: (Asset, Asset)) -> Result<(&dyn VenueAdapter, Path), RoutingError> {
        let (adapter, path) = self.resolve(venue, capability, payload)?;
        path.check_endpoints(pair.0, pair.1)?;
        Ok((adapter, path))
    }

    pub fn quote_out(&self, ledger: &Ledger, venue: VenueId, payload: &[u8], pair: (Asset, Asset), amount_in: Amount) -> Result<Vec<Amount>, RoutingError> {
        let (adapter, path) = self.resolve_leg(venue, Capability::QuoteOut, payload, pair)?;
        adapter.quote_out(ledger, venue, &path, amount_in)
    }

    pub fn quote_in(&self, ledger: &Ledger, venue: VenueId, payload: &[u8], pair: (Asset, Asset), amount_out: Amount) -> Result<Vec<Amount>, RoutingError> {
        let (adapter, path) = self.resolve_leg(venue, Capability::QuoteIn, payload, pair)?;
        adapter.quote_in(ledger, venue, &path, amount_out)
    }

    pub fn swap_exact(&self, ledger: &mut Ledger, request: &SwapRequest, payload: &[u8]) -> Result<SwapOutcome, RoutingError> {
        let (adapter, path) = self.resolve(request.venue, Capability::SwapExact, payload)?;
        let outcome = adapter.swap_exact(ledger, request, &path)?;
        tracing::info!(
            venue = %request.venue,
            venue_type = ?adapter.venue_type(),
            amount_in = %outcome.consumed_in,
            amount_out = %outcome.produced_out,
            "swap settled"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&VenueType> = self.adapters.keys().collect();
        types.sort();
        f.debug_struct("AdapterSet")
            .field("codecs", &self.codecs)
            .field("adapters", &types)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::StaticVenueRegistry;

    const TRADER: AccountId = AccountId(10);
    const POOL: AccountId = AccountId(100);

    fn asset(n: u64) -> Asset {
        Asset::from_low_u64(n)
    }

    fn venue() -> VenueId {
        VenueId::from_low_u64(1)
    }

    fn setup() -> (AdapterSet, Ledger) {
        let registry = StaticVenueRegistry::new().with_venue(venue(), VenueType::SimpleConstantProduct);
        let mut cp = ConstantProductAdapter::new();
        cp.register_pool(venue(), asset(1), asset(2), POOL, 30);
        let set = AdapterSet::new(Box::new(registry), CodecRegistry::standard()).with_adapter(Box::new(cp));
        let ledger = Ledger::new()
            .with_balance(POOL, asset(1), 1_000_000)
            .and_then(|l| l.with_balance(POOL, asset(2), 1_000_000))
            .and_then(|l| l.with_balance(TRADER, asset(1), 10_000))
            .unwrap();
        (set, ledger)
    }

    fn request(amount_in: Amount) -> SwapRequest {
        SwapRequest {
            venue: venue(),
            token_in: asset(1),
            token_out: asset(2),
            amount_in,
            min_out: 0,
            payer: TRADER,
            recipient: TRADER,
            deadline: Timestamp::from_millis(1_000),
            now: Timestamp::from_millis(500),
            attached_value: 0,
        }
    }

    fn payload(set: &AdapterSet) -> Vec<u8> {
        set.codecs()
            .encode(&Path::constant_product(vec![asset(1), asset(2)]))
            .unwrap()
    }

    #[test]
    fn swap_matches_quote() {
        let (set, mut ledger) = setup();
        let payload = payload(&set);
        let quote = set.quote_out(&ledger, venue(), &payload, (asset(1), asset(2)), 1_000).unwrap();
        let outcome = set.swap_exact(&mut ledger, &request(1_000), &payload).unwrap();
        assert_eq!(outcome.produced_out, quote[1]);
        assert_eq!(ledger.balance(TRADER, asset(2)), quote[1]);
        assert_eq!(ledger.balance(TRADER, asset(1)), 9_000);
    }

    #[test]
    fn expired_before_any_transfer() {
        let (set, mut ledger) = setup();
        let payload = payload(&set);
        let before = ledger.clone();
        let mut req = request(1_000);
        req.now = Timestamp::from_millis(1_001);
        assert!(matches!(
            set.swap_exact(&mut ledger, &req, &payload),
            Err(RoutingError::Expired { .. })
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn min_out_enforced() {
        let (set, mut ledger) = setup();
        let payload = payload(&set);
        let mut req = request(1_000);
        req.min_out = 1_000;
        assert!(matches!(
            set.swap_exact(&mut ledger, &req, &payload),
            Err(RoutingError::SlippageToleranceExceeded { min_out: 1_000, .. })
        ));
    }

    #[test]
    fn unknown_venue_fails_closed() {
        let (set, ledger) = setup();
        let payload = payload(&set);
        let stranger = VenueId::from_low_u64(77);
        assert_eq!(
            set.quote_out(&ledger, stranger, &payload, (asset(1), asset(2)), 1),
            Err(RoutingError::AddressNotSupported(stranger))
        );
    }

    #[test]
    fn missing_adapter_is_unknown_venue_type() {
        let registry = StaticVenueRegistry::new().with_venue(venue(), VenueType::WeightedPoolStyle);
        let set = AdapterSet::new(Box::new(registry), CodecRegistry::standard());
        assert_eq!(
            set.quote_out(&Ledger::new(), venue(), &[], (asset(1), asset(2)), 1).err(),
            Some(RoutingError::UnknownVenueType(VenueType::WeightedPoolStyle))
        );
    }
}
