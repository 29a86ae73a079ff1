// 3.0 venue.rs: venue kinds and the registry that maps venue addresses to them.
// the registry is injected into the executor, never global, so tests swap in fakes.

use crate::error::RoutingError;
use crate::types::VenueId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// one codec and one adapter call shape per variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueType {
    SimpleConstantProduct,
    ConcentratedLiquidityVariantA,
    ConcentratedLiquidityVariantB,
    CurveStyleInvariant,
    WeightedPoolStyle,
    PeerAggregatorPayload,
    DirectTransferOnly,
}

impl VenueType {
    pub const ALL: [VenueType; 7] = [
        VenueType::SimpleConstantProduct,
        VenueType::ConcentratedLiquidityVariantA,
        VenueType::ConcentratedLiquidityVariantB,
        VenueType::CurveStyleInvariant,
        VenueType::WeightedPoolStyle,
        VenueType::PeerAggregatorPayload,
        VenueType::DirectTransferOnly,
    ];

    // direct transfers carry an opaque payload, everything else is a hop list
    pub fn requires_hops(&self) -> bool {
        !matches!(self, VenueType::DirectTransferOnly)
    }

    pub fn is_concentrated(&self) -> bool {
        matches!(
            self,
            VenueType::ConcentratedLiquidityVariantA | VenueType::ConcentratedLiquidityVariantB
        )
    }
}

// 3.1: what the engine may ask of a venue. checked before every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    QuoteOut,
    QuoteIn,
    SwapExact,
}

pub trait VenueRegistry: Send + Sync {
    fn venue_type(&self, venue: VenueId) -> Option<VenueType>;

    fn venues_of_type(&self, venue_type: VenueType) -> Vec<VenueId>;

    fn supports(&self, venue: VenueId, capability: Capability) -> bool;
}

/// Resolves a venue for a capability. Fails closed: an unknown venue or a failed
/// check is `AddressNotSupported`.
pub fn check_capability(
    registry: &dyn VenueRegistry,
    venue: VenueId,
    capability: Capability,
) -> Result<VenueType, RoutingError> {
    let venue_type = registry
        .venue_type(venue)
        .ok_or(RoutingError::AddressNotSupported(venue))?;
    if !registry.supports(venue, capability) {
        tracing::warn!(%venue, ?capability, "venue failed capability check");
        return Err(RoutingError::AddressNotSupported(venue));
    }
    Ok(venue_type)
}

// 3.2: in-memory registry. read-mostly, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticVenueRegistry {
    venues: HashMap<VenueId, VenueType>,
    disabled: HashSet<(VenueId, Capability)>,
}

impl StaticVenueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, venue: VenueId, venue_type: VenueType) {
        self.venues.insert(venue, venue_type);
    }

    pub fn with_venue(mut self, venue: VenueId, venue_type: VenueType) -> Self {
        self.register(venue, venue_type);
        self
    }

    // marks a capability as failing its check, e.g. a venue paused for swaps
    pub fn disable(&mut self, venue: VenueId, capability: Capability) {
        self.disabled.insert((venue, capability));
    }

    pub fn enable(&mut self, venue: VenueId, capability: Capability) {
        self.disabled.remove(&(venue, capability));
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}

impl VenueRegistry for StaticVenueRegistry {
    fn venue_type(&self, venue: VenueId) -> Option<VenueType> {
        self.venues.get(&venue).copied()
    }

    fn venues_of_type(&self, venue_type: VenueType) -> Vec<VenueId> {
        let mut out: Vec<VenueId> = self
            .venues
            .iter()
            .filter(|(_, t)| **t == venue_type)
            .map(|(v, _)| *v)
            .collect();
        out.sort();
        out
    }

    fn supports(&self, venue: VenueId, capability: Capability) -> bool {
        self.venues.contains_key(&venue) && !self.disabled.contains(&(venue, capability))
    }
}
