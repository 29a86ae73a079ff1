// routing-core: routing and pricing engine for a margin protocol.
// converts between assets through heterogeneous venues, splits amounts across a
// weighted route tree and refuses results that stray from the oracle.
// all computation is deterministic and runs on an in-memory ledger.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Asset, VenueId, PoolId, AccountId, Price, Bps
//   1.9  error.rs: RoutingError taxonomy and error classes
//   1.10 math.rs: mul_div, rounding, decimal conversion
//   2.x  ledger.rs: balances, safe transfers, atomic rollback
//   3.x  venue.rs: venue types, capability check, registry
//   3.3  path.rs: hop sequence + per-venue hop data
//   3.4  codec.rs: binary payload layouts per venue type
//   4.x  adapters/: one adapter per venue family behind VenueAdapter
//   5.x  route.rs: MegaRoute / Route / PathLeg tree and the share splitter
//   6.x  oracle.rs: price resolver seam and the consistency band
//   6.5  risk_metrics.rs: liquidation prices for bucket positions
//   7.x  config.rs: routing knobs, env presets, validation
//   8.x  engine/: swap executor, forward and reverse modes
//   11.x events.rs: audit events for every conversion

pub mod adapters;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod math;
pub mod oracle;
pub mod path;
pub mod risk_metrics;
pub mod route;
pub mod types;
pub mod venue;

// re exports for convenience
pub use adapters::{AdapterSet, SwapOutcome, SwapRequest, VenueAdapter};
pub use codec::CodecRegistry;
pub use config::{ConfigError, Environment, ReverseSearchConfig, RoutingConfig, TreeLimits};
pub use engine::*;
pub use error::{ErrorClass, RoutingError};
pub use events::*;
pub use ledger::Ledger;
pub use math::Rounding;
pub use oracle::{OracleCheck, OracleConsistencyGuard, OracleHop, PriceResolver, StaticPriceResolver};
pub use path::{HopData, Path};
pub use risk_metrics::{AllowedAsset, BucketSnapshot, SafetyBuffers};
pub use route::{distribute, MegaRoute, PathLeg, Route};
pub use types::*;
pub use venue::{Capability, StaticVenueRegistry, VenueRegistry, VenueType};
