// 3.3 path.rs: one ordered hop sequence through a single venue, plus the
// venue-specific data each hop needs (fee tiers, pool ids, limits).

use crate::error::RoutingError;
use crate::types::{Asset, PoolId};
use crate::venue::VenueType;
use serde::{Deserialize, Serialize};

// largest value a 3-byte fee tier field can carry
pub const MAX_FEE_TIER: u32 = (1 << 24) - 1;

// limits[0] sentinel: the venue may pull as much input as the swap needs
pub const UNBOUNDED_LIMIT: i128 = i128::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HopData {
    None,
    FeeTiers(Vec<u32>),
    Pools(Vec<PoolId>),
    Weighted { pool_ids: Vec<PoolId>, limits: Vec<i128> },
    Opaque(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub venue_type: VenueType,
    pub assets: Vec<Asset>,
    pub hops: HopData,
}

impl Path {
    pub fn constant_product(assets: Vec<Asset>) -> Self {
        Self {
            venue_type: VenueType::SimpleConstantProduct,
            assets,
            hops: HopData::None,
        }
    }

    pub fn aggregator(assets: Vec<Asset>) -> Self {
        Self {
            venue_type: VenueType::PeerAggregatorPayload,
            assets,
            hops: HopData::None,
        }
    }

    pub fn concentrated(venue_type: VenueType, assets: Vec<Asset>, fee_tiers: Vec<u32>) -> Self {
        debug_assert!(venue_type.is_concentrated());
        Self {
            venue_type,
            assets,
            hops: HopData::FeeTiers(fee_tiers),
        }
    }

    pub fn curve(assets: Vec<Asset>, pools: Vec<PoolId>) -> Self {
        Self {
            venue_type: VenueType::CurveStyleInvariant,
            assets,
            hops: HopData::Pools(pools),
        }
    }

    /// Weighted path with default limits: `limits[0]` unbounded, the rest zero.
    pub fn weighted(assets: Vec<Asset>, pool_ids: Vec<PoolId>) -> Self {
        let mut limits = vec![0i128; assets.len()];
        if let Some(first) = limits.first_mut() {
            *first = UNBOUNDED_LIMIT;
        }
        Self {
            venue_type: VenueType::WeightedPoolStyle,
            assets,
            hops: HopData::Weighted { pool_ids, limits },
        }
    }

    pub fn direct(payload: Vec<u8>) -> Self {
        Self {
            venue_type: VenueType::DirectTransferOnly,
            assets: Vec::new(),
            hops: HopData::Opaque(payload),
        }
    }

    pub fn first(&self) -> Option<Asset> {
        self.assets.first().copied()
    }

    pub fn last(&self) -> Option<Asset> {
        self.assets.last().copied()
    }

    pub fn hop_count(&self) -> usize {
        self.assets.len().saturating_sub(1)
    }

    // (asset_in, asset_out) for every hop
    pub fn hops_iter(&self) -> impl Iterator<Item = (Asset, Asset)> + '_ {
        self.assets.windows(2).map(|w| (w[0], w[1]))
    }

    /// Structural check: enough assets for the venue kind and hop data whose shape
    /// matches the venue kind and the hop count.
    pub fn validate(&self) -> Result<(), RoutingError> {
        let hops = self.hop_count();
        if self.venue_type.requires_hops() && self.assets.len() < 2 {
            return Err(RoutingError::ParamsLengthMismatch {
                expected: 2,
                actual: self.assets.len(),
            });
        }

        match (self.venue_type, &self.hops) {
            (VenueType::SimpleConstantProduct | VenueType::PeerAggregatorPayload, HopData::None) => Ok(()),
            (t, HopData::FeeTiers(tiers)) if t.is_concentrated() => {
                check_len(hops, tiers.len())?;
                if tiers.iter().any(|fee| *fee > MAX_FEE_TIER) {
                    return Err(RoutingError::MalformedPayload {
                        venue_type: t,
                        reason: "fee tier does not fit in 24 bits",
                    });
                }
                Ok(())
            }
            (VenueType::CurveStyleInvariant, HopData::Pools(pools)) => check_len(hops, pools.len()),
            (VenueType::WeightedPoolStyle, HopData::Weighted { pool_ids, limits }) => {
                check_len(hops, pool_ids.len())?;
                check_len(self.assets.len(), limits.len())
            }
            (VenueType::DirectTransferOnly, HopData::Opaque(_)) => {
                if self.assets.is_empty() {
                    Ok(())
                } else {
                    Err(RoutingError::ParamsLengthMismatch {
                        expected: 0,
                        actual: self.assets.len(),
                    })
                }
            }
            (venue_type, _) => Err(RoutingError::MalformedPayload {
                venue_type,
                reason: "hop data does not match venue type",
            }),
        }
    }

    /// Checks the declared endpoints. Direct transfers move the source asset
    /// unchanged, so their source and destination must coincide.
    pub fn check_endpoints(&self, source: Asset, destination: Asset) -> Result<(), RoutingError> {
        if !self.venue_type.requires_hops() {
            if source != destination {
                return Err(RoutingError::PathEndpointMismatch {
                    expected: destination,
                    actual: source,
                });
            }
            return Ok(());
        }
        match (self.first(), self.last()) {
            (Some(first), _) if first != source => Err(RoutingError::PathEndpointMismatch {
                expected: source,
                actual: first,
            }),
            (_, Some(last)) if last != destination => Err(RoutingError::PathEndpointMismatch {
                expected: destination,
                actual: last,
            }),
            (Some(_), Some(_)) => Ok(()),
            _ => Err(RoutingError::ParamsLengthMismatch {
                expected: 2,
                actual: self.assets.len(),
            }),
        }
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), RoutingError> {
    if expected == actual {
        Ok(())
    } else {
        Err(RoutingError::ParamsLengthMismatch { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(n: u64) -> Asset {
        Asset::from_low_u64(n)
    }

    #[test]
    fn single_asset_path_is_invalid() {
        let path = Path::constant_product(vec![asset(1)]);
        assert!(matches!(path.validate(), Err(RoutingError::ParamsLengthMismatch { .. })));
    }

    #[test]
    fn fee_tiers_must_match_hops() {
        let ok = Path::concentrated(
            VenueType::ConcentratedLiquidityVariantA,
            vec![asset(1), asset(2), asset(3)],
            vec![500, 3000],
        );
        assert!(ok.validate().is_ok());

        let short = Path::concentrated(
            VenueType::ConcentratedLiquidityVariantA,
            vec![asset(1), asset(2), asset(3)],
            vec![500],
        );
        assert_eq!(
            short.validate(),
            Err(RoutingError::ParamsLengthMismatch { expected: 2, actual: 1 })
        );

        let too_wide = Path::concentrated(
            VenueType::ConcentratedLiquidityVariantB,
            vec![asset(1), asset(2)],
            vec![MAX_FEE_TIER + 1],
        );
        assert!(matches!(too_wide.validate(), Err(RoutingError::MalformedPayload { .. })));
    }

    #[test]
    fn weighted_default_limits() {
        let path = Path::weighted(
            vec![asset(1), asset(2), asset(3)],
            vec![PoolId::from_low_u64(1), PoolId::from_low_u64(2)],
        );
        assert!(path.validate().is_ok());
        match &path.hops {
            HopData::Weighted { limits, .. } => assert_eq!(limits, &vec![UNBOUNDED_LIMIT, 0, 0]),
            other => panic!("unexpected hop data {other:?}"),
        }
    }

    #[test]
    fn mismatched_hop_data_rejected() {
        let path = Path {
            venue_type: VenueType::CurveStyleInvariant,
            assets: vec![asset(1), asset(2)],
            hops: HopData::None,
        };
        assert!(matches!(path.validate(), Err(RoutingError::MalformedPayload { .. })));
    }

    #[test]
    fn endpoints_checked() {
        let path = Path::constant_product(vec![asset(1), asset(2), asset(3)]);
        assert!(path.check_endpoints(asset(1), asset(3)).is_ok());
        assert_eq!(
            path.check_endpoints(asset(2), asset(3)),
            Err(RoutingError::PathEndpointMismatch {
                expected: asset(2),
                actual: asset(1)
            })
        );
        assert!(path.check_endpoints(asset(1), asset(2)).is_err());

        let direct = Path::direct(vec![1, 2, 3]);
        assert!(direct.validate().is_ok());
        assert!(direct.check_endpoints(asset(5), asset(5)).is_ok());
        assert!(direct.check_endpoints(asset(5), asset(6)).is_err());
    }

    #[test]
    fn duplicate_consecutive_assets_are_kept() {
        let path = Path::constant_product(vec![asset(1), asset(1), asset(2)]);
        assert!(path.validate().is_ok());
        assert_eq!(path.hop_count(), 2);
        assert_eq!(path.hops_iter().next(), Some((asset(1), asset(1))));
    }
}
