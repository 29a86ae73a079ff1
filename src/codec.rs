//! Per-venue path codecs.
//!
//! Each [`VenueType`] has one binary layout. The [`CodecRegistry`] maps a venue type
//! to an `(encode, decode)` function pair so new venues register without touching the
//! router. All integers are big-endian.
//!
//! | venue type | layout |
//! |---|---|
//! | constant product, aggregator | `u32 n`, `n × asset` |
//! | concentrated A/B | `asset fee(3) asset fee(3) … asset` |
//! | curve | `u32 n`, `n × asset`, `u32 m`, `m × pool(32)` |
//! | weighted | `u32 n`, `n × asset`, `u32 m`, `m × pool(32)`, `u32 l`, `l × i128` |
//! | direct transfer | raw bytes |

use crate::error::RoutingError;
use crate::path::{HopData, Path};
use crate::types::{Asset, PoolId, ADDRESS_LEN, POOL_ID_LEN};
use crate::venue::VenueType;
use std::collections::HashMap;

pub type EncodeFn = fn(&Path) -> Result<Vec<u8>, RoutingError>;
pub type DecodeFn = fn(VenueType, &[u8]) -> Result<Path, RoutingError>;

const FEE_LEN: usize = 3;
const LIMIT_LEN: usize = 16;
const COUNT_LEN: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct CodecEntry {
    pub encode: EncodeFn,
    pub decode: DecodeFn,
}

#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    entries: HashMap<VenueType, CodecEntry>,
}

impl CodecRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with a codec for every built-in venue type.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        let asset_list = CodecEntry {
            encode: encode_asset_list,
            decode: decode_asset_list,
        };
        let packed = CodecEntry {
            encode: encode_packed_fee_path,
            decode: decode_packed_fee_path,
        };
        registry.register(VenueType::SimpleConstantProduct, asset_list);
        registry.register(VenueType::PeerAggregatorPayload, asset_list);
        registry.register(VenueType::ConcentratedLiquidityVariantA, packed);
        registry.register(VenueType::ConcentratedLiquidityVariantB, packed);
        registry.register(
            VenueType::CurveStyleInvariant,
            CodecEntry {
                encode: encode_curve,
                decode: decode_curve,
            },
        );
        registry.register(
            VenueType::WeightedPoolStyle,
            CodecEntry {
                encode: encode_weighted,
                decode: decode_weighted,
            },
        );
        registry.register(
            VenueType::DirectTransferOnly,
            CodecEntry {
                encode: encode_direct,
                decode: decode_direct,
            },
        );
        registry
    }

    pub fn register(&mut self, venue_type: VenueType, entry: CodecEntry) {
        self.entries.insert(venue_type, entry);
    }

    pub fn unregister(&mut self, venue_type: VenueType) {
        self.entries.remove(&venue_type);
    }

    fn entry(&self, venue_type: VenueType) -> Result<&CodecEntry, RoutingError> {
        self.entries
            .get(&venue_type)
            .ok_or(RoutingError::UnknownVenueType(venue_type))
    }

    pub fn encode(&self, path: &Path) -> Result<Vec<u8>, RoutingError> {
        path.validate()?;
        (self.entry(path.venue_type)?.encode)(path)
    }

    pub fn decode(&self, payload: &[u8], venue_type: VenueType) -> Result<Path, RoutingError> {
        let path = (self.entry(venue_type)?.decode)(venue_type, payload)?;
        path.validate()?;
        Ok(path)
    }
}

// -- writers ---------------------------------------------------------------

fn count_u32(n: usize) -> Result<[u8; COUNT_LEN], RoutingError> {
    u32::try_from(n)
        .map(u32::to_be_bytes)
        .map_err(|_| RoutingError::ArithmeticOverflow("element count exceeds u32"))
}

fn write_assets(out: &mut Vec<u8>, assets: &[Asset]) -> Result<(), RoutingError> {
    out.extend_from_slice(&count_u32(assets.len())?);
    for asset in assets {
        out.extend_from_slice(asset.as_bytes());
    }
    Ok(())
}

fn write_pools(out: &mut Vec<u8>, pools: &[PoolId]) -> Result<(), RoutingError> {
    out.extend_from_slice(&count_u32(pools.len())?);
    for pool in pools {
        out.extend_from_slice(&pool.0);
    }
    Ok(())
}

fn mismatched(venue_type: VenueType) -> RoutingError {
    RoutingError::MalformedPayload {
        venue_type,
        reason: "hop data does not match venue type",
    }
}

fn encode_asset_list(path: &Path) -> Result<Vec<u8>, RoutingError> {
    let mut out = Vec::with_capacity(COUNT_LEN + path.assets.len() * ADDRESS_LEN);
    write_assets(&mut out, &path.assets)?;
    Ok(out)
}

fn encode_packed_fee_path(path: &Path) -> Result<Vec<u8>, RoutingError> {
    let HopData::FeeTiers(tiers) = &path.hops else {
        return Err(mismatched(path.venue_type));
    };
    let mut out = Vec::with_capacity(path.assets.len() * ADDRESS_LEN + tiers.len() * FEE_LEN);
    for (i, asset) in path.assets.iter().enumerate() {
        out.extend_from_slice(asset.as_bytes());
        if let Some(fee) = tiers.get(i) {
            // lower three bytes of the big-endian u32
            out.extend_from_slice(&fee.to_be_bytes()[1..]);
        }
    }
    Ok(out)
}

fn encode_curve(path: &Path) -> Result<Vec<u8>, RoutingError> {
    let HopData::Pools(pools) = &path.hops else {
        return Err(mismatched(path.venue_type));
    };
    let mut out = Vec::new();
    write_assets(&mut out, &path.assets)?;
    write_pools(&mut out, pools)?;
    Ok(out)
}

fn encode_weighted(path: &Path) -> Result<Vec<u8>, RoutingError> {
    let HopData::Weighted { pool_ids, limits } = &path.hops else {
        return Err(mismatched(path.venue_type));
    };
    let mut out = Vec::new();
    write_assets(&mut out, &path.assets)?;
    write_pools(&mut out, pool_ids)?;
    out.extend_from_slice(&count_u32(limits.len())?);
    for limit in limits {
        out.extend_from_slice(&limit.to_be_bytes());
    }
    Ok(out)
}

fn encode_direct(path: &Path) -> Result<Vec<u8>, RoutingError> {
    match &path.hops {
        HopData::Opaque(bytes) => Ok(bytes.clone()),
        _ => Err(mismatched(path.venue_type)),
    }
}

// -- readers ---------------------------------------------------------------

struct Reader<'a> {
    venue_type: VenueType,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(venue_type: VenueType, bytes: &'a [u8]) -> Self {
        Self { venue_type, bytes, pos: 0 }
    }

    fn malformed(&self, reason: &'static str) -> RoutingError {
        RoutingError::MalformedPayload {
            venue_type: self.venue_type,
            reason,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], RoutingError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| self.malformed("payload truncated"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn count(&mut self) -> Result<usize, RoutingError> {
        let raw = self.take(COUNT_LEN)?;
        let n = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        Ok(n)
    }

    // rejects counts that cannot possibly fit before allocating
    fn bounded_count(&mut self, element_len: usize) -> Result<usize, RoutingError> {
        let n = self.count()?;
        let remaining = self.bytes.len() - self.pos;
        if n.saturating_mul(element_len) > remaining {
            return Err(self.malformed("element count exceeds payload"));
        }
        Ok(n)
    }

    fn asset(&mut self) -> Result<Asset, RoutingError> {
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(self.take(ADDRESS_LEN)?);
        Ok(Asset(out))
    }

    fn assets(&mut self) -> Result<Vec<Asset>, RoutingError> {
        let n = self.bounded_count(ADDRESS_LEN)?;
        (0..n).map(|_| self.asset()).collect()
    }

    fn pools(&mut self) -> Result<Vec<PoolId>, RoutingError> {
        let n = self.bounded_count(POOL_ID_LEN)?;
        (0..n)
            .map(|_| {
                let mut out = [0u8; POOL_ID_LEN];
                out.copy_from_slice(self.take(POOL_ID_LEN)?);
                Ok(PoolId(out))
            })
            .collect()
    }

    fn limits(&mut self) -> Result<Vec<i128>, RoutingError> {
        let n = self.bounded_count(LIMIT_LEN)?;
        (0..n)
            .map(|_| {
                let mut out = [0u8; LIMIT_LEN];
                out.copy_from_slice(self.take(LIMIT_LEN)?);
                Ok(i128::from_be_bytes(out))
            })
            .collect()
    }

    fn finish(&self) -> Result<(), RoutingError> {
        if self.pos == self.bytes.len() {
            Ok(())
        } else {
            Err(self.malformed("trailing bytes after path"))
        }
    }
}

fn decode_asset_list(venue_type: VenueType, payload: &[u8]) -> Result<Path, RoutingError> {
    let mut reader = Reader::new(venue_type, payload);
    let assets = reader.assets()?;
    reader.finish()?;
    Ok(Path {
        venue_type,
        assets,
        hops: HopData::None,
    })
}

fn decode_packed_fee_path(venue_type: VenueType, payload: &[u8]) -> Result<Path, RoutingError> {
    let stride = ADDRESS_LEN + FEE_LEN;
    if payload.len() < ADDRESS_LEN || (payload.len() - ADDRESS_LEN) % stride != 0 {
        return Err(RoutingError::MalformedPayload {
            venue_type,
            reason: "packed path length is not asset + k * (fee + asset)",
        });
    }
    let hops = (payload.len() - ADDRESS_LEN) / stride;
    let mut reader = Reader::new(venue_type, payload);
    let mut assets = Vec::with_capacity(hops + 1);
    let mut tiers = Vec::with_capacity(hops);
    assets.push(reader.asset()?);
    for _ in 0..hops {
        let fee = reader.take(FEE_LEN)?;
        tiers.push(u32::from_be_bytes([0, fee[0], fee[1], fee[2]]));
        assets.push(reader.asset()?);
    }
    reader.finish()?;
    Ok(Path {
        venue_type,
        assets,
        hops: HopData::FeeTiers(tiers),
    })
}

fn decode_curve(venue_type: VenueType, payload: &[u8]) -> Result<Path, RoutingError> {
    let mut reader = Reader::new(venue_type, payload);
    let assets = reader.assets()?;
    let pools = reader.pools()?;
    reader.finish()?;
    Ok(Path {
        venue_type,
        assets,
        hops: HopData::Pools(pools),
    })
}

fn decode_weighted(venue_type: VenueType, payload: &[u8]) -> Result<Path, RoutingError> {
    let mut reader = Reader::new(venue_type, payload);
    let assets = reader.assets()?;
    let pool_ids = reader.pools()?;
    let limits = reader.limits()?;
    reader.finish()?;
    Ok(Path {
        venue_type,
        assets,
        hops: HopData::Weighted { pool_ids, limits },
    })
}

fn decode_direct(venue_type: VenueType, payload: &[u8]) -> Result<Path, RoutingError> {
    Ok(Path {
        venue_type,
        assets: Vec::new(),
        hops: HopData::Opaque(payload.to_vec()),
    })
}
