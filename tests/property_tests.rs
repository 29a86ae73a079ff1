//! Property-based tests for the routing math.
//!
//! These tests verify invariants hold under random inputs.

use proptest::prelude::*;
use routing_core::adapters::{amount_out_for, ConcentratedAdapter, ConstantProductAdapter, WeightedAdapter, WeightedPool};
use routing_core::risk_metrics::{liquidation_price, liquidation_price_by_order};
use routing_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const TRADER: AccountId = AccountId(10);
const POOL_AB: AccountId = AccountId(100);
const POOL_BC: AccountId = AccountId(101);

fn asset(n: u64) -> Asset {
    Asset::from_low_u64(n)
}

fn venue() -> VenueId {
    VenueId::from_low_u64(1)
}

fn cp_adapters() -> AdapterSet {
    let registry = StaticVenueRegistry::new().with_venue(venue(), VenueType::SimpleConstantProduct);
    let mut cp = ConstantProductAdapter::new();
    cp.register_pool(venue(), asset(1), asset(2), POOL_AB, 30);
    cp.register_pool(venue(), asset(2), asset(3), POOL_BC, 30);
    AdapterSet::new(Box::new(registry), CodecRegistry::standard()).with_adapter(Box::new(cp))
}

// Strategies for generating test data
fn amount_strategy() -> impl Strategy<Value = Amount> {
    1u128..=1_000_000_000_000_000_000_000_000u128 // 1 to 10^24
}

fn shares_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..1_000, 1..8)
}

fn reserve_strategy() -> impl Strategy<Value = Amount> {
    1_000_000u128..1_000_000_000_000_000u128
}

fn path_for(venue_type: VenueType, assets: Vec<Asset>, seeds: &[u64], limits: &[i128], bytes: Vec<u8>) -> Path {
    let hops = assets.len() - 1;
    let pools = || seeds[..hops].iter().map(|s| PoolId::from_low_u64(*s)).collect::<Vec<_>>();
    match venue_type {
        VenueType::SimpleConstantProduct => Path::constant_product(assets),
        VenueType::PeerAggregatorPayload => Path::aggregator(assets),
        VenueType::ConcentratedLiquidityVariantA | VenueType::ConcentratedLiquidityVariantB => {
            let tiers = seeds[..hops].iter().map(|s| (*s as u32) & path::MAX_FEE_TIER).collect();
            Path::concentrated(venue_type, assets, tiers)
        }
        VenueType::CurveStyleInvariant => Path::curve(assets, pools()),
        VenueType::WeightedPoolStyle => Path {
            venue_type,
            hops: HopData::Weighted {
                pool_ids: pools(),
                limits: limits[..assets.len()].to_vec(),
            },
            assets,
        },
        VenueType::DirectTransferOnly => Path::direct(bytes),
    }
}

fn risk_bucket(fee_buffer: Decimal, pair_price_drop: Decimal) -> BucketSnapshot {
    BucketSnapshot::new(asset(1), 6, fee_buffer).with_asset(asset(2), 18, pair_price_drop)
}

// 10 units of the position asset against 15_000 units of debt
fn fraction_with(bucket: &BucketSnapshot, buffers: &SafetyBuffers) -> Decimal {
    risk_metrics::liquidation_price_fraction(bucket, Some(asset(2)), 10 * 10u128.pow(18), 15_000 * 10u128.pow(6), buffers).unwrap()
}

fn fraction_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..5_000).prop_map(|n| Decimal::new(n, 4)) // [0, 0.5)
}

fn bump_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..4_000).prop_map(|n| Decimal::new(n, 4))
}

proptest! {
    /// Parts always add back up to the whole amount
    #[test]
    fn distribution_is_exact(amount in amount_strategy(), shares in shares_strategy()) {
        let total: u64 = shares.iter().sum();
        prop_assume!(total > 0);

        let parts = distribute(amount, &shares).unwrap();
        prop_assert_eq!(parts.len(), shares.len());
        prop_assert_eq!(parts.iter().sum::<Amount>(), amount);

        let last_nonzero = shares.iter().rposition(|s| *s > 0).unwrap();
        for (i, (part, share)) in parts.iter().zip(&shares).enumerate() {
            if *share == 0 {
                prop_assert_eq!(*part, 0);
            } else if i != last_nonzero {
                let exact = amount * u128::from(*share) / u128::from(total);
                prop_assert_eq!(*part, exact);
            }
        }
    }

    /// All-zero shares are rejected rather than dividing by zero
    #[test]
    fn zero_shares_rejected(amount in amount_strategy(), len in 1usize..8) {
        let shares = vec![0u64; len];
        prop_assert_eq!(distribute(amount, &shares), Err(RoutingError::SharesMustBePositive));
    }

    /// Every codec decodes to exactly the path it encoded, duplicate neighbours included
    #[test]
    fn every_codec_round_trips(
        venue_type in prop::sample::select(VenueType::ALL.to_vec()),
        mut ids in prop::collection::vec(1u64..4, 2..6),
        dup in any::<prop::sample::Index>(),
        seeds in prop::collection::vec(any::<u64>(), 6),
        limits in prop::collection::vec(any::<i128>(), 7),
        bytes in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let at = dup.index(ids.len());
        ids.insert(at, ids[at]);
        let assets: Vec<Asset> = ids.iter().map(|n| asset(*n)).collect();
        let path = path_for(venue_type, assets, &seeds, &limits, bytes);

        let codecs = CodecRegistry::standard();
        let payload = codecs.encode(&path).unwrap();
        prop_assert_eq!(codecs.decode(&payload, venue_type).unwrap(), path);
    }

    /// A two-hop path prices exactly like its hops chained by hand, and settles at the quote
    #[test]
    fn multi_hop_matches_chained_hops(
        reserve_a in reserve_strategy(),
        reserve_b in reserve_strategy(),
        reserve_c in reserve_strategy(),
        amount_in in 1u128..1_000_000_000_000u128,
    ) {
        let adapters = cp_adapters();
        let mut ledger = Ledger::new()
            .with_balance(TRADER, asset(1), amount_in).unwrap()
            .with_balance(POOL_AB, asset(1), reserve_a).unwrap()
            .with_balance(POOL_AB, asset(2), reserve_b).unwrap()
            .with_balance(POOL_BC, asset(2), reserve_b).unwrap()
            .with_balance(POOL_BC, asset(3), reserve_c).unwrap();

        let first = amount_out_for(reserve_a, reserve_b, amount_in, 30, 10_000).unwrap();
        let expected = amount_out_for(reserve_b, reserve_c, first, 30, 10_000).unwrap();

        let payload = adapters.codecs().encode(&Path::constant_product(vec![asset(1), asset(2), asset(3)])).unwrap();
        let quoted = adapters.quote_out(&ledger, venue(), &payload, (asset(1), asset(3)), amount_in).unwrap();
        prop_assert_eq!(quoted.clone(), vec![amount_in, first, expected]);

        prop_assume!(expected > 0);
        let request = SwapRequest {
            venue: venue(),
            token_in: asset(1),
            token_out: asset(3),
            amount_in,
            min_out: expected,
            payer: TRADER,
            recipient: TRADER,
            deadline: Timestamp::MAX,
            now: Timestamp::from_millis(0),
            attached_value: 0,
        };
        let outcome = adapters.swap_exact(&mut ledger, &request, &payload).unwrap();
        prop_assert_eq!(outcome.produced_out, expected);
        prop_assert_eq!(ledger.balance(TRADER, asset(3)), expected);
        prop_assert_eq!(ledger.balance(POOL_AB, asset(1)), reserve_a + amount_in);
    }

    /// More debt against the same collateral liquidates at a higher price
    #[test]
    fn liquidation_price_monotone_in_debt(
        position in 1u128..1_000_000_000_000_000_000_000u128,
        borrowed in 1u128..1_000_000_000_000u128,
        extra in 1u128..1_000_000_000u128,
    ) {
        let bucket = BucketSnapshot::new(asset(1), 6, dec!(1.0005)).with_asset(asset(2), 18, dec!(0.1));
        let buffers = SafetyBuffers::default();

        let low = liquidation_price(&bucket, Some(asset(2)), position, borrowed, &buffers).unwrap();
        let high = liquidation_price(&bucket, Some(asset(2)), position, borrowed + extra, &buffers).unwrap();
        prop_assert!(high >= low);
    }

    /// Higher leverage on the same limit price moves the liquidation price up
    #[test]
    fn liquidation_price_monotone_in_leverage(
        price in 1i64..10_000_000i64,
        low in 1u32..50,
        step in 1u32..50,
    ) {
        let bucket = BucketSnapshot::new(asset(1), 6, dec!(1.0005)).with_asset(asset(2), 18, dec!(0.1));
        let buffers = SafetyBuffers::default();
        let limit = Price::new_unchecked(Decimal::new(price, 2));
        let lev_low = Leverage::new(Decimal::from(low)).unwrap();
        let lev_high = Leverage::new(Decimal::from(low + step)).unwrap();

        let a = liquidation_price_by_order(&bucket, Some(asset(2)), limit, lev_low, &buffers).unwrap();
        let b = liquidation_price_by_order(&bucket, Some(asset(2)), limit, lev_high, &buffers).unwrap();
        prop_assert!(b >= a);
    }

    /// A larger fee buffer raises the liquidation price
    #[test]
    fn liquidation_price_rises_with_fee_buffer(extra in (0i64..10_000), bump in bump_strategy()) {
        let buffers = SafetyBuffers::default();
        let fee_buffer = Decimal::ONE + Decimal::new(extra, 4);
        let low = fraction_with(&risk_bucket(fee_buffer, dec!(0.1)), &buffers);
        let high = fraction_with(&risk_bucket(fee_buffer + bump, dec!(0.1)), &buffers);
        prop_assert!(high > low);
    }

    /// A larger security buffer raises the liquidation price
    #[test]
    fn liquidation_price_rises_with_security_buffer(base in fraction_strategy(), bump in bump_strategy()) {
        let bucket = risk_bucket(dec!(1.0005), dec!(0.1));
        let low = SafetyBuffers { security_buffer: base, ..SafetyBuffers::default() };
        let high = SafetyBuffers { security_buffer: base + bump, ..low };
        prop_assert!(fraction_with(&bucket, &high) > fraction_with(&bucket, &low));
    }

    /// A wider oracle band raises the liquidation price
    #[test]
    fn liquidation_price_rises_with_oracle_limit(base in fraction_strategy(), bump in bump_strategy()) {
        let bucket = risk_bucket(dec!(1.0005), dec!(0.1));
        let low = SafetyBuffers { oracle_tolerable_limit: base, ..SafetyBuffers::default() };
        let high = SafetyBuffers { oracle_tolerable_limit: base + bump, ..low };
        prop_assert!(fraction_with(&bucket, &high) > fraction_with(&bucket, &low));
    }

    /// A larger expected pair drop raises the liquidation price, for positions and orders
    #[test]
    fn liquidation_price_rises_with_pair_price_drop(base in fraction_strategy(), bump in bump_strategy()) {
        let buffers = SafetyBuffers::default();
        let low = risk_bucket(dec!(1.0005), base);
        let high = risk_bucket(dec!(1.0005), base + bump);
        prop_assert!(fraction_with(&high, &buffers) > fraction_with(&low, &buffers));

        let limit = Price::new_unchecked(dec!(2000));
        let leverage = Leverage::new(dec!(3)).unwrap();
        let order_low = risk_metrics::liquidation_price_by_order_fraction(&low, Some(asset(2)), limit, leverage, &buffers).unwrap();
        let order_high = risk_metrics::liquidation_price_by_order_fraction(&high, Some(asset(2)), limit, leverage, &buffers).unwrap();
        prop_assert!(order_high > order_low);
    }

    /// Reverse quote on a weighted pool is the minimal input, to the unit
    #[test]
    fn weighted_reverse_quote_is_minimal(
        reserve_in in 1_000_000u128..1_000_000_000_000_000_000_000_000u128,
        reserve_out in 1_000_000u128..1_000_000_000_000_000_000_000_000u128,
        weight_in in prop::sample::select(vec![dec!(0.2), dec!(0.5), dec!(0.8)]),
        fraction in 1u128..500,
    ) {
        let amount_out = (reserve_out * fraction / 1_000).max(1);
        let pool_id = PoolId::from_low_u64(9);

        let registry = StaticVenueRegistry::new().with_venue(venue(), VenueType::WeightedPoolStyle);
        let mut weighted = WeightedAdapter::new();
        weighted.register_pool(pool_id, WeightedPool {
            venue: venue(),
            account: POOL_AB,
            weights: vec![(asset(1), weight_in), (asset(2), Decimal::ONE - weight_in)],
            fee_bps: 30,
        });
        let adapters = AdapterSet::new(Box::new(registry), CodecRegistry::standard()).with_adapter(Box::new(weighted));
        let ledger = Ledger::new()
            .with_balance(POOL_AB, asset(1), reserve_in).unwrap()
            .with_balance(POOL_AB, asset(2), reserve_out).unwrap();
        let executor = SwapExecutor::new(RoutingConfig::default(), adapters, Box::new(StaticPriceResolver::new()))
            .unwrap()
            .with_ledger(ledger);
        let payload = executor
            .adapters()
            .codecs()
            .encode(&Path::weighted(vec![asset(1), asset(2)], vec![pool_id]))
            .unwrap();
        let routes = vec![MegaRoute::new(1, vec![Route::new(asset(2)).with_path(venue(), 1, payload)])];

        // deep inverse powers can leave the decimal range; those are reported, never wrong
        let quote = match executor.quote_mega_in(asset(1), asset(2), amount_out, &routes) {
            Ok(quote) => quote,
            Err(RoutingError::ArithmeticOverflow(_)) => return Ok(()),
            Err(other) => return Err(TestCaseError::fail(format!("unexpected error {other:?}"))),
        };
        prop_assert!(quote.is_exact());
        prop_assert!(executor.quote_mega_out(asset(1), asset(2), quote.amount_in, &routes).unwrap() >= amount_out);
        prop_assert!(executor.quote_mega_out(asset(1), asset(2), quote.amount_in - 1, &routes).unwrap() < amount_out);
    }

    /// Reverse quote on an invertible venue is the minimal input, to the unit
    #[test]
    fn reverse_quote_is_minimal(
        reserve_out in 1_000_000u128..1_000_000_000_000_000u128,
        fraction in 1u128..500,
    ) {
        let reserve_in = reserve_out * 4;
        let amount_out = (reserve_out * fraction / 1_000).max(1);

        let registry = StaticVenueRegistry::new().with_venue(venue(), VenueType::ConcentratedLiquidityVariantA);
        let mut cl = ConcentratedAdapter::new(VenueType::ConcentratedLiquidityVariantA);
        cl.register_pool(venue(), asset(1), asset(2), 3_000, POOL_AB);
        let adapters = AdapterSet::new(Box::new(registry), CodecRegistry::standard()).with_adapter(Box::new(cl));
        let ledger = Ledger::new()
            .with_balance(POOL_AB, asset(1), reserve_in).unwrap()
            .with_balance(POOL_AB, asset(2), reserve_out).unwrap();

        let executor = SwapExecutor::new(RoutingConfig::default(), adapters, Box::new(StaticPriceResolver::new()))
            .unwrap()
            .with_ledger(ledger);
        let payload = executor
            .adapters()
            .codecs()
            .encode(&Path::concentrated(VenueType::ConcentratedLiquidityVariantA, vec![asset(1), asset(2)], vec![3_000]))
            .unwrap();
        let routes = vec![MegaRoute::new(1, vec![Route::new(asset(2)).with_path(venue(), 1, payload)])];

        let quote = executor.quote_mega_in(asset(1), asset(2), amount_out, &routes).unwrap();
        prop_assert!(quote.is_exact());

        let enough = executor.quote_mega_out(asset(1), asset(2), quote.amount_in, &routes).unwrap();
        prop_assert!(enough >= amount_out);
        let short = executor.quote_mega_out(asset(1), asset(2), quote.amount_in - 1, &routes).unwrap();
        prop_assert!(short < amount_out);
    }
}
