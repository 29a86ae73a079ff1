//! Routing engine simulation.
//!
//! Builds a small market of constant product, concentrated and StableSwap venues
//! on an in-memory ledger, then walks through split routing, multi-hop mega
//! routes, reverse quoting, an oracle rejection and liquidation pricing.
//!
//! Set `RUST_LOG=routing_core=debug` to see every leg.

use routing_core::adapters::{ConcentratedAdapter, ConstantProductAdapter, CurveAdapter, CurvePool};
use routing_core::risk_metrics::{liquidation_price, liquidation_price_by_order};
use routing_core::*;
use rust_decimal_macros::dec;
use std::error::Error;
use tracing_subscriber::EnvFilter;

const TRADER: AccountId = AccountId(10);
const CP_POOL: AccountId = AccountId(100);
const CL_POOL: AccountId = AccountId(101);
const CURVE_POOL: AccountId = AccountId(102);
const STABLE_POOL: AccountId = AccountId(103);

const USDC_UNIT: Amount = 1_000_000;
const WETH_UNIT: Amount = 1_000_000_000_000_000_000;

fn usdc() -> Asset {
    Asset::from_low_u64(1)
}

fn usdt() -> Asset {
    Asset::from_low_u64(2)
}

fn weth() -> Asset {
    Asset::from_low_u64(3)
}

fn cp_venue() -> VenueId {
    VenueId::from_low_u64(1)
}

fn cl_venue() -> VenueId {
    VenueId::from_low_u64(2)
}

fn curve_venue() -> VenueId {
    VenueId::from_low_u64(3)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Routing Engine Simulation");
    println!("Split routes, mega routes, oracle guard, liquidation pricing\n");

    scenario_1_split_route()?;
    scenario_2_mega_route()?;
    scenario_3_reverse_quote()?;
    scenario_4_oracle_rejection()?;
    scenario_5_liquidation_prices()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn build_executor() -> Result<SwapExecutor, Box<dyn Error>> {
    let registry = StaticVenueRegistry::new()
        .with_venue(cp_venue(), VenueType::SimpleConstantProduct)
        .with_venue(cl_venue(), VenueType::ConcentratedLiquidityVariantA)
        .with_venue(curve_venue(), VenueType::CurveStyleInvariant);

    let mut constant_product = ConstantProductAdapter::new();
    constant_product.register_pool(cp_venue(), usdc(), weth(), CP_POOL, 30);
    constant_product.register_pool(cp_venue(), usdt(), weth(), STABLE_POOL, 30);

    let mut concentrated = ConcentratedAdapter::new(VenueType::ConcentratedLiquidityVariantA);
    concentrated.register_pool(cl_venue(), usdc(), weth(), 500, CL_POOL);

    let mut curve = CurveAdapter::new();
    curve.register_pool(
        PoolId::from_low_u64(1),
        CurvePool {
            venue: curve_venue(),
            account: CURVE_POOL,
            coins: [usdc(), usdt()],
            amplification: 200,
            fee_bps: 4,
        },
    );

    let adapters = AdapterSet::new(Box::new(registry), CodecRegistry::standard())
        .with_adapter(Box::new(constant_product))
        .with_adapter(Box::new(concentrated))
        .with_adapter(Box::new(curve));

    let resolver = StaticPriceResolver::new()
        .with_rate(usdc(), weth(), dec!(0.0005))
        .with_rate(usdc(), usdt(), dec!(1));

    let ledger = Ledger::new()
        .with_balance(TRADER, usdc(), 100_000 * USDC_UNIT)?
        .with_balance(CP_POOL, usdc(), 2_000_000 * USDC_UNIT)?
        .with_balance(CP_POOL, weth(), 1_000 * WETH_UNIT)?
        .with_balance(CL_POOL, usdc(), 4_000_000 * USDC_UNIT)?
        .with_balance(CL_POOL, weth(), 2_000 * WETH_UNIT)?
        .with_balance(CURVE_POOL, usdc(), 5_000_000 * USDC_UNIT)?
        .with_balance(CURVE_POOL, usdt(), 5_000_000 * USDC_UNIT)?
        .with_balance(STABLE_POOL, usdt(), 1_000_000 * USDC_UNIT)?
        .with_balance(STABLE_POOL, weth(), 500 * WETH_UNIT)?;

    let mut executor = SwapExecutor::new(Environment::Testnet.config(), adapters, Box::new(resolver))?.with_ledger(ledger);
    executor.set_time(Timestamp::now());
    Ok(executor)
}

fn weth_check() -> OracleCheck {
    OracleCheck {
        descriptor: Vec::new(),
        decimals_in: 6,
        decimals_out: 18,
    }
}

fn direct_usdc_weth_routes(codecs: &CodecRegistry) -> Result<Vec<Route>, RoutingError> {
    let cp_payload = codecs.encode(&Path::constant_product(vec![usdc(), weth()]))?;
    let cl_payload = codecs.encode(&Path::concentrated(
        VenueType::ConcentratedLiquidityVariantA,
        vec![usdc(), weth()],
        vec![500],
    ))?;
    Ok(vec![Route::new(weth())
        .with_path(cp_venue(), 40, cp_payload)
        .with_path(cl_venue(), 60, cl_payload)])
}

fn print_weth(label: &str, amount: Amount) {
    let whole = amount / WETH_UNIT;
    let frac = (amount % WETH_UNIT) / 1_000_000_000_000;
    println!("  {label}: {whole}.{frac:06} WETH");
}

/// One route, input split 40/60 across two venues.
fn scenario_1_split_route() -> Result<(), Box<dyn Error>> {
    println!("Scenario 1: Split Route\n");

    let mut executor = build_executor()?;
    let routes = direct_usdc_weth_routes(executor.adapters().codecs())?;

    let amount_in = 20_000 * USDC_UNIT;
    let quoted = executor.quote_mega_out(usdc(), weth(), amount_in, &[MegaRoute::new(1, routes.clone())])?;
    print_weth("Quoted", quoted);

    let params = SwapParams::new(usdc(), weth(), amount_in, TRADER)
        .with_min_out(quoted)
        .with_deadline(executor.default_deadline())
        .with_oracle(weth_check());
    let result = executor.multi_swap(&params, &routes)?;

    for leg in &result.legs {
        println!("  Leg via {:?}: {} USDC in", leg.venue_type, leg.amount_in / USDC_UNIT);
    }
    print_weth("Received", result.amount_out);
    if let Some(implied) = result.implied_out {
        print_weth("Oracle implied", implied);
    }
    println!();
    Ok(())
}

/// Two chains in parallel: direct to WETH, and through the stable pool first.
fn scenario_2_mega_route() -> Result<(), Box<dyn Error>> {
    println!("Scenario 2: Mega Route\n");

    let mut executor = build_executor()?;
    let codecs = executor.adapters().codecs();
    let direct = direct_usdc_weth_routes(codecs)?;
    let via_stable = vec![
        Route::new(usdt()).with_path(
            curve_venue(),
            1,
            codecs.encode(&Path::curve(vec![usdc(), usdt()], vec![PoolId::NONE]))?,
        ),
        Route::new(weth()).with_path(cp_venue(), 1, codecs.encode(&Path::constant_product(vec![usdt(), weth()]))?),
    ];
    let mega_routes = vec![MegaRoute::new(70, direct), MegaRoute::new(30, via_stable)];

    let params = SwapParams::new(usdc(), weth(), 50_000 * USDC_UNIT, TRADER)
        .with_deadline(executor.default_deadline())
        .with_oracle(weth_check());
    let result = executor.mega_swap(&params, &mega_routes)?;

    println!("  {} legs executed", result.legs.len());
    print_weth("Received", result.amount_out);
    println!("  Events recorded: {}\n", executor.events().len());
    Ok(())
}

/// Exact-output quotes on an invertible and a non-invertible venue.
fn scenario_3_reverse_quote() -> Result<(), Box<dyn Error>> {
    println!("Scenario 3: Reverse Quote\n");

    let executor = build_executor()?;
    let codecs = executor.adapters().codecs();

    let to_weth = vec![MegaRoute::new(1, direct_usdc_weth_routes(codecs)?)];
    let quote = executor.quote_mega_in(usdc(), weth(), 5 * WETH_UNIT, &to_weth)?;
    println!("  5 WETH costs {} USDC, exact: {}", quote.amount_in / USDC_UNIT, quote.is_exact());

    let to_usdt = vec![MegaRoute::new(
        1,
        vec![Route::new(usdt()).with_path(
            curve_venue(),
            1,
            codecs.encode(&Path::curve(vec![usdc(), usdt()], vec![PoolId::from_low_u64(1)]))?,
        )],
    )];
    let quote = executor.quote_mega_in(usdc(), usdt(), 250_000 * USDC_UNIT, &to_usdt)?;
    println!(
        "  250,000 USDT costs {} raw USDC, convergence: {:?}\n",
        quote.amount_in, quote.convergence
    );
    Ok(())
}

/// A mispriced oracle check rolls the whole conversion back.
fn scenario_4_oracle_rejection() -> Result<(), Box<dyn Error>> {
    println!("Scenario 4: Oracle Rejection\n");

    let mut executor = build_executor()?;
    let routes = direct_usdc_weth_routes(executor.adapters().codecs())?;
    let before = executor.balance(TRADER, usdc());

    // off by one decimal: the implied amount is ten times the realized one
    let check = OracleCheck {
        decimals_out: 19,
        ..weth_check()
    };
    let params = SwapParams::new(usdc(), weth(), 10_000 * USDC_UNIT, TRADER).with_oracle(check);
    match executor.multi_swap(&params, &routes) {
        Ok(_) => println!("  Unexpectedly settled"),
        Err(err) => println!("  Rejected ({:?}): {}", err.class(), err),
    }

    let after = executor.balance(TRADER, usdc());
    println!("  Trader USDC before {}, after {}", before / USDC_UNIT, after / USDC_UNIT);
    println!("  Pool WETH untouched: {}\n", executor.balance(CP_POOL, weth()) == 1_000 * WETH_UNIT);
    Ok(())
}

/// Liquidation thresholds for a WETH position financed in USDC.
fn scenario_5_liquidation_prices() -> Result<(), Box<dyn Error>> {
    println!("Scenario 5: Liquidation Prices\n");

    let bucket = BucketSnapshot::new(usdc(), 6, dec!(1.001)).with_asset(weth(), 18, dec!(0.05));
    let buffers = Environment::Mainnet.config().safety;

    for (position, borrowed) in [(10 * WETH_UNIT, 10_000 * USDC_UNIT), (10 * WETH_UNIT, 15_000 * USDC_UNIT)] {
        let price = liquidation_price(&bucket, Some(weth()), position, borrowed, &buffers)?;
        println!(
            "  {} WETH against {} USDC: liquidation at {}.{:06} USDC",
            position / WETH_UNIT,
            borrowed / USDC_UNIT,
            price / USDC_UNIT,
            price % USDC_UNIT
        );
    }

    for leverage in [dec!(2), dec!(5), dec!(10)] {
        let Some(leverage) = Leverage::new(leverage) else {
            continue;
        };
        let price = liquidation_price_by_order(&bucket, Some(weth()), Price::new_unchecked(dec!(2000)), leverage, &buffers)?;
        println!("  Limit order @ 2000, {}: liquidation at {} USDC", leverage, price / USDC_UNIT);
    }
    Ok(())
}
