// Oracle consistency
//
// The engine never prices a conversion off the venues alone. After a top-level
// conversion settles, the blended output is compared with an amount implied by an
// independent exchange rate. The rate source is a collaborator behind the
// PriceResolver trait; how it aggregates its own feeds is its business.

use crate::error::RoutingError;
use crate::math::{pow10, to_decimal, from_decimal, Rounding};
use crate::types::{Amount, Asset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One step of an oracle route. Opaque to the engine and forwarded untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleHop {
    pub target: Asset,
    pub source_kind: u8,
    pub payload: Vec<u8>,
}

/// Caller-supplied oracle parameters for one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OracleCheck {
    pub descriptor: Vec<OracleHop>,
    pub decimals_in: u32,
    pub decimals_out: u32,
}

/// Trait for exchange rate sources. Rates are whole units of `to` per whole unit
/// of `from`.
pub trait PriceResolver: Send + Sync {
    fn exchange_rate(&self, from: Asset, to: Asset, descriptor: &[OracleHop]) -> Result<Decimal, RoutingError>;

    fn is_healthy(&self) -> bool {
        true
    }
}

/// Raw output amount implied by `rate`, moved from `decimals_in` to
/// `decimals_out` and rounded down.
pub fn implied_amount(amount_in: Amount, rate: Decimal, decimals_in: u32, decimals_out: u32) -> Result<Amount, RoutingError> {
    if rate <= Decimal::ZERO {
        return Err(RoutingError::ArithmeticOverflow("non-positive oracle rate"));
    }
    let value = if decimals_out >= decimals_in {
        // upscale in integers first so no fraction is dropped
        let scaled = amount_in
            .checked_mul(pow10(decimals_out - decimals_in)?)
            .ok_or(RoutingError::ArithmeticOverflow("implied amount upscale"))?;
        to_decimal(scaled)?.checked_mul(rate)
    } else {
        let divisor = to_decimal(pow10(decimals_in - decimals_out)?)?;
        to_decimal(amount_in)?
            .checked_mul(rate)
            .and_then(|v| v.checked_div(divisor))
    };
    let value = value.ok_or(RoutingError::ArithmeticOverflow("implied amount"))?;
    from_decimal(value, Rounding::Down)
}

/// Accepts a realized amount when it sits inside a band of total width
/// `tolerable_limit` centred on the implied amount:
/// `|realized - implied| / implied <= tolerable_limit / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleConsistencyGuard {
    tolerable_limit: Decimal,
}

impl OracleConsistencyGuard {
    pub fn new(tolerable_limit: Decimal) -> Result<Self, RoutingError> {
        if tolerable_limit < Decimal::ZERO || tolerable_limit >= Decimal::ONE {
            return Err(RoutingError::RiskParameterOutOfRange("oracle_tolerable_limit"));
        }
        Ok(Self { tolerable_limit })
    }

    pub fn tolerable_limit(&self) -> Decimal {
        self.tolerable_limit
    }

    pub fn check(&self, realized: Amount, implied: Amount) -> Result<(), RoutingError> {
        let divergent = RoutingError::DivergentPrice {
            realized,
            implied,
            limit: self.tolerable_limit,
        };
        if implied == 0 {
            return if realized == 0 { Ok(()) } else { Err(divergent) };
        }
        // 2 * |r - i| <= L * i, kept out of division
        let deviation = to_decimal(realized.abs_diff(implied))?
            .checked_mul(Decimal::TWO)
            .ok_or(RoutingError::ArithmeticOverflow("oracle deviation"))?;
        let allowed = to_decimal(implied)?
            .checked_mul(self.tolerable_limit)
            .ok_or(RoutingError::ArithmeticOverflow("oracle band"))?;
        if deviation > allowed {
            tracing::warn!(%realized, %implied, limit = %self.tolerable_limit, "realized amount outside oracle band");
            return Err(divergent);
        }
        Ok(())
    }

    /// Resolves the rate, derives the implied amount and checks `realized` against it.
    /// Returns the implied amount.
    pub fn verify(
        &self,
        resolver: &dyn PriceResolver,
        from: Asset,
        to: Asset,
        amount_in: Amount,
        realized: Amount,
        params: &OracleCheck,
    ) -> Result<Amount, RoutingError> {
        if !resolver.is_healthy() {
            return Err(RoutingError::OracleUnavailable { from, to });
        }
        let rate = resolver.exchange_rate(from, to, &params.descriptor)?;
        let implied = implied_amount(amount_in, rate, params.decimals_in, params.decimals_out)?;
        self.check(realized, implied)?;
        Ok(implied)
    }
}

/// Fixed-rate resolver for tests and simulations. Falls back to the inverse of a
/// reverse quote, then to chaining through the descriptor's targets.
#[derive(Debug, Clone)]
pub struct StaticPriceResolver {
    rates: HashMap<(Asset, Asset), Decimal>,
    healthy: bool,
}

impl Default for StaticPriceResolver {
    fn default() -> Self {
        Self {
            rates: HashMap::new(),
            healthy: true,
        }
    }
}

impl StaticPriceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: Asset, to: Asset, rate: Decimal) -> Self {
        self.set_rate(from, to, rate);
        self
    }

    pub fn set_rate(&mut self, from: Asset, to: Asset, rate: Decimal) {
        self.rates.insert((from, to), rate);
    }

    pub fn set_healthy(&mut self, healthy: bool) {
        self.healthy = healthy;
    }

    fn pair_rate(&self, from: Asset, to: Asset) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        if let Some(rate) = self.rates.get(&(from, to)) {
            return Some(*rate);
        }
        self.rates
            .get(&(to, from))
            .filter(|r| !r.is_zero())
            .and_then(|r| Decimal::ONE.checked_div(*r))
    }
}

impl PriceResolver for StaticPriceResolver {
    fn exchange_rate(&self, from: Asset, to: Asset, descriptor: &[OracleHop]) -> Result<Decimal, RoutingError> {
        let unavailable = RoutingError::OracleUnavailable { from, to };
        if !self.healthy {
            return Err(unavailable);
        }
        if let Some(rate) = self.pair_rate(from, to) {
            return Ok(rate);
        }
        let mut rate = Decimal::ONE;
        let mut current = from;
        for hop in descriptor {
            let step = self.pair_rate(current, hop.target).ok_or(unavailable.clone())?;
            rate = rate.checked_mul(step).ok_or(RoutingError::ArithmeticOverflow("oracle chain"))?;
            current = hop.target;
        }
        if descriptor.is_empty() || current != to {
            return Err(unavailable);
        }
        Ok(rate)
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }
}
