// 8.3 engine/reverse.rs: exact-output quoting. the output target is split by
// shares like an input would be, then each chain is walked from its last route
// back to the source asset. invertible venues answer directly, the rest are
// searched by bounded bisection around their own estimate.

use super::core::SwapExecutor;
use super::forward::Plan;
use super::results::{Convergence, ReverseQuote};
use crate::error::RoutingError;
use crate::math::{from_decimal, to_decimal, Rounding};
use crate::route::{distribute, MegaRoute, NodeId, RouteArena, RouteNode};
use crate::types::{Amount, Asset, VenueId};
use crate::venue::Capability;

fn malformed_tree() -> RoutingError {
    RoutingError::ParamsLengthMismatch { expected: 1, actual: 0 }
}

/// Smallest input in `(lo, hi]` for which `forward` yields at least `target`.
///
/// `hi` always satisfies the target once the search starts; a forward error at a
/// trial quote counts as too little output. When the window cannot be shown to hold
/// the answer, or iterations run out, the result is flagged `NotConverged`.
pub fn bisect<F>(target: Amount, mut lo: Amount, mut hi: Amount, max_iterations: u32, mut forward: F) -> ReverseQuote
where
    F: FnMut(Amount) -> Result<Amount, RoutingError>,
{
    let reaches = |out: Result<Amount, RoutingError>| matches!(out, Ok(v) if v >= target);

    if !reaches(forward(hi)) {
        return ReverseQuote {
            amount_in: hi,
            convergence: Convergence::NotConverged,
        };
    }
    if reaches(forward(lo)) {
        // the answer may sit below the window
        return ReverseQuote {
            amount_in: lo,
            convergence: Convergence::NotConverged,
        };
    }

    let mut iterations = 0;
    while hi - lo > 1 {
        if iterations >= max_iterations {
            return ReverseQuote {
                amount_in: hi,
                convergence: Convergence::NotConverged,
            };
        }
        let mid = lo + (hi - lo) / 2;
        if reaches(forward(mid)) {
            hi = mid;
        } else {
            lo = mid;
        }
        iterations += 1;
    }
    ReverseQuote {
        amount_in: hi,
        convergence: Convergence::Converged,
    }
}

impl SwapExecutor {
    /// Input needed to receive `amount_out` through the tree on current reserves.
    pub fn quote_mega_in(&self, token_in: Asset, token_out: Asset, amount_out: Amount, mega_routes: &[MegaRoute]) -> Result<ReverseQuote, RoutingError> {
        let arena = match self.plan(token_in, token_out, mega_routes)? {
            Plan::Passthrough => {
                return Ok(ReverseQuote {
                    amount_in: amount_out,
                    convergence: Convergence::Converged,
                })
            }
            Plan::Routes(arena) => arena,
        };

        let roots = arena.roots();
        let targets = distribute(amount_out, &arena.shares_of(roots))?;
        let mut total: Amount = 0;
        let mut convergence = Convergence::Converged;

        for (root, target) in roots.iter().zip(targets) {
            if target == 0 {
                continue;
            }
            let Some(RouteNode::Mega { routes, .. }) = arena.node(*root) else {
                return Err(malformed_tree());
            };
            // (from, to, paths) per route, source first
            let mut hops = Vec::with_capacity(routes.len());
            let mut from = token_in;
            for route in routes {
                let Some(RouteNode::Route { to, paths }) = arena.node(*route) else {
                    return Err(malformed_tree());
                };
                hops.push((from, *to, paths));
                from = *to;
            }

            let mut needed = target;
            for (from, to, paths) in hops.into_iter().rev() {
                let quote = self.quote_route_in(&arena, (from, to), paths, needed)?;
                if !quote.is_exact() {
                    convergence = Convergence::NotConverged;
                }
                needed = quote.amount_in;
            }
            total = total
                .checked_add(needed)
                .ok_or(RoutingError::ArithmeticOverflow("reverse total"))?;
        }

        tracing::debug!(%token_in, %token_out, %amount_out, amount_in = %total, ?convergence, "reverse quote");
        Ok(ReverseQuote {
            amount_in: total,
            convergence,
        })
    }

    fn quote_route_in(&self, arena: &RouteArena, pair: (Asset, Asset), paths: &[NodeId], amount_out: Amount) -> Result<ReverseQuote, RoutingError> {
        let targets = distribute(amount_out, &arena.shares_of(paths))?;
        let mut needed: Amount = 0;
        let mut convergence = Convergence::Converged;
        for (id, target) in paths.iter().zip(targets) {
            if target == 0 {
                continue;
            }
            let Some(RouteNode::Path(leg)) = arena.node(*id) else {
                return Err(malformed_tree());
            };
            let quote = self.quote_leg_in(leg.venue, &leg.payload, pair, target)?;
            if !quote.is_exact() {
                convergence = Convergence::NotConverged;
            }
            needed = needed
                .checked_add(quote.amount_in)
                .ok_or(RoutingError::ArithmeticOverflow("route reverse total"))?;
        }
        Ok(ReverseQuote {
            amount_in: needed,
            convergence,
        })
    }

    fn quote_leg_in(&self, venue: VenueId, payload: &[u8], pair: (Asset, Asset), amount_out: Amount) -> Result<ReverseQuote, RoutingError> {
        let (adapter, path) = self.adapters.resolve_leg(venue, Capability::QuoteIn, payload, pair)?;
        let estimate = adapter
            .quote_in(&self.ledger, venue, &path, amount_out)?
            .first()
            .copied()
            .ok_or(RoutingError::ParamsLengthMismatch { expected: 1, actual: 0 })?;
        if adapter.is_invertible() {
            return Ok(ReverseQuote {
                amount_in: estimate,
                convergence: Convergence::Converged,
            });
        }

        let (forward, forward_path) = self.adapters.resolve_leg(venue, Capability::QuoteOut, payload, pair)?;
        let search = &self.config.routing.reverse;
        let estimate = to_decimal(estimate)?;
        let scaled = |factor| {
            estimate
                .checked_mul(factor)
                .ok_or(RoutingError::ArithmeticOverflow("bisection window"))
        };
        let lo = from_decimal(scaled(search.lower_factor)?, Rounding::Down)?;
        let hi = from_decimal(scaled(search.upper_factor)?, Rounding::Up)?;

        let quote = bisect(amount_out, lo, hi, search.max_iterations, |amount_in| {
            if amount_in == 0 {
                return Ok(0);
            }
            let amounts = forward.quote_out(&self.ledger, venue, &forward_path, amount_in)?;
            Ok(amounts.last().copied().unwrap_or(0))
        });
        if !quote.is_exact() {
            tracing::warn!(%venue, %amount_out, amount_in = %quote.amount_in, "bisection did not converge");
        }
        Ok(quote)
    }
}
