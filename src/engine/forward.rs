// 8.2 engine/forward.rs: exact-input execution and quoting over the route tree.
// input is split pro rata across mega routes, each mega route runs its chain of
// routes in order, and every route splits its amount across parallel paths.

use super::core::SwapExecutor;
use super::results::{LegReport, SwapParams, SwapResult};
use crate::adapters::{AdapterSet, SwapRequest};
use crate::error::RoutingError;
use crate::events::{ConversionSettledEvent, EventPayload, LegExecutedEvent, OracleCheckedEvent};
use crate::ledger::Ledger;
use crate::route::{distribute, MegaRoute, NodeId, Route, RouteArena, RouteNode};
use crate::types::{AccountId, Amount, Asset, Timestamp};

/// What a call resolves to once the identity rules and tree checks have run.
#[derive(Debug)]
pub(super) enum Plan {
    Passthrough,
    Routes(RouteArena),
}

fn malformed_tree() -> RoutingError {
    RoutingError::ParamsLengthMismatch { expected: 1, actual: 0 }
}

fn check_count(max: usize, actual: usize) -> Result<(), RoutingError> {
    if actual > max {
        return Err(RoutingError::ParamsLengthMismatch { expected: max, actual });
    }
    Ok(())
}

impl SwapExecutor {
    pub(super) fn plan(&self, token_in: Asset, token_out: Asset, mega_routes: &[MegaRoute]) -> Result<Plan, RoutingError> {
        if mega_routes.is_empty() {
            if token_in == token_out && self.config.routing.allow_identity_passthrough {
                return Ok(Plan::Passthrough);
            }
            return Err(RoutingError::SharesMustBePositive);
        }
        if token_in == token_out {
            return Err(RoutingError::IdenticalAssets);
        }

        let limits = &self.config.routing.limits;
        check_count(limits.max_mega_routes, mega_routes.len())?;
        for mega in mega_routes {
            check_count(limits.max_routes_per_mega, mega.routes.len())?;
            for route in &mega.routes {
                check_count(limits.max_paths_per_route, route.paths.len())?;
            }
        }

        let arena = RouteArena::from_mega_routes(mega_routes);
        arena.validate(token_out)?;
        Ok(Plan::Routes(arena))
    }

    /// Single chain of routes, the whole input through one path tree.
    pub fn multi_swap(&mut self, params: &SwapParams, routes: &[Route]) -> Result<SwapResult, RoutingError> {
        if routes.is_empty() {
            return self.mega_swap(params, &[]);
        }
        self.mega_swap(params, &[MegaRoute::new(1, routes.to_vec())])
    }

    /// Executes a conversion across the weighted route tree, all or nothing.
    ///
    /// Funds move payer -> executor -> venues -> executor -> recipient. Any failing
    /// leg, a total under `min_out` or an oracle rejection rolls every transfer back.
    pub fn mega_swap(&mut self, params: &SwapParams, mega_routes: &[MegaRoute]) -> Result<SwapResult, RoutingError> {
        match self.try_mega_swap(params, mega_routes) {
            Ok(result) => Ok(result),
            Err(err) => {
                self.record_failure(params.token_in, params.token_out, params.amount_in, &err);
                Err(err)
            }
        }
    }

    fn try_mega_swap(&mut self, params: &SwapParams, mega_routes: &[MegaRoute]) -> Result<SwapResult, RoutingError> {
        let now = self.current_time;
        if now > params.deadline {
            return Err(RoutingError::Expired {
                deadline: params.deadline,
                now,
            });
        }
        let plan = self.plan(params.token_in, params.token_out, mega_routes)?;

        let value_refund = if params.token_in.is_native() {
            params
                .attached_value
                .checked_sub(params.amount_in)
                .ok_or(RoutingError::InsufficientValue {
                    required: params.amount_in,
                    attached: params.attached_value,
                })?
        } else {
            params.attached_value
        };

        let arena = match plan {
            Plan::Passthrough => return self.identity_passthrough(params, value_refund),
            Plan::Routes(arena) => arena,
        };

        let intermediary = self.config.intermediary;
        let adapters = &self.adapters;
        let resolver = self.resolver.as_ref();
        let guard = self.guard;

        let (legs, amount_out, implied_out) = self.ledger.atomic(|ledger| {
            // attached value travels with the call; a native input is paid out of it
            if params.attached_value > 0 {
                ledger.safe_transfer(params.payer, intermediary, Asset::NATIVE, params.attached_value)?;
            }
            if !params.token_in.is_native() {
                ledger.safe_transfer(params.payer, intermediary, params.token_in, params.amount_in)?;
            }

            let mut walk = Walk {
                adapters,
                arena: &arena,
                params,
                intermediary,
                now,
                legs: Vec::new(),
            };
            let total = walk.run(ledger)?;

            if total == 0 {
                return Err(RoutingError::SwapDidNotOccur);
            }
            if total < params.min_out {
                return Err(RoutingError::SlippageToleranceExceeded {
                    min_out: params.min_out,
                    actual: total,
                });
            }
            let implied = match &params.oracle {
                Some(check) => Some(guard.verify(resolver, params.token_in, params.token_out, params.amount_in, total, check)?),
                None => None,
            };

            ledger.safe_transfer(intermediary, params.payer, Asset::NATIVE, value_refund)?;
            ledger.safe_transfer(intermediary, params.recipient, params.token_out, total)?;
            Ok((walk.legs, total, implied))
        })?;

        for leg in &legs {
            self.emit_event(EventPayload::LegExecuted(LegExecutedEvent {
                venue: leg.venue,
                venue_type: leg.venue_type,
                token_in: leg.token_in,
                token_out: leg.token_out,
                amount_in: leg.amount_in,
                amount_out: leg.amount_out,
            }));
        }
        if let Some(implied) = implied_out {
            self.emit_event(EventPayload::OracleChecked(OracleCheckedEvent {
                token_in: params.token_in,
                token_out: params.token_out,
                realized: amount_out,
                implied,
            }));
        }
        self.emit_event(EventPayload::ConversionSettled(ConversionSettledEvent {
            token_in: params.token_in,
            token_out: params.token_out,
            amount_in: params.amount_in,
            amount_out,
            legs: legs.len(),
        }));
        tracing::info!(
            token_in = %params.token_in,
            token_out = %params.token_out,
            amount_in = %params.amount_in,
            %amount_out,
            legs = legs.len(),
            "conversion settled"
        );

        Ok(SwapResult {
            amount_in: params.amount_in,
            amount_out,
            value_refund,
            legs,
            implied_out,
        })
    }

    fn identity_passthrough(&mut self, params: &SwapParams, value_refund: Amount) -> Result<SwapResult, RoutingError> {
        self.ledger
            .atomic(|l| l.safe_transfer(params.payer, params.recipient, params.token_in, params.amount_in))?;
        self.emit_event(EventPayload::IdentityPassthrough {
            asset: params.token_in,
            amount: params.amount_in,
        });
        tracing::debug!(asset = %params.token_in, amount = %params.amount_in, "identity passthrough");
        Ok(SwapResult {
            amount_in: params.amount_in,
            amount_out: params.amount_in,
            value_refund,
            legs: Vec::new(),
            implied_out: None,
        })
    }

    /// Forward quote of a mega swap on current reserves. Changes nothing.
    pub fn quote_mega_out(&self, token_in: Asset, token_out: Asset, amount_in: Amount, mega_routes: &[MegaRoute]) -> Result<Amount, RoutingError> {
        let arena = match self.plan(token_in, token_out, mega_routes)? {
            Plan::Passthrough => return Ok(amount_in),
            Plan::Routes(arena) => arena,
        };
        let roots = arena.roots();
        let parts = distribute(amount_in, &arena.shares_of(roots))?;
        let mut total: Amount = 0;
        for (root, part) in roots.iter().zip(parts) {
            if part == 0 {
                continue;
            }
            let Some(RouteNode::Mega { routes, .. }) = arena.node(*root) else {
                return Err(malformed_tree());
            };
            let mut asset = token_in;
            let mut amount = part;
            for route in routes {
                let Some(RouteNode::Route { to, paths }) = arena.node(*route) else {
                    return Err(malformed_tree());
                };
                amount = self.quote_route_out(&arena, (asset, *to), paths, amount)?;
                asset = *to;
            }
            debug_assert_eq!(asset, token_out);
            total = total
                .checked_add(amount)
                .ok_or(RoutingError::ArithmeticOverflow("quote total"))?;
        }
        Ok(total)
    }

    fn quote_route_out(&self, arena: &RouteArena, pair: (Asset, Asset), paths: &[NodeId], amount: Amount) -> Result<Amount, RoutingError> {
        let parts = distribute(amount, &arena.shares_of(paths))?;
        let mut out: Amount = 0;
        for (id, part) in paths.iter().zip(parts) {
            if part == 0 {
                continue;
            }
            let Some(RouteNode::Path(leg)) = arena.node(*id) else {
                return Err(malformed_tree());
            };
            let amounts = self.adapters.quote_out(&self.ledger, leg.venue, &leg.payload, pair, part)?;
            let leg_out = amounts.last().copied().unwrap_or(0);
            out = out
                .checked_add(leg_out)
                .ok_or(RoutingError::ArithmeticOverflow("route quote"))?;
        }
        Ok(out)
    }
}

// one execution pass over the arena, collecting leg reports as it goes
struct Walk<'a> {
    adapters: &'a AdapterSet,
    arena: &'a RouteArena,
    params: &'a SwapParams,
    intermediary: AccountId,
    now: Timestamp,
    legs: Vec<LegReport>,
}

impl<'a> Walk<'a> {
    fn run(&mut self, ledger: &mut Ledger) -> Result<Amount, RoutingError> {
        let arena = self.arena;
        let roots = arena.roots();
        let parts = distribute(self.params.amount_in, &arena.shares_of(roots))?;
        let mut total: Amount = 0;
        for (root, part) in roots.iter().zip(parts) {
            if part == 0 {
                continue;
            }
            let out = self.run_chain(ledger, *root, part)?;
            total = total
                .checked_add(out)
                .ok_or(RoutingError::ArithmeticOverflow("mega total"))?;
        }
        Ok(total)
    }

    fn run_chain(&mut self, ledger: &mut Ledger, mega: NodeId, amount: Amount) -> Result<Amount, RoutingError> {
        let arena = self.arena;
        let Some(RouteNode::Mega { routes, .. }) = arena.node(mega) else {
            return Err(malformed_tree());
        };
        let mut asset = self.params.token_in;
        let mut amount = amount;
        for route in routes {
            let Some(RouteNode::Route { to, paths }) = arena.node(*route) else {
                return Err(malformed_tree());
            };
            amount = self.run_route(ledger, asset, *to, paths, amount)?;
            asset = *to;
        }
        Ok(amount)
    }

    fn run_route(&mut self, ledger: &mut Ledger, from: Asset, to: Asset, paths: &[NodeId], amount: Amount) -> Result<Amount, RoutingError> {
        let arena = self.arena;
        let parts = distribute(amount, &arena.shares_of(paths))?;
        let mut out: Amount = 0;
        for (id, part) in paths.iter().zip(parts) {
            if part == 0 {
                continue;
            }
            let Some(RouteNode::Path(leg)) = arena.node(*id) else {
                return Err(malformed_tree());
            };
            let request = SwapRequest {
                venue: leg.venue,
                token_in: from,
                token_out: to,
                amount_in: part,
                min_out: 0,
                payer: self.intermediary,
                recipient: self.intermediary,
                deadline: self.params.deadline,
                now: self.now,
                attached_value: if from.is_native() { part } else { 0 },
            };
            let outcome = self.adapters.swap_exact(ledger, &request, &leg.payload)?;
            let venue_type = self
                .adapters
                .registry()
                .venue_type(leg.venue)
                .ok_or(RoutingError::AddressNotSupported(leg.venue))?;
            tracing::debug!(
                node = id.0,
                venue = %leg.venue,
                ?venue_type,
                amount_in = %part,
                amount_out = %outcome.produced_out,
                "leg executed"
            );
            self.legs.push(LegReport {
                node: *id,
                venue: leg.venue,
                venue_type,
                token_in: from,
                token_out: to,
                amount_in: outcome.consumed_in,
                amount_out: outcome.produced_out,
            });
            out = out
                .checked_add(outcome.produced_out)
                .ok_or(RoutingError::ArithmeticOverflow("route total"))?;
        }
        Ok(out)
    }
}
