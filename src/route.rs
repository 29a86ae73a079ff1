// 5.0 route.rs: the weighted route tree. callers hand in nested MegaRoute values,
// the executor flattens them into an arena and walks it by NodeId. nothing here
// outlives a single call.

use crate::error::RoutingError;
use crate::math::{mul_div, Rounding};
use crate::types::{Amount, Asset, VenueId};
use serde::{Deserialize, Serialize};

// 5.1: caller-facing input

/// One venue call inside a route, weighted against its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathLeg {
    pub venue: VenueId,
    pub shares: u64,
    /// Venue-specific path encoding, decoded by the venue type's codec.
    pub payload: Vec<u8>,
}

/// Parallel legs that all end in `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub to: Asset,
    pub paths: Vec<PathLeg>,
}

/// A chain of routes. Route k converts route k-1's output into `routes[k].to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MegaRoute {
    pub shares: u64,
    pub routes: Vec<Route>,
}

impl Route {
    pub fn new(to: Asset) -> Self {
        Self { to, paths: Vec::new() }
    }

    pub fn with_path(mut self, venue: VenueId, shares: u64, payload: Vec<u8>) -> Self {
        self.paths.push(PathLeg { venue, shares, payload });
        self
    }
}

impl MegaRoute {
    pub fn new(shares: u64, routes: Vec<Route>) -> Self {
        Self { shares, routes }
    }
}

/// Splits `amount` pro rata across `shares`.
///
/// Each entry gets `floor(amount * share / total)`; the rounding remainder goes to
/// the last entry with a non-zero share, so the parts always sum to `amount`.
/// Zero-share entries get exactly zero.
pub fn distribute(amount: Amount, shares: &[u64]) -> Result<Vec<Amount>, RoutingError> {
    let total: u128 = shares.iter().map(|s| u128::from(*s)).sum();
    if total == 0 {
        return Err(RoutingError::SharesMustBePositive);
    }
    let mut parts = Vec::with_capacity(shares.len());
    let mut assigned: Amount = 0;
    for share in shares {
        let part = mul_div(amount, u128::from(*share), total, Rounding::Down)?;
        assigned += part;
        parts.push(part);
    }
    if let Some(last) = shares.iter().rposition(|s| *s > 0) {
        parts[last] += amount - assigned;
    }
    Ok(parts)
}

// 5.2: arena

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteNode {
    Mega { shares: u64, routes: Vec<NodeId> },
    Route { to: Asset, paths: Vec<NodeId> },
    Path(PathLeg),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteArena {
    nodes: Vec<RouteNode>,
    roots: Vec<NodeId>,
}

impl RouteArena {
    pub fn from_mega_routes(mega_routes: &[MegaRoute]) -> Self {
        let mut arena = Self::default();
        for mega in mega_routes {
            let routes = mega
                .routes
                .iter()
                .map(|route| {
                    let paths = route.paths.iter().map(|leg| arena.push(RouteNode::Path(leg.clone()))).collect();
                    arena.push(RouteNode::Route { to: route.to, paths })
                })
                .collect();
            let root = arena.push(RouteNode::Mega {
                shares: mega.shares,
                routes,
            });
            arena.roots.push(root);
        }
        arena
    }

    fn push(&mut self, node: RouteNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&RouteNode> {
        self.nodes.get(id.0)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // shares of the given children, in order
    pub fn shares_of(&self, ids: &[NodeId]) -> Vec<u64> {
        ids.iter()
            .map(|id| match self.node(*id) {
                Some(RouteNode::Mega { shares, .. }) => *shares,
                Some(RouteNode::Path(leg)) => leg.shares,
                _ => 0,
            })
            .collect()
    }

    /// Structural checks before anything executes: positive share totals at every
    /// level, no empty chains, and every chain ending at `token_out`.
    pub fn validate(&self, token_out: Asset) -> Result<(), RoutingError> {
        if self.shares_of(&self.roots).iter().all(|s| *s == 0) {
            return Err(RoutingError::SharesMustBePositive);
        }
        for root in &self.roots {
            let Some(RouteNode::Mega { routes, shares }) = self.node(*root) else {
                return Err(RoutingError::ParamsLengthMismatch { expected: 1, actual: 0 });
            };
            if *shares == 0 {
                continue;
            }
            let mut last_to = None;
            for id in routes {
                let Some(RouteNode::Route { to, paths }) = self.node(*id) else {
                    return Err(RoutingError::ParamsLengthMismatch { expected: 1, actual: 0 });
                };
                if self.shares_of(paths).iter().all(|s| *s == 0) {
                    return Err(RoutingError::SharesMustBePositive);
                }
                last_to = Some(*to);
            }
            match last_to {
                None => return Err(RoutingError::ParamsLengthMismatch { expected: 1, actual: 0 }),
                Some(to) if to != token_out => {
                    return Err(RoutingError::PathEndpointMismatch {
                        expected: token_out,
                        actual: to,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
