//! Executor configuration options.

use crate::config::RoutingConfig;
use crate::types::AccountId;

/// Account the executor holds in-flight funds on.
pub const ROUTER_ACCOUNT: AccountId = AccountId(0);

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub routing: RoutingConfig,
    /// Holder of intermediate balances between legs.
    pub intermediary: AccountId,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            intermediary: ROUTER_ACCOUNT,
            max_events: 100_000,
        }
    }
}

impl From<RoutingConfig> for ExecutorConfig {
    fn from(routing: RoutingConfig) -> Self {
        Self {
            routing,
            ..Self::default()
        }
    }
}
