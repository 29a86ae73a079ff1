// 8.0 engine/core.rs: the swap executor. owns the ledger it settles on, the
// adapter set, the price resolver and the audit log. no state survives a call
// except balances and events.

use super::config::ExecutorConfig;
use crate::adapters::AdapterSet;
use crate::config::ConfigError;
use crate::error::RoutingError;
use crate::events::{ConversionFailedEvent, EventId, EventPayload, RoutingEvent};
use crate::ledger::Ledger;
use crate::oracle::{OracleConsistencyGuard, PriceResolver};
use crate::types::{AccountId, Amount, Asset, Timestamp};

/** 8.1: executor struct. all collaborators are injected */
pub struct SwapExecutor {
    pub(super) config: ExecutorConfig,
    pub(super) adapters: AdapterSet,
    pub(super) resolver: Box<dyn PriceResolver>,
    pub(super) guard: OracleConsistencyGuard,
    pub(super) ledger: Ledger,
    pub(super) events: Vec<RoutingEvent>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl SwapExecutor {
    pub fn new(
        config: impl Into<ExecutorConfig>,
        adapters: AdapterSet,
        resolver: Box<dyn PriceResolver>,
    ) -> Result<Self, ConfigError> {
        let config = config.into();
        config.routing.validate()?;
        let guard = OracleConsistencyGuard::new(config.routing.oracle_tolerable_limit()).map_err(|_| {
            ConfigError::InvalidOracle {
                reason: "tolerable limit must be in [0, 1)".to_string(),
            }
        })?;
        Ok(Self {
            config,
            adapters,
            resolver,
            guard,
            ledger: Ledger::new(),
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
        })
    }

    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = self.current_time.plus_millis(millis);
    }

    /// Deadline `default_deadline_ms` past the executor's clock.
    pub fn default_deadline(&self) -> Timestamp {
        self.current_time.plus_millis(self.config.routing.default_deadline_ms)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn adapters(&self) -> &AdapterSet {
        &self.adapters
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn balance(&self, account: AccountId, asset: Asset) -> Amount {
        self.ledger.balance(account, asset)
    }

    pub fn intermediary(&self) -> AccountId {
        self.config.intermediary
    }

    pub fn recent_events(&self, count: usize) -> &[RoutingEvent] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[RoutingEvent] {
        &self.events
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = RoutingEvent::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;
        tracing::trace!(id = event.id.0, payload = ?event.payload, "event");
        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }

    pub(super) fn record_failure(&mut self, token_in: Asset, token_out: Asset, amount_in: Amount, err: &RoutingError) {
        tracing::warn!(%token_in, %token_out, %amount_in, error = %err, "conversion rolled back");
        self.emit_event(EventPayload::ConversionFailed(ConversionFailedEvent {
            token_in,
            token_out,
            amount_in,
            class: err.class().into(),
            reason: err.to_string(),
        }));
    }
}

impl std::fmt::Debug for SwapExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapExecutor")
            .field("config", &self.config)
            .field("adapters", &self.adapters)
            .field("events", &self.events.len())
            .field("current_time", &self.current_time)
            .finish_non_exhaustive()
    }
}
