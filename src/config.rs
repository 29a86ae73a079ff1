// 7.0 config.rs: every routing knob in one place. oracle band, reverse-mode
// search bounds, tree size limits, risk buffers.
// 7.1 presets per environment, validated before the executor accepts them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::risk_metrics::SafetyBuffers;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    // Empty route list with token_in == token_out returns amount_in untouched
    pub allow_identity_passthrough: bool,
    pub reverse: ReverseSearchConfig,
    pub limits: TreeLimits,
    // safety.oracle_tolerable_limit is also the oracle guard's band width
    pub safety: SafetyBuffers,
    // Deadline the executor hands out for calls that don't pick their own
    pub default_deadline_ms: i64,
}

/** 7.2: bisection for venues without an exact inverse */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseSearchConfig {
    pub max_iterations: u32,
    // Search window as multiples of the venue's own estimate
    pub lower_factor: Decimal,
    pub upper_factor: Decimal,
}

impl Default for ReverseSearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            lower_factor: Decimal::new(5, 1), // 0.5x
            upper_factor: Decimal::new(15, 1), // 1.5x
        }
    }
}

/** 7.3: caps on route tree size, checked before execution */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeLimits {
    pub max_mega_routes: usize,
    pub max_routes_per_mega: usize,
    pub max_paths_per_route: usize,
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self {
            max_mega_routes: 16,
            max_routes_per_mega: 8,
            max_paths_per_route: 16,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            allow_identity_passthrough: true,
            reverse: ReverseSearchConfig::default(),
            limits: TreeLimits::default(),
            safety: SafetyBuffers::default(),
            default_deadline_ms: 120_000,
        }
    }
}

impl RoutingConfig {
    pub fn testnet() -> Self {
        let mut config = Self::default().with_oracle_tolerable_limit(Decimal::new(5, 2)); // 5%, thin testnet liquidity
        config.default_deadline_ms = 600_000;
        config
    }

    // Tight band, strict identity handling, smaller trees
    pub fn mainnet_conservative() -> Self {
        let mut config = Self::default().with_oracle_tolerable_limit(Decimal::new(5, 3)); // 0.5%
        config.allow_identity_passthrough = false;
        config.limits.max_mega_routes = 8;
        config.reverse.max_iterations = 128;
        config.safety.security_buffer = Decimal::new(1, 1); // 10%
        config
    }

    /// Full width of the oracle acceptance band (0.01 = +-0.5% around implied).
    /// The same value haircuts collateral in the liquidation price.
    pub fn oracle_tolerable_limit(&self) -> Decimal {
        self.safety.oracle_tolerable_limit
    }

    pub fn with_oracle_tolerable_limit(mut self, limit: Decimal) -> Self {
        self.safety.oracle_tolerable_limit = limit;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limit = self.oracle_tolerable_limit();
        if limit < Decimal::ZERO || limit >= Decimal::ONE {
            return Err(ConfigError::InvalidOracle {
                reason: "tolerable limit must be in [0, 1)".to_string(),
            });
        }

        if self.reverse.max_iterations == 0 {
            return Err(ConfigError::InvalidReverseSearch {
                reason: "need at least one bisection step".to_string(),
            });
        }
        if self.reverse.lower_factor <= Decimal::ZERO
            || self.reverse.lower_factor >= Decimal::ONE
            || self.reverse.upper_factor <= Decimal::ONE
        {
            return Err(ConfigError::InvalidReverseSearch {
                reason: "window must straddle the estimate: 0 < lower < 1 < upper".to_string(),
            });
        }

        if self.limits.max_mega_routes == 0 || self.limits.max_routes_per_mega == 0 || self.limits.max_paths_per_route == 0 {
            return Err(ConfigError::InvalidLimits {
                reason: "tree limits must be positive".to_string(),
            });
        }

        let buffers = [
            ("security_buffer", self.safety.security_buffer),
            ("close_fee_rate", self.safety.close_fee_rate),
        ];
        for (name, value) in buffers {
            if value < Decimal::ZERO || value >= Decimal::ONE {
                return Err(ConfigError::InvalidRisk {
                    reason: format!("{name} must be in [0, 1)"),
                });
            }
        }

        if self.default_deadline_ms <= 0 {
            return Err(ConfigError::InvalidLimits {
                reason: "default deadline must be positive".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid oracle settings: {reason}")]
    InvalidOracle { reason: String },

    #[error("Invalid reverse search settings: {reason}")]
    InvalidReverseSearch { reason: String },

    #[error("Invalid tree limits: {reason}")]
    InvalidLimits { reason: String },

    #[error("Invalid risk buffers: {reason}")]
    InvalidRisk { reason: String },

    #[error("Could not parse config: {0}")]
    Parse(String),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> RoutingConfig {
        match self {
            Environment::Development => RoutingConfig::default(),
            Environment::Testnet => RoutingConfig::testnet(),
            Environment::Mainnet => RoutingConfig::mainnet_conservative(),
        }
    }
}
