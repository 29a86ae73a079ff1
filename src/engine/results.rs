// 8.0.2: inputs and outputs of executor calls.

use crate::oracle::OracleCheck;
use crate::route::NodeId;
use crate::types::{AccountId, Amount, Asset, Timestamp, VenueId};
use crate::venue::VenueType;

/// One top-level conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    pub token_in: Asset,
    pub token_out: Asset,
    pub amount_in: Amount,
    pub min_out: Amount,
    pub payer: AccountId,
    pub recipient: AccountId,
    pub deadline: Timestamp,
    pub attached_value: Amount,
    /// Oracle cross-check on the blended result. `None` skips it.
    pub oracle: Option<OracleCheck>,
}

impl SwapParams {
    pub fn new(token_in: Asset, token_out: Asset, amount_in: Amount, payer: AccountId) -> Self {
        Self {
            token_in,
            token_out,
            amount_in,
            min_out: 0,
            payer,
            recipient: payer,
            deadline: Timestamp::MAX,
            attached_value: 0,
            oracle: None,
        }
    }

    pub fn with_min_out(mut self, min_out: Amount) -> Self {
        self.min_out = min_out;
        self
    }

    pub fn with_recipient(mut self, recipient: AccountId) -> Self {
        self.recipient = recipient;
        self
    }

    pub fn with_deadline(mut self, deadline: Timestamp) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_value(mut self, attached_value: Amount) -> Self {
        self.attached_value = attached_value;
        self
    }

    pub fn with_oracle(mut self, oracle: OracleCheck) -> Self {
        self.oracle = Some(oracle);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegReport {
    pub node: NodeId,
    pub venue: VenueId,
    pub venue_type: VenueType,
    pub token_in: Asset,
    pub token_out: Asset,
    pub amount_in: Amount,
    pub amount_out: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapResult {
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub value_refund: Amount,
    pub legs: Vec<LegReport>,
    /// Oracle-implied output, when the call asked for a cross-check.
    pub implied_out: Option<Amount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Converged,
    /// Bisection ran out of iterations or window; the amount is best effort.
    NotConverged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReverseQuote {
    pub amount_in: Amount,
    pub convergence: Convergence,
}

impl ReverseQuote {
    pub fn is_exact(&self) -> bool {
        self.convergence == Convergence::Converged
    }
}
