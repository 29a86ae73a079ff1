// 11.0: every settled conversion leaves an audit trail. the executor records one
// event per leg plus a summary, the oracle verdict and any failure it rolled back.

use crate::error::ErrorClass;
use crate::types::{Amount, Asset, Timestamp, VenueId};
use crate::venue::VenueType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEvent {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl RoutingEvent {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self { id, timestamp, payload }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    LegExecuted(LegExecutedEvent),
    ConversionSettled(ConversionSettledEvent),
    OracleChecked(OracleCheckedEvent),
    IdentityPassthrough { asset: Asset, amount: Amount },
    ConversionFailed(ConversionFailedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegExecutedEvent {
    pub venue: VenueId,
    pub venue_type: VenueType,
    pub token_in: Asset,
    pub token_out: Asset,
    pub amount_in: Amount,
    pub amount_out: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSettledEvent {
    pub token_in: Asset,
    pub token_out: Asset,
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub legs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleCheckedEvent {
    pub token_in: Asset,
    pub token_out: Asset,
    pub realized: Amount,
    pub implied: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionFailedEvent {
    pub token_in: Asset,
    pub token_out: Asset,
    pub amount_in: Amount,
    pub class: FailureClass,
    pub reason: String,
}

// serializable mirror of ErrorClass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Input,
    UnsupportedCapability,
    ExecutionIntegrity,
    PriceSafety,
    Timing,
    Arithmetic,
}

impl From<ErrorClass> for FailureClass {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::Input => FailureClass::Input,
            ErrorClass::UnsupportedCapability => FailureClass::UnsupportedCapability,
            ErrorClass::ExecutionIntegrity => FailureClass::ExecutionIntegrity,
            ErrorClass::PriceSafety => FailureClass::PriceSafety,
            ErrorClass::Timing => FailureClass::Timing,
            ErrorClass::Arithmetic => FailureClass::Arithmetic,
        }
    }
}
