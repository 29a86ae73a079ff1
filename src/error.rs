//! Routing error taxonomy.
//!
//! Every failure is fail-fast and aborts the whole call. Each variant belongs to
//! exactly one [`ErrorClass`] so callers can decide whether resubmitting makes sense.

use crate::types::{AccountId, Amount, Asset, PoolId, Timestamp, VenueId};
use crate::venue::VenueType;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Input,
    UnsupportedCapability,
    ExecutionIntegrity,
    PriceSafety,
    Timing,
    Arithmetic,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    // input
    #[error("Source and destination asset are identical")]
    IdenticalAssets,

    #[error("Shares must sum to a positive value")]
    SharesMustBePositive,

    #[error("Parameter length mismatch: expected {expected}, got {actual}")]
    ParamsLengthMismatch { expected: usize, actual: usize },

    #[error("Malformed {venue_type:?} payload: {reason}")]
    MalformedPayload {
        venue_type: VenueType,
        reason: &'static str,
    },

    #[error("Path endpoint mismatch: expected {expected:?}, got {actual:?}")]
    PathEndpointMismatch { expected: Asset, actual: Asset },

    #[error("Insufficient native value: required {required}, attached {attached}")]
    InsufficientValue { required: Amount, attached: Amount },

    #[error("Risk parameter out of range: {0}")]
    RiskParameterOutOfRange(&'static str),

    // unsupported capability
    #[error("Venue {0:?} is not supported")]
    AddressNotSupported(VenueId),

    #[error("No codec or adapter registered for {0:?}")]
    UnknownVenueType(VenueType),

    #[error("Asset {0:?} is not supported")]
    TokenNotSupported(Asset),

    #[error("No pool on {venue:?} for {asset_in:?} -> {asset_out:?}")]
    PoolNotFound {
        venue: VenueId,
        asset_in: Asset,
        asset_out: Asset,
    },

    #[error("Pool {0:?} is not registered")]
    UnknownPool(PoolId),

    // execution integrity
    #[error("Venue reported success but transferred nothing")]
    SwapDidNotOccur,

    #[error("Venue delivered to an unexpected recipient or asset")]
    UnexpectedRecipient,

    #[error("Transfer mismatch: reported {reported}, observed {observed}")]
    TransferAmountMismatch { reported: Amount, observed: Amount },

    #[error("Insufficient balance of {asset:?} on {account:?}: requested {requested}, available {available}")]
    InsufficientBalance {
        account: AccountId,
        asset: Asset,
        requested: Amount,
        available: Amount,
    },

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    // price safety
    #[error("Realized amount {realized} diverges from oracle amount {implied} beyond {limit}")]
    DivergentPrice {
        realized: Amount,
        implied: Amount,
        limit: Decimal,
    },

    #[error("Output {actual} below minimum {min_out}")]
    SlippageToleranceExceeded { min_out: Amount, actual: Amount },

    #[error("Oracle rate unavailable for {from:?} -> {to:?}")]
    OracleUnavailable { from: Asset, to: Asset },

    // timing
    #[error("Deadline {deadline} passed at {now}")]
    Expired { deadline: Timestamp, now: Timestamp },

    // arithmetic
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(&'static str),

    #[error("Division by zero")]
    DivisionByZero,
}

impl RoutingError {
    pub fn class(&self) -> ErrorClass {
        use RoutingError::*;
        match self {
            IdenticalAssets
            | SharesMustBePositive
            | ParamsLengthMismatch { .. }
            | MalformedPayload { .. }
            | PathEndpointMismatch { .. }
            | InsufficientValue { .. }
            | RiskParameterOutOfRange(_) => ErrorClass::Input,
            AddressNotSupported(_)
            | UnknownVenueType(_)
            | TokenNotSupported(_)
            | PoolNotFound { .. }
            | UnknownPool(_) => ErrorClass::UnsupportedCapability,
            SwapDidNotOccur
            | UnexpectedRecipient
            | TransferAmountMismatch { .. }
            | InsufficientBalance { .. }
            | InsufficientLiquidity => ErrorClass::ExecutionIntegrity,
            DivergentPrice { .. } | SlippageToleranceExceeded { .. } | OracleUnavailable { .. } => {
                ErrorClass::PriceSafety
            }
            Expired { .. } => ErrorClass::Timing,
            ArithmeticOverflow(_) | DivisionByZero => ErrorClass::Arithmetic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_taxonomy() {
        assert_eq!(RoutingError::IdenticalAssets.class(), ErrorClass::Input);
        assert_eq!(
            RoutingError::UnknownVenueType(VenueType::WeightedPoolStyle).class(),
            ErrorClass::UnsupportedCapability
        );
        assert_eq!(RoutingError::SwapDidNotOccur.class(), ErrorClass::ExecutionIntegrity);
        assert_eq!(
            RoutingError::SlippageToleranceExceeded { min_out: 2, actual: 1 }.class(),
            ErrorClass::PriceSafety
        );
        assert_eq!(
            RoutingError::Expired {
                deadline: Timestamp(1),
                now: Timestamp(2)
            }
            .class(),
            ErrorClass::Timing
        );
    }

    #[test]
    fn messages_carry_context() {
        let err = RoutingError::SlippageToleranceExceeded { min_out: 100, actual: 99 };
        assert_eq!(err.to_string(), "Output 99 below minimum 100");
    }
}
