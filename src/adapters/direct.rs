// 4.6 direct.rs: plain transfers. 1:1, token_in == token_out, payload ignored.

use super::{SwapRequest, VenueAdapter};
use crate::error::RoutingError;
use crate::ledger::Ledger;
use crate::path::Path;
use crate::types::{Amount, VenueId};
use crate::venue::VenueType;

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectTransferAdapter;

impl VenueAdapter for DirectTransferAdapter {
    fn venue_type(&self) -> VenueType {
        VenueType::DirectTransferOnly
    }

    fn quote_out(&self, _ledger: &Ledger, _venue: VenueId, _path: &Path, amount_in: Amount) -> Result<Vec<Amount>, RoutingError> {
        Ok(vec![amount_in, amount_in])
    }

    fn quote_in(&self, _ledger: &Ledger, _venue: VenueId, _path: &Path, amount_out: Amount) -> Result<Vec<Amount>, RoutingError> {
        Ok(vec![amount_out, amount_out])
    }

    fn settle(&self, ledger: &mut Ledger, request: &SwapRequest, _path: &Path) -> Result<Amount, RoutingError> {
        ledger.safe_transfer(request.payer, request.recipient, request.token_in, request.amount_in)?;
        Ok(request.amount_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, Asset, Timestamp};

    #[test]
    fn moves_value_unchanged() {
        let asset = Asset::from_low_u64(1);
        let mut ledger = Ledger::new().with_balance(AccountId(1), asset, 500).unwrap();
        let request = SwapRequest {
            venue: VenueId::from_low_u64(7),
            token_in: asset,
            token_out: asset,
            amount_in: 200,
            min_out: 200,
            payer: AccountId(1),
            recipient: AccountId(2),
            deadline: Timestamp::MAX,
            now: Timestamp::from_millis(0),
            attached_value: 0,
        };
        let outcome = DirectTransferAdapter
            .swap_exact(&mut ledger, &request, &Path::direct(Vec::new()))
            .unwrap();
        assert_eq!(outcome.produced_out, 200);
        assert_eq!(ledger.balance(AccountId(2), asset), 200);

        let mismatched = SwapRequest {
            token_out: Asset::from_low_u64(2),
            ..request
        };
        assert!(matches!(
            DirectTransferAdapter.swap_exact(&mut ledger, &mismatched, &Path::direct(Vec::new())),
            Err(RoutingError::PathEndpointMismatch { .. })
        ));
    }
}
