use std::sync::Arc;

use pesa_core::{AccountId, Amount, TokenId};

use crate::error::SettlementError;
use crate::traits::ILedger;

/// Advisory balance check against the external ledger.
///
/// Runs strictly before any ledger-mutating call so callers fail fast with a
/// clear `InsufficientFunds` instead of a generic ledger rejection. The
/// ledger itself remains the authority on sufficient funds at submission
/// time.
pub struct BalanceOracle {
    ledger: Arc<dyn ILedger>,
}

impl BalanceOracle {
    pub fn new(ledger: Arc<dyn ILedger>) -> Self {
        Self { ledger }
    }

    /// Fail unless `account` holds at least `required` minor units of
    /// `token`.
    pub async fn ensure_covers(
        &self,
        account: &AccountId,
        token: &TokenId,
        required: Amount,
    ) -> Result<(), SettlementError> {
        let available = self.ledger.balance(account, token).await?;
        if available < required.value() {
            return Err(SettlementError::InsufficientFunds {
                available,
                required: required.value(),
            });
        }
        Ok(())
    }
}
