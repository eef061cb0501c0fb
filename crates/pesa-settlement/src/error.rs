use pesa_auth::AuthError;
use pesa_core::CoreError;
use uuid::Uuid;

use crate::types::TransferReceipt;

/// Settlement-layer errors.
///
/// Ledger and store failures stay distinct kinds: "nothing happened" and
/// "money moved but bookkeeping failed" need different remediation, and only
/// the former is safe to retry.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("user {user_id} already joined campaign {campaign_id}")]
    AlreadyParticipant { user_id: Uuid, campaign_id: Uuid },

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("ledger rejected transfer: {0}")]
    LedgerRejected(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Value moved (or may have moved) on the ledger while a later step of
    /// the sequence did not commit. `receipts` lists the legs known to have
    /// completed so reconciliation tooling can act from the error alone.
    #[error("partial settlement: {detail}")]
    PartialSettlement {
        detail: String,
        receipts: Vec<TransferReceipt>,
    },
}

impl From<AuthError> for SettlementError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(msg) => Self::Unauthenticated(msg),
            AuthError::Unauthorized => Self::Unauthorized,
            AuthError::Store(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl From<CoreError> for SettlementError {
    fn from(err: CoreError) -> Self {
        Self::Validation(err.to_string())
    }
}
