use std::sync::Arc;
use std::time::Duration;

use pesa_core::{AccountId, Amount, TokenId};
use pesa_crypto::KeyPair;

use crate::error::SettlementError;
use crate::traits::ILedger;
use crate::types::{LegReceipts, TransferReceipt};

/// Outcome of one submitted leg, seen from the orchestrator.
enum LegError {
    /// The ledger reported failure; nothing moved for this leg.
    Failed(SettlementError),
    /// No receipt within the bound. The transfer may or may not have
    /// committed; it must never be retried.
    TimedOut,
}

/// Submits ledger transfers in a fixed order with no compensation.
///
/// A payment is two independent, sequential legs: principal
/// (payer → payee), then fee (payer → fee receiver). Each leg is built,
/// signed, submitted, and receipted before the next begins. If the fee leg
/// fails after the principal settled, the principal stays committed on the
/// ledger and the caller gets a `PartialSettlement` naming what completed.
/// Reconciliation happens outside, from the ledger's own history.
pub struct TransferOrchestrator {
    ledger: Arc<dyn ILedger>,
    timeout: Duration,
}

impl TransferOrchestrator {
    pub fn new(ledger: Arc<dyn ILedger>, timeout: Duration) -> Self {
        Self { ledger, timeout }
    }

    async fn submit(
        &self,
        from: &AccountId,
        to: &AccountId,
        token: &TokenId,
        amount: Amount,
        signing_key: &KeyPair,
    ) -> Result<TransferReceipt, LegError> {
        match tokio::time::timeout(
            self.timeout,
            self.ledger.transfer(from, to, token, amount, signing_key),
        )
        .await
        {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(e)) => Err(LegError::Failed(e)),
            Err(_) => Err(LegError::TimedOut),
        }
    }

    /// Execute both legs of a payment: principal, then fee.
    ///
    /// Principal failure aborts before the fee leg is attempted. The fee leg
    /// is submitted even when the fee is zero, keeping receipts symmetric.
    pub async fn pay(
        &self,
        payer: &AccountId,
        payer_key: &KeyPair,
        payee: &AccountId,
        fee_receiver: &AccountId,
        token: &TokenId,
        amount: Amount,
        fee: Amount,
    ) -> Result<LegReceipts, SettlementError> {
        let principal = match self.submit(payer, payee, token, amount, payer_key).await {
            Ok(receipt) => receipt,
            Err(LegError::Failed(e)) => return Err(e),
            Err(LegError::TimedOut) => {
                return Err(SettlementError::PartialSettlement {
                    detail: "principal leg timed out awaiting receipt; outcome unknown".into(),
                    receipts: Vec::new(),
                })
            }
        };
        tracing::info!(
            transfer_id = %principal.transfer_id,
            amount = %amount,
            "principal leg settled"
        );

        let fee_receipt = match self
            .submit(payer, fee_receiver, token, fee, payer_key)
            .await
        {
            Ok(receipt) => receipt,
            Err(LegError::Failed(e)) => {
                return Err(SettlementError::PartialSettlement {
                    detail: format!("principal leg settled; fee leg failed: {}", e),
                    receipts: vec![principal],
                })
            }
            Err(LegError::TimedOut) => {
                return Err(SettlementError::PartialSettlement {
                    detail: "principal leg settled; fee leg timed out; outcome unknown".into(),
                    receipts: vec![principal],
                })
            }
        };
        tracing::info!(transfer_id = %fee_receipt.transfer_id, fee = %fee, "fee leg settled");

        Ok(LegReceipts {
            principal,
            fee: fee_receipt,
        })
    }

    /// Execute a single transfer (campaign distribution, token purchase).
    pub async fn single(
        &self,
        from: &AccountId,
        signing_key: &KeyPair,
        to: &AccountId,
        token: &TokenId,
        amount: Amount,
    ) -> Result<TransferReceipt, SettlementError> {
        match self.submit(from, to, token, amount, signing_key).await {
            Ok(receipt) => {
                tracing::info!(transfer_id = %receipt.transfer_id, amount = %amount, "transfer settled");
                Ok(receipt)
            }
            Err(LegError::Failed(e)) => Err(e),
            Err(LegError::TimedOut) => Err(SettlementError::PartialSettlement {
                detail: "transfer timed out awaiting receipt; outcome unknown".into(),
                receipts: Vec::new(),
            }),
        }
    }
}
