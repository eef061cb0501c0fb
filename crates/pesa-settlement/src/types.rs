use chrono::{DateTime, Utc};
use pesa_core::{AccountId, Amount, CampaignEntry, TokenId, Transaction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receipt for one submitted ledger leg.
///
/// Once the ledger has receipted a transfer it is irreversible; receipts are
/// the handle reconciliation tooling works from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Transfer reference on the ledger.
    pub transfer_id: String,
    pub from: AccountId,
    pub to: AccountId,
    pub token: TokenId,
    pub amount: Amount,
    pub submitted_at: DateTime<Utc>,
}

/// Both receipts of a fully settled payment, in submission order.
#[derive(Debug, Clone)]
pub struct LegReceipts {
    pub principal: TransferReceipt,
    pub fee: TransferReceipt,
}

/// Inbound payment request, already stripped of transport framing.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub shop_id: Uuid,
    pub merchant_id: Uuid,
    pub amount: Amount,
}

/// Result of a settled payment.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementOutcome {
    pub transaction: Transaction,
    pub principal: TransferReceipt,
    pub fee: TransferReceipt,
}

/// Inbound campaign join/update request.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignRequest {
    pub campaign_id: Uuid,
    pub token_balance: u64,
}

/// Result of a campaign join or entry update.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignOutcome {
    pub campaign_id: Uuid,
    pub entry: CampaignEntry,
    pub transfer: TransferReceipt,
}

/// Inbound merchant cash-out request.
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Amount,
    pub receiver: AccountId,
}

/// New-row shape for the settlement record writer.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub merchant_id: Uuid,
    pub shop_id: Uuid,
    pub amount: Amount,
    pub fee: Amount,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub user_id: Uuid,
    pub amount: Amount,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub merchant_id: Uuid,
    pub amount: Amount,
    pub fee: Amount,
    pub receiver: AccountId,
}
