use async_trait::async_trait;
use pesa_core::{
    AccountId, Amount, Campaign, CampaignEntry, Merchant, Purchase, Shop, TokenId, TopicId,
    Transaction, User, Withdrawal,
};
use pesa_crypto::KeyPair;
use uuid::Uuid;

use crate::error::SettlementError;
use crate::types::{NewPurchase, NewTransaction, NewWithdrawal, TransferReceipt};

/// External ledger contract.
///
/// The ledger is the system of record for token ownership. Transfers are
/// irreversible once receipted; the engine never retries them.
#[async_trait]
pub trait ILedger: Send + Sync {
    /// Current balance of `token` held by `account`, in minor units.
    ///
    /// Transport or not-found failures surface as `LedgerUnavailable`.
    async fn balance(&self, account: &AccountId, token: &TokenId) -> Result<u64, SettlementError>;

    /// Build one transfer, sign it with `signing_key`, submit it, and await
    /// its receipt.
    async fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        token: &TokenId,
        amount: Amount,
        signing_key: &KeyPair,
    ) -> Result<TransferReceipt, SettlementError>;
}

/// External pub/sub topic contract. No delivery or ordering guarantee.
#[async_trait]
pub trait ITopic: Send + Sync {
    async fn publish(&self, topic: &TopicId, payload: &[u8]) -> Result<(), SettlementError>;
}

/// Identity/profile store contract (the profile CRUD itself lives
/// elsewhere; the engine only reads).
#[async_trait]
pub trait IIdentityStore: Send + Sync {
    async fn merchant(&self, id: Uuid) -> Result<Option<Merchant>, SettlementError>;

    async fn merchant_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Merchant>, SettlementError>;

    async fn user(&self, id: Uuid) -> Result<Option<User>, SettlementError>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, SettlementError>;

    async fn shop(&self, id: Uuid) -> Result<Option<Shop>, SettlementError>;

    /// Signing key for the user's ledger account, in usable form.
    ///
    /// Key unsealing is the store's concern; the engine treats this as a
    /// black box.
    async fn signing_key(&self, user_id: Uuid) -> Result<KeyPair, SettlementError>;
}

/// Campaign bookkeeping contract.
///
/// `insert_entry` and `increment_entry` must each commit the entry write and
/// the `distributed` counter update in one store transaction; this is the
/// one genuinely atomic step in the system. The (user, campaign) uniqueness
/// constraint is the real duplicate-join guarantee; in-process checks are
/// only advisory.
#[async_trait]
pub trait ICampaignStore: Send + Sync {
    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>, SettlementError>;

    async fn entry(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<Option<CampaignEntry>, SettlementError>;

    /// Insert a new entry and add `token_balance` to the campaign's
    /// `distributed` counter, atomically. A duplicate (user, campaign) pair
    /// fails with `AlreadyParticipant`.
    async fn insert_entry(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        token_balance: u64,
    ) -> Result<CampaignEntry, SettlementError>;

    /// Add `delta` to an existing entry's balance and to the campaign's
    /// `distributed` counter, atomically, as a single conditional increment.
    /// Fails with `NotFound` when no entry exists.
    async fn increment_entry(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        delta: u64,
    ) -> Result<CampaignEntry, SettlementError>;

    /// Mark the campaign ended (single local write) and return it.
    async fn end_campaign(&self, id: Uuid) -> Result<Campaign, SettlementError>;

    /// All entries of a campaign, for the close fan-out.
    async fn participants(&self, campaign_id: Uuid)
        -> Result<Vec<CampaignEntry>, SettlementError>;
}

/// Settlement record writer contract.
///
/// Rows are immutable once written. These are invoked only after the ledger
/// side of an operation has succeeded; a failure here means value already
/// moved and is surfaced as `PartialSettlement` by the caller.
#[async_trait]
pub trait ITransactionStore: Send + Sync {
    async fn record_transaction(
        &self,
        new: NewTransaction,
    ) -> Result<Transaction, SettlementError>;

    async fn record_purchase(&self, new: NewPurchase) -> Result<Purchase, SettlementError>;

    async fn record_withdrawal(&self, new: NewWithdrawal)
        -> Result<Withdrawal, SettlementError>;
}
