use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use pesa_auth::{AuthError, ISessionStore, SessionToken};
use pesa_core::{
    AccountId, Amount, Campaign, CampaignEntry, Identity, Merchant, Purchase, RecordStatus, Role,
    Shop, TokenId, TopicId, Transaction, User, Withdrawal,
};
use pesa_crypto::{Digest, KeyPair};
use uuid::Uuid;

use crate::error::SettlementError;
use crate::traits::{ICampaignStore, IIdentityStore, ILedger, ITopic, ITransactionStore};
use crate::types::{NewPurchase, NewTransaction, NewWithdrawal, TransferReceipt};

/// In-memory ledger: balance map plus a log of every submitted transfer.
///
/// Enforces balance at submission time like the real ledger does, and keeps
/// the submitted-transfer log inspectable so tests can count side effects.
/// Signing material is accepted as-is.
pub struct MemoryLedger {
    balances: DashMap<String, u64>,
    submitted: Mutex<Vec<TransferReceipt>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
            submitted: Mutex::new(Vec::new()),
        }
    }

    fn balance_key(account: &AccountId, token: &TokenId) -> String {
        format!("{}:{}", account, token)
    }

    /// Seed an account with tokens.
    pub fn credit(&self, account: &AccountId, token: &TokenId, amount: u64) {
        self.balances
            .entry(Self::balance_key(account, token))
            .and_modify(|b| *b += amount)
            .or_insert(amount);
    }

    /// Snapshot of every receipted transfer, in submission order.
    pub fn submitted(&self) -> Vec<TransferReceipt> {
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ILedger for MemoryLedger {
    async fn balance(&self, account: &AccountId, token: &TokenId) -> Result<u64, SettlementError> {
        let key = Self::balance_key(account, token);
        Ok(self.balances.get(&key).map(|b| *b).unwrap_or(0))
    }

    async fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        token: &TokenId,
        amount: Amount,
        _signing_key: &KeyPair,
    ) -> Result<TransferReceipt, SettlementError> {
        let from_key = Self::balance_key(from, token);
        let available = self.balances.get(&from_key).map(|b| *b).unwrap_or(0);
        if available < amount.value() {
            return Err(SettlementError::LedgerRejected(format!(
                "insufficient token balance on {}",
                from
            )));
        }

        self.balances
            .entry(from_key)
            .and_modify(|b| *b -= amount.value());
        self.balances
            .entry(Self::balance_key(to, token))
            .and_modify(|b| *b += amount.value())
            .or_insert(amount.value());

        let receipt = TransferReceipt {
            transfer_id: format!("mem-{}", Uuid::now_v7()),
            from: from.clone(),
            to: to.clone(),
            token: token.clone(),
            amount,
            submitted_at: Utc::now(),
        };
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(receipt.clone());
        tracing::debug!(transfer_id = %receipt.transfer_id, "memory ledger transfer");
        Ok(receipt)
    }
}

/// In-memory pub/sub: a per-topic log of published payloads.
pub struct MemoryTopics {
    published: DashMap<String, Vec<Vec<u8>>>,
}

impl MemoryTopics {
    pub fn new() -> Self {
        Self {
            published: DashMap::new(),
        }
    }

    /// Payloads published to a topic, in order.
    pub fn published(&self, topic: &TopicId) -> Vec<Vec<u8>> {
        self.published
            .get(topic.as_str())
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn total_published(&self) -> usize {
        self.published.iter().map(|entry| entry.value().len()).sum()
    }
}

impl Default for MemoryTopics {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ITopic for MemoryTopics {
    async fn publish(&self, topic: &TopicId, payload: &[u8]) -> Result<(), SettlementError> {
        self.published
            .entry(topic.as_str().to_string())
            .or_default()
            .push(payload.to_vec());
        Ok(())
    }
}

/// Campaigns and entries live under one mutex so `insert_entry` and
/// `increment_entry` are atomic exactly as the store contract promises.
#[derive(Default)]
struct CampaignTable {
    campaigns: HashMap<Uuid, Campaign>,
    entries: HashMap<(Uuid, Uuid), CampaignEntry>,
}

/// In-memory relational store implementing the session, identity, campaign,
/// and record contracts.
pub struct MemoryStore {
    merchants: DashMap<Uuid, Merchant>,
    users: DashMap<Uuid, User>,
    shops: DashMap<Uuid, Shop>,
    signing_keys: DashMap<Uuid, String>,
    tokens: DashMap<Digest, SessionToken>,
    campaign_table: Mutex<CampaignTable>,
    transactions: DashMap<Uuid, Transaction>,
    purchases: DashMap<Uuid, Purchase>,
    withdrawals: DashMap<Uuid, Withdrawal>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            merchants: DashMap::new(),
            users: DashMap::new(),
            shops: DashMap::new(),
            signing_keys: DashMap::new(),
            tokens: DashMap::new(),
            campaign_table: Mutex::new(CampaignTable::default()),
            transactions: DashMap::new(),
            purchases: DashMap::new(),
            withdrawals: DashMap::new(),
        }
    }

    fn table(&self) -> std::sync::MutexGuard<'_, CampaignTable> {
        self.campaign_table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_merchant(&self, merchant: Merchant) {
        self.merchants.insert(merchant.id, merchant);
    }

    pub fn add_user(&self, user: User, signing_key: &KeyPair) {
        self.signing_keys.insert(user.id, signing_key.to_hex());
        self.users.insert(user.id, user);
    }

    pub fn add_shop(&self, shop: Shop) {
        self.shops.insert(shop.id, shop);
    }

    pub fn add_campaign(&self, campaign: Campaign) {
        self.table().campaigns.insert(campaign.id, campaign);
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ISessionStore for MemoryStore {
    async fn insert_token(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.tokens.insert(token.hash, token.clone());
        Ok(())
    }

    async fn identity_for_token(
        &self,
        scope: &str,
        hash: &Digest,
    ) -> Result<Option<Identity>, AuthError> {
        let Some(token) = self.tokens.get(hash) else {
            return Ok(None);
        };
        if token.scope != scope || token.is_expired(Utc::now()) {
            return Ok(None);
        }
        let identity = match token.role {
            Role::Merchant => self
                .merchants
                .get(&token.identity_id)
                .map(|m| Identity::Merchant(m.clone())),
            Role::User => self
                .users
                .get(&token.identity_id)
                .map(|u| Identity::User(u.clone())),
        };
        Ok(identity)
    }

    async fn revoke_all(&self, identity_id: Uuid, scope: &str) -> Result<(), AuthError> {
        self.tokens
            .retain(|_, token| !(token.identity_id == identity_id && token.scope == scope));
        Ok(())
    }
}

#[async_trait]
impl IIdentityStore for MemoryStore {
    async fn merchant(&self, id: Uuid) -> Result<Option<Merchant>, SettlementError> {
        Ok(self.merchants.get(&id).map(|m| m.clone()))
    }

    async fn merchant_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Merchant>, SettlementError> {
        Ok(self
            .merchants
            .iter()
            .find(|m| m.username == username)
            .map(|m| m.clone()))
    }

    async fn user(&self, id: Uuid) -> Result<Option<User>, SettlementError> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, SettlementError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone()))
    }

    async fn shop(&self, id: Uuid) -> Result<Option<Shop>, SettlementError> {
        Ok(self.shops.get(&id).map(|s| s.clone()))
    }

    async fn signing_key(&self, user_id: Uuid) -> Result<KeyPair, SettlementError> {
        let material = self
            .signing_keys
            .get(&user_id)
            .ok_or(SettlementError::NotFound("signing key"))?;
        KeyPair::from_hex(&material)
            .map_err(|e| SettlementError::StoreUnavailable(format!("signing key material: {}", e)))
    }
}

#[async_trait]
impl ICampaignStore for MemoryStore {
    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>, SettlementError> {
        Ok(self.table().campaigns.get(&id).cloned())
    }

    async fn entry(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<Option<CampaignEntry>, SettlementError> {
        Ok(self.table().entries.get(&(user_id, campaign_id)).cloned())
    }

    async fn insert_entry(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        token_balance: u64,
    ) -> Result<CampaignEntry, SettlementError> {
        let mut table = self.table();
        if table.entries.contains_key(&(user_id, campaign_id)) {
            return Err(SettlementError::AlreadyParticipant {
                user_id,
                campaign_id,
            });
        }
        let campaign = table
            .campaigns
            .get_mut(&campaign_id)
            .ok_or(SettlementError::NotFound("campaign"))?;
        campaign.distributed += token_balance;

        let now = Utc::now();
        let entry = CampaignEntry {
            user_id,
            campaign_id,
            token_balance,
            joined_at: now,
            updated_at: now,
        };
        table.entries.insert((user_id, campaign_id), entry.clone());
        Ok(entry)
    }

    async fn increment_entry(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        delta: u64,
    ) -> Result<CampaignEntry, SettlementError> {
        let mut table = self.table();
        let Some(entry) = table.entries.get_mut(&(user_id, campaign_id)) else {
            return Err(SettlementError::NotFound("campaign entry"));
        };
        entry.token_balance += delta;
        entry.updated_at = Utc::now();
        let entry = entry.clone();

        let campaign = table
            .campaigns
            .get_mut(&campaign_id)
            .ok_or(SettlementError::NotFound("campaign"))?;
        campaign.distributed += delta;
        Ok(entry)
    }

    async fn end_campaign(&self, id: Uuid) -> Result<Campaign, SettlementError> {
        let mut table = self.table();
        let campaign = table
            .campaigns
            .get_mut(&id)
            .ok_or(SettlementError::NotFound("campaign"))?;
        if campaign.ended_at.is_none() {
            campaign.ended_at = Some(Utc::now());
        }
        Ok(campaign.clone())
    }

    async fn participants(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<CampaignEntry>, SettlementError> {
        let table = self.table();
        let mut entries: Vec<CampaignEntry> = table
            .entries
            .values()
            .filter(|e| e.campaign_id == campaign_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.joined_at);
        Ok(entries)
    }
}

#[async_trait]
impl ITransactionStore for MemoryStore {
    async fn record_transaction(
        &self,
        new: NewTransaction,
    ) -> Result<Transaction, SettlementError> {
        let transaction = Transaction {
            id: Uuid::now_v7(),
            user_id: new.user_id,
            merchant_id: new.merchant_id,
            shop_id: new.shop_id,
            amount: new.amount,
            fee: new.fee,
            status: RecordStatus::Completed,
            created_at: Utc::now(),
        };
        self.transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn record_purchase(&self, new: NewPurchase) -> Result<Purchase, SettlementError> {
        let purchase = Purchase {
            id: Uuid::now_v7(),
            user_id: new.user_id,
            amount: new.amount,
            status: RecordStatus::Completed,
            created_at: Utc::now(),
        };
        self.purchases.insert(purchase.id, purchase.clone());
        Ok(purchase)
    }

    async fn record_withdrawal(
        &self,
        new: NewWithdrawal,
    ) -> Result<Withdrawal, SettlementError> {
        let withdrawal = Withdrawal {
            id: Uuid::now_v7(),
            merchant_id: new.merchant_id,
            amount: new.amount,
            fee: new.fee,
            receiver: new.receiver,
            status: RecordStatus::Completed,
            created_at: Utc::now(),
        };
        self.withdrawals
            .insert(withdrawal.id, withdrawal.clone());
        Ok(withdrawal)
    }
}
