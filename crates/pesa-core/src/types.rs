use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Ledger account identifier (e.g. `0.0.4815162`).
///
/// Opaque to the engine; only the ledger client interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger token identifier. The platform token and every campaign token
/// carry one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification topic identifier, one per identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicId(pub String);

impl TopicId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token value in minor units.
///
/// One unit system end to end: requests, fee computation, ledger legs, and
/// local records all carry minor units, so no scaling step can diverge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Amount(pub u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role a session token is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Merchant,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merchant => write!(f, "merchant"),
            Self::User => write!(f, "user"),
        }
    }
}

/// A registered merchant.
///
/// Never hard-deleted; `deleted_at` marks retirement. The password hash is a
/// PHC string and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    pub id: Uuid,
    pub username: String,
    pub mobile_number: String,
    #[serde(skip)]
    pub password_hash: String,
    pub account_id: AccountId,
    pub topic_id: TopicId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A registered user (payer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub mobile_number: String,
    #[serde(skip)]
    pub password_hash: String,
    pub account_id: AccountId,
    pub topic_id: TopicId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The caller identity resolved from a bearer token, threaded explicitly
/// through every engine flow.
///
/// `Anonymous` carries the nil id; real identities never do.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Merchant(Merchant),
    User(User),
}

impl Identity {
    /// Identity id; `Uuid::nil()` for the anonymous caller.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Anonymous => Uuid::nil(),
            Self::Merchant(m) => m.id,
            Self::User(u) => u.id,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Anonymous => None,
            Self::Merchant(_) => Some(Role::Merchant),
            Self::User(_) => Some(Role::User),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Merchant(m) => Some(&m.username),
            Self::User(u) => Some(&u.username),
        }
    }
}

/// A shop, owned by exactly one merchant. Ownership is immutable after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A reward campaign: a bounded pool of campaign tokens a shop distributes
/// to participating users.
///
/// `distributed` is the running total ever distributed and only grows.
/// Whether it may exceed `target` is governed by
/// [`crate::config::OvershootPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub token_id: TokenId,
    pub target: u64,
    pub distributed: u64,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Units still distributable before the target is reached.
    pub fn remaining(&self) -> u64 {
        self.target.saturating_sub(self.distributed)
    }
}

/// A user's cumulative participation record within one campaign.
///
/// Unique per `(user_id, campaign_id)`; mutated only by additive
/// increments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignEntry {
    pub user_id: Uuid,
    pub campaign_id: Uuid,
    pub token_balance: u64,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of a bookkeeping record. Written once, after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Completed,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Immutable local record of a settled payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub merchant_id: Uuid,
    pub shop_id: Uuid,
    pub amount: Amount,
    pub fee: Amount,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

/// Record of a user topping up platform tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Amount,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

/// Record of a merchant cashing out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub amount: Amount,
    pub fee: Amount,
    pub receiver: AccountId,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}
