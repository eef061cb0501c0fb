//! Pesa core domain model.
//!
//! Shared types for the settlement engine: ledger/topic identifiers,
//! minor-unit amounts, identities, shops and campaigns, and the immutable
//! bookkeeping records the engine writes.

pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, OvershootPolicy};
pub use error::CoreError;
pub use types::{
    AccountId, Amount, Campaign, CampaignEntry, Identity, Merchant, Purchase, RecordStatus, Role,
    Shop, TokenId, TopicId, Transaction, User, Withdrawal,
};
