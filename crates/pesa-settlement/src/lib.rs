//! Pesa Settlement & Distribution Engine
//!
//! Coordinates an append-only, irreversible external ledger with a mutable
//! relational store when no cross-system transaction exists. Every
//! cross-boundary operation is an explicit ordered sequence: validate and
//! check balance (cheap, abortable) before the irreversible ledger legs,
//! local bookkeeping after, best-effort notification last. There is no
//! compensation anywhere — partial states are surfaced, never hidden.

pub mod adapters;
pub mod campaign;
pub mod engine;
pub mod error;
pub mod fees;
pub mod notify;
pub mod oracle;
pub mod traits;
pub mod transfer;
pub mod types;

pub use campaign::CampaignLedger;
pub use engine::SettlementEngine;
pub use error::SettlementError;
pub use fees::FeePolicy;
pub use notify::{EventKind, NotificationMessage, Notifier};
pub use oracle::BalanceOracle;
pub use traits::{ICampaignStore, IIdentityStore, ILedger, ITopic, ITransactionStore};
pub use transfer::TransferOrchestrator;
pub use types::{
    CampaignOutcome, CampaignRequest, LegReceipts, NewPurchase, NewTransaction, NewWithdrawal,
    PaymentRequest, SettlementOutcome, TransferReceipt, WithdrawRequest,
};
