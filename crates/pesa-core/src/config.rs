use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{AccountId, TokenId};

/// What the campaign bookkeeping does when a join or update would push
/// `distributed` past `target`.
///
/// The historical behavior is to accept the write; `Warn` keeps that while
/// making the overshoot visible, `Reject` turns the target into a hard cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OvershootPolicy {
    /// Accept silently.
    Allow,
    /// Accept and log a structured warning.
    Warn,
    /// Fail the operation with a validation error.
    Reject,
}

/// Deployment configuration for the settlement engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The platform payment token all merchant payments settle in.
    pub platform_token: TokenId,
    /// Treasury account: fee receiver and source of campaign/purchase
    /// distributions.
    pub treasury_account: AccountId,
    /// Amounts at or below this many minor units pay no fee.
    pub fee_exempt_below: u64,
    /// Platform fee in basis points.
    pub fee_bps: u32,
    /// Upper bound on each ledger call, in seconds. A transfer that exceeds
    /// it has unknown outcome and is never retried.
    pub ledger_timeout_secs: u64,
    /// Session token lifetime, in seconds.
    pub session_ttl_secs: u64,
    /// Capacity of the notification work queue.
    pub notify_queue_capacity: usize,
    /// Number of notification workers draining the queue.
    pub notify_workers: usize,
    /// Campaign target enforcement.
    pub overshoot_policy: OvershootPolicy,
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fee_bps > 10_000 {
            return Err(CoreError::InvalidConfig(format!(
                "fee_bps must be at most 10000, got {}",
                self.fee_bps
            )));
        }
        if self.notify_queue_capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "notify_queue_capacity must be at least 1".into(),
            ));
        }
        if self.notify_workers == 0 {
            return Err(CoreError::InvalidConfig(
                "notify_workers must be at least 1".into(),
            ));
        }
        if self.ledger_timeout_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "ledger_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform_token: TokenId::new("0.0.5005"),
            treasury_account: AccountId::new("0.0.2"),
            fee_exempt_below: 100,
            fee_bps: 50,
            ledger_timeout_secs: 30,
            session_ttl_secs: 24 * 60 * 60,
            notify_queue_capacity: 256,
            notify_workers: 4,
            overshoot_policy: OvershootPolicy::Warn,
        }
    }
}
