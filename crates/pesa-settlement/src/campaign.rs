use std::sync::Arc;

use pesa_core::{Campaign, CampaignEntry, OvershootPolicy, User};
use uuid::Uuid;

use crate::error::SettlementError;
use crate::traits::ICampaignStore;

/// Local bookkeeping for campaign participation.
///
/// Join and Update never touch the ledger; the engine performs the token
/// transfer afterwards as a separate, non-atomic step. What is atomic here
/// is the store-side pairing of the entry write with the `distributed`
/// counter update.
#[derive(Clone)]
pub struct CampaignLedger {
    store: Arc<dyn ICampaignStore>,
    policy: OvershootPolicy,
}

impl CampaignLedger {
    pub fn new(store: Arc<dyn ICampaignStore>, policy: OvershootPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn get(&self, campaign_id: Uuid) -> Result<Campaign, SettlementError> {
        self.store
            .campaign(campaign_id)
            .await?
            .ok_or(SettlementError::NotFound("campaign"))
    }

    /// Join a campaign with an initial token balance.
    ///
    /// The existing-entry check is an optimization only; the store's
    /// uniqueness constraint closes the check-then-act race across
    /// concurrent joins.
    pub async fn join(
        &self,
        user: &User,
        campaign_id: Uuid,
        token_balance: u64,
    ) -> Result<(Campaign, CampaignEntry), SettlementError> {
        if token_balance == 0 {
            return Err(SettlementError::Validation(
                "token balance must be positive".into(),
            ));
        }
        let campaign = self.get(campaign_id).await?;
        if campaign.is_ended() {
            return Err(SettlementError::Validation("campaign has ended".into()));
        }
        if self.store.entry(user.id, campaign_id).await?.is_some() {
            return Err(SettlementError::AlreadyParticipant {
                user_id: user.id,
                campaign_id,
            });
        }
        self.check_target(&campaign, token_balance)?;

        let entry = self
            .store
            .insert_entry(user.id, campaign_id, token_balance)
            .await?;
        tracing::info!(
            campaign_id = %campaign_id,
            user_id = %user.id,
            token_balance,
            "campaign joined"
        );
        Ok((campaign, entry))
    }

    /// Add `delta` tokens to an existing entry. Never an implicit join.
    pub async fn update(
        &self,
        user: &User,
        campaign_id: Uuid,
        delta: u64,
    ) -> Result<(Campaign, CampaignEntry), SettlementError> {
        if delta == 0 {
            return Err(SettlementError::Validation(
                "token balance must be positive".into(),
            ));
        }
        let campaign = self.get(campaign_id).await?;
        if campaign.is_ended() {
            return Err(SettlementError::Validation("campaign has ended".into()));
        }
        self.check_target(&campaign, delta)?;

        let entry = self.store.increment_entry(user.id, campaign_id, delta).await?;
        tracing::info!(
            campaign_id = %campaign_id,
            user_id = %user.id,
            delta,
            "campaign entry updated"
        );
        Ok((campaign, entry))
    }

    /// Mark the campaign ended. Fails on a campaign that already ended.
    pub async fn close(&self, campaign_id: Uuid) -> Result<Campaign, SettlementError> {
        let campaign = self.get(campaign_id).await?;
        if campaign.is_ended() {
            return Err(SettlementError::Validation(
                "campaign already ended".into(),
            ));
        }
        let campaign = self.store.end_campaign(campaign_id).await?;
        tracing::info!(campaign_id = %campaign_id, "campaign closed");
        Ok(campaign)
    }

    pub async fn participants(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<CampaignEntry>, SettlementError> {
        self.store.participants(campaign_id).await
    }

    /// Target enforcement, read against the counter as last committed.
    /// `Reject` is advisory under concurrency; a hard cap would live in the
    /// store's increment statement.
    fn check_target(&self, campaign: &Campaign, delta: u64) -> Result<(), SettlementError> {
        if delta <= campaign.remaining() {
            return Ok(());
        }
        let would_distribute = campaign.distributed.saturating_add(delta);
        match self.policy {
            OvershootPolicy::Allow => Ok(()),
            OvershootPolicy::Warn => {
                tracing::warn!(
                    campaign_id = %campaign.id,
                    target = campaign.target,
                    would_distribute,
                    "campaign distribution exceeds target"
                );
                Ok(())
            }
            OvershootPolicy::Reject => Err(SettlementError::Validation(format!(
                "distribution would exceed campaign target ({} > {})",
                would_distribute, campaign.target
            ))),
        }
    }
}
