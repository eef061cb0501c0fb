use std::sync::Arc;
use std::time::Duration;

use pesa_core::{
    Amount, Campaign, EngineConfig, Identity, Merchant, Purchase, TopicId, User, Withdrawal,
};
use pesa_crypto::KeyPair;
use uuid::Uuid;

use crate::campaign::CampaignLedger;
use crate::error::SettlementError;
use crate::fees::FeePolicy;
use crate::notify::{EventKind, Notifier};
use crate::oracle::BalanceOracle;
use crate::traits::{ICampaignStore, IIdentityStore, ILedger, ITransactionStore};
use crate::transfer::TransferOrchestrator;
use crate::types::{
    CampaignOutcome, CampaignRequest, NewPurchase, NewTransaction, NewWithdrawal, PaymentRequest,
    SettlementOutcome, TransferReceipt, WithdrawRequest,
};

/// Top-level orchestrator for the settlement flows.
///
/// Every flow takes the caller's resolved [`Identity`] explicitly: it is
/// resolved once per request by the session layer and never re-resolved
/// here. Each flow is an ordered sequence with its cheap, abortable steps
/// (validation, lookups, balance check) strictly before the irreversible
/// ledger legs, and its bookkeeping and notification after.
pub struct SettlementEngine {
    config: EngineConfig,
    fees: FeePolicy,
    identities: Arc<dyn IIdentityStore>,
    records: Arc<dyn ITransactionStore>,
    campaigns: CampaignLedger,
    oracle: BalanceOracle,
    transfers: TransferOrchestrator,
    notifier: Arc<Notifier>,
    treasury_key: KeyPair,
}

impl SettlementEngine {
    pub fn new(
        config: EngineConfig,
        identities: Arc<dyn IIdentityStore>,
        campaign_store: Arc<dyn ICampaignStore>,
        records: Arc<dyn ITransactionStore>,
        ledger: Arc<dyn ILedger>,
        notifier: Arc<Notifier>,
        treasury_key: KeyPair,
    ) -> Result<Self, SettlementError> {
        config.validate()?;
        let fees = FeePolicy::from_config(&config);
        let timeout = Duration::from_secs(config.ledger_timeout_secs);
        Ok(Self {
            fees,
            identities,
            records,
            campaigns: CampaignLedger::new(campaign_store, config.overshoot_policy),
            oracle: BalanceOracle::new(Arc::clone(&ledger)),
            transfers: TransferOrchestrator::new(ledger, timeout),
            notifier,
            treasury_key,
            config,
        })
    }

    /// Settle a payment from the calling user to a merchant's shop.
    ///
    /// Any failure before the dual-leg transfer aborts with no side
    /// effects. After the legs, a failed record write surfaces as
    /// `PartialSettlement` — the value has already moved.
    pub async fn pay_merchant(
        &self,
        caller: &Identity,
        request: PaymentRequest,
    ) -> Result<SettlementOutcome, SettlementError> {
        let payer = Self::require_user(caller)?;
        if request.amount.is_zero() {
            return Err(SettlementError::Validation("amount must be positive".into()));
        }

        let merchant = self
            .identities
            .merchant(request.merchant_id)
            .await?
            .ok_or(SettlementError::NotFound("merchant"))?;
        let shop = self
            .identities
            .shop(request.shop_id)
            .await?
            .ok_or(SettlementError::NotFound("shop"))?;
        if shop.merchant_id != merchant.id {
            return Err(SettlementError::Validation(
                "shop does not belong to merchant".into(),
            ));
        }

        let fee = self.fees.fee(request.amount);
        let required = request
            .amount
            .checked_add(fee)
            .ok_or_else(|| SettlementError::Validation("amount out of range".into()))?;
        self.oracle
            .ensure_covers(&payer.account_id, &self.config.platform_token, required)
            .await?;

        let payer_key = self.identities.signing_key(payer.id).await?;
        let legs = self
            .transfers
            .pay(
                &payer.account_id,
                &payer_key,
                &merchant.account_id,
                &self.config.treasury_account,
                &self.config.platform_token,
                request.amount,
                fee,
            )
            .await?;

        let transaction = match self
            .records
            .record_transaction(NewTransaction {
                user_id: payer.id,
                merchant_id: merchant.id,
                shop_id: shop.id,
                amount: request.amount,
                fee,
            })
            .await
        {
            Ok(transaction) => transaction,
            Err(e) => {
                return Err(SettlementError::PartialSettlement {
                    detail: format!("both ledger legs settled but the local record failed: {}", e),
                    receipts: vec![legs.principal, legs.fee],
                })
            }
        };
        tracing::info!(
            transaction_id = %transaction.id,
            payer = %payer.id,
            merchant = %merchant.id,
            amount = %transaction.amount,
            fee = %transaction.fee,
            "payment settled"
        );

        self.notifier
            .notify(&merchant.topic_id, EventKind::PaymentReceived);

        Ok(SettlementOutcome {
            transaction,
            principal: legs.principal,
            fee: legs.fee,
        })
    }

    /// Join a campaign: local bookkeeping first (atomic), then the
    /// campaign-token transfer, then notifications.
    pub async fn join_campaign(
        &self,
        caller: &Identity,
        request: CampaignRequest,
    ) -> Result<CampaignOutcome, SettlementError> {
        let user = Self::require_user(caller)?;
        let (campaign, entry) = self
            .campaigns
            .join(user, request.campaign_id, request.token_balance)
            .await?;

        let transfer = self
            .distribute_campaign_tokens(user, &campaign, request.token_balance)
            .await?;

        self.notifier
            .notify(&user.topic_id, EventKind::CampaignJoined);
        match self.merchant_topic_for(&campaign).await {
            Ok(topic) => self.notifier.notify(&topic, EventKind::ParticipantJoined),
            Err(e) => {
                tracing::warn!(campaign_id = %campaign.id, error = %e, "merchant topic unresolved")
            }
        }

        Ok(CampaignOutcome {
            campaign_id: campaign.id,
            entry,
            transfer,
        })
    }

    /// Top up an existing campaign entry.
    pub async fn update_campaign_entry(
        &self,
        caller: &Identity,
        request: CampaignRequest,
    ) -> Result<CampaignOutcome, SettlementError> {
        let user = Self::require_user(caller)?;
        let (campaign, entry) = self
            .campaigns
            .update(user, request.campaign_id, request.token_balance)
            .await?;

        let transfer = self
            .distribute_campaign_tokens(user, &campaign, request.token_balance)
            .await?;

        self.notifier.notify(&user.topic_id, EventKind::EntryUpdated);

        Ok(CampaignOutcome {
            campaign_id: campaign.id,
            entry,
            transfer,
        })
    }

    /// Mark a campaign ended and acknowledge immediately; participant
    /// notification fans out on a detached task.
    pub async fn close_campaign(
        &self,
        caller: &Identity,
        campaign_id: Uuid,
    ) -> Result<Campaign, SettlementError> {
        let merchant = Self::require_merchant(caller)?;
        let campaign = self.campaigns.get(campaign_id).await?;
        let shop = self
            .identities
            .shop(campaign.shop_id)
            .await?
            .ok_or(SettlementError::NotFound("shop"))?;
        if shop.merchant_id != merchant.id {
            return Err(SettlementError::Unauthorized);
        }

        let campaign = self.campaigns.close(campaign_id).await?;

        let campaigns = self.campaigns.clone();
        let identities = Arc::clone(&self.identities);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            airdrop_participants(campaigns, identities, notifier, campaign_id).await;
        });

        Ok(campaign)
    }

    /// Run the close-campaign fan-out to completion. `close_campaign`
    /// spawns exactly this; callers that need determinism await it
    /// directly.
    pub async fn notify_campaign_ended(&self, campaign_id: Uuid) {
        airdrop_participants(
            self.campaigns.clone(),
            Arc::clone(&self.identities),
            Arc::clone(&self.notifier),
            campaign_id,
        )
        .await;
    }

    /// User top-up: treasury sends platform tokens, then the purchase is
    /// recorded.
    pub async fn buy_token(
        &self,
        caller: &Identity,
        amount: Amount,
    ) -> Result<(Purchase, TransferReceipt), SettlementError> {
        let user = Self::require_user(caller)?;
        if amount.is_zero() {
            return Err(SettlementError::Validation("amount must be positive".into()));
        }

        let transfer = self
            .transfers
            .single(
                &self.config.treasury_account,
                &self.treasury_key,
                &user.account_id,
                &self.config.platform_token,
                amount,
            )
            .await?;

        let purchase = match self
            .records
            .record_purchase(NewPurchase {
                user_id: user.id,
                amount,
            })
            .await
        {
            Ok(purchase) => purchase,
            Err(e) => {
                return Err(SettlementError::PartialSettlement {
                    detail: format!("token transfer settled but the purchase record failed: {}", e),
                    receipts: vec![transfer],
                })
            }
        };

        self.notifier
            .notify(&user.topic_id, EventKind::TokenPurchased);
        Ok((purchase, transfer))
    }

    /// Merchant cash-out bookkeeping. Off-ramp settlement happens on a
    /// separate rail; no ledger funds move here.
    pub async fn withdraw(
        &self,
        caller: &Identity,
        request: WithdrawRequest,
    ) -> Result<Withdrawal, SettlementError> {
        let merchant = Self::require_merchant(caller)?;
        if request.amount.is_zero() {
            return Err(SettlementError::Validation("amount must be positive".into()));
        }
        if request.receiver.as_str().is_empty() {
            return Err(SettlementError::Validation("receiver is required".into()));
        }

        let withdrawal = self
            .records
            .record_withdrawal(NewWithdrawal {
                merchant_id: merchant.id,
                amount: request.amount,
                fee: Amount::ZERO,
                receiver: request.receiver,
            })
            .await?;

        self.notifier
            .notify(&merchant.topic_id, EventKind::WithdrawalCompleted);
        Ok(withdrawal)
    }

    /// Campaign tokens flow from the treasury, signed by the treasury key.
    /// The local entry has already committed; a failure here is a partial
    /// state (tokens owed but not sent), surfaced as such.
    async fn distribute_campaign_tokens(
        &self,
        user: &User,
        campaign: &Campaign,
        token_balance: u64,
    ) -> Result<TransferReceipt, SettlementError> {
        self.transfers
            .single(
                &self.config.treasury_account,
                &self.treasury_key,
                &user.account_id,
                &campaign.token_id,
                Amount::new(token_balance),
            )
            .await
            .map_err(|e| {
                let receipts = match &e {
                    SettlementError::PartialSettlement { receipts, .. } => receipts.clone(),
                    _ => Vec::new(),
                };
                SettlementError::PartialSettlement {
                    detail: format!(
                        "campaign entry committed but the token transfer failed: {}",
                        e
                    ),
                    receipts,
                }
            })
    }

    async fn merchant_topic_for(&self, campaign: &Campaign) -> Result<TopicId, SettlementError> {
        let shop = self
            .identities
            .shop(campaign.shop_id)
            .await?
            .ok_or(SettlementError::NotFound("shop"))?;
        let merchant = self
            .identities
            .merchant(shop.merchant_id)
            .await?
            .ok_or(SettlementError::NotFound("merchant"))?;
        Ok(merchant.topic_id)
    }

    fn require_user(caller: &Identity) -> Result<&User, SettlementError> {
        match caller {
            Identity::User(user) => Ok(user),
            _ => Err(SettlementError::Unauthorized),
        }
    }

    fn require_merchant(caller: &Identity) -> Result<&Merchant, SettlementError> {
        match caller {
            Identity::Merchant(merchant) => Ok(merchant),
            _ => Err(SettlementError::Unauthorized),
        }
    }
}

/// Notify every participant of an ended campaign. One participant failing
/// to resolve never stops the rest; publish failures are the notifier's
/// concern.
async fn airdrop_participants(
    campaigns: CampaignLedger,
    identities: Arc<dyn IIdentityStore>,
    notifier: Arc<Notifier>,
    campaign_id: Uuid,
) {
    let entries = match campaigns.participants(campaign_id).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(campaign_id = %campaign_id, error = %e, "airdrop fan-out aborted");
            return;
        }
    };
    tracing::info!(
        campaign_id = %campaign_id,
        participants = entries.len(),
        "campaign airdrop fan-out"
    );
    for entry in entries {
        match identities.user(entry.user_id).await {
            Ok(Some(user)) => notifier.notify(&user.topic_id, EventKind::CampaignAirdrop),
            Ok(None) => {
                tracing::warn!(user_id = %entry.user_id, "campaign participant no longer exists")
            }
            Err(e) => {
                tracing::warn!(user_id = %entry.user_id, error = %e, "participant lookup failed")
            }
        }
    }
}
