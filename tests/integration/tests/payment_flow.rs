//! End-to-end payment settlement: balance check, dual-leg transfer, record,
//! notification.

use std::sync::Arc;

use pesa_core::{Amount, Identity, RecordStatus};
use pesa_integration_tests::{FailingRecords, TestWorld};
use pesa_settlement::{ILedger, NotificationMessage, PaymentRequest, SettlementError};
use uuid::Uuid;

#[tokio::test]
async fn test_pay_merchant_end_to_end() {
    let world = TestWorld::new();
    let user = world.funded_user("wanjiru", 10_000);
    let (merchant, shop) = world.merchant_with_shop("duka-lah");

    let outcome = world
        .engine
        .pay_merchant(
            &Identity::User(user.clone()),
            PaymentRequest {
                shop_id: shop.id,
                merchant_id: merchant.id,
                amount: Amount::new(1_000),
            },
        )
        .await
        .unwrap();

    // One row, amount and fee as computed once.
    assert_eq!(outcome.transaction.amount, Amount::new(1_000));
    assert_eq!(outcome.transaction.fee, Amount::new(5));
    assert_eq!(outcome.transaction.status, RecordStatus::Completed);
    assert_eq!(world.store.transaction_count(), 1);

    // Principal then fee, to the right accounts.
    let submitted = world.ledger.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].to, merchant.account_id);
    assert_eq!(submitted[0].amount, Amount::new(1_000));
    assert_eq!(submitted[1].to, world.config.treasury_account);
    assert_eq!(submitted[1].amount, Amount::new(5));

    // Ledger balances moved: 10_000 - 1_000 - 5.
    let payer_balance = world
        .ledger
        .balance(&user.account_id, &world.config.platform_token)
        .await
        .unwrap();
    assert_eq!(payer_balance, 8_995);

    // Exactly one notification, on the payee's topic.
    world.notifier.drained().await;
    let published = world.topics.published(&merchant.topic_id);
    assert_eq!(published.len(), 1);
    let message: NotificationMessage = serde_json::from_slice(&published[0]).unwrap();
    assert_eq!(message.kind, "transaction");
    assert_eq!(message.message_content, "Payment received");
    assert_eq!(world.topics.total_published(), 1);
}

#[tokio::test]
async fn test_insufficient_balance_aborts_before_any_submission() {
    let world = TestWorld::new();
    let user = world.funded_user("wanjiru", 500);
    let (merchant, shop) = world.merchant_with_shop("duka-lah");

    let result = world
        .engine
        .pay_merchant(
            &Identity::User(user),
            PaymentRequest {
                shop_id: shop.id,
                merchant_id: merchant.id,
                amount: Amount::new(1_000),
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(SettlementError::InsufficientFunds {
            available: 500,
            required: 1_005
        })
    ));
    // Nothing submitted, nothing recorded, nothing published.
    assert_eq!(world.ledger.submitted_count(), 0);
    assert_eq!(world.store.transaction_count(), 0);
    world.notifier.drained().await;
    assert_eq!(world.topics.total_published(), 0);
}

#[tokio::test]
async fn test_anonymous_caller_is_unauthorized() {
    let world = TestWorld::new();
    let (merchant, shop) = world.merchant_with_shop("duka-lah");

    let result = world
        .engine
        .pay_merchant(
            &Identity::Anonymous,
            PaymentRequest {
                shop_id: shop.id,
                merchant_id: merchant.id,
                amount: Amount::new(1_000),
            },
        )
        .await;
    assert!(matches!(result, Err(SettlementError::Unauthorized)));
    assert_eq!(world.ledger.submitted_count(), 0);
}

#[tokio::test]
async fn test_merchant_cannot_act_as_payer() {
    let world = TestWorld::new();
    let (merchant, shop) = world.merchant_with_shop("duka-lah");

    let result = world
        .engine
        .pay_merchant(
            &Identity::Merchant(merchant.clone()),
            PaymentRequest {
                shop_id: shop.id,
                merchant_id: merchant.id,
                amount: Amount::new(1_000),
            },
        )
        .await;
    assert!(matches!(result, Err(SettlementError::Unauthorized)));
}

#[tokio::test]
async fn test_unknown_merchant_is_not_found() {
    let world = TestWorld::new();
    let user = world.funded_user("wanjiru", 10_000);

    let result = world
        .engine
        .pay_merchant(
            &Identity::User(user),
            PaymentRequest {
                shop_id: Uuid::now_v7(),
                merchant_id: Uuid::now_v7(),
                amount: Amount::new(1_000),
            },
        )
        .await;
    assert!(matches!(result, Err(SettlementError::NotFound("merchant"))));
}

#[tokio::test]
async fn test_shop_owned_by_other_merchant_is_rejected() {
    let world = TestWorld::new();
    let user = world.funded_user("wanjiru", 10_000);
    let (merchant, _) = world.merchant_with_shop("duka-lah");
    let (_, other_shop) = world.merchant_with_shop("mama-mboga");

    let result = world
        .engine
        .pay_merchant(
            &Identity::User(user),
            PaymentRequest {
                shop_id: other_shop.id,
                merchant_id: merchant.id,
                amount: Amount::new(1_000),
            },
        )
        .await;
    assert!(matches!(result, Err(SettlementError::Validation(_))));
    assert_eq!(world.ledger.submitted_count(), 0);
}

#[tokio::test]
async fn test_zero_amount_is_rejected() {
    let world = TestWorld::new();
    let user = world.funded_user("wanjiru", 10_000);
    let (merchant, shop) = world.merchant_with_shop("duka-lah");

    let result = world
        .engine
        .pay_merchant(
            &Identity::User(user),
            PaymentRequest {
                shop_id: shop.id,
                merchant_id: merchant.id,
                amount: Amount::ZERO,
            },
        )
        .await;
    assert!(matches!(result, Err(SettlementError::Validation(_))));
}

#[tokio::test]
async fn test_record_failure_after_both_legs_is_partial_settlement() {
    let world = TestWorld::with_records(Arc::new(FailingRecords));
    let user = world.funded_user("wanjiru", 10_000);
    let (merchant, shop) = world.merchant_with_shop("duka-lah");

    let result = world
        .engine
        .pay_merchant(
            &Identity::User(user.clone()),
            PaymentRequest {
                shop_id: shop.id,
                merchant_id: merchant.id,
                amount: Amount::new(1_000),
            },
        )
        .await;

    match result {
        Err(SettlementError::PartialSettlement { detail, receipts }) => {
            assert_eq!(receipts.len(), 2);
            assert!(detail.contains("local record failed"));
        }
        other => panic!("expected PartialSettlement, got {:?}", other.map(|_| ())),
    }

    // The money really moved: this is the documented unreconciled window.
    assert_eq!(world.ledger.submitted_count(), 2);
    let payer_balance = world
        .ledger
        .balance(&user.account_id, &world.config.platform_token)
        .await
        .unwrap();
    assert_eq!(payer_balance, 8_995);
}

#[tokio::test]
async fn test_fee_exempt_payment_settles_with_zero_fee_leg() {
    let world = TestWorld::new();
    let user = world.funded_user("wanjiru", 10_000);
    let (merchant, shop) = world.merchant_with_shop("duka-lah");

    let outcome = world
        .engine
        .pay_merchant(
            &Identity::User(user),
            PaymentRequest {
                shop_id: shop.id,
                merchant_id: merchant.id,
                amount: Amount::new(100),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.transaction.fee, Amount::ZERO);
    // Both legs submitted; the fee leg carries zero.
    let submitted = world.ledger.submitted();
    assert_eq!(submitted.len(), 2);
    assert!(submitted[1].amount.is_zero());
}
