//! Integration tests for PaymentRepository.
//!
//! Covers intent creation against the mock gateway and idempotent webhook
//! reconciliation under repeated and concurrent delivery.

#![allow(clippy::uninlined_format_args)]

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

use common::{Fixture, setup};
use groupbuy_core::access::Identity;
use groupbuy_core::group::{GroupStatus, OfferType};
use groupbuy_core::negotiation::OfferInput;
use groupbuy_core::payment::{
    GatewayEvent, GatewayEventKind, IntentInput, MockPaymentGateway, PaymentError,
    TransactionStatus, TransactionType,
};
use groupbuy_db::entities::{
    activity_logs, group_members, group_milestones, groups,
    sea_orm_active_enums::{
        CommitmentStatus, MilestoneType, TransactionStatus as DbTransactionStatus,
    },
    transactions,
};
use groupbuy_db::repositories::WebhookOutcome;
use groupbuy_db::{GroupRepository, MembershipRepository, NegotiationRepository};

fn succeeded(intent_id: &str) -> GatewayEvent {
    GatewayEvent {
        id: format!("evt_{}", Uuid::new_v4().simple()),
        kind: GatewayEventKind::IntentSucceeded,
        intent_id: intent_id.to_string(),
        charge_id: Some("ch_test_1".to_string()),
        failure_message: None,
    }
}

fn failed(intent_id: &str) -> GatewayEvent {
    GatewayEvent {
        id: format!("evt_{}", Uuid::new_v4().simple()),
        kind: GatewayEventKind::IntentFailed,
        intent_id: intent_id.to_string(),
        charge_id: None,
        failure_message: Some("card_declined".to_string()),
    }
}

fn intent_input(group_id: Uuid) -> IntentInput {
    IntentInput {
        group_id,
        amount: dec!(25000),
        transaction_type: TransactionType::CommitmentFee,
    }
}

async fn member_status(db: &DatabaseConnection, group_id: Uuid, buyer: &Identity) -> CommitmentStatus {
    group_members::Entity::find()
        .filter(group_members::Column::GroupId.eq(group_id))
        .filter(group_members::Column::UserId.eq(buyer.user_id))
        .one(db)
        .await
        .expect("load member")
        .expect("member exists")
        .commitment_status
}

async fn payment_milestones(db: &DatabaseConnection, group_id: Uuid) -> u64 {
    group_milestones::Entity::find()
        .filter(group_milestones::Column::GroupId.eq(group_id))
        .filter(group_milestones::Column::MilestoneType.eq(MilestoneType::PaymentReceived))
        .count(db)
        .await
        .expect("count milestones")
}

/// A negotiating group with one joined buyer.
async fn negotiating_group_with_buyer(
    db: &DatabaseConnection,
    fixture: &Fixture,
) -> (groups::Model, Identity) {
    let group = fixture.group(db, 2).await;
    let buyer = fixture.buyer(db, "Asha").await;
    MembershipRepository::new(db.clone())
        .join(&buyer, group.id)
        .await
        .expect("join");
    let group = GroupRepository::new(db.clone())
        .start_negotiation(&fixture.organizer, group.id)
        .await
        .expect("start negotiation");
    (group, buyer)
}

#[tokio::test]
async fn test_create_intent_persists_pending_transaction() {
    let Some(db) = setup().await else { return };
    let fixture = Fixture::new(&db).await;
    let (group, buyer) = negotiating_group_with_buyer(&db, &fixture).await;
    let gateway = Arc::new(MockPaymentGateway::new());
    let repo = Fixture::payments(&db, gateway.clone());

    let created = repo
        .create_intent(&buyer, intent_input(group.id))
        .await
        .expect("create intent");

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount_minor, 2_500_000);
    assert_eq!(requests[0].currency, "inr");
    assert_eq!(
        requests[0].description,
        "COMMITMENT_FEE for Skyline Residences"
    );
    assert_eq!(requests[0].idempotency_key, created.transaction_id.to_string());

    let stored = transactions::Entity::find_by_id(created.transaction_id)
        .one(&db)
        .await
        .expect("load")
        .expect("transaction stored");
    assert_eq!(stored.status, DbTransactionStatus::Pending);
    assert_eq!(stored.gateway_intent_id, created.intent_id);
    assert_eq!(stored.amount, 2_500_000);
    assert_eq!(stored.currency, "INR");

    let own = repo
        .get_transaction(&buyer, created.transaction_id)
        .await
        .expect("own transaction");
    assert_eq!(own.id, created.transaction_id);

    let other = fixture.buyer(&db, "Bilal").await;
    let err = repo
        .get_transaction(&other, created.transaction_id)
        .await
        .unwrap_err();
    assert_eq!(err, PaymentError::TransactionNotFound(created.transaction_id));

    repo.get_transaction(&fixture.admin, created.transaction_id)
        .await
        .expect("admin sees tenant transactions");

    fixture.cleanup(&db).await;
}

#[tokio::test]
async fn test_create_intent_rejects_open_group_and_non_members() {
    let Some(db) = setup().await else { return };
    let fixture = Fixture::new(&db).await;
    let gateway = Arc::new(MockPaymentGateway::new());
    let repo = Fixture::payments(&db, gateway.clone());

    let open = fixture.group(&db, 2).await;
    let buyer = fixture.buyer(&db, "Asha").await;
    MembershipRepository::new(db.clone())
        .join(&buyer, open.id)
        .await
        .expect("join");
    let err = repo
        .create_intent(&buyer, intent_input(open.id))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PaymentError::InvalidState {
            status: GroupStatus::Open
        }
    );

    let (group, _) = negotiating_group_with_buyer(&db, &fixture).await;
    let outsider = fixture.buyer(&db, "Outsider").await;
    let err = repo
        .create_intent(&outsider, intent_input(group.id))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NotAMember { .. }));

    assert_eq!(gateway.call_count(), 0);
    fixture.cleanup(&db).await;
}

#[tokio::test]
async fn test_create_intent_on_lapsed_deadline_expires_group() {
    let Some(db) = setup().await else { return };
    let fixture = Fixture::new(&db).await;
    let (group, buyer) = negotiating_group_with_buyer(&db, &fixture).await;
    let gateway = Arc::new(MockPaymentGateway::new());
    let repo = Fixture::payments(&db, gateway.clone());

    let mut active = group.clone().into_active_model();
    active.deadline = Set(Some((Utc::now() - Duration::minutes(1)).into()));
    active.update(&db).await.expect("backdate deadline");

    let err = repo
        .create_intent(&buyer, intent_input(group.id))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PaymentError::InvalidState {
            status: GroupStatus::Expired
        }
    );
    assert_eq!(gateway.call_count(), 0);

    let stored = groups::Entity::find_by_id(group.id)
        .one(&db)
        .await
        .expect("load group")
        .expect("group exists");
    assert_eq!(GroupStatus::from(stored.status), GroupStatus::Expired);

    let pending = transactions::Entity::find()
        .filter(transactions::Column::GroupId.eq(group.id))
        .count(&db)
        .await
        .expect("count transactions");
    assert_eq!(pending, 0);

    fixture.cleanup(&db).await;
}

#[tokio::test]
async fn test_gateway_timeout_persists_nothing() {
    let Some(db) = setup().await else { return };
    let fixture = Fixture::new(&db).await;
    let (group, buyer) = negotiating_group_with_buyer(&db, &fixture).await;
    let repo = Fixture::payments(&db, Arc::new(MockPaymentGateway::timing_out()));

    let err = repo
        .create_intent(&buyer, intent_input(group.id))
        .await
        .unwrap_err();
    assert_eq!(err, PaymentError::GatewayTimeout);

    let count = transactions::Entity::find()
        .filter(transactions::Column::TenantId.eq(fixture.tenant_id))
        .count(&db)
        .await
        .expect("count");
    assert_eq!(count, 0);

    fixture.cleanup(&db).await;
}

#[tokio::test]
async fn test_duplicate_success_webhook_is_noop() {
    let Some(db) = setup().await else { return };
    let fixture = Fixture::new(&db).await;
    let (group, buyer) = negotiating_group_with_buyer(&db, &fixture).await;
    let repo = Fixture::payments(&db, Arc::new(MockPaymentGateway::new()));

    let created = repo
        .create_intent(&buyer, intent_input(group.id))
        .await
        .expect("create intent");
    let event = succeeded(&created.intent_id);

    let first = repo.handle_webhook_event(&event).await.expect("first");
    assert_eq!(
        first,
        WebhookOutcome::Applied {
            transaction_id: created.transaction_id,
            status: TransactionStatus::Completed,
        }
    );
    let second = repo.handle_webhook_event(&event).await.expect("second");
    assert_eq!(
        second,
        WebhookOutcome::Duplicate {
            transaction_id: created.transaction_id,
            status: TransactionStatus::Completed,
        }
    );

    let stored = transactions::Entity::find_by_id(created.transaction_id)
        .one(&db)
        .await
        .expect("load")
        .expect("exists");
    assert_eq!(stored.status, DbTransactionStatus::Completed);
    assert_eq!(stored.gateway_charge_id.as_deref(), Some("ch_test_1"));

    assert_eq!(member_status(&db, group.id, &buyer).await, CommitmentStatus::Paid);
    assert_eq!(payment_milestones(&db, group.id).await, 1);

    let audit = activity_logs::Entity::find()
        .filter(activity_logs::Column::EntityId.eq(created.transaction_id))
        .all(&db)
        .await
        .expect("activity");
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "PAYMENT_COMPLETED");
    let metadata = audit[0].metadata.clone().expect("metadata");
    assert_eq!(metadata["paymentIntentId"], created.intent_id.as_str());

    fixture.cleanup(&db).await;
}

#[tokio::test]
async fn test_concurrent_duplicate_deliveries_apply_once() {
    let Some(db) = setup().await else { return };
    let fixture = Fixture::new(&db).await;
    let (group, buyer) = negotiating_group_with_buyer(&db, &fixture).await;
    let repo = Fixture::payments(&db, Arc::new(MockPaymentGateway::new()));

    let created = repo
        .create_intent(&buyer, intent_input(group.id))
        .await
        .expect("create intent");
    let event = succeeded(&created.intent_id);

    let outcomes = join_all((0..8).map(|_| {
        let repo = repo.clone();
        let event = event.clone();
        async move { repo.handle_webhook_event(&event).await }
    }))
    .await;

    let applied = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(WebhookOutcome::Applied { .. })))
        .count();
    let duplicates = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(WebhookOutcome::Duplicate { .. })))
        .count();
    assert_eq!(applied, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(payment_milestones(&db, group.id).await, 1);

    fixture.cleanup(&db).await;
}

#[tokio::test]
async fn test_failed_webhook_leaves_member_unpaid() {
    let Some(db) = setup().await else { return };
    let fixture = Fixture::new(&db).await;
    let (group, buyer) = negotiating_group_with_buyer(&db, &fixture).await;
    let repo = Fixture::payments(&db, Arc::new(MockPaymentGateway::new()));

    let created = repo
        .create_intent(&buyer, intent_input(group.id))
        .await
        .expect("create intent");

    let outcome = repo
        .handle_webhook_event(&failed(&created.intent_id))
        .await
        .expect("failed event");
    assert!(matches!(
        outcome,
        WebhookOutcome::Applied {
            status: TransactionStatus::Failed,
            ..
        }
    ));

    // A late success after failure is acknowledged without effect.
    let late = repo
        .handle_webhook_event(&succeeded(&created.intent_id))
        .await
        .expect("late success");
    assert!(matches!(late, WebhookOutcome::Duplicate { .. }));

    let stored = transactions::Entity::find_by_id(created.transaction_id)
        .one(&db)
        .await
        .expect("load")
        .expect("exists");
    assert_eq!(stored.status, DbTransactionStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some("card_declined"));
    assert_eq!(
        member_status(&db, group.id, &buyer).await,
        CommitmentStatus::Interested
    );
    assert_eq!(payment_milestones(&db, group.id).await, 0);

    fixture.cleanup(&db).await;
}

#[tokio::test]
async fn test_unknown_intent_is_acknowledged() {
    let Some(db) = setup().await else { return };
    let repo = Fixture::payments(&db, Arc::new(MockPaymentGateway::new()));

    let outcome = repo
        .handle_webhook_event(&succeeded(&format!("pi_unknown_{}", Uuid::new_v4().simple())))
        .await
        .expect("unknown intent");
    assert_eq!(outcome, WebhookOutcome::UnknownIntent);
}

/// Two buyers fill a group, the organizer negotiates a 5.5% discount, and a
/// buyer's payment is reconciled exactly once.
#[tokio::test]
async fn test_full_group_purchase_scenario() {
    let Some(db) = setup().await else { return };
    let fixture = Fixture::new(&db).await;
    let groups_repo = GroupRepository::new(db.clone());
    let members = MembershipRepository::new(db.clone());
    let negotiation = NegotiationRepository::new(db.clone());
    let payments = Fixture::payments(&db, Arc::new(MockPaymentGateway::new()));

    let group = fixture.group(&db, 2).await;
    let a = fixture.buyer(&db, "Asha").await;
    let b = fixture.buyer(&db, "Bilal").await;

    members.join(&a, group.id).await.expect("a joins");
    let detail = groups_repo
        .get_group_detail(&a, group.id)
        .await
        .expect("detail");
    assert_eq!(detail.group.current_buyers_count, 1);
    assert_eq!(GroupStatus::from(detail.group.status), GroupStatus::Open);

    members.join(&b, group.id).await.expect("b joins");
    let detail = groups_repo
        .get_group_detail(&a, group.id)
        .await
        .expect("detail");
    assert_eq!(detail.group.current_buyers_count, 2);
    assert_eq!(GroupStatus::from(detail.group.status), GroupStatus::Open);

    let started = groups_repo
        .start_negotiation(&fixture.organizer, group.id)
        .await
        .expect("start");
    assert_eq!(GroupStatus::from(started.status), GroupStatus::Negotiating);

    let offer = negotiation
        .record_offer(
            &fixture.organizer,
            group.id,
            OfferInput {
                offer_type: OfferType::Initial,
                discount_percent: dec!(5.5),
                min_buyers: 2,
                notes: Some("Bulk rate for two units".to_string()),
            },
        )
        .await
        .expect("offer");
    let accepted = negotiation
        .accept_offer(&fixture.organizer, group.id, offer.id)
        .await
        .expect("accept");
    assert_eq!(
        GroupStatus::from(accepted.group.status),
        GroupStatus::OfferAccepted
    );
    assert_eq!(accepted.group.negotiated_discount, Some(dec!(5.5)));

    let intent = payments
        .create_intent(&a, intent_input(group.id))
        .await
        .expect("intent");
    let event = succeeded(&intent.intent_id);
    payments.handle_webhook_event(&event).await.expect("paid");
    assert_eq!(member_status(&db, group.id, &a).await, CommitmentStatus::Paid);

    let before = groups_repo
        .get_group_detail(&a, group.id)
        .await
        .expect("detail");
    payments.handle_webhook_event(&event).await.expect("duplicate");
    let after = groups_repo
        .get_group_detail(&a, group.id)
        .await
        .expect("detail");

    assert_eq!(before.members, after.members);
    assert_eq!(before.milestones.len(), after.milestones.len());
    assert_eq!(member_status(&db, group.id, &b).await, CommitmentStatus::Interested);

    let kinds: Vec<MilestoneType> = after.milestones.iter().map(|m| m.milestone_type).collect();
    assert_eq!(
        kinds,
        vec![
            MilestoneType::GroupCreated,
            MilestoneType::MemberJoined,
            MilestoneType::MemberJoined,
            MilestoneType::TargetReached,
            MilestoneType::NegotiationStarted,
            MilestoneType::OfferReceived,
            MilestoneType::OfferAccepted,
            MilestoneType::PaymentReceived,
        ]
    );

    fixture.cleanup(&db).await;
}
