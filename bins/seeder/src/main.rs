//! Database seeder for Groupbuy development and testing.
//!
//! Seeds two tenants with users and projects, then drives a handful of
//! groups through the repositories so members, offers, payments and
//! timelines are consistent with what the API would have produced.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use groupbuy_core::access::{Identity, Role};
use groupbuy_core::group::{NewGroup, OfferType};
use groupbuy_core::negotiation::OfferInput;
use groupbuy_core::payment::{
    GatewayEvent, GatewayEventKind, IntentInput, MockPaymentGateway, TransactionType,
};
use groupbuy_db::entities::{projects, sea_orm_active_enums::UserRole, tenants, users};
use groupbuy_db::{
    GroupRepository, MembershipRepository, NegotiationRepository, PaymentRepository,
};
use groupbuy_shared::types::Currency;
use groupbuy_shared::{AppConfig, JwtConfig, JwtService};

/// Marketplace tenant ID (consistent for all seeds)
const MARKETPLACE_TENANT_ID: Uuid = Uuid::from_u128(1);
/// Partner tenant ID
const PARTNER_TENANT_ID: Uuid = Uuid::from_u128(2);

struct Users {
    organizer: Identity,
    buyer1: Identity,
    buyer2: Identity,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("GROUPBUY__DATABASE__URL"))
        .context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = groupbuy_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    if tenants::Entity::find_by_id(MARKETPLACE_TENANT_ID)
        .one(&db)
        .await?
        .is_some()
    {
        println!("Seed data already present, skipping.");
        return Ok(());
    }

    println!("Seeding tenants...");
    seed_tenant(&db, MARKETPLACE_TENANT_ID, "RealEstate Marketplace", "realestate-marketplace").await?;
    seed_tenant(&db, PARTNER_TENANT_ID, "Property Partners", "property-partners").await?;

    println!("Seeding users...");
    seed_user(&db, PARTNER_TENANT_ID, "admin@property-partners.com", "Partner Admin", Role::PartnerAdmin).await?;
    seed_user(&db, MARKETPLACE_TENANT_ID, "admin@realestate-marketplace.com", "Admin User", Role::PartnerAdmin).await?;
    let users = Users {
        organizer: seed_user(
            &db,
            MARKETPLACE_TENANT_ID,
            "organizer@realestate-marketplace.com",
            "Group Organizer",
            Role::Organizer,
        )
        .await?,
        buyer1: seed_user(&db, MARKETPLACE_TENANT_ID, "buyer1@example.com", "Amit Kumar", Role::Buyer).await?,
        buyer2: seed_user(&db, MARKETPLACE_TENANT_ID, "buyer2@example.com", "Priya Sharma", Role::Buyer).await?,
    };

    println!("Seeding projects...");
    let skyline = seed_project(&db, "Skyline Towers", "Skyline Constructions Ltd", "Bandra West").await?;
    let green_valley = seed_project(&db, "Green Valley Villas", "Green Valley Developers", "Whitefield").await?;
    let urban_edge = seed_project(&db, "Urban Edge Apartments", "Urban Developers Pvt Ltd", "Hinjewadi").await?;
    let seaside = seed_project(&db, "Seaside Residency", "Coastal Properties Ltd", "Candolim").await?;

    println!("Seeding groups...");
    seed_groups(&db, &users, [skyline, green_valley, urban_edge, seaside]).await?;

    match AppConfig::load() {
        Ok(config) => print_dev_tokens(&JwtService::new(JwtConfig::from(&config.jwt)), &users)?,
        Err(e) => println!("Skipping development tokens: {e}"),
    }

    println!("Seeding complete!");
    Ok(())
}

fn print_dev_tokens(jwt: &JwtService, users: &Users) -> anyhow::Result<()> {
    println!("Development tokens:");
    for identity in [&users.organizer, &users.buyer1, &users.buyer2] {
        let token = jwt
            .issue_dev_token(
                identity.user_id,
                identity.tenant_id,
                identity.role.as_str(),
                identity.display_name.as_deref(),
            )
            .context("Failed to sign development token")?;
        println!(
            "  {} ({}): Bearer {token}",
            identity.display_name.as_deref().unwrap_or("-"),
            identity.role.as_str()
        );
    }
    Ok(())
}

async fn seed_tenant(
    db: &DatabaseConnection,
    id: Uuid,
    name: &str,
    slug: &str,
) -> anyhow::Result<()> {
    let now = Utc::now();
    tenants::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .with_context(|| format!("Failed to insert tenant {slug}"))?;
    println!("  Created tenant: {name}");
    Ok(())
}

async fn seed_user(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    email: &str,
    name: &str,
    role: Role,
) -> anyhow::Result<Identity> {
    let now = Utc::now();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        email: Set(email.to_string()),
        name: Set(Some(name.to_string())),
        role: Set(UserRole::from(role)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .with_context(|| format!("Failed to insert user {email}"))?;
    println!("  Created user: {email} ({})", role.as_str());

    let mut identity = Identity::new(user.id, tenant_id, role);
    identity.display_name = Some(name.to_string());
    Ok(identity)
}

async fn seed_project(
    db: &DatabaseConnection,
    name: &str,
    developer: &str,
    location: &str,
) -> anyhow::Result<Uuid> {
    let now = Utc::now();
    let project = projects::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(MARKETPLACE_TENANT_ID),
        name: Set(name.to_string()),
        developer_name: Set(Some(developer.to_string())),
        location: Set(Some(location.to_string())),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .with_context(|| format!("Failed to insert project {name}"))?;
    println!("  Created project: {name}");
    Ok(project.id)
}

fn new_group(
    project_id: Uuid,
    name: &str,
    description: Option<&str>,
    target: i32,
    commitment: i64,
) -> NewGroup {
    NewGroup {
        project_id,
        name: name.to_string(),
        description: description.map(str::to_string),
        target_buyers_count: target,
        commitment_amount: Some(Decimal::from(commitment)),
        deadline: Some(Utc::now() + Duration::days(60)),
    }
}

async fn seed_groups(
    db: &DatabaseConnection,
    users: &Users,
    [skyline, green_valley, urban_edge, seaside]: [Uuid; 4],
) -> anyhow::Result<()> {
    let groups = GroupRepository::new(db.clone());
    let members = MembershipRepository::new(db.clone());
    let negotiations = NegotiationRepository::new(db.clone());
    let payments = PaymentRepository::new(
        db.clone(),
        Arc::new(MockPaymentGateway::new()),
        Currency::Inr,
    );
    let organizer = &users.organizer;

    let early_birds = groups
        .create_group(
            organizer,
            new_group(skyline, "Skyline Early Birds", None, 20, 100_000),
        )
        .await?;
    members.join(&users.buyer1, early_birds.id).await?;
    members.commit(&users.buyer1, early_birds.id).await?;
    members.join(&users.buyer2, early_birds.id).await?;
    println!("  Created group: {} (2 members)", early_birds.name);

    let families = groups
        .create_group(
            organizer,
            new_group(
                green_valley,
                "Green Valley Families",
                Some("Families coming together to buy eco-friendly villas at discounted rates"),
                15,
                50_000,
            ),
        )
        .await?;
    members.join(&users.buyer1, families.id).await?;
    groups.start_negotiation(organizer, families.id).await?;
    for (offer_type, discount, notes) in [
        (OfferType::Initial, Decimal::new(30, 1), "Initial developer offer"),
        (OfferType::Counter, Decimal::new(55, 1), "Counter offer after group pushback"),
    ] {
        negotiations
            .record_offer(
                organizer,
                families.id,
                OfferInput {
                    offer_type,
                    discount_percent: discount,
                    min_buyers: 10,
                    notes: Some(notes.to_string()),
                },
            )
            .await?;
    }

    let intent = payments
        .create_intent(
            &users.buyer1,
            IntentInput {
                group_id: families.id,
                amount: Decimal::from(50_000),
                transaction_type: TransactionType::CommitmentFee,
            },
        )
        .await?;
    payments
        .handle_webhook_event(&GatewayEvent {
            id: format!("evt_seed_{}", intent.transaction_id.simple()),
            kind: GatewayEventKind::IntentSucceeded,
            intent_id: intent.intent_id.clone(),
            charge_id: Some("ch_seed".to_string()),
            failure_message: None,
        })
        .await?;
    println!("  Created group: {} (negotiating, 2 offers, 1 paid member)", families.name);

    let professionals = groups
        .create_group(
            organizer,
            new_group(urban_edge, "Urban Professionals", None, 25, 25_000),
        )
        .await?;
    members.join(&users.buyer2, professionals.id).await?;
    println!("  Created group: {} (1 member)", professionals.name);

    let dreamers = groups
        .create_group(
            organizer,
            new_group(seaside, "Seaside Dreamers", None, 10, 200_000),
        )
        .await?;
    println!("  Created group: {}", dreamers.name);

    Ok(())
}
