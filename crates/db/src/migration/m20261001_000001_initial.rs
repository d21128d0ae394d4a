//! Initial database migration.
//!
//! Creates enums, tenant-scoped tables, the uniqueness constraints that make
//! joins and webhook reconciliation idempotent, and the immutability triggers.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TENANTS, USERS, PROJECTS
        // ============================================================
        db.execute_unprepared(TENANTS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(PROJECTS_SQL).await?;

        // ============================================================
        // PART 3: GROUPS
        // ============================================================
        db.execute_unprepared(GROUPS_SQL).await?;
        db.execute_unprepared(GROUP_MEMBERS_SQL).await?;
        db.execute_unprepared(OFFERS_SQL).await?;
        db.execute_unprepared(GROUP_MILESTONES_SQL).await?;

        // ============================================================
        // PART 4: PAYMENTS & AUDIT
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(ACTIVITY_LOGS_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM (
    'BUYER',
    'ORGANIZER',
    'PARTNER_ADMIN',
    'SUPER_ADMIN'
);

CREATE TYPE group_status AS ENUM (
    'OPEN',
    'NEGOTIATING',
    'OFFER_ACCEPTED',
    'CLOSED',
    'EXPIRED'
);

CREATE TYPE commitment_status AS ENUM (
    'INTERESTED',
    'COMMITTED',
    'PAID',
    'WITHDRAWN'
);

CREATE TYPE offer_type AS ENUM ('INITIAL', 'COUNTER');

CREATE TYPE milestone_type AS ENUM (
    'GROUP_CREATED',
    'MEMBER_JOINED',
    'MEMBER_WITHDRAWN',
    'MEMBER_COMMITTED',
    'TARGET_REACHED',
    'NEGOTIATION_STARTED',
    'OFFER_RECEIVED',
    'OFFER_ACCEPTED',
    'PAYMENT_RECEIVED',
    'GROUP_CLOSED',
    'GROUP_EXPIRED'
);

CREATE TYPE transaction_status AS ENUM ('PENDING', 'COMPLETED', 'FAILED');

CREATE TYPE transaction_type AS ENUM (
    'COMMITMENT_FEE',
    'ESCROW_DEPOSIT',
    'BOOKING_AMOUNT'
);
";

const TENANTS_SQL: &str = r"
CREATE TABLE tenants (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    slug VARCHAR(100) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    email VARCHAR(255) NOT NULL,
    name VARCHAR(255),
    role user_role NOT NULL DEFAULT 'BUYER',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, email)
);
";

const PROJECTS_SQL: &str = r"
CREATE TABLE projects (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    developer_name VARCHAR(255),
    location VARCHAR(255),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_projects_tenant ON projects(tenant_id);
";

const GROUPS_SQL: &str = r"
CREATE TABLE groups (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    description TEXT,
    target_buyers_count INTEGER NOT NULL CHECK (target_buyers_count >= 1),
    current_buyers_count INTEGER NOT NULL DEFAULT 0 CHECK (current_buyers_count >= 0),
    status group_status NOT NULL DEFAULT 'OPEN',
    negotiated_discount NUMERIC(5, 2),
    commitment_amount NUMERIC(15, 2),
    deadline TIMESTAMPTZ,
    negotiation_start TIMESTAMPTZ,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_by_id UUID NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_groups_tenant_created ON groups(tenant_id, created_at DESC) WHERE is_active;
CREATE INDEX idx_groups_project ON groups(project_id);
CREATE INDEX idx_groups_deadline ON groups(deadline)
    WHERE is_active AND status IN ('OPEN', 'NEGOTIATING');
";

const GROUP_MEMBERS_SQL: &str = r"
CREATE TABLE group_members (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    commitment_status commitment_status NOT NULL DEFAULT 'INTERESTED',
    payment_reference VARCHAR(255),
    joined_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (group_id, user_id)
);

CREATE INDEX idx_group_members_user ON group_members(user_id);
";

const OFFERS_SQL: &str = r"
CREATE TABLE offers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    offer_type offer_type NOT NULL,
    discount_percent NUMERIC(5, 2) NOT NULL CHECK (discount_percent > 0 AND discount_percent <= 100),
    min_buyers INTEGER NOT NULL CHECK (min_buyers >= 1),
    notes TEXT,
    is_accepted BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_offers_group_created ON offers(group_id, created_at DESC);

-- At most one accepted offer per group
CREATE UNIQUE INDEX uq_offers_one_accepted ON offers(group_id) WHERE is_accepted;
";

const GROUP_MILESTONES_SQL: &str = r"
CREATE TABLE group_milestones (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    seq BIGINT GENERATED ALWAYS AS IDENTITY,
    group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    milestone_type milestone_type NOT NULL,
    title VARCHAR(255) NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_group_milestones_group_seq ON group_milestones(group_id, seq);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    group_id UUID REFERENCES groups(id),
    transaction_type transaction_type NOT NULL,
    amount BIGINT NOT NULL CHECK (amount > 0),
    currency VARCHAR(3) NOT NULL,
    status transaction_status NOT NULL DEFAULT 'PENDING',
    gateway_intent_id VARCHAR(255) NOT NULL,
    gateway_charge_id VARCHAR(255),
    failure_reason TEXT,
    description TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_transactions_gateway_intent UNIQUE (gateway_intent_id)
);

CREATE INDEX idx_transactions_user ON transactions(tenant_id, user_id, created_at DESC);
CREATE INDEX idx_transactions_group ON transactions(group_id);
";

const ACTIVITY_LOGS_SQL: &str = r"
CREATE TABLE activity_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    user_id UUID REFERENCES users(id) ON DELETE SET NULL,
    action VARCHAR(100) NOT NULL,
    entity_type VARCHAR(100) NOT NULL,
    entity_id UUID NOT NULL,
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_activity_logs_entity ON activity_logs(entity_type, entity_id);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_milestone_update
-- Milestones are append-only
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_milestone_update()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Group milestones are append-only.';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_milestone_update
BEFORE UPDATE ON group_milestones
FOR EACH ROW
EXECUTE FUNCTION prevent_milestone_update();

-- ============================================================
-- FUNCTION: prevent_settled_transaction_change
-- COMPLETED and FAILED are final
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_settled_transaction_change()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status <> 'PENDING' AND NEW.status <> OLD.status THEN
        RAISE EXCEPTION 'Cannot change status of settled transaction %', OLD.id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_settled_change
BEFORE UPDATE ON transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_settled_transaction_change();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_prevent_settled_change ON transactions;
DROP TRIGGER IF EXISTS trg_prevent_milestone_update ON group_milestones;

DROP FUNCTION IF EXISTS prevent_settled_transaction_change();
DROP FUNCTION IF EXISTS prevent_milestone_update();

DROP TABLE IF EXISTS activity_logs CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS group_milestones CASCADE;
DROP TABLE IF EXISTS offers CASCADE;
DROP TABLE IF EXISTS group_members CASCADE;
DROP TABLE IF EXISTS groups CASCADE;
DROP TABLE IF EXISTS projects CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS tenants CASCADE;

DROP TYPE IF EXISTS transaction_type;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS milestone_type;
DROP TYPE IF EXISTS offer_type;
DROP TYPE IF EXISTS commitment_status;
DROP TYPE IF EXISTS group_status;
DROP TYPE IF EXISTS user_role;
";
