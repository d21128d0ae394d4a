//! Postgres enum types and their conversions to the core domain enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use groupbuy_core::access::Role;
use groupbuy_core::group::types as core_group;
use groupbuy_core::payment::types as core_payment;
use groupbuy_core::timeline::MilestoneType as CoreMilestoneType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[sea_orm(string_value = "BUYER")]
    Buyer,
    #[sea_orm(string_value = "ORGANIZER")]
    Organizer,
    #[sea_orm(string_value = "PARTNER_ADMIN")]
    PartnerAdmin,
    #[sea_orm(string_value = "SUPER_ADMIN")]
    SuperAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "group_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    #[sea_orm(string_value = "OPEN")]
    Open,
    #[sea_orm(string_value = "NEGOTIATING")]
    Negotiating,
    #[sea_orm(string_value = "OFFER_ACCEPTED")]
    OfferAccepted,
    #[sea_orm(string_value = "CLOSED")]
    Closed,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "commitment_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitmentStatus {
    #[sea_orm(string_value = "INTERESTED")]
    Interested,
    #[sea_orm(string_value = "COMMITTED")]
    Committed,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "WITHDRAWN")]
    Withdrawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "offer_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferType {
    #[sea_orm(string_value = "INITIAL")]
    Initial,
    #[sea_orm(string_value = "COUNTER")]
    Counter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "milestone_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneType {
    #[sea_orm(string_value = "GROUP_CREATED")]
    GroupCreated,
    #[sea_orm(string_value = "MEMBER_JOINED")]
    MemberJoined,
    #[sea_orm(string_value = "MEMBER_WITHDRAWN")]
    MemberWithdrawn,
    #[sea_orm(string_value = "MEMBER_COMMITTED")]
    MemberCommitted,
    #[sea_orm(string_value = "TARGET_REACHED")]
    TargetReached,
    #[sea_orm(string_value = "NEGOTIATION_STARTED")]
    NegotiationStarted,
    #[sea_orm(string_value = "OFFER_RECEIVED")]
    OfferReceived,
    #[sea_orm(string_value = "OFFER_ACCEPTED")]
    OfferAccepted,
    #[sea_orm(string_value = "PAYMENT_RECEIVED")]
    PaymentReceived,
    #[sea_orm(string_value = "GROUP_CLOSED")]
    GroupClosed,
    #[sea_orm(string_value = "GROUP_EXPIRED")]
    GroupExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    #[sea_orm(string_value = "COMMITMENT_FEE")]
    CommitmentFee,
    #[sea_orm(string_value = "ESCROW_DEPOSIT")]
    EscrowDeposit,
    #[sea_orm(string_value = "BOOKING_AMOUNT")]
    BookingAmount,
}

/// Maps between a stored enum and its core counterpart, variant for variant.
macro_rules! mirror_enum {
    ($db:ty, $core:ty, { $($variant:ident),+ $(,)? }) => {
        impl From<$db> for $core {
            fn from(value: $db) -> Self {
                type Source = $db;
                match value {
                    $(Source::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$core> for $db {
            fn from(value: $core) -> Self {
                type Source = $core;
                match value {
                    $(Source::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirror_enum!(UserRole, Role, { Buyer, Organizer, PartnerAdmin, SuperAdmin });
mirror_enum!(GroupStatus, core_group::GroupStatus, {
    Open, Negotiating, OfferAccepted, Closed, Expired
});
mirror_enum!(CommitmentStatus, core_group::CommitmentStatus, {
    Interested, Committed, Paid, Withdrawn
});
mirror_enum!(OfferType, core_group::OfferType, { Initial, Counter });
mirror_enum!(MilestoneType, CoreMilestoneType, {
    GroupCreated,
    MemberJoined,
    MemberWithdrawn,
    MemberCommitted,
    TargetReached,
    NegotiationStarted,
    OfferReceived,
    OfferAccepted,
    PaymentReceived,
    GroupClosed,
    GroupExpired,
});
mirror_enum!(TransactionStatus, core_payment::TransactionStatus, {
    Pending, Completed, Failed
});
mirror_enum!(TransactionType, core_payment::TransactionType, {
    CommitmentFee, EscrowDeposit, BookingAmount
});
