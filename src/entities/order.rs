use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One checkout attempt. The `cart` column holds the immutable JSON snapshot
/// of the purchased units (`models::cart::CartUnit`); prices and availability
/// are frozen at submission time and never re-derived from the catalog.
/// Orders are a financial record and are never deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_no: String,
    pub user_id: Uuid,
    pub cust_name: String,
    pub cust_email: String,
    pub cust_phone: String,
    pub shipping_address: String,
    pub shipment_method: String,
    #[sea_orm(column_type = "Json")]
    pub cart: Json,
    pub price: Decimal,
    pub shipping_fee: Decimal,
    pub payment_method: String,
    pub status: OrderStatus,
    #[sea_orm(nullable)]
    pub tracking_no: Option<String>,
    #[sea_orm(nullable)]
    pub transaction_no: Option<String>,
    #[sea_orm(nullable)]
    pub success_payment_id: Option<String>,
    #[sea_orm(nullable)]
    pub remark: Option<String>,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_cart::Entity")]
    CartRows,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartRows.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order lifecycle. Transitions only move forward through the allowed table
/// checked by [`OrderStatus::can_transition_to`]; COMPLETED and FAILED are
/// terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    /// Allowed-transition table: PENDING may settle either way; terminal
    /// states accept nothing further.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Failed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_may_settle_either_way() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Failed));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for terminal in [OrderStatus::Completed, OrderStatus::Failed] {
            assert!(terminal.is_terminal());
            for next in [
                OrderStatus::Pending,
                OrderStatus::Completed,
                OrderStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn no_self_transition_for_pending() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }
}
