use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One flattened row per purchased cart unit, denormalized for reporting.
/// The authoritative snapshot lives in `orders.cart`; these rows exist so
/// fulfilment queries never have to unpack JSON.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_carts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub unit_kind: String,
    pub institution_id: Uuid,
    #[sea_orm(nullable)]
    pub photo_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub package_id: Option<Uuid>,
    pub description: String,
    pub amount: Decimal,
    pub grants_download: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
