use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Farmer decision state of an order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "disapproved")]
    Disapproved,
}

/// Progress of the physical delivery once a deliveryman has claimed the order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in-transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "not-delivered")]
    NotDelivered,
}

/// The `produce_orders` table. One row per order document.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "produce_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub item: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub product_image: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,

    /// Opaque references resolved by the external user directory.
    pub seller_id: String,
    pub farmer_id: String,
    pub deliveryman_id: Option<String>,

    pub district: Option<String>,
    pub company: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub expire_date: Option<NaiveDate>,

    pub status: OrderStatus,
    pub accepted_by_deliveryman: bool,
    pub delivery_status: DeliveryStatus,

    pub seller_note: Option<String>,
    pub farmer_note: Option<String>,
    pub deliveryman_note: Option<String>,

    pub farmer_approval_date: Option<DateTime<Utc>>,
    pub delivery_accepted_date: Option<DateTime<Utc>>,
    pub delivery_completed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_strings_match_wire_format() {
        assert_eq!(OrderStatus::Disapproved.to_string(), "disapproved");
        assert_eq!(OrderStatus::from_str("Approved").unwrap(), OrderStatus::Approved);
        assert_eq!(DeliveryStatus::InTransit.to_string(), "in-transit");
        assert_eq!(
            DeliveryStatus::from_str("not-delivered").unwrap(),
            DeliveryStatus::NotDelivered
        );
        assert!(DeliveryStatus::from_str("lost").is_err());
    }

    #[test]
    fn serde_uses_same_vocabulary_as_storage() {
        let json = serde_json::to_string(&DeliveryStatus::NotDelivered).unwrap();
        assert_eq!(json, "\"not-delivered\"");
        let status: OrderStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, OrderStatus::Pending);
    }
}
