use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::negotiation::order::{NewOrderItem, OrderDoc, ProposeItem};
use crate::negotiation::PricePoint;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<NewOrderItem>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub body: Option<String>,
    pub price_proposal: Option<Vec<PricePoint>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProposeRequest {
    #[serde(default)]
    pub items: Vec<ProposeItem>,
    pub note: Option<String>,
}

/// Owner identity resolved to display fields.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderOwner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OrderOwner>,
    #[serde(flatten)]
    pub doc: OrderDoc,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderView>,
}
