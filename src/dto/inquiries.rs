use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::orders::OrderOwner;
use crate::negotiation::inquiry::InquiryDoc;
use crate::negotiation::PricePoint;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInquiryRequest {
    pub items: Vec<InquiryItemRequest>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InquiryItemRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub quantity: f64,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InquiryMessageRequest {
    pub body: Option<String>,
    pub price_proposal: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AgreeRequest {
    #[serde(default)]
    pub agreements: Vec<PricePoint>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InquiryView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OrderOwner>,
    #[serde(flatten)]
    pub doc: InquiryDoc,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InquiryList {
    pub items: Vec<InquiryView>,
}
