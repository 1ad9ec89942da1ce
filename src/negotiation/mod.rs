//! Negotiation engine: pure state machines for orders and inquiries.
//!
//! Everything in here mutates documents in memory and performs no I/O. The
//! service layer owns loading a document, applying one operation and writing
//! the whole document back inside a single transaction.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod inquiry;
pub mod order;

pub use inquiry::{InquiryDoc, InquiryStatus};
pub use order::{OrderDoc, OrderStatus, ProposalStatus, ShipmentPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Resolved caller identity. Every operation entry point takes exactly one
/// of these and performs its own authorization check.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Catalog price snapshot frozen at order/inquiry creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            currency: "EUR".to_string(),
        }
    }
}

/// A per-item price offer, addressing the item by its position in the
/// order's item list. Items are never reordered or removed after creation,
/// so the index stays stable for the whole negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PricePoint {
    pub index: usize,
    pub price: f64,
}
