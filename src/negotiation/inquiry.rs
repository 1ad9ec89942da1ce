//! Pre-order inquiry workflow: a lighter sibling of the order state machine.
//! No formal proposal sub-state and no shipment; just an append-only message
//! ledger and per-item agreed prices against catalog snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::negotiation::{Actor, PricePoint, PriceRange, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    Open,
    Negotiating,
    Agreed,
    Closed,
}

impl InquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::Open => "open",
            InquiryStatus::Negotiating => "negotiating",
            InquiryStatus::Agreed => "agreed",
            InquiryStatus::Closed => "closed",
        }
    }

    fn is_settled(&self) -> bool {
        matches!(self, InquiryStatus::Agreed | InquiryStatus::Closed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InquiryItem {
    pub product: Uuid,
    pub quantity: f64,
    pub unit: String,
    pub price_range: PriceRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreed_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InquiryMessage {
    pub sender: Uuid,
    pub sender_role: Role,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_proposal: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InquiryDoc {
    pub user: Uuid,
    pub items: Vec<InquiryItem>,
    pub status: InquiryStatus,
    #[serde(default)]
    pub messages: Vec<InquiryMessage>,
}

impl InquiryDoc {
    /// Items arrive pre-resolved against the catalog (unit and price range
    /// snapshotted by the service).
    pub fn create(user: Uuid, items: Vec<InquiryItem>) -> Result<Self, AppError> {
        if items.is_empty() {
            return Err(AppError::BadRequest("no items provided".into()));
        }
        Ok(Self {
            user,
            items,
            status: InquiryStatus::Open,
            messages: Vec::new(),
        })
    }

    pub fn ensure_participant(&self, actor: &Actor) -> Result<(), AppError> {
        if actor.is_admin() || actor.id == self.user {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Append a message; an attached price proposal opens negotiation.
    pub fn post_message(
        &mut self,
        actor: &Actor,
        body: &str,
        price_proposal: Option<f64>,
    ) -> Result<(), AppError> {
        self.ensure_participant(actor)?;
        if price_proposal.is_some() && self.status.is_settled() {
            return Err(AppError::PreconditionFailed("inquiry is settled".into()));
        }

        self.messages.push(InquiryMessage {
            sender: actor.id,
            sender_role: actor.role,
            body: body.to_string(),
            price_proposal,
            timestamp: Utc::now(),
        });

        if price_proposal.is_some() {
            self.status = InquiryStatus::Negotiating;
        }

        Ok(())
    }

    /// Admin fixes agreed prices in bulk; flips to `agreed` only once every
    /// item carries one.
    pub fn agree_items(&mut self, actor: &Actor, agreements: &[PricePoint]) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        if self.status == InquiryStatus::Closed {
            return Err(AppError::PreconditionFailed("inquiry is closed".into()));
        }

        for a in agreements {
            if a.index >= self.items.len() {
                return Err(AppError::BadRequest(format!(
                    "item index {} out of range",
                    a.index
                )));
            }
            if a.price < 0.0 {
                return Err(AppError::BadRequest("price must not be negative".into()));
            }
        }
        for a in agreements {
            self.items[a.index].agreed_price = Some(a.price);
        }

        self.status = if self.items.iter().all(|i| i.agreed_price.is_some()) {
            InquiryStatus::Agreed
        } else {
            InquiryStatus::Negotiating
        };

        Ok(())
    }

    /// Owner or admin closes an inquiry that went nowhere.
    pub fn close(&mut self, actor: &Actor) -> Result<(), AppError> {
        self.ensure_participant(actor)?;
        if self.status.is_settled() {
            return Err(AppError::PreconditionFailed("inquiry is settled".into()));
        }
        self.status = InquiryStatus::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buyer() -> Actor {
        Actor::new(Uuid::new_v4(), Role::User)
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    fn item(qty: f64) -> InquiryItem {
        InquiryItem {
            product: Uuid::new_v4(),
            quantity: qty,
            unit: "per kg".into(),
            price_range: PriceRange {
                min: 10.5,
                max: 14.0,
                currency: "EUR".into(),
            },
            notes: None,
            agreed_price: None,
        }
    }

    #[test]
    fn create_starts_open_and_needs_items() {
        let owner = buyer();
        let inquiry = InquiryDoc::create(owner.id, vec![item(100.0)]).unwrap();
        assert_eq!(inquiry.status, InquiryStatus::Open);

        let err = InquiryDoc::create(owner.id, vec![]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn price_proposal_opens_negotiation() {
        let owner = buyer();
        let mut inquiry = InquiryDoc::create(owner.id, vec![item(100.0)]).unwrap();

        inquiry.post_message(&owner, "can you do 11?", Some(11.0)).unwrap();
        assert_eq!(inquiry.status, InquiryStatus::Negotiating);
        assert_eq!(inquiry.messages.len(), 1);

        // A plain message leaves the status alone.
        let mut fresh = InquiryDoc::create(owner.id, vec![item(1.0)]).unwrap();
        fresh.post_message(&owner, "hello", None).unwrap();
        assert_eq!(fresh.status, InquiryStatus::Open);
    }

    #[test]
    fn outsiders_are_forbidden() {
        let owner = buyer();
        let mut inquiry = InquiryDoc::create(owner.id, vec![item(1.0)]).unwrap();

        let err = inquiry.post_message(&buyer(), "hi", None).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let err = inquiry
            .agree_items(
                &owner,
                &[PricePoint {
                    index: 0,
                    price: 11.0,
                }],
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn agree_flips_only_when_every_item_has_a_price() {
        let owner = buyer();
        let mut inquiry = InquiryDoc::create(owner.id, vec![item(10.0), item(5.0)]).unwrap();
        let admin = admin();

        inquiry
            .agree_items(
                &admin,
                &[PricePoint {
                    index: 0,
                    price: 11.0,
                }],
            )
            .unwrap();
        assert_eq!(inquiry.status, InquiryStatus::Negotiating);

        inquiry
            .agree_items(
                &admin,
                &[PricePoint {
                    index: 1,
                    price: 12.0,
                }],
            )
            .unwrap();
        assert_eq!(inquiry.status, InquiryStatus::Agreed);
        assert!(inquiry.items.iter().all(|i| i.agreed_price.is_some()));
    }

    #[test]
    fn agree_rejects_bad_indexes() {
        let owner = buyer();
        let mut inquiry = InquiryDoc::create(owner.id, vec![item(1.0)]).unwrap();

        let err = inquiry
            .agree_items(
                &admin(),
                &[PricePoint {
                    index: 3,
                    price: 11.0,
                }],
            )
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(inquiry.items[0].agreed_price, None);
    }

    #[test]
    fn settled_inquiries_refuse_new_prices() {
        let owner = buyer();
        let mut inquiry = InquiryDoc::create(owner.id, vec![item(1.0)]).unwrap();
        inquiry
            .agree_items(
                &admin(),
                &[PricePoint {
                    index: 0,
                    price: 11.0,
                }],
            )
            .unwrap();
        assert_eq!(inquiry.status, InquiryStatus::Agreed);

        let err = inquiry
            .post_message(&owner, "actually...", Some(9.0))
            .unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));

        let err = inquiry.close(&owner).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
    }

    #[test]
    fn owner_can_close_an_open_inquiry() {
        let owner = buyer();
        let mut inquiry = InquiryDoc::create(owner.id, vec![item(1.0)]).unwrap();

        inquiry.close(&owner).unwrap();
        assert_eq!(inquiry.status, InquiryStatus::Closed);

        let err = inquiry.close(&owner).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
    }
}
