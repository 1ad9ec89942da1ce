//! Order negotiation state machine.
//!
//! Status moves only forward along
//! `pending -> negotiating -> proposed -> confirmed -> shipped -> completed`,
//! with `cancelled` as an alternate terminal. `proposalStatus` is an
//! orthogonal sub-state gating the `proposed -> confirmed` edge. The one
//! sanctioned backward edge is `proposed -> negotiating` when the buyer
//! rejects a proposal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::negotiation::{Actor, PricePoint, PriceRange, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Negotiating,
    Proposed,
    Confirmed,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Negotiating => "negotiating",
            OrderStatus::Proposed => "proposed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    None,
    Sent,
    Approved,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::None => "none",
            ProposalStatus::Sent => "sent",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentPhase {
    Harvesting,
    Packing,
    Loading,
    InTransit,
    Delivered,
}

impl ShipmentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentPhase::Harvesting => "harvesting",
            ShipmentPhase::Packing => "packing",
            ShipmentPhase::Loading => "loading",
            ShipmentPhase::InTransit => "in_transit",
            ShipmentPhase::Delivered => "delivered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    pub qty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub price_range: PriceRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreed_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderMessage {
    pub sender: Uuid,
    pub sender_role: Role,
    pub body: String,
    #[serde(default)]
    pub price_proposal: Vec<PricePoint>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposalItem {
    pub name: String,
    pub qty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub unit_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Admin-authored, buyer-approvable snapshot of final pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub items: Vec<ProposalItem>,
    pub total: f64,
    pub currency: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<ShipmentPhase>,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub phase: Option<ShipmentPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<DateTime<Utc>>,
    #[serde(default)]
    pub events: Vec<ShipmentEvent>,
}

/// Line item as submitted at checkout. Price ranges come from the catalog
/// snapshot the client carried in its cart; a missing range collapses to
/// zero bounds.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub name: String,
    #[serde(default)]
    pub qty: f64,
    pub unit: Option<String>,
    pub price_range: Option<PriceRange>,
    pub image: Option<String>,
    pub product_id: Option<String>,
}

/// Per-item override inside an admin proposal; addresses items by position.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposeItem {
    pub index: usize,
    pub unit_price: Option<f64>,
    pub qty: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentUpdate {
    pub phase: Option<ShipmentPhase>,
    pub note: Option<String>,
    pub tracking_id: Option<String>,
    pub eta: Option<DateTime<Utc>>,
}

/// The full order document as persisted. Field names are the storage
/// contract shared with the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDoc {
    pub user: Uuid,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    #[serde(default)]
    pub note: String,
    pub total_min: f64,
    pub total_max: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_total: Option<f64>,
    #[serde(default)]
    pub messages: Vec<OrderMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<Proposal>,
    pub proposal_status: ProposalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment: Option<Shipment>,
}

impl OrderDoc {
    /// Buyer checkout. Quantities are normalized to at least 1; totals are
    /// the sums of the per-item price bounds; the currency is taken from the
    /// first item's snapshot.
    pub fn create(
        user: Uuid,
        items: Vec<NewOrderItem>,
        note: Option<String>,
    ) -> Result<Self, AppError> {
        if items.is_empty() {
            return Err(AppError::BadRequest("no items provided".into()));
        }

        let items: Vec<OrderItem> = items
            .into_iter()
            .map(|it| OrderItem {
                name: it.name,
                qty: normalize_qty(it.qty),
                unit: it.unit,
                price_range: it.price_range.unwrap_or_default(),
                image: it.image,
                product_id: it.product_id,
                agreed_price: None,
            })
            .collect();

        let currency = items[0].price_range.currency.clone();
        let total_min = items.iter().map(|i| i.price_range.min * i.qty).sum();
        let total_max = items.iter().map(|i| i.price_range.max * i.qty).sum();

        Ok(Self {
            user,
            items,
            status: OrderStatus::Pending,
            note: note.unwrap_or_default(),
            total_min,
            total_max,
            currency,
            final_total: None,
            messages: Vec::new(),
            proposal: None,
            proposal_status: ProposalStatus::None,
            shipment: None,
        })
    }

    /// Append a chat message, optionally carrying per-item price offers.
    ///
    /// A plain message on a pending order opens negotiation. Price offers fix
    /// the referenced items' agreed prices; once every item carries one the
    /// order advances to `proposed`.
    pub fn post_message(
        &mut self,
        actor: &Actor,
        body: &str,
        proposals: &[PricePoint],
    ) -> Result<(), AppError> {
        self.ensure_participant(actor)?;

        if !proposals.is_empty() {
            self.ensure_negotiable()?;
            for p in proposals {
                self.check_index(p.index)?;
                if p.price < 0.0 {
                    return Err(AppError::BadRequest("price must not be negative".into()));
                }
            }
            for p in proposals {
                self.items[p.index].agreed_price = Some(p.price);
            }
        }

        self.messages.push(OrderMessage {
            sender: actor.id,
            sender_role: actor.role,
            body: body.to_string(),
            price_proposal: proposals.to_vec(),
            timestamp: Utc::now(),
        });

        if !proposals.is_empty() {
            self.status = if self.all_agreed() {
                OrderStatus::Proposed
            } else {
                OrderStatus::Negotiating
            };
        } else if self.status == OrderStatus::Pending {
            self.status = OrderStatus::Negotiating;
        }

        Ok(())
    }

    /// Admin sends the formal proposal: applies per-item overrides, snapshots
    /// the items with resolved unit prices and marks the proposal as sent.
    pub fn send_proposal(
        &mut self,
        actor: &Actor,
        overrides: &[ProposeItem],
        note: Option<&str>,
    ) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        self.ensure_negotiable()?;

        for o in overrides {
            self.check_index(o.index)?;
            if o.unit_price.is_some_and(|p| p < 0.0) {
                return Err(AppError::BadRequest("price must not be negative".into()));
            }
            if o.qty.is_some_and(|q| q < 1.0) {
                return Err(AppError::BadRequest("qty must be at least 1".into()));
            }
        }
        for o in overrides {
            let item = &mut self.items[o.index];
            if let Some(price) = o.unit_price {
                item.agreed_price = Some(price);
            }
            if let Some(qty) = o.qty {
                item.qty = qty;
            }
        }

        // Unit price resolution: agreedPrice, else the snapshot minimum
        // (itself defaulting to 0).
        let snapshot: Vec<ProposalItem> = self
            .items
            .iter()
            .map(|it| ProposalItem {
                name: it.name.clone(),
                qty: it.qty,
                unit: it.unit.clone(),
                unit_price: it.agreed_price.unwrap_or(it.price_range.min),
                product_id: it.product_id.clone(),
                image: it.image.clone(),
            })
            .collect();
        let total = snapshot.iter().map(|i| i.unit_price * i.qty).sum();

        self.proposal = Some(Proposal {
            items: snapshot,
            total,
            currency: self.currency.clone(),
            note: note.unwrap_or_default().to_string(),
            created_at: Utc::now(),
        });
        self.proposal_status = ProposalStatus::Sent;
        self.status = OrderStatus::Proposed;
        self.push_audit(actor, "Sent final proposal");

        Ok(())
    }

    /// Owning buyer accepts the pending proposal; fixes the final total.
    pub fn approve_proposal(&mut self, actor: &Actor) -> Result<(), AppError> {
        self.ensure_owner(actor)?;
        if self.proposal_status != ProposalStatus::Sent {
            return Err(AppError::PreconditionFailed("no proposal to approve".into()));
        }

        self.proposal_status = ProposalStatus::Approved;
        self.status = OrderStatus::Confirmed;
        self.final_total = Some(match &self.proposal {
            Some(p) => p.total,
            None => self
                .items
                .iter()
                .map(|i| i.agreed_price.unwrap_or(0.0) * i.qty)
                .sum(),
        });
        self.push_audit(actor, "Approved proposal");

        Ok(())
    }

    /// Owning buyer declines the pending proposal; negotiation reopens.
    pub fn reject_proposal(&mut self, actor: &Actor) -> Result<(), AppError> {
        self.ensure_owner(actor)?;
        if self.proposal_status != ProposalStatus::Sent {
            return Err(AppError::PreconditionFailed("no proposal to reject".into()));
        }

        self.proposal_status = ProposalStatus::Rejected;
        self.status = OrderStatus::Negotiating;
        self.push_audit(actor, "Rejected proposal");

        Ok(())
    }

    /// Admin may cancel anytime (a no-op on an already cancelled order); the
    /// owner only before approval and before fulfilment starts.
    pub fn cancel(&mut self, actor: &Actor) -> Result<(), AppError> {
        if actor.is_admin() {
            if self.status == OrderStatus::Cancelled {
                return Ok(());
            }
        } else if actor.id == self.user {
            if self.proposal_status == ProposalStatus::Approved
                || matches!(
                    self.status,
                    OrderStatus::Shipped | OrderStatus::Completed | OrderStatus::Cancelled
                )
            {
                return Err(AppError::PreconditionFailed(
                    "cannot cancel at this stage".into(),
                ));
            }
        } else {
            return Err(AppError::Forbidden);
        }

        self.status = OrderStatus::Cancelled;
        self.push_audit(actor, "Order cancelled");

        Ok(())
    }

    pub fn mark_shipped(&mut self, actor: &Actor) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        self.status = OrderStatus::Shipped;
        Ok(())
    }

    pub fn mark_completed(&mut self, actor: &Actor) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        self.status = OrderStatus::Completed;
        Ok(())
    }

    /// Merge shipment details; fields left out stay untouched. A supplied
    /// phase or note also appends a tracking event.
    pub fn update_shipment(
        &mut self,
        actor: &Actor,
        update: ShipmentUpdate,
    ) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }

        let shipment = self.shipment.get_or_insert_with(Shipment::default);
        if let Some(phase) = update.phase {
            shipment.phase = Some(phase);
        }
        if let Some(tracking_id) = update.tracking_id {
            shipment.tracking_id = Some(tracking_id);
        }
        if let Some(eta) = update.eta {
            shipment.eta = Some(eta);
        }
        if update.phase.is_some() || update.note.is_some() {
            shipment.events.push(ShipmentEvent {
                phase: shipment.phase,
                note: update.note.unwrap_or_default(),
                timestamp: Utc::now(),
            });
        }

        Ok(())
    }

    pub fn is_owner(&self, actor: &Actor) -> bool {
        actor.id == self.user
    }

    /// Owner or admin; everyone else is shut out of the conversation.
    pub fn ensure_participant(&self, actor: &Actor) -> Result<(), AppError> {
        if actor.is_admin() || self.is_owner(actor) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Approve/reject belong to the owning buyer alone, never the admin.
    fn ensure_owner(&self, actor: &Actor) -> Result<(), AppError> {
        if !actor.is_admin() && self.is_owner(actor) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Price changes are only accepted while the order is still being
    /// negotiated; once confirmed the status never moves backwards.
    fn ensure_negotiable(&self) -> Result<(), AppError> {
        match self.status {
            OrderStatus::Pending | OrderStatus::Negotiating | OrderStatus::Proposed => Ok(()),
            _ => Err(AppError::PreconditionFailed("negotiation is closed".into())),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), AppError> {
        if index >= self.items.len() {
            return Err(AppError::BadRequest(format!(
                "item index {index} out of range"
            )));
        }
        Ok(())
    }

    fn all_agreed(&self) -> bool {
        self.items.iter().all(|i| i.agreed_price.is_some())
    }

    fn push_audit(&mut self, actor: &Actor, body: &str) {
        self.messages.push(OrderMessage {
            sender: actor.id,
            sender_role: actor.role,
            body: body.to_string(),
            price_proposal: Vec::new(),
            timestamp: Utc::now(),
        });
    }

    pub fn shipment_phase(&self) -> Option<ShipmentPhase> {
        self.shipment.as_ref().and_then(|s| s.phase)
    }
}

fn normalize_qty(qty: f64) -> f64 {
    if qty >= 1.0 { qty } else { 1.0 }
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

    fn rice_item(qty: f64) -> NewOrderItem {
        NewOrderItem {
            name: "Rice".into(),
            qty,
            unit: Some("per kg".into()),
            price_range: Some(PriceRange {
                min: 1.5,
                max: 2.2,
                currency: "EUR".into(),
            }),
            image: None,
            product_id: None,
        }
    }

    fn pepper_item(qty: f64) -> NewOrderItem {
        NewOrderItem {
            name: "Black Pepper".into(),
            qty,
            unit: Some("per kg".into()),
            price_range: Some(PriceRange {
                min: 6.0,
                max: 8.2,
                currency: "EUR".into(),
            }),
            image: None,
            product_id: None,
        }
    }

    fn rice_order(owner: &Actor) -> OrderDoc {
        OrderDoc::create(owner.id, vec![rice_item(10.0)], None).unwrap()
    }

    #[test]
    fn create_computes_totals_from_price_bounds() {
        let owner = buyer();
        let order = rice_order(&owner);

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.proposal_status, ProposalStatus::None);
        assert_eq!(order.total_min, 15.0);
        assert_eq!(order.total_max, 22.0);
        assert_eq!(order.currency, "EUR");
        assert!(order.messages.is_empty());
    }

    #[test]
    fn create_rejects_empty_item_list() {
        let err = OrderDoc::create(Uuid::new_v4(), vec![], None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn create_normalizes_quantities() {
        let order = OrderDoc::create(Uuid::new_v4(), vec![rice_item(0.0)], None).unwrap();
        assert_eq!(order.items[0].qty, 1.0);
        assert_eq!(order.total_min, 1.5);
    }

    #[test]
    fn plain_message_opens_negotiation() {
        let owner = buyer();
        let mut order = rice_order(&owner);

        order.post_message(&owner, "hello", &[]).unwrap();

        assert_eq!(order.status, OrderStatus::Negotiating);
        assert_eq!(order.messages.len(), 1);
        assert_eq!(order.messages[0].body, "hello");
    }

    #[test]
    fn stranger_cannot_post_messages() {
        let owner = buyer();
        let mut order = rice_order(&owner);

        let err = order.post_message(&buyer(), "hi", &[]).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        assert!(order.messages.is_empty());
    }

    #[test]
    fn partial_price_offer_keeps_negotiating() {
        let owner = buyer();
        let mut order =
            OrderDoc::create(owner.id, vec![rice_item(10.0), pepper_item(5.0)], None).unwrap();

        order
            .post_message(
                &admin(),
                "rice offer",
                &[PricePoint {
                    index: 0,
                    price: 1.8,
                }],
            )
            .unwrap();

        assert_eq!(order.status, OrderStatus::Negotiating);
        assert_eq!(order.items[0].agreed_price, Some(1.8));
        assert_eq!(order.items[1].agreed_price, None);
    }

    #[test]
    fn full_price_agreement_moves_to_proposed() {
        let owner = buyer();
        let mut order =
            OrderDoc::create(owner.id, vec![rice_item(10.0), pepper_item(5.0)], None).unwrap();

        order
            .post_message(
                &admin(),
                "both",
                &[
                    PricePoint {
                        index: 0,
                        price: 1.8,
                    },
                    PricePoint {
                        index: 1,
                        price: 7.0,
                    },
                ],
            )
            .unwrap();

        assert_eq!(order.status, OrderStatus::Proposed);
    }

    #[test]
    fn price_offer_with_bad_index_is_rejected_whole() {
        let owner = buyer();
        let mut order = rice_order(&owner);

        let err = order
            .post_message(
                &owner,
                "oops",
                &[
                    PricePoint {
                        index: 0,
                        price: 2.0,
                    },
                    PricePoint {
                        index: 5,
                        price: 2.0,
                    },
                ],
            )
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        // Nothing applied, nothing appended.
        assert_eq!(order.items[0].agreed_price, None);
        assert!(order.messages.is_empty());
    }

    #[test]
    fn proposal_snapshot_totals_and_states() {
        let owner = buyer();
        let mut order = rice_order(&owner);

        order
            .send_proposal(
                &admin(),
                &[ProposeItem {
                    index: 0,
                    unit_price: Some(2.0),
                    qty: Some(10.0),
                }],
                Some("final"),
            )
            .unwrap();

        let proposal = order.proposal.as_ref().unwrap();
        assert_eq!(proposal.total, 20.0);
        assert_eq!(proposal.note, "final");
        assert_eq!(order.proposal_status, ProposalStatus::Sent);
        assert_eq!(order.status, OrderStatus::Proposed);
        assert_eq!(order.messages.len(), 1);
        assert_eq!(order.messages[0].body, "Sent final proposal");
    }

    #[test]
    fn proposal_unit_price_falls_back_to_minimum_bound() {
        let owner = buyer();
        let mut order =
            OrderDoc::create(owner.id, vec![rice_item(10.0), pepper_item(2.0)], None).unwrap();
        order.items[0].agreed_price = Some(2.0);

        order.send_proposal(&admin(), &[], None).unwrap();

        let proposal = order.proposal.as_ref().unwrap();
        assert_eq!(proposal.items[0].unit_price, 2.0);
        assert_eq!(proposal.items[1].unit_price, 6.0);
        assert_eq!(proposal.total, 2.0 * 10.0 + 6.0 * 2.0);
    }

    #[test]
    fn only_admin_may_send_proposals() {
        let owner = buyer();
        let mut order = rice_order(&owner);

        let err = order.send_proposal(&owner, &[], None).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn approve_confirms_and_fixes_final_total() {
        let owner = buyer();
        let mut order = rice_order(&owner);
        order
            .send_proposal(
                &admin(),
                &[ProposeItem {
                    index: 0,
                    unit_price: Some(2.0),
                    qty: Some(10.0),
                }],
                Some("final"),
            )
            .unwrap();

        order.approve_proposal(&owner).unwrap();

        assert_eq!(order.proposal_status, ProposalStatus::Approved);
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.final_total, Some(20.0));
        assert_eq!(order.messages.last().unwrap().body, "Approved proposal");
    }

    #[test]
    fn approve_without_sent_proposal_fails() {
        let owner = buyer();
        let mut order = rice_order(&owner);

        let err = order.approve_proposal(&owner).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
    }

    #[test]
    fn admin_cannot_approve_on_behalf_of_buyer() {
        let owner = buyer();
        let mut order = rice_order(&owner);
        order.send_proposal(&admin(), &[], None).unwrap();

        let err = order.approve_proposal(&admin()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn reject_reopens_negotiation() {
        let owner = buyer();
        let mut order = rice_order(&owner);
        order.send_proposal(&admin(), &[], None).unwrap();

        order.reject_proposal(&owner).unwrap();

        assert_eq!(order.proposal_status, ProposalStatus::Rejected);
        assert_eq!(order.status, OrderStatus::Negotiating);
    }

    #[test]
    fn buyer_cannot_cancel_after_approval() {
        let owner = buyer();
        let mut order = rice_order(&owner);
        order.send_proposal(&admin(), &[], None).unwrap();
        order.approve_proposal(&owner).unwrap();

        let err = order.cancel(&owner).unwrap_err();
        match err {
            AppError::PreconditionFailed(msg) => {
                assert_eq!(msg, "cannot cancel at this stage")
            }
            other => panic!("expected PreconditionFailed, got {other:?}"),
        }
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[test]
    fn buyer_cancel_before_approval_succeeds() {
        let owner = buyer();
        let mut order = rice_order(&owner);

        order.cancel(&owner).unwrap();

        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.messages.last().unwrap().body, "Order cancelled");
    }

    #[test]
    fn cancelled_order_stays_cancelled() {
        let owner = buyer();
        let mut order = rice_order(&owner);
        order.cancel(&owner).unwrap();
        let messages_before = order.messages.len();

        // Buyer retry fails; admin retry is a silent no-op.
        let err = order.cancel(&owner).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
        order.cancel(&admin()).unwrap();

        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.messages.len(), messages_before);
    }

    #[test]
    fn admin_may_cancel_confirmed_orders() {
        let owner = buyer();
        let mut order = rice_order(&owner);
        order.send_proposal(&admin(), &[], None).unwrap();
        order.approve_proposal(&owner).unwrap();

        order.cancel(&admin()).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn no_price_changes_once_confirmed() {
        let owner = buyer();
        let mut order = rice_order(&owner);
        order.send_proposal(&admin(), &[], None).unwrap();
        order.approve_proposal(&owner).unwrap();

        let offer = [PricePoint {
            index: 0,
            price: 0.5,
        }];
        let err = order.post_message(&owner, "lower?", &offer).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));

        let err = order.send_proposal(&admin(), &[], None).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));

        // Plain chat stays open after confirmation.
        order.post_message(&owner, "thanks", &[]).unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[test]
    fn ship_and_complete_are_admin_overwrites() {
        let owner = buyer();
        let mut order = rice_order(&owner);

        assert!(matches!(
            order.mark_shipped(&owner),
            Err(AppError::Forbidden)
        ));

        order.mark_shipped(&admin()).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);

        order.mark_completed(&admin()).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn shipment_update_appends_event_and_keeps_fields() {
        let owner = buyer();
        let mut order = rice_order(&owner);

        order
            .update_shipment(
                &admin(),
                ShipmentUpdate {
                    phase: Some(ShipmentPhase::InTransit),
                    note: None,
                    tracking_id: Some("TRK-1".into()),
                    eta: None,
                },
            )
            .unwrap();

        let shipment = order.shipment.as_ref().unwrap();
        assert_eq!(shipment.phase, Some(ShipmentPhase::InTransit));
        assert_eq!(shipment.tracking_id.as_deref(), Some("TRK-1"));
        assert_eq!(shipment.events.len(), 1);
        assert_eq!(shipment.events[0].phase, Some(ShipmentPhase::InTransit));

        // Note-only update keeps the current phase on the event.
        order
            .update_shipment(
                &admin(),
                ShipmentUpdate {
                    note: Some("held at customs".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let shipment = order.shipment.as_ref().unwrap();
        assert_eq!(shipment.phase, Some(ShipmentPhase::InTransit));
        assert_eq!(shipment.tracking_id.as_deref(), Some("TRK-1"));
        assert_eq!(shipment.events.len(), 2);
        assert_eq!(shipment.events[1].phase, Some(ShipmentPhase::InTransit));
        assert_eq!(shipment.events[1].note, "held at customs");
    }

    #[test]
    fn item_count_never_changes_and_ledger_only_grows() {
        let owner = buyer();
        let admin = admin();
        let mut order =
            OrderDoc::create(owner.id, vec![rice_item(10.0), pepper_item(5.0)], None).unwrap();
        let item_count = order.items.len();
        let mut ledger_len = 0usize;

        order.post_message(&owner, "hello", &[]).unwrap();
        assert!(order.messages.len() >= ledger_len);
        ledger_len = order.messages.len();

        order
            .post_message(
                &admin,
                "offer",
                &[PricePoint {
                    index: 0,
                    price: 1.9,
                }],
            )
            .unwrap();
        assert!(order.messages.len() >= ledger_len);
        ledger_len = order.messages.len();

        order.send_proposal(&admin, &[], None).unwrap();
        assert!(order.messages.len() >= ledger_len);
        ledger_len = order.messages.len();

        order.approve_proposal(&owner).unwrap();
        assert!(order.messages.len() >= ledger_len);

        assert_eq!(order.items.len(), item_count);
    }

    #[test]
    fn document_round_trips_with_wire_field_names() {
        let owner = buyer();
        let mut order = rice_order(&owner);
        order.send_proposal(&admin(), &[], Some("note")).unwrap();

        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["status"], "proposed");
        assert_eq!(value["proposalStatus"], "sent");
        assert!(value["totalMin"].is_number());
        assert!(value["items"][0]["priceRange"]["min"].is_number());

        let back: OrderDoc = serde_json::from_value(value).unwrap();
        assert_eq!(back, order);
    }
}
