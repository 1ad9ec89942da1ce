use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    dto::orders::{CreateOrderRequest, OrderList, OrderOwner, OrderView, PostMessageRequest, ProposeRequest},
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    negotiation::order::{OrderDoc, ShipmentUpdate},
    negotiation::Role,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderView>> {
    let doc = OrderDoc::create(user.user_id, payload.items, payload.note)?;

    let model = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(doc.user),
        status: Set(doc.status.as_str().to_string()),
        proposal_status: Set(doc.proposal_status.as_str().to_string()),
        shipment_phase: Set(None),
        currency: Set(doc.currency.clone()),
        total_min: Set(doc.total_min),
        total_max: Set(doc.total_max),
        final_total: Set(None),
        doc: Set(to_doc_value(&doc)?),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    record_audit(state, user, "order_created", model.id, &doc).await;

    let owner = resolve_owner(&state.orm, doc.user).await?;
    Ok(ApiResponse::success(
        "Order created",
        view(model, doc, owner),
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if user.role != Role::Admin {
        condition = condition.add(OrderCol::UserId.eq(user.user_id));
    } else if let Some(user_id) = query.user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let statuses: Vec<String> = status
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        condition = condition.add(OrderCol::Status.is_in(statuses));
    }
    if let Some(phase) = query.phase.as_ref().filter(|p| !p.is_empty()) {
        condition = condition.add(OrderCol::ShipmentPhase.eq(phase.clone()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let owner_ids: Vec<Uuid> = models.iter().map(|m| m.user_id).collect();
    let owners: HashMap<Uuid, OrderOwner> = Users::find()
        .filter(UserCol::Id.is_in(owner_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|u| (u.id, owner_from_entity(u)))
        .collect();

    let mut items = Vec::with_capacity(models.len());
    for model in models {
        let doc = from_doc_value(&model)?;
        let owner = owners.get(&model.user_id).cloned();
        items.push(view(model, doc, owner));
    }

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    let model = Orders::find_by_id(id).one(&state.orm).await?;
    let model = match model {
        Some(m) => m,
        None => return Err(AppError::NotFound),
    };

    let doc = from_doc_value(&model)?;
    doc.ensure_participant(&user.actor())?;

    let owner = resolve_owner(&state.orm, doc.user).await?;
    Ok(ApiResponse::success(
        "Ok",
        view(model, doc, owner),
        Some(Meta::empty()),
    ))
}

pub async fn post_message(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: PostMessageRequest,
) -> AppResult<ApiResponse<OrderView>> {
    let actor = user.actor();
    let body = payload.body.unwrap_or_default();
    let proposals = payload.price_proposal.unwrap_or_default();
    mutate_order(state, user, id, "Message posted", None, move |doc| {
        doc.post_message(&actor, &body, &proposals)
    })
    .await
}

pub async fn send_proposal(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ProposeRequest,
) -> AppResult<ApiResponse<OrderView>> {
    let actor = user.actor();
    mutate_order(
        state,
        user,
        id,
        "Proposal sent",
        Some("proposal_sent"),
        move |doc| doc.send_proposal(&actor, &payload.items, payload.note.as_deref()),
    )
    .await
}

pub async fn approve_proposal(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    let actor = user.actor();
    mutate_order(
        state,
        user,
        id,
        "Proposal approved",
        Some("proposal_approved"),
        move |doc| doc.approve_proposal(&actor),
    )
    .await
}

pub async fn reject_proposal(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    let actor = user.actor();
    mutate_order(
        state,
        user,
        id,
        "Proposal rejected",
        Some("proposal_rejected"),
        move |doc| doc.reject_proposal(&actor),
    )
    .await
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    let actor = user.actor();
    mutate_order(
        state,
        user,
        id,
        "Order cancelled",
        Some("order_cancelled"),
        move |doc| doc.cancel(&actor),
    )
    .await
}

pub async fn mark_shipped(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    let actor = user.actor();
    mutate_order(
        state,
        user,
        id,
        "Order shipped",
        Some("order_shipped"),
        move |doc| doc.mark_shipped(&actor),
    )
    .await
}

pub async fn mark_completed(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    let actor = user.actor();
    mutate_order(
        state,
        user,
        id,
        "Order completed",
        Some("order_completed"),
        move |doc| doc.mark_completed(&actor),
    )
    .await
}

pub async fn update_shipment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ShipmentUpdate,
) -> AppResult<ApiResponse<OrderView>> {
    let actor = user.actor();
    mutate_order(state, user, id, "Shipment updated", None, move |doc| {
        doc.update_shipment(&actor, payload)
    })
    .await
}

/// Single atomic read-modify-write: lock the one row, apply the state
/// machine operation in memory, write the whole document back.
async fn mutate_order<F>(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    message: &str,
    audit_action: Option<&str>,
    op: F,
) -> AppResult<ApiResponse<OrderView>>
where
    F: FnOnce(&mut OrderDoc) -> Result<(), AppError>,
{
    let txn = state.orm.begin().await?;

    let (model, mut doc) = load_for_update(&txn, id).await?;
    op(&mut doc)?;
    let model = persist(&txn, model, &doc).await?;

    txn.commit().await?;

    if let Some(action) = audit_action {
        record_audit(state, user, action, model.id, &doc).await;
    }

    let owner = resolve_owner(&state.orm, doc.user).await?;
    Ok(ApiResponse::success(
        message,
        view(model, doc, owner),
        Some(Meta::empty()),
    ))
}

async fn load_for_update(
    txn: &DatabaseTransaction,
    id: Uuid,
) -> AppResult<(OrderModel, OrderDoc)> {
    let model = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?;
    let model = match model {
        Some(m) => m,
        None => return Err(AppError::NotFound),
    };
    let doc = from_doc_value(&model)?;
    Ok((model, doc))
}

async fn persist(
    txn: &DatabaseTransaction,
    model: OrderModel,
    doc: &OrderDoc,
) -> AppResult<OrderModel> {
    let mut active: OrderActive = model.into();
    active.status = Set(doc.status.as_str().to_string());
    active.proposal_status = Set(doc.proposal_status.as_str().to_string());
    active.shipment_phase = Set(doc.shipment_phase().map(|p| p.as_str().to_string()));
    active.final_total = Set(doc.final_total);
    active.doc = Set(to_doc_value(doc)?);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(txn).await?)
}

async fn record_audit(state: &AppState, user: &AuthUser, action: &str, order_id: Uuid, doc: &OrderDoc) {
    audit::record(
        &state.pool,
        Some(user.user_id),
        action,
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id, "status": doc.status.as_str() })),
    )
    .await;
}

async fn resolve_owner(orm: &OrmConn, user_id: Uuid) -> AppResult<Option<OrderOwner>> {
    Ok(Users::find_by_id(user_id)
        .one(orm)
        .await?
        .map(owner_from_entity))
}

fn owner_from_entity(model: UserModel) -> OrderOwner {
    OrderOwner {
        id: model.id,
        name: model.name,
        email: model.email,
        role: model.role,
    }
}

fn view(model: OrderModel, doc: OrderDoc, owner: Option<OrderOwner>) -> OrderView {
    OrderView {
        id: model.id,
        owner,
        doc,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn to_doc_value(doc: &OrderDoc) -> AppResult<serde_json::Value> {
    serde_json::to_value(doc)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize order document: {e}")))
}

fn from_doc_value(model: &OrderModel) -> AppResult<OrderDoc> {
    serde_json::from_value(model.doc.clone())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt order document: {e}")))
}
