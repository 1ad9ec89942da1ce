use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    dto::inquiries::{AgreeRequest, CreateInquiryRequest, InquiryList, InquiryMessageRequest, InquiryView},
    dto::orders::OrderOwner,
    entity::{
        inquiries::{ActiveModel as InquiryActive, Column as InquiryCol, Entity as Inquiries, Model as InquiryModel},
        products::{Column as ProdCol, Entity as Products},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    negotiation::inquiry::{InquiryDoc, InquiryItem},
    negotiation::{PriceRange, Role},
    response::{ApiResponse, Meta},
    routes::params::{InquiryListQuery, SortOrder},
    state::AppState,
};

/// Create an inquiry from desired items, snapshotting unit and price range
/// from the catalog. Prices are frozen here and never re-read.
pub async fn create_inquiry(
    state: &AppState,
    user: &AuthUser,
    payload: CreateInquiryRequest,
) -> AppResult<ApiResponse<InquiryView>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("no items provided".into()));
    }

    let product_ids: Vec<Uuid> = payload.items.iter().map(|i| i.product_id).collect();
    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut items = Vec::with_capacity(payload.items.len());
    for req in payload.items {
        let product = products.get(&req.product_id).ok_or(AppError::NotFound)?;
        items.push(InquiryItem {
            product: product.id,
            quantity: if req.quantity >= 1.0 { req.quantity } else { 1.0 },
            unit: req.unit.unwrap_or_else(|| product.unit.clone()),
            price_range: PriceRange {
                min: product.price_min,
                max: product.price_max,
                currency: product.currency.clone(),
            },
            notes: req.notes.or_else(|| payload.note.clone()),
            agreed_price: None,
        });
    }

    let doc = InquiryDoc::create(user.user_id, items)?;

    let model = InquiryActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(doc.user),
        status: Set(doc.status.as_str().to_string()),
        doc: Set(to_doc_value(&doc)?),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "inquiry_created",
        Some("inquiries"),
        Some(serde_json::json!({ "inquiry_id": model.id })),
    )
    .await;

    let owner = resolve_owner(&state.orm, doc.user).await?;
    Ok(ApiResponse::success(
        "Inquiry created",
        view(model, doc, owner),
        Some(Meta::empty()),
    ))
}

pub async fn list_inquiries(
    state: &AppState,
    user: &AuthUser,
    query: InquiryListQuery,
) -> AppResult<ApiResponse<InquiryList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if user.role != Role::Admin {
        condition = condition.add(InquiryCol::UserId.eq(user.user_id));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(InquiryCol::Status.eq(status.clone()));
    }

    let mut finder = Inquiries::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(InquiryCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(InquiryCol::CreatedAt),
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
    Ok(ApiResponse::success("Ok", InquiryList { items }, Some(meta)))
}

pub async fn get_inquiry(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<InquiryView>> {
    let model = Inquiries::find_by_id(id).one(&state.orm).await?;
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
    payload: InquiryMessageRequest,
) -> AppResult<ApiResponse<InquiryView>> {
    let actor = user.actor();
    let body = payload.body.unwrap_or_default();
    mutate_inquiry(state, id, "Message posted", move |doc| {
        doc.post_message(&actor, &body, payload.price_proposal)
    })
    .await
}

pub async fn agree_items(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AgreeRequest,
) -> AppResult<ApiResponse<InquiryView>> {
    let actor = user.actor();
    let resp = mutate_inquiry(state, id, "Agreements recorded", move |doc| {
        doc.agree_items(&actor, &payload.agreements)
    })
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "inquiry_agreed",
        Some("inquiries"),
        Some(serde_json::json!({ "inquiry_id": id })),
    )
    .await;

    Ok(resp)
}

pub async fn close_inquiry(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<InquiryView>> {
    let actor = user.actor();
    mutate_inquiry(state, id, "Inquiry closed", move |doc| doc.close(&actor)).await
}

async fn mutate_inquiry<F>(
    state: &AppState,
    id: Uuid,
    message: &str,
    op: F,
) -> AppResult<ApiResponse<InquiryView>>
where
    F: FnOnce(&mut InquiryDoc) -> Result<(), AppError>,
{
    let txn = state.orm.begin().await?;

    let model = Inquiries::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let model = match model {
        Some(m) => m,
        None => return Err(AppError::NotFound),
    };
    let mut doc = from_doc_value(&model)?;

    op(&mut doc)?;

    let mut active: InquiryActive = model.into();
    active.status = Set(doc.status.as_str().to_string());
    active.doc = Set(to_doc_value(&doc)?);
    active.updated_at = Set(Utc::now().into());
    let model = active.update(&txn).await?;

    txn.commit().await?;

    let owner = resolve_owner(&state.orm, doc.user).await?;
    Ok(ApiResponse::success(
        message,
        view(model, doc, owner),
        Some(Meta::empty()),
    ))
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

fn view(model: InquiryModel, doc: InquiryDoc, owner: Option<OrderOwner>) -> InquiryView {
    InquiryView {
        id: model.id,
        owner,
        doc,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn to_doc_value(doc: &InquiryDoc) -> AppResult<serde_json::Value> {
    serde_json::to_value(doc)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize inquiry document: {e}")))
}

fn from_doc_value(model: &InquiryModel) -> AppResult<InquiryDoc> {
    serde_json::from_value(model.doc.clone())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt inquiry document: {e}")))
}
