use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, OrderView, PostMessageRequest, ProposeRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    negotiation::order::ShipmentUpdate,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/{id}", get(get_order))
        .route("/{id}/messages", post(post_message))
        .route("/{id}/propose", post(propose))
        .route("/{id}/approve", post(approve))
        .route("/{id}/reject", post(reject))
        .route("/{id}/cancel", post(cancel))
        .route("/{id}/ship", post(ship))
        .route("/{id}/complete", post(complete))
        .route("/{id}/shipment", post(update_shipment))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Create order from cart items", body = ApiResponse<OrderView>),
        (status = 400, description = "No items provided"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::create_order(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("status" = Option<String>, Query, description = "Comma-separated status set"),
        ("phase" = Option<String>, Query, description = "Shipment phase filter"),
        ("user_id" = Option<Uuid>, Query, description = "Admin only: scope to one buyer"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List orders, scoped to owner unless admin", body = ApiResponse<OrderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Get order", body = ApiResponse<OrderView>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/messages",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = PostMessageRequest,
    responses(
        (status = 200, description = "Post a chat message, optionally with price offers", body = ApiResponse<OrderView>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn post_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::post_message(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/propose",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ProposeRequest,
    responses(
        (status = 200, description = "Send final proposal (admin only)", body = ApiResponse<OrderView>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn propose(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProposeRequest>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::send_proposal(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/approve",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Approve the pending proposal (owner only)", body = ApiResponse<OrderView>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "No proposal to approve"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn approve(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::approve_proposal(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/reject",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Reject the pending proposal (owner only)", body = ApiResponse<OrderView>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "No proposal to reject"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn reject(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::reject_proposal(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Cancel order (admin anytime; owner before approval)", body = ApiResponse<OrderView>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Cannot cancel at this stage"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::cancel_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(post, path = "/api/orders/{id}/ship", tag = "Orders")]
pub async fn ship(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::mark_shipped(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(post, path = "/api/orders/{id}/complete", tag = "Orders")]
pub async fn complete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::mark_completed(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/shipment",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ShipmentUpdate,
    responses(
        (status = 200, description = "Update shipment tracking (admin only)", body = ApiResponse<OrderView>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_shipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShipmentUpdate>,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::update_shipment(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
