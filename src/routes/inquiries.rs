use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::inquiries::{
        AgreeRequest, CreateInquiryRequest, InquiryList, InquiryMessageRequest, InquiryView,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::InquiryListQuery,
    services::inquiry_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_inquiry).get(list_inquiries))
        .route("/{id}", get(get_inquiry))
        .route("/{id}/messages", post(post_message))
        .route("/{id}/agree", post(agree))
        .route("/{id}/close", post(close))
}

#[utoipa::path(
    post,
    path = "/api/inquiries",
    request_body = CreateInquiryRequest,
    responses(
        (status = 201, description = "Create inquiry against catalog price ranges", body = ApiResponse<InquiryView>),
        (status = 400, description = "No items provided"),
        (status = 404, description = "Referenced product missing"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn create_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateInquiryRequest>,
) -> AppResult<Json<ApiResponse<InquiryView>>> {
    let resp = inquiry_service::create_inquiry(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/inquiries",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List inquiries, scoped to owner unless admin", body = ApiResponse<InquiryList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn list_inquiries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<InquiryListQuery>,
) -> AppResult<Json<ApiResponse<InquiryList>>> {
    let resp = inquiry_service::list_inquiries(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/inquiries/{id}",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    responses(
        (status = 200, description = "Get inquiry", body = ApiResponse<InquiryView>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn get_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<InquiryView>>> {
    let resp = inquiry_service::get_inquiry(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/inquiries/{id}/messages",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    request_body = InquiryMessageRequest,
    responses(
        (status = 200, description = "Post message, optionally with a price proposal", body = ApiResponse<InquiryView>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn post_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<InquiryMessageRequest>,
) -> AppResult<Json<ApiResponse<InquiryView>>> {
    let resp = inquiry_service::post_message(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/inquiries/{id}/agree",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    request_body = AgreeRequest,
    responses(
        (status = 200, description = "Record agreed prices in bulk (admin only)", body = ApiResponse<InquiryView>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn agree(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AgreeRequest>,
) -> AppResult<Json<ApiResponse<InquiryView>>> {
    let resp = inquiry_service::agree_items(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(post, path = "/api/inquiries/{id}/close", tag = "Inquiries")]
pub async fn close(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<InquiryView>>> {
    let resp = inquiry_service::close_inquiry(&state, &user, id).await?;
    Ok(Json(resp))
}
