use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price_min: f64,
    pub price_max: f64,
    pub currency: Option<String>,
    pub image: Option<String>,
    pub origin_country: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub currency: Option<String>,
    pub image: Option<String>,
    pub origin_country: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_product))
        .route("/", axum::routing::get(list_products))
        // Reads address products by slug; admin mutations by id.
        .route(
            "/{slug}",
            axum::routing::get(get_product)
                .put(update_product)
                .delete(delete_product),
        )
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("q" = Option<String>, Query, description = "Match against name, description, category"),
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let (page, limit, offset) = query.pagination.normalize();

    let items = sqlx::query_as::<_, Product>(
        r#"
        SELECT * FROM products
        WHERE ($1::text IS NULL
               OR name ILIKE '%' || $1 || '%'
               OR description ILIKE '%' || $1 || '%'
               OR category ILIKE '%' || $1 || '%')
          AND ($2::text IS NULL OR category = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(query.q.as_deref())
    .bind(query.category.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT count(*) FROM products
        WHERE ($1::text IS NULL
               OR name ILIKE '%' || $1 || '%'
               OR description ILIKE '%' || $1 || '%'
               OR category ILIKE '%' || $1 || '%')
          AND ($2::text IS NULL OR category = $2)
        "#,
    )
    .bind(query.q.as_deref())
    .bind(query.category.as_deref())
    .fetch_one(&state.pool)
    .await?;

    let meta = Meta::new(page, limit, total.0);
    let data = ProductList { items };
    Ok(Json(ApiResponse::success("Products", data, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/api/products/{slug}",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let result = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1")
        .bind(slug.as_str())
        .fetch_optional(&state.pool)
        .await?;
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(Json(ApiResponse::success("Product", result, None)))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    ensure_admin(&user)?;
    if payload.price_min < 0.0 || payload.price_max < payload.price_min {
        return Err(AppError::BadRequest("invalid price range".into()));
    }

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products
            (id, name, slug, category, description, unit, price_min, price_max, currency, image, origin_country)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.name)
    .bind(payload.slug)
    .bind(payload.category)
    .bind(payload.description)
    .bind(payload.unit.unwrap_or_else(|| "per kg".to_string()))
    .bind(payload.price_min)
    .bind(payload.price_max)
    .bind(payload.currency.unwrap_or_else(|| "EUR".to_string()))
    .bind(payload.image)
    .bind(payload.origin_country)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    ensure_admin(&user)?;

    let existing = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let category = payload.category.or(existing.category);
    let description = payload.description.or(existing.description);
    let unit = payload.unit.unwrap_or(existing.unit);
    let price_min = payload.price_min.unwrap_or(existing.price_min);
    let price_max = payload.price_max.unwrap_or(existing.price_max);
    let currency = payload.currency.unwrap_or(existing.currency);
    let image = payload.image.or(existing.image);
    let origin_country = payload.origin_country.or(existing.origin_country);

    if price_min < 0.0 || price_max < price_min {
        return Err(AppError::BadRequest("invalid price range".into()));
    }

    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name = $2, category = $3, description = $4, unit = $5,
            price_min = $6, price_max = $7, currency = $8, image = $9, origin_country = $10
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(category)
    .bind(description)
    .bind(unit)
    .bind(price_min)
    .bind(price_max)
    .bind(currency)
    .bind(image)
    .bind(origin_country)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Updated",
        product,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Deleted product"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    ensure_admin(&user)?;

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}
