use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        inquiries::{
            AgreeRequest, CreateInquiryRequest, InquiryItemRequest, InquiryList,
            InquiryMessageRequest, InquiryView,
        },
        orders::{
            CreateOrderRequest, OrderList, OrderOwner, OrderView, PostMessageRequest,
            ProposeRequest,
        },
    },
    models::{Category, Product, User},
    negotiation::{
        inquiry::{InquiryDoc, InquiryItem, InquiryMessage, InquiryStatus},
        order::{
            NewOrderItem, OrderDoc, OrderItem, OrderMessage, OrderStatus, Proposal, ProposalItem,
            ProposalStatus, ProposeItem, Shipment, ShipmentEvent, ShipmentPhase, ShipmentUpdate,
        },
        PricePoint, PriceRange, Role,
    },
    response::{ApiResponse, Meta},
    routes::{auth, categories, health, inquiries, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        categories::list_categories,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::post_message,
        orders::propose,
        orders::approve,
        orders::reject,
        orders::cancel,
        orders::ship,
        orders::complete,
        orders::update_shipment,
        inquiries::create_inquiry,
        inquiries::list_inquiries,
        inquiries::get_inquiry,
        inquiries::post_message,
        inquiries::agree,
        inquiries::close,
    ),
    components(
        schemas(
            User,
            Product,
            Category,
            Role,
            PriceRange,
            PricePoint,
            OrderStatus,
            ProposalStatus,
            ShipmentPhase,
            OrderDoc,
            OrderItem,
            OrderMessage,
            Proposal,
            ProposalItem,
            Shipment,
            ShipmentEvent,
            ShipmentUpdate,
            NewOrderItem,
            ProposeItem,
            InquiryStatus,
            InquiryDoc,
            InquiryItem,
            InquiryMessage,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateOrderRequest,
            PostMessageRequest,
            ProposeRequest,
            OrderOwner,
            OrderView,
            OrderList,
            CreateInquiryRequest,
            InquiryItemRequest,
            InquiryMessageRequest,
            AgreeRequest,
            InquiryView,
            InquiryList,
            products::ProductList,
            products::CreateProductRequest,
            products::UpdateProductRequest,
            categories::CategoryList,
            categories::CreateCategoryRequest,
            categories::UpdateCategoryRequest,
            params::Pagination,
            params::OrderListQuery,
            params::InquiryListQuery,
            params::ProductQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<OrderView>,
            ApiResponse<OrderList>,
            ApiResponse<InquiryView>,
            ApiResponse<InquiryList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog product endpoints"),
        (name = "Categories", description = "Catalog category endpoints"),
        (name = "Orders", description = "Order negotiation endpoints"),
        (name = "Inquiries", description = "Pre-order inquiry endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
