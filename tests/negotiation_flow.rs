use marketplace_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        inquiries::{AgreeRequest, CreateInquiryRequest, InquiryItemRequest},
        orders::{CreateOrderRequest, PostMessageRequest, ProposeRequest},
    },
    entity::{products::ActiveModel as ProductActive, users::ActiveModel as UserActive},
    error::AppError,
    middleware::auth::AuthUser,
    negotiation::order::{NewOrderItem, OrderStatus, ProposalStatus, ProposeItem, ShipmentPhase, ShipmentUpdate},
    negotiation::{PricePoint, PriceRange, Role},
    routes::params::{OrderListQuery, Pagination},
    services::{inquiry_service, order_service},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

// Full backend flows against a real database. Runs as one test because the
// setup truncates shared tables.
#[tokio::test]
async fn negotiation_flows() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    order_negotiation_flow(&state).await?;
    inquiry_agreement_flow(&state).await?;
    Ok(())
}

// Buyer checks out -> chat opens negotiation -> admin proposes -> buyer
// approves -> admin tracks shipment and completes.
async fn order_negotiation_flow(state: &AppState) -> anyhow::Result<()> {
    let buyer_id = create_user(state, "user", "buyer@example.com").await?;
    let admin_id = create_user(state, "admin", "admin@example.com").await?;

    let buyer = AuthUser {
        user_id: buyer_id,
        role: Role::User,
    };
    let admin = AuthUser {
        user_id: admin_id,
        role: Role::Admin,
    };

    // Checkout
    let created = order_service::create_order(
        state,
        &buyer,
        CreateOrderRequest {
            items: vec![NewOrderItem {
                name: "Rice".into(),
                qty: 10.0,
                unit: Some("per kg".into()),
                price_range: Some(PriceRange {
                    min: 1.5,
                    max: 2.2,
                    currency: "EUR".into(),
                }),
                image: None,
                product_id: None,
            }],
            note: None,
        },
    )
    .await?;
    let order = created.data.unwrap();
    assert_eq!(order.doc.status, OrderStatus::Pending);
    assert_eq!(order.doc.total_min, 15.0);
    assert_eq!(order.doc.total_max, 22.0);
    let order_id = order.id;

    // First contact opens negotiation
    let after_message = order_service::post_message(
        state,
        &buyer,
        order_id,
        PostMessageRequest {
            body: Some("Can you quote for 10kg?".into()),
            price_proposal: None,
        },
    )
    .await?;
    assert_eq!(
        after_message.data.unwrap().doc.status,
        OrderStatus::Negotiating
    );

    // Admin sends the formal proposal
    let proposed = order_service::send_proposal(
        state,
        &admin,
        order_id,
        ProposeRequest {
            items: vec![ProposeItem {
                index: 0,
                unit_price: Some(2.0),
                qty: Some(10.0),
            }],
            note: Some("final".into()),
        },
    )
    .await?;
    let doc = proposed.data.unwrap().doc;
    assert_eq!(doc.status, OrderStatus::Proposed);
    assert_eq!(doc.proposal_status, ProposalStatus::Sent);
    assert_eq!(doc.proposal.as_ref().unwrap().total, 20.0);

    // Buyer approves
    let approved = order_service::approve_proposal(state, &buyer, order_id).await?;
    let doc = approved.data.unwrap().doc;
    assert_eq!(doc.status, OrderStatus::Confirmed);
    assert_eq!(doc.proposal_status, ProposalStatus::Approved);
    assert_eq!(doc.final_total, Some(20.0));

    // Too late to cancel for the buyer
    let err = order_service::cancel_order(state, &buyer, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));

    // Admin tracks the shipment
    let shipped = order_service::update_shipment(
        state,
        &admin,
        order_id,
        ShipmentUpdate {
            phase: Some(ShipmentPhase::InTransit),
            note: Some("left origin port".into()),
            tracking_id: Some("TRK-1".into()),
            eta: None,
        },
    )
    .await?;
    let shipment = shipped.data.unwrap().doc.shipment.unwrap();
    assert_eq!(shipment.phase, Some(ShipmentPhase::InTransit));
    assert_eq!(shipment.events.len(), 1);

    order_service::mark_shipped(state, &admin, order_id).await?;
    let completed = order_service::mark_completed(state, &admin, order_id).await?;
    assert_eq!(completed.data.unwrap().doc.status, OrderStatus::Completed);

    // Admin list filters by status set and shipment phase
    let listed = order_service::list_orders(
        state,
        &admin,
        OrderListQuery {
            pagination: Pagination {
                page: Some(1),
                per_page: Some(20),
            },
            status: Some("completed,cancelled".into()),
            phase: Some("in_transit".into()),
            user_id: Some(buyer_id),
            sort_order: None,
        },
    )
    .await?;
    let items = listed.data.unwrap().items;
    assert!(items.iter().any(|o| o.id == order_id));

    // Buyer listing never leaks other users' orders
    let mine = order_service::list_orders(
        state,
        &buyer,
        OrderListQuery {
            pagination: Pagination {
                page: None,
                per_page: None,
            },
            status: None,
            phase: None,
            user_id: None,
            sort_order: None,
        },
    )
    .await?;
    assert!(
        mine.data
            .unwrap()
            .items
            .iter()
            .all(|o| o.doc.user == buyer_id)
    );

    Ok(())
}

// Inquiry path: catalog snapshot at creation, admin bulk agreement.
async fn inquiry_agreement_flow(state: &AppState) -> anyhow::Result<()> {
    let buyer_id = create_user(state, "user", "inq-buyer@example.com").await?;
    let admin_id = create_user(state, "admin", "inq-admin@example.com").await?;
    let buyer = AuthUser {
        user_id: buyer_id,
        role: Role::User,
    };
    let admin = AuthUser {
        user_id: admin_id,
        role: Role::Admin,
    };

    // Seed a catalog product to snapshot prices from
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Arabica Coffee Beans".into()),
        slug: Set("arabica-coffee".into()),
        category: Set(Some("Coffee".into())),
        description: Set(None),
        unit: Set("per kg".into()),
        price_min: Set(10.5),
        price_max: Set(14.0),
        currency: Set("EUR".into()),
        image: Set(None),
        origin_country: Set(Some("Colombia".into())),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let created = inquiry_service::create_inquiry(
        state,
        &buyer,
        CreateInquiryRequest {
            items: vec![InquiryItemRequest {
                product_id: product.id,
                quantity: 100.0,
                unit: None,
                notes: None,
            }],
            note: Some("quarterly volume".into()),
        },
    )
    .await?;
    let inquiry = created.data.unwrap();
    let snapshot = &inquiry.doc.items[0].price_range;
    assert_eq!(snapshot.min, 10.5);
    assert_eq!(snapshot.max, 14.0);
    let inquiry_id = inquiry.id;

    let agreed = inquiry_service::agree_items(
        state,
        &admin,
        inquiry_id,
        AgreeRequest {
            agreements: vec![PricePoint {
                index: 0,
                price: 11.0,
            }],
        },
    )
    .await?;
    let doc = agreed.data.unwrap().doc;
    assert_eq!(doc.items[0].agreed_price, Some(11.0));
    assert_eq!(
        doc.status,
        marketplace_api::negotiation::InquiryStatus::Agreed
    );

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE orders, inquiries, audit_logs, products, categories, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { pool, orm })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(email.split('@').next().unwrap_or("user").to_string()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
