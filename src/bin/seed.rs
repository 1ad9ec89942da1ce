use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use marketplace_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "Admin", "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "Demo Buyer", "user@example.com", "user123", "user").await?;
    seed_categories(&pool).await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let categories = vec![
        ("Coffee", "coffee", "Green and roasted beans"),
        ("Grains", "grains", "Rice, wheat and cereals"),
        ("Spices", "spices", "Whole and ground spices"),
    ];

    for (name, slug, desc) in categories {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .bind(desc)
        .execute(pool)
        .await?;
    }

    println!("Seeded categories");
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        (
            "Arabica Coffee Beans",
            "arabica-coffee",
            "Coffee",
            "Premium Arabica beans, washed process.",
            10.5,
            14.0,
            "Colombia",
        ),
        (
            "Basmati Rice",
            "basmati-rice",
            "Grains",
            "Aged long-grain basmati.",
            1.5,
            2.2,
            "India",
        ),
        (
            "Black Pepper (Whole)",
            "black-pepper",
            "Spices",
            "Strong aroma, sun-dried.",
            6.0,
            8.2,
            "Vietnam",
        ),
    ];

    for (name, slug, category, desc, price_min, price_max, origin) in products {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, slug, category, description, unit, price_min, price_max, currency, origin_country)
            VALUES ($1, $2, $3, $4, $5, 'per kg', $6, $7, 'EUR', $8)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .bind(category)
        .bind(desc)
        .bind(price_min)
        .bind(price_max)
        .bind(origin)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
