//! Seed the database with demo catalog data.
//!
//! Inserts an admin user and a small fragrance catalog so a fresh
//! environment has something to sell. Idempotence is intentionally not
//! attempted: run against an empty database.

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use ambra_core::{ProductLabel, ProductStatus, UserRole};

/// Errors that can occur while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

struct SeedSize {
    value: i32,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    stock: i32,
}

struct SeedProduct {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    tags: &'static [&'static str],
    label: ProductLabel,
    sizes: Vec<SeedSize>,
}

fn demo_catalog() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            title: "Amber Oud Intense",
            description: "Resinous amber over smoked oud, our house signature.",
            category: "Oriental Fragrances",
            tags: &["amber", "oud", "evening"],
            label: ProductLabel::Featured,
            sizes: vec![
                SeedSize {
                    value: 50,
                    price: Decimal::new(120_00, 2),
                    compare_at_price: None,
                    stock: 25,
                },
                SeedSize {
                    value: 100,
                    price: Decimal::new(190_00, 2),
                    compare_at_price: Some(Decimal::new(220_00, 2)),
                    stock: 12,
                },
            ],
        },
        SeedProduct {
            title: "Vetiver Matin",
            description: "Green vetiver with bergamot and a salt-air finish.",
            category: "Fresh Fragrances",
            tags: &["vetiver", "citrus", "daytime"],
            label: ProductLabel::Featured,
            sizes: vec![
                SeedSize {
                    value: 50,
                    price: Decimal::new(85_00, 2),
                    compare_at_price: None,
                    stock: 40,
                },
                SeedSize {
                    value: 100,
                    price: Decimal::new(140_00, 2),
                    compare_at_price: None,
                    stock: 18,
                },
            ],
        },
        SeedProduct {
            title: "Rose Taif Noir",
            description: "Taif rose darkened with patchouli and black pepper.",
            category: "Floral Fragrances",
            tags: &["rose", "patchouli"],
            label: ProductLabel::NewArrival,
            sizes: vec![SeedSize {
                value: 50,
                price: Decimal::new(110_00, 2),
                compare_at_price: None,
                stock: 30,
            }],
        },
        SeedProduct {
            title: "Cedre Blanc",
            description: "Dry cedarwood, iris, and a clean musk base.",
            category: "Woody Fragrances",
            tags: &["cedar", "musk", "unisex"],
            label: ProductLabel::None,
            sizes: vec![
                SeedSize {
                    value: 30,
                    price: Decimal::new(55_00, 2),
                    compare_at_price: None,
                    stock: 60,
                },
                SeedSize {
                    value: 100,
                    price: Decimal::new(125_00, 2),
                    compare_at_price: None,
                    stock: 0,
                },
            ],
        },
    ]
}

/// Seed the database.
///
/// # Errors
///
/// Returns an error if `AMBRA_DATABASE_URL` is unset or any insert fails.
pub async fn run() -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("AMBRA_DATABASE_URL")
        .map_err(|_| SeedError::MissingEnvVar("AMBRA_DATABASE_URL"))?;

    let pool = PgPool::connect(&database_url).await?;
    let mut tx = pool.begin().await?;

    let admin_id = Uuid::new_v4();
    sqlx::query(
        r"
        INSERT INTO users (id, email, name, role, email_verified)
        VALUES ($1, $2, $3, $4, TRUE)
        ",
    )
    .bind(admin_id)
    .bind("admin@ambra.shop")
    .bind("Ambra Admin")
    .bind(UserRole::Admin)
    .execute(&mut *tx)
    .await?;

    let catalog = demo_catalog();
    for product in &catalog {
        let product_id = Uuid::new_v4();

        sqlx::query(
            r"
            INSERT INTO products (id, title, description, category, images, tags, status, label, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(product_id)
        .bind(product.title)
        .bind(product.description)
        .bind(product.category)
        .bind(json!([]))
        .bind(
            product
                .tags
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>(),
        )
        .bind(ProductStatus::Active)
        .bind(product.label)
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;

        for size in &product.sizes {
            sqlx::query(
                r"
                INSERT INTO product_sizes (id, product_id, value, price, compare_at_price, stock)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(size.value)
            .bind(size.price)
            .bind(size.compare_at_price)
            .bind(size.stock)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    tracing::info!(products = catalog.len(), "Seed complete");
    Ok(())
}
