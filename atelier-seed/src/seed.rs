//! Fill the store with catalogue products, demo users and random orders.
//!
//! User and order seeding is a reconcile to a target count: rows above the
//! target are deleted newest first, missing rows are generated.

use atelier_core::auth::hash_password;
use atelier_core::AtelierError;
use chrono::{Duration, Local, NaiveDate};
use sqlx::SqlitePool;

use crate::catalogue::CleanProduct;

pub const DEMO_PASSWORD: &str = "password123";

pub const ORDER_STATUSES: [&str; 5] = ["ordered", "packed", "shipped", "out for delivery", "delivered"];

const FIRST_NAMES: [&str; 12] = [
    "asha", "ravi", "meera", "arjun", "kavya", "rohan", "isha", "vikram", "nisha", "kabir", "tara", "dev",
];

/// Outcome of one seeding step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: u64,
    pub deleted: u64,
    pub skipped: u64,
    pub total: i64,
}

/// Upsert products by P_ID inside one transaction.
pub async fn seed_products(pool: &SqlitePool, products: &[CleanProduct]) -> Result<SeedReport, AtelierError> {
    let mut tx = pool.begin().await?;
    let mut report = SeedReport::default();

    for product in products {
        let result = sqlx::query(
            r#"
            INSERT OR REPLACE INTO PRODUCTS (
                P_ID, NAME, PRICE, COLOUR, BRAND, IMG,
                RATINGCOUNT, AVG_RATING, DESCRIPTION, P_ATTRIBUTES,
                TOP_TYPE, SLEEVE_LENGTH, OCCASION, PRINT_PATTERN, FABRIC,
                HAS_DUPATTA, IS_SUSTAINABLE, SEARCH_TEXT
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.p_id)
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.colour)
        .bind(&product.brand)
        .bind(&product.img)
        .bind(product.rating_count)
        .bind(product.avg_rating)
        .bind(&product.description)
        .bind(&product.p_attributes)
        .bind(&product.top_type)
        .bind(&product.sleeve_length)
        .bind(&product.occasion)
        .bind(&product.print_pattern)
        .bind(&product.fabric)
        .bind(product.has_dupatta)
        .bind(product.is_sustainable)
        .bind(&product.search_text)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => report.inserted += 1,
            Err(e) => {
                tracing::warn!(p_id = %product.p_id, error = %e, "Failed to insert product");
                report.skipped += 1;
            }
        }
    }

    tx.commit().await?;
    report.total = count(pool, "PRODUCTS").await?;
    tracing::info!(inserted = report.inserted, skipped = report.skipped, "Products seeded");
    Ok(report)
}

/// Trim or top up USERS to `target`. New users share the demo password.
pub async fn seed_users(pool: &SqlitePool, target: i64) -> Result<SeedReport, AtelierError> {
    // Orders of users about to be trimmed go first; foreign keys are enforced.
    let excess = count(pool, "USERS").await? - target.max(0);
    if excess > 0 {
        sqlx::query(
            "DELETE FROM ORDERS WHERE USER_ID IN (SELECT USER_ID FROM USERS ORDER BY USER_ID DESC LIMIT ?)",
        )
        .bind(excess)
        .execute(pool)
        .await?;
    }
    let mut report = SeedReport {
        deleted: trim_newest(pool, "USERS", "USER_ID", target).await?,
        ..Default::default()
    };

    let missing = (target - count(pool, "USERS").await?).max(0);
    let password = hash_password(DEMO_PASSWORD);
    for _ in 0..missing {
        let username = random_username();
        let result = sqlx::query("INSERT OR IGNORE INTO USERS (USERNAME, EMAIL, PASSWORD) VALUES (?, ?, ?)")
            .bind(&username)
            .bind(format!("{}@example.com", username))
            .bind(&password)
            .execute(pool)
            .await?;
        if result.rows_affected() == 1 {
            report.inserted += 1;
        } else {
            report.skipped += 1;
        }
    }

    report.total = count(pool, "USERS").await?;
    tracing::info!(inserted = report.inserted, deleted = report.deleted, total = report.total, "Users seeded");
    Ok(report)
}

/// Trim or top up ORDERS to `target` with random orders for existing users
/// and products, dated relative to `today`.
pub async fn seed_orders(pool: &SqlitePool, target: i64, today: NaiveDate) -> Result<SeedReport, AtelierError> {
    let users: Vec<i64> = sqlx::query_scalar("SELECT USER_ID FROM USERS").fetch_all(pool).await?;
    if users.is_empty() {
        return Err(AtelierError::Other("No users found. Seed users first.".to_string()));
    }
    let products: Vec<(String, Option<String>)> = sqlx::query_as("SELECT P_ID, DESCRIPTION FROM PRODUCTS")
        .fetch_all(pool)
        .await?;
    if products.is_empty() {
        return Err(AtelierError::Other("No products found. Seed products first.".to_string()));
    }

    let mut report = SeedReport {
        deleted: trim_newest(pool, "ORDERS", "ORDER_ID", target).await?,
        ..Default::default()
    };

    let missing = (target - count(pool, "ORDERS").await?).max(0);
    for _ in 0..missing {
        let order = random_order(&users, &products, today);
        sqlx::query(
            r#"
            INSERT INTO ORDERS (
                PRODUCT_ID, USER_ID, PRODUCT_DESCRIPTION,
                ORDER_DATE, SHIPPING_DATE, DELIVERY_DATE,
                AMOUNT, STATUS, DELIVERY_PARTNER_NO
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.product_id)
        .bind(order.user_id)
        .bind(&order.description)
        .bind(order.order_date.to_string())
        .bind(order.shipping_date.to_string())
        .bind(order.delivery_date.to_string())
        .bind(order.amount)
        .bind(order.status)
        .bind(&order.delivery_partner_no)
        .execute(pool)
        .await?;
        report.inserted += 1;
    }

    report.total = count(pool, "ORDERS").await?;
    tracing::info!(inserted = report.inserted, deleted = report.deleted, total = report.total, "Orders seeded");
    Ok(report)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug)]
struct RandomOrder {
    product_id: String,
    user_id: i64,
    description: String,
    order_date: NaiveDate,
    shipping_date: NaiveDate,
    delivery_date: NaiveDate,
    amount: f64,
    status: &'static str,
    delivery_partner_no: String,
}

fn random_order(users: &[i64], products: &[(String, Option<String>)], today: NaiveDate) -> RandomOrder {
    let (product_id, description) = &products[fastrand::usize(..products.len())];
    let order_date = today - Duration::days(fastrand::i64(1..=30));
    let shipping_date = order_date + Duration::days(fastrand::i64(1..=3));
    let delivery_date = shipping_date + Duration::days(fastrand::i64(2..=7));

    RandomOrder {
        product_id: product_id.clone(),
        user_id: users[fastrand::usize(..users.len())],
        description: description.clone().unwrap_or_default(),
        order_date,
        shipping_date,
        delivery_date,
        amount: fastrand::u32(500..=5000) as f64,
        status: ORDER_STATUSES[fastrand::usize(..ORDER_STATUSES.len())],
        delivery_partner_no: fastrand::u64(1_000_000_000..=9_999_999_999).to_string(),
    }
}

fn random_username() -> String {
    format!(
        "{}{}",
        FIRST_NAMES[fastrand::usize(..FIRST_NAMES.len())],
        fastrand::u32(100..100_000)
    )
}

async fn count(pool: &SqlitePool, table: &'static str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
}

/// Delete the newest rows above `target`; returns the number deleted.
async fn trim_newest(
    pool: &SqlitePool,
    table: &'static str,
    id_column: &'static str,
    target: i64,
) -> Result<u64, sqlx::Error> {
    let excess = count(pool, table).await? - target.max(0);
    if excess <= 0 {
        return Ok(0);
    }
    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE {id} IN (SELECT {id} FROM {table} ORDER BY {id} DESC LIMIT ?)",
        table = table,
        id = id_column
    ))
    .bind(excess)
    .execute(pool)
    .await?;
    tracing::info!(table, deleted = result.rows_affected(), "Trimmed excess rows");
    Ok(result.rows_affected())
}
