//! SQLite queries behind the conversation handlers and the login endpoint.
//!
//! Each function issues exactly one statement. Column names are upper-case in
//! the schema; order lookups alias them to the `OrderDetails` field names.

use atelier_core::models::{OrderDetails, ProductSummary, User};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const PRODUCT_SUMMARY_COLUMNS: &str = "SELECT P_ID, NAME, PRICE, COLOUR, BRAND, IMG, DESCRIPTION FROM PRODUCTS";

/// Values for a new ORDERS row. Dates are ISO `YYYY-MM-DD`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub product_id: String,
    pub user_id: i64,
    pub product_description: String,
    pub order_date: String,
    pub shipping_date: String,
    pub delivery_date: String,
    pub amount: f64,
    pub status: String,
}

/// A user by username or email address.
pub async fn find_user(pool: &SqlitePool, username_or_email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT USER_ID, USERNAME, EMAIL, PASSWORD FROM USERS WHERE USERNAME = ? OR EMAIL = ? LIMIT 1",
    )
        .bind(username_or_email)
        .bind(username_or_email)
        .fetch_optional(pool)
        .await
}

/// Order joined with its product, restricted to orders owned by `user_id`.
pub async fn find_order(
    pool: &SqlitePool,
    order_id: i64,
    user_id: i64,
) -> Result<Option<OrderDetails>, sqlx::Error> {
    sqlx::query_as::<_, OrderDetails>(
        r#"
        SELECT
            o.ORDER_ID AS order_id, o.PRODUCT_ID AS product_id, o.USER_ID AS user_id,
            o.STATUS AS status, o.ORDER_DATE AS order_date, o.SHIPPING_DATE AS shipping_date,
            o.DELIVERY_DATE AS delivery_date, o.AMOUNT AS amount,
            p.NAME AS name, p.PRICE AS price, p.BRAND AS brand, p.COLOUR AS colour,
            p.IMG AS img, p.DESCRIPTION AS description
        FROM ORDERS o
        JOIN PRODUCTS p ON o.PRODUCT_ID = p.P_ID
        WHERE o.ORDER_ID = ? AND o.USER_ID = ?
        "#,
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_product(
    pool: &SqlitePool,
    product_id: &str,
) -> Result<Option<ProductSummary>, sqlx::Error> {
    sqlx::query_as::<_, ProductSummary>(&format!("{} WHERE P_ID = ?", PRODUCT_SUMMARY_COLUMNS))
        .bind(product_id)
        .fetch_optional(pool)
        .await
}

/// Column for an attribute slot name. Only these columns are ever interpolated.
fn attribute_column(slot: &str) -> Option<&'static str> {
    match slot {
        "name" => Some("NAME"),
        "brand" => Some("BRAND"),
        "colour" => Some("COLOUR"),
        "fabric" => Some("FABRIC"),
        "occasion" => Some("OCCASION"),
        "print_pattern" => Some("PRINT_PATTERN"),
        "top_type" => Some("TOP_TYPE"),
        "sleeve_length" => Some("SLEEVE_LENGTH"),
        "description" => Some("DESCRIPTION"),
        _ => None,
    }
}

/// A random product matching any of the given `(slot, value)` attributes.
///
/// Returns `Ok(None)` without querying when no attribute maps to a column.
pub async fn find_product_by_attributes(
    pool: &SqlitePool,
    attributes: &[(&str, &str)],
) -> Result<Option<ProductSummary>, sqlx::Error> {
    let filters: Vec<(&'static str, &str)> = attributes
        .iter()
        .filter_map(|(slot, value)| attribute_column(slot).map(|column| (column, *value)))
        .collect();
    if filters.is_empty() {
        return Ok(None);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(PRODUCT_SUMMARY_COLUMNS);
    qb.push(" WHERE ");
    let mut conditions = qb.separated(" OR ");
    for (column, value) in filters {
        conditions.push(format!("{} LIKE ", column));
        conditions.push_bind_unseparated(format!("%{}%", value));
    }
    qb.push(" ORDER BY RANDOM() LIMIT 1");

    qb.build_query_as::<ProductSummary>().fetch_optional(pool).await
}

/// Products whose SEARCH_TEXT contains any keyword, best rated first.
pub async fn search_products(
    pool: &SqlitePool,
    keywords: &[String],
    limit: u32,
) -> Result<Vec<ProductSummary>, sqlx::Error> {
    if keywords.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(PRODUCT_SUMMARY_COLUMNS);
    qb.push(" WHERE ");
    let mut conditions = qb.separated(" OR ");
    for keyword in keywords {
        conditions.push("SEARCH_TEXT LIKE ");
        conditions.push_bind_unseparated(format!("%{}%", keyword.to_lowercase()));
    }
    qb.push(" ORDER BY AVG_RATING DESC LIMIT ");
    qb.push_bind(i64::from(limit));

    qb.build_query_as::<ProductSummary>().fetch_all(pool).await
}

/// Insert one order and return its ORDER_ID. Not idempotent.
pub async fn insert_order(pool: &SqlitePool, order: &NewOrder) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO ORDERS (PRODUCT_ID, USER_ID, PRODUCT_DESCRIPTION, ORDER_DATE, SHIPPING_DATE, DELIVERY_DATE, AMOUNT, STATUS)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&order.product_id)
    .bind(order.user_id)
    .bind(&order.product_description)
    .bind(&order.order_date)
    .bind(&order.shipping_date)
    .bind(&order.delivery_date)
    .bind(order.amount)
    .bind(&order.status)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}


#[cfg(test)]
mod tests {
    use super::test_support::seeded_pool;
    use super::*;

    #[tokio::test]
    async fn test_find_user_by_username_or_email() {
        let pool = seeded_pool().await;
        let by_name = find_user(&pool, "asha").await.unwrap().expect("asha exists");
        let by_email = find_user(&pool, "asha@example.com").await.unwrap().expect("asha exists");
        assert_eq!(by_name.user_id, 1);
        assert_eq!(by_email.user_id, 1);
        assert_eq!(by_email.username, "asha");
        assert!(atelier_core::auth::verify_password("password123", &by_name.password));
        assert!(find_user(&pool, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_order_is_scoped_to_owner() {
        let pool = seeded_pool().await;

        let order = find_order(&pool, 12, 1).await.unwrap().expect("order 12 exists");
        assert_eq!(order.status, "shipped");
        assert_eq!(order.delivery_date.as_deref(), Some("2024-05-10"));
        assert_eq!(order.name, "Floral Kurta");

        assert!(find_order(&pool, 12, 2).await.unwrap().is_none());
        assert!(find_order(&pool, 99, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_product_by_attributes() {
        let pool = seeded_pool().await;

        let found = find_product_by_attributes(&pool, &[("brand", "Mitera")])
            .await
            .unwrap()
            .expect("saree matches brand");
        assert_eq!(found.p_id, "1022");

        let none = find_product_by_attributes(&pool, &[("mood", "sunny")]).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_search_products_orders_by_rating_and_limits() {
        let pool = seeded_pool().await;

        let keywords = vec!["festive".to_string()];
        let results = search_products(&pool, &keywords, 5).await.unwrap();
        let ids: Vec<_> = results.iter().map(|p| p.p_id.as_str()).collect();
        assert_eq!(ids, vec!["1022", "1020"]);

        let limited = search_products(&pool, &keywords, 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        let keywords = vec!["red".to_string(), "kurti".to_string()];
        assert!(search_products(&pool, &keywords, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_order_returns_new_id() {
        let pool = seeded_pool().await;
        let order = NewOrder {
            product_id: "1021".to_string(),
            user_id: 2,
            product_description: "Striped Shirt".to_string(),
            order_date: "2024-06-01".to_string(),
            shipping_date: "2024-06-02".to_string(),
            delivery_date: "2024-06-05".to_string(),
            amount: 899.0,
            status: "ordered".to_string(),
        };

        let id = insert_order(&pool, &order).await.unwrap();
        assert_eq!(id, 13);
        let stored = find_order(&pool, id, 2).await.unwrap().unwrap();
        assert_eq!(stored.status, "ordered");
        assert_eq!(stored.amount, 899.0);
    }
}
