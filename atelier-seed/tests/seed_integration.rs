//! Full seeding pipeline against an in-memory store: raw CSV, products,
//! users, then orders.

use atelier_core::auth::verify_password;
use atelier_core::db;
use atelier_seed::{preprocess, read_raw_csv, seed_orders, seed_products, seed_users};
use chrono::NaiveDate;

const CATALOGUE: &str = "\
p_id,name,price,colour,brand,img,ratingCount,avg_rating,description,p_attributes
1001,Libas Women Red Kurta,1299,Red,Libas,http://img/1001.jpg,120,4.3,<p>Red <i>floral</i> kurta</p>,\"{'Top Type': 'Kurta', 'Occasion': 'Festive', 'Top Fabric': 'Cotton'}\"
1002,Roadster Men Shirt,899,White,Roadster,http://img/1002.jpg,80,3.9,Striped shirt,\"{'Top': 'Shirt', 'Sustainable': 'Sustainable'}\"
1002,Roadster Men Shirt Copy,1,White,Roadster,,,,,
";

#[tokio::test]
async fn test_pipeline_seeds_a_usable_store() {
    let pool = db::create_memory_pool().await.unwrap();
    db::init_schema(&pool).await.unwrap();

    let products = preprocess(read_raw_csv(CATALOGUE.as_bytes()).unwrap());
    assert_eq!(products.len(), 2);

    let report = seed_products(&pool, &products).await.unwrap();
    assert_eq!(report.total, 2);

    let (description, search_text, sustainable): (String, String, bool) =
        sqlx::query_as("SELECT DESCRIPTION, SEARCH_TEXT, IS_SUSTAINABLE FROM PRODUCTS WHERE P_ID = '1001'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(description, "Red floral kurta");
    assert_eq!(search_text, "libas women red kurta libas red unknown festive cotton");
    assert!(!sustainable);

    let top_type: String = sqlx::query_scalar("SELECT TOP_TYPE FROM PRODUCTS WHERE P_ID = '1002'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(top_type, "shirt");

    let users = seed_users(&pool, 4).await.unwrap();
    assert!(users.total >= 1);

    let (username, stored): (String, String) = sqlx::query_as("SELECT USERNAME, PASSWORD FROM USERS LIMIT 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!username.is_empty());
    assert!(verify_password("password123", &stored));

    let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    let orders = seed_orders(&pool, 10, today).await.unwrap();
    assert_eq!(orders.inserted, 10);

    let dangling: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ORDERS o LEFT JOIN PRODUCTS p ON o.PRODUCT_ID = p.P_ID WHERE p.P_ID IS NULL",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(dangling, 0);

    // Trimming users takes their orders with them.
    let users = seed_users(&pool, 1).await.unwrap();
    assert_eq!(users.total, 1);
    let orphaned: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ORDERS o LEFT JOIN USERS u ON o.USER_ID = u.USER_ID WHERE u.USER_ID IS NULL",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(orphaned, 0);
}
