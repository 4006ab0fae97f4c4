use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    #[sqlx(rename = "USER_ID")]
    pub user_id: i64,
    #[sqlx(rename = "USERNAME")]
    pub username: String,
    #[sqlx(rename = "EMAIL")]
    pub email: String,
    /// Hex SHA-256 digest, never the plain password.
    #[serde(skip_serializing)]
    #[sqlx(rename = "PASSWORD")]
    pub password: String,
}
