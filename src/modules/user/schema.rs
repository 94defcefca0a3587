use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

/// Closed role set; any role may buy or sell, only `Admin` unlocks admin routes
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Buyer,
    Seller,
    Admin,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub hash_password: String,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub school: Option<String>,
    pub student_id: Option<String>,
    pub address: Option<String>,
    pub age: Option<i32>,
    pub role: UserRole,
    pub avatar_path: Option<String>,
    pub active: bool,
    pub last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_accepts_only_known_lowercase_values() {
        assert_eq!(serde_json::from_str::<UserRole>(r#""seller""#).unwrap(), UserRole::Seller);
        assert!(serde_json::from_str::<UserRole>(r#""Seller""#).is_err());
        assert!(serde_json::from_str::<UserRole>(r#""user""#).is_err());
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), r#""admin""#);
    }
}
