use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::file_upload::BlobStorage;
use crate::modules::user::schema::{UserEntity, UserRole};
use crate::utils::double_option;

#[derive(Deserialize, Validate)]
pub struct RegisterModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,
    #[validate(length(min = 9, max = 15, message = "Phone number must be 9 to 15 digits"))]
    pub phone: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

/// Absent field keeps the stored value, explicit `null` clears it
#[derive(Deserialize, Validate)]
pub struct UpdateProfileModel {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub school: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub student_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub age: Option<Option<i32>>,
}

impl UpdateProfileModel {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.school.is_none()
            && self.student_id.is_none()
            && self.address.is_none()
            && self.age.is_none()
    }

    pub fn age_in_range(&self) -> bool {
        !matches!(self.age, Some(Some(age)) if !(1..=150).contains(&age))
    }
}

#[derive(Deserialize, Validate)]
pub struct ChangePasswordModel {
    #[validate(length(min = 1, message = "Old password cannot be empty"))]
    pub old_password: String,
    #[validate(length(min = 6, message = "New password must be at least 6 characters long"))]
    pub new_password: String,
}

#[derive(Deserialize, Validate)]
pub struct AdminUserQuery {
    #[serde(default)]
    pub query: String,
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl AdminUserQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 50)
    }
}

#[derive(Deserialize, Validate)]
pub struct UpdateRoleModel {
    pub role: UserRole,
}

#[derive(Deserialize, Validate)]
pub struct UpdateActiveModel {
    pub active: bool,
}

pub struct InsertUser {
    pub username: String,
    pub email: String,
    pub hash_password: String,
    pub phone: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub school: Option<String>,
    pub student_id: Option<String>,
    pub address: Option<String>,
    pub age: Option<i32>,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl UserResponse {
    pub fn from_entity(entity: UserEntity, storage: &BlobStorage) -> Self {
        UserResponse {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            phone: entity.phone,
            name: entity.name,
            school: entity.school,
            student_id: entity.student_id,
            address: entity.address,
            age: entity.age,
            role: entity.role,
            avatar_url: entity.avatar_path.as_deref().map(|p| storage.public_url(p)),
            last_seen_at: entity.last_seen_at,
        }
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct AdminUserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub school: Option<String>,
    pub student_id: Option<String>,
    pub role: UserRole,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct AdminUserPage {
    pub items: Vec<AdminUserRow>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, FromRow)]
pub struct PublicSellerRow {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar_path: Option<String>,
    pub role: UserRole,
    pub last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
    pub total_sold: i64,
    pub seller_rating_avg: f64,
    pub seller_rating_count: i64,
}

#[derive(Serialize)]
pub struct PublicSellerResponse {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
    pub total_sold: i64,
    pub seller_rating_avg: f64,
    pub seller_rating_count: i64,
}

impl PublicSellerResponse {
    pub fn from_row(row: PublicSellerRow, storage: &BlobStorage) -> Self {
        PublicSellerResponse {
            id: row.id,
            username: row.username,
            name: row.name,
            phone: row.phone,
            address: row.address,
            avatar_url: row.avatar_path.as_deref().map(|p| storage.public_url(p)),
            role: row.role,
            last_seen_at: row.last_seen_at,
            total_sold: row.total_sold,
            seller_rating_avg: row.seller_rating_avg,
            seller_rating_count: row.seller_rating_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_distinguishes_absent_from_null() {
        let model: UpdateProfileModel =
            serde_json::from_str(r#"{"name":"An","school":null}"#).unwrap();
        assert_eq!(model.name, Some(Some("An".to_string())));
        assert_eq!(model.school, Some(None));
        assert_eq!(model.phone, None);
        assert!(!model.is_empty());
        assert!(serde_json::from_str::<UpdateProfileModel>("{}").unwrap().is_empty());
    }

    #[test]
    fn profile_age_must_be_plausible() {
        let model: UpdateProfileModel = serde_json::from_str(r#"{"age":0}"#).unwrap();
        assert!(!model.age_in_range());
        let model: UpdateProfileModel = serde_json::from_str(r#"{"age":null}"#).unwrap();
        assert!(model.age_in_range());
    }

    #[test]
    fn admin_query_clamps_paging() {
        let q = AdminUserQuery { query: String::new(), page: Some(0), limit: Some(500) };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 50);
        let q = AdminUserQuery { query: String::new(), page: None, limit: None };
        assert_eq!((q.page(), q.limit()), (1, 10));
    }
}
