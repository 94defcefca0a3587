use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{
        model::{AdminUserRow, InsertUser, PublicSellerRow, UpdateProfileModel},
        schema::{UserEntity, UserRole},
    },
};

#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError>;
    async fn create(&self, user: &InsertUser) -> Result<UserEntity, error::SystemError>;
    async fn update_profile(
        &self,
        id: &Uuid,
        profile: &UpdateProfileModel,
    ) -> Result<UserEntity, error::SystemError>;
    async fn update_password(&self, id: &Uuid, hash: &str) -> Result<bool, error::SystemError>;

    /// Swap the avatar path, returning the previous one
    async fn replace_avatar(
        &self,
        id: &Uuid,
        path: &str,
    ) -> Result<Option<Option<String>>, error::SystemError>;

    /// Bump `last_seen_at` unless it was already bumped within the throttle window
    async fn touch_last_seen(&self, id: &Uuid) -> Result<bool, error::SystemError>;

    async fn find_public_seller(
        &self,
        id: &Uuid,
    ) -> Result<Option<PublicSellerRow>, error::SystemError>;

    /// Search users by username, email or phone (case-insensitive, partial match)
    async fn search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AdminUserRow>, i64), error::SystemError>;
    async fn update_role(
        &self,
        id: &Uuid,
        role: UserRole,
    ) -> Result<Option<AdminUserRow>, error::SystemError>;
    async fn update_active(
        &self,
        id: &Uuid,
        active: bool,
    ) -> Result<Option<AdminUserRow>, error::SystemError>;
}
