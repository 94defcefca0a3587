use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::ENV;
use crate::api::error;
use crate::modules::file_upload::{BlobStorage, Bucket, UploadedFile};
use crate::modules::user::model::{
    AdminUserPage, AdminUserQuery, AdminUserRow, AuthResponse, ChangePasswordModel, InsertUser,
    LoginModel, PublicSellerResponse, RegisterModel, UpdateProfileModel, UserResponse,
};
use crate::modules::user::repository::UserRepository;
use crate::modules::user::schema::{UserEntity, UserRole};
use crate::utils::{Claims, hash_password, verify_password};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
    storage: Arc<BlobStorage>,
}

impl UserService {
    pub fn with_dependencies(
        repo: Arc<dyn UserRepository + Send + Sync>,
        storage: Arc<BlobStorage>,
    ) -> Self {
        info!("UserService initialized with dependencies");
        UserService { repo, storage }
    }

    fn issue(&self, user: UserEntity) -> Result<AuthResponse, error::SystemError> {
        let token = Claims::new(&user.id, &user.role, ENV.access_token_expiration)
            .encode(ENV.jwt_secret.as_ref())?;
        Ok(AuthResponse { token, user: UserResponse::from_entity(user, &self.storage) })
    }

    pub async fn register(&self, model: RegisterModel) -> Result<AuthResponse, error::SystemError> {
        if self.repo.find_by_email(&model.email).await?.is_some() {
            return Err(error::SystemError::bad_request("Email already exists"));
        }

        let hash_password = hash_password(&model.password)?;
        let user = self
            .repo
            .create(&InsertUser {
                username: model.username.trim().to_string(),
                email: model.email.trim().to_string(),
                hash_password,
                phone: model.phone.trim().to_string(),
            })
            .await?;

        info!("Registered user {}", user.id);
        self.issue(user)
    }

    pub async fn login(&self, model: LoginModel) -> Result<AuthResponse, error::SystemError> {
        let user = self
            .repo
            .find_by_email(model.email.trim())
            .await?
            .ok_or_else(|| error::SystemError::bad_request("Invalid email or password"))?;

        if !verify_password(&user.hash_password, &model.password)? {
            return Err(error::SystemError::bad_request("Invalid email or password"));
        }

        if !user.active {
            return Err(error::SystemError::forbidden("Account has been deactivated"));
        }

        self.issue(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<UserResponse, error::SystemError> {
        let user = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        Ok(UserResponse::from_entity(user, &self.storage))
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        model: UpdateProfileModel,
    ) -> Result<UserResponse, error::SystemError> {
        if model.is_empty() {
            return Err(error::SystemError::bad_request("No fields to update"));
        }
        if !model.age_in_range() {
            return Err(error::SystemError::bad_request("Age must be between 1 and 150"));
        }

        let user = self.repo.update_profile(&id, &model).await?;
        Ok(UserResponse::from_entity(user, &self.storage))
    }

    pub async fn change_password(
        &self,
        id: Uuid,
        model: ChangePasswordModel,
    ) -> Result<(), error::SystemError> {
        let user = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if !verify_password(&user.hash_password, &model.old_password)? {
            return Err(error::SystemError::bad_request("Old password is incorrect"));
        }

        let hash = hash_password(&model.new_password)?;
        self.repo.update_password(&id, &hash).await?;
        Ok(())
    }

    /// Store the new avatar, then point the user at it; the old blob is dropped afterwards
    pub async fn update_avatar(
        &self,
        id: Uuid,
        file: UploadedFile,
    ) -> Result<UserResponse, error::SystemError> {
        let path = self.storage.store(Bucket::Avatars, &file).await?;

        let previous = match self.repo.replace_avatar(&id, &path).await {
            Ok(Some(previous)) => previous,
            Ok(None) => {
                self.storage.remove(&path).await;
                return Err(error::SystemError::not_found("User not found"));
            }
            Err(e) => {
                self.storage.remove(&path).await;
                return Err(e);
            }
        };

        if let Some(old) = previous {
            self.storage.remove(&old).await;
        }

        self.get_by_id(id).await
    }

    pub async fn touch_last_seen(&self, id: Uuid) -> Result<bool, error::SystemError> {
        self.repo.touch_last_seen(&id).await
    }

    pub async fn public_seller(
        &self,
        id: Uuid,
    ) -> Result<PublicSellerResponse, error::SystemError> {
        let seller = self
            .repo
            .find_public_seller(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        Ok(PublicSellerResponse::from_row(seller, &self.storage))
    }

    pub async fn admin_list(
        &self,
        query: AdminUserQuery,
    ) -> Result<AdminUserPage, error::SystemError> {
        let page = query.page();
        let limit = query.limit();
        let (items, total) =
            self.repo.search(query.query.trim(), limit, (page - 1) * limit).await?;
        Ok(AdminUserPage { items, total, page, limit })
    }

    pub async fn admin_set_role(
        &self,
        id: Uuid,
        role: UserRole,
    ) -> Result<AdminUserRow, error::SystemError> {
        let user = self
            .repo
            .update_role(&id, role)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        info!("User {} role set to {:?}", id, role);
        Ok(user)
    }

    pub async fn admin_set_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> Result<AdminUserRow, error::SystemError> {
        let user = self
            .repo
            .update_active(&id, active)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        info!("User {} active set to {}", id, active);
        Ok(user)
    }
}
