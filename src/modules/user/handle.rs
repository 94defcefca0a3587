use actix_multipart::Multipart;
use actix_web::{HttpRequest, get, post, put, web};
use uuid::Uuid;

use crate::middlewares::get_principal;
use crate::modules::file_upload::{BlobStorage, read_multipart};
use crate::modules::user::{model, service::UserService};
use crate::{
    api::{error, success},
    utils::{ValidatedJson, ValidatedQuery},
};

#[post("/register")]
pub async fn register(
    user_service: web::Data<UserService>,
    body: ValidatedJson<model::RegisterModel>,
) -> Result<success::Success<model::AuthResponse>, error::Error> {
    let auth = user_service.register(body.0).await?;
    Ok(success::Success::created(Some(auth)).message("Register successful"))
}

#[post("/login")]
pub async fn login(
    user_service: web::Data<UserService>,
    body: ValidatedJson<model::LoginModel>,
) -> Result<success::Success<model::AuthResponse>, error::Error> {
    let auth = user_service.login(body.0).await?;
    Ok(success::Success::ok(Some(auth)).message("Login successful"))
}

#[get("/me")]
pub async fn me(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let principal = get_principal(&req)?;
    let user = user_service.get_by_id(principal.id).await?;
    Ok(success::Success::ok(Some(user)))
}

#[get("/profile")]
pub async fn get_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let principal = get_principal(&req)?;
    let user = user_service.get_by_id(principal.id).await?;
    Ok(success::Success::ok(Some(user)).message("Profile retrieved successfully"))
}

#[put("/update-profile")]
pub async fn update_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    body: ValidatedJson<model::UpdateProfileModel>,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let principal = get_principal(&req)?;
    let user = user_service.update_profile(principal.id, body.0).await?;
    Ok(success::Success::ok(Some(user)).message("Profile updated successfully"))
}

#[post("/change-password")]
pub async fn change_password(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    body: ValidatedJson<model::ChangePasswordModel>,
) -> Result<success::Success<()>, error::Error> {
    let principal = get_principal(&req)?;
    user_service.change_password(principal.id, body.0).await?;
    Ok(success::Success::ok(None).message("Password changed successfully"))
}

#[put("/avatar")]
pub async fn update_avatar(
    user_service: web::Data<UserService>,
    storage: web::Data<BlobStorage>,
    req: HttpRequest,
    payload: Multipart,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let principal = get_principal(&req)?;
    let mut form = read_multipart(payload, storage.max_file_size(), 1).await?;
    let file =
        form.take_file("avatar").ok_or_else(|| error::Error::bad_request("No file uploaded"))?;
    let user = user_service.update_avatar(principal.id, file).await?;
    Ok(success::Success::ok(Some(user)).message("Avatar updated successfully"))
}

#[get("/{id}/public")]
pub async fn public_profile(
    user_service: web::Data<UserService>,
    user_id: web::Path<Uuid>,
) -> Result<success::Success<model::PublicSellerResponse>, error::Error> {
    let seller = user_service.public_seller(user_id.into_inner()).await?;
    Ok(success::Success::ok(Some(seller)))
}

#[get("/users")]
pub async fn admin_list_users(
    user_service: web::Data<UserService>,
    query: ValidatedQuery<model::AdminUserQuery>,
) -> Result<success::Success<model::AdminUserPage>, error::Error> {
    let page = user_service.admin_list(query.0).await?;
    Ok(success::Success::ok(Some(page)))
}

#[put("/users/{id}/role")]
pub async fn admin_update_role(
    user_service: web::Data<UserService>,
    user_id: web::Path<Uuid>,
    body: ValidatedJson<model::UpdateRoleModel>,
) -> Result<success::Success<model::AdminUserRow>, error::Error> {
    let user = user_service.admin_set_role(user_id.into_inner(), body.0.role).await?;
    Ok(success::Success::ok(Some(user)).message("Role updated"))
}

#[put("/users/{id}/active")]
pub async fn admin_update_active(
    user_service: web::Data<UserService>,
    user_id: web::Path<Uuid>,
    body: ValidatedJson<model::UpdateActiveModel>,
) -> Result<success::Success<model::AdminUserRow>, error::Error> {
    let user = user_service.admin_set_active(user_id.into_inner(), body.0.active).await?;
    Ok(success::Success::ok(Some(user)).message("Active flag updated"))
}
