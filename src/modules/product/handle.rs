use actix_multipart::Multipart;
use actix_web::{HttpRequest, delete, get, post, put, web};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_principal,
    modules::{
        file_upload::{BlobStorage, read_multipart},
        message::handle::{is_multipart, read_json},
        product::{
            model::{
                CreateProductModel, CreateReviewModel, MAX_REVIEW_IMAGES, PostCount,
                ProductDetailResponse, ProductQuery, ProductResponse, ProductSaved, ReviewCreated,
                ReviewResponse, UpdateProductModel,
            },
            repository_pg::{ProductRepositoryPg, ReviewRepositoryPg},
            service::ProductService,
        },
    },
    utils::ValidatedQuery,
};

pub type ProductSvc = ProductService<ProductRepositoryPg, ReviewRepositoryPg>;

#[get("")]
pub async fn get_products(
    product_svc: web::Data<ProductSvc>,
    query: ValidatedQuery<ProductQuery>,
) -> Result<success::Success<Vec<ProductResponse>>, error::Error> {
    let products = product_svc.list(query.0).await?;
    Ok(success::Success::ok(Some(products)))
}

#[get("/{product_id:[0-9a-fA-F-]{36}}")]
pub async fn get_product(
    product_svc: web::Data<ProductSvc>,
    product_id: web::Path<Uuid>,
) -> Result<success::Success<ProductDetailResponse>, error::Error> {
    let product = product_svc.detail(*product_id).await?;
    Ok(success::Success::ok(Some(product)))
}

#[get("/{product_id:[0-9a-fA-F-]{36}}/reviews")]
pub async fn get_reviews(
    product_svc: web::Data<ProductSvc>,
    product_id: web::Path<Uuid>,
) -> Result<success::Success<Vec<ReviewResponse>>, error::Error> {
    let reviews = product_svc.reviews(*product_id).await?;
    Ok(success::Success::ok(Some(reviews)))
}

#[get("/myposts")]
pub async fn get_my_posts(
    product_svc: web::Data<ProductSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ProductResponse>>, error::Error> {
    let principal = get_principal(&req)?;
    let products = product_svc.my_posts(&principal).await?;
    Ok(success::Success::ok(Some(products)))
}

#[get("/myposts/count")]
pub async fn get_my_posts_count(
    product_svc: web::Data<ProductSvc>,
    req: HttpRequest,
) -> Result<success::Success<PostCount>, error::Error> {
    let principal = get_principal(&req)?;
    let count = product_svc.my_posts_count(&principal).await?;
    Ok(success::Success::ok(Some(count)))
}

/// Multipart: name, price, description, category_id, stock and an optional `image`
#[post("")]
pub async fn create_product(
    product_svc: web::Data<ProductSvc>,
    storage: web::Data<BlobStorage>,
    payload: Multipart,
    req: HttpRequest,
) -> Result<success::Success<ProductSaved>, error::Error> {
    let principal = get_principal(&req)?;

    let mut form = read_multipart(payload, storage.max_file_size(), 1).await?;
    let model = CreateProductModel::from_form(&form)?;
    let image = form.take_file("image");

    let product = product_svc.create(&principal, model, image).await?;
    Ok(success::Success::created(Some(product)).message("Product created"))
}

/// JSON or multipart; only the fields present are changed
#[put("/{product_id:[0-9a-fA-F-]{36}}")]
pub async fn update_product(
    product_svc: web::Data<ProductSvc>,
    storage: web::Data<BlobStorage>,
    product_id: web::Path<Uuid>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<success::Success<ProductSaved>, error::Error> {
    let principal = get_principal(&req)?;

    let (changes, image) = if is_multipart(&req) {
        let multipart = Multipart::new(req.headers(), payload);
        let mut form = read_multipart(multipart, storage.max_file_size(), 1).await?;
        (UpdateProductModel::from_form(&form)?, form.take_file("image"))
    } else {
        (read_json::<UpdateProductModel>(payload).await?, None)
    };

    let product = product_svc.update(&principal, *product_id, changes, image).await?;
    Ok(success::Success::ok(Some(product)).message("Product updated"))
}

#[delete("/{product_id:[0-9a-fA-F-]{36}}")]
pub async fn delete_product(
    product_svc: web::Data<ProductSvc>,
    product_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let principal = get_principal(&req)?;
    product_svc.delete(&principal, *product_id).await?;
    Ok(success::Success::ok(None).message("Product deleted"))
}

#[get("/favorites")]
pub async fn get_favorites(
    product_svc: web::Data<ProductSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ProductResponse>>, error::Error> {
    let principal = get_principal(&req)?;
    let products = product_svc.favorites(&principal).await?;
    Ok(success::Success::ok(Some(products)))
}

#[post("/{product_id:[0-9a-fA-F-]{36}}/favorites")]
pub async fn add_favorite(
    product_svc: web::Data<ProductSvc>,
    product_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let principal = get_principal(&req)?;
    product_svc.add_favorite(&principal, *product_id).await?;
    Ok(success::Success::ok(None).message("Added to favorites"))
}

#[delete("/{product_id:[0-9a-fA-F-]{36}}/favorites")]
pub async fn remove_favorite(
    product_svc: web::Data<ProductSvc>,
    product_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let principal = get_principal(&req)?;
    product_svc.remove_favorite(&principal, *product_id).await?;
    Ok(success::Success::ok(None).message("Removed from favorites"))
}

/// Multipart: rating (1..=5), content and up to six `images`
#[post("/{product_id:[0-9a-fA-F-]{36}}/reviews")]
pub async fn create_review(
    product_svc: web::Data<ProductSvc>,
    storage: web::Data<BlobStorage>,
    product_id: web::Path<Uuid>,
    payload: Multipart,
    req: HttpRequest,
) -> Result<success::Success<ReviewCreated>, error::Error> {
    let principal = get_principal(&req)?;

    let mut form = read_multipart(payload, storage.max_file_size(), MAX_REVIEW_IMAGES).await?;
    let model = CreateReviewModel::from_form(&form)?;
    let images = form.take_files("images");

    let created = product_svc.create_review(&principal, *product_id, model, images).await?;
    Ok(success::Success::created(Some(created)).message("Review posted"))
}
