use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::api::error;
use crate::modules::file_upload::{BlobStorage, MultipartForm};
use crate::modules::product::schema::{ProductEntity, ReviewEntity};

pub const MAX_REVIEW_IMAGES: usize = 6;
pub const REVIEW_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct ProductQuery {
    /// Category slug
    pub category: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

impl ProductQuery {
    /// Autocomplete sends a small positive limit; anything else means no limit
    pub fn limit(&self) -> Option<i64> {
        self.limit.filter(|l| *l > 0).map(|l| l.min(100))
    }

    /// `ILIKE` pattern for `q`, with wildcards in the input matched literally
    pub fn name_pattern(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"))
            .map(|q| format!("%{q}%"))
    }

    pub fn category_slug(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

#[derive(Debug)]
pub struct InsertProduct {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: i32,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock: i32,
    pub image_path: Option<String>,
}

/// Multipart fields of `POST /products`
#[derive(Debug, Validate)]
pub struct CreateProductModel {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub category_id: i32,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
}

impl CreateProductModel {
    pub fn from_form(form: &MultipartForm) -> Result<Self, error::SystemError> {
        let missing = || error::SystemError::bad_request("Missing product information");

        let model = CreateProductModel {
            name: form.text("name").ok_or_else(missing)?.to_string(),
            price: form.parse("price")?.ok_or_else(missing)?,
            description: form.text("description").ok_or_else(missing)?.to_string(),
            category_id: form.parse("category_id")?.ok_or_else(missing)?,
            stock: form.parse("stock")?.unwrap_or(1),
        };
        model.validate().map_err(|e| error::SystemError::bad_request(e.to_string()))?;
        Ok(model)
    }
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductModel {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i64>,
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,
    pub category_id: Option<i32>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub is_available: Option<bool>,
}

impl UpdateProductModel {
    pub fn from_form(form: &MultipartForm) -> Result<Self, error::SystemError> {
        let model = UpdateProductModel {
            name: form.text("name").map(str::to_string),
            price: form.parse("price")?,
            description: form.text("description").map(str::to_string),
            category_id: form.parse("category_id")?,
            stock: form.parse("stock")?,
            is_available: form.parse("is_available")?,
        };
        model.validate().map_err(|e| error::SystemError::bad_request(e.to_string()))?;
        Ok(model)
    }
}

/// Listing row joined with category and seller display fields
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_path: Option<String>,
    pub stock: i32,
    pub is_available: bool,
    pub sold_count: i32,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub category_id: i32,
    pub category_name: String,
    pub category_slug: String,
    pub seller_name: String,
    pub seller_phone: Option<String>,
    pub seller_avatar_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub stock: i32,
    pub is_available: bool,
    pub sold_count: i32,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub category_id: i32,
    pub category_name: String,
    pub category_slug: String,
    pub seller_name: String,
    pub seller_phone: Option<String>,
    pub seller_avatar_url: Option<String>,
}

impl ProductResponse {
    pub fn from_row(row: ProductRow, storage: &BlobStorage) -> Self {
        ProductResponse {
            id: row.id,
            seller_id: row.seller_id,
            name: row.name,
            description: row.description,
            price: row.price,
            image_url: row.image_path.as_deref().map(|p| storage.public_url(p)),
            stock: row.stock,
            is_available: row.is_available,
            sold_count: row.sold_count,
            rating_avg: row.rating_avg,
            rating_count: row.rating_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
            category_id: row.category_id,
            category_name: row.category_name,
            category_slug: row.category_slug,
            seller_name: row.seller_name,
            seller_phone: row.seller_phone,
            seller_avatar_url: row.seller_avatar_path.as_deref().map(|p| storage.public_url(p)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProductDetailRow {
    #[sqlx(flatten)]
    pub product: ProductRow,
    pub seller_last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
    pub seller_total_sold: i64,
    pub seller_rating_avg: f64,
    pub seller_rating_count: i64,
}

/// Product page: the listing fields plus the seller card
#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub seller_last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
    pub seller_total_sold: i64,
    pub seller_rating_avg: f64,
    pub seller_rating_count: i64,
}

impl ProductDetailResponse {
    pub fn from_row(row: ProductDetailRow, storage: &BlobStorage) -> Self {
        ProductDetailResponse {
            product: ProductResponse::from_row(row.product, storage),
            seller_last_seen_at: row.seller_last_seen_at,
            seller_total_sold: row.seller_total_sold,
            seller_rating_avg: row.seller_rating_avg,
            seller_rating_count: row.seller_rating_count,
        }
    }
}

/// Raw product as written, for create/update responses
#[derive(Debug, Serialize)]
pub struct ProductSaved {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: i32,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub stock: i32,
    pub is_available: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ProductSaved {
    pub fn from_entity(entity: ProductEntity, storage: &BlobStorage) -> Self {
        ProductSaved {
            id: entity.id,
            seller_id: entity.seller_id,
            category_id: entity.category_id,
            name: entity.name,
            description: entity.description,
            price: entity.price,
            image_url: entity.image_path.as_deref().map(|p| storage.public_url(p)),
            stock: entity.stock,
            is_available: entity.is_available,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostCount {
    pub count: i64,
}

#[derive(Debug)]
pub struct InsertReview {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub content: Option<String>,
    pub images: Vec<String>,
}

/// Multipart fields of `POST /products/{id}/reviews`
#[derive(Debug, Validate)]
pub struct CreateReviewModel {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 2000, message = "Review is too long"))]
    pub content: Option<String>,
}

impl CreateReviewModel {
    pub fn from_form(form: &MultipartForm) -> Result<Self, error::SystemError> {
        let model = CreateReviewModel {
            rating: form
                .parse("rating")?
                .ok_or_else(|| error::SystemError::bad_request("Rating is required"))?,
            content: form.text("content").map(str::to_string),
        };
        model.validate().map_err(|e| error::SystemError::bad_request(e.to_string()))?;
        Ok(model)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub content: Option<String>,
    pub images: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub username: Option<String>,
    pub avatar_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub content: Option<String>,
    pub images: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

impl ReviewResponse {
    pub fn from_row(row: ReviewRow, storage: &BlobStorage) -> Self {
        ReviewResponse {
            id: row.id,
            user_id: row.user_id,
            rating: row.rating,
            content: row.content,
            images: row.images.iter().map(|p| storage.public_url(p)).collect(),
            created_at: row.created_at,
            username: row.username,
            avatar_url: row.avatar_path.as_deref().map(|p| storage.public_url(p)),
        }
    }

    pub fn from_entity(entity: ReviewEntity, storage: &BlobStorage) -> Self {
        ReviewResponse {
            id: entity.id,
            user_id: entity.user_id,
            rating: entity.rating,
            content: entity.content,
            images: entity.images.iter().map(|p| storage.public_url(p)).collect(),
            created_at: entity.created_at,
            username: None,
            avatar_url: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewCreated {
    pub review: ReviewResponse,
    pub rating_avg: f64,
    pub rating_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> MultipartForm {
        let mut form = MultipartForm::default();
        for (k, v) in fields {
            form.fields.insert(k.to_string(), v.to_string());
        }
        form
    }

    #[test]
    fn create_requires_core_fields_and_defaults_stock() {
        let model = CreateProductModel::from_form(&form(&[
            ("name", "Calculus textbook"),
            ("price", "100000"),
            ("description", "Lightly used"),
            ("category_id", "1"),
        ]))
        .unwrap();
        assert_eq!(model.stock, 1);
        assert_eq!(model.price, 100_000);

        assert!(CreateProductModel::from_form(&form(&[("name", "Lamp")])).is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        let result = CreateProductModel::from_form(&form(&[
            ("name", "Lamp"),
            ("price", "-5"),
            ("description", "Desk lamp"),
            ("category_id", "2"),
        ]));
        assert!(matches!(result, Err(error::SystemError::BadRequest(_))));
    }

    #[test]
    fn update_form_keeps_absent_fields_empty() {
        let model = UpdateProductModel::from_form(&form(&[("price", "150000")])).unwrap();
        assert_eq!(model.price, Some(150_000));
        assert!(model.name.is_none());
        assert!(model.category_id.is_none());
    }

    #[test]
    fn review_rating_is_bounded() {
        assert!(CreateReviewModel::from_form(&form(&[("rating", "5")])).is_ok());
        assert!(CreateReviewModel::from_form(&form(&[("rating", "0")])).is_err());
        assert!(CreateReviewModel::from_form(&form(&[("rating", "6")])).is_err());
        assert!(CreateReviewModel::from_form(&form(&[("content", "nice")])).is_err());
    }

    #[test]
    fn query_escapes_wildcards_and_ignores_blank_filters() {
        let query = ProductQuery {
            category: Some(" ".into()),
            q: Some("50%_off".into()),
            limit: Some(0),
        };
        assert_eq!(query.name_pattern().as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(query.category_slug(), None);
        assert_eq!(query.limit(), None);

        let query = ProductQuery { category: Some("books".into()), q: None, limit: Some(8) };
        assert_eq!(query.category_slug(), Some("books"));
        assert_eq!(query.name_pattern(), None);
        assert_eq!(query.limit(), Some(8));
    }
}
