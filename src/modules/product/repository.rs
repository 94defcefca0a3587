use uuid::Uuid;

use crate::{
    api::error,
    modules::product::{
        model::{
            InsertProduct, InsertReview, ProductDetailRow, ProductRow, ReviewRow,
            UpdateProductModel,
        },
        schema::{ProductEntity, ReviewEntity},
    },
};

/// Listing filters, already normalised
#[derive(Debug, Default)]
pub struct ProductFilter {
    pub category_slug: Option<String>,
    pub name_pattern: Option<String>,
    pub limit: Option<i64>,
}

#[async_trait::async_trait]
pub trait ProductRepository {
    fn get_pool(&self) -> &sqlx::Pool<sqlx::Postgres>;

    async fn list<'e, E>(
        &self,
        filter: &ProductFilter,
        tx: E,
    ) -> Result<Vec<ProductRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn find_detail<'e, E>(
        &self,
        product_id: &Uuid,
        tx: E,
    ) -> Result<Option<ProductDetailRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn find_by_seller<'e, E>(
        &self,
        seller_id: &Uuid,
        tx: E,
    ) -> Result<Vec<ProductRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn count_by_seller<'e, E>(
        &self,
        seller_id: &Uuid,
        tx: E,
    ) -> Result<i64, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn find_by_id<'e, E>(
        &self,
        product_id: &Uuid,
        tx: E,
    ) -> Result<Option<ProductEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    /// Row-locks the product for the rest of the transaction
    async fn lock_by_id<'e>(
        &self,
        product_id: &Uuid,
        tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<Option<ProductEntity>, error::SystemError>;

    async fn create<'e, E>(
        &self,
        product: &InsertProduct,
        tx: E,
    ) -> Result<ProductEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    /// `None` fields and a `None` image keep their stored values
    async fn update<'e, E>(
        &self,
        product_id: &Uuid,
        changes: &UpdateProductModel,
        image_path: Option<&str>,
        tx: E,
    ) -> Result<Option<ProductEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    /// Order items and favorites pointing at the product
    async fn delete_dependents<'e>(
        &self,
        product_id: &Uuid,
        tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<(), error::SystemError>;

    async fn delete<'e, E>(&self, product_id: &Uuid, tx: E) -> Result<bool, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn add_favorite<'e, E>(
        &self,
        user_id: &Uuid,
        product_id: &Uuid,
        tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn remove_favorite<'e, E>(
        &self,
        user_id: &Uuid,
        product_id: &Uuid,
        tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn find_favorites<'e, E>(
        &self,
        user_id: &Uuid,
        tx: E,
    ) -> Result<Vec<ProductRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;
}

#[async_trait::async_trait]
pub trait ReviewRepository {
    async fn find_by_product<'e, E>(
        &self,
        product_id: &Uuid,
        limit: i64,
        tx: E,
    ) -> Result<Vec<ReviewRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn create<'e, E>(
        &self,
        review: &InsertReview,
        tx: E,
    ) -> Result<ReviewEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    /// `(sum of ratings, number of reviews)` for one product
    async fn rating_totals<'e, E>(
        &self,
        product_id: &Uuid,
        tx: E,
    ) -> Result<(i64, i64), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn set_product_rating<'e, E>(
        &self,
        product_id: &Uuid,
        rating_avg: f64,
        rating_count: i32,
        tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;
}
