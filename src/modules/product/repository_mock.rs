//! In-memory favorites store for service tests; catalogue queries are not modelled
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    api::error,
    configs::lazy_pool,
    modules::product::{
        model::{
            InsertProduct, InsertReview, ProductDetailRow, ProductRow, ReviewRow,
            UpdateProductModel,
        },
        repository::{ProductFilter, ProductRepository, ReviewRepository},
        schema::{ProductEntity, ReviewEntity},
    },
};

pub struct MockProductRepository {
    pool: sqlx::PgPool,
    products: HashSet<Uuid>,
    favorites: Mutex<HashSet<(Uuid, Uuid)>>,
}

impl MockProductRepository {
    pub fn with_products(products: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            pool: lazy_pool(),
            products: products.into_iter().collect(),
            favorites: Mutex::new(HashSet::new()),
        }
    }

    pub fn favorite_count(&self, user_id: &Uuid) -> usize {
        self.favorites.lock().unwrap().iter().filter(|(user, _)| user == user_id).count()
    }
}

#[async_trait::async_trait]
impl ProductRepository for MockProductRepository {
    fn get_pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    async fn list<'e, E>(
        &self,
        _filter: &ProductFilter,
        _tx: E,
    ) -> Result<Vec<ProductRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(Vec::new())
    }

    async fn find_detail<'e, E>(
        &self,
        _product_id: &Uuid,
        _tx: E,
    ) -> Result<Option<ProductDetailRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(None)
    }

    async fn find_by_seller<'e, E>(
        &self,
        _seller_id: &Uuid,
        _tx: E,
    ) -> Result<Vec<ProductRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(Vec::new())
    }

    async fn count_by_seller<'e, E>(
        &self,
        _seller_id: &Uuid,
        _tx: E,
    ) -> Result<i64, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(0)
    }

    async fn find_by_id<'e, E>(
        &self,
        _product_id: &Uuid,
        _tx: E,
    ) -> Result<Option<ProductEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(None)
    }

    async fn lock_by_id<'e>(
        &self,
        _product_id: &Uuid,
        _tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<Option<ProductEntity>, error::SystemError> {
        Ok(None)
    }

    async fn create<'e, E>(
        &self,
        _product: &InsertProduct,
        _tx: E,
    ) -> Result<ProductEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        unimplemented!("catalogue writes are not modelled")
    }

    async fn update<'e, E>(
        &self,
        _product_id: &Uuid,
        _changes: &UpdateProductModel,
        _image_path: Option<&str>,
        _tx: E,
    ) -> Result<Option<ProductEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(None)
    }

    async fn delete_dependents<'e>(
        &self,
        _product_id: &Uuid,
        _tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<(), error::SystemError> {
        Ok(())
    }

    async fn delete<'e, E>(&self, _product_id: &Uuid, _tx: E) -> Result<bool, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(false)
    }

    async fn add_favorite<'e, E>(
        &self,
        user_id: &Uuid,
        product_id: &Uuid,
        _tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        if !self.products.contains(product_id) {
            return Err(error::SystemError::not_found("favorites_product_id_fkey"));
        }
        self.favorites.lock().unwrap().insert((*user_id, *product_id));
        Ok(())
    }

    async fn remove_favorite<'e, E>(
        &self,
        user_id: &Uuid,
        product_id: &Uuid,
        _tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        self.favorites.lock().unwrap().remove(&(*user_id, *product_id));
        Ok(())
    }

    async fn find_favorites<'e, E>(
        &self,
        _user_id: &Uuid,
        _tx: E,
    ) -> Result<Vec<ProductRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(Vec::new())
    }
}

pub struct MockReviewRepository;

#[async_trait::async_trait]
impl ReviewRepository for MockReviewRepository {
    async fn find_by_product<'e, E>(
        &self,
        _product_id: &Uuid,
        _limit: i64,
        _tx: E,
    ) -> Result<Vec<ReviewRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(Vec::new())
    }

    async fn create<'e, E>(
        &self,
        _review: &InsertReview,
        _tx: E,
    ) -> Result<ReviewEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        unimplemented!("reviews are not modelled")
    }

    async fn rating_totals<'e, E>(
        &self,
        _product_id: &Uuid,
        _tx: E,
    ) -> Result<(i64, i64), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok((0, 0))
    }

    async fn set_product_rating<'e, E>(
        &self,
        _product_id: &Uuid,
        _rating_avg: f64,
        _rating_count: i32,
        _tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(())
    }
}
