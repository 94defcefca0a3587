use actix::Addr;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        file_upload::{BlobStorage, Bucket, UploadedFile},
        product::{
            model::{
                CreateProductModel, CreateReviewModel, InsertProduct, InsertReview, PostCount,
                ProductDetailResponse, ProductQuery, ProductResponse, ProductSaved,
                REVIEW_PAGE_SIZE, ReviewCreated, ReviewResponse, UpdateProductModel,
            },
            repository::{ProductFilter, ProductRepository, ReviewRepository},
            schema::{ProductEntity, ReviewEntity, rating_aggregate},
        },
        websocket::{
            events::{BroadcastToRoom, Room},
            message::ServerMessage,
            server::RealtimeServer,
        },
    },
    utils::Principal,
};

#[derive(Clone)]
pub struct ProductService<P, V>
where
    P: ProductRepository + Send + Sync + 'static,
    V: ReviewRepository + Send + Sync + 'static,
{
    product_repo: Arc<P>,
    review_repo: Arc<V>,
    storage: Arc<BlobStorage>,
    realtime: Addr<RealtimeServer>,
}

impl<P, V> ProductService<P, V>
where
    P: ProductRepository + Send + Sync + 'static,
    V: ReviewRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(
        product_repo: Arc<P>,
        review_repo: Arc<V>,
        storage: Arc<BlobStorage>,
        realtime: Addr<RealtimeServer>,
    ) -> Self {
        ProductService { product_repo, review_repo, storage, realtime }
    }

    pub async fn list(
        &self,
        query: ProductQuery,
    ) -> Result<Vec<ProductResponse>, error::SystemError> {
        let filter = ProductFilter {
            category_slug: query.category_slug().map(str::to_string),
            name_pattern: query.name_pattern(),
            limit: query.limit(),
        };
        let rows = self.product_repo.list(&filter, self.product_repo.get_pool()).await?;
        Ok(rows.into_iter().map(|r| ProductResponse::from_row(r, &self.storage)).collect())
    }

    pub async fn detail(
        &self,
        product_id: Uuid,
    ) -> Result<ProductDetailResponse, error::SystemError> {
        let row = self
            .product_repo
            .find_detail(&product_id, self.product_repo.get_pool())
            .await?
            .ok_or_else(|| error::SystemError::not_found("Product not found"))?;
        Ok(ProductDetailResponse::from_row(row, &self.storage))
    }

    pub async fn my_posts(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ProductResponse>, error::SystemError> {
        let rows =
            self.product_repo.find_by_seller(&principal.id, self.product_repo.get_pool()).await?;
        Ok(rows.into_iter().map(|r| ProductResponse::from_row(r, &self.storage)).collect())
    }

    pub async fn my_posts_count(
        &self,
        principal: &Principal,
    ) -> Result<PostCount, error::SystemError> {
        let count =
            self.product_repo.count_by_seller(&principal.id, self.product_repo.get_pool()).await?;
        Ok(PostCount { count })
    }

    pub async fn create(
        &self,
        principal: &Principal,
        model: CreateProductModel,
        image: Option<UploadedFile>,
    ) -> Result<ProductSaved, error::SystemError> {
        let image_path = match &image {
            Some(file) => Some(self.storage.store(Bucket::Products, file).await?),
            None => None,
        };

        let insert = InsertProduct {
            id: Uuid::now_v7(),
            seller_id: principal.id,
            category_id: model.category_id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock: model.stock,
            image_path,
        };

        match self.product_repo.create(&insert, self.product_repo.get_pool()).await {
            Ok(product) => {
                log::info!("Product {} listed by {}", product.id, principal.id);
                Ok(ProductSaved::from_entity(product, &self.storage))
            }
            Err(e) => {
                if let Some(path) = &insert.image_path {
                    self.storage.remove(path).await;
                }
                Err(match e {
                    error::SystemError::NotFound(_) => {
                        error::SystemError::not_found("Category not found")
                    }
                    other => other,
                })
            }
        }
    }

    async fn owned_product(
        &self,
        principal: &Principal,
        product_id: &Uuid,
    ) -> Result<ProductEntity, error::SystemError> {
        let product = self
            .product_repo
            .find_by_id(product_id, self.product_repo.get_pool())
            .await?
            .ok_or_else(|| error::SystemError::not_found("Product not found"))?;

        if product.seller_id != principal.id {
            return Err(error::SystemError::forbidden("You do not own this product"));
        }
        Ok(product)
    }

    /// Partial update by the owner; a new image replaces and removes the old blob
    pub async fn update(
        &self,
        principal: &Principal,
        product_id: Uuid,
        changes: UpdateProductModel,
        image: Option<UploadedFile>,
    ) -> Result<ProductSaved, error::SystemError> {
        let existing = self.owned_product(principal, &product_id).await?;

        let new_image = match &image {
            Some(file) => Some(self.storage.store(Bucket::Products, file).await?),
            None => None,
        };

        let updated = match self
            .product_repo
            .update(&product_id, &changes, new_image.as_deref(), self.product_repo.get_pool())
            .await
        {
            Ok(Some(product)) => product,
            Ok(None) => {
                if let Some(path) = &new_image {
                    self.storage.remove(path).await;
                }
                return Err(error::SystemError::not_found("Product not found"));
            }
            Err(e) => {
                if let Some(path) = &new_image {
                    self.storage.remove(path).await;
                }
                return Err(e);
            }
        };

        if let (Some(_), Some(old)) = (&new_image, &existing.image_path) {
            self.storage.remove(old).await;
        }

        Ok(ProductSaved::from_entity(updated, &self.storage))
    }

    /// Owner-only delete; order items and favorites go in the same transaction,
    /// orders survive with their product reference cleared
    pub async fn delete(
        &self,
        principal: &Principal,
        product_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let mut tx = self.product_repo.get_pool().begin().await?;

        let product = self
            .product_repo
            .lock_by_id(&product_id, &mut tx)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Product not found"))?;

        if product.seller_id != principal.id {
            return Err(error::SystemError::forbidden("You do not own this product"));
        }

        self.product_repo.delete_dependents(&product_id, &mut tx).await?;
        self.product_repo.delete(&product_id, tx.as_mut()).await?;
        tx.commit().await?;

        log::info!("Product {} deleted by {}", product_id, principal.id);

        if let Some(path) = &product.image_path {
            self.storage.remove(path).await;
        }
        Ok(())
    }

    pub async fn favorites(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ProductResponse>, error::SystemError> {
        let rows =
            self.product_repo.find_favorites(&principal.id, self.product_repo.get_pool()).await?;
        Ok(rows.into_iter().map(|r| ProductResponse::from_row(r, &self.storage)).collect())
    }

    /// Idempotent
    pub async fn add_favorite(
        &self,
        principal: &Principal,
        product_id: Uuid,
    ) -> Result<(), error::SystemError> {
        match self
            .product_repo
            .add_favorite(&principal.id, &product_id, self.product_repo.get_pool())
            .await
        {
            Err(error::SystemError::NotFound(_)) => {
                Err(error::SystemError::not_found("Product not found"))
            }
            other => other,
        }
    }

    /// Idempotent; removing a favorite that does not exist succeeds
    pub async fn remove_favorite(
        &self,
        principal: &Principal,
        product_id: Uuid,
    ) -> Result<(), error::SystemError> {
        self.product_repo
            .remove_favorite(&principal.id, &product_id, self.product_repo.get_pool())
            .await
    }

    pub async fn reviews(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<ReviewResponse>, error::SystemError> {
        let rows = self
            .review_repo
            .find_by_product(&product_id, REVIEW_PAGE_SIZE, self.product_repo.get_pool())
            .await?;
        Ok(rows.into_iter().map(|r| ReviewResponse::from_row(r, &self.storage)).collect())
    }

    /// Insert the review and recompute the product aggregate in one transaction, then
    /// tell the product room. The product row lock serialises concurrent reviewers.
    pub async fn create_review(
        &self,
        principal: &Principal,
        product_id: Uuid,
        model: CreateReviewModel,
        images: Vec<UploadedFile>,
    ) -> Result<ReviewCreated, error::SystemError> {
        let image_paths = self.storage.store_all(Bucket::Reviews, &images).await?;

        let result = self.persist_review(principal, product_id, model, image_paths.clone()).await;
        let (review, rating_avg, rating_count) = match result {
            Ok(saved) => saved,
            Err(e) => {
                self.storage.remove_all(&image_paths).await;
                return Err(e);
            }
        };

        self.realtime.do_send(BroadcastToRoom {
            room: Room::Product(product_id),
            message: ServerMessage::ReviewCreated { product_id, rating_avg, rating_count },
            skip_session: None,
        });

        Ok(ReviewCreated {
            review: ReviewResponse::from_entity(review, &self.storage),
            rating_avg,
            rating_count,
        })
    }

    async fn persist_review(
        &self,
        principal: &Principal,
        product_id: Uuid,
        model: CreateReviewModel,
        images: Vec<String>,
    ) -> Result<(ReviewEntity, f64, i32), error::SystemError> {
        let mut tx = self.product_repo.get_pool().begin().await?;

        self.product_repo
            .lock_by_id(&product_id, &mut tx)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Product not found"))?;

        let review = self
            .review_repo
            .create(
                &InsertReview {
                    id: Uuid::now_v7(),
                    product_id,
                    user_id: principal.id,
                    rating: model.rating,
                    content: model.content,
                    images,
                },
                tx.as_mut(),
            )
            .await?;

        let (sum, count) = self.review_repo.rating_totals(&product_id, tx.as_mut()).await?;
        let (rating_avg, rating_count) = rating_aggregate(sum, count);
        self.review_repo
            .set_product_rating(&product_id, rating_avg, rating_count, tx.as_mut())
            .await?;

        tx.commit().await?;

        log::info!(
            "Review {} on product {}: rating now {} over {}",
            review.id,
            product_id,
            rating_avg,
            rating_count
        );
        Ok((review, rating_avg, rating_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::file_upload::UploadConfig;
    use crate::modules::product::repository_mock::{MockProductRepository, MockReviewRepository};
    use crate::modules::user::schema::UserRole;
    use actix::Actor;

    fn service(
        products: Arc<MockProductRepository>,
    ) -> ProductService<MockProductRepository, MockReviewRepository> {
        ProductService::with_dependencies(
            products,
            Arc::new(MockReviewRepository),
            Arc::new(BlobStorage::new(UploadConfig::default())),
            RealtimeServer::new().start(),
        )
    }

    fn buyer() -> Principal {
        Principal { id: Uuid::now_v7(), role: UserRole::Buyer }
    }

    #[actix::test]
    async fn favoriting_twice_keeps_one_favorite() {
        let product_id = Uuid::now_v7();
        let repo = Arc::new(MockProductRepository::with_products([product_id]));
        let svc = service(repo.clone());
        let user = buyer();

        svc.add_favorite(&user, product_id).await.unwrap();
        svc.add_favorite(&user, product_id).await.unwrap();
        assert_eq!(repo.favorite_count(&user.id), 1);

        svc.remove_favorite(&user, product_id).await.unwrap();
        svc.remove_favorite(&user, product_id).await.unwrap();
        assert_eq!(repo.favorite_count(&user.id), 0);
    }

    #[actix::test]
    async fn favoriting_a_missing_product_is_not_found() {
        let svc = service(Arc::new(MockProductRepository::with_products([])));

        let result = svc.add_favorite(&buyer(), Uuid::now_v7()).await;

        match &result {
            Err(error::SystemError::NotFound(msg)) => assert_eq!(&**msg, "Product not found"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[actix::test]
    async fn missing_product_detail_is_not_found() {
        let svc = service(Arc::new(MockProductRepository::with_products([])));
        let result = svc.detail(Uuid::now_v7()).await;
        assert!(matches!(result, Err(error::SystemError::NotFound(_))));
    }
}

