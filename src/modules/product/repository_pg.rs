use uuid::Uuid;

use crate::{
    api::error,
    modules::product::{
        model::{
            InsertProduct, InsertReview, ProductDetailRow, ProductRow, ReviewRow,
            UpdateProductModel,
        },
        repository::{ProductFilter, ProductRepository, ReviewRepository},
        schema::{ProductEntity, ReviewEntity},
    },
};

const PRODUCT_ROW_SELECT: &str = r#"
    SELECT
        p.id, p.seller_id, p.name, p.description, p.price, p.image_path, p.stock,
        p.is_available, p.sold_count, p.rating_avg, p.rating_count, p.created_at, p.updated_at,
        c.id AS category_id, c.name AS category_name, c.slug AS category_slug,
        u.username AS seller_name, u.phone AS seller_phone, u.avatar_path AS seller_avatar_path
"#;

const PRODUCT_ROW_JOINS: &str = r#"
    JOIN categories c ON c.id = p.category_id
    JOIN users u ON u.id = p.seller_id
"#;

#[derive(Clone)]
pub struct ProductRepositoryPg {
    pool: sqlx::PgPool,
}

impl ProductRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProductRepository for ProductRepositoryPg {
    fn get_pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    async fn list<'e, E>(
        &self,
        filter: &ProductFilter,
        tx: E,
    ) -> Result<Vec<ProductRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        // LIMIT NULL is no limit
        let products = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            {PRODUCT_ROW_SELECT}
            FROM products p
            {PRODUCT_ROW_JOINS}
            WHERE ($1::TEXT IS NULL OR c.slug = $1)
              AND ($2::TEXT IS NULL OR p.name ILIKE $2)
            ORDER BY p.created_at DESC
            LIMIT $3
            "#
        ))
        .bind(filter.category_slug.as_deref())
        .bind(filter.name_pattern.as_deref())
        .bind(filter.limit)
        .fetch_all(tx)
        .await?;

        Ok(products)
    }

    async fn find_detail<'e, E>(
        &self,
        product_id: &Uuid,
        tx: E,
    ) -> Result<Option<ProductDetailRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let product = sqlx::query_as::<_, ProductDetailRow>(&format!(
            r#"
            {PRODUCT_ROW_SELECT},
                u.last_seen_at AS seller_last_seen_at,
                (SELECT COALESCE(SUM(sp.sold_count), 0)::BIGINT
                 FROM products sp WHERE sp.seller_id = p.seller_id) AS seller_total_sold,
                (SELECT COALESCE(ROUND(AVG(r.rating)::NUMERIC, 2), 0)::FLOAT8
                 FROM product_reviews r JOIN products sp ON sp.id = r.product_id
                 WHERE sp.seller_id = p.seller_id) AS seller_rating_avg,
                (SELECT COUNT(r.id)
                 FROM product_reviews r JOIN products sp ON sp.id = r.product_id
                 WHERE sp.seller_id = p.seller_id) AS seller_rating_count
            FROM products p
            {PRODUCT_ROW_JOINS}
            WHERE p.id = $1
            "#
        ))
        .bind(product_id)
        .fetch_optional(tx)
        .await?;

        Ok(product)
    }

    async fn find_by_seller<'e, E>(
        &self,
        seller_id: &Uuid,
        tx: E,
    ) -> Result<Vec<ProductRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let products = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            {PRODUCT_ROW_SELECT}
            FROM products p
            {PRODUCT_ROW_JOINS}
            WHERE p.seller_id = $1
            ORDER BY p.created_at DESC
            "#
        ))
        .bind(seller_id)
        .fetch_all(tx)
        .await?;

        Ok(products)
    }

    async fn count_by_seller<'e, E>(
        &self,
        seller_id: &Uuid,
        tx: E,
    ) -> Result<i64, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE seller_id = $1")
            .bind(seller_id)
            .fetch_one(tx)
            .await?;

        Ok(count)
    }

    async fn find_by_id<'e, E>(
        &self,
        product_id: &Uuid,
        tx: E,
    ) -> Result<Option<ProductEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let product = sqlx::query_as::<_, ProductEntity>("SELECT * FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(tx)
            .await?;

        Ok(product)
    }

    async fn lock_by_id<'e>(
        &self,
        product_id: &Uuid,
        tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<Option<ProductEntity>, error::SystemError> {
        let product =
            sqlx::query_as::<_, ProductEntity>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
                .bind(product_id)
                .fetch_optional(&mut **tx)
                .await?;

        Ok(product)
    }

    async fn create<'e, E>(
        &self,
        product: &InsertProduct,
        tx: E,
    ) -> Result<ProductEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let created = sqlx::query_as::<_, ProductEntity>(
            r#"
            INSERT INTO products (id, seller_id, category_id, name, description, price, stock, image_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(product.id)
        .bind(product.seller_id)
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.image_path.as_deref())
        .fetch_one(tx)
        .await?;

        Ok(created)
    }

    async fn update<'e, E>(
        &self,
        product_id: &Uuid,
        changes: &UpdateProductModel,
        image_path: Option<&str>,
        tx: E,
    ) -> Result<Option<ProductEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let updated = sqlx::query_as::<_, ProductEntity>(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                price = COALESCE($3, price),
                description = COALESCE($4, description),
                category_id = COALESCE($5, category_id),
                stock = COALESCE($6, stock),
                is_available = COALESCE($7, is_available),
                image_path = COALESCE($8, image_path),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(changes.name.as_deref())
        .bind(changes.price)
        .bind(changes.description.as_deref())
        .bind(changes.category_id)
        .bind(changes.stock)
        .bind(changes.is_available)
        .bind(image_path)
        .fetch_optional(tx)
        .await?;

        Ok(updated)
    }

    async fn delete_dependents<'e>(
        &self,
        product_id: &Uuid,
        tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<(), error::SystemError> {
        sqlx::query("DELETE FROM order_items WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query("DELETE FROM favorites WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn delete<'e, E>(&self, product_id: &Uuid, tx: E) -> Result<bool, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_favorite<'e, E>(
        &self,
        user_id: &Uuid,
        product_id: &Uuid,
        tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            "INSERT INTO favorites (user_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(tx)
        .await?;

        Ok(())
    }

    async fn remove_favorite<'e, E>(
        &self,
        user_id: &Uuid,
        product_id: &Uuid,
        tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(tx)
            .await?;

        Ok(())
    }

    async fn find_favorites<'e, E>(
        &self,
        user_id: &Uuid,
        tx: E,
    ) -> Result<Vec<ProductRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let products = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            {PRODUCT_ROW_SELECT}
            FROM favorites f
            JOIN products p ON p.id = f.product_id
            {PRODUCT_ROW_JOINS}
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(tx)
        .await?;

        Ok(products)
    }
}

#[derive(Clone)]
pub struct ReviewRepositoryPg;

#[async_trait::async_trait]
impl ReviewRepository for ReviewRepositoryPg {
    async fn find_by_product<'e, E>(
        &self,
        product_id: &Uuid,
        limit: i64,
        tx: E,
    ) -> Result<Vec<ReviewRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let reviews = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT r.id, r.user_id, r.rating, r.content, r.images, r.created_at,
                   u.username, u.avatar_path
            FROM product_reviews r
            LEFT JOIN users u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(tx)
        .await?;

        Ok(reviews)
    }

    async fn create<'e, E>(
        &self,
        review: &InsertReview,
        tx: E,
    ) -> Result<ReviewEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let created = sqlx::query_as::<_, ReviewEntity>(
            r#"
            INSERT INTO product_reviews (id, product_id, user_id, rating, content, images)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(review.id)
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(review.content.as_deref())
        .bind(&review.images)
        .fetch_one(tx)
        .await?;

        Ok(created)
    }

    async fn rating_totals<'e, E>(
        &self,
        product_id: &Uuid,
        tx: E,
    ) -> Result<(i64, i64), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let totals: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(rating), 0)::BIGINT, COUNT(*)
            FROM product_reviews
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_one(tx)
        .await?;

        Ok(totals)
    }

    async fn set_product_rating<'e, E>(
        &self,
        product_id: &Uuid,
        rating_avg: f64,
        rating_count: i32,
        tx: E,
    ) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            "UPDATE products SET rating_avg = $2, rating_count = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(product_id)
        .bind(rating_avg)
        .bind(rating_count)
        .execute(tx)
        .await?;

        Ok(())
    }
}
