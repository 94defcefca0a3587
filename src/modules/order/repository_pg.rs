use uuid::Uuid;

use crate::{
    api::error,
    modules::order::{
        model::{InsertOrder, InsertOrderItem, ProductSnapshot, StatusTotalRow},
        repository::OrderRepository,
        schema::{OrderEntity, OrderItemEntity, OrderStatus},
    },
};

#[derive(Clone)]
pub struct OrderRepositoryPg {
    pool: sqlx::PgPool,
}

impl OrderRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for OrderRepositoryPg {
    fn get_pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    async fn find_product_snapshot<'e, E>(
        &self,
        product_id: &Uuid,
        tx: E,
    ) -> Result<Option<ProductSnapshot>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let product = sqlx::query_as::<_, ProductSnapshot>(
            "SELECT id, seller_id, name, price FROM products WHERE id = $1 FOR SHARE",
        )
        .bind(product_id)
        .fetch_optional(tx)
        .await?;

        Ok(product)
    }

    async fn insert_order<'e, E>(
        &self,
        order: &InsertOrder,
        tx: E,
    ) -> Result<OrderEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let created = sqlx::query_as::<_, OrderEntity>(
            r#"
            INSERT INTO orders (id, buyer_id, seller_id, product_id, total_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(order.buyer_id)
        .bind(order.seller_id)
        .bind(order.product_id)
        .bind(order.total_amount)
        .fetch_one(tx)
        .await?;

        Ok(created)
    }

    async fn insert_item<'e, E>(
        &self,
        item: &InsertOrderItem,
        tx: E,
    ) -> Result<OrderItemEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let created = sqlx::query_as::<_, OrderItemEntity>(
            r#"
            INSERT INTO order_items (id, order_id, product_id, product_name, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .fetch_one(tx)
        .await?;

        Ok(created)
    }

    async fn find_by_id<'e, E>(
        &self,
        order_id: &Uuid,
        tx: E,
    ) -> Result<Option<OrderEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let order = sqlx::query_as::<_, OrderEntity>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(tx)
            .await?;

        Ok(order)
    }

    async fn lock_by_id<'e>(
        &self,
        order_id: &Uuid,
        tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<Option<OrderEntity>, error::SystemError> {
        let order =
            sqlx::query_as::<_, OrderEntity>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_optional(&mut **tx)
                .await?;

        Ok(order)
    }

    async fn update_status_if<'e, E>(
        &self,
        order_id: &Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        tx: E,
    ) -> Result<Option<OrderEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let updated = sqlx::query_as::<_, OrderEntity>(
            r#"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(expected)
        .bind(next)
        .fetch_optional(tx)
        .await?;

        Ok(updated)
    }

    async fn record_sale<'e, E>(&self, order_id: &Uuid, tx: E) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE products p
            SET sold_count = p.sold_count + oi.quantity
            FROM order_items oi
            WHERE oi.order_id = $1 AND p.id = oi.product_id
            "#,
        )
        .bind(order_id)
        .execute(tx)
        .await?;

        Ok(())
    }

    async fn find_by_buyer<'e, E>(
        &self,
        buyer_id: &Uuid,
        tx: E,
    ) -> Result<Vec<OrderEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let orders = sqlx::query_as::<_, OrderEntity>(
            "SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC",
        )
        .bind(buyer_id)
        .fetch_all(tx)
        .await?;

        Ok(orders)
    }

    async fn find_by_seller<'e, E>(
        &self,
        seller_id: &Uuid,
        tx: E,
    ) -> Result<Vec<OrderEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let orders = sqlx::query_as::<_, OrderEntity>(
            "SELECT * FROM orders WHERE seller_id = $1 ORDER BY created_at DESC",
        )
        .bind(seller_id)
        .fetch_all(tx)
        .await?;

        Ok(orders)
    }

    async fn find_items<'e, E>(
        &self,
        order_ids: &[Uuid],
        tx: E,
    ) -> Result<Vec<OrderItemEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let items = sqlx::query_as::<_, OrderItemEntity>(
            "SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY id ASC",
        )
        .bind(order_ids)
        .fetch_all(tx)
        .await?;

        Ok(items)
    }

    async fn status_totals<'e, E>(
        &self,
        seller_id: &Uuid,
        tx: E,
    ) -> Result<Vec<StatusTotalRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        // sum of a BIGINT is NUMERIC, cast back so it decodes as i64
        let rows = sqlx::query_as::<_, StatusTotalRow>(
            r#"
            SELECT status,
                   COUNT(*) AS order_count,
                   COALESCE(SUM(total_amount), 0)::BIGINT AS amount
            FROM orders
            WHERE seller_id = $1
            GROUP BY status
            "#,
        )
        .bind(seller_id)
        .fetch_all(tx)
        .await?;

        Ok(rows)
    }
}
