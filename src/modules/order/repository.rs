use uuid::Uuid;

use crate::{
    api::error,
    modules::order::{
        model::{InsertOrder, InsertOrderItem, ProductSnapshot, StatusTotalRow},
        schema::{OrderEntity, OrderItemEntity, OrderStatus},
    },
};

#[async_trait::async_trait]
pub trait OrderRepository {
    fn get_pool(&self) -> &sqlx::Pool<sqlx::Postgres>;

    /// Price, name and owner of a product, share-locked so they cannot change under the order
    async fn find_product_snapshot<'e, E>(
        &self,
        product_id: &Uuid,
        tx: E,
    ) -> Result<Option<ProductSnapshot>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn insert_order<'e, E>(
        &self,
        order: &InsertOrder,
        tx: E,
    ) -> Result<OrderEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn insert_item<'e, E>(
        &self,
        item: &InsertOrderItem,
        tx: E,
    ) -> Result<OrderItemEntity, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn find_by_id<'e, E>(
        &self,
        order_id: &Uuid,
        tx: E,
    ) -> Result<Option<OrderEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    /// Row-locks the order for the rest of the transaction
    async fn lock_by_id<'e>(
        &self,
        order_id: &Uuid,
        tx: &mut sqlx::Transaction<'e, sqlx::Postgres>,
    ) -> Result<Option<OrderEntity>, error::SystemError>;

    /// Compare-and-set on status; `None` when the stored status is no longer `expected`
    async fn update_status_if<'e, E>(
        &self,
        order_id: &Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        tx: E,
    ) -> Result<Option<OrderEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    /// Add the order's quantities to the sold counters of its products
    async fn record_sale<'e, E>(&self, order_id: &Uuid, tx: E) -> Result<(), error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn find_by_buyer<'e, E>(
        &self,
        buyer_id: &Uuid,
        tx: E,
    ) -> Result<Vec<OrderEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn find_by_seller<'e, E>(
        &self,
        seller_id: &Uuid,
        tx: E,
    ) -> Result<Vec<OrderEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn find_items<'e, E>(
        &self,
        order_ids: &[Uuid],
        tx: E,
    ) -> Result<Vec<OrderItemEntity>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;

    async fn status_totals<'e, E>(
        &self,
        seller_id: &Uuid,
        tx: E,
    ) -> Result<Vec<StatusTotalRow>, error::SystemError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>;
}
