use actix::Addr;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        order::{
            model::{
                CreateOrderModel, InsertOrder, InsertOrderItem, OrderResponse, OrderStats,
                ProductSnapshot, line_total,
            },
            repository::OrderRepository,
            schema::{OrderEntity, OrderStatus},
        },
        websocket::{events::SendToUsers, message::ServerMessage, server::RealtimeServer},
    },
    utils::Principal,
};

/// Rows for `principal` buying `quantity` of `product`. The product's price is
/// copied into both rows so later price edits never reach this order.
fn plan_order(
    principal: &Principal,
    quantity: i32,
    product: Option<ProductSnapshot>,
) -> Result<(InsertOrder, InsertOrderItem), error::SystemError> {
    let product = product.ok_or_else(|| error::SystemError::not_found("Product not found"))?;

    if product.seller_id == principal.id {
        return Err(error::SystemError::forbidden("You cannot order your own product"));
    }

    let total_amount = line_total(product.price, quantity)?;
    let order = InsertOrder {
        id: Uuid::now_v7(),
        buyer_id: principal.id,
        seller_id: product.seller_id,
        product_id: product.id,
        total_amount,
    };
    let item = InsertOrderItem {
        id: Uuid::now_v7(),
        order_id: order.id,
        product_id: product.id,
        product_name: product.name,
        quantity,
        unit_price: product.price,
    };
    Ok((order, item))
}

/// The locked order, provided `principal` may move it to `next`
fn authorize_status_change(
    principal: &Principal,
    locked: Option<OrderEntity>,
    next: OrderStatus,
) -> Result<OrderEntity, error::SystemError> {
    let current = locked.ok_or_else(|| error::SystemError::not_found("Order not found"))?;

    if current.seller_id != principal.id && !principal.is_admin() {
        return Err(error::SystemError::forbidden("Only the seller can update this order"));
    }

    current.status.check_transition(next, principal.is_admin())?;
    Ok(current)
}

/// A conditional write that matched no row lost to a concurrent change
fn require_applied(written: Option<OrderEntity>) -> Result<OrderEntity, error::SystemError> {
    written.ok_or_else(|| {
        error::SystemError::invalid_transition("Order status was changed by another request")
    })
}

#[derive(Clone)]
pub struct OrderService<R>
where
    R: OrderRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
    realtime: Addr<RealtimeServer>,
}

impl<R> OrderService<R>
where
    R: OrderRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(repo: Arc<R>, realtime: Addr<RealtimeServer>) -> Self {
        OrderService { repo, realtime }
    }

    /// Order plus its single line item, with the product price frozen at this moment
    pub async fn create_order(
        &self,
        principal: &Principal,
        model: CreateOrderModel,
    ) -> Result<OrderResponse, error::SystemError> {
        if model.quantity <= 0 {
            return Err(error::SystemError::bad_request("Quantity must be at least 1"));
        }

        let mut tx = self.repo.get_pool().begin().await?;

        let product = self.repo.find_product_snapshot(&model.product_id, tx.as_mut()).await?;
        let (insert_order, insert_item) = plan_order(principal, model.quantity, product)?;

        let order = self.repo.insert_order(&insert_order, tx.as_mut()).await?;
        let item = self.repo.insert_item(&insert_item, tx.as_mut()).await?;

        tx.commit().await?;

        log::info!("Order {} placed by {} for product {}", order.id, principal.id, item.product_id);
        Ok(OrderResponse { order, items: vec![item] })
    }

    /// Seller (or admin) moves an order along its lifecycle. The status read and the
    /// write happen under one row lock, and the write is conditional on the status
    /// that was checked, so a repeated click is judged against the new state.
    pub async fn update_status(
        &self,
        principal: &Principal,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<OrderEntity, error::SystemError> {
        let mut tx = self.repo.get_pool().begin().await?;

        let locked = self.repo.lock_by_id(&order_id, &mut tx).await?;
        let current = authorize_status_change(principal, locked, next)?;

        let written =
            self.repo.update_status_if(&order_id, current.status, next, tx.as_mut()).await?;
        let updated = require_applied(written)?;

        if next == OrderStatus::Completed {
            self.repo.record_sale(&order_id, tx.as_mut()).await?;
        }

        tx.commit().await?;

        log::info!(
            "Order {} moved {} -> {} by {}",
            order_id,
            current.status.as_str(),
            next.as_str(),
            principal.id
        );

        self.realtime.do_send(SendToUsers {
            user_ids: vec![updated.buyer_id, updated.seller_id],
            message: ServerMessage::OrderStatusChanged { order_id, status: updated.status },
        });

        Ok(updated)
    }

    pub async fn get_order(
        &self,
        principal: &Principal,
        order_id: Uuid,
    ) -> Result<OrderResponse, error::SystemError> {
        let pool = self.repo.get_pool();

        let order = self
            .repo
            .find_by_id(&order_id, pool)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Order not found"))?;

        let involved = order.buyer_id == principal.id || order.seller_id == principal.id;
        if !involved && !principal.is_admin() {
            return Err(error::SystemError::forbidden("You cannot view this order"));
        }

        let items = self.repo.find_items(&[order.id], pool).await?;
        Ok(OrderResponse { order, items })
    }

    pub async fn list_as_buyer(
        &self,
        principal: &Principal,
    ) -> Result<Vec<OrderResponse>, error::SystemError> {
        let orders = self.repo.find_by_buyer(&principal.id, self.repo.get_pool()).await?;
        self.with_items(orders).await
    }

    pub async fn list_as_seller(
        &self,
        principal: &Principal,
    ) -> Result<Vec<OrderResponse>, error::SystemError> {
        let orders = self.repo.find_by_seller(&principal.id, self.repo.get_pool()).await?;
        self.with_items(orders).await
    }

    pub async fn get_stats(&self, principal: &Principal) -> Result<OrderStats, error::SystemError> {
        let rows = self.repo.status_totals(&principal.id, self.repo.get_pool()).await?;
        Ok(OrderStats::from_rows(&rows))
    }

    async fn with_items(
        &self,
        orders: Vec<OrderEntity>,
    ) -> Result<Vec<OrderResponse>, error::SystemError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = self.repo.find_items(&ids, self.repo.get_pool()).await?;
        Ok(OrderResponse::group(orders, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::user::schema::UserRole;

    fn principal(role: UserRole) -> Principal {
        Principal { id: Uuid::now_v7(), role }
    }

    fn snapshot(seller_id: Uuid, price: i64) -> ProductSnapshot {
        ProductSnapshot { id: Uuid::now_v7(), seller_id, name: "Desk lamp".into(), price }
    }

    fn order(seller_id: Uuid, status: OrderStatus) -> OrderEntity {
        let now = chrono::Utc::now();
        OrderEntity {
            id: Uuid::now_v7(),
            buyer_id: Uuid::now_v7(),
            seller_id,
            product_id: Some(Uuid::now_v7()),
            status,
            total_amount: 50_000,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn order_captures_the_price_at_purchase() {
        let buyer = principal(UserRole::Buyer);
        let product = snapshot(Uuid::now_v7(), 25_000);
        let (product_id, seller_id) = (product.id, product.seller_id);

        let (order, item) = plan_order(&buyer, 3, Some(product)).unwrap();

        assert_eq!(order.buyer_id, buyer.id);
        assert_eq!(order.seller_id, seller_id);
        assert_eq!(order.total_amount, 75_000);
        assert_eq!(item.order_id, order.id);
        assert_eq!(item.product_id, product_id);
        assert_eq!(item.unit_price, 25_000);
        assert_eq!(item.product_name, "Desk lamp");
    }

    #[test]
    fn buying_your_own_product_is_forbidden() {
        let seller = principal(UserRole::Buyer);
        let result = plan_order(&seller, 1, Some(snapshot(seller.id, 10)));
        assert!(matches!(result, Err(error::SystemError::Forbidden(_))));
    }

    #[test]
    fn ordering_a_missing_product_is_not_found() {
        let result = plan_order(&principal(UserRole::Buyer), 1, None);
        assert!(matches!(result, Err(error::SystemError::NotFound(_))));
    }

    #[test]
    fn only_the_seller_moves_an_order() {
        let stranger = principal(UserRole::Buyer);
        let result = authorize_status_change(
            &stranger,
            Some(order(Uuid::now_v7(), OrderStatus::Pending)),
            OrderStatus::Confirmed,
        );
        assert!(matches!(result, Err(error::SystemError::Forbidden(_))));

        let seller = principal(UserRole::Buyer);
        let current = authorize_status_change(
            &seller,
            Some(order(seller.id, OrderStatus::Pending)),
            OrderStatus::Confirmed,
        )
        .unwrap();
        assert_eq!(current.status, OrderStatus::Pending);
    }

    #[test]
    fn missing_order_is_not_found() {
        let admin = principal(UserRole::Admin);
        let result = authorize_status_change(&admin, None, OrderStatus::Shipped);
        assert!(matches!(result, Err(error::SystemError::NotFound(_))));
    }

    #[test]
    fn seller_cannot_skip_steps_but_admin_can() {
        let seller = principal(UserRole::Buyer);
        let result = authorize_status_change(
            &seller,
            Some(order(seller.id, OrderStatus::Pending)),
            OrderStatus::Completed,
        );
        assert!(matches!(result, Err(error::SystemError::InvalidTransition(_))));

        let admin = principal(UserRole::Admin);
        let result = authorize_status_change(
            &admin,
            Some(order(Uuid::now_v7(), OrderStatus::Pending)),
            OrderStatus::Completed,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn lost_conditional_write_is_invalid_transition() {
        assert!(matches!(require_applied(None), Err(error::SystemError::InvalidTransition(_))));

        let written = order(Uuid::now_v7(), OrderStatus::Shipped);
        assert_eq!(require_applied(Some(written)).unwrap().status, OrderStatus::Shipped);
    }
}
