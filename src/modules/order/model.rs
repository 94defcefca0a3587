use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use crate::api::error;
use crate::modules::order::schema::{OrderEntity, OrderItemEntity, OrderStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderModel {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusModel {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

/// Product fields frozen into an order at creation time
#[derive(Debug, Clone, FromRow)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub price: i64,
}

#[derive(Debug)]
pub struct InsertOrder {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub total_amount: i64,
}

#[derive(Debug)]
pub struct InsertOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
}

/// `unit_price * quantity`, refusing zero or negative quantities and overflow
pub fn line_total(unit_price: i64, quantity: i32) -> Result<i64, error::SystemError> {
    if quantity <= 0 {
        return Err(error::SystemError::bad_request("Quantity must be at least 1"));
    }
    unit_price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| error::SystemError::bad_request("Order total is too large"))
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
}

impl OrderResponse {
    /// Pair each order with its own items, keeping the order list's ordering
    pub fn group(orders: Vec<OrderEntity>, items: Vec<OrderItemEntity>) -> Vec<OrderResponse> {
        let mut by_order: BTreeMap<Uuid, Vec<OrderItemEntity>> = BTreeMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderResponse { order, items }
            })
            .collect()
    }
}

#[derive(Debug, FromRow)]
pub struct StatusTotalRow {
    pub status: OrderStatus,
    pub order_count: i64,
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderStats {
    pub total_revenue: i64,
    pub status_counts: BTreeMap<&'static str, i64>,
}

impl OrderStats {
    /// Revenue counts completed orders only; every status is present, zero if unused
    pub fn from_rows(rows: &[StatusTotalRow]) -> Self {
        let mut status_counts: BTreeMap<&'static str, i64> =
            OrderStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        let mut total_revenue = 0;

        for row in rows {
            *status_counts.entry(row.status.as_str()).or_insert(0) += row.order_count;
            if row.status == OrderStatus::Completed {
                total_revenue += row.amount;
            }
        }

        OrderStats { total_revenue, status_counts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(order_id: Uuid, name: &str) -> OrderItemEntity {
        OrderItemEntity {
            id: Uuid::now_v7(),
            order_id,
            product_id: Uuid::now_v7(),
            product_name: name.to_string(),
            quantity: 1,
            unit_price: 100_000,
        }
    }

    fn order(id: Uuid) -> OrderEntity {
        OrderEntity {
            id,
            buyer_id: Uuid::now_v7(),
            seller_id: Uuid::now_v7(),
            product_id: None,
            status: OrderStatus::Pending,
            total_amount: 100_000,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn line_total_rejects_non_positive_quantity() {
        assert_eq!(line_total(100_000, 3).unwrap(), 300_000);
        assert!(matches!(line_total(100_000, 0), Err(error::SystemError::BadRequest(_))));
        assert!(matches!(line_total(100_000, -2), Err(error::SystemError::BadRequest(_))));
        assert!(line_total(i64::MAX, 2).is_err());
    }

    #[test]
    fn stats_fill_missing_statuses_and_only_count_completed_revenue() {
        let rows = vec![
            StatusTotalRow { status: OrderStatus::Completed, order_count: 2, amount: 250_000 },
            StatusTotalRow { status: OrderStatus::Canceled, order_count: 1, amount: 90_000 },
            StatusTotalRow { status: OrderStatus::Pending, order_count: 4, amount: 400_000 },
        ];
        let stats = OrderStats::from_rows(&rows);
        assert_eq!(stats.total_revenue, 250_000);
        assert_eq!(stats.status_counts.len(), 5);
        assert_eq!(stats.status_counts["pending"], 4);
        assert_eq!(stats.status_counts["shipped"], 0);
        assert_eq!(stats.status_counts["canceled"], 1);
    }

    #[test]
    fn empty_stats_are_all_zero() {
        let stats = OrderStats::from_rows(&[]);
        assert_eq!(stats.total_revenue, 0);
        assert!(stats.status_counts.values().all(|c| *c == 0));
    }

    #[test]
    fn grouping_keeps_order_sequence_and_attaches_items() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let grouped = OrderResponse::group(
            vec![order(b), order(a)],
            vec![item(a, "lamp"), item(b, "desk"), item(a, "bulb")],
        );
        assert_eq!(grouped[0].order.id, b);
        assert_eq!(grouped[0].items.len(), 1);
        assert_eq!(grouped[1].items.len(), 2);
    }
}
