use actix_web::{HttpRequest, get, post, put, web};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_principal,
    modules::order::{
        model::{CreateOrderModel, OrderResponse, OrderStats, UpdateStatusModel},
        repository_pg::OrderRepositoryPg,
        schema::{OrderEntity, OrderStatus},
        service::OrderService,
    },
    utils::ValidatedJson,
};

pub type OrderSvc = OrderService<OrderRepositoryPg>;

#[post("")]
pub async fn create_order(
    order_svc: web::Data<OrderSvc>,
    body: ValidatedJson<CreateOrderModel>,
    req: HttpRequest,
) -> Result<success::Success<OrderResponse>, error::Error> {
    let principal = get_principal(&req)?;
    let order = order_svc.create_order(&principal, body.0).await?;
    Ok(success::Success::created(Some(order)).message("Order placed"))
}

#[get("/buyer")]
pub async fn get_buyer_orders(
    order_svc: web::Data<OrderSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<OrderResponse>>, error::Error> {
    let principal = get_principal(&req)?;
    let orders = order_svc.list_as_buyer(&principal).await?;
    Ok(success::Success::ok(Some(orders)))
}

#[get("/seller")]
pub async fn get_seller_orders(
    order_svc: web::Data<OrderSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<OrderResponse>>, error::Error> {
    let principal = get_principal(&req)?;
    let orders = order_svc.list_as_seller(&principal).await?;
    Ok(success::Success::ok(Some(orders)))
}

#[get("/stats")]
pub async fn get_stats(
    order_svc: web::Data<OrderSvc>,
    req: HttpRequest,
) -> Result<success::Success<OrderStats>, error::Error> {
    let principal = get_principal(&req)?;
    let stats = order_svc.get_stats(&principal).await?;
    Ok(success::Success::ok(Some(stats)))
}

#[get("/{order_id:[0-9a-fA-F-]{36}}")]
pub async fn get_order(
    order_svc: web::Data<OrderSvc>,
    order_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<OrderResponse>, error::Error> {
    let principal = get_principal(&req)?;
    let order = order_svc.get_order(&principal, *order_id).await?;
    Ok(success::Success::ok(Some(order)))
}

#[put("/{order_id:[0-9a-fA-F-]{36}}/status")]
pub async fn update_status(
    order_svc: web::Data<OrderSvc>,
    order_id: web::Path<Uuid>,
    body: ValidatedJson<UpdateStatusModel>,
    req: HttpRequest,
) -> Result<success::Success<OrderEntity>, error::Error> {
    let principal = get_principal(&req)?;
    let next = body.0.status.parse::<OrderStatus>()?;
    let order = order_svc.update_status(&principal, *order_id, next).await?;
    Ok(success::Success::ok(Some(order)).message("Order status updated"))
}
