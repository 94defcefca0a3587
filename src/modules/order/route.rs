use actix_web::{
    middleware::from_fn,
    web::{ServiceConfig, scope},
};

use crate::{middlewares::authentication, modules::order::handle::*};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/orders")
            .wrap(from_fn(authentication))
            .service(get_buyer_orders)
            .service(get_seller_orders)
            .service(get_stats)
            .service(get_order)
            .service(create_order)
            .service(update_status),
    );
}
