use actix_web::{
    middleware::from_fn,
    web::{ServiceConfig, scope},
};

use crate::{middlewares::authentication, modules::product::handle::*};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/products")
            .service(get_products)
            .service(get_product)
            .service(get_reviews)
            // scopes do not fall through, the authenticated catch-all stays last
            .service(
                scope("")
                    .wrap(from_fn(authentication))
                    .service(get_my_posts_count)
                    .service(get_my_posts)
                    .service(get_favorites)
                    .service(create_product)
                    .service(update_product)
                    .service(delete_product)
                    .service(add_favorite)
                    .service(remove_favorite)
                    .service(create_review),
            ),
    );
}
