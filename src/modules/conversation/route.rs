use actix_web::middleware::from_fn;
use actix_web::web::{ServiceConfig, scope};

use crate::middlewares::authentication;
use crate::modules::conversation::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/conversations")
            .wrap(from_fn(authentication))
            .service(get_conversations)
            .service(create_conversation)
            .service(mark_read)
            .configure(crate::modules::message::route::configure),
    );
}
