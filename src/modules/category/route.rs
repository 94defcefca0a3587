use actix_web::web::{ServiceConfig, scope};

use crate::modules::category::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/categories").service(get_categories));
}
