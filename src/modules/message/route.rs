use actix_web::web::ServiceConfig;

use crate::modules::message::handle::*;

/// Mounted inside the `/conversations` scope
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(get_messages).service(send_message);
}
