use actix_web::middleware::from_fn;
use actix_web::web::{ServiceConfig, scope};

use crate::middlewares::{authentication, authorization};
use crate::modules::user::handle::*;
use crate::modules::user::schema::UserRole;

pub fn public_api_configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/auth").service(register).service(login).service(
        scope("").wrap(from_fn(authentication)).service(me),
    ));
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/users")
            .service(public_profile)
            .service(
                scope("/admin")
                    .wrap(from_fn(authorization(vec![UserRole::Admin])))
                    .wrap(from_fn(authentication))
                    .service(admin_list_users)
                    .service(admin_update_role)
                    .service(admin_update_active),
            )
            .service(
                scope("")
                    .wrap(from_fn(authentication))
                    .service(get_profile)
                    .service(update_profile)
                    .service(change_password)
                    .service(update_avatar),
            ),
    );
}
