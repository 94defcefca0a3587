use actix_web::{
    Error, HttpMessage, HttpRequest,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};
use futures_util::{FutureExt, future::LocalBoxFuture};
use std::rc::Rc;

use crate::{
    ENV,
    api::error,
    modules::user::{schema::UserRole, service::UserService},
    utils::{Claims, Principal},
};

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Identity for a websocket handshake: bearer header first, then `?token=`
pub fn handshake_principal(req: &HttpRequest) -> Result<Principal, error::Error> {
    let query_token = web::Query::<std::collections::HashMap<String, String>>::from_query(
        req.query_string(),
    )
    .ok()
    .and_then(|q| q.get("token").cloned());

    let token = bearer_token(req)
        .map(str::to_string)
        .or(query_token)
        .ok_or_else(|| error::Error::unauthorized("Missing credentials"))?;

    let claims = Claims::decode(&token, ENV.jwt_secret.as_ref())
        .map_err(|_| error::Error::unauthorized("Token Invalid or Expired"))?;

    Ok(claims.principal())
}

pub async fn authentication<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody + 'static,
{
    let token = match bearer_token(req.request()) {
        Some(t) => t,
        None => {
            return Err(error::Error::unauthorized("Token Invalid or Expired").into());
        }
    };

    let claims = Claims::decode(token, ENV.jwt_secret.as_ref())
        .map_err(|_| error::Error::forbidden("Token Invalid or Expired"))?;

    // activity stamp is opportunistic and must never fail the request
    if let Some(users) = req.app_data::<web::Data<UserService>>() {
        let users = users.clone();
        let user_id = claims.sub;
        actix_web::rt::spawn(async move {
            if let Err(e) = users.touch_last_seen(user_id).await {
                log::warn!("Could not update last_seen_at for {}: {}", user_id, e);
            }
        });
    }

    req.extensions_mut().insert(claims);

    next.call(req).await
}

pub fn get_claims(req: &HttpRequest) -> Result<Claims, error::Error> {
    let extensions = req.extensions();

    let claims = extensions
        .get::<Claims>()
        .ok_or_else(|| error::Error::unauthorized("Unauthorized"))?
        .clone();

    Ok(claims)
}

pub fn get_principal(req: &HttpRequest) -> Result<Principal, error::Error> {
    Ok(get_claims(req)?.principal())
}

pub fn authorization<B>(
    allowed_roles: Vec<UserRole>,
) -> impl Fn(
    ServiceRequest,
    Next<B>,
) -> LocalBoxFuture<'static, Result<ServiceResponse<B>, actix_web::Error>>
where
    B: MessageBody + 'static,
{
    let allowed_roles = Rc::new(allowed_roles);
    move |req: ServiceRequest, next: Next<B>| {
        let roles = allowed_roles.clone();
        async move {
            let role = get_claims(req.request())?.role;

            if !roles.contains(&role) {
                return Err(error::Error::forbidden("No permission").into());
            }
            next.call(req).await
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use uuid::Uuid;

    #[test]
    fn handshake_requires_some_credential() {
        let req = TestRequest::default().to_http_request();
        let err = handshake_principal(&req).unwrap_err();
        assert!(matches!(err, error::Error::Unauthorized(_)));
    }

    #[test]
    fn principal_is_read_from_inserted_claims() {
        let id = Uuid::now_v7();
        let req = TestRequest::default().to_http_request();
        assert!(get_principal(&req).is_err());
        req.extensions_mut().insert(Claims::new(&id, &UserRole::Admin, 60));
        let principal = get_principal(&req).unwrap();
        assert_eq!(principal.id, id);
        assert!(principal.is_admin());
    }
}
