use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web, Error, HttpMessage, HttpRequest,
};

use crate::{api::error, constants::JwtConfig, utils::Claims};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

pub async fn authentication<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody + 'static,
{
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    // Browser sessions carry the same token in a cookie
    let cookie = || req.cookie(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string());
    let token = match bearer.or_else(cookie) {
        Some(t) => t,
        None => {
            return Err(error::Error::unauthorized("Authentication required").into());
        }
    };

    let config = req.app_data::<web::Data<JwtConfig>>().ok_or_else(|| {
        log::error!("JwtConfig is not registered as app data");
        error::Error::InternalServer
    })?;

    let claims = Claims::decode(&token, config)
        .map_err(|_| error::Error::unauthorized("Token Invalid or Expired"))?;

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
