use actix_web::{middleware::from_fn, web};

use crate::middlewares::authentication;

pub mod upload;
pub mod webhook;

/// Public routes first; everything registered after the empty scope requires a bearer token.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(upload::route::public_configure).configure(webhook::route::configure).service(
        web::scope("").wrap(from_fn(authentication)).configure(upload::route::configure),
    );
}
