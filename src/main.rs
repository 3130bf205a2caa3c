use actix_cors::Cors;
use actix_web::{self, middleware::Logger, web, App, HttpServer};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    api::success::Success,
    configs::{connect_database, run_migrations},
    modules::{
        upload::{
            repository::UploadRepository, repository_pg::UploadRepositoryPg,
            service::UploadService,
        },
        webhook::service::WebhookService,
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
}

#[actix_web::get("/health")]
async fn health_check() -> Success<HealthStatus> {
    Success::ok(Some(HealthStatus { status: "ok" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let env = constants::Env::load().map_err(|e| std::io::Error::other(e.to_string()))?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(env.log_level.as_str()),
    )
    .init();
    log::info!("Environment loaded, database at {}", env.redacted_database_url());

    let db_pool = connect_database(&env.database_url)
        .await
        .map_err(|_| std::io::Error::other("Database connection error"))?;
    run_migrations(&db_pool).await.map_err(|e| std::io::Error::other(e.to_string()))?;

    let upload_repo: Arc<dyn UploadRepository + Send + Sync> =
        Arc::new(UploadRepositoryPg::new(db_pool));

    let upload_service = UploadService::with_dependencies(upload_repo.clone());
    let webhook_service = WebhookService::with_dependencies(
        upload_repo,
        env.filestack.webhook_secret.clone(),
        env.filestack.webhook_tolerance_secs,
    );

    let public_config = web::Data::new(env.filestack.public.clone());
    let jwt_config = web::Data::new(env.jwt.clone());
    let frontend_url = env.frontend_url.clone();

    log::info!("Starting server at http://{}:{}", env.ip, env.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(upload_service.clone()))
            .app_data(web::Data::new(webhook_service.clone()))
            .app_data(public_config.clone())
            .app_data(jwt_config.clone())
            .service(health_check)
            .configure(modules::configure)
    })
    .bind((env.ip.as_str(), env.port))?
    .workers(2)
    .run()
    .await
}
