use actix_web::{post, web, HttpRequest};

use crate::api::{error, success};
use crate::modules::webhook::{
    model::ReconcileOutcome,
    service::WebhookService,
    signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER},
};

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|h| h.to_str().ok())
}

/// Filestack delivery endpoint. The body is taken as raw bytes so the
/// signature is checked against exactly what was sent.
#[post("/webhook/filestack")]
pub async fn filestack_webhook(
    webhook_service: web::Data<WebhookService>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<success::Success<()>, error::Error> {
    let outcome = webhook_service
        .receive(&body, header(&req, SIGNATURE_HEADER), header(&req, TIMESTAMP_HEADER))
        .await?;

    let message = match outcome {
        ReconcileOutcome::Settled(_) => "Processed",
        ReconcileOutcome::Duplicate(_) | ReconcileOutcome::UnknownRecord => "Acknowledged",
    };
    Ok(success::Success::ok(None).message(message))
}
