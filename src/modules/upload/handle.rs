use actix_web::{get, post, web, HttpRequest};

use crate::api::{error, success};
use crate::constants::PublicUploadConfig;
use crate::middlewares::get_claims;
use crate::modules::upload::{model, schema::UploadEntity, service::UploadService};
use crate::utils::{ValidatedJson, ValidatedQuery};

/// Settings the browser picker needs. Never carries server secrets.
#[get("/upload-config")]
pub async fn upload_config(
    config: web::Data<PublicUploadConfig>,
) -> Result<success::Success<PublicUploadConfig>, error::Error> {
    Ok(success::Success::ok(Some(config.get_ref().clone())))
}

#[post("/upload-result")]
pub async fn upload_result(
    upload_service: web::Data<UploadService>,
    config: web::Data<PublicUploadConfig>,
    req: HttpRequest,
    body: ValidatedJson<model::UploadResultModel>,
) -> Result<success::Success<()>, error::Error> {
    let owner_id = get_claims(&req)?.sub;
    let report = body.0;

    match report.mime_type.as_deref() {
        Some(mime_type) if !config.permits_mime(mime_type) => {
            let msg = format!("File type '{mime_type}' is not allowed");
            return Err(error::Error::bad_request(msg));
        }
        None if !config.accept.is_empty() => {
            return Err(error::Error::bad_request("mimetype is required"));
        }
        _ => {}
    }
    let too_large = |size: i64| u64::try_from(size).is_ok_and(|size| size > config.max_size);
    if report.size.is_some_and(too_large) {
        return Err(error::Error::bad_request(format!(
            "File size exceeds maximum allowed size of {} bytes",
            config.max_size
        )));
    }

    upload_service.report_upload(Some(owner_id), report).await?;
    Ok(success::Success::ok(None).message("Upload recorded"))
}

#[get("/uploads")]
pub async fn list_uploads(
    upload_service: web::Data<UploadService>,
    req: HttpRequest,
    query: ValidatedQuery<model::ListUploadsQuery>,
) -> Result<success::Success<Vec<UploadEntity>>, error::Error> {
    let owner_id = get_claims(&req)?.sub;
    let uploads = upload_service.list_for_owner(owner_id, query.0.limit).await?;
    Ok(success::Success::ok(Some(uploads)))
}

#[get("/uploads/{handle}")]
pub async fn get_upload(
    upload_service: web::Data<UploadService>,
    req: HttpRequest,
    handle: web::Path<String>,
) -> Result<success::Success<UploadEntity>, error::Error> {
    let owner_id = get_claims(&req)?.sub;
    let upload = upload_service.get_for_owner(owner_id, &handle).await?;
    Ok(success::Success::ok(Some(upload)))
}
