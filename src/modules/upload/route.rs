use crate::modules::upload::handle::*;
use actix_web::web::ServiceConfig;

pub fn public_configure(cfg: &mut ServiceConfig) {
    cfg.service(upload_config);
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(upload_result).service(list_uploads).service(get_upload);
}
