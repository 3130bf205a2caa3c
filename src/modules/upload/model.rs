use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::modules::upload::schema::{JsonMap, UploadEntity, UploadStatus};

/// Descriptor the browser posts right after Filestack reports a finished upload.
#[derive(Debug, Deserialize, Validate)]
pub struct UploadResultModel {
    #[validate(length(min = 1, message = "handle cannot be empty"))]
    pub handle: String,
    #[validate(url(message = "url must be a valid URL"))]
    pub url: String,
    #[serde(rename = "mimetype")]
    pub mime_type: Option<String>,
    #[validate(range(min = 0, message = "size must be a non-negative integer"))]
    pub size: Option<i64>,
    pub filename: Option<String>,
    /// Milliseconds since the epoch, as reported by the picker.
    #[serde(rename = "uploadDate")]
    pub upload_date: Option<i64>,
    pub metadata: Option<JsonMap>,
}

#[derive(Deserialize, Validate)]
pub struct ListUploadsQuery {
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

/// Upsert payload keyed by `external_handle`.
#[derive(Debug, Clone)]
pub struct NewUploadReport {
    pub external_handle: String,
    pub owner_id: Option<Uuid>,
    pub url: String,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub extra_metadata: JsonMap,
}

#[derive(Debug, Clone)]
pub enum ReportOutcome {
    Created(UploadEntity),
    /// Duplicate report for a record still in `uploaded`; descriptive fields refreshed.
    Refreshed(UploadEntity),
    /// Record exists but was left untouched (settled, or owned by someone else).
    Unchanged(UploadEntity),
}

/// Terminal state reported by the upload service. Descriptive fields that are
/// present replace whatever the client reported.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub status: UploadStatus,
    pub url: Option<String>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub extra_metadata: JsonMap,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SettleOutcome {
    Transitioned(UploadEntity),
    AlreadySettled(UploadEntity),
    Missing,
}
