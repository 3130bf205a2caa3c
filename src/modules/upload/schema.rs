use serde::{Deserialize, Serialize};
use sqlx::{
    prelude::{FromRow, Type},
    types::Json,
};
use uuid::Uuid;

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "upload_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Reported by the client, not yet confirmed by the upload service.
    Uploaded,
    Confirmed,
    Failed,
    Unknown,
}

impl UploadStatus {
    /// `confirmed` and `failed` are terminal.
    pub fn is_settled(self) -> bool {
        matches!(self, UploadStatus::Confirmed | UploadStatus::Failed)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEntity {
    pub id: Uuid,
    pub external_handle: String,
    pub owner_id: Option<Uuid>,
    pub url: String,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub status: UploadStatus,
    pub extra_metadata: Json<JsonMap>,
    pub failure_reason: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub settled_at: Option<chrono::DateTime<chrono::Utc>>,
}
