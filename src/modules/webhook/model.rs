use serde::Deserialize;

use crate::modules::upload::{
    model::Settlement,
    schema::{JsonMap, UploadEntity, UploadStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingOutcome {
    Success,
    Failure,
}

/// Notification body, parsed only after its signature checked out.
#[derive(Debug, Deserialize)]
pub struct WebhookNotification {
    pub handle: String,
    pub outcome: ProcessingOutcome,
    pub error: Option<String>,
    pub url: Option<String>,
    pub filename: Option<String>,
    #[serde(rename = "mimetype")]
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub metadata: Option<JsonMap>,
}

impl WebhookNotification {
    pub fn into_settlement(self) -> Settlement {
        let (status, failure_reason) = match self.outcome {
            ProcessingOutcome::Success => (UploadStatus::Confirmed, None),
            ProcessingOutcome::Failure => {
                let reason = self.error.unwrap_or_else(|| "processing failed".into());
                (UploadStatus::Failed, Some(reason))
            }
        };

        Settlement {
            status,
            url: self.url,
            filename: self.filename,
            mime_type: self.mime_type,
            size_bytes: self.size.filter(|size| *size >= 0),
            extra_metadata: self.metadata.unwrap_or_default(),
            failure_reason,
        }
    }
}

#[derive(Debug)]
pub enum ReconcileOutcome {
    Settled(UploadEntity),
    /// Redelivery for a record that already reached a terminal status.
    Duplicate(UploadEntity),
    /// No record carries this handle. Acknowledged so the sender stops redelivering.
    UnknownRecord,
}
