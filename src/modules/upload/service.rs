use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::upload::{
    model::{NewUploadReport, ReportOutcome, UploadResultModel},
    repository::UploadRepository,
    schema::UploadEntity,
};

const DEFAULT_LIST_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct UploadService {
    repo: Arc<dyn UploadRepository + Send + Sync>,
}

impl UploadService {
    pub fn with_dependencies(repo: Arc<dyn UploadRepository + Send + Sync>) -> Self {
        info!("UploadService initialized with dependencies");
        UploadService { repo }
    }

    /// Record a client-side upload. Safe to call repeatedly with the same handle.
    pub async fn report_upload(
        &self,
        owner_id: Option<Uuid>,
        report: UploadResultModel,
    ) -> Result<ReportOutcome, error::SystemError> {
        let handle = report.handle.trim();
        if handle.is_empty() {
            return Err(error::SystemError::malformed("handle is required"));
        }
        let url = report.url.trim();
        if url.is_empty() {
            return Err(error::SystemError::malformed("url is required"));
        }
        if report.size.is_some_and(|size| size < 0) {
            return Err(error::SystemError::malformed("size must be a non-negative integer"));
        }

        let mut extra_metadata = report.metadata.unwrap_or_default();
        if let Some(upload_date) = report.upload_date {
            extra_metadata.insert("uploadDate".to_string(), upload_date.into());
        }

        let new_report = NewUploadReport {
            external_handle: handle.to_string(),
            owner_id,
            url: url.to_string(),
            filename: report.filename,
            mime_type: report.mime_type,
            size_bytes: report.size,
            extra_metadata,
        };

        let outcome = self.repo.upsert_report(&new_report).await?;

        match &outcome {
            ReportOutcome::Created(upload) => {
                info!("Upload {} recorded as uploaded", upload.external_handle)
            }
            ReportOutcome::Refreshed(upload) => {
                debug!("Duplicate report for upload {}, fields refreshed", upload.external_handle)
            }
            ReportOutcome::Unchanged(upload) => {
                if upload.owner_id != owner_id {
                    return Err(error::SystemError::forbidden("Upload belongs to another user"));
                }
                debug!(
                    "Report for upload {} ignored, status is {:?}",
                    upload.external_handle, upload.status
                )
            }
        }

        Ok(outcome)
    }

    /// Fetch one of the caller's uploads. Records owned by someone else look missing.
    pub async fn get_for_owner(
        &self,
        owner_id: Uuid,
        handle: &str,
    ) -> Result<UploadEntity, error::SystemError> {
        self.repo
            .find_by_handle(handle)
            .await?
            .filter(|upload| upload.owner_id == Some(owner_id))
            .ok_or_else(|| error::SystemError::not_found("Upload not found"))
    }

    pub async fn list_for_owner(
        &self,
        owner_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<UploadEntity>, error::SystemError> {
        self.repo.find_by_owner(&owner_id, limit.unwrap_or(DEFAULT_LIST_LIMIT)).await
    }
}
