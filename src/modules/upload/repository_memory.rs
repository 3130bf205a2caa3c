use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    api::error,
    modules::upload::{
        model::{NewUploadReport, ReportOutcome, SettleOutcome, Settlement},
        repository::UploadRepository,
        schema::{JsonMap, UploadEntity, UploadStatus},
    },
};

/// In-process Record Store with the same per-handle semantics as the Postgres one.
#[derive(Default)]
pub struct UploadRepositoryMemory {
    uploads: Mutex<HashMap<String, UploadEntity>>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
}

impl UploadRepositoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the database could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.uploads.lock().await.len()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn insert(&self, upload: UploadEntity) {
        self.uploads.lock().await.insert(upload.external_handle.clone(), upload);
    }

    fn check_available(&self) -> Result<(), error::SystemError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(error::SystemError::StoreUnavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn merge(target: &mut JsonMap, extra: &JsonMap) {
    for (key, value) in extra {
        target.insert(key.clone(), value.clone());
    }
}

#[async_trait::async_trait]
impl UploadRepository for UploadRepositoryMemory {
    async fn upsert_report(
        &self,
        report: &NewUploadReport,
    ) -> Result<ReportOutcome, error::SystemError> {
        self.check_available()?;
        let mut uploads = self.uploads.lock().await;
        let now = chrono::Utc::now();

        let Some(existing) = uploads.get_mut(&report.external_handle) else {
            let upload = UploadEntity {
                id: Uuid::now_v7(),
                external_handle: report.external_handle.clone(),
                owner_id: report.owner_id,
                url: report.url.clone(),
                filename: report.filename.clone(),
                mime_type: report.mime_type.clone(),
                size_bytes: report.size_bytes,
                status: UploadStatus::Uploaded,
                extra_metadata: Json(report.extra_metadata.clone()),
                failure_reason: None,
                created_at: now,
                updated_at: now,
                settled_at: None,
            };
            uploads.insert(upload.external_handle.clone(), upload.clone());
            self.record_write();
            return Ok(ReportOutcome::Created(upload));
        };

        if existing.status != UploadStatus::Uploaded || existing.owner_id != report.owner_id {
            return Ok(ReportOutcome::Unchanged(existing.clone()));
        }

        existing.url = report.url.clone();
        existing.filename = report.filename.clone().or(existing.filename.take());
        existing.mime_type = report.mime_type.clone().or(existing.mime_type.take());
        existing.size_bytes = report.size_bytes.or(existing.size_bytes);
        merge(&mut existing.extra_metadata.0, &report.extra_metadata);
        existing.updated_at = now;
        let upload = existing.clone();
        self.record_write();
        Ok(ReportOutcome::Refreshed(upload))
    }

    async fn find_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<UploadEntity>, error::SystemError> {
        self.check_available()?;
        Ok(self.uploads.lock().await.get(handle).cloned())
    }

    async fn find_by_owner(
        &self,
        owner_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<UploadEntity>, error::SystemError> {
        self.check_available()?;
        let uploads = self.uploads.lock().await;
        let mut owned: Vec<UploadEntity> =
            uploads.values().filter(|u| u.owner_id.as_ref() == Some(owner_id)).cloned().collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned.truncate(limit.max(0) as usize);
        Ok(owned)
    }

    async fn settle(
        &self,
        handle: &str,
        settlement: &Settlement,
    ) -> Result<SettleOutcome, error::SystemError> {
        self.check_available()?;
        let mut uploads = self.uploads.lock().await;

        let Some(existing) = uploads.get_mut(handle) else {
            return Ok(SettleOutcome::Missing);
        };

        if existing.status.is_settled() {
            return Ok(SettleOutcome::AlreadySettled(existing.clone()));
        }

        let now = chrono::Utc::now();
        existing.status = settlement.status;
        if let Some(url) = &settlement.url {
            existing.url = url.clone();
        }
        if let Some(filename) = &settlement.filename {
            existing.filename = Some(filename.clone());
        }
        if let Some(mime_type) = &settlement.mime_type {
            existing.mime_type = Some(mime_type.clone());
        }
        if let Some(size) = settlement.size_bytes {
            existing.size_bytes = Some(size);
        }
        merge(&mut existing.extra_metadata.0, &settlement.extra_metadata);
        existing.failure_reason = settlement.failure_reason.clone();
        existing.settled_at = Some(now);
        existing.updated_at = now;
        let upload = existing.clone();
        self.record_write();
        Ok(SettleOutcome::Transitioned(upload))
    }
}
