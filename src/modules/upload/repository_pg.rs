use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;

use crate::{
    api::error,
    modules::upload::{
        model::{NewUploadReport, ReportOutcome, SettleOutcome, Settlement},
        repository::UploadRepository,
        schema::UploadEntity,
    },
};

#[derive(FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    upload: UploadEntity,
    inserted: bool,
}

#[derive(Clone)]
pub struct UploadRepositoryPg {
    pool: sqlx::PgPool,
}

impl UploadRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UploadRepository for UploadRepositoryPg {
    async fn upsert_report(
        &self,
        report: &NewUploadReport,
    ) -> Result<ReportOutcome, error::SystemError> {
        let id = Uuid::now_v7();

        // xmax = 0 only for a freshly inserted tuple
        let row = sqlx::query_as::<_, UpsertRow>(
            r#"
            INSERT INTO uploads
                (id, external_handle, owner_id, url, filename, mime_type, size_bytes,
                 status, extra_metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'uploaded', $8)
            ON CONFLICT (external_handle) DO UPDATE
            SET
                url            = EXCLUDED.url,
                filename       = COALESCE(EXCLUDED.filename, uploads.filename),
                mime_type      = COALESCE(EXCLUDED.mime_type, uploads.mime_type),
                size_bytes     = COALESCE(EXCLUDED.size_bytes, uploads.size_bytes),
                extra_metadata = uploads.extra_metadata || EXCLUDED.extra_metadata,
                updated_at     = NOW()
            WHERE uploads.status = 'uploaded'
              AND uploads.owner_id IS NOT DISTINCT FROM EXCLUDED.owner_id
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(id)
        .bind(&report.external_handle)
        .bind(report.owner_id)
        .bind(&report.url)
        .bind(&report.filename)
        .bind(&report.mime_type)
        .bind(report.size_bytes)
        .bind(Json(&report.extra_metadata))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(UpsertRow { upload, inserted: true }) => Ok(ReportOutcome::Created(upload)),
            Some(UpsertRow { upload, inserted: false }) => Ok(ReportOutcome::Refreshed(upload)),
            // The conflict branch was filtered out, so the row exists but was not touched.
            None => self
                .find_by_handle(&report.external_handle)
                .await?
                .map(ReportOutcome::Unchanged)
                .ok_or_else(|| error::SystemError::not_found("Upload not found")),
        }
    }

    async fn find_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<UploadEntity>, error::SystemError> {
        let upload = sqlx::query_as::<_, UploadEntity>(
            "SELECT * FROM uploads WHERE external_handle = $1",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        Ok(upload)
    }

    async fn find_by_owner(
        &self,
        owner_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<UploadEntity>, error::SystemError> {
        let uploads = sqlx::query_as::<_, UploadEntity>(
            r#"
            SELECT * FROM uploads
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(uploads)
    }

    async fn settle(
        &self,
        handle: &str,
        settlement: &Settlement,
    ) -> Result<SettleOutcome, error::SystemError> {
        let settled = sqlx::query_as::<_, UploadEntity>(
            r#"
            UPDATE uploads
            SET
                status         = $2,
                url            = COALESCE($3, url),
                filename       = COALESCE($4, filename),
                mime_type      = COALESCE($5, mime_type),
                size_bytes     = COALESCE($6, size_bytes),
                extra_metadata = extra_metadata || $7,
                failure_reason = $8,
                settled_at     = NOW(),
                updated_at     = NOW()
            WHERE external_handle = $1
              AND status IN ('uploaded', 'unknown')
            RETURNING *
            "#,
        )
        .bind(handle)
        .bind(settlement.status)
        .bind(&settlement.url)
        .bind(&settlement.filename)
        .bind(&settlement.mime_type)
        .bind(settlement.size_bytes)
        .bind(Json(&settlement.extra_metadata))
        .bind(&settlement.failure_reason)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(upload) = settled {
            return Ok(SettleOutcome::Transitioned(upload));
        }

        Ok(match self.find_by_handle(handle).await? {
            Some(upload) => SettleOutcome::AlreadySettled(upload),
            None => SettleOutcome::Missing,
        })
    }
}
