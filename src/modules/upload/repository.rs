use uuid::Uuid;

use crate::{
    api::error,
    modules::upload::{
        model::{NewUploadReport, ReportOutcome, SettleOutcome, Settlement},
        schema::UploadEntity,
    },
};

/// Record Store contract. Every write is atomic per `external_handle`.
#[async_trait::async_trait]
pub trait UploadRepository {
    /// Insert a record in `uploaded`, or refresh the descriptive fields of an
    /// existing `uploaded` record with the same owner. Anything else is left as is.
    async fn upsert_report(
        &self,
        report: &NewUploadReport,
    ) -> Result<ReportOutcome, error::SystemError>;

    async fn find_by_handle(&self, handle: &str)
        -> Result<Option<UploadEntity>, error::SystemError>;

    async fn find_by_owner(
        &self,
        owner_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<UploadEntity>, error::SystemError>;

    /// Move an `uploaded`/`unknown` record to its terminal status. Performs at
    /// most one write.
    async fn settle(
        &self,
        handle: &str,
        settlement: &Settlement,
    ) -> Result<SettleOutcome, error::SystemError>;
}
