//! Backend adapter contract

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use opsync_core::SyncModel;
use std::time::Duration;

use crate::error::ClientResult;
use crate::filters::Filter;
use crate::record::ExternalRecord;

/// Lazy, page-by-page stream of external records.
pub type RecordStream<'a> = BoxStream<'a, ClientResult<ExternalRecord>>;

/// Everything the import layer needs from the tracking service.
///
/// Implemented over HTTP by [`crate::OpenProjectClient`]; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Fetch a single record. Fails with `ClientError::RecordMissing` when
    /// the entity no longer exists remotely.
    async fn get_single(
        &self,
        model: SyncModel,
        external_id: &str,
    ) -> ClientResult<ExternalRecord>;

    /// Stream a filtered collection. Pagination happens inside the stream
    /// at `page_size` records per request; `offset` restarts the stream at
    /// the given page (1-based).
    fn get_collection(
        &self,
        model: SyncModel,
        filters: Vec<Filter>,
        page_size: u32,
        offset: Option<u32>,
    ) -> RecordStream<'_>;

    /// Stream the full activity feed of one work package.
    fn get_work_package_activities(
        &self,
        work_package_id: String,
        offset: Option<u32>,
    ) -> RecordStream<'_>;

    /// Download raw bytes from a URL with a bounded timeout.
    ///
    /// Returns `Ok(None)` for a non-success response (the caller decides
    /// whether that is an error) and `ClientError::NetworkRetryable` on
    /// timeout.
    async fn fetch_binary(&self, url: &str, timeout: Duration) -> ClientResult<Option<Bytes>>;
}
