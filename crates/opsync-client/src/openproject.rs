//! reqwest-backed implementation of the backend adapter

use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use opsync_core::{SyncModel, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::adapter::{BackendAdapter, RecordStream};
use crate::error::{ClientError, ClientResult};
use crate::filters::{filters_query, Filter};
use crate::record::ExternalRecord;

/// Default timeout for API requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for one tracking-service instance.
///
/// Authenticates with the service's API-key basic-auth scheme and speaks its
/// HAL-style collection envelopes (`_embedded.elements`, `total`, `offset`).
pub struct OpenProjectClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

/// API path segment for each synced model's collection.
fn collection_endpoint(model: SyncModel) -> &'static str {
    match model {
        SyncModel::Project => "projects",
        SyncModel::TaskStage => "statuses",
        SyncModel::Task => "work_packages",
        SyncModel::User => "users",
        SyncModel::TimeEntry => "time_entries",
        SyncModel::Activity => "activities",
    }
}

/// One page of a collection response.
struct CollectionPage {
    total: u64,
    records: Vec<ExternalRecord>,
}

fn parse_collection(value: Value) -> ClientResult<CollectionPage> {
    let total = value.get("total").and_then(Value::as_u64).unwrap_or(0);
    let elements = value
        .pointer("/_embedded/elements")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let records = elements
        .into_iter()
        .map(ExternalRecord::from_value)
        .collect::<ClientResult<Vec<_>>>()?;

    Ok(CollectionPage { total, records })
}

impl OpenProjectClient {
    pub fn new(api_url: &str, api_key: &str) -> ClientResult<Self> {
        let base_url = Url::parse(api_url)
            .map_err(|e| ClientError::Configuration(format!("invalid API URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Build `{base}/api/v3/{segments...}`.
    fn api_url(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::Configuration("API URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            path.extend(["api", "v3"]);
            path.extend(segments);
        }
        Ok(url)
    }

    /// GET a JSON document. `Ok(None)` means 404.
    async fn request_json(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> ClientResult<Option<Value>> {
        debug!("GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .basic_auth("apikey", Some(&self.api_key))
            .query(query)
            .send()
            .await
            .map_err(ClientError::from_request_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let value = response
                    .json::<Value>()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                Ok(Some(value))
            }
            status => {
                warn!("Backend returned {} for {}", status, url);
                Err(ClientError::Http {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
        }
    }

    async fn fetch_page(
        &self,
        model: SyncModel,
        filters: &[Filter],
        page_size: u32,
        page: u32,
    ) -> ClientResult<CollectionPage> {
        let url = self.api_url(&[collection_endpoint(model)])?;
        let query = [
            ("filters", filters_query(filters)),
            ("pageSize", page_size.to_string()),
            ("offset", page.to_string()),
        ];

        let value = self
            .request_json(url.clone(), &query)
            .await?
            .ok_or(ClientError::Http {
                status: 404,
                url: url.to_string(),
            })?;

        parse_collection(value)
    }
}

#[async_trait]
impl BackendAdapter for OpenProjectClient {
    async fn get_single(
        &self,
        model: SyncModel,
        external_id: &str,
    ) -> ClientResult<ExternalRecord> {
        let url = self.api_url(&[collection_endpoint(model), external_id])?;
        let value =
            self.request_json(url, &[])
                .await?
                .ok_or_else(|| ClientError::RecordMissing {
                    model,
                    external_id: external_id.to_string(),
                })?;
        ExternalRecord::from_value(value)
    }

    fn get_collection(
        &self,
        model: SyncModel,
        filters: Vec<Filter>,
        page_size: u32,
        offset: Option<u32>,
    ) -> RecordStream<'_> {
        let page_size = page_size.max(1);

        Box::pin(try_stream! {
            let mut page = offset.unwrap_or(1).max(1);
            let mut seen = (page as u64 - 1) * page_size as u64;

            loop {
                let batch = self.fetch_page(model, &filters, page_size, page).await?;
                let count = batch.records.len() as u64;

                for record in batch.records {
                    yield record;
                }

                seen += count;
                if count == 0 || seen >= batch.total {
                    break;
                }
                page += 1;
            }
        })
    }

    fn get_work_package_activities(
        &self,
        work_package_id: String,
        offset: Option<u32>,
    ) -> RecordStream<'_> {
        Box::pin(try_stream! {
            let url = self.api_url(&["work_packages", &work_package_id, "activities"])?;

            let mut query = Vec::new();
            if let Some(offset) = offset {
                query.push(("offset", offset.to_string()));
            }

            let value = self
                .request_json(url.clone(), &query)
                .await?
                .ok_or(ClientError::Http {
                    status: 404,
                    url: url.to_string(),
                })?;

            let page = parse_collection(value)?;
            for record in page.records {
                yield record;
            }
        })
    }

    async fn fetch_binary(&self, url: &str, timeout: Duration) -> ClientResult<Option<Bytes>> {
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(ClientError::from_request_error)?;

        if !response.status().is_success() {
            debug!("Binary fetch of {} returned {}", url, response.status());
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(ClientError::from_request_error)?;
        Ok(Some(bytes))
    }
}
