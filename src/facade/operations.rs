use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::cache::ttl_cache::TtlCache;
use crate::config::upstream::CacheConfig;
use crate::error::{FacadeError, FacadeResult};
use crate::resilience::dispatcher::{Dispatcher, UpstreamRequest};
use crate::utils::constants::{CACHE_KEY_SCHEMA, CACHE_KEY_SERVICE_TYPES};

const SCHEMA_PATH: &str = "/serviceRequest/fields";
const SERVICE_TYPES_PATH: &str = "/utility/serviceTypes";
const SERVICE_REQUEST_PATH: &str = "/serviceRequest/form";
const COLLATERAL_OVERVIEW_PATH: &str = "/collateralOverview";
const COLLATERAL_FIELDS_PATH: &str = "/collateralOverview/fields";

/// Business-level operations over the dispatcher and the metadata cache.
pub struct Facade {
    dispatcher: Arc<Dispatcher>,
    cache: TtlCache<Value>,
    ttl: CacheConfig,
}

impl Facade {
    pub fn new(dispatcher: Arc<Dispatcher>, ttl: CacheConfig) -> Self {
        Self { dispatcher, cache: TtlCache::new(), ttl }
    }

    /// JSON schema of a service request, `data.model.jsonSchema` upstream.
    pub async fn service_request_schema(&self) -> FacadeResult<Value> {
        self.cache
            .get_or_populate(CACHE_KEY_SCHEMA, self.ttl.schema_ttl(), || async move {
                let response = self.dispatcher.dispatch(&UpstreamRequest::get(SCHEMA_PATH)).await?;
                let schema = response
                    .body
                    .pointer("/data/model/jsonSchema")
                    .filter(|schema| !is_empty(schema))
                    .cloned()
                    .ok_or_else(|| FacadeError::InvalidPayload("service request schema is missing".to_owned()))?;
                info!("service request schema refreshed");
                Ok(schema)
            })
            .await
    }

    /// Names of the service types upstream accepts.
    pub async fn service_types(&self) -> FacadeResult<Vec<String>> {
        let types = self
            .cache
            .get_or_populate(CACHE_KEY_SERVICE_TYPES, self.ttl.service_types_ttl(), || async move {
                let response = self.dispatcher.dispatch(&UpstreamRequest::get(SERVICE_TYPES_PATH)).await?;
                let names: Vec<Value> = response
                    .body
                    .get("data")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| item.get("serviceType"))
                            .filter(|name| name.is_string())
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                if names.is_empty() {
                    return Err(FacadeError::InvalidPayload("service type list is empty".to_owned()));
                }
                info!(count = names.len(), "service types refreshed");
                Ok(Value::Array(names))
            })
            .await?;

        Ok(types
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default())
    }

    /// Submit a service request; returns upstream's `data` member.
    pub async fn create_service_request(&self, body: Value) -> FacadeResult<Value> {
        let response = self
            .dispatcher
            .dispatch(&UpstreamRequest::post(SERVICE_REQUEST_PATH, body))
            .await?;
        Ok(data_or_body(response.body))
    }

    pub async fn collateral_overview(&self, location_id: u64) -> FacadeResult<Value> {
        let path = format!("{}/{}", COLLATERAL_OVERVIEW_PATH, location_id);
        let response = self.dispatcher.dispatch(&UpstreamRequest::get(path)).await?;
        Ok(response.body)
    }

    pub async fn update_collateral_overview(&self, location_id: u64, body: Value) -> FacadeResult<Value> {
        let path = format!("{}/{}", COLLATERAL_OVERVIEW_PATH, location_id);
        let response = self.dispatcher.dispatch(&UpstreamRequest::patch(path, body)).await?;
        Ok(response.body)
    }

    pub async fn collateral_fields(&self) -> FacadeResult<Value> {
        let response = self.dispatcher.dispatch(&UpstreamRequest::get(COLLATERAL_FIELDS_PATH)).await?;
        Ok(response.body)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn data_or_body(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}
