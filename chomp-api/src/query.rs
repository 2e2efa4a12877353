//! Core read-side query surface (spec.md §4.9): `/last`, `/history`,
//! `/schema`, `/convert`. Grounded on the route contracts in
//! `examples/original_source/src/server/routes.py` — that file carries
//! route metadata (path, point cost, protection) but no handler bodies
//! survived distillation, so the response shapes here follow the spec's
//! contract-level description directly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use poem_openapi::param::{Path, Query};
use poem_openapi::payload::Json;
use poem_openapi::{Object, OpenApi};
use serde_json::Value as JsonValue;

use chomp_cache::RegistryService;
use chomp_common::{Field, FieldValue, Ingester};
use chomp_storage::HistoryQuery;

use crate::error::QueryError;
use crate::state::AppState;
use crate::ApiTags;

pub struct QueryApi {
    pub state: AppState,
}

impl QueryApi {
    pub fn new(state: AppState) -> Self {
        QueryApi { state }
    }
}

/// Splits a `resources` path segment (`/last/btc_price,eth_price`) into
/// its comma-separated resource names, matching the original's
/// `{resources:path}` catch-all routes collapsed into one query param.
fn split_resources(resources: &str) -> Vec<String> {
    resources
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A field is never exposed to a query-API caller if it is transient
/// (ingestion-only scratch data) or protected (spec.md invariant P3).
fn is_publicly_visible(field: &Field) -> bool {
    !field.transient && !field.protected
}

fn row_to_json(row: &BTreeMap<String, FieldValue>, ingester: Option<&Ingester>) -> JsonValue {
    let mut out = serde_json::Map::with_capacity(row.len());
    for (name, value) in row {
        if let Some(ing) = ingester {
            if let Some(field) = ing.field_by_name(name) {
                if !is_publicly_visible(field) {
                    continue;
                }
            }
        }
        out.insert(name.clone(), serde_json::to_value(value).unwrap_or(JsonValue::Null));
    }
    JsonValue::Object(out)
}

#[derive(Debug, Clone, Object)]
pub struct ConvertResponse {
    pub pair: String,
    pub rate: f64,
    pub base_amount: Option<f64>,
    pub quote_amount: Option<f64>,
}

#[OpenApi(prefix_path = "/", tag = ApiTags::Query)]
impl QueryApi {
    /// Returns the latest cached field dict for each named resource
    /// (spec.md §4.9 `GET /last/{resources}`).
    #[oai(path = "/last/:resources", method = "get", operation_id = "last_resources")]
    async fn last_resources(&self, resources: Path<String>) -> Result<Json<JsonValue>, QueryError> {
        self.last(split_resources(&resources.0)).await
    }

    /// Same as [`Self::last_resources`] but takes the resource list as a
    /// query parameter, matching the original's bare `/last` route.
    #[oai(path = "/last", method = "get", operation_id = "last")]
    async fn last_query(&self, resources: Query<String>) -> Result<Json<JsonValue>, QueryError> {
        self.last(split_resources(&resources.0)).await
    }

    /// Range fetch over persisted storage (spec.md §4.9 `GET
    /// /history/{resources}?from&to&columns`). `interval` is accepted for
    /// contract compatibility but this crate's storage trait has no
    /// server-side downsampling, so it is currently advisory only.
    #[oai(path = "/history/:resources", method = "get", operation_id = "history_resources")]
    #[allow(clippy::too_many_arguments)]
    async fn history_resources(
        &self,
        resources: Path<String>,
        from: Query<Option<DateTime<Utc>>>,
        to: Query<Option<DateTime<Utc>>>,
        columns: Query<Option<String>>,
        limit: Query<Option<u32>>,
    ) -> Result<Json<JsonValue>, QueryError> {
        let names = split_resources(&resources.0);
        if names.is_empty() {
            return Err(QueryError::bad_request("at least one resource name is required"));
        }
        let to_ts = to.0.unwrap_or_else(Utc::now);
        let from_ts = from.0.unwrap_or_else(|| to_ts - chrono::Duration::days(1));
        let cols: Vec<String> = columns
            .0
            .map(|c| c.split(',').map(str::trim).map(str::to_string).collect())
            .unwrap_or_default();

        let mut out = serde_json::Map::with_capacity(names.len());
        for name in &names {
            let rows = self
                .state
                .storage
                .history(HistoryQuery {
                    table: name,
                    columns: &cols,
                    from_ts,
                    to_ts,
                    limit: limit.0,
                })
                .await
                .map_err(QueryError::from)?;
            let rendered: Vec<JsonValue> = rows.iter().map(|r| row_to_json(r, None)).collect();
            out.insert(name.clone(), JsonValue::Array(rendered));
        }
        Ok(Json(JsonValue::Object(out)))
    }

    /// Enumerates registered resources and their public field schemas
    /// (spec.md §4.9 `GET /schema`).
    #[oai(path = "/schema", method = "get", operation_id = "schema")]
    async fn schema(&self, resources: Query<Option<String>>) -> Result<Json<JsonValue>, QueryError> {
        let registry = RegistryService::new(self.state.cache.clone());
        let ingesters = registry.get_registered_ingesters().await.map_err(QueryError::from)?;
        let wanted = resources.0.map(|r| split_resources(&r));

        let mut out = serde_json::Map::new();
        for (name, ingester) in &ingesters {
            if let Some(wanted) = &wanted {
                if !wanted.contains(name) {
                    continue;
                }
            }
            let fields: Vec<JsonValue> = ingester
                .fields
                .iter()
                .filter(|f| is_publicly_visible(f))
                .map(|f| {
                    serde_json::json!({
                        "name": f.name,
                        "type": f.field_type.to_string(),
                    })
                })
                .collect();
            out.insert(
                name.clone(),
                serde_json::json!({
                    "resource_type": format!("{:?}", ingester.resource_type),
                    "interval": ingester.interval.to_string(),
                    "fields": fields,
                }),
            );
        }
        Ok(Json(JsonValue::Object(out)))
    }

    /// Converts between two resources' latest values (spec.md §4.9 `GET
    /// /convert/{base.field-quote.field}?base_amount|quote_amount&precision`).
    #[oai(path = "/convert/:pair", method = "get", operation_id = "convert")]
    async fn convert(
        &self,
        pair: Path<String>,
        base_amount: Query<Option<f64>>,
        quote_amount: Query<Option<f64>>,
        precision: Query<Option<u32>>,
    ) -> Result<Json<ConvertResponse>, QueryError> {
        let (base, quote) = pair
            .0
            .split_once('-')
            .ok_or_else(|| QueryError::bad_request("pair must be formatted as base.field-quote.field"))?;
        let base_value = self.latest_field_value(base).await?;
        let quote_value = self.latest_field_value(quote).await?;
        if quote_value == 0.0 {
            return Err(QueryError::bad_request("quote value is zero, cannot convert"));
        }

        let precision = precision.0.unwrap_or(8);
        let round = |v: f64| {
            let factor = 10f64.powi(precision as i32);
            (v * factor).round() / factor
        };

        let rate = round(base_value / quote_value);
        let base_amount = base_amount.0;
        let quote_amount = match (base_amount, quote_amount.0) {
            (Some(b), _) => Some(round(b * rate)),
            (None, Some(q)) => Some(round(q / rate)),
            (None, None) => None,
        };

        Ok(Json(ConvertResponse {
            pair: pair.0,
            rate,
            base_amount,
            quote_amount,
        }))
    }
}

impl QueryApi {
    async fn last(&self, names: Vec<String>) -> Result<Json<JsonValue>, QueryError> {
        if names.is_empty() {
            return Err(QueryError::bad_request("at least one resource name is required"));
        }
        let cache_key = format!("last:{}", names.join(","));
        if let Some(cached) = self.state.query_cache.get(&cache_key).await {
            return Ok(Json(cached));
        }

        let registry = RegistryService::new(self.state.cache.clone());
        let ingesters = registry.get_registered_ingesters().await.unwrap_or_default();

        let mut out = serde_json::Map::with_capacity(names.len());
        for name in &names {
            let row: Option<BTreeMap<String, FieldValue>> =
                self.state.cache.get_cache(name).await.map_err(QueryError::from)?;
            match row {
                Some(row) => {
                    out.insert(name.clone(), row_to_json(&row, ingesters.get(name)));
                }
                None => {
                    out.insert(name.clone(), JsonValue::Null);
                }
            }
        }

        let body = JsonValue::Object(out);
        self.state.query_cache.insert(cache_key, body.clone()).await;
        Ok(Json(body))
    }

    /// Resolves a `resource.field` locator to its latest numeric value,
    /// reading the cached epoch snapshot directly (same source `/last`
    /// reads from).
    async fn latest_field_value(&self, locator: &str) -> Result<f64, QueryError> {
        let (resource, field) = locator
            .split_once('.')
            .ok_or_else(|| QueryError::bad_request(format!("'{locator}' must be formatted as resource.field")))?;
        let row: Option<BTreeMap<String, FieldValue>> = self
            .state
            .cache
            .get_cache(resource)
            .await
            .map_err(QueryError::from)?;
        let row = row.ok_or_else(|| QueryError::not_found(format!("no cached data for resource '{resource}'")))?;
        row.get(field)
            .and_then(FieldValue::as_f64)
            .ok_or_else(|| QueryError::not_found(format!("field '{field}' has no numeric value")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_comma_separated_resources() {
        assert_eq!(split_resources("btc_price, eth_price,,sol_price"), vec!["btc_price", "eth_price", "sol_price"]);
    }

    #[test]
    fn transient_and_protected_fields_are_never_publicly_visible() {
        let mut f = Field::new("raw", chomp_common::FieldType::String, "", "");
        assert!(is_publicly_visible(&f));
        f.transient = true;
        assert!(!is_publicly_visible(&f));
        f.transient = false;
        f.protected = true;
        assert!(!is_publicly_visible(&f));
    }
}
