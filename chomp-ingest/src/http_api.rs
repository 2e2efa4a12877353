//! REST/JSON polling ingester, grounded on `src/ingesters/http_api.py` in
//! `examples/original_source`: one GET per distinct field target URL per
//! epoch, deduplicated so fields sharing a URL only trigger one fetch.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use chomp_common::{FieldValue, Ingester};

use crate::context::IngestContext;
use crate::epoch::{field_target_url, finish_epoch, json_to_field_value};
use crate::error::IngestError;
use crate::runner::IngesterRunner;
use crate::select::select_nested;

pub struct HttpApiRunner {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for HttpApiRunner {
    fn default() -> Self {
        HttpApiRunner {
            max_retries: 3,
            retry_delay: Duration::from_millis(2500),
        }
    }
}

impl HttpApiRunner {
    async fn fetch_with_retry(&self, ctx: &IngestContext, url: &str) -> Result<serde_json::Value, IngestError> {
        let mut last_err = None;
        for attempt in 0..self.max_retries {
            match ctx.http.get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(resp.json().await?);
                }
                Ok(resp) => {
                    error!(url, status = %resp.status(), "http error");
                    last_err = Some(IngestError::Other(anyhow::anyhow!(
                        "http {} for {url}",
                        resp.status()
                    )));
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "fetch failed");
                    last_err = Some(e.into());
                }
            }
            if attempt + 1 < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(last_err.unwrap_or_else(|| IngestError::Other(anyhow::anyhow!("exhausted retries for {url}"))))
    }
}

#[async_trait]
impl IngesterRunner for HttpApiRunner {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
        let current_values: BTreeMap<String, FieldValue> = ingester
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect();

        let mut urls: Vec<String> = ingester
            .fields
            .iter()
            .filter(|f| !f.target.is_empty())
            .map(|f| field_target_url(f, &current_values))
            .collect();
        urls.sort();
        urls.dedup();

        let mut data_by_url: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        for url in &urls {
            let cache_name = format!("{}:{:x}", ingester.name, md5::compute(url.as_bytes()));
            let data = match ctx.cache.get_cache::<serde_json::Value>(&cache_name).await {
                Ok(Some(cached)) => cached,
                _ => {
                    let fetched = self.fetch_with_retry(ctx, url).await.unwrap_or(serde_json::Value::Null);
                    let _ = ctx
                        .cache
                        .cache(&cache_name, &fetched, Duration::from_secs(ingester.interval.seconds()))
                        .await;
                    fetched
                }
            };
            data_by_url.insert(url.clone(), data);
        }

        for field in &mut ingester.fields {
            if field.target.is_empty() {
                continue;
            }
            let url = field_target_url(field, &current_values);
            if let Some(doc) = data_by_url.get(&url) {
                field.value = select_nested(&field.selector, doc)
                    .map(|v| json_to_field_value(&v))
                    .unwrap_or(FieldValue::Null);
            }
        }

        finish_epoch(ctx, ingester).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupes_shared_urls() {
        let mut urls = vec!["http://a".to_string(), "http://a".to_string(), "http://b".to_string()];
        urls.sort();
        urls.dedup();
        assert_eq!(urls, vec!["http://a".to_string(), "http://b".to_string()]);
    }
}
