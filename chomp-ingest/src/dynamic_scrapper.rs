//! Browser-rendered scraper, grounded on `src/ingesters/dynamic_scrapper.py`
//! in `examples/original_source`'s `Puppet` helper: one headless Chromium
//! page per distinct target URL, CSS-selector text extraction per field.
//! Actions (click/type/wait) the original's `Puppet.act()` supports are
//! out of scope here; only navigate-then-select is implemented.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures_util::StreamExt;
use tracing::warn;

use chomp_common::{FieldValue, Ingester};

use crate::context::IngestContext;
use crate::epoch::finish_epoch;
use crate::error::IngestError;
use crate::runner::IngesterRunner;

async fn render_and_select(browser: &Browser, url: &str, selector: &str) -> Option<String> {
    let page = browser.new_page(url).await.ok()?;
    page.wait_for_navigation().await.ok()?;
    if selector.is_empty() {
        return page.content().await.ok();
    }
    let element = page.find_element(selector).await.ok()?;
    let text = element.inner_text().await.ok().flatten();
    let _ = page.close().await;
    text
}

#[derive(Default)]
pub struct DynamicScrapperRunner;

#[async_trait]
impl IngesterRunner for DynamicScrapperRunner {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
        let (mut browser, mut handler) = match Browser::launch(BrowserConfig::builder().build().map_err(|e| {
            IngestError::Other(anyhow::anyhow!(e))
        })?)
        .await
        {
            Ok(pair) => pair,
            Err(e) => return Err(IngestError::Other(e.into())),
        };
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let mut urls: Vec<String> = ingester
            .fields
            .iter()
            .filter(|f| !f.target.is_empty())
            .map(|f| f.target.clone())
            .collect();
        urls.sort();
        urls.dedup();

        let mut rendered: BTreeMap<(String, String), String> = BTreeMap::new();
        for field in &ingester.fields {
            if field.target.is_empty() {
                continue;
            }
            let key = (field.target.clone(), field.selector.clone());
            if rendered.contains_key(&key) {
                continue;
            }
            match render_and_select(&browser, &field.target, &field.selector).await {
                Some(text) => {
                    rendered.insert(key, text);
                }
                None => warn!(url = %field.target, selector = %field.selector, "dynamic scrape failed"),
            }
        }

        for field in &mut ingester.fields {
            if field.target.is_empty() {
                continue;
            }
            let key = (field.target.clone(), field.selector.clone());
            field.value = rendered.get(&key).cloned().map(FieldValue::String).unwrap_or(FieldValue::Null);
        }

        let _ = browser.close().await;
        handler_task.abort();

        finish_epoch(ctx, ingester).await
    }
}
