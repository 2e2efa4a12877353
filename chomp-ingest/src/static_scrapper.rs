//! Static HTML scraper, grounded on `src/ingesters/static_scrapper.py` in
//! `examples/original_source`: one GET per distinct page per epoch, then
//! CSS or XPath selection per field (selectors starting with `//` or `./`
//! are XPath, everything else is CSS).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sxd_document::parser as xml_parser;
use sxd_xpath::{Context, Factory};
use tracing::warn;

use chomp_common::{FieldValue, Ingester};

use crate::context::IngestContext;
use crate::epoch::finish_epoch;
use crate::error::IngestError;
use crate::runner::IngesterRunner;

fn is_xpath(selector: &str) -> bool {
    selector.starts_with("//") || selector.starts_with("./")
}

fn select_css(page: &str, selector: &str) -> Option<String> {
    let doc = Html::parse_document(page);
    let sel = Selector::parse(selector).ok()?;
    let texts: Vec<String> = doc
        .select(&sel)
        .map(|el| el.text().collect::<Vec<_>>().join("").trim_start().to_string())
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}

fn select_xpath(page: &str, selector: &str) -> Option<String> {
    let package = xml_parser::parse(page).ok()?;
    let document = package.as_document();
    let factory = Factory::new();
    let xpath = factory.build(selector).ok()??;
    let context = Context::new();
    let value = xpath.evaluate(&context, document.root()).ok()?;
    let text = value.string();
    if text.trim().is_empty() {
        None
    } else {
        Some(text.trim_start().to_string())
    }
}

#[derive(Default)]
pub struct StaticScrapperRunner;

#[async_trait]
impl IngesterRunner for StaticScrapperRunner {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
        let mut urls: Vec<String> = ingester
            .fields
            .iter()
            .filter(|f| !f.target.is_empty())
            .map(|f| f.target.clone())
            .collect();
        urls.sort();
        urls.dedup();

        let mut pages: BTreeMap<String, String> = BTreeMap::new();
        for url in &urls {
            let hash = format!("{:x}", md5::compute(format!("{url}:{}", ingester.interval)));
            let page = match ctx.cache.get_cache::<String>(&hash).await {
                Ok(Some(cached)) => cached,
                _ => {
                    let fetched = ctx
                        .http
                        .get(url)
                        .send()
                        .await
                        .ok()
                        .filter(|r| r.status().is_success());
                    let text = match fetched {
                        Some(resp) => resp.text().await.unwrap_or_default(),
                        None => {
                            warn!(url, "failed to fetch page, skipping");
                            String::new()
                        }
                    };
                    if !text.is_empty() {
                        let _ = ctx
                            .cache
                            .cache(&hash, &text, Duration::from_secs(ingester.interval.seconds()))
                            .await;
                    }
                    text
                }
            };
            pages.insert(url.clone(), page);
        }

        for field in &mut ingester.fields {
            if field.target.is_empty() {
                continue;
            }
            let page = pages.get(&field.target).cloned().unwrap_or_default();
            if page.is_empty() {
                field.value = FieldValue::Null;
                continue;
            }
            let extracted = if field.selector.is_empty() {
                Some(page.clone())
            } else if is_xpath(&field.selector) {
                select_xpath(&page, &field.selector)
            } else {
                select_css(&page, &field.selector)
            };
            field.value = match extracted {
                Some(text) => FieldValue::String(text),
                None => {
                    warn!(selector = %field.selector, target = %field.target, "no element matched");
                    FieldValue::Null
                }
            };
        }

        finish_epoch(ctx, ingester).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_xpath_vs_css_selectors() {
        assert!(is_xpath("//div[@class='price']"));
        assert!(is_xpath("./span"));
        assert!(!is_xpath("div.price"));
    }

    #[test]
    fn extracts_text_via_css_selector() {
        let html = "<html><body><span class=\"price\">  $64,000 </span></body></html>";
        let value = select_css(html, "span.price").unwrap();
        assert_eq!(value, "$64,000 ");
    }

    #[test]
    fn missing_css_selector_returns_none() {
        let html = "<html><body></body></html>";
        assert!(select_css(html, "span.missing").is_none());
    }
}
