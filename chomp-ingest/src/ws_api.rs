//! WebSocket streaming ingester (spec.md §4.2, "ws_api"): opens a
//! connection per distinct `target` URL, optionally sends a subscribe
//! frame built from `field.handler`, and captures the latest message per
//! socket before each field runs its `selector` against it — the
//! streaming analogue of [`crate::http_api::HttpApiRunner`]'s per-URL
//! fetch dedup.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;

use chomp_common::{FieldValue, Ingester};

use crate::context::IngestContext;
use crate::epoch::{finish_epoch, json_to_field_value};
use crate::error::IngestError;
use crate::runner::IngesterRunner;
use crate::select::select_nested;

async fn read_one_message(url: &str, handler: Option<&str>, wait: Duration) -> Option<serde_json::Value> {
    let (mut ws, _) = connect_async(url).await.ok()?;
    if let Some(sub) = handler {
        ws.send(Message::Text(sub.to_string().into())).await.ok()?;
    }
    let msg = tokio::time::timeout(wait, ws.next()).await.ok()??.ok()?;
    let _ = ws.close(None).await;
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).ok(),
        Message::Binary(bytes) => serde_json::from_slice(bytes.as_slice()).ok(),
        _ => None,
    }
}

pub struct WsApiRunner {
    pub wait: Duration,
}

impl Default for WsApiRunner {
    fn default() -> Self {
        WsApiRunner { wait: Duration::from_secs(5) }
    }
}

#[async_trait]
impl IngesterRunner for WsApiRunner {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
        let mut urls: Vec<String> = ingester
            .fields
            .iter()
            .filter(|f| !f.target.is_empty())
            .map(|f| f.target.clone())
            .collect();
        urls.sort();
        urls.dedup();

        let mut messages: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        for url in &urls {
            let handler = ingester
                .fields
                .iter()
                .find(|f| f.target == *url)
                .and_then(|f| f.handler.as_deref());
            match read_one_message(url, handler, self.wait).await {
                Some(v) => {
                    messages.insert(url.clone(), v);
                }
                None => warn!(url, "no websocket message received this epoch"),
            }
        }

        for field in &mut ingester.fields {
            if field.target.is_empty() {
                continue;
            }
            field.value = messages
                .get(&field.target)
                .and_then(|doc| select_nested(&field.selector, doc))
                .map(|v| json_to_field_value(&v))
                .unwrap_or(FieldValue::Null);
        }

        finish_epoch(ctx, ingester).await
    }
}
