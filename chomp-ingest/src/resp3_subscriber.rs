//! RESP3 pub/sub ingester, grounded on `src/ingesters/resp3_subscriber.py`
//! in `examples/original_source`. Each field's `target` is a `redis://`
//! connection URL and `selector` the channel to subscribe to; the latest
//! message per channel is captured for the current epoch (the original's
//! `message_handler` callback collapses to the same "last value wins"
//! semantics once `finish_epoch` runs once per tick rather than per
//! message).

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::warn;

use chomp_common::{FieldValue, Ingester};

use crate::context::IngestContext;
use crate::epoch::finish_epoch;
use crate::error::IngestError;
use crate::runner::IngesterRunner;

async fn latest_message(target: &str, channel: &str, wait: Duration) -> Option<String> {
    let client = redis::Client::open(target).ok()?;
    let mut pubsub = client.get_async_pubsub().await.ok()?;
    pubsub.subscribe(channel).await.ok()?;
    let mut stream = pubsub.on_message();
    tokio::time::timeout(wait, stream.next())
        .await
        .ok()
        .flatten()
        .and_then(|msg| msg.get_payload::<String>().ok())
}

#[derive(Default)]
pub struct Resp3SubscriberRunner {
    pub wait: Duration,
}

#[async_trait]
impl IngesterRunner for Resp3SubscriberRunner {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
        let wait = if self.wait.is_zero() {
            Duration::from_secs(2)
        } else {
            self.wait
        };
        for field in &mut ingester.fields {
            if field.target.is_empty() || field.selector.is_empty() {
                continue;
            }
            field.value = match latest_message(&field.target, &field.selector, wait).await {
                Some(s) => s.parse::<f64>().map(FieldValue::Float).unwrap_or(FieldValue::String(s)),
                None => {
                    warn!(channel = %field.selector, "no message received this epoch");
                    FieldValue::Null
                }
            };
        }
        finish_epoch(ctx, ingester).await
    }
}
