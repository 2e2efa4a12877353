//! Processor ingester (spec.md §4.2 "processor" + §4.5.4 dependency
//! inheritance): no network fetch of its own. Each field's `target`
//! names a source ingester already registered in the cache bus; the
//! processor reads that ingester's latest persisted snapshot, resolves
//! the field's own `selector` against it, and inherits any transformer
//! chain, tags or params the field left unset from the source field of
//! the same name via [`chomp_common::Field::inherit_missing_from`].

use async_trait::async_trait;
use tracing::warn;

use chomp_common::{FieldValue, Ingester};

use crate::context::IngestContext;
use crate::epoch::finish_epoch;
use crate::error::IngestError;
use crate::runner::IngesterRunner;

#[derive(Default)]
pub struct ProcessorRunner;

#[async_trait]
impl IngesterRunner for ProcessorRunner {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError> {
        let registry = chomp_cache::RegistryService::new(ctx.cache.clone());
        let sources = registry.get_registered_ingesters().await?;

        for field in &mut ingester.fields {
            if field.target.is_empty() {
                continue;
            }
            let source_name = field.selector.split('.').next().unwrap_or(&field.target).to_string();

            if let Some(source) = sources.get(&field.target) {
                if let Some(source_field) = source.field_by_name(&source_name) {
                    field.inherit_missing_from(source_field);
                }
            }

            field.value = match ctx.cache.get_cache::<std::collections::BTreeMap<String, FieldValue>>(&field.target).await {
                Ok(Some(snapshot)) => snapshot.get(&source_name).cloned().unwrap_or(FieldValue::Null),
                _ => {
                    warn!(source = %field.target, "no cached snapshot for processor dependency");
                    FieldValue::Null
                }
            };
        }

        finish_epoch(ctx, ingester).await
    }
}
