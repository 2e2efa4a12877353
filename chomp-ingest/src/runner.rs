use async_trait::async_trait;
use chomp_common::Ingester;

use crate::context::IngestContext;
use crate::error::IngestError;

/// One epoch's worth of work for a single ingester type (spec.md §4.6).
/// The scheduler calls `run_epoch` once per tick; implementors fetch,
/// populate `ingester.fields[*].value`, and delegate to
/// [`crate::epoch::finish_epoch`] for the shared transform/persist/publish
/// tail.
#[async_trait]
pub trait IngesterRunner: Send + Sync {
    async fn run_epoch(&self, ctx: &IngestContext, ingester: &mut Ingester) -> Result<(), IngestError>;
}
