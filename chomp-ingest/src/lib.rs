pub mod chain;
pub mod context;
pub mod dynamic_scrapper;
pub mod epoch;
pub mod error;
pub mod evm_caller;
pub mod http_api;
pub mod jsonrpc;
pub mod monitor;
pub mod multicall;
pub mod processor;
pub mod resp3_getter;
pub mod resp3_subscriber;
pub mod runner;
pub mod select;
pub mod static_scrapper;
pub mod sui_caller;
pub mod svm_caller;
pub mod ws_api;

pub use context::IngestContext;
pub use error::IngestError;
pub use runner::IngesterRunner;

use std::sync::Arc;

use chomp_common::IngesterType;

/// Maps an ingester type to the runner that knows how to fetch its fields
/// (spec.md §4.2). `evm_caller`/`svm_caller`/`sui_caller` need a configured
/// [`chain::ChainRpcPool`] (or, for `evm_caller`, one per chain id), so they
/// aren't constructible from the type alone; `chomp-worker`'s bootstrap
/// builds those pools from `WorkerConfig::chains` and constructs
/// `EvmCallerRunner`/`SvmCallerRunner`/`SuiCallerRunner` directly instead
/// of going through this function for those three types.
pub fn runner_for(ingester_type: IngesterType) -> Option<Arc<dyn IngesterRunner>> {
    match ingester_type {
        IngesterType::HttpApi => Some(Arc::new(http_api::HttpApiRunner::default())),
        IngesterType::WsApi => Some(Arc::new(ws_api::WsApiRunner::default())),
        IngesterType::StaticScrapper => Some(Arc::new(static_scrapper::StaticScrapperRunner)),
        IngesterType::DynamicScrapper => Some(Arc::new(dynamic_scrapper::DynamicScrapperRunner)),
        IngesterType::Resp3Getter => Some(Arc::new(resp3_getter::Resp3GetterRunner)),
        IngesterType::Resp3Subscriber => Some(Arc::new(resp3_subscriber::Resp3SubscriberRunner::default())),
        IngesterType::Processor => Some(Arc::new(processor::ProcessorRunner)),
        IngesterType::Monitor => Some(Arc::new(monitor::MonitorRunner::default())),
        IngesterType::EvmCaller | IngesterType::SvmCaller | IngesterType::SuiCaller => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_rpc_ingester_types_need_explicit_endpoint_construction() {
        assert!(runner_for(IngesterType::EvmCaller).is_none());
        assert!(runner_for(IngesterType::HttpApi).is_some());
    }
}
