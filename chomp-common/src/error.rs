use thiserror::Error;

/// Startup-time configuration problems. Always fatal (spec.md §7, kind 1).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),

    #[error("{include_depth_limit} levels of {{include: ...}} nesting exceeded in {path}")]
    IncludeTooDeep {
        path: String,
        include_depth_limit: u32,
    },
}

/// Umbrella error for the rare case a caller wants one error type across
/// crates (e.g. the CLI's top-level `main`). Individual modules return their
/// own focused error enum; this only exists at the bootstrap boundary.
#[derive(Debug, Error)]
pub enum ChompError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
