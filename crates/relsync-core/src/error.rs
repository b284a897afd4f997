//! Error taxonomy for remote calls and fatal run conditions.

use thiserror::Error;

/// Errors from a single remote CMDB call.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The service answered but reported a failure of its own.
    #[error("Remote error: {0}")]
    Remote(String),
}

/// Result type for remote CMDB calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Fatal conditions that halt a reconciliation run before any further
/// mutation is issued.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No assets exist on the remote instance, so no identifier can resolve.
    #[error("no assets could be found on the remote instance")]
    NoAssets,

    /// A transport or decode failure while caching a remote collection.
    #[error("failed to cache {collection}: {source}")]
    Cache {
        collection: &'static str,
        #[source]
        source: ApiError,
    },

    /// Both the creation and removal queries produced zero rows.
    #[error("no relationship or removal rows returned from the source queries")]
    NoSourceRows,
}

impl SyncError {
    pub(crate) fn cache(collection: &'static str, source: ApiError) -> Self {
        SyncError::Cache { collection, source }
    }
}
