//! The remote CMDB port driven by the reconciliation engine.
//!
//! Every mutating call takes an immutable request value built up front, so an
//! implementation never accumulates call state between invocations and a
//! fully-formed request can be logged verbatim in dry-run mode.

use crate::error::ApiResult;
use crate::model::{AnnotationKind, AnnotationRecord, AssetRecord, LinkRecord, ModuleInfo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One page of a collection query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based row offset.
    pub offset: u64,
    /// Maximum rows to return.
    pub limit: u64,
}

/// Request to create an undirected link between two assets.
///
/// `left`/`right` carry parent-then-child order by convention; the remote
/// service attaches no directionality semantics to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLink {
    pub left: String,
    pub right: String,
}

/// Request to delete the link between two assets, whichever order it is
/// stored under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteLink {
    pub left: String,
    pub right: String,
}

/// Request to create a directed dependency or impact annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub left: String,
    pub right: String,
    pub label: String,
}

/// Request to change the label of an existing annotation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelUpdate {
    pub id: String,
    pub label: String,
}

/// Remote CRUD surface of the CMDB service.
///
/// Count and fetch operations are scoped server-side to asset-to-asset
/// relations only. Implementations must report remote-side failures through
/// `ApiError` rather than success payloads.
#[async_trait]
pub trait CmdbApi: Send + Sync {
    /// Lists the application modules installed on the instance.
    async fn installed_modules(&self) -> ApiResult<Vec<ModuleInfo>>;

    /// Total number of asset records.
    async fn asset_count(&self) -> ApiResult<u64>;

    /// Fetches one page of asset records.
    async fn fetch_assets(&self, page: PageRequest) -> ApiResult<Vec<AssetRecord>>;

    /// Total number of asset-to-asset link records.
    async fn link_count(&self) -> ApiResult<u64>;

    /// Fetches one page of link records.
    async fn fetch_links(&self, page: PageRequest) -> ApiResult<Vec<LinkRecord>>;

    /// Total number of asset-to-asset annotation records of the given kind.
    async fn annotation_count(&self, kind: AnnotationKind) -> ApiResult<u64>;

    /// Fetches one page of annotation records of the given kind.
    async fn fetch_annotations(
        &self,
        kind: AnnotationKind,
        page: PageRequest,
    ) -> ApiResult<Vec<AnnotationRecord>>;

    /// Creates a link.
    async fn create_link(&self, req: &CreateLink) -> ApiResult<()>;

    /// Deletes a link.
    async fn delete_link(&self, req: &DeleteLink) -> ApiResult<()>;

    /// Creates an annotation record.
    async fn create_annotation(&self, kind: AnnotationKind, req: &NewAnnotation) -> ApiResult<()>;

    /// Rewrites the label of an annotation record.
    async fn update_annotation(&self, kind: AnnotationKind, req: &LabelUpdate) -> ApiResult<()>;

    /// Deletes an annotation record by its remote ID.
    async fn delete_annotation(&self, kind: AnnotationKind, id: &str) -> ApiResult<()>;
}
