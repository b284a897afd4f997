//! # relsync-core
//!
//! Reconciliation engine for asset relationships: in-memory caching of remote
//! CMDB state, identifier resolution, label translation, and the
//! create/update/skip/delete decision rules for links, dependencies, and
//! impacts.
//!
//! The engine drives a remote service through the [`api::CmdbApi`] port; wire
//! implementations live in `relsync-connectors`.

pub mod api;
pub mod cache;
pub mod counters;
pub mod engine;
pub mod error;
pub mod labels;
pub mod model;
pub mod row;

pub use api::{CmdbApi, CreateLink, DeleteLink, LabelUpdate, NewAnnotation, PageRequest};
pub use cache::{RemoteStateCache, PAGE_SIZE};
pub use counters::Counters;
pub use engine::{SyncOptions, SyncSession};
pub use error::{ApiError, ApiResult, SyncError};
pub use labels::LabelMaps;
pub use model::{
    graph_module_installed, pair_key, AnnotationKind, AnnotationRecord, AssetKey, AssetRecord,
    LinkRecord, ModuleInfo, GRAPH_MODULE,
};
pub use row::{RowFieldMap, SourceRow};
