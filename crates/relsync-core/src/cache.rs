//! In-memory cache of remote relationship state, populated once at startup.
//!
//! Links are looked up symmetrically (either key order satisfies a pair);
//! dependency and impact annotations are looked up under the forward
//! `parent:child` key only. The two lookups are separate functions and must
//! stay that way.

use crate::api::{CmdbApi, PageRequest};
use crate::error::SyncError;
use crate::model::{pair_key, AnnotationKind, AnnotationRecord, AssetKey, AssetRecord, LinkRecord};
use std::collections::HashMap;
use tracing::{debug, info};

/// Fixed page size for remote collection retrieval.
pub const PAGE_SIZE: u64 = 100;

/// Keyed maps of remote assets, links, dependencies, and impacts.
#[derive(Debug, Default)]
pub struct RemoteStateCache {
    key: AssetKey,
    assets: HashMap<String, AssetRecord>,
    links: HashMap<String, LinkRecord>,
    dependencies: HashMap<String, AnnotationRecord>,
    impacts: HashMap<String, AnnotationRecord>,
}

impl RemoteStateCache {
    /// Creates an empty cache using the given identifier strategy.
    pub fn new(key: AssetKey) -> Self {
        Self {
            key,
            ..Default::default()
        }
    }

    /// Populates the cache from the remote service.
    ///
    /// Zero assets is fatal, since nothing could ever resolve. Zero links or
    /// annotations just leaves the map empty. Dependency and impact
    /// collections are only fetched when the graph module is installed.
    pub async fn load(
        api: &dyn CmdbApi,
        key: AssetKey,
        graph_module: bool,
    ) -> Result<Self, SyncError> {
        let mut cache = Self::new(key);
        cache.load_assets(api).await?;
        cache.load_links(api).await?;
        if graph_module {
            cache.load_annotations(api, AnnotationKind::Dependency).await?;
            cache.load_annotations(api, AnnotationKind::Impact).await?;
        }
        Ok(cache)
    }

    async fn load_assets(&mut self, api: &dyn CmdbApi) -> Result<(), SyncError> {
        let count = api
            .asset_count()
            .await
            .map_err(|e| SyncError::cache("assets", e))?;
        if count == 0 {
            return Err(SyncError::NoAssets);
        }

        info!(count, "retrieving assets from the remote instance");
        let mut offset = 0;
        while offset < count {
            let page = api
                .fetch_assets(PageRequest {
                    offset,
                    limit: PAGE_SIZE,
                })
                .await
                .map_err(|e| SyncError::cache("assets", e))?;
            for asset in page {
                let key = self.key.key_for(&asset).to_string();
                // Last write wins on a duplicate identifier.
                self.assets.insert(key, asset);
            }
            offset += PAGE_SIZE;
        }

        info!(cached = self.assets.len(), "assets cached");
        Ok(())
    }

    async fn load_links(&mut self, api: &dyn CmdbApi) -> Result<(), SyncError> {
        let count = api
            .link_count()
            .await
            .map_err(|e| SyncError::cache("links", e))?;
        if count == 0 {
            info!("no existing asset links found");
            return Ok(());
        }

        info!(count, "retrieving asset links from the remote instance");
        let mut offset = 0;
        while offset < count {
            let page = api
                .fetch_links(PageRequest {
                    offset,
                    limit: PAGE_SIZE,
                })
                .await
                .map_err(|e| SyncError::cache("links", e))?;
            for link in page {
                let key = pair_key(&link.left_id, &link.right_id);
                self.links.insert(key, link);
            }
            offset += PAGE_SIZE;
        }

        info!(cached = self.links.len(), "asset links cached");
        Ok(())
    }

    async fn load_annotations(
        &mut self,
        api: &dyn CmdbApi,
        kind: AnnotationKind,
    ) -> Result<(), SyncError> {
        let collection = match kind {
            AnnotationKind::Dependency => "dependencies",
            AnnotationKind::Impact => "impacts",
        };
        let count = api
            .annotation_count(kind)
            .await
            .map_err(|e| SyncError::cache(collection, e))?;
        if count == 0 {
            info!(%kind, "no existing annotation records found");
            return Ok(());
        }

        info!(count, %kind, "retrieving annotation records from the remote instance");
        let mut offset = 0;
        while offset < count {
            let page = api
                .fetch_annotations(
                    kind,
                    PageRequest {
                        offset,
                        limit: PAGE_SIZE,
                    },
                )
                .await
                .map_err(|e| SyncError::cache(collection, e))?;
            let map = match kind {
                AnnotationKind::Dependency => &mut self.dependencies,
                AnnotationKind::Impact => &mut self.impacts,
            };
            for record in page {
                let key = pair_key(&record.left_id, &record.right_id);
                map.insert(key, record);
            }
            offset += PAGE_SIZE;
        }

        debug!(%kind, "annotation records cached");
        Ok(())
    }

    /// Resolves a source-side asset identifier to the remote canonical asset
    /// ID. Not-found is expected data, not an error.
    pub fn resolve_asset_id(&self, identifier: &str) -> Option<&str> {
        self.assets.get(identifier).map(|a| a.id.as_str())
    }

    /// Symmetric link existence: a link cached under either `a:b` or `b:a`
    /// satisfies the pair `(a, b)`.
    pub fn link_exists(&self, a: &str, b: &str) -> bool {
        self.links.contains_key(&pair_key(a, b)) || self.links.contains_key(&pair_key(b, a))
    }

    /// Directional annotation lookup: only the forward `parent:child` key is
    /// checked, never the reverse.
    pub fn annotation_for(
        &self,
        kind: AnnotationKind,
        parent: &str,
        child: &str,
    ) -> Option<&AnnotationRecord> {
        let map = match kind {
            AnnotationKind::Dependency => &self.dependencies,
            AnnotationKind::Impact => &self.impacts,
        };
        map.get(&pair_key(parent, child))
    }

    /// Inserts an asset under the active identifier strategy.
    pub fn insert_asset(&mut self, asset: AssetRecord) {
        let key = self.key.key_for(&asset).to_string();
        self.assets.insert(key, asset);
    }

    /// Inserts a link under the directional key the remote query produced.
    pub fn insert_link(&mut self, link: LinkRecord) {
        let key = pair_key(&link.left_id, &link.right_id);
        self.links.insert(key, link);
    }

    /// Inserts an annotation under its forward key.
    pub fn insert_annotation(&mut self, kind: AnnotationKind, record: AnnotationRecord) {
        let key = pair_key(&record.left_id, &record.right_id);
        match kind {
            AnnotationKind::Dependency => self.dependencies.insert(key, record),
            AnnotationKind::Impact => self.impacts.insert(key, record),
        };
    }

    /// Number of cached assets.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Number of cached links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ApiResult};
    use crate::model::ModuleInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves a fixed set of records with honest pagination.
    struct PagedApi {
        assets: Vec<AssetRecord>,
        links: Vec<LinkRecord>,
        dependencies: Vec<AnnotationRecord>,
        impacts: Vec<AnnotationRecord>,
        fail_links: bool,
        pages_served: Mutex<u64>,
    }

    impl PagedApi {
        fn new(assets: Vec<AssetRecord>) -> Self {
            Self {
                assets,
                links: Vec::new(),
                dependencies: Vec::new(),
                impacts: Vec::new(),
                fail_links: false,
                pages_served: Mutex::new(0),
            }
        }

        fn slice<T: Clone>(records: &[T], page: PageRequest) -> Vec<T> {
            records
                .iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl CmdbApi for PagedApi {
        async fn installed_modules(&self) -> ApiResult<Vec<ModuleInfo>> {
            Ok(Vec::new())
        }

        async fn asset_count(&self) -> ApiResult<u64> {
            Ok(self.assets.len() as u64)
        }

        async fn fetch_assets(&self, page: PageRequest) -> ApiResult<Vec<AssetRecord>> {
            *self.pages_served.lock().unwrap() += 1;
            Ok(Self::slice(&self.assets, page))
        }

        async fn link_count(&self) -> ApiResult<u64> {
            Ok(self.links.len() as u64)
        }

        async fn fetch_links(&self, page: PageRequest) -> ApiResult<Vec<LinkRecord>> {
            if self.fail_links {
                return Err(ApiError::ConnectionFailed("reset by peer".to_string()));
            }
            Ok(Self::slice(&self.links, page))
        }

        async fn annotation_count(&self, kind: AnnotationKind) -> ApiResult<u64> {
            let records = match kind {
                AnnotationKind::Dependency => &self.dependencies,
                AnnotationKind::Impact => &self.impacts,
            };
            Ok(records.len() as u64)
        }

        async fn fetch_annotations(
            &self,
            kind: AnnotationKind,
            page: PageRequest,
        ) -> ApiResult<Vec<AnnotationRecord>> {
            let records = match kind {
                AnnotationKind::Dependency => &self.dependencies,
                AnnotationKind::Impact => &self.impacts,
            };
            Ok(Self::slice(records, page))
        }

        async fn create_link(&self, _req: &crate::api::CreateLink) -> ApiResult<()> {
            unreachable!("cache loading never mutates")
        }

        async fn delete_link(&self, _req: &crate::api::DeleteLink) -> ApiResult<()> {
            unreachable!("cache loading never mutates")
        }

        async fn create_annotation(
            &self,
            _kind: AnnotationKind,
            _req: &crate::api::NewAnnotation,
        ) -> ApiResult<()> {
            unreachable!("cache loading never mutates")
        }

        async fn update_annotation(
            &self,
            _kind: AnnotationKind,
            _req: &crate::api::LabelUpdate,
        ) -> ApiResult<()> {
            unreachable!("cache loading never mutates")
        }

        async fn delete_annotation(&self, _kind: AnnotationKind, _id: &str) -> ApiResult<()> {
            unreachable!("cache loading never mutates")
        }
    }

    fn asset(id: &str, name: &str) -> AssetRecord {
        AssetRecord {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_zero_assets_is_fatal() {
        let api = PagedApi::new(Vec::new());
        let err = RemoteStateCache::load(&api, AssetKey::Name, false)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NoAssets));
    }

    #[tokio::test]
    async fn test_load_pages_through_collection() {
        let assets: Vec<AssetRecord> = (0..250)
            .map(|i| asset(&format!("AST{:03}", i), &format!("server-{}", i)))
            .collect();
        let api = PagedApi::new(assets);

        let cache = RemoteStateCache::load(&api, AssetKey::Name, false)
            .await
            .unwrap();
        assert_eq!(cache.asset_count(), 250);
        // 250 records at a page size of 100 means three fetches.
        assert_eq!(*api.pages_served.lock().unwrap(), 3);
        assert_eq!(cache.resolve_asset_id("server-249"), Some("AST249"));
    }

    #[tokio::test]
    async fn test_duplicate_key_last_write_wins() {
        let api = PagedApi::new(vec![asset("AST001", "web-01"), asset("AST002", "web-01")]);
        let cache = RemoteStateCache::load(&api, AssetKey::Name, false)
            .await
            .unwrap();
        assert_eq!(cache.asset_count(), 1);
        assert_eq!(cache.resolve_asset_id("web-01"), Some("AST002"));
    }

    #[tokio::test]
    async fn test_link_fetch_failure_aborts_load() {
        let mut api = PagedApi::new(vec![asset("AST001", "web-01")]);
        api.links.push(LinkRecord {
            id: "LNK1".to_string(),
            left_id: "AST001".to_string(),
            right_id: "AST002".to_string(),
        });
        api.fail_links = true;

        let err = RemoteStateCache::load(&api, AssetKey::Name, false)
            .await
            .unwrap_err();
        match err {
            SyncError::Cache { collection, .. } => assert_eq!(collection, "links"),
            other => panic!("expected cache error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_annotations_skipped_without_graph_module() {
        let mut api = PagedApi::new(vec![asset("AST001", "web-01")]);
        api.dependencies.push(AnnotationRecord {
            id: "DEP1".to_string(),
            left_id: "AST001".to_string(),
            right_id: "AST002".to_string(),
            label: "DependsOn".to_string(),
        });

        let cache = RemoteStateCache::load(&api, AssetKey::Name, false)
            .await
            .unwrap();
        assert!(cache
            .annotation_for(AnnotationKind::Dependency, "AST001", "AST002")
            .is_none());
    }

    #[test]
    fn test_link_lookup_is_symmetric() {
        let mut cache = RemoteStateCache::new(AssetKey::Name);
        cache.insert_link(LinkRecord {
            id: "LNK1".to_string(),
            left_id: "AST002".to_string(),
            right_id: "AST001".to_string(),
        });

        assert!(cache.link_exists("AST001", "AST002"));
        assert!(cache.link_exists("AST002", "AST001"));
        assert!(!cache.link_exists("AST001", "AST003"));
    }

    #[test]
    fn test_annotation_lookup_is_directional() {
        let mut cache = RemoteStateCache::new(AssetKey::Name);
        cache.insert_annotation(
            AnnotationKind::Impact,
            AnnotationRecord {
                id: "IMP1".to_string(),
                left_id: "AST001".to_string(),
                right_id: "AST002".to_string(),
                label: "HighImpact".to_string(),
            },
        );

        assert!(cache
            .annotation_for(AnnotationKind::Impact, "AST001", "AST002")
            .is_some());
        // The reverse direction must not match.
        assert!(cache
            .annotation_for(AnnotationKind::Impact, "AST002", "AST001")
            .is_none());
        // And the dependency map is untouched.
        assert!(cache
            .annotation_for(AnnotationKind::Dependency, "AST001", "AST002")
            .is_none());
    }
}
