//! In-memory CMDB for tests: honest pagination over fixture records and a
//! log of every mutation issued.

use async_trait::async_trait;
use relsync_core::{
    AnnotationKind, AnnotationRecord, ApiError, ApiResult, AssetRecord, CmdbApi, CreateLink,
    DeleteLink, LabelUpdate, LinkRecord, ModuleInfo, NewAnnotation, PageRequest, GRAPH_MODULE,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

/// Mock CMDB instance holding fixture state behind locks so the engine's
/// `&self` calls can mutate it.
#[derive(Default)]
pub struct MockCmdb {
    modules: Vec<ModuleInfo>,
    assets: Vec<AssetRecord>,
    links: RwLock<Vec<LinkRecord>>,
    dependencies: RwLock<Vec<AnnotationRecord>>,
    impacts: RwLock<Vec<AnnotationRecord>>,
    log: Mutex<Vec<String>>,
    next_id: AtomicU64,
    fail_mutations: bool,
}

impl MockCmdb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports the graph module as installed.
    pub fn with_graph_module(mut self) -> Self {
        self.modules.push(ModuleInfo {
            name: GRAPH_MODULE.to_string(),
            status: "installed".to_string(),
        });
        self
    }

    pub fn with_asset(mut self, asset: AssetRecord) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn with_link(self, link: LinkRecord) -> Self {
        self.links.write().unwrap().push(link);
        self
    }

    pub fn with_annotation(self, kind: AnnotationKind, record: AnnotationRecord) -> Self {
        self.store(kind).write().unwrap().push(record);
        self
    }

    /// Makes every mutating call fail with a remote error.
    pub fn failing_mutations(mut self) -> Self {
        self.fail_mutations = true;
        self
    }

    /// Every mutation issued so far, in call order.
    pub fn mutation_log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn links(&self) -> Vec<LinkRecord> {
        self.links.read().unwrap().clone()
    }

    pub fn annotations(&self, kind: AnnotationKind) -> Vec<AnnotationRecord> {
        self.store(kind).read().unwrap().clone()
    }

    fn store(&self, kind: AnnotationKind) -> &RwLock<Vec<AnnotationRecord>> {
        match kind {
            AnnotationKind::Dependency => &self.dependencies,
            AnnotationKind::Impact => &self.impacts,
        }
    }

    fn record(&self, entry: String) -> ApiResult<()> {
        self.log.lock().unwrap().push(entry);
        if self.fail_mutations {
            return Err(ApiError::Remote("mutation rejected".to_string()));
        }
        Ok(())
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}{:04}", prefix, n)
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
impl CmdbApi for MockCmdb {
    async fn installed_modules(&self) -> ApiResult<Vec<ModuleInfo>> {
        Ok(self.modules.clone())
    }

    async fn asset_count(&self) -> ApiResult<u64> {
        Ok(self.assets.len() as u64)
    }

    async fn fetch_assets(&self, page: PageRequest) -> ApiResult<Vec<AssetRecord>> {
        Ok(Self::slice(&self.assets, page))
    }

    async fn link_count(&self) -> ApiResult<u64> {
        Ok(self.links.read().unwrap().len() as u64)
    }

    async fn fetch_links(&self, page: PageRequest) -> ApiResult<Vec<LinkRecord>> {
        Ok(Self::slice(&self.links.read().unwrap(), page))
    }

    async fn annotation_count(&self, kind: AnnotationKind) -> ApiResult<u64> {
        Ok(self.store(kind).read().unwrap().len() as u64)
    }

    async fn fetch_annotations(
        &self,
        kind: AnnotationKind,
        page: PageRequest,
    ) -> ApiResult<Vec<AnnotationRecord>> {
        Ok(Self::slice(&self.store(kind).read().unwrap(), page))
    }

    async fn create_link(&self, req: &CreateLink) -> ApiResult<()> {
        self.record(format!("create_link {}:{}", req.left, req.right))?;
        self.links.write().unwrap().push(LinkRecord {
            id: self.fresh_id("LNK"),
            left_id: req.left.clone(),
            right_id: req.right.clone(),
        });
        Ok(())
    }

    async fn delete_link(&self, req: &DeleteLink) -> ApiResult<()> {
        self.record(format!("delete_link {}:{}", req.left, req.right))?;
        self.links.write().unwrap().retain(|l| {
            !((l.left_id == req.left && l.right_id == req.right)
                || (l.left_id == req.right && l.right_id == req.left))
        });
        Ok(())
    }

    async fn create_annotation(&self, kind: AnnotationKind, req: &NewAnnotation) -> ApiResult<()> {
        self.record(format!(
            "create_{} {}:{} {}",
            kind, req.left, req.right, req.label
        ))?;
        self.store(kind).write().unwrap().push(AnnotationRecord {
            id: self.fresh_id("ANN"),
            left_id: req.left.clone(),
            right_id: req.right.clone(),
            label: req.label.clone(),
        });
        Ok(())
    }

    async fn update_annotation(&self, kind: AnnotationKind, req: &LabelUpdate) -> ApiResult<()> {
        self.record(format!("update_{} {} {}", kind, req.id, req.label))?;
        let mut records = self.store(kind).write().unwrap();
        match records.iter_mut().find(|r| r.id == req.id) {
            Some(record) => {
                record.label = req.label.clone();
                Ok(())
            }
            None => Err(ApiError::NotFound(req.id.clone())),
        }
    }

    async fn delete_annotation(&self, kind: AnnotationKind, id: &str) -> ApiResult<()> {
        self.record(format!("delete_{} {}", kind, id))?;
        let mut records = self.store(kind).write().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(ApiError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn test_pagination_slices_fixtures() {
        let mut mock = MockCmdb::new();
        for i in 0..5 {
            mock = mock.with_asset(testing::asset(
                &format!("AST{:03}", i),
                &format!("host-{}", i),
            ));
        }

        let page = mock
            .fetch_assets(PageRequest {
                offset: 3,
                limit: 2,
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "AST003");
    }

    #[tokio::test]
    async fn test_mutations_are_logged_and_applied() {
        let mock = MockCmdb::new();
        mock.create_link(&CreateLink {
            left: "AST001".to_string(),
            right: "AST002".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(mock.mutation_log(), vec!["create_link AST001:AST002"]);
        assert_eq!(mock.link_count().await.unwrap(), 1);

        mock.delete_link(&DeleteLink {
            // Reversed order still deletes the stored link.
            left: "AST002".to_string(),
            right: "AST001".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(mock.link_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_unknown_annotation_is_not_found() {
        let mock = MockCmdb::new();
        let err = mock
            .update_annotation(
                AnnotationKind::Dependency,
                &LabelUpdate {
                    id: "DEP999".to_string(),
                    label: "DependsOn".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_mutations_still_log() {
        let mock = MockCmdb::new().failing_mutations();
        let result = mock
            .create_link(&CreateLink {
                left: "AST001".to_string(),
                right: "AST002".to_string(),
            })
            .await;
        assert!(result.is_err());
        assert_eq!(mock.mutation_log().len(), 1);
        assert_eq!(mock.link_count().await.unwrap(), 0);
    }
}
