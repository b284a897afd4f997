//! REST implementation of the CMDB port.
//!
//! Collection reads are scoped to asset-to-asset relations with
//! `scope=asset`; the remote service also stores relations to other entity
//! kinds, which this tool never touches.

use crate::http::{EndpointConfig, HttpClient};
use async_trait::async_trait;
use relsync_core::{
    AnnotationKind, AnnotationRecord, ApiResult, AssetRecord, CmdbApi, CreateLink, DeleteLink,
    LabelUpdate, LinkRecord, ModuleInfo, NewAnnotation, PageRequest,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct RowsResponse<T> {
    rows: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ModulesResponse {
    modules: Vec<ModuleInfo>,
}

fn annotation_path(kind: AnnotationKind) -> &'static str {
    match kind {
        AnnotationKind::Dependency => "api/v1/dependencies",
        AnnotationKind::Impact => "api/v1/impacts",
    }
}

/// CMDB REST API client.
pub struct CmdbRestClient {
    http: HttpClient,
}

impl CmdbRestClient {
    pub fn new(config: EndpointConfig) -> ApiResult<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }

    async fn count(&self, path: &str) -> ApiResult<u64> {
        let response: CountResponse = self.http.get_json(path).await?;
        Ok(response.count)
    }

    async fn page<T: DeserializeOwned>(
        &self,
        collection: &str,
        page: PageRequest,
        scoped: bool,
    ) -> ApiResult<Vec<T>> {
        let scope = if scoped { "scope=asset&" } else { "" };
        let path = format!(
            "{}?{}offset={}&limit={}",
            collection, scope, page.offset, page.limit
        );
        debug!(collection, offset = page.offset, "fetching page");
        let response: RowsResponse<T> = self.http.get_json(&path).await?;
        Ok(response.rows)
    }
}

#[async_trait]
impl CmdbApi for CmdbRestClient {
    async fn installed_modules(&self) -> ApiResult<Vec<ModuleInfo>> {
        let response: ModulesResponse = self.http.get_json("api/v1/modules").await?;
        Ok(response.modules)
    }

    async fn asset_count(&self) -> ApiResult<u64> {
        self.count("api/v1/assets/count").await
    }

    async fn fetch_assets(&self, page: PageRequest) -> ApiResult<Vec<AssetRecord>> {
        self.page("api/v1/assets", page, false).await
    }

    async fn link_count(&self) -> ApiResult<u64> {
        self.count("api/v1/links/count?scope=asset").await
    }

    async fn fetch_links(&self, page: PageRequest) -> ApiResult<Vec<LinkRecord>> {
        self.page("api/v1/links", page, true).await
    }

    async fn annotation_count(&self, kind: AnnotationKind) -> ApiResult<u64> {
        let path = format!("{}/count?scope=asset", annotation_path(kind));
        self.count(&path).await
    }

    async fn fetch_annotations(
        &self,
        kind: AnnotationKind,
        page: PageRequest,
    ) -> ApiResult<Vec<AnnotationRecord>> {
        self.page(annotation_path(kind), page, true).await
    }

    async fn create_link(&self, req: &CreateLink) -> ApiResult<()> {
        self.http.post("api/v1/links", req).await
    }

    async fn delete_link(&self, req: &DeleteLink) -> ApiResult<()> {
        // Links are addressed by their endpoint pair, not a record ID; the
        // service deletes whichever direction the link is stored under.
        let path = format!(
            "api/v1/links?left={}&right={}",
            urlencoding::encode(&req.left),
            urlencoding::encode(&req.right)
        );
        self.http.delete(&path).await
    }

    async fn create_annotation(&self, kind: AnnotationKind, req: &NewAnnotation) -> ApiResult<()> {
        self.http.post(annotation_path(kind), req).await
    }

    async fn update_annotation(&self, kind: AnnotationKind, req: &LabelUpdate) -> ApiResult<()> {
        let path = format!(
            "{}/{}",
            annotation_path(kind),
            urlencoding::encode(&req.id)
        );
        self.http
            .patch(&path, &serde_json::json!({ "label": req.label }))
            .await
    }

    async fn delete_annotation(&self, kind: AnnotationKind, id: &str) -> ApiResult<()> {
        let path = format!("{}/{}", annotation_path(kind), urlencoding::encode(id));
        self.http.delete(&path).await
    }
}
