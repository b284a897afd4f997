//! Row-by-row reconciliation of source relationships against the cached
//! remote state.
//!
//! Rows are processed sequentially; one row's remote calls all complete
//! before the next row starts, and one row's outcome never affects another
//! row's decisions. All mutations funnel through [`SyncSession::apply`], which
//! is the single dry-run gate.

use crate::api::{CmdbApi, CreateLink, DeleteLink, LabelUpdate, NewAnnotation};
use crate::cache::RemoteStateCache;
use crate::counters::Counters;
use crate::error::ApiResult;
use crate::labels::LabelMaps;
use crate::model::AnnotationKind;
use crate::row::{RowFieldMap, SourceRow};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Run-wide switches fixed before any row is processed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Whether the remote graph module is installed. When false, dependency
    /// and impact handling is skipped silently.
    pub graph_module: bool,
    /// Log fully-formed requests and report synthetic success instead of
    /// contacting the remote service.
    pub dry_run: bool,
}

/// A fully-formed remote mutation, ready to issue or to log verbatim.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    CreateLink(CreateLink),
    DeleteLink(DeleteLink),
    CreateAnnotation {
        kind: AnnotationKind,
        #[serde(flatten)]
        req: NewAnnotation,
    },
    UpdateAnnotation {
        kind: AnnotationKind,
        #[serde(flatten)]
        req: LabelUpdate,
    },
    DeleteAnnotation {
        kind: AnnotationKind,
        id: String,
    },
}

/// Outcome of one dependency or impact step.
enum AnnotationOutcome {
    Created,
    Updated,
    Skipped,
    CreateFailed,
    UpdateFailed,
    NotConfigured,
}

/// One reconciliation run: the remote port, the state cache built at startup,
/// the label mappings, and the accumulated counters.
pub struct SyncSession<'a> {
    api: &'a dyn CmdbApi,
    cache: RemoteStateCache,
    labels: LabelMaps,
    options: SyncOptions,
    counters: Counters,
}

impl<'a> SyncSession<'a> {
    pub fn new(
        api: &'a dyn CmdbApi,
        cache: RemoteStateCache,
        labels: LabelMaps,
        options: SyncOptions,
    ) -> Self {
        Self {
            api,
            cache,
            labels,
            options,
            counters: Counters::default(),
        }
    }

    /// Counters accumulated so far.
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Consumes the session, yielding the final counters.
    pub fn into_counters(self) -> Counters {
        self.counters
    }

    /// Issues a mutation, or logs it and reports synthetic success in
    /// dry-run mode. Every mutating call in this module goes through here.
    async fn apply(&self, mutation: Mutation) -> ApiResult<()> {
        if self.options.dry_run {
            let request = serde_json::to_string(&mutation).unwrap_or_default();
            info!("[DRYRUN] {}", request);
            return Ok(());
        }
        match mutation {
            Mutation::CreateLink(req) => self.api.create_link(&req).await,
            Mutation::DeleteLink(req) => self.api.delete_link(&req).await,
            Mutation::CreateAnnotation { kind, req } => {
                self.api.create_annotation(kind, &req).await
            }
            Mutation::UpdateAnnotation { kind, req } => {
                self.api.update_annotation(kind, &req).await
            }
            Mutation::DeleteAnnotation { kind, id } => {
                self.api.delete_annotation(kind, &id).await
            }
        }
    }

    /// Creation/update pass over the primary source query.
    pub async fn process_relationships(&mut self, rows: &[SourceRow], fields: &RowFieldMap) {
        info!(rows = rows.len(), "processing relationship rows");
        for row in rows {
            let Some((parent_id, child_id)) = self.resolve_pair(row, fields) else {
                continue;
            };

            // Link step. A create failure still lets the dependency and
            // impact steps run for this row.
            if self.cache.link_exists(&parent_id, &child_id) {
                debug!(parent = %parent_id, child = %child_id, "link already exists");
                self.counters.links_skipped += 1;
            } else {
                let req = CreateLink {
                    left: parent_id.clone(),
                    right: child_id.clone(),
                };
                match self.apply(Mutation::CreateLink(req)).await {
                    Ok(()) => {
                        info!(parent = %parent_id, child = %child_id, "link created");
                        self.counters.links_created += 1;
                    }
                    Err(e) => {
                        error!(parent = %parent_id, child = %child_id, error = %e, "link creation failed");
                        self.counters.links_failed += 1;
                    }
                }
            }

            if !self.options.graph_module {
                continue;
            }

            // Dependency step. A create failure terminates the row before
            // the impact step; every other outcome continues.
            let raw = fields.get(row, &fields.dependency);
            let outcome = self
                .annotate(AnnotationKind::Dependency, &parent_id, &child_id, raw)
                .await;
            let created_failed = matches!(outcome, AnnotationOutcome::CreateFailed);
            self.note_annotation(AnnotationKind::Dependency, outcome);
            if created_failed {
                continue;
            }

            // Impact step, independently counted.
            let raw = fields.get(row, &fields.impact);
            let outcome = self
                .annotate(AnnotationKind::Impact, &parent_id, &child_id, raw)
                .await;
            self.note_annotation(AnnotationKind::Impact, outcome);
        }
    }

    /// Removal pass over the secondary source query.
    pub async fn process_removals(&mut self, rows: &[SourceRow], fields: &RowFieldMap) {
        info!(rows = rows.len(), "processing removal rows");
        for row in rows {
            let Some((parent_id, child_id)) = self.resolve_pair(row, fields) else {
                continue;
            };

            // Link step: nothing cached in either direction means nothing
            // to remove.
            if self.cache.link_exists(&parent_id, &child_id) {
                let req = DeleteLink {
                    left: parent_id.clone(),
                    right: child_id.clone(),
                };
                match self.apply(Mutation::DeleteLink(req)).await {
                    Ok(()) => {
                        info!(parent = %parent_id, child = %child_id, "link removed");
                        self.counters.remove_links_success += 1;
                    }
                    Err(e) => {
                        error!(parent = %parent_id, child = %child_id, error = %e, "link removal failed");
                        self.counters.remove_links_failed += 1;
                    }
                }
            } else {
                debug!(parent = %parent_id, child = %child_id, "no link to remove");
                self.counters.remove_links_skipped += 1;
            }

            if !self.options.graph_module {
                continue;
            }

            let raw = fields.get(row, &fields.dependency);
            self.remove_annotation(AnnotationKind::Dependency, &parent_id, &child_id, raw)
                .await;

            let raw = fields.get(row, &fields.impact);
            self.remove_annotation(AnnotationKind::Impact, &parent_id, &child_id, raw)
                .await;
        }
    }

    /// Resolves both row identifiers, or skips the whole row with a warning.
    fn resolve_pair(&self, row: &SourceRow, fields: &RowFieldMap) -> Option<(String, String)> {
        let parent_raw = fields.get(row, &fields.parent);
        let child_raw = fields.get(row, &fields.child);

        let Some(parent_id) = self.cache.resolve_asset_id(parent_raw) else {
            warn!(identifier = parent_raw, "parent asset not found on the remote instance, skipping row");
            return None;
        };
        let Some(child_id) = self.cache.resolve_asset_id(child_raw) else {
            warn!(identifier = child_raw, "child asset not found on the remote instance, skipping row");
            return None;
        };
        Some((parent_id.to_string(), child_id.to_string()))
    }

    /// One create-pass dependency or impact step.
    async fn annotate(
        &self,
        kind: AnnotationKind,
        parent_id: &str,
        child_id: &str,
        raw: &str,
    ) -> AnnotationOutcome {
        if raw.is_empty() {
            return AnnotationOutcome::NotConfigured;
        }
        let label = self.labels.translate(kind, raw);

        match self.cache.annotation_for(kind, parent_id, child_id) {
            None => {
                let req = NewAnnotation {
                    left: parent_id.to_string(),
                    right: child_id.to_string(),
                    label: label.clone(),
                };
                match self.apply(Mutation::CreateAnnotation { kind, req }).await {
                    Ok(()) => {
                        info!(%kind, parent = %parent_id, child = %child_id, %label, "annotation created");
                        AnnotationOutcome::Created
                    }
                    Err(e) => {
                        error!(%kind, parent = %parent_id, child = %child_id, error = %e, "annotation creation failed");
                        AnnotationOutcome::CreateFailed
                    }
                }
            }
            Some(existing) if existing.label == label => {
                debug!(%kind, parent = %parent_id, child = %child_id, "annotation already up to date");
                AnnotationOutcome::Skipped
            }
            Some(existing) => {
                let req = LabelUpdate {
                    id: existing.id.clone(),
                    label: label.clone(),
                };
                match self.apply(Mutation::UpdateAnnotation { kind, req }).await {
                    Ok(()) => {
                        info!(%kind, parent = %parent_id, child = %child_id, %label, "annotation label updated");
                        AnnotationOutcome::Updated
                    }
                    Err(e) => {
                        error!(%kind, parent = %parent_id, child = %child_id, error = %e, "annotation update failed");
                        AnnotationOutcome::UpdateFailed
                    }
                }
            }
        }
    }

    /// One removal-pass dependency or impact step.
    ///
    /// Deletion is refused when the cached label differs from the translated
    /// source label: the cached record then describes a different typed edge
    /// than the one requested for removal.
    async fn remove_annotation(
        &mut self,
        kind: AnnotationKind,
        parent_id: &str,
        child_id: &str,
        raw: &str,
    ) {
        if raw.is_empty() {
            return;
        }
        let label = self.labels.translate(kind, raw);

        let Some(existing) = self.cache.annotation_for(kind, parent_id, child_id) else {
            debug!(%kind, parent = %parent_id, child = %child_id, "no annotation to remove");
            self.note_removal(kind, RemovalOutcome::Skipped);
            return;
        };
        if existing.label != label {
            warn!(
                %kind,
                parent = %parent_id,
                child = %child_id,
                cached = %existing.label,
                requested = %label,
                "cached label does not match removal request, refusing to delete"
            );
            self.note_removal(kind, RemovalOutcome::Skipped);
            return;
        }

        let id = existing.id.clone();
        let outcome = match self.apply(Mutation::DeleteAnnotation { kind, id }).await {
            Ok(()) => {
                info!(%kind, parent = %parent_id, child = %child_id, "annotation removed");
                RemovalOutcome::Success
            }
            Err(e) => {
                error!(%kind, parent = %parent_id, child = %child_id, error = %e, "annotation removal failed");
                RemovalOutcome::Failed
            }
        };
        self.note_removal(kind, outcome);
    }

    fn note_annotation(&mut self, kind: AnnotationKind, outcome: AnnotationOutcome) {
        let c = &mut self.counters;
        match (kind, outcome) {
            (_, AnnotationOutcome::NotConfigured) => {}
            (AnnotationKind::Dependency, AnnotationOutcome::Created) => c.deps_created += 1,
            (AnnotationKind::Dependency, AnnotationOutcome::Updated) => c.deps_updated += 1,
            (AnnotationKind::Dependency, AnnotationOutcome::Skipped) => c.deps_skipped += 1,
            (AnnotationKind::Dependency, AnnotationOutcome::CreateFailed) => c.deps_failed += 1,
            (AnnotationKind::Dependency, AnnotationOutcome::UpdateFailed) => {
                c.deps_update_failed += 1
            }
            (AnnotationKind::Impact, AnnotationOutcome::Created) => c.imps_created += 1,
            (AnnotationKind::Impact, AnnotationOutcome::Updated) => c.imps_updated += 1,
            (AnnotationKind::Impact, AnnotationOutcome::Skipped) => c.imps_skipped += 1,
            (AnnotationKind::Impact, AnnotationOutcome::CreateFailed) => c.imps_failed += 1,
            (AnnotationKind::Impact, AnnotationOutcome::UpdateFailed) => c.imps_update_failed += 1,
        }
    }

    fn note_removal(&mut self, kind: AnnotationKind, outcome: RemovalOutcome) {
        let c = &mut self.counters;
        match (kind, outcome) {
            (AnnotationKind::Dependency, RemovalOutcome::Success) => c.remove_deps_success += 1,
            (AnnotationKind::Dependency, RemovalOutcome::Skipped) => c.remove_deps_skipped += 1,
            (AnnotationKind::Dependency, RemovalOutcome::Failed) => c.remove_deps_failed += 1,
            (AnnotationKind::Impact, RemovalOutcome::Success) => c.remove_imps_success += 1,
            (AnnotationKind::Impact, RemovalOutcome::Skipped) => c.remove_imps_skipped += 1,
            (AnnotationKind::Impact, RemovalOutcome::Failed) => c.remove_imps_failed += 1,
        }
    }
}

enum RemovalOutcome {
    Success,
    Skipped,
    Failed,
}
