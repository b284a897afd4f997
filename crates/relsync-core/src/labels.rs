//! Translation of free-text source labels into the remote controlled
//! vocabulary.

use crate::model::AnnotationKind;
use std::collections::HashMap;
use tracing::warn;

/// Configured dependency and impact label mappings.
///
/// An unmapped value passes through verbatim with a warning; unmapped labels
/// are expected source data, never an error.
#[derive(Debug, Clone, Default)]
pub struct LabelMaps {
    dependency: HashMap<String, String>,
    impact: HashMap<String, String>,
}

impl LabelMaps {
    pub fn new(dependency: HashMap<String, String>, impact: HashMap<String, String>) -> Self {
        Self { dependency, impact }
    }

    /// Translates a raw source label for the given annotation kind.
    pub fn translate(&self, kind: AnnotationKind, raw: &str) -> String {
        let table = match kind {
            AnnotationKind::Dependency => &self.dependency,
            AnnotationKind::Impact => &self.impact,
        };
        match table.get(raw) {
            Some(mapped) => mapped.clone(),
            None => {
                warn!(%kind, raw, "label not found in mapping, using raw value");
                raw.to_string()
            }
        }
    }
}
