//! Data model for remote CMDB relationship records.
//!
//! Assets are the canonical identity records; links are undirected existence
//! relationships between two assets; dependencies and impacts are directed,
//! labeled annotations on an asset pair. Dependencies and impacts share one
//! record shape ([`AnnotationRecord`]) selected by [`AnnotationKind`]; only
//! their label vocabularies and remote collections differ.

use serde::{Deserialize, Serialize};

/// Name of the optional remote module that provides dependency/impact
/// records. When it is not installed, only plain links are reconciled.
pub const GRAPH_MODULE: &str = "relationship-graph";

/// A canonical asset identity record from the remote service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Canonical asset ID. All relationship cache keys use this value.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Asset tag.
    #[serde(default)]
    pub tag: String,
}

/// Which asset field source rows identify assets by.
///
/// Fixed at cache-build time; lookup-key uniqueness is assumed, not enforced.
/// A duplicate key silently overwrites the earlier cache entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKey {
    /// Match on the canonical asset ID.
    PrimaryKey,
    /// Match on the description field.
    Description,
    /// Match on the display name.
    #[default]
    Name,
    /// Match on the asset tag.
    Tag,
}

impl AssetKey {
    /// Returns the cache key for an asset under this strategy.
    pub fn key_for<'a>(&self, asset: &'a AssetRecord) -> &'a str {
        match self {
            AssetKey::PrimaryKey => &asset.id,
            AssetKey::Description => &asset.description,
            AssetKey::Name => &asset.name,
            AssetKey::Tag => &asset.tag,
        }
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKey::PrimaryKey => write!(f, "primary_key"),
            AssetKey::Description => write!(f, "description"),
            AssetKey::Name => write!(f, "name"),
            AssetKey::Tag => write!(f, "tag"),
        }
    }
}

/// An undirected link between two assets.
///
/// `left_id`/`right_id` record the order the remote query returned; existence
/// is symmetric, so a link stored as `B:A` satisfies a lookup for `(A, B)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Remote record ID.
    pub id: String,
    /// Left asset ID.
    pub left_id: String,
    /// Right asset ID.
    pub right_id: String,
}

/// A directed, labeled annotation (dependency or impact) between two assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Remote record ID.
    pub id: String,
    /// Left (parent) asset ID.
    pub left_id: String,
    /// Right (child) asset ID.
    pub right_id: String,
    /// Dependency or impact label.
    pub label: String,
}

/// Selects the dependency or the impact collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Dependency,
    Impact,
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationKind::Dependency => write!(f, "dependency"),
            AnnotationKind::Impact => write!(f, "impact"),
        }
    }
}

/// A remote application module and its installation status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Module name.
    pub name: String,
    /// Installation status, `"installed"` when active.
    pub status: String,
}

/// Returns true when the module list reports the graph module as installed.
pub fn graph_module_installed(modules: &[ModuleInfo]) -> bool {
    modules
        .iter()
        .any(|m| m.name == GRAPH_MODULE && m.status == "installed")
}

/// Canonical cache key for a directed asset pair.
///
/// Always built from remote canonical asset IDs, never source-side names.
pub fn pair_key(left: &str, right: &str) -> String {
    format!("{}:{}", left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_asset() -> AssetRecord {
        AssetRecord {
            id: "AST001".to_string(),
            name: "Server1".to_string(),
            description: "Primary web server".to_string(),
            tag: "WEB-01".to_string(),
        }
    }

    #[test]
    fn test_key_strategy_selects_field() {
        let asset = sample_asset();
        assert_eq!(AssetKey::PrimaryKey.key_for(&asset), "AST001");
        assert_eq!(AssetKey::Name.key_for(&asset), "Server1");
        assert_eq!(AssetKey::Description.key_for(&asset), "Primary web server");
        assert_eq!(AssetKey::Tag.key_for(&asset), "WEB-01");
    }

    #[test]
    fn test_key_strategy_default_is_name() {
        assert_eq!(AssetKey::default(), AssetKey::Name);
    }

    #[test]
    fn test_key_strategy_serde() {
        let key: AssetKey = serde_json::from_str("\"primary_key\"").unwrap();
        assert_eq!(key, AssetKey::PrimaryKey);
        assert_eq!(serde_json::to_string(&AssetKey::Tag).unwrap(), "\"tag\"");
    }

    #[test]
    fn test_pair_key_is_directional() {
        assert_eq!(pair_key("AST001", "AST002"), "AST001:AST002");
        assert_ne!(pair_key("AST001", "AST002"), pair_key("AST002", "AST001"));
    }

    #[test]
    fn test_graph_module_detection() {
        let modules = vec![
            ModuleInfo {
                name: "service-desk".to_string(),
                status: "installed".to_string(),
            },
            ModuleInfo {
                name: GRAPH_MODULE.to_string(),
                status: "installed".to_string(),
            },
        ];
        assert!(graph_module_installed(&modules));

        let not_installed = vec![ModuleInfo {
            name: GRAPH_MODULE.to_string(),
            status: "available".to_string(),
        }];
        assert!(!graph_module_installed(&not_installed));
        assert!(!graph_module_installed(&[]));
    }

    #[test]
    fn test_annotation_kind_display() {
        assert_eq!(AnnotationKind::Dependency.to_string(), "dependency");
        assert_eq!(AnnotationKind::Impact.to_string(), "impact");
    }
}
