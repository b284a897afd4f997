//! Fixture constructors shared by unit and integration tests.

use crate::http::EndpointConfig;
use relsync_core::{AnnotationRecord, AssetRecord, LinkRecord};

/// An asset with the given ID and name, other fields empty.
pub fn asset(id: &str, name: &str) -> AssetRecord {
    AssetRecord {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

/// A link between two asset IDs.
pub fn link(id: &str, left: &str, right: &str) -> LinkRecord {
    LinkRecord {
        id: id.to_string(),
        left_id: left.to_string(),
        right_id: right.to_string(),
    }
}

/// A labeled annotation between two asset IDs.
pub fn annotation(id: &str, left: &str, right: &str, label: &str) -> AnnotationRecord {
    AnnotationRecord {
        id: id.to_string(),
        left_id: left.to_string(),
        right_id: right.to_string(),
        label: label.to_string(),
    }
}

/// Endpoint settings pointing at a placeholder instance.
pub fn endpoint_config() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://cmdb.example.com".to_string(),
        api_key: "test-key".to_string(),
        ..Default::default()
    }
}
