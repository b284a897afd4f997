//! # relsync-connectors
//!
//! Wire implementations of the `relsync-core` CMDB port: a REST client for
//! real instances and an in-memory mock for tests.

pub mod cmdb;
pub mod http;
pub mod testing;

pub use cmdb::mock::MockCmdb;
pub use cmdb::rest::CmdbRestClient;
pub use http::{EndpointConfig, HttpClient};
