//! CMDB connector implementations.

pub mod mock;
pub mod rest;
