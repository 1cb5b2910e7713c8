//! Storage helpers for the service layer
//!
//! File-backed persistence for deployments that run without a database.

pub mod json_store;
