//! Functional core of the ExploreSpeak provisioner.
//!
//! Everything in this crate is pure: declared resources, manifest
//! validation, plan calculation and the provider traits the imperative
//! shell implements. No module here performs I/O.

pub mod manifest;
pub mod planning;
pub mod provider;
pub mod report;
