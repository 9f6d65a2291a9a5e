//! Imperative shell of the ExploreSpeak provisioner.
//!
//! AWS adapters implement the provider traits from `explorespeak_core`;
//! reconcilers drive them to converge the account on the declared manifest.

pub mod archive;
pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod inmemory;
pub mod output;
pub mod prelude;
pub mod reconcile;

pub use error::{ProvisionError, Result};
