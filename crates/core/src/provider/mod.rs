//! Seams between the reconcilers and the cloud provider.

mod error;
mod traits;
mod types;

pub use error::{ProviderError, Result};
pub use traits::{CloudProvider, FunctionProvider, GatewayProvider, RoleProvider, TableProvider};
pub use types::{
    FunctionState, FunctionStatus, GatewayResource, IndexState, IndexStatus, Invocation,
    InvokePermission, RestApi, TableState, TableStatus, UpdateStatus,
};
