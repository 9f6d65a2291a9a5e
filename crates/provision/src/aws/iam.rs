//! Execution role lookup.

use async_trait::async_trait;
use explorespeak_core::provider::{Result, RoleProvider};

use super::client::AwsCloud;
use super::error::map_sdk_error;

#[async_trait]
impl RoleProvider for AwsCloud {
    async fn role_arn(&self, role_name: &str) -> Result<Option<String>> {
        match self.iam.get_role().role_name(role_name).send().await {
            Ok(response) => Ok(response.role().map(|role| role.arn().to_string())),
            Err(err) => {
                let err = map_sdk_error(err, "Role", role_name);
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }
}
