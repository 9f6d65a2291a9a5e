//! Lambda function operations.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{
    Environment, FunctionCode, FunctionConfiguration, LastUpdateStatus, Runtime, State,
};
use explorespeak_core::manifest::FunctionSpec;
use explorespeak_core::provider::{
    FunctionProvider, FunctionState, FunctionStatus, Invocation, InvokePermission, ProviderError,
    Result, UpdateStatus,
};

use super::client::AwsCloud;
use super::error::{map_create_error, map_sdk_error};

const KIND: &str = "Function";
const GATEWAY_PRINCIPAL: &str = "apigateway.amazonaws.com";

#[async_trait]
impl FunctionProvider for AwsCloud {
    async fn get_function(&self, name: &str) -> Result<Option<FunctionState>> {
        let response = match self.lambda.get_function().function_name(name).send().await {
            Ok(response) => response,
            Err(err) => {
                let err = map_sdk_error(err, KIND, name);
                return if err.is_not_found() { Ok(None) } else { Err(err) };
            }
        };

        let configuration = response.configuration().ok_or_else(|| {
            ProviderError::Request(format!("GetFunction returned no configuration for '{name}'"))
        })?;
        Ok(Some(to_function_state(name, configuration)))
    }

    async fn create_function(
        &self,
        spec: &FunctionSpec,
        role_arn: &str,
        archive: &[u8],
    ) -> Result<FunctionState> {
        self.lambda
            .create_function()
            .function_name(&spec.name)
            .runtime(Runtime::from(spec.runtime.as_str()))
            .role(role_arn)
            .handler(&spec.handler)
            .description(&spec.description)
            .memory_size(spec.memory_mb)
            .timeout(spec.timeout_secs)
            .environment(environment(spec))
            .code(FunctionCode::builder().zip_file(Blob::new(archive)).build())
            .send()
            .await
            .map_err(|e| map_create_error(e, KIND, &spec.name))?;

        self.get_function(&spec.name)
            .await?
            .ok_or_else(|| ProviderError::NotFound {
                kind: KIND,
                id: spec.name.clone(),
            })
    }

    async fn update_function_code(&self, name: &str, archive: &[u8]) -> Result<()> {
        self.lambda
            .update_function_code()
            .function_name(name)
            .zip_file(Blob::new(archive))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, KIND, name))?;
        Ok(())
    }

    async fn update_function_configuration(&self, spec: &FunctionSpec) -> Result<()> {
        self.lambda
            .update_function_configuration()
            .function_name(&spec.name)
            .runtime(Runtime::from(spec.runtime.as_str()))
            .handler(&spec.handler)
            .description(&spec.description)
            .memory_size(spec.memory_mb)
            .timeout(spec.timeout_secs)
            .environment(environment(spec))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, KIND, &spec.name))?;
        Ok(())
    }

    async fn invoke(&self, name: &str, payload: &[u8]) -> Result<Invocation> {
        let response = self
            .lambda
            .invoke()
            .function_name(name)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, KIND, name))?;

        Ok(Invocation {
            status_code: response.status_code(),
            function_error: response.function_error().map(str::to_string),
        })
    }

    async fn add_permission(&self, permission: &InvokePermission) -> Result<()> {
        self.lambda
            .add_permission()
            .function_name(&permission.function_name)
            .statement_id(&permission.statement_id)
            .action("lambda:InvokeFunction")
            .principal(GATEWAY_PRINCIPAL)
            .source_arn(&permission.source_arn)
            .send()
            .await
            .map_err(|e| map_create_error(e, "Permission", &permission.statement_id))?;
        Ok(())
    }
}

fn environment(spec: &FunctionSpec) -> Environment {
    let variables: HashMap<String, String> = spec
        .environment
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Environment::builder().set_variables(Some(variables)).build()
}

fn to_function_state(name: &str, configuration: &FunctionConfiguration) -> FunctionState {
    FunctionState {
        name: configuration.function_name().unwrap_or(name).to_string(),
        arn: configuration.function_arn().unwrap_or_default().to_string(),
        role_arn: configuration.role().unwrap_or_default().to_string(),
        runtime: configuration
            .runtime()
            .map(|r| r.as_str().to_string())
            .unwrap_or_default(),
        handler: configuration.handler().unwrap_or_default().to_string(),
        description: configuration.description().unwrap_or_default().to_string(),
        environment: configuration
            .environment()
            .and_then(|env| env.variables())
            .map(|vars| vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default(),
        memory_mb: configuration.memory_size().unwrap_or_default(),
        timeout_secs: configuration.timeout().unwrap_or_default(),
        status: match configuration.state() {
            Some(State::Pending) => FunctionStatus::Pending,
            Some(State::Inactive) => FunctionStatus::Inactive,
            Some(State::Failed) => FunctionStatus::Failed,
            _ => FunctionStatus::Active,
        },
        last_update: match configuration.last_update_status() {
            Some(LastUpdateStatus::InProgress) => UpdateStatus::InProgress,
            Some(LastUpdateStatus::Failed) => UpdateStatus::Failed,
            _ => UpdateStatus::Successful,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_lambda::types::EnvironmentResponse;

    #[test]
    fn test_configuration_maps_to_state() {
        let configuration = FunctionConfiguration::builder()
            .function_name("explorespeak-srs")
            .function_arn("arn:aws:lambda:us-east-1:123456789012:function:explorespeak-srs")
            .role("arn:aws:iam::123456789012:role/explorespeak-lambda-execution-role")
            .runtime(Runtime::Nodejs18x)
            .handler("index.handler")
            .memory_size(256)
            .timeout(30)
            .environment(
                EnvironmentResponse::builder()
                    .variables("REVIEWS_TABLE", "explorespeak-srs-reviews")
                    .build(),
            )
            .state(State::Pending)
            .last_update_status(LastUpdateStatus::InProgress)
            .build();

        let state = to_function_state("explorespeak-srs", &configuration);

        assert_eq!(state.runtime, "nodejs18.x");
        assert_eq!(state.memory_mb, 256);
        assert_eq!(
            state.environment.get("REVIEWS_TABLE").map(String::as_str),
            Some("explorespeak-srs-reviews")
        );
        assert_eq!(state.status, FunctionStatus::Pending);
        assert_eq!(state.last_update, UpdateStatus::InProgress);
        assert!(!state.is_ready());
    }
}
