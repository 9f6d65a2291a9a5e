//! REST API gateway operations.

use async_trait::async_trait;
use aws_sdk_apigateway::types::{EndpointConfiguration, EndpointType, IntegrationType, Resource};
use explorespeak_core::manifest::HttpMethod;
use explorespeak_core::provider::{GatewayProvider, GatewayResource, ProviderError, Result, RestApi};

use super::client::AwsCloud;
use super::error::{map_create_error, map_sdk_error};

const API: &str = "RestApi";
const RESOURCE: &str = "Resource";
const METHOD: &str = "Method";
const PAGE_SIZE: i32 = 500;

#[async_trait]
impl GatewayProvider for AwsCloud {
    async fn get_api(&self, api_id: &str) -> Result<Option<RestApi>> {
        match self.apigateway.get_rest_api().rest_api_id(api_id).send().await {
            Ok(response) => Ok(Some(RestApi {
                id: response.id().unwrap_or(api_id).to_string(),
                name: response.name().unwrap_or_default().to_string(),
            })),
            Err(err) => {
                let err = map_sdk_error(err, API, api_id);
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn find_api_by_name(&self, name: &str) -> Result<Option<RestApi>> {
        let mut position: Option<String> = None;
        loop {
            let response = self
                .apigateway
                .get_rest_apis()
                .limit(PAGE_SIZE)
                .set_position(position.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, API, name))?;

            let found = response
                .items()
                .iter()
                .find(|api| api.name() == Some(name))
                .and_then(|api| api.id())
                .map(|id| RestApi {
                    id: id.to_string(),
                    name: name.to_string(),
                });
            if found.is_some() {
                return Ok(found);
            }

            match response.position() {
                Some(next) if !next.is_empty() => position = Some(next.to_string()),
                _ => return Ok(None),
            }
        }
    }

    async fn create_api(&self, name: &str, description: &str) -> Result<RestApi> {
        let response = self
            .apigateway
            .create_rest_api()
            .name(name)
            .description(description)
            .endpoint_configuration(
                EndpointConfiguration::builder()
                    .types(EndpointType::Regional)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| map_create_error(e, API, name))?;

        let id = response.id().ok_or_else(|| {
            ProviderError::Request(format!("CreateRestApi returned no id for '{name}'"))
        })?;
        Ok(RestApi {
            id: id.to_string(),
            name: response.name().unwrap_or(name).to_string(),
        })
    }

    async fn get_resources(&self, api_id: &str) -> Result<Vec<GatewayResource>> {
        let mut resources = Vec::new();
        let mut position: Option<String> = None;
        loop {
            let response = self
                .apigateway
                .get_resources()
                .rest_api_id(api_id)
                .limit(PAGE_SIZE)
                .embed("methods")
                .set_position(position.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, API, api_id))?;

            resources.extend(response.items().iter().map(to_gateway_resource));

            match response.position() {
                Some(next) if !next.is_empty() => position = Some(next.to_string()),
                _ => return Ok(resources),
            }
        }
    }

    async fn create_resource(
        &self,
        api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<GatewayResource> {
        let response = self
            .apigateway
            .create_resource()
            .rest_api_id(api_id)
            .parent_id(parent_id)
            .path_part(path_part)
            .send()
            .await
            .map_err(|e| map_create_error(e, RESOURCE, path_part))?;

        let id = response.id().ok_or_else(|| {
            ProviderError::Request(format!("CreateResource returned no id for '{path_part}'"))
        })?;
        Ok(GatewayResource {
            id: id.to_string(),
            parent_id: Some(parent_id.to_string()),
            path: response.path().unwrap_or_default().to_string(),
            methods: Vec::new(),
        })
    }

    async fn put_method(&self, api_id: &str, resource_id: &str, method: HttpMethod) -> Result<()> {
        self.apigateway
            .put_method()
            .rest_api_id(api_id)
            .resource_id(resource_id)
            .http_method(method.as_str())
            .authorization_type("NONE")
            .send()
            .await
            .map_err(|e| map_create_error(e, METHOD, &method_id(resource_id, method)))?;
        Ok(())
    }

    async fn put_proxy_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        method: HttpMethod,
        uri: &str,
    ) -> Result<()> {
        self.apigateway
            .put_integration()
            .rest_api_id(api_id)
            .resource_id(resource_id)
            .http_method(method.as_str())
            .r#type(IntegrationType::AwsProxy)
            .integration_http_method("POST")
            .uri(uri)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "Integration", &method_id(resource_id, method)))?;
        Ok(())
    }

    async fn put_method_response(
        &self,
        api_id: &str,
        resource_id: &str,
        method: HttpMethod,
        status_code: &str,
    ) -> Result<()> {
        self.apigateway
            .put_method_response()
            .rest_api_id(api_id)
            .resource_id(resource_id)
            .http_method(method.as_str())
            .status_code(status_code)
            .send()
            .await
            .map_err(|e| {
                map_create_error(
                    e,
                    "MethodResponse",
                    &format!("{} {status_code}", method_id(resource_id, method)),
                )
            })?;
        Ok(())
    }

    async fn put_integration_response(
        &self,
        api_id: &str,
        resource_id: &str,
        method: HttpMethod,
        status_code: &str,
        selection_pattern: Option<&str>,
    ) -> Result<()> {
        self.apigateway
            .put_integration_response()
            .rest_api_id(api_id)
            .resource_id(resource_id)
            .http_method(method.as_str())
            .status_code(status_code)
            .set_selection_pattern(selection_pattern.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                map_sdk_error(
                    e,
                    "IntegrationResponse",
                    &format!("{} {status_code}", method_id(resource_id, method)),
                )
            })?;
        Ok(())
    }

    async fn create_deployment(
        &self,
        api_id: &str,
        stage: &str,
        description: &str,
    ) -> Result<String> {
        let response = self
            .apigateway
            .create_deployment()
            .rest_api_id(api_id)
            .stage_name(stage)
            .description(description)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "Deployment", stage))?;

        Ok(response.id().unwrap_or_default().to_string())
    }
}

fn method_id(resource_id: &str, method: HttpMethod) -> String {
    format!("{method} {resource_id}")
}

fn to_gateway_resource(resource: &Resource) -> GatewayResource {
    let mut methods: Vec<String> = resource
        .resource_methods()
        .map(|methods| methods.keys().cloned().collect())
        .unwrap_or_default();
    methods.sort();

    GatewayResource {
        id: resource.id().unwrap_or_default().to_string(),
        parent_id: resource.parent_id().map(str::to_string),
        path: resource.path().unwrap_or_default().to_string(),
        methods,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_apigateway::types::Method;

    #[test]
    fn test_resource_methods_are_sorted_keys() {
        let resource = Resource::builder()
            .id("r1")
            .parent_id("root")
            .path("/vocabulary")
            .resource_methods("POST", Method::builder().http_method("POST").build())
            .resource_methods("GET", Method::builder().http_method("GET").build())
            .build();

        let converted = to_gateway_resource(&resource);

        assert_eq!(converted.path, "/vocabulary");
        assert_eq!(converted.parent_id.as_deref(), Some("root"));
        assert_eq!(converted.methods, vec!["GET".to_string(), "POST".to_string()]);
    }

    #[test]
    fn test_root_resource_has_no_parent() {
        let resource = Resource::builder().id("root").path("/").build();

        let converted = to_gateway_resource(&resource);

        assert_eq!(converted.parent_id, None);
        assert!(converted.methods.is_empty());
    }
}
