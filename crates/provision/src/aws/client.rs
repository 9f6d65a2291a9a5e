//! AWS SDK client setup.

use crate::config::AwsConfig;

/// One client per service the provisioner talks to, sharing a single
/// loaded SDK configuration.
#[derive(Debug, Clone)]
pub struct AwsCloud {
    pub(super) dynamodb: aws_sdk_dynamodb::Client,
    pub(super) lambda: aws_sdk_lambda::Client,
    pub(super) iam: aws_sdk_iam::Client,
    pub(super) apigateway: aws_sdk_apigateway::Client,
}

impl AwsCloud {
    /// Loads credentials from the default provider chain and builds the
    /// service clients.
    pub async fn connect(config: &AwsConfig) -> Self {
        let mut sdk_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            sdk_config_loader = sdk_config_loader.endpoint_url(endpoint);
        }

        let sdk_config = sdk_config_loader.load().await;
        tracing::debug!(
            region = %config.region,
            endpoint = config.endpoint_url.as_deref().unwrap_or("default"),
            "Loaded AWS configuration"
        );

        Self {
            dynamodb: aws_sdk_dynamodb::Client::new(&sdk_config),
            lambda: aws_sdk_lambda::Client::new(&sdk_config),
            iam: aws_sdk_iam::Client::new(&sdk_config),
            apigateway: aws_sdk_apigateway::Client::new(&sdk_config),
        }
    }
}
