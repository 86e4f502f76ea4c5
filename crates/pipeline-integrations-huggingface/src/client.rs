//! Inference Endpoints API client
//!
//! [`InferenceEndpointsApi`] is the seam between the deployment service and
//! the hosting platform. [`HttpEndpointsClient`] talks to the REST API:
//!
//! ```text
//! POST   {api}/{namespace}               create
//! GET    {api}/{namespace}/{name}        describe
//! POST   {api}/{namespace}/{name}/pause
//! POST   {api}/{namespace}/{name}/resume
//! DELETE {api}/{namespace}/{name}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::HuggingFaceServiceConfig;
use crate::credentials::HubCredentials;
use crate::error::{DeployerError, DeployerResult};

/// Remote endpoint state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EndpointState {
    Pending,
    Initializing,
    Updating,
    UpdateFailed,
    Running,
    Paused,
    Failed,
    ScaledToZero,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EndpointState {
    /// Deployed and able to serve (possibly after scaling up from zero)
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Running | Self::ScaledToZero)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed | Self::UpdateFailed)
    }
}

/// Status block of an endpoint description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointStatus {
    #[serde(default)]
    pub state: EndpointState,
    /// Prediction URL, set once the endpoint is reachable
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Endpoint description returned by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub name: String,
    #[serde(default)]
    pub status: EndpointStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub vendor: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingSpec {
    pub min_replica: u32,
    pub max_replica: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeSpec {
    pub accelerator: String,
    pub instance_type: String,
    pub instance_size: String,
    pub scaling: ScalingSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    pub framework: String,
    pub image: serde_json::Value,
}

/// Body of the endpoint creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEndpointRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub endpoint_type: String,
    pub provider: ProviderSpec,
    pub compute: ComputeSpec,
    pub model: ModelSpec,
}

impl CreateEndpointRequest {
    pub fn from_config(config: &HuggingFaceServiceConfig) -> Self {
        let image = match &config.custom_image {
            Some(custom) => serde_json::json!({ "custom": custom }),
            None => serde_json::json!({ "huggingface": {} }),
        };

        Self {
            name: config.endpoint_name.clone(),
            endpoint_type: config.endpoint_type.clone(),
            provider: ProviderSpec {
                vendor: config.vendor.clone(),
                region: config.region.clone(),
            },
            compute: ComputeSpec {
                accelerator: config.accelerator.clone(),
                instance_type: config.instance_type.clone(),
                instance_size: config.instance_size.clone(),
                scaling: ScalingSpec {
                    min_replica: config.min_replica,
                    max_replica: config.max_replica,
                },
            },
            model: ModelSpec {
                repository: config.repository.clone(),
                revision: config.revision.clone(),
                task: config.task.clone(),
                framework: config.framework.clone(),
                image,
            },
        }
    }
}

/// Operations against the hosting platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceEndpointsApi: Send + Sync {
    /// Create a new endpoint
    async fn create_endpoint(
        &self,
        credentials: &HubCredentials,
        namespace: &str,
        request: &CreateEndpointRequest,
    ) -> DeployerResult<EndpointInfo>;

    /// Describe an endpoint; `None` when it does not exist
    async fn get_endpoint(
        &self,
        credentials: &HubCredentials,
        namespace: &str,
        name: &str,
    ) -> DeployerResult<Option<EndpointInfo>>;

    /// Pause a running endpoint
    async fn pause_endpoint(
        &self,
        credentials: &HubCredentials,
        namespace: &str,
        name: &str,
    ) -> DeployerResult<EndpointInfo>;

    /// Resume a paused endpoint
    async fn resume_endpoint(
        &self,
        credentials: &HubCredentials,
        namespace: &str,
        name: &str,
    ) -> DeployerResult<EndpointInfo>;

    /// Delete an endpoint and its configuration
    async fn delete_endpoint(
        &self,
        credentials: &HubCredentials,
        namespace: &str,
        name: &str,
    ) -> DeployerResult<()>;
}

/// REST client for the Inference Endpoints API
#[derive(Debug, Clone)]
pub struct HttpEndpointsClient {
    client: Client,
    base_url: String,
}

impl HttpEndpointsClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> DeployerResult<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn namespace_url(&self, namespace: &str) -> String {
        format!("{}/{}", self.base_url, namespace)
    }

    fn endpoint_url(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, namespace, name)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        credentials: &HubCredentials,
    ) -> DeployerResult<Response> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, credentials.bearer())
            .send()
            .await?;
        Ok(response)
    }

    async fn check(response: Response, name: &str) -> DeployerResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(DeployerError::NotFound(name.to_string()));
        }
        let message = response.text().await.unwrap_or_default();
        Err(DeployerError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl InferenceEndpointsApi for HttpEndpointsClient {
    #[instrument(skip(self, credentials, request), fields(endpoint = %request.name))]
    async fn create_endpoint(
        &self,
        credentials: &HubCredentials,
        namespace: &str,
        request: &CreateEndpointRequest,
    ) -> DeployerResult<EndpointInfo> {
        let builder = self.client.post(self.namespace_url(namespace)).json(request);
        let response = Self::check(self.send(builder, credentials).await?, &request.name).await?;
        let info: EndpointInfo = response.json().await?;

        debug!(state = ?info.status.state, "Created inference endpoint");
        Ok(info)
    }

    #[instrument(skip(self, credentials))]
    async fn get_endpoint(
        &self,
        credentials: &HubCredentials,
        namespace: &str,
        name: &str,
    ) -> DeployerResult<Option<EndpointInfo>> {
        let builder = self.client.get(self.endpoint_url(namespace, name));
        match Self::check(self.send(builder, credentials).await?, name).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(DeployerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, credentials))]
    async fn pause_endpoint(
        &self,
        credentials: &HubCredentials,
        namespace: &str,
        name: &str,
    ) -> DeployerResult<EndpointInfo> {
        let url = format!("{}/pause", self.endpoint_url(namespace, name));
        let response = Self::check(self.send(self.client.post(url), credentials).await?, name).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, credentials))]
    async fn resume_endpoint(
        &self,
        credentials: &HubCredentials,
        namespace: &str,
        name: &str,
    ) -> DeployerResult<EndpointInfo> {
        let url = format!("{}/resume", self.endpoint_url(namespace, name));
        let response = Self::check(self.send(self.client.post(url), credentials).await?, name).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, credentials))]
    async fn delete_endpoint(
        &self,
        credentials: &HubCredentials,
        namespace: &str,
        name: &str,
    ) -> DeployerResult<()> {
        let builder = self.client.delete(self.endpoint_url(namespace, name));
        Self::check(self.send(builder, credentials).await?, name).await?;
        debug!("Deleted inference endpoint");
        Ok(())
    }
}
