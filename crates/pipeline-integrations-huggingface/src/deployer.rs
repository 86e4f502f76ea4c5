//! Hugging Face model deployer
//!
//! Maps a pipeline model to exactly one inference endpoint. The first eight
//! characters of the model UUID serve both as the artifact version of the
//! persisted service handle and as the endpoint name suffix.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pipeline_integrations_core::{ArtifactRegistry, ModelDeployer, ModelServerInfo, SaveOptions};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::client::{HttpEndpointsClient, InferenceEndpointsApi};
use crate::config::{HuggingFaceDeployerConfig, HuggingFaceServiceConfig};
use crate::credentials::{export_credentials, CredentialScope, HubCredentials};
use crate::error::{DeployerError, DeployerResult};
use crate::service::HuggingFaceDeploymentService;

/// Artifact name under which deployment services are persisted
pub const HUGGINGFACE_SERVICE_ARTIFACT: &str = "huggingface_service";
/// Prefix every managed endpoint name carries
pub const ENDPOINT_NAME_PREFIX: &str = "zenml-";
/// Number of UUID characters used as artifact version and name suffix
pub const UUID_SLICE_LENGTH: usize = 8;

/// Hugging Face Inference Endpoints model deployer
pub struct HuggingFaceModelDeployer {
    config: HuggingFaceDeployerConfig,
    api: Arc<dyn InferenceEndpointsApi>,
    registry: Arc<dyn ArtifactRegistry>,
}

impl HuggingFaceModelDeployer {
    pub const NAME: &'static str = "HuggingFace";

    /// Create a deployer with an explicit endpoint API
    pub fn new(
        config: HuggingFaceDeployerConfig,
        api: Arc<dyn InferenceEndpointsApi>,
        registry: Arc<dyn ArtifactRegistry>,
    ) -> Self {
        Self {
            config,
            api,
            registry,
        }
    }

    /// Create a deployer talking to the configured REST API
    pub fn from_config(
        config: HuggingFaceDeployerConfig,
        registry: Arc<dyn ArtifactRegistry>,
    ) -> DeployerResult<Self> {
        let client = HttpEndpointsClient::new(config.api_url.clone(), config.request_timeout())?;
        Ok(Self::new(config, Arc::new(client), registry))
    }

    pub fn config(&self) -> &HuggingFaceDeployerConfig {
        &self.config
    }

    /// Set (`enable = true`) or remove the Hub credential environment
    /// variables
    ///
    /// Enabling fails with a configuration error when the token or namespace
    /// is missing. Prefer [`CredentialScope`], which pairs both calls and
    /// serializes concurrent users.
    pub fn prepare_credentials(&self, enable: bool) -> DeployerResult<()> {
        if enable {
            let credentials = self.config.credentials()?;
            export_credentials(Some(&credentials));
        } else {
            export_credentials(None);
        }
        Ok(())
    }

    /// Add the `zenml-` prefix if missing and append the artifact version
    ///
    /// The prefix check makes repeated calls prefix-idempotent, but the
    /// suffix is appended unconditionally: applying this twice yields two
    /// suffixes.
    pub fn modify_endpoint_name(endpoint_name: &str, artifact_version: &str) -> String {
        let mut name = if endpoint_name.starts_with(ENDPOINT_NAME_PREFIX) {
            endpoint_name.to_string()
        } else {
            format!("{}{}", ENDPOINT_NAME_PREFIX, endpoint_name)
        };
        name.push_str(artifact_version);
        name
    }

    /// Artifact version for a model: the first eight characters of its UUID
    pub fn artifact_version(id: &Uuid) -> String {
        id.to_string()[..UUID_SLICE_LENGTH].to_string()
    }

    async fn scope(&self) -> DeployerResult<CredentialScope> {
        let credentials = self.config.credentials()?;
        Ok(CredentialScope::acquire(credentials).await)
    }

    async fn create_new_service(
        &self,
        credentials: &HubCredentials,
        id: Uuid,
        timeout: Duration,
        config: &mut HuggingFaceServiceConfig,
    ) -> DeployerResult<HuggingFaceDeploymentService> {
        let artifact_version = Self::artifact_version(&id);
        // Latent: a config reused across deploy calls accumulates suffixes.
        config.endpoint_name = Self::modify_endpoint_name(&config.endpoint_name, &artifact_version);

        let mut service = HuggingFaceDeploymentService::new(id, config.clone());

        info!(
            artifact = HUGGINGFACE_SERVICE_ARTIFACT,
            version = %artifact_version,
            "Creating an artifact with the service instance attached as metadata"
        );

        let payload = serde_json::to_value(&service)?;
        self.registry
            .save_artifact(
                HUGGINGFACE_SERVICE_ARTIFACT,
                &artifact_version,
                payload.clone(),
                SaveOptions::deployment(),
            )
            .await?;

        let mut metadata = Map::new();
        metadata.insert(HUGGINGFACE_SERVICE_ARTIFACT.to_string(), payload);
        self.registry
            .log_artifact_metadata(HUGGINGFACE_SERVICE_ARTIFACT, &artifact_version, metadata)
            .await?;

        service
            .start(
                self.api.as_ref(),
                credentials,
                timeout,
                self.config.poll_interval(),
            )
            .await?;
        Ok(service)
    }

    /// Load a previously deployed service by artifact version
    #[instrument(skip(self))]
    pub async fn find_service(
        &self,
        artifact_version: &str,
    ) -> DeployerResult<HuggingFaceDeploymentService> {
        let stored = self
            .registry
            .load_artifact(HUGGINGFACE_SERVICE_ARTIFACT, artifact_version)
            .await?;
        Ok(serde_json::from_value(stored.payload)?)
    }

    /// Load every persisted service, oldest first
    pub async fn find_services(&self) -> DeployerResult<Vec<HuggingFaceDeploymentService>> {
        let versions = self
            .registry
            .list_versions(HUGGINGFACE_SERVICE_ARTIFACT)
            .await?;
        let mut services = Vec::with_capacity(versions.len());
        for version in versions {
            services.push(self.find_service(&version.version).await?);
        }
        Ok(services)
    }
}

#[async_trait]
impl ModelDeployer for HuggingFaceModelDeployer {
    type Service = HuggingFaceDeploymentService;
    type Config = HuggingFaceServiceConfig;
    type Error = DeployerError;

    #[instrument(skip(self, config))]
    async fn deploy(
        &self,
        model_id: Uuid,
        config: &mut HuggingFaceServiceConfig,
        timeout: Duration,
    ) -> DeployerResult<HuggingFaceDeploymentService> {
        let scope = self.scope().await?;
        let service = self
            .create_new_service(scope.credentials(), model_id, timeout, config)
            .await?;
        drop(scope);

        info!(
            endpoint = %service.endpoint_name(),
            state = ?service.status.state,
            "Created a new Hugging Face inference endpoint service"
        );
        Ok(service)
    }

    #[instrument(skip(self, service), fields(endpoint = %service.endpoint_name()))]
    async fn stop(
        &self,
        service: &mut HuggingFaceDeploymentService,
        timeout: Duration,
        force: bool,
    ) -> DeployerResult<()> {
        let scope = self.scope().await?;
        service
            .stop(
                self.api.as_ref(),
                scope.credentials(),
                timeout,
                force,
                self.config.poll_interval(),
            )
            .await
    }

    #[instrument(skip(self, service), fields(endpoint = %service.endpoint_name()))]
    async fn start(
        &self,
        service: &mut HuggingFaceDeploymentService,
        timeout: Duration,
    ) -> DeployerResult<()> {
        let scope = self.scope().await?;
        service
            .start(
                self.api.as_ref(),
                scope.credentials(),
                timeout,
                self.config.poll_interval(),
            )
            .await
    }

    #[instrument(skip(self, service), fields(endpoint = %service.endpoint_name()))]
    async fn delete(
        &self,
        service: &mut HuggingFaceDeploymentService,
        timeout: Duration,
        force: bool,
    ) -> DeployerResult<()> {
        let scope = self.scope().await?;
        let stopped = service
            .stop(
                self.api.as_ref(),
                scope.credentials(),
                timeout,
                force,
                self.config.poll_interval(),
            )
            .await;
        match stopped {
            Ok(()) => {}
            Err(DeployerError::NotFound(_)) => {
                warn!("Inference endpoint already gone, skipping stop");
                service.status.last_error = None;
            }
            Err(e) => return Err(e),
        }
        service
            .deprovision(self.api.as_ref(), scope.credentials(), force)
            .await
    }

    fn model_server_info(service: &HuggingFaceDeploymentService) -> ModelServerInfo {
        let mut info = HashMap::new();
        info.insert("PREDICTION_URL".to_string(), service.prediction_url());
        info.insert("HEALTH_CHECK_URL".to_string(), service.healthcheck_url());
        info
    }
}
