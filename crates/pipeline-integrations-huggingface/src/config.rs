//! Deployer and endpoint configuration
//!
//! [`HuggingFaceDeployerConfig`] holds the stack-level settings (credentials,
//! API location, polling). [`HuggingFaceServiceConfig`] describes a single
//! inference endpoint and is persisted with the deployment handle.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::credentials::HubCredentials;
use crate::error::DeployerResult;

/// Base URL of the Inference Endpoints API
pub const DEFAULT_API_URL: &str = "https://api.endpoints.huggingface.cloud/v2/endpoint";

/// Environment prefix for configuration overrides (`HF_DEPLOYER__TOKEN`, ...)
pub const CONFIG_ENV_PREFIX: &str = "HF_DEPLOYER";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Stack-level configuration of the Hugging Face model deployer
#[derive(Debug, Clone, Deserialize)]
pub struct HuggingFaceDeployerConfig {
    /// Hub access token
    #[serde(default)]
    pub token: Option<SecretString>,
    /// Hub namespace (user or organization) owning the endpoints
    #[serde(default)]
    pub namespace: Option<String>,
    /// Inference Endpoints API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Interval between endpoint status polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Timeout for individual HTTP requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for HuggingFaceDeployerConfig {
    fn default() -> Self {
        Self {
            token: None,
            namespace: None,
            api_url: default_api_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl HuggingFaceDeployerConfig {
    /// Load configuration from an optional file plus `HF_DEPLOYER__*`
    /// environment overrides
    pub fn load(path: Option<&Path>) -> DeployerResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(CONFIG_ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::new(token.into()));
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validated credentials for remote calls
    pub fn credentials(&self) -> DeployerResult<HubCredentials> {
        HubCredentials::from_parts(self.token.clone(), self.namespace.clone())
    }
}

fn default_endpoint_name() -> String {
    "zenml-".to_string()
}

fn default_framework() -> String {
    "pytorch".to_string()
}

fn default_accelerator() -> String {
    "cpu".to_string()
}

fn default_instance_size() -> String {
    "x2".to_string()
}

fn default_instance_type() -> String {
    "intel-icl".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_vendor() -> String {
    "aws".to_string()
}

fn default_max_replica() -> u32 {
    1
}

fn default_endpoint_type() -> String {
    "protected".to_string()
}

/// Configuration of a single inference endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuggingFaceServiceConfig {
    /// Remote endpoint name
    #[serde(default = "default_endpoint_name")]
    pub endpoint_name: String,
    /// Hub model repository to serve
    pub repository: String,
    /// Model revision (commit, branch or tag)
    #[serde(default)]
    pub revision: Option<String>,
    /// Task the model is served for, e.g. `text-classification`
    #[serde(default)]
    pub task: Option<String>,
    /// Framework the model is loaded with
    #[serde(default = "default_framework")]
    pub framework: String,
    /// Accelerator kind (`cpu` or `gpu`)
    #[serde(default = "default_accelerator")]
    pub accelerator: String,
    /// Instance size, e.g. `x2`
    #[serde(default = "default_instance_size")]
    pub instance_size: String,
    /// Instance type, e.g. `intel-icl`
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    /// Cloud region
    #[serde(default = "default_region")]
    pub region: String,
    /// Cloud vendor
    #[serde(default = "default_vendor")]
    pub vendor: String,
    /// Namespace override; the deployer's namespace is used when unset
    #[serde(default)]
    pub namespace: Option<String>,
    /// Minimum number of replicas
    #[serde(default)]
    pub min_replica: u32,
    /// Maximum number of replicas
    #[serde(default = "default_max_replica")]
    pub max_replica: u32,
    /// Endpoint security level (`public`, `protected` or `private`)
    #[serde(default = "default_endpoint_type")]
    pub endpoint_type: String,
    /// Custom container image specification
    #[serde(default)]
    pub custom_image: Option<serde_json::Value>,
}

impl HuggingFaceServiceConfig {
    pub fn new(endpoint_name: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            repository: repository.into(),
            revision: None,
            task: None,
            framework: default_framework(),
            accelerator: default_accelerator(),
            instance_size: default_instance_size(),
            instance_type: default_instance_type(),
            region: default_region(),
            vendor: default_vendor(),
            namespace: None,
            min_replica: 0,
            max_replica: default_max_replica(),
            endpoint_type: default_endpoint_type(),
            custom_image: None,
        }
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_replicas(mut self, min_replica: u32, max_replica: u32) -> Self {
        self.min_replica = min_replica;
        self.max_replica = max_replica;
        self
    }
}
