//! Hugging Face Inference Endpoints integration
//!
//! Deploys pipeline models as managed inference endpoints:
//! - [`deployer`]: the [`ModelDeployer`](pipeline_integrations_core::ModelDeployer)
//!   implementation and endpoint naming rules
//! - [`service`]: the persisted endpoint handle and its remote lifecycle
//! - [`client`]: REST client for the Inference Endpoints API
//! - [`credentials`]: scoped Hub credentials

pub mod client;
pub mod config;
pub mod credentials;
pub mod deployer;
pub mod error;
pub mod service;

pub use client::{EndpointInfo, EndpointState, HttpEndpointsClient, InferenceEndpointsApi};
pub use config::{HuggingFaceDeployerConfig, HuggingFaceServiceConfig};
pub use credentials::{CredentialScope, HubCredentials, HF_NAMESPACE_ENV, HF_TOKEN_ENV};
pub use deployer::{
    HuggingFaceModelDeployer, ENDPOINT_NAME_PREFIX, HUGGINGFACE_SERVICE_ARTIFACT,
    UUID_SLICE_LENGTH,
};
pub use error::{DeployerError, DeployerResult};
pub use service::{HuggingFaceDeploymentService, ServiceState, ServiceStatus};
