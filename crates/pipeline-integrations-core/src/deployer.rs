//! Model deployer lifecycle contract

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

/// Default timeout for provisioning, starting and stopping deployments
pub const DEFAULT_DEPLOYMENT_START_STOP_TIMEOUT: Duration = Duration::from_secs(300);

/// Implementation specific information about a running model server
pub type ModelServerInfo = HashMap<String, Option<String>>;

/// Lifecycle every model deployer integration implements
#[async_trait]
pub trait ModelDeployer: Send + Sync {
    /// Deployment handle returned by [`ModelDeployer::deploy`]
    type Service: Send + Sync;
    /// Per-deployment configuration
    type Config: Send + Sync;
    /// Error type for lifecycle operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Provision and start a new deployment for a model
    async fn deploy(
        &self,
        model_id: Uuid,
        config: &mut Self::Config,
        timeout: Duration,
    ) -> Result<Self::Service, Self::Error>;

    /// Stop a running deployment
    async fn stop(
        &self,
        service: &mut Self::Service,
        timeout: Duration,
        force: bool,
    ) -> Result<(), Self::Error>;

    /// Start a stopped deployment
    async fn start(&self, service: &mut Self::Service, timeout: Duration)
        -> Result<(), Self::Error>;

    /// Stop a deployment and release all of its remote configuration
    async fn delete(
        &self,
        service: &mut Self::Service,
        timeout: Duration,
        force: bool,
    ) -> Result<(), Self::Error>;

    /// Information about the model server, e.g. prediction URLs
    fn model_server_info(service: &Self::Service) -> ModelServerInfo;
}
