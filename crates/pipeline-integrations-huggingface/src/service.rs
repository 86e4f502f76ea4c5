//! Hugging Face deployment service
//!
//! The service is the endpoint handle: it knows which model it serves, how
//! the remote endpoint is configured and what state it was last seen in. It
//! is persisted as a deployment artifact so later runs can manage the same
//! endpoint.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::client::{CreateEndpointRequest, EndpointInfo, EndpointState, InferenceEndpointsApi};
use crate::config::HuggingFaceServiceConfig;
use crate::credentials::HubCredentials;
use crate::error::{DeployerError, DeployerResult};

/// Lifecycle state of a deployment service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    #[default]
    Inactive,
    PendingStartup,
    Active,
    PendingShutdown,
    Error,
}

/// Last observed status of the remote endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub state: ServiceState,
    /// Prediction URL reported by the platform
    #[serde(default)]
    pub prediction_url: Option<String>,
    /// Last error reported by the platform
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Handle for a model served by a Hugging Face inference endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuggingFaceDeploymentService {
    /// UUID of the deployed model
    pub uuid: Uuid,
    pub config: HuggingFaceServiceConfig,
    #[serde(default)]
    pub status: ServiceStatus,
    pub created_at: DateTime<Utc>,
}

impl HuggingFaceDeploymentService {
    pub fn new(uuid: Uuid, config: HuggingFaceServiceConfig) -> Self {
        Self {
            uuid,
            config,
            status: ServiceStatus::default(),
            created_at: Utc::now(),
        }
    }

    pub fn endpoint_name(&self) -> &str {
        &self.config.endpoint_name
    }

    /// Namespace the endpoint lives in
    pub fn namespace<'a>(&'a self, credentials: &'a HubCredentials) -> &'a str {
        self.config
            .namespace
            .as_deref()
            .unwrap_or_else(|| credentials.namespace())
    }

    pub fn is_running(&self) -> bool {
        self.status.state == ServiceState::Active
    }

    pub fn prediction_url(&self) -> Option<String> {
        self.status.prediction_url.clone()
    }

    pub fn healthcheck_url(&self) -> Option<String> {
        self.status
            .prediction_url
            .as_ref()
            .map(|url| format!("{}/health", url.trim_end_matches('/')))
    }

    fn apply(&mut self, info: &EndpointInfo) {
        let state = info.status.state;
        self.status.state = match state {
            EndpointState::Running | EndpointState::ScaledToZero => ServiceState::Active,
            EndpointState::Pending | EndpointState::Initializing | EndpointState::Updating => {
                ServiceState::PendingStartup
            }
            EndpointState::Paused => ServiceState::Inactive,
            EndpointState::Failed | EndpointState::UpdateFailed => ServiceState::Error,
            EndpointState::Unknown => self.status.state,
        };
        self.status.prediction_url = info.status.url.clone();
        if state.is_failed() {
            self.status.last_error = info.status.message.clone();
        }
    }

    /// Provision the endpoint if needed and wait until it serves
    ///
    /// A zero `timeout` returns as soon as the endpoint has been created or
    /// resumed, without waiting for it to come up.
    #[instrument(skip(self, api, credentials), fields(endpoint = %self.config.endpoint_name))]
    pub async fn start(
        &mut self,
        api: &dyn InferenceEndpointsApi,
        credentials: &HubCredentials,
        timeout: Duration,
        poll_interval: Duration,
    ) -> DeployerResult<()> {
        let namespace = self.namespace(credentials).to_string();
        let name = self.config.endpoint_name.clone();
        self.status.state = ServiceState::PendingStartup;

        let info = match api.get_endpoint(credentials, &namespace, &name).await? {
            None => {
                info!(namespace = %namespace, "Creating inference endpoint");
                let request = CreateEndpointRequest::from_config(&self.config);
                api.create_endpoint(credentials, &namespace, &request).await?
            }
            Some(info) if info.status.state == EndpointState::Paused => {
                info!(namespace = %namespace, "Resuming paused inference endpoint");
                api.resume_endpoint(credentials, &namespace, &name).await?
            }
            Some(info) => info,
        };
        self.apply(&info);

        if timeout.is_zero() {
            return Ok(());
        }

        self.wait_for(api, credentials, timeout, poll_interval, EndpointState::is_ready)
            .await
    }

    /// Pause the endpoint
    ///
    /// With `force`, remote failures are logged and the service is marked
    /// inactive anyway.
    #[instrument(skip(self, api, credentials), fields(endpoint = %self.config.endpoint_name))]
    pub async fn stop(
        &mut self,
        api: &dyn InferenceEndpointsApi,
        credentials: &HubCredentials,
        timeout: Duration,
        force: bool,
        poll_interval: Duration,
    ) -> DeployerResult<()> {
        self.status.state = ServiceState::PendingShutdown;

        match self.pause(api, credentials, timeout, poll_interval).await {
            Ok(()) => {
                self.status.state = ServiceState::Inactive;
                info!("Inference endpoint stopped");
                Ok(())
            }
            Err(e) if force => {
                warn!(error = %e, "Failed to stop inference endpoint, forcing inactive state");
                self.status.state = ServiceState::Inactive;
                Ok(())
            }
            Err(e) => {
                self.status.state = ServiceState::Error;
                self.status.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn pause(
        &mut self,
        api: &dyn InferenceEndpointsApi,
        credentials: &HubCredentials,
        timeout: Duration,
        poll_interval: Duration,
    ) -> DeployerResult<()> {
        let namespace = self.namespace(credentials).to_string();
        let info = api
            .pause_endpoint(credentials, &namespace, &self.config.endpoint_name)
            .await?;
        self.apply(&info);

        if timeout.is_zero() || info.status.state == EndpointState::Paused {
            return Ok(());
        }

        self.wait_for(api, credentials, timeout, poll_interval, |state| {
            state == EndpointState::Paused
        })
        .await
    }

    /// Delete the remote endpoint
    ///
    /// An endpoint that no longer exists is not an error.
    #[instrument(skip(self, api, credentials), fields(endpoint = %self.config.endpoint_name))]
    pub async fn deprovision(
        &mut self,
        api: &dyn InferenceEndpointsApi,
        credentials: &HubCredentials,
        force: bool,
    ) -> DeployerResult<()> {
        let namespace = self.namespace(credentials).to_string();
        match api
            .delete_endpoint(credentials, &namespace, &self.config.endpoint_name)
            .await
        {
            Ok(()) => info!("Inference endpoint deleted"),
            Err(DeployerError::NotFound(_)) => {
                warn!("Inference endpoint not found, nothing to delete")
            }
            Err(e) if force => warn!(error = %e, "Failed to delete inference endpoint"),
            Err(e) => return Err(e),
        }

        self.status.state = ServiceState::Inactive;
        self.status.prediction_url = None;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        api: &dyn InferenceEndpointsApi,
        credentials: &HubCredentials,
        timeout: Duration,
        poll_interval: Duration,
        reached: impl Fn(EndpointState) -> bool + Send,
    ) -> DeployerResult<()> {
        let namespace = self.namespace(credentials).to_string();
        let name = self.config.endpoint_name.clone();
        let deadline = Instant::now() + timeout;

        loop {
            let info = api
                .get_endpoint(credentials, &namespace, &name)
                .await?
                .ok_or_else(|| DeployerError::NotFound(name.clone()))?;
            self.apply(&info);

            let state = info.status.state;
            debug!(state = ?state, "Polled inference endpoint");

            if reached(state) {
                return Ok(());
            }
            if state.is_failed() {
                return Err(DeployerError::EndpointFailed {
                    endpoint: name,
                    message: info.status.message.unwrap_or_default(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DeployerError::Timeout {
                    endpoint: name,
                    timeout,
                });
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }
}
