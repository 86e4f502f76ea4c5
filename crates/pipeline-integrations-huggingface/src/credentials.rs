//! Hub credentials
//!
//! Remote calls receive a [`HubCredentials`] value explicitly. The Hub
//! tooling also reads `HF_TOKEN` and `HF_NAMESPACE` from the process
//! environment, so every remote call runs inside a [`CredentialScope`] that
//! exports both variables on acquisition and removes them on drop.
//!
//! The environment is process-global. Scopes hold a process-wide lock for
//! their whole lifetime, which serializes remote calls made through the
//! deployer within one process. Calling [`export_credentials`] directly
//! bypasses that lock.
//!
//! A scope lives as long as the lifecycle call that opened it, including
//! any status polling. A `deploy` or `start` waiting on a slow endpoint
//! therefore blocks every other deployer call in the process for up to its
//! timeout. Pass a zero timeout and poll separately to avoid that.

use std::sync::OnceLock;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{DeployerError, DeployerResult};

/// Environment variable holding the Hub access token
pub const HF_TOKEN_ENV: &str = "HF_TOKEN";
/// Environment variable holding the Hub namespace
pub const HF_NAMESPACE_ENV: &str = "HF_NAMESPACE";

/// Validated Hub token and namespace
#[derive(Debug, Clone)]
pub struct HubCredentials {
    token: SecretString,
    namespace: String,
}

impl HubCredentials {
    /// Create credentials, rejecting an empty token or namespace
    pub fn new(token: SecretString, namespace: impl Into<String>) -> DeployerResult<Self> {
        let namespace = namespace.into();
        if token.expose_secret().trim().is_empty() {
            return Err(DeployerError::Config(
                "Hugging Face token is empty".to_string(),
            ));
        }
        if namespace.trim().is_empty() {
            return Err(DeployerError::Config(
                "Hugging Face namespace is empty".to_string(),
            ));
        }
        Ok(Self { token, namespace })
    }

    pub(crate) fn from_parts(
        token: Option<SecretString>,
        namespace: Option<String>,
    ) -> DeployerResult<Self> {
        let token = token.ok_or_else(|| {
            DeployerError::Config("Hugging Face token is not configured".to_string())
        })?;
        let namespace = namespace.ok_or_else(|| {
            DeployerError::Config("Hugging Face namespace is not configured".to_string())
        })?;
        Self::new(token, namespace)
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Value for the `Authorization` header
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }
}

/// Set (`Some`) or remove (`None`) the Hub environment variables
pub fn export_credentials(credentials: Option<&HubCredentials>) {
    match credentials {
        Some(credentials) => {
            std::env::set_var(HF_TOKEN_ENV, credentials.token.expose_secret());
            std::env::set_var(HF_NAMESPACE_ENV, &credentials.namespace);
            debug!(namespace = %credentials.namespace, "Exported Hub credentials");
        }
        None => {
            std::env::remove_var(HF_TOKEN_ENV);
            std::env::remove_var(HF_NAMESPACE_ENV);
            debug!("Removed Hub credentials from environment");
        }
    }
}

pub(crate) fn credential_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Credentials exported to the environment for the lifetime of the scope
pub struct CredentialScope {
    credentials: HubCredentials,
    _guard: MutexGuard<'static, ()>,
}

impl CredentialScope {
    /// Wait for the process-wide credential lock and export `credentials`
    pub async fn acquire(credentials: HubCredentials) -> Self {
        let guard = credential_lock().lock().await;
        export_credentials(Some(&credentials));
        Self {
            credentials,
            _guard: guard,
        }
    }

    pub fn credentials(&self) -> &HubCredentials {
        &self.credentials
    }
}

impl Drop for CredentialScope {
    fn drop(&mut self) {
        export_credentials(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> HubCredentials {
        HubCredentials::new(SecretString::new("hf_test".to_string()), "acme").unwrap()
    }

    #[test]
    fn test_rejects_empty_values() {
        let empty_token = HubCredentials::new(SecretString::new("  ".to_string()), "acme");
        assert!(matches!(empty_token, Err(DeployerError::Config(_))));

        let empty_namespace = HubCredentials::new(SecretString::new("hf".to_string()), "");
        assert!(matches!(empty_namespace, Err(DeployerError::Config(_))));

        let missing = HubCredentials::from_parts(None, Some("acme".to_string()));
        assert!(matches!(missing, Err(DeployerError::Config(_))));
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(credentials().bearer(), "Bearer hf_test");
    }

    #[tokio::test]
    async fn test_scope_exports_and_clears_environment() {
        let scope = CredentialScope::acquire(credentials()).await;
        assert_eq!(std::env::var(HF_TOKEN_ENV).unwrap(), "hf_test");
        assert_eq!(std::env::var(HF_NAMESPACE_ENV).unwrap(), "acme");
        assert_eq!(scope.credentials().namespace(), "acme");
        drop(scope);

        let _guard = credential_lock().lock().await;
        assert!(std::env::var(HF_TOKEN_ENV).is_err());
        assert!(std::env::var(HF_NAMESPACE_ENV).is_err());
    }
}
