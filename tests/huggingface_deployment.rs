//! Full endpoint lifecycle against a mocked Inference Endpoints API

mod common;

use std::sync::Arc;
use std::time::Duration;

use pipeline_integrations_core::{ArtifactRegistry, FileArtifactRegistry, ModelDeployer};
use pipeline_integrations_huggingface::{
    DeployerError, HubCredentials, HuggingFaceDeployerConfig, HuggingFaceModelDeployer,
    HuggingFaceServiceConfig, ServiceState, HF_TOKEN_ENV, HUGGINGFACE_SERVICE_ARTIFACT,
};
use secrecy::SecretString;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "zenml-bert123e4567";
const ENDPOINT_PATH: &str = "/v2/endpoint/acme/zenml-bert123e4567";

fn endpoint(state: &str, url: Option<&str>) -> serde_json::Value {
    json!({
        "name": ENDPOINT,
        "status": { "state": state, "url": url },
    })
}

fn model_id() -> Uuid {
    Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap()
}

#[tokio::test]
async fn test_deploy_stop_restart_delete() {
    common::init_tracing();

    let server = MockServer::start().await;
    let prediction_url = format!("{}/predict", server.uri());

    Mock::given(method("GET"))
        .and(path(ENDPOINT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(endpoint("running", Some(&prediction_url))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/endpoint/acme"))
        .and(header("authorization", "Bearer hf_e2e"))
        .and(body_partial_json(json!({
            "name": ENDPOINT,
            "model": { "repository": "org/bert", "task": "fill-mask" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(endpoint("initializing", None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/pause", ENDPOINT_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(endpoint("paused", None)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(ENDPOINT_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = tempfile::tempdir().unwrap();
    let registry = Arc::new(FileArtifactRegistry::new(store.path()));
    let config = HuggingFaceDeployerConfig::default()
        .with_token("hf_e2e")
        .with_namespace("acme")
        .with_api_url(format!("{}/v2/endpoint", server.uri()))
        .with_poll_interval(Duration::ZERO);
    let deployer = HuggingFaceModelDeployer::from_config(config, registry.clone()).unwrap();

    let mut service_config = HuggingFaceServiceConfig::new("bert", "org/bert").with_task("fill-mask");
    let mut service = deployer
        .deploy(model_id(), &mut service_config, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(service_config.endpoint_name, ENDPOINT);
    assert!(service.is_running());
    assert_eq!(service.prediction_url().as_deref(), Some(prediction_url.as_str()));
    let info = HuggingFaceModelDeployer::model_server_info(&service);
    assert_eq!(
        info["HEALTH_CHECK_URL"].as_deref(),
        Some(format!("{}/health", prediction_url).as_str())
    );

    let versions = registry
        .list_versions(HUGGINGFACE_SERVICE_ARTIFACT)
        .await
        .unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, "123e4567");
    assert!(versions[0].is_deployment_artifact);

    let metadata = registry
        .get_metadata(HUGGINGFACE_SERVICE_ARTIFACT, "123e4567")
        .await
        .unwrap();
    assert_eq!(metadata[HUGGINGFACE_SERVICE_ARTIFACT]["uuid"], model_id().to_string());
    assert!(metadata[HUGGINGFACE_SERVICE_ARTIFACT].get("token").is_none());

    let mut restored = deployer.find_service("123e4567").await.unwrap();
    assert_eq!(restored.uuid, model_id());
    assert_eq!(restored.endpoint_name(), ENDPOINT);

    deployer
        .stop(&mut service, Duration::from_secs(5), false)
        .await
        .unwrap();
    assert_eq!(service.status.state, ServiceState::Inactive);

    deployer
        .delete(&mut restored, Duration::from_secs(5), false)
        .await
        .unwrap();
    assert_eq!(restored.status.state, ServiceState::Inactive);
    assert_eq!(restored.prediction_url(), None);

    // Credentials only live in the environment while a call is in flight.
    assert!(std::env::var(HF_TOKEN_ENV).is_err());
}

#[tokio::test]
async fn test_deploy_without_credentials_touches_nothing() {
    let server = MockServer::start().await;
    let store = tempfile::tempdir().unwrap();
    let registry = Arc::new(FileArtifactRegistry::new(store.path()));
    let config = HuggingFaceDeployerConfig::default()
        .with_namespace("acme")
        .with_api_url(server.uri());
    let deployer = HuggingFaceModelDeployer::from_config(config, registry.clone()).unwrap();

    let mut service_config = HuggingFaceServiceConfig::new("bert", "org/bert");
    let err = deployer
        .deploy(model_id(), &mut service_config, Duration::ZERO)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployerError::Config(_)));
    assert_eq!(service_config.endpoint_name, "bert");
    assert!(registry
        .list_versions(HUGGINGFACE_SERVICE_ARTIFACT)
        .await
        .unwrap()
        .is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[test]
fn test_blank_credentials_rejected() {
    assert!(HubCredentials::new(SecretString::new("hf_x".to_string()), "acme").is_ok());
    assert!(matches!(
        HubCredentials::new(SecretString::new("  ".to_string()), "acme"),
        Err(DeployerError::Config(_))
    ));
    assert!(matches!(
        HubCredentials::new(SecretString::new("hf_x".to_string()), ""),
        Err(DeployerError::Config(_))
    ));
}
