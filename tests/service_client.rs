//! Integration tests for the HTTP device service client against a mock server.

use std::sync::Arc;

use gpuwatch::source::{CredentialStore, TokenStore};
use gpuwatch::{
    FetchError, ModelSource, Recommendation, RecommendationSource, ServiceClient, SnapshotFetcher,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gpu_json(index: u32, util: f64) -> serde_json::Value {
    json!({
        "index": index,
        "name": format!("NVIDIA A100 #{}", index),
        "utilization_percent": util,
        "temperature_c": 55.0,
        "used_memory_mb": 10240.0,
        "total_memory_mb": 40960.0,
        "free_memory_mb": 30720.0
    })
}

fn client_for(server: &MockServer) -> ServiceClient {
    ServiceClient::builder()
        .base_url(server.uri())
        .token("secret")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_fetch_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gpus"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([gpu_json(0, 12.5), gpu_json(1, 80.0)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let snapshots = client_for(&server).fetch().await.unwrap();

    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].index, 0);
    assert_eq!(snapshots[1].utilization_percent, 80.0);
    assert_eq!(snapshots[0].memory_percent(), 25.0);
}

#[tokio::test]
async fn test_fetch_empty_fleet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gpus"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let snapshots = client_for(&server).fetch().await.unwrap();
    assert!(snapshots.is_empty());
}

#[tokio::test]
async fn test_service_error_carries_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gpus"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "NVML not initialized"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).fetch().await.unwrap_err();
    assert_eq!(
        err,
        FetchError::Service {
            status: 500,
            detail: "NVML not initialized".to_string(),
        }
    );
}

#[tokio::test]
async fn test_unauthorized_invalidates_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gpus"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token has expired"})),
        )
        .mount(&server)
        .await;

    let store = Arc::new(TokenStore::new(Some("stale".to_string())));
    let client = ServiceClient::builder()
        .base_url(server.uri())
        .credentials(store.clone())
        .build()
        .unwrap();

    let err = client.fetch().await.unwrap_err();

    assert!(err.is_auth());
    assert_eq!(err, FetchError::Auth("Token has expired".to_string()));
    assert!(!store.is_authenticated());
    assert!(store.bearer_token().is_none());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gpus"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch().await.unwrap_err();
    assert_eq!(err.kind(), "decode");
}

#[tokio::test]
async fn test_recommendation_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gpus/optimal"))
        .and(query_param("min_memory_mb", "4096"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "found": true,
            "gpu_index": 1,
            "gpu_info": gpu_json(1, 5.0)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServiceClient::builder()
        .base_url(server.uri())
        .min_free_memory_mb(Some(4096))
        .build()
        .unwrap();

    match client.recommend().await.unwrap() {
        Recommendation::Found { device_index, info } => {
            assert_eq!(device_index, 1);
            assert_eq!(info.map(|gpu| gpu.utilization_percent), Some(5.0));
        }
        other => panic!("expected a device, got {:?}", other),
    }
}

#[tokio::test]
async fn test_recommendation_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gpus/optimal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "found": false,
            "message": "No suitable GPU found"
        })))
        .mount(&server)
        .await;

    let rec = client_for(&server).recommend().await.unwrap();
    assert_eq!(
        rec,
        Recommendation::NotFound {
            message: "No suitable GPU found".to_string()
        }
    );
}

#[tokio::test]
async fn test_recommendation_found_without_index_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gpus/optimal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"found": true})))
        .mount(&server)
        .await;

    let err = client_for(&server).recommend().await.unwrap_err();
    assert_eq!(err.kind(), "decode");
}

#[tokio::test]
async fn test_models_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"model_id": "m1", "model_name": "llama", "framework": "pytorch", "task": "text-generation"},
            {"model_id": "m2", "task": null},
            {"model_id": "m3"}
        ])))
        .mount(&server)
        .await;

    let models = client_for(&server).models().await.unwrap();

    assert_eq!(models.len(), 3);
    assert_eq!(models[0].task.as_deref(), Some("text-generation"));
    assert_eq!(models[1].task, None);
    assert_eq!(models[2].framework, None);
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    // Nothing listens on port 1
    let client = ServiceClient::builder()
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();

    let err = client.fetch().await.unwrap_err();
    assert_eq!(err.kind(), "network");
    assert_eq!(client.description(), "http: http://127.0.0.1:1");
}
