//! Earth Engine client tests against a local mock server.

use std::sync::Arc;
use std::time::Duration;

use geefetch_cloud::auth::{BearerToken, NoAuth};
use geefetch_cloud::ee_models::ComputeValueRequest;
use geefetch_cloud::{
    CloudError, EarthEngineClient, EarthEngineOptions, ExportImageRequest, HttpOptions,
    OperationState,
};
use geefetch_core::graph::{Expression, ImageCollection};
use httpmock::prelude::*;
use serde_json::json;

fn options(server: &MockServer) -> EarthEngineOptions {
    EarthEngineOptions {
        base_url: server.url("/v1"),
        poll_interval: Duration::from_millis(1),
        http: HttpOptions {
            request_timeout: Duration::from_secs(5),
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            ..HttpOptions::default()
        },
        ..EarthEngineOptions::new("my-project")
    }
}

fn client(server: &MockServer) -> EarthEngineClient {
    EarthEngineClient::new(options(server), Arc::new(NoAuth)).unwrap()
}

#[tokio::test]
async fn collection_size_posts_expression() {
    let server = MockServer::start_async().await;
    let collection = ImageCollection::load("COPERNICUS/S2_SR_HARMONIZED");
    let expression = Expression::new(&collection.size());
    let body = serde_json::to_value(ComputeValueRequest {
        expression: &expression,
    })
    .unwrap();

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/projects/my-project/value:compute")
                .json_body(body.clone());
            then.status(200).json_body(json!({"result": 0}));
        })
        .await;

    let ee = client(&server);
    assert!(ee.collection_is_empty(&collection).await.unwrap());
    mock.assert_async().await;
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/projects/my-project/value:compute")
                .header("Authorization", "Bearer ya29.token");
            then.status(200).json_body(json!({"result": 12}));
        })
        .await;

    let ee = EarthEngineClient::new(options(&server), Arc::new(BearerToken("ya29.token".into())))
        .unwrap();
    let size = ee
        .collection_size(&ImageCollection::load("X"))
        .await
        .unwrap();
    assert_eq!(size, 12);
    mock.assert_async().await;
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/projects/my-project/value:compute");
            then.status(400).json_body(json!({
                "error": {"code": 400, "message": "Collection.load: not found", "status": "INVALID_ARGUMENT"}
            }));
        })
        .await;

    let err = client(&server)
        .collection_size(&ImageCollection::load("nope"))
        .await
        .unwrap_err();
    match err {
        CloudError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Collection.load: not found");
        }
        other => panic!("unexpected error: {other}"),
    }
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/projects/my-project/value:compute");
            then.status(503).body("backend unavailable");
        })
        .await;

    let err = client(&server)
        .collection_size(&ImageCollection::load("X"))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Api { status: 503, .. }));
    // first attempt + max_retries
    mock.assert_hits_async(3).await;
}

#[tokio::test]
async fn export_is_polled_until_success() {
    let server = MockServer::start_async().await;
    let start = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/projects/my-project/image:export");
            then.status(200).json_body(json!({
                "name": "projects/my-project/operations/OP1",
                "metadata": {"state": "RUNNING", "description": "NDVI_2020-01-01_2020-02-01"}
            }));
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/projects/my-project/operations/OP1");
            then.status(200).json_body(json!({
                "name": "projects/my-project/operations/OP1",
                "done": true,
                "metadata": {
                    "state": "SUCCEEDED",
                    "description": "NDVI_2020-01-01_2020-02-01",
                    "destinationUris": ["https://drive.google.com/#folders/abc"]
                }
            }));
        })
        .await;

    let ee = client(&server);
    let request = ExportImageRequest::to_drive(
        Expression::new(ImageCollection::load("X").median().value()),
        "NDVI_2020-01-01_2020-02-01",
        "GEE",
        "EPSG:4326",
    );
    let op = ee.export_image(&request).await.unwrap();
    assert_eq!(op.state(), OperationState::Running);

    let done = ee.wait_for_operation(op).await.unwrap();
    assert_eq!(done.state(), OperationState::Succeeded);
    start.assert_async().await;
    poll.assert_hits_async(1).await;
}

#[tokio::test]
async fn failed_export_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/projects/my-project/operations/OP2");
            then.status(200).json_body(json!({
                "name": "projects/my-project/operations/OP2",
                "done": true,
                "metadata": {"state": "FAILED", "description": "NBR_2020-01-01_2020-02-01"},
                "error": {"code": 3, "message": "Too many pixels in the region."}
            }));
        })
        .await;

    let ee = client(&server);
    let pending = ee
        .get_operation("projects/my-project/operations/OP2")
        .await
        .unwrap();
    let err = ee.wait_for_operation(pending).await.unwrap_err();
    match err {
        CloudError::TaskFailed {
            name,
            state,
            message,
        } => {
            assert_eq!(name, "NBR_2020-01-01_2020-02-01");
            assert_eq!(state, "FAILED");
            assert_eq!(message, "Too many pixels in the region.");
        }
        other => panic!("unexpected error: {other}"),
    }
}
