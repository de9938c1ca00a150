//! Functional tests for the remote engine against a mock inference server

use diffusion_gateway::{
    config::{EngineConfig, EngineKind},
    engine::{self, GeneratedImage},
    gateway::GenerationGateway,
    response::png,
    AppError,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::request;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = GeneratedImage::from_raw(width, height, vec![40; (width * height * 3) as usize]).unwrap();
    png::encode(&image).unwrap()
}

async fn remote_gateway(server: &MockServer) -> GenerationGateway {
    let config = EngineConfig {
        kind: EngineKind::Remote,
        endpoint: Some(server.uri()),
        timeout_ms: 5000,
        ..EngineConfig::default()
    };
    GenerationGateway::start(move || engine::build(&config)).await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_raw_png_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate/"))
        .and(body_partial_json(json!({
            "prompt": "a red circle",
            "width": 64,
            "height": 64,
            "model": "runwayml/stable-diffusion-v1-5"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png_bytes(64, 64), "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = remote_gateway(&server).await;
    assert_eq!(gateway.engine_name(), "remote");

    let image = gateway.generate(request("a red circle")).await.unwrap();
    assert_eq!((image.width(), image.height()), (64, 64));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_base64_json_response() {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let server = MockServer::start().await;
    let encoded = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(64, 64)));
    Mock::given(method("POST"))
        .and(path("/generate/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "b64_json": encoded }]
        })))
        .mount(&server)
        .await;

    let gateway = remote_gateway(&server).await;
    let image = gateway.generate(request("a red circle")).await.unwrap();
    assert_eq!(image.width(), 64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_server_error_is_engine_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("out of memory"))
        .mount(&server)
        .await;

    let gateway = remote_gateway(&server).await;
    let err = gateway.generate(request("a red circle")).await.unwrap_err();

    assert!(matches!(err, AppError::Engine(_)));
    assert!(err.to_string().contains("out of memory"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_dimension_mismatch_is_engine_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png_bytes(32, 32), "image/png"))
        .mount(&server)
        .await;

    let gateway = remote_gateway(&server).await;
    let err = gateway.generate(request("a red circle")).await.unwrap_err();

    assert!(err.to_string().contains("expected 64x64"));
}
