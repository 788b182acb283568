mod support;

use std::net::SocketAddr;
use std::sync::Arc;
use image::{Rgb, RgbImage};
use yolo_demo::annotate::Annotator;
use yolo_demo::common::{AppConfig, ModelVariant};
use yolo_demo::handler::encode_png;
use yolo_demo::web::{self, pages::count_result_rows, AppState};
use support::{dog_and_person, FakeProvider};

const BOUNDARY: &str = "----yolo-demo-test";

async fn spawn_server(provider: FakeProvider) -> SocketAddr {
    let state = AppState::new(&AppConfig::default(), Arc::new(provider), Annotator::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, web::router(state)).await.unwrap();
    });
    addr
}

fn multipart(file_name: &str, file: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\n\
Content-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn post(url: String, body: Vec<u8>) -> (u16, String) {
    let response = ureq::post(&url)
        .set("Content-Type", &format!("multipart/form-data; boundary={BOUNDARY}"))
        .send_bytes(&body);
    match response {
        Ok(r) => (r.status(), r.into_string().unwrap()),
        Err(ureq::Error::Status(code, r)) => (code, r.into_string().unwrap()),
        Err(e) => panic!("request failed: {e}"),
    }
}

fn black_png() -> Vec<u8> {
    encode_png(&RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]))).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn advanced_page_offers_every_model() {
    let addr = spawn_server(FakeProvider::returning(vec![])).await;

    let html = tokio::task::spawn_blocking(move || {
        ureq::get(&format!("http://{addr}/advanced")).call().unwrap().into_string().unwrap()
    })
    .await
    .unwrap();

    for variant in ModelVariant::ALL {
        assert!(html.contains(variant.display_name()));
    }
    assert!(html.contains("name=\"threshold\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn advanced_upload_renders_table_and_download() {
    let addr = spawn_server(FakeProvider::returning(dog_and_person())).await;
    let body = multipart(
        "street.png",
        &black_png(),
        &[("model", "yolov8s"), ("threshold", "0.1"), ("show_labels", "on")],
    );

    let (status, html) = tokio::task::spawn_blocking(move || post(format!("http://{addr}/advanced/detect"), body))
        .await
        .unwrap();

    assert_eq!(status, 200);
    assert_eq!(count_result_rows(&html), 2);
    assert!(html.contains("download=\"detected_street.png\""));
    assert!(html.contains("YOLOv8s"));

    // the form comes back with what was submitted, not the configured defaults
    assert!(html.contains("<option value=\"yolov8s\" selected>"));
    assert!(!html.contains("<option value=\"yolov8n\" selected>"));
    assert!(html.contains("name=\"threshold\" min=\"0\" max=\"1\" step=\"0.05\" value=\"0.10\""));
    assert!(html.contains("name=\"show_labels\" value=\"on\" checked"));
    assert!(!html.contains("name=\"show_conf\" value=\"on\" checked"));
}

#[test]
fn missing_runtime_library_fails_startup_without_panicking() {
    let weights = tempfile::tempdir().unwrap();
    let config = AppConfig {
        ort_lib_path: "/nonexistent/libonnxruntime.so".to_string(),
        weights_dir: Some(weights.path().to_path_buf()),
        ..AppConfig::default()
    };

    match yolo_demo::build_app_state(&config) {
        Ok(_) => panic!("startup should fail without the runtime library"),
        Err(e) => assert!(e.to_string().contains("ONNX Runtime library not found")),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unsupported_upload_is_rejected_before_detection() {
    let addr = spawn_server(FakeProvider::returning(dog_and_person())).await;
    let body = multipart("clip.gif", b"GIF89a", &[]);

    let (status, html) = tokio::task::spawn_blocking(move || post(format!("http://{addr}/detect"), body))
        .await
        .unwrap();

    assert_eq!(status, 400);
    assert!(html.contains("clip.gif is not a supported image"));
    assert_eq!(count_result_rows(&html), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_detection_is_a_server_error_with_hint() {
    let addr = spawn_server(FakeProvider::failing("connection reset")).await;
    let body = multipart("street.png", &black_png(), &[]);

    let (status, html) = tokio::task::spawn_blocking(move || post(format!("http://{addr}/detect"), body))
        .await
        .unwrap();

    assert_eq!(status, 500);
    assert!(html.contains("Detection failed: connection reset"));
    assert!(html.contains("Check your network connection"));
}
