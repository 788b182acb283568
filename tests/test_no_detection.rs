mod support;

use std::time::Instant;
use image::{DynamicImage, Rgb, RgbImage};
use yolo_demo::annotate::Annotator;
use yolo_demo::common::{AppConfig, ModelVariant};
use yolo_demo::handler::{self, DetectionOutcome};
use yolo_demo::web::pages::{self, count_result_rows, NO_OBJECTS};
use support::{dog_and_person, original, request, FakeProvider, DEFAULTS};

#[test]
fn threshold_above_every_confidence_finds_nothing() {
    let provider = FakeProvider::returning(dog_and_person());
    let outcome = handler::handle(request(0.95), &provider, &Annotator::default());

    let result = match &outcome {
        DetectionOutcome::NoObjects(result) => result,
        other => panic!("expected no objects, got {other:?}"),
    };
    assert_eq!(result.object_count(), 0);
    assert_eq!(result.threshold_used(), "0.95");

    let html = pages::render_advanced_result(&DEFAULTS, &original(), &outcome);
    assert!(html.contains(NO_OBJECTS));
    assert!(!html.contains("<table"));
    assert!(!html.contains("download="));
    assert_eq!(count_result_rows(&html), 0);
}

#[test]
fn minimal_page_reports_no_objects() {
    let provider = FakeProvider::returning(vec![]);
    let outcome = handler::handle(request(0.25), &provider, &Annotator::default());
    assert!(matches!(outcome, DetectionOutcome::NoObjects(_)));

    let html = pages::render_minimal_result(&DEFAULTS, &original(), &outcome);
    assert!(html.contains(NO_OBJECTS));
    assert!(html.contains("Inference Time: "));
    assert!(!html.contains("download="));
}

#[test]
fn minimal_page_with_detections_has_no_empty_notice() {
    let provider = FakeProvider::returning(dog_and_person());
    let outcome = handler::handle(request(0.25), &provider, &Annotator::default());

    let html = pages::render_minimal_result(&DEFAULTS, &original(), &outcome);
    assert!(!html.contains(NO_OBJECTS));
}

#[test]
fn empty_result_still_returns_the_unmarked_image() {
    let provider = FakeProvider::returning(vec![]);
    let req = request(0.25);
    let source = req.image.to_rgb8();

    let outcome = handler::handle(req, &provider, &Annotator::default());
    assert!(matches!(outcome, DetectionOutcome::NoObjects(_)));
    assert_eq!(outcome.result().unwrap().annotated, source);
}

/// Needs a real ONNX Runtime library and network access (or a primed weights dir):
/// `YOLO_DEMO_ORT_LIB=/path/to/libonnxruntime.so cargo test -- --ignored`
#[test]
#[ignore]
fn blank_image_has_no_detections() {
    let Ok(ort_lib) = std::env::var("YOLO_DEMO_ORT_LIB") else {
        eprintln!("YOLO_DEMO_ORT_LIB not set, skipping");
        return;
    };
    let loop_count: u32 = 3;

    let config = AppConfig {
        ort_lib_path: ort_lib,
        weights_dir: std::env::var_os("YOLO_DEMO_WEIGHTS_DIR").map(Into::into),
        model_base_url: std::env::var("YOLO_DEMO_MODEL_BASE_URL").ok(),
        ..AppConfig::default()
    };
    let image = DynamicImage::from(RgbImage::from_pixel(640, 480, Rgb([255, 255, 255])));

    let mut yolo = yolo_demo::init_detector(&config, ModelVariant::YoloV8n)
        .expect("Failed to initialize YOLO model");

    let now = Instant::now();
    let mut elapsed = now.elapsed();
    for count in 0..loop_count {
        let detections = yolo_demo::run_detection(&mut yolo, &image, config.conf_threshold).unwrap();
        assert!(detections.is_empty());

        println!("TIME | Total={:.2?} | {}th detection={:.2?}", now.elapsed(), count, now.elapsed() - elapsed);
        elapsed = now.elapsed();
    }
}
