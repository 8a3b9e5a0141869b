//! HTTP-level tests for the extract and health endpoints

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{Rgb, RgbImage};
use serde_json::{json, Value};
use tokio::sync::watch;
use tower::ServiceExt;

use region_extract_server::config::{Config, CropFormat};
use region_extract_server::error::StorageError;
use region_extract_server::extract::{Extractor, ImageExtractor, TextExtractor};
use region_extract_server::ocr::{
    JobPoll, JobRunner, JobStatus, OcrEngine, OcrError, OcrResultStore, OcrToken, PollPolicy,
    Sleeper,
};
use region_extract_server::geometry::NormalizedRect;
use region_extract_server::render::{PageRenderer, RenderError};
use region_extract_server::routes;
use region_extract_server::state::AppState;
use region_extract_server::storage::{ObjectLocation, ObjectStore};

#[derive(Default)]
struct Objects(HashMap<ObjectLocation, Vec<u8>>);

#[async_trait]
impl ObjectStore for Objects {
    async fn get_bytes(&self, location: &ObjectLocation) -> Result<Vec<u8>, StorageError> {
        self.0
            .get(location)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: location.bucket.clone(),
                key: location.key.clone(),
            })
    }
}

struct Engine {
    polls: Mutex<VecDeque<JobPoll>>,
}

#[async_trait]
impl OcrEngine for Engine {
    async fn start_text_detection(&self, _document: &ObjectLocation) -> Result<String, OcrError> {
        Ok("job-42".to_string())
    }

    async fn get_text_detection(&self, _job_id: &str) -> Result<JobPoll, OcrError> {
        Ok(self
            .polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(JobPoll::in_progress))
    }
}

/// One-page document rendered as a white page with a black top-left quarter
struct QuarterRenderer;

#[async_trait]
impl PageRenderer for QuarterRenderer {
    async fn render_page(
        &self,
        _document: Vec<u8>,
        page_index: usize,
        _scale: f32,
    ) -> Result<RgbImage, RenderError> {
        if page_index > 0 {
            return Err(RenderError::PageOutOfRange {
                page: page_index + 1,
                page_count: 1,
            });
        }
        Ok(RgbImage::from_fn(400, 800, |x, y| {
            if x < 200 && y < 400 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }))
    }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

const STORED_OCR: &str = r#"[
    {"BlockType": "PAGE", "Page": 1, "Geometry": {"BoundingBox": {"Left": 0, "Top": 0, "Width": 1, "Height": 1}}},
    {"BlockType": "LINE", "Text": "Hello World", "Page": 1, "Geometry": {"BoundingBox": {"Left": 0.1, "Top": 0.1, "Width": 0.5, "Height": 0.05}}},
    {"BlockType": "WORD", "Text": "Hello", "Page": 1, "Confidence": 99.1, "Geometry": {"BoundingBox": {"Left": 0.1, "Top": 0.1, "Width": 0.1, "Height": 0.05}}},
    {"BlockType": "WORD", "Text": "World", "Page": 1, "Confidence": 98.7, "Geometry": {"BoundingBox": {"Left": 0.3, "Top": 0.1, "Width": 0.1, "Height": 0.05}}}
]"#;

fn app_with(polls: Vec<JobPoll>) -> axum::Router {
    let mut objects = Objects::default();
    objects
        .0
        .insert(ObjectLocation::new("docs", "invoice.pdf"), b"%PDF-1.4".to_vec());
    objects
        .0
        .insert(ObjectLocation::new("docs", "invoice.json"), STORED_OCR.as_bytes().to_vec());
    let storage: Arc<dyn ObjectStore> = Arc::new(objects);

    let engine = Arc::new(Engine {
        polls: Mutex::new(polls.into()),
    });
    let jobs = JobRunner::new(engine, PollPolicy::default()).with_sleeper(Arc::new(NoSleep));

    let text = TextExtractor::new(OcrResultStore::new(storage.clone()), jobs);
    let image = ImageExtractor::new(storage, Arc::new(QuarterRenderer), 2.0, CropFormat::Png);

    // Keep the sender alive for the lifetime of the process so requests never see shutdown
    let (tx, rx) = watch::channel(false);
    std::mem::forget(tx);

    let state = AppState::new(Config::default(), Extractor::new(text, image), rx);
    routes::app(state)
}

fn server_with(polls: Vec<JobPoll>) -> TestServer {
    TestServer::new(app_with(polls)).unwrap()
}

fn server() -> TestServer {
    server_with(Vec::new())
}

fn text_request() -> Value {
    json!({
        "bucket": "docs",
        "documentKey": "invoice.pdf",
        "ocrDocumentKey": "invoice.json",
        "getOcrFromS3": true,
        "pageNumber": 1,
        "x": 0.0,
        "y": 0.0,
        "width": 0.25,
        "height": 0.25,
        "type": "TEXT"
    })
}

#[tokio::test]
async fn test_health_check() {
    let response = server().get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "region-extract-server");
}

#[tokio::test]
async fn test_extract_text_from_stored_ocr() {
    let response = server()
        .post("/textract/extract")
        .json(&text_request())
        .await;

    response.assert_status_ok();
    response.assert_text("Hello");
}

#[tokio::test]
async fn test_extract_text_whole_page() {
    let mut request = text_request();
    request["width"] = json!(1.0);
    request["height"] = json!(1.0);

    let response = server().post("/textract/extract").json(&request).await;

    response.assert_status_ok();
    response.assert_text("Hello World");
}

#[tokio::test]
async fn test_output_type_is_case_insensitive() {
    let mut request = text_request();
    request["type"] = json!("text");

    let response = server().post("/textract/extract").json(&request).await;

    response.assert_status_ok();
    response.assert_text("Hello");
}

#[tokio::test]
async fn test_extract_image_crop() {
    let mut request = text_request();
    request["type"] = json!("IMAGE");
    request["width"] = json!(0.5);
    request["height"] = json!(0.5);

    let response = server().post("/textract/extract").json(&request).await;

    response.assert_status_ok();
    let bytes = BASE64.decode(response.text()).unwrap();
    let crop = image::load_from_memory(&bytes).unwrap().to_rgb8();
    assert_eq!(crop.dimensions(), (200, 400));
    assert_eq!(crop.get_pixel(0, 0), &Rgb([0, 0, 0]));
    assert_eq!(crop.get_pixel(199, 399), &Rgb([0, 0, 0]));
}

#[tokio::test]
async fn test_extract_text_with_detection_job() {
    let words = vec![
        OcrToken::word("Total", 1, NormalizedRect::new(0.05, 0.05, 0.1, 0.05)),
        OcrToken::word("Elsewhere", 1, NormalizedRect::new(0.7, 0.7, 0.1, 0.05)),
    ];
    let server = server_with(vec![
        JobPoll::in_progress(),
        JobPoll {
            status: JobStatus::Succeeded,
            tokens: words,
            message: None,
        },
    ]);

    let mut request = text_request();
    request["getOcrFromS3"] = json!(false);

    let response = server.post("/textract/extract").json(&request).await;

    response.assert_status_ok();
    response.assert_text("Total");
}

#[tokio::test]
async fn test_failed_detection_job_is_bad_gateway() {
    let server = server_with(vec![JobPoll {
        status: JobStatus::Failed,
        tokens: Vec::new(),
        message: Some("unsupported document".to_string()),
    }]);

    let mut request = text_request();
    request["getOcrFromS3"] = json!(false);

    let response = server
        .post("/textract/extract")
        .json(&request)
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"], "ocr_job_failed");
}

#[tokio::test]
async fn test_unknown_output_type_is_rejected() {
    let mut request = text_request();
    request["type"] = json!("TABLE");

    let response = server()
        .post("/textract/extract")
        .json(&request)
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_page_zero_is_rejected() {
    let mut request = text_request();
    request["pageNumber"] = json!(0);

    let response = server()
        .post("/textract/extract")
        .json(&request)
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_image_page_out_of_range() {
    let mut request = text_request();
    request["type"] = json!("IMAGE");
    request["pageNumber"] = json!(3);

    let response = server()
        .post("/textract/extract")
        .json(&request)
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "page_out_of_range");
}

#[tokio::test]
async fn test_missing_stored_ocr_is_not_found() {
    let mut request = text_request();
    request["ocrDocumentKey"] = json!("missing.json");

    let response = server()
        .post("/textract/extract")
        .json(&request)
        .expect_failure()
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_text_response_is_plain_text() {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/textract/extract")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(text_request().to_string()))
        .unwrap();

    let response = app_with(Vec::new()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Hello");
}

#[tokio::test]
async fn test_missing_bucket_is_json_bad_request() {
    let response = server()
        .post("/textract/extract")
        .json(&json!({ "documentKey": "invoice.pdf", "pageNumber": 1, "type": "TEXT" }))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("bucket"));
}

#[tokio::test]
async fn test_non_integer_page_is_json_bad_request() {
    let mut request = text_request();
    request["pageNumber"] = json!("first");

    let response = server()
        .post("/textract/extract")
        .json(&request)
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_body_without_json_content_type_is_json_bad_request() {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/textract/extract")
        .body(axum::body::Body::from(text_request().to_string()))
        .unwrap();

    let response = app_with(Vec::new()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "bad_request");
}
