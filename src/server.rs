//! HTTP transport layer.
//!
//! One upload endpoint: a multipart file comes in, a classified and
//! extracted document record goes out. The pipeline itself is blocking
//! (blocking HTTP client, CPU-bound rasterization and preprocessing), so
//! each request hops to the blocking worker pool; independent requests
//! stay fully concurrent.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::context::AppContext;
use crate::pipeline::{ExtractedDocument, ScanOutcome};

/// Max accepted upload size. Multipart framing overhead rides on top of
/// the 50 MB file cap enforced by image decoding.
const MAX_BODY_BYTES: usize = 55 * 1024 * 1024;

/// Wire shape of the `/api/ocr` response.
#[derive(Debug, Serialize)]
pub struct OcrResponse {
    pub name: String,
    pub document: Option<ExtractedDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Structured soft-error info ("Missing Data"), not a transport failure.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub error: String,
    pub message: Option<String>,
}

/// Sanitize a client-supplied filename before echoing it back.
///
/// Removes path separators and null bytes, replaces other special
/// characters, strips `..` sequences and caps the length. An empty result
/// falls back to "document".
fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|&c| c != '/' && c != '\\' && c != '\0')
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = sanitized.replace("..", "");
    let sanitized: String = sanitized.chars().take(100).collect();

    if sanitized.is_empty() {
        "document".into()
    } else {
        sanitized
    }
}

/// Build the application router.
pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/ocr", post(handle_ocr))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(context)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the OCR API!" }))
}

/// Transport-level failure: anything escaping the fail-soft layers becomes
/// a single generic 500 with a message, no partial results.
fn transport_failure(message: String) -> Response {
    error!(message = %message, "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": message })),
    )
        .into_response()
}

async fn handle_ocr(
    State(context): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Response {
    // First field carrying a file wins; the upload holds a single file.
    let (filename, declared_mime, bytes) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.file_name().is_none() && field.name() != Some("file") {
                    continue;
                }
                let filename = field
                    .file_name()
                    .map(sanitize_filename)
                    .unwrap_or_else(|| "document".to_string());
                let declared_mime = field.content_type().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => break (filename, declared_mime, bytes),
                    Err(e) => return transport_failure(format!("Failed to read upload: {e}")),
                }
            }
            Ok(None) => return transport_failure("No file field in multipart body".into()),
            Err(e) => return transport_failure(format!("Malformed multipart body: {e}")),
        }
    };

    info!(name = %filename, size = bytes.len(), "Received upload");

    let pipeline = context.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        pipeline.process(&bytes, declared_mime.as_deref())
    })
    .await;

    let outcome = match outcome {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return transport_failure(e.to_string()),
        Err(e) => return transport_failure(format!("Pipeline task panicked: {e}")),
    };

    let response = match outcome {
        ScanOutcome::Document(document) => OcrResponse {
            name: filename,
            document: Some(document),
            error: None,
        },
        ScanOutcome::MissingData { message } => OcrResponse {
            name: filename,
            document: None,
            error: Some(ErrorInfo {
                error: "Missing Data".into(),
                message: Some(message),
            }),
        },
    };

    Json(response).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::pdf::PageRasterizer;
    use crate::acquire::{AcquireError, PdfTextAcquirer, TextAcquirer};
    use crate::config::Settings;
    use crate::inference::openai::MockChatClient;
    use crate::inference::ChatClient;
    use crate::pipeline::{
        DocumentPipeline, ExtractionOptions, SchemaExtractor, TypeClassifier,
    };
    use crate::registry::builtin_registry;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    struct FixedAcquirer(String);

    impl TextAcquirer for FixedAcquirer {
        fn acquire_image(&self, _: &[u8]) -> String {
            self.0.clone()
        }
    }

    struct OnePageRasterizer;

    impl PageRasterizer for OnePageRasterizer {
        fn rasterize(&self, _: &[u8], _: u32) -> Result<Vec<Vec<u8>>, AcquireError> {
            Ok(vec![Vec::new()])
        }
    }

    fn test_router(client: Arc<dyn ChatClient>, acquired_text: &str) -> Router {
        let registry = Arc::new(builtin_registry().unwrap());
        let image_acquirer: Arc<dyn TextAcquirer> = Arc::new(FixedAcquirer(acquired_text.into()));
        let pipeline = Arc::new(DocumentPipeline::new(
            registry,
            image_acquirer.clone(),
            PdfTextAcquirer::new(Arc::new(OnePageRasterizer), image_acquirer, 200),
            TypeClassifier::new(client.clone()),
            SchemaExtractor::new(client),
            ExtractionOptions {
                language: "en".into(),
                translate: false,
            },
        ));
        router(crate::context::AppContext::with_pipeline(
            Settings::for_tests(),
            pipeline,
        ))
    }

    fn multipart_body(filename: &str, content_type: &str, payload: &[u8]) -> (String, Vec<u8>) {
        let boundary = "test-boundary-42";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (
            format!("multipart/form-data; boundary={boundary}"),
            body,
        )
    }

    async fn post_file(
        app: Router,
        filename: &str,
        content_type: &str,
        payload: &[u8],
    ) -> (StatusCode, Value) {
        let (mime, body) = multipart_body(filename, content_type, payload);
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/ocr")
                    .header("content-type", mime)
                    .body(axum::body::Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn root_returns_welcome() {
        let app = test_router(
            Arc::new(MockChatClient::structured(json!({"type": null}))),
            "",
        );
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["message"], "Welcome to the OCR API!");
    }

    #[tokio::test]
    async fn receipt_upload_returns_document() {
        let client = Arc::new(MockChatClient::scripted(vec![
            json!({"type": "Receipt"}),
            json!({
                "type": "Receipt",
                "details": {
                    "items": ["Espresso | 2 | 2.50 | 5.00", "Muffin | 1 | 3.00 | 3.00"],
                    "subtotal": 8.00,
                    "total_amount": 8.64
                }
            }),
        ]));
        let app = test_router(client, "CORNER CAFE receipt text");

        let (status, value) =
            post_file(app, "receipt.jpg", "image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["name"], "receipt.jpg");
        assert_eq!(value["document"]["type"], "Receipt");
        assert_eq!(value["document"]["details"]["items"].as_array().unwrap().len(), 2);
        assert!(value.get("error").is_none());
    }

    #[tokio::test]
    async fn empty_pdf_yields_missing_data_not_500() {
        // Pages decode to nothing usable; classifier reports no type.
        let client = Arc::new(MockChatClient::structured(json!({"type": null})));
        let app = test_router(client, "");

        let (status, value) = post_file(app, "scan.pdf", "application/pdf", b"%PDF-1.4").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["name"], "scan.pdf");
        assert!(value["document"].is_null());
        assert_eq!(value["error"]["error"], "Missing Data");
    }

    #[tokio::test]
    async fn unsupported_media_is_transport_failure() {
        let client = Arc::new(MockChatClient::structured(json!({"type": null})));
        let app = test_router(client, "");

        let (status, value) = post_file(app, "page.html", "text/html", b"<html></html>").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(value["detail"]
            .as_str()
            .unwrap()
            .contains("Unsupported media type"));
    }

    #[tokio::test]
    async fn missing_file_field_is_transport_failure() {
        let client = Arc::new(MockChatClient::structured(json!({"type": null})));
        let app = test_router(client, "");

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/ocr")
                    .header(
                        "content-type",
                        "multipart/form-data; boundary=empty-boundary",
                    )
                    .body(axum::body::Body::from("--empty-boundary--\r\n"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn sanitize_keeps_ordinary_names() {
        assert_eq!(sanitize_filename("receipt.jpg"), "receipt.jpg");
        assert_eq!(sanitize_filename("scan_2024-03-01.pdf"), "scan_2024-03-01.pdf");
    }

    #[test]
    fn sanitize_strips_path_traversal() {
        let sanitized = sanitize_filename("../../etc/passwd");
        assert!(!sanitized.contains(".."));
        assert!(!sanitized.contains('/'));
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
    }

    #[test]
    fn sanitize_replaces_special_characters() {
        assert_eq!(sanitize_filename("my file (1).pdf"), "my_file__1_.pdf");
        assert_eq!(sanitize_filename("a\0b.png"), "ab.png");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "x".repeat(300);
        assert_eq!(sanitize_filename(&long).chars().count(), 100);
    }

    #[test]
    fn sanitize_empty_falls_back_to_document() {
        assert_eq!(sanitize_filename(""), "document");
        assert_eq!(sanitize_filename("///"), "document");
    }

    #[tokio::test]
    async fn traversal_filename_is_sanitized_in_response() {
        let client = Arc::new(MockChatClient::structured(json!({"type": null})));
        let app = test_router(client, "");

        let (status, value) =
            post_file(app, "../../etc/passwd.pdf", "application/pdf", b"%PDF-1.4").await;

        assert_eq!(status, StatusCode::OK);
        let name = value["name"].as_str().unwrap();
        assert!(!name.contains(".."));
        assert!(!name.contains('/'));
    }

    #[tokio::test]
    async fn upload_without_filename_defaults_name() {
        let client = Arc::new(MockChatClient::structured(json!({"type": null})));
        let app = test_router(client, "");

        let boundary = "b42";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"\r\n\
             Content-Type: application/pdf\r\n\r\n%PDF-1.4\r\n--{boundary}--\r\n"
        );
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/ocr")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(axum::body::Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["name"], "document");
    }
}
