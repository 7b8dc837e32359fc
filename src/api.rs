// HTTP surface. Kept thin: every analysis goes through NutritionHandler.
#[cfg(feature = "http-server")]
pub mod server {
    use axum::{
        extract::{DefaultBodyLimit, Multipart, State},
        http::{header, HeaderValue, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower_http::services::ServeDir;

    use crate::errors::NutritionError;
    use crate::handlers::NutritionHandler;
    use crate::models::{AnalysisRequest, ScanMode, ServiceResponse};

    /// Requests carry photos, inline or as multipart uploads.
    const MAX_BODY_BYTES: usize = 15 * 1024 * 1024;

    pub struct AppState {
        pub handler: Arc<NutritionHandler>,
        pub uploads_dir: PathBuf,
        pub base_url: String,
        pub google_api_configured: bool,
        pub environment: &'static str,
    }

    pub fn create_router(state: Arc<AppState>) -> Router {
        let uploads = ServeDir::new(&state.uploads_dir);

        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_check))
            .route("/nutrition/get", post(analyze_handler))
            .route("/nutrition/description", post(describe_handler))
            .route("/upload/image", post(upload_handler))
            .nest_service("/uploads", uploads)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(state)
    }

    impl IntoResponse for NutritionError {
        fn into_response(self) -> Response {
            let status =
                StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let mut response =
                (status, Json(json!({ "error": self.to_body() }))).into_response();

            if let Some(seconds) = self.retry_after() {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
            }
            response
        }
    }

    impl IntoResponse for ServiceResponse {
        fn into_response(self) -> Response {
            let status =
                StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(self)).into_response()
        }
    }

    async fn analyze_handler(
        State(state): State<Arc<AppState>>,
        Json(request): Json<AnalysisRequest>,
    ) -> Result<ServiceResponse, NutritionError> {
        state.handler.analyze(&request).await
    }

    async fn describe_handler(
        State(state): State<Arc<AppState>>,
        Json(mut request): Json<AnalysisRequest>,
    ) -> Result<ServiceResponse, NutritionError> {
        request.scan_mode = ScanMode::Description;
        state.handler.analyze(&request).await
    }

    fn upload_failed(detail: impl std::fmt::Display) -> NutritionError {
        NutritionError::ImageProcessing(format!("Upload failed: {}", detail))
    }

    async fn upload_handler(
        State(state): State<Arc<AppState>>,
        mut multipart: Multipart,
    ) -> Result<Json<serde_json::Value>, NutritionError> {
        while let Some(field) = multipart.next_field().await.map_err(upload_failed)? {
            if field.name() != Some("image") {
                continue;
            }

            let extension = field
                .file_name()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
                .unwrap_or_else(|| "jpg".to_string());
            let data = field.bytes().await.map_err(upload_failed)?;

            let filename = format!("{}.{}", uuid::Uuid::new_v4(), extension);
            tokio::fs::create_dir_all(&state.uploads_dir)
                .await
                .map_err(upload_failed)?;
            tokio::fs::write(state.uploads_dir.join(&filename), &data)
                .await
                .map_err(upload_failed)?;
            log::info!("💾 Stored upload {} ({} bytes)", filename, data.len());

            return Ok(Json(json!({
                "success": true,
                "imageUrl": format!("{}/uploads/{}", state.base_url, filename),
                "filename": filename,
            })));
        }

        Err(NutritionError::validation(
            "No image field in upload.",
            "image",
            Some("Send the photo as a multipart field named 'image'."),
        ))
    }

    async fn root_handler() -> Json<serde_json::Value> {
        Json(json!({
            "status": "healthy",
            "service": "CalAI Nutrition API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "nutrition_image": "/nutrition/get",
                "nutrition_description": "/nutrition/description",
                "upload_image": "/upload/image",
                "health": "/health"
            }
        }))
    }

    async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
        Json(json!({
            "status": "healthy",
            "google_api_configured": state.google_api_configured,
            "environment": state.environment,
        }))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::services::{
            GeminiClient, ImageFetcher, NutritionPromptBuilder, OpenFoodFactsClient,
        };
        use axum::body::{to_bytes, Body};
        use axum::http::Request;
        use std::time::Duration;
        use tower::ServiceExt;

        fn app(uploads_dir: &std::path::Path) -> Router {
            let model = GeminiClient::new(
                None,
                "gemini-2.0-flash".to_string(),
                "http://127.0.0.1:1".to_string(),
                Duration::from_secs(1),
            )
            .unwrap();
            let handler = NutritionHandler::new(
                Arc::new(model),
                Arc::new(OpenFoodFactsClient::new("http://127.0.0.1:1").unwrap()),
                Arc::new(NutritionPromptBuilder),
                ImageFetcher::new(uploads_dir).unwrap(),
            );

            create_router(Arc::new(AppState {
                handler: Arc::new(handler),
                uploads_dir: uploads_dir.to_path_buf(),
                base_url: "http://localhost:8000".to_string(),
                google_api_configured: false,
                environment: "development",
            }))
        }

        async fn json_body(response: Response) -> serde_json::Value {
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            serde_json::from_slice(&bytes).unwrap()
        }

        fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        }

        #[tokio::test]
        async fn test_health() {
            let dir = tempfile::tempdir().unwrap();
            let response = app(dir.path())
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["google_api_configured"], false);
            assert_eq!(body["environment"], "development");
        }

        #[tokio::test]
        async fn test_validation_error_payload() {
            let dir = tempfile::tempdir().unwrap();
            let response = app(dir.path())
                .oneshot(post_json("/nutrition/get", json!({"scanMode": "barcode"})))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = json_body(response).await;
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
            assert_eq!(body["error"]["field"], "imageUrl");
            assert!(body["error"]["suggestion"].is_string());
        }

        #[tokio::test]
        async fn test_unconfigured_model_is_configuration_error() {
            let dir = tempfile::tempdir().unwrap();
            let response = app(dir.path())
                .oneshot(post_json(
                    "/nutrition/description",
                    json!({"food_description": "two boiled eggs", "scanMode": "image"}),
                ))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body = json_body(response).await;
            assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
        }

        #[tokio::test]
        async fn test_upload_then_serve() {
            let dir = tempfile::tempdir().unwrap();
            let boundary = "XBOUNDARYX";
            let body = format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"meal.PNG\"\r\nContent-Type: image/png\r\n\r\nfakepng\r\n--{b}--\r\n",
                b = boundary
            );
            let request = Request::builder()
                .method("POST")
                .uri("/upload/image")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap();

            let response = app(dir.path()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let body = json_body(response).await;
            let filename = body["filename"].as_str().unwrap().to_string();
            assert!(filename.ends_with(".png"));
            assert_eq!(
                body["imageUrl"],
                format!("http://localhost:8000/uploads/{}", filename)
            );
            assert_eq!(
                std::fs::read(dir.path().join(&filename)).unwrap(),
                b"fakepng".to_vec()
            );

            let response = app(dir.path())
                .oneshot(
                    Request::builder()
                        .uri(format!("/uploads/{}", filename))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn test_rate_limit_sets_retry_after() {
            let err = NutritionError::from(crate::services::model::ModelError::RateLimited(
                "quota".to_string(),
            ));
            let response = err.into_response();

            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(response.headers()[header::RETRY_AFTER], "60");
        }
    }
}
