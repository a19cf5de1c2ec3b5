use crate::metrics::{self, metrics_middleware, render_metrics};
use crate::render::Rendered;
use crate::service::Upload;
use crate::state::AppState;
use crate::views::VerifyPage;
use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use certdesk_common::validation::CertificateForm;
use certdesk_common::{CertdeskError, CertificateRecord, Language, VerificationOutcome, verify};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

type ApiResult<T> = std::result::Result<T, CertdeskError>;

pub fn router(state: AppState) -> axum::Router {
    let mut app: axum::Router<AppState> = axum::Router::new()
        .route("/verify", get(verify_page))
        .route("/api/v1/verify", get(verify_json))
        .route("/api/v1/generate-certificate", get(generate_certificate))
        .route(
            "/api/v1/certificates",
            get(list_certificates).post(create_certificate),
        )
        .route(
            "/api/v1/certificates/{id}",
            get(get_certificate)
                .patch(update_certificate)
                .delete(delete_certificate),
        )
        .route("/api/v1/metrics", get(get_metrics));

    if let Some((bucket, dir)) = &state.blob_files {
        app = app.nest_service(&format!("/files/{}", bucket), ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Record as returned by the admin API, with its public verification link.
#[derive(Debug, Serialize)]
struct CertificateView {
    #[serde(flatten)]
    certificate: CertificateRecord,
    verification_url: String,
}

impl CertificateView {
    fn new(state: &AppState, certificate: CertificateRecord) -> Self {
        let verification_url = state.verification_url(&certificate.id);
        Self {
            certificate,
            verification_url,
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdatedCertificate {
    certificate: CertificateView,
    certificates: Vec<CertificateView>,
}

#[derive(Debug, Default, Deserialize)]
struct VerifyParams {
    code: Option<String>,
    lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateParams {
    id: Option<String>,
}

async fn verify_page(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Html<String> {
    let language = Language::from_code_or(params.lang.as_deref(), state.default_language);

    // The panel only appears once a code has been submitted, even an empty one.
    let outcome = match params.code.as_deref() {
        Some(code) => {
            let outcome = verify(state.certificates.records().as_ref(), Some(code)).await;
            metrics::inc_verification(outcome.label());
            Some(outcome)
        }
        None => None,
    };

    Html(
        VerifyPage {
            language,
            code: params.code.as_deref(),
            outcome: outcome.as_ref(),
        }
        .render(),
    )
}

async fn verify_json(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Json<VerificationOutcome> {
    let outcome = verify(state.certificates.records().as_ref(), params.code.as_deref()).await;
    metrics::inc_verification(outcome.label());
    Json(outcome)
}

async fn generate_certificate(
    State(state): State<AppState>,
    Query(params): Query<GenerateParams>,
) -> ApiResult<Response> {
    let id = params
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CertdeskError::bad_request("certificate id is required"))?;
    let record = match state.certificates.records().get_by_id(id).await {
        Ok(Some(record)) => record,
        Ok(None) => return Err(CertdeskError::not_found(format!("certificate {}", id))),
        Err(err) => {
            warn!(certificate_id = %id, error = %err, "certificate lookup failed");
            return Err(CertdeskError::not_found(format!("certificate {}", id)));
        }
    };

    match state.renderer.render(&record).await? {
        Rendered::Redirect(url) => {
            metrics::inc_certificate_pdf("redirect");
            debug!(certificate_id = %record.id, "redirecting to stored pdf");
            Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
        }
        Rendered::Pdf(bytes) => {
            metrics::inc_certificate_pdf("synthesized");
            let disposition = format!("attachment; filename=\"certificate-{}.pdf\"", record.id);
            Ok((
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response())
        }
    }
}

async fn list_certificates(State(state): State<AppState>) -> ApiResult<Json<Vec<CertificateView>>> {
    let list = state.certificates.list().await?;
    Ok(Json(
        list.into_iter()
            .map(|record| CertificateView::new(&state, record))
            .collect(),
    ))
}

async fn get_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CertificateView>> {
    let record = state.certificates.get(&id).await?;
    Ok(Json(CertificateView::new(&state, record)))
}

async fn create_certificate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<CertificateView>> {
    let submission = read_submission(multipart).await?;
    let record = state
        .certificates
        .create(&submission.form, submission.pdf)
        .await?;
    Ok(Json(CertificateView::new(&state, record)))
}

async fn update_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<UpdatedCertificate>> {
    let submission = read_submission(multipart).await?;
    let (updated, all) = state
        .certificates
        .update(&id, &submission.form, submission.pdf, submission.delete_pdf)
        .await?;
    Ok(Json(UpdatedCertificate {
        certificate: CertificateView::new(&state, updated),
        certificates: all
            .into_iter()
            .map(|record| CertificateView::new(&state, record))
            .collect(),
    }))
}

async fn delete_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JsonValue>> {
    state.certificates.delete(&id).await?;
    Ok(Json(json!({"deleted": true})))
}

async fn get_metrics() -> Response {
    render_metrics()
}

/// Admin form as submitted: record fields, optional `pdf` file and the
/// `delete_pdf` checkbox.
#[derive(Debug, Default)]
struct Submission {
    form: CertificateForm,
    pdf: Option<Upload>,
    delete_pdf: bool,
}

async fn read_submission(mut multipart: Multipart) -> ApiResult<Submission> {
    let mut submission = Submission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CertdeskError::bad_request(format!("invalid multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "pdf" => {
                let filename = field.file_name().map(|s| s.to_string());
                let content_type = field
                    .content_type()
                    .unwrap_or("application/pdf")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| CertdeskError::bad_request(format!("invalid file: {}", e)))?;
                // An untouched file input is submitted as an empty part.
                if !bytes.is_empty() {
                    submission.pdf = Some(Upload {
                        filename,
                        content_type,
                        bytes,
                    });
                }
            }
            "delete_pdf" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| CertdeskError::bad_request(format!("invalid field: {}", e)))?;
                submission.delete_pdf = is_checked(&value);
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| CertdeskError::bad_request(format!("invalid field: {}", e)))?;
                if !submission.form.set(&name, value) {
                    debug!(field = %name, "ignoring unknown form field");
                }
            }
        }
    }

    Ok(submission)
}

fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{BlobStore, FilesystemBlobStore};
    use crate::render::CertificateRenderer;
    use crate::render::tests::blank_template;
    use crate::service::CertificateService;
    use crate::service::tests::FakeBlobStore;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use async_trait::async_trait;
    use certdesk_common::{
        CertificatePatch, CertificateStatus, ExpiryDate, MemoryRecordStore, RecordStore,
    };
    use chrono::{NaiveDate, NaiveTime};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "certdesk-test-boundary";

    struct Harness {
        records: Arc<MemoryRecordStore>,
        state: AppState,
        _dir: tempfile::TempDir,
    }

    fn harness_with(blobs: Arc<dyn BlobStore>, blob_files: Option<(String, PathBuf)>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.pdf");
        std::fs::write(&template, blank_template()).unwrap();

        let records = Arc::new(MemoryRecordStore::new());
        let certificates = CertificateService::new(records.clone(), blobs)
            .with_id_generator(|_, _| "6606202546AR".to_string());
        let state = AppState {
            certificates,
            renderer: Arc::new(CertificateRenderer::new(template)),
            public_base_url: "https://certs.example.com".to_string(),
            default_language: Language::En,
            blob_files,
            max_upload_bytes: 1024 * 1024,
        };
        Harness {
            records,
            state,
            _dir: dir,
        }
    }

    /// Every call fails as if the database connection dropped.
    struct UnreachableStore;

    #[async_trait]
    impl RecordStore for UnreachableStore {
        async fn get_by_id(&self, _id: &str) -> certdesk_common::Result<Option<CertificateRecord>> {
            Err(CertdeskError::storage("connection reset"))
        }

        async fn list_all(&self) -> certdesk_common::Result<Vec<CertificateRecord>> {
            Err(CertdeskError::storage("connection reset"))
        }

        async fn insert(&self, _record: CertificateRecord) -> certdesk_common::Result<CertificateRecord> {
            Err(CertdeskError::storage("connection reset"))
        }

        async fn update(
            &self,
            _id: &str,
            _patch: CertificatePatch,
        ) -> certdesk_common::Result<CertificateRecord> {
            Err(CertdeskError::storage("connection reset"))
        }

        async fn delete(&self, _id: &str) -> certdesk_common::Result<()> {
            Err(CertdeskError::storage("connection reset"))
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(FakeBlobStore::default()), None)
    }

    fn stored(id: &str, pdf_url: Option<&str>) -> CertificateRecord {
        CertificateRecord {
            id: id.to_string(),
            first_name: "Ana".to_string(),
            middle_name: None,
            paternal_last_name: "Ruiz".to_string(),
            maternal_last_name: None,
            certificate: "Data Literacy".to_string(),
            date_issued: NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            time_issued: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            expiry_date: ExpiryDate::Never,
            status: CertificateStatus::Valid,
            hours_quantity: 40,
            pdf_url: pdf_url.map(str::to_string),
        }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn multipart(
        method: &str,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, content)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"pdf\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    const NEW_FIELDS: &[(&str, &str)] = &[
        ("first_name", "Ana"),
        ("paternal_last_name", "Ruiz"),
        ("certificate", "Data Literacy"),
        ("date_issued", "2025-06-20"),
        ("time_issued", "14:30"),
        ("expiry_date", ""),
        ("hours_quantity", "40"),
    ];

    async fn json_body(response: Response) -> JsonValue {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn generate_certificate_requires_id() {
        let h = harness();
        for uri in [
            "/api/v1/generate-certificate",
            "/api/v1/generate-certificate?id=",
            "/api/v1/generate-certificate?id=%20",
        ] {
            let response = router(h.state.clone()).oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert!(json_body(response).await.get("error").is_some());
        }
    }

    #[tokio::test]
    async fn generate_certificate_unknown_id_is_404() {
        let h = harness();
        let response = router(h.state)
            .oneshot(get("/api/v1/generate-certificate?id=0000000000XX"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generate_certificate_lookup_failure_is_404() {
        let mut h = harness();
        h.state.certificates = CertificateService::new(
            Arc::new(UnreachableStore),
            Arc::new(FakeBlobStore::default()),
        );

        let response = router(h.state)
            .oneshot(get("/api/v1/generate-certificate?id=6606202546RH"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await.get("error").is_some());
    }

    #[tokio::test]
    async fn generate_certificate_redirects_to_stored_pdf() {
        let h = harness();
        h.records
            .insert(stored(
                "6606202546RH",
                Some("https://files.example.com/certificates/6606202546RH.pdf"),
            ))
            .await
            .unwrap();

        let response = router(h.state)
            .oneshot(get("/api/v1/generate-certificate?id=6606202546RH"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://files.example.com/certificates/6606202546RH.pdf"
        );
    }

    #[tokio::test]
    async fn generate_certificate_synthesizes_pdf() {
        let h = harness();
        h.records
            .insert(stored("6606202546RH", None))
            .await
            .unwrap();

        let response = router(h.state)
            .oneshot(get("/api/v1/generate-certificate?id=6606202546RH"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"certificate-6606202546RH.pdf\""
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn generate_certificate_without_template_is_500() {
        let mut h = harness();
        h.state.renderer = Arc::new(CertificateRenderer::new("/nonexistent/template.pdf"));
        h.records
            .insert(stored("6606202546RH", None))
            .await
            .unwrap();

        let response = router(h.state)
            .oneshot(get("/api/v1/generate-certificate?id=6606202546RH"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn verify_json_reports_outcomes() {
        let h = harness();
        h.records
            .insert(stored("6606202546RH", None))
            .await
            .unwrap();

        let response = router(h.state.clone())
            .oneshot(get("/api/v1/verify?code=6606202546RH"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["outcome"], "found");
        assert_eq!(json["certificate"]["certificate"], "Data Literacy");

        let response = router(h.state.clone())
            .oneshot(get("/api/v1/verify"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["outcome"], "not_provided");

        let response = router(h.state)
            .oneshot(get("/api/v1/verify?code=nope"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["outcome"], "not_found");
    }

    #[tokio::test]
    async fn verify_page_renders_localized_result() {
        let h = harness();
        h.records
            .insert(stored("6606202546RH", None))
            .await
            .unwrap();

        let response = router(h.state)
            .oneshot(get("/verify?code=6606202546RH&lang=fr"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<html lang=\"fr\""));
        assert!(html.contains("alert-success"));
        assert!(html.contains("Ana Ruiz"));
        assert!(html.contains("Jamais"));
    }

    #[tokio::test]
    async fn create_list_and_get_include_verification_url() {
        let h = harness();
        let response = router(h.state.clone())
            .oneshot(multipart(
                "POST",
                "/api/v1/certificates",
                NEW_FIELDS,
                Some(("diploma.pdf", b"%PDF-1.4 upload")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = json_body(response).await;
        assert_eq!(created["id"], "6606202546AR");
        assert_eq!(created["status"], "Valid");
        assert_eq!(created["expiry_date"], "Never");
        assert_eq!(
            created["pdf_url"],
            "https://files.example.com/certificates/6606202546AR.pdf"
        );
        assert_eq!(
            created["verification_url"],
            "https://certs.example.com/verify?code=6606202546AR"
        );

        let response = router(h.state.clone())
            .oneshot(get("/api/v1/certificates"))
            .await
            .unwrap();
        let list = json_body(response).await;
        assert_eq!(list.as_array().map(Vec::len), Some(1));

        let response = router(h.state)
            .oneshot(get("/api/v1/certificates/6606202546AR"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["hours_quantity"], 40);
    }

    #[tokio::test]
    async fn create_with_invalid_form_is_400() {
        let h = harness();
        let response = router(h.state)
            .oneshot(multipart(
                "POST",
                "/api/v1/certificates",
                &[("first_name", "Ana"), ("expiry_date", "someday")],
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = json_body(response).await["error"].as_str().unwrap().to_string();
        assert!(error.contains("paternal_last_name is required"));
        assert!(error.contains("expiry_date"));
        assert!(h.records.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn patch_returns_record_and_list() {
        let h = harness();
        h.records
            .insert(stored("6606202546RH", None))
            .await
            .unwrap();

        let response = router(h.state)
            .oneshot(multipart(
                "PATCH",
                "/api/v1/certificates/6606202546RH",
                &[("status", "Invalid"), ("hours_quantity", "12")],
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["certificate"]["status"], "Invalid");
        assert_eq!(json["certificate"]["hours_quantity"], 12);
        assert_eq!(json["certificates"][0]["id"], "6606202546RH");
    }

    #[tokio::test]
    async fn delete_removes_certificate() {
        let h = harness();
        h.records
            .insert(stored("6606202546RH", None))
            .await
            .unwrap();

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/v1/certificates/6606202546RH")
            .body(Body::empty())
            .unwrap();
        let response = router(h.state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"deleted": true}));

        let response = router(h.state)
            .oneshot(get("/api/v1/certificates/6606202546RH"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn filesystem_blobs_are_served_under_files() {
        let blob_dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(FilesystemBlobStore::new(
            blob_dir.path(),
            "certificates",
            "https://certs.example.com",
        ));
        let h = harness_with(
            blobs,
            Some(("certificates".to_string(), blob_dir.path().to_path_buf())),
        );

        let response = router(h.state.clone())
            .oneshot(multipart(
                "POST",
                "/api/v1/certificates",
                NEW_FIELDS,
                Some(("diploma.pdf", b"%PDF-1.4 stored")),
            ))
            .await
            .unwrap();
        let created = json_body(response).await;
        assert_eq!(
            created["pdf_url"],
            "https://certs.example.com/files/certificates/6606202546AR.pdf"
        );

        let response = router(h.state)
            .oneshot(get("/files/certificates/6606202546AR.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"%PDF-1.4 stored");
    }

    #[test]
    fn checkbox_values() {
        assert!(is_checked("on"));
        assert!(is_checked("TRUE"));
        assert!(!is_checked(""));
        assert!(!is_checked("off"));
    }
}
