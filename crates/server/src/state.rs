use crate::render::CertificateRenderer;
use crate::service::CertificateService;
use certdesk_common::Language;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub certificates: CertificateService,
    pub renderer: Arc<CertificateRenderer>,
    pub public_base_url: String,
    pub default_language: Language,
    /// Directory and bucket served under `/files/<bucket>` for the filesystem blob backend.
    pub blob_files: Option<(String, PathBuf)>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Public link to the verification page for `id`.
    pub fn verification_url(&self, id: &str) -> String {
        format!("{}/verify?code={}", self.public_base_url, id)
    }
}
