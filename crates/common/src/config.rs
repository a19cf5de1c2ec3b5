use crate::i18n::Language;
use anyhow::{Result, anyhow};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBackend {
    /// 本地目录，由服务自身通过 /files 提供下载
    Filesystem { dir: PathBuf },
    /// Supabase Storage 兼容的 HTTP 对象存储
    Http { base_url: String, api_key: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub listen_addr: String,
    pub public_base_url: String,
    pub blob_backend: BlobBackend,
    pub blob_bucket: String,
    pub pdf_template_path: PathBuf,
    pub default_language: Language,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        // Load .env early so process env reads pick it up.
        let _ = dotenvy::dotenv();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let db_max_connections = env_u64("DB_MAX_CONNECTIONS", 10) as u32;

        let listen_addr =
            env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:9000".to_string());
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}", listen_addr))
            .trim_end_matches('/')
            .to_string();

        let blob_backend = env_blob_backend()?;
        let blob_bucket = env::var("BLOB_BUCKET").unwrap_or_else(|_| "certificates".to_string());
        if blob_bucket.is_empty() || blob_bucket.contains('/') {
            return Err(anyhow!("BLOB_BUCKET must be a single path segment"));
        }

        let pdf_template_path = env::var("PDF_TEMPLATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets/certificate-template.pdf"));

        let default_language = match env::var("DEFAULT_LANGUAGE") {
            Ok(code) => code
                .parse()
                .map_err(|err| anyhow!("DEFAULT_LANGUAGE: {}", err))?,
            Err(_) => Language::En,
        };
        let max_upload_bytes = env_u64("MAX_UPLOAD_BYTES", 10 * 1024 * 1024) as usize;

        Ok(Self {
            database_url,
            db_max_connections,
            listen_addr,
            public_base_url,
            blob_backend,
            blob_bucket,
            pdf_template_path,
            default_language,
            max_upload_bytes,
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_blob_backend() -> Result<BlobBackend> {
    let kind = env::var("BLOB_BACKEND").unwrap_or_else(|_| "filesystem".to_string());
    match kind.trim().to_ascii_lowercase().as_str() {
        "filesystem" | "fs" => {
            let dir = env::var("BLOB_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/blobs"));
            Ok(BlobBackend::Filesystem { dir })
        }
        "http" => {
            let base_url = env::var("STORAGE_URL")
                .map_err(|_| anyhow!("STORAGE_URL is required when BLOB_BACKEND=http"))?;
            let api_key = env::var("STORAGE_API_KEY")
                .map_err(|_| anyhow!("STORAGE_API_KEY is required when BLOB_BACKEND=http"))?;
            Ok(BlobBackend::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
            })
        }
        other => Err(anyhow!("unknown BLOB_BACKEND {}", other)),
    }
}
