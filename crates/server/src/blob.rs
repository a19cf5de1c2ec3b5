//! PDF attachment storage.

use async_trait::async_trait;
use bytes::Bytes;
use certdesk_common::{CertdeskError, Result};
use reqwest::Client;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

/// Object storage for certificate attachments, addressed by path within a bucket.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Bucket (container) name; also the URL segment that precedes blob paths.
    fn bucket(&self) -> &str;

    /// Stores `content` at `path`, overwriting any existing blob, and returns its public URL.
    async fn upload(&self, path: &str, content: Bytes, content_type: &str) -> Result<String>;

    /// Public URL for `path`. Does not check that the blob exists.
    fn public_url(&self, path: &str) -> String;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Recovers the blob path from a public URL produced by this store.
    fn path_from_url(&self, url: &str) -> Option<String> {
        path_after_bucket(url, self.bucket())
    }
}

/// Blob path for a certificate attachment: `<id>.<ext>`.
pub fn blob_path_for(id: &str, original_filename: Option<&str>) -> String {
    let ext = original_filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "pdf".to_string());
    format!("{}.{}", id, ext)
}

/// Everything after the first `bucket` segment of the URL path.
pub fn path_after_bucket(url: &str, bucket: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    let index = segments.iter().position(|segment| *segment == bucket)?;
    let rest = &segments[index + 1..];
    if rest.is_empty() || rest.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    Some(rest.join("/"))
}

fn check_path(path: &str) -> Result<()> {
    let valid = !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && path.split('/').all(|segment| !segment.is_empty() && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(CertdeskError::storage(format!("invalid blob path {:?}", path)))
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Stores blobs under a local directory. The server exposes that directory at
/// `/files/<bucket>/`, which is what [`FilesystemBlobStore::public_url`] points to.
pub struct FilesystemBlobStore {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl FilesystemBlobStore {
    pub fn new(
        root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn full_path(&self, path: &str) -> Result<PathBuf> {
        check_path(path)?;
        Ok(self.root.join(path))
    }
}

/// `<name>.upload` beside the target, so `x.pdf` and `x.png` stage apart.
fn staging_path(target: &Path) -> PathBuf {
    let mut staging = target.as_os_str().to_os_string();
    staging.push(".upload");
    PathBuf::from(staging)
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, path: &str, content: Bytes, _content_type: &str) -> Result<String> {
        let target = self.full_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write next to the target and rename so readers never see a torn file.
        let staging = staging_path(&target);
        let mut file = fs::File::create(&staging).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        fs::rename(&staging, &target).await?;

        debug!(path = %path, bytes = content.len(), "blob stored on filesystem");
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/files/{}/{}", self.public_base_url, self.bucket, path)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.full_path(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "blob already absent");
                Ok(())
            }
            Err(err) => Err(CertdeskError::storage(format!(
                "failed to delete {}: {}",
                path, err
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP object storage
// ---------------------------------------------------------------------------

/// Client for a Supabase-Storage compatible REST API.
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl HttpBlobStore {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            bucket: bucket.into(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    async fn check(response: reqwest::Response, action: &str, path: &str) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(CertdeskError::storage(format!(
            "{} {} failed with {}: {}",
            action, path, status, body
        )))
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, path: &str, content: Bytes, content_type: &str) -> Result<String> {
        check_path(path)?;
        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("x-upsert", "true")
            .header("cache-control", "max-age=3600")
            .header("content-type", content_type)
            .body(content)
            .send()
            .await
            .map_err(|err| CertdeskError::storage(format!("upload {} failed: {}", path, err)))?;
        Self::check(response, "upload", path).await?;
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    async fn delete(&self, path: &str) -> Result<()> {
        check_path(path)?;
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await
            .map_err(|err| CertdeskError::storage(format!("delete {} failed: {}", path, err)))?;
        Self::check(response, "delete", path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn blob_path_uses_id_and_sanitized_extension() {
        assert_eq!(
            blob_path_for("6606202546RH", Some("diploma.PDF")),
            "6606202546RH.pdf"
        );
        assert_eq!(
            blob_path_for("6606202546RH", Some("scan.final.png")),
            "6606202546RH.png"
        );
        assert_eq!(blob_path_for("6606202546RH", Some("noext")), "6606202546RH.pdf");
        assert_eq!(
            blob_path_for("6606202546RH", Some("x.p/df")),
            "6606202546RH.pdf"
        );
        assert_eq!(blob_path_for("6606202546RH", None), "6606202546RH.pdf");
    }

    #[test]
    fn path_is_recovered_after_bucket_segment() {
        assert_eq!(
            path_after_bucket(
                "https://x.supabase.co/storage/v1/object/public/certificates/6606202546RH.pdf",
                "certificates"
            ),
            Some("6606202546RH.pdf".to_string())
        );
        assert_eq!(
            path_after_bucket("https://cdn.example.com/other/file.pdf", "certificates"),
            None
        );
        assert_eq!(
            path_after_bucket("https://cdn.example.com/certificates/", "certificates"),
            None
        );
        assert_eq!(path_after_bucket("not a url", "certificates"), None);
    }

    #[tokio::test]
    async fn filesystem_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path(), "certificates", "http://localhost:9000/");

        let url = store
            .upload("6606202546RH.pdf", Bytes::from_static(b"%PDF-1"), "application/pdf")
            .await
            .unwrap();
        assert_eq!(
            url,
            "http://localhost:9000/files/certificates/6606202546RH.pdf"
        );
        assert_eq!(
            std::fs::read(dir.path().join("6606202546RH.pdf")).unwrap(),
            b"%PDF-1"
        );

        // upsert
        store
            .upload("6606202546RH.pdf", Bytes::from_static(b"%PDF-2"), "application/pdf")
            .await
            .unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("6606202546RH.pdf")).unwrap(),
            b"%PDF-2"
        );

        assert_eq!(
            store.path_from_url(&url),
            Some("6606202546RH.pdf".to_string())
        );
        store.delete("6606202546RH.pdf").await.unwrap();
        assert!(!dir.path().join("6606202546RH.pdf").exists());
        store.delete("6606202546RH.pdf").await.unwrap();
    }

    #[test]
    fn staging_name_keeps_the_extension() {
        assert_eq!(
            staging_path(Path::new("/blobs/6606202546RH.pdf")),
            PathBuf::from("/blobs/6606202546RH.pdf.upload")
        );
        assert_ne!(
            staging_path(Path::new("/blobs/6606202546RH.pdf")),
            staging_path(Path::new("/blobs/6606202546RH.png"))
        );
    }

    #[tokio::test]
    async fn concurrent_uploads_for_one_id_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path(), "certificates", "http://localhost");

        let (pdf, png) = tokio::join!(
            store.upload("6606202546RH.pdf", Bytes::from(vec![b'p'; 64 * 1024]), "application/pdf"),
            store.upload("6606202546RH.png", Bytes::from(vec![b'i'; 64 * 1024]), "image/png"),
        );
        pdf.unwrap();
        png.unwrap();

        let pdf = std::fs::read(dir.path().join("6606202546RH.pdf")).unwrap();
        let png = std::fs::read(dir.path().join("6606202546RH.png")).unwrap();
        assert!(pdf.len() == 64 * 1024 && pdf.iter().all(|b| *b == b'p'));
        assert!(png.len() == 64 * 1024 && png.iter().all(|b| *b == b'i'));
        assert!(!dir.path().join("6606202546RH.pdf.upload").exists());
        assert!(!dir.path().join("6606202546RH.png.upload").exists());
    }

    #[tokio::test]
    async fn filesystem_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path(), "certificates", "http://localhost");
        let err = store
            .upload("../escape.pdf", Bytes::new(), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, CertdeskError::Storage(_)));
    }

    #[tokio::test]
    async fn http_store_uploads_with_upsert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/certificates/6606202546RH.pdf"))
            .and(header("x-upsert", "true"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "x"})))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpBlobStore::new(Client::new(), server.uri(), "secret", "certificates");
        let url = store
            .upload("6606202546RH.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();
        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/certificates/6606202546RH.pdf",
                server.uri()
            )
        );
        assert_eq!(
            store.path_from_url(&url),
            Some("6606202546RH.pdf".to_string())
        );
    }

    #[tokio::test]
    async fn http_store_surfaces_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/certificates"))
            .and(body_json(json!({"prefixes": ["6606202546RH.pdf"]})))
            .respond_with(ResponseTemplate::new(403).set_body_string("row-level security"))
            .mount(&server)
            .await;

        let store = HttpBlobStore::new(Client::new(), server.uri(), "secret", "certificates");
        let err = store.delete("6606202546RH.pdf").await.unwrap_err();
        assert!(matches!(err, CertdeskError::Storage(_)));
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("row-level security"));
    }
}
