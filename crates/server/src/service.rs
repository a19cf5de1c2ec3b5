//! Administrative certificate flows.
//!
//! Each flow is a sequential chain of blob and record operations. A failing
//! step aborts the chain; steps already committed are not rolled back.

use crate::blob::{BlobStore, blob_path_for};
use bytes::Bytes;
use certdesk_common::identifier::generate_certificate_id;
use certdesk_common::validation::{CertificateForm, into_error};
use certdesk_common::{CertdeskError, CertificateRecord, RecordStore, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Attempts at drawing an unused certificate id before giving up.
pub const MAX_ID_ATTEMPTS: usize = 5;

type IdGenerator = dyn Fn(&str, &str) -> String + Send + Sync;

/// A file submitted with an admin form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct CertificateService {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    generate_id: Arc<IdGenerator>,
}

impl CertificateService {
    pub fn new(records: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            records,
            blobs,
            generate_id: Arc::new(generate_certificate_id),
        }
    }

    pub fn with_id_generator(
        mut self,
        generate_id: impl Fn(&str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.generate_id = Arc::new(generate_id);
        self
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub async fn list(&self) -> Result<Vec<CertificateRecord>> {
        self.records.list_all().await
    }

    pub async fn get(&self, id: &str) -> Result<CertificateRecord> {
        self.records
            .get_by_id(id)
            .await?
            .ok_or_else(|| CertdeskError::not_found(format!("certificate {}", id)))
    }

    pub async fn create(
        &self,
        form: &CertificateForm,
        upload: Option<Upload>,
    ) -> Result<CertificateRecord> {
        let new = form.validate_new().map_err(|errors| into_error(&errors))?;
        let id = self
            .allocate_id(&new.first_name, &new.paternal_last_name)
            .await?;

        let pdf_url = match upload {
            Some(upload) => Some(self.store_upload(&id, upload).await?),
            None => None,
        };
        let uploaded = pdf_url.clone();

        let record = new.into_record(id, pdf_url);
        match self.records.insert(record).await {
            Ok(record) => {
                info!(certificate_id = %record.id, has_pdf = record.has_pdf(), "certificate created");
                Ok(record)
            }
            Err(err) => match uploaded {
                Some(url) => Err(CertdeskError::PartialFailure(format!(
                    "the PDF was uploaded to {} but the certificate was not saved: {}",
                    url, err
                ))),
                None => Err(err),
            },
        }
    }

    /// Applies `form` to an existing certificate and returns it together with
    /// the refreshed list.
    pub async fn update(
        &self,
        id: &str,
        form: &CertificateForm,
        upload: Option<Upload>,
        delete_existing_pdf: bool,
    ) -> Result<(CertificateRecord, Vec<CertificateRecord>)> {
        let mut patch = form.validate_patch().map_err(|errors| into_error(&errors))?;
        let existing = self.get(id).await?;

        let mut deleted = None;
        if delete_existing_pdf {
            if let Some(url) = existing.pdf_url.as_deref().filter(|url| !url.is_empty()) {
                match self.blobs.path_from_url(url) {
                    Some(path) => {
                        self.blobs.delete(&path).await?;
                        patch.pdf_url = Some(None);
                        deleted = Some(path);
                    }
                    None => warn!(
                        certificate_id = %id,
                        pdf_url = %url,
                        "stored pdf url does not belong to the blob bucket; keeping it"
                    ),
                }
            }
        }

        let uploaded = match upload {
            Some(upload) => {
                let url = match (self.store_upload(id, upload).await, &deleted) {
                    (Ok(url), _) => url,
                    (Err(err), Some(path)) => {
                        return Err(CertdeskError::PartialFailure(format!(
                            "the PDF {} was deleted but the new PDF was not uploaded: {}",
                            path, err
                        )));
                    }
                    (Err(err), None) => return Err(err),
                };
                patch.pdf_url = Some(Some(url.clone()));
                Some(url)
            }
            None => None,
        };

        let updated = match self.records.update(id, patch).await {
            Ok(updated) => updated,
            Err(err) => {
                return Err(match (uploaded, deleted) {
                    (Some(url), _) => CertdeskError::PartialFailure(format!(
                        "the PDF was uploaded to {} but the certificate update was not saved: {}",
                        url, err
                    )),
                    (None, Some(path)) => CertdeskError::PartialFailure(format!(
                        "the PDF {} was deleted but the certificate update was not saved: {}",
                        path, err
                    )),
                    (None, None) => err,
                });
            }
        };
        info!(certificate_id = %id, "certificate updated");

        let certificates = self.records.list_all().await?;
        Ok((updated, certificates))
    }

    /// Removes the attachment first; the record is kept if that fails.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let existing = self.get(id).await?;

        if let Some(url) = existing.pdf_url.as_deref().filter(|url| !url.is_empty()) {
            match self.blobs.path_from_url(url) {
                Some(path) => self.blobs.delete(&path).await?,
                None => warn!(
                    certificate_id = %id,
                    pdf_url = %url,
                    "stored pdf url does not belong to the blob bucket; skipping blob delete"
                ),
            }
        }

        self.records.delete(id).await?;
        info!(certificate_id = %id, "certificate deleted");
        Ok(())
    }

    async fn allocate_id(&self, first_name: &str, paternal_last_name: &str) -> Result<String> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = (self.generate_id)(first_name, paternal_last_name);
            if self.records.get_by_id(&id).await?.is_none() {
                return Ok(id);
            }
            warn!(certificate_id = %id, attempt, "generated certificate id already taken");
        }
        Err(CertdeskError::Conflict(format!(
            "could not allocate an unused certificate id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    async fn store_upload(&self, id: &str, upload: Upload) -> Result<String> {
        let path = blob_path_for(id, upload.filename.as_deref());
        self.blobs
            .upload(&path, upload.bytes, &upload.content_type)
            .await
    }
}
