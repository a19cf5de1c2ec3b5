use crate::models::CertificateRecord;
use crate::store::RecordStore;
use serde::Serialize;
use tracing::warn;

/// Result of looking up a verification code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "certificate", rename_all = "snake_case")]
pub enum VerificationOutcome {
    NotProvided,
    NotFound,
    Found(CertificateRecord),
}

impl VerificationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotProvided => "not_provided",
            Self::NotFound => "not_found",
            Self::Found(_) => "found",
        }
    }
}

/// Resolves a code to a certificate. Store failures are reported as
/// `NotFound`; the record's status and expiry are not evaluated here.
pub async fn verify(store: &dyn RecordStore, code: Option<&str>) -> VerificationOutcome {
    let code = match code.map(str::trim) {
        Some(code) if !code.is_empty() => code,
        _ => return VerificationOutcome::NotProvided,
    };

    match store.get_by_id(code).await {
        Ok(Some(record)) => VerificationOutcome::Found(record),
        Ok(None) => VerificationOutcome::NotFound,
        Err(err) => {
            warn!(code = %code, error = %err, "certificate lookup failed");
            VerificationOutcome::NotFound
        }
    }
}
