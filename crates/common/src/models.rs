use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Literal stored in `expiry_date` for certificates that never expire.
pub const NEVER: &str = "Never";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CertificateStatus {
    #[default]
    Valid,
    Invalid,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Valid" => Ok(Self::Valid),
            "Invalid" => Ok(Self::Invalid),
            other => Err(format!("unknown status {:?}", other)),
        }
    }
}

/// Expiry of a certificate: a calendar date or the `"Never"` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryDate {
    Never,
    On(NaiveDate),
}

impl ExpiryDate {
    /// Parses form input, where an empty value means no expiry.
    pub fn from_input(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::Never);
        }
        raw.parse()
    }
}

impl fmt::Display for ExpiryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str(NEVER),
            Self::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for ExpiryDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == NEVER {
            return Ok(Self::Never);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self::On)
            .map_err(|_| format!("expiry must be an ISO date or \"{}\", got {:?}", NEVER, s))
    }
}

impl Serialize for ExpiryDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExpiryDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

pub fn format_time_of_day(time: &NaiveTime) -> String {
    use chrono::Timelike;
    if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

mod time_of_day {
    use super::{format_time_of_day, parse_time_of_day};
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_time_of_day(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_time_of_day(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time of day {:?}", raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub paternal_last_name: String,
    pub maternal_last_name: Option<String>,
    pub certificate: String,
    pub date_issued: NaiveDate,
    #[serde(with = "time_of_day")]
    pub time_issued: NaiveTime,
    pub expiry_date: ExpiryDate,
    pub status: CertificateStatus,
    pub hours_quantity: u32,
    pub pdf_url: Option<String>,
}

impl CertificateRecord {
    /// Non-empty name parts joined in first, middle, paternal, maternal order.
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.paternal_last_name.as_str()),
            self.maternal_last_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    pub fn issued_at(&self) -> NaiveDateTime {
        self.date_issued.and_time(self.time_issued)
    }

    pub fn has_pdf(&self) -> bool {
        self.pdf_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Validated input of the administrative "add" operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub paternal_last_name: String,
    pub maternal_last_name: Option<String>,
    pub certificate: String,
    pub date_issued: NaiveDate,
    pub time_issued: NaiveTime,
    pub expiry_date: ExpiryDate,
    pub hours_quantity: u32,
}

impl NewCertificate {
    /// Builds the stored record; new certificates always start out valid.
    pub fn into_record(self, id: String, pdf_url: Option<String>) -> CertificateRecord {
        CertificateRecord {
            id,
            first_name: self.first_name,
            middle_name: self.middle_name,
            paternal_last_name: self.paternal_last_name,
            maternal_last_name: self.maternal_last_name,
            certificate: self.certificate,
            date_issued: self.date_issued,
            time_issued: self.time_issued,
            expiry_date: self.expiry_date,
            status: CertificateStatus::Valid,
            hours_quantity: self.hours_quantity,
            pdf_url,
        }
    }
}

/// Partial update of a record. `None` leaves a field untouched; for the
/// optional columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificatePatch {
    pub first_name: Option<String>,
    pub middle_name: Option<Option<String>>,
    pub paternal_last_name: Option<String>,
    pub maternal_last_name: Option<Option<String>>,
    pub certificate: Option<String>,
    pub date_issued: Option<NaiveDate>,
    pub time_issued: Option<NaiveTime>,
    pub expiry_date: Option<ExpiryDate>,
    pub status: Option<CertificateStatus>,
    pub hours_quantity: Option<u32>,
    pub pdf_url: Option<Option<String>>,
}

impl CertificatePatch {
    pub fn apply_to(&self, record: &mut CertificateRecord) {
        if let Some(first_name) = &self.first_name {
            record.first_name = first_name.clone();
        }
        if let Some(middle_name) = &self.middle_name {
            record.middle_name = middle_name.clone();
        }
        if let Some(paternal_last_name) = &self.paternal_last_name {
            record.paternal_last_name = paternal_last_name.clone();
        }
        if let Some(maternal_last_name) = &self.maternal_last_name {
            record.maternal_last_name = maternal_last_name.clone();
        }
        if let Some(certificate) = &self.certificate {
            record.certificate = certificate.clone();
        }
        if let Some(date_issued) = self.date_issued {
            record.date_issued = date_issued;
        }
        if let Some(time_issued) = self.time_issued {
            record.time_issued = time_issued;
        }
        if let Some(expiry_date) = self.expiry_date {
            record.expiry_date = expiry_date;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(hours_quantity) = self.hours_quantity {
            record.hours_quantity = hours_quantity;
        }
        if let Some(pdf_url) = &self.pdf_url {
            record.pdf_url = pdf_url.clone();
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> CertificateRecord {
    CertificateRecord {
        id: "6606202546RH".to_string(),
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
        pdf_url: None,
    }
}
