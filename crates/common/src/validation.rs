//! 证书表单验证模块
//!
//! 管理端提交的表单字段均为字符串，这里统一完成必填检查和类型解析，
//! 生成 [`NewCertificate`] 或 [`CertificatePatch`]。

use crate::error::CertdeskError;
use crate::models::{
    CertificatePatch, CertificateStatus, ExpiryDate, NewCertificate, parse_time_of_day,
};
use chrono::NaiveDate;

/// 验证错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 缺少必填字段
    MissingField { field: &'static str },

    /// 日期格式错误
    InvalidDate { field: &'static str, value: String },

    /// 时间格式错误
    InvalidTime { value: String },

    /// 学时不是非负整数
    InvalidHours { value: String },

    /// 到期日既不是日期也不是 "Never"
    InvalidExpiry { value: String },

    /// 未知状态
    InvalidStatus { value: String },
}

impl ValidationError {
    /// 获取错误的详细描述
    pub fn description(&self) -> String {
        match self {
            Self::MissingField { field } => format!("{} is required", field),
            Self::InvalidDate { field, value } => {
                format!("{} must be a YYYY-MM-DD date, got {:?}", field, value)
            }
            Self::InvalidTime { value } => {
                format!("time_issued must be HH:MM or HH:MM:SS, got {:?}", value)
            }
            Self::InvalidHours { value } => {
                format!(
                    "hours_quantity must be a non-negative integer, got {:?}",
                    value
                )
            }
            Self::InvalidExpiry { value } => {
                format!(
                    "expiry_date must be a YYYY-MM-DD date or \"Never\", got {:?}",
                    value
                )
            }
            Self::InvalidStatus { value } => {
                format!("status must be Valid or Invalid, got {:?}", value)
            }
        }
    }
}

/// 将多个验证错误合并为一个 [`CertdeskError::Validation`]
pub fn into_error(errors: &[ValidationError]) -> CertdeskError {
    let joined = errors
        .iter()
        .map(ValidationError::description)
        .collect::<Vec<_>>()
        .join("; ");
    CertdeskError::validation(joined)
}

/// 管理端表单的原始字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateForm {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub paternal_last_name: Option<String>,
    pub maternal_last_name: Option<String>,
    pub certificate: Option<String>,
    pub date_issued: Option<String>,
    pub time_issued: Option<String>,
    pub expiry_date: Option<String>,
    pub status: Option<String>,
    pub hours_quantity: Option<String>,
}

impl CertificateForm {
    /// 按字段名设置值，未知字段返回 false
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "first_name" => &mut self.first_name,
            "middle_name" => &mut self.middle_name,
            "paternal_last_name" => &mut self.paternal_last_name,
            "maternal_last_name" => &mut self.maternal_last_name,
            "certificate" => &mut self.certificate,
            "date_issued" => &mut self.date_issued,
            "time_issued" => &mut self.time_issued,
            "expiry_date" => &mut self.expiry_date,
            "status" => &mut self.status,
            "hours_quantity" => &mut self.hours_quantity,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// 验证新增表单
    pub fn validate_new(&self) -> Result<NewCertificate, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let first_name = required(&self.first_name, "first_name", &mut errors);
        let paternal_last_name =
            required(&self.paternal_last_name, "paternal_last_name", &mut errors);
        let certificate = required(&self.certificate, "certificate", &mut errors);

        let date_issued = required(&self.date_issued, "date_issued", &mut errors)
            .and_then(|raw| parse_date("date_issued", &raw, &mut errors));
        let time_issued = required(&self.time_issued, "time_issued", &mut errors)
            .and_then(|raw| parse_time(&raw, &mut errors));

        let expiry_date = parse_expiry(self.expiry_date.as_deref().unwrap_or(""), &mut errors);
        let hours_quantity = match non_empty(&self.hours_quantity) {
            Some(raw) => parse_hours(&raw, &mut errors),
            None => Some(0),
        };

        match (
            first_name,
            paternal_last_name,
            certificate,
            date_issued,
            time_issued,
            expiry_date,
            hours_quantity,
        ) {
            (
                Some(first_name),
                Some(paternal_last_name),
                Some(certificate),
                Some(date_issued),
                Some(time_issued),
                Some(expiry_date),
                Some(hours_quantity),
            ) if errors.is_empty() => Ok(NewCertificate {
                first_name,
                middle_name: non_empty(&self.middle_name),
                paternal_last_name,
                maternal_last_name: non_empty(&self.maternal_last_name),
                certificate,
                date_issued,
                time_issued,
                expiry_date,
                hours_quantity,
            }),
            _ => Err(errors),
        }
    }

    /// 验证更新表单：只处理提交的字段，必填字段不允许清空
    pub fn validate_patch(&self) -> Result<CertificatePatch, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut patch = CertificatePatch::default();

        if self.first_name.is_some() {
            patch.first_name = required(&self.first_name, "first_name", &mut errors);
        }
        if self.paternal_last_name.is_some() {
            patch.paternal_last_name =
                required(&self.paternal_last_name, "paternal_last_name", &mut errors);
        }
        if self.certificate.is_some() {
            patch.certificate = required(&self.certificate, "certificate", &mut errors);
        }
        if self.middle_name.is_some() {
            patch.middle_name = Some(non_empty(&self.middle_name));
        }
        if self.maternal_last_name.is_some() {
            patch.maternal_last_name = Some(non_empty(&self.maternal_last_name));
        }
        if self.date_issued.is_some() {
            patch.date_issued = required(&self.date_issued, "date_issued", &mut errors)
                .and_then(|raw| parse_date("date_issued", &raw, &mut errors));
        }
        if self.time_issued.is_some() {
            patch.time_issued = required(&self.time_issued, "time_issued", &mut errors)
                .and_then(|raw| parse_time(&raw, &mut errors));
        }
        if let Some(raw) = &self.expiry_date {
            patch.expiry_date = parse_expiry(raw, &mut errors);
        }
        if let Some(raw) = &self.status {
            match raw.trim().parse::<CertificateStatus>() {
                Ok(status) => patch.status = Some(status),
                Err(_) => errors.push(ValidationError::InvalidStatus { value: raw.clone() }),
            }
        }
        if self.hours_quantity.is_some() {
            patch.hours_quantity = required(&self.hours_quantity, "hours_quantity", &mut errors)
                .and_then(|raw| parse_hours(&raw, &mut errors));
        }

        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(errors)
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(
    value: &Option<String>,
    field: &'static str,
    errors: &mut Vec<ValidationError>,
) -> Option<String> {
    let value = non_empty(value);
    if value.is_none() {
        errors.push(ValidationError::MissingField { field });
    }
    value
}

fn parse_date(
    field: &'static str,
    raw: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(ValidationError::InvalidDate {
                field,
                value: raw.to_string(),
            });
            None
        }
    }
}

fn parse_time(raw: &str, errors: &mut Vec<ValidationError>) -> Option<chrono::NaiveTime> {
    let time = parse_time_of_day(raw);
    if time.is_none() {
        errors.push(ValidationError::InvalidTime {
            value: raw.to_string(),
        });
    }
    time
}

fn parse_expiry(raw: &str, errors: &mut Vec<ValidationError>) -> Option<ExpiryDate> {
    match ExpiryDate::from_input(raw) {
        Ok(expiry) => Some(expiry),
        Err(_) => {
            errors.push(ValidationError::InvalidExpiry {
                value: raw.to_string(),
            });
            None
        }
    }
}

fn parse_hours(raw: &str, errors: &mut Vec<ValidationError>) -> Option<u32> {
    match raw.trim().parse::<u32>() {
        Ok(hours) => Some(hours),
        Err(_) => {
            errors.push(ValidationError::InvalidHours {
                value: raw.to_string(),
            });
            None
        }
    }
}
