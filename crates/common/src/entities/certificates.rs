use crate::error::CertdeskError;
use crate::models::{CertificateRecord, CertificateStatus, ExpiryDate};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "certificates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub paternal_last_name: String,
    pub maternal_last_name: Option<String>,
    pub certificate: String,
    pub date_issued: Date,
    pub time_issued: Time,
    pub expiry_date: String,
    pub status: String,
    pub hours_quantity: i32,
    pub pdf_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        unreachable!("certificates has no relations")
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for CertificateRecord {
    type Error = CertdeskError;

    fn try_from(row: Model) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| CertdeskError::CorruptRecord {
            id: row.id.clone(),
            reason,
        };
        let status: CertificateStatus = row.status.parse().map_err(corrupt)?;
        let expiry_date: ExpiryDate = row.expiry_date.parse().map_err(corrupt)?;
        let hours_quantity = u32::try_from(row.hours_quantity)
            .map_err(|_| corrupt(format!("negative hours_quantity {}", row.hours_quantity)))?;

        Ok(CertificateRecord {
            id: row.id,
            first_name: row.first_name,
            middle_name: row.middle_name,
            paternal_last_name: row.paternal_last_name,
            maternal_last_name: row.maternal_last_name,
            certificate: row.certificate,
            date_issued: row.date_issued,
            time_issued: row.time_issued,
            expiry_date,
            status,
            hours_quantity,
            pdf_url: row.pdf_url.filter(|url| !url.is_empty()),
        })
    }
}
