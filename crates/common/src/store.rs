//! 证书记录存储适配层
//!
//! [`RecordStore`] 抽象了对远端结构化存储的单记录增删改查，
//! 不提供跨记录事务。提供 sea-orm 与内存两种实现。

use crate::entities::certificates;
use crate::error::{CertdeskError, Result};
use crate::models::{CertificatePatch, CertificateRecord};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 按编号查询，不存在时返回 `Ok(None)`
    async fn get_by_id(&self, id: &str) -> Result<Option<CertificateRecord>>;

    /// 查询全部记录（按创建顺序）
    async fn list_all(&self) -> Result<Vec<CertificateRecord>>;

    /// 插入新记录，存储层错误原样返回
    async fn insert(&self, record: CertificateRecord) -> Result<CertificateRecord>;

    /// 部分更新，编号不可修改
    async fn update(&self, id: &str, patch: CertificatePatch) -> Result<CertificateRecord>;

    /// 删除记录，不存在时返回 NotFound
    async fn delete(&self, id: &str) -> Result<()>;
}

fn certificate_not_found(id: &str) -> CertdeskError {
    CertdeskError::not_found(format!("certificate {}", id))
}

// ============ sea-orm 实现 ============

pub struct SeaOrmRecordStore {
    db: DatabaseConnection,
}

impl SeaOrmRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for SeaOrmRecordStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<CertificateRecord>> {
        certificates::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(CertificateRecord::try_from)
            .transpose()
    }

    async fn list_all(&self) -> Result<Vec<CertificateRecord>> {
        certificates::Entity::find()
            .order_by_asc(certificates::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(CertificateRecord::try_from)
            .collect()
    }

    async fn insert(&self, record: CertificateRecord) -> Result<CertificateRecord> {
        let now = Utc::now();
        let active = certificates::ActiveModel {
            id: Set(record.id),
            first_name: Set(record.first_name),
            middle_name: Set(record.middle_name),
            paternal_last_name: Set(record.paternal_last_name),
            maternal_last_name: Set(record.maternal_last_name),
            certificate: Set(record.certificate),
            date_issued: Set(record.date_issued),
            time_issued: Set(record.time_issued),
            expiry_date: Set(record.expiry_date.to_string()),
            status: Set(record.status.to_string()),
            hours_quantity: Set(hours_to_column(record.hours_quantity)?),
            pdf_url: Set(record.pdf_url),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let row = active.insert(&self.db).await?;
        CertificateRecord::try_from(row)
    }

    async fn update(&self, id: &str, patch: CertificatePatch) -> Result<CertificateRecord> {
        let row = certificates::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| certificate_not_found(id))?;

        let mut active: certificates::ActiveModel = row.into();
        if let Some(first_name) = patch.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(middle_name) = patch.middle_name {
            active.middle_name = Set(middle_name);
        }
        if let Some(paternal_last_name) = patch.paternal_last_name {
            active.paternal_last_name = Set(paternal_last_name);
        }
        if let Some(maternal_last_name) = patch.maternal_last_name {
            active.maternal_last_name = Set(maternal_last_name);
        }
        if let Some(certificate) = patch.certificate {
            active.certificate = Set(certificate);
        }
        if let Some(date_issued) = patch.date_issued {
            active.date_issued = Set(date_issued);
        }
        if let Some(time_issued) = patch.time_issued {
            active.time_issued = Set(time_issued);
        }
        if let Some(expiry_date) = patch.expiry_date {
            active.expiry_date = Set(expiry_date.to_string());
        }
        if let Some(status) = patch.status {
            active.status = Set(status.to_string());
        }
        if let Some(hours_quantity) = patch.hours_quantity {
            active.hours_quantity = Set(hours_to_column(hours_quantity)?);
        }
        if let Some(pdf_url) = patch.pdf_url {
            active.pdf_url = Set(pdf_url);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&self.db).await?;
        CertificateRecord::try_from(updated)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = certificates::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(certificate_not_found(id));
        }
        Ok(())
    }
}

fn hours_to_column(hours: u32) -> Result<i32> {
    i32::try_from(hours)
        .map_err(|_| CertdeskError::validation(format!("hours_quantity {} is too large", hours)))
}

// ============ 内存实现 ============

/// 内存记录存储，未配置 DATABASE_URL 时以及测试中使用
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<Vec<CertificateRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<CertificateRecord>> {
        Ok(self.inner.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<CertificateRecord>> {
        Ok(self.inner.read().await.clone())
    }

    async fn insert(&self, record: CertificateRecord) -> Result<CertificateRecord> {
        let mut records = self.inner.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(CertdeskError::Conflict(format!(
                "certificate {} already exists",
                record.id
            )));
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, patch: CertificatePatch) -> Result<CertificateRecord> {
        let mut records = self.inner.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| certificate_not_found(id))?;
        patch.apply_to(record);
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.inner.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(certificate_not_found(id));
        }
        Ok(())
    }
}
