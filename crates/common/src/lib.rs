pub mod config;
pub mod entities;
pub mod error;
pub mod i18n;
pub mod identifier;
pub mod models;
pub mod store;
pub mod validation;
pub mod verification;

// ============ 重新导出常用类型 ============

// 错误处理
pub use error::{CertdeskError, Result as CertdeskResult};

// 配置相关
pub use config::{AppConfig, BlobBackend};

// 领域模型
pub use models::{CertificatePatch, CertificateRecord, CertificateStatus, ExpiryDate, NewCertificate};

// 存储与验证
pub use store::{MemoryRecordStore, RecordStore, SeaOrmRecordStore};
pub use verification::{VerificationOutcome, verify};

// 多语言
pub use i18n::Language;

// 兼容性别名（Result 是更常用的名称）
pub use error::Result;
