//! certdesk 统一错误类型定义
//!
//! 全项目共享一个错误类型，简化错误传播和处理。

use thiserror::Error;

/// certdesk 统一错误类型
#[derive(Error, Debug)]
pub enum CertdeskError {
    /// 资源未找到 (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// 请求参数错误 (400)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 表单验证错误 (400)
    #[error("validation failed: {0}")]
    Validation(String),

    /// 资源冲突 (409)
    #[error("conflict: {0}")]
    Conflict(String),

    /// 数据库错误 (500)
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// 对象存储错误 (500)
    #[error("storage error: {0}")]
    Storage(String),

    /// 多步骤操作部分完成 (500)，例如 PDF 已上传但记录未保存
    #[error("{0}")]
    PartialFailure(String),

    /// PDF 渲染错误 (500)
    #[error("render error: {0}")]
    Render(String),

    /// 存储中的记录格式不合法 (500)
    #[error("corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    /// IO 错误 (500)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

}

impl CertdeskError {
    /// 创建未找到错误
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// 创建请求参数错误
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// 创建验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 创建对象存储错误
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// 创建渲染错误
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// 获取 HTTP 状态码
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::BadRequest(_) | Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            _ => 500,
        }
    }

    /// 获取 HTTP 状态码（axum 类型）
    #[cfg(feature = "server")]
    pub fn axum_status_code(&self) -> axum::http::StatusCode {
        axum::http::StatusCode::from_u16(self.http_status_code())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// certdesk Result 类型别名
pub type Result<T> = std::result::Result<T, CertdeskError>;

// ============ Axum HTTP 响应支持 ============

#[cfg(feature = "server")]
mod axum_impl {
    use super::*;
    use axum::{
        Json,
        response::{IntoResponse, Response},
    };
    use serde_json::json;

    impl IntoResponse for CertdeskError {
        fn into_response(self) -> Response {
            let status = self.axum_status_code();

            match &self {
                // 客户端错误（4xx）- info 级别
                CertdeskError::NotFound(resource) => {
                    tracing::info!(
                        status = status.as_u16(),
                        resource = %resource,
                        "Resource not found"
                    );
                }
                CertdeskError::BadRequest(msg) => {
                    tracing::info!(status = status.as_u16(), reason = %msg, "Bad request");
                }
                CertdeskError::Validation(msg) => {
                    tracing::info!(
                        status = status.as_u16(),
                        validation_error = %msg,
                        "Request validation failed"
                    );
                }
                CertdeskError::Conflict(msg) => {
                    tracing::warn!(status = status.as_u16(), conflict = %msg, "Conflict");
                }
                // 数据库错误 - error 级别
                CertdeskError::Database(db_err) => {
                    tracing::error!(
                        status = status.as_u16(),
                        error = %db_err,
                        "Database operation failed"
                    );
                }
                // 对象存储属于外部服务 - warn 级别
                CertdeskError::Storage(msg) => {
                    tracing::warn!(
                        status = status.as_u16(),
                        storage_error = %msg,
                        "Blob storage operation failed"
                    );
                }
                CertdeskError::PartialFailure(msg) => {
                    tracing::error!(
                        status = status.as_u16(),
                        partial_failure = %msg,
                        "Multi-step operation left partial state"
                    );
                }
                CertdeskError::Render(msg) => {
                    tracing::error!(
                        status = status.as_u16(),
                        render_error = %msg,
                        "PDF rendering failed"
                    );
                }
                CertdeskError::CorruptRecord { id, reason } => {
                    tracing::error!(
                        status = status.as_u16(),
                        certificate_id = %id,
                        reason = %reason,
                        "Stored certificate has an invalid shape"
                    );
                }
                CertdeskError::Io(io_err) => {
                    tracing::error!(
                        status = status.as_u16(),
                        io_error = %io_err,
                        "IO operation failed"
                    );
                }
            }

            let body = Json(json!({"error": self.to_string()}));
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_err() -> CertdeskError {
        CertdeskError::Database(sea_orm::DbErr::Conn(sea_orm::RuntimeErr::Internal(
            "test".to_string(),
        )))
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(CertdeskError::not_found("x").http_status_code(), 404);
        assert_eq!(CertdeskError::bad_request("x").http_status_code(), 400);
        assert_eq!(CertdeskError::validation("x").http_status_code(), 400);
        assert_eq!(
            CertdeskError::Conflict("x".to_string()).http_status_code(),
            409
        );
        assert_eq!(db_err().http_status_code(), 500);
        assert_eq!(CertdeskError::storage("x").http_status_code(), 500);
        assert_eq!(CertdeskError::render("x").http_status_code(), 500);
        assert_eq!(
            CertdeskError::PartialFailure("x".to_string()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_constructors_and_messages() {
        let err = CertdeskError::not_found("certificate 123");
        assert!(matches!(err, CertdeskError::NotFound(_)));
        assert_eq!(err.to_string(), "not found: certificate 123");

        let err = CertdeskError::storage("bucket missing");
        assert_eq!(err.to_string(), "storage error: bucket missing");

        let err = CertdeskError::CorruptRecord {
            id: "1234567890AB".to_string(),
            reason: "unknown status".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt record 1234567890AB: unknown status"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "template missing");
        let err: CertdeskError = io_err.into();
        assert!(matches!(err, CertdeskError::Io(_)));
        assert!(err.to_string().contains("template missing"));
    }

    #[cfg(feature = "server")]
    #[test]
    fn test_axum_status_code() {
        use axum::http::StatusCode;

        assert_eq!(
            CertdeskError::not_found("x").axum_status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CertdeskError::validation("x").axum_status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CertdeskError::Conflict("x".to_string()).axum_status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(db_err().axum_status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
