// ==========================================
// 考试引擎 - API层错误类型
// ==========================================
// 职责: 将引擎/仓储错误转换为调用方可见的错误分类
// 错误消息保留引擎原文
// ==========================================

use crate::engine::error::{EngineError, ErrorKind};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("状态冲突: {0}")]
    StateConflict(String),

    #[error("数据不足: {0}")]
    InsufficientData(String),

    #[error("权限不足: {0}")]
    PermissionDenied(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::ConcurrentModification(msg) => ApiError::StateConflict(msg),
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::StateConflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ValidationError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换（按错误分类）
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let kind = err.kind();
        match err {
            EngineError::Repository(repo_err) => repo_err.into(),
            other => {
                let msg = other.to_string();
                match kind {
                    ErrorKind::Validation => ApiError::ValidationError(msg),
                    ErrorKind::NotFound => ApiError::NotFound(msg),
                    ErrorKind::StateConflict => ApiError::StateConflict(msg),
                    ErrorKind::InsufficientData => ApiError::InsufficientData(msg),
                    ErrorKind::Permission => ApiError::PermissionDenied(msg),
                    ErrorKind::Storage => ApiError::DatabaseError(msg),
                }
            }
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

/// 必填字符串校验
pub(crate) fn require_non_empty(value: &str, field: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationError(format!("{}不能为空", field)));
    }
    Ok(())
}
