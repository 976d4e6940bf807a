// ==========================================
// 考试引擎 - 引擎层错误类型
// ==========================================
// 每类失败一个变体；kind() 归入对外错误分类
// ==========================================

use crate::domain::types::QuestionType;
use crate::repository::error::RepositoryError;
use rust_decimal::Decimal;
use thiserror::Error;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StateConflict,
    InsufficientData,
    Permission,
    Storage,
}

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 输入校验 =====
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("题型比例无法归一: {0}")]
    InvalidRatioSum(String),

    #[error("试卷总分必须为100，实际为{actual}")]
    ScoreSumMismatch { actual: Decimal },

    // ===== 引用不存在 =====
    #[error("题目不存在: {0}")]
    UnknownQuestion(String),

    #[error("题目不存在: {0}")]
    QuestionNotFound(String),

    #[error("题目不在考试试卷中: exam_id={exam_id}, question_id={question_id}")]
    QuestionNotInPaper { exam_id: String, question_id: String },

    #[error("试卷不存在: {0}")]
    PaperNotFound(String),

    #[error("考试不存在: {0}")]
    ExamNotFound(String),

    #[error("作答记录不存在: {0}")]
    ScoreRecordNotFound(String),

    #[error("{entity}不存在: {id}")]
    ReferenceNotFound { entity: &'static str, id: String },

    // ===== 状态冲突 =====
    #[error("期末试卷数量不足: 需要至少{required}份，实际{found}份")]
    InsufficientFinalPapers { required: usize, found: usize },

    #[error("学生不具备补考资格: {0}")]
    NotEligibleForRetake(String),

    #[error("状态冲突: {0}")]
    StateConflict(String),

    // ===== 数据不足 =====
    #[error("题库题量不足: 题型={question_type}, 需要{required}道，仅有{available}道")]
    InsufficientQuestions {
        question_type: QuestionType,
        required: usize,
        available: usize,
    },

    // ===== 权限 =====
    #[error("权限不足: {0}")]
    InsufficientPermission(String),

    // ===== 存储 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_)
            | EngineError::InvalidRatioSum(_)
            | EngineError::ScoreSumMismatch { .. } => ErrorKind::Validation,

            EngineError::UnknownQuestion(_)
            | EngineError::QuestionNotFound(_)
            | EngineError::QuestionNotInPaper { .. }
            | EngineError::PaperNotFound(_)
            | EngineError::ExamNotFound(_)
            | EngineError::ScoreRecordNotFound(_)
            | EngineError::ReferenceNotFound { .. } => ErrorKind::NotFound,

            EngineError::InsufficientFinalPapers { .. }
            | EngineError::NotEligibleForRetake(_)
            | EngineError::StateConflict(_) => ErrorKind::StateConflict,

            EngineError::InsufficientQuestions { .. } => ErrorKind::InsufficientData,

            EngineError::InsufficientPermission(_) => ErrorKind::Permission,

            EngineError::Repository(RepositoryError::NotFound { .. }) => ErrorKind::NotFound,
            EngineError::Repository(RepositoryError::ConcurrentModification(_)) => {
                ErrorKind::StateConflict
            }
            EngineError::Repository(_) => ErrorKind::Storage,
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            EngineError::ScoreSumMismatch { actual: Decimal::new(9999, 2) }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            EngineError::InsufficientFinalPapers { required: 2, found: 1 }.kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            EngineError::Repository(RepositoryError::ConcurrentModification("x".into())).kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            EngineError::Repository(RepositoryError::LockError("x".into())).kind(),
            ErrorKind::Storage
        );
    }
}
