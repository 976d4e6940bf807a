// ==========================================
// 考试引擎 - 小题得分模型
// ==========================================
// (exam_id, student_id, question_id) 唯一
// 首次记录作答时创建，由判分引擎原地更新，考试存在期间不删除
// ==========================================

use crate::domain::types::GradingStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 学生小题得分记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentQuestionScore {
    pub record_id: String,
    pub exam_id: String,
    pub student_id: String,
    pub question_id: String,
    pub score_id: Option<String>, // 总成绩记录（外部维护）
    pub answer: Option<String>,
    pub score: Decimal,
    pub status: GradingStatus,
}

/// 单题判分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeOutcome {
    pub record_id: String,
    pub question_id: String,
    pub full_score: Decimal,
    pub score: Decimal,
    pub status: GradingStatus,
}

/// 整份答卷判分汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionGradeSummary {
    pub exam_id: String,
    pub student_id: String,
    pub objective_score: Decimal, // 单选/多选/判断得分
    pub total_score: Decimal,     // 全部已判分记录得分
    pub graded_count: usize,
    pub pending_manual_count: usize,
    pub passed: Option<bool>, // 仍有待人工阅卷题目时为 None
    pub outcomes: Vec<GradeOutcome>,
}
