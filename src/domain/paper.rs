// ==========================================
// 考试引擎 - 试卷领域模型
// ==========================================
// 不变量: 同一试卷 Σ PaperQuestion.score == 100.00
// 不变量: (paper_id, question_id) 唯一
// ==========================================

use crate::domain::question::Question;
use crate::domain::types::{AcademicTerm, ExamType, PaperStatus, QuestionType};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 试卷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamPaper {
    pub paper_id: String,
    pub paper_name: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub status: PaperStatus,
    pub exam_type: ExamType,
    pub term: AcademicTerm,
    pub difficulty: Decimal, // 实际难度（所选题目难度均值）
    pub created_at: NaiveDateTime,
}

/// 试卷-题目关联
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperQuestion {
    pub paper_id: String,
    pub question_id: String,
    pub ordinal: i32,   // 从 1 开始
    pub score: Decimal, // 2 位小数
}

/// 试卷详情（含题目，按题序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperDetail {
    pub paper: ExamPaper,
    pub questions: Vec<PaperQuestionView>,
    pub total_score: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperQuestionView {
    pub ordinal: i32,
    pub score: Decimal,
    pub question: Question,
}

// ==========================================
// 组卷请求
// ==========================================

/// 自动组卷请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoAssemblyRequest {
    pub subject_id: String,
    pub paper_name: String,
    pub target_difficulty: Decimal, // 仅参考，落库时被实际难度覆盖
    pub type_counts: BTreeMap<QuestionType, u32>,
    pub type_ratios: Option<BTreeMap<QuestionType, Decimal>>,
    pub teacher_id: String,
    pub term: AcademicTerm,
    pub exam_type: ExamType,
}

/// 手动组卷请求
///
/// `entries` 的顺序即题序
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualAssemblyRequest {
    pub subject_id: String,
    pub paper_name: String,
    pub entries: Vec<(String, Decimal)>,
    pub target_difficulty: Decimal,
    pub teacher_id: String,
    pub term: AcademicTerm,
    pub exam_type: ExamType,
}

/// 试卷列表过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperFilter {
    pub subject_id: Option<String>,
    pub teacher_id: Option<String>,
    pub status: Option<PaperStatus>,
    pub exam_type: Option<ExamType>,
    pub term: Option<AcademicTerm>,
}
