// ==========================================
// 考试引擎 - 考试领域模型
// ==========================================
// 结束时间 = 开始时间 + 时长
// ==========================================

use crate::domain::types::{AcademicTerm, ExamStatus, ExamType};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 考试
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub exam_id: String,
    pub exam_name: String,
    pub paper_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub status: ExamStatus,
    pub exam_type: ExamType,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i64,
    pub end_time: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

/// 状态迁移结果
///
/// 前置状态不符时返回 NotApplicable（不视为错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionOutcome {
    Applied { from: ExamStatus, to: ExamStatus },
    NotApplicable { current: ExamStatus },
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

// ==========================================
// 考试进度
// ==========================================

/// 按当前时间划分的考试阶段（与状态字段独立，状态由巡检推进）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamPhase {
    Upcoming,
    Running,
    Finished,
}

/// 考试进度快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamProgress {
    pub exam_id: String,
    pub status: ExamStatus,
    pub phase: ExamPhase,
    pub as_of: NaiveDateTime,
    pub minutes_to_start: i64, // 已开始为 0
    pub minutes_to_end: i64,   // 已结束为 0
    pub used_minutes: i64,
    pub duration_minutes: i64,
    pub progress_percent: Decimal, // 0-100，2 位小数
}

// ==========================================
// 发布请求
// ==========================================

/// 期末考试发布请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalExamRequest {
    pub teacher_id: String,
    pub subject_id: String,
    pub class_ids: Vec<String>,
    pub term: AcademicTerm,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i64,
}

/// 平时考试发布请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegularExamRequest {
    pub teacher_id: String,
    pub paper_id: String,
    pub class_ids: Vec<String>,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i64,
}

/// 补考发布请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetakeExamRequest {
    pub teacher_id: String,
    pub paper_id: String,
    pub student_ids: Vec<String>,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i64,
}

/// 期末发布结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalExamPublication {
    pub exam: Exam,
    pub selected_paper_id: String,
    pub published_paper_ids: Vec<String>,
    pub class_ids: Vec<String>,
}

/// 考试列表过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamFilter {
    pub subject_id: Option<String>,
    pub teacher_id: Option<String>,
    pub status: Option<ExamStatus>,
    pub exam_type: Option<ExamType>,
}
