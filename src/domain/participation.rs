// ==========================================
// 考试引擎 - 考生参考记录模型
// ==========================================
// (exam_id, student_id) 唯一
// 学生开考或被标记时惰性创建
// ==========================================

use crate::domain::types::{ExamStatus, ExamType};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 缺考默认评语
pub const ABSENT_COMMENT: &str = "缺考";

/// 考生参考记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamParticipation {
    pub participation_id: String,
    pub exam_id: String,
    pub student_id: String,
    pub start_time: Option<NaiveDateTime>,
    pub submit_time: Option<NaiveDateTime>,
    pub absent: bool,
    pub disciplinary: bool,
    pub retake_needed: bool,
    pub comment: Option<String>,
}

impl ExamParticipation {
    /// 新建空白记录
    pub fn blank(participation_id: String, exam_id: &str, student_id: &str) -> Self {
        Self {
            participation_id,
            exam_id: exam_id.to_string(),
            student_id: student_id.to_string(),
            start_time: None,
            submit_time: None,
            absent: false,
            disciplinary: false,
            retake_needed: false,
            comment: None,
        }
    }

    /// 已开考未交卷
    pub fn is_unfinished(&self) -> bool {
        self.start_time.is_some() && self.submit_time.is_none()
    }
}

/// 参考情况汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationSummary {
    pub exam_id: String,
    pub roster_count: i64,
    pub started_count: i64,
    pub submitted_count: i64,
    pub absent_count: i64,
    pub participation_rate: Decimal, // 百分比，2 位小数
}

/// 补考候选人
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetakeCandidate {
    pub student_id: String,
    pub student_name: String,
    pub college_id: String,
    pub exam_id: String,
    pub exam_name: String,
    pub exam_start_time: NaiveDateTime,
    pub absent: bool,
    pub comment: Option<String>,
}

/// 补考候选人查询条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetakeCandidateQuery {
    pub student_name: Option<String>, // 模糊匹配
    pub exam_start_from: Option<NaiveDateTime>,
    pub exam_start_to: Option<NaiveDateTime>,
}

/// 学生考试履历条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamHistoryEntry {
    pub participation: ExamParticipation,
    pub exam_name: String,
    pub exam_type: ExamType,
    pub exam_status: ExamStatus,
    pub subject_id: String,
    pub exam_start_time: NaiveDateTime,
    pub exam_end_time: NaiveDateTime,
}
