// ==========================================
// 考试引擎 - 题库领域模型
// ==========================================
// 题目一旦被已发布试卷引用即视为不可变（由流程约束，不由存储约束）
// ==========================================

use crate::domain::types::QuestionType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,
    pub bank_id: String,
    pub subject_id: String,
    pub question_type: QuestionType,
    pub content: String,
    pub correct_answer: String, // 多选为逗号分隔的选项标签，判断为 "0"/"1"
    pub difficulty: Decimal,    // [0, 1]
    pub options: Vec<QuestionOption>,
}

/// 选项（仅选择题）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub option_id: String,
    pub question_id: String,
    pub label: String,
    pub content: String,
    pub is_correct: bool,
}
