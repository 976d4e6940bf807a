// ==========================================
// 考试引擎 - 行解码辅助
// ==========================================
// 定点小数以 TEXT 存储；枚举以编码/字符串存储
// 解码失败统一转为 FromSqlConversionFailure
// ==========================================

use crate::domain::types::{AcademicTerm, ExamStatus, ExamType, GradingStatus, PaperStatus, QuestionType};
use rusqlite::types::Type;
use rusqlite::Row;
use rust_decimal::Decimal;
use std::str::FromStr;

fn conversion_error(idx: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, message.into())
}

pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(raw.trim())
        .map_err(|e| conversion_error(idx, Type::Text, format!("非法小数 '{}': {}", raw, e)))
}

pub(crate) fn question_type_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<QuestionType> {
    let code: i32 = row.get(idx)?;
    QuestionType::from_code(code)
        .ok_or_else(|| conversion_error(idx, Type::Integer, format!("未知题型编码: {}", code)))
}

pub(crate) fn exam_status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<ExamStatus> {
    let code: i32 = row.get(idx)?;
    ExamStatus::from_code(code)
        .ok_or_else(|| conversion_error(idx, Type::Integer, format!("未知考试状态: {}", code)))
}

pub(crate) fn grading_status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<GradingStatus> {
    let code: i32 = row.get(idx)?;
    GradingStatus::from_code(code)
        .ok_or_else(|| conversion_error(idx, Type::Integer, format!("未知判分状态: {}", code)))
}

pub(crate) fn exam_type_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<ExamType> {
    let raw: String = row.get(idx)?;
    ExamType::from_db_str(&raw)
        .ok_or_else(|| conversion_error(idx, Type::Text, format!("未知考试类型: {}", raw)))
}

pub(crate) fn paper_status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<PaperStatus> {
    let raw: String = row.get(idx)?;
    PaperStatus::from_db_str(&raw)
        .ok_or_else(|| conversion_error(idx, Type::Text, format!("未知试卷状态: {}", raw)))
}

pub(crate) fn term_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<AcademicTerm> {
    let raw: String = row.get(idx)?;
    AcademicTerm::from_db_str(&raw)
        .ok_or_else(|| conversion_error(idx, Type::Text, format!("非法学期: {}", raw)))
}
