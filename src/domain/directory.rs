// ==========================================
// 考试引擎 - 组织目录模型
// ==========================================
// 学院 / 课程 / 教师 / 学生 / 班级
// 由外部 CRUD 维护，引擎只读
// ==========================================

use crate::domain::types::PermissionLevel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct College {
    pub college_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_id: String,
    pub name: String,
    pub college_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub teacher_id: String,
    pub name: String,
    pub permission: PermissionLevel,
    pub college_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub college_id: String,
}

/// 教学班
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolClass {
    pub class_id: String,
    pub name: String,
    pub subject_id: String,
    pub final_exam: bool, // 是否已安排期末考试
}
