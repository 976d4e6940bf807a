// ==========================================
// 考试引擎 - 领域类型定义
// ==========================================
// 题型 / 试卷状态 / 考试类型 / 考试状态 / 判分状态 / 学期
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

use chrono::NaiveDate;

// ==========================================
// 题型 (Question Type)
// ==========================================
// 数字编码: 0 单选 / 1 多选 / 2 判断 / 3 填空 / 4 简答
// 排序按编码升序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    SingleChoice,   // 单选
    MultipleChoice, // 多选
    TrueFalse,      // 判断
    FillBlank,      // 填空
    Essay,          // 简答
}

impl QuestionType {
    /// 全部题型（编码升序）
    pub const ALL: [QuestionType; 5] = [
        QuestionType::SingleChoice,
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::FillBlank,
        QuestionType::Essay,
    ];

    /// 数字编码
    pub fn code(&self) -> i32 {
        match self {
            QuestionType::SingleChoice => 0,
            QuestionType::MultipleChoice => 1,
            QuestionType::TrueFalse => 2,
            QuestionType::FillBlank => 3,
            QuestionType::Essay => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(QuestionType::SingleChoice),
            1 => Some(QuestionType::MultipleChoice),
            2 => Some(QuestionType::TrueFalse),
            3 => Some(QuestionType::FillBlank),
            4 => Some(QuestionType::Essay),
            _ => None,
        }
    }

    /// 客观题可自动判分
    pub fn is_objective(&self) -> bool {
        matches!(
            self,
            QuestionType::SingleChoice | QuestionType::MultipleChoice | QuestionType::TrueFalse
        )
    }

    /// 选择题带选项
    pub fn has_options(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultipleChoice)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::SingleChoice => write!(f, "SINGLE_CHOICE"),
            QuestionType::MultipleChoice => write!(f, "MULTIPLE_CHOICE"),
            QuestionType::TrueFalse => write!(f, "TRUE_FALSE"),
            QuestionType::FillBlank => write!(f, "FILL_BLANK"),
            QuestionType::Essay => write!(f, "ESSAY"),
        }
    }
}

// ==========================================
// 试卷状态 (Paper Status)
// ==========================================
// Draft -> Published 仅一次，不可回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaperStatus {
    Draft,     // 未发布
    Published, // 已发布
}

impl PaperStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PaperStatus::Draft => "DRAFT",
            PaperStatus::Published => "PUBLISHED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(PaperStatus::Draft),
            "PUBLISHED" => Some(PaperStatus::Published),
            _ => None,
        }
    }
}

impl fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 考试类型 (Exam Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamType {
    Regular, // 平时考试
    Final,   // 期末考试
    Retake,  // 补考
}

impl ExamType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ExamType::Regular => "REGULAR",
            ExamType::Final => "FINAL",
            ExamType::Retake => "RETAKE",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "REGULAR" => Some(ExamType::Regular),
            "FINAL" => Some(ExamType::Final),
            "RETAKE" => Some(ExamType::Retake),
            _ => None,
        }
    }

    /// 考试名称前缀
    pub fn display_label(&self) -> &'static str {
        match self {
            ExamType::Regular => "平时考试",
            ExamType::Final => "期末考试",
            ExamType::Retake => "补考",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 考试状态 (Exam Status)
// ==========================================
// 状态机: NotStarted(0) -> Published(1) -> InProgress(2) -> Ended(3)
// 严格单向，按编码比较先后
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamStatus {
    NotStarted, // 未开始（草稿）
    Published,  // 已发布，学生可见
    InProgress, // 进行中，接受作答
    Ended,      // 已结束
}

impl ExamStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExamStatus::NotStarted => 0,
            ExamStatus::Published => 1,
            ExamStatus::InProgress => 2,
            ExamStatus::Ended => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExamStatus::NotStarted),
            1 => Some(ExamStatus::Published),
            2 => Some(ExamStatus::InProgress),
            3 => Some(ExamStatus::Ended),
            _ => None,
        }
    }

    /// 唯一合法后继
    pub fn next(&self) -> Option<ExamStatus> {
        match self {
            ExamStatus::NotStarted => Some(ExamStatus::Published),
            ExamStatus::Published => Some(ExamStatus::InProgress),
            ExamStatus::InProgress => Some(ExamStatus::Ended),
            ExamStatus::Ended => None,
        }
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamStatus::NotStarted => write!(f, "NOT_STARTED"),
            ExamStatus::Published => write!(f, "PUBLISHED"),
            ExamStatus::InProgress => write!(f, "IN_PROGRESS"),
            ExamStatus::Ended => write!(f, "ENDED"),
        }
    }
}

// ==========================================
// 判分状态 (Grading Status)
// ==========================================
// Ungraded: 主观题等待人工阅卷
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradingStatus {
    Ungraded,
    Graded,
}

impl GradingStatus {
    pub fn code(&self) -> i32 {
        match self {
            GradingStatus::Ungraded => 0,
            GradingStatus::Graded => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(GradingStatus::Ungraded),
            1 => Some(GradingStatus::Graded),
            _ => None,
        }
    }
}

impl fmt::Display for GradingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingStatus::Ungraded => write!(f, "UNGRADED"),
            GradingStatus::Graded => write!(f, "GRADED"),
        }
    }
}

// ==========================================
// 教师权限 (Teacher Permission)
// ==========================================
// 0: 可发布全部考试
// 1: 可发布平时考试/补考
// 2: 仅可组卷
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionLevel(pub i32);

impl PermissionLevel {
    pub const ALL_EXAMS: PermissionLevel = PermissionLevel(0);
    pub const REGULAR_EXAMS: PermissionLevel = PermissionLevel(1);
    pub const COMPOSE_ONLY: PermissionLevel = PermissionLevel(2);

    pub fn can_publish_final(&self) -> bool {
        *self == Self::ALL_EXAMS
    }

    pub fn can_publish_regular(&self) -> bool {
        *self == Self::ALL_EXAMS || *self == Self::REGULAR_EXAMS
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// 学期 (Academic Term)
// ==========================================
// 第 1 学期自 1 月 1 日起，第 2 学期自 6 月 1 日起
// 数据库格式: "YYYY-S"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcademicTerm {
    pub year: i32,
    pub semester: u8,
}

impl AcademicTerm {
    /// 创建学期（semester 只接受 1 或 2）
    pub fn new(year: i32, semester: u8) -> Option<Self> {
        if semester == 1 || semester == 2 {
            Some(Self { year, semester })
        } else {
            None
        }
    }

    /// 学期起始日
    pub fn start_date(&self) -> Option<NaiveDate> {
        let month = if self.semester == 1 { 1 } else { 6 };
        NaiveDate::from_ymd_opt(self.year, month, 1)
    }

    pub fn to_db_str(&self) -> String {
        format!("{}-{}", self.year, self.semester)
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        let (year, semester) = s.split_once('-')?;
        let year = year.trim().parse::<i32>().ok()?;
        let semester = semester.trim().parse::<u8>().ok()?;
        Self::new(year, semester)
    }
}

impl fmt::Display for AcademicTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_code_roundtrip() {
        for t in QuestionType::ALL {
            assert_eq!(QuestionType::from_code(t.code()), Some(t));
        }
        assert_eq!(QuestionType::from_code(9), None);
    }

    #[test]
    fn test_question_type_order_follows_code() {
        let mut types = vec![QuestionType::Essay, QuestionType::TrueFalse, QuestionType::SingleChoice];
        types.sort();
        assert_eq!(
            types,
            vec![QuestionType::SingleChoice, QuestionType::TrueFalse, QuestionType::Essay]
        );
    }

    #[test]
    fn test_exam_status_forward_only() {
        assert_eq!(ExamStatus::NotStarted.next(), Some(ExamStatus::Published));
        assert_eq!(ExamStatus::InProgress.next(), Some(ExamStatus::Ended));
        assert_eq!(ExamStatus::Ended.next(), None);
        assert!(ExamStatus::NotStarted < ExamStatus::Ended);
    }

    #[test]
    fn test_academic_term() {
        let term = AcademicTerm::from_db_str("2025-2").unwrap();
        assert_eq!(term.year, 2025);
        assert_eq!(term.semester, 2);
        assert_eq!(term.start_date(), NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(AcademicTerm::new(2025, 1).unwrap().start_date(), NaiveDate::from_ymd_opt(2025, 1, 1));
        assert!(AcademicTerm::new(2025, 3).is_none());
        assert!(AcademicTerm::from_db_str("abc").is_none());
    }

    #[test]
    fn test_permission_level() {
        assert!(PermissionLevel::ALL_EXAMS.can_publish_final());
        assert!(!PermissionLevel::REGULAR_EXAMS.can_publish_final());
        assert!(PermissionLevel::REGULAR_EXAMS.can_publish_regular());
        assert!(!PermissionLevel::COMPOSE_ONLY.can_publish_regular());
    }
}
