// ==========================================
// 考试引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 约束: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod directory;
pub mod exam;
pub mod paper;
pub mod participation;
pub mod question;
pub mod score;
pub mod types;

// 重导出核心类型
pub use directory::{College, SchoolClass, Student, Subject, Teacher};
pub use exam::{
    Exam, ExamFilter, ExamPhase, ExamProgress, FinalExamPublication, FinalExamRequest, RegularExamRequest,
    RetakeExamRequest, TransitionOutcome,
};
pub use paper::{
    AutoAssemblyRequest, ExamPaper, ManualAssemblyRequest, PaperDetail, PaperFilter,
    PaperQuestion, PaperQuestionView,
};
pub use participation::{
    ExamHistoryEntry, ExamParticipation, ParticipationSummary, RetakeCandidate,
    RetakeCandidateQuery, ABSENT_COMMENT,
};
pub use question::{Question, QuestionOption};
pub use score::{GradeOutcome, StudentQuestionScore, SubmissionGradeSummary};
pub use types::{
    AcademicTerm, ExamStatus, ExamType, GradingStatus, PaperStatus, PermissionLevel, QuestionType,
};
