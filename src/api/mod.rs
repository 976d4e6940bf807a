// ==========================================
// 考试引擎 - API 层
// ==========================================
// 职责: 面向上层控制器的业务接口
// ==========================================

pub mod error;
pub mod exam_api;
pub mod grading_api;
pub mod paper_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use exam_api::ExamApi;
pub use grading_api::GradingApi;
pub use paper_api::PaperApi;
