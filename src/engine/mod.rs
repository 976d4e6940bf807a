// ==========================================
// 考试引擎 - 引擎层
// ==========================================
// 职责: 组卷 / 判分 / 考试生命周期 / 参考记录 / 自动处理
// 约束: Engine 不拼 SQL，数据访问全部经由 Repository
// ==========================================

pub mod assembler;
pub mod auto_process;
pub mod clock;
pub mod error;
pub mod events;
pub mod grading;
pub mod lifecycle;
pub mod participation;
pub mod random;
pub mod ratio;
pub mod repositories;

// 重导出核心引擎
pub use assembler::PaperAssembler;
pub use auto_process::{AutoProcessReport, ExamAutoProcessor};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use events::{
    ExamEvent, ExamEventPublisher, ExamEventType, NoOpEventPublisher, OptionalEventPublisher,
    TracingEventPublisher,
};
pub use grading::{evaluate_answer, GradingEngine};
pub use lifecycle::ExamLifecycleController;
pub use participation::ParticipationTracker;
pub use random::SelectionRng;
pub use repositories::ExamRepositories;
