// ==========================================
// 考试引擎 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: Repository 不含业务逻辑
// ==========================================

pub mod directory_repo;
pub mod error;
pub mod exam_repo;
pub mod paper_repo;
pub mod participation_repo;
pub mod question_repo;
pub(crate) mod row_codec;
pub mod score_repo;

// 重导出核心仓储
pub use directory_repo::{DirectoryLookup, DirectoryRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use exam_repo::{ExamRepository, NewExamBundle};
pub use paper_repo::PaperRepository;
pub use participation_repo::{ParticipationCounts, ParticipationRepository};
pub use question_repo::{QuestionCatalog, QuestionRepository};
pub use score_repo::ScoreRepository;
