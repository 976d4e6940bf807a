// ==========================================
// 考试引擎 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合考试流程所需的全部 Repository
// 目标: 减少各引擎构造函数参数数量
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    DirectoryRepository, ExamRepository, PaperRepository, ParticipationRepository,
    QuestionRepository, ScoreRepository,
};

/// 考试仓储集合
///
/// # 包含的仓储
/// - `question_repo`: 题库
/// - `paper_repo`: 试卷与题目关联
/// - `exam_repo`: 考试与班级关联
/// - `participation_repo`: 考生参考记录
/// - `score_repo`: 小题得分
/// - `directory_repo`: 组织目录
#[derive(Clone)]
pub struct ExamRepositories {
    pub question_repo: Arc<QuestionRepository>,
    pub paper_repo: Arc<PaperRepository>,
    pub exam_repo: Arc<ExamRepository>,
    pub participation_repo: Arc<ParticipationRepository>,
    pub score_repo: Arc<ScoreRepository>,
    pub directory_repo: Arc<DirectoryRepository>,
}

impl ExamRepositories {
    /// 基于同一共享连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            question_repo: Arc::new(QuestionRepository::from_connection(conn.clone())),
            paper_repo: Arc::new(PaperRepository::from_connection(conn.clone())),
            exam_repo: Arc::new(ExamRepository::from_connection(conn.clone())),
            participation_repo: Arc::new(ParticipationRepository::from_connection(conn.clone())),
            score_repo: Arc::new(ScoreRepository::from_connection(conn.clone())),
            directory_repo: Arc::new(DirectoryRepository::from_connection(conn)),
        }
    }
}
