// ==========================================
// 考试引擎 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 所有 Repository 共享同一数据库连接
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{ExamApi, GradingApi, PaperApi};
use crate::config::{ConfigManager, EngineSettings};
use crate::engine::{
    Clock, ExamAutoProcessor, ExamEventPublisher, ExamLifecycleController, ExamRepositories,
    GradingEngine, OptionalEventPublisher, PaperAssembler, ParticipationTracker, SelectionRng,
    SystemClock, TracingEventPublisher,
};
use crate::repository::{DirectoryLookup, QuestionCatalog};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生效的引擎配置
    pub settings: EngineSettings,

    pub config_manager: Arc<ConfigManager>,

    /// 仓储集合（种子数据/目录维护）
    pub repos: ExamRepositories,

    pub clock: Arc<dyn Clock>,

    /// 试卷API
    pub paper_api: Arc<PaperApi>,

    /// 考试API
    pub exam_api: Arc<ExamApi>,

    /// 判分API
    pub grading_api: Arc<GradingApi>,

    /// 考试自动处理（由运行器周期调用）
    pub auto_processor: Arc<ExamAutoProcessor>,
}

impl AppState {
    /// 创建新的AppState实例（系统时钟 + 随机种子 + 日志事件）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let publisher: Arc<dyn ExamEventPublisher> = Arc::new(TracingEventPublisher);

        Self::with_components(
            db_path,
            conn,
            Arc::new(SystemClock),
            Arc::new(SelectionRng::from_entropy()),
            OptionalEventPublisher::with_publisher(publisher),
        )
    }

    /// 使用指定连接与协作者装配（测试注入 FixedClock / 固定种子）
    pub fn with_components(
        db_path: String,
        conn: Connection,
        clock: Arc<dyn Clock>,
        rng: Arc<SelectionRng>,
        events: OptionalEventPublisher,
    ) -> Result<Self, String> {
        crate::db::configure_sqlite_connection(&conn)
            .map_err(|e| format!("数据库连接配置失败: {}", e))?;
        crate::db::ensure_schema(&conn).map_err(|e| format!("数据库表结构初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let settings = config_manager
            .load_engine_settings()
            .map_err(|e| format!("引擎配置无效: {}", e))?;

        // ==========================================
        // Repository层
        // ==========================================
        let repos = ExamRepositories::from_connection(conn);
        let catalog: Arc<dyn QuestionCatalog> = repos.question_repo.clone();
        let directory: Arc<dyn DirectoryLookup> = repos.directory_repo.clone();

        // ==========================================
        // Engine层
        // ==========================================
        let assembler = Arc::new(PaperAssembler::new(
            catalog.clone(),
            repos.paper_repo.clone(),
            rng.clone(),
            clock.clone(),
            events.clone(),
        ));
        let grading = Arc::new(GradingEngine::new(
            catalog,
            repos.paper_repo.clone(),
            repos.exam_repo.clone(),
            repos.participation_repo.clone(),
            repos.score_repo.clone(),
            settings.pass_score,
            clock.clone(),
            events.clone(),
        ));
        let lifecycle = Arc::new(ExamLifecycleController::new(
            repos.clone(),
            directory,
            clock.clone(),
            rng,
            settings.clone(),
            events.clone(),
        ));
        let tracker = Arc::new(ParticipationTracker::new(
            repos.exam_repo.clone(),
            repos.participation_repo.clone(),
            clock.clone(),
            events.clone(),
        ));
        let auto_processor = Arc::new(ExamAutoProcessor::new(
            repos.clone(),
            lifecycle.clone(),
            tracker.clone(),
            settings.absent_grace_minutes,
            events,
        ));

        // ==========================================
        // API层
        // ==========================================
        let paper_api = Arc::new(PaperApi::new(assembler, repos.question_repo.clone()));
        let exam_api = Arc::new(ExamApi::new(lifecycle, tracker));
        let grading_api = Arc::new(GradingApi::new(grading));

        tracing::info!(
            min_duration = settings.min_duration_minutes,
            max_duration = settings.max_duration_minutes,
            absent_grace = settings.absent_grace_minutes,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            settings,
            config_manager,
            repos,
            clock,
            paper_api,
            exam_api,
            grading_api,
            auto_processor,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 EXAM_ENGINE_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("EXAM_ENGINE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./exam_engine.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("exam-engine");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("exam_engine.db");
        }
    }

    path.to_string_lossy().to_string()
}
