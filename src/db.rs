// ==========================================
// 考试引擎 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 幂等建表，记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
///
/// 旧版本库只告警，不做自动迁移
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    match read_schema_version(conn)? {
        Some(v) if v < CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                found = v,
                expected = CURRENT_SCHEMA_VERSION,
                "数据库 schema_version 低于预期"
            );
        }
        Some(_) => {}
        None => {
            conn.execute(
                "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
                [CURRENT_SCHEMA_VERSION],
            )?;
        }
    }
    Ok(())
}

// ==========================================
// 建表 SQL
// ==========================================
// 分值/比例/难度: TEXT 保存定点小数
// 时间: TEXT "YYYY-MM-DD HH:MM:SS"
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

-- ===== 组织目录 =====
CREATE TABLE IF NOT EXISTS college (
    college_id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subject (
    subject_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    college_id TEXT NOT NULL REFERENCES college(college_id)
);

CREATE TABLE IF NOT EXISTS teacher (
    teacher_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    permission INTEGER NOT NULL DEFAULT 2,
    college_id TEXT REFERENCES college(college_id)
);

CREATE TABLE IF NOT EXISTS student (
    student_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    college_id TEXT NOT NULL REFERENCES college(college_id)
);

CREATE TABLE IF NOT EXISTS school_class (
    class_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    subject_id TEXT NOT NULL REFERENCES subject(subject_id),
    final_exam INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS class_student (
    class_id TEXT NOT NULL REFERENCES school_class(class_id),
    student_id TEXT NOT NULL REFERENCES student(student_id),
    PRIMARY KEY (class_id, student_id)
);

-- ===== 题库 =====
CREATE TABLE IF NOT EXISTS question (
    question_id TEXT PRIMARY KEY,
    bank_id TEXT NOT NULL,
    subject_id TEXT NOT NULL REFERENCES subject(subject_id),
    question_type INTEGER NOT NULL,
    content TEXT NOT NULL,
    correct_answer TEXT NOT NULL,
    difficulty TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_question_subject_type ON question(subject_id, question_type);

CREATE TABLE IF NOT EXISTS question_option (
    option_id TEXT PRIMARY KEY,
    question_id TEXT NOT NULL REFERENCES question(question_id) ON DELETE CASCADE,
    label TEXT NOT NULL,
    content TEXT NOT NULL,
    is_correct INTEGER NOT NULL DEFAULT 0
);

-- ===== 试卷 =====
CREATE TABLE IF NOT EXISTS exam_paper (
    paper_id TEXT PRIMARY KEY,
    paper_name TEXT NOT NULL,
    subject_id TEXT NOT NULL REFERENCES subject(subject_id),
    teacher_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'DRAFT',
    exam_type TEXT NOT NULL,
    term TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_paper_subject_term ON exam_paper(subject_id, term, exam_type, status);

CREATE TABLE IF NOT EXISTS paper_question (
    paper_id TEXT NOT NULL REFERENCES exam_paper(paper_id) ON DELETE CASCADE,
    question_id TEXT NOT NULL REFERENCES question(question_id),
    ordinal INTEGER NOT NULL,
    score TEXT NOT NULL,
    PRIMARY KEY (paper_id, question_id)
);

-- ===== 考试 =====
CREATE TABLE IF NOT EXISTS exam (
    exam_id TEXT PRIMARY KEY,
    exam_name TEXT NOT NULL,
    paper_id TEXT NOT NULL REFERENCES exam_paper(paper_id),
    subject_id TEXT NOT NULL REFERENCES subject(subject_id),
    teacher_id TEXT NOT NULL,
    status INTEGER NOT NULL DEFAULT 0,
    exam_type TEXT NOT NULL,
    start_time TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL,
    end_time TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_exam_status ON exam(status, start_time);

CREATE TABLE IF NOT EXISTS exam_class (
    exam_id TEXT NOT NULL REFERENCES exam(exam_id) ON DELETE CASCADE,
    class_id TEXT NOT NULL REFERENCES school_class(class_id),
    PRIMARY KEY (exam_id, class_id)
);

CREATE TABLE IF NOT EXISTS exam_participation (
    participation_id TEXT PRIMARY KEY,
    exam_id TEXT NOT NULL REFERENCES exam(exam_id) ON DELETE CASCADE,
    student_id TEXT NOT NULL REFERENCES student(student_id),
    start_time TEXT,
    submit_time TEXT,
    absent INTEGER NOT NULL DEFAULT 0,
    disciplinary INTEGER NOT NULL DEFAULT 0,
    retake_needed INTEGER NOT NULL DEFAULT 0,
    comment TEXT,
    UNIQUE (exam_id, student_id)
);
CREATE INDEX IF NOT EXISTS idx_participation_student ON exam_participation(student_id);

CREATE TABLE IF NOT EXISTS student_question_score (
    record_id TEXT PRIMARY KEY,
    exam_id TEXT NOT NULL REFERENCES exam(exam_id) ON DELETE CASCADE,
    student_id TEXT NOT NULL REFERENCES student(student_id),
    question_id TEXT NOT NULL REFERENCES question(question_id),
    score_id TEXT,
    answer TEXT,
    score TEXT NOT NULL DEFAULT '0',
    status INTEGER NOT NULL DEFAULT 0,
    UNIQUE (exam_id, student_id, question_id)
);
"#;
