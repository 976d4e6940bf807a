// ==========================================
// 考试引擎 - 考生参考记录仓储
// ==========================================
// exam_participation
// 记录惰性创建: 先 INSERT OR IGNORE 占位，再按字段更新
// ==========================================

use crate::domain::participation::{
    ExamHistoryEntry, ExamParticipation, RetakeCandidate, RetakeCandidateQuery, ABSENT_COMMENT,
};
use crate::domain::types::GradingStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{exam_status_at, exam_type_at};
use chrono::NaiveDateTime;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const PARTICIPATION_COLUMNS: &str = "p.participation_id, p.exam_id, p.student_id, p.start_time, p.submit_time, p.absent, p.disciplinary, p.retake_needed, p.comment";

// 需补考标记在学生报名同课程更晚的补考后失效
const RETAKE_FLAG_OPEN: &str = r#"
    p.retake_needed = 1
    AND NOT EXISTS (
        SELECT 1
        FROM exam_participation rp
        JOIN exam re ON re.exam_id = rp.exam_id
        WHERE rp.student_id = p.student_id
          AND re.subject_id = e.subject_id
          AND re.exam_type = 'RETAKE'
          AND re.start_time > e.start_time
    )
"#;

/// 参考人数统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticipationCounts {
    pub started: i64,
    pub submitted: i64,
    pub absent: i64,
}

// ==========================================
// ParticipationRepository
// ==========================================
pub struct ParticipationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ParticipationRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub(crate) fn map_participation(row: &Row<'_>) -> rusqlite::Result<ExamParticipation> {
        Ok(ExamParticipation {
            participation_id: row.get(0)?,
            exam_id: row.get(1)?,
            student_id: row.get(2)?,
            start_time: row.get(3)?,
            submit_time: row.get(4)?,
            absent: row.get(5)?,
            disciplinary: row.get(6)?,
            retake_needed: row.get(7)?,
            comment: row.get(8)?,
        })
    }

    /// 占位插入（已存在则忽略）
    fn ensure_row(conn: &Connection, exam_id: &str, student_id: &str) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT OR IGNORE INTO exam_participation (participation_id, exam_id, student_id)
            VALUES (?1, ?2, ?3)
            "#,
            params![Uuid::new_v4().to_string(), exam_id, student_id],
        )?;
        Ok(())
    }

    fn find_with(
        conn: &Connection,
        exam_id: &str,
        student_id: &str,
    ) -> rusqlite::Result<Option<ExamParticipation>> {
        let sql = format!(
            "SELECT {} FROM exam_participation p WHERE p.exam_id = ?1 AND p.student_id = ?2",
            PARTICIPATION_COLUMNS
        );
        conn.query_row(&sql, params![exam_id, student_id], Self::map_participation)
            .optional()
    }

    /// 占位后执行更新并返回最新记录
    fn ensure_and_update(
        &self,
        exam_id: &str,
        student_id: &str,
        update_sql: &str,
        extra: &[&dyn ToSql],
    ) -> RepositoryResult<ExamParticipation> {
        let conn = self.get_conn()?;
        Self::ensure_row(&conn, exam_id, student_id)?;

        let mut bind: Vec<&dyn ToSql> = vec![&exam_id, &student_id];
        bind.extend_from_slice(extra);
        conn.execute(update_sql, bind.as_slice())?;

        Self::find_with(&conn, exam_id, student_id)?
            .ok_or_else(|| RepositoryError::not_found("ExamParticipation", &format!("{}/{}", exam_id, student_id)))
    }

    /// 查询参考记录
    pub fn find(&self, exam_id: &str, student_id: &str) -> RepositoryResult<Option<ExamParticipation>> {
        let conn = self.get_conn()?;
        Ok(Self::find_with(&conn, exam_id, student_id)?)
    }

    /// 查询或创建参考记录
    pub fn get_or_create(&self, exam_id: &str, student_id: &str) -> RepositoryResult<ExamParticipation> {
        let conn = self.get_conn()?;
        Self::ensure_row(&conn, exam_id, student_id)?;
        Self::find_with(&conn, exam_id, student_id)?
            .ok_or_else(|| RepositoryError::not_found("ExamParticipation", &format!("{}/{}", exam_id, student_id)))
    }

    /// 记录开考时间（仅首次生效）
    pub fn record_start(
        &self,
        exam_id: &str,
        student_id: &str,
        at: NaiveDateTime,
    ) -> RepositoryResult<ExamParticipation> {
        self.ensure_and_update(
            exam_id,
            student_id,
            "UPDATE exam_participation SET start_time = ?3 WHERE exam_id = ?1 AND student_id = ?2 AND start_time IS NULL",
            &[&at],
        )
    }

    /// 记录交卷时间（仅首次生效）
    pub fn record_submit(
        &self,
        exam_id: &str,
        student_id: &str,
        at: NaiveDateTime,
    ) -> RepositoryResult<ExamParticipation> {
        self.ensure_and_update(
            exam_id,
            student_id,
            "UPDATE exam_participation SET submit_time = ?3 WHERE exam_id = ?1 AND student_id = ?2 AND submit_time IS NULL",
            &[&at],
        )
    }

    /// 标记缺考（同时标记需补考，已有评语时保留）
    pub fn mark_absent(&self, exam_id: &str, student_id: &str) -> RepositoryResult<ExamParticipation> {
        self.ensure_and_update(
            exam_id,
            student_id,
            "UPDATE exam_participation SET absent = 1, retake_needed = 1, comment = COALESCE(comment, ?3) WHERE exam_id = ?1 AND student_id = ?2",
            &[&ABSENT_COMMENT],
        )
    }

    /// 标记违纪
    pub fn mark_disciplinary(
        &self,
        exam_id: &str,
        student_id: &str,
        comment: &str,
    ) -> RepositoryResult<ExamParticipation> {
        self.ensure_and_update(
            exam_id,
            student_id,
            "UPDATE exam_participation SET disciplinary = 1, comment = ?3 WHERE exam_id = ?1 AND student_id = ?2",
            &[&comment],
        )
    }

    /// 填写评语
    pub fn set_comment(
        &self,
        exam_id: &str,
        student_id: &str,
        comment: &str,
    ) -> RepositoryResult<ExamParticipation> {
        self.ensure_and_update(
            exam_id,
            student_id,
            "UPDATE exam_participation SET comment = ?3 WHERE exam_id = ?1 AND student_id = ?2",
            &[&comment],
        )
    }

    /// 标记需补考
    pub fn flag_retake(&self, exam_id: &str, student_id: &str) -> RepositoryResult<ExamParticipation> {
        self.ensure_and_update(
            exam_id,
            student_id,
            "UPDATE exam_participation SET retake_needed = 1 WHERE exam_id = ?1 AND student_id = ?2",
            &[],
        )
    }

    /// 新增参考记录（已存在时报唯一约束错误）
    pub fn insert(&self, participation: &ExamParticipation) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO exam_participation (
                participation_id, exam_id, student_id, start_time, submit_time,
                absent, disciplinary, retake_needed, comment
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                participation.participation_id,
                participation.exam_id,
                participation.student_id,
                participation.start_time,
                participation.submit_time,
                participation.absent,
                participation.disciplinary,
                participation.retake_needed,
                participation.comment,
            ],
        )?;
        Ok(())
    }

    /// 考试的全部参考记录
    pub fn list_by_exam(&self, exam_id: &str) -> RepositoryResult<Vec<ExamParticipation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM exam_participation p WHERE p.exam_id = ?1 ORDER BY p.student_id ASC",
            PARTICIPATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![exam_id], Self::map_participation)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 参考人数统计
    pub fn counts(&self, exam_id: &str) -> RepositoryResult<ParticipationCounts> {
        let conn = self.get_conn()?;
        let counts = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN start_time IS NOT NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN submit_time IS NOT NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN absent = 1 THEN 1 ELSE 0 END), 0)
            FROM exam_participation
            WHERE exam_id = ?1
            "#,
            params![exam_id],
            |row| {
                Ok(ParticipationCounts {
                    started: row.get(0)?,
                    submitted: row.get(1)?,
                    absent: row.get(2)?,
                })
            },
        )?;
        Ok(counts)
    }

    /// 学生在课程上是否仍有未消耗的需补考标记
    pub fn has_retake_flag(&self, student_id: &str, subject_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT 1
            FROM exam_participation p
            JOIN exam e ON e.exam_id = p.exam_id
            WHERE p.student_id = ?1 AND e.subject_id = ?2 AND {}
            LIMIT 1
            "#,
            RETAKE_FLAG_OPEN
        );
        let flagged = conn
            .query_row(
                &sql,
                params![student_id, subject_id],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(flagged)
    }

    /// 补考候选人
    ///
    /// `college_scope` 为 Some 时只返回该学院学生
    pub fn retake_candidates(
        &self,
        subject_id: &str,
        college_scope: Option<&str>,
        query: &RetakeCandidateQuery,
    ) -> RepositoryResult<Vec<RetakeCandidate>> {
        let mut sql = format!(
            r#"
            SELECT s.student_id, s.name, s.college_id, e.exam_id, e.exam_name, e.start_time, p.absent, p.comment
            FROM exam_participation p
            JOIN exam e ON e.exam_id = p.exam_id
            JOIN student s ON s.student_id = p.student_id
            WHERE e.subject_id = ?1 AND {}
            "#,
            RETAKE_FLAG_OPEN
        );
        let name_pattern = query
            .student_name
            .as_ref()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(|n| format!("%{}%", n));

        let mut bind: Vec<&dyn ToSql> = vec![&subject_id];
        if let Some(college_id) = &college_scope {
            bind.push(college_id);
            sql.push_str(&format!(" AND s.college_id = ?{}", bind.len()));
        }
        if let Some(pattern) = &name_pattern {
            bind.push(pattern);
            sql.push_str(&format!(" AND s.name LIKE ?{}", bind.len()));
        }
        if let Some(from) = &query.exam_start_from {
            bind.push(from);
            sql.push_str(&format!(" AND e.start_time >= ?{}", bind.len()));
        }
        if let Some(to) = &query.exam_start_to {
            bind.push(to);
            sql.push_str(&format!(" AND e.start_time <= ?{}", bind.len()));
        }
        sql.push_str(" ORDER BY e.start_time DESC, s.student_id ASC");

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(bind.as_slice(), |row| {
                Ok(RetakeCandidate {
                    student_id: row.get(0)?,
                    student_name: row.get(1)?,
                    college_id: row.get(2)?,
                    exam_id: row.get(3)?,
                    exam_name: row.get(4)?,
                    exam_start_time: row.get(5)?,
                    absent: row.get(6)?,
                    comment: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 学生考试履历（开始时间倒序）
    pub fn history_for_student(&self, student_id: &str) -> RepositoryResult<Vec<ExamHistoryEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}, e.exam_name, e.exam_type, e.status, e.subject_id, e.start_time, e.end_time
            FROM exam_participation p
            JOIN exam e ON e.exam_id = p.exam_id
            WHERE p.student_id = ?1
            ORDER BY e.start_time DESC, e.exam_id ASC
            "#,
            PARTICIPATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id], |row| {
                Ok(ExamHistoryEntry {
                    participation: Self::map_participation(row)?,
                    exam_name: row.get(9)?,
                    exam_type: exam_type_at(row, 10)?,
                    exam_status: exam_status_at(row, 11)?,
                    subject_id: row.get(12)?,
                    exam_start_time: row.get(13)?,
                    exam_end_time: row.get(14)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 强制交卷（单事务）
    ///
    /// 未作答题目补零分记录（已判分），交卷时间置为 submit_time
    ///
    /// # 返回
    /// 新补的记录数
    pub fn force_submit(
        &self,
        exam_id: &str,
        student_id: &str,
        question_ids: &[String],
        submit_time: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO student_question_score (
                    record_id, exam_id, student_id, question_id, answer, score, status
                ) VALUES (?1, ?2, ?3, ?4, NULL, '0', ?5)
                "#,
            )?;
            for question_id in question_ids {
                inserted += stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    exam_id,
                    student_id,
                    question_id,
                    GradingStatus::Graded.code()
                ])?;
            }
        }

        let affected = tx.execute(
            r#"
            UPDATE exam_participation SET submit_time = ?3
            WHERE exam_id = ?1 AND student_id = ?2 AND submit_time IS NULL
            "#,
            params![exam_id, student_id, submit_time],
        )?;
        if affected != 1 {
            return Err(RepositoryError::ConcurrentModification(format!(
                "参考记录 {}/{} 已交卷或不存在",
                exam_id, student_id
            )));
        }

        tx.commit()?;
        Ok(inserted)
    }
}
