// ==========================================
// 考试引擎 - 小题得分仓储
// ==========================================
// student_question_score
// (exam_id, student_id, question_id) 唯一；记录只更新不删除
// ==========================================

use crate::domain::score::StudentQuestionScore;
use crate::domain::types::GradingStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{decimal_at, grading_status_at};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SCORE_COLUMNS: &str =
    "record_id, exam_id, student_id, question_id, score_id, answer, score, status";

pub struct ScoreRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScoreRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_score(row: &Row<'_>) -> rusqlite::Result<StudentQuestionScore> {
        Ok(StudentQuestionScore {
            record_id: row.get(0)?,
            exam_id: row.get(1)?,
            student_id: row.get(2)?,
            question_id: row.get(3)?,
            score_id: row.get(4)?,
            answer: row.get(5)?,
            score: decimal_at(row, 6)?,
            status: grading_status_at(row, 7)?,
        })
    }

    fn find_key_with(
        conn: &Connection,
        exam_id: &str,
        student_id: &str,
        question_id: &str,
    ) -> rusqlite::Result<Option<StudentQuestionScore>> {
        let sql = format!(
            "SELECT {} FROM student_question_score WHERE exam_id = ?1 AND student_id = ?2 AND question_id = ?3",
            SCORE_COLUMNS
        );
        conn.query_row(&sql, params![exam_id, student_id, question_id], Self::map_score)
            .optional()
    }

    /// 新增记录
    pub fn insert(&self, record: &StudentQuestionScore) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO student_question_score (
                record_id, exam_id, student_id, question_id, score_id, answer, score, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.record_id,
                record.exam_id,
                record.student_id,
                record.question_id,
                record.score_id,
                record.answer,
                record.score.to_string(),
                record.status.code(),
            ],
        )?;
        Ok(())
    }

    /// 写入作答（同一题重复提交覆盖答案，分数清零并重置为未判分）
    pub fn upsert_answer(
        &self,
        exam_id: &str,
        student_id: &str,
        question_id: &str,
        answer: Option<&str>,
    ) -> RepositoryResult<StudentQuestionScore> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO student_question_score (
                record_id, exam_id, student_id, question_id, answer, score, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, '0', ?6)
            ON CONFLICT(exam_id, student_id, question_id)
            DO UPDATE SET answer = excluded.answer, score = excluded.score, status = excluded.status
            "#,
            params![
                Uuid::new_v4().to_string(),
                exam_id,
                student_id,
                question_id,
                answer,
                GradingStatus::Ungraded.code()
            ],
        )?;

        Self::find_key_with(&conn, exam_id, student_id, question_id)?.ok_or_else(|| {
            RepositoryError::not_found(
                "StudentQuestionScore",
                &format!("{}/{}/{}", exam_id, student_id, question_id),
            )
        })
    }

    /// 按记录 ID 查询
    pub fn find_by_id(&self, record_id: &str) -> RepositoryResult<Option<StudentQuestionScore>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM student_question_score WHERE record_id = ?1",
            SCORE_COLUMNS
        );
        let record = conn
            .query_row(&sql, params![record_id], Self::map_score)
            .optional()?;
        Ok(record)
    }

    /// 按 (考试, 学生, 题目) 查询
    pub fn find_by_key(
        &self,
        exam_id: &str,
        student_id: &str,
        question_id: &str,
    ) -> RepositoryResult<Option<StudentQuestionScore>> {
        let conn = self.get_conn()?;
        Ok(Self::find_key_with(&conn, exam_id, student_id, question_id)?)
    }

    /// 回写判分结果
    pub fn update_grade(
        &self,
        record_id: &str,
        score: Decimal,
        status: GradingStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE student_question_score SET score = ?1, status = ?2 WHERE record_id = ?3",
            params![score.to_string(), status.code(), record_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("StudentQuestionScore", record_id));
        }
        Ok(())
    }

    /// 学生在某考试的全部记录
    pub fn list_for_student(
        &self,
        exam_id: &str,
        student_id: &str,
    ) -> RepositoryResult<Vec<StudentQuestionScore>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM student_question_score WHERE exam_id = ?1 AND student_id = ?2 ORDER BY question_id ASC",
            SCORE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![exam_id, student_id], Self::map_score)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 等待人工阅卷的记录
    pub fn list_ungraded(&self, exam_id: &str) -> RepositoryResult<Vec<StudentQuestionScore>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM student_question_score WHERE exam_id = ?1 AND status = ?2 ORDER BY student_id ASC, question_id ASC",
            SCORE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![exam_id, GradingStatus::Ungraded.code()], Self::map_score)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
