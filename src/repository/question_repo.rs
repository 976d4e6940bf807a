// ==========================================
// 考试引擎 - 题库仓储
// ==========================================
// 引擎只通过 QuestionCatalog 只读访问题库
// 写入接口供外部题库维护与测试造数使用
// ==========================================

use crate::domain::question::{Question, QuestionOption};
use crate::domain::types::QuestionType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{decimal_at, question_type_at};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// QuestionCatalog - 题库只读接口
// ==========================================
pub trait QuestionCatalog: Send + Sync {
    /// 按课程 + 题型查询候选题
    fn questions_by_type_and_subject(
        &self,
        subject_id: &str,
        question_type: QuestionType,
    ) -> RepositoryResult<Vec<Question>>;

    /// 按 ID 查询题目
    fn question_by_id(&self, question_id: &str) -> RepositoryResult<Option<Question>>;
}

// ==========================================
// QuestionRepository - 题库仓储
// ==========================================
pub struct QuestionRepository {
    conn: Arc<Mutex<Connection>>,
}

const QUESTION_COLUMNS: &str =
    "question_id, bank_id, subject_id, question_type, content, correct_answer, difficulty";

impl QuestionRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增题目（含选项，单事务）
    pub fn create(&self, question: &Question) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO question (
                question_id, bank_id, subject_id, question_type,
                content, correct_answer, difficulty
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                question.question_id,
                question.bank_id,
                question.subject_id,
                question.question_type.code(),
                question.content,
                question.correct_answer,
                question.difficulty.to_string(),
            ],
        )?;

        for option in &question.options {
            tx.execute(
                r#"
                INSERT INTO question_option (option_id, question_id, label, content, is_correct)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    option.option_id,
                    question.question_id,
                    option.label,
                    option.content,
                    option.is_correct,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 按课程统计各题型题量
    pub fn count_by_type(&self, subject_id: &str) -> RepositoryResult<Vec<(QuestionType, i64)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT question_type, COUNT(*)
            FROM question
            WHERE subject_id = ?1
            GROUP BY question_type
            ORDER BY question_type ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![subject_id], |row| {
                Ok((question_type_at(row, 0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_question(row: &Row<'_>) -> rusqlite::Result<Question> {
        Ok(Question {
            question_id: row.get(0)?,
            bank_id: row.get(1)?,
            subject_id: row.get(2)?,
            question_type: question_type_at(row, 3)?,
            content: row.get(4)?,
            correct_answer: row.get(5)?,
            difficulty: decimal_at(row, 6)?,
            options: Vec::new(),
        })
    }

    fn load_options(conn: &Connection, question_id: &str) -> RepositoryResult<Vec<QuestionOption>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT option_id, question_id, label, content, is_correct
            FROM question_option
            WHERE question_id = ?1
            ORDER BY label ASC
            "#,
        )?;
        let options = stmt
            .query_map(params![question_id], |row| {
                Ok(QuestionOption {
                    option_id: row.get(0)?,
                    question_id: row.get(1)?,
                    label: row.get(2)?,
                    content: row.get(3)?,
                    is_correct: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(options)
    }
}

impl QuestionCatalog for QuestionRepository {
    fn questions_by_type_and_subject(
        &self,
        subject_id: &str,
        question_type: QuestionType,
    ) -> RepositoryResult<Vec<Question>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM question WHERE subject_id = ?1 AND question_type = ?2 ORDER BY question_id ASC",
            QUESTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut questions = stmt
            .query_map(params![subject_id, question_type.code()], Self::map_question)?
            .collect::<Result<Vec<_>, _>>()?;

        if question_type.has_options() {
            for q in questions.iter_mut() {
                q.options = Self::load_options(&conn, &q.question_id)?;
            }
        }
        Ok(questions)
    }

    fn question_by_id(&self, question_id: &str) -> RepositoryResult<Option<Question>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM question WHERE question_id = ?1", QUESTION_COLUMNS);
        let result = conn.query_row(&sql, params![question_id], Self::map_question);

        match result {
            Ok(mut q) => {
                if q.question_type.has_options() {
                    q.options = Self::load_options(&conn, &q.question_id)?;
                }
                Ok(Some(q))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
