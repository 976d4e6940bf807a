// ==========================================
// 考试引擎 - 试卷仓储
// ==========================================
// exam_paper + paper_question
// 试卷与题目关联在同一事务内写入（全有或全无）
// ==========================================

use crate::domain::paper::{ExamPaper, PaperFilter, PaperQuestion};
use crate::domain::types::{AcademicTerm, ExamType, PaperStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{decimal_at, exam_type_at, paper_status_at, term_at};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

const PAPER_COLUMNS: &str = "paper_id, paper_name, subject_id, teacher_id, status, exam_type, term, difficulty, created_at";

// ==========================================
// PaperRepository - 试卷仓储
// ==========================================
pub struct PaperRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PaperRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub(crate) fn map_paper(row: &Row<'_>) -> rusqlite::Result<ExamPaper> {
        Ok(ExamPaper {
            paper_id: row.get(0)?,
            paper_name: row.get(1)?,
            subject_id: row.get(2)?,
            teacher_id: row.get(3)?,
            status: paper_status_at(row, 4)?,
            exam_type: exam_type_at(row, 5)?,
            term: term_at(row, 6)?,
            difficulty: decimal_at(row, 7)?,
            created_at: row.get(8)?,
        })
    }

    /// 创建试卷及全部题目关联（单事务）
    ///
    /// 任一行写入失败则整体回滚，不留下半成品试卷
    pub fn create_with_questions(
        &self,
        paper: &ExamPaper,
        questions: &[PaperQuestion],
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO exam_paper (
                paper_id, paper_name, subject_id, teacher_id,
                status, exam_type, term, difficulty, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                paper.paper_id,
                paper.paper_name,
                paper.subject_id,
                paper.teacher_id,
                paper.status.to_db_str(),
                paper.exam_type.to_db_str(),
                paper.term.to_db_str(),
                paper.difficulty.to_string(),
                paper.created_at,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO paper_question (paper_id, question_id, ordinal, score)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;
            for pq in questions {
                stmt.execute(params![
                    paper.paper_id,
                    pq.question_id,
                    pq.ordinal,
                    pq.score.to_string()
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// 按 ID 查询试卷
    pub fn find_by_id(&self, paper_id: &str) -> RepositoryResult<Option<ExamPaper>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM exam_paper WHERE paper_id = ?1", PAPER_COLUMNS);
        let paper = conn
            .query_row(&sql, params![paper_id], Self::map_paper)
            .optional()?;
        Ok(paper)
    }

    /// 按条件列出试卷（创建时间倒序）
    pub fn list(&self, filter: &PaperFilter) -> RepositoryResult<Vec<ExamPaper>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(subject_id) = &filter.subject_id {
            values.push(subject_id.clone());
            clauses.push(format!("subject_id = ?{}", values.len()));
        }
        if let Some(teacher_id) = &filter.teacher_id {
            values.push(teacher_id.clone());
            clauses.push(format!("teacher_id = ?{}", values.len()));
        }
        if let Some(status) = filter.status {
            values.push(status.to_db_str().to_string());
            clauses.push(format!("status = ?{}", values.len()));
        }
        if let Some(exam_type) = filter.exam_type {
            values.push(exam_type.to_db_str().to_string());
            clauses.push(format!("exam_type = ?{}", values.len()));
        }
        if let Some(term) = filter.term {
            values.push(term.to_db_str());
            clauses.push(format!("term = ?{}", values.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM exam_paper {} ORDER BY created_at DESC, paper_id ASC",
            PAPER_COLUMNS, where_sql
        );

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let papers = stmt
            .query_map(params_from_iter(values.iter()), Self::map_paper)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(papers)
    }

    /// 查询课程某学期的未发布期末试卷
    pub fn list_unpublished_finals(
        &self,
        subject_id: &str,
        term: AcademicTerm,
    ) -> RepositoryResult<Vec<ExamPaper>> {
        self.list(&PaperFilter {
            subject_id: Some(subject_id.to_string()),
            teacher_id: None,
            status: Some(PaperStatus::Draft),
            exam_type: Some(ExamType::Final),
            term: Some(term),
        })
    }

    /// 试卷题目（按题序）
    pub fn find_questions(&self, paper_id: &str) -> RepositoryResult<Vec<PaperQuestion>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT paper_id, question_id, ordinal, score
            FROM paper_question
            WHERE paper_id = ?1
            ORDER BY ordinal ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![paper_id], |row| {
                Ok(PaperQuestion {
                    paper_id: row.get(0)?,
                    question_id: row.get(1)?,
                    ordinal: row.get(2)?,
                    score: decimal_at(row, 3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 考试试卷中某题的满分（经 exam -> paper -> paper_question）
    pub fn question_score_for_exam(
        &self,
        exam_id: &str,
        question_id: &str,
    ) -> RepositoryResult<Option<Decimal>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT pq.score
            FROM exam e
            JOIN paper_question pq ON pq.paper_id = e.paper_id
            WHERE e.exam_id = ?1 AND pq.question_id = ?2
            "#,
            params![exam_id, question_id],
            |row| decimal_at(row, 0),
        );

        match result {
            Ok(score) => Ok(Some(score)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 试卷总分
    pub fn total_score(&self, paper_id: &str) -> RepositoryResult<Decimal> {
        Ok(self
            .find_questions(paper_id)?
            .iter()
            .map(|pq| pq.score)
            .sum())
    }
}
