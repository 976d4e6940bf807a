// ==========================================
// 考试引擎 - 考试仓储
// ==========================================
// exam + exam_class
// 状态迁移使用 CAS 更新: UPDATE ... WHERE status = 预期状态
// 发布类写入（考试/班级/试卷状态/参考记录）在同一事务内完成
// ==========================================

use crate::domain::exam::{Exam, ExamFilter};
use crate::domain::participation::ExamParticipation;
use crate::domain::types::{ExamStatus, PaperStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{exam_status_at, exam_type_at};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const EXAM_COLUMNS: &str = "exam_id, exam_name, paper_id, subject_id, teacher_id, status, exam_type, start_time, duration_minutes, end_time, created_at";

/// 一次发布涉及的全部写入
pub struct NewExamBundle<'a> {
    pub exam: &'a Exam,
    pub class_ids: &'a [String],
    pub participations: &'a [ExamParticipation],
    /// 需置为已发布的试卷
    pub papers_to_publish: &'a [String],
    /// 为 true 时试卷必须仍为草稿，否则整体回滚
    pub require_draft_papers: bool,
    /// 为 true 时将班级标记为已安排期末考试
    pub mark_classes_final: bool,
}

// ==========================================
// ExamRepository - 考试仓储
// ==========================================
pub struct ExamRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExamRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_exam(row: &Row<'_>) -> rusqlite::Result<Exam> {
        Ok(Exam {
            exam_id: row.get(0)?,
            exam_name: row.get(1)?,
            paper_id: row.get(2)?,
            subject_id: row.get(3)?,
            teacher_id: row.get(4)?,
            status: exam_status_at(row, 5)?,
            exam_type: exam_type_at(row, 6)?,
            start_time: row.get(7)?,
            duration_minutes: row.get(8)?,
            end_time: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    /// 创建考试及其关联（单事务）
    pub fn create_exam_bundle(&self, bundle: &NewExamBundle<'_>) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let exam = bundle.exam;

        tx.execute(
            r#"
            INSERT INTO exam (
                exam_id, exam_name, paper_id, subject_id, teacher_id, status, exam_type,
                start_time, duration_minutes, end_time, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                exam.exam_id,
                exam.exam_name,
                exam.paper_id,
                exam.subject_id,
                exam.teacher_id,
                exam.status.code(),
                exam.exam_type.to_db_str(),
                exam.start_time,
                exam.duration_minutes,
                exam.end_time,
                exam.created_at,
            ],
        )?;

        for class_id in bundle.class_ids {
            tx.execute(
                "INSERT INTO exam_class (exam_id, class_id) VALUES (?1, ?2)",
                params![exam.exam_id, class_id],
            )?;
            if bundle.mark_classes_final {
                tx.execute(
                    "UPDATE school_class SET final_exam = 1 WHERE class_id = ?1",
                    params![class_id],
                )?;
            }
        }

        for p in bundle.participations {
            tx.execute(
                r#"
                INSERT INTO exam_participation (
                    participation_id, exam_id, student_id, start_time, submit_time,
                    absent, disciplinary, retake_needed, comment
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    p.participation_id,
                    p.exam_id,
                    p.student_id,
                    p.start_time,
                    p.submit_time,
                    p.absent,
                    p.disciplinary,
                    p.retake_needed,
                    p.comment,
                ],
            )?;
        }

        for paper_id in bundle.papers_to_publish {
            let affected = if bundle.require_draft_papers {
                tx.execute(
                    "UPDATE exam_paper SET status = ?1 WHERE paper_id = ?2 AND status = ?3",
                    params![
                        PaperStatus::Published.to_db_str(),
                        paper_id,
                        PaperStatus::Draft.to_db_str()
                    ],
                )?
            } else {
                tx.execute(
                    "UPDATE exam_paper SET status = ?1 WHERE paper_id = ?2",
                    params![PaperStatus::Published.to_db_str(), paper_id],
                )?
            };
            if affected != 1 {
                // tx 未提交即丢弃，自动回滚
                return Err(RepositoryError::ConcurrentModification(format!(
                    "试卷 {} 已被发布或不存在",
                    paper_id
                )));
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// 按 ID 查询考试
    pub fn find_by_id(&self, exam_id: &str) -> RepositoryResult<Option<Exam>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM exam WHERE exam_id = ?1", EXAM_COLUMNS);
        let exam = conn
            .query_row(&sql, params![exam_id], Self::map_exam)
            .optional()?;
        Ok(exam)
    }

    /// 当前状态（考试不存在返回 None）
    pub fn current_status(&self, exam_id: &str) -> RepositoryResult<Option<ExamStatus>> {
        let conn = self.get_conn()?;
        let status = conn
            .query_row(
                "SELECT status FROM exam WHERE exam_id = ?1",
                params![exam_id],
                |row| exam_status_at(row, 0),
            )
            .optional()?;
        Ok(status)
    }

    /// CAS 状态迁移
    ///
    /// # 返回
    /// - Ok(true): 迁移成功
    /// - Ok(false): 当前状态不是 from（或考试不存在）
    pub fn transition_status(
        &self,
        exam_id: &str,
        from: ExamStatus,
        to: ExamStatus,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE exam SET status = ?1 WHERE exam_id = ?2 AND status = ?3",
            params![to.code(), exam_id, from.code()],
        )?;
        Ok(affected == 1)
    }

    /// 按条件列出考试（开始时间倒序）
    pub fn list(&self, filter: &ExamFilter) -> RepositoryResult<Vec<Exam>> {
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
            values.push(status.code().to_string());
            clauses.push(format!("status = CAST(?{} AS INTEGER)", values.len()));
        }
        if let Some(exam_type) = filter.exam_type {
            values.push(exam_type.to_db_str().to_string());
            clauses.push(format!("exam_type = ?{}", values.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM exam {} ORDER BY start_time DESC, exam_id ASC",
            EXAM_COLUMNS, where_sql
        );

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let exams = stmt
            .query_map(params_from_iter(values.iter()), Self::map_exam)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exams)
    }

    /// 按状态列出考试（开始时间升序）
    pub fn list_by_status(&self, status: ExamStatus) -> RepositoryResult<Vec<Exam>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM exam WHERE status = ?1 ORDER BY start_time ASC, exam_id ASC",
            EXAM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let exams = stmt
            .query_map(params![status.code()], Self::map_exam)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exams)
    }

    /// 已结束且仍有未交卷考生的考试
    pub fn list_ended_with_unfinished(&self) -> RepositoryResult<Vec<Exam>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM exam e WHERE e.status = ?1 AND EXISTS (
                SELECT 1 FROM exam_participation p
                WHERE p.exam_id = e.exam_id AND p.start_time IS NOT NULL AND p.submit_time IS NULL
             ) ORDER BY e.start_time ASC, e.exam_id ASC",
            EXAM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let exams = stmt
            .query_map(params![ExamStatus::Ended.code()], Self::map_exam)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exams)
    }

    /// 考试关联班级
    pub fn class_ids(&self, exam_id: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT class_id FROM exam_class WHERE exam_id = ?1 ORDER BY class_id ASC",
        )?;
        let ids = stmt
            .query_map(params![exam_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// 关联班级的全部学生（去重）
    pub fn class_roster(&self, exam_id: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT cs.student_id
            FROM exam_class ec
            JOIN class_student cs ON cs.class_id = ec.class_id
            WHERE ec.exam_id = ?1
            ORDER BY cs.student_id ASC
            "#,
        )?;
        let ids = stmt
            .query_map(params![exam_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
