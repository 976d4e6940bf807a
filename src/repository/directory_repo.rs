// ==========================================
// 考试引擎 - 组织目录仓储
// ==========================================
// 学院 / 课程 / 教师 / 学生 / 班级
// 引擎通过 DirectoryLookup 只读访问（权限校验、名单展开）
// ==========================================

use crate::domain::directory::{College, SchoolClass, Student, Subject, Teacher};
use crate::domain::types::PermissionLevel;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// DirectoryLookup - 目录只读接口
// ==========================================
pub trait DirectoryLookup: Send + Sync {
    fn teacher(&self, teacher_id: &str) -> RepositoryResult<Option<Teacher>>;

    fn subject(&self, subject_id: &str) -> RepositoryResult<Option<Subject>>;

    fn student(&self, student_id: &str) -> RepositoryResult<Option<Student>>;

    fn school_class(&self, class_id: &str) -> RepositoryResult<Option<SchoolClass>>;

    /// 班级学生 ID 列表
    fn class_student_ids(&self, class_id: &str) -> RepositoryResult<Vec<String>>;

    /// 教师权限等级（教师不存在返回 None）
    fn teacher_permission(&self, teacher_id: &str) -> RepositoryResult<Option<PermissionLevel>> {
        Ok(self.teacher(teacher_id)?.map(|t| t.permission))
    }

    /// 课程所属学院
    fn subject_college_id(&self, subject_id: &str) -> RepositoryResult<Option<String>> {
        Ok(self.subject(subject_id)?.map(|s| s.college_id))
    }
}

// ==========================================
// DirectoryRepository
// ==========================================
pub struct DirectoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DirectoryRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 写入（外部 CRUD / 测试造数） =====

    pub fn create_college(&self, college: &College) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO college (college_id, name) VALUES (?1, ?2)",
            params![college.college_id, college.name],
        )?;
        Ok(())
    }

    pub fn create_subject(&self, subject: &Subject) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO subject (subject_id, name, college_id) VALUES (?1, ?2, ?3)",
            params![subject.subject_id, subject.name, subject.college_id],
        )?;
        Ok(())
    }

    pub fn create_teacher(&self, teacher: &Teacher) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO teacher (teacher_id, name, permission, college_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                teacher.teacher_id,
                teacher.name,
                teacher.permission.0,
                teacher.college_id
            ],
        )?;
        Ok(())
    }

    pub fn create_student(&self, student: &Student) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO student (student_id, name, college_id) VALUES (?1, ?2, ?3)",
            params![student.student_id, student.name, student.college_id],
        )?;
        Ok(())
    }

    pub fn create_class(&self, class: &SchoolClass) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO school_class (class_id, name, subject_id, final_exam) VALUES (?1, ?2, ?3, ?4)",
            params![class.class_id, class.name, class.subject_id, class.final_exam],
        )?;
        Ok(())
    }

    pub fn add_student_to_class(&self, class_id: &str, student_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO class_student (class_id, student_id) VALUES (?1, ?2)",
            params![class_id, student_id],
        )?;
        Ok(())
    }
}

impl DirectoryLookup for DirectoryRepository {
    fn teacher(&self, teacher_id: &str) -> RepositoryResult<Option<Teacher>> {
        let conn = self.get_conn()?;
        let teacher = conn
            .query_row(
                "SELECT teacher_id, name, permission, college_id FROM teacher WHERE teacher_id = ?1",
                params![teacher_id],
                |row| {
                    Ok(Teacher {
                        teacher_id: row.get(0)?,
                        name: row.get(1)?,
                        permission: PermissionLevel(row.get(2)?),
                        college_id: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(teacher)
    }

    fn subject(&self, subject_id: &str) -> RepositoryResult<Option<Subject>> {
        let conn = self.get_conn()?;
        let subject = conn
            .query_row(
                "SELECT subject_id, name, college_id FROM subject WHERE subject_id = ?1",
                params![subject_id],
                |row| {
                    Ok(Subject {
                        subject_id: row.get(0)?,
                        name: row.get(1)?,
                        college_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(subject)
    }

    fn student(&self, student_id: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;
        let student = conn
            .query_row(
                "SELECT student_id, name, college_id FROM student WHERE student_id = ?1",
                params![student_id],
                |row| {
                    Ok(Student {
                        student_id: row.get(0)?,
                        name: row.get(1)?,
                        college_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(student)
    }

    fn school_class(&self, class_id: &str) -> RepositoryResult<Option<SchoolClass>> {
        let conn = self.get_conn()?;
        let class = conn
            .query_row(
                "SELECT class_id, name, subject_id, final_exam FROM school_class WHERE class_id = ?1",
                params![class_id],
                |row| {
                    Ok(SchoolClass {
                        class_id: row.get(0)?,
                        name: row.get(1)?,
                        subject_id: row.get(2)?,
                        final_exam: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(class)
    }

    fn class_student_ids(&self, class_id: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT student_id FROM class_student WHERE class_id = ?1 ORDER BY student_id ASC",
        )?;
        let ids = stmt
            .query_map(params![class_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
