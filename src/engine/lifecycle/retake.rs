// ==========================================
// 补考编排
// ==========================================
// 候选人: 在该课程任一考试上被标记需补考的学生
// 查询范围: 权限 0 教师只能看到本学院学生；其余教师不限学院
// 报名: 未被标记需补考的学生一律拒绝
// ==========================================

use super::ExamLifecycleController;
use crate::domain::exam::{Exam, RetakeExamRequest};
use crate::domain::participation::{
    ExamHistoryEntry, ExamParticipation, RetakeCandidate, RetakeCandidateQuery,
};
use crate::domain::types::{ExamStatus, ExamType, PermissionLevel};
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::NewExamBundle;
use tracing::instrument;
use uuid::Uuid;

impl ExamLifecycleController {
    /// 补考候选人查询
    pub fn retake_candidates(
        &self,
        teacher_id: &str,
        subject_id: &str,
        query: &RetakeCandidateQuery,
    ) -> EngineResult<Vec<RetakeCandidate>> {
        let teacher = self.require_teacher(teacher_id)?;

        let college_scope = if teacher.permission == PermissionLevel::ALL_EXAMS {
            let subject_college = self.directory.subject_college_id(subject_id)?;
            match (teacher.college_id.as_deref(), subject_college.as_deref()) {
                (Some(own), Some(owner)) if own == owner => Some(own.to_string()),
                _ => {
                    tracing::warn!(teacher_id, subject_id, "课程不属于教师所在学院，候选人为空");
                    return Ok(Vec::new());
                }
            }
        } else {
            None
        };

        let candidates = self.repos.participation_repo.retake_candidates(
            subject_id,
            college_scope.as_deref(),
            query,
        )?;
        tracing::debug!(teacher_id, subject_id, count = candidates.len(), "补考候选人");
        Ok(candidates)
    }

    /// 发布补考
    ///
    /// 考试、全部报名记录与试卷状态在同一事务内写入
    #[instrument(skip(self, request), fields(paper_id = %request.paper_id, teacher_id = %request.teacher_id))]
    pub fn publish_retake_exam(&self, request: &RetakeExamRequest) -> EngineResult<Exam> {
        let teacher = self.require_teacher(&request.teacher_id)?;
        if !teacher.permission.can_publish_regular() {
            return Err(EngineError::InsufficientPermission(format!(
                "教师{}(权限{})不能发布补考",
                teacher.teacher_id, teacher.permission
            )));
        }

        let paper = self.require_paper(&request.paper_id)?;
        if request.student_ids.is_empty() {
            return Err(EngineError::Validation("补考学生不能为空".to_string()));
        }
        let end_time = self.validate_schedule(request.start_time, request.duration_minutes)?;

        let mut student_ids: Vec<&str> = Vec::with_capacity(request.student_ids.len());
        for student_id in &request.student_ids {
            if student_ids.contains(&student_id.as_str()) {
                continue;
            }
            self.ensure_retake_eligible(student_id, &paper.subject_id)?;
            student_ids.push(student_id.as_str());
        }

        let exam = self.build_exam(
            &paper,
            &teacher.teacher_id,
            ExamType::Retake,
            request.start_time,
            request.duration_minutes,
            end_time,
        );
        let participations: Vec<ExamParticipation> = student_ids
            .iter()
            .map(|s| ExamParticipation::blank(Uuid::new_v4().to_string(), &exam.exam_id, s))
            .collect();
        let papers = [paper.paper_id.clone()];
        self.create_bundle(&NewExamBundle {
            exam: &exam,
            class_ids: &[],
            participations: &participations,
            papers_to_publish: &papers,
            require_draft_papers: false,
            mark_classes_final: false,
        })?;

        self.announce_created(&exam, serde_json::json!({ "students": student_ids }));
        tracing::info!(exam_id = %exam.exam_id, students = participations.len(), "补考已发布");
        Ok(exam)
    }

    /// 为已存在的补考追加学生（重复报名返回已有记录）
    pub fn enroll_retake_student(&self, exam_id: &str, student_id: &str) -> EngineResult<ExamParticipation> {
        let exam = self.find_exam(exam_id)?;
        if exam.exam_type != ExamType::Retake {
            return Err(EngineError::Validation(format!("考试{}不是补考", exam_id)));
        }
        if exam.status == ExamStatus::Ended {
            return Err(EngineError::StateConflict(format!(
                "补考{}已结束，不能报名",
                exam_id
            )));
        }
        if let Some(existing) = self.repos.participation_repo.find(exam_id, student_id)? {
            return Ok(existing);
        }
        self.ensure_retake_eligible(student_id, &exam.subject_id)?;

        let participation = self.repos.participation_repo.get_or_create(exam_id, student_id)?;
        tracing::info!(exam_id, student_id, "补考报名");
        Ok(participation)
    }

    /// 学生考试履历（原考试与补考均包含）
    pub fn student_exam_history(&self, student_id: &str) -> EngineResult<Vec<ExamHistoryEntry>> {
        if self.directory.student(student_id)?.is_none() {
            return Err(EngineError::ReferenceNotFound {
                entity: "学生",
                id: student_id.to_string(),
            });
        }
        Ok(self.repos.participation_repo.history_for_student(student_id)?)
    }

    fn ensure_retake_eligible(&self, student_id: &str, subject_id: &str) -> EngineResult<()> {
        if self.directory.student(student_id)?.is_none() {
            return Err(EngineError::ReferenceNotFound {
                entity: "学生",
                id: student_id.to_string(),
            });
        }
        if !self
            .repos
            .participation_repo
            .has_retake_flag(student_id, subject_id)?
        {
            return Err(EngineError::NotEligibleForRetake(format!(
                "学生{}在课程{}没有补考资格",
                student_id, subject_id
            )));
        }
        Ok(())
    }
}
