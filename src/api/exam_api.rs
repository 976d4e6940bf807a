// ==========================================
// 考试引擎 - 考试 API
// ==========================================
// 职责: 考试发布与状态迁移 / 补考 / 考生参考记录
// ==========================================

use std::sync::Arc;

use tracing::debug;

use crate::api::error::{require_non_empty, ApiError, ApiResult};
use crate::domain::exam::{
    Exam, ExamFilter, ExamProgress, FinalExamPublication, FinalExamRequest, RegularExamRequest,
    RetakeExamRequest, TransitionOutcome,
};
use crate::domain::participation::{
    ExamHistoryEntry, ExamParticipation, ParticipationSummary, RetakeCandidate,
    RetakeCandidateQuery,
};
use crate::engine::lifecycle::ExamLifecycleController;
use crate::engine::participation::ParticipationTracker;

pub struct ExamApi {
    lifecycle: Arc<ExamLifecycleController>,
    tracker: Arc<ParticipationTracker>,
}

impl ExamApi {
    pub fn new(lifecycle: Arc<ExamLifecycleController>, tracker: Arc<ParticipationTracker>) -> Self {
        Self { lifecycle, tracker }
    }

    // ==========================================
    // 发布
    // ==========================================

    pub fn publish_final_exam(&self, request: &FinalExamRequest) -> ApiResult<FinalExamPublication> {
        require_non_empty(&request.teacher_id, "教师ID")?;
        require_non_empty(&request.subject_id, "课程ID")?;
        debug!(subject_id = %request.subject_id, classes = request.class_ids.len(), "调用期末考试发布");
        Ok(self.lifecycle.publish_final_exam(request)?)
    }

    pub fn publish_regular_exam(&self, request: &RegularExamRequest) -> ApiResult<Exam> {
        require_non_empty(&request.teacher_id, "教师ID")?;
        require_non_empty(&request.paper_id, "试卷ID")?;
        Ok(self.lifecycle.publish_regular_exam(request)?)
    }

    pub fn publish_retake_exam(&self, request: &RetakeExamRequest) -> ApiResult<Exam> {
        require_non_empty(&request.teacher_id, "教师ID")?;
        require_non_empty(&request.paper_id, "试卷ID")?;
        Ok(self.lifecycle.publish_retake_exam(request)?)
    }

    // ==========================================
    // 状态迁移
    // ==========================================

    pub fn publish_exam(&self, exam_id: &str) -> ApiResult<TransitionOutcome> {
        require_non_empty(exam_id, "考试ID")?;
        Ok(self.lifecycle.publish(exam_id)?)
    }

    pub fn start_exam(&self, exam_id: &str) -> ApiResult<TransitionOutcome> {
        require_non_empty(exam_id, "考试ID")?;
        Ok(self.lifecycle.start(exam_id)?)
    }

    pub fn end_exam(&self, exam_id: &str) -> ApiResult<TransitionOutcome> {
        require_non_empty(exam_id, "考试ID")?;
        Ok(self.lifecycle.end(exam_id)?)
    }

    /// 状态迁移的严格版本：前置状态不符时返回 StateConflict
    pub fn start_exam_strict(&self, exam_id: &str) -> ApiResult<()> {
        match self.start_exam(exam_id)? {
            TransitionOutcome::Applied { .. } => Ok(()),
            TransitionOutcome::NotApplicable { current } => Err(ApiError::StateConflict(format!(
                "考试{}当前状态为{}，不能开始",
                exam_id, current
            ))),
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_exam(&self, exam_id: &str) -> ApiResult<Exam> {
        require_non_empty(exam_id, "考试ID")?;
        Ok(self.lifecycle.find_exam(exam_id)?)
    }

    pub fn list_exams(&self, filter: &ExamFilter) -> ApiResult<Vec<Exam>> {
        Ok(self.lifecycle.list_exams(filter)?)
    }

    pub fn exam_class_ids(&self, exam_id: &str) -> ApiResult<Vec<String>> {
        require_non_empty(exam_id, "考试ID")?;
        Ok(self.lifecycle.exam_class_ids(exam_id)?)
    }

    /// 考试进度（剩余时间/已用时间/进度百分比）
    pub fn exam_progress(&self, exam_id: &str) -> ApiResult<ExamProgress> {
        require_non_empty(exam_id, "考试ID")?;
        Ok(self.lifecycle.exam_progress(exam_id)?)
    }

    // ==========================================
    // 补考
    // ==========================================

    pub fn retake_candidates(
        &self,
        teacher_id: &str,
        subject_id: &str,
        query: &RetakeCandidateQuery,
    ) -> ApiResult<Vec<RetakeCandidate>> {
        require_non_empty(teacher_id, "教师ID")?;
        require_non_empty(subject_id, "课程ID")?;
        Ok(self.lifecycle.retake_candidates(teacher_id, subject_id, query)?)
    }

    pub fn enroll_retake_student(&self, exam_id: &str, student_id: &str) -> ApiResult<ExamParticipation> {
        require_non_empty(exam_id, "考试ID")?;
        require_non_empty(student_id, "学生ID")?;
        Ok(self.lifecycle.enroll_retake_student(exam_id, student_id)?)
    }

    pub fn student_exam_history(&self, student_id: &str) -> ApiResult<Vec<ExamHistoryEntry>> {
        require_non_empty(student_id, "学生ID")?;
        Ok(self.lifecycle.student_exam_history(student_id)?)
    }

    // ==========================================
    // 考生参考记录
    // ==========================================

    pub fn record_start(&self, exam_id: &str, student_id: &str) -> ApiResult<ExamParticipation> {
        require_non_empty(exam_id, "考试ID")?;
        require_non_empty(student_id, "学生ID")?;
        Ok(self.tracker.record_start(exam_id, student_id)?)
    }

    pub fn record_submit(&self, exam_id: &str, student_id: &str) -> ApiResult<ExamParticipation> {
        require_non_empty(exam_id, "考试ID")?;
        require_non_empty(student_id, "学生ID")?;
        Ok(self.tracker.record_submit(exam_id, student_id)?)
    }

    pub fn mark_absent(&self, exam_id: &str, student_id: &str) -> ApiResult<ExamParticipation> {
        require_non_empty(exam_id, "考试ID")?;
        require_non_empty(student_id, "学生ID")?;
        Ok(self.tracker.mark_absent(exam_id, student_id)?)
    }

    pub fn mark_disciplinary(
        &self,
        exam_id: &str,
        student_id: &str,
        comment: &str,
    ) -> ApiResult<ExamParticipation> {
        require_non_empty(exam_id, "考试ID")?;
        require_non_empty(student_id, "学生ID")?;
        Ok(self.tracker.mark_disciplinary(exam_id, student_id, comment)?)
    }

    pub fn add_comment(&self, exam_id: &str, student_id: &str, comment: &str) -> ApiResult<ExamParticipation> {
        require_non_empty(exam_id, "考试ID")?;
        require_non_empty(student_id, "学生ID")?;
        Ok(self.tracker.add_comment(exam_id, student_id, comment)?)
    }

    pub fn flag_retake(&self, exam_id: &str, student_id: &str) -> ApiResult<ExamParticipation> {
        require_non_empty(exam_id, "考试ID")?;
        require_non_empty(student_id, "学生ID")?;
        Ok(self.tracker.flag_retake(exam_id, student_id)?)
    }

    pub fn participation_summary(&self, exam_id: &str) -> ApiResult<ParticipationSummary> {
        require_non_empty(exam_id, "考试ID")?;
        Ok(self.tracker.summary(exam_id)?)
    }
}
