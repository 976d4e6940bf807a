// ==========================================
// 考试引擎 - 判分 API
// ==========================================

use std::sync::Arc;

use crate::api::error::{require_non_empty, ApiResult};
use crate::domain::score::{GradeOutcome, StudentQuestionScore, SubmissionGradeSummary};
use crate::engine::grading::GradingEngine;

pub struct GradingApi {
    engine: Arc<GradingEngine>,
}

impl GradingApi {
    pub fn new(engine: Arc<GradingEngine>) -> Self {
        Self { engine }
    }

    /// 学生提交单题答案（立即判分）
    pub fn submit_answer(
        &self,
        exam_id: &str,
        student_id: &str,
        question_id: &str,
        answer: Option<&str>,
    ) -> ApiResult<GradeOutcome> {
        require_non_empty(exam_id, "考试ID")?;
        require_non_empty(student_id, "学生ID")?;
        require_non_empty(question_id, "题目ID")?;
        Ok(self
            .engine
            .submit_answer(exam_id, student_id, question_id, answer)?)
    }

    pub fn grade_record(&self, record_id: &str) -> ApiResult<GradeOutcome> {
        require_non_empty(record_id, "作答记录ID")?;
        Ok(self.engine.grade_record(record_id)?)
    }

    pub fn grade_submission(&self, exam_id: &str, student_id: &str) -> ApiResult<SubmissionGradeSummary> {
        require_non_empty(exam_id, "考试ID")?;
        require_non_empty(student_id, "学生ID")?;
        Ok(self.engine.grade_submission(exam_id, student_id)?)
    }

    /// 待人工阅卷记录
    pub fn pending_manual_grading(&self, exam_id: &str) -> ApiResult<Vec<StudentQuestionScore>> {
        require_non_empty(exam_id, "考试ID")?;
        Ok(self.engine.pending_manual_grading(exam_id)?)
    }
}
