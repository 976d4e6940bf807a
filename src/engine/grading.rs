// ==========================================
// 考试引擎 - 判分引擎
// ==========================================
// 单选/判断: 字符串完全相等得满分
// 多选: 选项集合完全相等得满分，否则 0 分（无部分得分）
// 填空/简答: 0 分，状态保持未判分，等待人工阅卷
// 空答案或乱码答案不报错，客观题记 0 分并置为已判分
// ==========================================

use crate::domain::question::Question;
use crate::domain::score::{GradeOutcome, StudentQuestionScore, SubmissionGradeSummary};
use crate::domain::types::{ExamStatus, GradingStatus, QuestionType};
use crate::engine::clock::Clock;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{ExamEvent, ExamEventType, OptionalEventPublisher};
use crate::repository::{
    ExamRepository, PaperRepository, ParticipationRepository, QuestionCatalog, ScoreRepository,
};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 按题型判定单题得分（纯函数）
pub fn evaluate_answer(
    question: &Question,
    full_score: Decimal,
    answer: Option<&str>,
) -> (Decimal, GradingStatus) {
    let answer = answer.map(str::trim).filter(|a| !a.is_empty());

    match question.question_type {
        QuestionType::SingleChoice | QuestionType::TrueFalse => {
            let correct = matches!(answer, Some(a) if a == question.correct_answer.trim());
            (if correct { full_score } else { Decimal::ZERO }, GradingStatus::Graded)
        }
        QuestionType::MultipleChoice => {
            let correct = match answer {
                Some(a) => {
                    let submitted = option_set(a);
                    !submitted.is_empty() && submitted == option_set(&question.correct_answer)
                }
                None => false,
            };
            (if correct { full_score } else { Decimal::ZERO }, GradingStatus::Graded)
        }
        QuestionType::FillBlank | QuestionType::Essay => (Decimal::ZERO, GradingStatus::Ungraded),
    }
}

/// 逗号分隔的选项标签集合
fn option_set(raw: &str) -> BTreeSet<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

// ==========================================
// GradingEngine
// ==========================================
pub struct GradingEngine {
    catalog: Arc<dyn QuestionCatalog>,
    paper_repo: Arc<PaperRepository>,
    exam_repo: Arc<ExamRepository>,
    participation_repo: Arc<ParticipationRepository>,
    score_repo: Arc<ScoreRepository>,
    pass_score: Decimal,
    clock: Arc<dyn Clock>,
    events: OptionalEventPublisher,
}

impl GradingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn QuestionCatalog>,
        paper_repo: Arc<PaperRepository>,
        exam_repo: Arc<ExamRepository>,
        participation_repo: Arc<ParticipationRepository>,
        score_repo: Arc<ScoreRepository>,
        pass_score: Decimal,
        clock: Arc<dyn Clock>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            catalog,
            paper_repo,
            exam_repo,
            participation_repo,
            score_repo,
            pass_score,
            clock,
            events,
        }
    }

    /// 判定一条已落库的作答记录并回写
    ///
    /// 相同答案重复判定结果一致；填空/简答保留库中现有分数与状态（人工阅卷结果不被覆盖）
    pub fn grade_question(&self, record: &StudentQuestionScore) -> EngineResult<GradeOutcome> {
        let question = self.load_question(&record.question_id)?;
        self.grade_loaded(&question, record)
    }

    fn load_question(&self, question_id: &str) -> EngineResult<Question> {
        self.catalog
            .question_by_id(question_id)?
            .ok_or_else(|| EngineError::QuestionNotFound(question_id.to_string()))
    }

    fn grade_loaded(&self, question: &Question, record: &StudentQuestionScore) -> EngineResult<GradeOutcome> {
        let full_score = self
            .paper_repo
            .question_score_for_exam(&record.exam_id, &record.question_id)?
            .ok_or_else(|| EngineError::QuestionNotInPaper {
                exam_id: record.exam_id.clone(),
                question_id: record.question_id.clone(),
            })?;

        if !question.question_type.is_objective() {
            return Ok(GradeOutcome {
                record_id: record.record_id.clone(),
                question_id: record.question_id.clone(),
                full_score,
                score: record.score,
                status: record.status,
            });
        }

        let (score, status) = evaluate_answer(question, full_score, record.answer.as_deref());
        self.score_repo.update_grade(&record.record_id, score, status)?;

        tracing::debug!(
            record_id = %record.record_id,
            question_type = %question.question_type,
            %score,
            %status,
            "单题判分"
        );

        Ok(GradeOutcome {
            record_id: record.record_id.clone(),
            question_id: record.question_id.clone(),
            full_score,
            score,
            status,
        })
    }

    /// 按记录 ID 判分
    pub fn grade_record(&self, record_id: &str) -> EngineResult<GradeOutcome> {
        let record = self
            .score_repo
            .find_by_id(record_id)?
            .ok_or_else(|| EngineError::ScoreRecordNotFound(record_id.to_string()))?;
        self.grade_question(&record)
    }

    /// 提交单题作答并立即判分
    ///
    /// 考试须进行中，学生须已开考且未交卷
    pub fn submit_answer(
        &self,
        exam_id: &str,
        student_id: &str,
        question_id: &str,
        answer: Option<&str>,
    ) -> EngineResult<GradeOutcome> {
        let exam = self
            .exam_repo
            .find_by_id(exam_id)?
            .ok_or_else(|| EngineError::ExamNotFound(exam_id.to_string()))?;
        if exam.status != ExamStatus::InProgress {
            return Err(EngineError::StateConflict(format!(
                "考试{}当前状态为{}，不接受作答",
                exam_id, exam.status
            )));
        }

        let participation = self
            .participation_repo
            .find(exam_id, student_id)?
            .filter(|p| p.start_time.is_some())
            .ok_or_else(|| {
                EngineError::StateConflict(format!("学生{}尚未开始考试{}", student_id, exam_id))
            })?;
        if participation.submit_time.is_some() {
            return Err(EngineError::StateConflict(format!(
                "学生{}已交卷，不能再作答",
                student_id
            )));
        }

        if self
            .paper_repo
            .question_score_for_exam(exam_id, question_id)?
            .is_none()
        {
            return Err(EngineError::QuestionNotInPaper {
                exam_id: exam_id.to_string(),
                question_id: question_id.to_string(),
            });
        }

        let record = self
            .score_repo
            .upsert_answer(exam_id, student_id, question_id, answer)?;
        let outcome = self.grade_question(&record)?;

        self.events.publish(
            ExamEvent::new(
                ExamEventType::AnswerGraded,
                record.record_id.clone(),
                "GradingEngine",
                self.clock.now(),
            )
            .with_detail(serde_json::json!({
                "exam_id": exam_id,
                "student_id": student_id,
                "question_id": question_id,
                "score": outcome.score.to_string(),
                "status": outcome.status.to_string(),
            })),
        );
        Ok(outcome)
    }

    /// 对学生在某考试的全部作答重新判分并汇总
    pub fn grade_submission(
        &self,
        exam_id: &str,
        student_id: &str,
    ) -> EngineResult<SubmissionGradeSummary> {
        if self.exam_repo.find_by_id(exam_id)?.is_none() {
            return Err(EngineError::ExamNotFound(exam_id.to_string()));
        }

        let records = self.score_repo.list_for_student(exam_id, student_id)?;
        let mut outcomes = Vec::with_capacity(records.len());
        let mut objective_score = Decimal::ZERO;
        for record in &records {
            let question = self.load_question(&record.question_id)?;
            let outcome = self.grade_loaded(&question, record)?;
            if question.question_type.is_objective() {
                objective_score += outcome.score;
            }
            outcomes.push(outcome);
        }

        // 已判分记录（含人工阅卷完成的主观题）计入总分
        let total_score: Decimal = outcomes
            .iter()
            .filter(|o| o.status == GradingStatus::Graded)
            .map(|o| o.score)
            .sum();
        let graded_count = outcomes
            .iter()
            .filter(|o| o.status == GradingStatus::Graded)
            .count();
        let pending_manual_count = outcomes.len() - graded_count;
        let passed = (pending_manual_count == 0).then(|| total_score >= self.pass_score);

        tracing::info!(
            exam_id,
            student_id,
            %objective_score,
            %total_score,
            graded_count,
            pending_manual_count,
            ?passed,
            "答卷判分完成"
        );

        Ok(SubmissionGradeSummary {
            exam_id: exam_id.to_string(),
            student_id: student_id.to_string(),
            objective_score,
            total_score,
            graded_count,
            pending_manual_count,
            passed,
            outcomes,
        })
    }

    /// 等待人工阅卷的记录
    pub fn pending_manual_grading(&self, exam_id: &str) -> EngineResult<Vec<StudentQuestionScore>> {
        Ok(self.score_repo.list_ungraded(exam_id)?)
    }
}
