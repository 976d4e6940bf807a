// ==========================================
// 考试引擎 - 考生参考记录
// ==========================================
// 名单: 班级考试取关联班级全部学生；补考取已报名学生
// 记录惰性创建；开考/交卷时间只记录首次
// ==========================================

use crate::domain::exam::Exam;
use crate::domain::participation::{ExamParticipation, ParticipationSummary};
use crate::domain::types::{ExamStatus, ExamType};
use crate::engine::clock::Clock;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{ExamEvent, ExamEventType, OptionalEventPublisher};
use crate::engine::ratio::round_half_up;
use crate::repository::{ExamRepository, ParticipationRepository};
use rust_decimal::Decimal;
use std::sync::Arc;

pub struct ParticipationTracker {
    exam_repo: Arc<ExamRepository>,
    participation_repo: Arc<ParticipationRepository>,
    clock: Arc<dyn Clock>,
    events: OptionalEventPublisher,
}

impl ParticipationTracker {
    pub fn new(
        exam_repo: Arc<ExamRepository>,
        participation_repo: Arc<ParticipationRepository>,
        clock: Arc<dyn Clock>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            exam_repo,
            participation_repo,
            clock,
            events,
        }
    }

    fn load_exam(&self, exam_id: &str) -> EngineResult<Exam> {
        self.exam_repo
            .find_by_id(exam_id)?
            .ok_or_else(|| EngineError::ExamNotFound(exam_id.to_string()))
    }

    /// 考试名单
    pub fn roster(&self, exam: &Exam) -> EngineResult<Vec<String>> {
        match exam.exam_type {
            ExamType::Retake => Ok(self
                .participation_repo
                .list_by_exam(&exam.exam_id)?
                .into_iter()
                .map(|p| p.student_id)
                .collect()),
            ExamType::Regular | ExamType::Final => Ok(self.exam_repo.class_roster(&exam.exam_id)?),
        }
    }

    /// 校验学生在名单内
    fn ensure_on_roster(&self, exam: &Exam, student_id: &str) -> EngineResult<()> {
        match exam.exam_type {
            ExamType::Retake => {
                if self.participation_repo.find(&exam.exam_id, student_id)?.is_none() {
                    return Err(EngineError::NotEligibleForRetake(format!(
                        "学生{}未报名补考{}",
                        student_id, exam.exam_id
                    )));
                }
            }
            ExamType::Regular | ExamType::Final => {
                if !self.exam_repo.class_roster(&exam.exam_id)?.iter().any(|s| s == student_id) {
                    return Err(EngineError::Validation(format!(
                        "学生{}不在考试{}的班级名单中",
                        student_id, exam.exam_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// 学生开考
    pub fn record_start(&self, exam_id: &str, student_id: &str) -> EngineResult<ExamParticipation> {
        let exam = self.load_exam(exam_id)?;
        if exam.status != ExamStatus::InProgress {
            return Err(EngineError::StateConflict(format!(
                "考试{}当前状态为{}，不能开考",
                exam_id, exam.status
            )));
        }
        self.ensure_on_roster(&exam, student_id)?;

        if let Some(existing) = self.participation_repo.find(exam_id, student_id)? {
            if existing.absent {
                return Err(EngineError::StateConflict(format!(
                    "学生{}已被标记缺考",
                    student_id
                )));
            }
        }

        let participation = self
            .participation_repo
            .record_start(exam_id, student_id, self.clock.now())?;
        tracing::debug!(exam_id, student_id, "学生开考");
        Ok(participation)
    }

    /// 学生交卷
    pub fn record_submit(&self, exam_id: &str, student_id: &str) -> EngineResult<ExamParticipation> {
        let exam = self.load_exam(exam_id)?;
        if exam.status != ExamStatus::InProgress {
            return Err(EngineError::StateConflict(format!(
                "考试{}当前状态为{}，不能交卷",
                exam_id, exam.status
            )));
        }

        let started = self
            .participation_repo
            .find(exam_id, student_id)?
            .map(|p| p.start_time.is_some())
            .unwrap_or(false);
        if !started {
            return Err(EngineError::StateConflict(format!(
                "学生{}尚未开始考试{}",
                student_id, exam_id
            )));
        }

        let participation = self
            .participation_repo
            .record_submit(exam_id, student_id, self.clock.now())?;
        tracing::debug!(exam_id, student_id, "学生交卷");
        Ok(participation)
    }

    /// 标记缺考（同时标记需补考）
    pub fn mark_absent(&self, exam_id: &str, student_id: &str) -> EngineResult<ExamParticipation> {
        self.load_exam(exam_id)?;
        let participation = self.participation_repo.mark_absent(exam_id, student_id)?;

        self.events.publish(
            ExamEvent::new(ExamEventType::ParticipantAbsent, exam_id, "ParticipationTracker", self.clock.now())
                .with_detail(serde_json::json!({ "student_id": student_id })),
        );
        Ok(participation)
    }

    /// 标记违纪
    pub fn mark_disciplinary(
        &self,
        exam_id: &str,
        student_id: &str,
        comment: &str,
    ) -> EngineResult<ExamParticipation> {
        if comment.trim().is_empty() {
            return Err(EngineError::Validation("违纪说明不能为空".to_string()));
        }
        self.load_exam(exam_id)?;
        Ok(self
            .participation_repo
            .mark_disciplinary(exam_id, student_id, comment.trim())?)
    }

    /// 填写教师评语
    pub fn add_comment(
        &self,
        exam_id: &str,
        student_id: &str,
        comment: &str,
    ) -> EngineResult<ExamParticipation> {
        if comment.trim().is_empty() {
            return Err(EngineError::Validation("评语不能为空".to_string()));
        }
        self.load_exam(exam_id)?;
        Ok(self
            .participation_repo
            .set_comment(exam_id, student_id, comment.trim())?)
    }

    /// 标记需补考
    pub fn flag_retake(&self, exam_id: &str, student_id: &str) -> EngineResult<ExamParticipation> {
        self.load_exam(exam_id)?;
        let participation = self.participation_repo.flag_retake(exam_id, student_id)?;
        tracing::info!(exam_id, student_id, "标记需补考");
        Ok(participation)
    }

    /// 参考情况汇总
    ///
    /// 参考率 = 已开考人数 / 名单人数 × 100
    pub fn summary(&self, exam_id: &str) -> EngineResult<ParticipationSummary> {
        let exam = self.load_exam(exam_id)?;
        let roster_count = self.roster(&exam)?.len() as i64;
        let counts = self.participation_repo.counts(exam_id)?;

        let participation_rate = if roster_count > 0 {
            round_half_up(Decimal::from(counts.started) * Decimal::ONE_HUNDRED / Decimal::from(roster_count))
        } else {
            Decimal::ZERO
        };

        Ok(ParticipationSummary {
            exam_id: exam_id.to_string(),
            roster_count,
            started_count: counts.started,
            submitted_count: counts.submitted,
            absent_count: counts.absent,
            participation_rate,
        })
    }
}
