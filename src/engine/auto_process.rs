// ==========================================
// 考试引擎 - 考试自动处理
// ==========================================
// 周期性扫描（由运行器按配置间隔调用 run_once）:
// 1. 已发布且到开始时间 -> 进行中
// 2. 进行中且超过缺考宽限期: 未开考的名单学生标记缺考
// 3. 进行中且到结束时间 -> 已结束
// 4. 已结束且仍有未交卷考生的考试强制交卷
// 单场考试失败只记录日志，不中断本轮扫描
// ==========================================

use crate::domain::exam::Exam;
use crate::domain::types::ExamStatus;
use crate::engine::error::EngineResult;
use crate::engine::events::{ExamEvent, ExamEventType, OptionalEventPublisher};
use crate::engine::lifecycle::ExamLifecycleController;
use crate::engine::participation::ParticipationTracker;
use crate::engine::repositories::ExamRepositories;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// 单轮扫描结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoProcessReport {
    pub started_exams: usize,
    pub absentees_marked: usize,
    pub ended_exams: usize,
    pub forced_submissions: usize,
    pub failed_exams: usize,
}

pub struct ExamAutoProcessor {
    repos: ExamRepositories,
    lifecycle: Arc<ExamLifecycleController>,
    tracker: Arc<ParticipationTracker>,
    absent_grace_minutes: i64,
    events: OptionalEventPublisher,
}

impl ExamAutoProcessor {
    pub fn new(
        repos: ExamRepositories,
        lifecycle: Arc<ExamLifecycleController>,
        tracker: Arc<ParticipationTracker>,
        absent_grace_minutes: i64,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            repos,
            lifecycle,
            tracker,
            absent_grace_minutes,
            events,
        }
    }

    /// 执行一轮扫描
    #[instrument(skip(self))]
    pub fn run_once(&self, now: NaiveDateTime) -> EngineResult<AutoProcessReport> {
        let mut report = AutoProcessReport::default();

        // 1. 开考
        for exam in self.repos.exam_repo.list_by_status(ExamStatus::Published)? {
            if exam.start_time > now {
                continue;
            }
            match self.lifecycle.start(&exam.exam_id) {
                Ok(outcome) if outcome.is_applied() => report.started_exams += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(exam_id = %exam.exam_id, error = %e, "自动开考失败");
                    report.failed_exams += 1;
                }
            }
        }

        // 2. 缺考 / 3. 结束
        let grace = Duration::minutes(self.absent_grace_minutes);
        for exam in self.repos.exam_repo.list_by_status(ExamStatus::InProgress)? {
            if exam.start_time + grace <= now {
                match self.mark_absentees(&exam) {
                    Ok(marked) => report.absentees_marked += marked,
                    Err(e) => {
                        tracing::error!(exam_id = %exam.exam_id, error = %e, "缺考标记失败");
                        report.failed_exams += 1;
                        continue;
                    }
                }
            }
            if exam.end_time <= now {
                match self.lifecycle.end(&exam.exam_id) {
                    Ok(outcome) if outcome.is_applied() => report.ended_exams += 1,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(exam_id = %exam.exam_id, error = %e, "自动结束考试失败");
                        report.failed_exams += 1;
                    }
                }
            }
        }

        // 4. 强制交卷
        for exam in self.repos.exam_repo.list_ended_with_unfinished()? {
            match self.force_submit_unfinished(&exam, now) {
                Ok(count) => report.forced_submissions += count,
                Err(e) => {
                    tracing::error!(exam_id = %exam.exam_id, error = %e, "强制交卷失败");
                    report.failed_exams += 1;
                }
            }
        }

        if report != AutoProcessReport::default() {
            tracing::info!(
                started = report.started_exams,
                absent = report.absentees_marked,
                ended = report.ended_exams,
                forced = report.forced_submissions,
                failed = report.failed_exams,
                "自动处理完成"
            );
        }
        Ok(report)
    }

    /// 名单中未开考且未标记缺考的学生
    fn mark_absentees(&self, exam: &Exam) -> EngineResult<usize> {
        let mut marked = 0;
        for student_id in self.tracker.roster(exam)? {
            let pending = match self.repos.participation_repo.find(&exam.exam_id, &student_id)? {
                Some(p) => p.start_time.is_none() && !p.absent,
                None => true,
            };
            if pending {
                self.tracker.mark_absent(&exam.exam_id, &student_id)?;
                marked += 1;
            }
        }
        if marked > 0 {
            tracing::info!(exam_id = %exam.exam_id, marked, "标记缺考");
        }
        Ok(marked)
    }

    /// 交卷时间取考试结束时间；未作答题目补零分
    fn force_submit_unfinished(&self, exam: &Exam, now: NaiveDateTime) -> EngineResult<usize> {
        let unfinished: Vec<_> = self
            .repos
            .participation_repo
            .list_by_exam(&exam.exam_id)?
            .into_iter()
            .filter(|p| p.is_unfinished())
            .collect();
        if unfinished.is_empty() {
            return Ok(0);
        }

        let question_ids: Vec<String> = self
            .repos
            .paper_repo
            .find_questions(&exam.paper_id)?
            .into_iter()
            .map(|pq| pq.question_id)
            .collect();

        let mut forced = 0;
        for participation in unfinished {
            let filled = self.repos.participation_repo.force_submit(
                &exam.exam_id,
                &participation.student_id,
                &question_ids,
                exam.end_time,
            )?;
            forced += 1;
            self.events.publish(
                ExamEvent::new(ExamEventType::SubmissionForced, exam.exam_id.clone(), "ExamAutoProcessor", now)
                    .with_detail(serde_json::json!({
                        "student_id": participation.student_id,
                        "filled_questions": filled,
                    })),
            );
        }
        Ok(forced)
    }
}
