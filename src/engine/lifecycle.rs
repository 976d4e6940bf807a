// ==========================================
// 考试引擎 - 考试生命周期控制器
// ==========================================
// 状态机: NotStarted -> Published -> InProgress -> Ended（严格单向）
// 每次迁移校验前置状态，不符时返回 NotApplicable（不报错）
// 发布流程: 平时考试 / 期末考试（final_exam）/ 补考（retake）
// ==========================================

mod final_exam;
mod retake;

pub use final_exam::MIN_FINAL_PAPERS;

use crate::config::EngineSettings;
use crate::domain::directory::{SchoolClass, Teacher};
use crate::domain::exam::{
    Exam, ExamFilter, ExamPhase, ExamProgress, RegularExamRequest, TransitionOutcome,
};
use crate::domain::paper::ExamPaper;
use crate::domain::types::{ExamStatus, ExamType};
use crate::engine::clock::Clock;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{ExamEvent, ExamEventType, OptionalEventPublisher};
use crate::engine::random::SelectionRng;
use crate::engine::ratio::round_half_up;
use crate::engine::repositories::ExamRepositories;
use crate::repository::{DirectoryLookup, NewExamBundle, RepositoryError};
use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// ExamLifecycleController
// ==========================================
pub struct ExamLifecycleController {
    repos: ExamRepositories,
    directory: Arc<dyn DirectoryLookup>,
    clock: Arc<dyn Clock>,
    rng: Arc<SelectionRng>,
    settings: EngineSettings,
    events: OptionalEventPublisher,
}

impl ExamLifecycleController {
    pub fn new(
        repos: ExamRepositories,
        directory: Arc<dyn DirectoryLookup>,
        clock: Arc<dyn Clock>,
        rng: Arc<SelectionRng>,
        settings: EngineSettings,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            repos,
            directory,
            clock,
            rng,
            settings,
            events,
        }
    }

    // ==========================================
    // 状态迁移
    // ==========================================

    /// NotStarted -> Published
    pub fn publish(&self, exam_id: &str) -> EngineResult<TransitionOutcome> {
        self.transition(exam_id, ExamStatus::NotStarted, ExamStatus::Published)
    }

    /// Published -> InProgress
    pub fn start(&self, exam_id: &str) -> EngineResult<TransitionOutcome> {
        self.transition(exam_id, ExamStatus::Published, ExamStatus::InProgress)
    }

    /// InProgress -> Ended
    pub fn end(&self, exam_id: &str) -> EngineResult<TransitionOutcome> {
        self.transition(exam_id, ExamStatus::InProgress, ExamStatus::Ended)
    }

    /// CAS 迁移；并发调用时只有一个成功，其余观察到当前状态
    #[instrument(skip(self))]
    pub(crate) fn transition(
        &self,
        exam_id: &str,
        from: ExamStatus,
        to: ExamStatus,
    ) -> EngineResult<TransitionOutcome> {
        if self.repos.exam_repo.transition_status(exam_id, from, to)? {
            tracing::info!(exam_id, %from, %to, "考试状态迁移");
            self.events.publish(
                ExamEvent::new(ExamEventType::ExamStatusChanged, exam_id, "ExamLifecycleController", self.clock.now())
                    .with_detail(serde_json::json!({ "from": from, "to": to })),
            );
            return Ok(TransitionOutcome::Applied { from, to });
        }

        match self.repos.exam_repo.current_status(exam_id)? {
            Some(current) => {
                tracing::warn!(exam_id, expected = %from, %current, "状态不符，迁移未执行");
                Ok(TransitionOutcome::NotApplicable { current })
            }
            None => Err(EngineError::ExamNotFound(exam_id.to_string())),
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_exam(&self, exam_id: &str) -> EngineResult<Exam> {
        self.repos
            .exam_repo
            .find_by_id(exam_id)?
            .ok_or_else(|| EngineError::ExamNotFound(exam_id.to_string()))
    }

    pub fn list_exams(&self, filter: &ExamFilter) -> EngineResult<Vec<Exam>> {
        Ok(self.repos.exam_repo.list(filter)?)
    }

    pub fn exam_class_ids(&self, exam_id: &str) -> EngineResult<Vec<String>> {
        self.find_exam(exam_id)?;
        Ok(self.repos.exam_repo.class_ids(exam_id)?)
    }

    /// 考试进度（按时钟当前时间计算剩余/已用时长）
    pub fn exam_progress(&self, exam_id: &str) -> EngineResult<ExamProgress> {
        let exam = self.find_exam(exam_id)?;
        Ok(progress_at(&exam, self.clock.now()))
    }

    // ==========================================
    // 平时考试发布
    // ==========================================

    /// 发布平时考试
    ///
    /// 权限 0/1；创建考试 + 班级关联 + 试卷置为已发布（单事务）
    #[instrument(skip(self, request), fields(paper_id = %request.paper_id, teacher_id = %request.teacher_id))]
    pub fn publish_regular_exam(&self, request: &RegularExamRequest) -> EngineResult<Exam> {
        let teacher = self.require_teacher(&request.teacher_id)?;
        if !teacher.permission.can_publish_regular() {
            return Err(EngineError::InsufficientPermission(format!(
                "教师{}(权限{})不能发布考试",
                teacher.teacher_id, teacher.permission
            )));
        }

        let paper = self.require_paper(&request.paper_id)?;
        if paper.exam_type == ExamType::Final {
            return Err(EngineError::Validation(format!(
                "试卷{}为期末试卷，须通过期末考试发布",
                paper.paper_id
            )));
        }

        let end_time = self.validate_schedule(request.start_time, request.duration_minutes)?;
        let classes = self.require_classes(&request.class_ids, &paper.subject_id)?;
        let class_ids: Vec<String> = classes.into_iter().map(|c| c.class_id).collect();

        let exam = self.build_exam(&paper, &teacher.teacher_id, ExamType::Regular, request.start_time, request.duration_minutes, end_time);
        let papers = [paper.paper_id.clone()];
        self.create_bundle(&NewExamBundle {
            exam: &exam,
            class_ids: &class_ids,
            participations: &[],
            papers_to_publish: &papers,
            require_draft_papers: false,
            mark_classes_final: false,
        })?;

        self.announce_created(&exam, serde_json::json!({ "classes": class_ids }));
        tracing::info!(exam_id = %exam.exam_id, classes = class_ids.len(), "平时考试已创建");
        Ok(exam)
    }

    // ==========================================
    // 共享校验
    // ==========================================

    /// 开始时间不得早于当前时间；时长在配置范围内
    ///
    /// # 返回
    /// 结束时间
    fn validate_schedule(&self, start_time: NaiveDateTime, duration_minutes: i64) -> EngineResult<NaiveDateTime> {
        let now = self.clock.now();
        if start_time < now {
            return Err(EngineError::Validation(format!(
                "考试开始时间{}不能早于当前时间{}",
                start_time, now
            )));
        }
        if duration_minutes < self.settings.min_duration_minutes
            || duration_minutes > self.settings.max_duration_minutes
        {
            return Err(EngineError::Validation(format!(
                "考试时长必须在{}-{}分钟之间",
                self.settings.min_duration_minutes, self.settings.max_duration_minutes
            )));
        }
        Ok(start_time + Duration::minutes(duration_minutes))
    }

    /// 教师必须存在，否则视为无权限
    fn require_teacher(&self, teacher_id: &str) -> EngineResult<Teacher> {
        self.directory
            .teacher(teacher_id)?
            .ok_or_else(|| EngineError::InsufficientPermission(format!("教师{}不存在", teacher_id)))
    }

    fn require_paper(&self, paper_id: &str) -> EngineResult<ExamPaper> {
        self.repos
            .paper_repo
            .find_by_id(paper_id)?
            .ok_or_else(|| EngineError::PaperNotFound(paper_id.to_string()))
    }

    /// 班级必须存在且属于该课程（去重，保持顺序）
    fn require_classes(&self, class_ids: &[String], subject_id: &str) -> EngineResult<Vec<SchoolClass>> {
        if class_ids.is_empty() {
            return Err(EngineError::Validation("至少需要选择一个班级".to_string()));
        }
        let mut classes: Vec<SchoolClass> = Vec::with_capacity(class_ids.len());
        for class_id in class_ids {
            if classes.iter().any(|c| &c.class_id == class_id) {
                continue;
            }
            let class = self
                .directory
                .school_class(class_id)?
                .ok_or_else(|| EngineError::ReferenceNotFound {
                    entity: "班级",
                    id: class_id.clone(),
                })?;
            if class.subject_id != subject_id {
                return Err(EngineError::Validation(format!(
                    "班级{}不属于课程{}",
                    class_id, subject_id
                )));
            }
            classes.push(class);
        }
        Ok(classes)
    }

    fn build_exam(
        &self,
        paper: &ExamPaper,
        teacher_id: &str,
        exam_type: ExamType,
        start_time: NaiveDateTime,
        duration_minutes: i64,
        end_time: NaiveDateTime,
    ) -> Exam {
        Exam {
            exam_id: Uuid::new_v4().to_string(),
            exam_name: format!("{}-{}", exam_type.display_label(), paper.paper_name),
            paper_id: paper.paper_id.clone(),
            subject_id: paper.subject_id.clone(),
            teacher_id: teacher_id.to_string(),
            status: ExamStatus::NotStarted,
            exam_type,
            start_time,
            duration_minutes,
            end_time,
            created_at: self.clock.now(),
        }
    }

    /// 写入发布事务；试卷已被并发发布时转为状态冲突
    fn create_bundle(&self, bundle: &NewExamBundle<'_>) -> EngineResult<()> {
        match self.repos.exam_repo.create_exam_bundle(bundle) {
            Ok(()) => Ok(()),
            Err(RepositoryError::ConcurrentModification(msg)) => Err(EngineError::StateConflict(msg)),
            Err(e) => Err(e.into()),
        }
    }

    fn announce_created(&self, exam: &Exam, detail: serde_json::Value) {
        self.events.publish(
            ExamEvent::new(ExamEventType::ExamCreated, exam.exam_id.clone(), "ExamLifecycleController", self.clock.now())
                .with_detail(serde_json::json!({
                    "exam_type": exam.exam_type,
                    "paper_id": exam.paper_id,
                    "start_time": exam.start_time.to_string(),
                    "end_time": exam.end_time.to_string(),
                    "extra": detail,
                })),
        );
    }
}

/// 剩余分钟向下取整；进度按秒计算
fn progress_at(exam: &Exam, now: NaiveDateTime) -> ExamProgress {
    let phase = if now < exam.start_time {
        ExamPhase::Upcoming
    } else if now >= exam.end_time {
        ExamPhase::Finished
    } else {
        ExamPhase::Running
    };

    let total_secs = (exam.end_time - exam.start_time).num_seconds().max(0);
    let used_secs = (now - exam.start_time).num_seconds().clamp(0, total_secs);
    let progress_percent = if total_secs > 0 {
        round_half_up(Decimal::from(used_secs) * Decimal::ONE_HUNDRED / Decimal::from(total_secs))
    } else if phase == ExamPhase::Finished {
        Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    ExamProgress {
        exam_id: exam.exam_id.clone(),
        status: exam.status,
        phase,
        as_of: now,
        minutes_to_start: (exam.start_time - now).num_minutes().max(0),
        minutes_to_end: (exam.end_time - now).num_minutes().max(0),
        used_minutes: used_secs / 60,
        duration_minutes: exam.duration_minutes,
        progress_percent,
    }
}
