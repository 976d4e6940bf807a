// ==========================================
// 期末考试发布
// ==========================================
// 1. 权限: 教师权限 0 且隶属课程所在学院
// 2. 资格: 同课程同学期未发布期末试卷 >= 2 份
// 3. 随机选定一份作为考试试卷
// 4. 单事务: 考试 + 班级关联 + 全部候选试卷置为已发布 + 班级期末标记
// ==========================================

use super::ExamLifecycleController;
use crate::domain::exam::{FinalExamPublication, FinalExamRequest};
use crate::domain::types::ExamType;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::NewExamBundle;
use tracing::instrument;

/// 期末考试需要的最少候选试卷数
pub const MIN_FINAL_PAPERS: usize = 2;

impl ExamLifecycleController {
    /// 发布期末考试
    #[instrument(skip(self, request), fields(subject_id = %request.subject_id, teacher_id = %request.teacher_id, term = %request.term))]
    pub fn publish_final_exam(&self, request: &FinalExamRequest) -> EngineResult<FinalExamPublication> {
        let teacher = self.require_teacher(&request.teacher_id)?;
        let subject = self
            .directory
            .subject(&request.subject_id)?
            .ok_or_else(|| EngineError::ReferenceNotFound {
                entity: "课程",
                id: request.subject_id.clone(),
            })?;

        if !teacher.permission.can_publish_final() {
            return Err(EngineError::InsufficientPermission(format!(
                "教师{}(权限{})不能发布期末考试",
                teacher.teacher_id, teacher.permission
            )));
        }
        if teacher.college_id.as_deref() != Some(subject.college_id.as_str()) {
            return Err(EngineError::InsufficientPermission(format!(
                "教师{}不属于课程{}所在学院",
                teacher.teacher_id, subject.subject_id
            )));
        }

        let candidates = self
            .repos
            .paper_repo
            .list_unpublished_finals(&subject.subject_id, request.term)?;
        tracing::debug!(candidates = candidates.len(), "期末候选试卷");
        if candidates.len() < MIN_FINAL_PAPERS {
            return Err(EngineError::InsufficientFinalPapers {
                required: MIN_FINAL_PAPERS,
                found: candidates.len(),
            });
        }

        let end_time = self.validate_schedule(request.start_time, request.duration_minutes)?;
        let classes = self.require_classes(&request.class_ids, &subject.subject_id)?;
        let class_ids: Vec<String> = classes.into_iter().map(|c| c.class_id).collect();

        let selected_idx = self.rng.choose_index(candidates.len()).ok_or_else(|| {
            EngineError::InsufficientFinalPapers {
                required: MIN_FINAL_PAPERS,
                found: 0,
            }
        })?;
        let selected = &candidates[selected_idx];
        let published_paper_ids: Vec<String> =
            candidates.iter().map(|p| p.paper_id.clone()).collect();

        let exam = self.build_exam(
            selected,
            &teacher.teacher_id,
            ExamType::Final,
            request.start_time,
            request.duration_minutes,
            end_time,
        );
        self.create_bundle(&NewExamBundle {
            exam: &exam,
            class_ids: &class_ids,
            participations: &[],
            papers_to_publish: &published_paper_ids,
            require_draft_papers: true,
            mark_classes_final: true,
        })?;

        self.announce_created(
            &exam,
            serde_json::json!({
                "classes": class_ids,
                "published_papers": published_paper_ids,
            }),
        );
        tracing::info!(
            exam_id = %exam.exam_id,
            selected_paper_id = %selected.paper_id,
            published_papers = published_paper_ids.len(),
            classes = class_ids.len(),
            "期末考试已发布"
        );

        Ok(FinalExamPublication {
            selected_paper_id: selected.paper_id.clone(),
            exam,
            published_paper_ids,
            class_ids,
        })
    }
}
