// ==========================================
// 考试引擎 - 试卷 API
// ==========================================
// 职责: 自动组卷 / 手动组卷 / 试卷查询
// ==========================================

use std::sync::Arc;

use tracing::debug;

use crate::api::error::{require_non_empty, ApiResult};
use crate::domain::paper::{
    AutoAssemblyRequest, ExamPaper, ManualAssemblyRequest, PaperDetail, PaperFilter,
};
use crate::domain::types::QuestionType;
use crate::engine::assembler::PaperAssembler;
use crate::repository::QuestionRepository;

pub struct PaperApi {
    assembler: Arc<PaperAssembler>,
    question_repo: Arc<QuestionRepository>,
}

impl PaperApi {
    pub fn new(assembler: Arc<PaperAssembler>, question_repo: Arc<QuestionRepository>) -> Self {
        Self {
            assembler,
            question_repo,
        }
    }

    /// 自动组卷
    pub fn auto_assemble(&self, request: &AutoAssemblyRequest) -> ApiResult<PaperDetail> {
        debug!(subject_id = %request.subject_id, "调用自动组卷");
        Ok(self.assembler.auto_assemble(request)?)
    }

    /// 手动组卷
    pub fn manual_assemble(&self, request: &ManualAssemblyRequest) -> ApiResult<PaperDetail> {
        debug!(subject_id = %request.subject_id, entries = request.entries.len(), "调用手动组卷");
        Ok(self.assembler.manual_assemble(request)?)
    }

    pub fn get_paper_detail(&self, paper_id: &str) -> ApiResult<PaperDetail> {
        require_non_empty(paper_id, "试卷ID")?;
        Ok(self.assembler.paper_detail(paper_id)?)
    }

    pub fn list_papers(&self, filter: &PaperFilter) -> ApiResult<Vec<ExamPaper>> {
        Ok(self.assembler.list_papers(filter)?)
    }

    /// 课程题库各题型题量（组卷前预览）
    pub fn question_type_counts(&self, subject_id: &str) -> ApiResult<Vec<(QuestionType, i64)>> {
        require_non_empty(subject_id, "课程ID")?;
        Ok(self.question_repo.count_by_type(subject_id)?)
    }
}
