// ==========================================
// 考试引擎 - 组卷引擎
// ==========================================
// 职责: 自动组卷（按题型题量 + 比例随机抽题）/ 手动组卷（教师指定题目与分值）
// 不变量: Σ 分值 == 100.00；同卷题目不重复；实际难度 = 所选题目难度均值
// 原子性: 抽题完成后试卷与全部题目关联在同一事务内落库
// ==========================================

use crate::domain::paper::{
    AutoAssemblyRequest, ExamPaper, ManualAssemblyRequest, PaperDetail, PaperFilter,
    PaperQuestion, PaperQuestionView,
};
use crate::domain::question::Question;
use crate::domain::types::{PaperStatus, QuestionType};
use crate::engine::clock::Clock;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{ExamEvent, ExamEventType, OptionalEventPublisher};
use crate::engine::random::SelectionRng;
use crate::engine::ratio::{self, FULL_MARKS};
use crate::repository::{PaperRepository, QuestionCatalog};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// PaperAssembler - 组卷引擎
// ==========================================
pub struct PaperAssembler {
    catalog: Arc<dyn QuestionCatalog>,
    paper_repo: Arc<PaperRepository>,
    rng: Arc<SelectionRng>,
    clock: Arc<dyn Clock>,
    events: OptionalEventPublisher,
}

impl PaperAssembler {
    pub fn new(
        catalog: Arc<dyn QuestionCatalog>,
        paper_repo: Arc<PaperRepository>,
        rng: Arc<SelectionRng>,
        clock: Arc<dyn Clock>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            catalog,
            paper_repo,
            rng,
            clock,
            events,
        }
    }

    // ==========================================
    // 自动组卷
    // ==========================================

    /// 自动组卷
    ///
    /// # 流程
    /// 1. 解析题型比例（Σ == 1）
    /// 2. 按题型编码升序核对题池，简答题最后
    /// 3. 计算每题分值并抽题
    /// 4. 计算实际难度
    /// 5. 单事务写入试卷 + 题目关联
    ///
    /// 任一题型题量不足则整体失败，不留下试卷
    #[instrument(skip(self, request), fields(subject_id = %request.subject_id, paper_name = %request.paper_name))]
    pub fn auto_assemble(&self, request: &AutoAssemblyRequest) -> EngineResult<PaperDetail> {
        Self::validate_header(&request.subject_id, &request.paper_name, &request.teacher_id)?;
        Self::validate_difficulty(request.target_difficulty)?;

        let ratios = ratio::resolve_ratios(&request.type_counts, request.type_ratios.as_ref())?;

        // 先核对各题型题池，题量超出题池时不做分值分配
        let mut pools: BTreeMap<QuestionType, Vec<Question>> = BTreeMap::new();
        for question_type in ratio::placement_order(&request.type_counts) {
            let required = request.type_counts.get(&question_type).copied().unwrap_or(0) as usize;
            let pool = self
                .catalog
                .questions_by_type_and_subject(&request.subject_id, question_type)?;

            tracing::debug!(
                question_type = %question_type,
                pool_size = pool.len(),
                required,
                ratio = %ratios.get(&question_type).copied().unwrap_or_default(),
                "候选题池"
            );

            if pool.len() < required {
                return Err(EngineError::InsufficientQuestions {
                    question_type,
                    required,
                    available: pool.len(),
                });
            }
            pools.insert(question_type, pool);
        }

        let allocations = ratio::allocate_scores(&request.type_counts, &ratios)?;

        let paper_id = Uuid::new_v4().to_string();
        let mut placed: Vec<(Question, Decimal)> = Vec::new();
        for allocation in &allocations {
            let pool = pools.remove(&allocation.question_type).unwrap_or_default();
            let selected = self.rng.sample(pool, allocation.count as usize);
            placed.extend(selected.into_iter().zip(allocation.scores.iter().copied()));
        }

        let difficulty = ratio::mean_difficulty(placed.iter().map(|(q, _)| &q.difficulty));
        let paper = ExamPaper {
            paper_id: paper_id.clone(),
            paper_name: request.paper_name.trim().to_string(),
            subject_id: request.subject_id.clone(),
            teacher_id: request.teacher_id.clone(),
            status: PaperStatus::Draft,
            exam_type: request.exam_type,
            term: request.term,
            difficulty,
            created_at: self.clock.now(),
        };

        let detail = self.persist(paper, placed)?;
        tracing::info!(
            paper_id = %detail.paper.paper_id,
            questions = detail.questions.len(),
            difficulty = %detail.paper.difficulty,
            target_difficulty = %request.target_difficulty,
            "自动组卷完成"
        );
        Ok(detail)
    }

    // ==========================================
    // 手动组卷
    // ==========================================

    /// 手动组卷
    ///
    /// 题序即 entries 顺序；分值合计必须恰为 100.00
    #[instrument(skip(self, request), fields(subject_id = %request.subject_id, paper_name = %request.paper_name))]
    pub fn manual_assemble(&self, request: &ManualAssemblyRequest) -> EngineResult<PaperDetail> {
        Self::validate_header(&request.subject_id, &request.paper_name, &request.teacher_id)?;
        Self::validate_difficulty(request.target_difficulty)?;

        if request.entries.is_empty() {
            return Err(EngineError::Validation("题目列表不能为空".to_string()));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for (question_id, score) in &request.entries {
            if !seen.insert(question_id.as_str()) {
                return Err(EngineError::Validation(format!("题目重复: {}", question_id)));
            }
            if score.is_sign_negative() && !score.is_zero() {
                return Err(EngineError::Validation(format!(
                    "题目{}分值不能为负: {}",
                    question_id, score
                )));
            }
            if *score > FULL_MARKS {
                return Err(EngineError::Validation(format!(
                    "题目{}分值{}超过满分{}",
                    question_id, score, FULL_MARKS
                )));
            }
            if score.normalize().scale() > 2 {
                return Err(EngineError::Validation(format!(
                    "题目{}分值最多两位小数: {}",
                    question_id, score
                )));
            }
        }

        let total = request
            .entries
            .iter()
            .try_fold(Decimal::ZERO, |acc, (_, s)| acc.checked_add(*s))
            .ok_or_else(|| EngineError::Validation("分值合计溢出".to_string()))?;
        if total != FULL_MARKS {
            return Err(EngineError::ScoreSumMismatch { actual: total });
        }

        let mut placed: Vec<(Question, Decimal)> = Vec::with_capacity(request.entries.len());
        for (question_id, score) in &request.entries {
            let question = self
                .catalog
                .question_by_id(question_id)?
                .ok_or_else(|| EngineError::UnknownQuestion(question_id.clone()))?;
            if question.subject_id != request.subject_id {
                return Err(EngineError::Validation(format!(
                    "题目{}不属于课程{}",
                    question_id, request.subject_id
                )));
            }
            placed.push((question, ratio::round_half_up(*score)));
        }

        let difficulty = ratio::mean_difficulty(placed.iter().map(|(q, _)| &q.difficulty));
        let paper = ExamPaper {
            paper_id: Uuid::new_v4().to_string(),
            paper_name: request.paper_name.trim().to_string(),
            subject_id: request.subject_id.clone(),
            teacher_id: request.teacher_id.clone(),
            status: PaperStatus::Draft,
            exam_type: request.exam_type,
            term: request.term,
            difficulty,
            created_at: self.clock.now(),
        };

        let detail = self.persist(paper, placed)?;
        tracing::info!(
            paper_id = %detail.paper.paper_id,
            questions = detail.questions.len(),
            "手动组卷完成"
        );
        Ok(detail)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 试卷详情（题目按题序）
    pub fn paper_detail(&self, paper_id: &str) -> EngineResult<PaperDetail> {
        let paper = self
            .paper_repo
            .find_by_id(paper_id)?
            .ok_or_else(|| EngineError::PaperNotFound(paper_id.to_string()))?;

        let mut questions = Vec::new();
        for pq in self.paper_repo.find_questions(paper_id)? {
            let question = self
                .catalog
                .question_by_id(&pq.question_id)?
                .ok_or_else(|| EngineError::QuestionNotFound(pq.question_id.clone()))?;
            questions.push(PaperQuestionView {
                ordinal: pq.ordinal,
                score: pq.score,
                question,
            });
        }
        let total_score = questions.iter().map(|q| q.score).sum();

        Ok(PaperDetail {
            paper,
            questions,
            total_score,
        })
    }

    pub fn list_papers(&self, filter: &PaperFilter) -> EngineResult<Vec<ExamPaper>> {
        Ok(self.paper_repo.list(filter)?)
    }

    // ==========================================
    // 内部
    // ==========================================

    fn validate_header(subject_id: &str, paper_name: &str, teacher_id: &str) -> EngineResult<()> {
        if subject_id.trim().is_empty() {
            return Err(EngineError::Validation("课程ID不能为空".to_string()));
        }
        if paper_name.trim().is_empty() {
            return Err(EngineError::Validation("试卷名称不能为空".to_string()));
        }
        if teacher_id.trim().is_empty() {
            return Err(EngineError::Validation("教师ID不能为空".to_string()));
        }
        Ok(())
    }

    fn validate_difficulty(difficulty: Decimal) -> EngineResult<()> {
        if difficulty < Decimal::ZERO || difficulty > Decimal::ONE {
            return Err(EngineError::Validation(format!(
                "目标难度必须在[0,1]之间: {}",
                difficulty
            )));
        }
        Ok(())
    }

    /// 编排题序并单事务落库
    fn persist(&self, paper: ExamPaper, placed: Vec<(Question, Decimal)>) -> EngineResult<PaperDetail> {
        let mut paper_questions = Vec::with_capacity(placed.len());
        let mut views = Vec::with_capacity(placed.len());
        for (idx, (question, score)) in placed.into_iter().enumerate() {
            let ordinal = idx as i32 + 1;
            paper_questions.push(PaperQuestion {
                paper_id: paper.paper_id.clone(),
                question_id: question.question_id.clone(),
                ordinal,
                score,
            });
            views.push(PaperQuestionView {
                ordinal,
                score,
                question,
            });
        }

        self.paper_repo.create_with_questions(&paper, &paper_questions)?;

        let total_score: Decimal = views.iter().map(|v| v.score).sum();
        self.events.publish(
            ExamEvent::new(
                ExamEventType::PaperAssembled,
                paper.paper_id.clone(),
                "PaperAssembler",
                self.clock.now(),
            )
            .with_detail(serde_json::json!({
                "questions": views.len(),
                "total_score": total_score.to_string(),
                "difficulty": paper.difficulty.to_string(),
            })),
        );

        Ok(PaperDetail {
            paper,
            questions: views,
            total_score,
        })
    }
}
