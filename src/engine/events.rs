// ==========================================
// 考试引擎 - 引擎层事件发布
// ==========================================
// 职责: 定义考试事件发布 trait，下游（通知/审计/统计）自行实现
// 默认不发布；TracingEventPublisher 将事件写入结构化日志
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 考试事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamEventType {
    /// 试卷组卷完成
    PaperAssembled,
    /// 考试创建（平时/期末/补考）
    ExamCreated,
    /// 考试状态变更
    ExamStatusChanged,
    /// 作答判分
    AnswerGraded,
    /// 考生缺考
    ParticipantAbsent,
    /// 考生被强制交卷
    SubmissionForced,
}

impl ExamEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            ExamEventType::PaperAssembled => "PaperAssembled",
            ExamEventType::ExamCreated => "ExamCreated",
            ExamEventType::ExamStatusChanged => "ExamStatusChanged",
            ExamEventType::AnswerGraded => "AnswerGraded",
            ExamEventType::ParticipantAbsent => "ParticipantAbsent",
            ExamEventType::SubmissionForced => "SubmissionForced",
        }
    }
}

/// 考试事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamEvent {
    pub event_type: ExamEventType,
    /// 主体 ID（试卷 ID 或考试 ID）
    pub entity_id: String,
    /// 事件来源
    pub source: String,
    /// 附加信息
    pub detail: Option<serde_json::Value>,
    pub occurred_at: NaiveDateTime,
}

impl ExamEvent {
    pub fn new(
        event_type: ExamEventType,
        entity_id: impl Into<String>,
        source: &str,
        occurred_at: NaiveDateTime,
    ) -> Self {
        Self {
            event_type,
            entity_id: entity_id.into(),
            source: source.to_string(),
            detail: None,
            occurred_at,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 考试事件发布者
///
/// # 返回
/// - `Ok(id)`: 发布回执（不支持时为空字符串）
pub trait ExamEventPublisher: Send + Sync {
    fn publish(&self, event: ExamEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl ExamEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: ExamEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - entity_id={}, event_type={}",
            event.entity_id,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 写入结构化日志的事件发布者
#[derive(Debug, Clone, Default)]
pub struct TracingEventPublisher;

impl ExamEventPublisher for TracingEventPublisher {
    fn publish(&self, event: ExamEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        let payload = serde_json::to_string(&event)?;
        tracing::info!(
            target: "exam_engine::events",
            event_type = event.event_type.as_str(),
            entity_id = %event.entity_id,
            payload = %payload,
            "考试事件"
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn ExamEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn ExamEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    ///
    /// 发布失败只记录告警，不影响业务结果
    pub fn publish(&self, event: ExamEvent) {
        match &self.inner {
            Some(publisher) => {
                let event_type = event.event_type;
                if let Err(e) = publisher.publish(event) {
                    tracing::warn!(
                        "事件发布失败 - event_type={}, error={}",
                        event_type.as_str(),
                        e
                    );
                }
            }
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - entity_id={}, event_type={}",
                    event.entity_id,
                    event.event_type.as_str()
                );
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
