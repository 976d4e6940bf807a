// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库 + AppState 装配 + 组织目录/题库种子数据
// 固定时钟 + 固定随机种子，保证测试可复现
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use exam_engine::app::AppState;
use exam_engine::domain::directory::{College, SchoolClass, Student, Subject, Teacher};
use exam_engine::domain::paper::{ManualAssemblyRequest, PaperDetail};
use exam_engine::domain::question::{Question, QuestionOption};
use exam_engine::domain::types::{AcademicTerm, ExamType, PermissionLevel, QuestionType};
use exam_engine::engine::{
    ExamEvent, ExamEventPublisher, FixedClock, OptionalEventPublisher, SelectionRng,
};
use rust_decimal::Decimal;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub const SUBJECT: &str = "S1";
pub const OTHER_SUBJECT: &str = "S2";
pub const COLLEGE: &str = "C1";
pub const OTHER_COLLEGE: &str = "C2";

/// 权限 0，本学院
pub const DEAN: &str = "T0";
/// 权限 0，外学院
pub const FOREIGN_DEAN: &str = "T0X";
/// 权限 1
pub const LECTURER: &str = "T1";
/// 权限 2
pub const ASSISTANT: &str = "T2";

pub const CLASS_A: &str = "CL1";
pub const CLASS_B: &str = "CL2";

/// 测试环境（临时文件需保持存活）
pub struct TestEnv {
    pub _temp_file: NamedTempFile,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
}

/// 基准时间: 2026-06-15 08:00:00
pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 6, 15)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

pub fn term() -> AcademicTerm {
    AcademicTerm::new(2026, 2).unwrap()
}

/// 创建临时测试数据库并装配 AppState
pub fn create_test_env() -> Result<TestEnv, Box<dyn Error>> {
    create_test_env_with_events(OptionalEventPublisher::none())
}

/// 同上，注入事件发布者
pub fn create_test_env_with_events(events: OptionalEventPublisher) -> Result<TestEnv, Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = exam_engine::db::open_sqlite_connection(&db_path)?;
    let clock = Arc::new(FixedClock::new(base_time()));
    let state = AppState::with_components(
        db_path,
        conn,
        clock.clone(),
        Arc::new(SelectionRng::seeded(20260615)),
        events,
    )?;

    Ok(TestEnv {
        _temp_file: temp_file,
        state,
        clock,
    })
}

/// 创建测试环境并写入组织目录
pub fn create_seeded_env() -> Result<TestEnv, Box<dyn Error>> {
    let env = create_test_env()?;
    seed_directory(&env.state)?;
    Ok(env)
}

/// 记录全部事件的发布者
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<ExamEvent>>,
}

impl RecordingPublisher {
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type.as_str().to_string())
            .collect()
    }
}

impl ExamEventPublisher for RecordingPublisher {
    fn publish(&self, event: ExamEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.events.lock().unwrap().push(event);
        Ok(String::new())
    }
}

// ==========================================
// 组织目录
// ==========================================
// 学院 C1/C2；课程 S1/S2 属于 C1
// 班级 CL1: ST1 ST2 ST3；班级 CL2: ST4 ST5（ST5 属于 C2）
pub fn seed_directory(state: &AppState) -> Result<(), Box<dyn Error>> {
    let dir = &state.repos.directory_repo;

    for (id, name) in [(COLLEGE, "计算机学院"), (OTHER_COLLEGE, "数学学院")] {
        dir.create_college(&College {
            college_id: id.to_string(),
            name: name.to_string(),
        })?;
    }
    for (id, name) in [(SUBJECT, "数据结构"), (OTHER_SUBJECT, "操作系统")] {
        dir.create_subject(&Subject {
            subject_id: id.to_string(),
            name: name.to_string(),
            college_id: COLLEGE.to_string(),
        })?;
    }

    let teachers = [
        (DEAN, PermissionLevel::ALL_EXAMS, COLLEGE),
        (FOREIGN_DEAN, PermissionLevel::ALL_EXAMS, OTHER_COLLEGE),
        (LECTURER, PermissionLevel::REGULAR_EXAMS, COLLEGE),
        (ASSISTANT, PermissionLevel::COMPOSE_ONLY, COLLEGE),
    ];
    for (id, permission, college) in teachers {
        dir.create_teacher(&Teacher {
            teacher_id: id.to_string(),
            name: format!("教师{}", id),
            permission,
            college_id: Some(college.to_string()),
        })?;
    }

    let students = [
        ("ST1", "张三", COLLEGE),
        ("ST2", "李四", COLLEGE),
        ("ST3", "王五", COLLEGE),
        ("ST4", "赵六", COLLEGE),
        ("ST5", "钱七", OTHER_COLLEGE),
    ];
    for (id, name, college) in students {
        dir.create_student(&Student {
            student_id: id.to_string(),
            name: name.to_string(),
            college_id: college.to_string(),
        })?;
    }

    for (class_id, members) in [(CLASS_A, vec!["ST1", "ST2", "ST3"]), (CLASS_B, vec!["ST4", "ST5"])] {
        dir.create_class(&SchoolClass {
            class_id: class_id.to_string(),
            name: format!("班级{}", class_id),
            subject_id: SUBJECT.to_string(),
            final_exam: false,
        })?;
        for student_id in members {
            dir.add_student_to_class(class_id, student_id)?;
        }
    }
    Ok(())
}

// ==========================================
// 题库
// ==========================================

/// 写入一道题（选择题自动生成 A-D 选项）
pub fn insert_question(
    state: &AppState,
    question_id: &str,
    subject_id: &str,
    question_type: QuestionType,
    correct_answer: &str,
    difficulty: Decimal,
) -> Result<Question, Box<dyn Error>> {
    let options = if question_type.has_options() {
        ["A", "B", "C", "D"]
            .iter()
            .map(|label| QuestionOption {
                option_id: format!("{}-{}", question_id, label),
                question_id: question_id.to_string(),
                label: label.to_string(),
                content: format!("选项{}", label),
                is_correct: correct_answer.split(',').any(|c| c.trim() == *label),
            })
            .collect()
    } else {
        Vec::new()
    };

    let question = Question {
        question_id: question_id.to_string(),
        bank_id: "BANK1".to_string(),
        subject_id: subject_id.to_string(),
        question_type,
        content: format!("题目{}", question_id),
        correct_answer: correct_answer.to_string(),
        difficulty,
        options,
    };
    state.repos.question_repo.create(&question)?;
    Ok(question)
}

/// 标准题库: 单选30(0.6) 多选15(0.7) 判断15(0.5) 填空10(0.8) 简答5(0.9)
pub fn seed_standard_bank(state: &AppState, subject_id: &str) -> Result<(), Box<dyn Error>> {
    let plan = [
        (QuestionType::SingleChoice, 30, "A", Decimal::new(6, 1)),
        (QuestionType::MultipleChoice, 15, "A,C", Decimal::new(7, 1)),
        (QuestionType::TrueFalse, 15, "1", Decimal::new(5, 1)),
        (QuestionType::FillBlank, 10, "答案", Decimal::new(8, 1)),
        (QuestionType::Essay, 5, "要点", Decimal::new(9, 1)),
    ];
    for (question_type, count, answer, difficulty) in plan {
        for i in 1..=count {
            let id = format!("{}-{}-{:02}", subject_id, question_type.code(), i);
            insert_question(state, &id, subject_id, question_type, answer, difficulty)?;
        }
    }
    Ok(())
}

/// 手动组卷（教师 DEAN，课程 S1）
pub fn manual_paper(
    state: &AppState,
    paper_name: &str,
    exam_type: ExamType,
    entries: &[(&str, Decimal)],
) -> Result<PaperDetail, Box<dyn Error>> {
    let request = ManualAssemblyRequest {
        subject_id: SUBJECT.to_string(),
        paper_name: paper_name.to_string(),
        entries: entries
            .iter()
            .map(|(id, score)| (id.to_string(), *score))
            .collect(),
        target_difficulty: Decimal::new(5, 1),
        teacher_id: DEAN.to_string(),
        term: term(),
        exam_type,
    };
    Ok(state.paper_api.manual_assemble(&request)?)
}

/// 小题库 + 一份平时试卷: Q-SC(单选 B, 40分) Q-MC(多选 A,C, 30分) Q-TF(判断 1, 20分) Q-ES(简答, 10分)
pub fn small_regular_paper(state: &AppState) -> Result<PaperDetail, Box<dyn Error>> {
    insert_question(state, "Q-SC", SUBJECT, QuestionType::SingleChoice, "B", Decimal::new(4, 1))?;
    insert_question(state, "Q-MC", SUBJECT, QuestionType::MultipleChoice, "A,C", Decimal::new(6, 1))?;
    insert_question(state, "Q-TF", SUBJECT, QuestionType::TrueFalse, "1", Decimal::new(3, 1))?;
    insert_question(state, "Q-ES", SUBJECT, QuestionType::Essay, "要点", Decimal::new(9, 1))?;
    manual_paper(
        state,
        "平时测验",
        ExamType::Regular,
        &[
            ("Q-SC", Decimal::new(4000, 2)),
            ("Q-MC", Decimal::new(3000, 2)),
            ("Q-TF", Decimal::new(2000, 2)),
            ("Q-ES", Decimal::new(1000, 2)),
        ],
    )
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}
