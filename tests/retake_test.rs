// ==========================================
// 补考编排集成测试
// ==========================================
// 场景: 候选人查询范围 / 资格校验 / 补考发布与报名 / 考试履历
// 原考试: CL1(ST1 ST2 ST3) + CL2(ST4 ST5)；ST2 缺考，ST5 被标记需补考
// ==========================================

mod test_helpers;

use chrono::Duration;
use exam_engine::api::ApiError;
use exam_engine::domain::exam::{RegularExamRequest, RetakeExamRequest};
use exam_engine::domain::participation::RetakeCandidateQuery;
use exam_engine::domain::types::{ExamStatus, ExamType};
use exam_engine::domain::ABSENT_COMMENT;
use test_helpers::*;

struct Scenario {
    env: TestEnv,
    paper_id: String,
    exam_id: String,
}

fn scenario() -> Scenario {
    let env = create_seeded_env().expect("创建测试环境失败");
    let paper = small_regular_paper(&env.state).expect("组卷失败");
    let exam = env
        .state
        .exam_api
        .publish_regular_exam(&RegularExamRequest {
            teacher_id: LECTURER.to_string(),
            paper_id: paper.paper.paper_id.clone(),
            class_ids: vec![CLASS_A.to_string(), CLASS_B.to_string()],
            start_time: base_time() + Duration::hours(1),
            duration_minutes: 60,
        })
        .expect("发布考试失败");

    let absent = env
        .state
        .exam_api
        .mark_absent(&exam.exam_id, "ST2")
        .expect("标记缺考失败");
    assert!(absent.absent && absent.retake_needed);
    assert_eq!(absent.comment.as_deref(), Some(ABSENT_COMMENT));

    env.state
        .exam_api
        .flag_retake(&exam.exam_id, "ST5")
        .expect("标记补考失败");

    Scenario {
        env,
        paper_id: paper.paper.paper_id,
        exam_id: exam.exam_id,
    }
}

fn retake_request(paper_id: &str, students: &[&str]) -> RetakeExamRequest {
    RetakeExamRequest {
        teacher_id: LECTURER.to_string(),
        paper_id: paper_id.to_string(),
        student_ids: students.iter().map(|s| s.to_string()).collect(),
        start_time: base_time() + Duration::days(7),
        duration_minutes: 60,
    }
}

fn candidate_ids(s: &Scenario, teacher_id: &str, query: &RetakeCandidateQuery) -> Vec<String> {
    let mut ids: Vec<String> = s
        .env
        .state
        .exam_api
        .retake_candidates(teacher_id, SUBJECT, query)
        .expect("查询候选人失败")
        .into_iter()
        .map(|c| c.student_id)
        .collect();
    ids.sort();
    ids
}

// ==========================================
// 候选人查询
// ==========================================

#[test]
fn test_候选人_按权限限定范围() {
    let s = scenario();
    let query = RetakeCandidateQuery::default();

    // 权限 0: 仅本学院学生
    assert_eq!(candidate_ids(&s, DEAN, &query), vec!["ST2".to_string()]);
    // 权限 1: 不限学院
    assert_eq!(
        candidate_ids(&s, LECTURER, &query),
        vec!["ST2".to_string(), "ST5".to_string()]
    );
    // 权限 0 但课程不属于其学院: 空
    assert!(candidate_ids(&s, FOREIGN_DEAN, &query).is_empty());
}

#[test]
fn test_候选人_姓名与时间过滤() {
    let s = scenario();

    let by_name = RetakeCandidateQuery {
        student_name: Some("李".to_string()),
        ..Default::default()
    };
    assert_eq!(candidate_ids(&s, LECTURER, &by_name), vec!["ST2".to_string()]);

    let later = RetakeCandidateQuery {
        exam_start_from: Some(base_time() + Duration::hours(2)),
        ..Default::default()
    };
    assert!(candidate_ids(&s, LECTURER, &later).is_empty());

    let window = RetakeCandidateQuery {
        exam_start_from: Some(base_time()),
        exam_start_to: Some(base_time() + Duration::hours(1)),
        ..Default::default()
    };
    assert_eq!(candidate_ids(&s, LECTURER, &window).len(), 2);
}

// ==========================================
// 补考发布
// ==========================================

#[test]
fn test_补考发布_拒绝无资格学生且不写数据() {
    let s = scenario();
    let api = &s.env.state.exam_api;

    match api.publish_retake_exam(&retake_request(&s.paper_id, &["ST2", "ST1"])) {
        Err(ApiError::StateConflict(msg)) => assert!(msg.contains("ST1")),
        other => panic!("Expected StateConflict, got {:?}", other.map(|e| e.exam_id)),
    }
    assert_eq!(api.list_exams(&Default::default()).expect("查询失败").len(), 1);
}

#[test]
fn test_补考发布_成功() {
    let s = scenario();
    let api = &s.env.state.exam_api;

    let retake = api
        .publish_retake_exam(&retake_request(&s.paper_id, &["ST2", "ST5", "ST2"]))
        .expect("补考发布失败");
    assert_eq!(retake.exam_type, ExamType::Retake);
    assert_eq!(retake.status, ExamStatus::NotStarted);
    assert_eq!(retake.exam_name, "补考-平时测验");

    let summary = api.participation_summary(&retake.exam_id).expect("汇总失败");
    assert_eq!(summary.roster_count, 2);
    assert_eq!(summary.started_count, 0);

    // 补考无班级关联
    assert!(api.exam_class_ids(&retake.exam_id).expect("查询失败").is_empty());
}

#[test]
fn test_补考发布_权限与参数() {
    let s = scenario();
    let api = &s.env.state.exam_api;

    let mut request = retake_request(&s.paper_id, &["ST2"]);
    request.teacher_id = ASSISTANT.to_string();
    assert!(matches!(api.publish_retake_exam(&request), Err(ApiError::PermissionDenied(_))));

    let request = retake_request(&s.paper_id, &[]);
    assert!(matches!(api.publish_retake_exam(&request), Err(ApiError::ValidationError(_))));

    let request = retake_request("P-MISSING", &["ST2"]);
    assert!(matches!(api.publish_retake_exam(&request), Err(ApiError::NotFound(_))));

    let request = retake_request(&s.paper_id, &["ST-MISSING"]);
    assert!(matches!(api.publish_retake_exam(&request), Err(ApiError::NotFound(_))));
}

#[test]
fn test_补考报名() {
    let s = scenario();
    let api = &s.env.state.exam_api;
    let retake = api
        .publish_retake_exam(&retake_request(&s.paper_id, &["ST2"]))
        .expect("补考发布失败");

    // 未标记需补考
    assert!(matches!(
        api.enroll_retake_student(&retake.exam_id, "ST1"),
        Err(ApiError::StateConflict(_))
    ));

    api.flag_retake(&s.exam_id, "ST1").expect("标记补考失败");
    let first = api
        .enroll_retake_student(&retake.exam_id, "ST1")
        .expect("报名失败");
    let second = api
        .enroll_retake_student(&retake.exam_id, "ST1")
        .expect("报名失败");
    assert_eq!(first.participation_id, second.participation_id);

    let summary = api.participation_summary(&retake.exam_id).expect("汇总失败");
    assert_eq!(summary.roster_count, 2);

    // 普通考试不能报名补考
    assert!(matches!(
        api.enroll_retake_student(&s.exam_id, "ST1"),
        Err(ApiError::ValidationError(_))
    ));
}

#[test]
fn test_补考报名后需补考标记失效() {
    let s = scenario();
    let api = &s.env.state.exam_api;
    let retake = api
        .publish_retake_exam(&retake_request(&s.paper_id, &["ST2"]))
        .expect("补考发布失败");

    // ST2 已报名补考，不再是候选人，也不能再发布一次补考
    assert_eq!(
        candidate_ids(&s, LECTURER, &RetakeCandidateQuery::default()),
        vec!["ST5".to_string()]
    );
    assert!(matches!(
        api.publish_retake_exam(&retake_request(&s.paper_id, &["ST2"])),
        Err(ApiError::StateConflict(_))
    ));

    // 已报名的学生重复报名仍返回原记录
    let enrolled = api
        .enroll_retake_student(&retake.exam_id, "ST2")
        .expect("报名失败");
    assert_eq!(enrolled.exam_id, retake.exam_id);
    assert_eq!(
        api.participation_summary(&retake.exam_id).expect("汇总失败").roster_count,
        1
    );

    // 补考缺考后重新成为候选人
    api.mark_absent(&retake.exam_id, "ST2").expect("标记缺考失败");
    let candidates = api
        .retake_candidates(LECTURER, SUBJECT, &RetakeCandidateQuery::default())
        .expect("查询候选人失败");
    let st2: Vec<_> = candidates.iter().filter(|c| c.student_id == "ST2").collect();
    assert_eq!(st2.len(), 1);
    assert_eq!(st2[0].exam_id, retake.exam_id);
}

#[test]
fn test_补考开考_未报名学生被拒绝() {
    let s = scenario();
    let api = &s.env.state.exam_api;
    let retake = api
        .publish_retake_exam(&retake_request(&s.paper_id, &["ST2"]))
        .expect("补考发布失败");

    api.publish_exam(&retake.exam_id).expect("发布失败");
    s.env.clock.set(retake.start_time);
    api.start_exam_strict(&retake.exam_id).expect("开考失败");

    assert!(matches!(
        api.record_start(&retake.exam_id, "ST3"),
        Err(ApiError::StateConflict(_))
    ));
    let started = api.record_start(&retake.exam_id, "ST2").expect("开考失败");
    assert_eq!(started.start_time, Some(retake.start_time));
}

#[test]
fn test_学生考试履历包含原考试与补考() {
    let s = scenario();
    let api = &s.env.state.exam_api;
    let retake = api
        .publish_retake_exam(&retake_request(&s.paper_id, &["ST2"]))
        .expect("补考发布失败");

    let history = api.student_exam_history("ST2").expect("查询履历失败");
    assert_eq!(history.len(), 2);
    // 开始时间倒序
    assert_eq!(history[0].participation.exam_id, retake.exam_id);
    assert_eq!(history[0].exam_type, ExamType::Retake);
    assert_eq!(history[1].participation.exam_id, s.exam_id);
    assert!(history[1].participation.absent);

    assert!(matches!(
        api.student_exam_history("ST-MISSING"),
        Err(ApiError::NotFound(_))
    ));
}
