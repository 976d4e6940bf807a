// ==========================================
// 考生参考记录集成测试
// ==========================================
// 场景: 开考/交卷前置条件 / 缺考与违纪标记 / 参考率
// ==========================================

mod test_helpers;

use chrono::Duration;
use exam_engine::api::ApiError;
use exam_engine::domain::exam::{Exam, RegularExamRequest};
use exam_engine::domain::ABSENT_COMMENT;
use test_helpers::*;

fn exam_for_class_a(env: &TestEnv) -> Exam {
    let paper = small_regular_paper(&env.state).expect("组卷失败");
    env.state
        .exam_api
        .publish_regular_exam(&RegularExamRequest {
            teacher_id: LECTURER.to_string(),
            paper_id: paper.paper.paper_id,
            class_ids: vec![CLASS_A.to_string()],
            start_time: base_time() + Duration::hours(1),
            duration_minutes: 60,
        })
        .expect("发布考试失败")
}

fn go_live(env: &TestEnv, exam: &Exam) {
    env.state.exam_api.publish_exam(&exam.exam_id).expect("发布失败");
    env.clock.set(exam.start_time);
    env.state.exam_api.start_exam_strict(&exam.exam_id).expect("开考失败");
}

#[test]
fn test_开考_考试未进行中() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = exam_for_class_a(&env);

    assert!(matches!(
        env.state.exam_api.record_start(&exam.exam_id, "ST1"),
        Err(ApiError::StateConflict(_))
    ));
}

#[test]
fn test_开考_名单校验与幂等() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = exam_for_class_a(&env);
    go_live(&env, &exam);
    let api = &env.state.exam_api;

    // ST4 属于 CL2，不在名单
    assert!(matches!(
        api.record_start(&exam.exam_id, "ST4"),
        Err(ApiError::ValidationError(_))
    ));

    let first = api.record_start(&exam.exam_id, "ST1").expect("开考失败");
    env.clock.advance(Duration::minutes(3));
    let second = api.record_start(&exam.exam_id, "ST1").expect("开考失败");
    assert_eq!(first.start_time, Some(exam.start_time));
    assert_eq!(second.start_time, first.start_time);
}

#[test]
fn test_缺考学生不能开考() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = exam_for_class_a(&env);
    go_live(&env, &exam);
    let api = &env.state.exam_api;

    api.mark_absent(&exam.exam_id, "ST2").expect("标记缺考失败");
    assert!(matches!(
        api.record_start(&exam.exam_id, "ST2"),
        Err(ApiError::StateConflict(_))
    ));
}

#[test]
fn test_缺考保留已有评语() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = exam_for_class_a(&env);
    let api = &env.state.exam_api;

    api.add_comment(&exam.exam_id, "ST2", "已请病假").expect("填写评语失败");
    let absent = api.mark_absent(&exam.exam_id, "ST2").expect("标记缺考失败");
    assert!(absent.absent);
    assert!(absent.retake_needed);
    assert_eq!(absent.comment.as_deref(), Some("已请病假"));

    let fresh = api.mark_absent(&exam.exam_id, "ST3").expect("标记缺考失败");
    assert_eq!(fresh.comment.as_deref(), Some(ABSENT_COMMENT));
}

#[test]
fn test_交卷_需先开考() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = exam_for_class_a(&env);
    go_live(&env, &exam);
    let api = &env.state.exam_api;

    assert!(matches!(
        api.record_submit(&exam.exam_id, "ST1"),
        Err(ApiError::StateConflict(_))
    ));

    api.record_start(&exam.exam_id, "ST1").expect("开考失败");
    env.clock.advance(Duration::minutes(40));
    let submitted = api.record_submit(&exam.exam_id, "ST1").expect("交卷失败");
    assert_eq!(submitted.submit_time, Some(exam.start_time + Duration::minutes(40)));

    // 重复交卷不改变交卷时间
    env.clock.advance(Duration::minutes(5));
    let again = api.record_submit(&exam.exam_id, "ST1").expect("交卷失败");
    assert_eq!(again.submit_time, submitted.submit_time);
}

#[test]
fn test_违纪与评语() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = exam_for_class_a(&env);
    let api = &env.state.exam_api;

    assert!(matches!(
        api.mark_disciplinary(&exam.exam_id, "ST3", "  "),
        Err(ApiError::ValidationError(_))
    ));

    let marked = api
        .mark_disciplinary(&exam.exam_id, "ST3", "携带手机")
        .expect("标记违纪失败");
    assert!(marked.disciplinary);
    assert_eq!(marked.comment.as_deref(), Some("携带手机"));

    let commented = api
        .add_comment(&exam.exam_id, "ST3", "已约谈")
        .expect("填写评语失败");
    assert_eq!(commented.comment.as_deref(), Some("已约谈"));
    assert!(commented.disciplinary);

    assert!(matches!(
        api.add_comment("missing", "ST3", "评语"),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn test_参考率() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = exam_for_class_a(&env);
    go_live(&env, &exam);
    let api = &env.state.exam_api;

    let empty = api.participation_summary(&exam.exam_id).expect("汇总失败");
    assert_eq!(empty.roster_count, 3);
    assert_eq!(empty.participation_rate, dec("0"));

    api.record_start(&exam.exam_id, "ST1").expect("开考失败");
    api.record_start(&exam.exam_id, "ST2").expect("开考失败");
    let summary = api.participation_summary(&exam.exam_id).expect("汇总失败");
    assert_eq!(summary.started_count, 2);
    assert_eq!(summary.participation_rate, dec("66.67"));
}
