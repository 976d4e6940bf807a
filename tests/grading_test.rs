// ==========================================
// 判分集成测试
// ==========================================
// 场景: 进行中考试的单题作答与判分
// 试卷: Q-SC 单选(B) 40分 / Q-MC 多选(A,C) 30分 / Q-TF 判断(1) 20分 / Q-ES 简答 10分
// ==========================================

mod test_helpers;

use chrono::Duration;
use exam_engine::api::ApiError;
use exam_engine::domain::exam::RegularExamRequest;
use exam_engine::domain::types::{GradingStatus, QuestionType};
use rust_decimal::Decimal;
use test_helpers::*;

/// 发布平时考试并推进到进行中，ST1 已开考
fn live_exam(env: &TestEnv) -> String {
    small_regular_paper(&env.state).expect("组卷失败");
    let paper = env
        .state
        .paper_api
        .list_papers(&Default::default())
        .expect("查询试卷失败")
        .remove(0);

    let exam = env
        .state
        .exam_api
        .publish_regular_exam(&RegularExamRequest {
            teacher_id: LECTURER.to_string(),
            paper_id: paper.paper_id,
            class_ids: vec![CLASS_A.to_string()],
            start_time: base_time() + Duration::hours(1),
            duration_minutes: 60,
        })
        .expect("发布考试失败");

    env.state.exam_api.publish_exam(&exam.exam_id).expect("发布失败");
    env.clock.advance(Duration::hours(1));
    env.state.exam_api.start_exam_strict(&exam.exam_id).expect("开考失败");
    env.state
        .exam_api
        .record_start(&exam.exam_id, "ST1")
        .expect("学生开考失败");
    exam.exam_id
}

#[test]
fn test_单选题判分() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam_id = live_exam(&env);
    let api = &env.state.grading_api;

    let right = api.submit_answer(&exam_id, "ST1", "Q-SC", Some("B")).expect("作答失败");
    assert_eq!(right.score, dec("40"));
    assert_eq!(right.status, GradingStatus::Graded);

    // 改答案后重新判分
    let wrong = api.submit_answer(&exam_id, "ST1", "Q-SC", Some("C")).expect("作答失败");
    assert_eq!(wrong.score, Decimal::ZERO);
    assert_eq!(wrong.record_id, right.record_id);
}

#[test]
fn test_多选题无部分得分() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam_id = live_exam(&env);
    let api = &env.state.grading_api;

    let partial = api.submit_answer(&exam_id, "ST1", "Q-MC", Some("A")).expect("作答失败");
    assert_eq!(partial.score, Decimal::ZERO);
    assert_eq!(partial.status, GradingStatus::Graded);

    let full = api.submit_answer(&exam_id, "ST1", "Q-MC", Some("C,A")).expect("作答失败");
    assert_eq!(full.score, dec("30"));
}

#[test]
fn test_判断题空答案() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam_id = live_exam(&env);

    let outcome = env
        .state
        .grading_api
        .submit_answer(&exam_id, "ST1", "Q-TF", None)
        .expect("作答失败");
    assert_eq!(outcome.score, Decimal::ZERO);
    assert_eq!(outcome.status, GradingStatus::Graded);
}

#[test]
fn test_简答题待人工阅卷() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam_id = live_exam(&env);
    let api = &env.state.grading_api;

    let outcome = api
        .submit_answer(&exam_id, "ST1", "Q-ES", Some("我的回答"))
        .expect("作答失败");
    assert_eq!(outcome.score, Decimal::ZERO);
    assert_eq!(outcome.status, GradingStatus::Ungraded);
    assert_eq!(outcome.full_score, dec("10"));

    let pending = api.pending_manual_grading(&exam_id).expect("查询失败");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].question_id, "Q-ES");
}

#[test]
fn test_重复判分结果一致() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam_id = live_exam(&env);
    let api = &env.state.grading_api;

    let first = api.submit_answer(&exam_id, "ST1", "Q-MC", Some("A,C")).expect("作答失败");
    let second = api.grade_record(&first.record_id).expect("判分失败");
    let third = api.grade_record(&first.record_id).expect("判分失败");
    assert_eq!(first.score, second.score);
    assert_eq!(second, third);
}

#[test]
fn test_答卷汇总() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam_id = live_exam(&env);
    let api = &env.state.grading_api;

    api.submit_answer(&exam_id, "ST1", "Q-SC", Some("B")).expect("作答失败");
    api.submit_answer(&exam_id, "ST1", "Q-MC", Some("A,C")).expect("作答失败");
    api.submit_answer(&exam_id, "ST1", "Q-TF", Some("1")).expect("作答失败");
    api.submit_answer(&exam_id, "ST1", "Q-ES", Some("要点")).expect("作答失败");

    let summary = api.grade_submission(&exam_id, "ST1").expect("汇总失败");
    assert_eq!(summary.objective_score, dec("90"));
    assert_eq!(summary.total_score, dec("90"));
    assert_eq!(summary.graded_count, 3);
    assert_eq!(summary.pending_manual_count, 1);
    assert_eq!(summary.outcomes.len(), 4);
    // 简答题待人工阅卷，暂不判定是否及格
    assert_eq!(summary.passed, None);
}

#[test]
fn test_答卷汇总_保留人工阅卷结果() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam_id = live_exam(&env);
    let api = &env.state.grading_api;

    api.submit_answer(&exam_id, "ST1", "Q-SC", Some("B")).expect("作答失败");
    api.submit_answer(&exam_id, "ST1", "Q-MC", Some("A,C")).expect("作答失败");
    api.submit_answer(&exam_id, "ST1", "Q-TF", Some("1")).expect("作答失败");
    let essay = api
        .submit_answer(&exam_id, "ST1", "Q-ES", Some("要点"))
        .expect("作答失败");

    // 阅卷老师给简答题打 8 分
    env.state
        .repos
        .score_repo
        .update_grade(&essay.record_id, dec("8"), GradingStatus::Graded)
        .expect("人工阅卷失败");

    let summary = api.grade_submission(&exam_id, "ST1").expect("汇总失败");
    let essay_outcome = summary
        .outcomes
        .iter()
        .find(|o| o.question_id == "Q-ES")
        .expect("缺少简答题结果");
    assert_eq!(essay_outcome.score, dec("8"));
    assert_eq!(essay_outcome.status, GradingStatus::Graded);
    assert_eq!(summary.objective_score, dec("90"));
    assert_eq!(summary.total_score, dec("98"));
    assert_eq!(summary.pending_manual_count, 0);
    assert_eq!(summary.passed, Some(true));

    // 单题重判同样不覆盖人工分数
    let regraded = api.grade_record(&essay.record_id).expect("判分失败");
    assert_eq!(regraded.score, dec("8"));
    let stored = env
        .state
        .repos
        .score_repo
        .find_by_id(&essay.record_id)
        .expect("查询失败")
        .expect("记录不存在");
    assert_eq!(stored.score, dec("8"));
    assert_eq!(stored.status, GradingStatus::Graded);
    assert!(api.pending_manual_grading(&exam_id).expect("查询失败").is_empty());

    // 学生改答后回到待阅卷
    let changed = api
        .submit_answer(&exam_id, "ST1", "Q-ES", Some("新的要点"))
        .expect("作答失败");
    assert_eq!(changed.score, Decimal::ZERO);
    assert_eq!(changed.status, GradingStatus::Ungraded);
    let summary = api.grade_submission(&exam_id, "ST1").expect("汇总失败");
    assert_eq!(summary.total_score, dec("90"));
    assert_eq!(summary.passed, None);
}

#[test]
fn test_答卷汇总_全部客观题判定及格() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam_id = live_exam(&env);
    let api = &env.state.grading_api;

    api.submit_answer(&exam_id, "ST1", "Q-SC", Some("B")).expect("作答失败");
    api.submit_answer(&exam_id, "ST1", "Q-MC", Some("A,C")).expect("作答失败");

    let summary = api.grade_submission(&exam_id, "ST1").expect("汇总失败");
    assert_eq!(summary.objective_score, dec("70"));
    assert_eq!(summary.passed, Some(true));

    api.submit_answer(&exam_id, "ST1", "Q-SC", Some("A")).expect("作答失败");
    let summary = api.grade_submission(&exam_id, "ST1").expect("汇总失败");
    assert_eq!(summary.passed, Some(false));
}

#[test]
fn test_作答前置条件() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam_id = live_exam(&env);
    let api = &env.state.grading_api;

    // ST2 未开考
    assert!(matches!(
        api.submit_answer(&exam_id, "ST2", "Q-SC", Some("B")),
        Err(ApiError::StateConflict(_))
    ));

    // 题目不在试卷中
    insert_question(&env.state, "Q-OUT", SUBJECT, QuestionType::SingleChoice, "A", dec("0.5"))
        .expect("写入题目失败");
    assert!(matches!(
        api.submit_answer(&exam_id, "ST1", "Q-OUT", Some("A")),
        Err(ApiError::NotFound(_))
    ));

    // 交卷后不能再作答
    env.state
        .exam_api
        .record_submit(&exam_id, "ST1")
        .expect("交卷失败");
    assert!(matches!(
        api.submit_answer(&exam_id, "ST1", "Q-SC", Some("B")),
        Err(ApiError::StateConflict(_))
    ));

    // 参数校验
    assert!(matches!(
        api.submit_answer("", "ST1", "Q-SC", Some("B")),
        Err(ApiError::ValidationError(_))
    ));
}
