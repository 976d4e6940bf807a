// ==========================================
// 考试自动处理集成测试
// ==========================================
// 场景: 随时钟推进，已发布考试 -> 进行中 -> 已结束
// 宽限期后未开考学生标记缺考；结束后未交卷考生强制交卷
// ==========================================

mod test_helpers;

use chrono::{Duration, NaiveDateTime};
use exam_engine::domain::exam::{Exam, RegularExamRequest};
use exam_engine::domain::types::{ExamStatus, GradingStatus};
use exam_engine::engine::{AutoProcessReport, OptionalEventPublisher};
use rust_decimal::Decimal;
use std::sync::Arc;
use test_helpers::*;

fn published_exam(env: &TestEnv) -> Exam {
    let paper = small_regular_paper(&env.state).expect("组卷失败");
    let exam = env
        .state
        .exam_api
        .publish_regular_exam(&RegularExamRequest {
            teacher_id: LECTURER.to_string(),
            paper_id: paper.paper.paper_id,
            class_ids: vec![CLASS_A.to_string()],
            start_time: base_time() + Duration::hours(1),
            duration_minutes: 60,
        })
        .expect("发布考试失败");
    env.state.exam_api.publish_exam(&exam.exam_id).expect("发布失败");
    exam
}

fn sweep(env: &TestEnv, at: NaiveDateTime) -> AutoProcessReport {
    env.clock.set(at);
    env.state.auto_processor.run_once(at).expect("自动处理失败")
}

fn status(env: &TestEnv, exam_id: &str) -> ExamStatus {
    env.state.exam_api.get_exam(exam_id).expect("查询考试失败").status
}

#[test]
fn test_自动处理_完整流程() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = published_exam(&env);

    // 未到开始时间
    assert_eq!(sweep(&env, base_time()), AutoProcessReport::default());
    assert_eq!(status(&env, &exam.exam_id), ExamStatus::Published);

    // 到开始时间 -> 进行中
    let report = sweep(&env, exam.start_time);
    assert_eq!(report.started_exams, 1);
    assert_eq!(status(&env, &exam.exam_id), ExamStatus::InProgress);

    // ST1 开考并作答一题
    env.state.exam_api.record_start(&exam.exam_id, "ST1").expect("开考失败");
    env.state
        .grading_api
        .submit_answer(&exam.exam_id, "ST1", "Q-SC", Some("B"))
        .expect("作答失败");

    // 宽限期内不标记缺考
    let report = sweep(&env, exam.start_time + Duration::minutes(5));
    assert_eq!(report.absentees_marked, 0);

    // 宽限期后: ST2 ST3 缺考
    let report = sweep(&env, exam.start_time + Duration::minutes(10));
    assert_eq!(report.absentees_marked, 2);
    for student in ["ST2", "ST3"] {
        let history = env
            .state
            .exam_api
            .student_exam_history(student)
            .expect("查询履历失败");
        assert!(history[0].participation.absent);
        assert!(history[0].participation.retake_needed);
    }
    assert_eq!(sweep(&env, exam.start_time + Duration::minutes(20)).absentees_marked, 0);

    // 到结束时间 -> 已结束，ST1 被强制交卷
    let report = sweep(&env, exam.end_time);
    assert_eq!(report.ended_exams, 1);
    assert_eq!(report.forced_submissions, 1);
    assert_eq!(status(&env, &exam.exam_id), ExamStatus::Ended);

    let history = env.state.exam_api.student_exam_history("ST1").expect("查询履历失败");
    assert_eq!(history[0].participation.submit_time, Some(exam.end_time));

    // 已作答题目保留得分，未作答题目补零分并置为已判分
    let records = env
        .state
        .repos
        .score_repo
        .list_for_student(&exam.exam_id, "ST1")
        .expect("查询作答失败");
    assert_eq!(records.len(), 4);
    let answered = records.iter().find(|r| r.question_id == "Q-SC").unwrap();
    assert_eq!(answered.score, dec("40"));
    for r in records.iter().filter(|r| r.question_id != "Q-SC") {
        assert_eq!(r.score, Decimal::ZERO);
        assert_eq!(r.status, GradingStatus::Graded);
        assert!(r.answer.is_none());
    }
    assert!(env
        .state
        .grading_api
        .pending_manual_grading(&exam.exam_id)
        .expect("查询失败")
        .is_empty());

    // 再次扫描无副作用
    let report = sweep(&env, exam.end_time + Duration::minutes(1));
    assert_eq!(report, AutoProcessReport::default());

    let summary = env
        .state
        .exam_api
        .participation_summary(&exam.exam_id)
        .expect("汇总失败");
    assert_eq!(summary.roster_count, 3);
    assert_eq!(summary.started_count, 1);
    assert_eq!(summary.submitted_count, 1);
    assert_eq!(summary.absent_count, 2);
    assert_eq!(summary.participation_rate, dec("33.33"));
}

#[test]
fn test_自动处理_已交卷考生不受影响() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = published_exam(&env);

    sweep(&env, exam.start_time);
    env.state.exam_api.record_start(&exam.exam_id, "ST1").expect("开考失败");
    env.clock.advance(Duration::minutes(30));
    let submitted = env
        .state
        .exam_api
        .record_submit(&exam.exam_id, "ST1")
        .expect("交卷失败");

    let report = sweep(&env, exam.end_time);
    assert_eq!(report.forced_submissions, 0);

    let history = env.state.exam_api.student_exam_history("ST1").expect("查询履历失败");
    assert_eq!(history[0].participation.submit_time, submitted.submit_time);
    assert!(env
        .state
        .repos
        .score_repo
        .list_for_student(&exam.exam_id, "ST1")
        .expect("查询作答失败")
        .is_empty());
}

#[test]
fn test_自动处理_只扫描仍有未交卷考生的已结束考试() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = published_exam(&env);
    let exam_repo = &env.state.repos.exam_repo;

    sweep(&env, exam.start_time);
    env.state.exam_api.record_start(&exam.exam_id, "ST1").expect("开考失败");
    assert!(exam_repo.list_ended_with_unfinished().expect("查询失败").is_empty());

    // 提前手动结束，ST1 尚未交卷
    env.state.exam_api.end_exam(&exam.exam_id).expect("结束考试失败");
    let pending = exam_repo.list_ended_with_unfinished().expect("查询失败");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].exam_id, exam.exam_id);

    let report = sweep(&env, exam.start_time + Duration::minutes(5));
    assert_eq!(report.forced_submissions, 1);
    assert_eq!(report.ended_exams, 0);

    // 全部交卷后不再进入扫描范围
    assert!(exam_repo.list_ended_with_unfinished().expect("查询失败").is_empty());
    assert_eq!(
        sweep(&env, exam.end_time + Duration::hours(1)),
        AutoProcessReport::default()
    );
}

#[test]
fn test_自动处理_未发布考试不开考() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let paper = small_regular_paper(&env.state).expect("组卷失败");
    let exam = env
        .state
        .exam_api
        .publish_regular_exam(&RegularExamRequest {
            teacher_id: LECTURER.to_string(),
            paper_id: paper.paper.paper_id,
            class_ids: vec![CLASS_A.to_string()],
            start_time: base_time(),
            duration_minutes: 30,
        })
        .expect("发布考试失败");

    let report = sweep(&env, base_time() + Duration::hours(1));
    assert_eq!(report, AutoProcessReport::default());
    assert_eq!(status(&env, &exam.exam_id), ExamStatus::NotStarted);
}

#[test]
fn test_自动处理_一次扫描跨越整场考试() {
    let env = create_seeded_env().expect("创建测试环境失败");
    let exam = published_exam(&env);

    // 同一轮内依次开考、标记缺考、结束
    let report = sweep(&env, exam.end_time + Duration::hours(1));
    assert_eq!(report.started_exams, 1);
    assert_eq!(report.absentees_marked, 3);
    assert_eq!(report.ended_exams, 1);
    assert_eq!(report.forced_submissions, 0);
    assert_eq!(status(&env, &exam.exam_id), ExamStatus::Ended);
}

#[test]
fn test_自动处理_事件() {
    let recorder = Arc::new(RecordingPublisher::default());
    let env = create_test_env_with_events(OptionalEventPublisher::with_publisher(recorder.clone()))
        .expect("创建测试环境失败");
    seed_directory(&env.state).expect("写入目录失败");
    let exam = published_exam(&env);

    sweep(&env, exam.start_time);
    env.state.exam_api.record_start(&exam.exam_id, "ST1").expect("开考失败");
    sweep(&env, exam.end_time);

    let types = recorder.event_types();
    assert_eq!(types.iter().filter(|t| *t == "ParticipantAbsent").count(), 2);
    assert_eq!(types.iter().filter(|t| *t == "SubmissionForced").count(), 1);
    // 发布 + 开考 + 结束
    assert_eq!(types.iter().filter(|t| *t == "ExamStatusChanged").count(), 3);
}
