//! 抓取编排的集成测试，使用内存驱动

mod common;

use common::*;
use grade_harvest::error::HarvestError;
use grade_harvest::services::ArtifactWriter;
use grade_harvest::{Artifact, Harvester, Ledger, UnitKey};
use tempfile::TempDir;

fn two_sessions() -> Vec<MockSession> {
    vec![
        session(
            "June 2019",
            vec![
                subject(
                    "Physics",
                    vec![("WPH01-01", MockUnit::ok()), ("WPH02-01", MockUnit::ok())],
                ),
                subject("Chemistry", vec![("WCH01-01", MockUnit::ok())]),
            ],
        ),
        session(
            "January 2020",
            vec![subject("Physics", vec![("WPH01-01", MockUnit::ok())])],
        ),
    ]
}

fn key<'a>(session: &'a str, subject: &'a str, unit: &'a str) -> UnitKey<'a> {
    UnitKey::new(QUALIFICATION, session, subject, unit)
}

#[tokio::test]
async fn test_full_run_writes_artifacts_and_ledger() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let harvester = Harvester::new(config.clone(), MockDriver::new(two_sessions()));
    let mut ledger = Ledger::load(&config.progress_file).unwrap();

    let report = harvester.run(&mut ledger).await.unwrap();

    assert_eq!(report.sessions_total, 2);
    assert_eq!(report.sessions_completed, 2);
    assert_eq!(report.units_completed, 4);
    assert_eq!(report.units_failed, 0);

    let stats = ledger.stats();
    assert_eq!(stats.total_sessions, 2);
    assert_eq!(stats.total_subjects, 3);
    assert_eq!(stats.total_units, 4);
    assert_eq!(stats.completed_units, 4);
    assert_eq!(stats.completed_sessions, 2);
    assert!(ledger.is_session_completed(QUALIFICATION, "June 2019"));
    assert_eq!(ledger.summary().completion_percent, 100);

    // 产物按 UMS 降序
    let writer = ArtifactWriter::new(&config.raw_output_dir);
    let path = writer.artifact_path(QUALIFICATION, "June 2019", "Physics", "WPH01-01");
    let text = std::fs::read_to_string(&path).unwrap();
    let artifact: Artifact = serde_json::from_str(&text).unwrap();
    assert_eq!(artifact.metadata.record_count, 3);
    assert_eq!(artifact.metadata.unit, "WPH01-01");
    let ums: Vec<i64> = artifact.data.iter().map(|r| r.ums).collect();
    assert_eq!(ums, vec![120, 80, 60]);

    // 账本已落盘
    let reloaded = Ledger::open_read_only(&config.progress_file);
    assert!(reloaded.is_completed(&key("January 2020", "Physics", "WPH01-01")));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let harvester = Harvester::new(config.clone(), MockDriver::new(two_sessions()));

    let mut ledger = Ledger::load(&config.progress_file).unwrap();
    harvester.run(&mut ledger).await.unwrap();
    let stats_before = ledger.stats().clone();
    harvester.driver().reset_calls();

    // 从磁盘重新加载，模拟下一次运行
    let mut ledger = Ledger::load(&config.progress_file).unwrap();
    let report = harvester.run(&mut ledger).await.unwrap();

    assert_eq!(report.sessions_skipped, 2);
    assert!(harvester.driver().selections().is_empty());
    assert!(harvester.driver().extractions().is_empty());
    assert_eq!(ledger.stats(), &stats_before);
}

#[tokio::test]
async fn test_unit_failure_is_isolated() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let driver = MockDriver::new(two_sessions());
    driver.set_unit(
        "June 2019",
        "Physics",
        "WPH01-01",
        MockUnit::Fail("table vanished".into()),
    );
    let harvester = Harvester::new(config.clone(), driver);
    let mut ledger = Ledger::load(&config.progress_file).unwrap();

    let report = harvester.run(&mut ledger).await.unwrap();

    assert_eq!(report.units_failed, 1);
    assert_eq!(report.units_completed, 3);
    // 失败单元之后的单元照常处理
    assert!(ledger.is_completed(&key("June 2019", "Physics", "WPH02-01")));
    let failed = key("June 2019", "Physics", "WPH01-01");
    assert!(ledger.has_failed(&failed));
    assert!(!ledger.is_completed(&failed));
    assert!(ledger.failure_reason(&failed).unwrap().contains("table vanished"));

    // 失败也算已处理，考试季仍可完成
    assert!(ledger.is_session_completed(QUALIFICATION, "June 2019"));
    assert_eq!(ledger.stats().failed_units, 1);
    assert_eq!(ledger.summary().completion_percent, 75);
}

#[tokio::test]
async fn test_unit_select_failure_is_isolated() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let driver = MockDriver::new(two_sessions());
    driver.set_unit("June 2019", "Physics", "WPH01-01", MockUnit::Missing);
    let harvester = Harvester::new(config.clone(), driver);
    let mut ledger = Ledger::load(&config.progress_file).unwrap();

    let report = harvester.run(&mut ledger).await.unwrap();

    assert_eq!(report.units_failed, 1);
    assert_eq!(report.subject_errors, 0);
    let missing = key("June 2019", "Physics", "WPH01-01");
    assert!(ledger.has_failed(&missing));
    assert!(ledger.failure_reason(&missing).unwrap().contains("WPH01-01"));

    // 同一科目的其他单元照常提取
    assert!(harvester
        .driver()
        .extractions()
        .contains(&"WPH02-01".to_string()));
    assert!(ledger.is_completed(&key("June 2019", "Physics", "WPH02-01")));
    assert!(ledger.is_session_completed(QUALIFICATION, "June 2019"));
}

#[tokio::test]
async fn test_totals_unchanged_for_subject_without_units() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let sessions = vec![session(
        "June 2019",
        vec![
            subject("Physics", vec![("WPH01-01", MockUnit::ok())]),
            subject("Biology", vec![]),
        ],
    )];
    let harvester = Harvester::new(config.clone(), MockDriver::new(sessions));

    let mut ledger = Ledger::load(&config.progress_file).unwrap();
    harvester.run(&mut ledger).await.unwrap();
    let before = ledger.stats().clone();
    assert_eq!(before.total_subjects, 2);
    assert_eq!(before.total_units, 1);

    let mut ledger = Ledger::load(&config.progress_file).unwrap();
    let report = harvester.run(&mut ledger).await.unwrap();

    assert_eq!(report.sessions_skipped, 1);
    assert_eq!(ledger.stats(), &before);
}

#[tokio::test]
async fn test_empty_table_is_recorded_as_failure() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let driver = MockDriver::new(two_sessions());
    driver.set_unit("June 2019", "Chemistry", "WCH01-01", MockUnit::empty());
    let harvester = Harvester::new(config.clone(), driver);
    let mut ledger = Ledger::load(&config.progress_file).unwrap();

    harvester.run(&mut ledger).await.unwrap();

    let unit = key("June 2019", "Chemistry", "WCH01-01");
    assert_eq!(ledger.failure_reason(&unit), Some("no data extracted"));
    let writer = ArtifactWriter::new(&config.raw_output_dir);
    let path = writer.artifact_path(QUALIFICATION, "June 2019", "Chemistry", "WCH01-01");
    assert!(!path.exists());
}

#[tokio::test]
async fn test_failed_unit_not_retried() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let driver = MockDriver::new(two_sessions());
    driver.set_unit("January 2020", "Physics", "WPH01-01", MockUnit::Fail("timeout".into()));
    let harvester = Harvester::new(config.clone(), driver);

    let mut ledger = Ledger::load(&config.progress_file).unwrap();
    harvester.run(&mut ledger).await.unwrap();

    // 页面恢复正常，但账本里已有失败记录
    harvester
        .driver()
        .set_unit("January 2020", "Physics", "WPH01-01", MockUnit::ok());
    harvester.driver().reset_calls();

    let mut ledger = Ledger::load(&config.progress_file).unwrap();
    harvester.run(&mut ledger).await.unwrap();

    assert!(harvester.driver().extractions().is_empty());
    assert!(ledger.has_failed(&key("January 2020", "Physics", "WPH01-01")));

    // 清除失败记录后会重新抓取
    assert_eq!(ledger.clear_failed(QUALIFICATION, None, None), 1);
    harvester.run(&mut ledger).await.unwrap();
    assert_eq!(harvester.driver().extractions(), vec!["WPH01-01".to_string()]);
    assert!(ledger.is_completed(&key("January 2020", "Physics", "WPH01-01")));
}

#[tokio::test]
async fn test_subject_error_keeps_session_open() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let mut sessions = two_sessions();
    sessions[0].subjects[0].broken = true;
    let harvester = Harvester::new(config.clone(), MockDriver::new(sessions));
    let mut ledger = Ledger::load(&config.progress_file).unwrap();

    let report = harvester.run(&mut ledger).await.unwrap();

    assert_eq!(report.subject_errors, 1);
    assert!(ledger.is_completed(&key("June 2019", "Chemistry", "WCH01-01")));
    assert!(!ledger.is_session_completed(QUALIFICATION, "June 2019"));
    assert!(ledger.is_session_completed(QUALIFICATION, "January 2020"));
}

#[tokio::test]
async fn test_subject_filter_limits_work() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.subject_filters = vec!["chem".to_string()];
    let harvester = Harvester::new(config.clone(), MockDriver::new(two_sessions()));
    let mut ledger = Ledger::load(&config.progress_file).unwrap();

    harvester.run(&mut ledger).await.unwrap();

    assert_eq!(harvester.driver().extractions(), vec!["WCH01-01".to_string()]);
    assert!(!ledger.is_accounted(&key("June 2019", "Physics", "WPH01-01")));
    // 只看到部分科目，不标记考试季完成
    assert!(!ledger.is_session_completed(QUALIFICATION, "June 2019"));
    assert_eq!(ledger.stats().completed_sessions, 0);
}

#[tokio::test]
async fn test_no_valid_sessions_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let harvester = Harvester::new(config.clone(), MockDriver::without_valid_sessions());
    let mut ledger = Ledger::load(&config.progress_file).unwrap();

    let err = harvester.run(&mut ledger).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HarvestError>(),
        Some(HarvestError::NoValidSessions { discovered: 2 })
    ));
    assert!(harvester.driver().extractions().is_empty());
}

#[tokio::test]
async fn test_corrupt_ledger_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    std::fs::write(&config.progress_file, "{ not json").unwrap();

    let mut ledger = Ledger::load(&config.progress_file).unwrap();
    assert_eq!(ledger.stats().completed_units, 0);

    let harvester = Harvester::new(config.clone(), MockDriver::new(two_sessions()));
    let report = tokio_test::assert_ok!(harvester.run(&mut ledger).await);
    assert_eq!(report.units_completed, 4);

    let text = std::fs::read_to_string(&config.progress_file).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&text).is_ok());
}

#[tokio::test]
async fn test_probe_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let harvester = Harvester::new(config.clone(), MockDriver::new(two_sessions()));

    let records = harvester
        .probe_unit("June 2019", "Physics", "WPH02-01")
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].ums, 120);
    assert!(!config.progress_file.exists());
    assert!(!config.raw_output_dir.exists());
}

#[tokio::test]
async fn test_probe_unknown_unit_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let harvester = Harvester::new(config, MockDriver::new(two_sessions()));

    let result = harvester.probe_unit("June 2019", "Physics", "WPH99-01").await;
    assert!(result.is_err());
}
