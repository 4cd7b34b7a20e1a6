use std::fs;
use std::io::Read;
use std::sync::{Arc, Mutex};

use allocation_survey::records::{parse_csv, record_from_cells};
use allocation_survey::{
    AdminGate, AdminPanel, AdminSecret, BudgetStatus, Clock, ResponseStore, SurveyError,
    SurveySession,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use flate2::read::GzDecoder;
use tar::Archive;

/// Clock the test can move by hand.
#[derive(Clone)]
struct ManualClock(Arc<Mutex<NaiveDateTime>>);

impl ManualClock {
    fn new() -> Self {
        let start = NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_micro_opt(9, 30, 0, 0)
            .unwrap();
        Self(Arc::new(Mutex::new(start)))
    }

    fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

fn session_in(dir: &std::path::Path) -> (SurveySession, ManualClock) {
    let clock = ManualClock::new();
    let session = SurveySession::with_clock(ResponseStore::new(dir), Box::new(clock.clone()));
    (session, clock)
}

fn data_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[test]
fn scenario_a_exact_total_records_two_rows() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, _clock) = session_in(dir.path());
    session.set("Worship-centered", "Choir", 50).unwrap();
    session.set("Missions-Centered", "Missions", 50).unwrap();

    let receipt = session.submit().unwrap();
    assert_eq!(receipt.timestamp, "2025-03-09T09:30:00.000000");

    let store = session.responses();
    let master = data_lines(store.master_path().as_path());
    assert_eq!(
        master,
        vec![
            "2025-03-09T09:30:00.000000,Worship-centered,Choir,50",
            "2025-03-09T09:30:00.000000,Missions-Centered,Missions,50",
        ]
    );

    let per_submission = store.submission_path(receipt.timestamp.as_str());
    assert_eq!(
        per_submission.file_name().unwrap().to_string_lossy(),
        "submission_2025-03-09T09-30-00.000000.csv"
    );
    assert_eq!(data_lines(per_submission.as_path()), master);
    assert_eq!(
        receipt.personal_copy,
        "priority,item,amount\nWorship-centered,Choir,50\nMissions-Centered,Missions,50\n"
    );
    assert!(session.store().allocation().is_zero());
}

#[test]
fn scenario_b_shortfall_blocks_submit() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, _clock) = session_in(dir.path());
    let summary = session.set("Community-Centered", "Garden", 85).unwrap();
    assert_eq!(summary.status, BudgetStatus::Under { shortfall: 15 });
    assert!(!summary.can_submit);

    let err = session.submit().unwrap_err();
    assert!(matches!(err, SurveyError::UnderBudget { shortfall: 15, .. }));
    assert_eq!(session.summary().total, 85);
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn scenario_c_excess_blocks_submit() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, _clock) = session_in(dir.path());
    session.set("Worship-centered", "Praise Band", 100).unwrap();
    let summary = session.set("Support-Centered", "Sound System", 20).unwrap();
    assert_eq!(summary.status, BudgetStatus::Over { excess: 20 });
    assert_eq!(summary.guidance, "Total exceeds $100 by $20. Please reallocate.");

    assert!(matches!(
        session.submit(),
        Err(SurveyError::OverBudget { excess: 20, .. })
    ));
    assert!(!session.responses().master_path().exists());
}

#[test]
fn scenario_d_empty_allocation_reports_full_shortfall() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, _clock) = session_in(dir.path());
    let summary = session.summary();
    assert_eq!(summary.status, BudgetStatus::Under { shortfall: 100 });
    assert!(!summary.can_submit);
    assert!(session.submit().is_err());
}

#[test]
fn scenario_e_unset_secret_never_unlocks() {
    let gate = AdminGate::new(AdminSecret::Unset);
    for attempt in ["", "admin", "letmein", "Shepherd", "\0"] {
        assert!(!gate.unlock(attempt));
    }
}

#[test]
fn scenario_f_two_submissions_land_in_the_archive() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, clock) = session_in(dir.path());

    session.set("Worship-centered", "Choir", 100).unwrap();
    let first = session.submit().unwrap();
    clock.advance(Duration::minutes(5));
    session.set("Support-Centered", "Office Staff", 40).unwrap();
    session.set("Support-Centered", "Office Expenses", 60).unwrap();
    let second = session.submit().unwrap();
    assert_ne!(first.timestamp, second.timestamp);

    let panel = AdminPanel::new(session.responses().clone());
    let report = panel.report();
    assert!(report.warnings.is_empty());
    assert_eq!(report.submission_count, 2);
    assert_eq!(report.master.as_ref().unwrap().row_count, 3);
    assert_eq!(report.aggregate.as_ref().unwrap().submissions, 2);

    let bytes = panel.submissions_archive().unwrap();
    let mut archive = Archive::new(GzDecoder::new(bytes.as_slice()));
    let mut names = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().to_string();
        let mut archived = Vec::new();
        entry.read_to_end(&mut archived).unwrap();
        let on_disk = fs::read(session.responses().submissions_dir().join(name.as_str())).unwrap();
        assert_eq!(archived, on_disk);
        names.push(name);
    }
    assert_eq!(
        names,
        vec![
            "submission_2025-03-09T09-30-00.000000.csv",
            "submission_2025-03-09T09-35-00.000000.csv",
        ]
    );
}

#[test]
fn repeated_instant_still_yields_distinct_files() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, _clock) = session_in(dir.path());
    for _ in 0..3 {
        session.set("Missions-Centered", "Missions", 100).unwrap();
        session.submit().unwrap();
    }
    let panel = AdminPanel::new(session.responses().clone());
    assert_eq!(panel.submission_files().unwrap().len(), 3);
}

#[test]
fn master_row_count_matches_positive_entries() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, clock) = session_in(dir.path());
    let plans: [&[(&str, &str, i64)]; 3] = [
        &[("Worship-centered", "Choir", 100)],
        &[
            ("Worship-centered", "Choir", 25),
            ("Community-Centered", "Garden", 25),
            ("Support-Centered", "Office Staff", 50),
        ],
        &[
            ("Missions-Centered", "Missions", 90),
            ("Missions-Centered", "Youth Ministry", 10),
            ("Missions-Centered", "Small Groups", 0),
        ],
    ];

    let mut expected_rows = 0;
    for plan in plans {
        for (category, item, amount) in plan {
            session.set(category, item, *amount).unwrap();
        }
        expected_rows += session.submit().unwrap().rows;
        clock.advance(Duration::seconds(1));
    }
    assert_eq!(expected_rows, 6);

    let text = fs::read_to_string(session.responses().master_path()).unwrap();
    let rows = parse_csv(text.as_str()).unwrap();
    assert_eq!(rows.len(), 1 + expected_rows);
    let headers = rows
        .iter()
        .filter(|(_, cells)| cells.first().map(String::as_str) == Some("timestamp"))
        .count();
    assert_eq!(headers, 1);
    for (_, cells) in &rows[1..] {
        let record = record_from_cells(cells).unwrap();
        assert!(record.amount > 0);
    }
}

#[test]
fn admin_master_download_is_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, _clock) = session_in(dir.path());
    session
        .set("Community-Centered", "Outreach events - Harvest Party, etc.", 100)
        .unwrap();
    session.submit().unwrap();

    let panel = AdminPanel::new(session.responses().clone());
    assert_eq!(
        panel.master_bytes().unwrap(),
        fs::read(session.responses().master_path()).unwrap()
    );
}
