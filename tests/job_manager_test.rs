use concurrent_mess::command::ScanParams;
use concurrent_mess::config::JobsConfig;
use concurrent_mess::job::{JobError, JobManager, JobState, SavedJobs};
use std::path::Path;
use std::time::Duration;

// * Job lifecycle through the manager, on real files in a temp directory

fn setup() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let watch = dir.path().join("watch");
    std::fs::create_dir(&watch).unwrap();
    std::fs::write(
        watch.join("one.txt"),
        "Hamburg;12.0\nHelsinki;40.0\nOslo;5.0\nHavana;-2.0\n",
    )
    .unwrap();
    std::fs::write(
        watch.join("two.csv"),
        "Station,Temperature\nHanoi,25.0\nhilo,3.0\n",
    )
    .unwrap();
    std::fs::write(watch.join("ignored.md"), "Hidden;1.0\n").unwrap();
    (dir, watch)
}

fn manager(dir: &Path) -> JobManager {
    JobManager::new(JobsConfig {
        state_file: dir.join("load_config.toml"),
        shutdown_grace_ms: 2_000,
    })
}

fn params(dir: &Path, name: &str) -> ScanParams {
    let out = dir.join(format!("{name}.out"));
    ScanParams::new(-5.0, 30.0, 'H', out.to_string_lossy(), name).unwrap()
}

async fn wait_for_state(manager: &JobManager, name: &str, state: JobState) {
    for _ in 0..200 {
        let report = manager.status(Some(name)).unwrap();
        if report.first().map(|(_, s)| *s) == Some(state) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {name} never reached {state}");
}

fn sorted_lines(path: &Path) -> Vec<String> {
    let mut lines: Vec<String> = std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(String::from)
        .collect();
    lines.sort();
    lines
}

#[tokio::test]
async fn test_scan_job_completes_with_filtered_output() {
    let (dir, watch) = setup();
    let manager = manager(dir.path());
    manager.init(false, &watch).await.unwrap();

    // * Stale output is truncated before the job starts
    let out = dir.path().join("job1.out");
    std::fs::write(&out, "Stale;0.0\n").unwrap();

    manager.scan(params(dir.path(), "job1")).await.unwrap();
    wait_for_state(&manager, "job1", JobState::Completed).await;

    assert_eq!(
        sorted_lines(&out),
        vec!["Hamburg;12.0", "Hanoi;25.0", "Havana;-2.0"]
    );
}

#[tokio::test]
async fn test_duplicate_job_name_is_rejected() {
    let (dir, watch) = setup();
    let manager = manager(dir.path());
    manager.init(false, &watch).await.unwrap();

    manager.scan(params(dir.path(), "job1")).await.unwrap();
    let err = manager.scan(params(dir.path(), "job1")).await.unwrap_err();
    assert!(matches!(err, JobError::DuplicateJob(name) if name == "job1"));
}

#[tokio::test]
async fn test_status_lists_all_jobs_sorted() {
    let (dir, watch) = setup();
    let manager = manager(dir.path());
    manager.init(false, &watch).await.unwrap();

    manager.scan(params(dir.path(), "zeta")).await.unwrap();
    manager.scan(params(dir.path(), "alpha")).await.unwrap();
    wait_for_state(&manager, "zeta", JobState::Completed).await;
    wait_for_state(&manager, "alpha", JobState::Completed).await;

    let report = manager.status(None).unwrap();
    assert_eq!(
        report,
        vec![
            ("alpha".to_string(), JobState::Completed),
            ("zeta".to_string(), JobState::Completed),
        ]
    );
}

#[tokio::test]
async fn test_quit_saves_unexecuted_jobs_and_start_reloads_them() {
    let (dir, watch) = setup();
    let state_file = dir.path().join("load_config.toml");

    let first = manager(dir.path());
    first.init(false, &watch).await.unwrap();
    first.scan(params(dir.path(), "pending")).await.unwrap();

    // * No await between submit and quit: the job has not been polled yet
    let saved = first.quit(true).await;
    assert_eq!(saved, 1);
    assert!(!first.is_started());

    let on_disk = SavedJobs::load(&state_file).await.unwrap().unwrap();
    assert_eq!(on_disk.jobs.len(), 1);
    assert_eq!(on_disk.jobs[0].job_name, "pending");
    assert_eq!(on_disk.jobs[0].job_type, "SCAN");

    let out = dir.path().join("pending.out");
    std::fs::remove_file(&out).unwrap();

    let second = manager(dir.path());
    let loaded = second.init(true, &watch).await.unwrap();
    assert_eq!(loaded, 1);
    wait_for_state(&second, "pending", JobState::Completed).await;
    assert_eq!(sorted_lines(&out).len(), 3);
}

#[tokio::test]
async fn test_quit_without_unexecuted_jobs_writes_nothing() {
    let (dir, watch) = setup();
    let manager = manager(dir.path());
    manager.init(false, &watch).await.unwrap();
    manager.scan(params(dir.path(), "done")).await.unwrap();
    wait_for_state(&manager, "done", JobState::Completed).await;

    assert_eq!(manager.quit(true).await, 0);
    assert!(!dir.path().join("load_config.toml").exists());
}

#[tokio::test]
async fn test_manager_can_restart_after_quit() {
    let (dir, watch) = setup();
    let manager = manager(dir.path());
    manager.init(false, &watch).await.unwrap();
    manager.quit(false).await;

    manager.init(false, &watch).await.unwrap();
    assert!(manager.is_started());
}

#[tokio::test]
async fn test_load_skips_invalid_saved_jobs() {
    let (dir, watch) = setup();
    std::fs::write(
        dir.path().join("load_config.toml"),
        r#"
[[jobs]]
job_name = "broken"
job_type = "SCAN"

[jobs.scan_params]
min = 10.0
max = 0.0
letter = "H"
output_filename = "x.out"

[[jobs]]
job_name = "other"
job_type = "EXPORT"

[jobs.scan_params]
min = 0.0
max = 1.0
letter = "H"
output_filename = "y.out"
"#,
    )
    .unwrap();

    let manager = manager(dir.path());
    assert_eq!(manager.init(true, &watch).await.unwrap(), 0);
    assert!(manager.status(None).unwrap().is_empty());
}

fn impatient_manager(dir: &Path) -> JobManager {
    JobManager::new(JobsConfig {
        state_file: dir.join("load_config.toml"),
        shutdown_grace_ms: 0,
    })
}

#[tokio::test]
async fn test_running_job_is_cancelled_after_grace_period() {
    let dir = tempfile::tempdir().unwrap();
    let watch = dir.path().join("watch");
    std::fs::create_dir(&watch).unwrap();
    let lines = "Hamburg;12.0\n".repeat(400_000);
    for i in 0..8 {
        std::fs::write(watch.join(format!("big{i}.txt")), &lines).unwrap();
    }

    let manager = impatient_manager(dir.path());
    manager.init(false, &watch).await.unwrap();
    manager.scan(params(dir.path(), "big")).await.unwrap();
    wait_for_state(&manager, "big", JobState::Running).await;

    assert_eq!(manager.quit(false).await, 0);

    manager.init(false, &watch).await.unwrap();
    assert_eq!(
        manager.status(Some("big")).unwrap(),
        vec![("big".to_string(), JobState::Cancelled)]
    );

    // * Cancelled is final: nothing left to save on the next shutdown
    assert_eq!(manager.quit(true).await, 0);
    assert!(!dir.path().join("load_config.toml").exists());
}

#[tokio::test]
async fn test_pending_job_is_cancelled_when_grace_expires() {
    let (dir, watch) = setup();
    let manager = impatient_manager(dir.path());
    manager.init(false, &watch).await.unwrap();
    manager.scan(params(dir.path(), "queued")).await.unwrap();

    // * The job task never got to run before shutdown
    manager.quit(false).await;
    manager.init(false, &watch).await.unwrap();
    assert_eq!(
        manager.status(Some("queued")).unwrap(),
        vec![("queued".to_string(), JobState::Cancelled)]
    );
}
