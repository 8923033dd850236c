use clap::Parser;
use fastdu::cli::Cli;
use fastdu::duplicates::DuplicateFinder;
use fastdu::error::ExitCode;
use fastdu::output::json::{read_file_info, DUPLICATES, FILE_INFO, SIZE_INFO};
use fastdu::output::JsonReports;
use fastdu::store::MediaStore;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn write_png(path: &Path) {
    image::RgbImage::new(4, 2).save(path).unwrap();
}

fn media_tree(with_duplicate: bool) -> TempDir {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    write_png(&dir.path().join("a/one.png"));
    write_png(&dir.path().join("b/two.png"));
    if with_duplicate {
        write_png(&dir.path().join("b/one.png"));
    }
    dir
}

/// Scan through the full command path with an empty config file.
fn run_scan(media: &Path, work: &Path, extra: &[&str]) -> ExitCode {
    let config = work.join("config.toml");
    fs::write(&config, "").unwrap();
    let reports = work.join("reports");
    let db = work.join("media.db");

    let mut argv = vec![
        "fastdu".to_string(),
        "-q".to_string(),
        "--config".to_string(),
        config.display().to_string(),
        "scan".to_string(),
        "--report-dir".to_string(),
        reports.display().to_string(),
        "--db".to_string(),
        db.display().to_string(),
    ];
    argv.extend(extra.iter().map(ToString::to_string));
    argv.push(media.display().to_string());

    fastdu::run_app(Cli::parse_from(argv)).unwrap()
}

#[test]
fn test_reports_from_real_scan() {
    let media = media_tree(true);
    let out = tempdir().unwrap();

    let outcome = DuplicateFinder::with_defaults()
        .run(&[media.path().to_path_buf()])
        .unwrap();
    let groups = outcome.index.duplicate_groups();
    let written = JsonReports::new(&outcome.index, &groups, &outcome.summary, ExitCode::Success)
        .write_all(out.path())
        .unwrap();

    let dups: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&written.duplicates).unwrap()).unwrap();
    let first = &dups["duplicates"][0];
    assert_eq!(first["name"], "one.png");
    assert_eq!(first["analysis"]["common_suffix"], "one.png");
    assert_eq!(first["classification"]["kind"], "image");
    assert_eq!(dups["summary"]["duplicate_groups"], 1);
    assert_eq!(dups["summary"]["clean"], true);

    let loaded = read_file_info(&written.file_info).unwrap();
    assert_eq!(loaded, outcome.index);
}

#[test]
fn test_run_app_exit_code_with_duplicates() {
    let media = media_tree(true);
    let work = tempdir().unwrap();

    let code = run_scan(media.path(), work.path(), &[]);
    assert_eq!(code, ExitCode::Success);

    let reports = work.path().join("reports");
    assert!(reports.join(FILE_INFO).is_file());
    assert!(reports.join(DUPLICATES).is_file());
    assert!(reports.join(SIZE_INFO).is_file());

    let store = MediaStore::open(&work.path().join("media.db")).unwrap();
    assert_eq!(store.media_count().unwrap(), 2);
    assert_eq!(store.duplicate_count().unwrap(), 2);
}

#[test]
fn test_run_app_exit_code_without_duplicates() {
    let media = media_tree(false);
    let work = tempdir().unwrap();

    let code = run_scan(media.path(), work.path(), &["--no-db"]);
    assert_eq!(code, ExitCode::NoDuplicates);
    assert!(!work.path().join("media.db").exists());
}

#[test]
fn test_run_app_partial_success_on_missing_root() {
    let media = media_tree(true);
    let work = tempdir().unwrap();
    let missing = media.path().join("missing");

    let code = run_scan(
        media.path(),
        work.path(),
        &["--no-db", missing.to_str().unwrap()],
    );
    assert_eq!(code, ExitCode::PartialSuccess);
}

#[test]
fn test_second_run_backs_up_file_info() {
    let media = media_tree(true);
    let work = tempdir().unwrap();

    run_scan(media.path(), work.path(), &["--no-db"]);
    run_scan(media.path(), work.path(), &["--no-db"]);

    let backup = work.path().join("reports/file-info.json.bak");
    assert!(backup.is_file());
}
