use fastdu::accounting::RankScope;
use fastdu::duplicates::{DuplicateFinder, FinderConfig};
use fastdu::progress::ProgressCallback;
use fastdu::scanner::WalkerConfig;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn write_png(path: &Path) {
    image::RgbImage::new(4, 2).save(path).unwrap();
}

fn write_padded_png(path: &Path, extra: usize) {
    write_png(path);
    let mut f = OpenOptions::new().append(true).open(path).unwrap();
    f.write_all(&vec![0u8; extra]).unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert!(outcome.index.is_empty());
    assert_eq!(outcome.summary.duplicate_groups, 0);
    assert_eq!(outcome.totals.file_count(), 0);
    assert!(outcome.summary.is_clean());
}

#[test]
fn test_scan_finds_duplicate_names() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("2019/trip")).unwrap();
    fs::create_dir_all(dir.path().join("backup")).unwrap();
    write_png(&dir.path().join("2019/trip/beach.png"));
    write_png(&dir.path().join("backup/beach.png"));
    write_png(&dir.path().join("backup/unique.png"));

    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.summary.records, 2);
    assert_eq!(outcome.summary.duplicate_groups, 1);
    assert_eq!(outcome.summary.duplicate_files, 1);
    assert_eq!(outcome.summary.mismatched_groups, 0);

    let groups = outcome.index.duplicate_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "beach.png");
    assert_eq!(groups[0].occurrences.len(), 2);
    assert_eq!(groups[0].analysis.common_suffix, "beach.png");
}

#[test]
fn test_scan_flags_size_mismatch() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    write_png(&dir.path().join("a/photo.png"));
    write_padded_png(&dir.path().join("b/photo.png"), 64);

    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    let record = outcome.index.get("photo.png").unwrap();
    assert!(record.size_mismatch);
    assert_eq!(outcome.summary.mismatched_groups, 1);
    assert_eq!(outcome.summary.stats.size_mismatches, 1);
}

#[test]
fn test_non_media_counted_but_not_recorded() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), b"plain text").unwrap();
    write_png(&dir.path().join("pic.png"));

    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert!(outcome.index.get("notes.txt").is_none());
    assert!(outcome.index.get("pic.png").is_some());
    assert_eq!(outcome.totals.file_count(), 2);
    assert_eq!(outcome.summary.stats.other_files, 1);
}

#[test]
fn test_all_files_mode_records_everything() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), b"plain text").unwrap();

    let config =
        FinderConfig::default().with_walker_config(WalkerConfig::default().with_media_only(false));
    let outcome = DuplicateFinder::new(config)
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    let record = outcome.index.get("notes.txt").unwrap();
    assert_eq!(record.classification.kind.as_str(), "other");
}

#[test]
fn test_thumbnail_dirs_skipped_but_sized() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("Thumbs")).unwrap();
    fs::create_dir_all(dir.path().join("@eaDir")).unwrap();
    write_png(&dir.path().join("Thumbs/small.png"));
    write_png(&dir.path().join("@eaDir/small.png"));

    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert!(outcome.index.is_empty());
    assert_eq!(outcome.summary.stats.skipped_by_pattern, 2);
    assert_eq!(outcome.totals.file_count(), 2);
}

#[test]
fn test_directory_totals_are_direct() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(dir.path().join("top.bin"), vec![1u8; 100]).unwrap();
    fs::write(sub.join("inner.bin"), vec![1u8; 40]).unwrap();

    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.totals.directory_total(dir.path()), Some(100));
    assert_eq!(outcome.totals.directory_total(&sub), Some(40));
    assert_eq!(outcome.totals.total_bytes(), 140);

    let ranking = outcome.totals.ranked(1, RankScope::Directories);
    assert!(ranking.limited);
    assert_eq!(ranking.entries[0].1, 100);
}

#[test]
fn test_zero_byte_files_sized_not_recorded() {
    let dir = tempdir().unwrap();
    File::create(dir.path().join("empty.png")).unwrap();

    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert!(outcome.index.is_empty());
    assert_eq!(outcome.summary.stats.empty_files, 1);
    assert_eq!(outcome.totals.file_count(), 1);
    assert_eq!(outcome.totals.total_bytes(), 0);
}

#[derive(Default)]
struct CountingProgress {
    starts: AtomicU64,
    finished_files: AtomicU64,
}

impl ProgressCallback for CountingProgress {
    fn on_walk_start(&self, _roots: usize) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_tick(&self, _files: u64, _bytes: u64) {}

    fn on_finish(&self, files: u64, _bytes: u64) {
        self.finished_files.store(files, Ordering::SeqCst);
    }
}

#[test]
fn test_progress_callback_sees_final_totals() {
    let dir = tempdir().unwrap();
    for i in 0..5 {
        fs::write(dir.path().join(format!("f{i}.bin")), b"data").unwrap();
    }

    let progress = Arc::new(CountingProgress::default());
    let config = FinderConfig::default()
        .with_print_interval(Duration::from_millis(5))
        .with_progress_callback(progress.clone());
    DuplicateFinder::new(config)
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(progress.starts.load(Ordering::SeqCst), 1);
    assert_eq!(progress.finished_files.load(Ordering::SeqCst), 5);
}

#[test]
fn test_deep_tree_with_single_listing_slot() {
    let dir = tempdir().unwrap();
    let mut path = dir.path().to_path_buf();
    for depth in 0..30 {
        path.push(format!("d{depth}"));
        fs::create_dir(&path).unwrap();
        fs::write(path.join("leaf.bin"), b"x").unwrap();
        fs::create_dir(path.join("side")).unwrap();
        fs::write(path.join("side/leaf.bin"), b"y").unwrap();
    }

    let walker = WalkerConfig::default()
        .with_concurrency(1)
        .with_media_only(false);
    let outcome = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker))
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.totals.file_count(), 60);
    let leaf = outcome.index.get("leaf.bin").unwrap();
    assert_eq!(leaf.occurrences.len(), 60);
    assert_eq!(outcome.totals.directory_count(), 60);
}
