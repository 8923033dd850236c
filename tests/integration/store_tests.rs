use fastdu::duplicates::DuplicateFinder;
use fastdu::replicate::{load_jobs, Replicator};
use fastdu::store::{InsertCounts, MediaStore};
use filetime::FileTime;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn write_png(path: &Path, padding: usize) {
    image::RgbImage::new(4, 2).save(path).unwrap();
    let mut f = OpenOptions::new().append(true).open(path).unwrap();
    f.write_all(&vec![0u8; padding]).unwrap();
}

fn set_mtime(path: &Path, unix_secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
}

#[test]
fn test_scan_then_store_round_trip() {
    let media = tempdir().unwrap();
    let db_dir = tempdir().unwrap();
    fs::create_dir_all(media.path().join("Originals")).unwrap();
    fs::create_dir_all(media.path().join("Previews")).unwrap();
    write_png(&media.path().join("Originals/big.png"), 30_000);
    write_png(&media.path().join("Previews/big.png"), 30_000);
    write_png(&media.path().join("small.png"), 0);

    let outcome = DuplicateFinder::with_defaults()
        .run(&[media.path().to_path_buf()])
        .unwrap();

    let db = db_dir.path().join("media.db");
    let mut store = MediaStore::open(&db).unwrap();
    let counts = store.write_records(&outcome.index).unwrap();
    assert_eq!(counts, InsertCounts { inserted: 2, existing: 0 });
    let dups = store.write_duplicates(&outcome.index).unwrap();
    assert_eq!(dups.inserted, 2);
    drop(store);

    let store = MediaStore::open(&db).unwrap();
    let rows = store.load_media(20_000).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.name, "big.png");
    assert_eq!(row.mime_type, "image");
    assert_eq!(row.mime_subtype, "png");
    assert_eq!(row.width, Some(4));
    assert_eq!(row.height, Some(2));
    assert_eq!(row.count, 2);
    assert!(!row.file_size_mismatch);
    assert_eq!(row.suffix_common_path, "big.png");
}

#[test]
fn test_rescan_reports_existing_rows() {
    let media = tempdir().unwrap();
    write_png(&media.path().join("a.png"), 0);
    write_png(&media.path().join("b.png"), 0);

    let outcome = DuplicateFinder::with_defaults()
        .run(&[media.path().to_path_buf()])
        .unwrap();

    let mut store = MediaStore::open_in_memory().unwrap();
    store.write_records(&outcome.index).unwrap();
    let again = store.write_records(&outcome.index).unwrap();
    assert_eq!(again, InsertCounts { inserted: 0, existing: 2 });
    assert_eq!(store.media_count().unwrap(), 2);
}

#[test]
fn test_replicate_into_dated_tree() {
    let media = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::create_dir_all(media.path().join("Originals")).unwrap();
    fs::create_dir_all(media.path().join("copies")).unwrap();

    let original = media.path().join("Originals/holiday.png");
    let copy = media.path().join("copies/holiday.png");
    write_png(&original, 25_000);
    write_png(&copy, 25_000);
    // 2020-07-04T12:00:00Z
    set_mtime(&original, 1_593_864_000);
    set_mtime(&copy, 1_593_864_000);

    let outcome = DuplicateFinder::with_defaults()
        .run(&[media.path().to_path_buf()])
        .unwrap();
    let mut store = MediaStore::open_in_memory().unwrap();
    store.write_records(&outcome.index).unwrap();

    let jobs = load_jobs(&store, 20_000, out.path()).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].source, original);

    let report = Replicator::new().with_workers(2).run(&jobs).unwrap();
    assert!(report.all_succeeded());
    assert_eq!(report.success_count(), 1);

    let target = out.path().join("2020/07/04/holiday.png");
    assert_eq!(fs::read(&target).unwrap(), fs::read(&original).unwrap());
}

#[test]
fn test_replicate_ignores_small_and_non_visual_rows() {
    let media = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_png(&media.path().join("thumb.png"), 0);
    // ID3 header makes this audio
    let mut song = b"ID3\x03\x00\x00\x00\x00\x00\x00".to_vec();
    song.extend(vec![0u8; 40_000]);
    fs::write(media.path().join("song.mp3"), song).unwrap();

    let outcome = DuplicateFinder::with_defaults()
        .run(&[media.path().to_path_buf()])
        .unwrap();
    assert!(outcome.index.get("song.mp3").is_some());

    let mut store = MediaStore::open_in_memory().unwrap();
    store.write_records(&outcome.index).unwrap();

    let jobs = load_jobs(&store, 20_000, out.path()).unwrap();
    assert!(jobs.is_empty());
}
