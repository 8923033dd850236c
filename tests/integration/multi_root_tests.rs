use fastdu::accounting::RankScope;
use fastdu::duplicates::DuplicateFinder;
use fastdu::scanner::ScanError;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_png(path: &Path) {
    image::RgbImage::new(4, 2).save(path).unwrap();
}

#[cfg(unix)]
#[test]
fn test_duplicates_across_roots() {
    let vol1 = tempdir().unwrap();
    let vol2 = tempdir().unwrap();
    for vol in [&vol1, &vol2] {
        let album = vol.path().join("Drive/foobar/Desktop Pictures");
        fs::create_dir_all(&album).unwrap();
        write_png(&album.join("Flower 10.png"));
    }
    fs::create_dir_all(vol1.path().join("Drive/foobar/Desktop Pictures/.thumbnails")).unwrap();
    write_png(
        &vol1
            .path()
            .join("Drive/foobar/Desktop Pictures/.thumbnails/Flower 10.png"),
    );

    let outcome = DuplicateFinder::with_defaults()
        .run(&[vol1.path().to_path_buf(), vol2.path().to_path_buf()])
        .unwrap();

    let groups = outcome.index.duplicate_groups();
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.occurrences.len(), 3);
    assert_eq!(group.analysis.common_suffix, "Flower 10.png");
    // The temp dir names differ between volumes, so the ancestor run stops there.
    assert_eq!(
        group.analysis.common_ancestor,
        "/Drive/foobar/Desktop Pictures"
    );
}

#[test]
fn test_missing_root_is_absorbed() {
    let good = tempdir().unwrap();
    write_png(&good.path().join("ok.png"));
    let missing = good.path().join("does-not-exist");

    let outcome = DuplicateFinder::with_defaults()
        .run(&[missing.clone(), good.path().to_path_buf()])
        .unwrap();

    assert!(outcome.index.get("ok.png").is_some());
    assert_eq!(outcome.summary.root_errors.len(), 1);
    assert!(matches!(
        &outcome.summary.root_errors[0],
        ScanError::RootNotFound(p) if p == &missing
    ));
    assert!(!outcome.summary.is_clean());
}

#[test]
fn test_file_root_attributed_to_parent() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("single.png");
    write_png(&file);

    let outcome = DuplicateFinder::with_defaults().run(&[file]).unwrap();

    assert_eq!(outcome.totals.file_count(), 1);
    assert!(outcome.totals.directory_total(dir.path()).is_some());
    assert!(outcome.index.get("single.png").is_some());
}

#[test]
fn test_top_level_summary_groups_by_first_segment() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a/x")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("a/x/one.bin"), vec![0u8; 10]).unwrap();
    fs::write(dir.path().join("b/two.bin"), vec![0u8; 5]).unwrap();

    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    // Absolute roots share their first segment, so everything lands in one key.
    let ranking = outcome.totals.ranked(-1, RankScope::TopLevel);
    assert!(!ranking.limited);
    assert_eq!(ranking.entries.len(), 1);
    assert_eq!(ranking.entries[0].1, 15);
}

#[test]
fn test_every_root_missing_still_completes() {
    let dir = tempdir().unwrap();
    let roots = vec![dir.path().join("nope1"), dir.path().join("nope2")];

    let outcome = DuplicateFinder::with_defaults().run(&roots).unwrap();

    assert!(outcome.index.is_empty());
    assert_eq!(outcome.summary.stats.root_errors, 2);
    assert_eq!(outcome.totals.file_count(), 0);
}
