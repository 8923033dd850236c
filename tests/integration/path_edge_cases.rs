use fastdu::duplicates::DuplicateFinder;
use fastdu::scanner::path_utils::base_name_key;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_png(path: &Path) {
    image::RgbImage::new(4, 2).save(path).unwrap();
}

#[test]
fn test_names_with_spaces_and_unicode() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("été 2020")).unwrap();
    fs::create_dir_all(dir.path().join("写真")).unwrap();
    write_png(&dir.path().join("été 2020/plage à midi.png"));
    write_png(&dir.path().join("写真/plage à midi.png"));

    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    let record = outcome.index.get("plage à midi.png").unwrap();
    assert_eq!(record.occurrences.len(), 2);
}

#[cfg(target_os = "linux")]
#[test]
fn test_nfd_and_nfc_names_share_a_record() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("mac")).unwrap();
    fs::create_dir_all(dir.path().join("linux")).unwrap();
    // "café.png" decomposed and precomposed
    write_png(&dir.path().join("mac/cafe\u{301}.png"));
    write_png(&dir.path().join("linux/caf\u{e9}.png"));

    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.index.len(), 1);
    let record = outcome.index.get("caf\u{e9}.png").unwrap();
    assert_eq!(record.occurrences.len(), 2);
}

#[test]
fn test_base_name_key_edge_paths() {
    assert_eq!(base_name_key(Path::new("/")), None);
    assert_eq!(base_name_key(Path::new("a/..")), None);
    assert_eq!(
        base_name_key(Path::new("dir/.hidden.png")).as_deref(),
        Some(".hidden.png")
    );
}

#[test]
fn test_hidden_directories_are_walked() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".thumbnails")).unwrap();
    write_png(&dir.path().join(".thumbnails/x.png"));
    write_png(&dir.path().join("x.png"));

    let outcome = DuplicateFinder::with_defaults()
        .run(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.index.get("x.png").unwrap().occurrences.len(), 2);
}
