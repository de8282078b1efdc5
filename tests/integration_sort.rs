//! End-to-end sorting runs against real directories.
//!
//! These tests cover the guarantees a user relies on between runs:
//! - a second run over the same content files nothing twice
//! - extra copies inside the source are set aside, never filed
//! - name clashes get a numeric suffix instead of overwriting
//! - content reappearing with an earlier date pulls the filed copy back
//! - dry runs leave the disk untouched

use assert_fs::prelude::*;
use assert_fs::TempDir;
use chrono::{NaiveDate, NaiveDateTime};
use media_sorter::core::date::DateSource;
use media_sorter::core::duplicates::DuplicatePolicy;
use media_sorter::core::index::{IndexBackend, SqliteIndex};
use media_sorter::core::metadata::MetadataReader;
use media_sorter::core::organize::{Layout, OperationMode};
use media_sorter::core::pipeline::{Pipeline, PipelineBuilder};
use media_sorter::core::scanner::MediaFile;
use predicates::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

/// Reports the same capture time for every file, or none
struct FixedCapture(Option<NaiveDateTime>);

impl MetadataReader for FixedCapture {
    fn capture_time(&self, _file: &MediaFile) -> Option<NaiveDateTime> {
        self.0
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("in").create_dir_all().unwrap();
    temp
}

fn sorter(temp: &TempDir, source: &str) -> PipelineBuilder {
    Pipeline::builder()
        .source(temp.child(source).path())
        .target(temp.child("out").path())
        .metadata_reader(Arc::new(FixedCapture(None)))
}

/// Relative paths of every file under `root`, sorted
fn tree(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().into_owned())
        })
        .collect();
    files.sort();
    files
}

fn set_mtime(path: &Path, secs_since_epoch: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs_since_epoch))
        .unwrap();
}

#[test]
fn second_run_files_nothing_twice() {
    let temp = workspace();
    temp.child("in/2020-01-15_beach.jpg").write_binary(b"beach").unwrap();
    temp.child("in/trip/IMG_20210704_090000.jpg").write_binary(b"fireworks").unwrap();

    let first = sorter(&temp, "in")
        .operation(OperationMode::Copy)
        .build()
        .run()
        .unwrap();
    assert_eq!(first.filed.len(), 2);
    temp.child("out/2020/01-January/2020-01-15_beach.jpg")
        .assert(predicate::path::exists());
    temp.child("out/2021/07-July/IMG_20210704_090000.jpg")
        .assert(predicate::path::exists());
    temp.child("out/media_hashes.db").assert(predicate::path::exists());

    let second = sorter(&temp, "in")
        .operation(OperationMode::Copy)
        .build()
        .run()
        .unwrap();
    assert!(second.filed.is_empty());
    assert_eq!(second.skipped.len(), 2);
    assert!(second.conflicts.is_empty());
    assert!(!tree(temp.child("out").path())
        .iter()
        .any(|name| name.contains("_1.")));

    let stats = second.index_stats.unwrap();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.earliest_taken.map(|d| d.date()), Some(day(2020, 1, 15)));
}

#[test]
fn source_duplicates_are_set_aside() {
    let temp = workspace();
    temp.child("in/2020-01-01_a.jpg").write_binary(b"same bytes").unwrap();
    temp.child("in/2020-01-01_b.jpg").write_binary(b"same bytes").unwrap();
    temp.child("in/2020-01-01_c.jpg").write_binary(b"other bytes").unwrap();

    let outcome = sorter(&temp, "in").build().run().unwrap();

    assert_eq!(outcome.duplicate_groups.len(), 1);
    assert_eq!(outcome.filed.len(), 2);
    assert_eq!(outcome.set_aside.len(), 1);
    temp.child("out/2020/01-January/2020-01-01_a.jpg")
        .assert(predicate::path::exists());
    temp.child("out/2020/01-January/2020-01-01_c.jpg")
        .assert(predicate::path::exists());
    temp.child("out/_duplicates/2020-01-01_b.jpg")
        .assert("same bytes");
    temp.child("out/2020/01-January/2020-01-01_b.jpg")
        .assert(predicate::path::missing());
    temp.child("in/2020-01-01_b.jpg").assert(predicate::path::missing());
}

#[test]
fn ignored_duplicates_stay_in_source() {
    let temp = workspace();
    temp.child("in/2020-01-01_a.jpg").write_binary(b"same bytes").unwrap();
    temp.child("in/2020-01-01_b.jpg").write_binary(b"same bytes").unwrap();

    let outcome = sorter(&temp, "in")
        .duplicates(DuplicatePolicy::Ignore)
        .build()
        .run()
        .unwrap();

    assert_eq!(outcome.filed.len(), 1);
    assert!(outcome.set_aside.is_empty());
    temp.child("in/2020-01-01_b.jpg").assert(predicate::path::exists());
    temp.child("out/_duplicates").assert(predicate::path::missing());
}

#[test]
fn clashing_names_get_a_suffix() {
    let temp = workspace();
    temp.child("in/x/2021-05-06.jpg").write_binary(b"first").unwrap();
    temp.child("in/y/2021-05-06.jpg").write_binary(b"second").unwrap();

    let outcome = sorter(&temp, "in").build().run().unwrap();

    assert_eq!(outcome.filed.len(), 2);
    temp.child("out/2021/05-May/2021-05-06.jpg").assert("first");
    temp.child("out/2021/05-May/2021-05-06_1.jpg").assert("second");
}

#[test]
fn earlier_date_moves_filed_copy() {
    let temp = workspace();
    temp.child("in/holiday_2021-03-10.jpg").write_binary(b"holiday").unwrap();
    temp.child("later/2019-07-04_copy.jpg").write_binary(b"holiday").unwrap();

    sorter(&temp, "in")
        .operation(OperationMode::Copy)
        .build()
        .run()
        .unwrap();
    let original = temp.child("out/2021/03-March/holiday_2021-03-10.jpg");
    original.assert(predicate::path::exists());

    let outcome = sorter(&temp, "later")
        .operation(OperationMode::Copy)
        .build()
        .run()
        .unwrap();

    let relocated = temp.child("out/2019/07-July/holiday_2021-03-10.jpg");
    relocated.assert("holiday");
    original.assert(predicate::path::missing());
    assert!(outcome.filed.is_empty());
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].old, day(2021, 3, 10));
    assert_eq!(outcome.conflicts[0].new, day(2019, 7, 4));
    assert!(!tree(temp.child("out").path())
        .iter()
        .any(|name| name.contains("2019-07-04_copy")));

    let index = SqliteIndex::open_read_only(temp.child("out/media_hashes.db").path()).unwrap();
    let entries = index.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].file_path, relocated.path());
    assert_eq!(entries[0].date_taken.map(|d| d.date()), Some(day(2019, 7, 4)));
    assert_eq!(entries[0].date_source, Some(DateSource::Filename));
}

#[test]
fn later_date_leaves_filed_copy_alone() {
    let temp = workspace();
    temp.child("in/2019-07-04.jpg").write_binary(b"fireworks").unwrap();
    temp.child("later/2023-01-01.jpg").write_binary(b"fireworks").unwrap();

    sorter(&temp, "in").build().run().unwrap();
    let outcome = sorter(&temp, "later").build().run().unwrap();

    temp.child("out/2019/07-July/2019-07-04.jpg").assert("fireworks");
    temp.child("out/2023").assert(predicate::path::missing());
    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].old, day(2023, 1, 1));
    assert_eq!(outcome.conflicts[0].new, day(2019, 7, 4));
}

#[test]
fn implausible_dates_go_to_invalid_folder() {
    let temp = workspace();
    let old = temp.child("in/1999-05-01.jpg");
    old.write_binary(b"scan").unwrap();
    // 1999-05-01
    set_mtime(old.path(), 925_516_800);

    let outcome = sorter(&temp, "in")
        .validate_dates(true, 2004)
        .build()
        .run()
        .unwrap();

    assert_eq!(outcome.invalid_date, vec![old.path().to_path_buf()]);
    temp.child("out/_invalid_date/1999-05-01.jpg").assert("scan");
    temp.child("out/1999").assert(predicate::path::missing());
}

#[test]
fn without_validation_old_dates_are_filed() {
    let temp = workspace();
    temp.child("in/1999-05-01.jpg").write_binary(b"scan").unwrap();

    let outcome = sorter(&temp, "in")
        .validate_dates(false, 2004)
        .build()
        .run()
        .unwrap();

    assert!(outcome.invalid_date.is_empty());
    temp.child("out/1999/05-May/1999-05-01.jpg").assert("scan");
}

#[test]
fn filename_date_beats_embedded_date() {
    let temp = workspace();
    temp.child("in/2015-08-09_party.jpg").write_binary(b"party").unwrap();
    temp.child("in/party.jpg").write_binary(b"more party").unwrap();
    let embedded = day(2010, 1, 2).and_hms_opt(10, 0, 0);

    let outcome = sorter(&temp, "in")
        .metadata_reader(Arc::new(FixedCapture(embedded)))
        .layout(Layout::Day)
        .build()
        .run()
        .unwrap();

    assert_eq!(outcome.filed.len(), 2);
    temp.child("out/2015/08-August/09/2015-08-09_party.jpg")
        .assert(predicate::path::exists());
    temp.child("out/2010/01-January/02/party.jpg")
        .assert(predicate::path::exists());
    let sources: Vec<DateSource> = outcome.filed.iter().map(|f| f.date.source).collect();
    assert!(sources.contains(&DateSource::Filename));
    assert!(sources.contains(&DateSource::Exif));
}

#[test]
fn one_failed_file_does_not_stop_the_run() {
    let temp = workspace();
    temp.child("in/2020-01-15.jpg").write_binary(b"blocked").unwrap();
    temp.child("in/2021-02-01.jpg").write_binary(b"fine").unwrap();
    // a plain file where the January folder has to go
    temp.child("out/2020/01-January").write_binary(b"in the way").unwrap();

    let outcome = sorter(&temp, "in").build().run().unwrap();

    assert_eq!(outcome.failed.len(), 1);
    let failure = &outcome.failed[0];
    assert_eq!(failure.path, temp.child("in/2020-01-15.jpg").path());
    assert!(failure.message.contains("01-January"), "{}", failure.message);
    temp.child("in/2020-01-15.jpg").assert("blocked");
    temp.child("out/2020/01-January").assert("in the way");

    assert_eq!(outcome.filed.len(), 1);
    temp.child("out/2021/02-February/2021-02-01.jpg").assert("fine");
    assert_eq!(outcome.index_stats.map(|s| s.total_entries), Some(1));

    let report = fs::read_to_string(outcome.report_path.unwrap()).unwrap();
    assert!(report.contains("Failed files: 1"));
    assert!(report.contains("FAILED FILES:"));
}

#[test]
fn dry_run_changes_nothing() {
    let temp = workspace();
    temp.child("in/2020-02-02.jpg").write_binary(b"one").unwrap();
    temp.child("in/other/2020-02-02.jpg").write_binary(b"two").unwrap();
    temp.child("in/2020-02-03.jpg").write_binary(b"one").unwrap();
    let before = tree(temp.child("in").path());

    let outcome = sorter(&temp, "in").dry_run(true).build().run().unwrap();

    assert_eq!(tree(temp.child("in").path()), before);
    temp.child("out").assert(predicate::path::missing());
    assert!(outcome.report_path.is_none());
    assert_eq!(outcome.set_aside.len(), 1);
    // planned names account for earlier simulated placements
    let destinations: Vec<_> = outcome.filed.iter().map(|f| f.destination.clone()).collect();
    assert_eq!(
        destinations,
        vec![
            temp.child("out/2020/02-February/2020-02-02.jpg").path().to_path_buf(),
            temp.child("out/2020/02-February/2020-02-02_1.jpg").path().to_path_buf(),
        ]
    );
}

#[test]
fn extension_list_limits_what_is_sorted() {
    let temp = workspace();
    temp.child("in/2018-04-04.crw").write_binary(b"raw").unwrap();
    temp.child("in/2018-04-04.jpg").write_binary(b"jpeg").unwrap();

    let outcome = sorter(&temp, "in")
        .extensions(".crw, thm")
        .build()
        .run()
        .unwrap();

    assert_eq!(outcome.total_files, 1);
    temp.child("out/2018/04-April/2018-04-04.crw").assert("raw");
    temp.child("in/2018-04-04.jpg").assert(predicate::path::exists());
}

#[test]
fn report_lists_what_happened() {
    let temp = workspace();
    temp.child("in/2020-01-01_a.jpg").write_binary(b"same").unwrap();
    temp.child("in/2020-01-01_b.jpg").write_binary(b"same").unwrap();

    let outcome = sorter(&temp, "in").build().run().unwrap();

    let report = outcome.report_path.unwrap();
    let text = fs::read_to_string(report).unwrap();
    assert!(text.starts_with("MEDIA SORT REPORT"));
    assert!(text.contains("Moved files: 1"));
    assert!(text.contains("Duplicate groups: 1"));
    assert!(text.contains("DUPLICATES MOVED:"));
    assert!(text.contains("MOVED FILES:"));
}

#[test]
fn modification_time_survives_copy() {
    let temp = workspace();
    let photo = temp.child("in/2020-06-06.jpg");
    photo.write_binary(b"sunset").unwrap();
    set_mtime(photo.path(), 1_591_444_800);

    sorter(&temp, "in")
        .operation(OperationMode::Copy)
        .build()
        .run()
        .unwrap();

    let copied = fs::metadata(temp.child("out/2020/06-June/2020-06-06.jpg").path())
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(
        copied.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs(),
        1_591_444_800
    );
}
