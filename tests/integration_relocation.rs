//! Integration tests for moving duplicates aside.
//!
//! Covers name collisions across groups, pre-existing files in the
//! destination, and an unusable destination.

use assert_fs::prelude::*;
use image::{DynamicImage, ImageBuffer, Rgb};
use photo_duplicate_manager::core::pipeline::Pipeline;
use photo_duplicate_manager::core::resolver::KeepPolicy;
use photo_duplicate_manager::error::{DuplicateFinderError, RelocationError};
use predicates::prelude::*;
use std::fs;

/// Horizontal split when `vertical` is false, vertical split otherwise
fn two_tone(vertical: bool, bright_first: bool) -> DynamicImage {
    let img = ImageBuffer::from_fn(64, 64, |x, y| {
        let coord = if vertical { y } else { x };
        if (coord < 32) == bright_first {
            Rgb([240u8, 240, 240])
        } else {
            Rgb([10u8, 10, 10])
        }
    });
    DynamicImage::ImageRgb8(img)
}

#[test]
fn clashing_names_across_groups_get_suffixes() {
    let source = assert_fs::TempDir::new().unwrap();
    let dest = assert_fs::TempDir::new().unwrap();

    // Two unrelated duplicate sets, each with a redundant "photo.png"
    two_tone(false, true).save(source.child("keep_one.bmp").path()).unwrap();
    source.child("one").create_dir_all().unwrap();
    two_tone(false, true).save(source.child("one/photo.png").path()).unwrap();

    two_tone(false, false).save(source.child("keep_two.bmp").path()).unwrap();
    source.child("two").create_dir_all().unwrap();
    two_tone(false, false).save(source.child("two/photo.png").path()).unwrap();

    let result = Pipeline::builder()
        .source(source.path())
        .destination(dest.path())
        .build()
        .run()
        .unwrap();

    assert_eq!(result.groups.len(), 2);
    assert_eq!(result.moved_count(), 2);
    assert_eq!(result.relocation_failures().count(), 0);

    dest.child("duplicates/photo.png").assert(predicate::path::is_file());
    dest.child("duplicates/photo_1.png").assert(predicate::path::is_file());
    source.child("one/photo.png").assert(predicate::path::missing());
    source.child("two/photo.png").assert(predicate::path::missing());
    source.child("keep_one.bmp").assert(predicate::path::exists());
    source.child("keep_two.bmp").assert(predicate::path::exists());
}

#[test]
fn files_already_in_destination_are_not_overwritten() {
    let source = assert_fs::TempDir::new().unwrap();
    let dest = assert_fs::TempDir::new().unwrap();
    dest.child("duplicates/copy.png")
        .write_str("from an earlier run")
        .unwrap();

    two_tone(true, true).save(source.child("original.bmp").path()).unwrap();
    two_tone(true, true).save(source.child("copy.png").path()).unwrap();

    let result = Pipeline::builder()
        .source(source.path())
        .destination(dest.path())
        .build()
        .run()
        .unwrap();

    assert_eq!(result.moved_count(), 1);
    dest.child("duplicates/copy.png")
        .assert(predicate::str::contains("from an earlier run"));
    dest.child("duplicates/copy_1.png").assert(predicate::path::is_file());
}

#[test]
fn first_policy_can_keep_the_smaller_file() {
    let source = assert_fs::TempDir::new().unwrap();
    let dest = assert_fs::TempDir::new().unwrap();
    // Stable order sorts members, so "a.png" comes first
    two_tone(true, false).save(source.child("a.png").path()).unwrap();
    two_tone(true, false).save(source.child("b.bmp").path()).unwrap();

    let result = Pipeline::builder()
        .source(source.path())
        .destination(dest.path())
        .keep_policy(KeepPolicy::First)
        .build()
        .run()
        .unwrap();

    assert_eq!(
        result.resolutions[0].retained,
        source.child("a.png").to_path_buf()
    );
    source.child("a.png").assert(predicate::path::exists());
    dest.child("duplicates/b.bmp").assert(predicate::path::is_file());
}

#[test]
fn moved_bytes_match_the_original() {
    let source = assert_fs::TempDir::new().unwrap();
    let dest = assert_fs::TempDir::new().unwrap();
    two_tone(true, true).save(source.child("big.bmp").path()).unwrap();
    two_tone(true, true).save(source.child("small.png").path()).unwrap();
    let before = fs::read(source.child("small.png").path()).unwrap();

    let result = Pipeline::builder()
        .source(source.path())
        .destination(dest.path())
        .build()
        .run()
        .unwrap();

    let after = fs::read(dest.child("duplicates/small.png").path()).unwrap();
    assert_eq!(before, after);
    assert_eq!(result.reclaimed_bytes(), before.len() as u64);
}

#[test]
fn unusable_destination_is_fatal() {
    let source = assert_fs::TempDir::new().unwrap();
    let dest = assert_fs::TempDir::new().unwrap();
    two_tone(true, true).save(source.child("a.png").path()).unwrap();
    // A plain file where the duplicates folder should go
    dest.child("duplicates").write_str("in the way").unwrap();

    let result = Pipeline::builder()
        .source(source.path())
        .destination(dest.path())
        .build()
        .run();

    assert!(matches!(
        result,
        Err(DuplicateFinderError::Relocation(
            RelocationError::CreateDestination { .. }
                | RelocationError::DestinationNotADirectory { .. }
        ))
    ));
    source.child("a.png").assert(predicate::path::exists());
}
