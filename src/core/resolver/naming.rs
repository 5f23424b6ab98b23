//! Collision-free destination names.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// Pick a path inside `dir` for `file_name` that does not exist yet.
///
/// Tries the name as-is first, then `stem_1.ext`, `stem_2.ext`, ... until a
/// free slot is found. Callers must hold the resolver lock so that the name
/// is still free when the move happens.
pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if !occupied(&candidate) {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name.file_stem().unwrap_or(file_name);
    let extension = name.extension();

    let mut counter = 1u64;
    loop {
        let candidate = dir.join(suffixed_name(stem, extension, counter));
        if !occupied(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// `stem_N.ext`, or `stem_N` when there is no extension
fn suffixed_name(stem: &OsStr, extension: Option<&OsStr>, counter: u64) -> OsString {
    let mut name = OsString::from(stem);
    name.push(format!("_{counter}"));
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Anything at the path counts, including a dangling symlink
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn free_name_is_used_unchanged() {
        let dir = TempDir::new().unwrap();

        let dest = unique_destination(dir.path(), OsStr::new("photo.jpg"));

        assert_eq!(dest, dir.path().join("photo.jpg"));
    }

    #[test]
    fn taken_name_gets_numeric_suffix_before_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("photo.jpg"), b"x").unwrap();

        let dest = unique_destination(dir.path(), OsStr::new("photo.jpg"));

        assert_eq!(dest, dir.path().join("photo_1.jpg"));
    }

    #[test]
    fn probing_skips_every_taken_suffix() {
        let dir = TempDir::new().unwrap();
        for name in ["photo.jpg", "photo_1.jpg", "photo_2.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let dest = unique_destination(dir.path(), OsStr::new("photo.jpg"));

        assert_eq!(dest, dir.path().join("photo_3.jpg"));
    }

    #[test]
    fn only_last_extension_is_kept_apart() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("scan.final.png"), b"x").unwrap();

        let dest = unique_destination(dir.path(), OsStr::new("scan.final.png"));

        assert_eq!(dest, dir.path().join("scan.final_1.png"));
    }

    #[test]
    fn suffix_without_extension() {
        assert_eq!(
            suffixed_name(OsStr::new("README"), None, 4),
            OsString::from("README_4")
        );
    }
}
