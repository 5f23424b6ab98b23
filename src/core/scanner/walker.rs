//! Directory walking implementation using walkdir.

use super::filter::{is_hidden, ImageFilter};
use super::{PhotoFile, PhotoScanner, ScanResult};
use crate::core::scheduler::CancellationToken;
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for the directory scanner
///
/// Symbolic links are never followed.
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Skip dot-files and everything under dot-directories
    pub skip_hidden: bool,
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
    cancellation: CancellationToken,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let filter = ImageFilter::new().with_skip_hidden(config.skip_hidden);
        Self {
            config,
            filter,
            cancellation: CancellationToken::new(),
        }
    }

    /// Stop walking once this token is cancelled.
    ///
    /// A cancelled scan returns the photos found so far; the caller decides
    /// what to do with the partial list.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Make sure the root exists, is a directory, and can be listed.
    ///
    /// These are the only scan failures that abort a run.
    fn check_root(root: &Path) -> Result<(), ScanError> {
        let metadata = fs::metadata(root).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            },
            ErrorKind::PermissionDenied => ScanError::PermissionDenied {
                path: root.to_path_buf(),
            },
            _ => ScanError::ReadDirectory {
                path: root.to_path_buf(),
                source: e,
            },
        })?;

        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        fs::read_dir(root).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => ScanError::PermissionDenied {
                path: root.to_path_buf(),
            },
            _ => ScanError::ReadDirectory {
                path: root.to_path_buf(),
                source: e,
            },
        })?;

        Ok(())
    }
}

impl PhotoScanner for WalkDirScanner {
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        self.scan_with_events(root, &crate::events::null_sender())
    }

    fn scan_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        Self::check_root(root)?;

        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut photos = Vec::new();
        let mut errors = Vec::new();

        let skip_hidden = self.config.skip_hidden;
        let entries = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !skip_hidden || e.depth() == 0 || !is_hidden(e.path()));

        for entry_result in entries {
            if self.cancellation.is_cancelled() {
                debug!(found = photos.len(), "scan cancelled");
                break;
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();

                    let error = if e.io_error().map(|e| e.kind())
                        == Some(ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };

                    debug!(path = %path.display(), "skipping unreadable entry");
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    errors.push(error);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.filter.should_include(path) {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => {
                    events.send(Event::Scan(ScanEvent::PhotoFound {
                        path: path.to_path_buf(),
                    }));
                    photos.push(PhotoFile {
                        path: path.to_path_buf(),
                        size: metadata.len(),
                    });
                }
                Err(e) => {
                    let error = ScanError::ReadDirectory {
                        path: path.to_path_buf(),
                        source: std::io::Error::other(e.to_string()),
                    };
                    events.send(Event::Scan(ScanEvent::Error {
                        path: path.to_path_buf(),
                        message: error.to_string(),
                    }));
                    errors.push(error);
                }
            }
        }

        events.send(Event::Scan(ScanEvent::Completed {
            total_photos: photos.len(),
        }));

        Ok(ScanResult { photos, errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_photo(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        path
    }

    #[test]
    fn scan_empty_directory_returns_empty_vec() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = WalkDirScanner::new(ScanConfig::default());

        let result = scanner.scan(temp_dir.path()).unwrap();

        assert!(result.photos.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn scan_records_file_sizes() {
        let temp_dir = TempDir::new().unwrap();
        create_test_photo(temp_dir.path(), "photo.jpg");

        let scanner = WalkDirScanner::new(ScanConfig::default());
        let result = scanner.scan(temp_dir.path()).unwrap();

        assert_eq!(result.photos.len(), 1);
        assert!(result.photos[0].path.ends_with("photo.jpg"));
        assert_eq!(result.photos[0].size, 4);
    }

    #[test]
    fn scan_excludes_non_image_files() {
        let temp_dir = TempDir::new().unwrap();
        create_test_photo(temp_dir.path(), "photo.jpg");
        File::create(temp_dir.path().join("document.txt")).unwrap();
        File::create(temp_dir.path().join("clip.heic")).unwrap();

        let scanner = WalkDirScanner::new(ScanConfig::default());
        let result = scanner.scan(temp_dir.path()).unwrap();

        assert_eq!(result.photos.len(), 1);
        assert!(result.photos[0].path.ends_with("photo.jpg"));
    }

    #[test]
    fn scan_traverses_nested_directories_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        let subdir = temp_dir.path().join("b_sub");
        fs::create_dir(&subdir).unwrap();

        create_test_photo(temp_dir.path(), "c.png");
        create_test_photo(temp_dir.path(), "a.jpg");
        create_test_photo(&subdir, "nested.gif");

        let scanner = WalkDirScanner::new(ScanConfig::default());
        let result = scanner.scan(temp_dir.path()).unwrap();

        let names: Vec<_> = result
            .photos
            .iter()
            .map(|p| p.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "nested.gif", "c.png"]);
    }

    #[test]
    fn scan_includes_hidden_files_and_directories_by_default() {
        let temp_dir = TempDir::new().unwrap();
        create_test_photo(temp_dir.path(), "a.png");
        let backup = temp_dir.path().join(".backup");
        fs::create_dir(&backup).unwrap();
        create_test_photo(&backup, "a.png");
        create_test_photo(temp_dir.path(), ".hidden.jpg");

        let scanner = WalkDirScanner::new(ScanConfig::default());
        let result = scanner.scan(temp_dir.path()).unwrap();

        assert_eq!(result.photos.len(), 3);
        assert!(result.photos.iter().any(|p| p.path == backup.join("a.png")));
    }

    #[test]
    fn scan_can_skip_hidden_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        create_test_photo(temp_dir.path(), "visible.jpg");
        create_test_photo(temp_dir.path(), ".hidden.jpg");
        let hidden_dir = temp_dir.path().join(".thumbnails");
        fs::create_dir(&hidden_dir).unwrap();
        create_test_photo(&hidden_dir, "thumb.jpg");

        let scanner = WalkDirScanner::new(ScanConfig { skip_hidden: true });
        let result = scanner.scan(temp_dir.path()).unwrap();

        assert_eq!(result.photos.len(), 1);
        assert!(result.photos[0].path.ends_with("visible.jpg"));
    }

    #[test]
    fn cancelled_scan_stops_walking() {
        let temp_dir = TempDir::new().unwrap();
        create_test_photo(temp_dir.path(), "a.jpg");
        create_test_photo(temp_dir.path(), "b.jpg");
        let token = CancellationToken::new();
        token.cancel();

        let scanner = WalkDirScanner::new(ScanConfig::default()).with_cancellation(token);
        let result = scanner.scan(temp_dir.path()).unwrap();

        assert!(result.photos.is_empty());
    }

    #[test]
    fn scan_nonexistent_directory_is_fatal() {
        let scanner = WalkDirScanner::new(ScanConfig::default());
        let result = scanner.scan(Path::new("/nonexistent/path/12345"));

        assert!(matches!(result, Err(ScanError::DirectoryNotFound { .. })));
    }

    #[test]
    fn scan_of_a_file_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let photo = create_test_photo(temp_dir.path(), "photo.jpg");

        let scanner = WalkDirScanner::new(ScanConfig::default());
        let result = scanner.scan(&photo);

        assert!(matches!(result, Err(ScanError::NotADirectory { .. })));
    }
}
