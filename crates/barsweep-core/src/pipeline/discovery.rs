//! File discovery for finding images to scan.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;

/// Discovers image files in directories.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Discover all supported image files at a path.
    ///
    /// If path is a file, returns it if its extension is supported.
    /// If path is a directory, recursively finds all supported files, sorted
    /// by path. That order is the discovery order used for reporting.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            if self.is_supported(path) {
                let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                return vec![DiscoveredFile {
                    path: path.to_path_buf(),
                    size,
                }];
            }
            return vec![];
        }

        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file() && self.is_supported(entry.path()))
            .map(|entry| DiscoveredFile {
                size: entry.metadata().map(|m| m.len()).unwrap_or(0),
                path: entry.into_path(),
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());

        assert!(discovery.is_supported(Path::new("scan.jpg")));
        assert!(discovery.is_supported(Path::new("scan.JPG")));
        assert!(discovery.is_supported(Path::new("scan.jpeg")));
        assert!(!discovery.is_supported(Path::new("scan.png")));
        assert!(!discovery.is_supported(Path::new("scan")));
        assert!(!discovery.is_supported(Path::new("notes.txt")));
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("c.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"xy").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("b.JPEG"), b"x").unwrap();

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let files = discovery.discover(dir.path());

        let names: Vec<PathBuf> = files
            .iter()
            .map(|f| f.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("c.jpg"),
                PathBuf::from("nested").join("b.JPEG"),
            ]
        );
        assert_eq!(files[0].size, 2);
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.jpg");
        std::fs::write(&path, b"abc").unwrap();

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let files = discovery.discover(&path);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 3);

        let other = dir.path().join("one.png");
        std::fs::write(&other, b"abc").unwrap();
        assert!(discovery.discover(&other).is_empty());
    }
}
