//! Where artifacts land on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::BUNDLER_DEFAULTS;
use crate::error::BundleError;

/// `chapter_03.txt`
pub fn chapter_file_name(number: u32) -> String {
    format!("{}{:02}.{}", BUNDLER_DEFAULTS.chapter_file_prefix, number, BUNDLER_DEFAULTS.text_extension)
}

/// `combined_03.txt`
pub fn bundle_file_name(label: &str) -> String {
    format!("{}{}.{}", BUNDLER_DEFAULTS.bundle_file_prefix, label, BUNDLER_DEFAULTS.text_extension)
}

/// Output-path provider handed to the pipeline.
pub trait OutputLayout: Sync {
    fn chapters_dir(&self) -> PathBuf;
    fn bundles_dir(&self) -> PathBuf;

    fn chapter_path(&self, number: u32) -> PathBuf { self.chapters_dir().join(chapter_file_name(number)) }
    fn bundle_path(&self, label: &str) -> PathBuf { self.bundles_dir().join(bundle_file_name(label)) }
    fn index_path(&self) -> PathBuf { self.bundles_dir().join(BUNDLER_DEFAULTS.index_file_name) }
    fn instructions_path(&self) -> PathBuf { self.bundles_dir().join(BUNDLER_DEFAULTS.instructions_file_name) }
    fn manifest_path(&self) -> PathBuf { self.bundles_dir().join(BUNDLER_DEFAULTS.manifest_file_name) }
}

/// `<root>/text`, `<root>/chapters`, `<root>/combined`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    pub fn pages_dir(&self) -> PathBuf { self.root.join(BUNDLER_DEFAULTS.pages_dir_name) }

    /// Create `<base>/<name>`, or `<name> (1)`, `<name> (2)` … when taken,
    /// together with its subdirectories.
    pub fn create_unique(base: &Path, name: &str) -> Result<Self, BundleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BundleError::invalid("project name must not be empty"));
        }
        fs::create_dir_all(base).map_err(|e| BundleError::io("create project base", base, e))?;
        let mut suffix = 0u32;
        loop {
            let candidate = if suffix == 0 { base.join(name) } else { base.join(format!("{name} ({suffix})")) };
            match fs::create_dir(&candidate) {
                Ok(()) => {
                    let layout = Self::new(candidate);
                    layout.ensure_dirs()?;
                    info!(root = %layout.root.display(), "created project directory");
                    return Ok(layout);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(BundleError::io("create project directory", &candidate, e)),
            }
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), BundleError> {
        for dir in [self.pages_dir(), self.chapters_dir(), self.bundles_dir()] {
            fs::create_dir_all(&dir).map_err(|e| BundleError::io("create project subdirectory", &dir, e))?;
        }
        Ok(())
    }
}

impl OutputLayout for ProjectLayout {
    fn chapters_dir(&self) -> PathBuf { self.root.join(BUNDLER_DEFAULTS.chapters_dir_name) }
    fn bundles_dir(&self) -> PathBuf { self.root.join(BUNDLER_DEFAULTS.bundles_dir_name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(chapter_file_name(0), "chapter_00.txt");
        assert_eq!(chapter_file_name(12), "chapter_12.txt");
        assert_eq!(bundle_file_name("03"), "combined_03.txt");
    }

    #[test]
    fn default_paths_hang_off_the_root() {
        let layout = ProjectLayout::new("/books/x");
        assert_eq!(layout.chapter_path(2), Path::new("/books/x/chapters/chapter_02.txt"));
        assert_eq!(layout.bundle_path("01"), Path::new("/books/x/combined/combined_01.txt"));
        assert_eq!(layout.index_path(), Path::new("/books/x/combined/index.txt"));
        assert_eq!(layout.manifest_path(), Path::new("/books/x/combined/manifest.json"));
        assert_eq!(layout.pages_dir(), Path::new("/books/x/text"));
    }

    #[test]
    fn unique_projects_get_numbered_suffixes() {
        let tmp = tempfile::tempdir().unwrap();
        let a = ProjectLayout::create_unique(tmp.path(), "Book").unwrap();
        let b = ProjectLayout::create_unique(tmp.path(), "Book").unwrap();
        let c = ProjectLayout::create_unique(tmp.path(), "Book").unwrap();
        assert_eq!(a.root(), tmp.path().join("Book"));
        assert_eq!(b.root(), tmp.path().join("Book (1)"));
        assert_eq!(c.root(), tmp.path().join("Book (2)"));
        assert!(c.chapters_dir().is_dir());
        assert!(c.bundles_dir().is_dir());
        assert!(c.pages_dir().is_dir());
    }

    #[test]
    fn blank_project_name_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(ProjectLayout::create_unique(tmp.path(), "  "), Err(BundleError::InvalidInput(_))));
    }
}
