//! Where indexed documents come from.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tracing::debug;

use crate::error::{IndexingError, Result};

/// Input of an indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexingSource {
    /// Remote pages fetched before conversion.
    Remote(Vec<String>),
    /// A local directory scanned for files.
    Local(PathBuf),
}

impl IndexingSource {
    /// Remote source from a list of URLs.
    pub fn remote<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Remote(urls.into_iter().map(Into::into).collect())
    }

    /// Local source rooted at a directory.
    pub fn local<P: Into<PathBuf>>(path: P) -> Self {
        Self::Local(path.into())
    }
}

/// Collects the files an indexing run converts.
///
/// ```rust,no_run
/// use pragmatic_indexing::sources::FileDiscovery;
///
/// # async fn example() -> pragmatic_indexing::error::Result<()> {
/// let files = FileDiscovery::new()
///     .recursive(true)
///     .formats(Some(vec!["md".to_string(), "txt".to_string()]))
///     .discover("./docs")
///     .await?;
/// println!("Found {} files", files.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileDiscovery {
    recursive: bool,
    formats: Option<Vec<String>>,
}

impl FileDiscovery {
    /// Non-recursive discovery of every file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk subdirectories as well.
    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Keep only these extensions; `None` or a `*` entry keeps every file.
    #[must_use]
    pub fn formats(mut self, formats: Option<Vec<String>>) -> Self {
        self.formats = formats.filter(|formats| !formats.iter().any(|f| f == "*"));
        self
    }

    /// Absolute paths of matching regular files, sorted.
    pub async fn discover<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = std::path::absolute(dir.as_ref())?;
        if !fs::metadata(&dir).await?.is_dir() {
            return Err(IndexingError::NotADirectory {
                path: dir.display().to_string(),
            });
        }

        let mut files = Vec::new();
        self.walk(&dir, &mut files).await?;
        files.sort();
        debug!("Discovered {} files under {}", files.len(), dir.display());
        Ok(files)
    }

    fn walk<'a>(
        &'a self,
        dir: &'a Path,
        files: &'a mut Vec<PathBuf>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_file() {
                    if self.matches(&path) {
                        files.push(path);
                    }
                } else if file_type.is_dir() && self.recursive {
                    self.walk(&path, files).await?;
                }
            }
            Ok(())
        })
    }

    fn matches(&self, path: &Path) -> bool {
        let Some(formats) = &self.formats else {
            return true;
        };
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| formats.iter().any(|f| f == ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b.md"), "# b").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.json"), "{}").unwrap();
        dir
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_recursive_discovery_filters_formats() {
        let dir = fixture();
        let files = FileDiscovery::new()
            .recursive(true)
            .formats(Some(vec!["json".to_string()]))
            .discover(dir.path())
            .await
            .unwrap();
        assert_eq!(names(&files), vec!["a.json", "c.json"]);
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[tokio::test]
    async fn test_flat_discovery_keeps_every_file() {
        let dir = fixture();
        let files = FileDiscovery::new()
            .formats(Some(vec!["*".to_string()]))
            .discover(dir.path())
            .await
            .unwrap();
        assert_eq!(names(&files), vec!["a.json", "b.md"]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_io_error() {
        let dir = fixture();
        let err = FileDiscovery::new()
            .discover(dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexingError::Io(_)));
    }
}
