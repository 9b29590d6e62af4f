//! Failure ledger: URLs that could not be fetched in a run
//!
//! The ledger is written once at the end of a run, one URL per line, using a
//! temporary file and a rename so an interrupted write never leaves a
//! truncated list behind. A run that ends with no failures removes the ledger
//! of an earlier run. It is never read back automatically.

use std::path::{Path, PathBuf};

use std::io::ErrorKind;

use tracing::info;

use crate::errors::Result;

/// Ordered list of unrecoverable URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureLedger {
    urls: Vec<String>,
}

impl FailureLedger {
    /// Create a ledger from URLs in the order they should be written
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    /// Ledger contents as written to disk
    pub fn render(&self) -> String {
        let mut content = self.urls.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        content
    }

    /// Write the ledger to `path`
    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        tokio::fs::write(&temp_path, self.render()).await?;
        tokio::fs::rename(&temp_path, path).await?;

        info!(
            "Wrote {} unrecoverable URLs to {}",
            self.urls.len(),
            path.display()
        );
        Ok(())
    }

    /// Remove a ledger left at `path` by an earlier run
    pub async fn clear(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!("Removed stale failure ledger {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ledger_writes_one_url_per_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("failed_urls.txt");
        let ledger = FailureLedger::new(vec![
            "https://data.example/b.jsonl".to_string(),
            "https://data.example/a.jsonl".to_string(),
        ]);

        ledger.write(&path).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            content,
            "https://data.example/b.jsonl\nhttps://data.example/a.jsonl\n"
        );
        assert!(!temp_dir.path().join("logs").join("failed_urls.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_clear_removes_stale_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("failed_urls.txt");

        FailureLedger::clear(&path).await.unwrap();

        FailureLedger::new(vec!["https://data.example/a.jsonl".to_string()])
            .write(&path)
            .await
            .unwrap();
        FailureLedger::clear(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_ledger_renders_nothing() {
        let ledger = FailureLedger::default();
        assert_eq!(ledger.render(), "");
    }
}
