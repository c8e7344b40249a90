//! Local filesystem ledger store.
//!
//! Each ledger lives in `{root}/{prefix}{key}.json` as a pretty-printed JSON
//! array, most recently discovered notice first. Writes go to a temp file
//! that is then renamed over the target.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Notice, StorageConfig};
use crate::storage::LedgerStore;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    file_prefix: String,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_prefix(root_dir, "sent_links_")
    }

    /// Create a LocalStorage with a custom file name prefix.
    pub fn with_prefix(root_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::with_prefix(&config.dir, &config.file_prefix)
    }

    pub fn root_dir(&self) -> &PathBuf {
        &self.root_dir
    }

    /// Get the file path for a ledger key.
    fn path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(AppError::validation(format!("invalid ledger key '{key}'")));
        }
        Ok(self.root_dir.join(format!("{}{}.json", self.file_prefix, key)))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &PathBuf, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &PathBuf) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl LedgerStore for LocalStorage {
    async fn load(&self, key: &str) -> Result<Option<Vec<Notice>>> {
        let path = self.path(key)?;
        match self.read_bytes(&path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, entries: &[Notice]) -> Result<()> {
        let path = self.path(key)?;
        let bytes = serde_json::to_vec_pretty(entries)?;
        self.write_bytes(&path, &bytes).await?;
        log::debug!("Saved {} ledger entries to {}", entries.len(), path.display());
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(key) = name
                .strip_prefix(self.file_prefix.as_str())
                .and_then(|rest| rest.strip_suffix(".json"))
            {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};
    use tempfile::TempDir;

    fn notice(id: u32) -> Notice {
        Notice {
            title: format!("第{id}号工程招标公告"),
            link: format!("https://www.gsei.com.cn/html/1336/2026-10-19/content-{id}.html"),
            publish_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            discovered_at: DateTime::parse_from_rfc3339("2026-10-19T09:00:00+08:00").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let entries = vec![notice(2), notice(1)];
        storage.save("2026-10-19", &entries).await.unwrap();

        assert!(tmp.path().join("sent_links_2026-10-19.json").exists());
        let loaded = storage.load("2026-10-19").await.unwrap().unwrap();
        assert_eq!(loaded, entries);
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.load("2026-10-19").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        std::fs::write(tmp.path().join("sent_links_2026-10-19.json"), b"{not json").unwrap();

        assert!(matches!(
            storage.load("2026-10-19").await,
            Err(AppError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_file_holds_field_names() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.save("2026-10-19", &[notice(1)]).await.unwrap();

        let raw = std::fs::read_to_string(tmp.path().join("sent_links_2026-10-19.json")).unwrap();
        for field in ["\"title\"", "\"link\"", "\"publish_date\"", "\"discovered_at\""] {
            assert!(raw.contains(field), "missing {field}");
        }
        assert!(raw.contains("第1号工程招标公告"));
    }

    #[tokio::test]
    async fn test_keys_and_remove() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.save("2026-10-19", &[]).await.unwrap();
        storage.save("2026-10-17", &[]).await.unwrap();
        std::fs::write(tmp.path().join("config.toml"), b"").unwrap();

        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["2026-10-17".to_string(), "2026-10-19".to_string()]
        );

        storage.remove("2026-10-17").await.unwrap();
        storage.remove("2026-10-17").await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["2026-10-19".to_string()]);
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert!(storage.save("../escape", &[]).await.is_err());
        assert!(storage.load("a/b").await.is_err());
    }

    #[tokio::test]
    async fn test_keys_of_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("missing"));
        assert!(storage.keys().await.unwrap().is_empty());
    }
}
