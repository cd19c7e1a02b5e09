use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use santa_core::AssignmentDocument;
use tracing::warn;
use uuid::Uuid;

use super::{DocumentStore, StoreError};

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    async fn ensure_parent(&self) -> Result<(), StoreError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(parent, e)),
            _ => Ok(()),
        }
    }

    async fn write_sibling(&self, document: &AssignmentDocument) -> Result<PathBuf, StoreError> {
        let json = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(&tmp, e))?;
        Ok(tmp)
    }

    // Rename over the target so readers never see a torn file.
    async fn replace_with(&self, tmp: &Path) -> Result<(), StoreError> {
        tokio::fs::rename(tmp, &self.path)
            .await
            .map_err(|e| self.io_error(&self.path, e))
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self) -> Result<Option<AssignmentDocument>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(&self.path, err)),
        }
    }

    async fn create_if_absent(&self, document: &AssignmentDocument) -> Result<bool, StoreError> {
        self.ensure_parent().await?;
        let tmp = self.write_sibling(document).await?;

        // A hard link never replaces an existing target, so the file appears complete or not at all.
        let created = match tokio::fs::hard_link(&tmp, &self.path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => match self.fetch().await {
                Ok(Some(_)) => Ok(false),
                Ok(None) | Err(StoreError::Json(_)) => {
                    warn!(
                        path = %self.path.display(),
                        "document file is empty or unreadable, seeding over it"
                    );
                    self.replace_with(&tmp).await.map(|()| true)
                }
                Err(err) => Err(err),
            },
            Err(err) => Err(self.io_error(&self.path, err)),
        };
        let _ = tokio::fs::remove_file(&tmp).await;
        created
    }

    async fn save(&self, document: &AssignmentDocument) -> Result<(), StoreError> {
        self.ensure_parent().await?;
        let tmp = self.write_sibling(document).await?;
        let replaced = self.replace_with(&tmp).await;
        if replaced.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InitOutcome;
    use santa_core::{is_derangement, GiftLimit};

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("santa_store_{}.json", Uuid::new_v4()))
    }

    fn participants() -> Vec<String> {
        ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn missing_file_loads_default_document() {
        let store = FileStore::new(temp_path());
        assert!(store.fetch().await.unwrap().is_none());
        assert_eq!(store.load().await, AssignmentDocument::default());
    }

    #[tokio::test]
    async fn initialize_creates_once() {
        let path = temp_path();
        let store = FileStore::new(path.clone());

        let outcome = store
            .initialize(&participants(), GiftLimit::default())
            .await
            .unwrap();
        assert_eq!(outcome, InitOutcome::Created);
        let first = store.load().await;
        assert!(is_derangement(&participants(), &first.assignments));
        assert_eq!(first.gift_limit, GiftLimit::from(30));

        let outcome = store
            .initialize(&participants(), GiftLimit::from("999"))
            .await
            .unwrap();
        assert_eq!(outcome, InitOutcome::Existing);
        assert_eq!(store.load().await, first);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn save_of_load_is_idempotent() {
        let path = temp_path();
        let store = FileStore::new(path.clone());
        store
            .initialize(&participants(), GiftLimit::default())
            .await
            .unwrap();

        let loaded = store.load().await;
        store.save(&loaded).await.unwrap();
        assert_eq!(store.load().await, loaded);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn save_replaces_whole_document() {
        let path = temp_path();
        let store = FileStore::new(path.clone());
        store
            .initialize(&participants(), GiftLimit::default())
            .await
            .unwrap();

        let replacement = AssignmentDocument {
            assignments: [("X", "Y"), ("Y", "X")]
                .into_iter()
                .map(|(g, r)| (g.to_string(), r.to_string()))
                .collect(),
            gift_limit: GiftLimit::from("50"),
        };
        store.save(&replacement).await.unwrap();
        assert_eq!(store.load().await, replacement);

        let raw: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(raw["giftLimit"], "50");
        assert_eq!(raw["assignments"]["X"], "Y");

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn corrupt_file_degrades_to_default_on_load() {
        let path = temp_path();
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        let store = FileStore::new(path.clone());

        assert!(matches!(store.fetch().await, Err(StoreError::Json(_))));
        assert_eq!(store.load().await, AssignmentDocument::default());

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn empty_or_truncated_file_is_seeded_over() {
        for leftover in [&b""[..], &b"{\n  \"assignments\": {\n    \"A\": "[..]] {
            let path = temp_path();
            tokio::fs::write(&path, leftover).await.unwrap();
            let store = FileStore::new(path.clone());

            let outcome = store
                .initialize(&participants(), GiftLimit::default())
                .await
                .unwrap();
            assert_eq!(outcome, InitOutcome::Created);
            let document = store.fetch().await.unwrap().unwrap();
            assert!(is_derangement(&participants(), &document.assignments));
            assert_eq!(document.gift_limit, GiftLimit::from(30));

            let _ = tokio::fs::remove_file(&path).await;
        }
    }

    #[tokio::test]
    async fn initialize_leaves_no_temp_files_behind() {
        let dir = std::env::temp_dir().join(format!("santa_dir_{}", Uuid::new_v4()));
        let store = FileStore::new(dir.join("database.json"));
        for _ in 0..2 {
            store
                .initialize(&participants(), GiftLimit::default())
                .await
                .unwrap();
        }

        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec![std::ffi::OsString::from("database.json")]);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = std::env::temp_dir().join(format!("santa_dir_{}", Uuid::new_v4()));
        let store = FileStore::new(dir.join("nested").join("database.json"));
        store
            .initialize(&participants(), GiftLimit::default())
            .await
            .unwrap();
        assert!(store.fetch().await.unwrap().is_some());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
