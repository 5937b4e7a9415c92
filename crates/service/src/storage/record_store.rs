use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::{debug, info};

use crate::errors::PersistenceError;

/// An authorized user and the bearer token that lets the bot add them to a guild.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub access_token: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    users: Vec<UserRecord>,
}

/// Append-only list of [`UserRecord`]s persisted as one JSON document.
///
/// The whole list is rewritten after every append. Writes go to a sibling
/// `.tmp` file first and are renamed into place, and the lock is held across
/// mutate + persist so concurrent appends are totally ordered on disk.
pub struct RecordStore {
    inner: Mutex<Vec<UserRecord>>,
    file_path: PathBuf,
}

impl RecordStore {
    /// Load the store from `path`. A missing file yields an empty store; a
    /// file that is not a valid record document is an error.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, PersistenceError> {
        let file_path = path.into();
        common::env::ensure_parent_dir(&file_path)
            .await
            .map_err(|source| PersistenceError::Io { path: file_path.clone(), source })?;

        let users = match fs::read(&file_path).await {
            Ok(bytes) => {
                let file: StoreFile = serde_json::from_slice(&bytes)
                    .map_err(|source| PersistenceError::Malformed { path: file_path.clone(), source })?;
                file.users
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %file_path.display(), "record file absent, starting empty");
                Vec::new()
            }
            Err(source) => return Err(PersistenceError::Io { path: file_path, source }),
        };

        info!(path = %file_path.display(), users = users.len(), "record store loaded");
        Ok(Arc::new(Self { inner: Mutex::new(users), file_path }))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Append a record and persist the full list.
    ///
    /// On a write failure the record stays in memory; the next successful
    /// append writes it out.
    pub async fn append(&self, record: UserRecord) -> Result<(), PersistenceError> {
        let mut users = self.inner.lock().await;
        users.push(record);
        self.persist(&users).await
    }

    /// First `min(n, len)` records in insertion order.
    pub async fn read_prefix(&self, n: usize) -> Vec<UserRecord> {
        let users = self.inner.lock().await;
        users.iter().take(n).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    async fn persist(&self, users: &[UserRecord]) -> Result<(), PersistenceError> {
        #[derive(Serialize)]
        struct StoreFileRef<'a> {
            users: &'a [UserRecord],
        }

        let data = serde_json::to_vec_pretty(&StoreFileRef { users }).map_err(PersistenceError::Serialize)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, data)
            .await
            .map_err(|source| PersistenceError::Io { path: tmp.clone(), source })?;
        fs::rename(&tmp, &self.file_path)
            .await
            .map_err(|source| PersistenceError::Io { path: self.file_path.clone(), source })?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("record_store_{tag}_{}", uuid::Uuid::new_v4()))
            .join("db.json")
    }

    fn rec(id: &str) -> UserRecord {
        UserRecord { id: id.to_string(), access_token: format!("tok-{id}") }
    }

    async fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir).await;
        }
    }

    #[tokio::test]
    async fn absent_file_starts_empty() -> Result<(), anyhow::Error> {
        let path = tmp_file("absent");
        let store = RecordStore::open(&path).await?;
        assert_eq!(store.len().await, 0);
        assert!(store.is_empty().await);
        assert!(store.read_prefix(10).await.is_empty());
        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn read_prefix_returns_min_of_n_and_size_in_order() -> Result<(), anyhow::Error> {
        let path = tmp_file("prefix");
        let store = RecordStore::open(&path).await?;
        for id in ["a", "b", "c", "d", "e"] {
            store.append(rec(id)).await?;
        }

        assert!(store.read_prefix(0).await.is_empty());
        let three: Vec<_> = store.read_prefix(3).await.into_iter().map(|r| r.id).collect();
        assert_eq!(three, ["a", "b", "c"]);
        assert_eq!(store.read_prefix(5).await.len(), 5);
        assert_eq!(store.read_prefix(50).await.len(), 5);

        // no intervening append: identical results
        assert_eq!(store.read_prefix(4).await, store.read_prefix(4).await);
        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_ids_are_kept() -> Result<(), anyhow::Error> {
        let path = tmp_file("dup");
        let store = RecordStore::open(&path).await?;
        store.append(rec("42")).await?;
        store.append(UserRecord { id: "42".into(), access_token: "newer".into() }).await?;
        let all = store.read_prefix(10).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].access_token, "newer");
        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn reload_yields_same_collection_and_bytes() -> Result<(), anyhow::Error> {
        let path = tmp_file("reload");
        let store = RecordStore::open(&path).await?;
        store.append(rec("1")).await?;
        store.append(rec("2")).await?;
        let before = fs::read(&path).await?;
        let records = store.read_prefix(10).await;

        let reloaded = RecordStore::open(&path).await?;
        assert_eq!(reloaded.read_prefix(10).await, records);

        // persisting the reloaded collection reproduces the file byte-for-byte
        reloaded.persist(&records).await?;
        assert_eq!(fs::read(&path).await?, before);

        let doc: serde_json::Value = serde_json::from_slice(&before)?;
        assert_eq!(doc["users"][0]["id"], "1");
        assert_eq!(doc["users"][1]["access_token"], "tok-2");
        assert!(fs::metadata(store.tmp_path()).await.is_err());
        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupted_file_fails_fast() -> Result<(), anyhow::Error> {
        let path = tmp_file("corrupt");
        common::env::ensure_parent_dir(&path).await?;
        fs::write(&path, b"{\"users\": [ not json").await?;
        match RecordStore::open(&path).await {
            Err(PersistenceError::Malformed { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("corrupted file must not load"),
        }
        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn write_failure_keeps_in_memory_record() -> Result<(), anyhow::Error> {
        let path = tmp_file("wfail");
        let store = RecordStore::open(&path).await?;
        store.append(rec("ok")).await?;

        // swap the data directory for a plain file so the next write cannot land
        let dir = path.parent().unwrap().to_path_buf();
        fs::remove_dir_all(&dir).await?;
        fs::write(&dir, b"").await?;

        let err = store.append(rec("lost")).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
        assert_eq!(store.len().await, 2);

        let _ = fs::remove_file(&dir).await;
        Ok(())
    }
}
