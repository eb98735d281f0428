use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{ItemId, ScanState};
use crate::repositories::{ScanStateStore, StoreError};

/// One JSON document per content item below a state directory.
///
/// Writes go to a temporary file that is renamed over the old record, so a
/// record is replaced atomically.
#[derive(Debug, Clone)]
pub struct FileScanStore {
    dir: PathBuf,
}

impl FileScanStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &ItemId) -> PathBuf {
        // Hex-encode the id so any host identifier maps to a safe file name.
        let name: String = id
            .as_str()
            .bytes()
            .map(|b| format!("{b:02x}"))
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl ScanStateStore for FileScanStore {
    async fn get(&self, id: &ItemId) -> Result<ScanState, StoreError> {
        let raw = match tokio::fs::read(self.path_for(id)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ScanState::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
            id: id.clone(),
            reason: e.to_string(),
        })
    }

    async fn put(&self, id: &ItemId, state: &ScanState) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(state).map_err(|e| StoreError::Corrupt {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        let path = self.path_for(id);
        write_replacing(&self.dir, &path, &body).await?;
        debug!(id = %id, path = %path.display(), "scan state written");
        Ok(())
    }

    async fn clear(&self, id: &ItemId) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes `body` to a temporary file in `dir` and renames it onto `path`.
/// The temporary file is removed when the rename fails.
pub(crate) async fn write_replacing(
    dir: &Path,
    path: &Path,
    body: &[u8],
) -> std::io::Result<()> {
    let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));
    tokio::fs::write(&tmp, body).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
