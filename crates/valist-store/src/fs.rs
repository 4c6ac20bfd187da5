use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use valist_types::Cid;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// Filesystem-backed content store: one file per blob, named by digest.
///
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so a reader never observes a partially written blob. Reads verify
/// the bytes against their CID.
#[derive(Clone, Debug)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory holding the blobs.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, cid: &Cid) -> PathBuf {
        self.root.join(hex::encode(cid.digest()))
    }
}

fn write_atomically(root: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(root)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, data: &[u8]) -> StoreResult<Cid> {
        let cid = Cid::for_content(data);
        let path = self.blob_path(&cid);
        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
        {
            return Ok(cid);
        }

        let root = self.root.clone();
        let bytes = data.to_vec();
        tokio::task::spawn_blocking(move || write_atomically(&root, &path, &bytes))
            .await
            .map_err(|e| StoreError::Unavailable(format!("blob writer task failed: {e}")))?
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        debug!(cid = %cid.short_hex(), len = data.len(), "blob stored");
        Ok(cid)
    }

    async fn get(&self, cid: &Cid) -> StoreResult<Vec<u8>> {
        let data = match tokio::fs::read(self.blob_path(cid)).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(*cid));
            }
            Err(e) => return Err(StoreError::Unavailable(e.to_string())),
        };

        let computed = Cid::for_content(&data);
        if computed != *cid {
            return Err(StoreError::HashMismatch {
                cid: *cid,
                computed,
            });
        }
        Ok(data)
    }

    async fn exists(&self, cid: &Cid) -> StoreResult<bool> {
        Ok(tokio::fs::try_exists(self.blob_path(cid)).await?)
    }
}
