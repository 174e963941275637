//! Copy built library artifacts into the site's asset directory.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use sitesync_shared::{Result, SiteSyncError, SyncedArtifact};

/// Copy every regular file directly inside `src` into `dest`.
///
/// Existing files are overwritten. Each file is written to a temp name and
/// renamed into place. Files are processed in file-name order.
#[instrument(skip_all, fields(src = %src.display(), dest = %dest.display()))]
pub async fn sync_artifacts(src: &Path, dest: &Path) -> Result<Vec<SyncedArtifact>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(src)
        .await
        .map_err(|e| SiteSyncError::io(src, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SiteSyncError::io(src, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| SiteSyncError::io(entry.path(), e))?;
        if file_type.is_file() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();

    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|e| SiteSyncError::io(dest, e))?;

    let mut synced = Vec::with_capacity(names.len());

    for filename in names {
        let source = src.join(&filename);
        let data = tokio::fs::read(&source)
            .await
            .map_err(|e| SiteSyncError::io(&source, e))?;

        let target = dest.join(&filename);
        let temp = dest.join(format!(".{filename}.tmp"));

        tokio::fs::write(&temp, &data)
            .await
            .map_err(|e| SiteSyncError::io(&temp, e))?;
        tokio::fs::rename(&temp, &target)
            .await
            .map_err(|e| SiteSyncError::io(&target, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&data);
        let hash = format!("{:x}", hasher.finalize());

        debug!(file = %filename, size = data.len(), "copied artifact");

        synced.push(SyncedArtifact {
            filename,
            sha256: hash,
            size_bytes: data.len(),
        });
    }

    info!(count = synced.len(), "artifact sync complete");

    Ok(synced)
}
