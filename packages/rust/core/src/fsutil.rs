//! Filesystem helpers shared by the site tasks.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use sitesync_shared::{Result, SiteSyncError};

/// Collect every regular file under `dir`, recursively, in file-name order.
///
/// Hidden files and directories are skipped. A missing `dir` is an I/O error.
pub(crate) async fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let root = dir.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        let walker = walkdir::WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root.as_path()).to_path_buf();
                SiteSyncError::io(path, e.into())
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    })
    .await
    .map_err(|e| SiteSyncError::Panic(e.to_string()))?
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Regular files directly inside `dir` with extension `ext`, in file-name order.
///
/// Hidden files are ignored and a missing `dir` yields no files.
pub(crate) async fn list_files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SiteSyncError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SiteSyncError::io(dir, e))?
    {
        let path = entry.path();
        let hidden = is_hidden(&entry.file_name());
        let matches = path.extension() == Some(OsStr::new(ext));
        if hidden || !matches {
            continue;
        }
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| SiteSyncError::io(&path, e))?;
        if file_type.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Write `contents` to `path`, creating parent directories.
pub(crate) async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SiteSyncError::io(parent, e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| SiteSyncError::io(path, e))
}

/// Read a UTF-8 text file.
pub(crate) async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SiteSyncError::io(path, e))
}

/// `path` with `suffix` appended to its file name (`a.js` → `a.js.md`).
pub(crate) fn with_appended_extension(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// `path` relative to `base`, joined with `/` regardless of platform.
pub(crate) fn relative_url(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appended_extension_keeps_original() {
        let p = with_appended_extension(Path::new("/site/examples/basic_usage.js"), ".md");
        assert_eq!(p, Path::new("/site/examples/basic_usage.js.md"));
    }

    #[test]
    fn relative_url_uses_forward_slashes() {
        let base = Path::new("/site/examples");
        let file = base.join("browser").join("basic.html.html");
        assert_eq!(relative_url(base, &file), "browser/basic.html.html");
    }

    #[tokio::test]
    async fn list_missing_directory_is_empty() {
        let dir = std::env::temp_dir().join(format!("sitesync-fs-{}", uuid::Uuid::now_v7()));
        assert!(list_files_with_extension(&dir, "js").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collect_skips_hidden_entries() {
        let dir = std::env::temp_dir().join(format!("sitesync-fs-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(dir.join("browser")).unwrap();
        std::fs::create_dir_all(dir.join(".git")).unwrap();
        std::fs::write(dir.join("basic_usage.js"), "").unwrap();
        std::fs::write(dir.join(".eslintrc"), "").unwrap();
        std::fs::write(dir.join("browser/basic.html"), "").unwrap();
        std::fs::write(dir.join("browser/.DS_Store"), "").unwrap();
        std::fs::write(dir.join(".git/config"), "").unwrap();

        let files = collect_files(&dir).await.unwrap();
        assert_eq!(
            files,
            vec![dir.join("basic_usage.js"), dir.join("browser/basic.html")]
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn collect_missing_directory_is_io_error() {
        let dir = std::env::temp_dir().join(format!("sitesync-fs-{}", uuid::Uuid::now_v7()));
        let err = collect_files(&dir).await.unwrap_err();
        assert!(matches!(err, SiteSyncError::Io { .. }));
    }
}
