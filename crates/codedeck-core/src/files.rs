//! Local filesystem view over a workspace scratch directory.
//!
//! Listing is deliberately non-recursive: the client walks the tree one
//! `fetchDir` at a time. Reads and writes are raw pass-throughs; parent
//! directories are created before a write. Paths received from clients are
//! joined below a caller-supplied base after stripping leading separators,
//! matching how the rest of the engine builds scratch-relative paths.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;

/// Whether a directory entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file (anything that is not a directory).
    File,
    /// Directory.
    Dir,
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Entry kind, serialized as `"type"` on the wire.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Bare file name.
    pub name: String,
    /// Path relative to the caller-supplied base.
    pub path: String,
}

/// Join a client-supplied relative path below `base`.
///
/// Leading separators are stripped so `"/index.js"` resolves inside the
/// scratch directory instead of replacing it. Upward traversal is not
/// rejected here (single-tenant trust boundary).
pub fn join_relative(base: &Path, relative: &str) -> PathBuf {
    base.join(relative.trim_start_matches(['/', '\\']))
}

/// List the immediate children of `dir`.
///
/// Each entry's `path` is `base` joined with the child name, using `/` as
/// the wire separator. Entries are sorted by name for a stable listing.
pub async fn list_dir(dir: &Path, base: &str) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    let mut read_dir = fs::read_dir(dir).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let kind = if entry.file_type().await?.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        entries.push(FileEntry {
            kind,
            path: join_wire_path(base, &name),
            name,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Read a file's contents as a string.
pub async fn read_file(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path).await?)
}

/// Write `content` to `path`, creating missing parent directories first.
pub async fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    Ok(())
}

fn join_wire_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_dir_immediate_children_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("src")).await.unwrap();
        fs::write(root.join("src/nested.rs"), b"mod nested;").await.unwrap();
        fs::write(root.join("index.js"), b"console.log(1)").await.unwrap();

        let entries = list_dir(root, "").await.unwrap();
        assert_eq!(entries.len(), 2);

        // Sorted by name, grandchildren absent.
        assert_eq!(entries[0].name, "index.js");
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].path, "index.js");
        assert_eq!(entries[1].name, "src");
        assert_eq!(entries[1].kind, EntryKind::Dir);
        assert!(entries.iter().all(|e| e.name != "nested.rs"));
    }

    #[tokio::test]
    async fn test_list_dir_joins_base() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("lib")).await.unwrap();
        fs::write(tmp.path().join("lib/util.js"), b"").await.unwrap();

        let entries = list_dir(&tmp.path().join("lib"), "lib").await.unwrap();
        assert_eq!(entries[0].path, "lib/util.js");
    }

    #[tokio::test]
    async fn test_list_dir_missing_dir_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = list_dir(&tmp.path().join("absent"), "absent").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_write_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a/b/c.txt");
        write_file(&path, b"hello").await.unwrap();
        assert_eq!(read_file(&path).await.unwrap(), "hello");
    }

    #[test]
    fn test_join_relative_strips_leading_separator() {
        let base = Path::new("/tmp/ws");
        assert_eq!(join_relative(base, "/index.js"), PathBuf::from("/tmp/ws/index.js"));
        assert_eq!(join_relative(base, "src/main.rs"), PathBuf::from("/tmp/ws/src/main.rs"));
    }

    #[test]
    fn test_file_entry_wire_format() {
        let entry = FileEntry {
            kind: EntryKind::Dir,
            name: "src".to_string(),
            path: "src".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"dir\""));
        assert!(json.contains("\"name\":\"src\""));
    }
}
