//! Workspace synchronization between remote storage and local scratch dirs.
//!
//! A workspace's files live under the remote prefix `code/<id>/` and are
//! mirrored into `<scratch_root>/<id>` for fast local access. Pulls are
//! best-effort: individual objects that fail to download are logged and
//! skipped, so a brand-new workspace (zero objects) and a flaky network both
//! yield a usable, possibly partial, scratch directory. Pushes and template
//! copies propagate their errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::storage::ObjectStore;

/// Remote prefix for a workspace's files.
pub fn workspace_prefix(workspace_id: &str) -> String {
    format!("code/{}/", workspace_id)
}

/// Remote prefix for a language template.
pub fn template_prefix(language: &str) -> String {
    format!("base/{}/", language)
}

/// Keeps local scratch copies of workspaces in step with remote storage.
pub struct WorkspaceSync {
    store: Arc<dyn ObjectStore>,
    scratch_root: PathBuf,
    max_concurrent_pulls: usize,
}

impl WorkspaceSync {
    /// `max_concurrent_pulls` bounds the per-object download fan-out of
    /// [`WorkspaceSync::pull`].
    pub fn new(
        store: Arc<dyn ObjectStore>,
        scratch_root: impl Into<PathBuf>,
        max_concurrent_pulls: usize,
    ) -> Self {
        Self {
            store,
            scratch_root: scratch_root.into(),
            max_concurrent_pulls: max_concurrent_pulls.max(1),
        }
    }

    /// Local scratch directory for a workspace. Deterministic per id and
    /// reused verbatim on reconnect.
    pub fn scratch_dir(&self, workspace_id: &str) -> PathBuf {
        self.scratch_root.join(workspace_id)
    }

    /// Mirror the workspace's remote prefix into its scratch directory.
    ///
    /// Only a failure to list the prefix is an error; per-object failures
    /// are logged and skipped. Returns the scratch directory, which exists
    /// (possibly empty) on success.
    pub async fn pull(&self, workspace_id: &str) -> Result<PathBuf> {
        let scratch = self.scratch_dir(workspace_id);
        fs::create_dir_all(&scratch).await?;

        let prefix = workspace_prefix(workspace_id);
        let keys = self.list_all(&prefix).await?;
        debug!(workspace = %workspace_id, objects = keys.len(), "pulling workspace");

        futures::stream::iter(keys)
            .for_each_concurrent(self.max_concurrent_pulls, |key| {
                let scratch = &scratch;
                let prefix = &prefix;
                async move {
                    if let Err(error) = self.download_object(&key, prefix, scratch).await {
                        warn!(%key, %error, "skipping object during workspace pull");
                    }
                }
            })
            .await;

        Ok(scratch)
    }

    /// Push one file's content to the workspace's remote prefix.
    ///
    /// The caller has typically already written the local copy; a failure
    /// here means the edit is visible locally but not durably saved.
    pub async fn push(&self, workspace_id: &str, relative_path: &str, content: &[u8]) -> Result<()> {
        let key = object_key(workspace_id, relative_path);
        self.store.put(&key, content.to_vec()).await
    }

    /// Storage-side copy of every object under `source_prefix` to
    /// `dest_prefix`, preserving the relative suffix. Pages through the
    /// listing until no continuation token remains.
    pub async fn copy_folder(&self, source_prefix: &str, dest_prefix: &str) -> Result<()> {
        let mut continuation = None;
        loop {
            let page = self.store.list(source_prefix, continuation).await?;
            for key in &page.keys {
                let suffix = &key[source_prefix.len()..];
                let dest_key = format!("{}{}", dest_prefix, suffix);
                self.store.copy(key, &dest_key).await?;
            }
            match page.next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        Ok(())
    }

    async fn list_all(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation = None;
        loop {
            let page = self.store.list(prefix, continuation).await?;
            keys.extend(page.keys);
            match page.next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        Ok(keys)
    }

    async fn download_object(&self, key: &str, prefix: &str, scratch: &Path) -> Result<()> {
        let bytes = self.store.get(key).await?;
        let suffix = key[prefix.len()..].trim_start_matches('/');
        if suffix.is_empty() {
            // Placeholder key for the prefix itself, nothing to write.
            return Ok(());
        }
        let path = scratch.join(suffix);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        debug!(%key, path = %path.display(), "downloaded object");
        Ok(())
    }
}

fn object_key(workspace_id: &str, relative_path: &str) -> String {
    format!(
        "code/{}/{}",
        workspace_id,
        relative_path.trim_start_matches('/')
    )
}

/// An empty workspace id would collapse the scratch dir onto the scratch
/// root and the remote prefix onto `code/`; callers validate before any
/// side effect.
pub fn validate_workspace_id(workspace_id: &str) -> Result<()> {
    if workspace_id.is_empty() {
        return Err(Error::Validation("workspace id must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn sync_with(store: Arc<dyn ObjectStore>, root: &Path) -> WorkspaceSync {
        WorkspaceSync::new(store, root, 4)
    }

    #[tokio::test]
    async fn test_pull_empty_prefix_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let sync = sync_with(Arc::new(MemoryStore::new()), tmp.path());

        let scratch = sync.pull("fresh").await.unwrap();
        assert!(scratch.is_dir());
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_pull_writes_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.put("code/abc123/index.js", b"console.log(1)".to_vec()).await.unwrap();
        store.put("code/abc123/src/app.js", b"module.exports = {}".to_vec()).await.unwrap();
        // An unrelated workspace must not leak in.
        store.put("code/other/secret.js", b"nope".to_vec()).await.unwrap();

        let sync = sync_with(store, tmp.path());
        let scratch = sync.pull("abc123").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(scratch.join("index.js")).unwrap(),
            "console.log(1)"
        );
        assert_eq!(
            std::fs::read_to_string(scratch.join("src/app.js")).unwrap(),
            "module.exports = {}"
        );
        assert!(!scratch.join("secret.js").exists());
    }

    #[tokio::test]
    async fn test_pull_is_best_effort_per_object() {
        struct PoisonedStore {
            inner: MemoryStore,
        }

        #[async_trait::async_trait]
        impl ObjectStore for PoisonedStore {
            async fn list(&self, prefix: &str, c: Option<String>) -> Result<crate::storage::ObjectPage> {
                self.inner.list(prefix, c).await
            }
            async fn get(&self, key: &str) -> Result<Vec<u8>> {
                if key.ends_with("poison") {
                    return Err(Error::Storage("simulated download failure".into()));
                }
                self.inner.get(key).await
            }
            async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
                self.inner.put(key, bytes).await
            }
            async fn copy(&self, s: &str, d: &str) -> Result<()> {
                self.inner.copy(s, d).await
            }
        }

        let inner = MemoryStore::new();
        inner.put("code/ws/ok.txt", b"fine".to_vec()).await.unwrap();
        inner.put("code/ws/poison", b"never arrives".to_vec()).await.unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let sync = sync_with(Arc::new(PoisonedStore { inner }), tmp.path());

        let scratch = sync.pull("ws").await.unwrap();
        assert_eq!(std::fs::read_to_string(scratch.join("ok.txt")).unwrap(), "fine");
        assert!(!scratch.join("poison").exists());
    }

    #[tokio::test]
    async fn test_push_builds_workspace_key() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let sync = sync_with(store.clone(), tmp.path());

        sync.push("abc123", "/index.js", b"console.log(1)").await.unwrap();
        assert_eq!(
            store.get("code/abc123/index.js").await.unwrap(),
            b"console.log(1)"
        );

        // Paths without the leading slash land on the same key.
        sync.push("abc123", "index.js", b"v2").await.unwrap();
        assert_eq!(store.get("code/abc123/index.js").await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_copy_folder_spans_listing_pages() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_page_size(2));
        for name in ["index.js", "package.json", "src/app.js", "src/lib/util.js", "README.md"] {
            store
                .put(&format!("base/node/{}", name), name.as_bytes().to_vec())
                .await
                .unwrap();
        }

        let sync = sync_with(store.clone(), tmp.path());
        sync.copy_folder(&template_prefix("node"), &workspace_prefix("abc123"))
            .await
            .unwrap();

        for name in ["index.js", "package.json", "src/app.js", "src/lib/util.js", "README.md"] {
            assert_eq!(
                store.get(&format!("code/abc123/{}", name)).await.unwrap(),
                name.as_bytes(),
                "missing copied object {}",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_repeated_pull_is_a_superset() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.put("code/ws/a.txt", b"a".to_vec()).await.unwrap();

        let sync = sync_with(store.clone(), tmp.path());
        let scratch = sync.pull("ws").await.unwrap();
        assert!(scratch.join("a.txt").exists());

        // A later pull over the same workspace keeps existing files.
        store.put("code/ws/b.txt", b"b".to_vec()).await.unwrap();
        let scratch = sync.pull("ws").await.unwrap();
        assert!(scratch.join("a.txt").exists());
        assert!(scratch.join("b.txt").exists());
    }

    #[test]
    fn test_prefix_helpers() {
        assert_eq!(workspace_prefix("abc123"), "code/abc123/");
        assert_eq!(template_prefix("node"), "base/node/");
        assert!(validate_workspace_id("abc123").is_ok());
        assert!(matches!(
            validate_workspace_id(""),
            Err(Error::Validation(_))
        ));
    }
}
