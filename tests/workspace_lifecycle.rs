//! End-to-end workspace lifecycle against the in-memory store: seed a
//! project from a template, pull it into a scratch dir, browse it, edit a
//! file, and run a terminal session in the scratch dir.

use std::sync::Arc;
use std::time::Duration;

use codedeck_core::{
    files, template_prefix, workspace_prefix, EntryKind, MemoryStore, ObjectStore,
    SessionRegistry, TerminalConfig, WorkspaceSync,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::with_page_size(2));
    for (key, content) in [
        ("base/node/index.js", "console.log('hello')"),
        ("base/node/package.json", "{\"name\": \"starter\"}"),
        ("base/node/src/app.js", "module.exports = () => {}"),
    ] {
        store.put(key, content.as_bytes().to_vec()).await.unwrap();
    }
    store
}

#[tokio::test(flavor = "multi_thread")]
async fn workspace_lifecycle() {
    let store = seeded_store().await;
    let tmp = tempfile::tempdir().unwrap();
    let sync = WorkspaceSync::new(store.clone(), tmp.path(), 4);

    // 1. Create project: template prefix copied to the workspace prefix.
    sync.copy_folder(&template_prefix("node"), &workspace_prefix("abc123"))
        .await
        .unwrap();
    assert_eq!(
        store.get("code/abc123/index.js").await.unwrap(),
        b"console.log('hello')"
    );

    // 2. Connect: pull populates the scratch dir; root listing matches.
    let scratch = sync.pull("abc123").await.unwrap();
    assert_eq!(scratch, tmp.path().join("abc123"));

    let root = files::list_dir(&scratch, "").await.unwrap();
    let names: Vec<_> = root.iter().map(|e| (e.name.as_str(), e.kind)).collect();
    assert_eq!(
        names,
        vec![
            ("index.js", EntryKind::File),
            ("package.json", EntryKind::File),
            ("src", EntryKind::Dir),
        ]
    );

    // 3. Terminal in the scratch dir: bytes flow both ways.
    let registry = Arc::new(SessionRegistry::new(TerminalConfig {
        shell: Some("cat".to_string()),
        rows: 24,
        cols: 80,
    }));
    let conn_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.create(conn_id, "abc123", &scratch, tx).await.unwrap();
    registry.write(conn_id, b"ls\n").await.unwrap();

    let mut output = Vec::new();
    while !String::from_utf8_lossy(&output).contains("ls") {
        let chunk = timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for terminal output")
            .expect("terminal channel closed early");
        output.extend(chunk);
    }

    // 4. Edit: local write plus remote push.
    let edited = files::join_relative(&scratch, "/index.js");
    files::write_file(&edited, b"console.log(1)").await.unwrap();
    sync.push("abc123", "/index.js", b"console.log(1)").await.unwrap();
    assert_eq!(
        store.get("code/abc123/index.js").await.unwrap(),
        b"console.log(1)"
    );

    // 5. Disconnect: teardown is unconditional and repeatable.
    registry.clear(conn_id).await;
    registry.clear(conn_id).await;

    // A reconnect pulls the edited file back into a fresh scratch root.
    let tmp2 = tempfile::tempdir().unwrap();
    let sync2 = WorkspaceSync::new(store, tmp2.path(), 4);
    let scratch2 = sync2.pull("abc123").await.unwrap();
    assert_eq!(
        std::fs::read_to_string(scratch2.join("index.js")).unwrap(),
        "console.log(1)"
    );
}
