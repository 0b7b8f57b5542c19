//! Nickname storage flows: SQLite-backed pages, the manager, export

use std::sync::Arc;

use addrlabel::config::{self, Config};
use addrlabel::core::DomRewriter;
use addrlabel::modules::export::{export_nicknames, ExportFormat};
use addrlabel::modules::manage::{ManageState, Mode};
use addrlabel::modules::scan::{document_from_text, render_text};
use addrlabel::page::MemoryClipboard;
use addrlabel::store::{
    remove_nickname, upsert_nickname, NicknameCache, NicknameStore, SqliteNicknameStore,
};
use addrlabel::PageSession;

const EVM: &str = "0xAbCdEf0123456789abcdef0123456789abcdef01";
const EVM_KEY: &str = "0xabcdef0123456789abcdef0123456789abcdef01";
const GENESIS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

#[tokio::test]
async fn test_sqlite_backed_page_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteNicknameStore::open(&dir.path().join("n.sqlite3")).unwrap());
    upsert_nickname(store.as_ref(), EVM, "Alice").await.unwrap();

    let doc = document_from_text(&format!("to {EVM}\nfrom {GENESIS}")).unwrap();
    let mut session = PageSession::new(
        doc,
        store.clone(),
        Box::new(MemoryClipboard::new()),
        &Config::default(),
    )
    .unwrap();
    assert_eq!(session.init().await.labels_created, 1);

    upsert_nickname(store.as_ref(), GENESIS, "Genesis").await.unwrap();
    session.pump_store_changes().await;
    assert_eq!(render_text(session.document()), "to Alice\nfrom Genesis");
}

#[tokio::test]
async fn test_upsert_and_remove_keep_other_entries() {
    let store = SqliteNicknameStore::open_in_memory().unwrap();
    upsert_nickname(&store, EVM, "Alice").await.unwrap();
    upsert_nickname(&store, GENESIS, "Genesis").await.unwrap();
    upsert_nickname(&store, EVM_KEY, "  Alice 2 ").await.unwrap();

    let map = store.get().await.unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(EVM_KEY).map(String::as_str), Some("Alice 2"));

    assert!(remove_nickname(&store, EVM).await.unwrap());
    assert!(!remove_nickname(&store, EVM).await.unwrap());
    let map = store.get().await.unwrap();
    assert_eq!(map.keys().collect::<Vec<_>>(), vec![GENESIS]);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_without_writing() {
    let store = SqliteNicknameStore::open_in_memory().unwrap();
    assert!(upsert_nickname(&store, "0x123", "short").await.is_err());
    assert!(upsert_nickname(&store, GENESIS, "   ").await.is_err());
    assert!(store.get().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_manager_edits_then_export() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteNicknameStore::open(&dir.path().join("n.sqlite3")).unwrap();
    upsert_nickname(&store, EVM, "zed").await.unwrap();
    upsert_nickname(&store, GENESIS, "Genesis").await.unwrap();

    let mut state = ManageState::new();
    state.reload(&store).await;
    assert_eq!(state.entries()[0].nickname, "Genesis");

    state.request_delete();
    assert!(matches!(state.mode(), Mode::ConfirmDelete { .. }));
    assert!(state.confirm_delete(&store).await.unwrap());
    assert_eq!(state.entries().len(), 1);

    let out = dir.path().join("export.csv");
    let map = store.get().await.unwrap();
    let (path, count) = export_nicknames(&map, ExportFormat::Csv, Some(&out)).unwrap();
    assert_eq!(count, 1);
    let text = std::fs::read_to_string(path).unwrap();
    assert_eq!(text, format!("address,nickname\n{EVM_KEY},zed\n"));
}

#[test]
fn test_config_file_drives_rewriter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
ignore_tags = ["PRE"]

[tooltip]
hide_delay_ms = 500
"#,
    )
    .unwrap();
    let config = config::load_from(&path);
    assert_eq!(config.tooltip.hide_delay_ms, 500);
    assert_eq!(config.tooltip.copy_feedback_ms, 2000);

    let mut doc = document_from_text(EVM).unwrap();
    let body = doc.body();
    let pre = doc.create_element("pre");
    let code = doc.create_text(EVM);
    doc.append_child(pre, code).unwrap();
    doc.append_child(body, pre).unwrap();

    let mut cache = NicknameCache::new();
    cache.replace([(EVM_KEY.to_string(), "Alice".to_string())].into());
    let report = DomRewriter::from_config(&config).scan_document(&mut doc, &cache);
    assert_eq!(report.labels_created, 1);
    assert_eq!(render_text(&doc), format!("Alice\n{EVM}"));
}
