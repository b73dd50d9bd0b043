use paste_history::db::{self, HISTORY_KEY, PreferenceStore, SqlitePreferences};
use paste_history::history::{ClipContent, HistoryFilter, HistoryStore, InsertOutcome};

fn open_store(dir: &std::path::Path, capacity: usize) -> HistoryStore {
    let prefs = db::open_preferences(dir).expect("open preferences failed");
    HistoryStore::load(Box::new(prefs), capacity)
}

#[test]
fn history_survives_restart_on_disk() {
    let tmp = tempfile::tempdir().expect("create temp dir failed");

    let (ids, timestamps) = {
        let mut store = open_store(tmp.path(), 10);
        store.insert(ClipContent::Text("first".into()));
        store.insert(ClipContent::Text("second".into()));
        store.insert(ClipContent::Image(vec![0x89, 0x50, 0x4E, 0x47, 0, 1, 2]));
        let pinned = store.entries()[1].id();
        assert_eq!(store.toggle_pin(pinned), Some(true));

        let ids: Vec<_> = store.entries().iter().map(|e| e.id()).collect();
        let timestamps: Vec<_> = store.entries().iter().map(|e| e.created_at()).collect();
        (ids, timestamps)
    };

    let reopened = open_store(tmp.path(), 10);
    let entries = reopened.entries();
    assert_eq!(entries.iter().map(|e| e.id()).collect::<Vec<_>>(), ids);
    assert_eq!(entries.iter().map(|e| e.created_at()).collect::<Vec<_>>(), timestamps);
    assert!(entries[0].content().is_image());
    assert!(entries[1].is_pinned());
    assert!(!entries[2].is_pinned());
    assert_eq!(entries[2].content().as_text(), Some("first"));
}

#[test]
fn corrupt_document_yields_empty_history() {
    let tmp = tempfile::tempdir().expect("create temp dir failed");
    {
        let prefs = db::open_preferences(tmp.path()).expect("open preferences failed");
        prefs.set(HISTORY_KEY, b"{\"not\": \"a list\"").expect("write failed");
    }

    let mut store = open_store(tmp.path(), 10);
    assert!(store.is_empty());

    // 损坏数据不影响后续写入
    assert!(matches!(
        store.insert(ClipContent::Text("fresh".into())),
        InsertOutcome::Inserted(_)
    ));
    assert_eq!(open_store(tmp.path(), 10).len(), 1);
}

#[test]
fn smaller_capacity_on_reload_keeps_newest() {
    let tmp = tempfile::tempdir().expect("create temp dir failed");
    {
        let mut store = open_store(tmp.path(), 10);
        for i in 0..8 {
            store.insert(ClipContent::Text(format!("item-{i}")));
        }
    }

    let store = open_store(tmp.path(), 3);
    let texts: Vec<_> = store
        .entries()
        .iter()
        .filter_map(|e| e.content().as_text())
        .collect();
    assert_eq!(texts, vec!["item-7", "item-6", "item-5"]);
}

#[test]
fn capacity_is_enforced_even_for_pinned_entries() {
    let prefs = SqlitePreferences::open_in_memory().expect("open in-memory sqlite failed");
    let mut store = HistoryStore::load(Box::new(prefs), 10);

    for i in 0..10 {
        store.insert(ClipContent::Text(format!("pinned-{i}")));
    }
    let ids: Vec<_> = store.entries().iter().map(|e| e.id()).collect();
    for id in ids {
        store.toggle_pin(id);
    }
    for i in 0..5 {
        store.insert(ClipContent::Text(format!("new-{i}")));
    }

    assert_eq!(store.len(), 10);
    assert_eq!(store.entries()[0].content().as_text(), Some("new-4"));
    assert_eq!(store.entries()[9].content().as_text(), Some("pinned-5"));
}

#[test]
fn search_combines_text_and_pinned_filters() {
    let prefs = SqlitePreferences::open_in_memory().expect("open in-memory sqlite failed");
    let mut store = HistoryStore::load(Box::new(prefs), 10);
    store.insert(ClipContent::Text("Hello World".into()));
    store.insert(ClipContent::Text("hello again".into()));
    store.insert(ClipContent::Text("unrelated".into()));
    let again = store.entries()[1].id();
    store.toggle_pin(again);

    assert_eq!(store.search(&HistoryFilter::search("HELLO")).len(), 2);
    let pinned = store.search(&HistoryFilter::search("hello").pinned_only(true));
    assert_eq!(pinned.len(), 1);
    assert_eq!(pinned[0].id(), again);
    assert_eq!(store.search(&HistoryFilter::default()).len(), 3);
}
