use devlog::codec::{self, ExtraData};
use devlog::db::{self, entry_store::{EntryFilter, EntryStore}};
use devlog::models::entry::log_entry::{LogEntry, RunId};
use devlog::models::severity::level::Severity;
use serde_json::json;

async fn open_store(max_extra_data_size: usize) -> EntryStore {
    let pool = db::connect("sqlite://:memory:").await.expect("connect memory sqlite");
    EntryStore::new(pool, max_extra_data_size)
}

fn entry(run: i64, severity: Severity, facility: &str, message: &str, created_at: i64) -> LogEntry {
    LogEntry {
        created_at,
        ..LogEntry::new(&RunId::from_micros(run), severity, facility, message)
    }
}

#[tokio::test]
async fn insert_and_find() {
    let store = open_store(1024).await;
    let mut e = entry(1, Severity::Notice, "shop", "order placed", 100);
    let mut extra = ExtraData::new();
    extra.insert("order".into(), json!(42));
    extra.insert("__session".into(), json!("s-1"));
    e.set_extra_data(&extra).unwrap();

    let id = store.insert(&e).await.unwrap();
    let found = store.find(id).await.unwrap().expect("entry stored");
    assert_eq!(found.id, Some(id));
    assert_eq!(found.run_id, RunId::from_micros(1).to_string());
    assert_eq!(found.level(), Severity::Notice);
    assert_eq!(found.facility, "shop");
    assert_eq!(found.created_at, 100);
    assert_eq!(found.host, None);
    assert_eq!(found.extra_data(), extra);
    assert_eq!(found.internal_extra_data().get("session"), Some(&json!("s-1")));

    assert!(store.find(id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn insert_bounds_extra_data() {
    let store = open_store(64).await;
    let mut e = entry(1, Severity::Warn, "shop", "big payload", 100);
    let mut extra = ExtraData::new();
    extra.insert("note".into(), json!("x".repeat(500)));
    e.set_extra_data(&extra).unwrap();
    assert!(e.extra_data_raw.len() > 64);

    let id = store.insert(&e).await.unwrap();
    let found = store.find(id).await.unwrap().unwrap();
    assert!(found.extra_data_raw.len() <= 64);
    assert!(codec::decode(&found.extra_data_raw).is_ok());
}

#[tokio::test]
async fn run_ids_and_facilities() {
    let store = open_store(1024).await;
    for (run, facility) in [(1, "shop"), (3, "cart"), (2, "shop"), (3, "shop")] {
        store
            .insert(&entry(run, Severity::Info, facility, "m", 10))
            .await
            .unwrap();
    }

    let runs = store.select_grouped_run_ids(2).await.unwrap();
    assert_eq!(
        runs,
        vec![RunId::from_micros(3).to_string(), RunId::from_micros(2).to_string()]
    );

    let facilities = store.select_distinct_facilities().await.unwrap();
    assert_eq!(facilities, vec!["shop".to_string(), "cart".to_string()]);
}

#[tokio::test]
async fn select_since_groups_repeats() {
    let store = open_store(1024).await;
    store.insert(&entry(1, Severity::Warn, "shop", "stock low", 10)).await.unwrap();
    let latest = store.insert(&entry(1, Severity::Warn, "shop", "stock low", 12)).await.unwrap();
    store.insert(&entry(1, Severity::Warn, "cart", "stock low", 11)).await.unwrap();
    store.insert(&entry(1, Severity::Fatal, "shop", "stock low", 13)).await.unwrap();
    store.insert(&entry(1, Severity::Warn, "shop", "too old", 4)).await.unwrap();

    let rows = store
        .select_since(5, Severity::Warn.code(), 30, &EntryFilter::default(), true)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].uid, latest);
    assert_eq!(rows[0].crdate, 12);
    assert_eq!(rows[0].msg_count, 2);
    assert_eq!(rows[1].ext_key, "cart");
    assert_eq!(rows[1].msg_count, 1);

    let ungrouped = store
        .select_since(5, Severity::Warn.code(), 30, &EntryFilter::default(), false)
        .await
        .unwrap();
    assert_eq!(ungrouped.len(), 3);

    let limited = store
        .select_since(5, Severity::Warn.code(), 1, &EntryFilter::default(), false)
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].crdate, 12);
}

#[tokio::test]
async fn checkpoint_is_inclusive() {
    let store = open_store(1024).await;
    store.insert(&entry(1, Severity::Fatal, "shop", "at checkpoint", 5)).await.unwrap();
    store.insert(&entry(1, Severity::Fatal, "shop", "before", 4)).await.unwrap();

    let rows = store
        .select_since(5, Severity::Fatal.code(), 30, &EntryFilter::default(), true)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].message, "at checkpoint");
}

#[tokio::test]
async fn severity_summary_counts_every_level() {
    let store = open_store(1024).await;
    for (severity, ts) in [
        (Severity::Debug, 10),
        (Severity::Info, 10),
        (Severity::Info, 11),
        (Severity::Fatal, 12),
        (Severity::Fatal, 1),
    ] {
        store.insert(&entry(1, severity, "shop", "m", ts)).await.unwrap();
    }

    let summary = store
        .select_severity_summary(&EntryFilter::since(5))
        .await
        .unwrap();
    let pairs: Vec<(i64, i64)> = summary.iter().map(|c| (c.severity, c.cnt)).collect();
    assert_eq!(pairs, vec![(-1, 1), (0, 2), (3, 1)]);
}

#[tokio::test]
async fn transport_ids_form_a_set() {
    let store = open_store(1024).await;
    let id = store.insert(&entry(1, Severity::Warn, "shop", "m", 10)).await.unwrap();

    assert!(store.add_transport_id(id, "mail").await.unwrap());
    assert!(!store.add_transport_id(id, "mail").await.unwrap());
    assert!(store.add_transport_id(id, "chat").await.unwrap());
    assert!(!store.add_transport_id(id, "a,b").await.unwrap());
    assert!(!store.add_transport_id(id + 1, "mail").await.unwrap());

    let found = store.find(id).await.unwrap().unwrap();
    assert_eq!(found.transport_ids(), vec!["mail", "chat"]);
}

#[tokio::test]
async fn mark_delivered_skips_entries_already_carrying_the_id() {
    let store = open_store(1024).await;
    let first = store.insert(&entry(1, Severity::Warn, "shop", "a", 10)).await.unwrap();
    let second = store.insert(&entry(1, Severity::Fatal, "shop", "b", 10)).await.unwrap();
    let info = store.insert(&entry(1, Severity::Info, "shop", "c", 10)).await.unwrap();
    store.add_transport_id(first, "chat").await.unwrap();
    store.add_transport_id(second, "mail").await.unwrap();

    let severities = [Severity::Warn.code(), Severity::Fatal.code()];
    let marked = store
        .mark_delivered(&EntryFilter::since(5), &severities, "mail")
        .await
        .unwrap();
    assert_eq!(marked, 1);

    let first = store.find(first).await.unwrap().unwrap();
    assert_eq!(first.transport_ids(), vec!["chat", "mail"]);
    let second = store.find(second).await.unwrap().unwrap();
    assert_eq!(second.transport_ids(), vec!["mail"]);
    let info = store.find(info).await.unwrap().unwrap();
    assert!(info.transport_ids().is_empty());

    let filter = EntryFilter {
        undelivered_by: Some("mail".to_string()),
        ..EntryFilter::default()
    };
    assert_eq!(store.count(&filter).await.unwrap(), 1);
    assert_eq!(store.mark_delivered(&EntryFilter::default(), &severities, "a,b").await.unwrap(), 0);
}

#[tokio::test]
async fn list_filters_and_orders_newest_first() {
    let store = open_store(1024).await;
    store.insert(&entry(1, Severity::Info, "shop", "one", 10)).await.unwrap();
    store.insert(&entry(2, Severity::Info, "cart", "two", 11)).await.unwrap();
    store.insert(&entry(2, Severity::Warn, "shop", "three", 12)).await.unwrap();

    let all = store.list(&EntryFilter::default(), 10).await.unwrap();
    let messages: Vec<&str> = all.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["three", "two", "one"]);

    let filter = EntryFilter {
        run_id: Some(RunId::from_micros(2).to_string()),
        facility: Some("shop".to_string()),
        ..EntryFilter::default()
    };
    let found = store.list(&filter, 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "three");
    assert_eq!(store.max_id(&filter).await.unwrap(), found[0].id);
}
