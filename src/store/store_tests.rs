use super::*;
use crate::record::NewRecord;
use crate::testing::fixed_now;
use chrono::Duration;

fn record(id: &str, email: &str, sent_days_ago: i64) -> OutreachRecord {
    let now = fixed_now();
    let sent = now - Duration::days(sent_days_ago);
    OutreachRecord::initial(
        NewRecord {
            recipient_name: format!("Contact {id}"),
            recipient_email: email.to_string(),
            email_subject: "Hello".to_string(),
            email_content: "<body>x</body>".to_string(),
            model_used: "perplexity/sonar-reasoning-pro".to_string(),
        },
        id,
        sent,
        sent,
    )
    .unwrap()
}

fn exercise_backend(store: &dyn RecordStore) {
    store.upsert(&record("a", "ada@example.com", 20)).unwrap();
    store.upsert(&record("b", "ADA@Example.com", 5)).unwrap();
    store.upsert(&record("c", "bob@example.com", 10)).unwrap();

    let mut replaced = record("c", "bob@example.com", 10);
    replaced.status = EmailStatus::Responded;
    store.upsert(&replaced).unwrap();
    assert_eq!(store.load_all().unwrap().len(), 3);
    assert_eq!(
        store.find_by_email_id("c").unwrap().map(|r| r.status),
        Some(EmailStatus::Responded)
    );
    assert!(store.find_by_email_id("missing").unwrap().is_none());

    let ada: Vec<String> = store
        .find_by_recipient_email(" ada@EXAMPLE.com ")
        .unwrap()
        .into_iter()
        .map(|r| r.initial_email_id)
        .collect();
    assert_eq!(ada, vec!["b", "a"]);

    let counts = store.status_counts().unwrap();
    assert_eq!(counts[&EmailStatus::Initial], 2);
    assert_eq!(counts[&EmailStatus::Responded], 1);
    assert_eq!(counts[&EmailStatus::Converted], 0);
    assert_eq!(counts.len(), EmailStatus::ALL.len());
}

#[test]
fn memory_backend_contract() {
    exercise_backend(&MemoryStore::new());
}

#[test]
fn json_backend_contract_and_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_dir = dir.path().join("nested");
    exercise_backend(&JsonFileStore::open(&store_dir));

    let reopened = JsonFileStore::open(&store_dir);
    assert_eq!(reopened.load_all().unwrap().len(), 3);
    let raw = std::fs::read_to_string(reopened.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["schema_version"], STORE_SCHEMA_VERSION);
    assert_eq!(value["records"][2]["status"], "responded");
}

#[test]
fn json_backend_starts_empty_and_rejects_unknown_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::open(dir.path());
    assert!(store.load_all().unwrap().is_empty());

    std::fs::write(store.path(), r#"{"schema_version": 99, "records": []}"#).unwrap();
    let err = store.load_all().unwrap_err();
    assert!(err.to_string().contains("schema_version 99"));
}

#[test]
fn invalid_records_are_not_persisted() {
    let store = MemoryStore::new();
    let mut bad = record("a", "ada@example.com", 1);
    bad.email_content.clear();
    assert!(store.upsert(&bad).is_err());
    assert!(store.load_all().unwrap().is_empty());
}

#[test]
fn query_filters_sorts_and_pages() {
    let mut records = vec![
        record("a", "a@example.com", 30),
        record("b", "b@example.com", 20),
        record("c", "c@example.com", 10),
        record("d", "d@example.com", 1),
    ];
    records[3].status = EmailStatus::Converted;
    let store = MemoryStore::with_records(records);

    let ids = |query: RecordQuery| -> Vec<String> {
        store
            .find(&query)
            .unwrap()
            .into_iter()
            .map(|r| r.initial_email_id)
            .collect()
    };

    assert_eq!(ids(RecordQuery::default()), vec!["d", "c", "b", "a"]);
    assert_eq!(
        ids(RecordQuery::with_status(EmailStatus::Initial)),
        vec!["c", "b", "a"]
    );
    assert_eq!(
        ids(RecordQuery {
            sort_by: SortField::UpdatedAt,
            sort_dir: SortDir::Asc,
            skip: 1,
            limit: Some(2),
            ..RecordQuery::default()
        }),
        vec!["b", "c"]
    );

    let now = fixed_now();
    assert_eq!(
        ids(RecordQuery {
            updated_between: Some((now - Duration::days(20), now - Duration::days(10))),
            ..RecordQuery::default()
        }),
        vec!["c", "b"]
    );
}
