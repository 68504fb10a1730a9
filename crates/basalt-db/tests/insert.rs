mod common;
use common::*;

use basalt_db::DbError;
use bson::doc;

// ── Single insert ───────────────────────────────────────────────

#[test]
fn insert_then_find_by_id_round_trips() {
    let client = client();
    let coll = users(&client);

    let doc = doc! { "_id": "u1", "name": "Ana", "age": 30 };
    let result = coll.insert_one(doc.clone()).unwrap();
    assert_eq!(result.inserted_id, "u1");

    let found = coll.find_by_id("u1").unwrap();
    assert_eq!(found, doc);
}

#[test]
fn missing_id_gets_a_generated_uuid() {
    let client = client();
    let coll = users(&client);

    let result = coll.insert_one(doc! { "name": "Ana" }).unwrap();
    // UUIDv4 textual form: 36 chars, 4 hyphens.
    assert_eq!(result.inserted_id.len(), 36);
    assert_eq!(result.inserted_id.matches('-').count(), 4);

    let found = coll.find_by_id(&result.inserted_id).unwrap();
    assert_eq!(found.get_str("name").unwrap(), "Ana");
    assert_eq!(found.get_str("_id").unwrap(), result.inserted_id);
}

#[test]
fn empty_string_id_is_replaced() {
    let client = client();
    let coll = users(&client);

    let result = coll.insert_one(doc! { "_id": "", "name": "Ana" }).unwrap();
    assert!(!result.inserted_id.is_empty());
    assert_ne!(result.inserted_id, "");
}

#[test]
fn non_string_id_is_rejected() {
    let client = client();
    let coll = users(&client);

    let err = coll.insert_one(doc! { "_id": 7, "name": "Ana" }).unwrap_err();
    assert!(matches!(err, DbError::InvalidDocument(_)));
    assert_eq!(coll.count().unwrap(), 0);
}

#[test]
fn duplicate_id_is_a_unique_violation() {
    let client = client();
    let coll = users(&client);

    coll.insert_one(doc! { "_id": "u1", "name": "Ana" }).unwrap();
    let err = coll
        .insert_one(doc! { "_id": "u1", "name": "Imposter" })
        .unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation(name) if name == "_id_"));

    // The stored document is untouched and the count did not move.
    assert_eq!(coll.find_by_id("u1").unwrap().get_str("name").unwrap(), "Ana");
    assert_eq!(coll.count().unwrap(), 1);
}

// ── Bulk insert ─────────────────────────────────────────────────

#[test]
fn bulk_insert_spans_multiple_batches() {
    let client = client();
    let coll = users(&client);

    let docs: Vec<_> = (0..250)
        .map(|i| doc! { "_id": format!("u{i}"), "n": i })
        .collect();
    let result = coll.insert(docs).unwrap();
    assert_eq!(result.inserted_ids.len(), 250);
    assert_eq!(coll.count().unwrap(), 250);

    assert_eq!(coll.find_by_id("u0").unwrap().get_i32("n").unwrap(), 0);
    assert_eq!(coll.find_by_id("u249").unwrap().get_i32("n").unwrap(), 249);
}

#[test]
fn empty_bulk_insert_is_rejected() {
    let client = client();
    let coll = users(&client);
    assert!(matches!(
        coll.insert(vec![]),
        Err(DbError::EmptyDocumentList)
    ));
}

#[test]
fn failing_batch_rolls_back_but_committed_batches_stand() {
    let client = client();
    let coll = users(&client);

    // 150 docs: the duplicate sits in the second batch, so batch one
    // (100 docs) commits and batch two rolls back entirely.
    let mut docs: Vec<_> = (0..150)
        .map(|i| doc! { "_id": format!("u{i}"), "n": i })
        .collect();
    docs[120] = doc! { "_id": "u0", "n": 120 };

    let err = coll.insert(docs).unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation(_)));

    assert_eq!(coll.count().unwrap(), 100);
    assert!(coll.find_by_id("u99").is_ok());
    // Nothing from the failed batch survived, not even docs before the bad one.
    assert!(coll.find_by_id("u100").is_err());
    assert!(coll.find_by_id("u119").is_err());
}

#[test]
fn mutation_error_leaves_no_trace() {
    let client = client();
    let coll = users(&client);
    seed_people(&coll);

    let err = coll
        .insert(vec![
            doc! { "_id": "u6", "name": "Fay" },
            doc! { "_id": "u1", "name": "Imposter" },
        ])
        .unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation(_)));

    // Atomicity: u6 was in the same (rolled back) batch.
    assert!(coll.find_by_id("u6").is_err());
    assert_eq!(coll.count().unwrap(), 5);
}

// ── Metadata persistence ────────────────────────────────────────

#[test]
fn document_count_survives_reopen() {
    let client = client();
    let coll = users(&client);
    seed_people(&coll);
    drop(coll);

    let reopened = users(&client);
    assert_eq!(reopened.count().unwrap(), 5);
}
