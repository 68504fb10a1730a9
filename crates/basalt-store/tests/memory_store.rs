use basalt_store::{MemoryStore, Store, StoreError, Transaction};

#[test]
fn get_missing_key() {
    let store = MemoryStore::new();
    assert!(matches!(store.get(b"nope"), Err(StoreError::KeyNotFound)));
}

#[test]
fn put_get_delete() {
    let store = MemoryStore::new();
    store.put(b"a", b"1").unwrap();
    assert_eq!(store.get(b"a").unwrap(), b"1");
    store.delete(b"a").unwrap();
    assert!(matches!(store.get(b"a"), Err(StoreError::KeyNotFound)));
}

#[test]
fn scan_is_prefix_bounded_and_ordered() {
    let store = MemoryStore::new();
    store.put(b"a/1", b"x").unwrap();
    store.put(b"a/3", b"z").unwrap();
    store.put(b"a/2", b"y").unwrap();
    store.put(b"b/1", b"w").unwrap();

    let entries = store.scan(b"a/").unwrap();
    let keys: Vec<&[u8]> = entries.iter().map(|(k, _)| k.as_slice()).collect();
    assert_eq!(keys, vec![b"a/1".as_slice(), b"a/2", b"a/3"]);

    let keys = store.scan_keys(b"a/").unwrap();
    assert_eq!(keys.len(), 3);
}

#[test]
fn commit_publishes_all_writes() {
    let store = MemoryStore::new();
    let mut txn = store.begin().unwrap();
    txn.put(b"k1", b"v1").unwrap();
    txn.put(b"k2", b"v2").unwrap();
    txn.commit().unwrap();

    assert_eq!(store.get(b"k1").unwrap(), b"v1");
    assert_eq!(store.get(b"k2").unwrap(), b"v2");
}

#[test]
fn rollback_discards_writes() {
    let store = MemoryStore::new();
    store.put(b"k", b"old").unwrap();

    let mut txn = store.begin().unwrap();
    txn.put(b"k", b"new").unwrap();
    txn.delete(b"k").unwrap();
    txn.rollback().unwrap();

    assert_eq!(store.get(b"k").unwrap(), b"old");
}

#[test]
fn transaction_reads_own_writes() {
    let store = MemoryStore::new();
    let mut txn = store.begin().unwrap();
    txn.put(b"k", b"v").unwrap();
    assert_eq!(txn.get(b"k").unwrap(), b"v");
    assert_eq!(txn.scan_keys(b"k").unwrap().len(), 1);
    txn.rollback().unwrap();

    assert!(store.get(b"k").is_err());
}

#[test]
fn stream_visits_in_order_and_stops_on_false() {
    let store = MemoryStore::new();
    for i in 0..10u8 {
        store.put(format!("p/{i}").as_bytes(), &[i]).unwrap();
    }

    let mut seen = Vec::new();
    store
        .stream(b"p/", &mut |k, _| {
            seen.push(k.to_vec());
            seen.len() < 3
        })
        .unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], b"p/0");
}

#[test]
fn close_rejects_operations() {
    let store = MemoryStore::new();
    store.put(b"k", b"v").unwrap();
    store.close().unwrap();
    assert!(matches!(store.get(b"k"), Err(StoreError::Closed)));
    assert!(matches!(store.put(b"k", b"v"), Err(StoreError::Closed)));
    assert!(matches!(store.begin().err(), Some(StoreError::Closed)));
}
