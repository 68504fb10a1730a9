use basalt_db::{Client, Collection};
use basalt_store::MemoryStore;
use bson::doc;

pub const DB: &str = "app";
pub const COLLECTION: &str = "users";

pub fn client() -> Client<MemoryStore> {
    Client::open(MemoryStore::new())
}

pub fn users(client: &Client<MemoryStore>) -> Collection<MemoryStore> {
    client.database(DB).collection(COLLECTION).unwrap()
}

/// Insert 5 seed documents with mixed statuses and ages.
pub fn seed_people(coll: &Collection<MemoryStore>) {
    coll.insert(vec![
        doc! { "_id": "u1", "name": "Ana", "age": 30, "status": "active" },
        doc! { "_id": "u2", "name": "Bob", "age": 25, "status": "snoozed" },
        doc! { "_id": "u3", "name": "Cleo", "age": 41, "status": "active" },
        doc! { "_id": "u4", "name": "Dan", "age": 25, "status": "rejected" },
        doc! { "_id": "u5", "name": "Eve", "age": 35, "status": "active" },
    ])
    .unwrap();
}
