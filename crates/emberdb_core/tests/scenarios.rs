//! End-to-end behaviour of collections, cursors and views.

use emberdb_core::{
    doc_id, CollectionOptions, Database, DbError, DynamicViewOptions, Meta, SortCriterion,
    TransformStep,
};
use serde_json::{json, Value};

fn names(docs: &[Value]) -> Vec<&str> {
    docs.iter().filter_map(|d| d["name"].as_str()).collect()
}

#[test]
fn indexed_range_query_returns_only_matching_documents() {
    let db = Database::in_memory("scenario.db");
    let users = db
        .add_collection("users", CollectionOptions::new().index("age"))
        .unwrap();
    let mut users = users.write();
    users
        .insert(vec![
            json!({"name": "Alice", "age": 25}),
            json!({"name": "Bob", "age": 30}),
        ])
        .unwrap();

    let older = users.chain().find(json!({"age": {"$gt": 25}})).unwrap().data();
    assert_eq!(names(&older), vec!["Bob"]);
}

#[test]
fn active_view_follows_updates() {
    let db = Database::in_memory("scenario.db");
    let handle = db.add_collection("users", CollectionOptions::default()).unwrap();
    let mut users = handle.write();
    users
        .add_dynamic_view("active", DynamicViewOptions::new().persistent(true))
        .unwrap()
        .apply_find(json!({"active": true}), None)
        .unwrap();
    assert_eq!(users.get_dynamic_view("active").unwrap().count(), 0);

    let mut doc = users.insert_one(json!({"name": "Alice", "active": true})).unwrap();
    assert_eq!(users.get_dynamic_view("active").unwrap().count(), 1);

    doc["active"] = json!(false);
    users.update_one(doc).unwrap();
    assert_eq!(users.get_dynamic_view("active").unwrap().count(), 0);
}

#[test]
fn inserted_documents_carry_identity_and_fresh_meta() {
    let db = Database::in_memory("scenario.db");
    let handle = db
        .add_collection("users", CollectionOptions::new().unique("email"))
        .unwrap();
    let mut users = handle.write();
    let stored = users.insert_one(json!({"email": "a@example.com"})).unwrap();

    let id = doc_id(&stored).unwrap();
    assert_eq!(id, 1);
    let meta = Meta::of(&stored).unwrap();
    assert_eq!(meta.revision, 0);
    assert!(meta.updated.is_none());

    assert_eq!(users.find_one(json!({"$id": id})).unwrap(), Some(stored.clone()));
    assert_eq!(users.by("email", &json!("a@example.com")).unwrap(), Some(&stored));
}

#[test]
fn unique_constraint_on_insert_and_update() {
    let db = Database::in_memory("scenario.db");
    let handle = db
        .add_collection("users", CollectionOptions::new().unique("email"))
        .unwrap();
    let mut users = handle.write();
    let a = users.insert_one(json!({"email": "a@x"})).unwrap();
    let b = users.insert_one(json!({"email": "b@x"})).unwrap();

    let dup = users.insert_one(json!({"email": "a@x"}));
    assert!(matches!(dup, Err(DbError::UniqueViolation { .. })));

    let mut collide = b.clone();
    collide["email"] = json!("a@x");
    assert!(matches!(users.update_one(collide), Err(DbError::UniqueViolation { .. })));

    let mut same = a.clone();
    same["nickname"] = json!("ay");
    users.update_one(same).unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users.by("email", &json!("b@x")).unwrap().and_then(doc_id), doc_id(&b));
}

#[test]
fn cursors_filter_sort_and_page() {
    let db = Database::in_memory("scenario.db");
    let handle = db.add_collection("people", CollectionOptions::default()).unwrap();
    let mut people = handle.write();
    people
        .insert(vec![
            json!({"name": "Alice", "city": "Oslo", "age": 25}),
            json!({"name": "Bob", "city": "Rome", "age": 30}),
            json!({"name": "Carol", "city": "Oslo", "age": 35}),
            json!({"name": "Dave", "city": "Rome"}),
        ])
        .unwrap();

    let sorted = people
        .chain()
        .compoundsort(&[SortCriterion::asc("city"), SortCriterion::desc("age")])
        .data();
    assert_eq!(names(&sorted), vec!["Carol", "Alice", "Bob", "Dave"]);

    let page = people.chain().simplesort("age", false).offset(1).limit(2).data();
    assert_eq!(names(&page), vec!["Bob", "Carol"]);

    let either = people
        .chain()
        .find_or([json!({"age": {"$lt": 26}}), json!({"name": {"$regex": "^D"}})])
        .unwrap()
        .data();
    assert_eq!(names(&either), vec!["Alice", "Dave"]);

    let removed = people
        .chain_mut()
        .find(json!({"city": "Rome"}))
        .unwrap()
        .remove()
        .unwrap()
        .count();
    assert_eq!(removed, 0);
    assert_eq!(people.len(), 2);
}

#[test]
fn named_transforms_take_parameters() {
    let db = Database::in_memory("scenario.db");
    let handle = db.add_collection("people", CollectionOptions::default()).unwrap();
    let mut people = handle.write();
    people
        .insert(vec![
            json!({"name": "Alice", "age": 25}),
            json!({"name": "Bob", "age": 30}),
            json!({"name": "Carol", "age": 35}),
        ])
        .unwrap();
    people
        .add_transform(
            "olderThan",
            vec![
                TransformStep::Find(json!({"age": {"$gt": "[%lktxp]minAge"}})),
                TransformStep::SimpleSort {
                    field: "age".into(),
                    descending: true,
                },
                TransformStep::Limit(1),
            ],
        )
        .unwrap();

    let oldest = people.transform("olderThan", Some(&json!({"minAge": 26}))).unwrap();
    assert_eq!(names(&oldest), vec!["Carol"]);
    assert!(people.transform("olderThan", None).is_err());
}

#[test]
fn joins_match_on_keys() {
    let db = Database::in_memory("scenario.db");
    let users = db.add_collection("users", CollectionOptions::default()).unwrap();
    let orders = db.add_collection("orders", CollectionOptions::default()).unwrap();
    users
        .write()
        .insert(vec![json!({"uid": 1, "name": "Alice"}), json!({"uid": 2, "name": "Bob"})])
        .unwrap();
    orders
        .write()
        .insert(vec![json!({"owner": 2, "item": "lamp"})])
        .unwrap();

    let orders = orders.read();
    let users = users.read();
    let joined = orders.chain().eq_join(
        emberdb_core::JoinSource::Collection(&users),
        "owner",
        "uid",
    );
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0]["right"]["name"], "Bob");
}
