//! The same behaviour checks against both store implementations.

use std::sync::Arc;

use serde_json::json;

use docstore::{CityRepository, DocumentStore, MemoryDocumentStore, SqliteDocumentStore, UserRepository};
use heat_common::{HeatError, NewCity, NewUser, Role, UserPatch};

async fn sqlite_file() -> (tempfile::TempDir, Arc<dyn DocumentStore>) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("dashboard.db").display());
    let store = SqliteDocumentStore::connect(&url).await.unwrap();
    store.migrate().await.unwrap();
    (dir, Arc::new(store))
}

async fn sqlite_memory() -> Arc<dyn DocumentStore> {
    let store = SqliteDocumentStore::connect("sqlite::memory:").await.unwrap();
    store.migrate().await.unwrap();
    Arc::new(store)
}

async fn stores() -> (tempfile::TempDir, Vec<(&'static str, Arc<dyn DocumentStore>)>) {
    let (dir, file) = sqlite_file().await;
    let stores = vec![
        ("memory", Arc::new(MemoryDocumentStore::new()) as Arc<dyn DocumentStore>),
        ("sqlite-memory", sqlite_memory().await),
        ("sqlite-file", file),
    ];
    (dir, stores)
}

#[tokio::test]
async fn test_read_your_writes() {
    let (_dir, stores) = stores().await;
    for (name, store) in stores {
        let id = store.add("cities", json!({ "name": "Campinas" })).await.unwrap();
        let doc = store.get("cities", &id).await.unwrap().expect(name);
        assert_eq!(doc.id, id, "{name}");
        assert_eq!(doc.data["name"], "Campinas", "{name}");

        assert!(store.get("cities", "missing").await.unwrap().is_none(), "{name}");
        assert!(store.get("users", &id).await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn test_ids_unique_and_list_ordered() {
    let (_dir, stores) = stores().await;
    for (name, store) in stores {
        let a = store.add("c", json!({ "n": 1 })).await.unwrap();
        let b = store.add("c", json!({ "n": 2 })).await.unwrap();
        let c = store.add("c", json!({ "n": 3 })).await.unwrap();
        assert!(a != b && b != c && a != c, "{name}");

        let ids: Vec<String> = store.list("c").await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a, b, c], "{name}");
        assert!(store.list("empty").await.unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn test_query_eq() {
    let (_dir, stores) = stores().await;
    for (name, store) in stores {
        store.add("u", json!({ "cityId": "c1", "active": true, "age": 30 })).await.unwrap();
        store.add("u", json!({ "cityId": "c2", "active": false, "age": 41 })).await.unwrap();
        store.add("u", json!({ "cityId": "c1", "active": false })).await.unwrap();

        assert_eq!(store.query_eq("u", "cityId", &json!("c1")).await.unwrap().len(), 2, "{name}");
        assert_eq!(store.query_eq("u", "active", &json!(false)).await.unwrap().len(), 2, "{name}");
        assert_eq!(store.query_eq("u", "age", &json!(41)).await.unwrap().len(), 1, "{name}");
        assert!(store.query_eq("u", "cityId", &json!("c9")).await.unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn test_query_eq_null_and_types_agree() {
    let (_dir, stores) = stores().await;
    for (name, store) in stores {
        let cleared = store.add("u", json!({ "cityId": null, "flag": true })).await.unwrap();
        store.add("u", json!({ "flag": 1 })).await.unwrap();
        store.add("u", json!({ "cityId": "c1", "flag": "true" })).await.unwrap();

        // A stored null matches; a missing field does not.
        let nulls = store.query_eq("u", "cityId", &json!(null)).await.unwrap();
        assert_eq!(nulls.len(), 1, "{name}");
        assert_eq!(nulls[0].id, cleared, "{name}");

        assert_eq!(store.query_eq("u", "flag", &json!(true)).await.unwrap().len(), 1, "{name}");
        assert_eq!(store.query_eq("u", "flag", &json!(1)).await.unwrap().len(), 1, "{name}");
        assert_eq!(store.query_eq("u", "flag", &json!("true")).await.unwrap().len(), 1, "{name}");
    }
}

#[tokio::test]
async fn test_update_merges_and_delete() {
    let (_dir, stores) = stores().await;
    for (name, store) in stores {
        let id = store.add("u", json!({ "a": 1, "b": { "x": 1 } })).await.unwrap();
        let updated = store.update("u", &id, json!({ "b": { "y": 2 }, "c": null })).await.unwrap();
        assert_eq!(serde_json::Value::Object(updated.data), json!({ "a": 1, "b": { "y": 2 }, "c": null }), "{name}");

        let reread = store.get("u", &id).await.unwrap().unwrap();
        assert_eq!(reread.data["b"], json!({ "y": 2 }), "{name}");

        let err = store.update("u", "missing", json!({})).await.unwrap_err();
        assert!(matches!(err, HeatError::NotFound { .. }), "{name}");

        assert!(store.delete("u", &id).await.unwrap(), "{name}");
        assert!(!store.delete("u", &id).await.unwrap(), "{name}");
        assert!(store.get("u", &id).await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn test_non_object_rejected() {
    let (_dir, stores) = stores().await;
    for (name, store) in stores {
        assert!(matches!(store.add("c", json!([1])).await, Err(HeatError::Storage(_))), "{name}");
    }
}

#[tokio::test]
async fn test_sqlite_file_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("dashboard.db").display());

    let id = {
        let store = SqliteDocumentStore::connect(&url).await.unwrap();
        store.migrate().await.unwrap();
        store.add("cities", json!({ "name": "Sorocaba" })).await.unwrap()
    };

    let store = SqliteDocumentStore::connect(&url).await.unwrap();
    store.migrate().await.unwrap();
    let doc = store.get("cities", &id).await.unwrap().unwrap();
    assert_eq!(doc.data["name"], "Sorocaba");
}

// === Repositories ===

fn new_user(name: &str, role: Role, city: Option<&str>) -> NewUser {
    NewUser {
        display_name: name.into(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        role,
        city_id: city.map(String::from),
    }
}

#[tokio::test]
async fn test_city_repository() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let cities = CityRepository::new(store);

    let city = cities.create(&NewCity { name: "  Campinas ".into() }).await.unwrap();
    assert_eq!(city.name, "Campinas");
    assert_eq!(cities.get(&city.id).await.unwrap(), city);
    assert_eq!(cities.list().await.unwrap(), vec![city.clone()]);

    let err = cities.create(&NewCity { name: "Ab".into() }).await.unwrap_err();
    assert!(matches!(err, HeatError::Validation(_)));
    assert_eq!(cities.list().await.unwrap().len(), 1);

    cities.delete(&city.id).await.unwrap();
    assert!(matches!(cities.get(&city.id).await, Err(HeatError::NotFound { .. })));
}

#[tokio::test]
async fn test_role_rules_reject_before_write() {
    let store = sqlite_memory().await;
    let cities = CityRepository::new(store.clone());
    let users = UserRepository::new(store.clone());
    let city = cities.create(&NewCity { name: "Campinas".into() }).await.unwrap();

    let err = users
        .create(&new_user("Ana", Role::Admin, Some(&city.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, HeatError::Validation(_)));

    let err = users.create(&new_user("Bia", Role::PublicManager, None)).await.unwrap_err();
    assert_eq!(err.to_string(), "Public managers must be associated with a city.");

    let err = users
        .create(&new_user("Caio", Role::PublicManager, Some("no-such-city")))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Selected city does not exist.");

    assert!(users.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_user_lifecycle() {
    let (_dir, store) = sqlite_file().await;
    let cities = CityRepository::new(store.clone());
    let users = UserRepository::new(store.clone());
    let city = cities.create(&NewCity { name: "Campinas".into() }).await.unwrap();

    let manager = users
        .create(&new_user("Duda", Role::PublicManager, Some(&city.id)))
        .await
        .unwrap();
    let plain = users.create(&new_user("Eli", Role::User, None)).await.unwrap();
    assert_eq!(users.get(&manager.id).await.unwrap(), manager);
    assert_eq!(users.list().await.unwrap().len(), 2);

    let in_city = users.list_by_city(&city.id).await.unwrap();
    assert_eq!(in_city.len(), 1);
    assert_eq!(in_city[0].id, manager.id);

    // Promotion to admin drops the city.
    let promoted = users
        .update(
            &manager.id,
            &UserPatch {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Admin);
    assert!(promoted.city_id.is_none());
    assert!(promoted.updated_at >= manager.updated_at);
    assert!(users.list_by_city(&city.id).await.unwrap().is_empty());

    // A rejected edit leaves the stored record untouched.
    let err = users
        .update(
            &plain.id,
            &UserPatch {
                role: Some(Role::PublicManager),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HeatError::Validation(_)));
    assert_eq!(users.get(&plain.id).await.unwrap(), plain);

    let missing = users.update("nobody", &UserPatch::default()).await.unwrap_err();
    assert!(matches!(missing, HeatError::NotFound { .. }));
}

#[tokio::test]
async fn test_city_with_users_cannot_be_deleted() {
    let (_dir, stores) = stores().await;
    for (name, store) in stores {
        let cities = CityRepository::new(store.clone());
        let users = UserRepository::new(store.clone());
        let city = cities.create(&NewCity { name: "Campinas".into() }).await.unwrap();
        let manager = users
            .create(&new_user("Fabi", Role::PublicManager, Some(&city.id)))
            .await
            .unwrap();

        let err = cities.delete(&city.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete a city that still has users.", "{name}");
        assert_eq!(cities.get(&city.id).await.unwrap(), city, "{name}");
        assert_eq!(
            users.get(&manager.id).await.unwrap().city_id.as_deref(),
            Some(city.id.as_str()),
            "{name}"
        );

        // Once the manager moves on, the city can go.
        users
            .update(
                &manager.id,
                &UserPatch {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        cities.delete(&city.id).await.unwrap();
        assert!(matches!(cities.get(&city.id).await, Err(HeatError::NotFound { .. })), "{name}");
    }
}
