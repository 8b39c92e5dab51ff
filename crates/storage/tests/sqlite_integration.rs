use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_round_trips_and_overwrites_values() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get("quizState_cw-1").await.unwrap(), None);

    repo.put("quizState_cw-1", r#"{"answers":[null]}"#).await.unwrap();
    repo.put("quizState_cw-1", r#"{"answers":["A"]}"#).await.unwrap();
    assert_eq!(
        repo.get("quizState_cw-1").await.unwrap().as_deref(),
        Some(r#"{"answers":["A"]}"#)
    );

    assert!(repo.delete("quizState_cw-1").await.unwrap());
    assert!(!repo.delete("quizState_cw-1").await.unwrap());
    assert_eq!(repo.get("quizState_cw-1").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_prefix_listing_treats_underscore_literally() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_prefix?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.put("quizState_b", "1").await.unwrap();
    repo.put("quizState_a", "1").await.unwrap();
    repo.put("quizStateXa", "1").await.unwrap();
    repo.put("chat_messages", "1").await.unwrap();

    let keys = repo.keys_with_prefix("quizState_").await.unwrap();
    assert_eq!(keys, ["quizState_a", "quizState_b"]);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let url = "sqlite:file:memdb_kv_migrate?mode=memory&cache=shared";
    let repo = SqliteRepository::connect(url).await.expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let storage = Storage::sqlite(url).await.expect("storage");
    storage.local.put("k", "v").await.unwrap();
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
}
