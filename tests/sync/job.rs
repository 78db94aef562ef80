use anyhow::Result;
use claims::{assert_err, assert_none, assert_ok, assert_some};
use packagist_sync::{error::Error, sync::SyncJob};

use crate::helpers::{search_result, InMemoryStore, ScriptedClient, FIRST_PAGE};

#[tokio::test]
async fn test_first_run_inserts_every_package() -> Result<()> {
    // Arrange
    let client = ScriptedClient::new(FIRST_PAGE);
    client.stub_page(
        FIRST_PAGE,
        vec![
            search_result("laravel/framework"),
            search_result("spatie/laravel-permission"),
        ],
        None,
    );
    let store = InMemoryStore::new();

    // Act
    let report = assert_ok!(SyncJob::new(&client, &store).run().await);

    // Assert
    assert_eq!(report.seen, 2);
    assert_eq!(report.pruned, 0);
    assert_eq!(
        store.live_names(),
        vec![
            "laravel/framework".to_string(),
            "spatie/laravel-permission".to_string()
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_running_twice_with_unchanged_upstream_is_idempotent() -> Result<()> {
    // Arrange
    let client = ScriptedClient::new(FIRST_PAGE);
    client.stub_page(
        FIRST_PAGE,
        vec![
            search_result("laravel/framework"),
            search_result("laravel/horizon"),
        ],
        None,
    );
    let store = InMemoryStore::new();

    // Act
    let first = assert_ok!(SyncJob::new(&client, &store).run().await);
    let snapshot_after_first: Vec<_> = store
        .live_names()
        .into_iter()
        .map(|name| {
            let row = store.get(&name).unwrap();
            (row.id, row.name, row.downloads, row.favers)
        })
        .collect();

    let second = assert_ok!(SyncJob::new(&client, &store).run().await);
    let snapshot_after_second: Vec<_> = store
        .live_names()
        .into_iter()
        .map(|name| {
            let row = store.get(&name).unwrap();
            (row.id, row.name, row.downloads, row.favers)
        })
        .collect();

    // Assert
    assert_eq!(first, second);
    assert_eq!(snapshot_after_first, snapshot_after_second);

    Ok(())
}

#[tokio::test]
async fn test_package_absent_from_run_is_soft_deleted() -> Result<()> {
    // Arrange: run 1 sees {A, B}, run 2 only sees {A}.
    let store = InMemoryStore::new();

    let run_one = ScriptedClient::new(FIRST_PAGE);
    run_one.stub_page(
        FIRST_PAGE,
        vec![search_result("laravel/framework"), search_result("vendor/b")],
        None,
    );
    assert_ok!(SyncJob::new(&run_one, &store).run().await);

    let run_two = ScriptedClient::new(FIRST_PAGE);
    run_two.stub_page(FIRST_PAGE, vec![search_result("laravel/framework")], None);

    // Act
    let report = assert_ok!(SyncJob::new(&run_two, &store).run().await);

    // Assert
    assert_eq!(report.pruned, 1);
    assert_none!(store.get("laravel/framework").unwrap().deleted_at);
    assert_some!(store.get("vendor/b").unwrap().deleted_at);

    Ok(())
}

#[tokio::test]
async fn test_reappearing_package_is_restored() -> Result<()> {
    // Arrange
    let record = search_result("laravel/sanctum");
    let store = InMemoryStore::new();
    store.seed_deleted(&record);

    let client = ScriptedClient::new(FIRST_PAGE);
    client.stub_page(FIRST_PAGE, vec![record], None);

    // Act
    assert_ok!(SyncJob::new(&client, &store).run().await);

    // Assert
    assert_none!(store.get("laravel/sanctum").unwrap().deleted_at);

    Ok(())
}

#[tokio::test]
async fn test_fields_are_overwritten_and_name_is_stable() -> Result<()> {
    // Arrange
    let mut record = search_result("laravel/framework");
    record.downloads = 5;

    let store = InMemoryStore::new();
    let run_one = ScriptedClient::new(FIRST_PAGE);
    run_one.stub_page(FIRST_PAGE, vec![record.clone()], None);
    assert_ok!(SyncJob::new(&run_one, &store).run().await);

    let id_after_first = store.get("laravel/framework").unwrap().id;

    record.downloads = 9;
    record.description = "The Laravel Framework.".to_string();
    let run_two = ScriptedClient::new(FIRST_PAGE);
    run_two.stub_page(FIRST_PAGE, vec![record], None);

    // Act
    assert_ok!(SyncJob::new(&run_two, &store).run().await);

    // Assert
    let row = store.get("laravel/framework").unwrap();
    assert_eq!(row.id, id_after_first);
    assert_eq!(row.name, "laravel/framework");
    assert_eq!(row.downloads, 9);
    assert_eq!(row.description, "The Laravel Framework.");

    Ok(())
}

#[tokio::test]
async fn test_transport_failure_aborts_without_pruning() -> Result<()> {
    // Arrange: page 1 saves fine, page 2 dies on the wire.
    let client = ScriptedClient::new(FIRST_PAGE);
    client.stub_page(
        FIRST_PAGE,
        vec![search_result("laravel/framework")],
        Some("/search.json?page=2"),
    );
    client.stub_transport_failure("/search.json?page=2");
    let store = InMemoryStore::new();

    // Act
    let result = SyncJob::new(&client, &store).run().await;

    // Assert: job is fatal, page 1 writes stay committed, no pruning ran.
    let error = assert_err!(result);
    assert!(matches!(error, Error::Transport { .. }));
    assert_eq!(store.live_names(), vec!["laravel/framework".to_string()]);
    assert!(store.prune_calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_malformed_page_aborts_without_pruning() -> Result<()> {
    // Arrange: page 1 saves fine, page 2 comes back malformed.
    let client = ScriptedClient::new(FIRST_PAGE);
    client.stub_page(
        FIRST_PAGE,
        vec![search_result("laravel/framework")],
        Some("/search.json?page=2"),
    );
    client.stub_decode_failure("/search.json?page=2");
    let store = InMemoryStore::new();

    // Act
    let result = SyncJob::new(&client, &store).run().await;

    // Assert
    let error = assert_err!(result);
    assert!(matches!(error, Error::DecodePage { .. }));
    assert_eq!(store.live_names(), vec!["laravel/framework".to_string()]);
    assert!(store.prune_calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_upsert_failure_aborts_the_job() -> Result<()> {
    // Arrange
    let client = ScriptedClient::new(FIRST_PAGE);
    client.stub_page(FIRST_PAGE, vec![search_result("laravel/framework")], None);
    let store = InMemoryStore::new();
    store.fail_upserts();

    // Act
    let result = SyncJob::new(&client, &store).run().await;

    // Assert
    let error = assert_err!(result);
    assert!(matches!(error, Error::InconsistentUpsert { name } if name == "laravel/framework"));
    assert!(store.prune_calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_empty_listing_skips_pruning() -> Result<()> {
    // Arrange: first fetch returns an empty body, so no ids are ever seen.
    let client = ScriptedClient::new(FIRST_PAGE);
    client.stub_empty(FIRST_PAGE);
    let store = InMemoryStore::new();

    // Act
    let report = assert_ok!(SyncJob::new(&client, &store).run().await);

    // Assert
    assert_eq!(report.seen, 0);
    assert_eq!(report.pruned, 0);
    assert!(store.prune_calls().is_empty());

    Ok(())
}
