/// File-backed store tests
///
/// Run with: cargo test --test file_store_tests
use memopersist::{
    ContextConfig, Customer, CustomerRepository, DbError, DurabilityMode, EntityId, EntityRef,
    Repository, Store, Value, file_context,
};
use tempfile::TempDir;

fn config(dir: &TempDir, durability: DurabilityMode) -> ContextConfig {
    ContextConfig::new()
        .data_dir(dir.path())
        .durability(durability)
}

#[test]
fn test_flushed_rows_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();

    let mut ctx = file_context::<Customer>(config(&temp_dir, DurabilityMode::Sync)).unwrap();
    let customer = EntityRef::new(Customer::new("first", "last"));
    ctx.persist(&customer).unwrap();
    ctx.commit().unwrap();

    let mut reopened = file_context::<Customer>(config(&temp_dir, DurabilityMode::Sync)).unwrap();
    let found = reopened.find(EntityId(1)).unwrap().unwrap();
    assert_eq!(found.borrow().first_name(), "first");
}

#[test]
fn test_unflushed_changes_are_not_persisted() {
    let temp_dir = TempDir::new().unwrap();

    let mut ctx = file_context::<Customer>(config(&temp_dir, DurabilityMode::Sync)).unwrap();
    ctx.persist(&EntityRef::new(Customer::new("first", "last"))).unwrap();
    drop(ctx);

    let reopened = file_context::<Customer>(config(&temp_dir, DurabilityMode::Sync)).unwrap();
    assert_eq!(reopened.store().row_count().unwrap(), 0);
}

#[test]
fn test_sequence_continues_after_reopen() {
    let temp_dir = TempDir::new().unwrap();

    let mut ctx = file_context::<Customer>(config(&temp_dir, DurabilityMode::Sync)).unwrap();
    Repository::new(&mut ctx)
        .save_all([Customer::new("a", "x"), Customer::new("b", "x")])
        .unwrap();
    ctx.commit().unwrap();

    let mut ctx = file_context::<Customer>(config(&temp_dir, DurabilityMode::Sync)).unwrap();
    let third = Repository::new(&mut ctx)
        .save(Customer::new("c", "y"))
        .unwrap();
    assert_eq!(third.id(), Some(EntityId(3)));
}

#[test]
fn test_manual_durability_needs_checkpoint() {
    let temp_dir = TempDir::new().unwrap();

    let mut ctx = file_context::<Customer>(config(&temp_dir, DurabilityMode::None)).unwrap();
    ctx.persist(&EntityRef::new(Customer::new("a", "b"))).unwrap();
    ctx.flush().unwrap();
    assert_eq!(ctx.store().row_count().unwrap(), 1);
    assert!(!ctx.store().snapshot_path().exists());

    ctx.store().checkpoint().unwrap();
    drop(ctx);

    let mut reopened = file_context::<Customer>(config(&temp_dir, DurabilityMode::None)).unwrap();
    let found = Repository::new(&mut reopened)
        .find_by_last_name("b")
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_lifecycle_against_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = file_context::<Customer>(config(&temp_dir, DurabilityMode::Sync)).unwrap();

    let customer = EntityRef::new(Customer::new("first", "last"));
    ctx.persist(&customer).unwrap();
    ctx.flush().unwrap();

    customer.borrow_mut().update_name("new first", "new last");
    ctx.flush().unwrap();
    let row = ctx.store().find(EntityId(1)).unwrap().unwrap();
    assert_eq!(row["first_name"], Value::from("new first"));

    ctx.remove(&customer).unwrap();
    ctx.flush().unwrap();
    drop(ctx);

    let reopened = file_context::<Customer>(config(&temp_dir, DurabilityMode::Sync)).unwrap();
    assert_eq!(reopened.store().row_count().unwrap(), 0);
}

#[test]
fn test_failed_checkpoint_leaves_write_retryable() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");
    let config = || {
        ContextConfig::new()
            .data_dir(&data_dir)
            .durability(DurabilityMode::Sync)
    };

    let mut ctx = file_context::<Customer>(config()).unwrap();
    let customer = EntityRef::new(Customer::new("first", "last"));
    ctx.persist(&customer).unwrap();

    // A plain file where the data directory should be makes the checkpoint fail.
    std::fs::write(&data_dir, b"").unwrap();
    let err = ctx.flush().unwrap_err();
    assert!(matches!(err.root_cause(), DbError::IoError(_)));
    assert_eq!(ctx.store().row_count().unwrap(), 0);
    assert!(ctx.is_dirty().unwrap());

    std::fs::remove_file(&data_dir).unwrap();
    assert_eq!(ctx.flush().unwrap().inserted, 1);
    drop(ctx);

    let reopened = file_context::<Customer>(config()).unwrap();
    assert_eq!(reopened.store().row_count().unwrap(), 1);
}
