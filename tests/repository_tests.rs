/// Repository tests
///
/// Run with: cargo test --test repository_tests
use memopersist::{
    ContextConfig, Customer, CustomerRepository, EntityId, EntityRef, EntityState, FlushMode,
    Repository, Store, Value, in_memory_context, in_memory_context_with_config,
};

#[test]
fn test_save_then_find_all_assigns_first_key() {
    let (mut ctx, _) = in_memory_context::<Customer>();
    let mut repo = Repository::new(&mut ctx);

    repo.save(Customer::new("test", "test")).unwrap();
    let customers = repo.find_all().unwrap();

    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].id(), Some(EntityId(1)));
}

#[test]
fn test_find_all_flushes_in_auto_mode() {
    let (mut ctx, store) = in_memory_context::<Customer>();
    let mut repo = Repository::new(&mut ctx);
    let saved = repo.save(Customer::new("a", "b")).unwrap();

    let found = repo.find_all().unwrap();
    assert_eq!(store.row_count().unwrap(), 1);
    assert!(found[0].ptr_eq(&saved));
}

#[test]
fn test_find_all_in_commit_mode_includes_pending_without_writing() {
    let config = ContextConfig::new().flush_mode(FlushMode::Commit);
    let (mut ctx, store) = in_memory_context_with_config::<Customer>(config);
    let mut repo = Repository::new(&mut ctx);
    let saved = repo.save(Customer::new("a", "b")).unwrap();

    let found = repo.find_all().unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].ptr_eq(&saved));
    assert_eq!(store.row_count().unwrap(), 0);
}

#[test]
fn test_find_by_last_name() {
    let (mut ctx, _) = in_memory_context::<Customer>();
    let mut repo = Repository::new(&mut ctx);
    repo.save_all([
        Customer::new("Jack", "Bauer"),
        Customer::new("Chloe", "O'Brian"),
        Customer::new("Kim", "Bauer"),
        Customer::new("David", "Palmer"),
    ])
    .unwrap();

    let bauers = repo.find_by_last_name("Bauer").unwrap();
    let firsts: Vec<String> = bauers
        .iter()
        .map(|c| c.borrow().first_name().to_string())
        .collect();
    assert_eq!(firsts, vec!["Jack", "Kim"]);
    assert!(repo.find_by_last_name("Almeida").unwrap().is_empty());
}

#[test]
fn test_find_by_last_name_sees_managed_rename() {
    let (mut ctx, _) = in_memory_context::<Customer>();
    let mut repo = Repository::new(&mut ctx);
    let saved = repo.save(Customer::new("Jack", "Bauer")).unwrap();
    repo.find_all().unwrap();

    saved.borrow_mut().update_name("Jack", "Smith");
    assert!(repo.find_by_last_name("Bauer").unwrap().is_empty());
    assert_eq!(repo.find_by_last_name("Smith").unwrap().len(), 1);
}

#[test]
fn test_save_detached_entity_merges() {
    let (mut ctx, store) = in_memory_context::<Customer>();
    let original = EntityRef::new(Customer::new("a", "b"));
    {
        let mut repo = Repository::new(&mut ctx);
        repo.save(original.clone()).unwrap();
        repo.find_all().unwrap();
    }
    ctx.detach(&original).unwrap();
    original.borrow_mut().update_name("c", "d");

    let mut repo = Repository::new(&mut ctx);
    let saved = repo.save(original.clone()).unwrap();
    assert!(!saved.ptr_eq(&original));
    assert_eq!(repo.count().unwrap(), 1);

    let row = store.find(EntityId(1)).unwrap().unwrap();
    assert_eq!(row["first_name"], Value::from("c"));
}

#[test]
fn test_find_by_id_and_exists() {
    let (mut ctx, _) = in_memory_context::<Customer>();
    let mut repo = Repository::new(&mut ctx);
    let saved = repo.save(Customer::new("a", "b")).unwrap();

    let found = repo.find_by_id(EntityId(1)).unwrap().unwrap();
    assert!(found.ptr_eq(&saved));
    assert!(repo.exists_by_id(EntityId(1)).unwrap());
    assert!(!repo.exists_by_id(EntityId(2)).unwrap());

    let some = repo
        .find_all_by_id([EntityId(1), EntityId(2)])
        .unwrap();
    assert_eq!(some.len(), 1);
}

#[test]
fn test_delete_is_applied_on_next_query() {
    let (mut ctx, store) = in_memory_context::<Customer>();
    let mut repo = Repository::new(&mut ctx);
    let saved = repo.save(Customer::new("a", "b")).unwrap();
    assert_eq!(repo.count().unwrap(), 1);

    repo.delete(&saved).unwrap();
    assert_eq!(store.row_count().unwrap(), 1);
    assert_eq!(repo.count().unwrap(), 0);
    assert_eq!(store.row_count().unwrap(), 0);
}

#[test]
fn test_delete_detached_entity() {
    let (mut ctx, store) = in_memory_context::<Customer>();
    let saved = {
        let mut repo = Repository::new(&mut ctx);
        let saved = repo.save(Customer::new("a", "b")).unwrap();
        repo.find_all().unwrap();
        saved
    };
    ctx.clear();
    assert_eq!(ctx.state_of(&saved).unwrap(), EntityState::Detached);

    Repository::new(&mut ctx).delete(&saved).unwrap();
    ctx.flush().unwrap();
    assert_eq!(store.row_count().unwrap(), 0);
}

#[test]
fn test_delete_transient_entity_is_ignored() {
    let (mut ctx, _) = in_memory_context::<Customer>();
    let mut repo = Repository::new(&mut ctx);
    let transient = EntityRef::new(Customer::new("a", "b"));
    repo.delete(&transient).unwrap();
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn test_delete_by_id_and_delete_all() {
    let (mut ctx, store) = in_memory_context::<Customer>();
    let mut repo = Repository::new(&mut ctx);
    repo.save_all([
        Customer::new("a", "x"),
        Customer::new("b", "x"),
        Customer::new("c", "x"),
    ])
    .unwrap();
    assert_eq!(repo.count().unwrap(), 3);

    repo.delete_by_id(EntityId(2)).unwrap();
    assert_eq!(repo.count().unwrap(), 2);

    repo.delete_all().unwrap();
    assert_eq!(repo.count().unwrap(), 0);
    assert_eq!(store.stats().deletes, 3);
}
