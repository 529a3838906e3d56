use specrepo_core::model::Customer;
use specrepo_core::{
    EntitySession, FlushMode, MemoryConfig, MemorySessionFactory, RepoError, SessionFactory,
    Transaction, UnitOfWork,
};

fn factory_with(customers: &[Customer]) -> MemorySessionFactory {
    let factory = MemorySessionFactory::new(MemoryConfig::default());
    let session = factory.open_session().unwrap();
    for customer in customers {
        session.insert(customer).unwrap();
    }
    session.flush().unwrap();
    factory
}

#[test]
fn factory_defaults_to_explicit_flush() {
    let factory = MemorySessionFactory::new(MemoryConfig::default());
    assert_eq!(factory.config().flush_mode, FlushMode::Explicit);

    let session = factory.open_session().unwrap();
    assert_eq!(session.flush_mode(), FlushMode::Explicit);
    session.insert(&Customer::new("Ada", 36)).unwrap();

    let all: Vec<Customer> = session.get_all().unwrap();
    assert!(all.is_empty());
}

#[test]
fn sessions_share_the_factory_store() {
    let factory = factory_with(&[Customer::new("Ada", 36)]);
    let cloned = factory.clone();

    let all: Vec<Customer> = cloned.open_session().unwrap().get_all().unwrap();
    assert_eq!(all.len(), 1);

    let separate = MemorySessionFactory::new(MemoryConfig::default());
    let none: Vec<Customer> = separate.open_session().unwrap().get_all().unwrap();
    assert!(none.is_empty());
}

#[test]
fn query_composes_lazily_over_stored_entities() {
    let factory = factory_with(&[
        Customer::new("Ada", 36),
        Customer::new("Grace", 45),
        Customer::new("Linus", 28),
    ]);
    let session = factory.open_session().unwrap();

    let adults_by_age = session
        .query::<Customer>()
        .filter(|customer| customer.age > 30)
        .order_by_descending(|customer| customer.age);
    let names: Vec<String> = adults_by_age
        .to_list()
        .unwrap()
        .into_iter()
        .map(|customer| customer.name)
        .collect();
    assert_eq!(names, ["Grace", "Ada"]);

    session.insert(&Customer::new("Barbara", 52)).unwrap();
    session.flush().unwrap();
    assert_eq!(adults_by_age.count().unwrap(), 3);
    assert_eq!(adults_by_age.skip(1).take(1).single().unwrap().name, "Grace");
}

#[test]
fn duplicate_insert_fails_at_flush_and_keeps_store_intact() {
    let ada = Customer::new("Ada", 36);
    let factory = factory_with(&[ada.clone()]);
    let session = factory.open_session().unwrap();

    session.insert(&Customer::new("Grace", 45)).unwrap();
    session.insert(&ada).unwrap();
    assert!(matches!(
        session.flush(),
        Err(RepoError::DuplicateKey { .. })
    ));

    let all: Vec<Customer> = session.get_all().unwrap();
    assert_eq!(all, vec![ada]);
}

#[test]
fn transaction_work_is_private_until_commit() {
    let factory = factory_with(&[]);
    let writer = factory.open_session().unwrap();
    let reader = factory.open_session().unwrap();
    let customer = Customer::new("Ada", 36);

    let tx = writer.begin_transaction().unwrap();
    writer.insert(&customer).unwrap();
    writer.flush().unwrap();

    let inside: Vec<Customer> = writer.get_all().unwrap();
    let outside: Vec<Customer> = reader.get_all().unwrap();
    assert_eq!(inside, vec![customer.clone()]);
    assert!(outside.is_empty());

    tx.commit().unwrap();
    let committed: Vec<Customer> = reader.get_all().unwrap();
    assert_eq!(committed, vec![customer]);
}

#[test]
fn auto_flush_session_reads_inside_transaction() {
    let factory = MemorySessionFactory::new(MemoryConfig::default().with_flush_mode(FlushMode::Auto));
    let session = factory.open_session().unwrap();
    let customer = Customer::new("Ada", 36);

    let tx = session.begin_transaction().unwrap();
    session.insert(&customer).unwrap();
    let staged: Option<Customer> = session.get_by_id(&customer.id).unwrap();
    assert_eq!(staged, Some(customer.clone()));

    tx.rollback().unwrap();
    let discarded: Option<Customer> = session.get_by_id(&customer.id).unwrap();
    assert_eq!(discarded, None);
}
