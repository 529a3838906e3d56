use specrepo_core::db::{open_db_in_memory, DbError};
use specrepo_core::model::{Customer, CUSTOMER_MIGRATIONS};
use specrepo_core::{
    CardinalityError, EntitySession, FlushMode, Order, RepoError, Restriction, SessionFactory,
    SqliteConfig, SqliteSessionFactory, SqliteUnitOfWork, UnitOfWork,
};

fn session_with(customers: &[Customer]) -> SqliteUnitOfWork {
    let conn = open_db_in_memory(CUSTOMER_MIGRATIONS).unwrap();
    let session = SqliteUnitOfWork::from_connection(conn, FlushMode::Explicit);
    for customer in customers {
        session.insert(customer).unwrap();
    }
    session.flush().unwrap();
    session
}

fn people() -> Vec<Customer> {
    vec![
        Customer::new("Ada", 36),
        Customer::new("Grace", 45),
        Customer::new("Linus", 28),
        Customer::new("Barbara", 52),
        Customer::new("Alan", 41),
    ]
}

#[test]
fn factory_defaults_to_reading_own_writes() {
    let dir = tempfile::tempdir().unwrap();
    let factory =
        SqliteSessionFactory::new(SqliteConfig::new(dir.path().join("app.db")), CUSTOMER_MIGRATIONS)
            .unwrap();
    assert_eq!(factory.config().flush_mode, FlushMode::Auto);

    let session = factory.open_session().unwrap();
    let customer = Customer::new("Ada", 36);
    session.insert(&customer).unwrap();

    let all: Vec<Customer> = session.get_all().unwrap();
    assert_eq!(all, vec![customer]);
}

#[test]
fn criteria_applies_restrictions_order_and_paging() {
    let session = session_with(&people());

    let mut criteria = session.create_criteria::<Customer>();
    criteria
        .add(Restriction::ge("age", 40_i64))
        .add_order(Order::desc("age"));
    let names: Vec<String> = criteria
        .list()
        .unwrap()
        .into_iter()
        .map(|customer| customer.name)
        .collect();
    assert_eq!(names, ["Barbara", "Grace", "Alan"]);

    criteria.set_first_result(1).set_max_results(1);
    let page = criteria.list().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "Grace");
}

#[test]
fn criteria_supports_like_and_null_checks() {
    let session = session_with(&people());

    let mut starts_with_a = session.create_criteria::<Customer>();
    starts_with_a
        .add(Restriction::like("name", "A%"))
        .add(Restriction::is_not_null("age"))
        .add_order(Order::asc("name"));
    let names: Vec<String> = starts_with_a
        .list()
        .unwrap()
        .into_iter()
        .map(|customer| customer.name)
        .collect();
    assert_eq!(names, ["Ada", "Alan"]);

    let mut nameless = session.create_criteria::<Customer>();
    nameless.add(Restriction::is_null("name"));
    assert!(nameless.list().unwrap().is_empty());
}

#[test]
fn criteria_rejects_unmapped_columns() {
    let session = session_with(&[]);

    let mut criteria = session.create_criteria::<Customer>();
    criteria.add(Restriction::eq("email; DROP TABLE customers", "x".to_string()));
    assert!(matches!(
        criteria.list(),
        Err(RepoError::InvalidMapping(_))
    ));
}

#[test]
fn unique_result_distinguishes_absent_from_ambiguous() {
    let session = session_with(&people());

    let mut ada = session.create_criteria::<Customer>();
    ada.add(Restriction::eq("name", "Ada".to_string()));
    assert_eq!(ada.unique_result().unwrap().map(|c| c.age), Some(36));

    let mut nobody = session.create_criteria::<Customer>();
    nobody.add(Restriction::gt("age", 200_i64));
    assert_eq!(nobody.unique_result().unwrap(), None);

    let mut adults = session.create_criteria::<Customer>();
    adults.add(Restriction::gt("age", 18_i64));
    assert!(matches!(
        adults.unique_result(),
        Err(RepoError::Cardinality(CardinalityError::MultipleMatches))
    ));
}

#[test]
fn cloned_criteria_are_independent() {
    let session = session_with(&people());

    let mut base = session.create_criteria::<Customer>();
    base.add(Restriction::lt("age", 50_i64));
    let mut narrowed = base.clone();
    narrowed.set_max_results(2);

    assert_eq!(base.max_results(), None);
    assert_eq!(base.list().unwrap().len(), 4);
    assert_eq!(narrowed.list().unwrap().len(), 2);
}

#[test]
fn failing_flush_leaves_no_partial_writes() {
    let session = session_with(&[]);
    let first = Customer::new("Ada", 36);
    let mut clash = Customer::new("Grace", 45);
    clash.id = first.id;

    session.insert(&first).unwrap();
    session.insert(&clash).unwrap();
    let err = session.flush().unwrap_err();
    assert!(matches!(err, RepoError::Db(DbError::Sqlite(_))));

    let all: Vec<Customer> = session.get_all().unwrap();
    assert!(all.is_empty());
    assert!(!session.has_pending_changes());
}

#[test]
fn delete_of_missing_row_is_not_found() {
    let session = session_with(&[]);
    session.delete(&Customer::new("Ghost", 1)).unwrap();

    match session.flush().unwrap_err() {
        RepoError::NotFound { entity, .. } => assert_eq!(entity, "Customer"),
        other => panic!("unexpected error: {other}"),
    }
}
