//! CLI demo of the customer repository.
//!
//! # Responsibility
//! - Wire config, logging, a session factory and the customer
//!   specifications together end to end.
//! - Print deterministic output for quick local sanity checks.
//!
//! Usage: `specrepo_cli [config.json]`. Without a config file the demo runs
//! once against a scratch SQLite file and once against the memory backend.

use specrepo_core::model::{
    register_customer_specifications, Customer, CustomerCriteriaSpecification,
    CustomerQueryableSpecification, CustomerRepository, CustomerSpecification, CUSTOMER_MIGRATIONS,
};
use specrepo_core::{
    init_logging, BackendConfig, EntitySession, LoggingConfig, MemoryConfig, MemorySessionFactory,
    RepoConfig, RepoError, RepoResult, Repository, SessionFactory, Specification,
    SpecificationRegistry, SqliteConfig, SqliteSessionFactory, UnitOfWork,
};
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("specrepo_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    println!("specrepo_core version={}", specrepo_core::core_version());

    let mut registry = SpecificationRegistry::new();
    register_customer_specifications(&mut registry).map_err(|err| err.to_string())?;
    let registry = Arc::new(registry);

    let Some(config_path) = std::env::args().nth(1) else {
        init_logging(&LoggingConfig::default())?;
        let path = std::env::temp_dir().join("specrepo_demo.sqlite3");
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|err| format!("failed to reset `{}`: {err}", path.display()))?;
        }
        run_backend(&BackendConfig::Sqlite(SqliteConfig::new(path)), &registry)?;
        return run_backend(&BackendConfig::Memory(MemoryConfig::default()), &registry);
    };

    let config = RepoConfig::load(&config_path).map_err(|err| err.to_string())?;
    init_logging(&config.logging)?;
    run_backend(&config.backend, &registry)
}

fn run_backend(backend: &BackendConfig, registry: &Arc<SpecificationRegistry>) -> Result<(), String> {
    info!("event=cli_run module=cli status=start backend={backend:?}");
    let result = match backend {
        BackendConfig::Sqlite(config) => SqliteSessionFactory::new(config.clone(), CUSTOMER_MIGRATIONS)
            .and_then(|factory| demo::<_, CustomerCriteriaSpecification>("sqlite", &factory, registry)),
        BackendConfig::Memory(config) => {
            let factory = MemorySessionFactory::new(config.clone());
            demo::<_, CustomerQueryableSpecification>("memory", &factory, registry)
        }
    };
    result.map_err(|err| err.to_string())
}

fn demo<F, S>(label: &str, factory: &F, registry: &Arc<SpecificationRegistry>) -> RepoResult<()>
where
    F: SessionFactory,
    F::Session: EntitySession<Customer>,
    S: CustomerSpecification + Specification<Customer, UnitOfWork = F::Session> + 'static,
{
    {
        let session = factory.open_session()?;
        let repo = CustomerRepository::new(session.clone(), Arc::clone(registry));
        for (name, age) in [("Ada", 36), ("Grace", 45), ("Linus", 28), ("Barbara", 45)] {
            repo.insert(&Customer::new(name, age))?;
        }
        session.flush()?;
    }

    let session = factory.open_session()?;
    let repo = CustomerRepository::new(session, Arc::clone(registry));

    let ada = repo.specify::<S>()?.with_age(36).to_result()?.single()?;
    println!("[{label}] with_age(36) -> {}", ada.name);

    let mut oldest = repo.specify::<S>()?.older_than(30).order_by_name().to_result()?;
    let names = oldest
        .take(2)
        .to_list()?
        .into_iter()
        .map(|customer| customer.name)
        .collect::<Vec<_>>();
    println!("[{label}] older_than(30).take(2) -> {}", names.join(","));

    match repo.specify::<S>()?.with_age(45).to_result()?.single() {
        Err(RepoError::Cardinality(err)) => println!("[{label}] with_age(45).single -> {err}"),
        other => println!("[{label}] with_age(45).single -> unexpected {other:?}"),
    }

    println!("[{label}] total={}", repo.get_all()?.len());
    Ok(())
}
