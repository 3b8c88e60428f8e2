//! # Driver Module
//!
//! Backend drivers turn a database schema into service code. Each driver is an
//! [`OrmGenerator`]: a set of generation hooks the pipeline calls in a fixed order.
//! Drivers are looked up by name in a [`DriverRegistry`], which is built once at
//! process entry ([`default_registry`]) and passed down explicitly.
//!
//! ## Default drivers
//!
//! | name       | dialect  | schema source                      |
//! |------------|----------|------------------------------------|
//! | `sqlite`   | SQLite   | live database                      |
//! | `postgres` | Postgres | live database                      |
//! | `mysql`    | MySQL    | live database                      |
//! | `tidb`     | MySQL    | live database                      |
//! | `declared` | any      | schema document at the DSN path    |

mod dialect;
mod introspect;
mod sql;

pub use dialect::Dialect;
pub use introspect::{
    DeclaredIntrospector, DeclaredSchema, MysqlIntrospector, PostgresIntrospector,
    SchemaIntrospector, SqliteIntrospector,
};
pub use sql::SqlGenerator;

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::error::{GenError, Result};
use crate::meta::{load_document, ServiceMeta};

/// Generation hooks of one backend; every hook defaults to doing nothing
pub trait OrmGenerator {
    /// Connect, introspect and keep what later hooks need
    fn initialize(&mut self, _config: &GeneratorConfig) -> Result<()> {
        Ok(())
    }

    /// Service trait file
    fn generate_service(&mut self) -> Result<()> {
        Ok(())
    }

    /// Service implementation file
    fn generate_service_impl(&mut self) -> Result<()> {
        Ok(())
    }

    /// DTO, model and query files
    fn generate_dto(&mut self) -> Result<()> {
        Ok(())
    }

    /// RPC implementation for `service`
    fn generate_rpc_impl(&mut self, _service: &ServiceMeta) -> Result<()> {
        Ok(())
    }
}

type Constructor = Box<dyn Fn() -> Box<dyn OrmGenerator> + Send + Sync>;

/// Name-keyed table of backend constructors
#[derive(Default)]
pub struct DriverRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}

impl DriverRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`; an existing registration is replaced
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn OrmGenerator> + Send + Sync + 'static,
    {
        let name = name.into();
        if self
            .constructors
            .insert(name.clone(), Box::new(constructor))
            .is_some()
        {
            debug!(driver = %name, "Replaced driver registration");
        }
    }

    /// Construct the generator registered under `name`
    ///
    /// # Errors
    ///
    /// [`GenError::UnsupportedDriver`] when nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn OrmGenerator>> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| GenError::UnsupportedDriver {
                name: name.to_string(),
            })
    }

    /// Registered names in order
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

/// Registry with every built-in driver
pub fn default_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    registry.register("sqlite", || Box::new(SqlGenerator::new(SqliteIntrospector)));
    registry.register("postgres", || {
        Box::new(SqlGenerator::new(PostgresIntrospector))
    });
    registry.register("mysql", || {
        Box::new(SqlGenerator::new(MysqlIntrospector::new("mysql")))
    });
    registry.register("tidb", || {
        Box::new(SqlGenerator::new(MysqlIntrospector::new("tidb")))
    });
    registry.register("declared", || {
        Box::new(SqlGenerator::new(DeclaredIntrospector::default()))
    });
    registry
}

/// Run every generation hook of the configured driver
///
/// The configuration is validated and the driver resolved before anything is read
/// or written, so configuration errors leave the target directory untouched.
///
/// # Errors
///
/// The first error of any hook; later hooks do not run.
pub fn run_pipeline(registry: &DriverRegistry, config: &GeneratorConfig) -> Result<()> {
    config.validate()?;
    let mut generator = registry.resolve(&config.driver)?;
    let service: Option<ServiceMeta> = match (&config.service, config.grpc) {
        (Some(path), true) => Some(load_document(path)?),
        _ => None,
    };

    info!(driver = %config.driver, dir = %config.dir.display(), "Generating");
    generator.initialize(config)?;
    generator.generate_dto()?;
    generator.generate_service()?;
    generator.generate_service_impl()?;
    if let Some(service) = &service {
        generator.generate_rpc_impl(service)?;
    }
    Ok(())
}
