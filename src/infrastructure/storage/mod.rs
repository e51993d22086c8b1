//! Storage infrastructure - backend selection, pooling and migrations

mod factory;
pub mod migrations;
mod postgres;

pub use factory::{IdentityRepositories, StorageConfig, StorageFactory, StorageType};
pub use migrations::{run_identity_migrations, Migration, Migrator, PostgresMigrator};
pub(crate) use postgres::map_write_error;
pub use postgres::{connect_pool, PostgresConfig};
