//! Repositorios
//!
//! Frontera de persistencia: el trait `ResourceDirectory` y sus dos
//! implementaciones (PostgreSQL y memoria).

pub mod memory_directory;
pub mod postgres_directory;
pub mod resource_directory;

pub use memory_directory::InMemoryResourceDirectory;
pub use postgres_directory::PgResourceDirectory;
pub use resource_directory::{DirectoryTx, DispatchCounts, OutboxStore, ResourceDirectory};
