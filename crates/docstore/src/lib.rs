//! Document persistence for cities and users.
//!
//! [`DocumentStore`] is a small collection/document API over JSON objects,
//! with a SQLite implementation for deployments and an in-memory one for
//! tests and local runs. The repositories on top validate and timestamp the
//! typed records before anything is written.

pub mod memory;
pub mod repository;
pub mod sqlite;
pub mod store;

pub use memory::MemoryDocumentStore;
pub use repository::{CityRepository, UserRepository, CITIES, USERS};
pub use sqlite::SqliteDocumentStore;
pub use store::{shallow_merge, Document, DocumentStore};
