//! School records engine: students, instructors and courses with
//! bidirectional links, JSON and SQLite persistence, CSV export and backups.
//! The `schoold` binary serves it over a JSON-lines protocol on stdio.

pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod ipc;
pub mod model;
pub mod registry;
pub mod snapshot;
pub mod validate;

pub use error::{RecordsError, Result};
pub use model::{Course, Entity, EntityKind, Instructor, Person, Student};
pub use registry::Registry;
