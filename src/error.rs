use crate::model::EntityKind;
use crate::validate::ValidationError;
use std::io;
use std::path::PathBuf;

pub type Result<T, E = RecordsError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} id {id:?} already exists")]
    DuplicateIdentifier { kind: EntityKind, id: String },
    #[error("{kind} {id:?} not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RecordsError {
    pub fn not_found(kind: EntityKind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Stable error code carried in IPC error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(v) => v.code(),
            Self::DuplicateIdentifier { .. } => "duplicate_identifier",
            Self::NotFound { .. } => "not_found",
            Self::MalformedDocument(_) => "malformed_document",
            Self::FileNotFound(_) => "file_not_found",
            Self::Write { .. } => "write_failed",
        }
    }
}
