use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// Returns `true` when the store itself is unusable (cannot be opened,
    /// is not a database, or fails at the I/O level), as opposed to a single
    /// statement being rejected.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Database(e) => is_connection_failure(e),
            Self::InvalidData(_) => false,
        }
    }
}

/// Classify a raw `rusqlite` error as a storage-unavailable condition.
pub fn is_connection_failure(err: &rusqlite::Error) -> bool {
    use rusqlite::ErrorCode;

    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
        ),
        rusqlite::Error::InvalidPath(_) => true,
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, Error>;
