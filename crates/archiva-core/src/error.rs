//! Error types for Archiva

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Directory Errors
    #[error("Directory server unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Directory error: {0}")]
    Directory(String),

    // Store Errors
    #[error("The specified user does not exist: {0}")]
    NoSuchUser(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    // Validation Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal Errors
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::DirectoryUnavailable(_) => "DirectoryUnavailable",
            Error::Directory(_) => "DirectoryError",
            Error::NoSuchUser(_) => "NoSuchUser",
            Error::DatabaseError(_) => "StorageError",
            Error::InvalidConfig(_) => "InvalidConfiguration",
            Error::InternalError(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    /// Whether the fault lies with the directory server rather than local storage
    pub fn is_directory_fault(&self) -> bool {
        matches!(self, Error::DirectoryUnavailable(_) | Error::Directory(_))
    }
}
