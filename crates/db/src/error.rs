//! Error handling for the shelf data layer

use mongodb::error::{ErrorKind, WriteFailure};
use shelf_kernel::FieldViolation;
use thiserror::Error;

/// Server code for a write rejected by a collection validator.
const DOCUMENT_VALIDATION_FAILURE: i32 = 121;
/// Server code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Errors raised by the stores and the typed collection layer
#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to connect to {uri}: {source}")]
    Connect {
        uri: String,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("unsupported database uri '{0}'; expected mongodb://, mongodb+srv:// or memory://")]
    UnsupportedUri(String),

    #[error("validation failed for {collection}: {message}")]
    Validation {
        collection: String,
        violations: Vec<FieldViolation>,
        message: String,
    },

    #[error("duplicate key in {collection}: {message}")]
    DuplicateKey { collection: String, message: String },

    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),

    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

impl DbError {
    /// Create a validation error from field violations
    pub fn validation(collection: impl Into<String>, violations: Vec<FieldViolation>) -> Self {
        let message = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self::Validation {
            collection: collection.into(),
            violations,
            message,
        }
    }

    /// Create a duplicate key error
    pub fn duplicate_key(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DuplicateKey {
            collection: collection.into(),
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Classify a driver error raised by a write against `collection`.
    ///
    /// Server-side validator rejections carry no per-field detail, so
    /// `violations` is empty and the server message is kept.
    pub(crate) fn from_write(collection: &str, err: mongodb::error::Error) -> Self {
        write_error_code(&err)
            .and_then(|(code, message)| classify_write(collection, code, message))
            .unwrap_or_else(|| Self::Driver(err))
    }
}

/// Map a server write error code onto a typed error, if it has one.
fn classify_write(collection: &str, code: i32, message: String) -> Option<DbError> {
    match code {
        DOCUMENT_VALIDATION_FAILURE => Some(DbError::Validation {
            collection: collection.to_string(),
            violations: Vec::new(),
            message,
        }),
        DUPLICATE_KEY => Some(DbError::duplicate_key(collection, message)),
        _ => None,
    }
}

fn write_error_code(err: &mongodb::error::Error) -> Option<(i32, String)> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            Some((write_error.code, write_error.message.clone()))
        }
        ErrorKind::InsertMany(insert_error) => insert_error
            .write_errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|write_error| (write_error.code, write_error.message.clone())),
        _ => None,
    }
}
