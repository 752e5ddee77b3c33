//! Error taxonomy (spec §7), as a `thiserror`-derived enum — grounded on
//! `aero-proto/src/imap/command/authenticated.rs`'s `CommandError`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotateError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("bad value")]
    BadValue,
    #[error("malformed annotation key")]
    BadEntry,
    #[error("no mailbox matched the given pattern")]
    MailboxNonexistent,
    #[error("malformed request to the store engine")]
    ProtocolBad,
    #[error("storage I/O error: {0}")]
    IoError(String),
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AnnotateError>;

impl From<crate::key::KeyError> for AnnotateError {
    fn from(_: crate::key::KeyError) -> Self {
        AnnotateError::BadEntry
    }
}

impl From<crate::storage::StorageError> for AnnotateError {
    fn from(e: crate::storage::StorageError) -> Self {
        match e {
            crate::storage::StorageError::NotFound => {
                AnnotateError::Internal("unexpected NotFound surfaced to caller".into())
            }
            crate::storage::StorageError::Internal(msg) => AnnotateError::IoError(msg),
        }
    }
}
