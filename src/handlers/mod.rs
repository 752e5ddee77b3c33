//! Handler set (component C4): one module per concrete getter/setter
//! strategy, dispatched through the tagged [`crate::registry::HandlerKind`]
//! rather than a function-pointer-plus-rock pair (spec §9). Grounded on
//! the get/set signature of spec §4.4 and the per-call context struct
//! shape of `aero-proto/src/imap/command/authenticated.rs`.

pub mod computed;
pub mod db;
pub mod file;
pub mod option;
pub mod pop3;
pub mod special_use;

use std::path::Path;

use crate::attrib::{AttribClass, AttribMask};
use crate::cursor::ScopeCursor;
use crate::error::Result;
use crate::mailbox::MailboxDirectory;
use crate::registry::HandlerKind;
use crate::storage::{AnnotationDb, Txn};

/// Read-only context shared by every getter for the duration of one fetch
/// call.
pub struct FetchRequest<'a> {
    pub db: &'a dyn AnnotationDb,
    pub mailboxes: &'a dyn MailboxDirectory,
    pub file_dir: &'a Path,
    pub requester: &'a str,
    pub is_admin: bool,
    /// The attribute classes the caller asked for (spec §4.6 step 1);
    /// handlers only emit outputs for classes present in this mask.
    pub attribs_mask: AttribMask,
}

/// Mutable context shared by every setter for the duration of one store
/// call, carrying the single transaction the store engine opened.
pub struct StoreRequest<'a> {
    pub db: &'a dyn AnnotationDb,
    pub mailboxes: &'a dyn MailboxDirectory,
    pub file_dir: &'a Path,
    pub requester: &'a str,
    pub is_admin: bool,
    pub txn: &'a mut Txn,
}

/// One `(owner, attribute class, value)` triple a getter produces before
/// the fetch engine groups and dedups it. `owner` is empty for shared
/// records, the owning user-id for private ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub owner: String,
    pub class: AttribClass,
    pub value: Vec<u8>,
}

impl RawOutput {
    fn shared(class: AttribClass, value: impl Into<Vec<u8>>) -> Self {
        RawOutput {
            owner: String::new(),
            class,
            value: value.into(),
        }
    }
}

pub async fn get(
    handler: &HandlerKind,
    cursor: &ScopeCursor,
    entry_name: &str,
    req: &FetchRequest<'_>,
) -> Result<Vec<RawOutput>> {
    match handler {
        HandlerKind::Db => db::get(cursor, entry_name, req).await,
        HandlerKind::File { path } => file::get(path, req),
        HandlerKind::MailboxOption { bit } => option::get(cursor, *bit, req),
        HandlerKind::Pop3ShowAfter => pop3::get(cursor, req),
        HandlerKind::SpecialUse => special_use::get(cursor, req),
        HandlerKind::Computed { kind } => computed::get(cursor, *kind, req),
    }
}

pub async fn set(
    handler: &HandlerKind,
    cursor: &ScopeCursor,
    entry_name: &str,
    class: AttribClass,
    value: Option<&[u8]>,
    req: &mut StoreRequest<'_>,
) -> Result<()> {
    match handler {
        HandlerKind::Db => db::set(cursor, entry_name, class, value, req).await,
        HandlerKind::File { path } => file::set(path, value, req),
        HandlerKind::MailboxOption { bit } => option::set(cursor, *bit, value, req),
        HandlerKind::Pop3ShowAfter => pop3::set(cursor, value, req),
        HandlerKind::SpecialUse => special_use::set(cursor, value, req),
        HandlerKind::Computed { .. } => {
            Err(crate::error::AnnotateError::Internal("computed entries have no setter".into()))
        }
    }
}
