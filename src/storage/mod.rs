//! The ordered key/value database is an external collaborator (spec §1);
//! this module only specifies the trait it must implement plus an
//! in-memory implementation for tests and for consumers without a real
//! backend yet. Grounded on `aero-user/src/storage/{mod,in_memory}.rs`'s
//! `IStore`/`Selector`/`StorageError` shape.

mod mem;
pub use mem::MemStore;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Internal(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound => write!(f, "not found"),
            StorageError::Internal(msg) => write!(f, "internal storage error: {msg}"),
        }
    }
}
impl std::error::Error for StorageError {}

/// One raw, already-encoded record.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// What a fetch targets: a single key, or every key sharing a byte prefix
/// (used for wildcard scans and for the rewriter's rename/delete scans).
#[derive(Debug, Clone)]
pub enum Selector {
    Single(Vec<u8>),
    Prefix(Vec<u8>),
}

#[derive(Debug, Clone)]
pub(crate) enum Op {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// A function-scoped, buffered write transaction (spec §4.9). The store
/// engine and rewriter each open exactly one; setters never open their
/// own, they only push onto this buffer. Nothing is visible to readers
/// until [`AnnotationDb::commit`]; dropping the transaction (or calling
/// [`AnnotationDb::abort`]) discards it, matching "nothing on abort".
#[derive(Debug, Default)]
pub struct Txn {
    ops: Vec<Op>,
}

impl Txn {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(Op::Put(key, value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(Op::Delete(key));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn into_ops(self) -> Vec<Op> {
        self.ops
    }
}

#[async_trait]
pub trait AnnotationDb: Send + Sync {
    async fn fetch(&self, select: &Selector) -> Result<Vec<Entry>, StorageError>;

    fn begin(&self) -> Txn {
        Txn::new()
    }

    async fn commit(&self, txn: Txn) -> Result<(), StorageError>;

    /// Default abort is a no-op: a buffered transaction that is simply
    /// dropped never touched the database.
    async fn abort(&self, _txn: Txn) -> Result<(), StorageError> {
        Ok(())
    }
}
