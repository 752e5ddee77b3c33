//! Persistent, transactional annotation store for an IMAP server: typed
//! metadata attached to the server, a mailbox, or a message, mediated
//! through a registry of entry definitions with per-entry access control,
//! proxy routing, and specialized getter/setter behavior.

pub mod acl;
pub mod attrib;
pub mod config;
pub mod cursor;
pub mod dt;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod key;
pub mod mailbox;
pub mod pattern;
pub mod proxy;
pub mod registry;
pub mod rewrite;
pub mod store;
pub mod storage;
pub mod value;

use std::path::PathBuf;

pub use error::{AnnotateError, Result};

use fetch::{FetchScope, FetchSink};
use mailbox::MailboxDirectory;
use proxy::ProxyHooks;
use registry::Registry;
use storage::{AnnotationDb, Entry, Selector, Txn};
use store::{EntryUpdate, StoreScope, SyncLog};

/// Process-scoped lifecycle (component C9): the database handle and
/// registry are opened once at [`AnnotationStore::open`] and held for
/// the life of the process; every consumer-facing operation borrows
/// them explicitly rather than touching global state.
pub struct AnnotationStore {
    registry: Registry,
    db: Box<dyn AnnotationDb>,
    mailboxes: Box<dyn MailboxDirectory>,
    proxy: Option<Box<dyn ProxyHooks>>,
    file_dir: PathBuf,
}

impl AnnotationStore {
    /// Builds the registry from compiled-in tables plus an optional
    /// entry-definition file (spec §4.3), and opens the backing database.
    pub fn open(
        config: &config::StoreConfig,
        entry_definitions: Option<&str>,
        db: Box<dyn AnnotationDb>,
        mailboxes: Box<dyn MailboxDirectory>,
        proxy: Option<Box<dyn ProxyHooks>>,
    ) -> Result<Self> {
        let mut registry = Registry::with_builtins();
        if let Some(text) = entry_definitions {
            config::load_entry_definitions(&mut registry, text).map_err(|e| AnnotateError::Internal(e.to_string()))?;
        }
        tracing::info!(file_dir = %config.file_dir.display(), "annotation store opened");
        Ok(Self {
            registry,
            db,
            mailboxes,
            proxy,
            file_dir: config.file_dir.clone(),
        })
    }

    /// Process shutdown; consumes the handle since nothing may use it
    /// afterwards.
    pub fn close(self) {
        tracing::info!("annotation store closed");
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn fetch(
        &self,
        scope: FetchScope<'_>,
        entry_patterns: &[&str],
        attrib_names: &[&str],
        requester: &str,
        is_admin: bool,
        max_size: Option<usize>,
        oversize: &mut usize,
        sink: &mut dyn FetchSink,
    ) -> Result<()> {
        fetch::fetch(
            &self.registry,
            scope,
            entry_patterns,
            attrib_names,
            self.db.as_ref(),
            self.mailboxes.as_ref(),
            &self.file_dir,
            requester,
            is_admin,
            self.proxy.as_deref(),
            max_size,
            oversize,
            sink,
        )
        .await
    }

    pub async fn store(
        &self,
        scope: StoreScope<'_>,
        updates: &[EntryUpdate<'_>],
        requester: &str,
        is_admin: bool,
        sync_log: &mut dyn SyncLog,
    ) -> Result<()> {
        store::store(
            &self.registry,
            scope,
            updates,
            self.db.as_ref(),
            self.mailboxes.as_ref(),
            &self.file_dir,
            requester,
            is_admin,
            self.proxy.as_deref(),
            sync_log,
        )
        .await
    }

    /// A direct, unmediated read of one record, bypassing the registry
    /// and ACL checks entirely (spec §6 `lookup`).
    pub async fn lookup(&self, mailbox: &str, uid: u32, entry: &str, user_id: &str) -> Result<Option<Vec<u8>>> {
        let (full_key, _) = key::encode(mailbox, uid, entry, Some(user_id));
        let found = self.db.fetch(&Selector::Single(full_key)).await?;
        match found.into_iter().next() {
            Some(Entry { value, .. }) => Ok(Some(key::decode_value(&value)?)),
            None => Ok(None),
        }
    }

    /// A direct, unmediated write of one record onto a caller-supplied
    /// transaction (spec §6 `write_entry`); `value = None` deletes.
    pub fn write_entry(&self, mailbox: &str, entry: &str, user_id: &str, value: Option<&[u8]>, txn: &mut Txn) -> Result<()> {
        let (full_key, _) = key::encode(mailbox, 0, entry, Some(user_id));
        match value {
            Some(bytes) => txn.put(full_key, key::encode_value(bytes)),
            None => txn.delete(full_key),
        }
        Ok(())
    }

    pub async fn rename_mailbox(
        &self,
        old_mailbox: &str,
        new_mailbox: &str,
        old_user_id: Option<&str>,
        new_user_id: Option<&str>,
    ) -> Result<()> {
        rewrite::rename_mailbox(self.db.as_ref(), old_mailbox, new_mailbox, old_user_id, new_user_id).await
    }

    pub async fn delete_mailbox(&self, mailbox: &str) -> Result<()> {
        rewrite::delete_mailbox(self.db.as_ref(), mailbox).await
    }

    pub async fn copy_message(
        &self,
        old_mailbox: &str,
        old_uid: u32,
        new_mailbox: &str,
        new_uid: u32,
        user_id: Option<&str>,
    ) -> Result<()> {
        rewrite::copy_message(self.db.as_ref(), old_mailbox, old_uid, new_mailbox, new_uid, user_id).await
    }

    pub fn begin(&self) -> Txn {
        self.db.begin()
    }

    pub async fn commit(&self, txn: Txn) -> Result<()> {
        self.db.commit(txn).await.map_err(Into::into)
    }

    pub async fn abort(&self, txn: Txn) -> Result<()> {
        self.db.abort(txn).await.map_err(Into::into)
    }
}
