//! Store engine (component C7, spec §4.7).

use std::collections::HashSet;
use std::path::Path;

use crate::acl::AclRights;
use crate::attrib::{classify, AttribClass};
use crate::cursor::{ScopeCursor, ScopeKind};
use crate::error::{AnnotateError, Result};
use crate::handlers::{self, StoreRequest};
use crate::mailbox::{MailboxDirectory, MailboxLocation};
use crate::proxy::ProxyHooks;
use crate::registry::{EntryDescriptor, Registry};
use crate::storage::{AnnotationDb, Txn};
use crate::value;

#[derive(Debug, Clone, Copy)]
pub enum StoreScope<'a> {
    Server,
    Mailbox { pattern: &'a str },
    Message { mailbox: &'a str, uid: u32 },
}

pub struct EntryUpdate<'a> {
    pub entry_name: &'a str,
    pub attributes: Vec<(&'a str, Option<&'a [u8]>)>,
}

pub trait SyncLog {
    fn log(&mut self, mailbox: &str);
}

impl<F: FnMut(&str)> SyncLog for F {
    fn log(&mut self, mailbox: &str) {
        self(mailbox)
    }
}

struct Resolved<'a> {
    descriptor: EntryDescriptor,
    entry_name: &'a str,
    values: Vec<(AttribClass, Option<Vec<u8>>)>,
}

/// Classifies and canonicalises every update up front (spec §4.7 steps
/// 1-3), before any transaction is opened, so a validation failure never
/// touches storage.
fn resolve_and_validate<'a>(registry: &Registry, scope_kind: ScopeKind, updates: &'a [EntryUpdate<'a>]) -> Result<Vec<Resolved<'a>>> {
    let mut resolved = Vec::with_capacity(updates.len());
    for update in updates {
        let descriptor = registry
            .find_exact(scope_kind, update.entry_name)
            .filter(|d| d.has_setter())
            .cloned()
            .ok_or(AnnotateError::PermissionDenied)?;

        let mut values = Vec::with_capacity(update.attributes.len());
        for (attribute_name, raw_value) in &update.attributes {
            // Bare "value"/"size" alias to *both* bits of their kind (spec
            // §6: "alias to one or two bits of attribs_mask"); `classify`
            // returns a single class, so special-case the bare names here.
            let classes: Vec<AttribClass> = match *attribute_name {
                "value" => vec![AttribClass::ValueShared, AttribClass::ValuePriv],
                "size" => vec![AttribClass::SizeShared, AttribClass::SizePriv],
                _ => match classify(attribute_name) {
                    AttribClass::Deprecated => {
                        tracing::warn!(
                            entry = update.entry_name,
                            attribute = *attribute_name,
                            "ignoring deprecated attribute name in store"
                        );
                        continue;
                    }
                    other => vec![other],
                },
            };

            for class in classes {
                match class {
                    AttribClass::ValueShared | AttribClass::ValuePriv => {
                        if !descriptor.allowed_attribs.contains(class.mask_bit()) {
                            return Err(AnnotateError::PermissionDenied);
                        }
                    }
                    AttribClass::SizeShared | AttribClass::SizePriv | AttribClass::Unknown | AttribClass::Deprecated => {
                        return Err(AnnotateError::PermissionDenied);
                    }
                }

                let canonical = match raw_value {
                    None => None,
                    Some(bytes) => {
                        let text = std::str::from_utf8(bytes).map_err(|_| AnnotateError::BadValue)?;
                        Some(
                            value::canonicalize(descriptor.value_type, text)
                                .map_err(|_| AnnotateError::BadValue)?
                                .into_bytes(),
                        )
                    }
                };
                values.push((class, canonical));
            }
        }

        resolved.push(Resolved {
            descriptor,
            entry_name: update.entry_name,
            values,
        });
    }
    Ok(resolved)
}

#[allow(clippy::too_many_arguments)]
pub async fn store(
    registry: &Registry,
    scope: StoreScope<'_>,
    updates: &[EntryUpdate<'_>],
    db: &dyn AnnotationDb,
    mailboxes: &dyn MailboxDirectory,
    file_dir: &Path,
    requester: &str,
    is_admin: bool,
    proxy: Option<&dyn ProxyHooks>,
    sync_log: &mut dyn SyncLog,
) -> Result<()> {
    let scope_kind = match scope {
        StoreScope::Server => ScopeKind::Server,
        StoreScope::Mailbox { .. } => ScopeKind::Mailbox,
        StoreScope::Message { .. } => ScopeKind::Message,
    };

    let resolved = resolve_and_validate(registry, scope_kind, updates)?;

    let mut txn = db.begin();
    let outcome = match scope {
        StoreScope::Server => store_server(&resolved, is_admin, db, mailboxes, file_dir, requester, &mut txn, sync_log).await,
        StoreScope::Mailbox { pattern } => {
            store_mailbox(pattern, &resolved, db, mailboxes, file_dir, requester, is_admin, proxy, &mut txn, sync_log).await
        }
        StoreScope::Message { mailbox, uid } => {
            store_message(mailbox, uid, &resolved, db, mailboxes, file_dir, requester, is_admin, &mut txn, sync_log).await
        }
    };

    match outcome {
        Ok(()) => {
            db.commit(txn).await?;
            Ok(())
        }
        Err(e) => {
            db.abort(txn).await?;
            Err(e)
        }
    }
}

/// Shared server annotations require admin; private ones require nothing
/// beyond authentication (spec §4.7 step 5).
#[allow(clippy::too_many_arguments)]
async fn store_server<'a>(
    resolved: &[Resolved<'a>],
    is_admin: bool,
    db: &dyn AnnotationDb,
    mailboxes: &dyn MailboxDirectory,
    file_dir: &Path,
    requester: &str,
    txn: &mut Txn,
    sync_log: &mut dyn SyncLog,
) -> Result<()> {
    let cursor = ScopeCursor::Server;
    for entry in resolved {
        for (class, value) in &entry.values {
            if *class == AttribClass::ValueShared && !is_admin {
                return Err(AnnotateError::PermissionDenied);
            }
            let mut req = StoreRequest {
                db,
                mailboxes,
                file_dir,
                requester,
                is_admin,
                txn,
            };
            handlers::set(&entry.descriptor.handler, &cursor, entry.entry_name, *class, value.as_deref(), &mut req).await?;
        }
    }
    sync_log.log("");
    Ok(())
}

/// Shared mailbox annotations require `read|write` plus the entry's
/// `extra_acl_bits`; private ones require only `lookup` (spec §4.7 step
/// 6). Remote mailboxes are skipped locally and proxied once per
/// distinct backend.
#[allow(clippy::too_many_arguments)]
async fn store_mailbox<'a>(
    pattern: &str,
    resolved: &[Resolved<'a>],
    db: &dyn AnnotationDb,
    mailboxes: &dyn MailboxDirectory,
    file_dir: &Path,
    requester: &str,
    is_admin: bool,
    proxy: Option<&dyn ProxyHooks>,
    txn: &mut Txn,
    sync_log: &mut dyn SyncLog,
) -> Result<()> {
    let names = mailboxes.list(pattern);
    if names.is_empty() {
        return Err(AnnotateError::MailboxNonexistent);
    }

    let mut dispatched_backends = HashSet::new();
    for internal_name in names {
        let Some(meta) = mailboxes.lookup(&internal_name) else {
            continue;
        };

        if let MailboxLocation::Remote { backend } = &meta.location {
            if dispatched_backends.insert(backend.clone()) {
                if let Some(hooks) = proxy {
                    hooks.proxy_store(backend, &meta.external_name).await?;
                }
            }
            continue;
        }

        let acl = meta.acl;
        let external_name = meta.external_name.clone();
        let cursor = ScopeCursor::Mailbox { meta };

        for entry in resolved {
            for (class, value) in &entry.values {
                let required = match class {
                    AttribClass::ValueShared => AclRights::READ | AclRights::WRITE | entry.descriptor.extra_acl_bits,
                    AttribClass::ValuePriv => AclRights::LOOKUP,
                    _ => AclRights::NONE,
                };
                if !acl.contains(required) {
                    return Err(AnnotateError::PermissionDenied);
                }
                let mut req = StoreRequest {
                    db,
                    mailboxes,
                    file_dir,
                    requester,
                    is_admin,
                    txn,
                };
                handlers::set(&entry.descriptor.handler, &cursor, entry.entry_name, *class, value.as_deref(), &mut req).await?;
            }
        }
        sync_log.log(&external_name);
    }
    Ok(())
}

/// Message-scope ACL is not enforced at this layer (spec §9 open
/// question: left as an upstream TODO, policy not imposed here).
#[allow(clippy::too_many_arguments)]
async fn store_message<'a>(
    mailbox: &str,
    uid: u32,
    resolved: &[Resolved<'a>],
    db: &dyn AnnotationDb,
    mailboxes: &dyn MailboxDirectory,
    file_dir: &Path,
    requester: &str,
    is_admin: bool,
    txn: &mut Txn,
    sync_log: &mut dyn SyncLog,
) -> Result<()> {
    let meta = mailboxes.lookup(mailbox).ok_or(AnnotateError::MailboxNonexistent)?;
    let external_name = meta.external_name.clone();
    let cursor = ScopeCursor::Message { meta, uid };

    for entry in resolved {
        for (class, value) in &entry.values {
            let mut req = StoreRequest {
                db,
                mailboxes,
                file_dir,
                requester,
                is_admin,
                txn,
            };
            handlers::set(&entry.descriptor.handler, &cursor, entry.entry_name, *class, value.as_deref(), &mut req).await?;
        }
    }
    sync_log.log(&external_name);
    Ok(())
}
