//! Fetch engine (component C6, spec §4.6).

use std::collections::HashSet;
use std::path::Path;

use crate::attrib::{classify, AttribClass, AttribMask};
use crate::cursor::{ScopeCursor, ScopeKind};
use crate::error::Result;
use crate::handlers::{self, FetchRequest};
use crate::mailbox::MailboxDirectory;
use crate::mailbox::MailboxLocation;
use crate::pattern::Pattern;
use crate::proxy::ProxyHooks;
use crate::registry::{EntryDescriptor, ProxyKind, Registry};
use crate::storage::AnnotationDb;

pub enum FetchScope<'a> {
    Server,
    Mailbox { pattern: &'a str },
    Message { mailbox: &'a str, uid: u32 },
}

/// One flushed group: every `(attribute_name, value)` pair observed for a
/// single `(mailbox, uid, entry)` tuple, in visit order (spec §4.6
/// "Grouping").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValueList {
    pub mailbox: String,
    pub uid: u32,
    pub entry: String,
    pub values: Vec<(String, Vec<u8>)>,
}

pub trait FetchSink {
    fn emit(&mut self, list: AttributeValueList);
}

impl<F: FnMut(AttributeValueList)> FetchSink for F {
    fn emit(&mut self, list: AttributeValueList) {
        self(list)
    }
}

fn attrib_class_name(class: AttribClass) -> &'static str {
    match class {
        AttribClass::ValueShared => "value.shared",
        AttribClass::ValuePriv => "value.priv",
        AttribClass::SizeShared => "size.shared",
        AttribClass::SizePriv => "size.priv",
        AttribClass::Deprecated | AttribClass::Unknown => "",
    }
}

/// Bare `"value"`/`"size"` alias to *both* the shared and priv bit of
/// their kind (spec §6: "alias to one or two bits of `attribs_mask`");
/// `classify` returns a single `AttribClass` and so cannot express that
/// on its own, hence the special case here ahead of the `match`.
fn compile_attribs_mask(attribs: &[&str]) -> AttribMask {
    let mut mask = AttribMask::NONE;
    for name in attribs {
        match *name {
            "value" => mask = mask | AttribMask::VALUE_SHARED | AttribMask::VALUE_PRIV,
            "size" => mask = mask | AttribMask::SIZE_SHARED | AttribMask::SIZE_PRIV,
            _ => match classify(name) {
                AttribClass::Deprecated => {
                    tracing::warn!(attribute = *name, "ignoring deprecated attribute name in fetch");
                }
                AttribClass::Unknown => {}
                other => mask = mask | other.mask_bit(),
            },
        }
    }
    mask
}

/// Resolves one entry-name pattern against the registry's named entries
/// (spec §4.6 step 2). Returns the selected descriptors (cloned, since
/// the catch-all is synthesized rather than stored) and whether proxy
/// fallback is enabled for this pattern.
fn resolve_handlers(registry: &Registry, scope: ScopeKind, pattern_str: &str) -> (Vec<EntryDescriptor>, bool) {
    let pattern = Pattern::new(pattern_str, '/');
    let mut selected: Vec<EntryDescriptor> = registry.find_matching(scope, &pattern).into_iter().cloned().collect();

    let exact_non_proxy_only = selected
        .iter()
        .any(|e| e.name == pattern_str && e.proxy_kind != ProxyKind::ProxyOnly);
    let exact_match_exists = selected.iter().any(|e| e.name == pattern_str);

    if !exact_match_exists {
        selected.push(registry.catch_all(scope));
    }

    (selected, !exact_non_proxy_only)
}

struct Grouper<'s> {
    sink: &'s mut dyn FetchSink,
    current: Option<AttributeValueList>,
}

impl<'s> Grouper<'s> {
    fn new(sink: &'s mut dyn FetchSink) -> Self {
        Self { sink, current: None }
    }

    fn push(&mut self, mailbox: &str, uid: u32, entry: &str, attribute_name: &str, value: Vec<u8>) {
        let same_group = self
            .current
            .as_ref()
            .is_some_and(|g| g.mailbox == mailbox && g.uid == uid && g.entry == entry);
        if !same_group {
            self.flush();
            self.current = Some(AttributeValueList {
                mailbox: mailbox.to_string(),
                uid,
                entry: entry.to_string(),
                values: Vec::new(),
            });
        }
        self.current.as_mut().unwrap().values.push((attribute_name.to_string(), value));
    }

    fn flush(&mut self) {
        if let Some(group) = self.current.take() {
            self.sink.emit(group);
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn fetch(
    registry: &Registry,
    scope: FetchScope<'_>,
    entry_patterns: &[&str],
    attrib_names: &[&str],
    db: &dyn AnnotationDb,
    mailboxes: &dyn MailboxDirectory,
    file_dir: &Path,
    requester: &str,
    is_admin: bool,
    proxy: Option<&dyn ProxyHooks>,
    max_size: Option<usize>,
    oversize: &mut usize,
    sink: &mut dyn FetchSink,
) -> Result<()> {
    let attribs_mask = compile_attribs_mask(attrib_names);
    if attribs_mask.is_empty() {
        return Ok(());
    }

    let req = FetchRequest {
        db,
        mailboxes,
        file_dir,
        requester,
        is_admin,
        attribs_mask,
    };

    let scope_kind = match scope {
        FetchScope::Server => ScopeKind::Server,
        FetchScope::Mailbox { .. } => ScopeKind::Mailbox,
        FetchScope::Message { .. } => ScopeKind::Message,
    };

    let mut dedup: HashSet<String> = HashSet::new();
    let mut grouper = Grouper::new(sink);
    let mut dispatched_backends: HashSet<String> = HashSet::new();

    match scope {
        FetchScope::Server => {
            for pattern_str in entry_patterns {
                let (selected, _proxy_fallback) = resolve_handlers(registry, scope_kind, pattern_str);
                let has_wildcard = Pattern::new(pattern_str, '/').is_wildcard();
                let cursor = ScopeCursor::Server;
                for descriptor in &selected {
                    emit_for_descriptor(&req, &cursor, pattern_str, descriptor, has_wildcard, "", 0, max_size, oversize, &mut dedup, &mut grouper).await?;
                }
            }
        }
        FetchScope::Mailbox { pattern } => {
            for internal_name in mailboxes.list(pattern) {
                let Some(meta) = mailboxes.lookup(&internal_name) else {
                    continue;
                };
                let external_name = meta.external_name.clone();
                let is_remote = matches!(meta.location, MailboxLocation::Remote { .. });
                let cursor = ScopeCursor::Mailbox { meta };

                for pattern_str in entry_patterns {
                    let (selected, proxy_fallback) = resolve_handlers(registry, scope_kind, pattern_str);
                    let has_wildcard = Pattern::new(pattern_str, '/').is_wildcard();
                    let proxy_applicable = selected.iter().any(|e| e.proxy_kind != ProxyKind::ProxyOnly);

                    for descriptor in &selected {
                        emit_for_descriptor(
                            &req,
                            &cursor,
                            pattern_str,
                            descriptor,
                            has_wildcard,
                            &external_name,
                            0,
                            max_size,
                            oversize,
                            &mut dedup,
                            &mut grouper,
                        )
                        .await?;
                    }

                    if proxy_fallback && proxy_applicable && is_remote {
                        if let MailboxLocation::Remote { backend } = &cursor.meta().unwrap().location {
                            if dispatched_backends.insert(backend.clone()) {
                                if let Some(hooks) = proxy {
                                    hooks.proxy_fetch(backend, &external_name).await?;
                                }
                            }
                        }
                    }
                }
            }
        }
        FetchScope::Message { mailbox, uid } => {
            let Some(meta) = mailboxes.lookup(mailbox) else {
                return Ok(());
            };
            let external_name = meta.external_name.clone();
            let cursor = ScopeCursor::Message { meta, uid };
            for pattern_str in entry_patterns {
                let (selected, _proxy_fallback) = resolve_handlers(registry, scope_kind, pattern_str);
                let has_wildcard = Pattern::new(pattern_str, '/').is_wildcard();
                for descriptor in &selected {
                    emit_for_descriptor(&req, &cursor, pattern_str, descriptor, has_wildcard, &external_name, uid, max_size, oversize, &mut dedup, &mut grouper).await?;
                }
            }
        }
    }

    grouper.flush();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn emit_for_descriptor(
    req: &FetchRequest<'_>,
    cursor: &ScopeCursor,
    pattern_str: &str,
    descriptor: &EntryDescriptor,
    has_wildcard: bool,
    external_mailbox: &str,
    uid: u32,
    max_size: Option<usize>,
    oversize: &mut usize,
    dedup: &mut HashSet<String>,
    grouper: &mut Grouper<'_>,
) -> Result<()> {
    // The catch-all descriptor carries no name of its own; its handler
    // scans the database keyed by the pattern text itself.
    let lookup_name = if descriptor.name.is_empty() { pattern_str } else { &descriptor.name };

    let outputs = handlers::get(&descriptor.handler, cursor, lookup_name, req).await?;

    let is_db_like = matches!(descriptor.handler, crate::registry::HandlerKind::Db);
    let mut seen_classes = crate::attrib::AttribMask::NONE;

    for output in &outputs {
        seen_classes = seen_classes | output.class.mask_bit();
        push_output(lookup_name, external_mailbox, uid, output.clone(), max_size, oversize, dedup, grouper);
    }

    if is_db_like && !has_wildcard {
        synthesize_nils(req, lookup_name, external_mailbox, uid, seen_classes, dedup, grouper);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn push_output(
    entry_name: &str,
    external_mailbox: &str,
    uid: u32,
    output: handlers::RawOutput,
    max_size: Option<usize>,
    oversize: &mut usize,
    dedup: &mut HashSet<String>,
    grouper: &mut Grouper<'_>,
) {
    let is_value_class = matches!(output.class, AttribClass::ValueShared | AttribClass::ValuePriv);
    if is_value_class {
        if let Some(cap) = max_size {
            if cap > 0 && output.value.len() > cap {
                if output.value.len() > *oversize {
                    *oversize = output.value.len();
                }
                return;
            }
        }
    }

    let dedup_key = format!("{external_mailbox}\0UID{uid}/{entry_name}\0{}\0{:?}", output.owner, output.class);
    if !dedup.insert(dedup_key) {
        return;
    }

    grouper.push(external_mailbox, uid, entry_name, attrib_class_name(output.class), output.value);
}

fn synthesize_nils(
    req: &FetchRequest<'_>,
    entry_name: &str,
    external_mailbox: &str,
    uid: u32,
    seen_classes: crate::attrib::AttribMask,
    dedup: &mut HashSet<String>,
    grouper: &mut Grouper<'_>,
) {
    let candidates = [
        (AttribMask::VALUE_SHARED, AttribClass::ValueShared, String::new()),
        (AttribMask::VALUE_PRIV, AttribClass::ValuePriv, req.requester.to_string()),
        (AttribMask::SIZE_SHARED, AttribClass::SizeShared, String::new()),
        (AttribMask::SIZE_PRIV, AttribClass::SizePriv, req.requester.to_string()),
    ];
    for (bit, class, owner) in candidates {
        if req.attribs_mask.contains(bit) && !seen_classes.contains(bit) {
            let dedup_key = format!("{external_mailbox}\0UID{uid}/{entry_name}\0{owner}\0{class:?}");
            if dedup.insert(dedup_key) {
                grouper.push(external_mailbox, uid, entry_name, attrib_class_name(class), Vec::new());
            }
        }
    }
}
