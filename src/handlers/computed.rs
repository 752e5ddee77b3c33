//! Computed getters (spec §4.4 "Computed getters"): read-only values
//! derived from mailbox metadata or the mailbox directory, never stored
//! anywhere themselves.

use crate::attrib::{AttribClass, AttribMask};
use crate::cursor::ScopeCursor;
use crate::dt;
use crate::error::Result;
use crate::mailbox::MailboxLocation;
use crate::registry::ComputedKind;

use super::{FetchRequest, RawOutput};

pub fn get(cursor: &ScopeCursor, kind: ComputedKind, req: &FetchRequest<'_>) -> Result<Vec<RawOutput>> {
    let wants_value = req.attribs_mask.contains(AttribMask::VALUE_SHARED);
    let wants_size = req.attribs_mask.contains(AttribMask::SIZE_SHARED);
    if !wants_value && !wants_size {
        return Ok(Vec::new());
    }

    let numeric = |n: u64, out: &mut Vec<RawOutput>| {
        let text = n.to_string();
        if wants_value {
            out.push(RawOutput::shared(AttribClass::ValueShared, text.clone()));
        }
        if wants_size {
            out.push(RawOutput::shared(AttribClass::SizeShared, text));
        }
    };

    let mut out = Vec::new();
    match kind {
        ComputedKind::FreeSpace => numeric(req.mailboxes.default_partition_free_bytes(), &mut out),
        ComputedKind::Server => {
            if let Some(meta) = cursor.meta() {
                if let MailboxLocation::Remote { backend } = &meta.location {
                    if wants_value {
                        out.push(RawOutput::shared(AttribClass::ValueShared, backend.clone().into_bytes()));
                    }
                }
            }
        }
        ComputedKind::Partition => {
            if let Some(meta) = cursor.meta() {
                if let MailboxLocation::Local { partition } = &meta.location {
                    if wants_value {
                        out.push(RawOutput::shared(AttribClass::ValueShared, partition.clone().into_bytes()));
                    }
                }
            }
        }
        ComputedKind::Size => {
            if let Some(meta) = cursor.meta() {
                numeric(meta.size_bytes, &mut out);
            }
        }
        ComputedKind::LastUpdate => {
            if let Some(meta) = cursor.meta() {
                if let Some(epoch) = meta.index_mtime {
                    if let Some(formatted) = dt::format_rfc3501(epoch) {
                        if wants_value {
                            out.push(RawOutput::shared(AttribClass::ValueShared, formatted.into_bytes()));
                        }
                    }
                }
            }
        }
        ComputedKind::LastPop => {
            if let Some(meta) = cursor.meta() {
                if let Some(epoch) = meta.last_pop_login {
                    if let Some(formatted) = dt::format_rfc3501(epoch) {
                        if wants_value {
                            out.push(RawOutput::shared(AttribClass::ValueShared, formatted.into_bytes()));
                        }
                    }
                }
            }
        }
    }
    Ok(out)
}
