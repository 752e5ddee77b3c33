//! The database-backed handler (spec §4.4 "get_from_db" / "set_to_db"):
//! the catch-all behind every entry that has no specialized strategy.

use crate::attrib::{AttribClass, AttribMask};
use crate::cursor::ScopeCursor;
use crate::error::Result;
use crate::key;
use crate::storage::Selector;

use super::{FetchRequest, RawOutput, StoreRequest};

/// Builds a prefix key for the cursor, iterates the database, and emits
/// one output per matching record whose user-id is either empty (shared)
/// or the requesting user (private). Malformed keys are logged and
/// skipped rather than failing the whole fetch (spec §7).
pub async fn get(cursor: &ScopeCursor, entry_name: &str, req: &FetchRequest<'_>) -> Result<Vec<RawOutput>> {
    let (prefix, _) = key::encode(cursor.mailbox_name(), cursor.uid(), entry_name, None);
    let entries = req.db.fetch(&Selector::Prefix(prefix)).await?;

    let mut out = Vec::new();
    for record in entries {
        let decoded = match key::decode(&record.key) {
            Ok(d) => d,
            Err(_) => {
                tracing::warn!(entry = entry_name, "skipping malformed annotation key during fetch");
                continue;
            }
        };
        let value = match key::decode_value(&record.value) {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(entry = entry_name, "skipping malformed annotation value during fetch");
                continue;
            }
        };

        if decoded.user_id.is_empty() {
            if req.attribs_mask.contains(AttribMask::VALUE_SHARED) {
                out.push(RawOutput::shared(AttribClass::ValueShared, value.clone()));
            }
            if req.attribs_mask.contains(AttribMask::SIZE_SHARED) {
                out.push(RawOutput::shared(AttribClass::SizeShared, value.len().to_string()));
            }
        } else if decoded.user_id == req.requester {
            if req.attribs_mask.contains(AttribMask::VALUE_PRIV) {
                out.push(RawOutput {
                    owner: decoded.user_id.clone(),
                    class: AttribClass::ValuePriv,
                    value: value.clone(),
                });
            }
            if req.attribs_mask.contains(AttribMask::SIZE_PRIV) {
                out.push(RawOutput {
                    owner: decoded.user_id.clone(),
                    class: AttribClass::SizePriv,
                    value: value.len().to_string().into_bytes(),
                });
            }
        }
        // Records owned by someone else are neither shared nor ours; the
        // spec's private-isolation property requires they stay invisible.
    }
    Ok(out)
}

/// Writes, or deletes when `value` is absent, the shared or private
/// record for this entry (spec invariant 6: absent means delete).
pub async fn set(
    cursor: &ScopeCursor,
    entry_name: &str,
    class: AttribClass,
    value: Option<&[u8]>,
    req: &mut StoreRequest<'_>,
) -> Result<()> {
    let user_id = match class {
        AttribClass::ValueShared => "",
        AttribClass::ValuePriv => req.requester,
        _ => return Err(crate::error::AnnotateError::Internal("db setter received a non-value class".into())),
    };
    let (key, _) = key::encode(cursor.mailbox_name(), cursor.uid(), entry_name, Some(user_id));
    match value {
        Some(bytes) => req.txn.put(key, key::encode_value(bytes)),
        None => req.txn.delete(key),
    }
    Ok(())
}
