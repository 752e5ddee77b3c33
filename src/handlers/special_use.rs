//! Special-use handler (spec §4.4 "get_special_use" / "set_special_use").

use crate::attrib::{AttribClass, AttribMask};
use crate::cursor::ScopeCursor;
use crate::error::{AnnotateError, Result};
use crate::mailbox;

use super::{FetchRequest, RawOutput, StoreRequest};

pub fn get(cursor: &ScopeCursor, req: &FetchRequest<'_>) -> Result<Vec<RawOutput>> {
    if !req.attribs_mask.contains(AttribMask::VALUE_SHARED) {
        return Ok(Vec::new());
    }
    let Some(meta) = cursor.meta() else {
        return Ok(Vec::new());
    };
    let Some(value) = &meta.special_use else {
        return Ok(Vec::new());
    };
    Ok(vec![RawOutput::shared(AttribClass::ValueShared, value.as_bytes().to_vec())])
}

/// Validates against the fixed special-use set; an absent value clears
/// it. Rejection is a `BadValue`, not a silent omission, since this runs
/// on the store path.
pub fn set(cursor: &ScopeCursor, value: Option<&[u8]>, req: &mut StoreRequest<'_>) -> Result<()> {
    let canonical = match value {
        None => None,
        Some(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|_| AnnotateError::BadValue)?;
            Some(mailbox::canonicalize_special_use(text).ok_or(AnnotateError::BadValue)?.to_string())
        }
    };
    req.mailboxes
        .set_special_use(cursor.mailbox_name(), canonical)
        .map_err(|_| AnnotateError::IoError("failed to update special-use value".into()))
}
