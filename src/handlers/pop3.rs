//! POP3-show-after handler (spec §4.4 "get_pop3_show_after" /
//! "set_pop3_show_after"). Stored on the mailbox record, not in the
//! annotation database.

use crate::attrib::{AttribClass, AttribMask};
use crate::cursor::ScopeCursor;
use crate::dt;
use crate::error::{AnnotateError, Result};

use super::{FetchRequest, RawOutput, StoreRequest};

pub fn get(cursor: &ScopeCursor, req: &FetchRequest<'_>) -> Result<Vec<RawOutput>> {
    if !req.attribs_mask.contains(AttribMask::VALUE_SHARED) {
        return Ok(Vec::new());
    }
    let Some(meta) = cursor.meta() else {
        return Ok(Vec::new());
    };
    let Some(epoch) = meta.pop3_show_after else {
        return Ok(Vec::new());
    };
    match dt::format_rfc3501(epoch) {
        Some(formatted) => Ok(vec![RawOutput::shared(AttribClass::ValueShared, formatted.into_bytes())]),
        None => Ok(Vec::new()),
    }
}

/// An absent value zeroes the field.
pub fn set(cursor: &ScopeCursor, value: Option<&[u8]>, req: &mut StoreRequest<'_>) -> Result<()> {
    let epoch = match value {
        None => None,
        Some(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|_| AnnotateError::BadValue)?;
            Some(dt::parse_rfc3501(text).map_err(|_| AnnotateError::BadValue)?)
        }
    };
    req.mailboxes
        .set_pop3_show_after(cursor.mailbox_name(), epoch)
        .map_err(|_| AnnotateError::IoError("failed to update pop3showafter".into()))
}
