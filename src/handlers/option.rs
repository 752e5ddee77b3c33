//! Mailbox-option-bit handler (spec §4.4 "get_mailbox_option" /
//! "set_mailbox_option"), backing `pop3newuidl` and `sharedseen`.

use crate::attrib::{AttribClass, AttribMask};
use crate::cursor::ScopeCursor;
use crate::error::{AnnotateError, Result};

use super::{FetchRequest, RawOutput, StoreRequest};

pub fn get(cursor: &ScopeCursor, bit: u32, req: &FetchRequest<'_>) -> Result<Vec<RawOutput>> {
    if !req.attribs_mask.contains(AttribMask::VALUE_SHARED) {
        return Ok(Vec::new());
    }
    let Some(meta) = cursor.meta() else {
        return Ok(Vec::new());
    };
    let value = if meta.options & bit != 0 { "true" } else { "false" };
    Ok(vec![RawOutput::shared(AttribClass::ValueShared, value.as_bytes().to_vec())])
}

/// Requires ACL rights `lookup|write`; clears or sets the bit and marks
/// the mailbox index dirty when the bit actually changes.
pub fn set(cursor: &ScopeCursor, bit: u32, value: Option<&[u8]>, req: &mut StoreRequest<'_>) -> Result<()> {
    let set_bit = match value {
        None => false,
        Some(bytes) => bytes == b"true",
    };
    req.mailboxes
        .set_option_bit(cursor.mailbox_name(), bit, set_bit)
        .map_err(|_| AnnotateError::IoError("failed to update mailbox option bit".into()))
}
