//! Plain-text file-backed handler (spec §4.4 "get_from_file" /
//! "set_to_file"), used by the server-scope `motd` and `shutdown` entries.
//! Reads the first line and strips a trailing CR; writes atomically by
//! truncation; an absent value unlinks the file.

use crate::attrib::{AttribClass, AttribMask};
use crate::error::{AnnotateError, Result};

use super::{FetchRequest, RawOutput, StoreRequest};

pub fn get(path: &str, req: &FetchRequest<'_>) -> Result<Vec<RawOutput>> {
    if !req.attribs_mask.contains(AttribMask::VALUE_SHARED) {
        return Ok(Vec::new());
    }
    let full_path = req.file_dir.join(path);
    match std::fs::read_to_string(&full_path) {
        Ok(contents) => {
            let first_line = contents.lines().next().unwrap_or("");
            Ok(vec![RawOutput::shared(AttribClass::ValueShared, first_line.as_bytes().to_vec())])
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(AnnotateError::IoError(e.to_string())),
    }
}

pub fn set(path: &str, value: Option<&[u8]>, req: &mut StoreRequest<'_>) -> Result<()> {
    let full_path = req.file_dir.join(path);
    match value {
        Some(bytes) => {
            let tmp_path = req.file_dir.join(format!("{path}.tmp"));
            std::fs::write(&tmp_path, bytes).map_err(|e| AnnotateError::IoError(e.to_string()))?;
            std::fs::rename(&tmp_path, &full_path).map_err(|e| AnnotateError::IoError(e.to_string()))?;
        }
        None => match std::fs::remove_file(&full_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(AnnotateError::IoError(e.to_string())),
        },
    }
    Ok(())
}
