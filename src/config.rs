//! Configuration (component C11, ambient). `StoreConfig` is a small TOML
//! document loaded with `serde`, grounded on the `toml`-based config
//! loaders used throughout the teacher workspace. The entry-definition
//! file (spec §4.3, §6) is a different, line-oriented comma-separated
//! format and is hand-parsed rather than forced through `toml`.

use std::path::PathBuf;

use serde::Deserialize;

use crate::acl::AclRights;
use crate::attrib::AttribMask;
use crate::cursor::ScopeKind;
use crate::registry::{attrib_from_token, proxy_kind_from_token, value_type_from_token, ConfigError, Registry};
#[cfg(test)]
use crate::registry::{ProxyKind, ValueType};

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the plain-text, file-backed server entries
    /// (`motd`, `shutdown`).
    pub file_dir: PathBuf,
    /// Optional default cap on fetched value size (spec §4.6 "Size cap");
    /// `0` or absent means uncapped.
    #[serde(default)]
    pub max_fetch_size: u32,
}

impl StoreConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryConfigError {
    Config(ConfigError),
    MalformedLine { line_no: usize, text: String },
}

impl std::fmt::Display for EntryConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryConfigError::Config(e) => write!(f, "{e}"),
            EntryConfigError::MalformedLine { line_no, text } => {
                write!(f, "line {line_no}: malformed entry definition: {text}")
            }
        }
    }
}
impl std::error::Error for EntryConfigError {}

fn scope_from_token(token: &str) -> Result<ScopeKind, ConfigError> {
    match token {
        "server" => Ok(ScopeKind::Server),
        "mailbox" => Ok(ScopeKind::Mailbox),
        "message" => Ok(ScopeKind::Message),
        other => Err(ConfigError::UnknownToken(other.to_string())),
    }
}

fn acl_from_token(token: &str) -> Result<AclRights, ConfigError> {
    let mut mask = AclRights::NONE;
    for ch in token.chars() {
        let bit = match ch {
            'l' => AclRights::LOOKUP,
            'r' => AclRights::READ,
            'w' => AclRights::WRITE,
            'i' => AclRights::INSERT,
            'p' => AclRights::POST,
            'c' => AclRights::CREATE,
            'd' => AclRights::DELETE,
            'a' => AclRights::ADMIN,
            '-' => AclRights::NONE,
            _ => return Err(ConfigError::UnknownToken(ch.to_string())),
        };
        mask = mask | bit;
    }
    Ok(mask)
}

/// Parses the entry-definition config file (spec §6): one definition per
/// line, `name, scope, value_type, proxy_kind, attribute_list, acl_mask`.
/// Blank lines and lines starting with `#` are comments.
pub fn load_entry_definitions(registry: &mut Registry, text: &str) -> Result<(), EntryConfigError> {
    for (idx, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 6 {
            return Err(EntryConfigError::MalformedLine {
                line_no: idx + 1,
                text: raw_line.to_string(),
            });
        }

        let name = fields[0];
        let scope = scope_from_token(fields[1]).map_err(EntryConfigError::Config)?;
        let value_type = value_type_from_token(fields[2]).map_err(EntryConfigError::Config)?;
        let proxy_kind = proxy_kind_from_token(fields[3]).map_err(EntryConfigError::Config)?;

        let mut attribs = AttribMask::NONE;
        if !fields[4].is_empty() {
            for token in fields[4].split('|').map(str::trim) {
                attribs = attribs | attrib_from_token(token).map_err(EntryConfigError::Config)?;
            }
        }

        let acl = acl_from_token(fields[5]).map_err(EntryConfigError::Config)?;

        registry
            .register_config_line(name, scope, value_type, proxy_kind, attribs, acl)
            .map_err(EntryConfigError::Config)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_line() {
        let mut registry = Registry::with_builtins();
        load_entry_definitions(&mut registry, "/custom, mailbox, string, backend, value.shared|value.priv, lrw\n").unwrap();
        let found = registry.find_exact(ScopeKind::Mailbox, "/custom").unwrap();
        assert_eq!(found.value_type, ValueType::String);
        assert_eq!(found.proxy_kind, ProxyKind::BackendOnly);
        assert!(found.allowed_attribs.contains(AttribMask::VALUE_SHARED));
        assert!(found.extra_acl_bits.contains(AclRights::WRITE));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let mut registry = Registry::with_builtins();
        load_entry_definitions(&mut registry, "\n# a comment\n   \n").unwrap();
        assert!(registry.find_exact(ScopeKind::Mailbox, "/custom").is_none());
    }

    #[test]
    fn unknown_token_is_fatal() {
        let mut registry = Registry::with_builtins();
        let err = load_entry_definitions(&mut registry, "/x, mailbox, weird, backend, value.shared, l\n").unwrap_err();
        assert!(matches!(err, EntryConfigError::Config(ConfigError::UnknownToken(_))));
    }

    #[test]
    fn vendor_prefix_name_is_rejected_via_config_loader() {
        let mut registry = Registry::with_builtins();
        let err = load_entry_definitions(
            &mut registry,
            "/vendor/cmu/cyrus-imapd/custom, server, string, backend, value.shared, l\n",
        )
        .unwrap_err();
        assert!(matches!(err, EntryConfigError::Config(ConfigError::VendorNameRejected(_))));
    }
}
