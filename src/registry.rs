//! Entry registry (component C3). Three ordered collections indexed by
//! scope, each with a catch-all database descriptor, seeded from
//! compiled-in tables plus an optional config file (spec §4.3, §6).

use crate::acl::AclRights;
use crate::attrib::AttribMask;
use crate::cursor::ScopeKind;

pub const VENDOR_PREFIX: &str = "/vendor/cmu/cyrus-imapd/";
const FLAGS_PREFIX: &str = "/flags/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Boolean,
    Uint,
    Int,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    ProxyOnly,
    BackendOnly,
    ProxyAndBackend,
}

/// Tagged handler dispatch (spec §9 "Polymorphic handler table"): one
/// variant per handler kind with its own typed parameters, in place of
/// the original's function-pointer-plus-void-rock pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    Db,
    File { path: &'static str },
    MailboxOption { bit: u32 },
    Pop3ShowAfter,
    SpecialUse,
    Computed { kind: ComputedKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedKind {
    FreeSpace,
    Server,
    Partition,
    Size,
    LastUpdate,
    LastPop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub name: String,
    pub value_type: ValueType,
    pub proxy_kind: ProxyKind,
    pub allowed_attribs: AttribMask,
    pub extra_acl_bits: AclRights,
    pub handler: HandlerKind,
}

impl EntryDescriptor {
    pub fn has_setter(&self) -> bool {
        // Every handler kind in this crate implements both get and set;
        // the db catch-all is the only one without a meaningful
        // "unsettable" case in practice, so this is always true today.
        // Kept as a method (rather than inlined `true`) because a future
        // read-only computed entry (spec §4.4's computed getters are all
        // currently read-only from the caller's perspective — `size`,
        // `freespace`, `server`, `partition`, `lastupdate` have no
        // setter) must flip it.
        !matches!(
            self.handler,
            HandlerKind::Computed {
                kind: ComputedKind::FreeSpace
                    | ComputedKind::Server
                    | ComputedKind::Partition
                    | ComputedKind::Size
                    | ComputedKind::LastUpdate
                    | ComputedKind::LastPop
            }
        )
    }
}

pub struct Registry {
    server: Vec<EntryDescriptor>,
    mailbox: Vec<EntryDescriptor>,
    message: Vec<EntryDescriptor>,
}

fn catch_all_db(scope: ScopeKind) -> EntryDescriptor {
    let proxy_kind = match scope {
        ScopeKind::Server => ProxyKind::BackendOnly,
        ScopeKind::Mailbox | ScopeKind::Message => ProxyKind::ProxyAndBackend,
    };
    EntryDescriptor {
        name: String::new(),
        value_type: ValueType::String,
        proxy_kind,
        allowed_attribs: AttribMask::VALUE_SHARED
            | AttribMask::VALUE_PRIV
            | AttribMask::SIZE_SHARED
            | AttribMask::SIZE_PRIV,
        extra_acl_bits: AclRights::NONE,
        handler: HandlerKind::Db,
    }
}

fn db_entry(name: &str, extra_acl_bits: AclRights) -> EntryDescriptor {
    EntryDescriptor {
        name: name.to_string(),
        value_type: ValueType::String,
        proxy_kind: ProxyKind::ProxyAndBackend,
        allowed_attribs: AttribMask::VALUE_SHARED | AttribMask::VALUE_PRIV,
        extra_acl_bits,
        handler: HandlerKind::Db,
    }
}

/// A db-backed entry whose value is canonicalised as `"true"`/`"false"`
/// (spec §8 scenario 6: `squat` round-trips through boolean canonicalisation).
fn boolean_db_entry(name: &str) -> EntryDescriptor {
    EntryDescriptor {
        value_type: ValueType::Boolean,
        ..db_entry(name, AclRights::NONE)
    }
}

fn server_builtins() -> Vec<EntryDescriptor> {
    vec![
        db_entry("/admin", AclRights::NONE),
        db_entry("/comment", AclRights::NONE),
        EntryDescriptor {
            name: "/motd".to_string(),
            value_type: ValueType::String,
            proxy_kind: ProxyKind::BackendOnly,
            allowed_attribs: AttribMask::VALUE_SHARED,
            extra_acl_bits: AclRights::NONE,
            handler: HandlerKind::File { path: "motd" },
        },
        db_entry(&format!("{VENDOR_PREFIX}expire"), AclRights::NONE),
        EntryDescriptor {
            name: format!("{VENDOR_PREFIX}freespace"),
            value_type: ValueType::Uint,
            proxy_kind: ProxyKind::BackendOnly,
            allowed_attribs: AttribMask::VALUE_SHARED | AttribMask::SIZE_SHARED,
            extra_acl_bits: AclRights::NONE,
            handler: HandlerKind::Computed { kind: ComputedKind::FreeSpace },
        },
        EntryDescriptor {
            name: format!("{VENDOR_PREFIX}shutdown"),
            value_type: ValueType::String,
            proxy_kind: ProxyKind::BackendOnly,
            allowed_attribs: AttribMask::VALUE_SHARED,
            extra_acl_bits: AclRights::NONE,
            handler: HandlerKind::File { path: "shutdown" },
        },
        boolean_db_entry(&format!("{VENDOR_PREFIX}squat")),
    ]
}

fn mailbox_builtins() -> Vec<EntryDescriptor> {
    vec![
        db_entry("/check", AclRights::NONE),
        db_entry("/checkperiod", AclRights::NONE),
        db_entry("/comment", AclRights::NONE),
        db_entry("/sort", AclRights::NONE),
        EntryDescriptor {
            name: "/specialuse".to_string(),
            value_type: ValueType::String,
            proxy_kind: ProxyKind::ProxyAndBackend,
            allowed_attribs: AttribMask::VALUE_SHARED,
            extra_acl_bits: AclRights::NONE,
            handler: HandlerKind::SpecialUse,
        },
        db_entry("/thread", AclRights::NONE),
        db_entry(&format!("{VENDOR_PREFIX}duplicatedeliver"), AclRights::NONE),
        db_entry(&format!("{VENDOR_PREFIX}expire"), AclRights::NONE),
        EntryDescriptor {
            name: format!("{VENDOR_PREFIX}lastpop"),
            value_type: ValueType::String,
            proxy_kind: ProxyKind::BackendOnly,
            allowed_attribs: AttribMask::VALUE_SHARED,
            extra_acl_bits: AclRights::NONE,
            handler: HandlerKind::Computed { kind: ComputedKind::LastPop },
        },
        EntryDescriptor {
            name: format!("{VENDOR_PREFIX}lastupdate"),
            value_type: ValueType::String,
            proxy_kind: ProxyKind::BackendOnly,
            allowed_attribs: AttribMask::VALUE_SHARED,
            extra_acl_bits: AclRights::NONE,
            handler: HandlerKind::Computed { kind: ComputedKind::LastUpdate },
        },
        db_entry(&format!("{VENDOR_PREFIX}news2mail"), AclRights::NONE),
        mailbox_option(&format!("{VENDOR_PREFIX}pop3newuidl"), 1 << 0),
        EntryDescriptor {
            name: format!("{VENDOR_PREFIX}pop3showafter"),
            value_type: ValueType::String,
            proxy_kind: ProxyKind::BackendOnly,
            allowed_attribs: AttribMask::VALUE_SHARED,
            extra_acl_bits: AclRights::NONE,
            handler: HandlerKind::Pop3ShowAfter,
        },
        EntryDescriptor {
            name: format!("{VENDOR_PREFIX}server"),
            value_type: ValueType::String,
            proxy_kind: ProxyKind::ProxyOnly,
            allowed_attribs: AttribMask::VALUE_SHARED,
            extra_acl_bits: AclRights::NONE,
            handler: HandlerKind::Computed { kind: ComputedKind::Server },
        },
        mailbox_option(&format!("{VENDOR_PREFIX}sharedseen"), 1 << 1),
        db_entry(&format!("{VENDOR_PREFIX}sieve"), AclRights::NONE),
        EntryDescriptor {
            name: format!("{VENDOR_PREFIX}partition"),
            value_type: ValueType::String,
            proxy_kind: ProxyKind::BackendOnly,
            allowed_attribs: AttribMask::VALUE_SHARED,
            extra_acl_bits: AclRights::NONE,
            handler: HandlerKind::Computed { kind: ComputedKind::Partition },
        },
        EntryDescriptor {
            name: format!("{VENDOR_PREFIX}size"),
            value_type: ValueType::Uint,
            proxy_kind: ProxyKind::BackendOnly,
            allowed_attribs: AttribMask::VALUE_SHARED | AttribMask::SIZE_SHARED,
            extra_acl_bits: AclRights::NONE,
            handler: HandlerKind::Computed { kind: ComputedKind::Size },
        },
        boolean_db_entry(&format!("{VENDOR_PREFIX}squat")),
    ]
}

fn mailbox_option(name: &str, bit: u32) -> EntryDescriptor {
    EntryDescriptor {
        name: name.to_string(),
        value_type: ValueType::Boolean,
        proxy_kind: ProxyKind::ProxyAndBackend,
        allowed_attribs: AttribMask::VALUE_SHARED,
        extra_acl_bits: AclRights::NONE,
        handler: HandlerKind::MailboxOption { bit },
    }
}

fn message_builtins() -> Vec<EntryDescriptor> {
    vec![
        db_entry("/altsubject", AclRights::NONE),
        db_entry("/comment", AclRights::NONE),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownToken(String),
    VendorNameRejected(String),
    FlagsNameRejected(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::UnknownToken(t) => write!(f, "unknown configuration token: {t}"),
            ConfigError::VendorNameRejected(n) => {
                write!(f, "entry name uses the reserved vendor prefix: {n}")
            }
            ConfigError::FlagsNameRejected(n) => {
                write!(f, "message-scope entry name uses the reserved /flags/ prefix: {n}")
            }
        }
    }
}
impl std::error::Error for ConfigError {}

impl Registry {
    pub fn with_builtins() -> Self {
        Self {
            server: server_builtins(),
            mailbox: mailbox_builtins(),
            message: message_builtins(),
        }
    }

    fn table_mut(&mut self, scope: ScopeKind) -> &mut Vec<EntryDescriptor> {
        match scope {
            ScopeKind::Server => &mut self.server,
            ScopeKind::Mailbox => &mut self.mailbox,
            ScopeKind::Message => &mut self.message,
        }
    }

    pub fn table(&self, scope: ScopeKind) -> &[EntryDescriptor] {
        match scope {
            ScopeKind::Server => &self.server,
            ScopeKind::Mailbox => &self.mailbox,
            ScopeKind::Message => &self.message,
        }
    }

    pub fn catch_all(&self, scope: ScopeKind) -> EntryDescriptor {
        catch_all_db(scope)
    }

    /// Registers one line of the config file (spec §4.3 step 2, §6).
    /// Rejects names beginning with the vendor-internal prefix, and
    /// message-scope names beginning with `/flags/`. Tokenized
    /// value-type/proxy-kind/attribute names are looked up against small
    /// tables; unknown tokens are a fatal configuration error. A
    /// deprecated attribute bit is stripped after a single warning.
    pub fn register_config_line(
        &mut self,
        name: &str,
        scope: ScopeKind,
        value_type: ValueType,
        proxy_kind: ProxyKind,
        mut allowed_attribs: AttribMask,
        extra_acl_bits: AclRights,
    ) -> Result<(), ConfigError> {
        if name.starts_with(VENDOR_PREFIX) {
            return Err(ConfigError::VendorNameRejected(name.to_string()));
        }
        if scope == ScopeKind::Message && name.starts_with(FLAGS_PREFIX) {
            return Err(ConfigError::FlagsNameRejected(name.to_string()));
        }
        if allowed_attribs.contains(AttribMask::DEPRECATED) {
            tracing::warn!(entry = name, "dropping deprecated attribute bit from config");
            allowed_attribs = allowed_attribs.without(AttribMask::DEPRECATED);
        }

        self.table_mut(scope).push(EntryDescriptor {
            name: name.to_string(),
            value_type,
            proxy_kind,
            allowed_attribs,
            extra_acl_bits,
            handler: HandlerKind::Db,
        });
        Ok(())
    }

    pub fn find_exact(&self, scope: ScopeKind, name: &str) -> Option<&EntryDescriptor> {
        self.table(scope).iter().find(|e| e.name == name)
    }

    /// Every descriptor whose name matches `pattern` (spec §4.6 step 2).
    pub fn find_matching(
        &self,
        scope: ScopeKind,
        pattern: &crate::pattern::Pattern<'_>,
    ) -> Vec<&EntryDescriptor> {
        self.table(scope)
            .iter()
            .filter(|e| pattern.matches(&e.name))
            .collect()
    }
}

pub fn value_type_from_token(token: &str) -> Result<ValueType, ConfigError> {
    match token {
        "string" => Ok(ValueType::String),
        "boolean" => Ok(ValueType::Boolean),
        "uint" => Ok(ValueType::Uint),
        "int" => Ok(ValueType::Int),
        other => Err(ConfigError::UnknownToken(other.to_string())),
    }
}

pub fn proxy_kind_from_token(token: &str) -> Result<ProxyKind, ConfigError> {
    match token {
        "proxy" => Ok(ProxyKind::ProxyOnly),
        "backend" => Ok(ProxyKind::BackendOnly),
        "proxy_and_backend" => Ok(ProxyKind::ProxyAndBackend),
        other => Err(ConfigError::UnknownToken(other.to_string())),
    }
}

pub fn attrib_from_token(token: &str) -> Result<AttribMask, ConfigError> {
    match token {
        "value.shared" => Ok(AttribMask::VALUE_SHARED),
        "value.priv" => Ok(AttribMask::VALUE_PRIV),
        "size.shared" => Ok(AttribMask::SIZE_SHARED),
        "size.priv" => Ok(AttribMask::SIZE_PRIV),
        "deprecated" => Ok(AttribMask::DEPRECATED),
        other => Err(ConfigError::UnknownToken(other.to_string())),
    }
}
