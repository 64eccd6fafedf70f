//! The bot's own identity: address, credentials and session resource label.
use rand::Rng;
use std::fmt;

use crate::protocol::Jid;

/// Fallback nickname when neither an explicit nor a generated label is usable.
pub const DEFAULT_RESOURCE: &str = "mucbot";
pub const DEFAULT_PORT: u16 = 5222;

/// Immutable after construction.
#[derive(Clone)]
pub struct BotIdentity {
    jid: Jid,
    password: String,
    resource: String,
}

impl BotIdentity {
    /// Create an identity. When `resource` is `None` (or blank) a label is generated as
    /// `<prefix><random u32>` from the supplied random source.
    pub fn new<R: Rng + ?Sized>(
        jid: Jid,
        password: &str,
        resource: Option<&str>,
        prefix: &str,
        rng: &mut R,
    ) -> Self {
        let resource = match resource.map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => generate_resource(prefix, rng),
        };
        Self {
            jid: jid.bare(),
            password: password.to_string(),
            resource,
        }
    }

    /// Bare address of the bot account.
    pub fn jid(&self) -> &Jid {
        &self.jid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Account node (user part), used when authenticating.
    pub fn user(&self) -> &str {
        self.jid.node().unwrap_or_default()
    }

    /// Session address: `user@domain/resource`.
    pub fn full_jid(&self) -> Jid {
        self.jid.with_resource(&self.resource)
    }
}

// Keep the password out of debug output.
impl fmt::Debug for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotIdentity")
            .field("jid", &self.jid)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

/// Build a resource label from a prefix and a random suffix.
pub fn generate_resource<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> String {
    let prefix = if prefix.trim().is_empty() {
        DEFAULT_RESOURCE
    } else {
        prefix.trim()
    };
    format!("{}{}", prefix.to_lowercase(), rng.gen::<u32>())
}

/// Host and port the protocol client connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    /// Default server for an account: its domain on the standard client port.
    pub fn for_jid(jid: &Jid) -> Self {
        Self::new(jid.domain(), DEFAULT_PORT)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
