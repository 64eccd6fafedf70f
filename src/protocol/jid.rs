//! Chat addresses (`node@domain/resource`).
//!
//! Node and domain are case-folded to lower case on parse so that roster and
//! room lookups compare equal regardless of how a peer spelled them. The
//! resource label is kept verbatim; it is a nickname inside a room and is
//! case-sensitive.
use std::fmt;
use std::str::FromStr;

use crate::error::BotError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Jid {
    node: Option<String>,
    domain: String,
    resource: Option<String>,
}

impl Jid {
    /// Build an address from parts. `node` and `resource` may be absent.
    pub fn new(node: Option<&str>, domain: &str, resource: Option<&str>) -> Result<Self, BotError> {
        let raw = match (node, resource) {
            (Some(n), Some(r)) => format!("{n}@{domain}/{r}"),
            (Some(n), None) => format!("{n}@{domain}"),
            (None, Some(r)) => format!("{domain}/{r}"),
            (None, None) => domain.to_string(),
        };
        raw.parse()
    }

    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Copy of this address with the resource removed.
    pub fn bare(&self) -> Jid {
        Jid {
            node: self.node.clone(),
            domain: self.domain.clone(),
            resource: None,
        }
    }

    /// `node@domain` (or just `domain`) as a string.
    pub fn bare_str(&self) -> String {
        match &self.node {
            Some(n) => format!("{}@{}", n, self.domain),
            None => self.domain.clone(),
        }
    }

    pub fn with_resource(&self, resource: &str) -> Jid {
        Jid {
            node: self.node.clone(),
            domain: self.domain.clone(),
            resource: if resource.is_empty() {
                None
            } else {
                Some(resource.to_string())
            },
        }
    }

    pub fn is_bare(&self) -> bool {
        self.resource.is_none()
    }
}

impl FromStr for Jid {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BotError::InvalidAddress(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().any(|c| c.is_whitespace()) {
            return Err(invalid());
        }
        let (bare, resource) = match trimmed.split_once('/') {
            Some((_, "")) => return Err(invalid()),
            Some((b, r)) => (b, Some(r.to_string())),
            None => (trimmed, None),
        };
        let (node, domain) = match bare.split_once('@') {
            Some((n, d)) => {
                if n.is_empty() || d.contains('@') {
                    return Err(invalid());
                }
                (Some(n.to_lowercase()), d)
            }
            None => (None, bare),
        };
        if domain.is_empty() {
            return Err(invalid());
        }
        Ok(Jid {
            node,
            domain: domain.to_lowercase(),
            resource,
        })
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(node) = &self.node {
            write!(f, "{}@", node)?;
        }
        write!(f, "{}", self.domain)?;
        if let Some(resource) = &self.resource {
            write!(f, "/{}", resource)?;
        }
        Ok(())
    }
}
