//! # Dependency specifiers.
//!
//! Grammar: `[protocol ":"] base ("::" prop)*`
//!
//! ```text
//! "module3"                 → base=module3
//! "module3::foo::bar"       → base=module3            selectors=[foo, bar]
//! "ajax:data.json::items::0"→ protocol=ajax base=data.json selectors=[items, 0]
//! ```
//!
//! Only the remote protocol (see [`Config::remote_protocol`](crate::Config))
//! changes how the module is named and loaded; any other protocol prefix is
//! stripped and the base is treated as a plain module name.

use std::fmt;
use std::str::FromStr;

use crate::error::ResolveError;
use crate::selector::SELECTOR_SEPARATOR;

const PROTOCOL_SEPARATOR: char = ':';

/// A parsed dependency specifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Specifier {
    protocol: Option<String>,
    base: String,
    selectors: Vec<String>,
}

impl Specifier {
    /// Parses a raw specifier string.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let mut parts = raw.split(SELECTOR_SEPARATOR);
        let head = parts.next().unwrap_or_default();
        let selectors: Vec<String> = parts.map(str::to_string).collect();

        let (protocol, base) = match head.split_once(PROTOCOL_SEPARATOR) {
            Some((protocol, base)) if !protocol.is_empty() => (Some(protocol.to_string()), base),
            Some((_, base)) => (None, base),
            None => (None, head),
        };

        if base.is_empty() {
            return Err(ResolveError::InvalidSpecifier {
                specifier: raw.to_string(),
                reason: "empty module name",
            });
        }

        Ok(Self {
            protocol,
            base: base.to_string(),
            selectors,
        })
    }

    /// Protocol prefix, if any.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Base token: module name or remote path, without protocol and selectors.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Selector chain applied to the module value.
    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    /// True if this specifier uses `remote_protocol`.
    pub fn is_remote(&self, remote_protocol: &str) -> bool {
        self.protocol.as_deref() == Some(remote_protocol)
    }

    /// Registry name of the module this specifier points at.
    ///
    /// Remote resources keep their protocol (`ajax:data.json`) so they never
    /// collide with a plain module of the same name.
    pub fn module_name(&self, remote_protocol: &str) -> String {
        if self.is_remote(remote_protocol) {
            format!("{remote_protocol}{PROTOCOL_SEPARATOR}{}", self.base)
        } else {
            self.base.clone()
        }
    }
}

impl FromStr for Specifier {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Specifier::parse(s)
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(protocol) = &self.protocol {
            write!(f, "{protocol}{PROTOCOL_SEPARATOR}")?;
        }
        f.write_str(&self.base)?;
        for selector in &self.selectors {
            write!(f, "{SELECTOR_SEPARATOR}{selector}")?;
        }
        Ok(())
    }
}
