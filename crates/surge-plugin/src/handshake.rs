//! Host ↔ plugin handshake.
//!
//! The host launches the plugin with a magic cookie and the protocol
//! versions it speaks in the environment. The plugin refuses to start
//! unless both check out, then binds a listener and prints one line to
//! stdout telling the host where to connect:
//!
//! ```text
//!   <core version>|<app version>|<network>|<address>|<protocol>
//!   1|1|tcp|127.0.0.1:41234|http
//! ```
//!
//! Everything else the plugin writes goes to stderr.

use std::net::SocketAddr;

use crate::error::{PluginError, PluginResult};

/// Version of the handshake line format.
pub const CORE_PROTOCOL_VERSION: u32 = 1;

/// Version of the Event / Stat / Scale API.
pub const PROTOCOL_VERSION: u32 = 1;

pub const MAGIC_COOKIE_KEY: &str = "SURGE_AUTOSCALER_PLUGIN";
pub const MAGIC_COOKIE_VALUE: &str = "5c1f0a3e9d8b47c2a6e4f7b1d0c3e8a2";

/// Comma-separated list of API versions the host accepts.
pub const PROTOCOL_VERSIONS_ENV: &str = "PLUGIN_PROTOCOL_VERSIONS";

/// The parsed handshake line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub core_version: u32,
    pub app_version: u32,
    pub network: String,
    pub address: String,
    pub protocol: String,
}

/// Check the environment the host launched us with.
pub fn validate_env() -> PluginResult<u32> {
    validate(|key| std::env::var(key).ok())
}

/// Check the cookie and negotiate the API version using `lookup` to read
/// environment variables. Returns the version both sides speak.
///
/// A host that sends no version list is assumed to speak ours.
pub fn validate(lookup: impl Fn(&str) -> Option<String>) -> PluginResult<u32> {
    match lookup(MAGIC_COOKIE_KEY) {
        Some(cookie) if cookie == MAGIC_COOKIE_VALUE => {}
        Some(_) => {
            return Err(PluginError::Handshake(format!(
                "{MAGIC_COOKIE_KEY} does not match; this binary is a plugin and is not meant to be run directly"
            )));
        }
        None => {
            return Err(PluginError::Handshake(format!(
                "{MAGIC_COOKIE_KEY} is not set; this binary is a plugin and is not meant to be run directly"
            )));
        }
    }

    let Some(versions) = lookup(PROTOCOL_VERSIONS_ENV) else {
        return Ok(PROTOCOL_VERSION);
    };
    let offered: Vec<u32> = versions
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<u32>().map_err(|_| {
                PluginError::Handshake(format!("invalid protocol version {v:?} in {PROTOCOL_VERSIONS_ENV}"))
            })
        })
        .collect::<PluginResult<_>>()?;

    if offered.contains(&PROTOCOL_VERSION) {
        Ok(PROTOCOL_VERSION)
    } else {
        Err(PluginError::Handshake(format!(
            "host speaks protocol versions {offered:?}, plugin speaks {PROTOCOL_VERSION}"
        )))
    }
}

/// The line printed to stdout once the listener is bound.
pub fn line(version: u32, addr: SocketAddr) -> String {
    format!("{CORE_PROTOCOL_VERSION}|{version}|tcp|{addr}|http")
}

/// Parse a handshake line as the host would.
pub fn parse_line(line: &str) -> PluginResult<Handshake> {
    let parts: Vec<&str> = line.trim().split('|').collect();
    let [core, app, network, address, protocol] = parts[..] else {
        return Err(PluginError::Handshake(format!(
            "expected 5 fields in handshake line, got {}",
            parts.len()
        )));
    };

    let parse = |field: &str, what: &str| {
        field
            .parse::<u32>()
            .map_err(|_| PluginError::Handshake(format!("invalid {what} {field:?}")))
    };
    let core_version = parse(core, "core protocol version")?;
    if core_version != CORE_PROTOCOL_VERSION {
        return Err(PluginError::Handshake(format!(
            "unsupported core protocol version {core_version}"
        )));
    }

    Ok(Handshake {
        core_version,
        app_version: parse(app, "protocol version")?,
        network: network.to_string(),
        address: address.to_string(),
        protocol: protocol.to_string(),
    })
}
