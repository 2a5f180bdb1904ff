//! Team-number address resolution.
//!
//! roboRIO targets advertise themselves over mDNS as
//! `roborio-<team>-frc.local`. This module formats that hostname and
//! resolves it to an address; the listener core only ever receives the
//! resolved IP literal.

use std::net::IpAddr;
use tokio::net::lookup_host;

/// Format the mDNS hostname for a team number.
pub fn team_hostname(team: u16) -> String {
    format!("roborio-{team}-frc.local")
}

/// Resolve a hostname to its first address.
pub async fn resolve_host(host: &str) -> Result<IpAddr, ResolveError> {
    let mut addrs = lookup_host((host, 0u16))
        .await
        .map_err(|e| ResolveError::Lookup(host.to_string(), e))?;

    addrs
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| ResolveError::NoAddress(host.to_string()))
}

/// Address resolution errors
#[derive(Debug)]
pub enum ResolveError {
    Lookup(String, std::io::Error),
    NoAddress(String),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::Lookup(host, e) => {
                write!(f, "Failed to resolve '{host}': {e}")
            }
            ResolveError::NoAddress(host) => {
                write!(f, "'{host}' resolved to no addresses")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_hostname() {
        assert_eq!(team_hostname(2486), "roborio-2486-frc.local");
        assert_eq!(team_hostname(1), "roborio-1-frc.local");
    }
}
