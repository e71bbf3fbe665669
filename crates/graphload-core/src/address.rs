//! Cluster endpoint addresses

use std::fmt;

use crate::{ClientError, Result};

/// A `host:port` endpoint of the graph cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAddress {
    pub host: String,
    pub port: u16,
}

impl HostAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl std::str::FromStr for HostAddress {
    type Err = ClientError;

    fn from_str(addr: &str) -> Result<Self> {
        let parts: Vec<&str> = addr.split(':').collect();
        let [host, port] = parts.as_slice() else {
            return Err(ClientError::InvalidAddress(addr.to_string()));
        };
        if host.is_empty() {
            return Err(ClientError::InvalidAddress(addr.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| ClientError::InvalidAddress(format!("{addr}: {e}")))?;
        Ok(HostAddress::new(*host, port))
    }
}

/// Parse a comma-separated `host:port` list.
///
/// Every entry must be exactly `host:port`; one malformed entry fails the
/// whole list.
pub fn parse_addresses(list: &str) -> Result<Vec<HostAddress>> {
    let hosts = list
        .split(',')
        .map(|addr| addr.trim().parse())
        .collect::<Result<Vec<HostAddress>>>()?;
    tracing::debug!(count = hosts.len(), "parsed cluster addresses");
    Ok(hosts)
}
