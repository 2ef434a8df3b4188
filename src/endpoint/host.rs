//! Host target parsing and registration-time name resolution

use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::constants::DEFAULT_HOST_PORT;
use crate::models::{Endpoint, TargetError};

/// Parse `host[:port]` and resolve the host to a numeric address.
pub fn parse_host(raw: &str) -> Result<Endpoint, TargetError> {
    let raw = raw.trim();
    let (host, port) = split_host_port(raw)?;

    let ip = resolve_host(&host).map_err(|source| TargetError::Resolution {
        host: host.clone(),
        source,
    })?;

    Ok(Endpoint::resolved_host(raw, SocketAddr::new(ip, port)))
}

/// Split operator input into host and port.
///
/// Accepted forms: `host`, `host:port`, a bare IPv6 literal, and `[v6]:port`.
/// Input without a port gets port 80.
pub fn split_host_port(raw: &str) -> Result<(String, u16), TargetError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TargetError::EmptyInput);
    }

    // A bare address literal; IPv6 would otherwise be split on its last group
    if raw.parse::<IpAddr>().is_ok() {
        return Ok((raw.to_string(), DEFAULT_HOST_PORT));
    }

    if let Some(rest) = raw.strip_prefix('[') {
        let Some((host, tail)) = rest.split_once(']') else {
            return Err(TargetError::InvalidFormat(raw.to_string()));
        };
        let port = match tail {
            "" => DEFAULT_HOST_PORT,
            _ => match tail.strip_prefix(':') {
                Some(port) => parse_port(port)?,
                None => return Err(TargetError::InvalidFormat(raw.to_string())),
            },
        };
        return non_empty_host(host, port);
    }

    match raw.rsplit_once(':') {
        Some((host, port)) => {
            let port = parse_port(port)?;
            non_empty_host(host, port)
        }
        None => Ok((raw.to_string(), DEFAULT_HOST_PORT)),
    }
}

fn non_empty_host(host: &str, port: u16) -> Result<(String, u16), TargetError> {
    if host.trim().is_empty() {
        return Err(TargetError::EmptyInput);
    }
    Ok((host.trim().to_string(), port))
}

fn parse_port(port: &str) -> Result<u16, TargetError> {
    match port.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(TargetError::InvalidPort(port.to_string())),
        Ok(port) => Ok(port),
    }
}

/// Resolve a host name to one numeric address, preferring IPv4.
pub fn resolve_host(host: &str) -> io::Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<SocketAddr> = (host, 0).to_socket_addrs()?.collect();
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .map(|addr| addr.ip())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no addresses found for {host}")))
}
