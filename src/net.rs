//! Bind/advertise address resolution

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::constants::network;

/// Primary LAN IPv4, found by "connecting" a UDP socket (no packets are sent)
pub fn detect_lan_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect(network::PROBE_ADDR).ok()?;
    let addr = socket.local_addr().ok()?.ip();
    debug!(address = %addr, "Detected LAN address");
    Some(addr)
}

/// `auto`, empty or `0.0.0.0` detect the LAN address; anything else must parse
pub fn resolve_bind(bind: &str) -> Result<IpAddr> {
    let bind = bind.trim();
    let addr = if network::AUTO_BIND.contains(&bind) {
        detect_lan_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
    } else {
        bind.parse::<IpAddr>()
            .with_context(|| format!("Invalid bind address '{bind}'"))?
    };

    if addr.is_loopback() {
        warn!(
            address = %addr,
            "Resolved bind address is loopback; other devices will not reach it"
        );
    }
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_address() {
        assert_eq!(
            resolve_bind("192.168.1.20").unwrap(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))
        );
        assert_eq!(resolve_bind(" 127.0.0.1 ").unwrap(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_invalid_address() {
        assert!(resolve_bind("not-an-ip").is_err());
    }

    #[test]
    fn test_auto_never_returns_unspecified() {
        for value in network::AUTO_BIND {
            let addr = resolve_bind(value).unwrap();
            assert!(!addr.is_unspecified());
        }
    }
}
