use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use serde::{Deserialize, Serialize};

use crate::error::{TelemetryError, TelemetryResult};

/// Fixed port the rig's socket server listens on
pub const DEFAULT_PORT: u16 = 1234;

/// Factory-default rig address; the real address is user-supplied at runtime
pub const DEFAULT_HOST: &str = "192.168.1.207";

/// Network address of the wearable rig.
///
/// Constructed only through octet validation, so an invalid user-supplied
/// string never reaches the streaming client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAddress {
    host: Ipv4Addr,
    port: u16,
}

impl DeviceAddress {
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self { host, port }
    }

    /// Validate a user-supplied dotted-quad host: four octets, each 0-255.
    pub fn parse(host: &str, port: u16) -> TelemetryResult<Self> {
        let host = host
            .trim()
            .parse::<Ipv4Addr>()
            .map_err(|_| TelemetryError::InvalidAddress(host.to_string()))?;
        Ok(Self { host, port })
    }

    pub fn host(&self) -> Ipv4Addr {
        self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }
}

impl Default for DeviceAddress {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(192, 168, 1, 207),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_address() {
        let addr = DeviceAddress::parse("10.0.0.42", DEFAULT_PORT).unwrap();
        assert_eq!(addr.host(), Ipv4Addr::new(10, 0, 0, 42));
        assert_eq!(addr.port(), 1234);
        assert_eq!(addr.to_string(), "10.0.0.42:1234");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let addr = DeviceAddress::parse(" 192.168.1.207 ", DEFAULT_PORT).unwrap();
        assert_eq!(addr, DeviceAddress::default());
    }

    #[test]
    fn test_parse_rejects_bad_octets() {
        for bad in ["256.1.1.1", "1.2.3", "1.2.3.4.5", "a.b.c.d", "", "1.2.3.-4"] {
            assert!(
                DeviceAddress::parse(bad, DEFAULT_PORT).is_err(),
                "expected rejection of {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_default_matches_seed_host() {
        let addr = DeviceAddress::default();
        assert_eq!(addr.to_string(), format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT));
    }
}
