//! Network boot addresses for the Ethernet MAC.

use std::fmt;
use std::str::FromStr;

use vexsoc_platform::Namespace;

use super::{Feature, FeatureAttachment, FeatureKind};
use crate::compose::SocState;
use crate::error::{ComposeError, Result};

/// A dotted-quad IPv4 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Octets(pub [u8; 4]);

impl FromStr for Ipv4Octets {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            ComposeError::validation(format!(
                "'{s}' is not an IPv4 address of four octets in 0..=255"
            ))
        };
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 4 {
            return Err(invalid());
        }
        let mut octets = [0u8; 4];
        for (octet, part) in octets.iter_mut().zip(parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *octet = part.parse().map_err(|_| invalid())?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for Ipv4Octets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// Local and remote (TFTP server) addresses used by the boot loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub local: Ipv4Octets,
    pub remote: Ipv4Octets,
}

impl Network {
    pub fn new(local: &str, remote: &str) -> Result<Self> {
        Ok(Self {
            local: local.parse()?,
            remote: remote.parse()?,
        })
    }
}

impl Feature for Network {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Network
    }

    fn apply(&self, soc: &mut SocState) -> Result<FeatureAttachment> {
        // Addresses are meaningless without a MAC on the bus.
        soc.registry.lookup(Namespace::Memory, "ethmac")?;

        let mut attachment = FeatureAttachment::new(self.kind());
        for (prefix, addr) in [("LOCALIP", self.local), ("REMOTEIP", self.remote)] {
            for (i, octet) in addr.0.iter().enumerate() {
                attachment.constant(soc, &format!("{prefix}{}", i + 1), u64::from(*octet))?;
            }
        }
        tracing::debug!(local = %self.local, remote = %self.remote, "network boot addresses");
        Ok(attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_dotted_quad() {
        let ip: Ipv4Octets = "192.168.1.10".parse().unwrap();
        assert_eq!(ip.0, [192, 168, 1, 10]);
        assert_eq!(ip.to_string(), "192.168.1.10");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["999.1.1.1", "1.2.3", "1.2.3.4.5", "a.b.c.d", "1..2.3", "-1.2.3.4", ""] {
            let err = bad.parse::<Ipv4Octets>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad}");
        }
    }

    #[test]
    fn new_validates_both_addresses() {
        assert!(Network::new("192.168.1.50", "192.168.1.100").is_ok());
        assert!(Network::new("192.168.1.50", "10.0.0.256").is_err());
    }
}
