//! IPv4 CIDR blocks.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::TopologyError;

/// An IPv4 network in `a.b.c.d/len` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Cidr {
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    fn mask(&self) -> u32 {
        if self.prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix_len))
        }
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !self.mask())
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & self.mask() == u32::from(self.network)
    }

    /// Whether `addr` can be handed to a host (not the network or broadcast address).
    ///
    /// /31 and /32 blocks have no reserved addresses.
    pub fn is_host_address(&self, addr: Ipv4Addr) -> bool {
        if !self.contains(addr) {
            return false;
        }
        if self.prefix_len >= 31 {
            return true;
        }
        addr != self.network && addr != self.broadcast()
    }
}

impl FromStr for Ipv4Cidr {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| TopologyError::InvalidCidr {
            value: s.to_string(),
            message: message.to_string(),
        };

        let (addr, len) = s.split_once('/').ok_or_else(|| invalid("missing prefix length"))?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| invalid("invalid IPv4 address"))?;
        let prefix_len: u8 = len.parse().map_err(|_| invalid("invalid prefix length"))?;
        if prefix_len > 32 {
            return Err(invalid("prefix length must be at most 32"));
        }

        let cidr = Self {
            network: addr,
            prefix_len,
        };
        if u32::from(addr) & cidr.mask() != u32::from(addr) {
            return Err(invalid("host bits set"));
        }
        Ok(cidr)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_contains() {
        let cidr: Ipv4Cidr = "10.0.1.0/24".parse().unwrap();
        assert_eq!(cidr.prefix_len(), 24);
        assert!(cidr.contains("10.0.1.77".parse().unwrap()));
        assert!(!cidr.contains("10.0.2.1".parse().unwrap()));
        assert_eq!(cidr.broadcast(), Ipv4Addr::new(10, 0, 1, 255));
        assert_eq!(cidr.to_string(), "10.0.1.0/24");
    }

    #[test]
    fn test_reserved_addresses() {
        let cidr: Ipv4Cidr = "192.168.0.0/30".parse().unwrap();
        assert!(!cidr.is_host_address(Ipv4Addr::new(192, 168, 0, 0)));
        assert!(cidr.is_host_address(Ipv4Addr::new(192, 168, 0, 1)));
        assert!(!cidr.is_host_address(Ipv4Addr::new(192, 168, 0, 3)));

        let point_to_point: Ipv4Cidr = "192.168.0.0/31".parse().unwrap();
        assert!(point_to_point.is_host_address(Ipv4Addr::new(192, 168, 0, 0)));
    }

    #[test]
    fn test_rejects_malformed_blocks() {
        assert!("10.0.0.0".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.0/33".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.300/24".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.5/24".parse::<Ipv4Cidr>().is_err());
        assert!("0.0.0.0/0".parse::<Ipv4Cidr>().is_ok());
    }
}
