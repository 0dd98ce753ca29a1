use std::{
	fmt::Display,
	io,
	net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use bytes::{BufMut, BytesMut};
use log::*;

use crate::{common::*, Error, Result};

#[derive(Debug, Clone, Eq)]
pub enum Addr<'a> {
	Domain(&'a str),
	DomainOwned(String),
	V4(Ipv4Addr),
	// only ever seen as BND.ADDR, destinations are domains or IPv4
	V6(Ipv6Addr),
}

impl<'a, 'b> PartialEq<Addr<'b>> for Addr<'a> {
	fn eq(&self, other: &Addr<'b>) -> bool {
		match (self, other) {
			(Addr::Domain(s), Addr::Domain(o)) => s == o,
			(Addr::DomainOwned(s), Addr::DomainOwned(o)) => s == o,
			(Addr::Domain(s), Addr::DomainOwned(o)) => s == o,
			(Addr::DomainOwned(s), Addr::Domain(o)) => s == o,
			(Addr::V4(s), Addr::V4(o)) => s == o,
			(Addr::V6(s), Addr::V6(o)) => s == o,
			_ => false,
		}
	}
}

impl<'a> Display for Addr<'a> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::DomainOwned(d) => {
				write!(f, "{}", &d)
			}
			Self::Domain(d) => {
				write!(f, "{}", d)
			}
			Self::V4(a) => {
				write!(f, "{}", a)
			}
			Self::V6(a) => {
				write!(f, "[{}]", a)
			}
		}
	}
}

impl<'a> From<IpAddr> for Addr<'a> {
	fn from(v: IpAddr) -> Self {
		match v {
			IpAddr::V4(v4) => Addr::V4(v4),
			IpAddr::V6(v6) => Addr::V6(v6),
		}
	}
}

impl<'a> From<Ipv4Addr> for Addr<'a> {
	fn from(v: Ipv4Addr) -> Self {
		Addr::V4(v)
	}
}

impl<'a> From<String> for Addr<'a> {
	fn from(v: String) -> Self {
		Self::DomainOwned(v)
	}
}

impl<'a> From<&'a str> for Addr<'a> {
	fn from(v: &'a str) -> Self {
		Self::Domain(v)
	}
}

impl<'a> Addr<'a> {
	pub fn atyp(&self) -> u8 {
		match self {
			Self::Domain(_) | Self::DomainOwned(_) => SOCKS5_ATYP_DOMAINNAME,
			Self::V4(_) => SOCKS5_ATYP_V4,
			Self::V6(_) => SOCKS5_ATYP_V6,
		}
	}

	pub fn into_owned(self) -> Addr<'static> {
		match self {
			Self::Domain(d) => Addr::DomainOwned(d.to_string()),
			Self::DomainOwned(d) => Addr::DomainOwned(d),
			Self::V4(a) => Addr::V4(a),
			Self::V6(a) => Addr::V6(a),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dst<'a> {
	pub addr: Addr<'a>,
	pub port: u16,
}

impl<'a> Display for Dst<'a> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.addr, self.port)
	}
}

impl<'a, T: Into<Addr<'a>>> From<(T, u16)> for Dst<'a> {
	fn from(v: (T, u16)) -> Self {
		Dst {
			addr: v.0.into(),
			port: v.1,
		}
	}
}

impl<'a> Dst<'a> {
	pub fn into_owned(self) -> Dst<'static> {
		Dst {
			addr: self.addr.into_owned(),
			port: self.port,
		}
	}
}

// the first IPv4 result wins,
// a CONNECT carries either a domain or IPv4
pub async fn resolve_v4(host: &str, port: u16) -> Result<Ipv4Addr> {
	let addrs = tokio::net::lookup_host((host, port))
		.await
		.inspect_err(|e| error!("error trying to lookup {}: {}", host, e))
		.map_err(|source| Error::Resolution {
			host: host.to_string(),
			source,
		})?;
	for a in addrs {
		if let IpAddr::V4(v4) = a.ip() {
			debug!("{} resolved to {}", host, v4);
			return Ok(v4);
		}
	}
	error!("lookup {} yields no IPv4 address", host);
	Err(Error::Resolution {
		host: host.to_string(),
		source: io::Error::new(io::ErrorKind::NotFound, "no IPv4 address"),
	})
}

/// Length of what follows ATYP: the address, plus BND.PORT/DST.PORT.
/// For DOMAINNAME `domain_len` is the length prefix, and is counted too.
pub fn dst_len(atyp: u8, domain_len: u8) -> Result<usize> {
	match atyp {
		SOCKS5_ATYP_V4 => Ok(4 + 2),
		SOCKS5_ATYP_V6 => Ok(16 + 2),
		SOCKS5_ATYP_DOMAINNAME => Ok(1 + domain_len as usize + 2),
		_ => {
			error!("invalid ATYP {}", atyp);
			Err(Error::Protocol(format!("invalid ATYP {atyp}")))
		}
	}
}

// ATYP, ADDR, PORT
pub fn put_dst(buf: &mut BytesMut, dst: &Dst) -> Result<()> {
	buf.put_u8(dst.addr.atyp());
	match &dst.addr {
		Addr::Domain(d) => put_domain(buf, d)?,
		Addr::DomainOwned(d) => put_domain(buf, d)?,
		Addr::V4(addr) => buf.put_slice(&addr.octets()),
		Addr::V6(addr) => buf.put_slice(&addr.octets()),
	}
	buf.put_u16(dst.port);
	Ok(())
}

fn put_domain(buf: &mut BytesMut, d: &str) -> Result<()> {
	let bytes = d.as_bytes();
	buf.put_u8(check_len("DST.ADDR", bytes.len())?);
	buf.put_slice(bytes);
	Ok(())
}

/// Parses ATYP, ADDR, PORT from the head of `buf`, returns the number of bytes consumed.
pub fn parse_dst(buf: &[u8]) -> Result<(Dst<'static>, usize)> {
	let short = || Error::Protocol(format!("address truncated, {} bytes", buf.len()));

	let (&atyp, rest) = buf.split_first().ok_or_else(short)?;
	let len = dst_len(atyp, rest.first().copied().unwrap_or(0))?;
	if rest.len() < len {
		return Err(short());
	}
	let (addr, port) = rest[..len].split_at(len - 2);
	let addr = match atyp {
		SOCKS5_ATYP_V4 => Addr::V4(Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3])),
		SOCKS5_ATYP_V6 => {
			let mut octets = [0u8; 16];
			octets.copy_from_slice(addr);
			Addr::V6(Ipv6Addr::from(octets))
		}
		_ => Addr::DomainOwned(
			std::str::from_utf8(&addr[1..])
				.inspect_err(|e| error!("invalid ADDR(DOMAINNAME): {}", e))
				.map_err(|e| Error::Protocol(format!("invalid domain name: {e}")))?
				.to_string(),
		),
	};
	let port = u16::from_be_bytes([port[0], port[1]]);
	Ok((Dst { addr, port }, 1 + len))
}
