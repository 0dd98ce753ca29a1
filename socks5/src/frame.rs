// the four message shapes a CONNECT-only client exchanges with the proxy,
// each one a fixed layout with an explicit big-endian encode/decode pair

use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use log::*;

use crate::{addr::*, common::*, Error, Result};

fn expect_len(frame: &str, buf: &[u8], len: usize) -> Result<()> {
	if buf.len() != len {
		return Err(Error::Protocol(format!(
			"{frame} expects {len} bytes, got {}",
			buf.len()
		)));
	}
	Ok(())
}

/// VER, NMETHODS, METHODS, we only ever offer one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Greeting {
	pub method: u8,
}

impl Greeting {
	pub const LEN: usize = 3;

	pub fn encode(&self) -> [u8; Self::LEN] {
		[SOCKS5_VER, 1, self.method]
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSelection {
	pub version: u8,
	pub method: u8,
}

impl MethodSelection {
	pub const LEN: usize = 2;

	pub fn decode(buf: &[u8]) -> Result<Self> {
		expect_len("method selection", buf, Self::LEN)?;
		Ok(Self {
			version: buf[0],
			method: buf[1],
		})
	}
}

/// RFC 1929 username/password request.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AuthRequest<'a> {
	pub username: &'a str,
	pub password: &'a str,
}

impl<'a> std::fmt::Debug for AuthRequest<'a> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AuthRequest")
			.field("username", &self.username)
			.finish_non_exhaustive()
	}
}

impl<'a> AuthRequest<'a> {
	pub fn encode(&self) -> Result<BytesMut> {
		let ulen = check_len("UNAME", self.username.len())?;
		let plen = check_len("PASSWD", self.password.len())?;
		let mut buf = BytesMut::with_capacity(3 + ulen as usize + plen as usize);
		buf.put_u8(SOCKS5_AUTH_VER);
		buf.put_u8(ulen);
		buf.put_slice(self.username.as_bytes());
		buf.put_u8(plen);
		buf.put_slice(self.password.as_bytes());
		Ok(buf)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthResponse {
	pub version: u8,
	pub status: u8,
}

impl AuthResponse {
	pub const LEN: usize = 2;

	pub fn decode(buf: &[u8]) -> Result<Self> {
		expect_len("auth response", buf, Self::LEN)?;
		Ok(Self {
			version: buf[0],
			status: buf[1],
		})
	}

	pub fn succeeded(&self) -> bool {
		self.status == SOCKS5_AUTH_SUCCEED
	}
}

/// VER, CMD(CONNECT), RSV, then the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest<'a> {
	pub dst: Dst<'a>,
}

impl<'a> ConnectRequest<'a> {
	/// With `dns_tunnel` the proxy resolves `host`,
	/// otherwise it's resolved here and sent as an IPv4 address.
	pub async fn new(host: &'a str, port: u16, dns_tunnel: bool) -> Result<Self> {
		let addr: Addr = if dns_tunnel {
			check_len("DST.ADDR", host.len())?;
			host.into()
		} else {
			resolve_v4(host, port).await?.into()
		};
		Ok(Self {
			dst: Dst { addr, port },
		})
	}

	pub fn ipv4(addr: Ipv4Addr, port: u16) -> Self {
		Self {
			dst: (addr, port).into(),
		}
	}

	pub fn encode(&self) -> Result<BytesMut> {
		let mut buf = BytesMut::with_capacity(4 + 1 + 0xff + 2);
		buf.put_slice(&[SOCKS5_VER, SOCKS5_CMD_CONNECT, SOCKS5_RSV]);
		put_dst(&mut buf, &self.dst)?;
		Ok(buf)
	}
}

/// VER, REP, RSV, then the bound address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
	pub version: u8,
	pub result: u8,
	pub reserved: u8,
	pub bound: Dst<'static>,
}

impl ConnectResponse {
	/// VER, REP, RSV, ATYP
	pub const HEAD_LEN: usize = 4;
	/// the common case, an IPv4 BND.ADDR
	pub const IPV4_LEN: usize = Self::HEAD_LEN + 4 + 2;
	pub const MAX_LEN: usize = Self::HEAD_LEN + 1 + 0xff + 2;

	/// Length of the whole reply, `domain_len` only matters for DOMAINNAME.
	/// Unknown address types are taken as IPv4 sized.
	pub fn reply_len(atyp: u8, domain_len: u8) -> usize {
		Self::HEAD_LEN
			+ match atyp {
				SOCKS5_ATYP_V6 => 16 + 2,
				SOCKS5_ATYP_DOMAINNAME => 1 + domain_len as usize + 2,
				_ => 4 + 2,
			}
	}

	/// Decodes one complete reply, `buf` must hold exactly that.
	pub fn decode(buf: &[u8]) -> Result<Self> {
		if buf.len() < Self::HEAD_LEN {
			return Err(Error::Protocol(format!(
				"connect response truncated, {} bytes",
				buf.len()
			)));
		}
		let bound = match buf[3] {
			SOCKS5_ATYP_V4 | SOCKS5_ATYP_V6 | SOCKS5_ATYP_DOMAINNAME => {
				let (bound, n) = parse_dst(&buf[3..])?;
				expect_len("connect response", buf, 3 + n)?;
				bound
			}
			atyp => {
				// only REP matters, BND.ADDR is consumed and dropped
				expect_len("connect response", buf, Self::IPV4_LEN)?;
				warn!("unknown BND ATYP {atyp}, bound address left unspecified");
				Dst::from((Ipv4Addr::UNSPECIFIED, 0))
			}
		};
		Ok(Self {
			version: buf[0],
			result: buf[1],
			reserved: buf[2],
			bound,
		})
	}

	pub fn atyp(&self) -> u8 {
		self.bound.addr.atyp()
	}
}

#[cfg(test)]
mod tests {
	use rand::{distr::Alphanumeric, rng, Rng};

	use super::*;

	#[test]
	fn test_method_selection() {
		for method in [SOCKS5_NO_AUTH_REQUIRED, SOCKS5_USERNAME_PASSWORD] {
			let greeting = Greeting { method }.encode();
			assert_eq!(greeting, [5, 1, method]);
			// a proxy accepting the offer echoes it back
			let sel = MethodSelection::decode(&[SOCKS5_VER, greeting[2]]).unwrap();
			assert_eq!(sel.version, SOCKS5_VER);
			assert_eq!(sel.method, method);
		}
		assert!(matches!(
			MethodSelection::decode(&[5, 0, 0]),
			Err(Error::Protocol(_))
		));
		assert!(matches!(
			MethodSelection::decode(&[5]),
			Err(Error::Protocol(_))
		));
	}

	#[test]
	fn test_auth_framing() {
		let mut rand = rng();
		for _ in 0..0x100 {
			let ulen = rand.random_range(0..=0xff);
			let plen = rand.random_range(0..=0xff);
			let username: String = (&mut rand)
				.sample_iter(&Alphanumeric)
				.take(ulen)
				.map(char::from)
				.collect();
			let password: String = (&mut rand)
				.sample_iter(&Alphanumeric)
				.take(plen)
				.map(char::from)
				.collect();
			let buf = AuthRequest {
				username: &username,
				password: &password,
			}
			.encode()
			.unwrap();
			assert_eq!(buf.len(), 3 + ulen + plen);
			assert_eq!(buf[0], SOCKS5_AUTH_VER);
			assert_eq!(buf[1] as usize, ulen);
			assert_eq!(&buf[2..2 + ulen], username.as_bytes());
			assert_eq!(buf[2 + ulen] as usize, plen);
			assert_eq!(&buf[3 + ulen..], password.as_bytes());
		}
	}

	#[test]
	fn test_auth_too_long() {
		let long = "u".repeat(0x100);
		let r = AuthRequest {
			username: &long,
			password: "p",
		}
		.encode();
		assert!(matches!(
			r,
			Err(Error::Encoding {
				field: "UNAME",
				len: 0x100
			})
		));
		let r = AuthRequest {
			username: "u",
			password: &long,
		}
		.encode();
		assert!(matches!(r, Err(Error::Encoding { field: "PASSWD", .. })));
	}

	#[test]
	fn test_auth_response() {
		let ok = AuthResponse::decode(&[SOCKS5_AUTH_VER, 0]).unwrap();
		assert!(ok.succeeded());
		let bad = AuthResponse::decode(&[SOCKS5_AUTH_VER, 1]).unwrap();
		assert!(!bad.succeeded());
		assert!(AuthResponse::decode(&[1]).is_err());
	}

	#[tokio::test]
	async fn test_connect_domain() {
		let req = ConnectRequest::new("example.com", 443, true).await.unwrap();
		assert_eq!(
			&req.encode().unwrap()[..],
			&[
				0x05, 0x01, 0x00, 0x03, 0x0b, 0x65, 0x78, 0x61, 0x6d, 0x70, 0x6c, 0x65, 0x2e, 0x63,
				0x6f, 0x6d, 0x01, 0xbb
			]
		);
	}

	#[tokio::test]
	async fn test_connect_ipv4() {
		let req = ConnectRequest::new("10.0.0.1", 80, false).await.unwrap();
		assert_eq!(
			&req.encode().unwrap()[..],
			&[0x05, 0x01, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x01, 0x00, 0x50]
		);
		assert_eq!(req, ConnectRequest::ipv4(Ipv4Addr::new(10, 0, 0, 1), 80));
	}

	#[tokio::test]
	async fn test_connect_domain_too_long() {
		let host = "h".repeat(0x100);
		let r = ConnectRequest::new(&host, 80, true).await;
		assert!(matches!(r, Err(Error::Encoding { field: "DST.ADDR", .. })));
	}

	#[test]
	fn test_connect_response() {
		let rep =
			ConnectResponse::decode(&[5, 0, 0, 1, 192, 168, 1, 1, 0x04, 0x38]).unwrap();
		assert_eq!(rep.version, 5);
		assert_eq!(rep.result, 0);
		assert_eq!(rep.atyp(), SOCKS5_ATYP_V4);
		assert_eq!(rep.bound, Dst::from((Ipv4Addr::new(192, 168, 1, 1), 1080)));

		let rep = ConnectResponse::decode(&[5, 4, 0, 3, 2, b'p', b'x', 0, 80]).unwrap();
		assert_eq!(rep.result, 4);
		assert_eq!(rep.bound, Dst::from(("px", 80)));

		// one byte short, one byte long
		assert!(ConnectResponse::decode(&[5, 0, 0, 1, 0, 0, 0, 0, 0]).is_err());
		assert!(ConnectResponse::decode(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0]).is_err());
		assert!(ConnectResponse::decode(&[5, 0]).is_err());
	}

	#[test]
	fn test_connect_response_unknown_atyp() {
		assert_eq!(ConnectResponse::reply_len(0, 0xaa), ConnectResponse::IPV4_LEN);
		assert_eq!(ConnectResponse::reply_len(SOCKS5_ATYP_DOMAINNAME, 4), 4 + 1 + 4 + 2);

		let rep = ConnectResponse::decode(&[5, 0, 0, 0, 1, 2, 3, 4, 0, 80]).unwrap();
		assert_eq!(rep.result, 0);
		assert_eq!(rep.bound, Dst::from((Ipv4Addr::UNSPECIFIED, 0)));
		assert!(ConnectResponse::decode(&[5, 0, 0, 9, 1, 2, 3, 4, 0]).is_err());
	}
}
