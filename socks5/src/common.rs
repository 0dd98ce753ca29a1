// https://datatracker.ietf.org/doc/html/rfc1928
pub const SOCKS5_VER: u8 = 5;
pub const SOCKS5_RSV: u8 = 0;

pub const SOCKS5_NO_AUTH_REQUIRED: u8 = 0;
pub const SOCKS5_USERNAME_PASSWORD: u8 = 2;

// https://datatracker.ietf.org/doc/html/rfc1929
pub const SOCKS5_AUTH_VER: u8 = 1;
pub const SOCKS5_AUTH_SUCCEED: u8 = 0;

pub const SOCKS5_CMD_CONNECT: u8 = 1;

pub const SOCKS5_ATYP_V4: u8 = 1;
pub const SOCKS5_ATYP_DOMAINNAME: u8 = 3;
pub const SOCKS5_ATYP_V6: u8 = 4;

pub const SOCKS5_REP_SUCCEED: u8 = 0;
pub const SOCKS5_REP_GENERAL_FAILURE: u8 = 1;
pub const SOCKS5_REP_NOT_ALLOWED: u8 = 2;
pub const SOCKS5_REP_NETWORK_UNREACHABLE: u8 = 3;
pub const SOCKS5_REP_HOST_UNREACHABLE: u8 = 4;
pub const SOCKS5_REP_CONNECTION_REFUSED: u8 = 5;
pub const SOCKS5_REP_TTL_EXPIRED: u8 = 6;
pub const SOCKS5_REP_CMD_NOT_SUPPORTED: u8 = 7;
pub const SOCKS5_REP_ATYP_NOT_SUPPORTED: u8 = 8;

// single byte length prefixes, for DST.ADDR, UNAME and PASSWD
pub const SOCKS5_MAX_FIELD_LEN: usize = 0xff;

use log::*;
use std::fmt::Display;

pub fn expect<T: Display + Eq>(name: impl Display, v: T, exp: T) -> Option<()> {
	if v != exp {
		error!("invalid {}, expecting {}, got {}", name, exp, v);
		None
	} else {
		Some(())
	}
}

pub fn check_len(field: &'static str, len: usize) -> crate::Result<u8> {
	if len > SOCKS5_MAX_FIELD_LEN {
		error!(
			"{} too long({} > {}), this is not supported",
			field, len, SOCKS5_MAX_FIELD_LEN
		);
		return Err(crate::Error::Encoding { field, len });
	}
	Ok(len as u8)
}
