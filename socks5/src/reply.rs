use crate::common::*;

/// What a non-zero REP field of a CONNECT reply means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
	GeneralFailure,
	NotAllowed,
	NetworkUnreachable,
	HostUnreachable,
	ConnectionRefused,
	TtlExpired,
	CommandNotSupported,
	AddressTypeNotSupported,
	Unknown,
}

// total over u8, REP_SUCCEED included since it's never a failure reason
pub fn classify(code: u8) -> (&'static str, ReplyKind) {
	match code {
		SOCKS5_REP_GENERAL_FAILURE => ("General failure", ReplyKind::GeneralFailure),
		SOCKS5_REP_NOT_ALLOWED => (
			"Connection not allowed by ruleset",
			ReplyKind::NotAllowed,
		),
		SOCKS5_REP_NETWORK_UNREACHABLE => ("Network unreachable", ReplyKind::NetworkUnreachable),
		SOCKS5_REP_HOST_UNREACHABLE => ("Host unreachable", ReplyKind::HostUnreachable),
		SOCKS5_REP_CONNECTION_REFUSED => (
			"Connection refused by destination host",
			ReplyKind::ConnectionRefused,
		),
		SOCKS5_REP_TTL_EXPIRED => ("TTL expired", ReplyKind::TtlExpired),
		SOCKS5_REP_CMD_NOT_SUPPORTED => (
			"command not supported / protocol error",
			ReplyKind::CommandNotSupported,
		),
		SOCKS5_REP_ATYP_NOT_SUPPORTED => (
			"address type not supported",
			ReplyKind::AddressTypeNotSupported,
		),
		_ => ("Unknown error", ReplyKind::Unknown),
	}
}

/// Builds the error reported for a refused CONNECT.
pub fn rejection(code: u8) -> crate::Error {
	let (message, kind) = classify(code);
	crate::Error::ConnectionRejected {
		code,
		kind,
		message,
	}
}
