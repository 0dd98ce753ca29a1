use thiserror::Error;

use crate::reply::ReplyKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
	/// connect, read or write on the underlying stream failed, timeouts included
	#[error("transport error: {0}")]
	Transport(#[from] std::io::Error),
	/// a frame handed to a decoder has the wrong shape
	#[error("protocol error: {0}")]
	Protocol(String),
	#[error("SOCKS version {0} is not supported")]
	UnsupportedVersion(u8),
	#[error("SOCKS authentication method 0x{offered:02x} not supported, proxy chose 0x{selected:02x}")]
	AuthMethodUnsupported { offered: u8, selected: u8 },
	#[error("SOCKS username/password authentication failed, status 0x{0:02x}")]
	AuthenticationFailed(u8),
	#[error("SOCKS connection request failed: {message} (0x{code:02x})")]
	ConnectionRejected {
		code: u8,
		kind: ReplyKind,
		message: &'static str,
	},
	#[error("{field} too long ({len} > 255), can not be framed")]
	Encoding { field: &'static str, len: usize },
	#[error("failed to resolve {host}: {source}")]
	Resolution {
		host: String,
		source: std::io::Error,
	},
	#[error("TLS error: {0}")]
	Tls(#[from] native_tls::Error),
	#[error("invalid proxy config: {0}")]
	InvalidConfig(String),
}

impl Error {
	/// The stream itself failed, as opposed to the proxy refusing something.
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Transport(_))
	}

	pub(crate) fn timed_out(what: impl std::fmt::Display) -> Self {
		Self::Transport(std::io::Error::new(
			std::io::ErrorKind::TimedOut,
			format!("{what} timed out"),
		))
	}

	pub(crate) fn not_connected() -> Self {
		Self::Transport(std::io::ErrorKind::NotConnected.into())
	}
}
