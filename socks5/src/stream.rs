use std::{
	io,
	pin::Pin,
	task::{Context, Poll},
};

use log::*;
use native_tls::Protocol;
use tokio::{
	io::{AsyncRead, AsyncWrite, ReadBuf},
	net::TcpStream,
};
use tokio_native_tls::{TlsConnector, TlsStream};

use crate::Result;

/// The transport owned by a [`ProxyClient`](crate::ProxyClient), tunneled or not.
pub enum MaybeTlsStream {
	Plain(TcpStream),
	Tls(TlsStream<TcpStream>),
}

impl MaybeTlsStream {
	pub fn is_tls(&self) -> bool {
		matches!(self, Self::Tls(_))
	}
}

impl AsyncRead for MaybeTlsStream {
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &mut ReadBuf<'_>,
	) -> Poll<io::Result<()>> {
		match self.get_mut() {
			Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
			Self::Tls(s) => Pin::new(s).poll_read(cx, buf),
		}
	}
}

impl AsyncWrite for MaybeTlsStream {
	fn poll_write(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &[u8],
	) -> Poll<io::Result<usize>> {
		match self.get_mut() {
			Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
			Self::Tls(s) => Pin::new(s).poll_write(cx, buf),
		}
	}

	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		match self.get_mut() {
			Self::Plain(s) => Pin::new(s).poll_flush(cx),
			Self::Tls(s) => Pin::new(s).poll_flush(cx),
		}
	}

	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		match self.get_mut() {
			Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
			Self::Tls(s) => Pin::new(s).poll_shutdown(cx),
		}
	}
}

/// Knobs for the TLS upgrade of an established (possibly tunneled) stream.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
	/// SNI and certificate name, the destination host if unset
	pub domain: Option<String>,
	pub min_protocol: Option<Protocol>,
	pub max_protocol: Option<Protocol>,
	pub accept_invalid_certs: bool,
	pub accept_invalid_hostnames: bool,
}

impl TlsOptions {
	pub fn insecure() -> Self {
		Self {
			accept_invalid_certs: true,
			accept_invalid_hostnames: true,
			..Default::default()
		}
	}
}

pub async fn upgrade(tcp: TcpStream, host: &str, opts: &TlsOptions) -> Result<MaybeTlsStream> {
	let mut builder = native_tls::TlsConnector::builder();
	// leave native-tls defaults alone unless asked
	if opts.min_protocol.is_some() {
		builder.min_protocol_version(opts.min_protocol);
	}
	if opts.max_protocol.is_some() {
		builder.max_protocol_version(opts.max_protocol);
	}
	builder
		.danger_accept_invalid_certs(opts.accept_invalid_certs)
		.danger_accept_invalid_hostnames(opts.accept_invalid_hostnames);
	let connector = TlsConnector::from(
		builder
			.build()
			.inspect_err(|e| error!("failed to build TLS connector: {e}"))?,
	);

	let domain = opts.domain.as_deref().unwrap_or(host);
	let s = connector
		.connect(domain, tcp)
		.await
		.inspect_err(|e| error!("TLS handshake with {domain} failed: {e}"))?;
	debug!("TLS established with {domain}");
	Ok(MaybeTlsStream::Tls(s))
}
