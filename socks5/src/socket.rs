use std::{future::Future, time::Duration};

use log::*;
use tokio::{
	io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream},
	net::TcpStream,
	time::timeout,
};

use crate::{
	addr::Dst,
	client::negotiate,
	config::ProxyConfig,
	stream::{upgrade, MaybeTlsStream, TlsOptions},
	Error, Result,
};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

async fn deadline<T>(
	limit: Option<Duration>,
	what: &str,
	f: impl Future<Output = Result<T>>,
) -> Result<T> {
	match limit {
		Some(d) => timeout(d, f).await.map_err(|_| {
			error!("{what} timed out after {d:?}");
			Error::timed_out(what)
		})?,
		None => f.await,
	}
}

/// A client connection that optionally goes through a SOCKS5 proxy.
///
/// Owns at most one transport at a time. Any failure in [`connect`](Self::connect)
/// leaves it disconnected, call `connect` again to retry.
pub struct ProxyClient {
	stream: Option<BufStream<MaybeTlsStream>>,
	bound: Option<Dst<'static>>,
	proxy: Option<ProxyConfig>,
	connect_timeout: Duration,
	io_timeout: Option<Duration>,
}

impl Default for ProxyClient {
	fn default() -> Self {
		Self::new(None)
	}
}

impl ProxyClient {
	pub fn new(proxy: Option<ProxyConfig>) -> Self {
		Self {
			stream: None,
			bound: None,
			proxy,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			io_timeout: None,
		}
	}

	/// Used by the next `connect`, an open connection is left alone.
	pub fn configure_proxy(&mut self, proxy: Option<ProxyConfig>) {
		self.proxy = proxy;
	}

	pub fn proxy(&self) -> Option<&ProxyConfig> {
		self.proxy.as_ref()
	}

	/// Limits establishing the TCP connection, to the proxy or to the destination.
	pub fn set_timeout(&mut self, connect_timeout: Duration) {
		self.connect_timeout = connect_timeout;
	}

	/// Limits the whole proxy handshake, the TLS upgrade, and each send/read afterwards.
	pub fn set_io_timeout(&mut self, io_timeout: Option<Duration>) {
		self.io_timeout = io_timeout;
	}

	pub fn is_connected(&self) -> bool {
		self.stream.is_some()
	}

	/// BND.ADDR/BND.PORT of the current tunnel, `None` for direct connections.
	pub fn bound_addr(&self) -> Option<&Dst<'static>> {
		self.bound.as_ref()
	}

	pub fn stream_mut(&mut self) -> Option<&mut BufStream<MaybeTlsStream>> {
		self.stream.as_mut()
	}

	pub async fn connect(&mut self, host: &str, port: u16, tls: Option<&TlsOptions>) -> Result<()> {
		self.disconnect().await;

		let (tcp, bound) = match &self.proxy {
			Some(proxy) => {
				let tcp = self.open(&proxy.hostname, proxy.port).await?;
				debug!("connected to proxy {}:{}", proxy.hostname, proxy.port);
				let tunnel = deadline(
					self.io_timeout,
					"SOCKS5 handshake",
					negotiate(tcp, proxy, host, port),
				)
				.await?;
				let (tcp, bound) = tunnel.into_parts();
				(tcp, Some(bound))
			}
			None => {
				let tcp = self.open(host, port).await?;
				info!("connected to {}:{} directly", host, port);
				(tcp, None)
			}
		};

		let stream = match tls {
			Some(opts) => {
				deadline(self.io_timeout, "TLS handshake", upgrade(tcp, host, opts)).await?
			}
			None => MaybeTlsStream::Plain(tcp),
		};

		self.stream = Some(BufStream::new(stream));
		self.bound = bound;
		Ok(())
	}

	async fn open(&self, host: &str, port: u16) -> Result<TcpStream> {
		let tcp = timeout(self.connect_timeout, TcpStream::connect((host, port)))
			.await
			.map_err(|_| {
				error!("connecting to {host}:{port} timed out");
				Error::timed_out(format!("connecting to {host}:{port}"))
			})?
			.inspect_err(|e| error!("connect to {host}:{port} failed: {e}"))?;
		let _ = tcp.set_nodelay(true);
		Ok(tcp)
	}

	/// Closes the transport, if any.
	pub async fn disconnect(&mut self) {
		self.bound = None;
		if let Some(mut s) = self.stream.take() {
			if let Err(e) = s.shutdown().await {
				debug!("error shutting down stream: {e}");
			}
		}
	}

	fn io(&mut self) -> Result<(&mut BufStream<MaybeTlsStream>, Option<Duration>)> {
		let io_timeout = self.io_timeout;
		match self.stream.as_mut() {
			Some(s) => Ok((s, io_timeout)),
			None => Err(Error::not_connected()),
		}
	}

	// a timed out send/read may have left a frame half done, the stream is unusable
	fn drop_on_timeout<T>(&mut self, r: Result<T>) -> Result<T> {
		if let Err(Error::Transport(e)) = &r {
			if e.kind() == std::io::ErrorKind::TimedOut {
				warn!("dropping connection after timeout");
				self.stream = None;
				self.bound = None;
			}
		}
		r
	}

	pub async fn send(&mut self, data: &[u8]) -> Result<()> {
		let (s, limit) = self.io()?;
		let r = deadline(limit, "send", async {
			s.write_all(data)
				.await
				.inspect_err(|e| error!("error sending data: {e}"))?;
			s.flush().await?;
			Ok::<_, Error>(())
		})
		.await;
		self.drop_on_timeout(r)
	}

	/// Up to `size` bytes, fewer if that's what is available, empty at EOF.
	pub async fn read(&mut self, size: usize) -> Result<Vec<u8>> {
		let (s, limit) = self.io()?;
		let r = deadline(limit, "read", async {
			let mut buf = vec![0u8; size];
			let n = s
				.read(&mut buf)
				.await
				.inspect_err(|e| error!("failed reading response: {e}"))?;
			buf.truncate(n);
			Ok::<_, Error>(buf)
		})
		.await;
		self.drop_on_timeout(r)
	}

	pub async fn read_exact(&mut self, size: usize) -> Result<Vec<u8>> {
		let (s, limit) = self.io()?;
		let r = deadline(limit, "read", async {
			let mut buf = vec![0u8; size];
			s.read_exact(&mut buf)
				.await
				.inspect_err(|e| error!("failed reading response: {e}"))?;
			Ok::<_, Error>(buf)
		})
		.await;
		self.drop_on_timeout(r)
	}

	/// Reads through `ending` (included), stopping early after `max` bytes or at EOF.
	pub async fn read_line(&mut self, max: usize, ending: u8) -> Result<Vec<u8>> {
		let (s, limit) = self.io()?;
		let r = deadline(limit, "read", async {
			let mut line = Vec::new();
			AsyncReadExt::take(s, max as u64)
				.read_until(ending, &mut line)
				.await
				.inspect_err(|e| error!("failed reading response: {e}"))?;
			Ok::<_, Error>(line)
		})
		.await;
		self.drop_on_timeout(r)
	}

	/// Reads until EOF, or until `max` bytes if given.
	pub async fn read_all(&mut self, max: Option<usize>) -> Result<Vec<u8>> {
		let (s, limit) = self.io()?;
		let r = deadline(limit, "read", async {
			let mut data = Vec::new();
			let r = match max {
				Some(max) => AsyncReadExt::take(s, max as u64).read_to_end(&mut data).await,
				None => s.read_to_end(&mut data).await,
			};
			r.inspect_err(|e| error!("failed reading response: {e}"))?;
			Ok::<_, Error>(data)
		})
		.await;
		self.drop_on_timeout(r)
	}
}
