use log::*;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{addr::Dst, common::*, config::ProxyConfig, frame::*, reply::rejection, Error, Result};

/// A stream the proxy has connected to the destination.
#[derive(Debug)]
pub struct Tunnel<T> {
	stream: T,
	bound: Dst<'static>,
}

impl<T> Tunnel<T> {
	/// BND.ADDR and BND.PORT as reported by the proxy.
	pub fn bound(&self) -> &Dst<'static> {
		&self.bound
	}

	pub fn get_mut(&mut self) -> &mut T {
		&mut self.stream
	}

	pub fn into_inner(self) -> T {
		self.stream
	}

	pub fn into_parts(self) -> (T, Dst<'static>) {
		(self.stream, self.bound)
	}
}

/// Runs the SOCKS5 handshake on `io`, asking the proxy to CONNECT to `host:port`.
///
/// `io` is dropped on any failure, there is no retry.
pub async fn negotiate<T: AsyncRead + AsyncWrite + Unpin>(
	mut io: T,
	config: &ProxyConfig,
	host: &str,
	port: u16,
) -> Result<Tunnel<T>> {
	let method = config.auth_method();

	// frame everything up front, nothing hits the wire if a field can't be framed
	let auth = if method == SOCKS5_USERNAME_PASSWORD {
		Some(
			AuthRequest {
				username: &config.username,
				password: &config.password,
			}
			.encode()?,
		)
	} else {
		None
	};
	let connect = ConnectRequest::new(host, port, config.dns_tunnel)
		.await?
		.encode()?;

	// VER, REP, RSV, ATYP, BND.ADDR, BND.PORT
	let mut buf = [0u8; ConnectResponse::MAX_LEN];

	io.write_all(&Greeting { method }.encode())
		.await
		.inspect_err(|e| error!("failed to write greeting: {e}"))?;
	io.read_exact(&mut buf[..MethodSelection::LEN])
		.await
		.inspect_err(|e| error!("failed to read method selection: {e}"))?;
	let sel = MethodSelection::decode(&buf[..MethodSelection::LEN])?;
	expect("VER", sel.version, SOCKS5_VER).ok_or(Error::UnsupportedVersion(sel.version))?;
	expect("METHOD", sel.method, method).ok_or(Error::AuthMethodUnsupported {
		offered: method,
		selected: sel.method,
	})?;
	debug!("method 0x{method:02x} accepted by proxy");

	if let Some(auth) = auth {
		io.write_all(&auth)
			.await
			.inspect_err(|e| error!("failed to write auth request: {e}"))?;
		io.read_exact(&mut buf[..AuthResponse::LEN])
			.await
			.inspect_err(|e| error!("failed to read auth response: {e}"))?;
		let resp = AuthResponse::decode(&buf[..AuthResponse::LEN])?;
		if !resp.succeeded() {
			error!("authentication as {} rejected", config.username);
			return Err(Error::AuthenticationFailed(resp.status));
		}
		debug!("authenticated as {}", config.username);
	}

	io.write_all(&connect)
		.await
		.inspect_err(|e| error!("failed to write connect request: {e}"))?;
	let rep = read_reply(&mut io, &mut buf).await?;
	info!("tunnel to {}:{} established, bound {}", host, port, rep.bound);

	Ok(Tunnel {
		stream: io,
		bound: rep.bound,
	})
}

// header first, the tail length depends on ATYP;
// like the rest of the reply VER is not looked at, only REP is
async fn read_reply<T: AsyncRead + Unpin>(
	io: &mut T,
	buf: &mut [u8; ConnectResponse::MAX_LEN],
) -> Result<ConnectResponse> {
	let head = ConnectResponse::HEAD_LEN;
	io.read_exact(&mut buf[..head])
		.await
		.inspect_err(|e| error!("failed to read connect response: {e}"))?;
	if buf[1] != SOCKS5_REP_SUCCEED {
		let e = rejection(buf[1]);
		error!("{e}");
		return Err(e);
	}

	let mut n = head;
	if buf[3] == SOCKS5_ATYP_DOMAINNAME {
		io.read_exact(&mut buf[n..n + 1])
			.await
			.inspect_err(|e| error!("failed to read BND.ADDR len: {e}"))?;
		n += 1;
	}
	let end = ConnectResponse::reply_len(buf[3], buf[head]);
	io.read_exact(&mut buf[n..end])
		.await
		.inspect_err(|e| error!("failed to read BND.ADDR: {e}"))?;
	ConnectResponse::decode(&buf[..end])
}
