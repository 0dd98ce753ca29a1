// https://datatracker.ietf.org/doc/html/rfc1928
// https://datatracker.ietf.org/doc/html/rfc1929
// client side only, CONNECT only

mod addr;
mod client;
mod common;
mod config;
mod error;
pub mod frame;
mod reply;
mod socket;
mod stream;

pub use addr::{Addr, Dst};
pub use client::{negotiate, Tunnel};
pub use config::{ProxyConfig, DEFAULT_PROXY_PORT};
pub use error::{Error, Result};
pub use reply::{classify, ReplyKind};
pub use socket::{ProxyClient, DEFAULT_CONNECT_TIMEOUT};
pub use stream::{MaybeTlsStream, TlsOptions};
