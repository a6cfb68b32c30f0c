/*
 * net.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Cassetta, a cross-platform email client.
 *
 * Cassetta is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Cassetta is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Cassetta.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Socket layer: plain TCP or implicit-TLS streams behind one `NetStream`
//! type, plus bounded-retry dialing with increasing backoff.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::RootCertStore;
use tokio_rustls::TlsConnector;

use crate::config::ConnectionSettings;
use crate::error::MailError;

/// Connect retry policy: attempts and first backoff step. Each retry doubles
/// the delay (500ms, 1s, 2s).
pub const CONNECT_ATTEMPTS: u32 = 3;
pub const CONNECT_BACKOFF_MS: u64 = 500;

/// Build a root certificate store: platform native certs first, then
/// webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

static DEFAULT_CONNECTOR: std::sync::OnceLock<TlsConnector> = std::sync::OnceLock::new();

fn default_connector() -> &'static TlsConnector {
    DEFAULT_CONNECTOR.get_or_init(|| {
        let config = ClientConfig::builder()
            .with_root_certificates(build_root_store())
            .with_no_client_auth();
        TlsConnector::from(Arc::new(config))
    })
}

fn server_name(host: &str) -> io::Result<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))
}

/// One established connection, plain or TLS. The session layer reads and
/// writes through this without caring which.
pub enum NetStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl NetStream {
    /// Single dial attempt: TCP connect, then immediate TLS handshake when
    /// the settings call for implicit TLS.
    async fn dial(settings: &ConnectionSettings) -> io::Result<Self> {
        let addr = format!("{}:{}", settings.host, settings.port);
        let tcp = TcpStream::connect(&addr).await?;
        if settings.implicit_tls() {
            let name = server_name(&settings.host)?;
            let tls = default_connector()
                .connect(name, tcp)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
            Ok(NetStream::Tls(Box::new(tls)))
        } else {
            Ok(NetStream::Plain(tcp))
        }
    }
}

impl AsyncRead for NetStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            NetStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for NetStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            NetStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_flush(cx),
            NetStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            NetStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Dial with bounded retries and increasing backoff. Returns the stream and
/// the number of retries that were needed; exhausting the attempts is a
/// terminal ConnectionError, never a silent retry-forever.
pub async fn connect_with_retry(
    settings: &ConnectionSettings,
) -> Result<(NetStream, u32), MailError> {
    let mut backoff = Duration::from_millis(CONNECT_BACKOFF_MS);
    let mut last_error = String::new();
    for attempt in 0..CONNECT_ATTEMPTS {
        match NetStream::dial(settings).await {
            Ok(stream) => return Ok((stream, attempt)),
            Err(e) => {
                log::warn!(
                    "connect to {}:{} failed (attempt {}/{}): {}",
                    settings.host,
                    settings.port,
                    attempt + 1,
                    CONNECT_ATTEMPTS,
                    e
                );
                last_error = e.to_string();
            }
        }
        if attempt + 1 < CONNECT_ATTEMPTS {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }
    Err(MailError::connection(format!(
        "{}:{} unreachable after {} attempts: {}",
        settings.host, settings.port, CONNECT_ATTEMPTS, last_error
    )))
}
