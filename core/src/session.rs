/*
 * session.rs
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

//! Transport session shared by both protocol clients.
//!
//! Strictly one command in flight: a fair async mutex guards the stream, so
//! concurrent callers queue FIFO behind the in-flight request and the lock is
//! held from just before the command bytes go out until the terminal response
//! line has been classified. Every inbound byte (line or literal) is added to
//! a cumulative counter that backs progress estimation and never resets for
//! the life of the session.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::config::ConnectionSettings;
use crate::error::MailError;
use crate::net::{connect_with_retry, NetStream};
use crate::protocol::{LineOutcome, Response, ResponseClassifier, ResponseLine, ResponseStatus};

/// Connection lifecycle. Closed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

const STATUS_DISCONNECTED: u8 = 0;
const STATUS_CONNECTING: u8 = 1;
const STATUS_OPEN: u8 = 2;
const STATUS_CLOSED: u8 = 3;

struct SessionIo<S> {
    stream: S,
    read_buf: Vec<u8>,
}

/// A session over one socket. Owned by exactly one protocol client; generic
/// over the stream so tests can drive it with in-memory duplex pipes.
pub struct Session<S> {
    io: Mutex<Option<SessionIo<S>>>,
    status: AtomicU8,
    bytes_received: Arc<AtomicU64>,
    retries: u32,
}

/// Production session over a plain or TLS socket.
pub type MailSession = Session<NetStream>;

impl MailSession {
    /// Open the socket for the configured host/port. Fails with a terminal
    /// ConnectionError once the bounded retries are exhausted.
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, MailError> {
        log::debug!("connecting to {}:{}", settings.host, settings.port);
        let (stream, retries) = connect_with_retry(settings).await?;
        let mut session = Session::from_stream(stream);
        session.retries = retries;
        Ok(session)
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-established stream. Status starts at Open.
    pub fn from_stream(stream: S) -> Self {
        Self {
            io: Mutex::new(Some(SessionIo {
                stream,
                read_buf: Vec::with_capacity(4096),
            })),
            status: AtomicU8::new(STATUS_OPEN),
            bytes_received: Arc::new(AtomicU64::new(0)),
            retries: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self.status.load(Ordering::SeqCst) {
            STATUS_DISCONNECTED => SessionStatus::Disconnected,
            STATUS_CONNECTING => SessionStatus::Connecting,
            STATUS_OPEN => SessionStatus::Open,
            _ => SessionStatus::Closed,
        }
    }

    /// Cumulative inbound byte count for this session.
    pub fn stream_amount(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    /// Shared handle to the byte counter, for the progress driver.
    pub fn byte_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.bytes_received)
    }

    /// Connect retries that were needed to reach Open.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Send a CRLF-terminated command line and read its classified response.
    pub async fn request(
        &self,
        command: &str,
        classifier: &dyn ResponseClassifier,
    ) -> Result<Response, MailError> {
        let mut line = Vec::with_capacity(command.len() + 2);
        line.extend_from_slice(command.as_bytes());
        line.extend_from_slice(b"\r\n");
        self.exchange(&line, classifier).await
    }

    /// Send pre-framed raw bytes (e.g. a DATA payload that carries its own
    /// terminator) and read the classified response.
    pub async fn request_raw(
        &self,
        payload: &[u8],
        classifier: &dyn ResponseClassifier,
    ) -> Result<Response, MailError> {
        self.exchange(payload, classifier).await
    }

    /// Read a response without sending anything (server greeting).
    pub async fn read_unsolicited(
        &self,
        classifier: &dyn ResponseClassifier,
    ) -> Result<Response, MailError> {
        self.exchange(&[], classifier).await
    }

    async fn exchange(
        &self,
        outbound: &[u8],
        classifier: &dyn ResponseClassifier,
    ) -> Result<Response, MailError> {
        if self.status() == SessionStatus::Closed {
            return Err(MailError::SessionClosed);
        }
        // Fair mutex: callers are served strictly in arrival order.
        let mut guard = self.io.lock().await;
        let io = guard.as_mut().ok_or(MailError::SessionClosed)?;
        let result = Self::exchange_io(io, outbound, classifier, &self.bytes_received).await;
        if result.is_err() {
            // Connection dropped mid-exchange: the session is unusable.
            *guard = None;
            self.status.store(STATUS_CLOSED, Ordering::SeqCst);
        }
        result
    }

    async fn exchange_io(
        io: &mut SessionIo<S>,
        outbound: &[u8],
        classifier: &dyn ResponseClassifier,
        counter: &AtomicU64,
    ) -> Result<Response, MailError> {
        if !outbound.is_empty() {
            io.stream.write_all(outbound).await?;
            io.stream.flush().await?;
        }
        let mut lines = Vec::new();
        loop {
            let raw = read_wire_line(&mut io.stream, &mut io.read_buf, counter).await?;
            let literal = match classifier.literal_size(&raw) {
                Some(n) if n > MAX_LITERAL_LEN => {
                    return Err(MailError::framing(format!(
                        "declared literal of {} bytes exceeds maximum",
                        n
                    )));
                }
                Some(n) => {
                    let mut data = vec![0u8; n];
                    io.stream.read_exact(&mut data).await?;
                    counter.fetch_add(n as u64, Ordering::Relaxed);
                    Some(data)
                }
                None => None,
            };
            let outcome = classifier.classify(&raw);
            lines.push(ResponseLine::new(raw, literal));
            if let LineOutcome::Terminal(ok) = outcome {
                let status = if ok {
                    ResponseStatus::Success
                } else {
                    ResponseStatus::Failure
                };
                return Ok(Response { status, lines });
            }
        }
    }

    /// Sever the connection. Terminal: queued and future requests fail fast
    /// with SessionClosed.
    pub async fn close(&self) {
        self.status.store(STATUS_CLOSED, Ordering::SeqCst);
        let mut guard = self.io.lock().await;
        if let Some(mut io) = guard.take() {
            let _ = io.stream.shutdown().await;
        }
    }
}

/// A protocol line beyond this length means the stream is desynchronized
/// (most likely literal bytes leaking into line parsing).
const MAX_LINE_LEN: usize = 1024 * 1024;

/// Ceiling on a server-declared literal. The count comes off the wire, so
/// it must never be allocated or awaited unchecked; anything larger than
/// the biggest plausible message body is a framing failure.
const MAX_LITERAL_LEN: usize = 256 * 1024 * 1024;

/// Read one CRLF-terminated line, stripped of the terminator. Bare LF is
/// tolerated. Each byte read is added to the session counter.
async fn read_wire_line<S>(
    stream: &mut S,
    buf: &mut Vec<u8>,
    counter: &AtomicU64,
) -> Result<String, MailError>
where
    S: AsyncRead + Unpin,
{
    buf.clear();
    loop {
        let mut b = [0u8; 1];
        let n = stream.read(&mut b).await?;
        if n == 0 {
            return Err(MailError::connection("connection closed by peer"));
        }
        counter.fetch_add(1, Ordering::Relaxed);
        buf.push(b[0]);
        if b[0] == b'\n' {
            break;
        }
        if buf.len() > MAX_LINE_LEN {
            return Err(MailError::framing("response line exceeds maximum length"));
        }
    }
    let mut end = buf.len() - 1;
    if end > 0 && buf[end - 1] == b'\r' {
        end -= 1;
    }
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}
