/*
 * error.rs
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

//! Error taxonomy. Transport damage and local refusals are errors; a
//! protocol-level refusal (NO/BAD, negative reply code) is a response
//! status, not an error, and never appears here.

use std::error::Error;
use std::fmt;
use std::io;

/// Everything a session or client operation can fail with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    /// The connection could not be established or died underneath us.
    Connection(String),
    /// The session was closed; the request never touched the wire.
    SessionClosed,
    /// An operation that requires authentication ran before login.
    NotAuthorized,
    /// Locally rejected input, caught before anything was sent.
    Validation(String),
    /// Inbound data that could not be framed into lines and literals.
    Framing(String),
}

impl MailError {
    pub fn connection(message: impl Into<String>) -> Self {
        MailError::Connection(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        MailError::Validation(message.into())
    }

    pub fn framing(message: impl Into<String>) -> Self {
        MailError::Framing(message.into())
    }

    /// True for failures that mean the underlying socket is gone.
    pub fn is_connection(&self) -> bool {
        matches!(self, MailError::Connection(_) | MailError::SessionClosed)
    }
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::Connection(msg) => write!(f, "connection error: {}", msg),
            MailError::SessionClosed => write!(f, "session is closed"),
            MailError::NotAuthorized => write!(f, "not authorized"),
            MailError::Validation(msg) => write!(f, "invalid input: {}", msg),
            MailError::Framing(msg) => write!(f, "framing error: {}", msg),
        }
    }
}

impl Error for MailError {}

impl From<io::Error> for MailError {
    fn from(e: io::Error) -> Self {
        MailError::Connection(e.to_string())
    }
}

/// Caps how many instances of a repeating error are surfaced to the user.
/// Once the cap is hit, further reports are counted silently until reset
/// (typically on reconnect).
#[derive(Debug)]
pub struct ErrorRateLimiter {
    limit: u32,
    count: u32,
}

impl ErrorRateLimiter {
    pub fn new(limit: u32) -> Self {
        Self { limit, count: 0 }
    }

    /// Record one occurrence; true while the error should still be shown.
    pub fn should_report(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.count <= self.limit
    }

    /// Occurrences swallowed since the cap was hit.
    pub fn suppressed(&self) -> u32 {
        self.count.saturating_sub(self.limit)
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_connection() {
        let err: MailError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, MailError::Connection(_)));
        assert!(err.is_connection());
    }

    #[test]
    fn refusals_are_not_connection_errors() {
        assert!(!MailError::NotAuthorized.is_connection());
        assert!(!MailError::validation("bad address").is_connection());
        assert!(MailError::SessionClosed.is_connection());
    }

    #[test]
    fn display_carries_the_detail() {
        let err = MailError::connection("refused");
        assert_eq!(err.to_string(), "connection error: refused");
    }

    #[test]
    fn rate_limiter_caps_then_counts() {
        let mut limiter = ErrorRateLimiter::new(3);
        for _ in 0..3 {
            assert!(limiter.should_report());
        }
        assert!(!limiter.should_report());
        assert!(!limiter.should_report());
        assert_eq!(limiter.suppressed(), 2);
        limiter.reset();
        assert!(limiter.should_report());
        assert_eq!(limiter.suppressed(), 0);
    }
}
