/*
 * mod.rs
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

//! Protocol clients and the correlation contract they share.
//!
//! Both clients exchange CRLF lines over one Session; what differs is how a
//! response line is matched to the in-flight request. IMAP correlates by tag,
//! SMTP by response code; each supplies a [`ResponseClassifier`] strategy and
//! the session stays protocol-agnostic.

pub mod imap;
pub mod smtp;

/// Terminal classification of a response. A Failure is a protocol-level
/// refusal (NO/BAD, negative code); it is reported as a value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Failure,
}

/// One line of a response: raw text, whitespace tokens, and any literal
/// payload that followed the line on the wire.
#[derive(Debug, Clone)]
pub struct ResponseLine {
    pub raw: String,
    pub tokens: Vec<String>,
    pub literal: Option<Vec<u8>>,
}

impl ResponseLine {
    pub fn new(raw: String, literal: Option<Vec<u8>>) -> Self {
        let tokens = raw.split_whitespace().map(str::to_string).collect();
        Self {
            raw,
            tokens,
            literal,
        }
    }
}

/// Classified response: status plus the ordered lines that formed it.
/// Immutable once produced by the session.
#[derive(Debug)]
pub struct Response {
    pub status: ResponseStatus,
    pub lines: Vec<ResponseLine>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Raw text of the terminal line (last line read).
    pub fn terminal_line(&self) -> &str {
        self.lines.last().map(|l| l.raw.as_str()).unwrap_or("")
    }

    /// First literal payload carried by any line of this response.
    pub fn first_literal(&self) -> Option<&[u8]> {
        self.lines.iter().find_map(|l| l.literal.as_deref())
    }
}

/// What one inbound line means for the in-flight request.
#[derive(Debug, Clone, Copy)]
pub enum LineOutcome {
    /// Intermediate line; keep reading.
    Data,
    /// Terminal line; the request is done with the given success flag.
    Terminal(bool),
}

/// Per-request correlation strategy. IMAP uses a tag, SMTP an accepted
/// response-code set; the session only sees this interface.
pub trait ResponseClassifier: Send + Sync {
    /// If the line announces a byte-counted literal, its octet count. The
    /// session then consumes exactly that many raw bytes before resuming
    /// line parsing.
    fn literal_size(&self, _line: &str) -> Option<usize> {
        None
    }

    /// Classify one complete line.
    fn classify(&self, line: &str) -> LineOutcome;
}
