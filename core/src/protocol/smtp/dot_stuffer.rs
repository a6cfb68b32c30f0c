/*
 * dot_stuffer.rs
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

//! Transparency stuffing for DATA payloads (RFC 5321 section 4.5.2): a dot
//! at the start of a line is doubled so message content can never be read as
//! the end-of-data terminator.

/// Streaming dot stuffer. Feed chunks in any split; line-start tracking
/// carries across calls.
pub struct DotStuffer {
    at_line_start: bool,
}

impl DotStuffer {
    pub fn new() -> Self {
        Self {
            at_line_start: true,
        }
    }

    /// Stuff one chunk into `out`.
    pub fn stuff(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &b in input {
            if self.at_line_start && b == b'.' {
                out.push(b'.');
            }
            out.push(b);
            self.at_line_start = b == b'\n';
        }
    }
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Stuff a complete payload in one pass.
pub fn dot_stuff(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + 8);
    DotStuffer::new().stuff(input, &mut out);
    out
}
