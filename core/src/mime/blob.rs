/*
 * blob.rs
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

//! Binary materialization of decoded part content for attachment download
//! and inline display. Pure functions: identical input always yields
//! byte-identical output.

use crate::mime::transfer::decode_base64;

/// Decoded bytes tagged with their MIME type, handed to the UI layer for
/// saving or display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Materialize a base64 payload (as stored in an undecoded leaf) into a blob.
pub fn base64_to_blob(encoded: &str, mime_type: &str) -> Blob {
    Blob::new(mime_type, decode_base64(encoded.as_bytes()))
}

/// Materialize a binary string (one char per byte, values 0..=255) into a
/// blob. Characters above U+00FF are truncated to their low byte.
pub fn binary_string_to_blob(binary: &str, mime_type: &str) -> Blob {
    let data = binary.chars().map(|c| c as u8).collect();
    Blob::new(mime_type, data)
}
