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

//! MIME message handling: decomposition of raw messages into a part tree,
//! transfer-encoding codecs, RFC 2047 header words, and binary
//! materialization of decoded content.

pub mod blob;
pub mod content_type;
pub mod encoded_word;
pub mod message;
pub mod transfer;

pub use blob::{base64_to_blob, binary_string_to_blob, Blob};
pub use content_type::{parse_content_type, ContentType};
pub use encoded_word::parse_mime_words;
pub use message::{process_email, HeaderMap, LeafPart, MimeNode, ParsedEmail};
pub use transfer::{decode_transfer, encode_base64_wrapped};
