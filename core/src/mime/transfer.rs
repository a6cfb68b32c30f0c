/*
 * transfer.rs
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

//! Content-Transfer-Encoding codecs (RFC 2045). Decoding is tolerant of the
//! whitespace and line breaks that wire-format bodies carry; anything that is
//! not base64/quoted-printable passes through as 7-bit/8-bit identity.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::OnceLock;

fn base64_table() -> &'static [i8; 256] {
    static TABLE: OnceLock<[i8; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [-1i8; 256];
        for i in 0..26u8 {
            t[(b'A' + i) as usize] = i as i8;
            t[(b'a' + i) as usize] = (26 + i) as i8;
        }
        for i in 0..10u8 {
            t[(b'0' + i) as usize] = (52 + i) as i8;
        }
        t[b'+' as usize] = 62;
        t[b'/' as usize] = 63;
        t
    })
}

/// Decode a complete base64 body. Whitespace (including the CRLFs that wrap
/// encoded bodies at 76 columns) is skipped; invalid characters are ignored;
/// a trailing partial quantum is flushed.
pub fn decode_base64(src: &[u8]) -> Vec<u8> {
    let table = base64_table();
    let mut out = Vec::with_capacity(src.len() * 3 / 4 + 3);
    let mut quantum: u32 = 0;
    let mut bits: u32 = 0;
    for &b in src {
        if b == b'=' {
            break;
        }
        let val = table[b as usize];
        if val < 0 {
            continue;
        }
        quantum = (quantum << 6) | (val as u32);
        bits += 6;
        if bits == 24 {
            out.push((quantum >> 16) as u8);
            out.push((quantum >> 8) as u8);
            out.push(quantum as u8);
            quantum = 0;
            bits = 0;
        }
    }
    if bits >= 8 {
        out.push((quantum >> (bits - 8)) as u8);
        if bits >= 16 {
            out.push((quantum >> (bits - 16)) as u8);
        }
    }
    out
}

const HEX_DECODE: [i8; 256] = {
    let mut t = [-1i8; 256];
    let mut i = 0u8;
    while i < 10 {
        t[(b'0' + i) as usize] = i as i8;
        i += 1;
    }
    let mut i = 0u8;
    while i < 6 {
        t[(b'A' + i) as usize] = (10 + i) as i8;
        t[(b'a' + i) as usize] = (10 + i) as i8;
        i += 1;
    }
    t
};

/// Decode a complete quoted-printable body: =XX escapes plus soft line breaks
/// (=CRLF, =LF). A malformed escape is kept literally rather than dropped.
pub fn decode_quoted_printable(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut pos = 0;
    while pos < src.len() {
        let b = src[pos];
        if b != b'=' {
            out.push(b);
            pos += 1;
            continue;
        }
        match (src.get(pos + 1), src.get(pos + 2)) {
            (Some(&b'\r'), Some(&b'\n')) => pos += 3,
            (Some(&b'\n'), _) => pos += 2,
            (Some(&h1), Some(&h2))
                if HEX_DECODE[h1 as usize] >= 0 && HEX_DECODE[h2 as usize] >= 0 =>
            {
                let v = (HEX_DECODE[h1 as usize] << 4) | HEX_DECODE[h2 as usize];
                out.push(v as u8);
                pos += 3;
            }
            (Some(&b'\r'), None) => pos += 2,
            _ => {
                out.push(b);
                pos += 1;
            }
        }
    }
    out
}

/// Decode body content per its declared transfer encoding. Unknown and
/// 7bit/8bit/binary encodings are identity.
pub fn decode_transfer(content: &[u8], encoding: Option<&str>) -> Vec<u8> {
    match encoding.map(str::trim) {
        Some(e) if e.eq_ignore_ascii_case("base64") => decode_base64(content),
        Some(e) if e.eq_ignore_ascii_case("quoted-printable") => decode_quoted_printable(content),
        _ => content.to_vec(),
    }
}

/// Base64-encode with CRLF wrapping at 76 columns, as attachment bodies are
/// written on the wire.
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 76 * 2 + 2);
    for chunk in encoded.as_bytes().chunks(76) {
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push_str("\r\n");
    }
    out
}
