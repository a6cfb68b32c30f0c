/*
 * encoded_word.rs
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

//! RFC 2047 encoded-word decoding (=?charset?Q|B?data?=) for header values.
//! Adjacent encoded words form one logical run: nothing is re-inserted
//! between them, and whitespace-only separation between two encoded words is
//! dropped (RFC 2047 section 6.2). Text outside encoded words passes through.

use crate::mime::transfer::{decode_base64, decode_quoted_printable};

enum Segment {
    Literal(String),
    Encoded(String),
}

/// Decode all encoded words in a header value.
pub fn parse_mime_words(s: &str) -> String {
    let segments = split_segments(s);
    let mut out = String::with_capacity(s.len());
    for (i, seg) in segments.iter().enumerate() {
        match seg {
            Segment::Encoded(text) => out.push_str(text),
            Segment::Literal(text) => {
                let between_encoded = i > 0
                    && matches!(segments[i - 1], Segment::Encoded(_))
                    && matches!(segments.get(i + 1), Some(Segment::Encoded(_)));
                if between_encoded && text.chars().all(char::is_whitespace) {
                    continue;
                }
                out.push_str(text);
            }
        }
    }
    out
}

fn split_segments(s: &str) -> Vec<Segment> {
    let bytes = s.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] == b'=' && bytes.get(pos + 1) == Some(&b'?') {
            if let Some((decoded, end)) = decode_one(bytes, pos) {
                if literal_start < pos {
                    segments.push(Segment::Literal(
                        String::from_utf8_lossy(&bytes[literal_start..pos]).into_owned(),
                    ));
                }
                segments.push(Segment::Encoded(decoded));
                pos = end;
                literal_start = end;
                continue;
            }
        }
        pos += 1;
    }
    if literal_start < bytes.len() {
        segments.push(Segment::Literal(
            String::from_utf8_lossy(&bytes[literal_start..]).into_owned(),
        ));
    }
    segments
}

/// Decode one encoded word starting at `start` (which points at "=?").
/// Returns the decoded text and the position just past the closing "?=".
fn decode_one(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let inner_start = start + 2;
    let q1 = find_byte(bytes, inner_start, b'?')?;
    let charset = std::str::from_utf8(&bytes[inner_start..q1]).ok()?.trim();
    if charset.is_empty() {
        return None;
    }
    let encoding = *bytes.get(q1 + 1)?;
    if bytes.get(q1 + 2) != Some(&b'?') {
        return None;
    }
    let payload_start = q1 + 3;
    let payload_end = find_terminator(bytes, payload_start)?;
    let payload = &bytes[payload_start..payload_end];

    let decoded_bytes = match encoding.to_ascii_lowercase() {
        b'b' => decode_base64(payload),
        b'q' => decode_q(payload),
        _ => return None,
    };
    Some((charset_to_string(&decoded_bytes, charset), payload_end + 2))
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes.get(from..)?.iter().position(|&b| b == needle).map(|i| from + i)
}

fn find_terminator(bytes: &[u8], from: usize) -> Option<usize> {
    let rest = bytes.get(from..)?;
    rest.windows(2)
        .position(|w| w == b"?=")
        .map(|i| from + i)
}

/// Q encoding: `_` is space, the rest is quoted-printable.
fn decode_q(payload: &[u8]) -> Vec<u8> {
    let unscored: Vec<u8> = payload
        .iter()
        .map(|&b| if b == b'_' { b' ' } else { b })
        .collect();
    decode_quoted_printable(&unscored)
}

fn charset_to_string(bytes: &[u8], charset: &str) -> String {
    let lower = charset.to_ascii_lowercase();
    match lower.as_str() {
        "iso-8859-1" | "latin1" | "iso_8859-1" | "us-ascii" => {
            bytes.iter().map(|&b| b as char).collect()
        }
        // UTF-8 and anything unrecognized: lossy UTF-8.
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn q_encoded_word() {
        assert_eq!(
            parse_mime_words("=?UTF-8?Q?test_quoted_printable?="),
            "test quoted printable"
        );
    }

    #[test]
    fn b_encoded_word() {
        assert_eq!(parse_mime_words("=?UTF-8?B?dGVzdCBiYXNlNjQ=?="), "test base64");
    }

    #[test]
    fn adjacent_encoded_words_concatenate() {
        assert_eq!(
            parse_mime_words("=?UTF-8?B?dGVzdCA=?==?UTF-8?B?YmFzZTY0?="),
            "test base64"
        );
    }

    #[test]
    fn whitespace_between_encoded_words_is_dropped() {
        assert_eq!(
            parse_mime_words("=?UTF-8?Q?Hello?= =?UTF-8?Q?_World?="),
            "Hello World"
        );
    }

    #[test]
    fn surrounding_text_passes_through() {
        assert_eq!(parse_mime_words("Re: =?UTF-8?B?Y2lhbw==?= !"), "Re: ciao !");
    }

    #[test]
    fn plain_text_unmodified() {
        assert_eq!(parse_mime_words("no encoded words here"), "no encoded words here");
    }

    #[test]
    fn latin1_charset() {
        // =?ISO-8859-1?Q?caf=E9?= -> café
        assert_eq!(parse_mime_words("=?ISO-8859-1?Q?caf=E9?="), "caf\u{e9}");
    }

    #[test]
    fn malformed_word_left_as_text() {
        assert_eq!(parse_mime_words("=?broken"), "=?broken");
    }
}
