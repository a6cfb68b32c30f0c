/*
 * content_type.rs
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

//! Content-Type header (RFC 2045) and the shared parameter-list syntax also
//! used by Content-Disposition.

use std::collections::HashMap;

/// Checks if a character is valid in an RFC 2045 token.
#[inline]
fn is_token_char(c: u8) -> bool {
    matches!(c,
        b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' |
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'{' | b'|' | b'}' | b'~'
    )
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_char)
}

/// Parsed Content-Type value: type/subtype plus lowercased parameter map.
#[derive(Debug, Clone)]
pub struct ContentType {
    primary_type: String,
    sub_type: String,
    parameters: HashMap<String, String>,
}

impl ContentType {
    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    /// Full type as `primary/sub`, lowercased.
    pub fn mime_type(&self) -> String {
        format!(
            "{}/{}",
            self.primary_type.to_ascii_lowercase(),
            self.sub_type.to_ascii_lowercase()
        )
    }

    pub fn is_multipart(&self) -> bool {
        self.primary_type.eq_ignore_ascii_case("multipart")
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }
}

/// Parse a Content-Type header value. Returns None for values that do not
/// even carry a `type/subtype` shape.
pub fn parse_content_type(value: &str) -> Option<ContentType> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (type_part, params_part) = match value.find(';') {
        Some(i) => (value[..i].trim(), value[i + 1..].trim()),
        None => (value, ""),
    };
    let slash = type_part.find('/')?;
    let primary = type_part[..slash].trim();
    let sub = type_part[slash + 1..].trim();
    if !is_token(primary) || !is_token(sub) {
        return None;
    }
    Some(ContentType {
        primary_type: primary.to_string(),
        sub_type: sub.to_string(),
        parameters: parse_parameters(params_part),
    })
}

/// Parse a semicolon-separated parameter list (`name=value; name="value"`)
/// into a lowercased-name map. Malformed entries are skipped, not fatal.
pub fn parse_parameters(params: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for piece in split_params(params) {
        let Some(eq) = piece.find('=') else { continue };
        let name = piece[..eq].trim();
        if !is_token(name) {
            continue;
        }
        let raw = piece[eq + 1..].trim();
        let value = if raw.starts_with('"') {
            unquote(raw)
        } else {
            raw.to_string()
        };
        map.insert(name.to_ascii_lowercase(), value);
    }
    map
}

/// Split on semicolons that are not inside a quoted string.
fn split_params(s: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let bytes = s.as_bytes();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_quotes => escaped = true,
            b'"' => in_quotes = !in_quotes,
            b';' if !in_quotes => {
                pieces.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < s.len() {
        pieces.push(s[start..].trim());
    }
    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

fn unquote(s: &str) -> String {
    let inner = s.trim_start_matches('"');
    let inner = match inner.rfind('"') {
        Some(i) => &inner[..i],
        None => inner,
    };
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}
