/*
 * message.rs
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

//! Raw message decomposition: recursive descent over header block and nested
//! multipart bodies, producing an immutable part tree.
//!
//! The parser is deliberately forgiving — real-world messages are often
//! slightly malformed — and it never decodes transfer encodings itself: leaf
//! content stays raw and is decoded lazily at consumption time.

use std::collections::HashMap;

use crate::mime::content_type::{parse_content_type, parse_parameters};
use crate::mime::encoded_word::parse_mime_words;
use crate::mime::transfer::decode_transfer;

/// Case-insensitive header mapping. Later duplicates of a key overwrite
/// earlier ones (malformed input tolerance).
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: HashMap<String, String>,
}

impl HeaderMap {
    /// Tokenize a raw header block. Folded continuation lines (leading space
    /// or tab) are joined to the previous header's value.
    pub fn parse(block: &str) -> Self {
        let mut entries = HashMap::new();
        let mut current: Option<(String, String)> = None;
        for line in block.lines() {
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((name, value)) = current.take() {
                entries.insert(name, value);
            }
            if let Some(colon) = line.find(':') {
                if colon > 0 {
                    let name = line[..colon].trim().to_ascii_lowercase();
                    let value = line[colon + 1..].trim().to_string();
                    current = Some((name, value));
                }
            }
        }
        if let Some((name, value)) = current {
            entries.insert(name, value);
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Header value with RFC 2047 encoded words expanded.
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(parse_mime_words)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A leaf body part: raw (still transfer-encoded) content plus the declared
/// metadata needed to decode and present it.
#[derive(Debug, Clone)]
pub struct LeafPart {
    pub headers: HeaderMap,
    /// Declared type, lowercased `primary/sub`. Defaults to text/plain.
    pub mime_type: String,
    pub transfer_encoding: Option<String>,
    pub filename: Option<String>,
    pub is_attachment: bool,
    /// Undecoded content exactly as it appeared between the boundaries.
    pub content_raw: String,
}

impl LeafPart {
    /// Decode per the declared transfer encoding. Lazy: called at
    /// consumption time (display, attachment download), never during parse.
    pub fn decode(&self) -> Vec<u8> {
        decode_transfer(self.content_raw.as_bytes(), self.transfer_encoding.as_deref())
    }

    /// Decoded content as text (lossy UTF-8).
    pub fn decoded_text(&self) -> String {
        String::from_utf8_lossy(&self.decode()).into_owned()
    }
}

/// Body tree node: either a leaf with raw content or a multipart with its
/// ordered children. Children appear in textual order and never contain the
/// boundary delimiter lines themselves.
#[derive(Debug, Clone)]
pub enum MimeNode {
    Leaf(LeafPart),
    Multipart {
        boundary: String,
        headers: HeaderMap,
        children: Vec<MimeNode>,
    },
}

impl MimeNode {
    pub fn is_multipart(&self) -> bool {
        matches!(self, MimeNode::Multipart { .. })
    }

    /// Depth-first iteration over all leaves.
    pub fn leaves(&self) -> Vec<&LeafPart> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a LeafPart>) {
        match self {
            MimeNode::Leaf(leaf) => out.push(leaf),
            MimeNode::Multipart { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// First leaf with the given MIME type, depth-first.
    pub fn find_leaf(&self, mime_type: &str) -> Option<&LeafPart> {
        self.leaves()
            .into_iter()
            .find(|l| l.mime_type.eq_ignore_ascii_case(mime_type))
    }
}

/// A fully decomposed message.
#[derive(Debug, Clone)]
pub struct ParsedEmail {
    /// Full normalized text.
    pub raw: String,
    /// Exactly the text preceding the first blank line.
    pub headers_raw: String,
    /// Exactly the remainder, including all body and boundary text.
    pub content_raw: String,
    pub headers: HeaderMap,
    pub body: MimeNode,
}

impl ParsedEmail {
    pub fn subject(&self) -> Option<String> {
        self.headers.get_decoded("subject")
    }

    pub fn from(&self) -> Option<String> {
        self.headers.get_decoded("from")
    }

    /// All leaves flagged as attachments.
    pub fn attachments(&self) -> Vec<&LeafPart> {
        self.body
            .leaves()
            .into_iter()
            .filter(|l| l.is_attachment)
            .collect()
    }
}

/// Decompose a raw message. Never fails: framing damage yields a best-effort
/// partial tree instead of an error.
pub fn process_email(raw: &str) -> ParsedEmail {
    let normalized = normalize_line_endings(raw);
    let (headers_raw, content_raw) = split_header_block(&normalized);
    let headers = HeaderMap::parse(&headers_raw);
    let body = build_node(&headers, &content_raw);
    ParsedEmail {
        raw: normalized,
        headers_raw,
        content_raw,
        headers,
        body,
    }
}

fn normalize_line_endings(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n")
}

/// Split at the first blank line: header block before, full remainder after.
fn split_header_block(text: &str) -> (String, String) {
    match text.find("\n\n") {
        Some(i) => (text[..i].to_string(), text[i + 2..].to_string()),
        None => (text.to_string(), String::new()),
    }
}

/// Build the node for one entity (headers already tokenized, content still
/// raw). Recurses through nested multiparts.
fn build_node(headers: &HeaderMap, content: &str) -> MimeNode {
    let content_type = headers.get("content-type").and_then(parse_content_type);
    if let Some(ct) = &content_type {
        if ct.is_multipart() {
            if let Some(boundary) = ct.boundary() {
                let children = split_multipart(content, boundary)
                    .into_iter()
                    .map(|part| {
                        let (part_headers_raw, part_content) = split_header_block(&part);
                        let part_headers = HeaderMap::parse(&part_headers_raw);
                        build_node(&part_headers, &part_content)
                    })
                    .collect();
                return MimeNode::Multipart {
                    boundary: boundary.to_string(),
                    headers: headers.clone(),
                    children,
                };
            }
            // Declared multipart without a usable boundary: degrade to leaf.
            log::debug!("multipart entity without boundary parameter");
        }
    }
    MimeNode::Leaf(build_leaf(headers, content, content_type.as_ref()))
}

fn build_leaf(
    headers: &HeaderMap,
    content: &str,
    content_type: Option<&crate::mime::content_type::ContentType>,
) -> LeafPart {
    let mime_type = content_type
        .map(|ct| ct.mime_type())
        .unwrap_or_else(|| "text/plain".to_string());
    let transfer_encoding = headers
        .get("content-transfer-encoding")
        .map(|s| s.trim().to_string());

    let disposition = headers.get("content-disposition").unwrap_or("");
    let disposition_params = match disposition.find(';') {
        Some(i) => parse_parameters(&disposition[i + 1..]),
        None => HashMap::new(),
    };
    let filename = disposition_params
        .get("filename")
        .cloned()
        .or_else(|| content_type.and_then(|ct| ct.parameter("name").map(str::to_string)))
        .map(|f| parse_mime_words(&f));
    let is_attachment = disposition
        .split(';')
        .next()
        .map(|d| d.trim().eq_ignore_ascii_case("attachment"))
        .unwrap_or(false)
        || filename.is_some();

    LeafPart {
        headers: headers.clone(),
        mime_type,
        transfer_encoding,
        filename,
        is_attachment,
        content_raw: content.to_string(),
    }
}

/// Split multipart content on `--boundary` / `--boundary--` delimiter lines.
/// Preamble (before the first delimiter) and epilogue (after the terminal
/// one) are dropped. A missing terminal delimiter is an implicit close at
/// end of text, not an error.
fn split_multipart(content: &str, boundary: &str) -> Vec<String> {
    let open = format!("--{}", boundary);
    let close = format!("--{}--", boundary);
    let mut parts = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in content.lines() {
        let trimmed = line.trim_end();
        if trimmed == close {
            if let Some(lines) = current.take() {
                parts.push(lines.join("\n"));
            }
            break;
        }
        if trimmed == open {
            if let Some(lines) = current.take() {
                parts.push(lines.join("\n"));
            }
            current = Some(Vec::new());
            continue;
        }
        if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
    }
    if let Some(lines) = current.take() {
        log::debug!("multipart body missing terminal boundary --{}--", boundary);
        parts.push(lines.join("\n"));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "From: a@example.org\r\nSubject: Hi\r\n\r\nHello there.\r\n";

    #[test]
    fn header_and_content_blocks_are_exact() {
        let email = process_email(SIMPLE);
        assert_eq!(email.headers_raw, "From: a@example.org\nSubject: Hi");
        assert_eq!(email.content_raw, "Hello there.\n");
    }

    #[test]
    fn header_keys_are_case_insensitive() {
        let email = process_email(SIMPLE);
        assert_eq!(email.headers.get("SUBJECT"), Some("Hi"));
        assert_eq!(email.headers.get("subject"), Some("Hi"));
    }

    #[test]
    fn duplicate_headers_last_write_wins() {
        let raw = "X-Test: one\nX-Test: two\n\nbody";
        let email = process_email(raw);
        assert_eq!(email.headers.get("x-test"), Some("two"));
    }

    #[test]
    fn folded_header_values_are_joined() {
        let raw = "Subject: a very\n long subject\n\nbody";
        let email = process_email(raw);
        assert_eq!(email.headers.get("subject"), Some("a very long subject"));
    }

    #[test]
    fn single_part_body_is_a_leaf() {
        let email = process_email(SIMPLE);
        match &email.body {
            MimeNode::Leaf(leaf) => {
                assert_eq!(leaf.mime_type, "text/plain");
                assert_eq!(leaf.content_raw, "Hello there.\n");
            }
            _ => panic!("expected leaf"),
        }
    }

    #[test]
    fn multipart_children_follow_textual_order() {
        let raw = concat!(
            "Content-Type: multipart/alternative; boundary=sep\n",
            "\n",
            "preamble to drop\n",
            "--sep\n",
            "Content-Type: text/plain\n",
            "\n",
            "plain body\n",
            "--sep\n",
            "Content-Type: text/html\n",
            "\n",
            "<p>html body</p>\n",
            "--sep--\n",
            "epilogue to drop\n",
        );
        let email = process_email(raw);
        let MimeNode::Multipart { boundary, children, .. } = &email.body else {
            panic!("expected multipart");
        };
        assert_eq!(boundary, "sep");
        assert_eq!(children.len(), 2);
        let MimeNode::Leaf(first) = &children[0] else { panic!() };
        let MimeNode::Leaf(second) = &children[1] else { panic!() };
        assert_eq!(first.mime_type, "text/plain");
        assert_eq!(first.content_raw, "plain body");
        assert_eq!(second.mime_type, "text/html");
        assert!(!first.content_raw.contains("--sep"));
    }

    #[test]
    fn nested_multipart_recurses() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=outer\n",
            "\n",
            "--outer\n",
            "Content-Type: multipart/alternative; boundary=inner\n",
            "\n",
            "--inner\n",
            "Content-Type: text/plain\n",
            "\n",
            "text\n",
            "--inner\n",
            "Content-Type: text/html\n",
            "\n",
            "<b>html</b>\n",
            "--inner--\n",
            "--outer\n",
            "Content-Type: application/pdf; name=\"doc.pdf\"\n",
            "Content-Disposition: attachment; filename=\"doc.pdf\"\n",
            "Content-Transfer-Encoding: base64\n",
            "\n",
            "JVBERg==\n",
            "--outer--\n",
        );
        let email = process_email(raw);
        let leaves = email.body.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0].mime_type, "text/plain");
        assert_eq!(leaves[1].mime_type, "text/html");
        assert_eq!(leaves[2].mime_type, "application/pdf");
        let attachments = email.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename.as_deref(), Some("doc.pdf"));
    }

    #[test]
    fn leaf_content_stays_raw_until_decoded() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\n",
            "\n",
            "--b\n",
            "Content-Type: text/plain\n",
            "Content-Transfer-Encoding: base64\n",
            "\n",
            "aGVsbG8=\n",
            "--b--\n",
        );
        let email = process_email(raw);
        let leaf = email.body.find_leaf("text/plain").unwrap();
        assert_eq!(leaf.content_raw, "aGVsbG8=");
        assert_eq!(leaf.decode(), b"hello");
        assert_eq!(leaf.decoded_text(), "hello");
    }

    #[test]
    fn missing_terminal_boundary_is_implicit_close() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\n",
            "\n",
            "--b\n",
            "Content-Type: text/plain\n",
            "\n",
            "truncated message body\n",
        );
        let email = process_email(raw);
        let MimeNode::Multipart { children, .. } = &email.body else {
            panic!("expected multipart");
        };
        assert_eq!(children.len(), 1);
        let MimeNode::Leaf(leaf) = &children[0] else { panic!() };
        assert_eq!(leaf.content_raw, "truncated message body");
    }

    #[test]
    fn encoded_subject_is_decoded_on_access() {
        let raw = "Subject: =?UTF-8?B?Y2lhbyBtb25kbw==?=\n\nbody";
        let email = process_email(raw);
        assert_eq!(email.headers.get("subject"), Some("=?UTF-8?B?Y2lhbyBtb25kbw==?="));
        assert_eq!(email.subject().as_deref(), Some("ciao mondo"));
    }
}
