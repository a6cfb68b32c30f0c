/*
 * composer.rs
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

//! Outgoing message construction. A draft becomes a complete RFC 5322
//! message: a two-part multipart/alternative body (plain plus HTML, an
//! absent body becomes an empty part), wrapped in multipart/mixed when
//! attachments are present, with boundaries drawn at random and re-drawn on
//! the off chance one collides with content. The wire payload is dot-stuffed
//! and carries its own end-of-data terminator.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::Deserialize;

use crate::error::MailError;
use crate::mime::transfer::encode_base64_wrapped;
use crate::protocol::smtp::dot_stuffer::dot_stuff;

/// A file to attach, already loaded.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// What the user wrote, before composition.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Option<Vec<String>>,
    pub bcc: Option<Vec<String>>,
    pub subject: String,
    pub body_plain: Option<String>,
    pub body_html: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Compose-form input as the UI bridge sends it.
#[derive(Debug, Deserialize)]
struct ComposeForm {
    from: FormMailbox,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    recipients: Vec<FormRecipient>,
    #[serde(default, rename = "bodyPlain")]
    body_plain: Option<String>,
    #[serde(default, rename = "bodyHtml")]
    body_html: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormMailbox {
    #[serde(default, rename = "displayName")]
    display_name: Option<String>,
    email: String,
}

#[derive(Debug, Deserialize)]
struct FormRecipient {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Option<String>,
}

impl Draft {
    /// Parse a compose form from the UI bridge. Recipients are grouped by
    /// their declared type; entries without an address are dropped.
    /// Attachments cross the bridge separately as binary.
    pub fn from_json(json: &str) -> Result<Self, MailError> {
        let form: ComposeForm =
            serde_json::from_str(json).map_err(|e| MailError::validation(e.to_string()))?;
        let from = match form.from.display_name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => format!("{} <{}>", name, form.from.email),
            None => form.from.email,
        };
        let mut to = Vec::new();
        let mut cc = Vec::new();
        let mut bcc = Vec::new();
        for recipient in form.recipients {
            let Some(value) = recipient.value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            match recipient.kind.as_str() {
                "To" => to.push(value),
                "Cc" => cc.push(value),
                "Bcc" => bcc.push(value),
                other => log::debug!("ignoring recipient of unknown type {:?}", other),
            }
        }
        Ok(Draft {
            from,
            to,
            cc: (!cc.is_empty()).then_some(cc),
            bcc: (!bcc.is_empty()).then_some(bcc),
            subject: form.subject.unwrap_or_default(),
            body_plain: form.body_plain,
            body_html: form.body_html,
            attachments: Vec::new(),
        })
    }
}

/// A composed message ready for submission. Recipient groups are
/// comma-space-joined header values; an empty group is absent, not an empty
/// string. `payload` is the dot-stuffed DATA content ending with the `.`
/// terminator line; Bcc recipients appear in the envelope only, never in the
/// payload headers.
#[derive(Debug, Clone)]
pub struct ComposedEmail {
    pub subject: String,
    pub from: String,
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub body_plain: String,
    pub body_html: String,
    pub payload: Vec<u8>,
}

impl ComposedEmail {
    /// Bare addr-spec of the sender for the MAIL FROM envelope.
    pub fn envelope_from(&self) -> &str {
        addr_spec(&self.from)
    }

    /// Everyone the envelope must reach: To, Cc and Bcc flattened in order,
    /// as bare addr-specs.
    pub fn envelope_recipients(&self) -> Vec<&str> {
        let groups = [Some(self.to.as_str()), self.cc.as_deref(), self.bcc.as_deref()];
        groups
            .into_iter()
            .flatten()
            .flat_map(|g| g.split(", "))
            .map(addr_spec)
            .collect()
    }
}

/// Strip a display name from `Name <addr>` mailbox syntax.
pub fn addr_spec(mailbox: &str) -> &str {
    match (mailbox.rfind('<'), mailbox.rfind('>')) {
        (Some(open), Some(close)) if open < close => &mailbox[open + 1..close],
        _ => mailbox.trim(),
    }
}

/// Compose a draft into a submittable message. A missing sender or an empty
/// To group (after dropping blank addresses) is a validation failure before
/// anything touches the wire.
pub fn compose_email(draft: &Draft) -> Result<ComposedEmail, MailError> {
    if draft.from.trim().is_empty() {
        return Err(MailError::validation("sender address is required"));
    }
    let to = join_group(&draft.to);
    let Some(to) = to else {
        return Err(MailError::validation("at least one recipient is required"));
    };
    let cc = draft.cc.as_deref().and_then(join_group);
    let bcc = draft.bcc.as_deref().and_then(join_group);

    let body_plain = normalize_crlf(draft.body_plain.as_deref().unwrap_or(""));
    let body_html = normalize_crlf(draft.body_html.as_deref().unwrap_or(""));

    let encoded_attachments: Vec<(String, String, String)> = draft
        .attachments
        .iter()
        .map(|a| {
            (
                a.filename.clone(),
                a.mime_type.clone(),
                encode_base64_wrapped(&a.data),
            )
        })
        .collect();

    let mut guard_against: Vec<&str> = vec![&body_plain, &body_html];
    guard_against.extend(encoded_attachments.iter().map(|(_, _, b)| b.as_str()));
    let alt_boundary = make_boundary(&guard_against);
    guard_against.push(&alt_boundary);
    let mixed_boundary = make_boundary(&guard_against);

    let alternative = build_alternative(&alt_boundary, &body_plain, &body_html);
    let (top_type, body) = if encoded_attachments.is_empty() {
        (
            format!("multipart/alternative; boundary=\"{}\"", alt_boundary),
            alternative,
        )
    } else {
        let mut body = String::new();
        body.push_str(&format!("--{}\r\n", mixed_boundary));
        body.push_str(&format!(
            "Content-Type: multipart/alternative; boundary=\"{}\"\r\n\r\n",
            alt_boundary
        ));
        body.push_str(&alternative);
        for (filename, mime_type, encoded) in &encoded_attachments {
            body.push_str(&format!("--{}\r\n", mixed_boundary));
            body.push_str(&format!(
                "Content-Type: {}; name=\"{}\"\r\n",
                mime_type, filename
            ));
            body.push_str("Content-Transfer-Encoding: base64\r\n");
            body.push_str(&format!(
                "Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
                filename
            ));
            body.push_str(encoded);
        }
        body.push_str(&format!("--{}--\r\n", mixed_boundary));
        (
            format!("multipart/mixed; boundary=\"{}\"", mixed_boundary),
            body,
        )
    };

    let mut headers = String::new();
    headers.push_str(&format!("Date: {}\r\n", Utc::now().to_rfc2822()));
    headers.push_str(&format!("From: {}\r\n", draft.from));
    headers.push_str(&format!("To: {}\r\n", to));
    if let Some(cc) = &cc {
        headers.push_str(&format!("Cc: {}\r\n", cc));
    }
    headers.push_str(&format!("Subject: {}\r\n", encode_subject(&draft.subject)));
    headers.push_str("MIME-Version: 1.0\r\n");
    headers.push_str(&format!("Content-Type: {}\r\n", top_type));

    let message = format!("{}\r\n{}", headers, body);
    let mut payload = dot_stuff(message.as_bytes());
    if !payload.ends_with(b"\r\n") {
        payload.extend_from_slice(b"\r\n");
    }
    payload.extend_from_slice(b".\r\n");

    Ok(ComposedEmail {
        subject: draft.subject.clone(),
        from: draft.from.clone(),
        to,
        cc,
        bcc,
        body_plain,
        body_html,
        payload,
    })
}

/// Join a recipient group with `, `, dropping blank entries. None when
/// nothing survives.
fn join_group(addresses: &[String]) -> Option<String> {
    let cleaned: Vec<&str> = addresses
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(", "))
    }
}

fn build_alternative(boundary: &str, plain: &str, html: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("--{}\r\n", boundary));
    out.push_str("Content-Type: text/plain; charset=UTF-8\r\n");
    out.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
    out.push_str(plain);
    out.push_str("\r\n");
    out.push_str(&format!("--{}\r\n", boundary));
    out.push_str("Content-Type: text/html; charset=UTF-8\r\n");
    out.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
    out.push_str(html);
    out.push_str("\r\n");
    out.push_str(&format!("--{}--\r\n", boundary));
    out
}

/// Random boundary, re-drawn until it collides with nothing in the message.
fn make_boundary(content: &[&str]) -> String {
    loop {
        let suffix: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        let candidate = format!("=_{}", suffix);
        if !content.iter().any(|c| c.contains(&candidate)) {
            return candidate;
        }
    }
}

/// Canonicalize to CRLF. Stray lone CRs are line breaks too; left alone
/// they would desynchronize line-based servers.
fn normalize_crlf(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\r\n")
}

/// RFC 2047 B-encode the subject when it is not plain ASCII.
fn encode_subject(subject: &str) -> String {
    if subject.is_ascii() {
        subject.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::{process_email, MimeNode};

    fn draft() -> Draft {
        Draft {
            from: "Me <me@example.org>".into(),
            to: vec!["you@example.org".into()],
            subject: "Hello".into(),
            body_plain: Some("Plain body.\n".into()),
            body_html: Some("<p>HTML body.</p>\n".into()),
            ..Draft::default()
        }
    }

    fn payload_text(email: &ComposedEmail) -> String {
        String::from_utf8_lossy(&email.payload).into_owned()
    }

    #[test]
    fn missing_sender_or_recipient_is_refused() {
        let mut d = draft();
        d.from = "  ".into();
        assert!(matches!(compose_email(&d), Err(MailError::Validation(_))));
        let mut d = draft();
        d.to = vec!["".into(), "  ".into()];
        assert!(matches!(compose_email(&d), Err(MailError::Validation(_))));
    }

    #[test]
    fn recipient_groups_join_and_empty_groups_vanish() {
        let mut d = draft();
        d.to = vec!["a@x".into()];
        d.cc = Some(vec!["b@x".into(), "c@x".into()]);
        d.bcc = Some(vec!["  ".into()]);
        let email = compose_email(&d).unwrap();
        assert_eq!(email.to, "a@x");
        assert_eq!(email.cc.as_deref(), Some("b@x, c@x"));
        assert!(email.bcc.is_none());
    }

    #[test]
    fn payload_carries_its_terminator() {
        let email = compose_email(&draft()).unwrap();
        assert!(email.payload.ends_with(b"\r\n.\r\n"));
    }

    #[test]
    fn line_endings_are_canonicalized_to_crlf() {
        let mut d = draft();
        d.body_plain = Some("unix\nmac\rwindows\r\nend".into());
        let email = compose_email(&d).unwrap();
        assert_eq!(email.body_plain, "unix\r\nmac\r\nwindows\r\nend");
        assert!(!email.body_plain.contains("\r\r"));
    }

    #[test]
    fn leading_dots_are_stuffed() {
        let mut d = draft();
        d.body_plain = Some("before\n.after\n".into());
        let email = compose_email(&d).unwrap();
        assert!(payload_text(&email).contains("before\r\n..after"));
    }

    #[test]
    fn bcc_never_appears_in_payload() {
        let mut d = draft();
        d.cc = Some(vec!["cc@example.org".into()]);
        d.bcc = Some(vec!["secret@example.org".into()]);
        let email = compose_email(&d).unwrap();
        let text = payload_text(&email);
        assert!(text.contains("To: you@example.org"));
        assert!(text.contains("Cc: cc@example.org"));
        assert!(!text.contains("secret@example.org"));
        assert_eq!(
            email.envelope_recipients(),
            ["you@example.org", "cc@example.org", "secret@example.org"]
        );
    }

    #[test]
    fn body_is_always_two_part_alternative() {
        let email = compose_email(&draft()).unwrap();
        let text = payload_text(&email);
        let message = text.trim_end_matches(".\r\n");
        let parsed = process_email(message);
        let MimeNode::Multipart { children, .. } = &parsed.body else {
            panic!("expected multipart");
        };
        assert_eq!(children.len(), 2);
        let MimeNode::Leaf(first) = &children[0] else { panic!() };
        let MimeNode::Leaf(second) = &children[1] else { panic!() };
        assert_eq!(first.mime_type, "text/plain");
        assert_eq!(second.mime_type, "text/html");
    }

    #[test]
    fn absent_plain_body_still_yields_two_parts() {
        let mut d = draft();
        d.body_plain = None;
        let email = compose_email(&d).unwrap();
        assert_eq!(email.body_plain, "");
        let text = payload_text(&email);
        let message = text.trim_end_matches(".\r\n");
        let parsed = process_email(message);
        let MimeNode::Multipart { children, .. } = &parsed.body else {
            panic!("expected multipart");
        };
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn attachments_wrap_in_mixed_envelope() {
        let mut d = draft();
        d.attachments = vec![Attachment {
            filename: "doc.pdf".into(),
            mime_type: "application/pdf".into(),
            data: vec![0x25, 0x50, 0x44, 0x46],
        }];
        let email = compose_email(&d).unwrap();
        let text = payload_text(&email);
        assert!(text.contains("multipart/mixed"));
        assert!(text.contains("multipart/alternative"));
        assert!(text.contains("Content-Disposition: attachment; filename=\"doc.pdf\""));
        assert!(text.contains("Content-Transfer-Encoding: base64"));
    }

    #[test]
    fn envelope_uses_bare_addr_specs() {
        let mut d = draft();
        d.to = vec!["You <you@example.org>".into()];
        let email = compose_email(&d).unwrap();
        assert_eq!(email.envelope_from(), "me@example.org");
        assert_eq!(email.envelope_recipients(), ["you@example.org"]);
        // Headers keep the display names.
        assert!(payload_text(&email).contains("To: You <you@example.org>"));
    }

    #[test]
    fn non_ascii_subject_is_b_encoded() {
        let mut d = draft();
        d.subject = "cittá".into();
        let email = compose_email(&d).unwrap();
        assert!(payload_text(&email).contains("Subject: =?UTF-8?B?"));
    }

    #[test]
    fn boundary_never_collides_with_content() {
        let email = compose_email(&draft()).unwrap();
        let text = payload_text(&email);
        let boundary = text
            .lines()
            .find_map(|l| l.split("boundary=\"").nth(1))
            .and_then(|r| r.split('"').next())
            .unwrap();
        assert!(!email.body_plain.contains(boundary));
        assert!(!email.body_html.contains(boundary));
    }

    #[test]
    fn compose_form_groups_recipients_by_type() {
        let json = r#"{
            "from": {"displayName": "Me", "email": "me@x"},
            "subject": "Hi",
            "recipients": [
                {"type": "To", "value": "a@x"},
                {"type": "Cc", "value": "b@x"},
                {"type": "Cc", "value": "c@x"},
                {"type": "Bcc"}
            ],
            "bodyPlain": "hello"
        }"#;
        let d = Draft::from_json(json).unwrap();
        assert_eq!(d.from, "Me <me@x>");
        assert_eq!(d.to, ["a@x"]);
        assert_eq!(d.cc.as_deref(), Some(["b@x".to_string(), "c@x".to_string()].as_slice()));
        assert!(d.bcc.is_none());
        let email = compose_email(&d).unwrap();
        assert_eq!(email.to, "a@x");
        assert_eq!(email.cc.as_deref(), Some("b@x, c@x"));
        assert!(email.bcc.is_none());
    }
}
