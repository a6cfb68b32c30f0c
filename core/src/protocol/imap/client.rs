/*
 * client.rs
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

//! IMAP command session. Each command is sent under a fresh tag and its
//! response is correlated by that tag: untagged `*` lines are collected as
//! data until the line bearing the tag arrives with OK, NO or BAD. Lines
//! announcing a `{n}` literal make the session consume exactly n raw octets
//! before resuming line parsing, so message bodies can never be mistaken for
//! protocol lines.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ConnectionSettings;
use crate::error::MailError;
use crate::flags::{store_commands, Flag};
use crate::net::NetStream;
use crate::protocol::{LineOutcome, Response, ResponseClassifier};
use crate::session::Session;

/// Correlates response lines for one tagged command.
struct TagClassifier {
    tag: String,
}

impl ResponseClassifier for TagClassifier {
    fn literal_size(&self, line: &str) -> Option<usize> {
        let trimmed = line.trim_end();
        let rest = trimmed.strip_suffix('}')?;
        let open = rest.rfind('{')?;
        rest[open + 1..].parse().ok()
    }

    fn classify(&self, line: &str) -> LineOutcome {
        let mut parts = line.splitn(3, ' ');
        if parts.next() != Some(self.tag.as_str()) {
            return LineOutcome::Data;
        }
        match parts.next() {
            Some("OK") => LineOutcome::Terminal(true),
            Some("NO") | Some("BAD") => LineOutcome::Terminal(false),
            _ => LineOutcome::Data,
        }
    }
}

/// The untagged server greeting, read before any command is sent.
struct GreetingClassifier;

impl ResponseClassifier for GreetingClassifier {
    fn classify(&self, line: &str) -> LineOutcome {
        let mut parts = line.splitn(3, ' ');
        if parts.next() != Some("*") {
            return LineOutcome::Data;
        }
        match parts.next() {
            Some("OK") | Some("PREAUTH") => LineOutcome::Terminal(true),
            _ => LineOutcome::Terminal(false),
        }
    }
}

/// A mailbox as reported by LIST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub name: String,
    pub delimiter: Option<String>,
    pub attributes: Vec<String>,
}

/// State of the mailbox opened by SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedFolder {
    pub exists: u32,
    pub uid_validity: Option<u32>,
}

/// An IMAP session over one connection. Commands before a successful LOGIN
/// (other than LOGIN itself and LOGOUT) are refused locally with
/// NotAuthorized, without touching the wire.
pub struct ImapSession<S> {
    session: Session<S>,
    tag_counter: AtomicU32,
    authorized: AtomicBool,
}

impl ImapSession<NetStream> {
    /// Connect and consume the server greeting.
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, MailError> {
        let session = Session::connect(settings).await?;
        Self::from_session(session).await
    }
}

impl<S> ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an open session. Reads the greeting; a BYE greeting is a
    /// connection failure.
    pub async fn from_session(session: Session<S>) -> Result<Self, MailError> {
        let greeting = session.read_unsolicited(&GreetingClassifier).await?;
        if !greeting.is_success() {
            return Err(MailError::connection(format!(
                "server refused connection: {}",
                greeting.terminal_line()
            )));
        }
        Ok(Self {
            session,
            tag_counter: AtomicU32::new(0),
            authorized: AtomicBool::new(false),
        })
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    /// Shared inbound byte counter, for driving transfer progress.
    pub fn byte_counter(&self) -> Arc<AtomicU64> {
        self.session.byte_counter()
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    fn next_tag(&self) -> String {
        let n = self.tag_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("A{:04}", n)
    }

    /// Send one tagged command and correlate its response.
    async fn command(&self, command: &str) -> Result<Response, MailError> {
        let tag = self.next_tag();
        let line = format!("{} {}", tag, command);
        self.session.request(&line, &TagClassifier { tag }).await
    }

    fn require_authorized(&self) -> Result<(), MailError> {
        if self.is_authorized() {
            Ok(())
        } else {
            Err(MailError::NotAuthorized)
        }
    }

    /// Authenticate with LOGIN. Returns false when the server rejects the
    /// credentials; transport failures are errors as usual.
    pub async fn login(&self, username: &str, password: &str) -> Result<bool, MailError> {
        let command = format!("LOGIN {} {}", quote(username), quote(password));
        let response = self.command(&command).await?;
        let ok = response.is_success();
        self.authorized.store(ok, Ordering::SeqCst);
        if !ok {
            log::warn!("login refused: {}", response.terminal_line());
        }
        Ok(ok)
    }

    /// List all mailboxes. Unparseable LIST lines are skipped.
    pub async fn list_folders(&self) -> Result<Vec<Folder>, MailError> {
        self.require_authorized()?;
        let response = self.command("LIST \"\" \"*\"").await?;
        let mut folders = Vec::new();
        for line in &response.lines {
            if let Some(folder) = parse_list_line(&line.raw, line.literal.as_deref()) {
                folders.push(folder);
            }
        }
        Ok(folders)
    }

    /// Open a mailbox. None when the server refuses the SELECT.
    pub async fn select(&self, folder: &str) -> Result<Option<SelectedFolder>, MailError> {
        self.require_authorized()?;
        let response = self.command(&format!("SELECT {}", quote(folder))).await?;
        if !response.is_success() {
            log::warn!("select {:?} refused: {}", folder, response.terminal_line());
            return Ok(None);
        }
        let mut exists = 0;
        let mut uid_validity = None;
        for line in &response.lines {
            let tokens = &line.tokens;
            if tokens.len() >= 3 && tokens[0] == "*" && tokens[2] == "EXISTS" {
                exists = tokens[1].parse().unwrap_or(0);
            }
            if let Some(v) = line.raw.strip_prefix("* OK [UIDVALIDITY ") {
                if let Some(end) = v.find(']') {
                    uid_validity = v[..end].parse().ok();
                }
            }
        }
        Ok(Some(SelectedFolder {
            exists,
            uid_validity,
        }))
    }

    /// Fetch a full message by UID. The body arrives as a byte-counted
    /// literal; returns None when the server has nothing for that UID.
    pub async fn fetch_message(&self, uid: u32) -> Result<Option<String>, MailError> {
        self.require_authorized()?;
        let response = self
            .command(&format!("UID FETCH {} (BODY[])", uid))
            .await?;
        if !response.is_success() {
            log::warn!("fetch {} refused: {}", uid, response.terminal_line());
            return Ok(None);
        }
        Ok(response
            .first_literal()
            .map(|data| String::from_utf8_lossy(data).into_owned()))
    }

    /// Reconcile changed flags for a UID set. False only for an empty UID
    /// set; otherwise true when every STORE succeeded, including the case
    /// where no flag changed and there was nothing to send.
    pub async fn update_flags(&self, uids: &[u32], flags: &[Flag]) -> Result<bool, MailError> {
        self.require_authorized()?;
        if uids.is_empty() {
            return Ok(false);
        }
        let commands = store_commands(uids, flags);
        let mut all_ok = true;
        for command in commands {
            let response = self.command(&command).await?;
            if !response.is_success() {
                log::warn!("store refused: {}", response.terminal_line());
                all_ok = false;
            }
        }
        Ok(all_ok)
    }

    /// Say goodbye and sever the connection. The session is closed whatever
    /// the server answers.
    pub async fn logout(&self) -> Result<(), MailError> {
        let result = self.command("LOGOUT").await;
        self.authorized.store(false, Ordering::SeqCst);
        self.session.close().await;
        result.map(|_| ())
    }
}

/// Double-quote a string, escaping backslash and quote.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Parse `* LIST (\Attrs) "/" name`. The name may be quoted, a bare atom, or
/// a literal carried alongside the line.
fn parse_list_line(raw: &str, literal: Option<&[u8]>) -> Option<Folder> {
    let rest = raw.strip_prefix("* LIST ")?;
    let attrs_end = rest.find(')')?;
    let attributes = rest
        .get(1..attrs_end)?
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let rest = rest[attrs_end + 1..].trim_start();

    let (delimiter, rest) = if let Some(r) = rest.strip_prefix("NIL") {
        (None, r.trim_start())
    } else if let Some(r) = rest.strip_prefix('"') {
        let end = r.find('"')?;
        (Some(r[..end].to_string()), r[end + 1..].trim_start())
    } else {
        return None;
    };

    let name = if let Some(data) = literal {
        String::from_utf8_lossy(data).into_owned()
    } else if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.rfind('"')?;
        quoted[..end].to_string()
    } else if rest.starts_with('{') {
        // Literal announced but not captured.
        return None;
    } else {
        rest.to_string()
    };
    if name.is_empty() {
        return None;
    }
    Some(Folder {
        name,
        delimiter,
        attributes,
    })
}
