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

//! SMTP submission session. Responses are correlated by their three-digit
//! code: a `ddd-` line continues the reply, `ddd ` (or a bare code) ends it,
//! and the reply succeeds when the final code is in the set the command
//! accepts. A refusal mid-transaction aborts with RSET rather than leaving
//! the server in a half-built transaction.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ConnectionSettings;
use crate::error::MailError;
use crate::net::NetStream;
use crate::protocol::smtp::composer::ComposedEmail;
use crate::protocol::{LineOutcome, Response, ResponseClassifier};
use crate::session::Session;

/// Correlates one SMTP reply by accepted final codes.
struct CodeClassifier {
    accept: &'static [u16],
}

impl ResponseClassifier for CodeClassifier {
    fn classify(&self, line: &str) -> LineOutcome {
        let bytes = line.as_bytes();
        let code = match parse_code(bytes) {
            Some(c) => c,
            // A line without a reply code cannot be waited out.
            None => return LineOutcome::Terminal(false),
        };
        if bytes.get(3) == Some(&b'-') {
            return LineOutcome::Data;
        }
        LineOutcome::Terminal(self.accept.contains(&code))
    }
}

fn parse_code(bytes: &[u8]) -> Option<u16> {
    if bytes.len() < 3 {
        return None;
    }
    let mut code = 0u16;
    for &b in &bytes[..3] {
        if !b.is_ascii_digit() {
            return None;
        }
        code = code * 10 + (b - b'0') as u16;
    }
    Some(code)
}

const ACCEPT_GREETING: &[u16] = &[220];
const ACCEPT_OK: &[u16] = &[250];
const ACCEPT_RCPT: &[u16] = &[250, 251, 252];
const ACCEPT_DATA: &[u16] = &[354];
const ACCEPT_QUIT: &[u16] = &[221];

/// An SMTP session over one connection.
pub struct SmtpSession<S> {
    session: Session<S>,
    extensions: Vec<String>,
}

impl SmtpSession<NetStream> {
    /// Connect, consume the greeting and introduce ourselves with EHLO.
    pub async fn connect(settings: &ConnectionSettings, domain: &str) -> Result<Self, MailError> {
        let session = Session::connect(settings).await?;
        Self::from_session(session, domain).await
    }
}

impl<S> SmtpSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an open session: expect the 220 greeting, then EHLO.
    pub async fn from_session(session: Session<S>, domain: &str) -> Result<Self, MailError> {
        let greeting = session
            .read_unsolicited(&CodeClassifier {
                accept: ACCEPT_GREETING,
            })
            .await?;
        if !greeting.is_success() {
            return Err(MailError::connection(format!(
                "server refused connection: {}",
                greeting.terminal_line()
            )));
        }
        let mut smtp = Self {
            session,
            extensions: Vec::new(),
        };
        smtp.ehlo(domain).await?;
        Ok(smtp)
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    /// Extension keywords the server advertised in its EHLO reply.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension)
                || e.split_whitespace().next() == Some(extension))
    }

    async fn command(
        &self,
        command: &str,
        accept: &'static [u16],
    ) -> Result<Response, MailError> {
        self.session
            .request(command, &CodeClassifier { accept })
            .await
    }

    async fn ehlo(&mut self, domain: &str) -> Result<(), MailError> {
        let response = self.command(&format!("EHLO {}", domain), ACCEPT_OK).await?;
        if !response.is_success() {
            return Err(MailError::connection(format!(
                "EHLO refused: {}",
                response.terminal_line()
            )));
        }
        // First line is the server banner; the rest are extension keywords.
        self.extensions = response
            .lines
            .iter()
            .skip(1)
            .filter_map(|l| l.raw.get(4..))
            .map(str::to_string)
            .collect();
        Ok(())
    }

    /// Run one mail transaction for a composed message. Returns false when
    /// the server refuses a step (the transaction is then reset); transport
    /// failures are errors.
    pub async fn send(&self, email: &ComposedEmail) -> Result<bool, MailError> {
        let recipients = email.envelope_recipients();
        if recipients.is_empty() {
            return Err(MailError::validation("message has no recipients"));
        }

        let response = self
            .command(&format!("MAIL FROM:<{}>", email.envelope_from()), ACCEPT_OK)
            .await?;
        if !response.is_success() {
            return self.abort("MAIL FROM", &response).await;
        }
        for recipient in recipients {
            let response = self
                .command(&format!("RCPT TO:<{}>", recipient), ACCEPT_RCPT)
                .await?;
            if !response.is_success() {
                return self.abort("RCPT TO", &response).await;
            }
        }
        let response = self.command("DATA", ACCEPT_DATA).await?;
        if !response.is_success() {
            return self.abort("DATA", &response).await;
        }
        // The payload carries its own dot terminator.
        let response = self
            .session
            .request_raw(&email.payload, &CodeClassifier { accept: ACCEPT_OK })
            .await?;
        if !response.is_success() {
            log::warn!("message refused: {}", response.terminal_line());
            return Ok(false);
        }
        Ok(true)
    }

    async fn abort(&self, step: &str, response: &Response) -> Result<bool, MailError> {
        log::warn!("{} refused: {}", step, response.terminal_line());
        let _ = self.command("RSET", ACCEPT_OK).await?;
        Ok(false)
    }

    /// Say goodbye and sever the connection. The session is closed whatever
    /// the server answers.
    pub async fn quit(&self) -> Result<(), MailError> {
        let result = self.command("QUIT", ACCEPT_QUIT).await;
        self.session.close().await;
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_lines_keep_the_reply_open() {
        let c = CodeClassifier { accept: ACCEPT_OK };
        assert!(matches!(c.classify("250-SIZE 35882577"), LineOutcome::Data));
        assert!(matches!(c.classify("250-8BITMIME"), LineOutcome::Data));
        assert!(matches!(
            c.classify("250 SMTPUTF8"),
            LineOutcome::Terminal(true)
        ));
    }

    #[test]
    fn bare_code_is_terminal() {
        let c = CodeClassifier { accept: ACCEPT_OK };
        assert!(matches!(c.classify("250"), LineOutcome::Terminal(true)));
    }

    #[test]
    fn code_outside_accept_set_fails() {
        let c = CodeClassifier { accept: ACCEPT_DATA };
        assert!(matches!(
            c.classify("554 no thanks"),
            LineOutcome::Terminal(false)
        ));
        assert!(matches!(
            c.classify("354 go ahead"),
            LineOutcome::Terminal(true)
        ));
    }

    #[test]
    fn garbage_line_is_a_failed_terminal() {
        let c = CodeClassifier { accept: ACCEPT_OK };
        assert!(matches!(c.classify("ok!"), LineOutcome::Terminal(false)));
        assert!(matches!(c.classify(""), LineOutcome::Terminal(false)));
    }

    #[test]
    fn rcpt_accepts_forwarding_codes() {
        let c = CodeClassifier {
            accept: ACCEPT_RCPT,
        };
        assert!(matches!(
            c.classify("251 user not local; will forward"),
            LineOutcome::Terminal(true)
        ));
        assert!(matches!(
            c.classify("252 cannot verify, will try"),
            LineOutcome::Terminal(true)
        ));
        assert!(matches!(
            c.classify("550 unknown user"),
            LineOutcome::Terminal(false)
        ));
    }
}
