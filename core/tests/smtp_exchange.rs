/*
 * smtp_exchange.rs
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

//! SMTP session tests against a scripted server over an in-memory pipe.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use cassetta_core::protocol::smtp::{compose_email, Draft, SmtpSession};
use cassetta_core::session::Session;

async fn read_line<S: AsyncRead + Unpin>(stream: &mut S) -> String {
    let mut line = Vec::new();
    loop {
        let mut b = [0u8; 1];
        if stream.read(&mut b).await.unwrap() == 0 {
            break;
        }
        if b[0] == b'\n' {
            break;
        }
        if b[0] != b'\r' {
            line.push(b[0]);
        }
    }
    String::from_utf8(line).unwrap()
}

async fn write<S: AsyncWrite + Unpin>(stream: &mut S, data: &str) {
    stream.write_all(data.as_bytes()).await.unwrap();
}

/// Read DATA content up to and including the lone-dot terminator line.
async fn read_payload<S: AsyncRead + Unpin>(stream: &mut S) -> String {
    let mut payload = String::new();
    loop {
        let line = read_line(stream).await;
        if line == "." {
            break;
        }
        payload.push_str(&line);
        payload.push('\n');
    }
    payload
}

fn draft() -> Draft {
    Draft {
        from: "Me <me@example.org>".into(),
        to: vec!["you@example.org".into()],
        bcc: Some(vec!["secret@example.org".into()]),
        subject: "Greetings".into(),
        body_plain: Some("Hello.\n.starts with a dot\n".into()),
        body_html: Some("<p>Hello.</p>\n".into()),
        ..Draft::default()
    }
}

#[tokio::test]
async fn full_transaction_delivers_and_quits() {
    let (client, mut server) = tokio::io::duplex(16384);
    let server_task = tokio::spawn(async move {
        write(&mut server, "220 mail.example.org ESMTP\r\n").await;

        let line = read_line(&mut server).await;
        assert_eq!(line, "EHLO localhost");
        write(&mut server, "250-mail.example.org greets you\r\n").await;
        write(&mut server, "250-SIZE 35882577\r\n").await;
        write(&mut server, "250-8BITMIME\r\n").await;
        write(&mut server, "250 SMTPUTF8\r\n").await;

        let line = read_line(&mut server).await;
        assert_eq!(line, "MAIL FROM:<me@example.org>");
        write(&mut server, "250 OK\r\n").await;

        let line = read_line(&mut server).await;
        assert_eq!(line, "RCPT TO:<you@example.org>");
        write(&mut server, "250 OK\r\n").await;
        let line = read_line(&mut server).await;
        assert_eq!(line, "RCPT TO:<secret@example.org>");
        write(&mut server, "251 will forward\r\n").await;

        let line = read_line(&mut server).await;
        assert_eq!(line, "DATA");
        write(&mut server, "354 go ahead\r\n").await;
        let payload = read_payload(&mut server).await;
        write(&mut server, "250 queued\r\n").await;

        let line = read_line(&mut server).await;
        assert_eq!(line, "QUIT");
        write(&mut server, "221 bye\r\n").await;

        payload
    });

    let smtp = SmtpSession::from_session(Session::from_stream(client), "localhost")
        .await
        .unwrap();
    assert!(smtp.supports("SIZE"));
    assert!(smtp.supports("8BITMIME"));
    assert!(!smtp.supports("STARTTLS"));

    let email = compose_email(&draft()).unwrap();
    assert!(smtp.send(&email).await.unwrap());
    smtp.quit().await.unwrap();

    let payload = server_task.await.unwrap();
    // Bcc reached the envelope but never the message headers.
    assert!(!payload.contains("secret@example.org"));
    assert!(payload.contains("To: you@example.org"));
    // Transparency stuffing survived to the wire.
    assert!(payload.contains("..starts with a dot"));
    assert!(payload.contains("Subject: Greetings"));
}

#[tokio::test]
async fn refused_recipient_resets_the_transaction() {
    let (client, mut server) = tokio::io::duplex(8192);
    let server_task = tokio::spawn(async move {
        write(&mut server, "220 ready\r\n").await;
        let _ = read_line(&mut server).await;
        write(&mut server, "250 hello\r\n").await;

        let _ = read_line(&mut server).await;
        write(&mut server, "250 OK\r\n").await;
        let _ = read_line(&mut server).await;
        write(&mut server, "550 no such user\r\n").await;
        let line = read_line(&mut server).await;
        assert_eq!(line, "RSET");
        write(&mut server, "250 flushed\r\n").await;
    });

    let smtp = SmtpSession::from_session(Session::from_stream(client), "localhost")
        .await
        .unwrap();
    let mut d = draft();
    d.bcc = None;
    let email = compose_email(&d).unwrap();
    assert!(!smtp.send(&email).await.unwrap());
    server_task.await.unwrap();
}

#[tokio::test]
async fn bad_greeting_is_a_connection_error() {
    let (client, mut server) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        write(&mut server, "554 go away\r\n").await;
    });
    let result = SmtpSession::from_session(Session::from_stream(client), "localhost").await;
    assert!(result.is_err());
}
