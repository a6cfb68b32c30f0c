/*
 * config.rs
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

//! Connection settings boundary. The UI owns persistence and encryption of
//! account data; it hands the core a settings object (JSON over the bridge)
//! and the core never writes it anywhere.

use serde::{Deserialize, Serialize};

use crate::error::MailError;

/// Settings for one protocol endpoint (IMAP or SMTP host).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Implicit TLS (IMAPS 993, SMTPS 465). Defaults by port when absent.
    #[serde(default)]
    pub use_tls: Option<bool>,
}

impl ConnectionSettings {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: String::new(),
            password: String::new(),
            use_tls: None,
        }
    }

    /// Whether to handshake TLS immediately on connect.
    pub fn implicit_tls(&self) -> bool {
        self.use_tls.unwrap_or(matches!(self.port, 993 | 465))
    }

    /// Parse a settings object from the UI bridge.
    pub fn from_json(json: &str) -> Result<Self, MailError> {
        serde_json::from_str(json).map_err(|e| MailError::validation(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_tls_by_port() {
        assert!(ConnectionSettings::new("imap.example.org", 993).implicit_tls());
        assert!(ConnectionSettings::new("smtp.example.org", 465).implicit_tls());
        assert!(!ConnectionSettings::new("imap.example.org", 143).implicit_tls());
        assert!(!ConnectionSettings::new("smtp.example.org", 587).implicit_tls());
    }

    #[test]
    fn explicit_flag_overrides_port() {
        let mut s = ConnectionSettings::new("mail.example.org", 2993);
        s.use_tls = Some(true);
        assert!(s.implicit_tls());
    }

    #[test]
    fn settings_round_trip_json() {
        let json = r#"{"host":"imap.example.org","port":993,"username":"u","password":"p"}"#;
        let s = ConnectionSettings::from_json(json).unwrap();
        assert_eq!(s.host, "imap.example.org");
        assert_eq!(s.port, 993);
        assert!(s.implicit_tls());
    }

    #[test]
    fn bad_json_is_validation_error() {
        let err = ConnectionSettings::from_json("{").unwrap_err();
        assert!(matches!(err, MailError::Validation(_)));
    }
}
