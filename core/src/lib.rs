/*
 * lib.rs
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

//! Core backend for the Cassetta email client: connection sessions, IMAP
//! and SMTP protocol clients, MIME message handling, flag reconciliation
//! and transfer progress.

pub mod config;
pub mod error;
pub mod flags;
pub mod mime;
pub mod net;
pub mod progress;
pub mod protocol;
pub mod session;

pub use config::ConnectionSettings;
pub use error::{ErrorRateLimiter, MailError};
pub use session::{MailSession, Session, SessionStatus};
