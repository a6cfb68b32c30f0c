/*
 * flags.rs
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

//! Message flag model and reconciliation. The UI edits a desired flag state;
//! reconciliation diffs it against what the server holds and emits only the
//! STORE commands needed to converge, touching nothing the user left alone.

/// One system flag with its desired state. `changed` marks flags the user
/// actually toggled; unchanged flags are never sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    /// Wire identifier, e.g. `\Seen`.
    pub id: String,
    /// Human-readable label for the UI.
    pub label: String,
    pub enabled: bool,
    pub changed: bool,
}

impl Flag {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            enabled: false,
            changed: false,
        }
    }
}

/// The five system flags every server supports, in presentation order.
pub fn default_flags() -> Vec<Flag> {
    vec![
        Flag::new("\\Seen", "Read"),
        Flag::new("\\Answered", "Answered"),
        Flag::new("\\Flagged", "Flagged"),
        Flag::new("\\Deleted", "Deleted"),
        Flag::new("\\Draft", "Draft"),
    ]
}

/// Seed `enabled` from a server-reported flag list (as in a FETCH FLAGS
/// response). `changed` is left alone, so pending user edits survive.
pub fn set_flag_defaults(flags: &mut [Flag], server_flags: &str) {
    for flag in flags {
        flag.enabled = server_flags
            .split_whitespace()
            .any(|s| s.eq_ignore_ascii_case(&flag.id));
    }
}

/// Mark a flag's desired state. A toggle back to the server state is still
/// `changed`; reconciliation resolves it to the same value it already holds.
pub fn set_flag(flags: &mut [Flag], id: &str, enabled: bool) -> bool {
    for flag in flags.iter_mut() {
        if flag.id == id {
            flag.enabled = enabled;
            flag.changed = true;
            return true;
        }
    }
    false
}

/// Space-joined wire identifiers. With no condition, every flag is named;
/// with `Some(c)`, only changed flags whose `enabled` matches `c`.
pub fn flag_string(flags: &[Flag], condition: Option<bool>) -> String {
    flags
        .iter()
        .filter(|f| match condition {
            None => true,
            Some(c) => f.changed && f.enabled == c,
        })
        .map(|f| f.id.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the STORE commands reconciling the changed flags, per UID: first a
/// `+FLAGS` for enabled changes, then a `-FLAGS` for disabled changes.
/// Empty input (no UIDs, or no changed flags) yields none.
pub fn store_commands(uids: &[u32], flags: &[Flag]) -> Vec<String> {
    let add = flag_string(flags, Some(true));
    let remove = flag_string(flags, Some(false));
    let mut commands = Vec::new();
    for uid in uids {
        if !add.is_empty() {
            commands.push(format!("UID STORE {} +FLAGS ({})", uid, add));
        }
        if !remove.is_empty() {
            commands.push(format!("UID STORE {} -FLAGS ({})", uid, remove));
        }
    }
    commands
}
