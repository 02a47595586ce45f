//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Operator commands
//!
//! A small line-oriented command set for inspecting and steering a running server:
//!
//! | Command                      | Effect                                         |
//! |------------------------------|------------------------------------------------|
//! | `clients`                    | List pooled sessions in accept order           |
//! | `opts <index>`               | Dump a session's negotiated options            |
//! | `iac <index> <cmd> <option>` | Send one negotiation unit to a session         |
//! | `kick <index>`               | Close a session and wait for it                |
//! | `stop`                       | Stop the server                                |
//!
//! Sessions are addressed by their index in the `clients` listing.

use crate::{Result, TelnetError, TelnetServer};
use std::fmt::Write;
use std::str::FromStr;
use telserv_telnetcodec::{TelnetCommand, TelnetOption};

/// Formats bytes as colon-separated lowercase hex, e.g. `ff:fd:1f`.
pub fn format_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// A parsed operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// List sessions
    Clients,
    /// Dump the options of the session at `index`
    Opts {
        /// Index in the `clients` listing
        index: usize,
    },
    /// Send `IAC <command> <option>` to the session at `index`
    Iac {
        /// Index in the `clients` listing
        index: usize,
        /// Negotiation command
        command: TelnetCommand,
        /// Option to negotiate
        option: TelnetOption,
    },
    /// Close the session at `index`
    Kick {
        /// Index in the `clients` listing
        index: usize,
    },
    /// Stop the server
    Stop,
}

fn parse_index(word: Option<&str>) -> Result<usize> {
    let word = word.ok_or_else(|| TelnetError::InvalidCommand("missing session index".into()))?;
    word.parse()
        .map_err(|_| TelnetError::InvalidCommand(format!("invalid session index: {word}")))
}

fn parse_option(word: &str) -> Result<TelnetOption> {
    match word.parse::<u8>() {
        Ok(byte) => Ok(TelnetOption::from_u8(byte)),
        Err(_) => word.parse().map_err(TelnetError::InvalidCommand),
    }
}

impl FromStr for AdminCommand {
    type Err = TelnetError;

    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| TelnetError::InvalidCommand("empty command".into()))?;

        let command = match verb.to_ascii_lowercase().as_str() {
            "clients" => AdminCommand::Clients,
            "stop" => AdminCommand::Stop,
            "opts" => AdminCommand::Opts {
                index: parse_index(words.next())?,
            },
            "kick" => AdminCommand::Kick {
                index: parse_index(words.next())?,
            },
            "iac" => {
                let index = parse_index(words.next())?;
                let (Some(command), Some(option)) = (words.next(), words.next()) else {
                    return Err(TelnetError::InvalidCommand(
                        "usage: iac <index> <command> <option>".into(),
                    ));
                };
                let command: TelnetCommand =
                    command.parse().map_err(TelnetError::InvalidCommand)?;
                if !command.is_negotiation() {
                    return Err(TelnetError::InvalidCommand(format!(
                        "{command} is not a negotiation command"
                    )));
                }
                AdminCommand::Iac {
                    index,
                    command,
                    option: parse_option(option)?,
                }
            }
            other => {
                return Err(TelnetError::InvalidCommand(format!(
                    "unknown command: {other}"
                )));
            }
        };

        if let Some(extra) = words.next() {
            return Err(TelnetError::InvalidCommand(format!(
                "unexpected argument: {extra}"
            )));
        }
        Ok(command)
    }
}

impl TelnetServer {
    /// Run an operator command and return its printable output.
    pub async fn execute(&self, command: AdminCommand) -> Result<String> {
        let pool = self.pool();
        let lookup = |index| pool.id_at(index).ok_or(TelnetError::IndexOutOfRange(index));

        match command {
            AdminCommand::Clients => {
                let sessions = pool.sessions();
                if sessions.is_empty() {
                    return Ok("no sessions".to_string());
                }
                let mut out = String::new();
                for info in sessions {
                    let _ = writeln!(out, "{info}");
                }
                Ok(out)
            }
            AdminCommand::Opts { index } => pool.dump_options(lookup(index)?).await,
            AdminCommand::Iac {
                index,
                command,
                option,
            } => {
                let sent = pool.negotiate(lookup(index)?, command, option)?;
                Ok(format!("sent {}", format_hex(&sent)))
            }
            AdminCommand::Kick { index } => {
                let id = lookup(index)?;
                pool.kick(id).await?;
                Ok(format!("kicked {id}"))
            }
            AdminCommand::Stop => {
                self.stop().await;
                Ok("stopped".to_string())
            }
        }
    }
}
