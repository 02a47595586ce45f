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

use crate::consts;
use std::str::FromStr;

///
/// Telnet command bytes that may follow an `IAC` ([RFC854](https://tools.ietf.org/html/rfc854))
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetCommand {
    /// [`consts::SE`] End of subnegotiation parameters
    SubnegotiationEnd,
    /// [`consts::NOP`] No operation
    NoOperation,
    /// [`consts::DM`] Data Mark
    DataMark,
    /// [`consts::BRK`] Break
    Break,
    /// [`consts::IP`] Interrupt Process
    InterruptProcess,
    /// [`consts::AO`] Abort Output
    AbortOutput,
    /// [`consts::AYT`] Are You There
    AreYouThere,
    /// [`consts::EC`] Erase Character
    EraseCharacter,
    /// [`consts::EL`] Erase Line
    EraseLine,
    /// [`consts::GA`] Go Ahead
    GoAhead,
    /// [`consts::SB`] Start of subnegotiation
    Subnegotiate,
    /// [`consts::WILL`]
    Will,
    /// [`consts::WONT`]
    Wont,
    /// [`consts::DO`]
    Do,
    /// [`consts::DONT`]
    Dont,
    /// [`consts::IAC`] Escaped data byte 255
    InterpretAsCommand,
    /// Byte outside the command space
    Unknown(u8),
}

impl TelnetCommand {
    /// Converts this command into its wire byte.
    pub fn to_u8(&self) -> u8 {
        match self {
            TelnetCommand::SubnegotiationEnd => consts::SE,
            TelnetCommand::NoOperation => consts::NOP,
            TelnetCommand::DataMark => consts::DM,
            TelnetCommand::Break => consts::BRK,
            TelnetCommand::InterruptProcess => consts::IP,
            TelnetCommand::AbortOutput => consts::AO,
            TelnetCommand::AreYouThere => consts::AYT,
            TelnetCommand::EraseCharacter => consts::EC,
            TelnetCommand::EraseLine => consts::EL,
            TelnetCommand::GoAhead => consts::GA,
            TelnetCommand::Subnegotiate => consts::SB,
            TelnetCommand::Will => consts::WILL,
            TelnetCommand::Wont => consts::WONT,
            TelnetCommand::Do => consts::DO,
            TelnetCommand::Dont => consts::DONT,
            TelnetCommand::InterpretAsCommand => consts::IAC,
            TelnetCommand::Unknown(byte) => *byte,
        }
    }

    /// Converts a wire byte into a command, yielding [`TelnetCommand::Unknown`] for bytes
    /// below [`consts::SE`].
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::SE => TelnetCommand::SubnegotiationEnd,
            consts::NOP => TelnetCommand::NoOperation,
            consts::DM => TelnetCommand::DataMark,
            consts::BRK => TelnetCommand::Break,
            consts::IP => TelnetCommand::InterruptProcess,
            consts::AO => TelnetCommand::AbortOutput,
            consts::AYT => TelnetCommand::AreYouThere,
            consts::EC => TelnetCommand::EraseCharacter,
            consts::EL => TelnetCommand::EraseLine,
            consts::GA => TelnetCommand::GoAhead,
            consts::SB => TelnetCommand::Subnegotiate,
            consts::WILL => TelnetCommand::Will,
            consts::WONT => TelnetCommand::Wont,
            consts::DO => TelnetCommand::Do,
            consts::DONT => TelnetCommand::Dont,
            consts::IAC => TelnetCommand::InterpretAsCommand,
            byte => TelnetCommand::Unknown(byte),
        }
    }

    /// Whether this is one of the four option negotiation verbs.
    pub fn is_negotiation(&self) -> bool {
        matches!(
            self,
            TelnetCommand::Will | TelnetCommand::Wont | TelnetCommand::Do | TelnetCommand::Dont
        )
    }
}

impl std::fmt::Display for TelnetCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetCommand::SubnegotiationEnd => write!(f, "SE"),
            TelnetCommand::NoOperation => write!(f, "NOP"),
            TelnetCommand::DataMark => write!(f, "DM"),
            TelnetCommand::Break => write!(f, "BRK"),
            TelnetCommand::InterruptProcess => write!(f, "IP"),
            TelnetCommand::AbortOutput => write!(f, "AO"),
            TelnetCommand::AreYouThere => write!(f, "AYT"),
            TelnetCommand::EraseCharacter => write!(f, "EC"),
            TelnetCommand::EraseLine => write!(f, "EL"),
            TelnetCommand::GoAhead => write!(f, "GA"),
            TelnetCommand::Subnegotiate => write!(f, "SB"),
            TelnetCommand::Will => write!(f, "WILL"),
            TelnetCommand::Wont => write!(f, "WONT"),
            TelnetCommand::Do => write!(f, "DO"),
            TelnetCommand::Dont => write!(f, "DONT"),
            TelnetCommand::InterpretAsCommand => write!(f, "IAC"),
            TelnetCommand::Unknown(byte) => write!(f, "Unknown({byte})"),
        }
    }
}

impl From<u8> for TelnetCommand {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

impl From<TelnetCommand> for u8 {
    fn from(command: TelnetCommand) -> Self {
        command.to_u8()
    }
}

impl FromStr for TelnetCommand {
    type Err = String;

    /// Parses a command mnemonic such as `do` or `WILL`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s.to_ascii_uppercase().as_str() {
            "SE" => TelnetCommand::SubnegotiationEnd,
            "NOP" => TelnetCommand::NoOperation,
            "DM" => TelnetCommand::DataMark,
            "BRK" => TelnetCommand::Break,
            "IP" => TelnetCommand::InterruptProcess,
            "AO" => TelnetCommand::AbortOutput,
            "AYT" => TelnetCommand::AreYouThere,
            "EC" => TelnetCommand::EraseCharacter,
            "EL" => TelnetCommand::EraseLine,
            "GA" => TelnetCommand::GoAhead,
            "SB" => TelnetCommand::Subnegotiate,
            "WILL" => TelnetCommand::Will,
            "WONT" => TelnetCommand::Wont,
            "DO" => TelnetCommand::Do,
            "DONT" => TelnetCommand::Dont,
            "IAC" => TelnetCommand::InterpretAsCommand,
            _ => return Err(format!("unknown telnet command: {s}")),
        };
        Ok(command)
    }
}
