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
use crate::naws::WindowSize;
use std::fmt::Formatter;
use std::str::FromStr;

///
/// [Telnet Terminal Options](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// [`consts::option::BINARY`] Telnet Binary Transmission [RFC856](https://tools.ietf.org/html/rfc856)
    TransmitBinary,
    /// [`consts::option::ECHO`] Telnet Echo Option [RFC857](https://tools.ietf.org/html/rfc857)
    Echo,
    /// [`consts::option::RCP`] Telnet Reconnection Option
    Reconnection,
    /// [`consts::option::SGA`] Suppress Go ahead [RFC858](https://tools.ietf.org/html/rfc858)
    SuppressGoAhead,
    /// [`consts::option::NAMS`] Negotiate Approximate Message Size
    NegotiateApproxMessageSize,
    /// [`consts::option::STATUS`] Telnet Status Option [RFC859](http://www.iana.org/go/rfc859)
    Status,
    /// [`consts::option::TM`] Telnet Timing Mark Option [RFC860](http://www.iana.org/go/rfc860)
    TimingMark,
    /// [`consts::option::RCTE`] Remote-Controlled Transmission and Echo [RFC726](http://www.iana.org/go/rfc726)
    RCTE,
    /// [`consts::option::NAOL`] Output Line Width
    OutLineWidth,
    /// [`consts::option::NAOP`] Output Page Size
    OutPageSize,
    /// [`consts::option::NAOCRD`] Output Carriage-Return Disposition [RFC652](http://www.iana.org/go/rfc652)
    NAOCRD,
    /// [`consts::option::NAOHTS`] Output Horizontal Tab Stops [RFC653](http://www.iana.org/go/rfc653)
    NAOHTS,
    /// [`consts::option::NAOHTD`] Output Horizontal Tab Disposition [RFC654](http://www.iana.org/go/rfc654)
    NAOHTD,
    /// [`consts::option::NAOFFD`] Output Form Feed Disposition [RFC655](http://www.iana.org/go/rfc655)
    NAOFFD,
    /// [`consts::option::NAOVTS`] Output Vertical Tab Stops [RFC656](http://www.iana.org/go/rfc656)
    NAOVTS,
    /// [`consts::option::NAOVTD`] Output Vertical Tab Disposition [RFC657](http://www.iana.org/go/rfc657)
    NAOVTD,
    /// [`consts::option::NAOLFD`] Output Linefeed Disposition [RFC658](http://www.iana.org/go/rfc658)
    NAOLFD,
    /// [`consts::option::XASCII`] Extended ASCII [RFC698](http://www.iana.org/go/rfc698)
    XASCII,
    /// [`consts::option::LOGOUT`] Logout Option [RFC727](http://www.iana.org/go/rfc727)
    Logout,
    /// [`consts::option::BM`] Byte Macro [RFC735](http://www.iana.org/go/rfc735)
    ByteMacro,
    /// [`consts::option::DET`] Data Entry Terminal [RFC1043](http://www.iana.org/go/rfc1043)
    DET,
    /// [`consts::option::SUPDUP`] SUPDUP [RFC736](http://www.iana.org/go/rfc736)
    SUPDUP,
    /// [`consts::option::SUPDUP_OUTPUT`] SUPDUP Output [RFC749](http://www.iana.org/go/rfc749)
    SUPDUPOutput,
    /// [`consts::option::SNDLOC`] Send Location [RFC779](http://www.iana.org/go/rfc779)
    SNDLOC,
    /// [`consts::option::TTYPE`] Terminal Type [RFC1091](http://www.iana.org/go/rfc1091)
    TTYPE,
    /// [`consts::option::EOR`] End of Record [RFC885](http://www.iana.org/go/rfc885)
    EOR,
    /// [`consts::option::TUID`] TACACS User Identification [RFC927](http://www.iana.org/go/rfc927)
    TUID,
    /// [`consts::option::OUTMRK`] Output Marking [RFC933](http://www.iana.org/go/rfc933)
    OUTMRK,
    /// [`consts::option::TTYLOC`] Terminal Location Number [RFC946](http://www.iana.org/go/rfc946)
    TTYLOC,
    /// [`consts::option::OPT3270REGIME`] Telnet 3270 Regime [RFC1041](http://www.iana.org/go/rfc1041)
    OPT3270Regime,
    /// [`consts::option::X3PAD`] X.3 PAD [RFC1053](http://www.iana.org/go/rfc1053)
    X3PAD,
    /// [`consts::option::NAWS`] Negotiate About Window Size [RFC1073](http://www.iana.org/go/rfc1073)
    NAWS,
    /// [`consts::option::TSPEED`] Terminal Speed [RFC1079](http://www.iana.org/go/rfc1079)
    TSPEED,
    /// [`consts::option::LFLOW`] Remote Flow Control [RFC1372](http://www.iana.org/go/rfc1372)
    LFLOW,
    /// [`consts::option::LINEMODE`] Linemode [RFC1184](http://www.iana.org/go/rfc1184)
    Linemode,
    /// [`consts::option::XDISPLOC`] X Display Location [RFC1096](http://www.iana.org/go/rfc1096)
    XDISPLOC,
    /// [`consts::option::OLD_ENVIRONMENT`] Environment Option [RFC1408](http://www.iana.org/go/rfc1408)
    Environment,
    /// [`consts::option::AUTHENTICATION`] Authentication Option [RFC2941](http://www.iana.org/go/rfc2941)
    Authentication,
    /// [`consts::option::ENCRYPTION`] Encryption Option [RFC2946](http://www.iana.org/go/rfc2946)
    Encryption,
    /// [`consts::option::NEW_ENVIRONMENT`] New Environment Option [RFC1572](http://www.iana.org/go/rfc1572)
    NewEnvironment,
    /// [`consts::option::EXOPL`] Extended-Options-List [RFC861](http://www.iana.org/go/rfc861)
    EXOPL,
    /// Option code outside this server's vocabulary
    Unknown(u8),
}

/// Every recognized option, in code order.
pub const KNOWN_OPTIONS: [TelnetOption; 41] = [
    TelnetOption::TransmitBinary,
    TelnetOption::Echo,
    TelnetOption::Reconnection,
    TelnetOption::SuppressGoAhead,
    TelnetOption::NegotiateApproxMessageSize,
    TelnetOption::Status,
    TelnetOption::TimingMark,
    TelnetOption::RCTE,
    TelnetOption::OutLineWidth,
    TelnetOption::OutPageSize,
    TelnetOption::NAOCRD,
    TelnetOption::NAOHTS,
    TelnetOption::NAOHTD,
    TelnetOption::NAOFFD,
    TelnetOption::NAOVTS,
    TelnetOption::NAOVTD,
    TelnetOption::NAOLFD,
    TelnetOption::XASCII,
    TelnetOption::Logout,
    TelnetOption::ByteMacro,
    TelnetOption::DET,
    TelnetOption::SUPDUP,
    TelnetOption::SUPDUPOutput,
    TelnetOption::SNDLOC,
    TelnetOption::TTYPE,
    TelnetOption::EOR,
    TelnetOption::TUID,
    TelnetOption::OUTMRK,
    TelnetOption::TTYLOC,
    TelnetOption::OPT3270Regime,
    TelnetOption::X3PAD,
    TelnetOption::NAWS,
    TelnetOption::TSPEED,
    TelnetOption::LFLOW,
    TelnetOption::Linemode,
    TelnetOption::XDISPLOC,
    TelnetOption::Environment,
    TelnetOption::Authentication,
    TelnetOption::Encryption,
    TelnetOption::NewEnvironment,
    TelnetOption::EXOPL,
];

impl TelnetOption {
    /// Converts a `TelnetOption` into its wire byte. [`TelnetOption::Unknown`] yields the
    /// byte it was decoded from.
    pub fn to_u8(&self) -> u8 {
        match self {
            TelnetOption::TransmitBinary => consts::option::BINARY,
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::Reconnection => consts::option::RCP,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::NegotiateApproxMessageSize => consts::option::NAMS,
            TelnetOption::Status => consts::option::STATUS,
            TelnetOption::TimingMark => consts::option::TM,
            TelnetOption::RCTE => consts::option::RCTE,
            TelnetOption::OutLineWidth => consts::option::NAOL,
            TelnetOption::OutPageSize => consts::option::NAOP,
            TelnetOption::NAOCRD => consts::option::NAOCRD,
            TelnetOption::NAOHTS => consts::option::NAOHTS,
            TelnetOption::NAOHTD => consts::option::NAOHTD,
            TelnetOption::NAOFFD => consts::option::NAOFFD,
            TelnetOption::NAOVTS => consts::option::NAOVTS,
            TelnetOption::NAOVTD => consts::option::NAOVTD,
            TelnetOption::NAOLFD => consts::option::NAOLFD,
            TelnetOption::XASCII => consts::option::XASCII,
            TelnetOption::Logout => consts::option::LOGOUT,
            TelnetOption::ByteMacro => consts::option::BM,
            TelnetOption::DET => consts::option::DET,
            TelnetOption::SUPDUP => consts::option::SUPDUP,
            TelnetOption::SUPDUPOutput => consts::option::SUPDUP_OUTPUT,
            TelnetOption::SNDLOC => consts::option::SNDLOC,
            TelnetOption::TTYPE => consts::option::TTYPE,
            TelnetOption::EOR => consts::option::EOR,
            TelnetOption::TUID => consts::option::TUID,
            TelnetOption::OUTMRK => consts::option::OUTMRK,
            TelnetOption::TTYLOC => consts::option::TTYLOC,
            TelnetOption::OPT3270Regime => consts::option::OPT3270REGIME,
            TelnetOption::X3PAD => consts::option::X3PAD,
            TelnetOption::NAWS => consts::option::NAWS,
            TelnetOption::TSPEED => consts::option::TSPEED,
            TelnetOption::LFLOW => consts::option::LFLOW,
            TelnetOption::Linemode => consts::option::LINEMODE,
            TelnetOption::XDISPLOC => consts::option::XDISPLOC,
            TelnetOption::Environment => consts::option::OLD_ENVIRONMENT,
            TelnetOption::Authentication => consts::option::AUTHENTICATION,
            TelnetOption::Encryption => consts::option::ENCRYPTION,
            TelnetOption::NewEnvironment => consts::option::NEW_ENVIRONMENT,
            TelnetOption::EXOPL => consts::option::EXOPL,
            TelnetOption::Unknown(byte) => *byte,
        }
    }

    /// Converts a wire byte into a `TelnetOption`, yielding [`TelnetOption::Unknown`] for
    /// codes outside the vocabulary.
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::BINARY => TelnetOption::TransmitBinary,
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::RCP => TelnetOption::Reconnection,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::NAMS => TelnetOption::NegotiateApproxMessageSize,
            consts::option::STATUS => TelnetOption::Status,
            consts::option::TM => TelnetOption::TimingMark,
            consts::option::RCTE => TelnetOption::RCTE,
            consts::option::NAOL => TelnetOption::OutLineWidth,
            consts::option::NAOP => TelnetOption::OutPageSize,
            consts::option::NAOCRD => TelnetOption::NAOCRD,
            consts::option::NAOHTS => TelnetOption::NAOHTS,
            consts::option::NAOHTD => TelnetOption::NAOHTD,
            consts::option::NAOFFD => TelnetOption::NAOFFD,
            consts::option::NAOVTS => TelnetOption::NAOVTS,
            consts::option::NAOVTD => TelnetOption::NAOVTD,
            consts::option::NAOLFD => TelnetOption::NAOLFD,
            consts::option::XASCII => TelnetOption::XASCII,
            consts::option::LOGOUT => TelnetOption::Logout,
            consts::option::BM => TelnetOption::ByteMacro,
            consts::option::DET => TelnetOption::DET,
            consts::option::SUPDUP => TelnetOption::SUPDUP,
            consts::option::SUPDUP_OUTPUT => TelnetOption::SUPDUPOutput,
            consts::option::SNDLOC => TelnetOption::SNDLOC,
            consts::option::TTYPE => TelnetOption::TTYPE,
            consts::option::EOR => TelnetOption::EOR,
            consts::option::TUID => TelnetOption::TUID,
            consts::option::OUTMRK => TelnetOption::OUTMRK,
            consts::option::TTYLOC => TelnetOption::TTYLOC,
            consts::option::OPT3270REGIME => TelnetOption::OPT3270Regime,
            consts::option::X3PAD => TelnetOption::X3PAD,
            consts::option::NAWS => TelnetOption::NAWS,
            consts::option::TSPEED => TelnetOption::TSPEED,
            consts::option::LFLOW => TelnetOption::LFLOW,
            consts::option::LINEMODE => TelnetOption::Linemode,
            consts::option::XDISPLOC => TelnetOption::XDISPLOC,
            consts::option::OLD_ENVIRONMENT => TelnetOption::Environment,
            consts::option::AUTHENTICATION => TelnetOption::Authentication,
            consts::option::ENCRYPTION => TelnetOption::Encryption,
            consts::option::NEW_ENVIRONMENT => TelnetOption::NewEnvironment,
            consts::option::EXOPL => TelnetOption::EXOPL,
            byte => TelnetOption::Unknown(byte),
        }
    }

    /// Whether this option belongs to the server's vocabulary.
    pub fn is_known(&self) -> bool {
        !matches!(self, TelnetOption::Unknown(_))
    }

    /// Short protocol mnemonic, as used in the IANA registry and on the admin console.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            TelnetOption::TransmitBinary => "BINARY",
            TelnetOption::Echo => "ECHO",
            TelnetOption::Reconnection => "RCP",
            TelnetOption::SuppressGoAhead => "SGA",
            TelnetOption::NegotiateApproxMessageSize => "NAMS",
            TelnetOption::Status => "STATUS",
            TelnetOption::TimingMark => "TM",
            TelnetOption::RCTE => "RCTE",
            TelnetOption::OutLineWidth => "NAOL",
            TelnetOption::OutPageSize => "NAOP",
            TelnetOption::NAOCRD => "NAOCRD",
            TelnetOption::NAOHTS => "NAOHTS",
            TelnetOption::NAOHTD => "NAOHTD",
            TelnetOption::NAOFFD => "NAOFFD",
            TelnetOption::NAOVTS => "NAOVTS",
            TelnetOption::NAOVTD => "NAOVTD",
            TelnetOption::NAOLFD => "NAOLFD",
            TelnetOption::XASCII => "XASCII",
            TelnetOption::Logout => "LOGOUT",
            TelnetOption::ByteMacro => "BM",
            TelnetOption::DET => "DET",
            TelnetOption::SUPDUP => "SUPDUP",
            TelnetOption::SUPDUPOutput => "SUPDUP_OUTPUT",
            TelnetOption::SNDLOC => "SNDLOC",
            TelnetOption::TTYPE => "TTYPE",
            TelnetOption::EOR => "EOR",
            TelnetOption::TUID => "TUID",
            TelnetOption::OUTMRK => "OUTMRK",
            TelnetOption::TTYLOC => "TTYLOC",
            TelnetOption::OPT3270Regime => "3270REGIME",
            TelnetOption::X3PAD => "X3PAD",
            TelnetOption::NAWS => "NAWS",
            TelnetOption::TSPEED => "TSPEED",
            TelnetOption::LFLOW => "LFLOW",
            TelnetOption::Linemode => "LINEMODE",
            TelnetOption::XDISPLOC => "XDISPLOC",
            TelnetOption::Environment => "OLD_ENVIRON",
            TelnetOption::Authentication => "AUTHENTICATION",
            TelnetOption::Encryption => "ENCRYPT",
            TelnetOption::NewEnvironment => "NEW_ENVIRON",
            TelnetOption::EXOPL => "EXOPL",
            TelnetOption::Unknown(_) => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::Unknown(option) => write!(f, "Unknown({option})"),
            known => write!(f, "{}", known.mnemonic()),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

impl FromStr for TelnetOption {
    type Err = String;

    /// Parses either the protocol mnemonic (`NAWS`, `sga`) or the variant name
    /// (`SuppressGoAhead`), ignoring case. Long-form names such as
    /// `suppress_go_ahead` are accepted with or without underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.replace('_', "").to_ascii_uppercase();
        KNOWN_OPTIONS
            .iter()
            .copied()
            .find(|option| {
                option.mnemonic().replace('_', "") == wanted
                    || format!("{option:?}").to_ascii_uppercase() == wanted
            })
            .or(match wanted.as_str() {
                "NEGOTIATEABOUTWINDOWSIZE" => Some(TelnetOption::NAWS),
                "TERMINALTYPE" => Some(TelnetOption::TTYPE),
                _ => None,
            })
            .ok_or_else(|| format!("unknown telnet option: {s}"))
    }
}

/// Negotiated option values for a single session.
///
/// Binary options are recorded the first time the peer mentions them and keep their
/// declaration order; the window size is tracked separately and starts at `(0,0)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionState {
    declared: Vec<(TelnetOption, bool)>,
    window_size: WindowSize,
}

impl OptionState {
    /// Creates an empty state with a `(0,0)` window size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records whether `option` is enabled.
    pub fn set(&mut self, option: TelnetOption, enabled: bool) {
        match self.declared.iter_mut().find(|(known, _)| *known == option) {
            Some(entry) => entry.1 = enabled,
            None => self.declared.push((option, enabled)),
        }
    }

    /// Returns the recorded value for `option`, or `None` if it was never negotiated.
    pub fn get(&self, option: TelnetOption) -> Option<bool> {
        self.declared
            .iter()
            .find(|(known, _)| *known == option)
            .map(|(_, enabled)| *enabled)
    }

    /// Whether `option` has been negotiated on.
    pub fn is_enabled(&self, option: TelnetOption) -> bool {
        self.get(option).unwrap_or(false)
    }

    /// The last window size reported by the peer.
    pub fn window_size(&self) -> &WindowSize {
        &self.window_size
    }

    /// Stores the window size reported by the peer.
    pub fn set_window_size(&mut self, size: WindowSize) {
        self.window_size = size;
    }

    /// Iterates declared options in the order they were first negotiated.
    pub fn iter(&self) -> impl Iterator<Item = (TelnetOption, bool)> + '_ {
        self.declared.iter().copied()
    }

    /// Number of declared options.
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    /// Whether no option has been negotiated yet.
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}

impl std::fmt::Display for OptionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "<OptionState>")?;
        for (option, enabled) in self.iter() {
            let verb = if enabled { "WILL" } else { "WONT" };
            writeln!(f, "    I {verb} {option}")?;
        }
        writeln!(f, "    window_size: {}", self.window_size)
    }
}
