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

//! # TelServ Telnet Negotiation
//!
//! Protocol vocabulary, per-session option state, the option negotiation engine and the
//! keyed event bus used to hand decoded events to application code.
//!
//! ## Overview
//!
//! The Telnet protocol (RFC 854) carries in-band commands introduced by the IAC
//! (Interpret As Command) byte `0xFF`. This crate handles:
//!
//! - **Option negotiation**: DO, DONT, WILL, WONT units for options in the IANA registry
//! - **Window size**: NAWS subnegotiation (RFC 1073)
//! - **Other subnegotiations**: recognized and skipped up to `SE`
//!
//! ## Core Components
//!
//! ### [`Negotiator`]
//!
//! Consumes a chunk beginning with `IAC`, updates the session's [`OptionState`], appends the
//! replies owed to the peer and publishes an [`OptionEvent`] per recognized option.
//!
//! ### [`EventBus`]
//!
//! Ordered, keyed, synchronous callbacks with a per-subscriber failure boundary.
//!
//! ### [`TelnetCommand`] and [`TelnetOption`]
//!
//! Closed vocabularies with an `Unknown(u8)` variant for bytes outside them.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use bytes::BytesMut;
//! use telserv_telnetcodec::{Negotiator, TelnetOption};
//!
//! let mut negotiator = Negotiator::new();
//! negotiator.on_option(TelnetOption::NAWS, |event| {
//!     println!("{event}");
//!     Ok(())
//! });
//!
//! let mut replies = BytesMut::new();
//! negotiator.negotiate(&[0xFF, 0xFB, 0x1F], &mut replies)?;
//! assert_eq!(&replies[..], &[0xFF, 0xFD, 0x1F]);
//! # Ok::<(), telserv_telnetcodec::CodecError>(())
//! ```
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification
//! - RFC 855: Telnet Option Specifications
//! - RFC 857: Telnet Echo Option
//! - RFC 858: Telnet Suppress Go Ahead Option
//! - RFC 1073: Telnet Window Size Option

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod bus;
mod command;
pub mod consts;
mod event;
pub mod naws;
mod negotiator;
mod options;
mod result;

pub use self::bus::{DispatchReport, EventBus, SubscriberError, SubscriberResult};
pub use self::command::TelnetCommand;
pub use self::event::{OptionEvent, OptionValue};
pub use self::naws::WindowSize;
pub use self::negotiator::Negotiator;
pub use self::options::{KNOWN_OPTIONS, OptionState, TelnetOption};
pub use self::result::{CodecError, CodecResult, SubnegotiationErrorKind};
