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

//! Option negotiation engine
//!
//! The [`Negotiator`] consumes a chunk of bytes that begins with `IAC`, applies every
//! complete negotiation unit at the front of the chunk to its [`OptionState`], queues the
//! replies the server owes the peer, and publishes an [`OptionEvent`] for every recognized
//! option it touches.
//!
//! ## Known limitations
//!
//! The engine works one chunk at a time and keeps no partial-unit buffer. A unit split
//! across two reads is reported as a decode failure, and payload following the leading run
//! of units in the same chunk is not inspected.

use crate::bus::{EventBus, SubscriberResult};
use crate::command::TelnetCommand;
use crate::consts;
use crate::event::OptionEvent;
use crate::naws::WindowSize;
use crate::options::{OptionState, TelnetOption};
use crate::result::{CodecError, CodecResult, SubnegotiationErrorKind};
use bytes::{Buf, BufMut, BytesMut};
use tracing::{trace, warn};

/// Per-session option negotiation state machine.
#[derive(Debug, Default)]
pub struct Negotiator {
    options: OptionState,
    bus: EventBus<TelnetOption, OptionEvent>,
    subscriber_faults: u64,
}

impl Negotiator {
    /// Creates an engine with empty option state and no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine that publishes to an already populated bus.
    pub fn with_bus(bus: EventBus<TelnetOption, OptionEvent>) -> Self {
        Negotiator {
            options: OptionState::new(),
            bus,
            subscriber_faults: 0,
        }
    }

    /// Negotiated option values.
    pub fn options(&self) -> &OptionState {
        &self.options
    }

    /// Registers `callback` for changes to `option`.
    pub fn on_option<F>(&mut self, option: TelnetOption, callback: F)
    where
        F: FnMut(&OptionEvent) -> SubscriberResult + Send + 'static,
    {
        self.bus.subscribe(option, callback);
    }

    /// Total number of subscriber failures seen by this engine.
    pub fn subscriber_faults(&self) -> u64 {
        self.subscriber_faults
    }

    /// Whether `chunk` should be routed to [`Negotiator::negotiate`].
    pub fn is_negotiation(chunk: &[u8]) -> bool {
        chunk.first() == Some(&consts::IAC)
    }

    /// Encodes a single `IAC <command> <option>` unit.
    pub fn request(command: TelnetCommand, option: TelnetOption) -> [u8; 3] {
        [consts::IAC, command.to_u8(), option.to_u8()]
    }

    /// Appends one encoded unit per `(command, option)` pair to `dst`.
    pub fn request_all(units: &[(TelnetCommand, TelnetOption)], dst: &mut BytesMut) {
        dst.reserve(units.len() * 3);
        for (command, option) in units {
            dst.put_slice(&Self::request(*command, *option));
        }
    }

    /// Appends an `IAC DO <option>` unit to `dst` for every declared option, in
    /// declaration order.
    pub fn declare_all(&self, dst: &mut BytesMut) {
        let units: Vec<_> = self
            .options
            .iter()
            .map(|(option, _)| (TelnetCommand::Do, option))
            .collect();
        Self::request_all(&units, dst);
    }

    /// Decodes the leading run of negotiation units in `src`.
    ///
    /// Replies owed to the peer are appended to `dst`. Returns the number of bytes
    /// consumed; decoding stops at the first byte that is not `IAC`.
    ///
    /// # Errors
    ///
    /// A truncated or unterminated unit yields a [`CodecError`]. Units decoded before it
    /// keep their effect. The failing unit has none.
    pub fn negotiate(&mut self, src: &[u8], dst: &mut BytesMut) -> CodecResult<usize> {
        let mut buf = src;
        while buf.first() == Some(&consts::IAC) {
            if buf.remaining() < 2 {
                return Err(CodecError::IncompleteUnit {
                    command: None,
                    required: 2,
                    available: buf.remaining(),
                });
            }
            buf.advance(1);
            let command = TelnetCommand::from_u8(buf.get_u8());
            match command {
                TelnetCommand::Do => self.receive(&mut buf, command, true, None, dst)?,
                TelnetCommand::Dont => self.receive(&mut buf, command, false, None, dst)?,
                TelnetCommand::Will => {
                    self.receive(&mut buf, command, true, Some(TelnetCommand::Do), dst)?
                }
                TelnetCommand::Wont => {
                    self.receive(&mut buf, command, false, Some(TelnetCommand::Dont), dst)?
                }
                TelnetCommand::Subnegotiate => self.subnegotiate(&mut buf)?,
                other => trace!(command = %other, "Skipping non-negotiation command"),
            }
        }
        Ok(src.len() - buf.len())
    }

    fn receive(
        &mut self,
        buf: &mut &[u8],
        command: TelnetCommand,
        enabled: bool,
        reply: Option<TelnetCommand>,
        dst: &mut BytesMut,
    ) -> CodecResult<()> {
        if !buf.has_remaining() {
            return Err(CodecError::IncompleteUnit {
                command: Some(command.to_u8()),
                required: 3,
                available: 2,
            });
        }
        let option = TelnetOption::from_u8(buf.get_u8());
        if !option.is_known() {
            trace!(command = %command, option = %option, "Skipping unrecognized option");
            return Ok(());
        }
        trace!(command = %command, option = %option, "Negotiated");
        self.options.set(option, enabled);
        if let Some(reply) = reply {
            dst.put_slice(&Self::request(reply, option));
        }
        self.publish(OptionEvent::enabled(option, enabled));
        Ok(())
    }

    fn subnegotiate(&mut self, buf: &mut &[u8]) -> CodecResult<()> {
        if !buf.has_remaining() {
            return Err(CodecError::SubnegotiationError {
                option: None,
                reason: SubnegotiationErrorKind::MissingOption,
            });
        }
        let option = TelnetOption::from_u8(buf.get_u8());

        if option == TelnetOption::NAWS {
            let size = WindowSize::decode(buf)?;
            if buf.remaining() < 2 {
                return Err(CodecError::SubnegotiationError {
                    option: Some(option.to_u8()),
                    reason: SubnegotiationErrorKind::MissingTerminator {
                        available: buf.remaining(),
                    },
                });
            }
            let terminator = [buf.get_u8(), buf.get_u8()];
            if terminator != [consts::IAC, consts::SE] {
                warn!(
                    option = %option,
                    terminator = ?terminator,
                    "Window size subnegotiation not terminated by IAC SE"
                );
            }
            trace!(option = %option, size = %size, "Window size reported");
            self.options.set_window_size(size.clone());
            self.publish(OptionEvent::window_size(size));
            return Ok(());
        }

        match buf.iter().position(|&byte| byte == consts::SE) {
            Some(index) => buf.advance(index + 1),
            None => {
                return Err(CodecError::SubnegotiationError {
                    option: Some(option.to_u8()),
                    reason: SubnegotiationErrorKind::UnterminatedSubnegotiation,
                });
            }
        }
        if option.is_known() {
            trace!(option = %option, "Skipped subnegotiation payload");
            self.publish(OptionEvent::subnegotiated(option));
        } else {
            trace!(option = %option, "Skipped unrecognized subnegotiation");
        }
        Ok(())
    }

    fn publish(&mut self, event: OptionEvent) {
        let report = self.bus.publish(&event.option, &event);
        self.subscriber_faults += report.failed as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(negotiator: &mut Negotiator, option: TelnetOption) -> Arc<Mutex<Vec<OptionEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        negotiator.on_option(option, move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });
        events
    }

    #[test]
    fn test_do_echo() {
        let mut negotiator = Negotiator::new();
        let events = recorder(&mut negotiator, TelnetOption::Echo);
        let mut replies = BytesMut::new();

        let consumed = negotiator
            .negotiate(&[0xFF, 0xFD, 0x01], &mut replies)
            .unwrap();

        assert_eq!(consumed, 3);
        assert!(replies.is_empty());
        assert_eq!(negotiator.options().get(TelnetOption::Echo), Some(true));
        assert_eq!(
            *events.lock().unwrap(),
            vec![OptionEvent::enabled(TelnetOption::Echo, true)]
        );
    }

    #[test]
    fn test_will_naws_replies_do() {
        let mut negotiator = Negotiator::new();
        let mut replies = BytesMut::new();

        negotiator
            .negotiate(&[0xFF, 0xFB, 0x1F], &mut replies)
            .unwrap();

        assert_eq!(&replies[..], &[0xFF, 0xFD, 0x1F]);
        assert!(negotiator.options().is_enabled(TelnetOption::NAWS));
    }

    #[test]
    fn test_wont_replies_dont() {
        let mut negotiator = Negotiator::new();
        let mut replies = BytesMut::new();

        negotiator
            .negotiate(&[0xFF, 0xFC, 0x03], &mut replies)
            .unwrap();

        assert_eq!(&replies[..], &[0xFF, 0xFE, 0x03]);
        assert_eq!(
            negotiator.options().get(TelnetOption::SuppressGoAhead),
            Some(false)
        );
    }

    #[test]
    fn test_window_size_subnegotiation() {
        let mut negotiator = Negotiator::new();
        let events = recorder(&mut negotiator, TelnetOption::NAWS);
        let mut replies = BytesMut::new();

        let consumed = negotiator
            .negotiate(
                &[0xFF, 0xFA, 0x1F, 0x00, 0x50, 0x00, 0x18, 0xFF, 0xF0],
                &mut replies,
            )
            .unwrap();

        assert_eq!(consumed, 9);
        assert!(replies.is_empty());
        assert_eq!(negotiator.options().window_size(), &WindowSize::new(80, 24));
        assert_eq!(
            *events.lock().unwrap(),
            vec![OptionEvent::window_size(WindowSize::new(80, 24))]
        );
    }

    #[test]
    fn test_unknown_option_is_skipped() {
        let mut negotiator = Negotiator::new();
        let mut replies = BytesMut::new();

        let consumed = negotiator
            .negotiate(&[0xFF, 0xFB, 0x63, 0xFF, 0xFD, 0x01], &mut replies)
            .unwrap();

        assert_eq!(consumed, 6);
        assert!(replies.is_empty());
        assert_eq!(negotiator.options().len(), 1);
        assert!(negotiator.options().is_enabled(TelnetOption::Echo));
    }

    #[test]
    fn test_non_negotiation_commands_skipped() {
        let mut negotiator = Negotiator::new();
        let mut replies = BytesMut::new();

        let consumed = negotiator
            .negotiate(&[0xFF, 0xF1, 0xFF, 0xFF, 0xFF, 0xFD, 0x03], &mut replies)
            .unwrap();

        assert_eq!(consumed, 7);
        assert!(negotiator.options().is_enabled(TelnetOption::SuppressGoAhead));
    }

    #[test]
    fn test_stops_at_payload() {
        let mut negotiator = Negotiator::new();
        let mut replies = BytesMut::new();

        let consumed = negotiator
            .negotiate(b"\xFF\xFD\x01hello\xFF\xFD\x03", &mut replies)
            .unwrap();

        assert_eq!(consumed, 3);
        assert_eq!(negotiator.options().get(TelnetOption::SuppressGoAhead), None);
    }

    #[test]
    fn test_other_subnegotiation_skipped_to_se() {
        let mut negotiator = Negotiator::new();
        let events = recorder(&mut negotiator, TelnetOption::TTYPE);
        let mut replies = BytesMut::new();

        let consumed = negotiator
            .negotiate(
                &[0xFF, 0xFA, 0x18, 0x00, b'x', b't', b'e', b'r', b'm', 0xFF, 0xF0],
                &mut replies,
            )
            .unwrap();

        assert_eq!(consumed, 11);
        assert!(negotiator.options().is_empty());
        assert_eq!(
            *events.lock().unwrap(),
            vec![OptionEvent::subnegotiated(TelnetOption::TTYPE)]
        );
    }

    #[test]
    fn test_unterminated_subnegotiation() {
        let mut negotiator = Negotiator::new();
        let mut replies = BytesMut::new();

        let err = negotiator
            .negotiate(&[0xFF, 0xFB, 0x01, 0xFF, 0xFA, 0x18, 0x00, 0x01], &mut replies)
            .unwrap_err();

        assert_eq!(
            err,
            CodecError::SubnegotiationError {
                option: Some(0x18),
                reason: SubnegotiationErrorKind::UnterminatedSubnegotiation,
            }
        );
        // The unit before the failure keeps its effect
        assert!(negotiator.options().is_enabled(TelnetOption::Echo));
        assert_eq!(&replies[..], &[0xFF, 0xFD, 0x01]);
    }

    #[test]
    fn test_truncated_units() {
        let mut replies = BytesMut::new();
        let cases: [&[u8]; 5] = [
            &[0xFF],
            &[0xFF, 0xFD],
            &[0xFF, 0xFA],
            &[0xFF, 0xFA, 0x1F, 0x00, 0x50],
            &[0xFF, 0xFA, 0x1F, 0x00, 0x50, 0x00, 0x18, 0xFF],
        ];
        for case in cases {
            let mut negotiator = Negotiator::new();
            assert!(negotiator.negotiate(case, &mut replies).is_err(), "{case:?}");
            assert_eq!(negotiator.options(), &OptionState::new());
        }
        assert!(replies.is_empty());
    }

    #[test]
    fn test_request_encoding() {
        assert_eq!(
            Negotiator::request(TelnetCommand::Will, TelnetOption::Echo),
            [0xFF, 0xFB, 0x01]
        );

        let mut dst = BytesMut::new();
        Negotiator::request_all(
            &[
                (TelnetCommand::Will, TelnetOption::Echo),
                (TelnetCommand::Will, TelnetOption::SuppressGoAhead),
                (TelnetCommand::Do, TelnetOption::NAWS),
            ],
            &mut dst,
        );
        assert_eq!(
            &dst[..],
            &[0xFF, 0xFB, 0x01, 0xFF, 0xFB, 0x03, 0xFF, 0xFD, 0x1F]
        );
    }

    #[test]
    fn test_declare_all() {
        let mut negotiator = Negotiator::new();
        let mut scratch = BytesMut::new();
        negotiator
            .negotiate(&[0xFF, 0xFD, 0x03, 0xFF, 0xFC, 0x01], &mut scratch)
            .unwrap();

        let mut dst = BytesMut::new();
        negotiator.declare_all(&mut dst);
        assert_eq!(&dst[..], &[0xFF, 0xFD, 0x03, 0xFF, 0xFD, 0x01]);
    }

    #[test]
    fn test_subscriber_faults_counted() {
        let mut negotiator = Negotiator::new();
        negotiator.on_option(TelnetOption::Echo, |_| Err("nope".into()));
        let mut replies = BytesMut::new();

        negotiator
            .negotiate(&[0xFF, 0xFD, 0x01, 0xFF, 0xFE, 0x01], &mut replies)
            .unwrap();

        assert_eq!(negotiator.subscriber_faults(), 2);
        assert_eq!(negotiator.options().get(TelnetOption::Echo), Some(false));
    }
}
