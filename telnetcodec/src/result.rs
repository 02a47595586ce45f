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

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur while decoding negotiation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// An I/O error occurred while writing an encoded value.
    IOError {
        /// The kind of I/O error that occurred
        kind: std::io::ErrorKind,
        /// Description of the operation that failed
        operation: String,
    },

    /// A negotiation unit ended before all of its bytes were present.
    IncompleteUnit {
        /// The command byte of the truncated unit, if it was read
        command: Option<u8>,
        /// Number of bytes the unit needed
        required: usize,
        /// Number of bytes that were available
        available: usize,
    },

    /// Error occurred during telnet option subnegotiation.
    SubnegotiationError {
        /// The telnet option being subnegotiated
        option: Option<u8>,
        /// Specific reason for the failure
        reason: SubnegotiationErrorKind,
    },
}

/// Specific kinds of subnegotiation errors with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubnegotiationErrorKind {
    /// Insufficient data available to decode the subnegotiation payload.
    InsufficientData {
        /// Number of bytes required
        required: usize,
        /// Number of bytes available
        available: usize,
    },

    /// `SB` was the last byte of the input.
    MissingOption,

    /// Input ended before the terminating `SE`.
    UnterminatedSubnegotiation,

    /// Input ended before the two terminator bytes of a fixed-size payload.
    MissingTerminator {
        /// Number of terminator bytes present
        available: usize,
    },
}

impl std::error::Error for CodecError {}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::IOError { kind, operation } => {
                write!(f, "I/O error during {}: {:?}", operation, kind)
            }
            CodecError::IncompleteUnit {
                command,
                required,
                available,
            } => match command {
                Some(cmd) => write!(
                    f,
                    "Incomplete unit for command 0x{:02X} (required: {}, available: {})",
                    cmd, required, available
                ),
                None => write!(f, "Incomplete unit: IAC without a command byte"),
            },
            CodecError::SubnegotiationError { option, reason } => {
                if let Some(opt) = option {
                    write!(f, "Subnegotiation error for option {}: {}", opt, reason)
                } else {
                    write!(f, "Subnegotiation error: {}", reason)
                }
            }
        }
    }
}

impl std::fmt::Display for SubnegotiationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubnegotiationErrorKind::InsufficientData {
                required,
                available,
            } => {
                write!(
                    f,
                    "insufficient data (required: {}, available: {})",
                    required, available
                )
            }
            SubnegotiationErrorKind::MissingOption => write!(f, "missing option byte"),
            SubnegotiationErrorKind::UnterminatedSubnegotiation => {
                write!(f, "unterminated subnegotiation")
            }
            SubnegotiationErrorKind::MissingTerminator { available } => {
                write!(f, "missing terminator ({} of 2 bytes)", available)
            }
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::IOError {
            kind: err.kind(),
            operation: err.to_string(),
        }
    }
}
