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

use crate::TelnetOption;
use crate::naws::WindowSize;

///
/// `OptionEvent` is published by the [`Negotiator`](crate::Negotiator) each time a
/// recognized option changes value or is subnegotiated.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionEvent {
    /// The option the event concerns. Also the key it is published under.
    pub option: TelnetOption,
    /// The value after the unit was applied
    pub value: OptionValue,
}

/// Value carried by an [`OptionEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    /// Result of a DO/DONT/WILL/WONT unit
    Enabled(bool),
    /// Dimensions from a NAWS subnegotiation
    WindowSize(WindowSize),
    /// A subnegotiation for a recognized option whose payload was skipped
    Subnegotiated,
}

impl OptionEvent {
    /// Event for a binary option transition.
    pub fn enabled(option: TelnetOption, enabled: bool) -> Self {
        OptionEvent {
            option,
            value: OptionValue::Enabled(enabled),
        }
    }

    /// Event for a window size report.
    pub fn window_size(size: WindowSize) -> Self {
        OptionEvent {
            option: TelnetOption::NAWS,
            value: OptionValue::WindowSize(size),
        }
    }

    /// Event for a skipped subnegotiation.
    pub fn subnegotiated(option: TelnetOption) -> Self {
        OptionEvent {
            option,
            value: OptionValue::Subnegotiated,
        }
    }
}

impl std::fmt::Display for OptionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            OptionValue::Enabled(true) => write!(f, "{} enabled", self.option),
            OptionValue::Enabled(false) => write!(f, "{} disabled", self.option),
            OptionValue::WindowSize(size) => write!(f, "{} {}", self.option, size),
            OptionValue::Subnegotiated => write!(f, "{} subnegotiated", self.option),
        }
    }
}
