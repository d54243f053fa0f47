//! The 409B ASCII command grammar.

use std::fmt;

use crate::clock::FrequencyWord;
use crate::codec::{Amplitude, DwellTime, Frequency, Phase, ProfileIndex, Token};
use crate::error::{Error, Result};

/// One of the four output channels. Only channels 0 and 1 have a profile table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(u8);

impl Channel {
    pub const CH0: Channel = Channel(0);
    pub const CH1: Channel = Channel(1);

    pub fn new(number: u8) -> Result<Self> {
        match number {
            0..=3 => Ok(Channel(number)),
            _ => Err(Error::invalid(format!("channel {} does not exist", number))),
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// Fails for channels without table memory.
    pub fn require_table(self) -> Result<Self> {
        if self.0 > 1 {
            return Err(Error::invalid(format!("channel {} has no profile table", self.0)));
        }
        Ok(self)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    Internal,
    External,
}

/// Table row payload: `<freq>,<phase>,<amp>,<dwell>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowTokens {
    pub frequency: Token<Frequency>,
    pub phase: Token<Phase>,
    pub amplitude: Token<Amplitude>,
    pub dwell: Token<DwellTime>,
}

impl fmt::Display for RowTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.frequency, self.phase, self.amplitude, self.dwell
        )
    }
}

/// A command the generator understands. `Display` renders the line without its terminator.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SelectClock(ClockSource),
    SetMultiplier(u32),
    SetAmplitude { channel: Channel, counts: u32 },
    SetFrequency {
        channel: Channel,
        word: FrequencyWord,
    },
    SetPhase { channel: Channel, counts: u32 },
    ToggleTable,
    TableOff,
    WriteRow {
        channel: Channel,
        index: Token<ProfileIndex>,
        row: RowTokens,
    },
    ReadRow {
        channel: Channel,
        index: Token<ProfileIndex>,
    },
    /// Steps the table to the next profile point.
    Trigger,
    Status,
    DisableEcho,
    SaveSettings,
    Reset,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SelectClock(ClockSource::Internal) => f.write_str("C I"),
            Command::SelectClock(ClockSource::External) => f.write_str("C E"),
            Command::SetMultiplier(kp) => write!(f, "Kp {}", kp),
            Command::SetAmplitude { channel, counts } => write!(f, "V{} {}", channel, counts),
            Command::SetFrequency { channel, word } => write!(f, "F{} {}", channel, word),
            Command::SetPhase { channel, counts } => write!(f, "P{} {}", channel, counts),
            Command::ToggleTable => f.write_str("M t"),
            Command::TableOff => f.write_str("M 0"),
            Command::WriteRow {
                channel,
                index,
                row,
            } => write!(f, "t{} {} {}", channel, index, row),
            Command::ReadRow { channel, index } => write!(f, "D{} {}", channel, index),
            Command::Trigger => f.write_str("TS"),
            Command::Status => f.write_str("QUE"),
            Command::DisableEcho => f.write_str("E D"),
            Command::SaveSettings => f.write_str("S"),
            Command::Reset => f.write_str("R"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockConfig;
    use crate::codec::encode_index;

    #[test]
    fn renders_fixed_commands() {
        assert_eq!(Command::SelectClock(ClockSource::Internal).to_string(), "C I");
        assert_eq!(Command::SelectClock(ClockSource::External).to_string(), "C E");
        assert_eq!(Command::SetMultiplier(10).to_string(), "Kp 10");
        assert_eq!(Command::ToggleTable.to_string(), "M t");
        assert_eq!(Command::TableOff.to_string(), "M 0");
        assert_eq!(Command::Trigger.to_string(), "TS");
        assert_eq!(Command::Status.to_string(), "QUE");
        assert_eq!(Command::DisableEcho.to_string(), "E D");
        assert_eq!(Command::SaveSettings.to_string(), "S");
        assert_eq!(Command::Reset.to_string(), "R");
    }

    #[test]
    fn renders_direct_mode_commands() {
        let ch2 = Channel::new(2).unwrap();
        let word = ClockConfig::Internal.frequency_word(12_500_000.0).unwrap();
        assert_eq!(Command::SetFrequency { channel: ch2, word }.to_string(), "F2 12.5");
        let amplitude = Command::SetAmplitude {
            channel: Channel::CH0,
            counts: 1023,
        };
        assert_eq!(amplitude.to_string(), "V0 1023");
        let phase = Command::SetPhase {
            channel: Channel::CH1,
            counts: 8192,
        };
        assert_eq!(phase.to_string(), "P1 8192");
    }

    #[test]
    fn renders_readback_request() {
        let index = encode_index(0x1a).unwrap();
        let read = Command::ReadRow {
            channel: Channel::CH1,
            index,
        };
        assert_eq!(read.to_string(), "D1 001a");
    }

    #[test]
    fn channel_range() {
        assert!(Channel::new(3).is_ok());
        assert!(matches!(Channel::new(4), Err(Error::InvalidArgument(_))));
        assert!(Channel::CH1.require_table().is_ok());
        assert!(Channel::new(2).unwrap().require_table().is_err());
    }
}
