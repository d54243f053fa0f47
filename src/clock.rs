//! Reference clock selection and frequency command values.

use std::fmt;

use crate::codec::{self, Frequency, Token, MAX_FREQUENCY_MHZ};
use crate::error::{Error, Result};

/// Measured frequency of the 409B's built-in reference. The manual's nominal value is off.
pub const INTERNAL_REFERENCE_HZ: f64 = 27_000_000.0;
/// Clock multiplier sent with `Kp` when running from an external reference.
pub const DEFAULT_MULTIPLIER: u32 = 10;

const DECIMAL_PLACES: i32 = 7;

/// Where the DDS cores take their reference clock from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClockConfig {
    #[default]
    Internal,
    External {
        reference_frequency_hz: f64,
        multiplier: u32,
    },
}

impl ClockConfig {
    /// Builds an external configuration, rejecting non-positive values.
    pub fn external(reference_frequency_hz: f64, multiplier: u32) -> Result<Self> {
        let config = ClockConfig::External {
            reference_frequency_hz,
            multiplier,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let ClockConfig::External {
            reference_frequency_hz,
            multiplier,
        } = *self
        {
            if !(reference_frequency_hz.is_finite() && reference_frequency_hz > 0.0) {
                return Err(Error::invalid(format!(
                    "external reference frequency must be positive, got {} Hz",
                    reference_frequency_hz
                )));
            }
            if multiplier == 0 {
                return Err(Error::invalid("clock multiplier must be positive"));
            }
        }
        Ok(())
    }

    /// Computes the value to send so that the output runs at `freq_hz`.
    ///
    /// The firmware assumes its internal reference, so with an external clock the
    /// request is scaled by the ratio of the internal to the external reference.
    pub fn frequency_word(&self, freq_hz: f64) -> Result<FrequencyWord> {
        if !freq_hz.is_finite() || freq_hz < 0.0 {
            return Err(Error::invalid(format!("frequency {} Hz is not valid", freq_hz)));
        }
        self.validate()?;

        let hz = match *self {
            ClockConfig::Internal => freq_hz,
            ClockConfig::External {
                reference_frequency_hz,
                multiplier,
            } => {
                let kp = multiplier as f64;
                freq_hz * kp * INTERNAL_REFERENCE_HZ / (kp * reference_frequency_hz)
            }
        };

        let scale = 10f64.powi(DECIMAL_PLACES);
        let mhz = (hz / 1e6 * scale).round() / scale;
        if mhz > MAX_FREQUENCY_MHZ {
            return Err(Error::invalid(format!(
                "{} Hz needs a {} MHz command, above the {} MHz limit",
                freq_hz, mhz, MAX_FREQUENCY_MHZ
            )));
        }
        Ok(FrequencyWord(mhz))
    }
}

/// A frequency command value in MHz, already corrected for the clock source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyWord(f64);

impl FrequencyWord {
    pub fn mhz(&self) -> f64 {
        self.0
    }

    /// The 8-digit table token for this value.
    pub fn to_token(&self) -> Result<Token<Frequency>> {
        codec::encode_frequency(self.0)
    }
}

impl fmt::Display for FrequencyWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = format!("{:.*}", DECIMAL_PLACES as usize, self.0);
        let text = text.trim_end_matches('0').trim_end_matches('.');
        f.write_str(text)
    }
}
