//! Field codecs for table rows.
//!
//! Every table field travels as a fixed-width, zero-padded lowercase hex token.
//! The encoders scale a physical value to the firmware integer, the decoders
//! divide it back out. Phase and amplitude follow the firmware's permissive
//! behaviour: an out-of-range value is replaced by zero and reported as
//! [`Encoded::Clamped`]. Frequency, dwell and index values outside the field
//! are rejected instead.

use std::fmt;
use std::marker::PhantomData;

use log::warn;
use thiserror::Error;

use crate::error::{Error, Result};

/// Highest output frequency of the 409B.
pub const MAX_FREQUENCY_MHZ: f64 = 171.0;
/// Table frequencies are stored in units of 0.1 Hz.
pub const FREQUENCY_STEPS_PER_MHZ: f64 = 1e7;
/// 14-bit phase full scale, spanning 360 degrees.
pub const PHASE_FULL_SCALE: u32 = (1 << 14) - 1;
/// 10-bit amplitude full scale.
pub const AMPLITUDE_FULL_SCALE: u32 = (1 << 10) - 1;
/// Dwell value that holds the current row until an external trigger (`ff`).
pub const TABLE_HOLD_MS: f64 = 25.5;
const DWELL_HOLD_RAW: u32 = 0xff;

/// Describes one fixed-width hex field of the table grammar.
pub trait Field {
    const NAME: &'static str;
    /// Number of hex digits on the wire.
    const WIDTH: usize;
    /// Largest integer the firmware accepts for the field.
    const MAX: u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frequency;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amplitude;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellTime;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileIndex;

impl Field for Frequency {
    const NAME: &'static str = "frequency";
    const WIDTH: usize = 8;
    const MAX: u32 = 1_710_000_000;
}

impl Field for Phase {
    const NAME: &'static str = "phase";
    const WIDTH: usize = 4;
    const MAX: u32 = PHASE_FULL_SCALE;
}

impl Field for Amplitude {
    const NAME: &'static str = "amplitude";
    const WIDTH: usize = 4;
    const MAX: u32 = AMPLITUDE_FULL_SCALE;
}

impl Field for DwellTime {
    const NAME: &'static str = "dwell";
    const WIDTH: usize = 2;
    const MAX: u32 = 0xff;
}

impl Field for ProfileIndex {
    const NAME: &'static str = "profile index";
    const WIDTH: usize = 4;
    const MAX: u32 = 0xffff;
}

/// Why a hex token could not be read back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("{field} field must be {expected} hex digits, found {found}")]
    Width {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{field} field {text:?} is not hexadecimal")]
    NotHex { field: &'static str, text: String },
}

/// An integer of field `F`, rendered as its wire token.
///
/// Encoders only produce values up to `F::MAX`. Tokens read back from the
/// device may hold anything that fits `F::WIDTH` hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<F> {
    raw: u32,
    field: PhantomData<F>,
}

impl<F: Field> Token<F> {
    /// Returns `None` when `raw` does not fit the field.
    pub fn new(raw: u32) -> Option<Self> {
        (raw <= F::MAX).then(|| Self::from_raw(raw))
    }

    pub fn zero() -> Self {
        Self::from_raw(0)
    }

    fn from_raw(raw: u32) -> Self {
        debug_assert!(raw <= F::MAX);
        Self {
            raw,
            field: PhantomData,
        }
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// Parses a token exactly `F::WIDTH` hex digits long. Either case is accepted.
    ///
    /// The value is not checked against `F::MAX`, so stored rows decode as-is.
    pub fn from_hex(text: &str) -> std::result::Result<Self, TokenError> {
        if text.len() != F::WIDTH {
            return Err(TokenError::Width {
                field: F::NAME,
                expected: F::WIDTH,
                found: text.len(),
            });
        }
        if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TokenError::NotHex {
                field: F::NAME,
                text: text.to_string(),
            });
        }
        let value = u32::from_str_radix(text, 16).map_err(|_| TokenError::NotHex {
            field: F::NAME,
            text: text.to_string(),
        })?;
        Ok(Self {
            raw: value,
            field: PhantomData,
        })
    }
}

impl<F: Field> fmt::Display for Token<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$x}", self.raw, width = F::WIDTH)
    }
}

/// Outcome of a clamping encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoded<T> {
    InRange(T),
    /// `requested` fell outside the field and `replacement` is sent instead.
    Clamped { requested: f64, replacement: T },
}

impl<T: Copy> Encoded<T> {
    /// The token that goes on the wire either way.
    pub fn token(&self) -> T {
        match *self {
            Encoded::InRange(token) => token,
            Encoded::Clamped { replacement, .. } => replacement,
        }
    }

    pub fn is_clamped(&self) -> bool {
        matches!(self, Encoded::Clamped { .. })
    }
}

/// A decoded dwell time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dwell {
    Millis(f64),
    /// Row is held until the next `TS` or external trigger.
    WaitForTrigger,
}

impl fmt::Display for Dwell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dwell::Millis(ms) => write!(f, "{} ms", ms),
            Dwell::WaitForTrigger => f.write_str("wait for trigger"),
        }
    }
}

fn clamp_to_field<F: Field>(requested: f64, scaled: f64) -> Encoded<Token<F>> {
    let rounded = scaled.round();
    if rounded.is_finite() && rounded >= 0.0 && rounded <= F::MAX as f64 {
        Encoded::InRange(Token::from_raw(rounded as u32))
    } else {
        warn!("{} {} is outside the device range, sending 0", F::NAME, requested);
        Encoded::Clamped {
            requested,
            replacement: Token::zero(),
        }
    }
}

/// Encodes a frequency given in MHz.
pub fn encode_frequency(mhz: f64) -> Result<Token<Frequency>> {
    if !mhz.is_finite() || !(0.0..=MAX_FREQUENCY_MHZ).contains(&mhz) {
        return Err(Error::invalid(format!(
            "frequency {} MHz is outside 0..={} MHz",
            mhz, MAX_FREQUENCY_MHZ
        )));
    }
    let raw = (mhz * FREQUENCY_STEPS_PER_MHZ).round() as u32;
    Ok(Token::from_raw(raw.min(Frequency::MAX)))
}

/// Frequency in MHz.
pub fn decode_frequency(token: Token<Frequency>) -> f64 {
    token.raw() as f64 / FREQUENCY_STEPS_PER_MHZ
}

pub fn encode_phase(degrees: f64) -> Encoded<Token<Phase>> {
    clamp_to_field(degrees, degrees / 360.0 * PHASE_FULL_SCALE as f64)
}

/// Phase in degrees.
pub fn decode_phase(token: Token<Phase>) -> f64 {
    token.raw() as f64 / PHASE_FULL_SCALE as f64 * 360.0
}

/// Encodes a fraction of full-scale output.
pub fn encode_amplitude(normalized: f64) -> Encoded<Token<Amplitude>> {
    clamp_to_field(normalized, normalized * AMPLITUDE_FULL_SCALE as f64)
}

pub fn decode_amplitude(token: Token<Amplitude>) -> f64 {
    token.raw() as f64 / AMPLITUDE_FULL_SCALE as f64
}

/// Encodes a dwell time in ms. `00` resets the table, `ff` ([`TABLE_HOLD_MS`]) holds.
pub fn encode_dwell(ms: f64) -> Result<Token<DwellTime>> {
    let steps = (ms * 10.0).round();
    if !steps.is_finite() || steps < 0.0 || steps > DwellTime::MAX as f64 {
        return Err(Error::invalid(format!(
            "dwell {} ms is outside 0..={} ms",
            ms, TABLE_HOLD_MS
        )));
    }
    Ok(Token::from_raw(steps as u32))
}

pub fn decode_dwell(token: Token<DwellTime>) -> Dwell {
    match token.raw() {
        DWELL_HOLD_RAW => Dwell::WaitForTrigger,
        raw => Dwell::Millis(raw as f64 / 10.0),
    }
}

pub fn encode_index(index: usize) -> Result<Token<ProfileIndex>> {
    u32::try_from(index)
        .ok()
        .and_then(Token::new)
        .ok_or_else(|| Error::invalid(format!("profile index {} exceeds 0xffff", index)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_round_trips_within_one_step() {
        let step = 360.0 / PHASE_FULL_SCALE as f64;
        for i in 0..3600 {
            let degrees = i as f64 * 0.1;
            let token = encode_phase(degrees).token();
            assert!((decode_phase(token) - degrees).abs() <= step, "{}", degrees);
        }
    }

    #[test]
    fn amplitude_round_trips_within_one_step() {
        let step = 1.0 / AMPLITUDE_FULL_SCALE as f64;
        for i in 0..=1000 {
            let value = i as f64 / 1000.0;
            let token = encode_amplitude(value).token();
            assert!((decode_amplitude(token) - value).abs() <= step, "{}", value);
        }
    }

    #[test]
    fn frequency_round_trips_within_resolution() {
        for mhz in [0.0, 0.1234567, 1.0, 27.0, 99.9999999, 171.0] {
            let token = encode_frequency(mhz).unwrap();
            assert!((decode_frequency(token) - mhz).abs() <= 1e-7, "{}", mhz);
        }
    }

    #[test]
    fn frequency_token_is_eight_digits() {
        assert_eq!(encode_frequency(1.0).unwrap().to_string(), "00989680");
        assert_eq!(encode_frequency(171.0).unwrap().to_string(), "65ec8780");
    }

    #[test]
    fn frequency_outside_device_range_is_rejected() {
        assert!(matches!(encode_frequency(171.5), Err(Error::InvalidArgument(_))));
        assert!(matches!(encode_frequency(-1.0), Err(Error::InvalidArgument(_))));
        assert!(matches!(encode_frequency(f64::NAN), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn out_of_range_phase_clamps_to_zero() {
        assert_eq!(encode_phase(-1.0).token().to_string(), "0000");
        assert_eq!(encode_phase(361.0).token().to_string(), "0000");
        assert_eq!(
            encode_phase(361.0),
            Encoded::Clamped {
                requested: 361.0,
                replacement: Token::zero()
            }
        );
        assert!(encode_phase(f64::NAN).is_clamped());
    }

    #[test]
    fn full_circle_phase_is_in_range() {
        let encoded = encode_phase(360.0);
        assert!(!encoded.is_clamped());
        assert_eq!(encoded.token().to_string(), "3fff");
        assert_eq!(encode_phase(180.0).token().to_string(), "2000");
    }

    #[test]
    fn out_of_range_amplitude_clamps_to_zero() {
        assert_eq!(encode_amplitude(-0.1).token().to_string(), "0000");
        assert_eq!(encode_amplitude(1.1).token().to_string(), "0000");
        assert!(encode_amplitude(1.1).is_clamped());
        assert_eq!(encode_amplitude(1.0), Encoded::InRange(Token::new(1023).unwrap()));
        assert_eq!(encode_amplitude(1.0).token().to_string(), "03ff");
    }

    #[test]
    fn dwell_sentinel() {
        assert_eq!(encode_dwell(TABLE_HOLD_MS).unwrap().to_string(), "ff");
        assert_eq!(encode_dwell(0.0).unwrap().to_string(), "00");
        assert_eq!(encode_dwell(1.5).unwrap().to_string(), "0f");
        assert_eq!(decode_dwell(Token::new(0xff).unwrap()), Dwell::WaitForTrigger);
        assert_eq!(decode_dwell(Token::new(0x0f).unwrap()), Dwell::Millis(1.5));
    }

    #[test]
    fn dwell_outside_field_is_rejected() {
        assert!(matches!(encode_dwell(25.6), Err(Error::InvalidArgument(_))));
        assert!(matches!(encode_dwell(-0.1), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn index_formatting() {
        assert_eq!(encode_index(0).unwrap().to_string(), "0000");
        assert_eq!(encode_index(4095).unwrap().to_string(), "0fff");
        assert_eq!(encode_index(65535).unwrap().to_string(), "ffff");
        assert!(matches!(encode_index(65536), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn token_parsing_checks_width_and_digits() {
        assert_eq!(Token::<Phase>::from_hex("3FFF").unwrap().raw(), 0x3fff);
        assert_eq!(
            Token::<Phase>::from_hex("3ff"),
            Err(TokenError::Width {
                field: "phase",
                expected: 4,
                found: 3
            })
        );
        assert!(matches!(Token::<Amplitude>::from_hex("+3ff"), Err(TokenError::NotHex { .. })));
        assert_eq!(Token::<Amplitude>::from_hex("0400").unwrap().raw(), 0x400);
        assert_eq!(Token::<Frequency>::from_hex("ffffffff").unwrap().to_string(), "ffffffff");
    }
}
