//! Decoding of `D<channel> <index>` responses.

use crate::codec::{self, Amplitude, Dwell, DwellTime, Frequency, Phase, Token};
use crate::command::Channel;
use crate::error::{Error, Result};

/// One stored table row, in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadbackRecord {
    pub channel: Channel,
    pub frequency_mhz: f64,
    pub phase_degrees: f64,
    /// Fraction of full scale.
    pub amplitude: f64,
    pub dwell: Dwell,
}

/// Parses a readback line of the form `<8 hex>,<4 hex>,<4 hex>,<2 hex>`.
pub fn decode_point(raw_line: &str, channel: Channel) -> Result<ReadbackRecord> {
    let line = raw_line.trim();
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(Error::malformed(
            raw_line,
            format!("expected 4 comma-separated fields, found {}", fields.len()),
        ));
    }

    let malformed = |e: codec::TokenError| Error::malformed(raw_line, e.to_string());
    let frequency = Token::<Frequency>::from_hex(fields[0]).map_err(malformed)?;
    let phase = Token::<Phase>::from_hex(fields[1]).map_err(malformed)?;
    let amplitude = Token::<Amplitude>::from_hex(fields[2]).map_err(malformed)?;
    let dwell = Token::<DwellTime>::from_hex(fields[3]).map_err(malformed)?;

    Ok(ReadbackRecord {
        channel,
        frequency_mhz: codec::decode_frequency(frequency),
        phase_degrees: codec::decode_phase(phase),
        amplitude: codec::decode_amplitude(amplitude),
        dwell: codec::decode_dwell(dwell),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hold_row() {
        let record = decode_point("00989680,0000,0000,ff\r\n", Channel::CH0).unwrap();
        assert_eq!(record.channel, Channel::CH0);
        assert_eq!(record.frequency_mhz, 1.0);
        assert_eq!(record.phase_degrees, 0.0);
        assert_eq!(record.amplitude, 0.0);
        assert_eq!(record.dwell, Dwell::WaitForTrigger);
    }

    #[test]
    fn decodes_full_scale_row() {
        let record = decode_point("019BFCC0,3FFF,03FF,0A", Channel::CH1).unwrap();
        assert_eq!(record.frequency_mhz, 2.7);
        assert_eq!(record.phase_degrees, 360.0);
        assert_eq!(record.amplitude, 1.0);
        assert_eq!(record.dwell, Dwell::Millis(1.0));
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        let err = decode_point("00989680,0000,0000", Channel::CH0).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
        assert!(decode_point("", Channel::CH0).is_err());
        assert!(decode_point("00989680,0000,0000,ff,00", Channel::CH0).is_err());
    }

    #[test]
    fn bad_width_or_digits_are_malformed() {
        match decode_point("989680,0000,0000,ff", Channel::CH0).unwrap_err() {
            Error::MalformedResponse { line, reason } => {
                assert_eq!(line, "989680,0000,0000,ff");
                assert_eq!(reason, "frequency field must be 8 hex digits, found 6");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(decode_point("00989680,00g0,0000,ff", Channel::CH0).is_err());
    }

    #[test]
    fn values_above_encoder_range_still_decode() {
        let record = decode_point("00989680,0000,0400,ff", Channel::CH0).unwrap();
        assert_eq!(record.amplitude, 1024.0 / 1023.0);

        let record = decode_point("ffffffff,ffff,ffff,ff", Channel::CH1).unwrap();
        assert_eq!(record.frequency_mhz, 0xffff_ffffu32 as f64 / 1e7);
        assert_eq!(record.phase_degrees, 65535.0 / 16383.0 * 360.0);
        assert_eq!(record.amplitude, 65535.0 / 1023.0);
        assert_eq!(record.dwell, Dwell::WaitForTrigger);
    }
}
