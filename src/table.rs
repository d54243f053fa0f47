//! Profile table uploads.
//!
//! A table is written with table mode switched off (`M 0`), then one `t0` and
//! one `t1` row per profile point in index order. The firmware latches rows
//! sequentially, so the order of [`TableProgram::commands`] is significant.

use log::debug;

use crate::clock::ClockConfig;
use crate::codec::{self, encode_index, Encoded};
use crate::command::{Channel, Command, RowTokens};
use crate::error::{Error, Result};

/// Number of addressable profile points.
pub const MAX_PROFILE_POINTS: usize = 1 << 16;

/// Settings of one channel at one profile point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableEntry {
    /// Output frequency, 0 to 171 MHz.
    pub frequency_hz: f64,
    pub phase_degrees: f64,
    /// Fraction of full-scale output, 0 to 1.
    pub amplitude: f64,
    /// Time spent on this point in 0.1 ms steps, or [`codec::TABLE_HOLD_MS`].
    pub dwell_ms: f64,
}

impl TableEntry {
    pub fn new(frequency_hz: f64, phase_degrees: f64, amplitude: f64, dwell_ms: f64) -> Self {
        Self {
            frequency_hz,
            phase_degrees,
            amplitude,
            dwell_ms,
        }
    }
}

/// Rows of (channel 0, channel 1) entries for a single upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTable {
    rows: Vec<[TableEntry; 2]>,
}

impl ProfileTable {
    pub fn new(channel0: Vec<TableEntry>, channel1: Vec<TableEntry>) -> Result<Self> {
        if channel0.len() != channel1.len() {
            return Err(Error::invalid(format!(
                "channel 0 has {} entries but channel 1 has {}",
                channel0.len(),
                channel1.len()
            )));
        }
        Self::check_len(channel0.len())?;
        let rows = channel0.into_iter().zip(channel1).map(|(a, b)| [a, b]).collect();
        Ok(Self { rows })
    }

    /// Builds a table from per-channel columns sharing one dwell column.
    #[allow(clippy::too_many_arguments)]
    pub fn from_columns(
        frequency0_hz: &[f64],
        phase0_degrees: &[f64],
        amplitude0: &[f64],
        frequency1_hz: &[f64],
        phase1_degrees: &[f64],
        amplitude1: &[f64],
        dwell_ms: &[f64],
    ) -> Result<Self> {
        let n = dwell_ms.len();
        let columns = [
            frequency0_hz.len(),
            phase0_degrees.len(),
            amplitude0.len(),
            frequency1_hz.len(),
            phase1_degrees.len(),
            amplitude1.len(),
        ];
        if columns.iter().any(|&len| len != n) {
            return Err(Error::invalid(format!(
                "table columns have unequal lengths {:?}, dwell has {}",
                columns, n
            )));
        }
        Self::check_len(n)?;

        let rows = (0..n)
            .map(|i| {
                [
                    TableEntry::new(
                        frequency0_hz[i],
                        phase0_degrees[i],
                        amplitude0[i],
                        dwell_ms[i],
                    ),
                    TableEntry::new(
                        frequency1_hz[i],
                        phase1_degrees[i],
                        amplitude1[i],
                        dwell_ms[i],
                    ),
                ]
            })
            .collect();
        Ok(Self { rows })
    }

    fn check_len(n: usize) -> Result<()> {
        if n == 0 {
            return Err(Error::invalid("profile table is empty"));
        }
        if n > MAX_PROFILE_POINTS {
            return Err(Error::invalid(format!(
                "{} profile points exceed the table size of {}",
                n, MAX_PROFILE_POINTS
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[[TableEntry; 2]] {
        &self.rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampedField {
    Phase,
    Amplitude,
}

/// A value that was replaced by zero while encoding the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampEvent {
    pub index: usize,
    pub channel: Channel,
    pub field: ClampedField,
    pub requested: f64,
}

/// Commands for one upload, in transmission order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableProgram {
    pub commands: Vec<Command>,
    pub clamps: Vec<ClampEvent>,
}

fn encode_row(
    entry: &TableEntry,
    clock: &ClockConfig,
    index: usize,
    channel: Channel,
    clamps: &mut Vec<ClampEvent>,
) -> Result<RowTokens> {
    let frequency = clock.frequency_word(entry.frequency_hz)?.to_token()?;
    let phase = codec::encode_phase(entry.phase_degrees);
    let amplitude = codec::encode_amplitude(entry.amplitude);
    let dwell = codec::encode_dwell(entry.dwell_ms)?;

    if let Encoded::Clamped { requested, .. } = phase {
        clamps.push(ClampEvent {
            index,
            channel,
            field: ClampedField::Phase,
            requested,
        });
    }
    if let Encoded::Clamped { requested, .. } = amplitude {
        clamps.push(ClampEvent {
            index,
            channel,
            field: ClampedField::Amplitude,
            requested,
        });
    }

    Ok(RowTokens {
        frequency,
        phase: phase.token(),
        amplitude: amplitude.token(),
        dwell,
    })
}

/// Encodes every row of `table` for the given clock. Nothing is sent, so an
/// invalid entry fails before the device is touched.
pub fn program_table(table: &ProfileTable, clock: &ClockConfig) -> Result<TableProgram> {
    let mut commands = Vec::with_capacity(1 + 2 * table.len());
    let mut clamps = Vec::new();
    commands.push(Command::TableOff);

    for (i, [entry0, entry1]) in table.rows().iter().enumerate() {
        let index = encode_index(i)?;
        for (channel, entry) in [(Channel::CH0, entry0), (Channel::CH1, entry1)] {
            let row = encode_row(entry, clock, i, channel, &mut clamps)
                .map_err(|e| match e {
                    Error::InvalidArgument(msg) => Error::invalid(format!(
                        "profile point {} channel {}: {}",
                        i, channel, msg
                    )),
                    other => other,
                })?;
            commands.push(Command::WriteRow {
                channel,
                index,
                row,
            });
        }
    }

    debug!(
        "encoded {} profile points into {} commands ({} clamped values)",
        table.len(),
        commands.len(),
        clamps.len()
    );
    Ok(TableProgram { commands, clamps })
}
