//! Owned handle to one generator.

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::clock::ClockConfig;
use crate::codec::{self, encode_index};
use crate::command::{Channel, ClockSource, Command};
use crate::error::{Error, Result};
use crate::readback::{decode_point, ReadbackRecord};
use crate::table::{program_table, ProfileTable, TableProgram};
use crate::transport::{SerialSettings, SerialTransport, Transport};

/// Pause between `M 0` and `M t` when switching the table on.
const TABLE_ON_SETTLE: Duration = Duration::from_millis(10);

/// A Novatech 409B behind a transport.
///
/// Every command is written and its response read before the next one goes
/// out. The handle owns the transport, so one device cannot be driven from two
/// places at once.
pub struct Generator<T: Transport> {
    transport: T,
    clock: ClockConfig,
}

impl Generator<SerialTransport> {
    /// Opens the serial port. The device is assumed to run on its internal clock.
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        Ok(Self::new(SerialTransport::open(settings)?, ClockConfig::Internal))
    }
}

impl<T: Transport> Generator<T> {
    pub fn new(transport: T, clock: ClockConfig) -> Self {
        Self { transport, clock }
    }

    pub fn clock(&self) -> &ClockConfig {
        &self.clock
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Writes one command and returns whatever lines came back.
    pub fn send(&mut self, command: &Command) -> Result<Vec<String>> {
        self.send_raw(&command.to_string())
    }

    /// Sends a line verbatim. Used by the console for commands without a typed form.
    pub fn send_raw(&mut self, line: &str) -> Result<Vec<String>> {
        debug!("> {}", line);
        self.transport.write_line(line)?;
        let response = self.transport.read_lines()?;
        for line in &response {
            debug!("< {}", line);
        }
        Ok(response)
    }

    pub fn reset(&mut self) -> Result<Vec<String>> {
        self.send(&Command::Reset)
    }

    /// Returns the raw `QUE` block. See the 409B manual for its layout.
    pub fn status(&mut self) -> Result<Vec<String>> {
        self.send(&Command::Status)
    }

    pub fn disable_echo(&mut self) -> Result<Vec<String>> {
        self.send(&Command::DisableEcho)
    }

    /// Stores the current settings as power-on defaults.
    pub fn save_settings(&mut self) -> Result<Vec<String>> {
        self.send(&Command::SaveSettings)
    }

    pub fn use_internal_clock(&mut self) -> Result<()> {
        self.send(&Command::SelectClock(ClockSource::Internal))?;
        self.clock = ClockConfig::Internal;
        info!("switched to the internal reference clock");
        Ok(())
    }

    /// Sets the multiplier, then selects the external reference.
    pub fn use_external_clock(
        &mut self,
        reference_frequency_hz: f64,
        multiplier: u32,
    ) -> Result<()> {
        let clock = ClockConfig::external(reference_frequency_hz, multiplier)?;
        self.send(&Command::SetMultiplier(multiplier))?;
        self.send(&Command::SelectClock(ClockSource::External))?;
        self.clock = clock;
        info!(
            "switched to a {} Hz external reference with Kp {}",
            reference_frequency_hz, multiplier
        );
        Ok(())
    }

    /// Sets the output frequency in Hz, corrected for the active clock.
    pub fn set_frequency(&mut self, channel: Channel, frequency_hz: f64) -> Result<()> {
        let word = self.clock.frequency_word(frequency_hz)?;
        self.send(&Command::SetFrequency { channel, word })?;
        Ok(())
    }

    /// Out-of-range phases are sent as 0, as in table rows.
    pub fn set_phase(&mut self, channel: Channel, degrees: f64) -> Result<()> {
        let counts = codec::encode_phase(degrees).token().raw();
        self.send(&Command::SetPhase { channel, counts })?;
        Ok(())
    }

    /// Sets the amplitude as a fraction of full scale. Out-of-range values are sent as 0.
    pub fn set_amplitude(&mut self, channel: Channel, amplitude: f64) -> Result<()> {
        let counts = codec::encode_amplitude(amplitude).token().raw();
        self.send(&Command::SetAmplitude { channel, counts })?;
        Ok(())
    }

    pub fn toggle_table(&mut self) -> Result<()> {
        self.send(&Command::ToggleTable)?;
        Ok(())
    }

    pub fn table_off(&mut self) -> Result<()> {
        self.send(&Command::TableOff)?;
        Ok(())
    }

    /// Toggle only flips the mode, so the table is forced off first.
    pub fn table_on(&mut self) -> Result<()> {
        self.table_off()?;
        thread::sleep(TABLE_ON_SETTLE);
        self.toggle_table()
    }

    /// Steps to the next profile point. Not idempotent.
    pub fn advance_table(&mut self) -> Result<()> {
        self.send(&Command::Trigger)?;
        Ok(())
    }

    /// Uploads `table` and leaves table mode off.
    ///
    /// A transport error stops the upload part way through; the device keeps
    /// the rows written so far and the whole table has to be sent again.
    pub fn fill_table(&mut self, table: &ProfileTable) -> Result<TableProgram> {
        let program = program_table(table, &self.clock)?;
        info!("writing {} profile points", table.len());
        for command in &program.commands {
            self.send(command)?;
        }
        if !program.clamps.is_empty() {
            warn!("{} table values were out of range and sent as 0", program.clamps.len());
        }
        info!("table upload complete");
        Ok(program)
    }

    /// Reads back one stored row.
    pub fn read_point(&mut self, channel: Channel, index: usize) -> Result<ReadbackRecord> {
        let channel = channel.require_table()?;
        let index = encode_index(index)?;
        let response = self.send(&Command::ReadRow { channel, index })?;
        let line = response.iter().find(|l| !l.trim().is_empty()).ok_or_else(|| {
            warn!("no readback for row {} of channel {}", index, channel);
            Error::TransportTimeout
        })?;
        decode_point(line, channel)
    }

    /// Reads back rows `0..points`.
    pub fn read_table(&mut self, channel: Channel, points: usize) -> Result<Vec<ReadbackRecord>> {
        (0..points).map(|i| self.read_point(channel, i)).collect()
    }

    /// Keys the amplitude between `high` and 0 for `cycles` periods. Meant for slow modulation.
    pub fn modulate_channel(
        &mut self,
        channel: Channel,
        modulation_hz: f64,
        high: f64,
        cycles: usize,
    ) -> Result<()> {
        if !(modulation_hz.is_finite() && modulation_hz > 0.0) {
            return Err(Error::invalid(format!(
                "modulation frequency must be positive, got {} Hz",
                modulation_hz
            )));
        }
        let half_period = Duration::try_from_secs_f64(0.5 / modulation_hz).map_err(|_| {
            Error::invalid(format!(
                "modulation frequency {} Hz is too low to time",
                modulation_hz
            ))
        })?;
        for _ in 0..cycles {
            self.set_amplitude(channel, high)?;
            thread::sleep(half_period);
            self.set_amplitude(channel, 0.0)?;
            thread::sleep(half_period);
        }
        Ok(())
    }
}
