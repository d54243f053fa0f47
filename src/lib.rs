//! # Novatech 409B Driver Library
//!
//! Drives the Novatech 409B two-channel DDS signal generator over its ASCII
//! serial protocol. The interesting part is the profile table: physical
//! frequency, phase, amplitude and dwell values are encoded into the
//! fixed-width hex rows the firmware stores, corrected for the reference clock
//! in use, and decoded again on readback.
//!
//! ```no_run
//! use dds409b::{Generator, ProfileTable, SerialSettings, TableEntry, TABLE_HOLD_MS};
//!
//! # fn main() -> dds409b::Result<()> {
//! let mut dds = Generator::open(&SerialSettings::default())?;
//! dds.disable_echo()?;
//! let rows = vec![
//!     TableEntry::new(1e6, 0.0, 0.0, TABLE_HOLD_MS),
//!     TableEntry::new(1e6, 0.0, 1.0, 0.0),
//! ];
//! dds.fill_table(&ProfileTable::new(rows.clone(), rows)?)?;
//! dds.toggle_table()?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod codec;
pub mod command;
pub mod device;
pub mod error;
pub mod readback;
pub mod table;
pub mod transport;

pub use clock::{ClockConfig, FrequencyWord, DEFAULT_MULTIPLIER, INTERNAL_REFERENCE_HZ};
pub use codec::{Dwell, Encoded, TABLE_HOLD_MS};
pub use command::{Channel, Command};
pub use device::Generator;
pub use error::{Error, Result};
pub use readback::{decode_point, ReadbackRecord};
pub use table::{program_table, ClampEvent, ProfileTable, TableEntry, TableProgram};
pub use transport::{SerialSettings, SerialTransport, Transport};
