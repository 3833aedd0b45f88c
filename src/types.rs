use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// One particulate matter sample, in micrograms per cubic meter.
///
/// The sensor reports each value as a little-endian u16 in tenths of a
/// µg/m³; only checksum-valid frames are ever decoded into this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Fine particle (PM2.5) concentration in µg/m³.
    pub pm2_5: f32,
    /// Coarse particle (PM10) concentration in µg/m³.
    pub pm10: f32,
}

impl Measurement {
    /// Decodes a measurement from the four data bytes of a validated
    /// frame: PM2.5 low/high, then PM10 low/high. Returns `None` when the
    /// slice is too short to hold both fields.
    pub fn from_frame_data(data: &[u8]) -> Option<Measurement> {
        if data.len() < 4 {
            return None;
        }
        let pm2_5 = LittleEndian::read_u16(&data[0..2]);
        let pm10 = LittleEndian::read_u16(&data[2..4]);
        Some(Measurement {
            pm2_5: pm2_5 as f32 / 10.0,
            pm10: pm10 as f32 / 10.0,
        })
    }
}

/// The two mutually exclusive read protocols of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// The sensor pushes measurement frames continuously without being
    /// polled; consume them with `read()`.
    Active,
    /// The sensor replies only to an explicit request; consume
    /// measurements with `query()`.
    Query,
}

impl ReportMode {
    /// Decodes the mode bit the sensor reports (0 = active, 1 = query).
    pub fn from_flag(flag: u8) -> ReportMode {
        if flag == 0 {
            ReportMode::Active
        } else {
            ReportMode::Query
        }
    }
}

/// The sleep/work state of the sensor, settable independently of the
/// reporting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepState {
    /// Fan and laser off; the sensor ignores everything but a wake
    /// command.
    Sleep,
    /// Fan and laser on; the sensor measures.
    Work,
}

impl SleepState {
    /// Decodes the state bit the sensor reports (0 = sleep, 1 = work).
    pub fn from_flag(flag: u8) -> SleepState {
        if flag == 0 {
            SleepState::Sleep
        } else {
            SleepState::Work
        }
    }
}

/// The firmware date reported by the sensor.
///
/// The sensor encodes year, month and day each as one raw byte. The
/// values are rendered exactly as reported with no calendar validation,
/// which matches the device's compact reply encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub year: u8,
    pub month: u8,
    pub day: u8,
}

impl FirmwareVersion {
    /// Decodes the firmware date from the data bytes of a validated
    /// reply frame: year, month, day.
    pub fn from_frame_data(data: &[u8]) -> Option<FirmwareVersion> {
        if data.len() < 3 {
            return None;
        }
        Some(FirmwareVersion {
            year: data[0],
            month: data[1],
            day: data[2],
        })
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.year, self.month, self.day)
    }
}
