//! # SDS011 Driver
//!
//! `sds011` is a driver for the Nova Fitness SDS011 particulate matter sensor, attached over UART.
//! It implements the sensor's fixed-size binary framing protocol: command encoding with
//! checksum/tail framing, reply frame validation, byte-stream resynchronization in active
//! reporting mode, and the dual operating-mode state handling that governs which read path is
//! valid at any time.
//!
//! The physical serial connection is an external collaborator behind the [`Transport`] trait;
//! port configuration (9600 baud, 2 second timeout by convention) belongs to the implementor.

extern crate byteorder;
extern crate log;

pub mod base;
mod checksum;
mod cmds;
mod protocol;
pub mod types;

pub use crate::base::{Channel, Error, Message, Result, Transport, BROADCAST_DEVICE_ID};
pub use crate::cmds::{SDS011_ANS_TYPE_CMD_REPLY, SDS011_ANS_TYPE_MEASUREMENT};
pub use crate::protocol::Sds011HostProtocol;
pub use crate::types::{FirmwareVersion, Measurement, ReportMode, SleepState};

use log::{trace, warn};

/// Represents a connection to and control interface for an SDS011 sensor.
///
/// The sensor speaks two mutually exclusive read protocols, tracked by the
/// cached [`ReportMode`]: in query mode it replies only to [`query`], in
/// active mode it pushes frames consumed by [`read`]. The cache is a
/// process-local belief about device state: it is set at construction
/// (which issues a mode-set command), refreshed only by a successful
/// write-and-reply, and never inferred from read failures.
///
/// All I/O is sequential and blocking, bounded by the transport timeout.
/// Overlapping calls from multiple threads on one transport must be
/// serialized by the caller; this driver assumes a single logical owner.
///
/// [`query`]: Sds011Device::query
/// [`read`]: Sds011Device::read
///
/// # Example
/// ```ignore
/// let port = MySerialTransport::open("/dev/ttyUSB0")?;
/// let mut sensor = Sds011Device::new(Box::new(port))?;
/// if let Some(sample) = sensor.query()? {
///     println!("PM2.5 {} µg/m³, PM10 {} µg/m³", sample.pm2_5, sample.pm10);
/// }
/// ```
#[derive(Debug)]
pub struct Sds011Device<T: ?Sized> {
    channel: Channel<Sds011HostProtocol, T>,
    report_mode: ReportMode,
    sleep_state: SleepState,
}

/// The reported setting sits at offset 2 of a command echo's data bytes
/// (offset 4 of the raw frame).
fn echo_value(reply: &Message) -> Option<u8> {
    reply.data.get(2).copied()
}

impl<T: ?Sized> Sds011Device<T>
where
    T: Transport,
{
    /// Constructs a new `Sds011Device` in query mode (the sensor replies
    /// only to explicit requests).
    ///
    /// Opens the transport if it is not already open, flushes it, and
    /// issues the mode-set command. An absent or malformed reply is
    /// tolerated; the cached mode then holds the requested mode as
    /// expected state.
    pub fn new(transport: Box<T>) -> Result<Sds011Device<T>> {
        Sds011Device::with_mode(transport, ReportMode::Query)
    }

    /// Constructs a new `Sds011Device` with the given initial reporting
    /// mode.
    pub fn with_mode(transport: Box<T>, mode: ReportMode) -> Result<Sds011Device<T>> {
        trace!("creating new Sds011Device in {:?} mode", mode);
        let mut device = Sds011Device {
            channel: Channel::new(Sds011HostProtocol::new(), transport),
            report_mode: mode,
            sleep_state: SleepState::Work,
        };

        if device.channel.is_open() {
            device.channel.flush()?;
        } else {
            device.channel.reopen()?;
        }
        device.send_report_mode(false, mode == ReportMode::Query)?;
        Ok(device)
    }

    /// Returns the cached reporting mode.
    pub fn report_mode(&self) -> ReportMode {
        self.report_mode
    }

    /// Returns the cached sleep/work state.
    pub fn sleep_state(&self) -> SleepState {
        self.sleep_state
    }

    /// Reads or writes the reporting mode (command `0x02`).
    ///
    /// With `read == false` the sensor is switched to query mode when
    /// `query` is `true`, active mode otherwise. Returns the mode the
    /// device reports back, or `None` when no valid reply arrived; the
    /// cached mode is updated only when the call was a write and a valid
    /// reply was received.
    pub fn set_report_mode(&mut self, read: bool, query: bool) -> Result<Option<ReportMode>> {
        self.ensure_open()?;
        self.send_report_mode(read, query)
    }

    /// Requests one measurement (command `0x04`). Valid in query mode.
    ///
    /// Returns `None` when no valid measurement frame arrives before the
    /// transport times out. If that happens while the cached mode is not
    /// query, an advisory is logged: the sensor is probably pushing
    /// frames on its own and [`read`](Sds011Device::read) is the right
    /// call.
    pub fn query(&mut self) -> Result<Option<Measurement>> {
        self.ensure_open()?;
        self.channel.write(&cmds::query_measurement())?;
        let measurement = self.next_measurement()?;
        if measurement.is_none() && self.report_mode != ReportMode::Query {
            warn!("sensor is in active reporting mode, use read()");
        }
        Ok(measurement)
    }

    /// Reads the next pushed measurement frame. Valid in active mode.
    ///
    /// Scans the incoming byte stream for a valid measurement frame,
    /// resynchronizing over noise and truncated frames, and blocks until
    /// one decodes or the transport times out. If nothing decodes while
    /// the cached mode is query, an advisory is logged: the sensor only
    /// answers explicit requests and [`query`](Sds011Device::query) is
    /// the right call.
    pub fn read(&mut self) -> Result<Option<Measurement>> {
        self.ensure_open()?;
        let measurement = self.next_measurement()?;
        if measurement.is_none() && self.report_mode == ReportMode::Query {
            warn!("sensor is in query reporting mode, use query()");
        }
        Ok(measurement)
    }

    /// Reads or writes the sleep/work state (command `0x06`).
    ///
    /// Returns the state the device reports back (work means the fan and
    /// laser are on), or `None` when no valid reply arrived. The cached
    /// state is updated only on a successful write-and-reply.
    pub fn sleep(&mut self, read: bool, sleep: bool) -> Result<Option<SleepState>> {
        self.ensure_open()?;
        match self.invoke_echo(&cmds::set_sleep(read, sleep))? {
            Some(reply) => Ok(echo_value(&reply).map(|flag| {
                let reported = SleepState::from_flag(flag);
                if !read {
                    self.sleep_state = reported;
                }
                reported
            })),
            None => Ok(None),
        }
    }

    /// Reads or writes the work period (command `0x08`).
    ///
    /// A period of 0 keeps the sensor measuring continuously; 1 to 30
    /// makes it wake once per that many minutes. Returns the period the
    /// device reports back.
    ///
    /// # Panics
    ///
    /// A period above 30 minutes is a contract violation and panics
    /// before any I/O happens.
    pub fn set_work_period(&mut self, read: bool, minutes: u8) -> Result<Option<u8>> {
        let msg = cmds::set_work_period(read, minutes);
        self.ensure_open()?;
        match self.invoke_echo(&msg)? {
            Some(reply) => Ok(echo_value(&reply)),
            None => Ok(None),
        }
    }

    /// Queries the firmware version (command `0x07`).
    ///
    /// The sensor reports year, month and day each as one raw byte;
    /// the values are rendered exactly as reported, without calendar
    /// validation.
    pub fn check_firmware_version(&mut self) -> Result<Option<FirmwareVersion>> {
        self.ensure_open()?;
        match self.invoke_echo(&cmds::firmware_version())? {
            Some(reply) => Ok(FirmwareVersion::from_frame_data(&reply.data)),
            None => Ok(None),
        }
    }

    /// Explicit teardown: best-effort sleep-then-close.
    ///
    /// Reopens the transport when it is closed, puts the sensor to sleep
    /// so the fan and laser stop wearing, and closes the transport.
    /// Every transport failure is reduced to a log notice; teardown
    /// never propagates an error.
    pub fn shutdown(&mut self) {
        trace!("shutting down");
        if !self.channel.is_open() {
            if let Err(err) = self.channel.reopen() {
                warn!("shutdown: could not reopen transport: {}", err);
                return;
            }
        }
        if let Err(err) = self.sleep(false, true) {
            warn!("shutdown: could not put the sensor to sleep: {}", err);
        }
        if let Err(err) = self.channel.close() {
            warn!("shutdown: could not close transport: {}", err);
        }
    }

    /// Repairs a closed transport before any read or write.
    ///
    /// Reopens it with its last-known configuration and re-issues the
    /// last-set report mode, since the sensor may have been power-cycled
    /// in between. An open but silently unresponsive transport is not
    /// repaired here; it degrades to repeated absent-value returns.
    fn ensure_open(&mut self) -> Result<()> {
        if self.channel.is_open() {
            return Ok(());
        }
        trace!("transport is closed, reopening");
        self.channel.reopen()?;
        self.send_report_mode(false, self.report_mode == ReportMode::Query)?;
        Ok(())
    }

    /// Sends the mode-set command and consumes its echo without touching
    /// transport liveness (the constructor and the reopen path call this
    /// directly).
    fn send_report_mode(&mut self, read: bool, query: bool) -> Result<Option<ReportMode>> {
        match self.invoke_echo(&cmds::set_report_mode(read, query))? {
            Some(reply) => Ok(echo_value(&reply).map(|flag| {
                let reported = ReportMode::from_flag(flag);
                if !read {
                    self.report_mode = reported;
                }
                reported
            })),
            None => Ok(None),
        }
    }

    /// Sends a command and waits for its echo frame, skipping unrelated
    /// frames such as measurement pushes from a sensor left in active
    /// mode. Returns `None` when the transport times out first.
    fn invoke_echo(&mut self, msg: &Message) -> Result<Option<Message>> {
        let mut reply = self.channel.invoke(msg)?;
        while let Some(frame) = reply {
            if frame.cmd == SDS011_ANS_TYPE_CMD_REPLY {
                return Ok(Some(frame));
            }
            trace!(
                "skipping frame with marker {:02X} while waiting for a command echo",
                frame.cmd
            );
            reply = self.channel.read()?;
        }
        Ok(None)
    }

    /// Drains frames until a measurement decodes or the transport times
    /// out.
    fn next_measurement(&mut self) -> Result<Option<Measurement>> {
        loop {
            match self.channel.read()? {
                Some(msg) if msg.cmd == SDS011_ANS_TYPE_MEASUREMENT => {
                    return Ok(Measurement::from_frame_data(&msg.data));
                }
                Some(msg) => trace!(
                    "skipping frame with marker {:02X} while waiting for a measurement",
                    msg.cmd
                ),
                None => return Ok(None),
            }
        }
    }
}
