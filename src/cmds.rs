use crate::base::Message;

// Command ids (byte 2 of the 19-byte command)

/// Command id to read or write the reporting mode (active vs. query).
pub const SDS011_CMD_SET_REPORT_MODE: u8 = 0x02;

/// Command id to request one measurement while in query mode.
pub const SDS011_CMD_QUERY_MEASUREMENT: u8 = 0x04;

/// Command id to read or write the sleep/work state.
pub const SDS011_CMD_SET_SLEEP: u8 = 0x06;

/// Command id to request the firmware version.
pub const SDS011_CMD_FIRMWARE_VERSION: u8 = 0x07;

/// Command id to read or write the work period.
pub const SDS011_CMD_SET_WORK_PERIOD: u8 = 0x08;

// Payload flag bytes shared by the read/write commands

/// payload[0]: the command reads the current setting.
pub const SDS011_FLAG_READ: u8 = 0x00;

/// payload[0]: the command writes a new setting.
pub const SDS011_FLAG_WRITE: u8 = 0x01;

/// payload[1] of 0x02: the sensor pushes measurements unsolicited.
pub const SDS011_MODE_ACTIVE: u8 = 0x00;

/// payload[1] of 0x02: the sensor replies only to explicit queries.
pub const SDS011_MODE_QUERY: u8 = 0x01;

/// payload[1] of 0x06: the sensor enters low-power sleep.
pub const SDS011_STATE_SLEEP: u8 = 0x00;

/// payload[1] of 0x06: the sensor measures (fan and laser on).
pub const SDS011_STATE_WORK: u8 = 0x01;

// Reply marker bytes (byte 1 of the 10-byte frame)

/// Marker of a measurement frame, pushed in active mode and returned for
/// measurement queries.
pub const SDS011_ANS_TYPE_MEASUREMENT: u8 = 0xC0;

/// Marker of a command echo frame.
pub const SDS011_ANS_TYPE_CMD_REPLY: u8 = 0xC5;

/// Longest work period the sensor accepts, in minutes.
pub const SDS011_MAX_WORK_PERIOD_MINUTES: u8 = 30;

/// Builds the report-mode command. `read` selects between reading the
/// current mode and writing a new one; `query` is the mode to write.
pub fn set_report_mode(read: bool, query: bool) -> Message {
    Message::with_data(
        SDS011_CMD_SET_REPORT_MODE,
        &[
            if read { SDS011_FLAG_READ } else { SDS011_FLAG_WRITE },
            if query { SDS011_MODE_QUERY } else { SDS011_MODE_ACTIVE },
        ],
    )
}

/// Builds the measurement query command.
pub fn query_measurement() -> Message {
    Message::new(SDS011_CMD_QUERY_MEASUREMENT)
}

/// Builds the sleep/work command. `read` selects between reading the
/// current state and writing a new one; `sleep` is the state to write.
pub fn set_sleep(read: bool, sleep: bool) -> Message {
    Message::with_data(
        SDS011_CMD_SET_SLEEP,
        &[
            if read { SDS011_FLAG_READ } else { SDS011_FLAG_WRITE },
            if sleep { SDS011_STATE_SLEEP } else { SDS011_STATE_WORK },
        ],
    )
}

/// Builds the work-period command.
///
/// # Panics
///
/// Passing a period above 30 minutes is a contract violation, not a
/// recoverable device error, and panics.
pub fn set_work_period(read: bool, minutes: u8) -> Message {
    assert!(
        minutes <= SDS011_MAX_WORK_PERIOD_MINUTES,
        "work period must be 0-30 minutes, got {}",
        minutes
    );
    Message::with_data(
        SDS011_CMD_SET_WORK_PERIOD,
        &[
            if read { SDS011_FLAG_READ } else { SDS011_FLAG_WRITE },
            minutes,
        ],
    )
}

/// Builds the firmware version query command.
pub fn firmware_version() -> Message {
    Message::new(SDS011_CMD_FIRMWARE_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_mode_payload_layout() {
        let msg = set_report_mode(false, true);
        assert_eq!(msg.cmd, SDS011_CMD_SET_REPORT_MODE);
        assert_eq!(msg.data, vec![SDS011_FLAG_WRITE, SDS011_MODE_QUERY]);

        let msg = set_report_mode(true, false);
        assert_eq!(msg.data, vec![SDS011_FLAG_READ, SDS011_MODE_ACTIVE]);
    }

    #[test]
    fn sleep_payload_layout() {
        let msg = set_sleep(false, true);
        assert_eq!(msg.cmd, SDS011_CMD_SET_SLEEP);
        assert_eq!(msg.data, vec![SDS011_FLAG_WRITE, SDS011_STATE_SLEEP]);

        let msg = set_sleep(false, false);
        assert_eq!(msg.data, vec![SDS011_FLAG_WRITE, SDS011_STATE_WORK]);
    }

    #[test]
    fn work_period_accepts_bounds() {
        assert_eq!(set_work_period(false, 0).data, vec![SDS011_FLAG_WRITE, 0]);
        assert_eq!(set_work_period(false, 30).data, vec![SDS011_FLAG_WRITE, 30]);
    }

    #[test]
    #[should_panic(expected = "work period must be 0-30 minutes")]
    fn work_period_rejects_out_of_range() {
        let _ = set_work_period(false, 35);
    }
}
