/// The wildcard device id that addresses every sensor on the bus.
pub const BROADCAST_DEVICE_ID: [u8; 2] = [0xFF, 0xFF];

/// Represents a command or reply exchanged with an SDS011 sensor.
///
/// For an outbound command, `cmd` is the command id (e.g. `0x04` for a
/// measurement query) and `data` holds the payload bytes; the encoder
/// zero-pads the payload to the fixed 12-byte field on the wire.
///
/// For an inbound reply, `cmd` is the marker byte at offset 1 of the
/// 10-byte frame (`0xC0` for a measurement, `0xC5` for a command echo)
/// and `data` holds the four data bytes at offsets 2 through 5. The
/// decoder only emits messages whose checksum verified, so `data` is
/// always exactly four bytes on that path.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The command id (outbound) or reply marker byte (inbound).
    pub cmd: u8,

    /// Payload data (outbound) or frame data bytes (inbound).
    pub data: Vec<u8>,

    /// The sensor this message addresses (outbound) or originates from
    /// (inbound). Outbound messages default to the broadcast wildcard.
    pub device_id: [u8; 2],
}

impl Message {
    /// Creates a new message with a command id and no payload, addressed
    /// to every sensor on the bus.
    pub fn new(cmd: u8) -> Message {
        Message::with_data(cmd, &[])
    }

    /// Creates a new message with a command id and payload data,
    /// addressed to every sensor on the bus.
    #[inline]
    pub fn with_data(cmd: u8, data: &[u8]) -> Message {
        Message::with_device_id(cmd, data, BROADCAST_DEVICE_ID)
    }

    /// Creates a new message addressed to a specific sensor.
    #[inline]
    pub fn with_device_id(cmd: u8, data: &[u8], device_id: [u8; 2]) -> Message {
        Message {
            cmd,
            data: data.to_vec(),
            device_id,
        }
    }
}
