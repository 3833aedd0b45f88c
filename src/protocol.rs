use crate::base::{Error, Message, ProtocolDecoder, ProtocolEncoder, Result, Transport};
use crate::checksum::Checksum;
use log::trace;

/// Framing marker that opens every command and reply frame.
pub const SDS011_HEAD: u8 = 0xAA;

/// Framing marker that closes every command and reply frame.
pub const SDS011_TAIL: u8 = 0xAB;

/// Byte at offset 1 identifying a host-to-sensor command.
const SDS011_CMD_ID: u8 = 0xB4;

/// Every command is exactly 19 bytes on the wire.
pub const SDS011_COMMAND_LEN: usize = 19;

/// Every reply or push from the sensor is a 10-byte frame.
pub const SDS011_FRAME_LEN: usize = 10;

/// The zero-padded payload field of a command.
const SDS011_PAYLOAD_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq)]
enum DecodeStatus {
    WaitHead,
    ReceiveFrame,
}

/// The implementation of the SDS011 host communication protocol.
///
/// This struct handles encoding commands (`Message` -> 19 bytes) and
/// decoding replies (bytes -> `Message`) according to the SDS011 serial
/// protocol. The decoder is a byte-stream scanner: in active reporting
/// mode the sensor pushes frames with no delimiting beyond the head
/// byte, so the decoder must resynchronize after any truncated or noisy
/// byte sequence rather than assuming byte-aligned 10-byte reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Sds011HostProtocol {
    status: DecodeStatus,
    frame: Vec<u8>,
}

impl Sds011HostProtocol {
    /// Creates a new `Sds011HostProtocol` instance in its initial state.
    pub fn new() -> Sds011HostProtocol {
        Sds011HostProtocol {
            status: DecodeStatus::WaitHead,
            frame: Vec::with_capacity(SDS011_FRAME_LEN),
        }
    }

    /// Validates the completed 10-byte candidate frame.
    ///
    /// A frame is valid iff its head byte matched (guaranteed by the
    /// scanner) and the mod-256 sum of bytes 2..8 equals byte 8. The
    /// tail byte is not verified; the checksum already covers every
    /// byte that matters.
    fn finish_frame(&mut self) -> Option<Message> {
        debug_assert_eq!(self.frame.len(), SDS011_FRAME_LEN);

        let mut checksum = Checksum::new();
        checksum.push_slice(&self.frame[2..8]);
        if checksum.checksum() == self.frame[8] {
            let msg = Message::with_device_id(
                self.frame[1],
                &self.frame[2..6],
                [self.frame[6], self.frame[7]],
            );
            self.reset_decoder();
            Some(msg)
        } else {
            trace!(
                "frame failed checksum ({:02X?}), resynchronizing",
                self.frame
            );
            self.resynchronize();
            None
        }
    }

    /// Recovers from a failed candidate frame.
    ///
    /// A head byte can appear inside the payload of a failed candidate,
    /// so rescanning starts at the byte right after the head that was
    /// just rejected; nothing inside the candidate window is skipped
    /// blindly.
    fn resynchronize(&mut self) {
        match self.frame[1..].iter().position(|&b| b == SDS011_HEAD) {
            Some(pos) => {
                self.frame.drain(..pos + 1);
            }
            None => {
                self.frame.clear();
                self.status = DecodeStatus::WaitHead;
            }
        }
    }
}

impl Default for Sds011HostProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolDecoder for Sds011HostProtocol {
    /// Decodes bytes from the input buffer according to the SDS011
    /// protocol.
    ///
    /// Maintains internal state so that a frame split across reads is
    /// reassembled, and a frame that fails validation triggers
    /// resynchronization from the next possible head byte. Returns the
    /// number of bytes consumed and an optional decoded `Message`.
    fn decode(&mut self, buf: &[u8]) -> Result<(usize, Option<Message>)> {
        if buf.is_empty() {
            return Ok((0, None));
        }

        let mut i = 0;
        while i < buf.len() {
            match self.status {
                DecodeStatus::WaitHead => {
                    match buf[i..].iter().position(|&b| b == SDS011_HEAD) {
                        Some(skipped) => {
                            if skipped > 0 {
                                trace!("skipped {} bytes scanning for head marker", skipped);
                            }
                            i += skipped + 1;
                            self.frame.clear();
                            self.frame.push(SDS011_HEAD);
                            self.status = DecodeStatus::ReceiveFrame;
                        }
                        None => {
                            trace!("no head marker in {} bytes", buf.len() - i);
                            i = buf.len();
                        }
                    }
                }
                DecodeStatus::ReceiveFrame => {
                    let need = SDS011_FRAME_LEN - self.frame.len();
                    let take = need.min(buf.len() - i);
                    self.frame.extend_from_slice(&buf[i..i + take]);
                    i += take;

                    if self.frame.len() == SDS011_FRAME_LEN {
                        if let Some(msg) = self.finish_frame() {
                            return Ok((i, Some(msg)));
                        }
                    }
                }
            }
        }

        Ok((i, None))
    }

    /// Resets the decoder's internal state, discarding any partial frame.
    fn reset_decoder(&mut self) {
        self.frame.clear();
        self.status = DecodeStatus::WaitHead;
    }
}

impl ProtocolEncoder for Sds011HostProtocol {
    /// Encodes a command `Message` into the provided byte buffer.
    ///
    /// Layout: head, command id marker, command byte, payload zero-padded
    /// (or truncated) to 12 bytes, device id, checksum over bytes 2..17,
    /// tail. The output is always exactly 19 bytes.
    fn encode(&mut self, msg: &Message, bytes: &mut [u8]) -> Result<usize> {
        if bytes.len() < SDS011_COMMAND_LEN {
            return Err(Error::BufferTooSmall);
        }

        bytes[0] = SDS011_HEAD;
        bytes[1] = SDS011_CMD_ID;
        bytes[2] = msg.cmd;

        let payload = &mut bytes[3..3 + SDS011_PAYLOAD_LEN];
        payload.fill(0);
        let len = msg.data.len().min(SDS011_PAYLOAD_LEN);
        payload[..len].copy_from_slice(&msg.data[..len]);

        bytes[15] = msg.device_id[0];
        bytes[16] = msg.device_id[1];

        let mut checksum = Checksum::new();
        checksum.push_slice(&bytes[2..17]);
        bytes[17] = checksum.checksum();
        bytes[18] = SDS011_TAIL;

        Ok(SDS011_COMMAND_LEN)
    }

    /// Every SDS011 command encodes to the same fixed length.
    fn estimate_encoded_size(&mut self, _msg: &Message) -> Result<usize> {
        Ok(SDS011_COMMAND_LEN)
    }

    /// Encodes a command `Message` and writes it to a `Transport`.
    fn write_to(&mut self, msg: &Message, dest: &mut (impl Transport + ?Sized)) -> Result<usize> {
        let mut buf = [0u8; SDS011_COMMAND_LEN];
        let encoded_size = self.encode(msg, &mut buf)?;
        trace!("writing command: {:02X?}", &buf[..encoded_size]);
        dest.write(&buf[..encoded_size])?;
        Ok(encoded_size)
    }

    /// Resets the encoder's internal state (a no-op for this protocol).
    fn reset_encoder(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{Message, ProtocolDecoder, ProtocolEncoder};
    use crate::cmds;

    fn encode(protocol: &mut Sds011HostProtocol, msg: &Message) -> Vec<u8> {
        let size = protocol.estimate_encoded_size(msg).unwrap();
        let mut buf = vec![0; size];
        let written = protocol.encode(msg, &mut buf).unwrap();
        buf.truncate(written);
        buf
    }

    fn frame(marker: u8, data: [u8; 4], device_id: [u8; 2]) -> [u8; 10] {
        let mut f = [0u8; 10];
        f[0] = SDS011_HEAD;
        f[1] = marker;
        f[2..6].copy_from_slice(&data);
        f[6] = device_id[0];
        f[7] = device_id[1];
        let mut checksum = Checksum::new();
        checksum.push_slice(&f[2..8]);
        f[8] = checksum.checksum();
        f[9] = SDS011_TAIL;
        f
    }

    #[test]
    fn encode_query_command() {
        let mut protocol = Sds011HostProtocol::new();
        assert_eq!(
            encode(&mut protocol, &cmds::query_measurement()).as_slice(),
            [
                0xAA, 0xB4, 0x04, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF, 0x02, 0xAB
            ]
        );
    }

    #[test]
    fn encode_report_mode_command() {
        let mut protocol = Sds011HostProtocol::new();
        assert_eq!(
            encode(&mut protocol, &cmds::set_report_mode(false, true)).as_slice(),
            [
                0xAA, 0xB4, 0x02, 0x01, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF, 0x02,
                0xAB
            ]
        );
    }

    #[test]
    fn every_command_is_framed_and_checksummed() {
        let mut protocol = Sds011HostProtocol::new();
        let commands = [
            cmds::set_report_mode(false, true),
            cmds::query_measurement(),
            cmds::set_sleep(false, false),
            cmds::set_work_period(false, 15),
            cmds::firmware_version(),
        ];
        for msg in &commands {
            let bytes = encode(&mut protocol, msg);
            assert_eq!(bytes.len(), SDS011_COMMAND_LEN);
            assert_eq!(bytes[0], SDS011_HEAD);
            assert_eq!(bytes[18], SDS011_TAIL);
            let sum: u8 = bytes[2..17]
                .iter()
                .fold(0u8, |acc, &b| acc.wrapping_add(b));
            assert_eq!(bytes[17], sum);
        }
    }

    #[test]
    fn encode_carries_device_id() {
        let mut protocol = Sds011HostProtocol::new();
        let msg = Message::with_device_id(0x04, &[], [0x12, 0x34]);
        let bytes = encode(&mut protocol, &msg);
        assert_eq!(bytes[15], 0x12);
        assert_eq!(bytes[16], 0x34);
    }

    #[test]
    fn decode_valid_measurement_frame() {
        let mut protocol = Sds011HostProtocol::new();
        let f = frame(0xC0, [0xFA, 0x00, 0xC2, 0x01], [0x12, 0x34]);

        let (consumed, msg) = protocol.decode(&f).unwrap();
        assert_eq!(consumed, 10);
        let msg = msg.unwrap();
        assert_eq!(msg.cmd, 0xC0);
        assert_eq!(msg.data, vec![0xFA, 0x00, 0xC2, 0x01]);
        assert_eq!(msg.device_id, [0x12, 0x34]);
    }

    #[test]
    fn decode_rejects_corruption_of_checksummed_bytes() {
        let f = frame(0xC0, [0xFA, 0x00, 0xC2, 0x01], [0x00, 0x00]);
        for idx in 2..8 {
            let mut corrupted = f;
            corrupted[idx] = corrupted[idx].wrapping_add(1);
            let mut protocol = Sds011HostProtocol::new();
            let (_, msg) = protocol.decode(&corrupted).unwrap();
            assert!(msg.is_none(), "corruption at offset {} not detected", idx);
        }
    }

    #[test]
    fn decode_resyncs_after_garbage() {
        let mut protocol = Sds011HostProtocol::new();
        let garbage = [0x01, 0x02, 0x7F, 0x10, 0x99];
        let f = frame(0xC0, [0xFA, 0x00, 0xC2, 0x01], [0x00, 0x00]);

        let mut stream = Vec::new();
        stream.extend_from_slice(&garbage);
        stream.extend_from_slice(&f);
        stream.push(SDS011_HEAD); // start of a following frame

        let (consumed, msg) = protocol.decode(&stream).unwrap();
        // exactly the garbage plus the frame, nothing beyond it
        assert_eq!(consumed, garbage.len() + 10);
        let msg = msg.unwrap();
        assert_eq!(msg.data, vec![0xFA, 0x00, 0xC2, 0x01]);
    }

    #[test]
    fn decode_recovers_head_inside_failed_candidate() {
        let mut protocol = Sds011HostProtocol::new();
        let f = frame(0xC0, [0xFA, 0x00, 0xC2, 0x01], [0x00, 0x00]);

        // A stray head byte opens a candidate whose checksum fails; the
        // real frame starts inside that candidate window.
        let mut stream = vec![SDS011_HEAD, 0x13, 0x37];
        stream.extend_from_slice(&f);
        stream.push(0x99);

        let (consumed, msg) = protocol.decode(&stream).unwrap();
        assert_eq!(consumed, stream.len() - 1);
        let msg = msg.unwrap();
        assert_eq!(msg.cmd, 0xC0);
        assert_eq!(msg.data, vec![0xFA, 0x00, 0xC2, 0x01]);
    }

    #[test]
    fn decode_reassembles_split_frame() {
        let mut protocol = Sds011HostProtocol::new();
        let f = frame(0xC5, [0x02, 0x01, 0x01, 0x00], [0xAB, 0xCD]);

        let (consumed, msg) = protocol.decode(&f[..4]).unwrap();
        assert_eq!(consumed, 4);
        assert!(msg.is_none());

        let (consumed, msg) = protocol.decode(&f[4..]).unwrap();
        assert_eq!(consumed, 6);
        let msg = msg.unwrap();
        assert_eq!(msg.cmd, 0xC5);
        assert_eq!(msg.device_id, [0xAB, 0xCD]);
    }

    #[test]
    fn query_reply_roundtrip_preserves_device_id() {
        let mut protocol = Sds011HostProtocol::new();
        let device_id = [0x42, 0x77];

        let sent = encode(
            &mut protocol,
            &Message::with_device_id(0x04, &[], device_id),
        );
        assert_eq!([sent[15], sent[16]], device_id);

        let reply = frame(0xC0, [0x10, 0x00, 0x20, 0x00], device_id);
        let (_, msg) = protocol.decode(&reply).unwrap();
        assert_eq!(msg.unwrap().device_id, device_id);
    }
}
