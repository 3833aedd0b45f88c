use crate::base::error::Result;
use crate::base::message::Message;
use crate::base::traits::{ProtocolDecoder, ProtocolEncoder, Transport};
use log::{trace, warn};
use std::io;

/// How many bytes to request from the transport per read. Frames are 10
/// bytes and commands 19, so one chunk comfortably holds several frames.
const READ_CHUNK_SIZE: usize = 64;

/// Channel encodes and decodes messages with a protocol, and sends and
/// receives bytes via a `Transport`.
///
/// # Examples
/// ```ignore
/// let mut channel = Channel::new(
///     Sds011HostProtocol::new(),
///     serial_port
/// );
///
/// channel.write(&cmds::query_measurement()).unwrap();
/// ```
#[derive(Debug)]
pub struct Channel<P, T: ?Sized> {
    protocol: P,
    transport: Box<T>,
    read_buffer: Vec<u8>,
}

impl<P, T: ?Sized> Channel<P, T>
where
    P: ProtocolDecoder + ProtocolEncoder,
    T: Transport,
{
    /// Creates a new `Channel` to read and write messages.
    pub fn new(protocol: P, transport: Box<T>) -> Channel<P, T> {
        let mut chn = Channel {
            protocol,
            transport,
            read_buffer: Vec::with_capacity(READ_CHUNK_SIZE),
        };

        chn.reset();
        chn
    }

    /// Resets the channel status.
    ///
    /// This resets the protocol encoder and decoder and discards any
    /// partially received bytes. It is used when the transport is
    /// reopened after a communication error.
    pub fn reset(&mut self) {
        trace!("resetting channel protocol encoder and decoder");
        self.protocol.reset_encoder();
        self.protocol.reset_decoder();
        self.read_buffer.clear();
    }

    /// Returns `true` while the underlying transport is open.
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Reopens the underlying transport with its last-known configuration
    /// and resets the channel state.
    pub fn reopen(&mut self) -> Result<()> {
        trace!("reopening transport");
        self.transport.open()?;
        self.transport.flush()?;
        self.reset();
        Ok(())
    }

    /// Closes the underlying transport.
    pub fn close(&mut self) -> Result<()> {
        trace!("closing transport");
        self.transport.close()?;
        Ok(())
    }

    /// Flushes the underlying transport.
    pub fn flush(&mut self) -> Result<()> {
        self.transport.flush()?;
        Ok(())
    }

    /// Reads one message from the channel.
    ///
    /// Blocks until the decoder produces a validated frame or the
    /// transport read times out with no complete frame, in which case
    /// `Ok(None)` is returned. A malformed frame is never an error: the
    /// decoder resynchronizes and keeps scanning.
    pub fn read(&mut self) -> Result<Option<Message>> {
        loop {
            // Drain whatever is already buffered before touching the
            // transport again.
            while !self.read_buffer.is_empty() {
                let (decoded_bytes, msg_option) = self.protocol.decode(&self.read_buffer)?;
                if decoded_bytes > 0 {
                    self.read_buffer.drain(..decoded_bytes);
                    trace!(
                        "decoder consumed {} bytes (buffer now {} bytes)",
                        decoded_bytes,
                        self.read_buffer.len()
                    );
                }

                if let Some(msg) = msg_option {
                    trace!(
                        "decoded message: marker={:02X}, data={:02X?}",
                        msg.cmd,
                        msg.data
                    );
                    return Ok(Some(msg));
                }

                if decoded_bytes == 0 {
                    warn!(
                        "decoder consumed 0 bytes with {} buffered; waiting for more data",
                        self.read_buffer.len()
                    );
                    break;
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.transport.read(&mut chunk) {
                Ok(read) => read,
                Err(e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock =>
                {
                    trace!("transport read timed out");
                    0
                }
                Err(e) => return Err(e.into()),
            };

            if read == 0 {
                trace!("no data from transport, returning None");
                return Ok(None);
            }

            trace!("read {} bytes from transport", read);
            self.read_buffer.extend_from_slice(&chunk[..read]);
        }
    }

    /// Writes a message to the channel and flushes the transport.
    pub fn write(&mut self, msg: &Message) -> Result<usize> {
        trace!("writing command {:02X} to channel", msg.cmd);
        let written = self.protocol.write_to(msg, &mut *self.transport)?;
        self.transport.flush()?;
        Ok(written)
    }

    /// Sends a request to the channel and waits for the reply.
    pub fn invoke(&mut self, request: &Message) -> Result<Option<Message>> {
        self.write(request)?;
        self.read()
    }
}
