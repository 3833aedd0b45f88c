use crate::base::error::Result;
use crate::base::message::Message;
use std::io;

/// A byte-oriented duplex channel to the sensor, typically a serial port.
///
/// Port configuration (device path, baud rate, read timeout) belongs to
/// the implementor and is consumed at its construction; the driver only
/// needs the operations below. For the SDS011 the conventional settings
/// are 9600 baud with a 2 second read timeout.
pub trait Transport {
    /// Opens (or reopens) the underlying connection.
    fn open(&mut self) -> io::Result<()>;

    /// Closes the underlying connection.
    fn close(&mut self) -> io::Result<()>;

    /// Returns `true` while the underlying connection is open.
    fn is_open(&self) -> bool;

    /// Reads up to `buf.len()` bytes, blocking no longer than the
    /// configured timeout. Returns the number of bytes read; a timed-out
    /// read returns fewer bytes, possibly zero. Implementors may also
    /// surface a timeout as `ErrorKind::TimedOut` or `WouldBlock`; the
    /// channel treats both the same as a zero-length read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes the whole buffer.
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Flushes buffered data on the underlying connection.
    fn flush(&mut self) -> io::Result<()>;
}

/// Defines the behavior for decoding byte streams into `Message` objects.
pub trait ProtocolDecoder {
    /// Attempts to decode a `Message` from the provided buffer.
    ///
    /// Returns a `Result` containing a tuple:
    /// * The number of bytes consumed from the buffer.
    /// * An `Option<Message>` which is `Some` if a complete frame was
    ///   decoded and validated, or `None` otherwise.
    ///
    /// The decoder is stateful: a partially received frame is retained
    /// across calls, and a frame that fails validation triggers
    /// resynchronization rather than an error.
    fn decode(&mut self, buf: &[u8]) -> Result<(usize, Option<Message>)>;

    /// Resets the internal state of the decoder.
    /// This is typically called after a communication error or when
    /// reopening the transport.
    fn reset_decoder(&mut self);
}

/// Defines the behavior for encoding `Message` objects into byte streams.
pub trait ProtocolEncoder {
    /// Encodes a `Message` into the provided byte buffer.
    ///
    /// Returns the number of bytes written to the buffer upon successful
    /// encoding.
    fn encode(&mut self, msg: &Message, bytes: &mut [u8]) -> Result<usize>;

    /// Estimates the maximum size in bytes required to encode the given
    /// `Message`. The actual encoded size must be less than or equal to
    /// this estimate.
    fn estimate_encoded_size(&mut self, msg: &Message) -> Result<usize>;

    /// Encodes a `Message` and writes it to a `Transport`.
    ///
    /// Returns the number of bytes successfully written.
    fn write_to(&mut self, msg: &Message, dest: &mut (impl Transport + ?Sized)) -> Result<usize>;

    /// Resets the internal state of the encoder.
    fn reset_encoder(&mut self);
}
