mod channel;
mod error;
mod message;
mod traits;

pub use self::channel::*;
pub use self::error::{Error, Result};
pub use self::message::{Message, BROADCAST_DEVICE_ID};
pub use self::traits::{ProtocolDecoder, ProtocolEncoder, Transport};
