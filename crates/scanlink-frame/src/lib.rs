//! Tagged line framing for the scanlink serial protocol.
//!
//! Every message is a single text line:
//! - A one-character type tag (`M`, `S`, `T` outbound)
//! - A UTF-8 payload without line terminators
//! - The `\r\n` end-of-message terminator
//!
//! The tag plus fixed terminator makes the stream self-describing and
//! trivially resynchronizable without length fields.

pub mod codec;
pub mod error;
pub mod reader;
pub mod tags;
pub mod writer;

pub use codec::{decode_line, encode_frame, MessageType, Response, ResponseCode, EMPTY_DATA, EOM};
pub use error::{FrameError, Result};
pub use reader::{LineReader, DEFAULT_READ_TIMEOUT, MAX_LINE_LENGTH};
pub use tags::{tag_name, MOVE, RECEIVE_TAGS, REPLY, SENSOR, SEND_TAGS, TEST};
pub use writer::FrameWriter;
