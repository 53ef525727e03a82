//! Protocol module: constants, value codec, chunk framing, handshake and typed messages.

pub mod codec;
pub mod constants;
pub mod framing;
pub mod handshake;
pub mod messages;

pub use codec::{Dict, DictValue, ProtocolError, Reader, Value};
pub use constants::{ids, keys, CommandId, EventKind, KeyAction, TransitionDirection};
pub use framing::{read_chunked, write_chunked, FramingError, MAX_CHUNK_SIZE};
pub use handshake::{HandshakeAnswer, HandshakeError};
pub use messages::{
    decode_command, decode_event, encode_command, encode_event, Command, Event, FontMetrics,
    GlyphMetrics, InfoMap, Resolution,
};
