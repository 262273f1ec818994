//! Protocol module: the wire envelope, its JSON codec, and listener ids.

pub mod envelope;
pub mod sequence;

pub use envelope::{decode_envelope, encode_envelope, DecodeError, Envelope, PostOptions};
pub use sequence::{ListenerId, SequenceCounter};
