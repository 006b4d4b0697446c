//! Context decoder for the bincode plaintext framing.

use crate::ports::GroupContextDecoder;
use shared_types::{CodecError, GroupContext, GroupPlaintext};

/// Reads the [`GroupContext`] out of a [`GroupPlaintext`] frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeContextDecoder;

impl GroupContextDecoder for BincodeContextDecoder {
    fn decode(&self, plaintext: &[u8]) -> Result<GroupContext, CodecError> {
        GroupPlaintext::decode(plaintext).map(|frame| frame.context)
    }
}
