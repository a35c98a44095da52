//! Control header at the base of guest linear memory.
//!
//! This is the wire contract both sides compile against:
//!
//! | offset | size | meaning                                   |
//! |--------|------|-------------------------------------------|
//! | 0      | 1    | reserved, never written by the protocol   |
//! | 1..=4  | 4    | Length Slot: u32 (native endian) carrying |
//! |        |      | the byte length of the guest's result     |
//! | 5..    |      | Payload Region: encoded argument bytes    |
//! |        |      | before a call, encoded result bytes after |
//!
//! The guest writes the Length Slot immediately before returning its result
//! offset; the host zeroes the slot before each new argument write so no
//! residue from an earlier call can be mistaken for a fresh length.

/// Reserved byte at the bottom of guest memory.
pub const RESERVED_OFFSET: usize = 0;

/// First byte of the Length Slot.
pub const LEN_SLOT_OFFSET: usize = 1;

/// Width of the Length Slot in bytes.
pub const LEN_SLOT_SIZE: usize = 4;

/// First byte of the Payload Region.
pub const PAYLOAD_OFFSET: usize = LEN_SLOT_OFFSET + LEN_SLOT_SIZE;

/// Decoded form of the control header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlHeader {
    /// Byte length of the result the guest placed in the Payload Region.
    pub result_len: u32,
}

impl ControlHeader {
    /// Header with a zeroed Length Slot.
    pub const ZEROED: Self = Self { result_len: 0 };

    pub fn new(result_len: u32) -> Self {
        Self { result_len }
    }

    /// Raw bytes of the Length Slot for this header.
    pub fn to_slot_bytes(self) -> [u8; LEN_SLOT_SIZE] {
        self.result_len.to_ne_bytes()
    }

    /// Reconstructs a header from the raw Length Slot bytes.
    pub fn from_slot_bytes(bytes: [u8; LEN_SLOT_SIZE]) -> Self {
        Self {
            result_len: u32::from_ne_bytes(bytes),
        }
    }
}
