//! Call-scoped view over a guest's linear memory.
//!
//! All host-side access to guest memory goes through [`MemoryView`]: a
//! bounds-checked capability over the current memory contents, never a raw
//! pointer. A view is only valid for one phase of one call. The guest may
//! grow (reallocate) its memory while an export runs, so the host acquires a
//! fresh view after every call and reads the Length Slot and the result
//! bytes from that same view.

use wasmtime::{Memory, Store};

use crate::error::{HostError, HostResult};
use crate::runtime::StoreData;
use wasmfold_codec::header::{self, ControlHeader};

pub struct MemoryView<'a> {
    data: &'a mut [u8],
}

impl<'a> MemoryView<'a> {
    pub(crate) fn new(memory: &Memory, store: &'a mut Store<StoreData>) -> Self {
        Self {
            data: memory.data_mut(store),
        }
    }

    /// Current memory size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bounds-checked read of `len` bytes at `offset`.
    pub fn read(&self, offset: usize, len: usize) -> HostResult<&[u8]> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(HostError::MemoryOutOfBounds {
                offset,
                len,
                size: self.data.len(),
            })?;
        Ok(&self.data[offset..end])
    }

    /// Bounds-checked write of `bytes` at `offset`.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) -> HostResult<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|&end| end <= self.data.len())
            .ok_or(HostError::MemoryOutOfBounds {
                offset,
                len: bytes.len(),
                size: self.data.len(),
            })?;
        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Zeroes the Length Slot so no residue from an earlier call can be
    /// mistaken for a fresh result length.
    pub fn zero_len_slot(&mut self) -> HostResult<()> {
        self.write(
            header::LEN_SLOT_OFFSET,
            &ControlHeader::ZEROED.to_slot_bytes(),
        )
    }

    /// Reads the control header. Slot bytes beyond the current memory size
    /// read as 0, so a shrunken memory degrades to a zero-length result
    /// instead of failing the host.
    pub fn read_header(&self) -> ControlHeader {
        let mut slot = [0u8; header::LEN_SLOT_SIZE];
        for (i, byte) in slot.iter_mut().enumerate() {
            *byte = self
                .data
                .get(header::LEN_SLOT_OFFSET + i)
                .copied()
                .unwrap_or(0);
        }
        ControlHeader::from_slot_bytes(slot)
    }
}
