// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use ternix_uapi::errors::Errno;
use ternix_uapi::{errno, error};

/// A fixed-size region of memory shared between the emulator and guest
/// address spaces.
///
/// The region is a plain byte store with interior mutability: every access
/// goes through atomics, so concurrent readers and writers (the guest through
/// its mappings, the emulator through internal mappings) are well defined
/// without any lock. Ring cursors additionally need 32-bit single-word
/// atomicity, which requires the backing store to be at least 4-byte
/// aligned; the store is kept 8-byte aligned.
#[derive(Debug)]
pub struct MemoryObject {
    storage: Box<[AtomicU64]>,
    size: usize,
    content_size: AtomicU64,
}

impl MemoryObject {
    /// Creates a zero-filled region of `size` bytes.
    pub fn new(size: u64) -> Self {
        let size = size as usize;
        let words = size.div_ceil(8);
        let mut storage = Vec::with_capacity(words);
        storage.resize_with(words, || AtomicU64::new(0));
        Self { storage: storage.into_boxed_slice(), size, content_size: AtomicU64::new(0) }
    }

    pub fn get_size(&self) -> u64 {
        self.size as u64
    }

    /// The logical size of the content stored in the region, maintained by
    /// file-like users of the region. Unrelated to `get_size`.
    pub fn get_content_size(&self) -> u64 {
        self.content_size.load(Ordering::Acquire)
    }

    pub fn set_content_size(&self, size: u64) {
        self.content_size.store(size, Ordering::Release);
    }

    /// The region as a byte slice. All loads and stores through the slice are
    /// atomic, making the region safe to share with concurrently running
    /// guest tasks.
    pub fn as_bytes(&self) -> &[AtomicU8] {
        // SAFETY: AtomicU8 has size and alignment 1 and the same validity as
        // u8; the backing words live as long as `self` and are only ever
        // accessed atomically.
        unsafe {
            std::slice::from_raw_parts(self.storage.as_ptr() as *const AtomicU8, self.size)
        }
    }

    pub fn read(&self, data: &mut [u8], offset: u64) -> Result<(), Errno> {
        let bytes = self.as_bytes();
        let offset = offset as usize;
        let end = offset.checked_add(data.len()).ok_or_else(|| errno!(EFAULT))?;
        if end > bytes.len() {
            return error!(EFAULT);
        }
        copy_from_shared(data, &bytes[offset..end]);
        Ok(())
    }

    pub fn read_to_vec(&self, offset: u64, length: u64) -> Result<Vec<u8>, Errno> {
        let mut data = vec![0; length as usize];
        self.read(&mut data, offset)?;
        Ok(data)
    }

    pub fn write(&self, data: &[u8], offset: u64) -> Result<(), Errno> {
        let bytes = self.as_bytes();
        let offset = offset as usize;
        let end = offset.checked_add(data.len()).ok_or_else(|| errno!(EFAULT))?;
        if end > bytes.len() {
            return error!(EFAULT);
        }
        copy_to_shared(&bytes[offset..end], data);
        Ok(())
    }
}

/// Copies out of a shared region with per-byte atomic loads.
pub fn copy_from_shared(dst: &mut [u8], src: &[AtomicU8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = s.load(Ordering::Relaxed);
    }
}

/// Copies into a shared region with per-byte atomic stores.
pub fn copy_to_shared(dst: &[AtomicU8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter().zip(src.iter()) {
        d.store(*s, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_round_trip() {
        let memory = MemoryObject::new(4096);
        memory.write(b"ring data", 100).unwrap();
        let mut buffer = [0u8; 9];
        memory.read(&mut buffer, 100).unwrap();
        assert_eq!(&buffer, b"ring data");
    }

    #[test]
    fn out_of_range_access_faults() {
        let memory = MemoryObject::new(4096);
        let mut buffer = [0u8; 16];
        assert_eq!(memory.read(&mut buffer, 4090).unwrap_err(), ternix_uapi::errors::EFAULT);
        assert_eq!(memory.write(&buffer, u64::MAX).unwrap_err(), ternix_uapi::errors::EFAULT);
    }

    #[test]
    fn zero_filled_on_creation() {
        let memory = MemoryObject::new(4096);
        assert_eq!(memory.read_to_vec(0, 4096).unwrap(), vec![0; 4096]);
    }
}
