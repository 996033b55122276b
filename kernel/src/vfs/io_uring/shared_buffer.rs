// Copyright 2025 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::mm::memory_file::InternalMapping;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU8};
use ternix_uapi::errors::Errno;
use ternix_uapi::{errno, error};

/// A cached emulator-side view of one ring region.
///
/// The engine reads cursors and entries through views obtained here rather
/// than holding raw slices, because the underlying internal mapping can be
/// torn down and re-established (most notably across snapshot restore). The
/// protocol mirrors the mapping layer's:
///
///  * `view(n)` returns the current view of the first `n` bytes, re-fetching
///    if a prior `invalidate` marked the cached view stale.
///  * `writeback(n)` / `writeback_window(off, n)` ensure stores through the
///    view have propagated, and report whether the next `view` call must
///    re-fetch.
///  * `invalidate()` marks the cached view stale.
///
/// Stores through a view land directly in the backing region, so writeback
/// has nothing to flush; its return value is the staleness signal.
#[derive(Default)]
pub struct SharedBuffer {
    state: Mutex<SharedBufferState>,
}

#[derive(Default)]
struct SharedBufferState {
    mapping: Option<InternalMapping>,
    stale: bool,
}

impl SharedBuffer {
    /// (Re)establishes the cached view. Only the submission engine's
    /// critical section (and ring creation, before the file is shared) may
    /// call this.
    pub fn init(&self, mapping: InternalMapping) {
        let mut state = self.state.lock();
        state.mapping = Some(mapping);
        state.stale = false;
    }

    pub fn view(&self, n: usize) -> Result<InternalMapping, Errno> {
        let mut state = self.state.lock();
        let mapping = state.mapping.as_ref().ok_or_else(|| errno!(EFAULT))?;
        if n > mapping.len() {
            return error!(EFAULT);
        }
        let view = mapping.prefix(n);
        state.stale = false;
        Ok(view)
    }

    pub fn writeback(&self, n: usize) -> Result<bool, Errno> {
        self.writeback_window(0, n)
    }

    pub fn writeback_window(&self, offset: usize, n: usize) -> Result<bool, Errno> {
        let state = self.state.lock();
        let mapping = state.mapping.as_ref().ok_or_else(|| errno!(EFAULT))?;
        if offset.checked_add(n).map_or(true, |end| end > mapping.len()) {
            return error!(EFAULT);
        }
        Ok(state.stale)
    }

    pub fn invalidate(&self) -> bool {
        self.state.lock().stale = true;
        true
    }
}

/// The 32-bit atomic cell at `offset` within a shared view.
///
/// Used for the ring cursors in the rings header, which the guest reads and
/// writes concurrently through its own mapping of the same region.
pub fn atomic_u32_at_offset(bytes: &[AtomicU8], offset: usize) -> &AtomicU32 {
    let end = offset.checked_add(std::mem::size_of::<u32>());
    assert!(end.is_some_and(|end| end <= bytes.len()), "offset {offset} out of bounds");
    let ptr = bytes[offset..].as_ptr();
    assert_eq!(ptr as usize % std::mem::align_of::<AtomicU32>(), 0, "offset {offset} misaligned");
    // SAFETY: the location is in bounds, aligned, and only ever accessed
    // atomically; AtomicU32 has the same layout as u32. The reference
    // borrows `bytes`, so it cannot outlive the backing region.
    unsafe { &*(ptr as *const AtomicU32) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::memory_file::{AllocOpts, AllocationKind, MemoryFile};
    use crate::mm::{Access, PAGE_SIZE};
    use std::sync::atomic::Ordering;
    use ternix_uapi::errors::EFAULT;

    fn mapped_page() -> (std::sync::Arc<MemoryFile>, InternalMapping) {
        let mf = MemoryFile::new(None);
        let fr = mf
            .allocate(PAGE_SIZE, AllocOpts { kind: AllocationKind::Anonymous, mem_cg_id: 0 })
            .unwrap();
        let mapping = mf.map_internal(fr, Access::rw()).unwrap();
        (mf, mapping)
    }

    #[test]
    fn view_before_init_faults() {
        let buffer = SharedBuffer::default();
        assert_eq!(buffer.view(16).unwrap_err(), EFAULT);
        assert_eq!(buffer.writeback(16).unwrap_err(), EFAULT);
    }

    #[test]
    fn view_bounds_are_checked() {
        let (_mf, mapping) = mapped_page();
        let buffer = SharedBuffer::default();
        buffer.init(mapping);
        assert_eq!(buffer.view(PAGE_SIZE as usize + 1).unwrap_err(), EFAULT);
        assert_eq!(buffer.writeback_window(PAGE_SIZE as usize, 1).unwrap_err(), EFAULT);
        assert!(buffer.view(PAGE_SIZE as usize).is_ok());
    }

    #[test]
    fn invalidate_signals_through_writeback() {
        let (_mf, mapping) = mapped_page();
        let buffer = SharedBuffer::default();
        buffer.init(mapping);
        assert!(!buffer.writeback(16).unwrap());
        assert!(buffer.invalidate());
        assert!(buffer.writeback(16).unwrap());
        // Re-fetching the view clears the staleness.
        buffer.view(16).unwrap();
        assert!(!buffer.writeback(16).unwrap());
    }

    #[test]
    fn views_alias_the_backing_region() {
        let (_mf, mapping) = mapped_page();
        let buffer = SharedBuffer::default();
        buffer.init(mapping);
        let a = buffer.view(64).unwrap();
        let b = buffer.view(64).unwrap();
        atomic_u32_at_offset(a.bytes(), 8).store(0xFEED, Ordering::Release);
        assert_eq!(atomic_u32_at_offset(b.bytes(), 8).load(Ordering::Acquire), 0xFEED);
    }

    #[test]
    #[should_panic(expected = "misaligned")]
    fn atomic_accessor_rejects_misaligned_offsets() {
        let (_mf, mapping) = mapped_page();
        atomic_u32_at_offset(mapping.bytes(), 3);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn atomic_accessor_rejects_out_of_bounds_offsets() {
        let (_mf, mapping) = mapped_page();
        atomic_u32_at_offset(mapping.bytes(), PAGE_SIZE as usize - 2);
    }
}
