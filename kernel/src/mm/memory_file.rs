// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::mm::memory::MemoryObject;
use crate::mm::{Access, PAGE_SIZE};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicU8;
use std::sync::Arc;
use ternix_uapi::errors::Errno;
use ternix_uapi::math::round_up_to_increment;
use ternix_uapi::{errno, error};

/// A range of offsets within a `MemoryFile`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileRange {
    pub start: u64,
    pub end: u64,
}

impl FileRange {
    pub fn length(&self) -> u64 {
        self.end - self.start
    }
}

/// What an allocation is accounted as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationKind {
    Anonymous,
}

#[derive(Clone, Copy, Debug)]
pub struct AllocOpts {
    pub kind: AllocationKind,
    /// The memory cgroup the allocation is charged to.
    pub mem_cg_id: u32,
}

struct Region {
    memory: Arc<MemoryObject>,
    refs: usize,
    #[allow(dead_code)]
    kind: AllocationKind,
    #[allow(dead_code)]
    mem_cg_id: u32,
}

#[derive(Default)]
struct MemoryFileState {
    /// Allocated regions keyed by their start offset.
    regions: BTreeMap<u64, Region>,
    next_offset: u64,
    bytes_in_use: u64,
}

/// The file backing all kernel-owned guest-visible memory.
///
/// Regions are handed out as page-aligned `FileRange`s with a reference
/// count; the backing pages are pinned (they never move) until the count
/// drops to zero, so internal mappings stay valid for the life of their
/// handles.
pub struct MemoryFile {
    state: Mutex<MemoryFileState>,
    size_limit: Option<u64>,
}

impl MemoryFile {
    pub fn new(size_limit: Option<u64>) -> Arc<Self> {
        Arc::new(Self { state: Mutex::new(MemoryFileState::default()), size_limit })
    }

    /// Allocates a zero-filled region of at least `length` bytes, rounded up
    /// to whole pages, with an initial reference count of one.
    pub fn allocate(&self, length: u64, opts: AllocOpts) -> Result<FileRange, Errno> {
        if length == 0 {
            return error!(EINVAL);
        }
        let length = round_up_to_increment(length, PAGE_SIZE)?;
        let mut state = self.state.lock();
        if let Some(limit) = self.size_limit {
            if state.bytes_in_use.checked_add(length).map_or(true, |total| total > limit) {
                return error!(ENOMEM);
            }
        }
        let start = state.next_offset;
        let end = start.checked_add(length).ok_or_else(|| errno!(ENOMEM))?;
        state.regions.insert(
            start,
            Region {
                memory: Arc::new(MemoryObject::new(length)),
                refs: 1,
                kind: opts.kind,
                mem_cg_id: opts.mem_cg_id,
            },
        );
        state.next_offset = end;
        state.bytes_in_use += length;
        Ok(FileRange { start, end })
    }

    pub fn inc_ref(&self, range: FileRange) {
        let mut state = self.state.lock();
        let region = state
            .regions
            .get_mut(&range.start)
            .unwrap_or_else(|| panic!("inc_ref of unallocated range {range:?}"));
        region.refs += 1;
    }

    pub fn dec_ref(&self, range: FileRange) {
        let mut state = self.state.lock();
        let region = state
            .regions
            .get_mut(&range.start)
            .unwrap_or_else(|| panic!("dec_ref of unallocated range {range:?}"));
        region.refs -= 1;
        if region.refs == 0 {
            state.regions.remove(&range.start);
            state.bytes_in_use -= range.length();
        }
    }

    /// Returns an emulator-side view of `range`. The view stays valid as long
    /// as the handle is held, independent of the range's reference count.
    pub fn map_internal(&self, range: FileRange, _access: Access) -> Result<InternalMapping, Errno> {
        let state = self.state.lock();
        let (region_start, region) = state
            .regions
            .range(..=range.start)
            .next_back()
            .ok_or_else(|| errno!(EFAULT))?;
        let region_end = region_start + region.memory.get_size();
        if range.start < *region_start || range.end > region_end {
            return error!(EFAULT);
        }
        Ok(InternalMapping {
            memory: region.memory.clone(),
            start: (range.start - region_start) as usize,
            len: range.length() as usize,
        })
    }

    /// Bytes currently allocated, for accounting and tests.
    pub fn bytes_in_use(&self) -> u64 {
        self.state.lock().bytes_in_use
    }
}

/// An emulator-side view of a `MemoryFile` range.
#[derive(Clone, Debug)]
pub struct InternalMapping {
    memory: Arc<MemoryObject>,
    start: usize,
    len: usize,
}

impl InternalMapping {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes(&self) -> &[AtomicU8] {
        &self.memory.as_bytes()[self.start..self.start + self.len]
    }

    /// A view of the same range without its first `n` bytes.
    pub fn drop_first(&self, n: usize) -> InternalMapping {
        assert!(n <= self.len, "drop_first({n}) of a {} byte mapping", self.len);
        InternalMapping { memory: self.memory.clone(), start: self.start + n, len: self.len - n }
    }

    /// A view of the first `n` bytes of the range.
    pub fn prefix(&self, n: usize) -> InternalMapping {
        assert!(n <= self.len, "prefix({n}) of a {} byte mapping", self.len);
        InternalMapping { memory: self.memory.clone(), start: self.start, len: n }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ternix_uapi::errors::{EFAULT, ENOMEM};

    fn anonymous() -> AllocOpts {
        AllocOpts { kind: AllocationKind::Anonymous, mem_cg_id: 0 }
    }

    #[test]
    fn allocations_are_page_rounded_and_aligned() {
        let mf = MemoryFile::new(None);
        let fr = mf.allocate(1, anonymous()).unwrap();
        assert_eq!(fr.start % PAGE_SIZE, 0);
        assert_eq!(fr.length(), PAGE_SIZE);
        let fr2 = mf.allocate(PAGE_SIZE + 1, anonymous()).unwrap();
        assert_eq!(fr2.length(), 2 * PAGE_SIZE);
        assert_eq!(mf.bytes_in_use(), 3 * PAGE_SIZE);
    }

    #[test]
    fn dec_ref_frees_region() {
        let mf = MemoryFile::new(None);
        let fr = mf.allocate(PAGE_SIZE, anonymous()).unwrap();
        mf.inc_ref(fr);
        mf.dec_ref(fr);
        assert_eq!(mf.bytes_in_use(), PAGE_SIZE);
        mf.dec_ref(fr);
        assert_eq!(mf.bytes_in_use(), 0);
        assert_eq!(mf.map_internal(fr, Access::rw()).unwrap_err(), EFAULT);
    }

    #[test]
    fn size_limit_returns_enomem() {
        let mf = MemoryFile::new(Some(2 * PAGE_SIZE));
        let _fr = mf.allocate(PAGE_SIZE, anonymous()).unwrap();
        assert_eq!(mf.allocate(2 * PAGE_SIZE, anonymous()).unwrap_err(), ENOMEM);
        // A fitting allocation still succeeds.
        mf.allocate(PAGE_SIZE, anonymous()).unwrap();
    }

    #[test]
    fn map_internal_views_share_storage() {
        let mf = MemoryFile::new(None);
        let fr = mf.allocate(PAGE_SIZE, anonymous()).unwrap();
        let a = mf.map_internal(fr, Access::rw()).unwrap();
        let b = mf.map_internal(fr, Access::rw()).unwrap();
        crate::mm::memory::copy_to_shared(&a.bytes()[..5], b"hello");
        let mut read = [0u8; 5];
        crate::mm::memory::copy_from_shared(&mut read, &b.bytes()[..5]);
        assert_eq!(&read, b"hello");
    }

    #[test]
    fn map_internal_out_of_range_faults() {
        let mf = MemoryFile::new(None);
        let fr = mf.allocate(PAGE_SIZE, anonymous()).unwrap();
        let oversized = FileRange { start: fr.start, end: fr.end + 1 };
        assert_eq!(mf.map_internal(oversized, Access::rw()).unwrap_err(), EFAULT);
    }
}
