// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::mm::memory::{copy_from_shared, copy_to_shared};
use crate::mm::memory_file::{AllocOpts, AllocationKind, FileRange, InternalMapping, MemoryFile};
use crate::mm::{
    Access, DesiredAddress, Mappable, MappableRange, MappingOptions, ProtectionFlags, PAGE_SIZE,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use ternix_uapi::errors::Errno;
use ternix_uapi::math::round_up_to_increment;
use ternix_uapi::user_address::UserAddress;
use ternix_uapi::{errno, error};
use zerocopy::{FromBytes, Immutable, IntoBytes};

/// Where guest mappings start when the guest does not ask for an address.
const GUEST_MMAP_BASE: u64 = 0x2000_0000;

struct Mapping {
    base: UserAddress,
    backing: InternalMapping,
    #[allow(dead_code)]
    prot: ProtectionFlags,
    #[allow(dead_code)]
    options: MappingOptions,
}

impl Mapping {
    fn end(&self) -> u64 {
        self.base.ptr() + self.backing.len() as u64
    }
}

#[derive(Default)]
struct MemoryManagerState {
    /// Mappings keyed by guest base address. Ranges never overlap.
    mappings: BTreeMap<u64, Mapping>,
    next_addr: u64,
    /// Memory-file ranges owned by this address space (anonymous mappings),
    /// released when the address space goes away.
    owned_ranges: Vec<FileRange>,
}

/// A guest address space.
///
/// Mappings are resolved through the `Mappable` contract when they are
/// established; afterwards reads and writes go straight to the backing
/// regions, which is the moral equivalent of the page tables a hardware
/// address space would hold.
pub struct MemoryManager {
    memory_file: Arc<MemoryFile>,
    state: Mutex<MemoryManagerState>,
}

impl MemoryManager {
    pub fn new(memory_file: Arc<MemoryFile>) -> Arc<Self> {
        Arc::new(Self {
            memory_file,
            state: Mutex::new(MemoryManagerState {
                next_addr: GUEST_MMAP_BASE,
                ..Default::default()
            }),
        })
    }

    /// Maps `length` bytes of `mappable` starting at `offset`.
    pub fn map(
        &self,
        addr: DesiredAddress,
        mappable: &Arc<dyn Mappable>,
        offset: u64,
        length: usize,
        prot: ProtectionFlags,
        options: MappingOptions,
    ) -> Result<UserAddress, Errno> {
        let length = round_up_to_increment(length as u64, PAGE_SIZE)? as usize;
        if length == 0 {
            return error!(EINVAL);
        }
        let end = offset.checked_add(length as u64).ok_or_else(|| errno!(EINVAL))?;
        let range = MappableRange { start: offset, end };
        mappable.add_mapping(range, offset, prot.contains(ProtectionFlags::WRITE))?;
        let translations = mappable.translate(range, range, Access::rw())?;

        let mut state = self.state.lock();
        let base = state.allocate_address(addr, length);
        for translation in translations {
            let backing = translation.file.map_internal(
                FileRange {
                    start: translation.offset,
                    end: translation.offset + translation.source.length(),
                },
                translation.perms,
            )?;
            let vaddr = base + (translation.source.start - offset) as usize;
            state.mappings.insert(vaddr.ptr(), Mapping { base: vaddr, backing, prot, options });
        }
        Ok(base)
    }

    /// Maps fresh zero-filled memory, backed by an allocation from the
    /// kernel's memory file that this address space owns.
    pub fn map_anonymous(
        &self,
        addr: DesiredAddress,
        length: usize,
        prot: ProtectionFlags,
        options: MappingOptions,
    ) -> Result<UserAddress, Errno> {
        let length = round_up_to_increment(length as u64, PAGE_SIZE)? as usize;
        if length == 0 {
            return error!(EINVAL);
        }
        let range = self.memory_file.allocate(
            length as u64,
            AllocOpts { kind: AllocationKind::Anonymous, mem_cg_id: 0 },
        )?;
        let backing = self.memory_file.map_internal(range, Access::rw())?;
        let mut state = self.state.lock();
        let base = state.allocate_address(addr, length);
        state.mappings.insert(base.ptr(), Mapping { base, backing, prot, options });
        state.owned_ranges.push(range);
        Ok(base)
    }

    pub fn read_memory(&self, addr: UserAddress, bytes: &mut [u8]) -> Result<(), Errno> {
        self.for_each_chunk(addr, bytes.len(), |offset, backing| {
            copy_from_shared(&mut bytes[offset..offset + backing.len()], backing);
        })
    }

    pub fn write_memory(&self, addr: UserAddress, bytes: &[u8]) -> Result<usize, Errno> {
        self.for_each_chunk(addr, bytes.len(), |offset, backing| {
            copy_to_shared(backing, &bytes[offset..offset + backing.len()]);
        })?;
        Ok(bytes.len())
    }

    pub fn read_object<T: FromBytes>(&self, addr: UserAddress) -> Result<T, Errno> {
        let mut bytes = vec![0u8; std::mem::size_of::<T>()];
        self.read_memory(addr, &mut bytes)?;
        T::read_from_bytes(&bytes).map_err(|_| errno!(EINVAL))
    }

    pub fn write_object<T: IntoBytes + Immutable>(
        &self,
        addr: UserAddress,
        object: &T,
    ) -> Result<usize, Errno> {
        self.write_memory(addr, object.as_bytes())
    }

    /// Calls `f` once per mapped chunk of `[addr, addr + length)`, passing
    /// the offset into the range and the backing bytes. Faults if any part of
    /// the range is unmapped.
    fn for_each_chunk(
        &self,
        addr: UserAddress,
        length: usize,
        mut f: impl FnMut(usize, &[std::sync::atomic::AtomicU8]),
    ) -> Result<(), Errno> {
        let state = self.state.lock();
        let mut cur = addr.ptr();
        let end = cur.checked_add(length as u64).ok_or_else(|| errno!(EFAULT))?;
        while cur < end {
            let (_, mapping) = state
                .mappings
                .range(..=cur)
                .next_back()
                .filter(|(_, mapping)| mapping.end() > cur)
                .ok_or_else(|| errno!(EFAULT))?;
            let chunk_end = end.min(mapping.end());
            let backing_offset = (cur - mapping.base.ptr()) as usize;
            let chunk = &mapping.backing.bytes()
                [backing_offset..backing_offset + (chunk_end - cur) as usize];
            f((cur - addr.ptr()) as usize, chunk);
            cur = chunk_end;
        }
        Ok(())
    }
}

impl MemoryManagerState {
    fn allocate_address(&mut self, _addr: DesiredAddress, length: usize) -> UserAddress {
        // Hints are only hints; the bump allocator always decides.
        let base = UserAddress::from_raw(self.next_addr);
        self.next_addr += length as u64;
        // Leave a guard page between mappings so off-by-one guest accesses
        // fault instead of landing in a neighbor.
        self.next_addr += PAGE_SIZE;
        base
    }
}

impl Drop for MemoryManager {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for range in state.owned_ranges.drain(..) {
            self.memory_file.dec_ref(range);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ternix_uapi::errors::EFAULT;

    fn new_mm() -> Arc<MemoryManager> {
        MemoryManager::new(MemoryFile::new(None))
    }

    #[test]
    fn anonymous_mapping_round_trip() {
        let mm = new_mm();
        let addr = mm
            .map_anonymous(
                DesiredAddress::Any,
                PAGE_SIZE as usize,
                ProtectionFlags::READ | ProtectionFlags::WRITE,
                MappingOptions::ANONYMOUS,
            )
            .unwrap();
        mm.write_memory(addr, b"guest bytes").unwrap();
        let mut buffer = [0u8; 11];
        mm.read_memory(addr, &mut buffer).unwrap();
        assert_eq!(&buffer, b"guest bytes");
    }

    #[test]
    fn unmapped_access_faults() {
        let mm = new_mm();
        let mut buffer = [0u8; 4];
        assert_eq!(
            mm.read_memory(UserAddress::from_raw(0x1000), &mut buffer).unwrap_err(),
            EFAULT
        );
        let addr = mm
            .map_anonymous(
                DesiredAddress::Any,
                PAGE_SIZE as usize,
                ProtectionFlags::READ | ProtectionFlags::WRITE,
                MappingOptions::ANONYMOUS,
            )
            .unwrap();
        // A read that runs off the end of the mapping faults as well.
        let mut big = vec![0u8; PAGE_SIZE as usize + 1];
        assert_eq!(mm.read_memory(addr, &mut big).unwrap_err(), EFAULT);
    }

    #[test]
    fn typed_object_round_trip() {
        let mm = new_mm();
        let addr = mm
            .map_anonymous(
                DesiredAddress::Any,
                PAGE_SIZE as usize,
                ProtectionFlags::READ | ProtectionFlags::WRITE,
                MappingOptions::ANONYMOUS,
            )
            .unwrap();
        mm.write_object(addr, &0xDEAD_BEEF_u64).unwrap();
        assert_eq!(mm.read_object::<u64>(addr).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn dropping_address_space_releases_anonymous_memory() {
        let memory_file = MemoryFile::new(None);
        {
            let mm = MemoryManager::new(memory_file.clone());
            mm.map_anonymous(
                DesiredAddress::Any,
                PAGE_SIZE as usize,
                ProtectionFlags::READ | ProtectionFlags::WRITE,
                MappingOptions::ANONYMOUS,
            )
            .unwrap();
            assert_eq!(memory_file.bytes_in_use(), PAGE_SIZE);
        }
        assert_eq!(memory_file.bytes_in_use(), 0);
    }
}
