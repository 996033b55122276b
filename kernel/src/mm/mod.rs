// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod memory_manager;
pub mod memory;
pub mod memory_file;

pub use memory_manager::*;

use crate::mm::memory_file::MemoryFile;
use bitflags::bitflags;
use std::sync::Arc;
use ternix_uapi::errors::Errno;
use ternix_uapi::user_address::UserAddress;

pub const PAGE_SIZE: u64 = 4096;

bitflags! {
    /// Access rights carried by a memory translation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Access: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
    }
}

impl Access {
    pub fn rw() -> Self {
        Self::READ | Self::WRITE
    }

    pub fn rwx() -> Self {
        Self::READ | Self::WRITE | Self::EXEC
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ProtectionFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MappingOptions: u32 {
        const SHARED = 1 << 0;
        const ANONYMOUS = 1 << 1;
    }
}

/// Where in the guest address space a new mapping should land.
#[derive(Clone, Copy, Debug)]
pub enum DesiredAddress {
    /// Any available range.
    Any,
    /// Prefer the given address, fall back to any available range.
    Hint(UserAddress),
}

/// A range of offsets within a mappable region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappableRange {
    pub start: u64,
    pub end: u64,
}

impl MappableRange {
    pub fn length(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn intersect(&self, other: &MappableRange) -> MappableRange {
        let start = self.start.max(other.start);
        MappableRange { start, end: self.end.min(other.end).max(start) }
    }
}

/// One resolved piece of a mappable region: `source` within the region maps
/// to `offset` within `file`.
pub struct Translation {
    pub source: MappableRange,
    pub file: Arc<MemoryFile>,
    pub offset: u64,
    pub perms: Access,
}

impl std::fmt::Debug for Translation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translation")
            .field("source", &self.source)
            .field("file", &Arc::as_ptr(&self.file))
            .field("offset", &self.offset)
            .field("perms", &self.perms)
            .finish()
    }
}

/// The contract a region must implement to be mapped into a guest address
/// space. Mirrors the kernel-internal half of mmap: the file's
/// `configure_mmap` picks the mappable, the address space calls `translate`
/// to find backing memory.
pub trait Mappable: Send + Sync + 'static {
    /// Informs the mappable that `range` of some address space now maps it at
    /// `offset`.
    fn add_mapping(&self, range: MappableRange, offset: u64, writable: bool) -> Result<(), Errno>;

    fn remove_mapping(&self, range: MappableRange, offset: u64, writable: bool);

    fn copy_mapping(
        &self,
        source: MappableRange,
        target: MappableRange,
        offset: u64,
        writable: bool,
    ) -> Result<(), Errno>;

    /// Resolves backing memory for `optional`, which must cover at least
    /// `required`. A `required` range beyond the region is a bus fault,
    /// reported as EFAULT.
    fn translate(
        &self,
        required: MappableRange,
        optional: MappableRange,
        access: Access,
    ) -> Result<Vec<Translation>, Errno>;

    fn invalidate_unsavable(&self) -> Result<(), Errno>;
}

/// Options accumulated while configuring an mmap call, before the address
/// space consumes them.
pub struct MmapOpts {
    pub offset: u64,
    pub length: usize,
    pub prot: ProtectionFlags,
    pub options: MappingOptions,
    pub mappable: Option<Arc<dyn Mappable>>,
}

impl MmapOpts {
    pub fn new(offset: u64, length: usize, prot: ProtectionFlags, options: MappingOptions) -> Self {
        Self { offset, length, prot, options, mappable: None }
    }
}
