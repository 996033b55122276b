// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::mm::{DesiredAddress, Mappable, MappingOptions, MmapOpts, ProtectionFlags};
use crate::task::CurrentTask;
use crate::vfs::buffers::{InputBuffer, OutputBuffer};
use std::sync::Arc;
use ternix_uapi::as_any::AsAny;
use ternix_uapi::errors::Errno;
use ternix_uapi::open_flags::OpenFlags;
use ternix_uapi::user_address::UserAddress;
use ternix_uapi::{errno, error};

/// Corresponds to struct file_operations in Linux, plus any
/// filesystem-specific data.
///
/// Releasing resources owned by the concrete type happens in its `Drop`
/// impl, which runs when the last `FileHandle` goes away.
pub trait FileOps: Send + Sync + AsAny + 'static {
    /// Read from the file at an offset. Returns the number of bytes read;
    /// zero means end of file.
    fn read(
        &self,
        file: &FileObject,
        current_task: &CurrentTask,
        offset: usize,
        data: &mut dyn OutputBuffer,
    ) -> Result<usize, Errno>;

    /// Write to the file at an offset. Returns the number of bytes written.
    fn write(
        &self,
        file: &FileObject,
        current_task: &CurrentTask,
        offset: usize,
        data: &mut dyn InputBuffer,
    ) -> Result<usize, Errno>;

    /// Responds to an mmap call by selecting the mappable that backs the
    /// requested range and storing it into `opts`.
    fn configure_mmap(&self, _file: &FileObject, _opts: &mut MmapOpts) -> Result<(), Errno> {
        error!(ENODEV)
    }
}

/// Implements [`FileOps`] data operations for files with no data.
#[macro_export]
macro_rules! fileops_impl_dataless {
    () => {
        fn read(
            &self,
            _file: &$crate::vfs::FileObject,
            _current_task: &$crate::task::CurrentTask,
            _offset: usize,
            _data: &mut dyn $crate::vfs::buffers::OutputBuffer,
        ) -> Result<usize, ternix_uapi::errors::Errno> {
            ternix_uapi::error!(EINVAL)
        }

        fn write(
            &self,
            _file: &$crate::vfs::FileObject,
            _current_task: &$crate::task::CurrentTask,
            _offset: usize,
            _data: &mut dyn $crate::vfs::buffers::InputBuffer,
        ) -> Result<usize, ternix_uapi::errors::Errno> {
            ternix_uapi::error!(EINVAL)
        }
    };
}

// Public re-export of macros allows them to be used like regular rust items.
pub use fileops_impl_dataless;

/// A file opened by one or more tasks.
pub struct FileObject {
    ops: Box<dyn FileOps>,
    pub flags: OpenFlags,
    /// The anonymous node name, e.g. "[io_uring]".
    pub name: &'static str,
}

pub type FileHandle = Arc<FileObject>;

impl FileObject {
    pub fn new_anonymous(ops: Box<dyn FileOps>, name: &'static str, flags: OpenFlags) -> FileHandle {
        Arc::new(FileObject { ops, flags, name })
    }

    pub fn ops(&self) -> &dyn FileOps {
        self.ops.as_ref()
    }

    /// Returns the specialized `FileOps` behind this file, if it is a `T`.
    pub fn downcast_file<T: 'static>(&self) -> Option<&T> {
        self.ops().as_any().downcast_ref::<T>()
    }

    pub fn can_read(&self) -> bool {
        self.flags.can_read()
    }

    pub fn can_write(&self) -> bool {
        self.flags.can_write()
    }

    pub fn read_at(
        &self,
        current_task: &CurrentTask,
        offset: usize,
        data: &mut dyn OutputBuffer,
    ) -> Result<usize, Errno> {
        if !self.can_read() {
            return error!(EBADF);
        }
        self.ops.read(self, current_task, offset, data)
    }

    pub fn write_at(
        &self,
        current_task: &CurrentTask,
        offset: usize,
        data: &mut dyn InputBuffer,
    ) -> Result<usize, Errno> {
        if !self.can_write() {
            return error!(EBADF);
        }
        self.ops.write(self, current_task, offset, data)
    }

    pub fn configure_mmap(&self, opts: &mut MmapOpts) -> Result<(), Errno> {
        self.ops.configure_mmap(self, opts)
    }
}

impl std::fmt::Debug for FileObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileObject")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .finish()
    }
}

/// The generic mmap configurator: records the mappable selected by the
/// file's `configure_mmap` for the address-space layer to consume.
pub fn generic_configure_mmap(
    _file: &FileObject,
    mappable: Arc<dyn Mappable>,
    opts: &mut MmapOpts,
) -> Result<(), Errno> {
    opts.mappable = Some(mappable);
    Ok(())
}

/// Maps `length` bytes of `file` at `offset` into the current task's address
/// space, routing through the file's `configure_mmap`.
pub fn do_mmap(
    current_task: &CurrentTask,
    file: &FileHandle,
    addr: DesiredAddress,
    length: usize,
    prot: ProtectionFlags,
    options: MappingOptions,
    offset: u64,
) -> Result<UserAddress, Errno> {
    let mut opts = MmapOpts::new(offset, length, prot, options);
    file.configure_mmap(&mut opts)?;
    let mappable = opts.mappable.clone().ok_or_else(|| errno!(ENODEV))?;
    current_task.mm().map(addr, &mappable, opts.offset, length, prot, options)
}
