// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Helpers for constructing kernels, tasks and files in unit tests.

use crate::mm::{DesiredAddress, MappingOptions, ProtectionFlags};
use crate::task::{CurrentTask, Kernel, KernelOptions, Task};
use crate::vfs::buffers::{InputBuffer, OutputBuffer};
use crate::vfs::{Anon, FileHandle, FileObject, FileOps};
use std::sync::Arc;
use ternix_uapi::errors::Errno;
use ternix_uapi::open_flags::OpenFlags;
use ternix_uapi::user_address::UserAddress;
use zerocopy::{Immutable, IntoBytes};

/// Creates a kernel and a task to run tests against.
pub fn create_kernel_and_task() -> (Arc<Kernel>, CurrentTask) {
    create_kernel_and_task_with_options(KernelOptions::default())
}

pub fn create_kernel_and_task_with_options(
    options: KernelOptions,
) -> (Arc<Kernel>, CurrentTask) {
    let kernel = Kernel::new(options);
    let task = kernel.new_task("test-task");
    (kernel, task)
}

/// Creates an additional task on `kernel`, with its own address space and
/// file table.
pub fn create_task(kernel: &Arc<Kernel>, command: &str) -> CurrentTask {
    kernel.new_task(command)
}

/// Maps a region of memory at least `length` bytes long with read/write
/// protection, returning the mapped address. Panics on failure.
#[track_caller]
pub fn map_memory_anywhere(current_task: &CurrentTask, length: u64) -> UserAddress {
    current_task
        .mm()
        .map_anonymous(
            DesiredAddress::Any,
            length as usize,
            ProtectionFlags::READ | ProtectionFlags::WRITE,
            MappingOptions::ANONYMOUS,
        )
        .expect("failed to map anonymous memory")
}

/// An implementation of [`FileOps`] that panics on any read or write. Useful
/// as a stand-in when a test needs a file but never does I/O through it.
struct PanickingFile;

impl FileOps for PanickingFile {
    fn read(
        &self,
        _file: &FileObject,
        _current_task: &CurrentTask,
        _offset: usize,
        _data: &mut dyn OutputBuffer,
    ) -> Result<usize, Errno> {
        panic!("read called on test file")
    }

    fn write(
        &self,
        _file: &FileObject,
        _current_task: &CurrentTask,
        _offset: usize,
        _data: &mut dyn InputBuffer,
    ) -> Result<usize, Errno> {
        panic!("write called on test file")
    }
}

/// Returns a new anonymous test file with the specified `flags`.
pub fn anon_test_file(current_task: &CurrentTask, flags: OpenFlags) -> FileHandle {
    Anon::new_file(current_task, Box::new(PanickingFile), flags, "[test_file]")
}

/// Helper to write out data to a task's memory sequentially.
pub struct UserMemoryWriter<'a> {
    task: &'a Task,
    current_addr: UserAddress,
}

impl<'a> UserMemoryWriter<'a> {
    pub fn new(task: &'a Task, addr: UserAddress) -> Self {
        Self { task, current_addr: addr }
    }

    /// Writes all of `data` at the current address and advances past it.
    /// Returns the address the data starts at. Panics on failure.
    #[track_caller]
    pub fn write(&mut self, data: &[u8]) -> UserAddress {
        let bytes_written =
            self.task.mm().write_memory(self.current_addr, data).expect("write guest memory");
        assert_eq!(bytes_written, data.len());
        let start_addr = self.current_addr;
        self.current_addr += bytes_written;
        start_addr
    }

    #[track_caller]
    pub fn write_object<T: IntoBytes + Immutable>(&mut self, object: &T) -> UserAddress {
        self.write(object.as_bytes())
    }

    pub fn current_address(&self) -> UserAddress {
        self.current_addr
    }
}
