// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::mm::memory::MemoryObject;
use crate::mm::PAGE_SIZE;
use crate::task::CurrentTask;
use crate::vfs::buffers::{InputBuffer, OutputBuffer};
use crate::vfs::{Anon, FileHandle, FileObject, FileOps};
use std::sync::Arc;
use ternix_uapi::errors::Errno;
use ternix_uapi::math::round_up_to_increment;
use ternix_uapi::open_flags::OpenFlags;
use ternix_uapi::{errno, error};

/// A memory-backed regular file, the memfd equivalent.
///
/// The backing region is fixed-size; the logical file size grows with writes
/// up to the backing capacity.
pub struct MemoryFileObject {
    pub memory: Arc<MemoryObject>,
}

impl MemoryFileObject {
    pub fn new(memory: Arc<MemoryObject>) -> Self {
        Self { memory }
    }

    /// Creates an empty file with at least `capacity` bytes of backing.
    pub fn new_file(current_task: &CurrentTask, capacity: u64) -> Result<FileHandle, Errno> {
        let size = round_up_to_increment(capacity.max(1), PAGE_SIZE)?;
        let ops = Box::new(Self::new(Arc::new(MemoryObject::new(size))));
        Ok(Anon::new_file(current_task, ops, OpenFlags::RDWR, "[memfd]"))
    }
}

impl FileOps for MemoryFileObject {
    fn read(
        &self,
        _file: &FileObject,
        _current_task: &CurrentTask,
        offset: usize,
        data: &mut dyn OutputBuffer,
    ) -> Result<usize, Errno> {
        let file_length = self.memory.get_content_size() as usize;
        let want_read = data.available();
        // Reading at or past the end of the file returns zero bytes.
        if offset >= file_length {
            return Ok(0);
        }
        let to_read = want_read.min(file_length - offset);
        let buf = self.memory.read_to_vec(offset as u64, to_read as u64).map_err(|_| errno!(EIO))?;
        data.write_all(&buf)?;
        Ok(to_read)
    }

    fn write(
        &self,
        _file: &FileObject,
        _current_task: &CurrentTask,
        offset: usize,
        data: &mut dyn InputBuffer,
    ) -> Result<usize, Errno> {
        let buf = data.peek_all()?;
        let write_end = offset.checked_add(buf.len()).ok_or_else(|| errno!(EINVAL))?;
        if write_end as u64 > self.memory.get_size() {
            return error!(ENOSPC);
        }
        self.memory.write(&buf, offset as u64).map_err(|_| errno!(EIO))?;
        if write_end as u64 > self.memory.get_content_size() {
            self.memory.set_content_size(write_end as u64);
        }
        data.advance(buf.len())?;
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use crate::vfs::buffers::{VecInputBuffer, VecOutputBuffer};
    use ternix_uapi::errors::ENOSPC;

    #[test]
    fn write_then_read_back() {
        let (_kernel, current_task) = create_kernel_and_task();
        let file = MemoryFileObject::new_file(&current_task, 4096).unwrap();
        let mut input = VecInputBuffer::new(b"hello world!");
        assert_eq!(file.write_at(&current_task, 0, &mut input).unwrap(), 12);

        let mut output = VecOutputBuffer::new(64);
        assert_eq!(file.read_at(&current_task, 0, &mut output).unwrap(), 12);
        assert_eq!(output.data(), b"hello world!");
    }

    #[test]
    fn read_at_eof_returns_zero() {
        let (_kernel, current_task) = create_kernel_and_task();
        let file = MemoryFileObject::new_file(&current_task, 4096).unwrap();
        let mut output = VecOutputBuffer::new(64);
        assert_eq!(file.read_at(&current_task, 0, &mut output).unwrap(), 0);

        let mut input = VecInputBuffer::new(b"abc");
        file.write_at(&current_task, 0, &mut input).unwrap();
        let mut output = VecOutputBuffer::new(64);
        assert_eq!(file.read_at(&current_task, 3, &mut output).unwrap(), 0);
    }

    #[test]
    fn write_past_backing_is_rejected() {
        let (_kernel, current_task) = create_kernel_and_task();
        let file = MemoryFileObject::new_file(&current_task, 4096).unwrap();
        let mut input = VecInputBuffer::new(b"x");
        assert_eq!(file.write_at(&current_task, 4096, &mut input).unwrap_err(), ENOSPC);
    }
}
