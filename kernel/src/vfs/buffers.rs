// Copyright 2024 The Ternix Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::mm::MemoryManager;
use ternix_uapi::errors::Errno;
use ternix_uapi::error;
use ternix_uapi::user_buffer::{UserBuffer, UserBuffers};

/// A sink for bytes produced by a read-like operation.
pub trait OutputBuffer {
    /// Writes as much of `data` as fits. Returns the number of bytes
    /// consumed.
    fn write(&mut self, data: &[u8]) -> Result<usize, Errno>;

    /// Bytes that can still be written.
    fn available(&self) -> usize;

    fn bytes_written(&self) -> usize;

    /// Writes all of `data`, failing if it does not fit.
    fn write_all(&mut self, data: &[u8]) -> Result<usize, Errno> {
        let written = self.write(data)?;
        if written != data.len() {
            return error!(EINVAL);
        }
        Ok(written)
    }
}

/// A source of bytes consumed by a write-like operation.
pub trait InputBuffer {
    /// Returns all remaining bytes without consuming them.
    fn peek_all(&mut self) -> Result<Vec<u8>, Errno>;

    /// Bytes that can still be read.
    fn available(&self) -> usize;

    /// Consumes `length` bytes.
    fn advance(&mut self, length: usize) -> Result<(), Errno>;
}

/// An `OutputBuffer` collecting into kernel memory.
pub struct VecOutputBuffer {
    buffer: Vec<u8>,
    capacity: usize,
}

impl VecOutputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { buffer: Vec::with_capacity(capacity), capacity }
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer
    }
}

impl OutputBuffer for VecOutputBuffer {
    fn write(&mut self, data: &[u8]) -> Result<usize, Errno> {
        let to_write = data.len().min(self.available());
        self.buffer.extend_from_slice(&data[..to_write]);
        Ok(to_write)
    }

    fn available(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    fn bytes_written(&self) -> usize {
        self.buffer.len()
    }
}

/// An `InputBuffer` fed from kernel memory.
pub struct VecInputBuffer {
    buffer: Vec<u8>,
    bytes_read: usize,
}

impl VecInputBuffer {
    pub fn new(data: &[u8]) -> Self {
        Self { buffer: data.to_vec(), bytes_read: 0 }
    }
}

impl InputBuffer for VecInputBuffer {
    fn peek_all(&mut self) -> Result<Vec<u8>, Errno> {
        Ok(self.buffer[self.bytes_read..].to_vec())
    }

    fn available(&self) -> usize {
        self.buffer.len() - self.bytes_read
    }

    fn advance(&mut self, length: usize) -> Result<(), Errno> {
        if length > self.available() {
            return error!(EINVAL);
        }
        self.bytes_read += length;
        Ok(())
    }
}

/// An `OutputBuffer` that scatters into a sequence of guest buffers, in
/// order, through an address space.
pub struct UserBuffersOutputBuffer<'a> {
    mm: &'a MemoryManager,
    buffers: UserBuffers,
    available: usize,
    bytes_written: usize,
}

impl<'a> UserBuffersOutputBuffer<'a> {
    pub fn new(mm: &'a MemoryManager, buffers: UserBuffers) -> Result<Self, Errno> {
        let available = UserBuffer::total_length(&buffers)?;
        Ok(Self { mm, buffers, available, bytes_written: 0 })
    }
}

impl OutputBuffer for UserBuffersOutputBuffer<'_> {
    fn write(&mut self, data: &[u8]) -> Result<usize, Errno> {
        let mut remaining = data;
        let mut written = 0;
        while !remaining.is_empty() {
            let Some(buffer) = self.buffers.first_mut() else {
                break;
            };
            let chunk = buffer.length.min(remaining.len());
            self.mm.write_memory(buffer.address, &remaining[..chunk])?;
            buffer.address += chunk;
            buffer.length -= chunk;
            if buffer.length == 0 {
                self.buffers.remove(0);
            }
            remaining = &remaining[chunk..];
            written += chunk;
        }
        self.available -= written;
        self.bytes_written += written;
        Ok(written)
    }

    fn available(&self) -> usize {
        self.available
    }

    fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

/// An `InputBuffer` that gathers from a sequence of guest buffers.
pub struct UserBuffersInputBuffer<'a> {
    mm: &'a MemoryManager,
    buffers: UserBuffers,
    available: usize,
}

impl<'a> UserBuffersInputBuffer<'a> {
    pub fn new(mm: &'a MemoryManager, buffers: UserBuffers) -> Result<Self, Errno> {
        let available = UserBuffer::total_length(&buffers)?;
        Ok(Self { mm, buffers, available })
    }
}

impl InputBuffer for UserBuffersInputBuffer<'_> {
    fn peek_all(&mut self) -> Result<Vec<u8>, Errno> {
        let mut data = Vec::with_capacity(self.available);
        for buffer in &self.buffers {
            let mut chunk = vec![0; buffer.length];
            self.mm.read_memory(buffer.address, &mut chunk)?;
            data.append(&mut chunk);
        }
        Ok(data)
    }

    fn available(&self) -> usize {
        self.available
    }

    fn advance(&mut self, mut length: usize) -> Result<(), Errno> {
        if length > self.available {
            return error!(EINVAL);
        }
        self.available -= length;
        while length > 0 {
            let Some(buffer) = self.buffers.first_mut() else {
                return error!(EINVAL);
            };
            let chunk = buffer.length.min(length);
            buffer.address += chunk;
            buffer.length -= chunk;
            if buffer.length == 0 {
                self.buffers.remove(0);
            }
            length -= chunk;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::{DesiredAddress, MappingOptions, ProtectionFlags, PAGE_SIZE};
    use crate::testing::*;
    use smallvec::smallvec;
    use ternix_uapi::user_address::UserAddress;

    fn map_page(current_task: &crate::task::CurrentTask) -> UserAddress {
        current_task
            .mm()
            .map_anonymous(
                DesiredAddress::Any,
                PAGE_SIZE as usize,
                ProtectionFlags::READ | ProtectionFlags::WRITE,
                MappingOptions::ANONYMOUS,
            )
            .unwrap()
    }

    #[test]
    fn vec_output_respects_capacity() {
        let mut output = VecOutputBuffer::new(4);
        assert_eq!(output.write(b"abcdef").unwrap(), 4);
        assert_eq!(output.data(), b"abcd");
        assert_eq!(output.available(), 0);
    }

    #[test]
    fn user_buffers_output_scatters() {
        let (_kernel, current_task) = create_kernel_and_task();
        let addr = map_page(&current_task);
        let buffers: UserBuffers = smallvec![
            UserBuffer { address: addr, length: 3 },
            UserBuffer { address: addr + 8usize, length: 5 },
        ];
        let mut output = UserBuffersOutputBuffer::new(current_task.mm(), buffers).unwrap();
        assert_eq!(output.available(), 8);
        assert_eq!(output.write_all(b"abcdefgh").unwrap(), 8);

        let mut readback = [0u8; 13];
        current_task.read_memory(addr, &mut readback).unwrap();
        assert_eq!(&readback[..3], b"abc");
        assert_eq!(&readback[8..], b"defgh");
    }

    #[test]
    fn user_buffers_input_gathers() {
        let (_kernel, current_task) = create_kernel_and_task();
        let addr = map_page(&current_task);
        current_task.write_memory(addr, b"hello world").unwrap();
        let buffers: UserBuffers = smallvec![
            UserBuffer { address: addr, length: 5 },
            UserBuffer { address: addr + 6usize, length: 5 },
        ];
        let mut input = UserBuffersInputBuffer::new(current_task.mm(), buffers).unwrap();
        assert_eq!(input.peek_all().unwrap(), b"helloworld");
        input.advance(10).unwrap();
        assert_eq!(input.available(), 0);
    }
}
